//! warden — Demo CLI
//!
//! Exercises the permission resolver and the session heartbeat tracker by
//! hand, using real warden components wired to files on disk.
//!
//! Usage:
//!   cargo run -p demo -- check --permissions perms.toml --actor <uuid> --node chat.send
//!   cargo run -p demo -- groups --permissions perms.toml --actor <uuid>
//!   cargo run -p demo -- session --actor <uuid> --name Notch --seconds 5
//!   cargo run -p demo -- history

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::DateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use warden_contracts::{
    actor::{Actor, ActorId},
    error::{WardenError, WardenResult},
    permission::{LegacyOverrideTable, PermissionDatabase},
    session::SessionRecord,
};
use warden_core::{
    clock::SystemClock,
    traits::{PermissionEngine, SessionStore},
    ActorContext, SessionRegistry, WardenConfig,
};
use warden_policy::{loader, OperatorList, Snapshot, SnapshotResolver};
use warden_store::JsonFileSessionStore;

// ── CLI definition ────────────────────────────────────────────────────────────

/// warden — player permissions and session tracking.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "warden permission resolver and session tracker demo",
    long_about = "Resolves permission nodes against a permission file and tracks\n\
                  player sessions with a periodic heartbeat written to JSON files."
)]
struct Cli {
    /// Runtime configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one permission node for one actor.
    Check {
        /// Permission file: native TOML, or wrapper `permissions.json`.
        #[arg(long)]
        permissions: PathBuf,
        #[arg(long)]
        actor: ActorId,
        #[arg(long, default_value = "player")]
        name: String,
        /// Node to check. Omit to ask the "any" question.
        #[arg(long)]
        node: Option<String>,
        /// Server `ops.json`, to also report operator status.
        #[arg(long)]
        ops: Option<PathBuf>,
    },
    /// List an actor's groups in membership order.
    Groups {
        #[arg(long)]
        permissions: PathBuf,
        #[arg(long)]
        actor: ActorId,
    },
    /// Log an actor in, keep it online for a while, then log it out.
    Session {
        #[arg(long)]
        actor: ActorId,
        #[arg(long, default_value = "player")]
        name: String,
        #[arg(long, default_value_t = 3)]
        seconds: u64,
        /// Session store directory; overrides `[store] root`.
        #[arg(long)]
        store: Option<PathBuf>,
        #[arg(long)]
        permissions: Option<PathBuf>,
    },
    /// Print stored session records.
    History {
        #[arg(long)]
        store: Option<PathBuf>,
        /// Only this actor; all actors when omitted.
        #[arg(long)]
        actor: Option<ActorId>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> WardenResult<()> {
    let config = match &cli.config {
        Some(path) => WardenConfig::from_file(path)?,
        None => WardenConfig::default(),
    };

    match cli.command {
        Command::Check {
            permissions,
            actor,
            name,
            node,
            ops,
        } => run_check(&config, &permissions, Actor::new(actor, name), node, ops),
        Command::Groups { permissions, actor } => run_groups(&config, &permissions, actor),
        Command::Session {
            actor,
            name,
            seconds,
            store,
            permissions,
        } => {
            let root = store.unwrap_or_else(|| config.store.root.clone());
            let engine = match permissions {
                Some(path) => resolver_from_file(&config, &path)?,
                None => SnapshotResolver::from_parts(
                    PermissionDatabase::new(),
                    LegacyOverrideTable::new(),
                ),
            };
            run_session(&config, root, engine, Actor::new(actor, name), seconds)
        }
        Command::History { store, actor } => {
            let root = store.unwrap_or_else(|| config.store.root.clone());
            run_history(&JsonFileSessionStore::new(root), actor)
        }
    }
}

// ── Permissions ───────────────────────────────────────────────────────────────

fn resolver_from_file(config: &WardenConfig, path: &Path) -> WardenResult<SnapshotResolver> {
    let loaded = loader::from_file(path)?;
    for problem in loader::invalid_patterns(&loaded.database) {
        println!("  warning: {}", problem);
    }
    Ok(SnapshotResolver::new(
        Arc::new(Snapshot::new(loaded.database)),
        Arc::new(Snapshot::new(loaded.legacy)),
        loaded.resolver.unwrap_or_else(|| config.resolver.clone()),
    ))
}

fn run_check(
    config: &WardenConfig,
    permissions: &Path,
    actor: Actor,
    node: Option<String>,
    ops: Option<PathBuf>,
) -> WardenResult<()> {
    let engine = resolver_from_file(config, permissions)?;
    let allowed = engine.has_permission(&actor, node.as_deref());

    println!(
        "{} ({}) {} -> {}",
        actor,
        actor.id,
        node.as_deref().unwrap_or("<any>"),
        if allowed { "ALLOW" } else { "DENY" }
    );

    if let Some(path) = ops {
        let ops = OperatorList::from_file(&path)?;
        match ops.level_of(&actor) {
            Some(level) => println!("  operator: yes (level {})", level),
            None => println!("  operator: no"),
        }
    }
    Ok(())
}

fn run_groups(config: &WardenConfig, permissions: &Path, actor: ActorId) -> WardenResult<()> {
    let engine = resolver_from_file(config, permissions)?;
    let groups = engine.groups_of(&Actor::new(actor, "player"));
    if groups.is_empty() {
        println!("{} has no user record or no groups", actor);
    }
    for group in groups {
        println!("{}", group);
    }
    Ok(())
}

// ── Sessions ──────────────────────────────────────────────────────────────────

fn run_session(
    config: &WardenConfig,
    root: PathBuf,
    engine: SnapshotResolver,
    actor: Actor,
    seconds: u64,
) -> WardenResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| WardenError::ConfigError {
            reason: format!("failed to start tokio runtime: {}", e),
        })?;

    let store = Arc::new(JsonFileSessionStore::new(root));
    let tick = config.heartbeat.interval();

    runtime.block_on(async {
        let sessions = Arc::new(SessionRegistry::new(
            store.clone(),
            Arc::new(SystemClock),
            &config.heartbeat,
        ));
        let ctx = ActorContext::login(actor, Arc::new(engine), sessions.clone()).await?;
        println!(
            "{} logged in, session {} (heartbeat every {:?})",
            ctx.actor(),
            ctx.session_start(),
            tick
        );

        tokio::time::sleep(Duration::from_secs(seconds)).await;

        let id = ctx.id();
        ctx.logout();
        // Let an in-flight tick land before reading the record back.
        tokio::time::sleep(tick.min(Duration::from_millis(250))).await;
        sessions.shutdown();

        match store.get(&id)? {
            Some(record) => print_record(&record),
            None => println!("no session record was written for {}", id),
        }
        Ok(())
    })
}

fn run_history(store: &JsonFileSessionStore, actor: Option<ActorId>) -> WardenResult<()> {
    let ids = match actor {
        Some(id) => vec![id],
        None => {
            let mut ids = store.actor_ids()?;
            ids.sort();
            ids
        }
    };

    if ids.is_empty() {
        println!("no session records under {}", store.root().display());
    }
    for id in ids {
        match store.get(&id)? {
            Some(record) => print_record(&record),
            None => println!("{}: never logged in", id),
        }
    }
    Ok(())
}

fn print_record(record: &SessionRecord) {
    println!();
    println!("{}", record.actor_id);
    println!(
        "  first login: {} (local offset {})",
        record.first_login_at.timestamp.to_rfc3339(),
        record.first_login_at.timezone
    );
    println!(
        "  sessions: {}, total online: {}s",
        record.session_count(),
        record.total_seconds_online()
    );
    for (start, seen) in &record.heartbeats {
        println!(
            "    {} .. {} ({}s)",
            format_epoch(*start),
            format_epoch(*seen),
            (seen - start).max(0)
        );
    }
}

fn format_epoch(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}
