//! Sync CLI commands for synchronizing with the server.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};

use stitch_kit_core::models::{Fabric, Pattern, Project};
use stitch_kit_core::offline::{ConnectivityMonitor, HttpProbe, SyncCoordinator};
use stitch_kit_core::sync::check_server;

use crate::config::Config;
use crate::sync::SyncContext;

/// Timeout for each reachability probe issued by `sync watch`.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sync with remote server
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    pub command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
pub enum SyncSubcommand {
    /// Show sync configuration, server status, and pending work
    Status,

    /// Fetch server collections into the offline cache
    Pull,

    /// Keep watching connectivity, syncing whenever the server comes back
    Watch {
        /// Seconds between reachability probes
        #[arg(long, default_value = "30")]
        interval: u64,
    },
}

impl SyncCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let rt = tokio::runtime::Runtime::new()?;

        match &self.command {
            None => rt.block_on(self.sync(config)),
            Some(SyncSubcommand::Status) => rt.block_on(self.status(config)),
            Some(SyncSubcommand::Pull) => rt.block_on(self.pull(config)),
            Some(SyncSubcommand::Watch { interval }) => {
                rt.block_on(self.watch(config, Duration::from_secs(*interval)))
            }
        }
    }

    async fn sync(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let ctx = SyncContext::open(config)?;
        ctx.remote()?;

        let pending = ctx.queue.pending_count().await;
        if pending == 0 {
            println!("Nothing to sync.");
            return Ok(());
        }

        println!("Syncing {} pending operation(s)...", pending);
        let retired = ctx.drain_remote().await?;
        let remaining = ctx.queue.pending_count().await;

        if remaining == 0 {
            println!("Sync complete.");
        } else {
            println!(
                "Synced {} operation(s); {} still pending for the next attempt.",
                retired, remaining
            );
        }
        Ok(())
    }

    async fn status(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        if !config.sync.is_configured() {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!("    api_key: \"...\"");
            println!();
            println!("Or set environment variables:");
            println!("  STITCH_SYNC_URL, STITCH_SYNC_API_KEY");
            return Ok(());
        }

        let ctx = SyncContext::open(config)?;
        let server_url = ctx.remote()?.server_url().to_string();
        let reachable = check_server(&server_url).await;

        println!("Server:    {}", server_url);
        println!(
            "Auto-sync: {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!(
            "Reachable: {}",
            if reachable { "yes" } else { "no (offline)" }
        );
        println!();

        let pending = ctx.queue.all().await;
        println!("Pending operations: {}", pending.len());
        for op in &pending {
            println!(
                "  {} {} {} (queued {})",
                op.kind,
                op.entity_type,
                op.entity_id.as_deref().unwrap_or("-"),
                op.enqueued_at.format("%Y-%m-%d %H:%M")
            );
        }
        println!();

        let info = ctx.cache.info().await;
        println!(
            "Cached collections: {} ({} items, {} bytes)",
            info.keys.len(),
            info.total_items,
            info.total_bytes
        );
        for key in &info.keys {
            println!("  {}", key);
        }
        if let Some(oldest) = info.oldest_update {
            println!("Oldest snapshot: {}", oldest.format("%Y-%m-%d %H:%M"));
        }
        Ok(())
    }

    async fn pull(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let ctx = SyncContext::open(config)?;
        let remote = ctx.remote()?;

        println!("Fetching collections from {}...", remote.server_url());

        let projects: Vec<Project> = remote.fetch_collection("projects").await?;
        ctx.cache.store("projects", &projects).await?;
        println!("  ✓ projects ({})", projects.len());

        let patterns: Vec<Pattern> = remote.fetch_collection("patterns").await?;
        ctx.cache.store("patterns", &patterns).await?;
        println!("  ✓ patterns ({})", patterns.len());

        let fabrics: Vec<Fabric> = remote.fetch_collection("fabrics").await?;
        ctx.cache.store("fabrics", &fabrics).await?;
        println!("  ✓ fabrics ({})", fabrics.len());

        println!();
        println!("Snapshots are available offline via '--cached'.");
        Ok(())
    }

    async fn watch(
        &self,
        config: &Config,
        interval: Duration,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let ctx = SyncContext::open(config)?;
        let remote = ctx.remote()?.clone();

        let mut monitor = ConnectivityMonitor::new();
        let probe = Arc::new(HttpProbe::new(remote.health_url(), PROBE_TIMEOUT));
        monitor.start(probe, interval);

        let coordinator = SyncCoordinator::start(
            ctx.queue.clone(),
            ctx.cache.clone(),
            Arc::new(remote),
            monitor.subscribe(),
        );

        println!("{}", coordinator.status_text().await);
        println!("Watching connectivity (Ctrl-C to stop)...");

        let mut phases = coordinator.phase_updates();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = phases.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    println!("{}", coordinator.status_text().await);
                }
            }
        }

        monitor.stop();
        println!();
        println!("{}", coordinator.status_text().await);
        coordinator.shutdown();
        Ok(())
    }
}
