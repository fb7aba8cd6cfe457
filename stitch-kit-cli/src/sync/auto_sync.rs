//! Auto-sync functionality for CLI commands.
//!
//! Provides automatic synchronization before read operations and after
//! write operations when `auto_sync` is enabled in the configuration.

use stitch_kit_core::sync::check_server;

use crate::config::Config;
use crate::sync::SyncContext;

/// Performs auto-sync if enabled and the server is reachable.
///
/// This function:
/// 1. Checks if auto_sync is enabled in config
/// 2. Checks if sync is configured (server_url and api_key present)
/// 3. Checks if the server is reachable
/// 4. Drains the pending-operation queue
///
/// Any errors are silently ignored to provide graceful degradation -
/// the CLI should work offline when the server is unavailable.
pub fn try_auto_sync(config: &Config) {
    if !config.sync.auto_sync || !config.sync.is_configured() {
        return;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(_) => return,
    };

    rt.block_on(async {
        let url = match config.sync.server_url.as_ref() {
            Some(url) => url,
            None => return,
        };

        // Check server reachability first (fast fail)
        if !check_server(url).await {
            eprintln!("Auto-sync: server unreachable, skipping");
            return;
        }

        let ctx = match SyncContext::open(config) {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        if ctx.queue.pending_count().await == 0 {
            return;
        }

        match ctx.drain_remote().await {
            Ok(_) => {}
            Err(e) => {
                eprintln!("Auto-sync: {}", e);
            }
        }
    });
}
