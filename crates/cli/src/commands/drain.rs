// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tracing::info;

use crate::config::{ProbeConfig, QueueConfig};
use crate::connectivity::{ConnectivityMonitor, ConnectivityState, TcpProbe};
use crate::error::{Error, Result};
use crate::handlers::register_shell_handlers;
use crate::queue::{OperationQueue, QueueStatus};
use crate::runtime::QueueRuntime;

use super::{open_queue, Settings};

/// Delivers pending operations through the configured command handlers.
///
/// Without a probe the network is assumed reachable. Returns once nothing
/// is left to deliver; terminal failures are reported, not fatal.
pub async fn run(settings: &Settings, probe: Option<String>, timeout: Option<u64>) -> Result<()> {
    let queue = open_queue(settings)?;
    register_shell_handlers(&queue, &settings.config.handlers);

    let before = queue.status();
    if before.is_idle() {
        println!("Nothing to deliver");
        return Ok(());
    }
    info!(pending = before.pending_count, "draining");

    let after = match probe_config(&settings.config, probe) {
        Some(probe) => {
            let source = TcpProbe::from_config(&probe)?;
            let monitor = ConnectivityMonitor::with_debounce(source, settings.config.debounce());
            let runtime = QueueRuntime::init(queue.clone(), monitor)?;
            let status = wait_idle(&queue, timeout).await;
            runtime.teardown();
            status?
        }
        None => {
            queue.on_connectivity_change(ConnectivityState::Online);
            wait_idle(&queue, timeout).await?
        }
    };

    for line in summarize(&before, &after) {
        println!("{}", line);
    }
    Ok(())
}

/// The `--probe` address wins over the configured one but keeps its timings.
pub(crate) fn probe_config(config: &QueueConfig, address: Option<String>) -> Option<ProbeConfig> {
    match (address, &config.probe) {
        (Some(address), Some(configured)) => Some(ProbeConfig {
            address,
            ..configured.clone()
        }),
        (Some(address), None) => Some(ProbeConfig::new(address)),
        (None, configured) => configured.clone(),
    }
}

async fn wait_idle(queue: &OperationQueue, timeout: Option<u64>) -> Result<QueueStatus> {
    let mut observer = queue.subscribe();
    let idle = observer.wait_until(QueueStatus::is_idle);
    let Some(secs) = timeout else {
        return Ok(idle.await.unwrap_or_else(|| queue.status()));
    };
    match tokio::time::timeout(Duration::from_secs(secs), idle).await {
        Ok(status) => Ok(status.unwrap_or_else(|| queue.status())),
        Err(_) => Err(Error::DrainTimeout {
            secs,
            pending: queue.status().pending_count,
        }),
    }
}

/// Describes what a drain achieved.
pub(crate) fn summarize(before: &QueueStatus, after: &QueueStatus) -> Vec<String> {
    let failed = after.failed_count.saturating_sub(before.failed_count);
    let delivered = before
        .pending_count
        .saturating_sub(after.pending_count)
        .saturating_sub(failed);

    let mut lines = vec![format!("Delivered {} operation(s)", delivered)];
    if failed > 0 {
        lines.push(format!("Failed {} operation(s)", failed));
        if let Some(error) = &after.last_error {
            lines.push(format!("Last error: {}", error));
        }
    }
    lines
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
