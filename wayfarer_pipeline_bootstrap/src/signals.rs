// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Wires SIGINT/SIGTERM (and SIGHUP on Unix) to a [`ShutdownCoordinator`],
//! so a Ctrl-C between stages lets the current stage finish and then
//! stops the run - the executor only ever checks the coordinator's token
//! between stages, never mid-stage.

use crate::shutdown::ShutdownCoordinator;

/// Spawns a background task that waits for an interrupt/terminate signal
/// and initiates graceful shutdown on the given coordinator. Returns
/// immediately; the listener runs for the lifetime of the process.
pub fn install_shutdown_handler(coordinator: ShutdownCoordinator) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("received shutdown signal");
        coordinator.initiate_shutdown();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
        _ = sighup.recv() => {}
    }
}

#[cfg(windows)]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
