/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

// src/main.rs
// Entry point: parses `--config`/`--check-config`, loads and validates
// configuration, wires up the tracing subscriber, then hands the
// validated server list to the supervisor for the life of the process.
//
// Exit codes: 0 graceful stop, 1 a worker exited unexpectedly, 2 a
// configuration error, 70 an unhandled internal error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use pbxmirror_core::{run_supervisor, GlobalRegistry, SupervisorOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

const EXIT_OK: u8 = 0;
const EXIT_WORKER_FAILED: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_INTERNAL_ERROR: u8 = 70;

/// Mirrors Asterisk extension state onto Custom: device-state
/// variables across one or more AMI-over-HTTP servers.
#[derive(Parser, Debug)]
#[command(name = "pbxmirror")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Load and validate configuration, print a summary, and exit
    /// without starting any worker.
    #[arg(long)]
    check_config: bool,
}

fn init_logging() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();

    let config = match pbxmirror_config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, path = %cli.config.display(), "failed to load configuration");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    if cli.check_config {
        println!(
            "configuration OK: {} server(s) configured: {}",
            config.servers.len(),
            config
                .servers
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        return ExitCode::from(EXIT_OK);
    }

    info!(servers = config.servers.len(), "starting pbxmirror");

    let registry = Arc::new(GlobalRegistry::new());
    let root = CancellationToken::new();

    let supervisor_root = root.clone();
    let supervisor = tokio::spawn(run_supervisor(config.servers, registry, supervisor_root));

    match wait_for_shutdown_signal_or(root.clone()).await {
        ShutdownCause::Signal => {
            info!("shutdown signal received, stopping workers");
            root.cancel();
        }
        ShutdownCause::SupervisorDone => {}
    }

    match supervisor.await {
        Ok(SupervisorOutcome::Shutdown) => {
            info!("stopped pbxmirror");
            ExitCode::from(EXIT_OK)
        }
        Ok(SupervisorOutcome::WorkerFailed) => {
            tracing::error!("a server worker exited unexpectedly, stopping");
            ExitCode::from(EXIT_WORKER_FAILED)
        }
        Err(join_error) => {
            tracing::error!(error = %join_error, "supervisor task panicked");
            ExitCode::from(EXIT_INTERNAL_ERROR)
        }
    }
}

enum ShutdownCause {
    Signal,
    SupervisorDone,
}

// wait_for_shutdown_signal_or races SIGINT/SIGTERM against the root
// token already having been cancelled by the supervisor itself (e.g.
// every worker failed synchronously at startup), so we don't block on
// a signal forever if there's nothing left to shut down.
async fn wait_for_shutdown_signal_or(root: CancellationToken) -> ShutdownCause {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => ShutdownCause::Signal,
            _ = terminate.recv() => ShutdownCause::Signal,
            () = root.cancelled() => ShutdownCause::SupervisorDone,
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => ShutdownCause::Signal,
            () = root.cancelled() => ShutdownCause::SupervisorDone,
        }
    }
}
