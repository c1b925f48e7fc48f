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

// src/supervisor.rs
// Launches one worker per configured server and awaits the first that
// exits unexpectedly. A worker loop never returns on its own (see
// worker.rs) except via cancellation, so the only ways a join resolves
// before shutdown are a panic inside the spawned task or (defensively)
// the loop returning at all -- either is treated as fatal.

use std::sync::Arc;

use pbxmirror_config::ServerConfig;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::registry::GlobalRegistry;
use crate::worker::run_worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorOutcome {
    // The root token was cancelled (e.g. SIGINT/SIGTERM) and every
    // worker observed it and returned. Maps to exit code 0.
    Shutdown,
    // A worker ended without the root having been cancelled. Maps to
    // a distinguished non-zero exit code.
    WorkerFailed,
}

// run spawns one worker per server, each with its own child of `root`,
// and blocks until the first join resolves. If that happened because
// `root` was cancelled, every remaining worker is drained and the
// function returns `Shutdown`; otherwise `root` is cancelled (so the
// rest of the fleet unwinds too) and `WorkerFailed` is returned.
pub async fn run(servers: Vec<ServerConfig>, registry: Arc<GlobalRegistry>, root: CancellationToken) -> SupervisorOutcome {
    let mut set: JoinSet<String> = JoinSet::new();
    for server in servers {
        let name = server.name.clone();
        let cancel = root.child_token();
        let registry = registry.clone();
        set.spawn(async move {
            run_worker(server, registry, cancel).await;
            name
        });
    }

    let first = set.join_next().await;

    if root.is_cancelled() {
        drain(&mut set).await;
        info!("all workers observed shutdown");
        return SupervisorOutcome::Shutdown;
    }

    match first {
        Some(Ok(name)) => error!(server = %name, "worker exited unexpectedly"),
        Some(Err(join_error)) => error!(error = %join_error, "worker task panicked"),
        None => error!("no workers were configured"),
    }

    root.cancel();
    drain(&mut set).await;
    SupervisorOutcome::WorkerFailed
}

async fn drain(set: &mut JoinSet<String>) {
    while set.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use regex::Regex;

    fn server_config(name: &str) -> ServerConfig {
        ServerConfig {
            name: name.to_string(),
            host: "127.0.0.1".to_string(),
            port: 1, // nothing listens here; login will fail and retry forever
            prefix: "asterisk".to_string(),
            timeout: Duration::from_millis(50),
            retry_interval: Duration::from_millis(20),
            username: "admin".to_string(),
            secret: "hunter2".to_string(),
            extension_pattern: Regex::new(r"^(\d+)$").unwrap(),
            device_format: "Custom:$0".to_string(),
        }
    }

    #[tokio::test]
    async fn cancelling_the_root_yields_a_clean_shutdown() {
        let registry = Arc::new(GlobalRegistry::new());
        let root = CancellationToken::new();

        let servers = vec![server_config("pbx-a"), server_config("pbx-b")];
        let run_root = root.clone();
        let handle = tokio::spawn(run(servers, registry, run_root));

        tokio::time::sleep(Duration::from_millis(40)).await;
        root.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("supervisor should shut down promptly")
            .unwrap();
        assert_eq!(outcome, SupervisorOutcome::Shutdown);
    }
}
