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

// src/worker.rs
// Drives a single server through login -> seed -> poll-and-update,
// instantiating a Forwarder for the session and tearing it down on
// fault, with flat retry-with-backoff around the whole session.

use std::sync::Arc;

use pbxmirror_ami::{AmiClient, AmiClientConfig, AmiError};
use pbxmirror_config::ServerConfig;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::forwarder::{DeviceWriter, Forwarder};
use crate::registry::GlobalRegistry;
use crate::retry::try_or_wait;

// run_worker never returns Ok: the inner session only ends via an
// error (which is retried after `retry_interval`) or cancellation. The
// only way out is `cancel` firing, either directly or via the retry
// sleep being interrupted.
pub async fn run_worker(server: ServerConfig, registry: Arc<GlobalRegistry>, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        match try_or_wait(&server.name, run_session(&server, &registry, &cancel), server.retry_interval, &cancel).await {
            Ok(true) => unreachable!("a session never completes successfully"),
            Ok(false) => continue,
            Err(AmiError::Cancelled) => return,
            Err(other) => unreachable!("try_or_wait only ever yields Cancelled, got {other:?}"),
        }
    }
}

// run_session logs in, seeds a Forwarder from a fresh device-state
// listing, primes the global registry from this server's extension
// states, then long-polls forever. Any error tears down the Forwarder
// and best-effort logs off before propagating.
async fn run_session(
    server: &ServerConfig,
    registry: &Arc<GlobalRegistry>,
    cancel: &CancellationToken,
) -> Result<(), AmiError> {
    let client = Arc::new(AmiClient::new(AmiClientConfig {
        host: server.host.clone(),
        port: server.port,
        prefix: server.prefix.clone(),
        timeout: server.timeout,
        extension_pattern: server.extension_pattern.clone(),
        device_format: server.device_format.clone(),
    })?);

    client.login(&server.username, &server.secret, cancel).await?;

    let seed = client.list_device_states(cancel).await?;

    let forwarder_cancel = cancel.child_token();
    let forwarder = Forwarder::new(
        server.name.clone(),
        seed,
        client.clone() as Arc<dyn DeviceWriter>,
        server.retry_interval,
        registry.clone(),
        forwarder_cancel,
    );

    let result = poll_loop(&client, registry, cancel).await;

    forwarder.dispose().await;
    if let Err(e) = client.logoff(cancel).await {
        warn!(server = %server.name, error = %e, "logoff failed during session teardown");
    }

    result
}

async fn poll_loop(
    client: &Arc<AmiClient>,
    registry: &Arc<GlobalRegistry>,
    cancel: &CancellationToken,
) -> Result<(), AmiError> {
    registry.update(client.list_extension_states(cancel).await?);

    loop {
        if cancel.is_cancelled() {
            return Err(AmiError::Cancelled);
        }
        registry.update(client.wait_for_extension_changes(cancel).await?);
    }
}
