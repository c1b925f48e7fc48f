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

// src/forwarder.rs
// The per-server reconciliation engine. Subscribes to the GlobalRegistry
// at construction, and for every batch it receives, compares the newly
// observed state to what it believes the PBX currently has and issues
// `SetVar` writes to close the gap -- single-flight, with restoration
// logic if the target gets withdrawn mid-write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pbxmirror_ami::{AmiClient, AmiError, DeviceState};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::registry::{Batch, GlobalRegistry, SubscriptionId};
use crate::retry::try_or_wait;

// DeviceWriter is the "opaque write(device, state) operation" the
// specification describes -- it decouples the Forwarder from the
// concrete AmiClient so the reconciliation logic can be tested without
// a real HTTP server.
#[async_trait]
pub trait DeviceWriter: Send + Sync {
    async fn set_device_state(
        &self,
        device: &str,
        state: DeviceState,
        cancel: &CancellationToken,
    ) -> Result<(), AmiError>;
}

#[async_trait]
impl DeviceWriter for AmiClient {
    async fn set_device_state(
        &self,
        device: &str,
        state: DeviceState,
        cancel: &CancellationToken,
    ) -> Result<(), AmiError> {
        AmiClient::set_device_state(self, device, state, cancel).await
    }
}

struct State {
    current: HashMap<String, DeviceState>,
    pending: HashMap<String, DeviceState>,
    inflight: bool,
    disposed: bool,
}

struct Inner {
    server_name: String,
    writer: Arc<dyn DeviceWriter>,
    retry_interval: Duration,
    cancel: CancellationToken,
    state: Mutex<State>,
}

pub struct Forwarder {
    inner: Arc<Inner>,
    registry: Arc<GlobalRegistry>,
    subscription: SubscriptionId,
    recv_task: JoinHandle<()>,
}

impl Forwarder {
    // new subscribes to `registry` and spawns the task that consumes
    // batches from it. `seed` is the forwarder's starting belief about
    // the PBX's state, normally the result of a fresh `listDeviceStates`
    // call. `cancel` should be a token scoped to this forwarder's
    // session -- cancelling it aborts any in-flight write.
    pub fn new(
        server_name: impl Into<String>,
        seed: HashMap<String, DeviceState>,
        writer: Arc<dyn DeviceWriter>,
        retry_interval: Duration,
        registry: Arc<GlobalRegistry>,
        cancel: CancellationToken,
    ) -> Forwarder {
        let inner = Arc::new(Inner {
            server_name: server_name.into(),
            writer,
            retry_interval,
            cancel,
            state: Mutex::new(State {
                current: seed,
                pending: HashMap::new(),
                inflight: false,
                disposed: false,
            }),
        });

        let (subscription, mut rx) = registry.subscribe();

        let recv_inner = inner.clone();
        let recv_task = tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                handle_batch(&recv_inner, batch);
            }
        });

        Forwarder {
            inner,
            registry,
            subscription,
            recv_task,
        }
    }

    // dispose unsubscribes from the registry, cancels any in-flight
    // write, and waits for the batch-consuming task to drain. After
    // this returns, no further `set_device_state` calls will be
    // observed for this forwarder.
    pub async fn dispose(self) {
        {
            let mut state = self.inner.state.lock().expect("forwarder lock poisoned");
            state.disposed = true;
        }
        self.inner.cancel.cancel();
        self.registry.unsubscribe(self.subscription);
        let _ = self.recv_task.await;
    }

    #[cfg(test)]
    pub(crate) fn current_snapshot(&self) -> HashMap<String, DeviceState> {
        self.inner.state.lock().expect("forwarder lock poisoned").current.clone()
    }

    #[cfg(test)]
    pub(crate) fn pending_snapshot(&self) -> HashMap<String, DeviceState> {
        self.inner.state.lock().expect("forwarder lock poisoned").pending.clone()
    }
}

// handle_batch applies the reconciliation algorithm's step 1 to every
// entry in `batch`, then schedules a write task if one isn't already
// running and there's something left to converge.
fn handle_batch(inner: &Arc<Inner>, batch: Batch) {
    let picked = {
        let mut state = inner.state.lock().expect("forwarder lock poisoned");
        if state.disposed {
            return;
        }

        for (device, new_state) in batch {
            match state.current.get(&device) {
                Some(cur) if *cur == new_state => {
                    state.pending.remove(&device);
                }
                _ => {
                    state.pending.insert(device, new_state);
                }
            }
        }

        if !state.inflight && !state.pending.is_empty() {
            let entry = state.pending.iter().next().map(|(d, s)| (d.clone(), *s));
            if entry.is_some() {
                state.inflight = true;
            }
            entry
        } else {
            None
        }
    };

    if let Some((device, target)) = picked {
        tokio::spawn(run_write(inner.clone(), device, target));
    }
}

// run_write is the single-flight write loop from the specification:
// write, and on success either retire the target or, if it was
// withdrawn mid-write, schedule a revert back to what the PBX held
// beforehand. Runs until `pending` drains or cancellation fires.
async fn run_write(inner: Arc<Inner>, mut device: String, mut target: DeviceState) {
    loop {
        if inner.cancel.is_cancelled() {
            inner.state.lock().expect("forwarder lock poisoned").inflight = false;
            return;
        }

        let outcome = try_or_wait(
            &inner.server_name,
            inner.writer.set_device_state(&device, target, &inner.cancel),
            inner.retry_interval,
            &inner.cancel,
        )
        .await;

        let succeeded = match outcome {
            Ok(succeeded) => succeeded,
            Err(AmiError::Cancelled) => {
                inner.state.lock().expect("forwarder lock poisoned").inflight = false;
                return;
            }
            Err(_) => unreachable!("try_or_wait only returns AmiError::Cancelled"),
        };

        let next = {
            let mut state = inner.state.lock().expect("forwarder lock poisoned");

            if succeeded {
                match state.pending.get(&device).copied() {
                    Some(t) if t == target => {
                        state.pending.remove(&device);
                    }
                    Some(_) => {
                        // A newer target arrived while this write was in
                        // flight; leave it for the next iteration.
                    }
                    None => {
                        // Withdrawn mid-write: the PBX now holds `target`,
                        // but nothing wants it there anymore. Revert to
                        // what it held before this write.
                        if let Some(previous) = state.current.get(&device).copied() {
                            state.pending.insert(device.clone(), previous);
                        }
                    }
                }
                state.current.insert(device.clone(), target);
            }

            if state.pending.is_empty() {
                state.inflight = false;
                None
            } else {
                state.pending.iter().next().map(|(d, s)| (d.clone(), *s))
            }
        };

        match next {
            Some((next_device, next_target)) => {
                device = next_device;
                target = next_target;
            }
            None => return,
        }
    }
}
