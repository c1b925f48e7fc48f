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

// src/registry.rs
// The process-wide device -> DeviceState map. A change observed by any
// server's worker is written here and fanned out to every subscribed
// Forwarder, including forwarders running against other servers --
// this is how a BLF change seen on one PBX ends up mirrored onto all
// of them.
//
// The critical section (map mutation + fan-out) never awaits, so a
// plain std Mutex guards it rather than a tokio one -- there is nothing
// here that can hold the lock across network I/O.

use std::collections::HashMap;
use std::sync::Mutex;

use pbxmirror_ami::DeviceState;
use tokio::sync::mpsc;

pub type Batch = HashMap<String, DeviceState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    sender: mpsc::UnboundedSender<Batch>,
}

struct Inner {
    state: HashMap<String, DeviceState>,
    subscribers: HashMap<u64, Subscriber>,
    next_id: u64,
}

// GlobalRegistry is a singleton for the process lifetime, seeded empty.
// Every subscriber sees the exact same ordered sequence of batches:
// all bookkeeping for one `update` or `subscribe` call -- the map
// merge and every subscriber send -- happens while the single lock is
// held, so sends can never interleave across calls.
pub struct GlobalRegistry {
    inner: Mutex<Inner>,
}

impl Default for GlobalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: HashMap::new(),
                subscribers: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    // update atomically merges `batch` into the registry and delivers
    // it to every current subscriber. An empty batch (as happens when
    // `waitForExtensionChanges` reports no changes) is a legal no-op;
    // there is nothing to merge or deliver, so it returns without
    // touching the lock or any subscriber.
    pub fn update(&self, batch: Batch) {
        if batch.is_empty() {
            return;
        }
        let inner = &mut *self.inner.lock().expect("registry lock poisoned");
        for (device, state) in &batch {
            inner.state.insert(device.clone(), *state);
        }
        for subscriber in inner.subscribers.values() {
            // A closed receiver means the forwarder is mid-teardown and
            // will unsubscribe shortly; dropping the batch here is safe,
            // nothing reads from a channel nobody owns anymore.
            let _ = subscriber.sender.send(batch.clone());
        }
    }

    // subscribe registers a new subscriber and immediately delivers a
    // snapshot of the full registry as its first batch, so a forwarder
    // joining mid-life starts from a known baseline rather than an
    // empty one.
    pub fn subscribe(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<Batch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = &mut *self.inner.lock().expect("registry lock poisoned");

        let id = inner.next_id;
        inner.next_id += 1;

        if !inner.state.is_empty() {
            let _ = tx.send(inner.state.clone());
        }

        inner.subscribers.insert(id, Subscriber { sender: tx });
        (SubscriptionId(id), rx)
    }

    // unsubscribe removes a subscriber. No further batches are
    // delivered to it after this call returns.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let inner = &mut *self.inner.lock().expect("registry lock poisoned");
        inner.subscribers.remove(&id.0);
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> HashMap<String, DeviceState> {
        self.inner.lock().expect("registry lock poisoned").state.clone()
    }
}
