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

// tests/multi_server_convergence.rs
// End-to-end scenario 5 from the specification: two servers, each with
// its own Forwarder, sharing one GlobalRegistry. A change observed on
// either server's behalf is fanned out to every subscribed Forwarder --
// including the one for the server the change originated on, since a
// Custom: device state never updates itself just because the extension
// it tracks changed -- and each Forwarder converges independently from
// its own view of `current`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pbxmirror_ami::{AmiError, DeviceState};
use pbxmirror_core::{DeviceWriter, Forwarder, GlobalRegistry};
use tokio_util::sync::CancellationToken;

struct RecordingWriter {
    calls: Mutex<Vec<(String, DeviceState)>>,
}

impl RecordingWriter {
    fn new() -> Self {
        Self { calls: Mutex::new(Vec::new()) }
    }

    fn calls(&self) -> Vec<(String, DeviceState)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceWriter for RecordingWriter {
    async fn set_device_state(
        &self,
        device: &str,
        state: DeviceState,
        _cancel: &CancellationToken,
    ) -> Result<(), AmiError> {
        self.calls.lock().unwrap().push((device.to_string(), state));
        Ok(())
    }
}

async fn wait_for(writer: &RecordingWriter, count: usize) {
    for _ in 0..200 {
        if writer.calls().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {count} call(s), got {:?}", writer.calls());
}

#[tokio::test]
async fn a_change_observed_by_either_server_is_mirrored_to_the_other() {
    let registry = Arc::new(GlobalRegistry::new());

    let writer_a = Arc::new(RecordingWriter::new());
    let writer_b = Arc::new(RecordingWriter::new());

    let forwarder_a = Forwarder::new(
        "pbx-a",
        HashMap::new(),
        writer_a.clone(),
        Duration::from_millis(20),
        registry.clone(),
        CancellationToken::new(),
    );
    let forwarder_b = Forwarder::new(
        "pbx-b",
        HashMap::new(),
        writer_b.clone(),
        Duration::from_millis(20),
        registry.clone(),
        CancellationToken::new(),
    );

    // Worker A observes 101 -> RINGING on its own server and reports it
    // to the global registry. Both forwarders start from an empty seed,
    // so both disagree with the new state and both write it -- A onto
    // its own server, B onto the mirror.
    registry.update(HashMap::from([("Custom:101".to_string(), DeviceState::Ringing)]));
    wait_for(&writer_a, 1).await;
    wait_for(&writer_b, 1).await;
    assert_eq!(writer_a.calls(), vec![("Custom:101".to_string(), DeviceState::Ringing)]);
    assert_eq!(writer_b.calls(), vec![("Custom:101".to_string(), DeviceState::Ringing)]);

    // Worker B subsequently observes 101 -> NOT_INUSE; both forwarders'
    // `current` now disagrees with the new state (both hold RINGING
    // from the previous round), so both write again.
    registry.update(HashMap::from([("Custom:101".to_string(), DeviceState::NotInUse)]));
    wait_for(&writer_a, 2).await;
    wait_for(&writer_b, 2).await;
    assert_eq!(
        writer_a.calls(),
        vec![
            ("Custom:101".to_string(), DeviceState::Ringing),
            ("Custom:101".to_string(), DeviceState::NotInUse),
        ]
    );
    assert_eq!(
        writer_b.calls(),
        vec![
            ("Custom:101".to_string(), DeviceState::Ringing),
            ("Custom:101".to_string(), DeviceState::NotInUse),
        ]
    );

    forwarder_a.dispose().await;
    forwarder_b.dispose().await;
}

#[tokio::test]
async fn extension_pattern_mismatch_never_reaches_the_registry() {
    // Mirrors scenario 6: the mapping step (exercised in
    // pbxmirror-ami::mapping) drops non-matching events before they
    // ever become a registry batch, so this is really an assertion
    // that the Forwarder side of the pipeline has nothing to do with
    // filtering -- it only ever sees what mapping let through.
    let registry = Arc::new(GlobalRegistry::new());
    let writer = Arc::new(RecordingWriter::new());
    let forwarder = Forwarder::new(
        "pbx-a",
        HashMap::new(),
        writer.clone(),
        Duration::from_millis(20),
        registry.clone(),
        CancellationToken::new(),
    );

    // An empty batch (as produced when every event in a poll response
    // was filtered out) is a legal no-op.
    registry.update(HashMap::new());
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(writer.calls().is_empty());

    forwarder.dispose().await;
}
