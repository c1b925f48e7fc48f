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

// src/mapping.rs
// The pure Extension -> Device transformation: turns an (Exten,
// Status) pair from an AMI extension-state event into a (device,
// DeviceState) pair, or drops the event if Exten doesn't match the
// configured pattern.

use regex::Regex;

use crate::model::{DeviceState, ExtensionState};

// ExtensionEvent is the minimal shape we need out of an
// ExtensionStateList/WaitEvent result set to run the mapping.
#[derive(Debug, Clone)]
pub struct ExtensionEvent {
    pub exten: String,
    pub status: String,
}

// map_extension_event applies step 1-3 of the Extension -> Device
// mapping: pattern match, $0/$1.. substitution into device_format, and
// ExtensionState -> DeviceState. Returns None only if `exten` doesn't
// match `pattern` (the event is dropped). A `Status` that doesn't match
// any known ExtensionState is not dropped -- the mapping is total, so
// it becomes DeviceState::Unknown, same as the `Deactivated` row.
pub fn map_extension_event(
    event: &ExtensionEvent,
    pattern: &Regex,
    device_format: &str,
) -> Option<(String, DeviceState)> {
    if !pattern.is_match(&event.exten) {
        return None;
    }

    let device = pattern.replace(&event.exten, device_format).into_owned();
    let device_state = event
        .status
        .parse::<ExtensionState>()
        .map(|state| state.to_device_state())
        .unwrap_or(DeviceState::Unknown);

    Some((device, device_state))
}

// map_extension_events applies `map_extension_event` to a batch and
// folds duplicates so that, for devices computed more than once in the
// same batch, the *last* matching event wins -- this mirrors the
// last-wins rule used for duplicate devices in `listDeviceStates`.
pub fn map_extension_events(
    events: &[ExtensionEvent],
    pattern: &Regex,
    device_format: &str,
) -> std::collections::HashMap<String, DeviceState> {
    let mut result = std::collections::HashMap::new();
    for event in events {
        if let Some((device, state)) = map_extension_event(event, pattern, device_format) {
            result.insert(device, state);
        }
    }
    result
}
