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

// src/model.rs
// The two closed enumerations AMI speaks in: ExtensionState (reported
// on extension-state events) and DeviceState (what we read and write
// for Custom: devices), plus the fixed mapping between them.

use std::fmt;
use std::str::FromStr;

// ExtensionState is the bitmasked extension status AMI reports on
// ExtensionStatus/ExtensionStateList/WaitEvent events. The numeric
// values match the AST_EXTENSION_* constants in Asterisk itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ExtensionState {
    Removed,
    Deactivated,
    Idle,
    InUse,
    Busy,
    Unavailable,
    Ringing,
    InUseRinging,
    Hold,
    InUseHold,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized extension state: {0}")]
pub struct ParseExtensionStateError(String);

impl ExtensionState {
    pub const fn code(self) -> i32 {
        match self {
            ExtensionState::Removed => -2,
            ExtensionState::Deactivated => -1,
            ExtensionState::Idle => 0,
            ExtensionState::InUse => 1,
            ExtensionState::Busy => 2,
            ExtensionState::Unavailable => 4,
            ExtensionState::Ringing => 8,
            ExtensionState::InUseRinging => 9,
            ExtensionState::Hold => 16,
            ExtensionState::InUseHold => 17,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -2 => Some(ExtensionState::Removed),
            -1 => Some(ExtensionState::Deactivated),
            0 => Some(ExtensionState::Idle),
            1 => Some(ExtensionState::InUse),
            2 => Some(ExtensionState::Busy),
            4 => Some(ExtensionState::Unavailable),
            8 => Some(ExtensionState::Ringing),
            9 => Some(ExtensionState::InUseRinging),
            16 => Some(ExtensionState::Hold),
            17 => Some(ExtensionState::InUseHold),
            _ => None,
        }
    }

    // to_device_state applies the fixed, total ExtensionState ->
    // DeviceState mapping. InUse+Hold deliberately collapses onto the
    // same DeviceState as plain Hold -- this loses information but is
    // intentional, matching what Asterisk's own device-state mapping
    // does for Custom: devices.
    pub const fn to_device_state(self) -> DeviceState {
        match self {
            ExtensionState::Removed => DeviceState::Invalid,
            ExtensionState::Deactivated => DeviceState::Unknown,
            ExtensionState::Idle => DeviceState::NotInUse,
            ExtensionState::InUse => DeviceState::InUse,
            ExtensionState::Busy => DeviceState::Busy,
            ExtensionState::Unavailable => DeviceState::Unavailable,
            ExtensionState::Ringing => DeviceState::Ringing,
            ExtensionState::InUseRinging => DeviceState::RingInUse,
            ExtensionState::Hold => DeviceState::OnHold,
            ExtensionState::InUseHold => DeviceState::OnHold,
        }
    }
}

impl FromStr for ExtensionState {
    type Err = ParseExtensionStateError;

    // Parses case-insensitively; AMI uses `&` as a separator between
    // combined flags (`InUse&Ringing`), which we treat identically to
    // `_` (`InUse_Ringing`) before matching names. Also accepts the
    // bare numeric code, since some AMI responses report `Status` as
    // an integer rather than a name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('&', "_");

        if let Ok(code) = normalized.parse::<i32>()
            && let Some(state) = ExtensionState::from_code(code)
        {
            return Ok(state);
        }

        let state = match normalized.to_ascii_uppercase().as_str() {
            "REMOVED" => ExtensionState::Removed,
            "DEACTIVATED" => ExtensionState::Deactivated,
            "IDLE" => ExtensionState::Idle,
            "INUSE" => ExtensionState::InUse,
            "BUSY" => ExtensionState::Busy,
            "UNAVAILABLE" => ExtensionState::Unavailable,
            "RINGING" => ExtensionState::Ringing,
            "INUSE_RINGING" => ExtensionState::InUseRinging,
            "HOLD" => ExtensionState::Hold,
            "INUSE_HOLD" => ExtensionState::InUseHold,
            _ => return Err(ParseExtensionStateError(s.to_string())),
        };
        Ok(state)
    }
}

impl fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtensionState::Removed => "Removed",
            ExtensionState::Deactivated => "Deactivated",
            ExtensionState::Idle => "Idle",
            ExtensionState::InUse => "InUse",
            ExtensionState::Busy => "Busy",
            ExtensionState::Unavailable => "Unavailable",
            ExtensionState::Ringing => "Ringing",
            ExtensionState::InUseRinging => "InUse&Ringing",
            ExtensionState::Hold => "Hold",
            ExtensionState::InUseHold => "InUse&Hold",
        };
        f.write_str(name)
    }
}

// DeviceState is the closed set of states Asterisk's device-state core
// recognizes for `Custom:` devices. This is both what we read back
// from `DeviceStateChange` events and what we write with `SetVar`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeviceState {
    Unknown,
    NotInUse,
    InUse,
    Busy,
    Invalid,
    Unavailable,
    Ringing,
    RingInUse,
    OnHold,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized device state: {0}")]
pub struct ParseDeviceStateError(String);

impl FromStr for DeviceState {
    type Err = ParseDeviceStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let state = match s.to_ascii_uppercase().as_str() {
            "UNKNOWN" => DeviceState::Unknown,
            "NOT_INUSE" => DeviceState::NotInUse,
            "INUSE" => DeviceState::InUse,
            "BUSY" => DeviceState::Busy,
            "INVALID" => DeviceState::Invalid,
            "UNAVAILABLE" => DeviceState::Unavailable,
            "RINGING" => DeviceState::Ringing,
            "RINGINUSE" => DeviceState::RingInUse,
            "ONHOLD" => DeviceState::OnHold,
            _ => return Err(ParseDeviceStateError(s.to_string())),
        };
        Ok(state)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceState::Unknown => "UNKNOWN",
            DeviceState::NotInUse => "NOT_INUSE",
            DeviceState::InUse => "INUSE",
            DeviceState::Busy => "BUSY",
            DeviceState::Invalid => "INVALID",
            DeviceState::Unavailable => "UNAVAILABLE",
            DeviceState::Ringing => "RINGING",
            DeviceState::RingInUse => "RINGINUSE",
            DeviceState::OnHold => "ONHOLD",
        };
        f.write_str(name)
    }
}
