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

//! Client for Asterisk's `rawman` HTTP management interface, scoped to
//! exactly the operations needed to mirror extension state onto
//! `Custom:` devices: login, the device/extension enumerations, the
//! long-polling wait for changes, writing a device state, and logoff.

mod client;
mod error;
mod mapping;
mod model;
mod wire;

pub use client::{AmiClient, AmiClientConfig};
pub use error::AmiError;
pub use mapping::{map_extension_event, map_extension_events, ExtensionEvent};
pub use model::{DeviceState, ExtensionState, ParseDeviceStateError, ParseExtensionStateError};
pub use wire::ResultSet;
