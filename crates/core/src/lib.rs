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

//! The reconciliation core: a process-wide [`GlobalRegistry`] of
//! device state, a per-server [`Forwarder`] that reconciles it against
//! one Asterisk server, the session/worker loop ([`run_worker`]) that
//! drives a server through login/seed/poll, and [`run_supervisor`],
//! which runs one worker per configured server for the life of the
//! process.

mod forwarder;
mod registry;
mod retry;
mod supervisor;
mod worker;

pub use forwarder::{DeviceWriter, Forwarder};
pub use registry::{Batch, GlobalRegistry, SubscriptionId};
pub use retry::try_or_wait;
pub use supervisor::{run as run_supervisor, SupervisorOutcome};
pub use worker::run_worker;
