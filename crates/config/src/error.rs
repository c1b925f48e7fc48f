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

// src/error.rs
// Errors raised while loading and validating configuration. All are
// fatal at startup; none are retried.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    // Figment covers both "file not found/unreadable" and "TOML syntax
    // error" -- it does not distinguish the two in its own error type,
    // so we surface its message as-is rather than trying to reclassify it.
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
    #[error("duplicate server name: {0}")]
    DuplicateServerName(String),
    #[error("server {server}: {field} must be positive, got {value}")]
    NonPositiveDuration {
        server: String,
        field: &'static str,
        value: String,
    },
    #[error("server {server}: port must be nonzero")]
    InvalidPort { server: String },
    #[error("no servers configured")]
    NoServers,
}
