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
// The raw (as-deserialized) and validated (as-used) shapes of
// configuration. RawServerConfig mirrors the TOML schema field for
// field, with serde defaults; ServerConfig is what the rest of the
// program actually holds, and is only ever constructed by `loader::load`.

use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub(crate) struct RawConfig {
    #[serde(rename = "server", default)]
    pub servers: Vec<RawServerConfig>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawServerConfig {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_retry_interval", with = "humantime_serde")]
    pub retry_interval: Duration,
    pub username: String,
    pub secret: String,
    #[serde(with = "serde_regex")]
    pub extension_pattern: Regex,
    #[serde(default = "default_device_format")]
    pub device_format: String,
}

pub(crate) fn default_port() -> u16 {
    8088
}

pub(crate) fn default_prefix() -> String {
    "asterisk".to_string()
}

pub(crate) fn default_timeout() -> Duration {
    Duration::from_secs(45)
}

pub(crate) fn default_retry_interval() -> Duration {
    Duration::from_secs(30)
}

pub(crate) fn default_device_format() -> String {
    "Custom:$0".to_string()
}

// ServerConfig is the immutable, validated per-server configuration
// handed to the worker loop and forwarder. Constructed only by
// `loader::load` -- production code never builds one by hand.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub prefix: String,
    pub timeout: Duration,
    pub retry_interval: Duration,
    pub username: String,
    pub secret: String,
    pub extension_pattern: Regex,
    pub device_format: String,
}

// Config is the root configuration document: the full set of servers
// to mirror. Log level is deliberately absent here -- it is controlled
// purely by `RUST_LOG`, not by this file.
#[derive(Debug, Clone)]
pub struct Config {
    pub servers: Vec<ServerConfig>,
}
