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

// src/loader.rs
// Loads a TOML config file into a RawConfig via figment, layers a
// small set of per-server environment overrides on top, then validates
// into the immutable Config the rest of the program uses.

use std::collections::HashSet;
use std::path::Path;

use figment::providers::{Format, Toml};
use figment::Figment;

use crate::error::ConfigError;
use crate::model::{Config, RawConfig, RawServerConfig, ServerConfig};

const ENV_PREFIX: &str = "PBXMIRROR_SERVER_";

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let mut raw: RawConfig = Figment::new().merge(Toml::file(path)).extract()?;

    for server in &mut raw.servers {
        apply_env_overrides(server);
    }

    validate(raw)
}

// apply_env_overrides lets an operator override `host`, `username`, and
// `secret` for one named server without editing the file -- handy for
// injecting secrets from a vault/orchestrator rather than writing them
// to disk. Every other field is file-only.
fn apply_env_overrides(server: &mut RawServerConfig) {
    let key = normalize_env_key(&server.name);

    if let Ok(value) = std::env::var(format!("{ENV_PREFIX}{key}_HOST")) {
        server.host = value;
    }
    if let Ok(value) = std::env::var(format!("{ENV_PREFIX}{key}_USERNAME")) {
        server.username = value;
    }
    if let Ok(value) = std::env::var(format!("{ENV_PREFIX}{key}_SECRET")) {
        server.secret = value;
    }
}

fn normalize_env_key(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

fn validate(raw: RawConfig) -> Result<Config, ConfigError> {
    if raw.servers.is_empty() {
        return Err(ConfigError::NoServers);
    }

    let mut seen_names = HashSet::with_capacity(raw.servers.len());
    let mut servers = Vec::with_capacity(raw.servers.len());

    for server in raw.servers {
        if !seen_names.insert(server.name.clone()) {
            return Err(ConfigError::DuplicateServerName(server.name));
        }

        if server.port == 0 {
            return Err(ConfigError::InvalidPort { server: server.name });
        }
        if server.timeout.is_zero() {
            return Err(ConfigError::NonPositiveDuration {
                server: server.name,
                field: "timeout",
                value: "0s".to_string(),
            });
        }
        if server.retry_interval.is_zero() {
            return Err(ConfigError::NonPositiveDuration {
                server: server.name,
                field: "retry_interval",
                value: "0s".to_string(),
            });
        }

        servers.push(ServerConfig {
            name: server.name,
            host: server.host,
            port: server.port,
            prefix: server.prefix,
            timeout: server.timeout,
            retry_interval: server.retry_interval,
            username: server.username,
            secret: server.secret,
            extension_pattern: server.extension_pattern,
            device_format: server.device_format,
        });
    }

    Ok(Config { servers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_well_formed_file_with_defaults_filled_in() {
        let file = write_toml(
            r#"
            [[server]]
            name = "pbx-a"
            host = "10.0.0.1"
            username = "admin"
            secret = "hunter2"
            extension_pattern = "^(\\d+)$"

            [[server]]
            name = "pbx-b"
            host = "10.0.0.2"
            username = "admin"
            secret = "hunter2"
            extension_pattern = "^(\\d+)$"
            "#,
        );

        let config = load(file.path()).unwrap();
        assert_eq!(config.servers.len(), 2);

        let a = &config.servers[0];
        assert_eq!(a.port, 8088);
        assert_eq!(a.prefix, "asterisk");
        assert_eq!(a.timeout, std::time::Duration::from_secs(45));
        assert_eq!(a.retry_interval, std::time::Duration::from_secs(30));
        assert_eq!(a.device_format, "Custom:$0");
    }

    #[test]
    fn duplicate_server_names_are_rejected() {
        let file = write_toml(
            r#"
            [[server]]
            name = "pbx-a"
            host = "10.0.0.1"
            username = "admin"
            secret = "hunter2"
            extension_pattern = "^(\\d+)$"

            [[server]]
            name = "pbx-a"
            host = "10.0.0.2"
            username = "admin"
            secret = "hunter2"
            extension_pattern = "^(\\d+)$"
            "#,
        );

        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateServerName(name) if name == "pbx-a"));
    }

    #[test]
    fn zero_retry_interval_is_rejected() {
        let file = write_toml(
            r#"
            [[server]]
            name = "pbx-a"
            host = "10.0.0.1"
            username = "admin"
            secret = "hunter2"
            extension_pattern = "^(\\d+)$"
            retry_interval = "0s"
            "#,
        );

        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveDuration { field: "retry_interval", .. }));
    }

    #[test]
    fn no_servers_is_rejected() {
        let file = write_toml("");
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NoServers));
    }

    #[test]
    fn env_override_takes_precedence_for_one_field_on_one_server() {
        let file = write_toml(
            r#"
            [[server]]
            name = "pbx-a"
            host = "10.0.0.1"
            username = "admin"
            secret = "file-secret"
            extension_pattern = "^(\\d+)$"
            "#,
        );

        // SAFETY: test runs single-threaded with respect to this env var;
        // no other test in this module reads or writes it.
        unsafe {
            std::env::set_var("PBXMIRROR_SERVER_PBX_A_SECRET", "env-secret");
        }
        let config = load(file.path()).unwrap();
        unsafe {
            std::env::remove_var("PBXMIRROR_SERVER_PBX_A_SECRET");
        }

        assert_eq!(config.servers[0].secret, "env-secret");
        assert_eq!(config.servers[0].host, "10.0.0.1");
    }
}
