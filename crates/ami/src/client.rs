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

// src/client.rs
// A thin request/response client for Asterisk's `rawman` HTTP
// endpoint. Exposes exactly the operations this system needs -- login,
// the two enumeration listings, the long-polling wait, set-device-state,
// and logoff -- nothing more. Every operation is bounded by the
// configured timeout and linked to the caller's cancellation token.

use std::collections::HashMap;
use std::time::Duration;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::AmiError;
use crate::mapping::{self, ExtensionEvent};
use crate::model::DeviceState;
use crate::wire::{self, ResultSet};

// AmiClientConfig holds exactly what the client needs to talk to one
// server and run the extension->device mapping for that server. It is
// a plain, already-validated bag of values -- this crate has no
// knowledge of how configuration gets loaded (see pbxmirror-config).
#[derive(Debug, Clone)]
pub struct AmiClientConfig {
    pub host: String,
    pub port: u16,
    pub prefix: String,
    pub timeout: Duration,
    pub extension_pattern: Regex,
    pub device_format: String,
}

// AmiClient is a stateless (beyond the HTTP connection pool) handle to
// one Asterisk server's rawman endpoint. One instance is created per
// session, matching the per-session lifetime of login state in AMI
// itself -- see pbxmirror-core's worker loop.
pub struct AmiClient {
    http: reqwest::Client,
    base_url: Url,
    config: AmiClientConfig,
}

impl AmiClient {
    pub fn new(config: AmiClientConfig) -> Result<Self, AmiError> {
        let base_url = Url::parse(&format!(
            "http://{}:{}/{}/rawman",
            config.host, config.port, config.prefix
        ))
        .map_err(|e| AmiError::ProtocolError(format!("invalid server address: {e}")))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AmiError::ProtocolError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    pub async fn login(
        &self,
        username: &str,
        secret: &str,
        cancel: &CancellationToken,
    ) -> Result<(), AmiError> {
        let body = self
            .send_request("Login", &[("username", username), ("secret", secret)], cancel)
            .await?;
        let set = wire::parse_response(&body)?;
        wire::check_success(&set, "Success").map_err(|e| match e {
            AmiError::ProtocolError(msg) => AmiError::AuthError(msg),
            other => other,
        })
    }

    pub async fn logoff(&self, cancel: &CancellationToken) -> Result<(), AmiError> {
        let body = self.send_request("Logoff", &[], cancel).await?;
        let set = wire::parse_response(&body)?;
        wire::check_success(&set, "Goodbye")
    }

    // list_device_states issues DeviceStateChange with no parameters,
    // which asks Asterisk to enumerate every device's current state.
    // Keeps only DeviceStateChange events; last occurrence wins on
    // duplicate device names.
    pub async fn list_device_states(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, DeviceState>, AmiError> {
        let body = self.send_request("DeviceStateChange", &[], cancel).await?;
        let events = wire::parse_enumeration(&body, "DeviceStateChangeComplete")?;

        let mut result = HashMap::new();
        for event in events {
            if !is_event(&event, "DeviceStateChange") {
                continue;
            }
            let device = match event.first("Device") {
                Ok(Some(device)) => device,
                Ok(None) => {
                    warn!("DeviceStateChange event missing Device field, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "DeviceStateChange event has a malformed Device field, skipping");
                    continue;
                }
            };
            let state_str = match event.first("State") {
                Ok(Some(state)) => state,
                Ok(None) => {
                    warn!(device, "DeviceStateChange event missing State field, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(device, error = %e, "DeviceStateChange event has a malformed State field, skipping");
                    continue;
                }
            };
            match state_str.parse::<DeviceState>() {
                Ok(state) => {
                    result.insert(device.to_string(), state);
                }
                Err(e) => warn!(device, error = %e, "unparseable device state, skipping"),
            }
        }
        Ok(result)
    }

    // list_extension_states issues ExtensionStateList and applies the
    // Extension -> Device mapping (see mapping.rs) to every returned
    // event.
    pub async fn list_extension_states(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, DeviceState>, AmiError> {
        let body = self.send_request("ExtensionStateList", &[], cancel).await?;
        let events = wire::parse_enumeration(&body, "ExtensionStateListComplete")?;
        Ok(self.map_events(events))
    }

    // wait_for_extension_changes issues WaitEvent, which Asterisk holds
    // open server-side until something happens or `timeout` elapses.
    // An empty result is a legal outcome meaning nothing changed.
    pub async fn wait_for_extension_changes(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, DeviceState>, AmiError> {
        let body = self.send_request("WaitEvent", &[], cancel).await?;
        let events = wire::parse_enumeration(&body, "WaitEventComplete")?;
        Ok(self.map_events(events))
    }

    pub async fn set_device_state(
        &self,
        device: &str,
        state: DeviceState,
        cancel: &CancellationToken,
    ) -> Result<(), AmiError> {
        let variable = format!("DEVICE_STATE({device})");
        let value = state.to_string();
        let body = self
            .send_request("SetVar", &[("variable", &variable), ("value", &value)], cancel)
            .await?;
        let set = wire::parse_response(&body)?;
        wire::check_success(&set, "Success")
    }

    fn map_events(&self, events: Vec<ResultSet>) -> HashMap<String, DeviceState> {
        let extension_events: Vec<ExtensionEvent> = events
            .iter()
            .filter_map(|set| {
                let exten = set.first("Exten").ok().flatten()?;
                let status = set.first("Status").ok().flatten()?;
                Some(ExtensionEvent {
                    exten: exten.to_string(),
                    status: status.to_string(),
                })
            })
            .collect();

        mapping::map_extension_events(
            &extension_events,
            &self.config.extension_pattern,
            &self.config.device_format,
        )
    }

    async fn send_request(
        &self,
        action: &str,
        params: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<String, AmiError> {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", action);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }

        debug!(action, host = %self.config.host, "sending AMI request");

        let request = self.http.get(url).timeout(self.config.timeout);

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AmiError::Cancelled),
            result = request.send() => result,
        };

        let response = result.map_err(|e| {
            if e.is_timeout() {
                AmiError::Timeout {
                    host: self.config.host.clone(),
                    timeout_secs: self.config.timeout.as_secs(),
                }
            } else {
                AmiError::TransportError {
                    host: self.config.host.clone(),
                    source: e,
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(AmiError::ProtocolError(format!(
                "unexpected HTTP status {} from {}",
                response.status(),
                self.config.host
            )));
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AmiError::Cancelled),
            body = response.text() => body.map_err(|e| AmiError::TransportError {
                host: self.config.host.clone(),
                source: e,
            }),
        }
    }
}

fn is_event(set: &ResultSet, expected: &str) -> bool {
    matches!(set.first("Event"), Ok(Some(e)) if e.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(server: &mockito::ServerGuard) -> AmiClientConfig {
        let host_port = server.host_with_port();
        let (host, port) = host_port.split_once(':').unwrap();
        AmiClientConfig {
            host: host.to_string(),
            port: port.parse().unwrap(),
            prefix: "asterisk".to_string(),
            timeout: Duration::from_secs(5),
            extension_pattern: Regex::new(r"^(\d+)$").unwrap(),
            device_format: "Custom:$0".to_string(),
        }
    }

    #[tokio::test]
    async fn login_succeeds_on_response_success() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/asterisk/rawman")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("action".into(), "Login".into()),
                mockito::Matcher::UrlEncoded("username".into(), "admin".into()),
                mockito::Matcher::UrlEncoded("secret".into(), "hunter2".into()),
            ]))
            .with_status(200)
            .with_body("Response: Success\r\nMessage: Authentication accepted\r\n\r\n")
            .create_async()
            .await;

        let client = AmiClient::new(config_for(&server)).unwrap();
        client
            .login("admin", "hunter2", &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn login_failure_is_an_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/asterisk/rawman")
            .match_query(mockito::Matcher::UrlEncoded("action".into(), "Login".into()))
            .with_status(200)
            .with_body("Response: Error\r\nMessage: Authentication failed\r\n\r\n")
            .create_async()
            .await;

        let client = AmiClient::new(config_for(&server)).unwrap();
        let err = client
            .login("admin", "wrong", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AmiError::AuthError(_)));
    }

    #[tokio::test]
    async fn list_device_states_keeps_last_occurrence_on_duplicate_device() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/asterisk/rawman")
            .match_query(mockito::Matcher::UrlEncoded("action".into(), "DeviceStateChange".into()))
            .with_status(200)
            .with_body(
                "Response: Success\r\n\r\n\
                 Event: DeviceStateChange\r\nDevice: Custom:101\r\nState: INUSE\r\n\r\n\
                 Event: DeviceStateChange\r\nDevice: Custom:101\r\nState: BUSY\r\n\r\n\
                 Event: DeviceStateChangeComplete\r\n\r\n",
            )
            .create_async()
            .await;

        let client = AmiClient::new(config_for(&server)).unwrap();
        let states = client.list_device_states(&CancellationToken::new()).await.unwrap();
        assert_eq!(states.get("Custom:101"), Some(&DeviceState::Busy));
        assert_eq!(states.len(), 1);
    }

    #[tokio::test]
    async fn list_extension_states_applies_the_extension_to_device_mapping() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/asterisk/rawman")
            .match_query(mockito::Matcher::UrlEncoded("action".into(), "ExtensionStateList".into()))
            .with_status(200)
            .with_body(
                "Response: Success\r\n\r\n\
                 Event: ExtensionStatus\r\nExten: 101\r\nStatus: InUse\r\n\r\n\
                 Event: ExtensionStateListComplete\r\n\r\n",
            )
            .create_async()
            .await;

        let client = AmiClient::new(config_for(&server)).unwrap();
        let states = client.list_extension_states(&CancellationToken::new()).await.unwrap();
        assert_eq!(states.get("Custom:101"), Some(&DeviceState::InUse));
    }

    #[tokio::test]
    async fn wait_for_extension_changes_tolerates_an_empty_result() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/asterisk/rawman")
            .match_query(mockito::Matcher::UrlEncoded("action".into(), "WaitEvent".into()))
            .with_status(200)
            .with_body("Response: Success\r\n\r\nEvent: WaitEventComplete\r\n\r\n")
            .create_async()
            .await;

        let client = AmiClient::new(config_for(&server)).unwrap();
        let states = client
            .wait_for_extension_changes(&CancellationToken::new())
            .await
            .unwrap();
        assert!(states.is_empty());
    }

    #[tokio::test]
    async fn set_device_state_sends_the_expected_setvar_parameters() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/asterisk/rawman")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("action".into(), "SetVar".into()),
                mockito::Matcher::UrlEncoded("variable".into(), "DEVICE_STATE(Custom:101)".into()),
                mockito::Matcher::UrlEncoded("value".into(), "INUSE".into()),
            ]))
            .with_status(200)
            .with_body("Response: Success\r\n\r\n")
            .create_async()
            .await;

        let client = AmiClient::new(config_for(&server)).unwrap();
        client
            .set_device_state("Custom:101", DeviceState::InUse, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn logoff_expects_goodbye_not_success() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/asterisk/rawman")
            .match_query(mockito::Matcher::UrlEncoded("action".into(), "Logoff".into()))
            .with_status(200)
            .with_body("Response: Goodbye\r\n\r\n")
            .create_async()
            .await;

        let client = AmiClient::new(config_for(&server)).unwrap();
        client.logoff(&CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn an_already_cancelled_token_short_circuits_the_request() {
        let server = mockito::Server::new_async().await;
        let client = AmiClient::new(config_for(&server)).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client.logoff(&cancel).await.unwrap_err();
        assert!(matches!(err, AmiError::Cancelled));
    }
}
