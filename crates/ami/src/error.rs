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
// Error types for the AMI-over-HTTP client.

use thiserror::Error;

// AmiError covers everything that can go wrong talking to a single
// Asterisk server over the rawman HTTP endpoint. Every variant here
// is considered retryable by callers except AuthError, which callers
// treat identically to ProtocolError (retry after retry_interval) --
// see TryOrWait in pbxmirror-core.
#[derive(Error, Debug)]
pub enum AmiError {
    // TransportError covers network/HTTP-layer failures: connection
    // refused, DNS failure, non-2xx status, a truncated body.
    #[error("AMI transport error talking to {host}: {source}")]
    TransportError {
        host: String,
        #[source]
        source: reqwest::Error,
    },
    // ProtocolError covers a malformed or rejected AMI response: a
    // missing Response field, a Response other than Success (or the
    // action-specific expected value), or a malformed enumeration.
    #[error("AMI protocol error: {0}")]
    ProtocolError(String),
    // AuthError is a ProtocolError raised specifically by the login
    // action. Kept distinct so callers can log it as an auth failure,
    // but it is handled identically to ProtocolError by the retry
    // policy.
    #[error("AMI login rejected: {0}")]
    AuthError(String),
    // Cancelled is returned when the cancellation token fires before
    // a response was received. Never counted as a transport/protocol
    // failure -- the caller must not retry it, and must not log it as
    // an error.
    #[error("AMI request cancelled")]
    Cancelled,
    // Timeout is returned when a request exceeds the server's
    // configured timeout. Treated as a TransportError by retry policy.
    #[error("AMI request to {host} timed out after {timeout_secs}s")]
    Timeout { host: String, timeout_secs: u64 },
}

impl AmiError {
    // is_retryable tells the caller whether TryOrWait should sleep and
    // retry, as opposed to propagating and tearing down the session.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AmiError::Cancelled)
    }
}
