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

// src/retry.rs
// The one retry policy this codebase uses for AMI operations: run it
// once, and on a retryable failure sleep a flat `retry_interval`
// before telling the caller to try again. No exponential backoff --
// `retry_interval` is the single tunable an operator sets per server.

use std::future::Future;
use std::time::Duration;

use pbxmirror_ami::AmiError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

// try_or_wait runs `op` to completion.
// - `Ok(true)`: op succeeded.
// - `Ok(false)`: op failed with a retryable error; the failure was
//   logged and `retry_interval` was slept. The caller should try again.
// - `Err(AmiError::Cancelled)`: either `op` itself was cancelled, or
//   the retry sleep was cancelled. The caller must not retry.
pub async fn try_or_wait<Fut>(
    server: &str,
    op: Fut,
    retry_interval: Duration,
    cancel: &CancellationToken,
) -> Result<bool, AmiError>
where
    Fut: Future<Output = Result<(), AmiError>>,
{
    match op.await {
        Ok(()) => Ok(true),
        Err(e) if e.is_retryable() => {
            warn!(server, error = %e, "AMI operation failed, retrying after backoff");
            tokio::select! {
                () = cancel.cancelled() => Err(AmiError::Cancelled),
                () = tokio::time::sleep(retry_interval) => Ok(false),
            }
        }
        Err(e) => Err(e),
    }
}
