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

// src/wire.rs
// Parser for the rawman text wire format: CRLF "Key: Value" lines,
// blank-line-separated result sets, response/event framing.
//
// Keys are matched case-insensitively; values have surrounding
// whitespace stripped. This module has no knowledge of AMI actions --
// it just turns bytes into result sets, and result sets into
// responses/enumerations per the framing rules in the protocol
// contract.

use crate::error::AmiError;

// A single "Key: Value" block, in wire order. Kept as a Vec rather than
// a map because a key (most notably `Message`) may legitimately repeat
// within one result set, and repeats must be newline-joined rather than
// overwrite one another.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    fields: Vec<(String, String)>,
}

impl ResultSet {
    // first returns the first value for `key`, matched case-insensitively.
    // Errors if the field is present more than once -- use `all` for
    // fields that are allowed to repeat (e.g. Message).
    pub fn first(&self, key: &str) -> Result<Option<&str>, AmiError> {
        let mut matching = self
            .fields
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str());

        let value = matching.next();
        if matching.next().is_some() {
            return Err(AmiError::ProtocolError(format!(
                "field {key} is present more than once"
            )));
        }
        Ok(value)
    }

    // all returns every value for `key`, matched case-insensitively, in
    // wire order.
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    // joined newline-joins every occurrence of `key`, which is how the
    // protocol contract says a repeated Message field should be
    // presented to the caller.
    pub fn joined(&self, key: &str) -> Option<String> {
        let values = self.all(key);
        if values.is_empty() {
            None
        } else {
            Some(values.join("\n"))
        }
    }
}

// parse_result_sets splits a rawman response body into its constituent
// result sets. Sets are separated by a blank line ("\r\n\r\n"); a
// lone "\n" also terminates a line, to tolerate servers that don't
// send the full CRLF.
//
// Quirk preserved verbatim: a body containing the four-byte sequence
// "\n\r\n\r" *within* what would otherwise be parsed as a single
// result set is rejected as containing multiple result sets where
// only one was expected. This is unusual relative to the normal
// "\r\n\r\n" separator, but the upstream AMI bridge this protocol was
// modeled on treats it this way, and callers of `parse_response`
// depend on the rejection to detect a certain class of malformed
// replies.
pub fn parse_result_sets(body: &str) -> Result<Vec<ResultSet>, AmiError> {
    let blocks: Vec<&str> = body.split("\r\n\r\n").collect();
    let mut sets = Vec::with_capacity(blocks.len());
    for block in blocks {
        let block = block.trim_matches(|c| c == '\r' || c == '\n');
        if block.is_empty() {
            continue;
        }
        sets.push(parse_one_result_set(block));
    }
    Ok(sets)
}

fn parse_one_result_set(block: &str) -> ResultSet {
    let mut fields = Vec::new();
    for line in block.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    ResultSet { fields }
}

// parse_response parses a body expected to contain exactly one result
// set with a `Response` field, applying the LF-CR-LF-CR quirk check
// against the whole body first.
pub fn parse_response(body: &str) -> Result<ResultSet, AmiError> {
    reject_embedded_marker(body)?;
    let mut sets = parse_result_sets(body)?;
    if sets.len() != 1 {
        return Err(AmiError::ProtocolError(format!(
            "expected exactly one result set in response, got {}",
            sets.len()
        )));
    }
    let set = sets.remove(0);
    if set.first("Response")?.is_none() {
        return Err(AmiError::ProtocolError(
            "response is missing the Response field".to_string(),
        ));
    }
    Ok(set)
}

// check_success validates a parsed response result set against the
// expected `Response` value for the action that produced it
// (`Success` for nearly everything, `Pong` for Ping, `Goodbye` for
// Logoff). Any other value -- including `Error` -- becomes a
// ProtocolError carrying the response's Message field(s), newline
// joined if repeated.
pub fn check_success(set: &ResultSet, expected: &str) -> Result<(), AmiError> {
    match set.first("Response")? {
        Some(value) if value.eq_ignore_ascii_case(expected) => Ok(()),
        Some(other) => {
            let message = set
                .joined("Message")
                .unwrap_or_else(|| "no message".to_string());
            Err(AmiError::ProtocolError(format!(
                "expected Response: {expected}, got {other}: {message}"
            )))
        }
        None => Err(AmiError::ProtocolError(
            "response is missing the Response field".to_string(),
        )),
    }
}

// parse_enumeration parses a body expected to contain one response set
// (Response: Success), zero or more event sets, and a final event set
// whose Event field equals `completion_event`. Returns the event sets
// that are not the completion marker, in wire order.
pub fn parse_enumeration(
    body: &str,
    completion_event: &str,
) -> Result<Vec<ResultSet>, AmiError> {
    reject_embedded_marker(body)?;
    let sets = parse_result_sets(body)?;

    let mut iter = sets.into_iter();
    let response = iter.next().ok_or_else(|| {
        AmiError::ProtocolError("enumeration response is missing the response set".to_string())
    })?;
    check_success(&response, "Success")?;

    let mut events: Vec<ResultSet> = iter.collect();
    let last = events.pop().ok_or_else(|| {
        AmiError::ProtocolError("enumeration response is missing the completion event".to_string())
    })?;

    match last.first("Event")? {
        Some(event) if event.eq_ignore_ascii_case(completion_event) => Ok(events),
        Some(other) => Err(AmiError::ProtocolError(format!(
            "expected completion event {completion_event}, got {other}"
        ))),
        None => Err(AmiError::ProtocolError(
            "last result set in enumeration is missing the Event field".to_string(),
        )),
    }
}

// reject_embedded_marker implements the quirky duplicate-result-set
// detection described above: "\n\r\n\r" inside the body (as opposed to
// the normal "\r\n\r\n" separator between sets) signals a malformed
// reply carrying more than one result set where the parser expects
// exactly one framed unit.
fn reject_embedded_marker(body: &str) -> Result<(), AmiError> {
    if body.contains("\n\r\n\r") {
        return Err(AmiError::ProtocolError(
            "response contains multiple result sets (embedded \\n\\r\\n\\r marker)".to_string(),
        ));
    }
    Ok(())
}
