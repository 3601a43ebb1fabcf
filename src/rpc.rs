// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! JSON-RPC batch framing.
//!
//! Requests are framed with `alloy-json-rpc` so that the same packets flow
//! through the tower transport stack. Responses are flattened into
//! [`RpcOutput`]s; a node that answers a batch with a single object is
//! treated as having sent a one-element batch.

use alloy_json_rpc::{Id, Request, RequestPacket, ResponsePacket, ResponsePayload, SerializedRequest};
use serde_json::Value;

use crate::errors::{CallerError, DecodeError, RpcFailure};
use crate::query::RawQuery;

/// The value of a resolved cache entry: the node's JSON result, or the
/// JSON-RPC error it returned.
pub type QueryResult = Result<Value, RpcFailure>;

/// One response of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcOutput {
    /// Request id echoed by the node; `None` if it was not numeric
    pub id: Option<u64>,
    /// Result or RPC-level error
    pub result: QueryResult,
}

/// Serializes one query as a JSON-RPC 2.0 request with a numeric id.
pub fn serialize_request(id: u64, query: &RawQuery) -> Result<SerializedRequest, CallerError> {
    Request::new(query.method(), Id::Number(id), query.params())
        .serialize()
        .map_err(|source| CallerError::Serialize {
            id,
            method: query.method(),
            source,
        })
}

/// Frames serialized requests as a batch. The body is always a JSON array,
/// even for a single request.
pub fn batch_packet(requests: Vec<SerializedRequest>) -> RequestPacket {
    RequestPacket::Batch(requests)
}

/// Flattens a response packet into outputs in the order the node sent them.
pub fn outputs(packet: ResponsePacket) -> Result<Vec<RpcOutput>, DecodeError> {
    let responses = match packet {
        ResponsePacket::Single(response) => vec![response],
        ResponsePacket::Batch(responses) => responses,
    };
    responses
        .into_iter()
        .map(|response| {
            let id = match response.id {
                Id::Number(id) => Some(id),
                _ => None,
            };
            let result = match response.payload {
                ResponsePayload::Success(raw) => Ok(serde_json::from_str(raw.get())?),
                ResponsePayload::Failure(payload) => Err(RpcFailure::from(payload)),
            };
            Ok(RpcOutput { id, result })
        })
        .collect()
}
