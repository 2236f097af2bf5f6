//! jsonrpc2 Common Types and Transport
//!
//! This crate provides the wire-level pieces of the jsonrpc2 client: the
//! JSON-RPC 2.0 envelopes, the error taxonomy, the envelope codec, and the
//! transport adapters that perform one network exchange per call.
//!
//! # Overview
//!
//! - **Protocol Layer**: request/response envelopes, call options, correlation ids, errors
//! - **Transport Layer**: envelope codec, HTTP POST and raw TCP exchanges
//!
//! # Wire Protocol
//!
//! - **Request**: `{"method": ..., "params": [...], "id": "<hex>" | null, "jsonrpc": "2.0"}`
//! - **Response**: `{"jsonrpc": "2.0", "id": ..., "result": ...}` or `{..., "error": {...}}`
//! - **TCP framing**: one JSON value per connection, newline-delimited
//!
//! # Components
//!
//! - [`protocol`] - Envelopes, options, id generation, errors
//! - [`transport`] - Codec, transport modes, HTTP and TCP adapters
//!
//! # Example
//!
//! ```
//! use jsonrpc2_common::{CallOptions, SequentialIds};
//! use jsonrpc2_common::transport::JsonCodec;
//! use serde_json::json;
//!
//! let ids = SequentialIds::new("req");
//! let request = JsonCodec::encode_request("echo", json!("hello"), &CallOptions::default(), &ids);
//! assert_eq!(request.params, json!(["hello"]));
//!
//! let result = JsonCodec::classify(Some(json!({"jsonrpc": "2.0", "result": 42}))).unwrap();
//! assert_eq!(result, Some(json!(42)));
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
