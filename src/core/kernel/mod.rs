//! Transport kernel - exchange-agnostic plumbing for REST and WebSocket I/O.
//!
//! The kernel contains no endpoint knowledge. It provides:
//!
//! - `RequestSigner` / `HmacSha256Signer`: keyed-hash request authentication
//! - `HttpTransport` / `ReqwestTransport`: HTTP execution against pre-built URLs
//! - `WsCodec`: inbound message decoding contract
//! - `WsSession` / `TungsteniteWs`: WebSocket connection management
//!
//! Everything is trait-based so tests can inject scripted transports.

pub mod codec;
pub mod rest;
pub mod signer;
pub mod ws;

pub use codec::WsCodec;
pub use rest::{HttpTransport, RawResponse, ReqwestTransport, TransportBuilder, TransportConfig};
pub use signer::{HmacSha256Signer, RequestSigner};
pub use ws::{TungsteniteWs, WsConfig, WsSession};
