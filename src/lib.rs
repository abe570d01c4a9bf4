//! HTTP/2-tunneled transport: one long-lived POST request/response pair
//! stands in for a raw bidirectional byte stream, with optional TLS
//! fingerprint spoofing and Ed25519 key pinning on the way in.
//!
//! The entry point is [`ClientEngine`]: build one from a [`ClientConfig`],
//! then call [`ClientEngine::dial`] once per proxied session. A single
//! engine owns its own HTTP/2 connection pool and rebuilds it automatically
//! after a run of consecutive dial failures.

mod breaker;
pub mod config;
mod connector;
mod dialer;
mod engine;
pub mod error;
mod instance;
mod stream;

pub use config::{ClientConfig, Fingerprint, SecurityMode};
pub use engine::ClientEngine;
pub use error::{Error, Result};
pub use stream::SessionStream;
