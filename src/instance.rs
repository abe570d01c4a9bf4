//! HTTP Client Instance construction: an HTTP/2 transport plus its
//! connection pool, built fresh on every hard reset.

use std::time::Duration;

use http_body_util::combinators::BoxBody;
use hyper_util::{client::legacy::Client, rt::TokioExecutor};

use crate::{
    config::{ClientConfig, SecurityMode},
    connector::TunnelConnector,
    dialer::FingerprintingDialer,
    error::Result,
};

/// Ping keep-alive interval/timeout.
const PING_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) type RequestBody = BoxBody<bytes::Bytes, crate::error::BoxError>;

/// An HTTP/2 transport plus its connection pool. Always prior-knowledge
/// HTTP/2 — never HTTP/1.1, regardless of security mode.
///
/// Lifecycle: constructed fresh by [`HttpClientInstance::build`], destroyed
/// by [`HttpClientInstance::close`] (closes idle connections; the instance
/// itself is then simply dropped — there is no reuse after that).
pub(crate) struct HttpClientInstance {
    pub(crate) client: Client<TunnelConnector, RequestBody>,
    pub(crate) scheme: &'static str,
    pub(crate) authority: String,
}

impl HttpClientInstance {
    /// Builds a fresh instance for the given config/mode. Mode-specific
    /// dial behavior is encapsulated inside [`FingerprintingDialer`] — this
    /// function just wires transport-level HTTP/2 settings that are
    /// identical across all five modes.
    pub(crate) fn build(config: &ClientConfig, mode: SecurityMode) -> Result<Self> {
        let dialer = FingerprintingDialer::new(config, mode)?;
        let connector = TunnelConnector::new(dialer);

        let client = Client::builder(TokioExecutor::new())
            .http2_only(true)
            // Strict per-host concurrency is enforced by h2 honoring the
            // peer's SETTINGS_MAX_CONCURRENT_STREAMS; there is no separate
            // client-side cap to misconfigure here.
            .http2_keep_alive_interval(Some(PING_TIMEOUT))
            .http2_keep_alive_timeout(PING_TIMEOUT)
            // The tunnel must not close idle streams: disable the
            // read-idle-triggered connection close implied by keep-alive.
            .http2_keep_alive_while_idle(true)
            .build(connector);

        log::info!("phoenix: http client instance built (mode={mode:?})");

        Ok(Self {
            client,
            scheme: mode.scheme(),
            authority: config.remote_addr.to_string(),
        })
    }

    /// Destroys this instance: closes idle connections. There is no handle
    /// left to reuse afterward.
    pub(crate) fn close(&self) {
        self.client.close_idle_connections();
    }
}

impl std::fmt::Debug for HttpClientInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientInstance")
            .field("scheme", &self.scheme)
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}
