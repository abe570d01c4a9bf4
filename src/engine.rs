//! Client Engine: the process-wide owner of the current HTTP Client
//! Instance, the failure counter, and the Dial orchestrator.

use std::{
    sync::{Arc, RwLock},
    time::Instant,
};

use http::{Method, Request, StatusCode};

use crate::{
    breaker::{Action, CircuitBreaker, RESET_BACKOFF},
    config::{ClientConfig, SecurityMode},
    dialer::HANDSHAKE_DEADLINE,
    error::{Error, Result},
    instance::HttpClientInstance,
    stream::{duplex_body, SessionStream},
};

/// Owns exactly one current [`HttpClientInstance`] at a time. Readers
/// (`dial`'s snapshot step) take the lock shared; a reset takes it
/// exclusive, so readers always observe a consistent instance pointer.
pub struct ClientEngine {
    config: ClientConfig,
    mode: SecurityMode,
    instance: RwLock<Arc<HttpClientInstance>>,
    breaker: CircuitBreaker,
}

impl ClientEngine {
    /// Constructs the engine and its first HTTP Client Instance.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mode = SecurityMode::derive(&config)?;
        let instance = Arc::new(HttpClientInstance::build(&config, mode)?);

        Ok(Self {
            config,
            mode,
            instance: RwLock::new(instance),
            breaker: CircuitBreaker::new(),
        })
    }

    /// The derived security mode this engine was constructed with. Fixed
    /// for the engine's lifetime; the scheme it implies never changes.
    pub fn security_mode(&self) -> SecurityMode {
        self.mode
    }

    /// Opens a duplex session stream for one proxied connection, tagged
    /// with a protocol name and an optional opaque target.
    pub async fn dial(&self, protocol: &str, target: &str) -> Result<SessionStream> {
        // Snapshot the current instance under the shared-read lock.
        let instance = { self.instance.read().expect("instance lock poisoned").clone() };

        // In-memory pipe: the read half becomes the outgoing request body,
        // the write half is handed to the caller.
        let (writer, body) = duplex_body();

        let uri = format!("{}://{}/", instance.scheme, instance.authority);
        let mut builder = Request::builder().method(Method::POST).uri(uri).header("X-Nerve-Protocol", protocol);
        if !target.is_empty() {
            builder = builder.header("X-Nerve-Target", target);
        }
        if let Some(token) = &self.config.auth_token {
            builder = builder.header("X-Nerve-Token", token.as_ref());
        }
        let request = builder.body(body).map_err(Error::network)?;

        // Dispatched on a parallel task: the client blocks until response
        // headers arrive, but the server won't produce headers until the
        // caller has started writing to `writer` — running the dispatch
        // separately avoids a self-deadlock.
        let client = instance.client.clone();
        let dispatch = tokio::spawn(async move { client.request(request).await });
        let abort_handle = dispatch.abort_handle();

        let started = Instant::now();
        let outcome = tokio::time::timeout(HANDSHAKE_DEADLINE, dispatch).await;

        let dial_result = match outcome {
            Ok(Ok(Ok(response))) => {
                if response.status() != StatusCode::OK {
                    Err(Error::server_rejected(response.status()))
                } else {
                    self.breaker.record_success();
                    log::debug!(
                        "phoenix: dial protocol={protocol} established in {:?}",
                        started.elapsed()
                    );
                    return Ok(SessionStream::new(writer, response.into_body()));
                }
            }
            Ok(Ok(Err(e))) => Err(Error::network(e)),
            Ok(Err(join_err)) => Err(Error::network(join_err)),
            Err(_elapsed) => {
                // Losing the race orphans the dispatch task; abort it so an
                // eventual response doesn't linger and hold an H2 stream open.
                abort_handle.abort();
                Err(Error::dial_timeout())
            }
        };

        let err = dial_result.expect_err("success path returned above");
        if err.counts_toward_breaker() {
            log::warn!("phoenix: dial protocol={protocol} failed: {err}");
            if self.breaker.record_failure().await == Action::Rebuild {
                if let Err(rebuild_err) = self.rebuild().await {
                    log::warn!("phoenix: failed to rebuild http client instance: {rebuild_err}");
                }
            }
        }

        Err(err)
    }

    /// Destroys the current instance and builds a fresh one, forcing new
    /// DNS resolution, a new TCP handshake, and a new TLS ClientHello.
    async fn rebuild(&self) -> Result<()> {
        let new_instance = Arc::new(HttpClientInstance::build(&self.config, self.mode)?);
        let old = {
            let mut guard = self.instance.write().expect("instance lock poisoned");
            std::mem::replace(&mut *guard, new_instance)
        };
        old.close();
        log::info!("phoenix: http client instance rebuilt (mode={:?})", self.mode);
        tokio::time::sleep(RESET_BACKOFF).await;
        Ok(())
    }

    /// Test-only: the number of consecutive recorded failures.
    #[cfg(any(test, feature = "testing"))]
    pub fn failure_count(&self) -> u32 {
        self.breaker.failure_count()
    }

    /// Test-only: a stable identity for the current instance pointer, so
    /// tests can assert a rebuild actually swapped it out.
    #[cfg(any(test, feature = "testing"))]
    pub fn instance_ptr(&self) -> usize {
        Arc::as_ptr(&self.instance.read().expect("instance lock poisoned")) as usize
    }
}

impl std::fmt::Debug for ClientEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientEngine").field("mode", &self.mode).finish_non_exhaustive()
    }
}
