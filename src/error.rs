use std::{error::Error as StdError, fmt};

use http::StatusCode;

/// A `Result` alias where the `Err` case is `phoenix_transport::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// A boxed error type used for dynamic error handling.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The errors that may occur while dialing or operating a session stream.
///
/// `DialFailed`, `HandshakeFailed` and `VerifyFailed` all count toward the
/// circuit breaker, `ServerRejected` does not (the server is alive and
/// answered), and `AlreadyClosed` never escapes `SessionStream::close`.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
            }),
        }
    }

    pub(crate) fn dial_failed<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::DialFailed, Some(e))
    }

    pub(crate) fn handshake_failed<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::HandshakeFailed, Some(e))
    }

    pub(crate) fn verify_failed(message: impl Into<String>) -> Error {
        Error::new(Kind::VerifyFailed, Some(VerifyMessage(message.into())))
    }

    pub(crate) fn server_rejected(status: StatusCode) -> Error {
        Error::new(Kind::ServerRejected(status), None::<Error>)
    }

    pub(crate) fn dial_timeout() -> Error {
        Error::new(Kind::DialTimeout, None::<Error>)
    }

    pub(crate) fn network<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::NetworkError, Some(e))
    }

    pub(crate) fn already_closed() -> Error {
        Error::new(Kind::AlreadyClosed, None::<Error>)
    }

    pub(crate) fn builder(message: impl Into<String>) -> Error {
        Error::new(Kind::Builder, Some(VerifyMessage(message.into())))
    }
}

impl Error {
    /// Returns true if the underlying TCP connect failed.
    pub fn is_dial_failed(&self) -> bool {
        matches!(self.inner.kind, Kind::DialFailed)
    }

    /// Returns true if the TLS handshake failed.
    pub fn is_handshake_failed(&self) -> bool {
        matches!(self.inner.kind, Kind::HandshakeFailed)
    }

    /// Returns true if Ed25519 key pinning rejected the peer.
    pub fn is_verify_failed(&self) -> bool {
        matches!(self.inner.kind, Kind::VerifyFailed)
    }

    /// Returns the HTTP status the server rejected the session with, if any.
    pub fn server_rejected_status(&self) -> Option<StatusCode> {
        match self.inner.kind {
            Kind::ServerRejected(status) => Some(status),
            _ => None,
        }
    }

    /// Returns true if the 10-second handshake deadline elapsed.
    pub fn is_dial_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::DialTimeout)
    }

    /// Returns true if this is a generic network/transport error.
    pub fn is_network_error(&self) -> bool {
        matches!(self.inner.kind, Kind::NetworkError)
    }

    /// Returns true if this error counts toward the circuit breaker's
    /// consecutive-failure counter.
    pub(crate) fn counts_toward_breaker(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::DialFailed | Kind::HandshakeFailed | Kind::VerifyFailed | Kind::DialTimeout | Kind::NetworkError
        )
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("phoenix_transport::Error");
        builder.field("kind", &self.inner.kind);
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("invalid client configuration")?,
            Kind::DialFailed => f.write_str("tcp connect failed")?,
            Kind::HandshakeFailed => f.write_str("tls handshake failed")?,
            Kind::VerifyFailed => f.write_str("peer certificate failed pinning verification")?,
            Kind::ServerRejected(status) => write!(f, "server rejected session (status {status})")?,
            Kind::DialTimeout => f.write_str("dial deadline elapsed")?,
            Kind::NetworkError => f.write_str("network error")?,
            Kind::AlreadyClosed => f.write_str("session stream already closed")?,
        };

        if let Some(e) = &self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    Builder,
    DialFailed,
    HandshakeFailed,
    VerifyFailed,
    ServerRejected(StatusCode),
    DialTimeout,
    NetworkError,
    AlreadyClosed,
}

#[derive(Debug)]
struct VerifyMessage(String);

impl fmt::Display for VerifyMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for VerifyMessage {}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn error_is_send_and_sync() {
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn breaker_counting_matches_taxonomy() {
        assert!(Error::dial_failed("x").counts_toward_breaker());
        assert!(Error::handshake_failed("x").counts_toward_breaker());
        assert!(Error::verify_failed("x").counts_toward_breaker());
        assert!(Error::dial_timeout().counts_toward_breaker());
        assert!(Error::network("x").counts_toward_breaker());
        assert!(!Error::server_rejected(StatusCode::UNAUTHORIZED).counts_toward_breaker());
        assert!(!Error::already_closed().counts_toward_breaker());
    }

    #[test]
    fn display_includes_status_for_server_rejected() {
        let err = Error::server_rejected(StatusCode::UNAUTHORIZED);
        assert!(err.to_string().contains("401"));
        assert_eq!(err.server_rejected_status(), Some(StatusCode::UNAUTHORIZED));
    }
}
