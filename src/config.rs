//! Client configuration and the derived security mode.

use std::{borrow::Cow, path::PathBuf};

use typed_builder::TypedBuilder;

use crate::error::{Error, Result};

/// Named browser TLS fingerprints a dial may mimic.
///
/// `Random` re-rolls to a fresh member of this set (with randomized field
/// ordering where the underlying profile supports it) on every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fingerprint {
    Chrome,
    Firefox,
    Safari,
    Random,
}

impl Fingerprint {
    pub(crate) const ALL: [Fingerprint; 3] = [Fingerprint::Chrome, Fingerprint::Firefox, Fingerprint::Safari];
}

/// Which of the three recognized literal strings, if any, was configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TlsModeOption {
    System,
    Insecure,
}

impl TlsModeOption {
    fn parse(value: &str) -> Result<Option<Self>> {
        match value {
            "" => Ok(None),
            "system" => Ok(Some(Self::System)),
            "insecure" => Ok(Some(Self::Insecure)),
            other => Err(Error::builder(format!("unrecognized tls_mode {other:?}"))),
        }
    }
}

/// Immutable client configuration. Constructed once via
/// [`ClientConfig::builder`]; every field is read-only afterward.
#[derive(Clone, TypedBuilder)]
pub struct ClientConfig {
    /// "host:port" used for the HTTP Host header and TLS SNI.
    #[builder(setter(into))]
    pub remote_addr: Cow<'static, str>,

    /// Optional "ip:port" TCP connect override; `remote_addr` still supplies
    /// Host/SNI.
    #[builder(default, setter(into))]
    pub dial_addr: Option<Cow<'static, str>>,

    /// Optional bearer token sent as `X-Nerve-Token` on every Dial.
    #[builder(default, setter(into))]
    pub auth_token: Option<Cow<'static, str>>,

    /// Path to a caller-generated Ed25519 private key (mutual-auth mode).
    #[builder(default, setter(into))]
    pub private_key_path: Option<PathBuf>,

    /// Base64-encoded Ed25519 public key the peer's certificate must match.
    #[builder(default, setter(into))]
    pub server_public_key: Option<Cow<'static, str>>,

    /// One of `""`, `"system"`, `"insecure"`.
    #[builder(default, setter(into))]
    pub tls_mode: Cow<'static, str>,

    /// `None`, or one of the four named fingerprints.
    #[builder(default)]
    pub fingerprint: Option<Fingerprint>,
}

/// The derived security mode: a pure function of `ClientConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    CleartextH2c,
    SystemTls,
    InsecureTls,
    PinnedOnewayTls,
    PinnedMutualTls,
}

impl SecurityMode {
    /// Selection rule, first match wins.
    pub fn derive(config: &ClientConfig) -> Result<SecurityMode> {
        if let Some(mode) = TlsModeOption::parse(&config.tls_mode)? {
            return Ok(match mode {
                TlsModeOption::System => SecurityMode::SystemTls,
                TlsModeOption::Insecure => SecurityMode::InsecureTls,
            });
        }

        let has_key = config.private_key_path.is_some();
        let has_pin = config.server_public_key.is_some();

        Ok(match (has_key, has_pin) {
            (true, true) => SecurityMode::PinnedMutualTls,
            (true, false) | (false, true) => SecurityMode::PinnedOnewayTls,
            (false, false) => SecurityMode::CleartextH2c,
        })
    }

    /// URI scheme this mode dials with — "http" only for cleartext H2C.
    pub fn scheme(self) -> &'static str {
        match self {
            SecurityMode::CleartextH2c => "http",
            _ => "https",
        }
    }

    pub fn uses_tls(self) -> bool {
        !matches!(self, SecurityMode::CleartextH2c)
    }
}

impl ClientConfig {
    /// Splits `remote_addr` into its host portion, used for SNI/Host (never
    /// `dial_addr`).
    pub(crate) fn remote_host(&self) -> Result<&str> {
        self.remote_addr
            .rsplit_once(':')
            .map(|(host, _port)| host)
            .ok_or_else(|| Error::builder(format!("remote_addr {:?} is not host:port", self.remote_addr)))
    }

    /// The address the TCP connector should actually dial.
    pub(crate) fn dial_target(&self) -> &str {
        self.dial_addr.as_deref().unwrap_or(&self.remote_addr)
    }
}
