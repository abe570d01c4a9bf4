//! TLS Verifier: pins the peer's identity to a raw Ed25519 subject public
//! key instead of a certificate-authority trust chain.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use boring::{pkey::Id, x509::X509};

use crate::error::{Error, Result};

/// Verifies a peer's leaf certificate against a pinned Ed25519 public key.
///
/// `expected` is `None` only in `PINNED_ONEWAY_TLS` mode when the caller set
/// a private key but no `server_public_key`. That configuration accepts any
/// peer while logging a loud warning rather than failing closed (kept here
/// as documented, intentional behavior; see DESIGN.md "empty
/// server_public_key").
#[derive(Debug, Clone)]
pub struct PinVerifier {
    expected: Option<String>,
}

impl PinVerifier {
    pub fn new(expected: Option<String>) -> Self {
        Self { expected }
    }

    /// Runs the pin comparison against a leaf certificate in DER form.
    pub fn verify(&self, leaf_der: &[u8]) -> Result<()> {
        let cert = X509::from_der(leaf_der).map_err(|e| Error::verify_failed(format!("failed to parse peer certificate: {e}")))?;

        let public_key = cert
            .public_key()
            .map_err(|e| Error::verify_failed(format!("failed to read subject public key: {e}")))?;

        if public_key.id() != Id::ED25519 {
            return Err(Error::verify_failed(format!(
                "peer certificate uses {:?}, not Ed25519",
                public_key.id()
            )));
        }

        let raw = public_key
            .raw_public_key()
            .map_err(|e| Error::verify_failed(format!("failed to extract raw Ed25519 key: {e}")))?;
        let actual = STANDARD.encode(raw);

        let Some(expected) = self.expected.as_deref() else {
            log::warn!(
                "phoenix: PINNED_ONEWAY_TLS configured without server_public_key; accepting peer key {actual} \
                 unconditionally. This connection is vulnerable to machine-in-the-middle attacks."
            );
            return Ok(());
        };

        if expected == actual {
            Ok(())
        } else {
            Err(Error::verify_failed(format!(
                "peer Ed25519 key mismatch: expected {expected}, got {actual}"
            )))
        }
    }
}
