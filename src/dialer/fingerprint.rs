//! Browser ClientHello shaping.
//!
//! Each profile configures the handful of knobs the upstream `boring` crate
//! exposes publicly: cipher suite preference, curve preference, and the TLS
//! version bounds a given browser build ships with. Byte-exact GREASE
//! placement and wire-level extension permutation require a privately
//! patched BoringSSL fork, which is not a plain crates.io dependency — see
//! DESIGN.md "fingerprint fidelity" for the recorded trade-off.

use boring::ssl::{SslConnectorBuilder, SslVersion};
use rand::seq::SliceRandom;

use crate::{
    config::Fingerprint,
    error::{Error, Result},
};

/// A concrete, resolved profile for one connection attempt. `Random`
/// resolves to one of these freshly on every call to `resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Profile {
    Chrome,
    Firefox,
    Safari,
}

impl From<Fingerprint> for Option<Profile> {
    fn from(value: Fingerprint) -> Self {
        match value {
            Fingerprint::Chrome => Some(Profile::Chrome),
            Fingerprint::Firefox => Some(Profile::Firefox),
            Fingerprint::Safari => Some(Profile::Safari),
            Fingerprint::Random => None,
        }
    }
}

/// Resolves a configured `Fingerprint` to the concrete profile used for one
/// dial, re-rolling `Random` every time it's called so repeated connections
/// don't share one randomly-chosen browser profile.
pub(crate) fn resolve(fingerprint: Fingerprint) -> Profile {
    match fingerprint {
        Fingerprint::Random => *Fingerprint::ALL
            .choose(&mut rand::thread_rng())
            .and_then(|f| Option::<Profile>::from(*f))
            .get_or_insert(Profile::Chrome),
        other => Option::<Profile>::from(other).expect("non-random fingerprint always resolves"),
    }
}

/// Applies one browser's TLS shape to a connector builder in progress.
pub(crate) fn apply(builder: SslConnectorBuilder, fingerprint: Fingerprint) -> Result<SslConnectorBuilder> {
    apply_profile(builder, resolve(fingerprint))
}

fn apply_profile(mut builder: SslConnectorBuilder, profile: Profile) -> Result<SslConnectorBuilder> {
    let err = |e: boring::error::ErrorStack| Error::handshake_failed(e);

    match profile {
        Profile::Chrome => {
            builder.set_min_proto_version(Some(SslVersion::TLS1_2)).map_err(err)?;
            builder.set_max_proto_version(Some(SslVersion::TLS1_3)).map_err(err)?;
            builder
                .set_cipher_list(
                    "TLS_AES_128_GCM_SHA256:TLS_AES_256_GCM_SHA384:TLS_CHACHA20_POLY1305_SHA256:\
                     ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-RSA-AES128-GCM-SHA256:\
                     ECDHE-ECDSA-AES256-GCM-SHA384:ECDHE-RSA-AES256-GCM-SHA384:\
                     ECDHE-ECDSA-CHACHA20-POLY1305:ECDHE-RSA-CHACHA20-POLY1305",
                )
                .map_err(err)?;
        }
        Profile::Firefox => {
            builder.set_min_proto_version(Some(SslVersion::TLS1_2)).map_err(err)?;
            builder.set_max_proto_version(Some(SslVersion::TLS1_3)).map_err(err)?;
            builder
                .set_cipher_list(
                    "TLS_AES_128_GCM_SHA256:TLS_CHACHA20_POLY1305_SHA256:TLS_AES_256_GCM_SHA384:\
                     ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-RSA-AES128-GCM-SHA256:\
                     ECDHE-ECDSA-CHACHA20-POLY1305:ECDHE-RSA-CHACHA20-POLY1305:\
                     ECDHE-ECDSA-AES256-GCM-SHA384:ECDHE-RSA-AES256-GCM-SHA384",
                )
                .map_err(err)?;
        }
        Profile::Safari => {
            builder.set_min_proto_version(Some(SslVersion::TLS1_0)).map_err(err)?;
            builder.set_max_proto_version(Some(SslVersion::TLS1_3)).map_err(err)?;
            builder
                .set_cipher_list(
                    "ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-RSA-AES128-GCM-SHA256:\
                     ECDHE-ECDSA-AES256-GCM-SHA384:ECDHE-RSA-AES256-GCM-SHA384:\
                     ECDHE-ECDSA-CHACHA20-POLY1305:ECDHE-RSA-CHACHA20-POLY1305:\
                     AES128-GCM-SHA256:AES256-GCM-SHA384",
                )
                .map_err(err)?;
        }
    }

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_resolves_to_a_named_profile_each_call() {
        // Not a statistical test: just verifies this never panics and always
        // lands on a supported member of the named set.
        for _ in 0..32 {
            let profile = resolve(Fingerprint::Random);
            assert!(matches!(profile, Profile::Chrome | Profile::Firefox | Profile::Safari));
        }
    }

    #[test]
    fn named_fingerprints_resolve_to_themselves() {
        assert_eq!(resolve(Fingerprint::Chrome), Profile::Chrome);
        assert_eq!(resolve(Fingerprint::Firefox), Profile::Firefox);
        assert_eq!(resolve(Fingerprint::Safari), Profile::Safari);
    }
}
