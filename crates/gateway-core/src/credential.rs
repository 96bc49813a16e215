//! The narrow capability Router/drivers use to fetch provider credentials.
//!
//! Grounded on `secrecy::SecretString` usage throughout the teacher's
//! `gateway-security` and `gateway-providers` crates — credentials are
//! never exposed through `Debug` and are only unwrapped at the point of
//! use (building an HTTP request).

use secrecy::SecretString;

/// The kinds of credential a configured provider driver may need. The
/// Offline driver requires none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Bearer token for an `OpenAiChat` provider.
    OpenAi,
    /// Generic bearer/API-key credential, keyed by provider id, for
    /// providers whose credential doesn't fit a well-known kind.
    Generic,
}

/// Capability for fetching provider credentials lazily, by kind. A caller
/// supplies an implementation (e.g. reading environment variables or a
/// secrets manager); the gateway never reads process environment itself.
pub trait CredentialProvider: Send + Sync {
    /// Fetch the credential for `kind`, if present.
    fn get(&self, kind: CredentialKind) -> Option<SecretString>;
}

/// A `CredentialProvider` that never has any credential, matching a
/// deployment that only runs the Offline provider (or local/keyless
/// providers) and needs no secrets at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn get(&self, _kind: CredentialKind) -> Option<SecretString> {
        None
    }
}
