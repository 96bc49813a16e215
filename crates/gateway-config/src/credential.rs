//! Default `CredentialProvider`: reads bearer tokens from process
//! environment variables, wrapping them in `secrecy::SecretString` so
//! they never appear in `Debug` output.

use gateway_core::{CredentialKind, CredentialProvider};
use secrecy::SecretString;

/// Environment variable consulted for `CredentialKind::OpenAi`.
pub const OPENAI_API_KEY_VAR: &str = "GATEWAY_OPENAI_API_KEY";
/// Environment variable consulted for `CredentialKind::Generic`.
pub const GENERIC_API_KEY_VAR: &str = "GATEWAY_API_KEY";

/// Reads credentials from `GATEWAY_OPENAI_API_KEY`/`GATEWAY_API_KEY` at
/// call time (not cached), so rotating the variable in the environment
/// takes effect on the next request without restarting the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialProvider;

impl CredentialProvider for EnvCredentialProvider {
    fn get(&self, kind: CredentialKind) -> Option<SecretString> {
        let var = match kind {
            CredentialKind::OpenAi => OPENAI_API_KEY_VAR,
            CredentialKind::Generic => GENERIC_API_KEY_VAR,
        };
        std::env::var(var).ok().map(SecretString::from)
    }
}
