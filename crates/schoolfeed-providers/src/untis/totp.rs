//! Time-based one-time passwords for secret login.
//!
//! WebUntis app secrets are RFC 4648 base32 strings. Codes follow RFC 6238
//! with HMAC-SHA1, a 30 second step and six digits.

use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::{ProviderError, ProviderResult};

/// Step length in seconds.
pub const TIME_STEP_SECS: u64 = 30;

/// Number of digits in a code.
pub const DIGITS: usize = 6;

/// Generates the code for `secret` at `unix_secs`.
///
/// # Errors
///
/// Returns a configuration error if the secret is not valid base32.
pub fn generate(secret: &str, unix_secs: u64) -> ProviderResult<String> {
    Ok(totp(secret)?.generate(unix_secs))
}

/// Builds the generator for a base32 secret.
///
/// App secrets are shorter than the 128 bits `TOTP::new` insists on, so the
/// unchecked constructor is used.
fn totp(secret: &str) -> ProviderResult<TOTP> {
    let key = decode_secret(secret)?;
    Ok(TOTP::new_unchecked(Algorithm::SHA1, DIGITS, 1, TIME_STEP_SECS, key))
}

/// Decodes base32, ignoring case, whitespace and padding.
fn decode_secret(input: &str) -> ProviderResult<Vec<u8>> {
    let normalized: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if normalized.is_empty() {
        return Err(ProviderError::configuration("secret is empty"));
    }

    Secret::Encoded(normalized)
        .to_bytes()
        .map_err(|e| ProviderError::configuration(format!("secret is not valid base32: {:?}", e)))
}
