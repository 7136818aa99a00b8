use jwt_simple::algorithms::RS256KeyPair;
use jwt_simple::prelude::*;

use crate::errors::ConnectionError;

/// Sign the key-pair authentication token Snowflake expects in the `Authorization` header.
///
/// The issuer carries the SHA-256 fingerprint of the public key, which is how
/// Snowflake matches the token to the key registered for the user.
pub fn create_token(
    key_pair: &RS256KeyPair,
    mut account_identifier: &str,
    user: &str,
) -> Result<String, ConnectionError> {
    let mut public_key_fingerprint = key_pair.public_key().sha256_thumbprint();
    // Undo the URL-safe base64 encoding
    public_key_fingerprint = public_key_fingerprint.replace('-', "+").replace('_', "/");
    while public_key_fingerprint.len() % 4 != 0 {
        public_key_fingerprint.push('=');
    }
    log::debug!("Public key fingerprint: {}", public_key_fingerprint);
    // If there is an account region included, remove it:
    // AAA00000.us-east-1 should become AAA00000
    if let Some(dot) = account_identifier.find('.') {
        account_identifier = &account_identifier[..dot];
    }
    let qualified_username = format!("{account_identifier}.{user}");
    let issuer = format!("{qualified_username}.SHA256:{public_key_fingerprint}");
    let claims = Claims::create(Duration::from_mins(59))
        .with_issuer(issuer)
        .with_subject(qualified_username);
    log::debug!("Claims: {:?}", claims);
    Ok(key_pair.sign(claims)?)
}
