//! Adapter for the external identity collaborator.
//!
//! Every session establishment and every mutating call presents a bearer
//! token; this module verifies it and yields the caller's user id. Token
//! *issuance* belongs to the identity provider — `issue` exists so seed
//! tooling and tests can mint tokens against the same signing key.

use crate::error::{DomainErrorKind, Error};
use entity::Id;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};
use service::config::Config;

const TOKEN_ISSUER: &str = "bookswap";

/// Claims carried by a bookswap bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    pub(crate) exp: usize,
    pub(crate) iat: usize,
    pub(crate) iss: String,
}

/// Verifies a bearer token and returns the user id it asserts.
///
/// All failure modes — malformed token, bad signature, expired, wrong
/// issuer, non-uuid subject — are reported uniformly as `Unauthorized`.
pub fn verify(config: &Config, token: &str) -> Result<Id, Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[TOKEN_ISSUER]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.token_signing_key().as_bytes()),
        &validation,
    )
    .map_err(|err| {
        debug!("Rejected bearer token: {err}");
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Unauthorized,
        }
    })?;

    Id::parse_str(&token_data.claims.sub).map_err(|err| {
        debug!("Bearer token subject is not a user id: {err}");
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Unauthorized,
        }
    })
}

/// Mints a token for `user_id`, valid for `ttl_secs` seconds.
pub fn issue(config: &Config, user_id: Id, ttl_secs: i64) -> Result<String, Error> {
    let now = chrono::Utc::now().timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + ttl_secs) as usize,
        iat: now as usize,
        iss: TOKEN_ISSUER.to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.token_signing_key().as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify_back_to_the_same_user() {
        let config = Config::default();
        let user_id = Id::new_v4();

        let token = issue(&config, user_id, 60).expect("token should encode");
        let verified = verify(&config, &token).expect("token should verify");

        assert_eq!(verified, user_id);
    }

    #[test]
    fn garbage_tokens_are_unauthorized() {
        let config = Config::default();

        let result = verify(&config, "not-a-token");

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Unauthorized
        );
    }

    #[test]
    fn expired_tokens_are_unauthorized() {
        let config = Config::default();

        let token = issue(&config, Id::new_v4(), -120).expect("token should encode");
        let result = verify(&config, &token);

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Unauthorized
        );
    }
}
