use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::{
    config::JwtConfig,
    error::{AppError, AppResult},
    state::AppState,
};

/// Signing and verification keys derived once from the immutable config.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    pub access_ttl: TimeDuration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            access_ttl: TimeDuration::minutes(cfg.ttl_minutes),
        }
    }

    /// Signs a token for `subject` valid for the configured access TTL.
    pub fn issue_access(&self, subject: &str) -> AppResult<String> {
        self.issue(subject, self.access_ttl)
    }

    pub fn issue(&self, subject: &str, ttl: TimeDuration) -> AppResult<String> {
        self.issue_at(subject, OffsetDateTime::now_utc(), ttl)
    }

    fn issue_at(&self, subject: &str, now: OffsetDateTime, ttl: TimeDuration) -> AppResult<String> {
        let exp = now + ttl;
        let claims = Claims {
            sub: subject.to_owned(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("jwt encode: {e}")))?;
        debug!(alg = ?self.algorithm, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Returns the embedded subject of a valid token.
    ///
    /// Signature mismatch, malformed input and a header algorithm other than
    /// the configured one all yield `TokenInvalid`. A token is expired once
    /// the current time reaches `exp`.
    pub fn verify(&self, token: &str) -> AppResult<String> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            let err = match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::TokenInvalid,
            };
            debug!(reason = ?e.kind(), "jwt rejected");
            err
        })?;

        if OffsetDateTime::now_utc().unix_timestamp() >= data.claims.exp {
            debug!("jwt rejected at expiry boundary");
            return Err(AppError::TokenExpired);
        }
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, algorithm: Algorithm) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            algorithm,
            ttl_minutes: 30,
        })
    }

    #[test]
    fn issue_and_verify_returns_subject() {
        let keys = make_keys("dev-secret", Algorithm::HS256);
        let token = keys.issue_access("a@x.com").expect("sign access");
        assert_eq!(keys.verify(&token).expect("verify token"), "a@x.com");
    }

    #[test]
    fn subject_is_returned_unchanged() {
        let keys = make_keys("dev-secret", Algorithm::HS384);
        let subject = "Mixed.Case+tag@Example.org";
        let token = keys.issue(subject, TimeDuration::seconds(60)).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), subject);
    }

    #[test]
    fn elapsed_ttl_is_expired() {
        let keys = make_keys("dev-secret", Algorithm::HS256);
        let issued = OffsetDateTime::now_utc() - TimeDuration::minutes(10);
        let token = keys
            .issue_at("a@x.com", issued, TimeDuration::minutes(5))
            .unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::TokenExpired)));
    }

    #[test]
    fn token_is_expired_exactly_at_exp() {
        let keys = make_keys("dev-secret", Algorithm::HS256);
        let ttl = TimeDuration::minutes(5);
        let issued = OffsetDateTime::now_utc() - ttl;
        let token = keys.issue_at("a@x.com", issued, ttl).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::TokenExpired)));
    }

    #[test]
    fn other_secret_is_invalid() {
        let ours = make_keys("our-secret", Algorithm::HS256);
        let theirs = make_keys("their-secret", Algorithm::HS256);
        let token = theirs.issue_access("a@x.com").unwrap();
        assert!(matches!(ours.verify(&token), Err(AppError::TokenInvalid)));
    }

    #[test]
    fn expired_token_with_other_secret_is_invalid_not_expired() {
        let ours = make_keys("our-secret", Algorithm::HS256);
        let theirs = make_keys("their-secret", Algorithm::HS256);
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let token = theirs
            .issue_at("a@x.com", issued, TimeDuration::minutes(1))
            .unwrap();
        assert!(matches!(ours.verify(&token), Err(AppError::TokenInvalid)));
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let ours = make_keys("shared-secret", Algorithm::HS256);
        let confused = make_keys("shared-secret", Algorithm::HS512);
        let token = confused.issue_access("a@x.com").unwrap();
        assert!(matches!(ours.verify(&token), Err(AppError::TokenInvalid)));
    }

    #[test]
    fn spliced_payload_is_invalid() {
        let keys = make_keys("dev-secret", Algorithm::HS256);
        let alice = keys.issue_access("alice@x.com").unwrap();
        let mallory = keys.issue_access("mallory@x.com").unwrap();

        let a: Vec<&str> = alice.split('.').collect();
        let m: Vec<&str> = mallory.split('.').collect();
        let forged = format!("{}.{}.{}", a[0], m[1], a[2]);

        assert!(matches!(keys.verify(&forged), Err(AppError::TokenInvalid)));
    }

    #[test]
    fn garbage_is_invalid() {
        let keys = make_keys("dev-secret", Algorithm::HS256);
        assert!(matches!(keys.verify(""), Err(AppError::TokenInvalid)));
        assert!(matches!(keys.verify("not.a.jwt"), Err(AppError::TokenInvalid)));
    }
}
