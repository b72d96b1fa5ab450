use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::{Cookie, Status};
use rocket::request::Request;
use rocket::time::OffsetDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::data::account::Account;
use crate::resp::problem::Problem;
use crate::util::date_time_as_unix_seconds;

pub static AUTH_COOKIE_NAME: &str = "jwt_auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Authorizes API requests.
    Access,
    /// Only exchangeable for a new access token.
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    pub jti: Uuid,
    pub user: i64,
    pub kind: TokenKind,
}

impl AuthToken {
    pub fn new(user: i64, kind: TokenKind, lifetime: Duration) -> AuthToken {
        let now = Utc::now();
        AuthToken {
            iat: now,
            exp: now + lifetime,
            jti: Uuid::new_v4(),
            user,
            kind,
        }
    }

    pub fn access(account: &Account, config: &Config) -> AuthToken {
        AuthToken::new(account.id, TokenKind::Access, config.access_token_lifetime())
    }

    pub fn refresh(account: &Account, config: &Config) -> AuthToken {
        AuthToken::new(
            account.id,
            TokenKind::Refresh,
            config.refresh_token_lifetime(),
        )
    }

    pub fn encode_jwt(
        &self,
        private_key: impl AsRef<[u8]>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let header = Header::new(Algorithm::PS256);
        let key = EncodingKey::from_rsa_pem(private_key.as_ref())?;

        encode(&header, &self, &key)
    }

    pub fn decode_jwt(
        token: &str,
        public_key: impl AsRef<[u8]>,
    ) -> Result<AuthToken, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_rsa_pem(public_key.as_ref())?;

        decode::<AuthToken>(token, &key, &Validation::new(Algorithm::PS256)).map(|data| data.claims)
    }

    pub fn cookie(
        &self,
        private_key: impl AsRef<[u8]>,
    ) -> Result<Cookie<'static>, jsonwebtoken::errors::Error> {
        Ok(
            Cookie::build((AUTH_COOKIE_NAME, self.encode_jwt(private_key)?))
                .secure(true)
                .expires(OffsetDateTime::from_unix_timestamp(self.exp.timestamp()).ok())
                .path("/")
                .http_only(true)
                .build(),
        )
    }
}

pub fn auth_problem(detail: impl ToString) -> Problem {
    Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
        .detail(detail)
        .clone()
}

fn bearer_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Reads the token from an `Authorization: Bearer` header, falling back to
/// the auth cookie.
pub fn extract_claims(req: &Request<'_>, public_key: impl AsRef<[u8]>) -> Result<AuthToken, Problem> {
    let token = match bearer_token(req) {
        Some(token) => token.to_string(),
        None => match req.cookies().get(AUTH_COOKIE_NAME) {
            Some(jwt) => jwt.value().to_owned(),
            None => return Err(auth_problem("No bearer token or JWT auth cookie.")),
        },
    };
    tracing::trace!("extracted jwt auth from request");

    match AuthToken::decode_jwt(&token, public_key) {
        Ok(it) => {
            tracing::debug!("decoded {:?} token for user: {}", it.kind, it.user);
            Ok(it)
        }
        Err(e) => {
            let mut problem = Problem::from(e);
            if problem.detail.is_none() {
                problem.detail("JWT was malformed.");
            }
            Err(problem)
        }
    }
}

pub mod doc {
    use utoipa::openapi::security::*;

    #[derive(Clone, Copy)]
    pub struct JWTAuth;

    impl From<JWTAuth> for SecurityScheme {
        fn from(_: JWTAuth) -> Self {
            let mut http = Http::new(HttpAuthScheme::Bearer);
            http.bearer_format = Some("JWT".to_string());
            SecurityScheme::Http(http)
        }
    }

    impl utoipa::Modify for JWTAuth {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(c) = openapi.components.as_mut() {
                c.add_security_scheme("jwt", *self)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use chrono::SubsecRound;

    #[test]
    fn jwt_configured_properly() {
        let now = Utc::now().round_subsecs(0);

        let token = AuthToken {
            iat: now,
            exp: now + Duration::weeks(1),
            jti: Uuid::new_v4(),
            user: 42,
            kind: TokenKind::Refresh,
        };

        let security = test_support::security();

        let encoded = token
            .encode_jwt(&security.jwt_keys.private)
            .expect("encoding should work for example");
        let decoded = AuthToken::decode_jwt(&encoded, &security.jwt_keys.public)
            .expect("unable to decode encoded token");

        assert_eq!(decoded, token);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let security = test_support::security();
        let token = AuthToken::new(1, TokenKind::Access, Duration::hours(-2));

        let encoded = token.encode_jwt(&security.jwt_keys.private).unwrap();
        let err = AuthToken::decode_jwt(&encoded, &security.jwt_keys.public)
            .expect_err("expired token must not decode");

        assert_eq!(
            Problem::from(err).title,
            "Expired JWT signature.".to_string()
        );
    }
}
