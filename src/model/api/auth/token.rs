use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{errors::Error as JwtError, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    db::user::User,
    mongodb::{Coll, Id},
};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

const BEARER_PREFIX: &str = "Bearer ";

/// An authentication token representing a specific user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    id: Id,
}

impl AuthToken {
    /// Create a new [`AuthToken`] for the given user.
    pub fn new(user: &User) -> Self {
        Self { id: user.id }
    }

    /// Get the user ID.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Sign this token into a JWT that expires after the configured TTL.
    pub fn encode(self, config: &Config) -> Result<String, JwtError> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
    }

    /// Verify and decode a JWT.
    pub fn decode(jwt: &str, config: &Config) -> Result<Self, JwtError> {
        jsonwebtoken::decode::<Claims>(
            jwt,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data| data.claims.token)
    }

    /// Wrap an encoded JWT into a cookie.
    pub fn cookie(jwt: String, config: &Config) -> Cookie<'static> {
        Cookie::build((AUTH_TOKEN_COOKIE, jwt))
            .path("/")
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .build()
    }
}

/// JWT claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Find the raw JWT in the request: an `Authorization: Bearer` header takes
/// precedence over the cookie.
fn raw_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    req.headers()
        .get_one("Authorization")
        .and_then(|header| header.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .or_else(|| req.cookies().get(AUTH_TOKEN_COOKIE).map(|c| c.value()))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Get an [`AuthToken`] from the request and check the user still exists.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let unauthorized =
            |msg: &str| Outcome::Error((Status::Unauthorized, Error::Unauthorized(msg.into())));

        let Some(config) = req.rocket().state::<Config>() else {
            error!("Config is not in managed state");
            return Outcome::Error((
                Status::InternalServerError,
                Error::Unauthorized("Server misconfigured".into()),
            ));
        };

        let Some(jwt) = raw_token(req) else {
            return unauthorized("Authentication required");
        };

        let token = match Self::decode(jwt, config) {
            Ok(token) => token,
            Err(e) => {
                debug!("Rejected auth token: {e}");
                return unauthorized("Invalid or expired token");
            }
        };

        // Check the user actually exists.
        let users = match req.guard::<Coll<User>>().await {
            Outcome::Success(users) => users,
            _ => {
                return Outcome::Error((
                    Status::InternalServerError,
                    Error::Unauthorized("Server misconfigured".into()),
                ))
            }
        };
        match users.find_one(token.id.as_doc(), None).await {
            Ok(Some(_)) => Outcome::Success(token),
            Ok(None) => unauthorized("User no longer exists"),
            Err(e) => Outcome::Error((Status::InternalServerError, e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::figment::Figment;

    fn config() -> Config {
        Figment::new()
            .join(("jwt_secret", "test secret"))
            .join(("auth_ttl", 60))
            .extract()
            .unwrap()
    }

    #[test]
    fn tokens_round_trip_and_reject_tampering() {
        let config = config();
        let token = AuthToken { id: Id::new() };
        let jwt = token.encode(&config).unwrap();
        assert_eq!(AuthToken::decode(&jwt, &config).unwrap(), token);

        let mut tampered = jwt.clone();
        tampered.pop();
        assert!(AuthToken::decode(&tampered, &config).is_err());

        let other: Config = Figment::new()
            .join(("jwt_secret", "another secret"))
            .join(("auth_ttl", 60))
            .extract()
            .unwrap();
        assert!(AuthToken::decode(&jwt, &other).is_err());
    }

    #[test]
    fn cookie_carries_the_jwt() {
        let config = config();
        let cookie = AuthToken::cookie("abc".to_string(), &config);
        assert_eq!(cookie.name(), AUTH_TOKEN_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
    }
}
