use argon2::Config;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{
    api::id::ApiId,
    db::user::{NewUser, User},
};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A sign-up request. This is never stored directly, since the password is in
/// plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl TryFrom<Registration> for NewUser {
    type Error = Error;

    /// Convert a [`Registration`] to a new user by hashing the password.
    /// This enforces a non-empty username, a plausible email address, and the
    /// minimum password length.
    fn try_from(reg: Registration) -> Result<Self, Self::Error> {
        let username = reg.username.trim();
        let email = reg.email.trim().to_lowercase();
        if username.is_empty() {
            return Err(Error::InvalidInput("Username is required".to_string()));
        }
        if !email.contains('@') {
            return Err(Error::InvalidInput(
                "A valid email address is required".to_string(),
            ));
        }
        if reg.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash = argon2::hash_encoded(reg.password.as_bytes(), &salt, &Config::default())?;

        Ok(Self {
            username: username.to_string(),
            email,
            password_hash,
            created_at: Utc::now(),
        })
    }
}

/// Login credentials.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A user as shown to themselves. Never includes the password hash.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDescription {
    pub id: ApiId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDescription {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            username: user.user.username,
            email: user.user.email,
            created_at: user.user.created_at,
        }
    }
}

/// Reply to a successful registration or login. The token is also set as a
/// cookie, for browser clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserDescription,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_validated() {
        let short = Registration {
            password: "12345".into(),
            ..Registration::example()
        };
        assert!(matches!(NewUser::try_from(short), Err(Error::InvalidInput(_))));

        let no_at = Registration {
            email: "alice.example.com".into(),
            ..Registration::example()
        };
        assert!(matches!(NewUser::try_from(no_at), Err(Error::InvalidInput(_))));

        let blank = Registration {
            username: "  ".into(),
            ..Registration::example()
        };
        assert!(matches!(NewUser::try_from(blank), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn registration_normalises_and_hashes() {
        let reg = Registration {
            username: " alice ".into(),
            email: "Alice@Example.com".into(),
            ..Registration::example()
        };
        let user = NewUser::try_from(reg).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_ne!(user.password_hash, Registration::example().password);
        assert!(user.verify_password(Registration::example().password));
    }
}
