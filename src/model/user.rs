use bson::{Bson, Document as BsonDocument, doc};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::ApiError;
use crate::query::{CmpOp, Filter};

pub const USERS_COLLECTION: &str = "users";

/// Reset tokens stay valid for ten minutes.
const RESET_TOKEN_TTL_MINUTES: i64 = 10;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Guide => "guide",
            Self::LeadGuide => "lead-guide",
            Self::Admin => "admin",
        }
    }
}

/// An account document plus the credential glue around it.
///
/// Password hashes and reset tokens never serialize out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(skip)]
    pub password_hash: Option<String>,
    #[serde(skip)]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub password_reset_token: Option<String>,
    #[serde(skip)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Creates an account after checking the email shape and password rules.
    ///
    /// # Errors
    /// Returns `ApiError::Validation` for a bad name, email, or password, and
    /// `ApiError::Crypto` if hashing fails.
    pub fn new(
        name: &str,
        email: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<Self, ApiError> {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("please tell us your name".to_string()));
        }
        if !valid_email(email) {
            return Err(ApiError::Validation("please provide a valid email".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::Validation(format!(
                "a password must have at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if password != password_confirm {
            return Err(ApiError::Validation("passwords are not the same".to_string()));
        }
        let mut user = Self {
            name: name.trim().to_string(),
            email: email.trim().to_ascii_lowercase(),
            photo: None,
            role: Role::User,
            password_hash: None,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            active: true,
        };
        user.set_password(password)?;
        Ok(user)
    }

    /// Hashes and stores a new password.
    ///
    /// The change time is recorded one second in the past so credentials
    /// issued immediately afterwards still pass `changed_password_after`.
    ///
    /// # Errors
    /// Returns `ApiError::Crypto` if hashing fails.
    pub fn set_password(&mut self, password: &str) -> Result<(), ApiError> {
        self.password_hash = Some(hash_password(password)?);
        self.password_changed_at = Some(Utc::now() - Duration::seconds(1));
        self.password_reset_token = None;
        self.password_reset_expires = None;
        Ok(())
    }

    /// Checks a candidate password against the stored hash.
    ///
    /// # Errors
    /// Returns `ApiError::Crypto` if the stored hash is malformed.
    pub fn correct_password(&self, candidate: &str) -> Result<bool, ApiError> {
        let Some(stored) = &self.password_hash else {
            return Ok(false);
        };
        verify_password(candidate, stored)
    }

    /// True when the password changed after a credential was issued.
    #[must_use]
    pub fn changed_password_after(&self, issued_at: DateTime<Utc>) -> bool {
        self.password_changed_at.is_some_and(|changed| issued_at < changed)
    }

    /// Issues a password-reset token, storing only its digest.
    ///
    /// The plain token goes out of band to the account holder; the stored
    /// digest plus expiry is all that is needed to verify it later.
    pub fn create_password_reset_token(&mut self) -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        self.password_reset_token = Some(digest_token(&token));
        self.password_reset_expires = Some(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES));
        token
    }

    /// Checks a plain reset token against the stored digest and expiry.
    #[must_use]
    pub fn reset_token_valid(&self, token: &str) -> bool {
        let (Some(stored), Some(expires)) =
            (&self.password_reset_token, self.password_reset_expires)
        else {
            return false;
        };
        Utc::now() <= expires && digest_token(token) == *stored
    }

    /// Deactivated accounts never leave the storage layer on reads.
    ///
    /// A missing `active` field counts as active.
    #[must_use]
    pub fn visibility_filter() -> Filter {
        Filter::Not(Box::new(Filter::Cmp {
            path: "active".to_string(),
            op: CmpOp::Eq,
            value: Bson::Boolean(false),
        }))
    }

    /// Converts the account into its stored document form.
    #[must_use]
    pub fn into_document(self) -> BsonDocument {
        let mut doc = doc! {
            "name": self.name,
            "email": self.email,
            "role": self.role.as_str(),
            "active": self.active,
        };
        if let Some(photo) = self.photo {
            doc.insert("photo", photo);
        }
        if let Some(hash) = self.password_hash {
            doc.insert("password_hash", hash);
        }
        if let Some(changed) = self.password_changed_at {
            let millis = changed.timestamp_millis();
            doc.insert(
                "password_changed_at",
                Bson::DateTime(bson::DateTime::from_millis(millis)),
            );
        }
        doc
    }
}

/// Structural check only; deliverability belongs to the mail collaborator.
fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Derives an Argon2id hash, storing the salt alongside the digest.
fn hash_password(password: &str) -> Result<String, ApiError> {
    let mut salt = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);
    let mut out = [0u8; 32];
    argon2::Argon2::default()
        .hash_password_into(password.as_bytes(), &salt, &mut out)
        .map_err(|e| ApiError::Crypto(format!("argon2: {e}")))?;
    Ok(format!("{}${}", hex::encode(salt), hex::encode(out)))
}

fn verify_password(candidate: &str, stored: &str) -> Result<bool, ApiError> {
    let Some((salt_hex, hash_hex)) = stored.split_once('$') else {
        return Err(ApiError::Crypto("malformed password hash".to_string()));
    };
    let salt = hex::decode(salt_hex).map_err(|e| ApiError::Crypto(format!("hex: {e}")))?;
    let expected = hex::decode(hash_hex).map_err(|e| ApiError::Crypto(format!("hex: {e}")))?;
    let mut out = [0u8; 32];
    argon2::Argon2::default()
        .hash_password_into(candidate.as_bytes(), &salt, &mut out)
        .map_err(|e| ApiError::Crypto(format!("argon2: {e}")))?;
    Ok(out.as_slice() == expected.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(valid_email("lea@example.com"));
        assert!(!valid_email("lea.example.com"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("lea@com"));
        assert!(!valid_email("lea@.com"));
    }

    #[test]
    fn rejected_account_inputs() {
        assert!(User::new(" ", "a@b.io", "password123", "password123").is_err());
        assert!(User::new("Lea", "bad-email", "password123", "password123").is_err());
        assert!(User::new("Lea", "a@b.io", "short", "short").is_err());
        assert!(User::new("Lea", "a@b.io", "password123", "password124").is_err());
    }

    #[test]
    fn email_is_lowercased() {
        let user = User::new("Lea", "Lea@Example.COM", "password123", "password123").unwrap();
        assert_eq!(user.email, "lea@example.com");
    }
}
