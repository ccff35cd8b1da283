//! Join-time access control for private tables.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::errors::TableError;
use crate::game::state_machine::JoinError;

/// Length of generated invite tokens (hex characters).
pub const INVITE_TOKEN_LEN: usize = 16;

/// Who may sit at a table. Fixed at creation; joins never mutate it.
#[derive(Clone, Debug, Default)]
pub struct AccessPolicy {
    is_private: bool,
    /// Argon2id PHC string; the clear password is never kept.
    password_hash: Option<String>,
    invite_token: Option<String>,
}

/// First look at a join attempt, cheap enough to run on the table actor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Admission {
    Granted,
    Denied,
    /// Only an Argon2 check of `password` against `hash` can decide.
    VerifyPassword { password: String, hash: String },
}

impl AccessPolicy {
    /// Anyone may join.
    #[must_use]
    pub fn public() -> Self {
        Self::default()
    }

    /// Private table guarded by an optional password, plus one freshly
    /// generated invite token which is returned alongside the policy.
    pub fn private(password: Option<&str>) -> Result<(Self, String), TableError> {
        let password_hash = password
            .filter(|p| !p.is_empty())
            .map(hash_password)
            .transpose()?;
        let token = generate_invite_token();
        let policy = Self {
            is_private: true,
            password_hash,
            invite_token: Some(token.clone()),
        };
        Ok((policy, token))
    }

    #[must_use]
    pub fn is_private(&self) -> bool {
        self.is_private
    }

    /// Decide what a join attempt needs. Public tables admit everyone;
    /// private tables need the invite token or the right password.
    #[must_use]
    pub fn screen(&self, password: Option<&str>, invite_token: Option<&str>) -> Admission {
        if !self.is_private {
            return Admission::Granted;
        }

        if let Some(token) = invite_token
            && self.token_matches(token)
        {
            return Admission::Granted;
        }

        match (password, self.password_hash.as_deref()) {
            (Some(password), Some(hash)) if !password.is_empty() => Admission::VerifyPassword {
                password: password.to_string(),
                hash: hash.to_string(),
            },
            _ => Admission::Denied,
        }
    }

    /// [`Self::screen`] with the password check done inline.
    pub fn admit(&self, password: Option<&str>, invite_token: Option<&str>) -> Result<(), JoinError> {
        match self.screen(password, invite_token) {
            Admission::Granted => Ok(()),
            Admission::VerifyPassword { password, hash } if verify_password(&password, &hash) => {
                Ok(())
            }
            _ => Err(JoinError::Unauthorized),
        }
    }

    fn token_matches(&self, candidate: &str) -> bool {
        self.invite_token
            .as_deref()
            .is_some_and(|token| bool::from(token.as_bytes().ct_eq(candidate.as_bytes())))
    }
}

fn hash_password(password: &str) -> Result<String, TableError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    Ok(argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| TableError::PasswordHash(e.to_string()))?
        .to_string())
}

/// Argon2 check of `password` against a PHC `hash`. Slow by construction;
/// keep it off the table actor.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        log::error!("Stored table password hash is malformed");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Random hex token for sharing a private table.
#[must_use]
pub fn generate_invite_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(INVITE_TOKEN_LEN);
    token
}
