use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::{Rng, distributions::Alphanumeric, thread_rng};

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AppError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError>;
}

/// Argon2id. Verification reads the cost parameters back out of the stored hash, so
/// hashes made with other parameters keep verifying.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, AppError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|err| AppError::internal(format!("Invalid Argon2 parameters: {err}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut thread_rng());
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| {
                tracing::error!(error = %err, "password hashing failed");
                AppError::internal("Password hashing failed")
            })?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(hash).map_err(|err| {
            tracing::error!(error = %err, "stored password hash does not parse");
            AppError::internal("Password verification failed")
        })?;

        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Rejects passwords the service would refuse to store.
pub fn check_password_policy(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::validation("New password is empty"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "Password length must be 8 or more characters",
        ));
    }
    Ok(())
}

/// Throwaway secret for accounts that only ever sign in through a provider.
pub fn random_password() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
