use std::sync::Arc;
use tracing::debug;

use crate::auth::token::Identity;
use crate::db::{BoundQuery, Credential, Storage};
use crate::error::{AppError, AuthError};

const CREDENTIAL_BY_USERNAME: &str =
    "SELECT id, username, password_hash FROM users WHERE username = ?";

const INSERT_CREDENTIAL: &str =
    "INSERT OR IGNORE INTO users (username, password_hash) VALUES (?, ?)";

/// Password hashing capability.
pub trait PasswordHasher: Send + Sync {
    /// Constant-time comparison of `plain` against a stored hash.
    fn verify(&self, plain: &str, hash: &str) -> bool;

    fn hash(&self, plain: &str) -> Result<String, AppError>;
}

pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordHasher for BcryptHasher {
    fn verify(&self, plain: &str, hash: &str) -> bool {
        // A malformed stored hash is a mismatch, not a server error.
        bcrypt::verify(plain, hash).unwrap_or(false)
    }

    fn hash(&self, plain: &str) -> Result<String, AppError> {
        bcrypt::hash(plain, self.cost)
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
    }
}

/// Checks a username/password pair against the stored credential.
pub struct CredentialVerifier {
    storage: Arc<dyn Storage>,
    hasher: Arc<dyn PasswordHasher>,
}

impl CredentialVerifier {
    pub fn new(storage: Arc<dyn Storage>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { storage, hasher }
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<Identity, AppError> {
        let query = BoundQuery::new(CREDENTIAL_BY_USERNAME).bind(username);
        let records = self.storage.execute(&query).await?;

        // Zero or duplicate matches look exactly like a wrong password.
        let [record] = records.as_slice() else {
            debug!("Credential lookup returned {} records", records.len());
            return Err(AuthError::InvalidCredentials.into());
        };
        let credential = Credential::try_from(record)?;

        let hasher = self.hasher.clone();
        let plain = password.to_string();
        let hash = credential.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(|e| AppError::InternalError(format!("Password check aborted: {}", e)))?;

        if !matches {
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(Identity {
            user_id: credential.id,
            username: credential.username,
        })
    }

    /// Stores a new credential. An existing username is left untouched.
    pub async fn provision(&self, username: &str, password: &str) -> Result<(), AppError> {
        let hasher = self.hasher.clone();
        let plain = password.to_string();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| AppError::InternalError(format!("Password hashing aborted: {}", e)))??;

        let query = BoundQuery::new(INSERT_CREDENTIAL).bind(username).bind(hash);
        self.storage.execute(&query).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::operations::MockStorage;
    use crate::db::{Record, SqlValue};
    use crate::error::DatabaseError;

    const COST: u32 = 4;

    fn alice_record(password: &str) -> Record {
        Record::new()
            .with("id", 42_i64)
            .with("username", "alice")
            .with("password_hash", bcrypt::hash(password, COST).unwrap())
    }

    fn verifier(storage: MockStorage) -> CredentialVerifier {
        CredentialVerifier::new(Arc::new(storage), Arc::new(BcryptHasher::new(COST)))
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let record = alice_record("wonderland");
        let mut storage = MockStorage::new();
        storage
            .expect_execute()
            .withf(|q| {
                q.template() == CREDENTIAL_BY_USERNAME
                    && q.params() == [SqlValue::Text("alice".into())]
            })
            .times(1)
            .returning(move |_| Ok(vec![record.clone()]));

        let identity = verifier(storage).verify("alice", "wonderland").await.unwrap();
        assert_eq!(identity.user_id, 42);
        assert_eq!(identity.username, "alice");
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let record = alice_record("wonderland");
        let mut storage = MockStorage::new();
        storage
            .expect_execute()
            .returning(move |_| Ok(vec![record.clone()]));

        let result = verifier(storage).verify("alice", "looking-glass").await;
        assert!(matches!(result, Err(AppError::AuthError(AuthError::InvalidCredentials))));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let mut storage = MockStorage::new();
        storage.expect_execute().returning(|_| Ok(vec![]));

        let result = verifier(storage).verify("nobody", "anything").await;
        assert!(matches!(result, Err(AppError::AuthError(AuthError::InvalidCredentials))));
    }

    #[tokio::test]
    async fn test_duplicate_records_are_rejected() {
        let record = alice_record("wonderland");
        let mut storage = MockStorage::new();
        storage
            .expect_execute()
            .returning(move |_| Ok(vec![record.clone(), record.clone()]));

        let result = verifier(storage).verify("alice", "wonderland").await;
        assert!(matches!(result, Err(AppError::AuthError(AuthError::InvalidCredentials))));
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let mut storage = MockStorage::new();
        storage
            .expect_execute()
            .returning(|_| Err(DatabaseError::ConnectionError("pool closed".into())));

        let result = verifier(storage).verify("alice", "wonderland").await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }

    #[tokio::test]
    async fn test_provision_binds_hash_not_password() {
        let mut storage = MockStorage::new();
        storage
            .expect_execute()
            .withf(|q| match q.params() {
                [SqlValue::Text(user), SqlValue::Text(hash)] => {
                    q.template() == INSERT_CREDENTIAL
                        && user == "alice"
                        && hash != "wonderland"
                        && bcrypt::verify("wonderland", hash).unwrap_or(false)
                }
                _ => false,
            })
            .times(1)
            .returning(|_| Ok(vec![]));

        verifier(storage).provision("alice", "wonderland").await.unwrap();
    }

    #[test]
    fn test_bcrypt_hasher_rejects_malformed_hash() {
        let hasher = BcryptHasher::new(COST);
        assert!(!hasher.verify("wonderland", "not-a-bcrypt-hash"));
    }
}
