//! User service for sign-up and sign-in

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::storage::Storage;
use crate::domain::user::{normalize_email, User};
use crate::domain::DomainError;

use super::password::PasswordHasher;

/// Request for creating a new user; fields are already schema-validated
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct UserService {
    storage: Arc<dyn Storage<User>>,
    hasher: Arc<dyn PasswordHasher>,
    /// Held across the email lookup and the insert
    signup: Arc<Mutex<()>>,
}

impl UserService {
    pub fn new(storage: Arc<dyn Storage<User>>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            storage,
            hasher,
            signup: Arc::new(Mutex::new(())),
        }
    }

    /// Emails are unique even under concurrent sign-ups
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, DomainError> {
        let password_hash = self.hasher.hash(&request.password)?;

        let _guard = self.signup.lock().await;

        if self.find_by_email(&request.email).await?.is_some() {
            return Err(DomainError::conflict(
                "email",
                format!("Email '{}' is already registered", request.email),
            ));
        }

        let user = User::new(request.name, &request.email, password_hash);

        self.storage.create(user).await
    }

    /// Returns the user when the email exists and the password matches
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };

        if !self.hasher.verify(password, user.password_hash()) {
            return Ok(None);
        }

        Ok(Some(user))
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>, DomainError> {
        self.storage.get(&id.to_string()).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let email = normalize_email(email);

        Ok(self
            .storage
            .list()
            .await?
            .into_iter()
            .find(|user| user.email() == email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryStorage;
    use crate::infrastructure::user::Argon2Hasher;

    fn service() -> UserService {
        UserService::new(
            Arc::new(InMemoryStorage::<User>::new()),
            Arc::new(Argon2Hasher),
        )
    }

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "Evan".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_authenticate() {
        let users = service();
        let created = users.create(request("evan@example.com")).await.unwrap();

        let signed_in = users
            .authenticate("EVAN@example.com", "password123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signed_in.id(), created.id());

        assert!(users
            .authenticate("evan@example.com", "wrong-password")
            .await
            .unwrap()
            .is_none());
        assert!(users
            .authenticate("nobody@example.com", "password123")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_on_email_field() {
        let users = service();
        users.create(request("evan@example.com")).await.unwrap();

        let err = users.create(request("Evan@Example.com")).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Conflict { field: Some(ref f), .. } if f == "email"
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_signups_keep_email_unique() {
        let users = service();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let users = users.clone();
                tokio::spawn(async move { users.create(request("race@example.com")).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        let stored = users.storage.list().await.unwrap();
        assert_eq!(
            stored
                .iter()
                .filter(|user| user.email() == "race@example.com")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_get() {
        let users = service();
        let created = users.create(request("evan@example.com")).await.unwrap();

        assert!(users.get(created.id()).await.unwrap().is_some());
        assert!(users.get("missing").await.unwrap().is_none());
    }
}
