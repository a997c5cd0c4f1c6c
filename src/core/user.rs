use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::{LoveMatchError, Result};
use super::store::LocalStore;

pub const USERS_KEY: &str = "users";
pub const CURRENT_USER_KEY: &str = "current_user";

/// A registered account. Passwords are stored and compared as plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub password: String,
    pub registered_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, password: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            password: password.to_string(),
            registered_at: now,
            last_active: now,
        }
    }

    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }

    /// Refresh `last_active`, never moving it backwards.
    pub fn touch(&mut self) {
        self.last_active = Utc::now().max(self.last_active);
    }
}

pub struct UserRepository {
    store: Arc<LocalStore>,
}

impl UserRepository {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    pub fn find_all(&self) -> Vec<User> {
        self.store.get(USERS_KEY, Vec::new())
    }

    pub fn find_by_id(&self, id: &str) -> Option<User> {
        self.find_all().into_iter().find(|u| u.id == id)
    }

    pub fn find_by_name_case_insensitive(&self, name: &str) -> Option<User> {
        self.find_all().into_iter().find(|u| u.name_matches(name))
    }

    pub fn register(&self, name: &str, password: &str) -> Result<User> {
        let name = name.trim();
        validate_credentials(name, password)?;

        let user = self.store.update(USERS_KEY, Vec::<User>::new(), |users| {
            if users.iter().any(|u| u.name_matches(name)) {
                return Err(LoveMatchError::DuplicateName(name.to_string()));
            }
            let user = User::new(name, password);
            users.push(user.clone());
            Ok(user)
        })?;

        info!(user_id = %user.id, name = %user.name, "registered user");
        Ok(user)
    }

    /// Match on case-insensitive name and exact password, refreshing `last_active`.
    pub fn authenticate(&self, name: &str, password: &str) -> Result<User> {
        validate_credentials(name.trim(), password)?;

        self.store.update(USERS_KEY, Vec::<User>::new(), |users| {
            let user = users
                .iter_mut()
                .find(|u| u.name_matches(name) && u.password == password)
                .ok_or(LoveMatchError::InvalidCredentials)?;
            user.touch();
            Ok(user.clone())
        })
    }

    pub fn touch_last_active(&self, user: &User) -> Result<Option<User>> {
        self.store.update(USERS_KEY, Vec::<User>::new(), |users| {
            Ok(users.iter_mut().find(|u| u.id == user.id).map(|u| {
                u.touch();
                u.clone()
            }))
        })
    }

    pub fn current(&self) -> Option<User> {
        self.store.get(CURRENT_USER_KEY, None)
    }

    pub fn set_current(&self, user: &User) -> Result<()> {
        self.store.set(CURRENT_USER_KEY, user)
    }

    pub fn clear_current(&self) -> Result<()> {
        self.store.remove(CURRENT_USER_KEY)
    }
}

fn validate_credentials(name: &str, password: &str) -> Result<()> {
    if name.is_empty() || password.trim().is_empty() {
        return Err(LoveMatchError::InvalidInput(
            "Please fill in all fields".to_string(),
        ));
    }
    Ok(())
}
