//! Record-store collaborator: personas, users, authentication.
//!
//! Personas and user accounts live in an external record store. The chat core
//! only ever consumes the resolved system prompt of the active persona;
//! everything here is the seam a UI shell programs against. The store is an
//! explicit handle constructed once and passed by reference, never an ambient
//! singleton.
//!
//! [`MemoryStore`] is the bundled implementation, enough for tests and local
//! demos. A deployment backs this trait with its actual record service.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors from record-store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A persona record: a named system prompt plus authorship metadata.
///
/// Field names follow the record store's wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub system_message: String,
    /// Id of the user who created the persona.
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Fields supplied when creating or updating a persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaDraft {
    pub name: String,
    pub description: Option<String>,
    pub system_message: String,
}

/// Minimal profile of an authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Result of password authentication: an opaque session token plus the
/// user's profile.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

/// Operations the chat shell needs from the record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_persona(
        &self,
        author: &str,
        draft: PersonaDraft,
    ) -> Result<Persona, StoreError>;

    async fn persona(&self, id: &str) -> Result<Persona, StoreError>;

    async fn update_persona(&self, id: &str, draft: PersonaDraft) -> Result<Persona, StoreError>;

    /// All personas, newest first.
    async fn list_personas(&self) -> Result<Vec<Persona>, StoreError>;

    async fn authenticate(&self, email: &str, password: &str)
    -> Result<AuthSession, StoreError>;
}

#[derive(Debug, Clone)]
struct UserRecord {
    password: String,
    profile: UserProfile,
}

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    personas: RwLock<HashMap<String, Persona>>,
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user account; returns the new user's id.
    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<String, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(StoreError::Backend(format!(
                "user already exists: {email}"
            )));
        }
        let id = Uuid::new_v4().to_string();
        users.insert(
            email.to_string(),
            UserRecord {
                password: password.to_string(),
                profile: UserProfile {
                    id: id.clone(),
                    email: email.to_string(),
                    name: name.map(str::to_string),
                },
            },
        );
        Ok(id)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_persona(
        &self,
        author: &str,
        draft: PersonaDraft,
    ) -> Result<Persona, StoreError> {
        let author_name = self
            .users
            .read()
            .await
            .values()
            .find(|u| u.profile.id == author)
            .and_then(|u| u.profile.name.clone());

        let now = Utc::now();
        let persona = Persona {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            description: draft.description,
            system_message: draft.system_message,
            author: author.to_string(),
            author_name,
            created: now,
            updated: now,
        };
        self.personas
            .write()
            .await
            .insert(persona.id.clone(), persona.clone());
        Ok(persona)
    }

    async fn persona(&self, id: &str) -> Result<Persona, StoreError> {
        self.personas
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_persona(&self, id: &str, draft: PersonaDraft) -> Result<Persona, StoreError> {
        let mut personas = self.personas.write().await;
        let persona = personas
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        persona.name = draft.name;
        persona.description = draft.description;
        persona.system_message = draft.system_message;
        persona.updated = Utc::now();
        Ok(persona.clone())
    }

    async fn list_personas(&self) -> Result<Vec<Persona>, StoreError> {
        let mut personas: Vec<Persona> = self.personas.read().await.values().cloned().collect();
        personas.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(personas)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError> {
        let users = self.users.read().await;
        let record = users.get(email).ok_or(StoreError::InvalidCredentials)?;
        if record.password != password {
            return Err(StoreError::InvalidCredentials);
        }
        Ok(AuthSession {
            token: Uuid::new_v4().to_string(),
            user: record.profile.clone(),
        })
    }
}
