//! Catalogue of APIs known to the team, independent of what gets probed.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Registry is empty")]
    Empty,
    #[error("API not found: {name} ({url})")]
    NotFound { name: String, url: String },
    #[error("Invalid API definition: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Internal,
    External { provider: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiState {
    Active,
    Inactive,
}

impl FromStr for ApiState {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(ApiState::Active),
            "inactive" => Ok(ApiState::Inactive),
            other => Err(RegistryError::Invalid(format!(
                "status must be 'active' or 'inactive', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredApi {
    pub name: String,
    pub url: String,
    pub entity: Entity,
    /// Unset until someone marks the API active or inactive.
    pub state: Option<ApiState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewApi {
    pub name: String,
    pub url: String,
    pub entity: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub apis: usize,
    pub internal: usize,
    pub external: usize,
    pub active: usize,
    pub inactive: usize,
}

/// Single-writer store; callers share it behind one lock.
#[derive(Debug, Default)]
pub struct ApiRegistry {
    apis: Vec<RegisteredApi>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, api: NewApi) -> Result<&RegisteredApi, RegistryError> {
        let name = api.name.trim().to_string();
        let url = api.url.trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::Invalid("name must not be empty".into()));
        }
        if url.is_empty() {
            return Err(RegistryError::Invalid("url must not be empty".into()));
        }
        let entity = match api.entity {
            Entity::Internal => Entity::Internal,
            Entity::External { provider } => {
                let provider = provider.trim().to_string();
                if provider.is_empty() {
                    return Err(RegistryError::Invalid("external APIs need a provider".into()));
                }
                Entity::External { provider }
            }
        };

        self.apis.push(RegisteredApi { name, url, entity, state: None });
        Ok(&self.apis[self.apis.len() - 1])
    }

    /// Matches on the exact `(name, url)` pair after trimming.
    pub fn set_state(&mut self, name: &str, url: &str, state: ApiState) -> Result<&RegisteredApi, RegistryError> {
        if self.apis.is_empty() {
            return Err(RegistryError::Empty);
        }
        let (name, url) = (name.trim(), url.trim());
        let api = self
            .apis
            .iter_mut()
            .find(|api| api.name == name && api.url == url)
            .ok_or_else(|| RegistryError::NotFound { name: name.into(), url: url.into() })?;
        api.state = Some(state);
        Ok(&*api)
    }

    pub fn list(&self) -> &[RegisteredApi] {
        &self.apis
    }

    pub fn summary(&self) -> RegistrySummary {
        let internal = self.apis.iter().filter(|api| api.entity == Entity::Internal).count();
        RegistrySummary {
            apis: self.apis.len(),
            internal,
            external: self.apis.len() - internal,
            active: self.apis.iter().filter(|api| api.state == Some(ApiState::Active)).count(),
            inactive: self.apis.iter().filter(|api| api.state == Some(ApiState::Inactive)).count(),
        }
    }
}
