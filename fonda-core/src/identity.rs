use async_trait::async_trait;
use fonda_shared::Masked;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::validation::validate_dni;

/// Legal identity returned for a national ID number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityRecord {
    pub dni: String,
    pub full_name: String,
}

/// Read-only lookup used to prefill the checkout form. Never mutates state.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn lookup(
        &self,
        dni: &str,
    ) -> Result<Option<IdentityRecord>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Fixed table of identities, used in development and tests.
#[derive(Default)]
pub struct StaticIdentityLookup {
    records: HashMap<String, String>,
}

impl StaticIdentityLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, dni: &str, full_name: &str) -> Self {
        self.records.insert(dni.to_string(), full_name.to_string());
        self
    }
}

#[async_trait]
impl IdentityLookup for StaticIdentityLookup {
    async fn lookup(
        &self,
        dni: &str,
    ) -> Result<Option<IdentityRecord>, Box<dyn std::error::Error + Send + Sync>> {
        validate_dni(dni)?;
        Ok(self.records.get(dni).map(|name| IdentityRecord {
            dni: dni.to_string(),
            full_name: name.clone(),
        }))
    }
}

#[derive(Debug, Deserialize)]
struct RemoteIdentity {
    #[serde(alias = "nombre_completo", alias = "fullName")]
    full_name: Option<String>,
    #[serde(default)]
    nombres: Option<String>,
    #[serde(default, rename = "apellidoPaterno")]
    paternal_surname: Option<String>,
    #[serde(default, rename = "apellidoMaterno")]
    maternal_surname: Option<String>,
}

impl RemoteIdentity {
    fn into_name(self) -> Option<String> {
        if let Some(full) = self.full_name.filter(|n| !n.trim().is_empty()) {
            return Some(full.trim().to_string());
        }
        let parts: Vec<String> = [self.nombres, self.paternal_surname, self.maternal_surname]
            .into_iter()
            .flatten()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Lookup against an external DNI registry over HTTP (`GET {base_url}/dni/{dni}`).
pub struct HttpIdentityLookup {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpIdentityLookup {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl IdentityLookup for HttpIdentityLookup {
    async fn lookup(
        &self,
        dni: &str,
    ) -> Result<Option<IdentityRecord>, Box<dyn std::error::Error + Send + Sync>> {
        validate_dni(dni)?;

        let mut request = self.client.get(format!("{}/dni/{}", self.base_url, dni));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            tracing::warn!(
                "Identity lookup for {} returned {}",
                Masked(dni),
                response.status()
            );
            return Err(format!("identity service returned {}", response.status()).into());
        }

        let remote: RemoteIdentity = response.json().await?;
        Ok(remote.into_name().map(|full_name| IdentityRecord {
            dni: dni.to_string(),
            full_name,
        }))
    }
}
