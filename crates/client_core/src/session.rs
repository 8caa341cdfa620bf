use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use session_store::SessionStore;
use shared::{
    domain::{Credential, Principal},
    protocol::{LoginRequest, LoginResponse},
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ensure_success, ClientError};

/// Fixed durable key the serialized credential lives under.
pub const SESSION_KEY: &str = "auth";

const LOGIN_FAILED_MESSAGE: &str = "Login failed";

/// Where the session gate persists its credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<Credential>>;
    async fn save(&self, credential: &Credential) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Durable backend: the credential as JSON under [`SESSION_KEY`] in the
/// SQLite kv store.
pub struct DurableCredentialStore {
    store: SessionStore,
}

impl DurableCredentialStore {
    pub async fn open(database_url: &str) -> Result<Self> {
        let store = SessionStore::open(database_url)
            .await
            .with_context(|| format!("failed to open session store at '{database_url}'"))?;
        Ok(Self { store })
    }

    /// Opens the store at its conventional location inside `data_dir`.
    pub async fn open_in_dir(data_dir: &std::path::Path) -> Result<Self> {
        Self::open(&SessionStore::sqlite_url_for_data_dir(data_dir)).await
    }
}

#[async_trait]
impl CredentialStore for DurableCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        let Some(raw) = self.store.get(SESSION_KEY).await? else {
            return Ok(None);
        };
        let credential =
            serde_json::from_str(&raw).context("stored session document failed to parse")?;
        Ok(Some(credential))
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        let raw = serde_json::to_string(credential)?;
        self.store.put(SESSION_KEY, &raw).await
    }

    async fn clear(&self) -> Result<()> {
        self.store.delete(SESSION_KEY).await
    }
}

/// In-process store for embedding and tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot.lock().await = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.lock().await = None;
        Ok(())
    }
}

/// Owns the credential lifecycle and stamps outgoing requests.
///
/// The in-memory slot and the durable store move together: `acquire` persists
/// before exposing the new credential, `clear` deletes before unsetting, and
/// a failure on either side leaves the previous session fully usable.
pub struct SessionGate {
    http: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    active: RwLock<Option<Credential>>,
}

impl SessionGate {
    pub fn new(server_url: &str, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let parsed =
            Url::parse(server_url).with_context(|| format!("invalid server url '{server_url}'"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(anyhow!("server url '{server_url}' must be http or https"));
        }
        Ok(Self {
            http: Client::new(),
            base_url: server_url.trim_end_matches('/').to_string(),
            store,
            active: RwLock::new(None),
        })
    }

    /// Loads any persisted credential into memory. Failures (unreadable
    /// store, malformed document) leave the gate logged out and are only
    /// logged.
    pub async fn restore(&self) {
        match self.store.load().await {
            Ok(Some(credential)) => {
                info!(
                    principal = %credential.principal.name,
                    "session: restored persisted credential"
                );
                *self.active.write().await = Some(credential);
            }
            Ok(None) => {
                debug!("session: no persisted credential");
            }
            Err(err) => {
                warn!("session: ignoring unreadable persisted credential: {err}");
            }
        }
    }

    /// Logs in and, on success, atomically installs the new credential in
    /// memory and in the durable store. On any failure the previous session
    /// (if one existed) is left untouched.
    pub async fn acquire(&self, name: &str, password: &str) -> Result<Credential, ClientError> {
        let request = LoginRequest {
            name: name.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/reviewer/login", self.base_url))
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response, LOGIN_FAILED_MESSAGE).await?;
        let LoginResponse { token, reviewer } = response.json().await?;
        let credential = Credential {
            token,
            principal: reviewer,
        };
        self.store
            .save(&credential)
            .await
            .map_err(ClientError::Store)?;
        *self.active.write().await = Some(credential.clone());
        info!(principal = %credential.principal.name, "session: credential acquired");
        Ok(credential)
    }

    /// Ends the session, removing the durable copy first so a failed delete
    /// leaves both sides still set. Clearing a cleared session is a no-op.
    pub async fn clear(&self) -> Result<(), ClientError> {
        self.store.clear().await.map_err(ClientError::Store)?;
        *self.active.write().await = None;
        info!("session: cleared");
        Ok(())
    }

    /// Stamps `Authorization: Bearer <token>` onto the request when a
    /// credential is present; without one the request goes out bare.
    pub async fn authorized_request(
        &self,
        request: RequestBuilder,
    ) -> Result<Response, ClientError> {
        let request = match self.token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        Ok(request.send().await?)
    }

    pub async fn get(&self, path: &str) -> Result<Response, ClientError> {
        self.authorized_request(self.http.get(format!("{}{path}", self.base_url)))
            .await
    }

    pub async fn post(&self, path: &str) -> Result<Response, ClientError> {
        self.authorized_request(self.http.post(format!("{}{path}", self.base_url)))
            .await
    }

    pub async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, ClientError> {
        self.authorized_request(self.http.post(format!("{}{path}", self.base_url)).json(body))
            .await
    }

    pub async fn token(&self) -> Option<String> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|credential| credential.token.clone())
    }

    pub async fn credential(&self) -> Option<Credential> {
        self.active.read().await.clone()
    }

    pub async fn principal(&self) -> Option<Principal> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|credential| credential.principal.clone())
    }

    /// Derived: a usable token and its principal are both in hand.
    pub async fn is_authenticated(&self) -> bool {
        self.active
            .read()
            .await
            .as_ref()
            .is_some_and(|credential| !credential.token.is_empty())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
