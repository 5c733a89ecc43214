use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::users::dto::{CreateUserRequest, ListQuery, UpdateUserRequest};
use crate::users::repo::UserStore;
use crate::users::repo_types::{DeleteOutcome, UpdateOutcome, User};
use crate::users::services;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-success response; `message` comes from the error body when present.
    #[error("{message}")]
    Status { status: u16, message: String },
}

impl From<ApiError> for ClientError {
    fn from(e: ApiError) -> Self {
        ClientError::Status {
            status: e.status_code().as_u16(),
            message: e.to_string(),
        }
    }
}

/// The five record operations as seen from the front end.
#[async_trait]
pub trait UsersApi: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<Vec<User>, ClientError>;
    async fn get(&self, id: Uuid) -> Result<User, ClientError>;
    async fn create(&self, req: &CreateUserRequest) -> Result<User, ClientError>;
    async fn update(&self, id: Uuid, req: &UpdateUserRequest)
        -> Result<UpdateOutcome, ClientError>;
    async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, ClientError>;
}

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Talks to the REST API over HTTP.
#[derive(Clone)]
pub struct HttpUsersApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUsersApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL from `USERS_API_URL`, defaulting to a local server.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(get("USERS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }
    let message = match res.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    debug!(status = status.as_u16(), %message, "api request failed");
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl UsersApi for HttpUsersApi {
    async fn list(&self, query: &ListQuery) -> Result<Vec<User>, ClientError> {
        let res = self
            .client
            .get(self.url("/users"))
            .query(query)
            .send()
            .await?;
        decode(res).await
    }

    async fn get(&self, id: Uuid) -> Result<User, ClientError> {
        let res = self
            .client
            .get(self.url(&format!("/users/{id}")))
            .send()
            .await?;
        decode(res).await
    }

    async fn create(&self, req: &CreateUserRequest) -> Result<User, ClientError> {
        let res = self
            .client
            .post(self.url("/users"))
            .json(req)
            .send()
            .await?;
        decode(res).await
    }

    async fn update(
        &self,
        id: Uuid,
        req: &UpdateUserRequest,
    ) -> Result<UpdateOutcome, ClientError> {
        let res = self
            .client
            .patch(self.url(&format!("/users/{id}")))
            .json(req)
            .send()
            .await?;
        decode(res).await
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, ClientError> {
        let res = self
            .client
            .delete(self.url(&format!("/users/{id}")))
            .send()
            .await?;
        decode(res).await
    }
}

/// In-process gateway straight to the record service, skipping HTTP.
#[derive(Clone)]
pub struct LocalUsersApi {
    store: Arc<dyn UserStore>,
}

impl LocalUsersApi {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UsersApi for LocalUsersApi {
    async fn list(&self, query: &ListQuery) -> Result<Vec<User>, ClientError> {
        Ok(services::list_users(self.store.as_ref(), query).await?)
    }

    async fn get(&self, id: Uuid) -> Result<User, ClientError> {
        Ok(services::get_user(self.store.as_ref(), &id.to_string()).await?)
    }

    async fn create(&self, req: &CreateUserRequest) -> Result<User, ClientError> {
        Ok(services::create_user(self.store.as_ref(), req.clone()).await?)
    }

    async fn update(
        &self,
        id: Uuid,
        req: &UpdateUserRequest,
    ) -> Result<UpdateOutcome, ClientError> {
        Ok(services::update_user(self.store.as_ref(), &id.to_string(), req.clone()).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, ClientError> {
        Ok(services::delete_user(self.store.as_ref(), &id.to_string()).await?)
    }
}
