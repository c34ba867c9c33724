//! Lockbox API client.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::str::FromStr;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};
use lockbox_common::api::{
    CredentialsRequest, ErrorBody, ListResponse, StoreResponse, TokenResponse, UpdateRequest,
    BAD_REQUEST_CODE,
};
use lockbox_common::{ErrorKind, NewRecord, Record, RecordId, Username};

/// Version information reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ServerVersion {
    pub version: String,
    pub name: String,
}

/// Client for one Lockbox server.
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl VaultClient {
    /// Create a client for the server at `base_url`.
    ///
    /// # Errors
    /// - `base_url` is not an absolute URL
    /// - The HTTP client cannot be constructed
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::Decode(format!("Bad server URL: {}", e)))?;
        let http = Client::builder()
            .user_agent(concat!("lockbox/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    /// Use an existing session token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replace the held session token.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Currently held session token.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Query the server version. Needs no session.
    pub async fn version(&self) -> ClientResult<ServerVersion> {
        let response = self.request(Method::GET, "v1/version")?.send().await?;
        handle_response(response).await
    }

    /// Create an account and keep the returned session token.
    pub async fn register(&mut self, username: &str, password: &str) -> ClientResult<String> {
        self.authenticate("v1/register", username, password).await
    }

    /// Log in and keep the returned session token.
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<String> {
        self.authenticate("v1/login", username, password).await
    }

    async fn authenticate(
        &mut self,
        path: &str,
        username: &str,
        password: &str,
    ) -> ClientResult<String> {
        let username = Username::new(username)
            .map_err(|_| ClientError::BadRequest("username must not be empty".to_string()))?;
        let body = CredentialsRequest {
            username,
            password: password.to_string(),
        };

        let response = self.request(Method::POST, path)?.json(&body).send().await?;
        let TokenResponse { token } = handle_response(response).await?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Store a new record owned by the session user.
    pub async fn store(&self, record: &NewRecord) -> ClientResult<RecordId> {
        let response = self
            .authorized(Method::POST, "v1/records")?
            .json(record)
            .send()
            .await?;
        let StoreResponse { id } = handle_response(response).await?;
        debug!(id = %id, "Record stored");
        Ok(id)
    }

    /// Fetch one record.
    pub async fn retrieve(&self, id: RecordId) -> ClientResult<Record> {
        let path = format!("v1/records/{}", id);
        let response = self.authorized(Method::GET, &path)?.send().await?;
        handle_response(response).await
    }

    /// Replace a record's meta and data. The kind is kept.
    pub async fn update(&self, id: RecordId, meta: &str, data: &[u8]) -> ClientResult<()> {
        let path = format!("v1/records/{}", id);
        let body = UpdateRequest {
            meta: meta.to_string(),
            data: data.to_vec(),
        };
        let response = self
            .authorized(Method::PUT, &path)?
            .json(&body)
            .send()
            .await?;
        handle_empty(response).await
    }

    /// All records owned by the session user.
    pub async fn list(&self) -> ClientResult<Vec<Record>> {
        let response = self.authorized(Method::GET, "v1/records")?.send().await?;
        let ListResponse { records } = handle_response(response).await?;
        Ok(records)
    }

    /// Delete one record.
    pub async fn delete(&self, id: RecordId) -> ClientResult<()> {
        let path = format!("v1/records/{}", id);
        let response = self.authorized(Method::DELETE, &path)?.send().await?;
        handle_empty(response).await
    }

    fn request(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::Decode(format!("Bad request path: {}", e)))?;
        Ok(self.http.request(method, url))
    }

    fn authorized(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::NoSession)?;
        Ok(self.request(method, path)?.bearer_auth(token))
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    if response.status().is_success() {
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("Failed to parse response: {}", e)))
    } else {
        Err(rejection(response).await)
    }
}

async fn handle_empty(response: Response) -> ClientResult<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(rejection(response).await)
    }
}

async fn rejection(response: Response) -> ClientError {
    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return ClientError::Transport(e),
    };
    decode_error(status, &text)
}

fn decode_error(status: StatusCode, text: &str) -> ClientError {
    let body: ErrorBody = match serde_json::from_str(text) {
        Ok(body) => body,
        Err(_) => {
            return ClientError::Decode(format!("Unexpected response: {} - {}", status, text));
        }
    };

    if body.code == BAD_REQUEST_CODE {
        return ClientError::BadRequest(body.message);
    }
    match ErrorKind::from_str(&body.code) {
        Ok(kind) => ClientError::Rejected {
            kind,
            message: body.message,
        },
        Err(_) => ClientError::Decode(format!("Unknown error code {} ({})", body.code, status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_kind() {
        let err = decode_error(
            StatusCode::FORBIDDEN,
            r#"{"code":"ACCESS_DENIED","message":"access denied"}"#,
        );
        assert_eq!(err.kind(), Some(ErrorKind::AccessDenied));
    }

    #[test]
    fn test_decode_bad_request() {
        let err = decode_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"BAD_REQUEST","message":"missing field"}"#,
        );
        assert!(matches!(err, ClientError::BadRequest(m) if m == "missing field"));
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_error(StatusCode::BAD_GATEWAY, "<html>proxy</html>");
        assert!(matches!(err, ClientError::Decode(_)));
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_base_url_must_be_absolute() {
        assert!(VaultClient::new("not a url").is_err());
        assert!(VaultClient::new("http://127.0.0.1:3200/").is_ok());
    }

    #[tokio::test]
    async fn test_no_session_fails_locally() {
        let client = VaultClient::new("http://127.0.0.1:9/").unwrap();
        assert!(matches!(client.list().await, Err(ClientError::NoSession)));
    }
}
