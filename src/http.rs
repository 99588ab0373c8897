//! HTTP client adapter for the Satoru backend API.
//!
//! Single chokepoint for all backend calls: base URL and timeout handling,
//! bearer token injection, response envelope unwrapping and the
//! refresh-and-retry flow for expired access tokens.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::credentials::{CredentialStore, StoredCredentials};
use crate::error::{ApiError, Result};
use crate::models::{ApiErrorBody, TokenPair};

/// Request body, kept rebuildable so a single replay after token refresh
/// never consumes the original.
enum Payload<'a> {
    Empty,
    Json(&'a Value),
    Upload {
        field: &'a str,
        file_name: &'a str,
        bytes: &'a [u8],
    },
}

pub struct ApiClient {
    base_url: String,
    request_timeout: Duration,
    http: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(config: &Config, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            request_timeout: config.request_timeout,
            http: reqwest::Client::new(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, &[], Payload::Empty).await?;
        decode_json(response).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.send(Method::GET, path, query, Payload::Empty).await?;
        decode_json(response).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self
            .send(Method::POST, path, &[], Payload::Json(&body))
            .await?;
        decode_json(response).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self
            .send(Method::PATCH, path, &[], Payload::Json(&body))
            .await?;
        decode_json(response).await
    }

    /// PATCH without a body, used by the status transition endpoint.
    pub async fn patch_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::PATCH, path, &[], Payload::Empty).await?;
        decode_json(response).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::DELETE, path, &[], Payload::Empty).await?;
        decode_json(response).await
    }

    /// DELETE where the response body, if any, carries nothing the client
    /// needs.
    pub async fn delete_no_content(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, &[], Payload::Empty).await?;
        Ok(())
    }

    /// Multipart file upload; the part is rebuilt if the request is replayed
    /// after a token refresh.
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<T> {
        let payload = Payload::Upload {
            field,
            file_name,
            bytes,
        };
        let response = self.send(Method::POST, path, &[], payload).await?;
        decode_json(response).await
    }

    /// POST that never carries credentials and never triggers the refresh
    /// flow: login, register, logout, refresh itself.
    pub async fn post_unauthenticated<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self
            .execute(Method::POST, path, &[], &Payload::Json(&body), None)
            .await?;
        let response = check_status(response).await?;
        decode_json(response).await
    }

    /// Issues an authenticated request. A 401 triggers at most one token
    /// refresh followed by a single replay; a 401 on the replay surfaces as
    /// `Unauthorized` rather than looping.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        payload: Payload<'_>,
    ) -> Result<reqwest::Response> {
        let token = self.access_token().await;
        let response = self
            .execute(method.clone(), path, query, &payload, token.as_deref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        debug!(%path, "access token rejected, attempting refresh");
        let rotated = self.refresh_tokens().await?;
        let retried = self
            .execute(method, path, query, &payload, Some(&rotated.access_token))
            .await?;

        if retried.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        check_status(retried).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        payload: &Payload<'_>,
        token: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .http
            .request(method, url)
            .timeout(self.request_timeout);

        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match payload {
            Payload::Empty => builder,
            Payload::Json(body) => builder.json(body),
            Payload::Upload {
                field,
                file_name,
                bytes,
            } => {
                let part = Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
                builder.multipart(Form::new().part(field.to_string(), part))
            }
        };

        Ok(builder.send().await?)
    }

    async fn access_token(&self) -> Option<String> {
        match self.credentials.load().await {
            Ok(stored) => stored.map(|credentials| credentials.access_token),
            Err(err) => {
                warn!(error = %err, "failed to read stored credentials");
                None
            }
        }
    }

    /// Exchanges the stored refresh token for a new pair and persists it.
    /// Any failure here clears all credential material; callers treat the
    /// resulting `SessionExpired` as a forced return to login.
    async fn refresh_tokens(&self) -> Result<TokenPair> {
        let stored = match self.credentials.load().await {
            Ok(Some(stored)) => stored,
            _ => return Err(ApiError::Unauthorized),
        };

        let pair = match self.request_refresh(&stored.refresh_token).await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "token refresh failed, clearing session");
                if let Err(err) = self.credentials.clear().await {
                    warn!(error = %err, "failed to clear stored credentials");
                }
                return Err(ApiError::SessionExpired);
            }
        };

        let rotated = StoredCredentials {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            user: stored.user,
        };
        if let Err(err) = self.credentials.store(&rotated).await {
            warn!(error = %err, "failed to persist rotated tokens");
        }

        Ok(pair)
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let body = json!({ "refreshToken": refresh_token });
        let response = self
            .execute(
                Method::POST,
                "/auth/refresh",
                &[],
                &Payload::Json(&body),
                None,
            )
            .await?;
        let response = check_status(response).await?;
        decode_json(response).await
    }
}

/// Maps non-2xx responses to the error taxonomy, surfacing the backend
/// message where one is present.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .ok()
        .and_then(|text| serde_json::from_str::<ApiErrorBody>(&text).ok())
        .and_then(ApiErrorBody::into_message);

    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(
            message.unwrap_or_else(|| "Not found".to_string()),
        ));
    }

    Err(ApiError::Api {
        status: status.as_u16(),
        message: message.unwrap_or_else(|| "Request failed".to_string()),
    })
}

/// Reads the body and deserializes it, transparently unwrapping the
/// `{ success, data }` envelope some endpoints use. Empty bodies decode as
/// JSON null so `()` targets work for no-content responses.
async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = response.bytes().await?;
    let value: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok(serde_json::from_value(unwrap_envelope(value))?)
}

fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(ref map) if map.contains_key("success") && map.contains_key("data") => {
            map.get("data").cloned().unwrap_or(Value::Null)
        }
        other => other,
    }
}
