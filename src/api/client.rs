use std::fmt;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ApiResponse;
use crate::config::AppConfig;
use crate::token_store::TokenStore;
use crate::{AppError, AppResult};

/// Extra attempts made for a failed GET.
pub const GET_RETRIES: usize = 2;

fn default_retry_policy() -> ConstantBuilder {
    ConstantBuilder::default()
        .with_delay(Duration::ZERO)
        .with_max_times(GET_RETRIES)
}

/// One failed attempt, before it is flattened into an [`AppError`].
#[derive(Debug)]
enum RequestFailure {
    Transport(reqwest::Error),
    Status { status: StatusCode, message: String },
    Decode { status: StatusCode, message: String },
}

impl RequestFailure {
    fn is_transient(&self) -> bool {
        match self {
            RequestFailure::Transport(_) => true,
            RequestFailure::Status { status, .. } => {
                *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error()
            }
            RequestFailure::Decode { .. } => false,
        }
    }

    fn into_app_error(self) -> AppError {
        match self {
            RequestFailure::Transport(err) => AppError::remote(None, err.to_string()),
            RequestFailure::Status { status, message }
            | RequestFailure::Decode { status, message } => {
                AppError::remote(Some(status.as_u16()), message)
            }
        }
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestFailure::Transport(err) => write!(f, "{err}"),
            RequestFailure::Status { message, .. } | RequestFailure::Decode { message, .. } => {
                f.write_str(message)
            }
        }
    }
}

/// JSON client for the remote REST API.
///
/// Every request carries `Authorization: Bearer <token>` when the
/// [`TokenStore`] holds one. Only GET is retried.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, tokens: TokenStore) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("localdesk/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::remote(None, err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn from_config(config: &AppConfig, tokens: TokenStore) -> AppResult<Self> {
        Self::new(config.api_base_url.clone(), config.api_timeout, tokens)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.tokens.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        url: &str,
    ) -> Result<ApiResponse<T>, RequestFailure> {
        let resp = builder.send().await.map_err(RequestFailure::Transport)?;
        let status = resp.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("");
            return Err(RequestFailure::Status {
                status,
                message: format!("Http failure response for {url}: {} {reason}", status.as_u16())
                    .trim_end()
                    .to_string(),
            });
        }
        resp.json::<ApiResponse<T>>()
            .await
            .map_err(|err| RequestFailure::Decode {
                status,
                message: format!("Http failure during parsing for {url}: {err}"),
            })
    }

    fn finish<T>(
        &self,
        method: &'static str,
        endpoint: &str,
        result: Result<ApiResponse<T>, RequestFailure>,
    ) -> AppResult<ApiResponse<T>> {
        result.map_err(|failure| {
            let err = failure
                .into_app_error()
                .with_context("method", method)
                .with_context("endpoint", endpoint.to_string());
            err.log_with_event("api_request_failed");
            err
        })
    }

    async fn send_json<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, RequestFailure>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(endpoint);
        let mut builder = self
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send_once(builder, &url).await
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> AppResult<ApiResponse<T>> {
        let result = (|| async { self.send_json::<T, ()>(Method::GET, endpoint, None).await })
            .retry(default_retry_policy())
            .when(|failure: &RequestFailure| failure.is_transient())
            .notify(|failure: &RequestFailure, _: Duration| {
                tracing::warn!(
                    target: "localdesk",
                    event = "api_retry",
                    endpoint,
                    error = %failure
                );
            })
            .await;
        self.finish("GET", endpoint, result)
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> AppResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let result = self.send_json(Method::POST, endpoint, Some(body)).await;
        self.finish("POST", endpoint, result)
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> AppResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let result = self.send_json(Method::PUT, endpoint, Some(body)).await;
        self.finish("PUT", endpoint, result)
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> AppResult<ApiResponse<T>> {
        let result = self
            .send_json::<T, ()>(Method::DELETE, endpoint, None)
            .await;
        self.finish("DELETE", endpoint, result)
    }

    /// Multipart upload under the form field `file`. Only the bearer header is set.
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> AppResult<ApiResponse<T>> {
        let url = self.url(endpoint);
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let builder = self.request(Method::POST, &url).multipart(form);
        let result = self.send_once(builder, &url).await;
        self.finish("POST", endpoint, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        let transient = |code: u16| {
            RequestFailure::Status {
                status: StatusCode::from_u16(code).unwrap(),
                message: String::new(),
            }
            .is_transient()
        };
        assert!(transient(500));
        assert!(transient(503));
        assert!(transient(408));
        assert!(transient(429));
        assert!(!transient(400));
        assert!(!transient(401));
        assert!(!transient(404));
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let client = ApiClient::new(
            "https://api.example.com/v1/",
            Duration::from_secs(5),
            TokenStore::in_memory(),
        )
        .unwrap();
        assert_eq!(client.url("users"), "https://api.example.com/v1/users");
        assert_eq!(client.url("/users/3"), "https://api.example.com/v1/users/3");
    }

    #[test]
    fn status_failures_use_server_message_format() {
        let err = RequestFailure::Status {
            status: StatusCode::NOT_FOUND,
            message: "Http failure response for /users/9: 404 Not Found".into(),
        }
        .into_app_error();
        assert_eq!(
            err.message(),
            "Error Code: 404\nMessage: Http failure response for /users/9: 404 Not Found"
        );
        assert_eq!(err.remote_status(), Some("404"));
    }
}
