//! Request configuration as handed over by the calling client core.
//!
//! # Design
//! Plain-data fields deserialize from JSON using the calling library's
//! camelCase spelling, so a config can be stored or logged as data. Handles
//! and callbacks (`cancel_token`, progress callbacks, `params_serializer`,
//! `validate_status`) are attached in code and skipped by serde.
//!
//! The adapter treats a config as read-only apart from header normalization,
//! which rewrites `headers` in place. The response echoes the normalized
//! config back.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::body::RequestBody;
use crate::cancel::CancelToken;
use crate::http::{Headers, HttpMethod, RedirectPolicy, RequestCache, RequestMode};
use crate::params::Params;

pub const DEFAULT_XSRF_COOKIE_NAME: &str = "XSRF-TOKEN";
pub const DEFAULT_XSRF_HEADER_NAME: &str = "X-XSRF-TOKEN";

/// How the response body is decoded.
///
/// Unrecognized names fall back to `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    ArrayBuffer,
    Blob,
    Json,
    FormData,
    #[default]
    Text,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::ArrayBuffer => "arraybuffer",
            ResponseType::Blob => "blob",
            ResponseType::Json => "json",
            ResponseType::FormData => "formData",
            ResponseType::Text => "text",
        }
    }
}

impl From<&str> for ResponseType {
    fn from(value: &str) -> Self {
        match value {
            "arraybuffer" => ResponseType::ArrayBuffer,
            "blob" => ResponseType::Blob,
            "json" => ResponseType::Json,
            "formData" => ResponseType::FormData,
            _ => ResponseType::Text,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResponseType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ResponseType::from(raw.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BasicAuth {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Behaviour switches kept for backwards compatibility with older clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transitional {
    /// Tag timeouts `ETIMEDOUT` instead of `ECONNABORTED`.
    pub clarify_timeout_error: bool,
}

/// Bytes received so far. `total` is `None` when the server sent no usable
/// `Content-Length` (chunked transfer, compressed bodies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    pub total: Option<u64>,
}

#[derive(Clone)]
pub struct ProgressCallback(Arc<dyn Fn(ProgressEvent) + Send + Sync>);

impl ProgressCallback {
    pub fn new(f: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for ProgressCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressCallback")
    }
}

/// Custom query-string serializer; replaces the default encoding entirely.
#[derive(Clone)]
pub struct ParamsSerializer(Arc<dyn Fn(&Params) -> String + Send + Sync>);

impl ParamsSerializer {
    pub fn new(f: impl Fn(&Params) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn serialize(&self, params: &Params) -> String {
        (self.0)(params)
    }
}

impl fmt::Debug for ParamsSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParamsSerializer")
    }
}

/// Decides which statuses resolve. See [`crate::settle`].
#[derive(Clone)]
pub struct ValidateStatus(Arc<dyn Fn(u16) -> bool + Send + Sync>);

impl ValidateStatus {
    pub fn new(f: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn check(&self, status: u16) -> bool {
        (self.0)(status)
    }
}

impl fmt::Debug for ValidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValidateStatus")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestConfig {
    #[serde(rename = "baseURL")]
    pub base_url: Option<String>,
    pub url: String,
    pub method: HttpMethod,
    pub headers: Headers,
    pub data: Option<RequestBody>,
    pub params: Option<Params>,
    #[serde(skip)]
    pub params_serializer: Option<ParamsSerializer>,
    pub response_type: Option<ResponseType>,
    pub with_credentials: Option<bool>,
    pub mode: Option<RequestMode>,
    pub cache: Option<RequestCache>,
    pub integrity: Option<String>,
    pub redirect: Option<RedirectPolicy>,
    pub referrer: Option<String>,
    /// Milliseconds; zero disables the timer.
    #[serde(deserialize_with = "timeout_millis")]
    pub timeout: u64,
    pub timeout_error_message: Option<String>,
    pub transitional: Transitional,
    pub auth: Option<BasicAuth>,
    pub xsrf_cookie_name: Option<String>,
    pub xsrf_header_name: Option<String>,
    #[serde(skip)]
    pub cancel_token: Option<CancelToken>,
    #[serde(skip)]
    pub on_download_progress: Option<ProgressCallback>,
    /// Accepted for compatibility; fetch bodies expose no upload stream, so
    /// this is never called.
    #[serde(skip)]
    pub on_upload_progress: Option<ProgressCallback>,
    #[serde(skip)]
    pub validate_status: Option<ValidateStatus>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            url: String::new(),
            method: HttpMethod::Get,
            headers: Headers::new(),
            data: None,
            params: None,
            params_serializer: None,
            response_type: None,
            with_credentials: None,
            mode: None,
            cache: None,
            integrity: None,
            redirect: None,
            referrer: None,
            timeout: 0,
            timeout_error_message: None,
            transitional: Transitional::default(),
            auth: None,
            xsrf_cookie_name: Some(DEFAULT_XSRF_COOKIE_NAME.to_string()),
            xsrf_header_name: Some(DEFAULT_XSRF_HEADER_NAME.to_string()),
            cancel_token: None,
            on_download_progress: None,
            on_upload_progress: None,
            validate_status: None,
        }
    }
}

/// Accepts any JSON number. Negative, fractional-below-one and non-finite
/// values all mean "no timer".
fn timeout_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let ms = f64::deserialize(deserializer)?;
    Ok(if ms.is_finite() && ms >= 1.0 { ms as u64 } else { 0 })
}

impl RequestConfig {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>, data: impl Into<RequestBody>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::new(HttpMethod::Post, url)
        }
    }

    /// Decoding applied to successful responses.
    pub fn effective_response_type(&self) -> ResponseType {
        self.response_type.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_client_library() {
        let config = RequestConfig::default();
        assert_eq!(config.method, HttpMethod::Get);
        assert_eq!(config.timeout, 0);
        assert_eq!(config.xsrf_cookie_name.as_deref(), Some("XSRF-TOKEN"));
        assert_eq!(config.xsrf_header_name.as_deref(), Some("X-XSRF-TOKEN"));
        assert_eq!(config.effective_response_type(), ResponseType::Text);
    }

    #[test]
    fn deserializes_camel_case_json() {
        let config: RequestConfig = serde_json::from_str(
            r#"{
                "baseURL": "https://api.example.com/v1/",
                "url": "/users",
                "method": "post",
                "headers": {"Accept": "application/json"},
                "data": {"size": 10, "start": 1},
                "params": {"page": 2, "tags": ["a", "b"]},
                "responseType": "json",
                "withCredentials": true,
                "mode": "no-cors",
                "cache": "no-store",
                "redirect": "manual",
                "timeout": 500,
                "timeoutErrorMessage": "too slow",
                "transitional": {"clarifyTimeoutError": true},
                "auth": {"username": "jane", "password": "s3cret"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com/v1/"));
        assert_eq!(config.method, HttpMethod::Post);
        assert_eq!(config.headers.get("accept"), Some("application/json"));
        assert!(matches!(config.data, Some(RequestBody::Json(_))));
        assert_eq!(config.params.as_ref().map(|p| p.len()), Some(2));
        assert_eq!(config.response_type, Some(ResponseType::Json));
        assert_eq!(config.with_credentials, Some(true));
        assert_eq!(config.mode, Some(RequestMode::NoCors));
        assert_eq!(config.cache, Some(RequestCache::NoStore));
        assert_eq!(config.redirect, Some(RedirectPolicy::Manual));
        assert_eq!(config.timeout, 500);
        assert!(config.transitional.clarify_timeout_error);
        assert_eq!(config.auth, Some(BasicAuth::new("jane", "s3cret")));
        // Unspecified fields keep their defaults.
        assert_eq!(config.xsrf_cookie_name.as_deref(), Some("XSRF-TOKEN"));
    }

    #[test]
    fn non_positive_timeout_disables_the_timer() {
        let config: RequestConfig = serde_json::from_str(r#"{"timeout": -1}"#).unwrap();
        assert_eq!(config.timeout, 0);

        let config: RequestConfig = serde_json::from_str(r#"{"timeout": 1500.7}"#).unwrap();
        assert_eq!(config.timeout, 1500);

        let config: RequestConfig = serde_json::from_str(r#"{"timeout": 250}"#).unwrap();
        assert_eq!(config.timeout, 250);
    }

    #[test]
    fn unknown_response_type_falls_back_to_text() {
        let config: RequestConfig =
            serde_json::from_str(r#"{"responseType": "document"}"#).unwrap();
        assert_eq!(config.effective_response_type(), ResponseType::Text);
    }
}
