//! HTTP transport types handed to, and returned by, an injected [`Fetch`].
//!
//! # Design
//! These types describe a fetch call as plain data. The adapter derives a
//! `FetchRequest` from a `RequestConfig` and never touches the network
//! itself; the injected transport executes it and returns a
//! `FetchResponse`. All fields use owned types so a transport can move a
//! request onto another task or thread without lifetime concerns.
//!
//! [`Fetch`]: crate::platform::Fetch

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::abort::AbortSignal;
use crate::body::{Body, RequestBody};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Upper-case wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// GET and HEAD requests never carry a body.
    pub fn allows_body(&self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a method name is not one of the supported verbs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered header list with case-insensitive lookup.
///
/// Keys keep the casing they were inserted with. Lookups and removals ignore
/// ASCII case, matching how HTTP treats header names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(pub(crate) Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set `name`, replacing any existing entry that differs only in case.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(&name)) {
            Some(slot) => *slot = (name, value),
            None => self.0.push((name, value)),
        }
    }

    /// Add a value for `name`. A repeated name (any casing) is folded into
    /// the existing entry as `"first, second"`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(&name)) {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => self.0.push((name, value)),
        }
    }

    /// Remove every entry named `name` (any casing). Returns whether anything
    /// was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.0.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Collects with `append`, so repeated names join into one entry.
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(map
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect())
    }
}

/// Credentials mode sent with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    Include,
    Omit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Cors,
    NoCors,
    SameOrigin,
    Navigate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestCache {
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectPolicy {
    Follow,
    Error,
    Manual,
}

/// Options for one fetch call, derived entirely from a `RequestConfig`.
///
/// Fields left `None` were not set by the caller; the transport applies its
/// own defaults for them.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: HttpMethod,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub signal: AbortSignal,
    pub credentials: Option<Credentials>,
    pub mode: Option<RequestMode>,
    pub cache: Option<RequestCache>,
    pub integrity: Option<String>,
    pub redirect: Option<RedirectPolicy>,
    pub referrer: Option<String>,
}

/// A fully resolved request: absolute URL plus transport options.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub options: FetchOptions,
}

/// What a transport hands back once response headers have arrived.
///
/// The body is still a stream at this point; it can be read once.
#[derive(Debug)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Body,
}

impl FetchResponse {
    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Declared `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("content-length")
            .and_then(|raw| raw.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_any_case_and_renders_upper() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("Head".parse::<HttpMethod>().unwrap(), HttpMethod::Head);
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert!("brew".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn get_and_head_disallow_body() {
        assert!(!HttpMethod::Get.allows_body());
        assert!(!HttpMethod::Head.allows_body());
        assert!(HttpMethod::Post.allows_body());
        assert!(HttpMethod::Delete.allows_body());
    }

    #[test]
    fn headers_lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));

        headers.insert("CONTENT-TYPE", "application/json");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn headers_remove_drops_every_casing() {
        let mut headers = Headers(vec![
            ("content-type".to_string(), "a".to_string()),
            ("Content-Type".to_string(), "b".to_string()),
            ("Accept".to_string(), "*/*".to_string()),
        ]);
        assert!(headers.remove("CONTENT-TYPE"));
        assert_eq!(headers.len(), 1);
        assert!(!headers.remove("content-type"));
    }

    #[test]
    fn headers_append_joins_repeated_names() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("X-Trace", "a");
        headers.append("x-trace", "b");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("X-TRACE"), Some("a, b"));
        assert_eq!(headers.get("set-cookie"), Some("a=1"));
    }

    #[test]
    fn headers_deserialize_from_json_object() {
        let headers: Headers =
            serde_json::from_str(r#"{"Accept":"application/json","X-Retry":3,"X-None":null}"#)
                .unwrap();
        assert_eq!(headers.get("accept"), Some("application/json"));
        assert_eq!(headers.get("x-retry"), Some("3"));
        assert!(!headers.contains("x-none"));
    }

    #[test]
    fn content_length_parses_numeric_header_only() {
        let mut response = FetchResponse {
            url: "http://localhost/".to_string(),
            status: 200,
            status_text: "OK".to_string(),
            headers: Headers::new(),
            body: Body::empty(),
        };
        assert_eq!(response.content_length(), None);
        response.headers.insert("Content-Length", "100");
        assert_eq!(response.content_length(), Some(100));
        response.headers.insert("Content-Length", "chunked");
        assert_eq!(response.content_length(), None);
    }
}
