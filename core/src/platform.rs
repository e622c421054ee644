//! Capabilities the adapter borrows from its host.
//!
//! # Design
//! The adapter never reaches for globals. The request primitive and the
//! browser-only helpers (cookie jar, same-origin check) are injected, so
//! tests substitute fakes and non-browser hosts simply omit the browser
//! context.

use std::collections::HashMap;

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;
use crate::http::{FetchRequest, FetchResponse};

/// A fetch-like request primitive.
///
/// Implementations should watch `request.options.signal` and return
/// `TransportError::Aborted` once it fires. Resolving means response headers
/// arrived; the body may still be streaming.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// Browser-only helpers used for XSRF protection.
pub trait BrowserContext: Send + Sync {
    /// False for workers and other embeddings where cookies must not be
    /// forwarded into headers.
    fn supports_credentialed_cookies(&self) -> bool {
        true
    }

    fn read_cookie(&self, name: &str) -> Option<String>;

    fn is_same_origin(&self, url: &str) -> bool;
}

/// A fixed page origin with a fixed cookie jar.
#[derive(Debug, Clone)]
pub struct StaticBrowserContext {
    origin: Url,
    cookies: HashMap<String, String>,
    credentialed: bool,
}

impl StaticBrowserContext {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            cookies: HashMap::new(),
            credentialed: true,
        }
    }

    /// Parse a `document.cookie`-style string (`a=1; b=2`).
    pub fn with_cookie_string(mut self, cookies: &str) -> Self {
        for pair in cookies.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Model a worker-like embedding that has cookies but must not use them.
    pub fn without_credentialed_cookies(mut self) -> Self {
        self.credentialed = false;
        self
    }
}

impl BrowserContext for StaticBrowserContext {
    fn supports_credentialed_cookies(&self) -> bool {
        self.credentialed
    }

    fn read_cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    /// Relative URLs resolve against the page origin first.
    fn is_same_origin(&self, url: &str) -> bool {
        self.origin
            .join(url)
            .map(|target| target.origin() == self.origin.origin())
            .unwrap_or(false)
    }
}
