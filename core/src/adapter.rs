//! The fetch adapter: config in, settled response out.
//!
//! # Design
//! `FetchAdapter::execute` runs in two stages:
//!
//! 1. `prepare` normalizes the config (headers, auth, XSRF) and derives the
//!    `FetchRequest`. Header changes are written back into the config.
//! 2. The exchange (transport call, body decoding, status settlement) races
//!    the caller's cancel token and the timeout timer in one `select!`.
//!    Whichever finishes first settles the call. A timer that loses keeps
//!    running on its own task and aborts the signal when it expires.
//!
//! Cancellation only acts while the transport call is in flight, tracked by
//! a flag that a drop guard resets on every exit path. The timer covers the
//! whole exchange and resolves with an error-shaped value instead of
//! rejecting.

use std::fmt;
use std::future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::time::Instant;
use tracing::{debug, instrument, trace};

use crate::abort::{AbortController, AbortSignal};
use crate::body::{decode, Body, RequestBody};
use crate::config::{ProgressCallback, ProgressEvent, RequestConfig};
use crate::error::AdapterError;
use crate::http::{Credentials, FetchOptions, FetchRequest};
use crate::params::{build_full_path, build_url};
use crate::platform::{BrowserContext, Fetch};
use crate::response::Response;
use crate::settle::settle;

/// A successful settlement. Timeouts resolve too, carrying the error.
#[derive(Debug)]
pub enum Resolved {
    Response(Response),
    Timeout(AdapterError),
}

impl Resolved {
    /// Fold the timeout resolution into `Err`.
    pub fn into_result(self) -> Result<Response, AdapterError> {
        match self {
            Resolved::Response(response) => Ok(response),
            Resolved::Timeout(err) => Err(err),
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Resolved::Response(response) => Some(response),
            Resolved::Timeout(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Resolved::Timeout(_))
    }
}

/// The pluggable transport contract of the calling client core.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn call(&self, config: RequestConfig) -> Result<Resolved, AdapterError>;
}

#[derive(Clone)]
pub struct FetchAdapter {
    transport: Arc<dyn Fetch>,
    browser: Option<Arc<dyn BrowserContext>>,
}

impl fmt::Debug for FetchAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchAdapter")
            .field("browser", &self.browser.is_some())
            .finish_non_exhaustive()
    }
}

impl FetchAdapter {
    pub fn new(transport: impl Fetch + 'static) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(transport: Arc<dyn Fetch>) -> Self {
        Self {
            transport,
            browser: None,
        }
    }

    /// Enable XSRF cookie forwarding through `browser`.
    pub fn with_browser_context(mut self, browser: impl BrowserContext + 'static) -> Self {
        self.browser = Some(Arc::new(browser));
        self
    }

    /// Normalize `config` in place and derive the transport request.
    ///
    /// The order matters: form data drops `Content-Type` before auth is
    /// added, and the empty-body check runs after both.
    pub fn prepare(&self, config: &mut RequestConfig, signal: AbortSignal) -> FetchRequest {
        if config.data.as_ref().is_some_and(RequestBody::is_form_data) {
            // The transport picks the multipart boundary.
            config.headers.remove("Content-Type");
        }

        if let Some(auth) = &config.auth {
            let credentials = STANDARD.encode(format!("{}:{}", auth.username, auth.password));
            config.headers.insert("Authorization", format!("Basic {credentials}"));
        }

        if config.data.is_none() {
            config.headers.remove("content-type");
        }

        let full_path = build_full_path(config.base_url.as_deref(), &config.url);

        if let Some(token) = self.xsrf_token(config, &full_path) {
            if let Some(header) = config.xsrf_header_name.clone() {
                config.headers.insert(header, token);
            }
        }

        let url = build_url(
            &full_path,
            config.params.as_ref(),
            config.params_serializer.as_ref(),
        );

        let body = config
            .data
            .as_ref()
            .filter(|body| config.method.allows_body() && !body.is_falsy())
            .cloned();

        let credentials = config.with_credentials.map(|with| {
            if with {
                Credentials::Include
            } else {
                Credentials::Omit
            }
        });

        FetchRequest {
            url,
            options: FetchOptions {
                method: config.method,
                headers: config.headers.clone(),
                body,
                signal,
                credentials,
                mode: config.mode,
                cache: config.cache,
                integrity: config.integrity.clone(),
                redirect: config.redirect,
                referrer: config.referrer.clone(),
            },
        }
    }

    fn xsrf_token(&self, config: &RequestConfig, full_path: &str) -> Option<String> {
        let browser = self
            .browser
            .as_ref()
            .filter(|browser| browser.supports_credentialed_cookies())?;
        let cookie = config.xsrf_cookie_name.as_deref()?;
        if config.with_credentials != Some(true) && !browser.is_same_origin(full_path) {
            return None;
        }
        browser.read_cookie(cookie).filter(|value| !value.is_empty())
    }

    /// Run one request to settlement.
    ///
    /// * `Ok(Resolved::Response)` when the response passes status validation.
    /// * `Ok(Resolved::Timeout)` when the timer fires first.
    /// * `Err(AdapterError::Cancelled)` when the cancel token fires while the
    ///   transport call is in flight.
    /// * `Err(AdapterError::Network)` when the transport fails.
    /// * `Err(AdapterError::Status)` when status validation rejects.
    #[instrument(skip_all, fields(method = %config.method, url = %config.url))]
    pub async fn execute(&self, mut config: RequestConfig) -> Result<Resolved, AdapterError> {
        let controller = AbortController::new();
        let request = self.prepare(&mut config, controller.signal());
        if config.on_upload_progress.is_some() {
            debug!("upload progress is not available over fetch; ignoring callback");
        }
        debug!(target_url = %request.url, "dispatching request");

        let config = &config;
        let in_flight = AtomicBool::new(false);

        let exchange = self.exchange(request, config, &in_flight);
        tokio::pin!(exchange);

        let cancelled = async {
            match &config.cancel_token {
                Some(token) => token.cancelled().await,
                None => future::pending().await,
            }
        };
        tokio::pin!(cancelled);

        let deadline = (config.timeout > 0)
            .then(|| Instant::now() + Duration::from_millis(config.timeout));
        let timer = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => future::pending().await,
            }
        };
        tokio::pin!(timer);

        let mut cancel_armed = config.cancel_token.is_some();
        loop {
            tokio::select! {
                biased;

                outcome = &mut exchange => {
                    if let Some(deadline) = deadline {
                        // The timer outlives settlement and still aborts.
                        let controller = controller.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep_until(deadline).await;
                            controller.abort();
                        });
                    }
                    return outcome.map(Resolved::Response);
                }

                reason = &mut cancelled, if cancel_armed => {
                    if in_flight.load(Ordering::SeqCst) {
                        controller.abort();
                        debug!(%reason, "request cancelled");
                        return Err(AdapterError::cancelled(config, reason));
                    }
                    // Response headers already arrived; cancelling cannot
                    // undo that.
                    trace!(%reason, "cancellation ignored, no request in flight");
                    cancel_armed = false;
                }

                () = &mut timer => {
                    controller.abort();
                    debug!(timeout_ms = config.timeout, "request timed out");
                    return Ok(Resolved::Timeout(AdapterError::timeout(config)));
                }
            }
        }
    }

    async fn exchange(
        &self,
        request: FetchRequest,
        config: &RequestConfig,
        in_flight: &AtomicBool,
    ) -> Result<Response, AdapterError> {
        let fetched = {
            let _in_flight = InFlight::enter(in_flight);
            self.transport.fetch(request).await
        };
        let mut fetched = fetched.map_err(|source| {
            debug!(error = %source, "transport failed");
            AdapterError::network(config, source)
        })?;

        if let Some(callback) = config.on_download_progress.clone() {
            let total = fetched.content_length();
            let body = std::mem::replace(&mut fetched.body, Body::empty());
            let (primary, progress) = body.tee();
            fetched.body = primary;
            tokio::spawn(report_progress(progress, total, callback));
        }

        let mut response = Response::from_fetch(&fetched, config.clone());
        if fetched.ok() && fetched.status != 204 {
            let response_type = config.effective_response_type();
            let content_type = fetched.headers.get("content-type").map(str::to_string);
            let data = decode(fetched.body, response_type, content_type.as_deref())
                .await
                .map_err(|source| AdapterError::Decode {
                    response_type,
                    config: Box::new(config.clone()),
                    source,
                })?;
            response.data = Some(data);
        }
        settle(response)
    }
}

#[async_trait]
impl Adapter for FetchAdapter {
    async fn call(&self, config: RequestConfig) -> Result<Resolved, AdapterError> {
        self.execute(config).await
    }
}

/// Marks the transport call as in flight until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn report_progress(mut body: Body, total: Option<u64>, callback: ProgressCallback) {
    let mut loaded = 0u64;
    while let Some(chunk) = body.chunk().await {
        match chunk {
            Ok(chunk) => {
                loaded += chunk.len() as u64;
                trace!(loaded, ?total, "download progress");
                callback.call(ProgressEvent { loaded, total });
            }
            Err(error) => {
                trace!(%error, "progress stream ended early");
                break;
            }
        }
    }
}
