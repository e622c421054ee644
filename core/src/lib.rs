//! Fetch-backed transport adapter for a pluggable HTTP client core.
//!
//! # Overview
//! A client core hands the adapter a `RequestConfig`; the adapter turns it
//! into a fetch call through an injected [`Fetch`] primitive and settles
//! with a normalized [`Response`]. The host supplies the actual I/O, which
//! keeps the adapter deterministic under test.
//!
//! # Design
//! - Platform capabilities (the fetch primitive, cookie jar, same-origin
//!   check) are traits in [`platform`], never globals.
//! - The caller's cancel token, the timeout timer, and the transport race in
//!   a single `select!`; exactly one of them settles each call.
//! - Timeouts resolve with an error-shaped [`Resolved::Timeout`] rather than
//!   rejecting, which is the contract the client core expects.
//! - Upload progress is not supported; the callback is accepted and ignored.

pub mod abort;
pub mod adapter;
pub mod body;
pub mod cancel;
pub mod config;
pub mod error;
pub mod http;
pub mod params;
pub mod platform;
pub mod response;
pub mod settle;

pub use abort::{AbortController, AbortSignal};
pub use adapter::{Adapter, FetchAdapter, Resolved};
pub use body::{Blob, Body, FormData, FormValue, RequestBody, ResponseData};
pub use cancel::{Cancel, CancelToken, CancelTokenSource, Canceller};
pub use config::{
    BasicAuth, ParamsSerializer, ProgressCallback, ProgressEvent, RequestConfig, ResponseType,
    Transitional, ValidateStatus,
};
pub use error::{AdapterError, ErrorCode, TransportError};
pub use http::{
    Credentials, FetchOptions, FetchRequest, FetchResponse, Headers, HttpMethod, RedirectPolicy,
    RequestCache, RequestMode,
};
pub use params::{ParamValue, Params};
pub use platform::{BrowserContext, Fetch, StaticBrowserContext};
pub use response::{RawResponse, Response};
