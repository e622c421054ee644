//! Normalized response handed back to the calling client core.

use crate::body::ResponseData;
use crate::config::RequestConfig;
use crate::http::{FetchResponse, Headers};

/// Head of the underlying transport response. The body itself is consumed
/// by decoding, so only the metadata is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    /// Header names lower-cased, in the order the transport reported them.
    /// Repeated names are joined into one `", "`-separated value.
    pub headers: Headers,
    /// The normalized config this response answers.
    pub config: RequestConfig,
    pub request: RawResponse,
    /// `None` when decoding was skipped (204 or a non-2xx status).
    pub data: Option<ResponseData>,
}

impl Response {
    pub(crate) fn from_fetch(fetched: &FetchResponse, config: RequestConfig) -> Self {
        let mut headers = Headers::new();
        for (name, value) in fetched.headers.iter() {
            headers.append(name.to_ascii_lowercase(), value);
        }
        Self {
            status: fetched.status,
            status_text: fetched.status_text.clone(),
            headers,
            config,
            request: RawResponse {
                url: fetched.url.clone(),
                status: fetched.status,
                status_text: fetched.status_text.clone(),
                headers: fetched.headers.clone(),
            },
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;

    fn fetched(headers: Headers) -> FetchResponse {
        FetchResponse {
            url: "http://localhost/x".to_string(),
            status: 200,
            status_text: "OK".to_string(),
            headers,
            body: Body::empty(),
        }
    }

    #[test]
    fn repeated_header_names_are_joined() {
        let mut headers = Headers::new();
        headers.insert("X-Trace", "a");
        headers.insert("Content-Type", "text/plain");
        // Bypasses `append` the way a hand-built transport response could.
        headers.0.push(("x-trace".to_string(), "b".to_string()));

        let response = Response::from_fetch(&fetched(headers), RequestConfig::default());
        assert_eq!(response.headers.get("x-trace"), Some("a, b"));
        assert_eq!(response.headers.len(), 2);
        assert_eq!(
            response.headers.iter().collect::<Vec<_>>(),
            vec![("x-trace", "a, b"), ("content-type", "text/plain")]
        );
    }

    #[test]
    fn raw_response_keeps_transport_casing() {
        let headers: Headers = [("Content-Type", "text/plain")].into_iter().collect();
        let response = Response::from_fetch(&fetched(headers), RequestConfig::default());
        assert_eq!(response.request.headers.iter().next(), Some(("Content-Type", "text/plain")));
        assert_eq!(response.headers.iter().next(), Some(("content-type", "text/plain")));
    }
}
