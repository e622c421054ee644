//! Verify URL building and request normalization against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each vector file describes an input config (or URL parts) and the request
//! the adapter is expected to derive from it. Headers are compared as sorted,
//! lower-cased pairs so insertion order does not cause false negatives.

use async_trait::async_trait;
use fetch_adapter::params::{build_full_path, build_url};
use fetch_adapter::{
    AbortController, Fetch, FetchAdapter, FetchRequest, FetchResponse, Params, RequestConfig,
    TransportError,
};

/// Transport that must never be reached; vectors only exercise `prepare`.
struct Unreachable;

#[async_trait]
impl Fetch for Unreachable {
    async fn fetch(&self, _request: FetchRequest) -> Result<FetchResponse, TransportError> {
        Err(TransportError::Other("test vectors never dispatch".to_string()))
    }
}

// ---------------------------------------------------------------------------
// URL building
// ---------------------------------------------------------------------------

#[test]
fn build_url_test_vectors() {
    let raw = include_str!("../../test-vectors/build_url.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let base_url = case["base_url"].as_str();
        let url = case["url"].as_str().unwrap();
        let params: Option<Params> = serde_json::from_value(case["params"].clone()).unwrap();

        let full_path = build_full_path(base_url, url);
        let built = build_url(&full_path, params.as_ref(), None);
        assert_eq!(built, case["expected"].as_str().unwrap(), "{name}: url");
    }
}

// ---------------------------------------------------------------------------
// Request normalization
// ---------------------------------------------------------------------------

#[test]
fn prepare_test_vectors() {
    let raw = include_str!("../../test-vectors/prepare.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let adapter = FetchAdapter::new(Unreachable);
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut config: RequestConfig = serde_json::from_value(case["config"].clone()).unwrap();
        let expected = &case["expected_request"];

        let request = adapter.prepare(&mut config, AbortController::new().signal());
        assert_eq!(request.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(
            request.options.method.as_str(),
            expected["method"].as_str().unwrap(),
            "{name}: method"
        );

        let mut headers: Vec<(String, String)> = request
            .options
            .headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        headers.sort();
        let expected_headers: Vec<(String, String)> = expected["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(headers, expected_headers, "{name}: headers");

        assert_eq!(
            request.options.body.is_some(),
            expected["has_body"].as_bool().unwrap(),
            "{name}: body presence"
        );
        // Normalized headers are written back into the config.
        assert_eq!(config.headers, request.options.headers, "{name}: config headers");
    }
}
