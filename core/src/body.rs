//! Request payloads, response body streams, and response decoding.
//!
//! # Design
//! A response `Body` is a single-read stream of byte chunks. Reading the
//! body twice (once for download progress, once for decoding) goes through
//! [`Body::tee`], which splits the stream into two independent halves fed
//! by a pump task. Neither half waits for the other.

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Deserializer};
use tokio::sync::mpsc;
use url::form_urlencoded;

use crate::config::ResponseType;
use crate::error::TransportError;

// ---------------------------------------------------------------------------
// Request side
// ---------------------------------------------------------------------------

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        filename: String,
        content_type: Option<String>,
        data: Bytes,
    },
}

/// Ordered multipart form fields. Repeated names are allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    fields: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), FormValue::Text(value.into())));
    }

    pub fn append_file(
        &mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) {
        self.fields.push((
            name.into(),
            FormValue::File {
                filename: filename.into(),
                content_type,
                data: data.into(),
            },
        ));
    }

    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, FormValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Multipart encoding with the given boundary.
    pub fn encode_multipart(&self, boundary: &str) -> Bytes {
        let mut out = BytesMut::new();
        for (name, value) in &self.fields {
            out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match value {
                FormValue::Text(text) => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    out.extend_from_slice(text.as_bytes());
                }
                FormValue::File {
                    filename,
                    content_type,
                    data,
                } => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                        )
                        .as_bytes(),
                    );
                    let content_type =
                        content_type.as_deref().unwrap_or("application/octet-stream");
                    out.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
                    out.extend_from_slice(data);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        out.freeze()
    }
}

/// Request payload as handed over by the calling library.
///
/// The adapter treats it as opaque apart from two questions: is it a
/// multipart form, and is it falsy (an empty string).
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    Bytes(Bytes),
    Json(serde_json::Value),
    UrlEncoded(Vec<(String, String)>),
    Form(FormData),
}

/// A request body serialized for the wire, with the content type the
/// encoder chose (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBody {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl RequestBody {
    pub fn is_form_data(&self) -> bool {
        matches!(self, RequestBody::Form(_))
    }

    /// An empty text payload counts as no payload for the transport.
    pub fn is_falsy(&self) -> bool {
        matches!(self, RequestBody::Text(text) if text.is_empty())
    }

    /// Serialize for a transport. Multipart forms get a fresh boundary,
    /// which is why callers must not supply their own `Content-Type`.
    pub fn encode(&self) -> Result<EncodedBody, serde_json::Error> {
        Ok(match self {
            RequestBody::Text(text) => EncodedBody {
                content_type: Some("text/plain;charset=UTF-8".to_string()),
                bytes: Bytes::from(text.clone()),
            },
            RequestBody::Bytes(bytes) => EncodedBody {
                content_type: None,
                bytes: bytes.clone(),
            },
            RequestBody::Json(value) => EncodedBody {
                content_type: Some("application/json".to_string()),
                bytes: Bytes::from(serde_json::to_vec(value)?),
            },
            RequestBody::UrlEncoded(pairs) => EncodedBody {
                content_type: Some("application/x-www-form-urlencoded;charset=UTF-8".to_string()),
                bytes: Bytes::from(
                    form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(pairs)
                        .finish(),
                ),
            },
            RequestBody::Form(form) => {
                let boundary = format!("----FetchAdapterBoundary{}", uuid::Uuid::new_v4().simple());
                EncodedBody {
                    content_type: Some(format!("multipart/form-data; boundary={boundary}")),
                    bytes: form.encode_multipart(&boundary),
                }
            }
        })
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        RequestBody::Text(value.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        RequestBody::Text(value)
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<FormData> for RequestBody {
    fn from(value: FormData) -> Self {
        RequestBody::Form(value)
    }
}

impl From<Bytes> for RequestBody {
    fn from(value: Bytes) -> Self {
        RequestBody::Bytes(value)
    }
}

/// Strings stay text, everything else is carried as JSON.
impl<'de> Deserialize<'de> for RequestBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(text) => RequestBody::Text(text),
            other => RequestBody::Json(other),
        })
    }
}

// ---------------------------------------------------------------------------
// Response side
// ---------------------------------------------------------------------------

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Single-read response body.
pub struct Body {
    chunks: ChunkStream,
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").finish_non_exhaustive()
    }
}

impl Body {
    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::from_chunks(vec![bytes.into()])
    }

    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        Self::from_stream(stream::iter(chunks.into_iter().map(Ok)))
    }

    pub fn from_stream<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            chunks: Box::pin(chunks),
        }
    }

    /// Next chunk, or `None` once the body is exhausted.
    pub async fn chunk(&mut self) -> Option<Result<Bytes, TransportError>> {
        self.chunks.next().await
    }

    /// Read the remaining body into one buffer.
    pub async fn bytes(mut self) -> Result<Bytes, TransportError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Split into two bodies that each see every chunk.
    ///
    /// A spawned pump drives the source; the halves are buffered without
    /// bound so a slow reader on one side never stalls the other. The pump
    /// exits once the source ends or both halves are dropped.
    pub fn tee(self) -> (Body, Body) {
        let (left_tx, left_rx) = mpsc::unbounded_channel();
        let (right_tx, right_rx) = mpsc::unbounded_channel();
        let mut source = self.chunks;
        tokio::spawn(async move {
            while let Some(item) = source.next().await {
                let left = left_tx.send(item.clone()).is_ok();
                let right = right_tx.send(item).is_ok();
                if !left && !right {
                    break;
                }
            }
        });
        (Body::from_receiver(left_rx), Body::from_receiver(right_rx))
    }

    fn from_receiver(rx: mpsc::UnboundedReceiver<Result<Bytes, TransportError>>) -> Self {
        Self::from_stream(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }))
    }
}

/// Raw bytes tagged with the response content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: String,
    pub data: Bytes,
}

impl Blob {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Decoded response payload; the variant follows the requested response type.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    ArrayBuffer(Bytes),
    Blob(Blob),
    Json(serde_json::Value),
    FormData(FormData),
    Text(String),
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseData::ArrayBuffer(bytes) => Some(bytes),
            ResponseData::Blob(blob) => Some(&blob.data),
            _ => None,
        }
    }
}

/// Why a body could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read response body: {0}")]
    Read(#[from] TransportError),
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot decode form data from content type {0:?}")]
    FormContentType(Option<String>),
    #[error("malformed multipart body")]
    Multipart,
}

/// Read `body` to the end and decode it as `response_type`.
pub async fn decode(
    body: Body,
    response_type: ResponseType,
    content_type: Option<&str>,
) -> Result<ResponseData, DecodeError> {
    let bytes = body.bytes().await?;
    Ok(match response_type {
        ResponseType::ArrayBuffer => ResponseData::ArrayBuffer(bytes),
        ResponseType::Blob => ResponseData::Blob(Blob {
            content_type: content_type.unwrap_or_default().to_ascii_lowercase(),
            data: bytes,
        }),
        ResponseType::Json => ResponseData::Json(serde_json::from_slice(&bytes)?),
        ResponseType::FormData => ResponseData::FormData(parse_form_data(&bytes, content_type)?),
        ResponseType::Text => ResponseData::Text(String::from_utf8_lossy(&bytes).into_owned()),
    })
}

fn parse_form_data(bytes: &[u8], content_type: Option<&str>) -> Result<FormData, DecodeError> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some("application/x-www-form-urlencoded") => {
            let mut form = FormData::new();
            for (name, value) in form_urlencoded::parse(bytes) {
                form.append(name, value);
            }
            Ok(form)
        }
        Some("multipart/form-data") => {
            let boundary = content_type
                .and_then(param_value("boundary"))
                .ok_or(DecodeError::Multipart)?;
            parse_multipart(bytes, &boundary)
        }
        _ => Err(DecodeError::FormContentType(content_type.map(str::to_string))),
    }
}

/// Returns a lookup for `name=value` (optionally quoted) in a header value.
fn param_value(name: &'static str) -> impl Fn(&str) -> Option<String> {
    move |header: &str| {
        header.split(';').skip(1).find_map(|part| {
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().trim_matches('"').to_string())
        })
    }
}

fn parse_multipart(bytes: &[u8], boundary: &str) -> Result<FormData, DecodeError> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut form = FormData::new();

    let mut rest = match find(bytes, delimiter) {
        Some(start) => &bytes[start + delimiter.len()..],
        None => return Err(DecodeError::Multipart),
    };
    loop {
        if rest.starts_with(b"--") {
            return Ok(form);
        }
        rest = rest.strip_prefix(b"\r\n").ok_or(DecodeError::Multipart)?;
        let end = find(rest, delimiter).ok_or(DecodeError::Multipart)?;
        let part = rest[..end].strip_suffix(b"\r\n").unwrap_or(&rest[..end]);
        let split = find(part, b"\r\n\r\n").ok_or(DecodeError::Multipart)?;
        let head = String::from_utf8_lossy(&part[..split]);
        let data = &part[split + 4..];

        let mut disposition = None;
        let mut content_type = None;
        for line in head.split("\r\n") {
            if let Some((key, value)) = line.split_once(':') {
                if key.trim().eq_ignore_ascii_case("content-disposition") {
                    disposition = Some(value.trim().to_string());
                } else if key.trim().eq_ignore_ascii_case("content-type") {
                    content_type = Some(value.trim().to_string());
                }
            }
        }
        let disposition = disposition.ok_or(DecodeError::Multipart)?;
        let name = param_value("name")(&disposition).ok_or(DecodeError::Multipart)?;
        match param_value("filename")(&disposition) {
            Some(filename) => {
                form.append_file(name, filename, content_type, Bytes::copy_from_slice(data))
            }
            None => form.append(name, String::from_utf8_lossy(data)),
        }
        rest = &rest[end + delimiter.len()..];
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
