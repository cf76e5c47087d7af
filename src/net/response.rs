//! HTTP response model.
//!
//! A [`Response`] is one HTTP exchange whose headers have arrived but whose
//! body may still be streaming. It owns its [`Content`]; every operation that
//! reads the body takes the response by value, so a body can only be
//! materialized once.
//!
//! ## Notes
//! - `headers` is an `http::HeaderMap`, which is **case-insensitive** for
//!   header names.
//! - The original transport objects stay reachable through
//!   [`Response::to_original_request`] and [`Response::to_original_envelope`].
//!
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode, Version};
use url::Url;

use crate::net::Content;

/// Everything the transport told us about the response besides its body.
///
/// All fields reflect the **received** response as-is.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    /// Final URL of the response (after redirects, if any). `None` for
    /// responses that did not come from a transport.
    pub url: Option<Url>,

    pub status: StatusCode,

    pub version: Version,

    /// Response headers as a case-insensitive map.
    pub headers: HeaderMap,

    /// Peer address, when the transport reports one.
    pub remote_addr: Option<SocketAddr>,
}

#[derive(Debug)]
pub struct Response {
    envelope: ResponseEnvelope,
    content: Content,
    original_request: Option<reqwest::Request>,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, content: Content) -> Self {
        let content = content.with_metadata(&headers);
        Self {
            envelope: ResponseEnvelope {
                url: None,
                status,
                version: Version::HTTP_11,
                headers,
                remote_addr: None,
            },
            content,
            original_request: None,
        }
    }

    /// Wraps an in-memory `http::Response`.
    pub fn from_http<B: Into<Bytes>>(response: http::Response<B>) -> Self {
        let (parts, body) = response.into_parts();
        let mut response = Self::new(parts.status, parts.headers, Content::from_bytes(body));
        response.envelope.version = parts.version;
        response
    }

    /// Wraps a transport response. The body keeps streaming from the connection.
    pub fn from_reqwest(response: reqwest::Response, request: Option<reqwest::Request>) -> Self {
        let envelope = ResponseEnvelope {
            url: Some(response.url().clone()),
            status: response.status(),
            version: response.version(),
            headers: response.headers().clone(),
            remote_addr: response.remote_addr(),
        };

        let stream = futures::TryStreamExt::map_err(response.bytes_stream(), std::io::Error::other);
        let content = Content::from_stream(stream).with_metadata(&envelope.headers);

        Self {
            envelope,
            content,
            original_request: request,
        }
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.envelope.url = Some(url);
        self
    }

    pub fn with_original_request(mut self, request: reqwest::Request) -> Self {
        self.original_request = Some(request);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.envelope.status
    }

    /// Numeric HTTP status code (e.g., `200`, `404`).
    pub fn status_code(&self) -> u16 {
        self.envelope.status.as_u16()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.envelope.headers
    }

    pub fn url(&self) -> Option<&Url> {
        self.envelope.url.as_ref()
    }

    /// Declared content type, or the empty string when it is absent or not valid text.
    pub fn content_type(&self) -> &str {
        self.envelope
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// The request that produced this response, when the transport could keep a copy.
    pub fn to_original_request(&self) -> Option<&reqwest::Request> {
        self.original_request.as_ref()
    }

    pub fn to_original_envelope(&self) -> &ResponseEnvelope {
        &self.envelope
    }

    /// Splits off the body, giving up the rest of the response.
    pub fn into_content(self) -> Content {
        self.content
    }

    pub(crate) fn map_content(mut self, f: impl FnOnce(Content) -> Content) -> Self {
        self.content = f(self.content);
        self
    }
}
