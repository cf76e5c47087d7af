//! Human-readable rendering of a response body.
//!
//! [`Response::formatted_text`] never fails. The body is read once into memory;
//! JSON bodies are pretty-printed with two-space indentation, XML bodies are
//! re-serialized, and anything else (or anything that does not parse) is
//! returned as plain text.
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::errors::Result;
use crate::net::{Content, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Xml,
    Plain,
}

impl Format {
    fn detect(content_type: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("/json") {
            Format::Json
        } else if content_type.contains("/xml") {
            Format::Xml
        } else {
            Format::Plain
        }
    }
}

/// Outcome of rendering: either the structured rendering, or the plain text to fall back on.
enum Rendered {
    Formatted(String),
    Fallback { text: String, reason: String },
}

impl Rendered {
    fn into_text(self) -> String {
        match self {
            Rendered::Formatted(text) => text,
            Rendered::Fallback { text, reason } => {
                log::debug!("formatted preview fell back to plain text: {reason}");
                text
            }
        }
    }
}

impl Response {
    /// Best-effort display form of the body. Never fails.
    ///
    /// If the body stream breaks mid-read, whatever arrived is rendered.
    pub async fn formatted_text(self) -> String {
        let format = Format::detect(self.content_type());
        let (bytes, read_error) = self.bytes_lossy().await;

        let rendered = match read_error {
            Some(e) => Rendered::Fallback {
                text: String::from_utf8_lossy(&bytes).into_owned(),
                reason: e.to_string(),
            },
            None => render(format, bytes).await,
        };
        rendered.into_text()
    }
}

async fn render(format: Format, bytes: Bytes) -> Rendered {
    let structured = match format {
        Format::Json => render_json(bytes.clone()).await,
        Format::Xml => render_xml(bytes.clone()).await,
        Format::Plain => return Rendered::Formatted(String::from_utf8_lossy(&bytes).into_owned()),
    };

    match structured {
        Ok(text) => Rendered::Formatted(text),
        Err(e) => Rendered::Fallback {
            text: String::from_utf8_lossy(&bytes).into_owned(),
            reason: e.to_string(),
        },
    }
}

fn buffered(bytes: Bytes) -> Response {
    Response::new(StatusCode::OK, HeaderMap::new(), Content::from_bytes(bytes))
}

async fn render_json(bytes: Bytes) -> Result<String> {
    let doc = buffered(bytes).json_document().await?;
    Ok(serde_json::to_string_pretty(doc.root())?)
}

async fn render_xml(bytes: Bytes) -> Result<String> {
    buffered(bytes).xml().await?.to_xml_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use std::io;

    fn response(content_type: Option<&'static str>, body: &'static str) -> Response {
        let mut builder = http::Response::builder().status(200);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        Response::from_http(builder.body(body).unwrap())
    }

    #[test]
    fn detects_format_from_content_type() {
        assert_eq!(Format::detect("application/json; charset=utf-8"), Format::Json);
        assert_eq!(Format::detect("Application/JSON"), Format::Json);
        assert_eq!(Format::detect("text/xml"), Format::Xml);
        assert_eq!(Format::detect("text/html"), Format::Plain);
        assert_eq!(Format::detect(""), Format::Plain);
    }

    #[tokio::test]
    async fn json_is_pretty_printed_with_two_spaces() {
        let out = response(Some("application/json"), r#"{"a":1}"#).formatted_text().await;
        assert_eq!(out, "{\n  \"a\": 1\n}");
    }

    #[tokio::test]
    async fn json_key_order_is_preserved() {
        let out = response(Some("application/json"), r#"{"z":1,"a":[true]}"#).formatted_text().await;
        assert_eq!(out, "{\n  \"z\": 1,\n  \"a\": [\n    true\n  ]\n}");
    }

    #[tokio::test]
    async fn malformed_json_falls_back_to_raw_text() {
        let out = response(Some("application/json"), "not json").formatted_text().await;
        assert_eq!(out, "not json");
    }

    #[tokio::test]
    async fn xml_is_reserialized() {
        let out = response(Some("application/xml"), "<a  x='1'><b>hi</b></a>").formatted_text().await;
        assert_eq!(out, "<a x=\"1\"><b>hi</b></a>");
    }

    #[tokio::test]
    async fn broken_xml_falls_back_to_raw_text() {
        let out = response(Some("text/xml"), "<a><b></a>").formatted_text().await;
        assert_eq!(out, "<a><b></a>");
    }

    #[tokio::test]
    async fn plain_text_and_missing_content_type() {
        assert_eq!(response(Some("text/plain"), "{\"a\":1}").formatted_text().await, "{\"a\":1}");
        assert_eq!(response(None, "hello").formatted_text().await, "hello");
    }

    #[tokio::test]
    async fn stream_failure_renders_what_arrived() {
        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"partial\":")),
            Err(io::Error::other("reset")),
        ]);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        let resp = Response::new(StatusCode::OK, headers, Content::from_stream(stream));

        assert_eq!(resp.formatted_text().await, "{\"partial\":");
    }
}
