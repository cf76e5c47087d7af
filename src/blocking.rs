//! Synchronous variants of the response operations.
//!
//! Each function drives the matching async method to completion on a shared
//! multi-thread tokio runtime that is created on first use. These functions
//! must not be called from inside an async context: tokio refuses to block a
//! runtime thread and panics.
//!
//! ```rust,no_run
//! use fluent_http::blocking;
//! # fn run(resp: fluent_http::Response) -> fluent_http::Result<()> {
//! let body = blocking::text(resp.assert_ok()?)?;
//! # Ok(()) }
//! ```
use std::future::Future;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::config::DecodeOptions;
use crate::content::{ContentReader, MirrorReader};
use crate::decode::{JsonDocument, JsonSeq, XmlDocument};
use crate::errors::{BoxError, Result};
use crate::net::Response;

lazy_static! {
    static ref RUNTIME: Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("fluent-http-blocking")
        .build()
        .expect("Failed to create Tokio runtime");
}

/// Runs `future` to completion on the blocking runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    RUNTIME.block_on(future)
}

pub fn bytes(response: Response) -> Result<Bytes> {
    block_on(response.bytes())
}

pub fn text(response: Response) -> Result<String> {
    block_on(response.text())
}

pub fn text_limited(response: Response, max_chars: usize) -> Result<String> {
    block_on(response.text_limited(max_chars))
}

/// Runs a custom decoder over the body, see [`Response::parse`].
pub fn parse<T, F, Fut, E>(
    response: Response,
    parser: &'static str,
    mirror_limit: Option<usize>,
    cancel: &CancellationToken,
    decode: F,
) -> Result<T>
where
    F: FnOnce(MirrorReader<ContentReader>, CancellationToken) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<BoxError>,
{
    block_on(response.parse(parser, mirror_limit, cancel, decode))
}

pub fn json_document(response: Response) -> Result<JsonDocument> {
    block_on(response.json_document())
}

pub fn json_document_with(
    response: Response,
    options: &DecodeOptions,
    cancel: &CancellationToken,
) -> Result<JsonDocument> {
    block_on(response.json_document_with(options, cancel))
}

pub fn json(response: Response) -> Result<Value> {
    block_on(response.json())
}

pub fn json_with(response: Response, options: &DecodeOptions, cancel: &CancellationToken) -> Result<Value> {
    block_on(response.json_with(options, cancel))
}

pub fn json_seq(response: Response) -> Result<JsonSeq> {
    block_on(response.json_seq())
}

pub fn json_seq_with(response: Response, options: &DecodeOptions, cancel: &CancellationToken) -> Result<JsonSeq> {
    block_on(response.json_seq_with(options, cancel))
}

pub fn json_array(response: Response) -> Result<Vec<Value>> {
    block_on(response.json_array())
}

pub fn json_array_with(
    response: Response,
    options: &DecodeOptions,
    cancel: &CancellationToken,
) -> Result<Vec<Value>> {
    block_on(response.json_array_with(options, cancel))
}

pub fn deserialize_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    block_on(response.deserialize_json())
}

pub fn deserialize_json_with<T: DeserializeOwned>(
    response: Response,
    options: &DecodeOptions,
    cancel: &CancellationToken,
) -> Result<T> {
    block_on(response.deserialize_json_with(options, cancel))
}

pub fn xml(response: Response) -> Result<XmlDocument> {
    block_on(response.xml())
}

pub fn xml_with(response: Response, options: &DecodeOptions, cancel: &CancellationToken) -> Result<XmlDocument> {
    block_on(response.xml_with(options, cancel))
}

pub fn formatted_text(response: Response) -> String {
    block_on(response.formatted_text())
}

pub fn save_file(response: Response, path: impl AsRef<Path>) -> Result<PathBuf> {
    block_on(response.save_file(path))
}

/// Starts the background warm-up on the blocking runtime.
pub fn load_content(response: Response) -> Response {
    let _guard = RUNTIME.enter();
    response.load_content()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use http::header::CONTENT_TYPE;

    fn response(content_type: &'static str, body: &'static str) -> Response {
        Response::from_http(
            http::Response::builder()
                .header(CONTENT_TYPE, content_type)
                .body(body)
                .unwrap(),
        )
    }

    #[test]
    fn text_and_limits() {
        assert_eq!(text(response("text/plain", "hello world")).unwrap(), "hello world");
        assert_eq!(text_limited(response("text/plain", "hello world"), 5).unwrap(), "hello");
        assert_eq!(bytes(response("text/plain", "abc")).unwrap(), Bytes::from_static(b"abc"));
    }

    #[test]
    fn json_operations() {
        let value = json(response("application/json", r#"{"a":1}"#)).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(json_array(response("application/json", "[1,2]")).unwrap().len(), 2);
        assert_eq!(json_seq(response("application/json", "[1,2,3]")).unwrap().count(), 3);
        assert!(matches!(
            json_document(response("application/json", "{oops")),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn json_operations_with_options() {
        let opts = DecodeOptions::builder().max_depth(1).build().unwrap();
        let cancel = CancellationToken::new();

        assert_eq!(json_with(response("application/json", "[1]"), &opts, &cancel).unwrap()[0], 1);
        assert_eq!(json_array_with(response("application/json", "[1,2]"), &opts, &cancel).unwrap().len(), 2);
        assert_eq!(json_seq_with(response("application/json", "[3]"), &opts, &cancel).unwrap().next(), Some(serde_json::json!(3)));
        assert!(matches!(
            json_array_with(response("application/json", "[[1]]"), &opts, &cancel),
            Err(Error::Shape { .. })
        ));
    }

    async fn word_count(
        mut reader: MirrorReader<ContentReader>,
        _cancel: CancellationToken,
    ) -> std::io::Result<usize> {
        use tokio::io::AsyncReadExt;
        let mut text = String::new();
        reader.read_to_string(&mut text).await?;
        Ok(text.split_whitespace().count())
    }

    #[test]
    fn custom_decoder() {
        let cancel = CancellationToken::new();
        let n = parse(response("text/plain", "one two three"), "WORDS", None, &cancel, word_count).unwrap();
        assert_eq!(n, 3);

        let invalid: &'static [u8] = b"one \xff";
        let bad = parse(Response::from_http(http::Response::new(invalid)), "WORDS", None, &cancel, word_count);
        assert!(matches!(bad, Err(Error::Parse { parser: "WORDS", .. })));
    }

    #[test]
    fn formatted_text_never_fails() {
        assert_eq!(formatted_text(response("application/json", "{oops")), "{oops");
        assert_eq!(formatted_text(response("application/xml", "<a/>")), "<a/>");
    }

    #[test]
    fn xml_document() {
        let doc = xml(response("text/xml", "<a><b/></a>")).unwrap();
        assert_eq!(doc.root().map(|r| r.name.as_str()), Some("a"));
    }

    #[test]
    fn warm_up_then_read() {
        let resp = load_content(response("text/plain", "preloaded"));
        assert!(resp.content().is_preloading());
        assert_eq!(text(resp).unwrap(), "preloaded");
    }

    #[test]
    fn save_file_writes_body() {
        let dir = tempfile::tempdir().unwrap();
        let saved = save_file(response("text/plain", "on disk"), dir.path().join("a/b.txt")).unwrap();
        assert_eq!(std::fs::read_to_string(saved).unwrap(), "on disk");
    }
}
