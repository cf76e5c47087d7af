//! JSON decoding of response bodies.
//!
//! All JSON operations go through [`Response::parse`] with the parser name
//! `"JSON"`, so a malformed body always fails with an [`Error::Parse`] that
//! shows the received text. Failures after a successful parse (wrong root
//! shape, typed deserialization mismatch) are [`Error::Shape`] errors.
//!
//! Nesting is measured on the raw bytes before the document is parsed, so a
//! document deeper than `max_depth` is a [`Error::Shape`] error and never
//! reaches the parser's stack.
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::config::{self, DecodeOptions, PropertyNaming};
use crate::content::{ContentReader, MirrorReader};
use crate::errors::{BoxError, Error, Result};
use crate::net::Response;

/// Parsed, read-only JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument {
    root: Value,
}

impl JsonDocument {
    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_root(self) -> Value {
        self.root
    }

    /// Looks up a value by JSON pointer (`/items/0/name`).
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.root.pointer(pointer)
    }

    /// Looks up a field of the root object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }
}

/// Elements of a JSON array body, in document order.
///
/// The sequence cannot be restarted; decode the response again for a second pass.
#[derive(Debug)]
pub struct JsonSeq {
    items: std::vec::IntoIter<Value>,
}

impl Iterator for JsonSeq {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl ExactSizeIterator for JsonSeq {}

impl Response {
    pub async fn json_document(self) -> Result<JsonDocument> {
        self.json_document_with(config::defaults(), &CancellationToken::new()).await
    }

    pub async fn json_document_with(
        self,
        options: &DecodeOptions,
        cancel: &CancellationToken,
    ) -> Result<JsonDocument> {
        // Options built by hand skip validation
        let max_depth = options.json.max_depth.min(config::MAX_DEPTH_LIMIT);
        let root = self
            .parse("JSON", options.mirror_limit, cancel, move |reader, cancel| {
                read_json(reader, cancel, max_depth)
            })
            .await??;
        Ok(JsonDocument { root })
    }

    /// Root node of the JSON body.
    pub async fn json(self) -> Result<Value> {
        self.json_with(config::defaults(), &CancellationToken::new()).await
    }

    pub async fn json_with(self, options: &DecodeOptions, cancel: &CancellationToken) -> Result<Value> {
        Ok(self.json_document_with(options, cancel).await?.into_root())
    }

    /// Elements of a JSON array body, handed out one at a time.
    pub async fn json_seq(self) -> Result<JsonSeq> {
        self.json_seq_with(config::defaults(), &CancellationToken::new()).await
    }

    pub async fn json_seq_with(self, options: &DecodeOptions, cancel: &CancellationToken) -> Result<JsonSeq> {
        let items = self.json_array_with(options, cancel).await?;
        Ok(JsonSeq { items: items.into_iter() })
    }

    /// Elements of a JSON array body.
    pub async fn json_array(self) -> Result<Vec<Value>> {
        self.json_array_with(config::defaults(), &CancellationToken::new()).await
    }

    pub async fn json_array_with(
        self,
        options: &DecodeOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>> {
        match self.json_with(options, cancel).await? {
            Value::Array(items) => Ok(items),
            other => Err(Error::Shape {
                expected: "JSON array".to_string(),
                message: format!("document root is {}", kind(&other)),
            }),
        }
    }

    /// Deserializes the JSON body into `T`.
    pub async fn deserialize_json<T: DeserializeOwned>(self) -> Result<T> {
        self.deserialize_json_with(config::defaults(), &CancellationToken::new()).await
    }

    pub async fn deserialize_json_with<T: DeserializeOwned>(
        self,
        options: &DecodeOptions,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let mut root = self.json_with(options, cancel).await?;
        if options.json.property_naming == PropertyNaming::SnakeCase {
            root = snake_case_keys(root);
        }

        serde_json::from_value(root).map_err(|e| Error::Shape {
            expected: std::any::type_name::<T>().to_string(),
            message: e.to_string(),
        })
    }
}

/// Reads and parses the body. The outer error is a parse failure; the inner one
/// is a document that nests deeper than `max_depth`.
async fn read_json(
    mut reader: MirrorReader<ContentReader>,
    _cancel: CancellationToken,
    max_depth: usize,
) -> std::result::Result<Result<Value>, BoxError> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    if let Err(e) = check_depth(&buf, max_depth) {
        return Ok(Err(e));
    }

    let mut de = serde_json::Deserializer::from_slice(&buf);
    de.disable_recursion_limit();
    let value = Value::deserialize(&mut de)?;
    de.end()?;
    Ok(Ok(value))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Counts array and object nesting outside string literals.
fn check_depth(input: &[u8], max_depth: usize) -> Result<()> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for &b in input {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                if depth > max_depth {
                    return Err(Error::Shape {
                        expected: format!("JSON nested at most {max_depth} levels"),
                        message: format!("document nests deeper than {max_depth} levels"),
                    });
                }
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn snake_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (to_snake_case(&k), snake_case_keys(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(snake_case_keys).collect()),
        other => other,
    }
}

fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
        } else if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use serde::Deserialize;
    use serde_json::json;

    fn json_response(body: &'static str) -> Response {
        Response::from_http(
            http::Response::builder()
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn document_is_navigable() {
        let doc = json_response(r#"{"a":1,"items":[{"name":"x"}]}"#).json_document().await.unwrap();
        assert_eq!(doc.get("a"), Some(&json!(1)));
        assert_eq!(doc.pointer("/items/0/name"), Some(&json!("x")));
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error_with_raw_text() {
        let err = json_response("not json").json().await.unwrap_err();
        assert!(matches!(err, Error::Parse { parser: "JSON", .. }));
        assert!(err.to_string().contains("not json"));
    }

    #[tokio::test]
    async fn arrays_as_seq_and_vec() {
        let items = json_response("[1, \"two\", null]").json_array().await.unwrap();
        assert_eq!(items, vec![json!(1), json!("two"), Value::Null]);

        let seq = json_response("[1, 2, 3]").json_seq().await.unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.collect::<Vec<_>>(), vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn non_array_root_is_a_shape_error() {
        let err = json_response(r#"{"a":1}"#).json_array().await.unwrap_err();
        match err {
            Error::Shape { expected, message } => {
                assert_eq!(expected, "JSON array");
                assert_eq!(message, "document root is an object");
            }
            other => panic!("expected Shape error, got {:?}", other),
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        user_id: u64,
        display_name: String,
    }

    #[tokio::test]
    async fn deserialize_into_type() {
        let user: User = json_response(r#"{"user_id":7,"display_name":"Ada"}"#)
            .deserialize_json()
            .await
            .unwrap();
        assert_eq!(user, User { user_id: 7, display_name: "Ada".into() });
    }

    #[tokio::test]
    async fn snake_case_naming_matches_camel_case_keys() {
        let opts = DecodeOptions::builder()
            .property_naming(PropertyNaming::SnakeCase)
            .build()
            .unwrap();
        let user: User = json_response(r#"{"userId":7,"DisplayName":"Ada"}"#)
            .deserialize_json_with(&opts, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.display_name, "Ada");
    }

    #[tokio::test]
    async fn type_mismatch_names_the_target_type() {
        let err = json_response(r#"{"user_id":"seven"}"#)
            .deserialize_json::<User>()
            .await
            .unwrap_err();
        match err {
            Error::Shape { expected, .. } => assert!(expected.ends_with("User")),
            other => panic!("expected Shape error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn depth_limit_is_enforced() {
        let opts = DecodeOptions::builder().max_depth(2).build().unwrap();
        let cancel = CancellationToken::new();

        assert!(json_response("[[1]]").json_with(&opts, &cancel).await.is_ok());
        let err = json_response("[[[1]]]").json_with(&opts, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Shape { .. }));
    }

    fn nested(depth: usize) -> String {
        format!("{}{}", "[".repeat(depth), "]".repeat(depth))
    }

    fn owned_json_response(body: String) -> Response {
        Response::from_http(
            http::Response::builder()
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn default_depth_boundary() {
        let root = owned_json_response(nested(config::DEFAULT_MAX_DEPTH)).json().await.unwrap();
        assert!(root.is_array());

        let err = owned_json_response(nested(config::DEFAULT_MAX_DEPTH + 1)).json().await.unwrap_err();
        assert!(matches!(err, Error::Shape { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn raised_depth_limit_is_honored() {
        let opts = DecodeOptions::builder().max_depth(config::MAX_DEPTH_LIMIT).build().unwrap();
        let cancel = CancellationToken::new();

        let root = owned_json_response(nested(200)).json_with(&opts, &cancel).await.unwrap();
        assert!(root.is_array());
        let err = owned_json_response(nested(config::MAX_DEPTH_LIMIT + 1))
            .json_with(&opts, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Shape { .. }));
    }

    #[tokio::test]
    async fn brackets_inside_strings_do_not_nest() {
        let opts = DecodeOptions::builder().max_depth(1).build().unwrap();
        let root = json_response(r#"{"a":"[[{\"[["}"#)
            .json_with(&opts, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(root["a"], json!("[[{\"[["));
    }

    #[tokio::test]
    async fn trailing_garbage_is_a_parse_error() {
        let err = json_response("[1] [2]").json().await.unwrap_err();
        assert!(matches!(err, Error::Parse { parser: "JSON", .. }));
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("userId"), "user_id");
        assert_eq!(to_snake_case("DisplayName"), "display_name");
        assert_eq!(to_snake_case("userID"), "user_id");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("content-type"), "content_type");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("v2Api"), "v2_api");
    }
}
