//! Response handling for fluent HTTP clients.
//!
//! A [`Response`] arrives from the transport with its body still streaming.
//! From there it can be materialized ([`Response::bytes`], [`Response::text`],
//! [`Response::text_limited`]), decoded ([`Response::json`],
//! [`Response::deserialize_json`], [`Response::xml`]), rendered for display
//! ([`Response::formatted_text`]), written to disk ([`Response::save_file`]),
//! or checked against status expectations ([`Response::expect_status_code`],
//! [`Response::assert_ok`], ...). Every operation that reads the body consumes
//! the response. The [`blocking`] module mirrors all of it for synchronous
//! callers.
pub mod blocking;
pub mod config;
pub mod content;
pub mod decode;
pub mod errors;
pub mod net;
mod preview;
mod sink;
pub mod status;

pub use config::{DecodeOptions, PropertyNaming};
pub use decode::{JsonDocument, JsonSeq, XmlDocument, XmlElement};
pub use errors::{Cancelled, Error, Result};
pub use net::{fetch, send, Content, Response, ResponseEnvelope};
pub use status::{ExpectationFailure, StatusExpectation};

pub use tokio_util::sync::CancellationToken;
