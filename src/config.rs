//! Decoding options.
//!
//! `DecodeOptions` controls how structured decoders (JSON, XML) interpret a
//! response body and how much of the body is mirrored for diagnostics when a
//! parse fails.
//!
//! `DecodeOptions` provides sensible defaults via [`Default`] and a fluent
//! [`DecodeOptions::builder()`] for customization with validation.
//!
//! # Process-wide defaults
//!
//! Operations that are not handed explicit options read [`defaults()`]. The
//! defaults can be replaced exactly once with [`install_defaults()`], which
//! must happen during startup: the first read freezes whatever is in place, so
//! installing after any decode has run returns
//! [`OptionsError::AlreadyInstalled`].
//!
//! # Examples
//!
//! ```rust
//! use fluent_http::config::{DecodeOptions, PropertyNaming};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opts = DecodeOptions::builder()
//!     .property_naming(PropertyNaming::SnakeCase)
//!     .max_depth(32)
//!     .mirror_limit(Some(4096))
//!     .build()?; // returns Result<DecodeOptions, OptionsError>
//! assert_eq!(opts.json.max_depth, 32);
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `json.property_naming`: How JSON object keys are matched to field names (default: as-is).
//! - `json.max_depth`: Maximum nesting of a JSON document (default: 128, at most 256).
//! - `xml.trim_text`: Trim whitespace around XML text nodes (default: `false`).
//! - `xml.check_end_names`: Reject mismatched XML end tags (default: `true`).
//! - `mirror_limit`: Bytes of body text kept for parse diagnostics (default: 64 KiB, `None` = unbounded).

use std::fmt;
use std::sync::OnceLock;

/// Default number of body bytes mirrored for parse diagnostics.
pub const DEFAULT_MIRROR_LIMIT: usize = 64 * 1024;

/// Default maximum nesting depth of JSON documents.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Largest accepted `json.max_depth`. The JSON parser recurses once per level.
pub const MAX_DEPTH_LIMIT: usize = 256;

static DEFAULTS: OnceLock<DecodeOptions> = OnceLock::new();

/// How JSON object keys are matched against Rust field names when deserializing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PropertyNaming {
    /// Keys are matched exactly as received.
    #[default]
    AsIs,
    /// `camelCase`, `PascalCase` and `kebab-case` keys are rewritten to `snake_case` first.
    SnakeCase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOptions {
    pub property_naming: PropertyNaming,
    pub max_depth: usize,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            property_naming: PropertyNaming::AsIs,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    pub trim_text: bool,
    pub check_end_names: bool,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            trim_text: false,
            check_end_names: true,
        }
    }
}

/// Options for every structured decode operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub json: JsonOptions,
    pub xml: XmlOptions,
    pub mirror_limit: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            json: JsonOptions::default(),
            xml: XmlOptions::default(),
            mirror_limit: Some(DEFAULT_MIRROR_LIMIT),
        }
    }
}

impl DecodeOptions {
    pub fn builder() -> DecodeOptionsBuilder {
        DecodeOptionsBuilder::default()
    }
}

/// Builder for [`DecodeOptions`].
#[derive(Debug, Clone, Default)]
pub struct DecodeOptionsBuilder {
    inner: DecodeOptions,
}

impl DecodeOptionsBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut DecodeOptions)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn property_naming(self, naming: PropertyNaming) -> Self { self.map(|c| c.json.property_naming = naming) }
    pub fn max_depth(self, depth: usize) -> Self { self.map(|c| c.json.max_depth = depth) }
    pub fn trim_text(self, on: bool) -> Self { self.map(|c| c.xml.trim_text = on) }
    pub fn check_end_names(self, on: bool) -> Self { self.map(|c| c.xml.check_end_names = on) }
    pub fn mirror_limit(self, limit: Option<usize>) -> Self { self.map(|c| c.mirror_limit = limit) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut DecodeOptions)) -> Self { self.map(f) }

    /// Validate and build the final options.
    pub fn build(self) -> Result<DecodeOptions, OptionsError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

/// Installs the process-wide default options.
///
/// Succeeds only once, and only before the defaults were first read.
pub fn install_defaults(options: DecodeOptions) -> Result<(), OptionsError> {
    validate(&options)?;
    DEFAULTS.set(options).map_err(|_| OptionsError::AlreadyInstalled)
}

/// Returns the process-wide default options, freezing the built-in ones if none were installed.
pub fn defaults() -> &'static DecodeOptions {
    DEFAULTS.get_or_init(DecodeOptions::default)
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    ZeroDepth,
    DepthTooLarge(usize),
    ZeroMirrorLimit,
    AlreadyInstalled,
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsError::ZeroDepth =>
                write!(f, "json max_depth must be at least 1"),
            OptionsError::DepthTooLarge(depth) =>
                write!(f, "json max_depth {depth} exceeds the limit of {MAX_DEPTH_LIMIT}"),
            OptionsError::ZeroMirrorLimit =>
                write!(f, "mirror_limit must be at least 1 (use None for unbounded)"),
            OptionsError::AlreadyInstalled =>
                write!(f, "default decode options are already installed or in use"),
        }
    }
}
impl std::error::Error for OptionsError {}

fn validate(c: &DecodeOptions) -> Result<(), OptionsError> {
    if c.json.max_depth == 0 {
        return Err(OptionsError::ZeroDepth);
    }
    if c.json.max_depth > MAX_DEPTH_LIMIT {
        return Err(OptionsError::DepthTooLarge(c.json.max_depth));
    }
    if c.mirror_limit == Some(0) {
        return Err(OptionsError::ZeroMirrorLimit);
    }
    Ok(())
}
