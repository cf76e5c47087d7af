//! Status code expectations and assertions.
//!
//! `expect_*` methods compare the status code with a [`StatusExpectation`] and
//! return the response on a match, or an [`ExpectationFailure`] value
//! otherwise. `assert_*` methods do the same but turn the failure into
//! [`Error::Assertion`], so it can be propagated with `?` alongside every
//! other error of this crate.
//!
//! ```rust
//! # async fn run(resp: fluent_http::Response) -> fluent_http::Result<()> {
//! let users = resp.assert_ok()?.json_array().await?;
//! # Ok(()) }
//! ```
use std::collections::BTreeSet;
use std::fmt;

use http::StatusCode;

use crate::errors::{Error, Result};
use crate::net::Response;

/// Set of acceptable status codes.
///
/// Ranges are expanded into explicit codes when the expectation is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusExpectation {
    codes: BTreeSet<u16>,
}

impl StatusExpectation {
    pub fn code(code: u16) -> Self {
        Self::codes([code])
    }

    pub fn codes(codes: impl IntoIterator<Item = u16>) -> Self {
        Self { codes: codes.into_iter().collect() }
    }

    /// All codes of one hundred-block, e.g. `class(2)` is `200..=299`.
    pub(crate) fn class(hundreds: u16) -> Self {
        let start = hundreds * 100;
        Self::codes(start..=start + 99)
    }

    pub fn contains(&self, code: u16) -> bool {
        self.codes.contains(&code)
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.codes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Checks `response` against this expectation.
    pub fn evaluate(&self, response: Response) -> Result<Response, ExpectationFailure> {
        let actual = response.status_code();
        if self.contains(actual) {
            Ok(response)
        } else {
            Err(ExpectationFailure {
                expected: self.clone(),
                actual,
            })
        }
    }
}

impl From<u16> for StatusExpectation {
    fn from(code: u16) -> Self {
        Self::code(code)
    }
}

impl From<StatusCode> for StatusExpectation {
    fn from(code: StatusCode) -> Self {
        Self::code(code.as_u16())
    }
}

impl<const N: usize> From<[u16; N]> for StatusExpectation {
    fn from(codes: [u16; N]) -> Self {
        Self::codes(codes)
    }
}

impl From<&[u16]> for StatusExpectation {
    fn from(codes: &[u16]) -> Self {
        Self::codes(codes.iter().copied())
    }
}

impl From<Vec<u16>> for StatusExpectation {
    fn from(codes: Vec<u16>) -> Self {
        Self::codes(codes)
    }
}

// Consecutive codes are shown as ranges: "200..=299", "200, 204".
impl fmt::Display for StatusExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut runs: Vec<(u16, u16)> = Vec::new();
        for code in self.iter() {
            match runs.last_mut() {
                Some((_, end)) if *end + 1 == code => *end = code,
                _ => runs.push((code, code)),
            }
        }

        for (i, (start, end)) in runs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}..={end}")?;
            }
        }
        Ok(())
    }
}

/// A status code that did not meet its expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectationFailure {
    pub expected: StatusExpectation,
    pub actual: u16,
}

impl fmt::Display for ExpectationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected status {}, got {}", self.expected, self.actual)
    }
}

macro_rules! status_classes {
    ($($hundreds:literal => $expect:ident, $assert:ident;)*) => {
        impl Response {
            $(
                #[doc = concat!("Expects a `", stringify!($hundreds), "xx` status code.")]
                pub fn $expect(self) -> Result<Response, ExpectationFailure> {
                    StatusExpectation::class($hundreds).evaluate(self)
                }

                #[doc = concat!("Asserts a `", stringify!($hundreds), "xx` status code.")]
                pub fn $assert(self) -> Result<Response> {
                    self.assert_status_codes(StatusExpectation::class($hundreds))
                }
            )*
        }
    };
}

status_classes! {
    1 => expect_1xx, assert_1xx;
    2 => expect_2xx, assert_2xx;
    3 => expect_3xx, assert_3xx;
    4 => expect_4xx, assert_4xx;
    5 => expect_5xx, assert_5xx;
    6 => expect_6xx, assert_6xx;
    7 => expect_7xx, assert_7xx;
    8 => expect_8xx, assert_8xx;
    9 => expect_9xx, assert_9xx;
}

impl Response {
    pub fn expect_status_codes(
        self,
        expected: impl Into<StatusExpectation>,
    ) -> Result<Response, ExpectationFailure> {
        expected.into().evaluate(self)
    }

    pub fn expect_status_code(self, code: u16) -> Result<Response, ExpectationFailure> {
        self.expect_status_codes(StatusExpectation::code(code))
    }

    pub fn assert_status_codes(self, expected: impl Into<StatusExpectation>) -> Result<Response> {
        self.expect_status_codes(expected).map_err(Error::Assertion)
    }

    pub fn assert_status_code(self, code: u16) -> Result<Response> {
        self.assert_status_codes(StatusExpectation::code(code))
    }

    pub fn assert_ok(self) -> Result<Response> {
        self.assert_status_code(200)
    }

    pub fn assert_no_content(self) -> Result<Response> {
        self.assert_status_code(204)
    }

    pub fn assert_bad_request(self) -> Result<Response> {
        self.assert_status_code(400)
    }

    pub fn assert_unauthorized(self) -> Result<Response> {
        self.assert_status_code(401)
    }

    pub fn assert_forbidden(self) -> Result<Response> {
        self.assert_status_code(403)
    }

    pub fn assert_not_found(self) -> Result<Response> {
        self.assert_status_code(404)
    }
}
