// This is adapted from Kubernetes.
// See apimachinery/pkg/util/validation/validation.go in the Kubernetes source

use std::{fmt::Display, sync::LazyLock};

use const_format::concatcp;
use regex::Regex;
use snafu::Snafu;

const RFC_1123_LABEL_MAX_LENGTH: usize = 63;
pub const RFC_1123_LABEL_FMT: &str = "[a-zA-Z0-9]([-a-zA-Z0-9]*[a-zA-Z0-9])?";
const RFC_1123_LABEL_ERROR_MSG: &str = "a RFC 1123 label must consist of alphanumeric characters or '-', and must start and end with an alphanumeric character";

/// This is a subdomain's max length in DNS (RFC 1123)
const RFC_1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const RFC_1123_SUBDOMAIN_FMT: &str =
    concatcp!(RFC_1123_LABEL_FMT, "(\\.", RFC_1123_LABEL_FMT, ")*");

const DOMAIN_MAX_LENGTH: usize = RFC_1123_SUBDOMAIN_MAX_LENGTH;
/// Same as [`RFC_1123_SUBDOMAIN_FMT`], but allows a trailing dot
const DOMAIN_FMT: &str = concatcp!(RFC_1123_SUBDOMAIN_FMT, "\\.?");
const DOMAIN_ERROR_MSG: &str = "a domain must consist of alphanumeric characters, '-' or '.', and must start with an alphanumeric character and end with an alphanumeric character or '.'";

static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{DOMAIN_FMT}$")).expect("failed to compile domain regex")
});

static RFC_1123_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{RFC_1123_LABEL_FMT}$")).expect("failed to compile RFC 1123 label regex")
});

type Result<T = (), E = Errors> = std::result::Result<T, E>;

/// A collection of errors discovered during validation.
#[derive(Debug)]
pub struct Errors(Vec<Error>);

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}
impl std::error::Error for Errors {}

/// A single validation error.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Regex { source: RegexError },

    #[snafu(display("input is {length} bytes long but must be no more than {max_length}"))]
    TooLong { length: usize, max_length: usize },
}

#[derive(Debug)]
pub struct RegexError {
    /// The primary error message.
    msg: &'static str,

    /// The regex that the input must match.
    regex: &'static str,

    /// Examples of valid inputs (if non-empty).
    examples: &'static [&'static str],
}

impl Display for RegexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            msg,
            regex,
            examples,
        } = self;
        write!(f, "{msg} (")?;
        if !examples.is_empty() {
            for (i, example) in examples.iter().enumerate() {
                let prefix = match i {
                    0 => "e.g.",
                    _ => "or",
                };
                write!(f, "{prefix} {example:?}, ")?;
            }
        }
        write!(f, "regex used for validation is {regex:?})")
    }
}

impl std::error::Error for RegexError {}

/// Returns [`Ok`] if `value`'s length fits within `max_length`.
fn validate_str_length(value: &str, max_length: usize) -> Result<(), Error> {
    if value.len() > max_length {
        TooLongSnafu {
            length: value.len(),
            max_length,
        }
        .fail()
    } else {
        Ok(())
    }
}

/// Returns [`Ok`] if `value` matches `regex`.
fn validate_str_regex(
    value: &str,
    regex: &'static Regex,
    error_msg: &'static str,
    examples: &'static [&'static str],
) -> Result<(), Error> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(RegexError {
            msg: error_msg,
            regex: regex
                .as_str()
                // Clean up start/end-of-line markers
                .trim_start_matches('^')
                .trim_end_matches('$'),
            examples,
        }
        .into())
    }
}

/// Returns [`Ok`] if *all* validations are [`Ok`], otherwise returns all errors.
fn validate_all(validations: impl IntoIterator<Item = Result<(), Error>>) -> Result {
    let errors = validations
        .into_iter()
        .filter_map(|res| res.err())
        .collect::<Vec<_>>();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Errors(errors))
    }
}

/// Tests for a hostname or dotted-quad address, as accepted for the
/// in-cluster DNS domain (e.g. the kubelet `cluster_domain` option).
pub fn is_domain(value: &str) -> Result {
    validate_all([
        validate_str_length(value, DOMAIN_MAX_LENGTH),
        validate_str_regex(
            value,
            &DOMAIN_REGEX,
            DOMAIN_ERROR_MSG,
            &[
                "example.com",
                "example.com.",
                "cluster.local",
                "cluster.local.",
            ],
        ),
    ])
}

/// Tests for a string that conforms to the definition of a label in DNS
/// (RFC 1123): a single name part of at most 63 characters, no dots.
pub fn is_rfc_1123_label(value: &str) -> Result {
    validate_all([
        validate_str_length(value, RFC_1123_LABEL_MAX_LENGTH),
        validate_str_regex(
            value,
            &RFC_1123_LABEL_REGEX,
            RFC_1123_LABEL_ERROR_MSG,
            &["example-label", "1-label-1"],
        ),
    ])
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case("a-")]
    #[case("-a")]
    #[case("a_b")]
    #[case("a b")]
    #[case("a@b")]
    #[case(&"a".repeat(64))]
    fn is_rfc_1123_label_fail(#[case] value: &str) {
        assert!(is_rfc_1123_label(value).is_err());
    }

    #[rstest]
    #[case("a")]
    #[case("node-0")]
    #[case("1-label-1")]
    #[case(&"a".repeat(63))]
    fn is_rfc_1123_label_pass(#[case] value: &str) {
        assert!(is_rfc_1123_label(value).is_ok());
    }

    #[rstest]
    #[case("cluster.local")]
    #[case("CLUSTER.LOCAL")]
    #[case("cluster.local.")]
    #[case("192.2.0.1")]
    #[case("example.com")]
    fn is_domain_pass(#[case] value: &str) {
        assert!(is_domain(value).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case(".leading.dot")]
    #[case("trailing..dots")]
    #[case("under_score.com")]
    #[case(&"a".repeat(254))]
    fn is_domain_fail(#[case] value: &str) {
        assert!(is_domain(value).is_err());
    }
}
