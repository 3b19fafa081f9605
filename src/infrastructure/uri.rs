//! URI component encoding.
//!
//! Search strings travel in query parameters, so they are encoded with the
//! URI *component* rules: everything except ASCII letters, digits and
//! `- _ . ! ~ * ' ( )` is percent-encoded as UTF-8, including spaces (`%20`,
//! never `+`), `/`, `?`, `&` and `=`.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left as-is by URI component encoding, removed from the
/// "encode everything non-alphanumeric" set.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes `value` for use as a single query parameter value.
///
/// # Example
///
/// ```rust
/// use book_inquiry::infrastructure::uri::encode_uri_component;
///
/// assert_eq!(encode_uri_component("a bit of text"), "a%20bit%20of%20text");
/// assert_eq!(encode_uri_component("@#$%^&"), "%40%23%24%25%5E%26");
/// ```
#[must_use]
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Decodes a percent-encoded component.
///
/// `+` is not treated as a space. Returns `None` if the decoded bytes are not
/// valid UTF-8; malformed escapes such as `%zz` are passed through unchanged.
#[must_use]
pub fn decode_uri_component(value: &str) -> Option<String> {
    percent_decode_str(value)
        .decode_utf8()
        .ok()
        .map(std::borrow::Cow::into_owned)
}
