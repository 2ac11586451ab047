//! Escaped endpoint construction.
//!
//! Scheme, host and every path element are escaped as individual path
//! segments before being joined, so caller input can never introduce an extra
//! segment, a query string or a fragment.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped inside a single path segment. Unreserved characters and
/// the sub-delimiters that are legal inside a segment are left as-is.
pub const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// Escape `segment` for use as one path segment.
pub fn escape_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Build `scheme://host/elem/elem...` with every component escaped.
pub fn build_endpoint<S: AsRef<str>>(scheme: &str, host: &str, path_elements: &[S]) -> String {
    let mut endpoint = format!("{}://{}", escape_segment(scheme), escape_segment(host));
    for element in path_elements {
        endpoint.push('/');
        endpoint.push_str(&escape_segment(element.as_ref()));
    }
    endpoint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_plain_segments() {
        let endpoint = build_endpoint("https", "example.com", &["a", "1"]);
        assert_eq!(endpoint, "https://example.com/a/1");
    }

    #[test]
    fn no_path_elements_yields_bare_origin() {
        let endpoint = build_endpoint::<&str>("http", "localhost", &[]);
        assert_eq!(endpoint, "http://localhost");
    }

    #[test]
    fn host_port_survives_escaping() {
        let endpoint = build_endpoint("http", "127.0.0.1:8080", &["tasks"]);
        assert_eq!(endpoint, "http://127.0.0.1:8080/tasks");
    }

    #[test]
    fn slash_inside_segment_is_escaped() {
        let endpoint = build_endpoint("https", "example.com", &["../etc/passwd"]);
        assert_eq!(endpoint, "https://example.com/..%2Fetc%2Fpasswd");
    }

    #[test]
    fn query_and_fragment_markers_are_escaped() {
        let endpoint = build_endpoint("https", "example.com", &["a?b=c#d"]);
        assert_eq!(endpoint, "https://example.com/a%3Fb=c%23d");
    }

    #[test]
    fn spaces_percent_and_unicode_are_escaped() {
        assert_eq!(escape_segment("a b"), "a%20b");
        assert_eq!(escape_segment("100%"), "100%25");
        assert_eq!(escape_segment("çay"), "%C3%A7ay");
        assert_eq!(escape_segment("a;b,c"), "a%3Bb%2Cc");
    }

    #[test]
    fn newline_cannot_reach_the_url() {
        let endpoint = build_endpoint("https", "example.com", &["x\r\nHost: evil"]);
        assert!(!endpoint.contains('\n'));
        assert!(!endpoint.contains('\r'));
    }

    #[test]
    fn segment_sub_delimiters_are_kept() {
        assert_eq!(escape_segment("user@host:1+2=3&$"), "user@host:1+2=3&$");
    }
}
