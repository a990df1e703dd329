//! Parse HTTP response header lines into HeadResult.

use super::HeadResult;

/// Parse collected header lines into HeadResult. Unknown headers are ignored.
pub(crate) fn parse_headers(lines: &[String]) -> HeadResult {
    let mut head = HeadResult::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with("HTTP/") {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            head.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("etag") {
            head.etag = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("last-modified") {
            head.last_modified = Some(value.to_string());
        }
    }

    head
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_headers_content_length() {
        let r = parse_headers(&lines(&["HTTP/1.1 200 OK", "Content-Length: 91646818"]));
        assert_eq!(r.content_length, Some(91_646_818));
        assert!(r.etag.is_none());
        assert!(r.validator().is_none());
    }

    #[test]
    fn parse_headers_etag_preferred_over_last_modified() {
        let r = parse_headers(&lines(&[
            "ETag: \"abc-123\"",
            "Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT",
        ]));
        assert_eq!(r.etag.as_deref(), Some("\"abc-123\""));
        assert_eq!(
            r.last_modified.as_deref(),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
        assert_eq!(r.validator().as_deref(), Some("\"abc-123\""));
    }

    #[test]
    fn parse_headers_last_modified_fallback() {
        let r = parse_headers(&lines(&["last-modified: Mon, 01 Jan 2024 00:00:00 GMT"]));
        assert_eq!(
            r.validator().as_deref(),
            Some("Mon, 01 Jan 2024 00:00:00 GMT")
        );
    }

    #[test]
    fn parse_headers_bad_length_ignored() {
        let r = parse_headers(&lines(&["Content-Length: lots"]));
        assert!(r.content_length.is_none());
    }
}
