//! File-name and object-key derivation from source URLs.

/// Name used when a URL path yields nothing usable.
const DEFAULT_FILENAME: &str = "download.bin";

/// Extracts the last path segment from a URL for use as a filename hint.
///
/// Returns `None` if the URL cannot be parsed or the path is empty/root.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Makes a single object-key segment safe: no separators, control chars or dot-only names.
pub fn sanitize_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;
    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }
    out.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Stored file name for a source URL.
pub fn derive_filename(url: &str) -> String {
    let sanitized = filename_from_url_path(url)
        .map(|s| sanitize_segment(&s))
        .unwrap_or_default();
    if sanitized.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_from_normal_paths() {
        assert_eq!(
            filename_from_url_path("https://files.data.gouv.fr/geo-dvf/latest/csv/2023/full.csv.gz")
                .as_deref(),
            Some("full.csv.gz")
        );
        assert_eq!(
            filename_from_url_path("https://example.com/file.zip?token=abc").as_deref(),
            Some("file.zip")
        );
        assert_eq!(filename_from_url_path("https://example.com/"), None);
    }

    #[test]
    fn sanitize_strips_separators_and_dots() {
        assert_eq!(sanitize_segment("a/b c"), "a_b_c");
        assert_eq!(sanitize_segment(".."), "");
        assert_eq!(sanitize_segment("..hidden"), "hidden");
    }

    #[test]
    fn derive_falls_back_to_default() {
        assert_eq!(derive_filename("https://example.com/"), "download.bin");
        assert_eq!(derive_filename("not a url"), "download.bin");
        assert_eq!(derive_filename("https://example.com/x/StockEtablissement.zip"), "StockEtablissement.zip");
    }
}
