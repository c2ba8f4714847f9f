//! Route key derivation.

/// Reduce a request path to its canonical route key by keeping only the
/// prefix before the `segment_count`-th occurrence of `separator`.
///
/// Sub-resources under the same route then share one bucket:
/// `/v1/hello/extra/path` and `/v1/hello/other` both normalize to
/// `/v1/hello` with `separator = '/'` and `segment_count = 3` (the leading
/// slash counts as the first occurrence). If the path has fewer occurrences
/// than requested, or `segment_count` is zero, the path is returned
/// unchanged. Pure and allocation-free.
pub fn route_key(path: &str, separator: char, segment_count: usize) -> &str {
    if segment_count < 1 {
        return path;
    }

    let mut seen = 0;
    for (index, ch) in path.char_indices() {
        if ch == separator {
            seen += 1;
            if seen == segment_count {
                return &path[..index];
            }
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncates_before_nth_occurrence() {
        assert_eq!(route_key("/v1/hello/extra", '/', 3), "/v1/hello");
        assert_eq!(route_key("/v1/hello/extra/path/info", '/', 3), "/v1/hello");
        assert_eq!(route_key("/v1/hello/other", '/', 3), "/v1/hello");
    }

    #[test]
    fn test_fewer_occurrences_than_requested_is_unchanged() {
        assert_eq!(route_key("/v1/hello", '/', 3), "/v1/hello");
        assert_eq!(route_key("/v1", '/', 3), "/v1");
    }

    #[test]
    fn test_zero_segment_count_is_unchanged() {
        assert_eq!(route_key("abc", '/', 0), "abc");
        assert_eq!(route_key("/v1/hello/extra", '/', 0), "/v1/hello/extra");
    }

    #[test]
    fn test_no_occurrence_is_unchanged() {
        assert_eq!(route_key("abc", '/', 1), "abc");
    }

    #[test]
    fn test_first_occurrence_can_yield_empty_prefix() {
        assert_eq!(route_key("/v1/hello", '/', 1), "");
    }

    #[test]
    fn test_multibyte_paths_slice_on_char_boundaries() {
        assert_eq!(route_key("/café/menu/été", '/', 3), "/café/menu");
    }
}
