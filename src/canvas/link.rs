use std::collections::HashMap;

/// Parses an RFC 5988 `Link` header into a map from `rel` to URL.
///
/// Canvas paginates every list endpoint this way:
/// `<https://x/api/v1/...&page=2>; rel="next", <https://x/...&page=1>; rel="first"`.
/// Segments that are not `<url>; rel=...` are ignored.
pub fn parse_link_header(header: &str) -> HashMap<String, String> {
    header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';').map(str::trim);
            let url = pieces
                .next()?
                .strip_prefix('<')?
                .strip_suffix('>')?
                .to_owned();
            let rel = pieces.find_map(|param| {
                param
                    .strip_prefix("rel=")
                    .map(|rel| rel.trim_matches('"').to_owned())
            })?;
            Some((rel, url))
        })
        .collect()
}

/// Returns the `rel="next"` URL, if the header has one.
pub fn next_url(header: &str) -> Option<String> {
    parse_link_header(header).remove("next")
}
