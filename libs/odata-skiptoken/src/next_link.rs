//! Next-page link construction.
//!
//! The next link repeats the request with `$skip` and any previous `$skiptoken` removed,
//! `$top` reduced by the page just served, and the new `$skiptoken` appended. Other query
//! options keep their original text and position.

use url::Url;

const SKIP: &str = "$skip";
const SKIP_TOKEN: &str = "$skiptoken";
const TOP: &str = "$top";

/// Rewrite `base_uri` into the link of the page after the current one.
///
/// Returns `None` when `$top` leaves nothing beyond the current page.
#[must_use]
pub fn next_page_link(base_uri: &Url, page_size: usize, skip_token: &str) -> Option<Url> {
    let mut segments: Vec<String> = Vec::new();

    if let Some(query) = base_uri.query() {
        for segment in query.split('&').filter(|s| !s.is_empty()) {
            let (raw_name, raw_value) = segment.split_once('=').unwrap_or((segment, ""));
            let name = decode(raw_name);

            if name.eq_ignore_ascii_case(SKIP) || name.eq_ignore_ascii_case(SKIP_TOKEN) {
                continue;
            }
            if name.eq_ignore_ascii_case(TOP) {
                if let Ok(top) = decode(raw_value).trim().parse::<usize>() {
                    if top <= page_size {
                        tracing::debug!(top, page_size, "Top exhausted; no next page");
                        return None;
                    }
                    segments.push(format!("{raw_name}={}", top - page_size));
                    continue;
                }
            }
            segments.push(segment.to_owned());
        }
    }

    segments.push(format!("{SKIP_TOKEN}={}", urlencoding::encode(skip_token)));

    let mut link = base_uri.clone();
    link.set_query(Some(&segments.join("&")));
    Some(link)
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_owned(), std::borrow::Cow::into_owned)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_appends_encoded_token() {
        let link = next_page_link(&url("http://host/svc/People"), 2, "id:2").unwrap();
        assert_eq!(link.as_str(), "http://host/svc/People?$skiptoken=id%3A2");
    }

    #[test]
    fn test_drops_skip_and_previous_token_keeps_others() {
        let base = url("http://host/People?$filter=age%20gt%2010&$skip=4&$skiptoken=id:1&$orderby=age");

        let link = next_page_link(&base, 2, "age:30,id:5").unwrap();

        assert_eq!(
            link.query(),
            Some("$filter=age%20gt%2010&$orderby=age&$skiptoken=age%3A30%2Cid%3A5")
        );
    }

    #[test]
    fn test_top_decremented() {
        let link = next_page_link(&url("http://host/People?$top=10"), 4, "id:4").unwrap();
        assert_eq!(link.query(), Some("$top=6&$skiptoken=id%3A4"));
    }

    #[test]
    fn test_top_exhausted() {
        assert!(next_page_link(&url("http://host/People?$top=4"), 4, "id:4").is_none());
        assert!(next_page_link(&url("http://host/People?$top=3"), 4, "id:4").is_none());
    }

    #[test]
    fn test_quoted_string_token_encoded() {
        let link = next_page_link(&url("http://host/People"), 1, "name:'O''Neil'").unwrap();
        let (_, value) = link.query_pairs().find(|(k, _)| k == "$skiptoken").unwrap();
        assert_eq!(value, "name:'O''Neil'");
    }
}
