use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([a-z0-9][-a-z0-9]{0,62})\.(com\.cn|com\.hk|cn|com|net|edu|gov|biz|org|info|pro|name|xxx|xyz|be|me|top|cc|tv|tt)",
    )
    .unwrap()
});

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Registry key for a host: the label in front of a known public suffix.
///
/// `www.bilibili.com` gives `bilibili`; hosts with an unknown suffix give
/// `None`.
pub fn domain_of(host: &str) -> Option<&str> {
    capture_group_1(&DOMAIN_REGEX, host)
}

/// File name and extension from the last path segment of `url`.
///
/// Falls back to the subtype of `content_type` when the segment has no
/// extension, as with image CDNs serving `.../abcdef/w650`.
pub fn name_and_ext(url: &Url, content_type: &str) -> (String, String) {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    match segment.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() && !ext.is_empty() => {
            (name.to_string(), ext.to_ascii_lowercase())
        }
        _ => {
            let subtype = content_type
                .split(';')
                .next()
                .and_then(|mime| mime.split_once('/'))
                .map(|(_, sub)| sub.trim().to_ascii_lowercase())
                .unwrap_or_default();
            (segment.to_string(), subtype)
        }
    }
}

/// Extension of a url path without query or fragment.
pub fn url_ext(url: &Url) -> Option<String> {
    url.path()
        .rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}
