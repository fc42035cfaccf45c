use crate::url::{classify, split_segments, to_host_and_path, LinkKind};
use crate::{UrlError, UrlResult};

/// Schemes and forms of link that never point at something worth mirroring
const UNFOLLOWABLE_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "#"];

/// Resolves a link found on the page at `base` into an absolute URL
///
/// - Absolute links are returned unchanged.
/// - Root-based links are appended to the scheme and host of `base`.
/// - Relative links drop the last segment of the base path, then apply `.` and `..` segments.
///
/// A `..` that would climb above the host is an error.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::resolve;
///
/// let abs = resolve("http://www.consoto.com/foo/bar/foo.html", "./../../something.html").unwrap();
/// assert_eq!(abs, "http://www.consoto.com/something.html");
///
/// let abs = resolve("http://www.consoto.com/foo/bar/foo.html", "/d.html").unwrap();
/// assert_eq!(abs, "http://www.consoto.com/d.html");
/// ```
pub fn resolve(base: &str, link: &str) -> UrlResult<String> {
    let link = link.trim();
    match classify(link) {
        LinkKind::Absolute => Ok(link.to_string()),
        LinkKind::RootBased => {
            let split = to_host_and_path(base);
            Ok(format!("{}{}{}", split.prefix, split.host, link))
        }
        LinkKind::Relative => {
            let split = to_host_and_path(base);
            let mut segments = split_segments(&split.path);
            segments.pop();
            segments.retain(|s| !s.is_empty());

            let trailing_slash = link.ends_with('/');
            for segment in split_segments(link.trim_end_matches('/')) {
                match segment {
                    ".." => {
                        if segments.pop().is_none() {
                            return Err(UrlError::Unresolvable {
                                base: base.to_string(),
                                link: link.to_string(),
                            });
                        }
                    }
                    "." | "" => {}
                    other => segments.push(other),
                }
            }

            let mut resolved = format!("{}{}", split.prefix, split.host);
            for segment in &segments {
                resolved.push('/');
                resolved.push_str(segment);
            }
            if trailing_slash || segments.is_empty() {
                resolved.push('/');
            }
            Ok(resolved)
        }
    }
}

/// Returns false for links the crawler passes through untouched
///
/// Empty links, same-page anchors and non-HTTP schemes such as `mailto:` or `javascript:` are
/// not followed.
pub fn is_followable(link: &str) -> bool {
    let link = link.trim();
    if link.is_empty() {
        return false;
    }
    let lower = link.to_ascii_lowercase();
    !UNFOLLOWABLE_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Splits a link into the part before `#` and the fragment (without the `#`)
pub fn split_fragment(link: &str) -> (&str, Option<&str>) {
    match link.find('#') {
        Some(hash) => (&link[..hash], Some(&link[hash + 1..])),
        None => (link, None),
    }
}
