use crate::url::{split_segments, to_host_and_path};
use std::cmp::Ordering;

/// Distance reported for two identical URLs
pub const MAX_DISTANCE: u32 = u32::MAX;

/// Returns the host-affinity distance indicator between two URLs
///
/// - identical URLs: [`MAX_DISTANCE`]
/// - different hosts: `1`, the largest real difference
/// - same host: index of the first path segment where they diverge, plus 2
///
/// Larger values mean closer URLs. The scale is not a metric; the scheduler relies on these
/// exact values.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::url_distance;
///
/// assert_eq!(url_distance("http://x.com/a/b/c", "http://x.com/a/b/d"), 4);
/// assert_eq!(url_distance("http://x.com/a", "http://y.com/a"), 1);
/// ```
pub fn url_distance(a: &str, b: &str) -> u32 {
    if a == b {
        return MAX_DISTANCE;
    }

    let a = to_host_and_path(a);
    let b = to_host_and_path(b);
    if a.host != b.host {
        return 1;
    }

    let segments_a = split_segments(&a.path);
    let segments_b = split_segments(&b.path);
    let diverge = segments_a
        .iter()
        .zip(segments_b.iter())
        .take_while(|(x, y)| x == y)
        .count();

    u32::try_from(diverge)
        .unwrap_or(u32::MAX - 2)
        .saturating_add(2)
}

/// Orders `a` and `b` by their distance indicator from `seed`
pub fn compare_url_distances(seed: &str, a: &str, b: &str) -> Ordering {
    url_distance(seed, a).cmp(&url_distance(seed, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_max() {
        let u = "http://x.com/a/b";
        assert_eq!(url_distance(u, u), MAX_DISTANCE);
    }

    #[test]
    fn test_host_mismatch_is_one() {
        assert_eq!(url_distance("http://x.com/a/b", "http://y.com/a/b"), 1);
        assert_eq!(url_distance("http://x.com/", "https://z.org/deep/path"), 1);
    }

    #[test]
    fn test_divergence_index() {
        let seed = "http://x.com/a/b/c";
        assert_eq!(url_distance(seed, "http://x.com/a/b/d"), 4);
        assert_eq!(url_distance(seed, "http://x.com/a/b/e"), 4);
        assert_eq!(url_distance(seed, "http://x.com/z"), 2);
    }

    #[test]
    fn test_prefix_path() {
        assert_eq!(url_distance("http://x.com/a/b", "http://x.com/a/b/c"), 4);
    }

    #[test]
    fn test_same_host_closer_than_other_host() {
        let seed = "http://x.com/a/b/c";
        assert!(url_distance(seed, "http://x.com/q") > url_distance(seed, "http://y.com/a/b/c"));
    }

    #[test]
    fn test_compare() {
        let seed = "http://x.com/a/b/c";
        assert_eq!(
            compare_url_distances(seed, "http://x.com/a/x", "http://x.com/a/b/x"),
            Ordering::Less
        );
        assert_eq!(
            compare_url_distances(seed, "http://x.com/a/b/d", "http://x.com/a/b/e"),
            Ordering::Equal
        );
    }
}
