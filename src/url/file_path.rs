use crate::url::{split_segments, strip_prefix, DEFAULT_FILE_NAME, DIRECTORY_SEPARATOR};

/// Characters that cannot appear in a file name on at least one supported platform
const INVALID_FILE_NAME_CHARS: &[char] = &['"', '<', '>', '|', ':', '*', '?', '\\', '/'];

/// Where a URL is stored locally, relative to the mirror's base directory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath {
    /// Directory segments joined by [`DIRECTORY_SEPARATOR`]; the first segment is the host
    pub directory: String,
    /// File name inside `directory`
    pub file_name: String,
}

impl FilePath {
    /// Returns the directory segments
    pub fn directory_segments(&self) -> impl Iterator<Item = &str> {
        self.directory
            .split(DIRECTORY_SEPARATOR)
            .filter(|s| !s.is_empty())
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.directory, DIRECTORY_SEPARATOR, self.file_name)
    }
}

/// Maps a URL to the local directory and file name it is mirrored into
///
/// The URL is lowercased, the scheme dropped, and the remaining segments split into directories
/// (host first) and a file name. A URL without a last path segment gets [`DEFAULT_FILE_NAME`].
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::to_file_path;
///
/// let path = to_file_path("http://www.contoso.com/foo/bar.asp");
/// assert_eq!(path.directory, "www.contoso.com/foo");
/// assert_eq!(path.file_name, "bar.asp");
///
/// let path = to_file_path("http://www.contoso.com/");
/// assert_eq!(path.directory, "www.contoso.com");
/// assert_eq!(path.file_name, "index.html");
/// ```
pub fn to_file_path(url: &str) -> FilePath {
    let lowered = url.trim().to_lowercase();
    let (_, rest) = strip_prefix(&lowered);
    let segments = split_segments(rest);

    let (directories, file_name) = match segments.split_last() {
        Some((last, dirs)) if !dirs.is_empty() => (dirs.to_vec(), *last),
        Some((only, _)) => (vec![*only], ""),
        None => (Vec::new(), ""),
    };

    let separator = DIRECTORY_SEPARATOR.to_string();
    let directory = directories
        .iter()
        .map(|d| sanitize_file_name(d))
        .collect::<Vec<_>>()
        .join(separator.as_str());

    FilePath {
        directory,
        file_name: sanitize_file_name(file_name),
    }
}

/// Returns the path of `link`'s local copy relative to the local copy of `base_url`
///
/// Walks up one `../` per directory of the base that is not shared with the link, then down the
/// link's remaining directories. Directories are compared case-insensitively.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::file_relative;
///
/// assert_eq!(file_relative("http://h.com/a/b.html", "http://h.com/a/c.png"), "./c.png");
/// assert_eq!(file_relative("http://h.com/a/b.html", "http://h.com/x/y.png"), "../x/y.png");
/// ```
pub fn file_relative(base_url: &str, link: &str) -> String {
    let base = to_file_path(base_url);
    let target = to_file_path(link);
    let base_dirs: Vec<&str> = base.directory_segments().collect();
    let target_dirs: Vec<&str> = target.directory_segments().collect();

    let shared = base_dirs
        .iter()
        .zip(target_dirs.iter())
        .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
        .count();

    let mut relative = String::new();
    if shared == base_dirs.len() {
        relative.push_str("./");
    } else {
        for _ in shared..base_dirs.len() {
            relative.push_str("../");
        }
    }
    for dir in &target_dirs[shared..] {
        relative.push_str(dir);
        relative.push('/');
    }
    relative.push_str(&target.file_name);
    relative
}

/// Replaces characters that are illegal in file names with `_`
///
/// An empty or blank name becomes [`DEFAULT_FILE_NAME`].
pub fn sanitize_file_name(name: &str) -> String {
    if name.trim().is_empty() {
        return DEFAULT_FILE_NAME.to_string();
    }
    name.chars()
        .map(|c| {
            if c.is_control() || INVALID_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}
