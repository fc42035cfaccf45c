//! Rewritten page assembly
//!
//! A page is rebuilt from literal text and link placeholders. Placeholders are filled in as the
//! URL pool resolves the links they stand for; once none are left the page can be saved.

use crate::pool::pool_key;
use crate::url::file_relative;

/// One piece of a rewritten page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringSegment {
    /// Text copied through unchanged, or a link already rewritten
    AsIs(String),
    /// A link waiting for its actual URL
    ToBeResolved {
        /// Link text as it appeared on the page
        original: String,
        /// Pool key of `absolute`
        key: String,
        /// The link resolved against the page URL, without fragment
        absolute: String,
        fragment: Option<String>,
    },
}

/// A page under reconstruction
#[derive(Debug, Clone, Default)]
pub struct RewrittenPage {
    segments: Vec<StringSegment>,
    unresolved: usize,
}

impl RewrittenPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends literal text, merging it into a preceding literal
    pub fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(StringSegment::AsIs(previous)) => previous.push_str(text),
            _ => self.segments.push(StringSegment::AsIs(text.to_string())),
        }
    }

    /// Appends a link whose actual URL is already known, as a path relative to `page_url`
    pub fn push_resolved(&mut self, page_url: &str, actual: &str, fragment: Option<&str>) {
        let link = with_fragment(file_relative(page_url, actual), fragment);
        self.push_literal(&link);
    }

    /// Appends a placeholder for a link still awaiting resolution
    pub fn push_placeholder(&mut self, original: &str, absolute: &str, fragment: Option<&str>) {
        self.segments.push(StringSegment::ToBeResolved {
            original: original.to_string(),
            key: pool_key(absolute),
            absolute: absolute.to_string(),
            fragment: fragment.map(str::to_string),
        });
        self.unresolved += 1;
    }

    /// Fills every placeholder for the link with pool key `key`
    ///
    /// Returns the number of placeholders filled.
    pub fn resolve(&mut self, page_url: &str, key: &str, actual: &str) -> usize {
        let mut filled = 0;
        for segment in &mut self.segments {
            let replacement = match segment {
                StringSegment::ToBeResolved {
                    key: pending,
                    fragment,
                    ..
                } if pending == key => {
                    with_fragment(file_relative(page_url, actual), fragment.as_deref())
                }
                _ => continue,
            };
            *segment = StringSegment::AsIs(replacement);
            filled += 1;
        }
        self.unresolved -= filled;
        filled
    }

    /// Returns true once no placeholder is left
    pub fn is_complete(&self) -> bool {
        self.unresolved == 0
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved
    }

    /// Concatenates the page text
    ///
    /// Placeholders still waiting are written as their absolute URL.
    pub fn assemble(&self) -> String {
        let mut text = String::new();
        for segment in &self.segments {
            match segment {
                StringSegment::AsIs(literal) => text.push_str(literal),
                StringSegment::ToBeResolved {
                    absolute, fragment, ..
                } => text.push_str(&with_fragment(absolute.clone(), fragment.as_deref())),
            }
        }
        text
    }
}

fn with_fragment(mut link: String, fragment: Option<&str>) -> String {
    if let Some(fragment) = fragment {
        link.push('#');
        link.push_str(fragment);
    }
    link
}
