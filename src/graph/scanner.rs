//! Linear `href=`/`src=` scanner
//!
//! Splits page text into literal runs and quoted link values without parsing the document. An
//! attribute name counts when it is followed, modulo whitespace, by `=`; the value is whatever
//! sits between the next matching pair of `'` or `"` quotes. Occurrences that do not fit that
//! shape stay in the surrounding literal text.

/// Attribute names whose values are links
const LINK_ATTRIBUTES: [&str; 2] = ["href", "src"];

/// A piece of scanned page text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanItem<'a> {
    /// Text to copy through unchanged (includes the quotes around links)
    Literal(&'a str),
    /// A link value, without its quotes
    Link(&'a str),
}

/// Iterator over the literal runs and link values of a page
///
/// Concatenating every item, in order, reproduces the page exactly.
#[derive(Debug)]
pub struct LinkScanner<'a> {
    page: &'a str,
    /// Lowercased copy for case-insensitive attribute search (same byte offsets as `page`)
    lower: String,
    /// Start of the literal run not yet emitted
    last: usize,
    /// Where to look for the next attribute
    cursor: usize,
    /// Next candidate position per attribute (index just past its `=`), if searched
    candidates: [Option<Option<usize>>; 2],
    /// Link found after the literal that was just emitted
    pending_link: Option<(usize, usize)>,
    done: bool,
}

impl<'a> LinkScanner<'a> {
    pub fn new(page: &'a str) -> Self {
        Self {
            page,
            lower: page.to_ascii_lowercase(),
            last: 0,
            cursor: 0,
            candidates: [None, None],
            pending_link: None,
            done: false,
        }
    }

    /// Finds the next link at or after the cursor as `(value_start, value_end)`
    fn next_link(&mut self) -> Option<(usize, usize)> {
        loop {
            for (i, name) in LINK_ATTRIBUTES.iter().enumerate() {
                let stale = match self.candidates[i] {
                    None => true,
                    Some(Some(pos)) => pos < self.cursor,
                    Some(None) => false,
                };
                if stale {
                    self.candidates[i] = Some(find_parameter(&self.lower, name, self.cursor));
                }
            }

            let (slot, index) = self
                .candidates
                .iter()
                .enumerate()
                .filter_map(|(i, c)| c.flatten().map(|pos| (i, pos)))
                .min_by_key(|&(_, pos)| pos)?;
            self.candidates[slot] = None;

            match quoted_value(self.page, index) {
                Some((start, end)) => {
                    self.cursor = end + 1;
                    return Some((start, end));
                }
                None => self.cursor = index,
            }
        }
    }
}

impl<'a> Iterator for LinkScanner<'a> {
    type Item = ScanItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((start, end)) = self.pending_link.take() {
            self.last = end;
            return Some(ScanItem::Link(&self.page[start..end]));
        }
        if self.done {
            return None;
        }

        match self.next_link() {
            Some((start, end)) => {
                let literal = &self.page[self.last..start];
                self.pending_link = Some((start, end));
                if literal.is_empty() {
                    self.next()
                } else {
                    Some(ScanItem::Literal(literal))
                }
            }
            None => {
                self.done = true;
                let rest = &self.page[self.last..];
                self.last = self.page.len();
                (!rest.is_empty()).then_some(ScanItem::Literal(rest))
            }
        }
    }
}

/// Returns the index just past the `=` of the first `name` at or after `start` that is followed
/// (modulo whitespace) by `=`
pub fn find_parameter(text: &str, name: &str, start: usize) -> Option<usize> {
    let mut from = start;
    while from < text.len() {
        let found = from + text.get(from..)?.find(name)?;
        from = found + name.len();
        let rest = &text[from..];
        let trimmed = rest.trim_start();
        if trimmed.starts_with('=') {
            return Some(from + (rest.len() - trimmed.len()) + 1);
        }
    }
    None
}

/// Reads a quoted value starting at `pos` (after optional whitespace)
///
/// Returns the byte range of the value without its quotes, or `None` if no quote opens there or
/// the quote is never closed.
pub fn quoted_value(page: &str, pos: usize) -> Option<(usize, usize)> {
    let rest = page.get(pos..)?;
    let trimmed = rest.trim_start();
    let open = pos + (rest.len() - trimmed.len());
    let quote = trimmed.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let start = open + 1;
    let end = start + page[start..].find(quote)?;
    Some((start, end))
}
