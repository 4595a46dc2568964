//! Input-side collaborators of the emission engine.
//!
//! The writers never walk the input themselves; they read single lines back
//! through a remembered byte position (the "bypass read") and ask whether
//! the input language tolerates empty tag names. [`InputSource`] is that
//! seam, and [`SourceFile`] is the file-backed implementation the scanner
//! uses. Tests substitute in-memory sources freely.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

/// What the emission engine needs from the input side.
pub trait InputSource {
    /// The line starting at the given byte position, including its trailing
    /// newline when the file has one. Returns `None` for positions that do
    /// not fall on a line the source knows about.
    fn line_at(&self, position: u64) -> Option<&str>;

    /// Input file name for diagnostics.
    fn file_name(&self) -> &str;

    /// Whether the input language permits empty tag names. Languages that
    /// forbid them get a warning and the tag is skipped.
    fn allows_null_tags(&self) -> bool {
        false
    }
}

/// A source file held in memory with a per-line byte offset index.
///
/// The offset index makes the bypass read O(log n) and gives tag entries
/// their remembered file positions.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path as it appears in tag records (usually relative).
    tag_path: Arc<str>,
    language: Option<Arc<str>>,
    text: String,
    /// Byte offset of the start of each line, 0-indexed by line - 1.
    line_offsets: Vec<usize>,
    allow_null_tags: bool,
}

impl SourceFile {
    /// Read a file from disk. `tag_path` is the name recorded in output,
    /// which need not equal the path used for I/O.
    pub fn open(path: &Path, tag_path: &str, language: Option<&str>) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read input file: {}", path.display()))?;
        Ok(Self::from_text(tag_path, language, &text))
    }

    /// Build a source from text already in memory.
    pub fn from_text(tag_path: &str, language: Option<&str>, text: &str) -> Self {
        let mut line_offsets = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' && i + 1 < text.len() {
                line_offsets.push(i + 1);
            }
        }
        if text.is_empty() {
            line_offsets.clear();
        }
        Self {
            tag_path: Arc::from(tag_path),
            language: language.map(Arc::from),
            text: text.to_string(),
            line_offsets,
            allow_null_tags: false,
        }
    }

    pub fn allow_null_tags(mut self, allow: bool) -> Self {
        self.allow_null_tags = allow;
        self
    }

    pub fn tag_path(&self) -> Arc<str> {
        Arc::clone(&self.tag_path)
    }

    pub fn language(&self) -> Option<Arc<str>> {
        self.language.clone()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    /// Byte offset of the start of a 1-indexed line.
    pub fn position_of_line(&self, line_number: u64) -> Option<u64> {
        if line_number == 0 {
            return None;
        }
        self.line_offsets
            .get(line_number as usize - 1)
            .map(|&off| off as u64)
    }

    /// 1-indexed line number of the line containing a byte offset.
    pub fn line_of_position(&self, position: u64) -> Option<u64> {
        if self.line_offsets.is_empty() || position as usize >= self.text.len() {
            return None;
        }
        let idx = self.line_offsets.partition_point(|&off| off <= position as usize);
        Some(idx as u64)
    }
}

impl InputSource for SourceFile {
    fn line_at(&self, position: u64) -> Option<&str> {
        let start = position as usize;
        if start >= self.text.len() {
            return None;
        }
        // Only positions at a line start are remembered by tag entries.
        self.line_offsets.binary_search(&start).ok()?;
        let rest = &self.text[start..];
        match rest.find('\n') {
            Some(i) => Some(&rest[..=i]),
            None => Some(rest),
        }
    }

    fn file_name(&self) -> &str {
        &self.tag_path
    }

    fn allows_null_tags(&self) -> bool {
        self.allow_null_tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_offsets() {
        let src = SourceFile::from_text("a.c", None, "one\ntwo\nthree\n");
        assert_eq!(src.line_count(), 3);
        assert_eq!(src.position_of_line(1), Some(0));
        assert_eq!(src.position_of_line(2), Some(4));
        assert_eq!(src.position_of_line(3), Some(8));
        assert_eq!(src.position_of_line(4), None);
    }

    #[test]
    fn test_line_at_includes_newline() {
        let src = SourceFile::from_text("a.c", None, "one\ntwo\nthree");
        assert_eq!(src.line_at(0), Some("one\n"));
        assert_eq!(src.line_at(4), Some("two\n"));
        // Last line without a trailing newline comes back as-is.
        assert_eq!(src.line_at(8), Some("three"));
        // Not a line start.
        assert_eq!(src.line_at(5), None);
        // Past the end.
        assert_eq!(src.line_at(100), None);
    }

    #[test]
    fn test_line_of_position() {
        let src = SourceFile::from_text("a.c", None, "one\ntwo\nthree\n");
        assert_eq!(src.line_of_position(0), Some(1));
        assert_eq!(src.line_of_position(4), Some(2));
        assert_eq!(src.line_of_position(6), Some(2));
        assert_eq!(src.line_of_position(8), Some(3));
    }

    #[test]
    fn test_empty_file() {
        let src = SourceFile::from_text("empty.c", None, "");
        assert_eq!(src.line_count(), 0);
        assert_eq!(src.line_at(0), None);
    }

    #[test]
    fn test_null_tag_policy() {
        let strict = SourceFile::from_text("a.c", None, "x\n");
        assert!(!strict.allows_null_tags());
        let lax = SourceFile::from_text("a.txt", None, "x\n").allow_null_tags(true);
        assert!(lax.allows_null_tags());
    }
}
