//! Search-pattern construction for the ex-command column.
//!
//! A tag's pattern is a search command of the form `/^<escaped line>$/`
//! (or `?^...?$` under backward search) built from the line the tag was
//! found on, read back through the bypass hook at the remembered byte
//! position. Escaping:
//!
//! - backslashes are doubled
//! - the active search delimiter is backslash-escaped
//! - a literal `$` immediately before the end of line is escaped
//! - output stops at the line terminator, or at the pattern length limit,
//!   in which case the trailing `$` anchor is omitted
//!
//! Repeated builds for the same position are served from a single-slot
//! cache, bypassed for truncated patterns and invalidated whenever the
//! input file changes.

use crate::entry::TagEntry;
use crate::input::InputSource;
use crate::options::Options;

/// Crop a line at the first occurrence of the tag name, keeping one
/// terminating character after it.
fn truncate_tag_line<'a>(line: &'a str, token: &str, discard_newline: bool) -> &'a str {
    match line.find(token) {
        Some(pos) => {
            let mut end = pos + token.len();
            if let Some(next) = line[end..].chars().next() {
                if !(next == '\n' && discard_newline) {
                    end += next.len_utf8();
                }
            }
            &line[..end]
        }
        None => line,
    }
}

/// Escape the line body, bounded by the pattern length limit. Returns the
/// escaped text and whether output was cut short (which omits the anchor).
fn escape_line(line: &str, search_char: char, limit: usize) -> (String, bool) {
    let mut out = String::with_capacity(line.len());
    let mut length = 0usize;
    let mut omitted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' || c == '\r' {
            break;
        }
        if length >= limit {
            omitted = true;
            break;
        }
        let next = chars.peek().copied();
        let ends_line = matches!(next, Some('\n') | Some('\r'));
        if c == '\\' || c == search_char || (c == '$' && ends_line) {
            out.push('\\');
            length += 1;
        }
        out.push(c);
        length += c.len_utf8();
    }
    (out, omitted)
}

/// Build the pattern for a tag without touching the cache. Returns `None`
/// when the originating line cannot be read back.
pub fn build(tag: &TagEntry, opts: &Options, source: &dyn InputSource) -> Option<String> {
    let raw = source.line_at(tag.file_position)?;
    let line = if tag.truncate_line {
        truncate_tag_line(raw, &tag.name, false)
    } else {
        raw
    };

    let search_char = if opts.backward { '?' } else { '/' };
    let anchored = line.ends_with('\n');
    let (escaped, omitted) = escape_line(line, search_char, opts.pattern_length_limit);

    let mut pattern = String::with_capacity(escaped.len() + 4);
    pattern.push(search_char);
    pattern.push('^');
    pattern.push_str(&escaped);
    if anchored && !omitted {
        pattern.push('$');
    }
    pattern.push(search_char);
    Some(pattern)
}

/// Crop and terminate a line for the etags record body.
pub fn etags_line(raw: &str, tag: &TagEntry) -> String {
    if tag.truncate_line {
        truncate_tag_line(raw, &tag.name, true).to_string()
    } else {
        raw.strip_suffix('\n')
            .map(|s| s.strip_suffix('\r').unwrap_or(s))
            .unwrap_or(raw)
            .to_string()
    }
}

/// Single-slot pattern cache keyed on the remembered file position.
///
/// The cache owns its buffer; callers get owned copies, never references
/// that could dangle across an update. Invalidate whenever any state that
/// affects pattern output changes, in particular the input file.
#[derive(Debug, Default)]
pub struct PatternCache {
    valid: bool,
    position: u64,
    text: String,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Pattern for a tag, from the cache when the position matches.
    /// Truncated patterns are never cached: they depend on the tag name,
    /// not just the position.
    pub fn pattern_for(
        &mut self,
        tag: &TagEntry,
        opts: &Options,
        source: &dyn InputSource,
    ) -> Option<String> {
        if self.valid && !tag.truncate_line && self.position == tag.file_position {
            return Some(self.text.clone());
        }
        let built = build(tag, opts, source)?;
        if !tag.truncate_line {
            self.text = built.clone();
            self.position = tag.file_position;
            self.valid = true;
        }
        Some(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::SourceFile;
    use crate::kinds::Kind;

    fn tag_at(source: &SourceFile, line: u64) -> TagEntry {
        TagEntry::new("main", &Kind::new('f', "function", "functions").shared(), source, line)
    }

    #[test]
    fn test_basic_pattern() {
        let src = SourceFile::from_text("a.c", None, "int main(void) {\n}\n");
        let tag = tag_at(&src, 1);
        let opts = Options::default();
        assert_eq!(build(&tag, &opts, &src).unwrap(), "/^int main(void) {$/");
    }

    #[test]
    fn test_backward_search_delimiter() {
        let src = SourceFile::from_text("a.c", None, "a / b\n");
        let tag = tag_at(&src, 1);
        let opts = Options { backward: true, ..Options::default() };
        // Forward slashes are plain under '?' search; '?' would be escaped.
        assert_eq!(build(&tag, &opts, &src).unwrap(), "?^a / b$?");
    }

    #[test]
    fn test_delimiter_and_backslash_escaping() {
        let src = SourceFile::from_text("a.c", None, "s/x\\y/z\n");
        let tag = tag_at(&src, 1);
        let opts = Options::default();
        assert_eq!(build(&tag, &opts, &src).unwrap(), "/^s\\/x\\\\y\\/z$/");
    }

    #[test]
    fn test_trailing_dollar_escaped() {
        let src = SourceFile::from_text("a.mk", None, "COST = 5$\n");
        let tag = tag_at(&src, 1);
        let opts = Options::default();
        assert_eq!(build(&tag, &opts, &src).unwrap(), "/^COST = 5\\$$/");
    }

    #[test]
    fn test_interior_dollar_not_escaped() {
        let src = SourceFile::from_text("a.mk", None, "A$B\n");
        let tag = tag_at(&src, 1);
        let opts = Options::default();
        assert_eq!(build(&tag, &opts, &src).unwrap(), "/^A$B$/");
    }

    #[test]
    fn test_length_limit_omits_anchor() {
        let long_line = format!("{}\n", "x".repeat(4096));
        let src = SourceFile::from_text("a.c", None, &long_line);
        let tag = tag_at(&src, 1);
        let opts = Options { pattern_length_limit: 80, ..Options::default() };
        let pattern = build(&tag, &opts, &src).unwrap();
        assert_eq!(pattern, format!("/^{}/", "x".repeat(80)));
        assert!(!pattern.contains('$'));
    }

    #[test]
    fn test_no_trailing_newline_no_anchor() {
        let src = SourceFile::from_text("a.c", None, "int main(void) {");
        let tag = tag_at(&src, 1);
        let opts = Options::default();
        assert_eq!(build(&tag, &opts, &src).unwrap(), "/^int main(void) {/");
    }

    #[test]
    fn test_truncated_pattern() {
        let src = SourceFile::from_text("a.c", None, "int main(void) { return 0; }\n");
        let mut tag = tag_at(&src, 1);
        tag.truncate_line = true;
        let opts = Options::default();
        // Cropped after the name plus one terminating character.
        assert_eq!(build(&tag, &opts, &src).unwrap(), "/^int main(/");
    }

    #[test]
    fn test_etags_line_forms() {
        let src = SourceFile::from_text("a.c", None, "int main(void) { return 0; }\n");
        let mut tag = tag_at(&src, 1);
        let raw = crate::input::InputSource::line_at(&src, 0).unwrap();
        assert_eq!(etags_line(raw, &tag), "int main(void) { return 0; }");
        tag.truncate_line = true;
        assert_eq!(etags_line(raw, &tag), "int main(");
    }

    #[test]
    fn test_cache_hit_and_invalidation() {
        let src = SourceFile::from_text("a.c", None, "int main(void) {\n}\n");
        let tag = tag_at(&src, 1);
        let opts = Options::default();
        let mut cache = PatternCache::new();

        let first = cache.pattern_for(&tag, &opts, &src).unwrap();
        let second = cache.pattern_for(&tag, &opts, &src).unwrap();
        assert_eq!(first, second);

        // A new input file at the same position must not reuse the slot.
        cache.invalidate();
        let other = SourceFile::from_text("b.c", None, "void other(void) {\n}\n");
        let tag_b = TagEntry::new(
            "other",
            &Kind::new('f', "function", "functions").shared(),
            &other,
            1,
        );
        let rebuilt = cache.pattern_for(&tag_b, &opts, &other).unwrap();
        assert_eq!(rebuilt, "/^void other(void) {$/");
    }

    #[test]
    fn test_truncated_patterns_bypass_cache() {
        let src = SourceFile::from_text("a.c", None, "int main(void) { int mainly; }\n");
        let opts = Options::default();
        let mut cache = PatternCache::new();

        let plain = tag_at(&src, 1);
        cache.pattern_for(&plain, &opts, &src).unwrap();

        let mut truncated = tag_at(&src, 1);
        truncated.truncate_line = true;
        let got = cache.pattern_for(&truncated, &opts, &src).unwrap();
        assert_eq!(got, "/^int main(/");

        // The cached full pattern survives the truncated build.
        let again = cache.pattern_for(&plain, &opts, &src).unwrap();
        assert_eq!(again, "/^int main(void) { int mainly; }$/");
    }

    #[test]
    fn test_missing_line_yields_none() {
        let src = SourceFile::from_text("a.c", None, "one\n");
        let mut tag = tag_at(&src, 1);
        tag.file_position = 999;
        let opts = Options::default();
        assert!(build(&tag, &opts, &src).is_none());
    }
}
