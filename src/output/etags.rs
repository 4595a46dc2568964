//! The Emacs etags writer.
//!
//! Etags output is sidecar-structured: records for one source file are
//! buffered in a per-file section, and when the section is finalized a
//! header line `\f\n<file>,<byte-count>\n` followed by the buffered bytes
//! is appended to the main output. Records are
//! `<line-text>\x7f<name>\x01<line>,<byte-offset>` - or the short form
//! `\x7f<name>\x01<line>,0` for a tag naming the file itself.

use std::fmt::Write as _;

use crate::entry::TagEntry;
use crate::input::InputSource;
use crate::output::pattern;

/// Per-file sidecar buffer. Created by `begin_section`, drained into the
/// main output by the tag file manager.
#[derive(Debug, Default)]
pub(crate) struct EtagsSection {
    buf: String,
}

impl EtagsSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn byte_count(&self) -> usize {
        self.buf.len()
    }

    pub fn contents(&self) -> &str {
        &self.buf
    }

    /// Append one record. Returns the bytes added; a tag whose line can no
    /// longer be read contributes nothing.
    pub fn write_entry(&mut self, tag: &TagEntry, source: &dyn InputSource) -> usize {
        let before = self.buf.len();
        if tag.file_entry {
            let _ = write!(self.buf, "\x7f{}\x01{},0\n", tag.name, tag.line_number);
        } else {
            let Some(raw) = source.line_at(tag.file_position) else {
                return 0;
            };
            let line = pattern::etags_line(raw, tag);
            let _ = write!(
                self.buf,
                "{line}\x7f{}\x01{},{}\n",
                tag.name, tag.line_number, tag.file_position
            );
        }
        self.buf.len() - before
    }
}

/// Section header written to the main output ahead of the sidecar bytes.
pub(crate) fn section_header(file: &str, byte_count: usize) -> String {
    format!("\x0c\n{file},{byte_count}\n")
}

/// Include directive referencing another tag table.
pub(crate) fn include_line(path: &str) -> String {
    format!("\x0c\n{path},include\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::SourceFile;
    use crate::kinds::Kind;

    #[test]
    fn test_record_with_line_text() {
        let src = SourceFile::from_text("a.c", Some("C"), "int x;\nint main(void) {\n}\n");
        let kind = Kind::new('f', "function", "functions").shared();
        let tag = TagEntry::new("main", &kind, &src, 2);

        let mut section = EtagsSection::new();
        let n = section.write_entry(&tag, &src);
        assert_eq!(section.contents(), "int main(void) {\x7fmain\x012,7\n");
        assert_eq!(n, section.byte_count());
    }

    #[test]
    fn test_file_entry_short_form() {
        let src = SourceFile::from_text("a.c", Some("C"), "int main(void) {\n}\n");
        let kind = Kind::new('F', "file", "file names").shared();
        let mut tag = TagEntry::new("a.c", &kind, &src, 1);
        tag.file_entry = true;

        let mut section = EtagsSection::new();
        section.write_entry(&tag, &src);
        assert_eq!(section.contents(), "\x7fa.c\x011,0\n");
    }

    #[test]
    fn test_truncated_record() {
        let src = SourceFile::from_text("a.c", Some("C"), "int main(void) { return 0; }\n");
        let kind = Kind::new('f', "function", "functions").shared();
        let mut tag = TagEntry::new("main", &kind, &src, 1);
        tag.truncate_line = true;

        let mut section = EtagsSection::new();
        section.write_entry(&tag, &src);
        assert_eq!(section.contents(), "int main(\x7fmain\x011,0\n");
    }

    #[test]
    fn test_missing_line_writes_nothing() {
        let src = SourceFile::from_text("a.c", Some("C"), "int x;\n");
        let kind = Kind::new('f', "function", "functions").shared();
        let mut tag = TagEntry::new("ghost", &kind, &src, 1);
        tag.file_position = 999;

        let mut section = EtagsSection::new();
        assert_eq!(section.write_entry(&tag, &src), 0);
        assert!(section.contents().is_empty());
    }

    #[test]
    fn test_section_header_and_include() {
        assert_eq!(section_header("src/a.c", 42), "\x0c\nsrc/a.c,42\n");
        assert_eq!(include_line("other/TAGS"), "\x0c\nother/TAGS,include\n");
    }
}
