//! The cross-reference writer: an aligned, human-readable columnar dump.
//!
//! Xref output is for eyes, not tools. Each record prints printf-style
//! columns - by default name, kind, line, file and the compacted input
//! line - and `--xformat` swaps in a custom column layout. Format specs
//! are `%[-][width]<letter>` where the letter selects a registry field by
//! its option letter, so any renderable field can appear as a column.

use std::fmt::Write as _;

use anyhow::Result;

use crate::entry::TagEntry;
use crate::fields::{FieldRegistry, WriterFlavor};
use crate::input::InputSource;
use crate::options::{Options, TagFormat};

/// Default layouts, matching the traditional xref table.
const XFMT_FORMAT_1: &str = "%-16N %4n %-16F %C";
const XFMT_FORMAT_2: &str = "%-16N %-10K %4n %-16F %C";

/// One parsed element of a format string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FmtElement {
    Literal(String),
    Field { letter: char, width: usize, left_align: bool },
}

/// Parse a printf-style xref format string. `%%` is a literal percent;
/// malformed trailing specs are kept as literals.
fn parse_xfmt(fmt: &str) -> Vec<FmtElement> {
    let mut elements = Vec::new();
    let mut literal = String::new();
    let mut chars = fmt.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            literal.push('%');
            continue;
        }
        let mut left_align = false;
        if chars.peek() == Some(&'-') {
            chars.next();
            left_align = true;
        }
        let mut width = 0usize;
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            chars.next();
            width = width * 10 + d as usize;
        }
        match chars.next() {
            Some(letter) => {
                if !literal.is_empty() {
                    elements.push(FmtElement::Literal(std::mem::take(&mut literal)));
                }
                elements.push(FmtElement::Field { letter, width, left_align });
            }
            None => literal.push('%'),
        }
    }
    if !literal.is_empty() {
        elements.push(FmtElement::Literal(literal));
    }
    elements
}

/// Format one tag as an xref row (with trailing newline) into `buf`.
///
/// Without a custom format, tags naming the input file itself are skipped.
pub(crate) fn write_entry(
    buf: &mut String,
    tag: &TagEntry,
    opts: &Options,
    registry: &FieldRegistry,
    source: &dyn InputSource,
) -> Result<()> {
    let fmt = match &opts.custom_xfmt {
        Some(custom) => custom.as_str(),
        None => {
            if tag.file_entry {
                return Ok(());
            }
            match opts.format {
                TagFormat::Original => XFMT_FORMAT_1,
                TagFormat::Extended => XFMT_FORMAT_2,
            }
        }
    };

    for element in parse_xfmt(fmt) {
        match element {
            FmtElement::Literal(text) => buf.push_str(&text),
            FmtElement::Field { letter, width, left_align } => {
                // Unknown letters are silently skipped.
                let Some(id) = registry.field_for_letter(letter) else {
                    continue;
                };
                let value = registry
                    .render(WriterFlavor::UCtags, id, tag, opts, source, None)
                    .text()
                    .unwrap_or_default();
                if left_align {
                    let _ = write!(buf, "{value:<width$}");
                } else {
                    let _ = write!(buf, "{value:>width$}");
                }
            }
        }
    }
    buf.push('\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::SourceFile;
    use crate::kinds::Kind;

    fn write(tag: &TagEntry, opts: &Options, src: &SourceFile) -> String {
        let mut buf = String::new();
        write_entry(&mut buf, tag, opts, &FieldRegistry::new(), src).unwrap();
        buf
    }

    fn main_tag(src: &SourceFile) -> TagEntry {
        TagEntry::new("main", &Kind::new('f', "function", "functions").shared(), src, 1)
    }

    #[test]
    fn test_parse_xfmt() {
        let elements = parse_xfmt("%-16N %4n %%");
        assert_eq!(
            elements,
            vec![
                FmtElement::Field { letter: 'N', width: 16, left_align: true },
                FmtElement::Literal(" ".to_string()),
                FmtElement::Field { letter: 'n', width: 4, left_align: false },
                FmtElement::Literal(" %".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_extended_row() {
        let src = SourceFile::from_text("a.c", Some("C"), "int   main(void) {\n}\n");
        let tag = main_tag(&src);
        let opts = Options::default();
        // N left-16, K left-10, n right-4, F left-16, C.
        assert_eq!(
            write(&tag, &opts, &src),
            "main             function      1 a.c              int main(void) {\n"
        );
    }

    #[test]
    fn test_default_original_row_has_no_kind() {
        let src = SourceFile::from_text("a.c", Some("C"), "int main(void) {\n}\n");
        let tag = main_tag(&src);
        let opts = Options { format: TagFormat::Original, ..Options::default() };
        assert_eq!(
            write(&tag, &opts, &src),
            "main                1 a.c              int main(void) {\n"
        );
    }

    #[test]
    fn test_custom_format_overrides_columns() {
        let src = SourceFile::from_text("a.c", Some("C"), "int main(void) {\n}\n");
        let tag = main_tag(&src);
        let opts = Options {
            custom_xfmt: Some("%N:%n [%k]".to_string()),
            ..Options::default()
        };
        assert_eq!(write(&tag, &opts, &src), "main:1 [f]\n");
    }

    #[test]
    fn test_file_entries_skipped_by_default_formats() {
        let src = SourceFile::from_text("a.c", Some("C"), "int main(void) {\n}\n");
        let mut tag = main_tag(&src);
        tag.file_entry = true;
        let opts = Options::default();
        assert_eq!(write(&tag, &opts, &src), "");
    }

    #[test]
    fn test_unknown_letter_skipped() {
        let src = SourceFile::from_text("a.c", Some("C"), "int main(void) {\n}\n");
        let tag = main_tag(&src);
        let opts = Options {
            custom_xfmt: Some("%N%Q!".to_string()),
            ..Options::default()
        };
        assert_eq!(write(&tag, &opts, &src), "main!\n");
    }
}
