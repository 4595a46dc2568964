//! Field renderers and escape policies.
//!
//! A renderer extracts one attribute of a tag as text; the writer flavor
//! decides the escape policy. The traditional ctags writer backslash-escapes
//! control characters so a tag line can never contain a raw tab; the etags
//! and JSON seats pass text through untouched but *reject* values they
//! cannot represent (whitespace inside a name), which drops the field from
//! the record without dropping the record.

use crate::diag;
use crate::entry::TagEntry;
use crate::input::InputSource;
use crate::options::Options;
use crate::output::pattern;

use super::Renderer;

/// Renderer-table seat a writer draws from. Writers without their own seat
/// fall back to the [`WriterFlavor::UCtags`] renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterFlavor {
    /// Traditional/extended ctags: full backslash escaping.
    UCtags,
    /// Etags: raw text, rejects unrepresentable values.
    ECtags,
    /// JSON: raw UTF-8, rejects unrepresentable values.
    Json,
}

/// Outcome of rendering one field of one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// The tag carries no value for this field.
    Absent,
    /// The writer flavor cannot represent the value; the field is dropped
    /// from the record.
    Rejected,
}

impl FieldValue {
    pub fn text(self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn from_opt(value: Option<String>) -> FieldValue {
        match value {
            Some(s) => FieldValue::Text(s),
            None => FieldValue::Absent,
        }
    }
}

/// Placeholder for attributes that render even when missing.
const DEFAULT_VALUE: &str = "-";

/// Backslash-escape a value for the traditional tag line grammar: `\` is
/// doubled, tab/newline/return become `\t`/`\n`/`\r`, and any other control
/// character is hex-escaped so no raw control byte survives.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn needs_escaping(s: &str) -> bool {
    s.chars()
        .any(|c| c == '\\' || (c as u32) < 0x20 || c as u32 == 0x7f)
}

/// Escape a tag name, warning when a control character slips through a
/// parser. Clean names pass through without allocation churn.
fn escape_name(s: &str, tag: &TagEntry) -> String {
    if !needs_escaping(s) {
        return s.to_string();
    }
    if s.chars().any(|c| (c as u32) < 0x20 || c as u32 == 0x7f) {
        diag::warning(format_args!(
            "control character in tag from {} (line {}); escaping it",
            tag.input_file, tag.line_number
        ));
    }
    escape_string(s)
}

/// No-escape seat: raw text, rejecting values the flavor cannot carry.
fn no_escape(s: &str) -> FieldValue {
    if s.contains(' ') || s.contains('\t') {
        FieldValue::Rejected
    } else {
        FieldValue::Text(s.to_string())
    }
}

/// Collapse an input line for the xref `C` column: leading whitespace is
/// dropped, runs of whitespace become one space, and the line terminator
/// is not copied.
pub fn compact_input_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut started = false;
    let mut in_space = false;
    for c in line.chars() {
        if c == '\n' || c == '\r' {
            break;
        }
        if c.is_whitespace() {
            if started {
                in_space = true;
            }
            continue;
        }
        if in_space {
            out.push(' ');
            in_space = false;
        }
        started = true;
        out.push(c);
    }
    out
}

/// Render one field of a tag for a writer flavor.
pub(super) fn render(
    renderer: Renderer,
    flavor: WriterFlavor,
    tag: &TagEntry,
    opts: &Options,
    source: &dyn InputSource,
    parser_value: Option<&str>,
) -> FieldValue {
    match renderer {
        Renderer::Name => match flavor {
            WriterFlavor::UCtags => FieldValue::Text(escape_name(&tag.name, tag)),
            WriterFlavor::ECtags | WriterFlavor::Json => no_escape(&tag.name),
        },
        Renderer::InputFile => {
            let file = tag.effective_file(opts.line_directives);
            match flavor {
                WriterFlavor::UCtags => FieldValue::Text(escape_string(file)),
                WriterFlavor::ECtags | WriterFlavor::Json => no_escape(file),
            }
        }
        Renderer::Pattern => {
            if opts.address_by_line(tag.line_number_entry) {
                return FieldValue::Absent;
            }
            if let Some(p) = &tag.pattern {
                return FieldValue::Text(p.to_string());
            }
            FieldValue::from_opt(pattern::build(tag, opts, source))
        }
        Renderer::CompactInputLine => match source.line_at(tag.file_position) {
            Some(line) => FieldValue::Text(compact_input_line(line)),
            // Without a line there is no parameter to compact; emit an
            // empty column rather than dropping the record.
            None => FieldValue::Text(String::new()),
        },
        Renderer::Access => FieldValue::Text(
            tag.extension.access.as_deref().unwrap_or(DEFAULT_VALUE).to_string(),
        ),
        Renderer::FileScopeMarker => {
            FieldValue::Text(if tag.is_file_scope { "file" } else { DEFAULT_VALUE }.to_string())
        }
        Renderer::Inherits => FieldValue::Text(escape_string(
            tag.extension.inheritance.as_deref().unwrap_or(DEFAULT_VALUE),
        )),
        Renderer::KindName => match (&tag.kind.name, tag.kind.letter) {
            (Some(name), _) => FieldValue::Text(name.clone()),
            (None, letter) => FieldValue::Text(letter.to_string()),
        },
        Renderer::KindLetter => FieldValue::Text(tag.kind.letter.to_string()),
        Renderer::Language => FieldValue::Text(
            tag.effective_language(opts.line_directives)
                .unwrap_or(DEFAULT_VALUE)
                .to_string(),
        ),
        Renderer::Implementation => FieldValue::Text(
            tag.extension
                .implementation
                .as_deref()
                .unwrap_or(DEFAULT_VALUE)
                .to_string(),
        ),
        Renderer::LineNumber => {
            FieldValue::Text(tag.effective_line(opts.line_directives).to_string())
        }
        Renderer::Signature => FieldValue::Text(escape_string(
            tag.extension.signature.as_deref().unwrap_or(DEFAULT_VALUE),
        )),
        Renderer::Scope => match tag.extension.scope_name.as_deref() {
            Some(scope) => match flavor {
                WriterFlavor::UCtags => FieldValue::Text(escape_name(scope, tag)),
                WriterFlavor::ECtags | WriterFlavor::Json => no_escape(scope),
            },
            None => FieldValue::Absent,
        },
        Renderer::Typeref => match tag.extension.type_ref[1].as_deref() {
            Some(name) => FieldValue::Text(escape_name(name, tag)),
            None => FieldValue::Absent,
        },
        Renderer::Role => match tag.kind.role(tag.role_index) {
            Some(role) => FieldValue::Text(role.name.clone()),
            None => FieldValue::Absent,
        },
        Renderer::RefMarker => {
            FieldValue::Text(if tag.is_definition() { "D" } else { "R" }.to_string())
        }
        Renderer::Extras => {
            if tag.extras.is_empty() {
                FieldValue::Absent
            } else {
                FieldValue::Text(tag.extras.names().join(","))
            }
        }
        Renderer::ScopeKindName => match &tag.extension.scope_kind {
            Some(kind) => match (&kind.name, kind.letter) {
                (Some(name), _) => FieldValue::Text(name.clone()),
                (None, letter) => FieldValue::Text(letter.to_string()),
            },
            None => FieldValue::Absent,
        },
        Renderer::End => {
            if tag.extension.end_line != 0 {
                FieldValue::Text(tag.extension.end_line.to_string())
            } else {
                FieldValue::Absent
            }
        }
        Renderer::Parser => FieldValue::from_opt(parser_value.map(str::to_string)),
    }
}
