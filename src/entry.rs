//! Tag entry records.
//!
//! A [`TagEntry`] is the record a parser hands to the emission engine: the
//! identifier name, its kind, where it was found, and an extension-field
//! bundle for the extended output format. Entries are built on the stack
//! and borrowed during synchronous emission; when the cork queue is active
//! they are cloned into the queue, which is cheap because every string is
//! an `Arc<str>`.

use std::sync::Arc;

use crate::input::SourceFile;
use crate::kinds::{Kind, ROLE_DEFINITION};

/// Scope index meaning "no enclosing scope". Index 0 of the cork queue is
/// reserved as a placeholder so this sentinel can never collide with a
/// real entry.
pub const SCOPE_NONE: usize = 0;

/// Named extra markers a tag can carry, rendered by the `E` field as a
/// comma-joined list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extras(u32);

impl Extras {
    pub const FILE_SCOPE: Extras = Extras(1 << 0);
    pub const INPUT_FILE: Extras = Extras(1 << 1);
    pub const PSEUDO: Extras = Extras(1 << 2);
    pub const QUALIFIED: Extras = Extras(1 << 3);
    pub const REFERENCE: Extras = Extras(1 << 4);

    const NAMES: &'static [(Extras, &'static str)] = &[
        (Extras::FILE_SCOPE, "fileScope"),
        (Extras::INPUT_FILE, "inputFile"),
        (Extras::PSEUDO, "pseudo"),
        (Extras::QUALIFIED, "qualified"),
        (Extras::REFERENCE, "reference"),
    ];

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Extras) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Extras) {
        self.0 |= other.0;
    }

    /// Names of all set markers, in declaration order.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

/// Extension-field bundle attached to a tag for the extended format.
#[derive(Debug, Clone, Default)]
pub struct ExtensionFields {
    /// Cork-queue index of the enclosing scope, or [`SCOPE_NONE`].
    /// Always refers to an entry queued earlier in the same cork session.
    pub scope_index: usize,
    /// Explicit scope, used when the parser resolves scope itself instead
    /// of leaning on the cork queue.
    pub scope_kind: Option<Arc<Kind>>,
    pub scope_name: Option<Arc<str>>,
    /// Typeref pair: (kind-name, ref-name). Both must be present for the
    /// `typeref:` field to be emitted.
    pub type_ref: [Option<Arc<str>>; 2],
    pub access: Option<Arc<str>>,
    pub implementation: Option<Arc<str>>,
    pub inheritance: Option<Arc<str>>,
    pub signature: Option<Arc<str>>,
    /// Last line of the tagged construct; 0 means unknown.
    pub end_line: u64,
}

/// One tag record, as produced by a parser and consumed by the writers.
#[derive(Debug, Clone)]
pub struct TagEntry {
    pub name: Arc<str>,
    pub kind: Arc<Kind>,
    /// Input file path as it should appear in the tag file.
    pub input_file: Arc<str>,
    pub language: Option<Arc<str>>,
    /// 1-indexed line number of the tag.
    pub line_number: u64,
    /// Byte offset of the start of the tag's line in the input file. The
    /// pattern builder and the etags writer read the line back through
    /// this position.
    pub file_position: u64,
    /// 0 is the definition; other values index the kind's roles.
    pub role_index: usize,
    pub extension: ExtensionFields,
    /// Overrides applied when the tag came from a `#line`-directive region:
    /// the emitted location reflects the directive, not the physical file.
    pub source_file: Option<Arc<str>>,
    pub source_language: Option<Arc<str>>,
    /// Offset to add to `line_number` when line directives are honored.
    pub source_line_offset: i64,
    /// Tag is only reachable within its own file (e.g. a static function).
    pub is_file_scope: bool,
    /// Tag names the input file itself; etags uses the short record form
    /// for it and the default xref formats skip it.
    pub file_entry: bool,
    /// Crop the pattern/etags line at the tag name instead of using the
    /// whole line.
    pub truncate_line: bool,
    /// Emit a line number instead of a search pattern.
    pub line_number_entry: bool,
    /// Reserve a cork index without ever writing a record. The index stays
    /// valid for scope references.
    pub placeholder: bool,
    pub extras: Extras,
    /// Pre-built search pattern. Filled when the entry is corked so the
    /// queued copy owns its pattern.
    pub pattern: Option<Arc<str>>,
}

impl TagEntry {
    /// Definition tag at a line of the given source file.
    pub fn new(name: &str, kind: &Arc<Kind>, source: &SourceFile, line_number: u64) -> Self {
        Self::with_role(name, kind, source, line_number, ROLE_DEFINITION)
    }

    /// Reference tag with an explicit role index.
    pub fn with_role(
        name: &str,
        kind: &Arc<Kind>,
        source: &SourceFile,
        line_number: u64,
        role_index: usize,
    ) -> Self {
        debug_assert!(role_index == ROLE_DEFINITION || kind.role(role_index).is_some());
        Self {
            name: Arc::from(name),
            kind: Arc::clone(kind),
            input_file: source.tag_path(),
            language: source.language(),
            line_number,
            file_position: source.position_of_line(line_number).unwrap_or(0),
            role_index,
            extension: ExtensionFields::default(),
            source_file: None,
            source_language: None,
            source_line_offset: 0,
            is_file_scope: false,
            file_entry: false,
            truncate_line: false,
            line_number_entry: false,
            placeholder: false,
            extras: Extras::default(),
            pattern: None,
        }
    }

    /// Full constructor with explicit location, for tags whose position is
    /// remapped by a `#line` directive or synthesized outside any source
    /// file cursor.
    #[allow(clippy::too_many_arguments)]
    pub fn full(
        name: &str,
        kind: &Arc<Kind>,
        input_file: &str,
        language: Option<&str>,
        line_number: u64,
        file_position: u64,
        role_index: usize,
        source_file: Option<&str>,
        source_language: Option<&str>,
        source_line_offset: i64,
    ) -> Self {
        debug_assert!(role_index == ROLE_DEFINITION || kind.role(role_index).is_some());
        Self {
            name: Arc::from(name),
            kind: Arc::clone(kind),
            input_file: Arc::from(input_file),
            language: language.map(Arc::from),
            line_number,
            file_position,
            role_index,
            extension: ExtensionFields::default(),
            source_file: source_file.map(Arc::from),
            source_language: source_language.map(Arc::from),
            source_line_offset,
            is_file_scope: false,
            file_entry: false,
            truncate_line: false,
            line_number_entry: false,
            placeholder: false,
            extras: Extras::default(),
            pattern: None,
        }
    }

    /// Placeholder entry: reserves a cork index for scope chaining but is
    /// never written.
    pub fn placeholder(name: &str, kind: &Arc<Kind>, source: &SourceFile, line_number: u64) -> Self {
        let mut entry = Self::new(name, kind, source, line_number);
        entry.placeholder = true;
        entry
    }

    pub fn is_definition(&self) -> bool {
        self.role_index == ROLE_DEFINITION
    }

    /// Line number to emit, honoring `#line`-directive remapping when the
    /// caller asks for it.
    pub fn effective_line(&self, line_directives: bool) -> u64 {
        if line_directives && self.source_line_offset != 0 {
            self.line_number.saturating_add_signed(self.source_line_offset)
        } else {
            self.line_number
        }
    }

    /// Input file name to emit, honoring `#line`-directive remapping.
    pub fn effective_file(&self, line_directives: bool) -> &str {
        match (&self.source_file, line_directives) {
            (Some(f), true) => f,
            _ => &self.input_file,
        }
    }

    /// Language name to emit, honoring `#line`-directive remapping.
    pub fn effective_language(&self, line_directives: bool) -> Option<&str> {
        match (&self.source_language, line_directives) {
            (Some(l), true) => Some(l),
            _ => self.language.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::Kind;

    fn function_kind() -> Arc<Kind> {
        Kind::new('f', "function", "function definitions").shared()
    }

    #[test]
    fn test_entry_from_source() {
        let source = SourceFile::from_text("a.c", Some("C"), "int x;\nint main(void) {\n}\n");
        let entry = TagEntry::new("main", &function_kind(), &source, 2);

        assert_eq!(entry.name.as_ref(), "main");
        assert_eq!(entry.input_file.as_ref(), "a.c");
        assert_eq!(entry.language.as_deref(), Some("C"));
        assert_eq!(entry.line_number, 2);
        assert_eq!(entry.file_position, 7); // after "int x;\n"
        assert!(entry.is_definition());
    }

    #[test]
    fn test_line_directive_overrides() {
        let kind = function_kind();
        let mut entry = TagEntry::full(
            "parse",
            &kind,
            "parser.c",
            Some("C"),
            120,
            0,
            ROLE_DEFINITION,
            Some("grammar.y"),
            Some("YACC"),
            -100,
        );

        assert_eq!(entry.effective_file(false), "parser.c");
        assert_eq!(entry.effective_file(true), "grammar.y");
        assert_eq!(entry.effective_line(false), 120);
        assert_eq!(entry.effective_line(true), 20);
        assert_eq!(entry.effective_language(true), Some("YACC"));

        entry.source_file = None;
        assert_eq!(entry.effective_file(true), "parser.c");
    }

    #[test]
    fn test_extras_names() {
        let mut extras = Extras::default();
        assert!(extras.is_empty());

        extras.insert(Extras::FILE_SCOPE);
        extras.insert(Extras::REFERENCE);
        assert_eq!(extras.names(), vec!["fileScope", "reference"]);
    }
}
