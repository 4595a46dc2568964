//! The field registry: a process-ordered catalog of tag attributes.
//!
//! Every column a tag record can carry beyond its fixed three (name, file,
//! address) is a *field*: a letter-keyed descriptor with a renderer, an
//! availability predicate, an enabled flag, and an owning language. The
//! registry is seeded with the built-in fields in three tiers - fixed,
//! exuberant-extension, universal-extension - in a deterministic order, so
//! built-in [`FieldId`]s are stable constants. Parsers may register extra
//! language-scoped fields at runtime; same-named registrations are chained
//! through sibling links so name lookup can walk per-language variants.
//!
//! The registry is owned by the tag file (no process singleton); tests
//! construct their own.

mod render;

pub use render::{compact_input_line, escape_string, FieldValue, WriterFlavor};

use std::sync::Arc;

use crate::diag;
use crate::entry::TagEntry;
use crate::input::InputSource;
use crate::options::Options;

/// Prefix applied to extension field names when `--put-field-prefix` is on
/// and to all runtime-registered field names.
pub const FIELD_NAME_PREFIX: &str = "riptags_";

/// Stable index of a field in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub usize);

// Built-in field ids, in seeding order. Fixed tier first.
pub const NAME: FieldId = FieldId(0);
pub const INPUT_FILE: FieldId = FieldId(1);
pub const PATTERN: FieldId = FieldId(2);
// Exuberant-extension tier.
pub const COMPACT: FieldId = FieldId(3);
pub const ACCESS: FieldId = FieldId(4);
pub const FILE_SCOPE: FieldId = FieldId(5);
pub const INHERITS: FieldId = FieldId(6);
pub const KIND_LONG: FieldId = FieldId(7);
pub const KIND: FieldId = FieldId(8);
pub const LANGUAGE: FieldId = FieldId(9);
pub const IMPLEMENTATION: FieldId = FieldId(10);
pub const LINE: FieldId = FieldId(11);
pub const SIGNATURE: FieldId = FieldId(12);
pub const SCOPE: FieldId = FieldId(13);
pub const TYPEREF: FieldId = FieldId(14);
pub const KIND_KEY: FieldId = FieldId(15);
// Universal-extension tier.
pub const ROLE: FieldId = FieldId(16);
pub const REF_MARKER: FieldId = FieldId(17);
pub const SCOPE_KEY: FieldId = FieldId(18);
pub const EXTRAS: FieldId = FieldId(19);
pub const SCOPE_KIND: FieldId = FieldId(20);
pub const END: FieldId = FieldId(21);

const BUILTIN_COUNT: usize = 22;

/// Bitmask of value shapes a field can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataType(u8);

impl DataType {
    pub const STRING: DataType = DataType(1 << 0);
    pub const INTEGER: DataType = DataType(1 << 1);
    pub const BOOL: DataType = DataType(1 << 2);

    pub const fn union(self, other: DataType) -> DataType {
        DataType(self.0 | other.0)
    }

    pub fn contains(self, other: DataType) -> bool {
        self.0 & other.0 == other.0
    }

    /// Three-character mask for the --list-fields table.
    pub fn flags(self) -> String {
        let mut s = String::from("---");
        if self.contains(DataType::STRING) {
            s.replace_range(0..1, "s");
        }
        if self.contains(DataType::INTEGER) {
            s.replace_range(1..2, "i");
        }
        if self.contains(DataType::BOOL) {
            s.replace_range(2..3, "b");
        }
        s
    }
}

/// Data extractor backing a field. Each variant pairs with a per-writer
/// escape policy in [`render`]; there is no function-pointer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    Name,
    InputFile,
    Pattern,
    CompactInputLine,
    Access,
    FileScopeMarker,
    Inherits,
    KindName,
    KindLetter,
    Language,
    Implementation,
    LineNumber,
    Signature,
    Scope,
    Typeref,
    Role,
    RefMarker,
    Extras,
    ScopeKindName,
    End,
    /// Runtime-registered parser field: renders the raw value the parser
    /// attached to the tag.
    Parser,
}

/// What a parser supplies when registering a new field.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub data_type: DataType,
    pub renderer: Renderer,
}

impl FieldDefinition {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            enabled: false,
            data_type: DataType::STRING,
            renderer: Renderer::Parser,
        }
    }
}

/// One registered field.
#[derive(Debug, Clone)]
struct FieldDescriptor {
    letter: Option<char>,
    name: Option<String>,
    name_with_prefix: Option<String>,
    description: String,
    enabled: bool,
    /// Fixed fields cannot be disabled.
    fixed: bool,
    /// Owning language; `None` means available to every language.
    language: Option<Arc<str>>,
    data_type: DataType,
    renderer: Renderer,
    /// Next field registered under the same name (older entries point
    /// forward to newer ones).
    sibling: Option<FieldId>,
}

/// Seed row for a built-in field.
struct BuiltinSpec {
    letter: char,
    name: Option<&'static str>,
    enabled: bool,
    description: &'static str,
    data_type: DataType,
    renderer: Renderer,
}

macro_rules! builtin {
    ($letter:expr, $name:expr, $enabled:expr, $desc:expr, $dt:expr, $renderer:expr) => {
        BuiltinSpec {
            letter: $letter,
            name: $name,
            enabled: $enabled,
            description: $desc,
            data_type: $dt,
            renderer: $renderer,
        }
    };
}

/// Fixed tier: always present in every record, never disableable.
const FIXED_FIELDS: &[BuiltinSpec] = &[
    builtin!('N', Some("name"), true, "tag name (fixed field)", DataType::STRING, Renderer::Name),
    builtin!('F', Some("input"), true, "input file (fixed field)", DataType::STRING, Renderer::InputFile),
    builtin!('P', Some("pattern"), true, "pattern (fixed field)", DataType::STRING, Renderer::Pattern),
];

/// Classic extension tier, letter-compatible with exuberant ctags.
const EXUBERANT_FIELDS: &[BuiltinSpec] = &[
    builtin!('C', Some("compact"), false, "compact input line (used in xref output)", DataType::STRING, Renderer::CompactInputLine),
    builtin!('a', Some("access"), false, "access (or export) of class members", DataType::STRING, Renderer::Access),
    builtin!('f', Some("file"), true, "file-restricted scoping", DataType::BOOL, Renderer::FileScopeMarker),
    builtin!('i', Some("inherits"), false, "inheritance information", DataType::STRING.union(DataType::BOOL), Renderer::Inherits),
    builtin!('K', None, false, "kind of tag as full name", DataType::STRING, Renderer::KindName),
    builtin!('k', None, true, "kind of tag as a single letter", DataType::STRING, Renderer::KindLetter),
    builtin!('l', Some("language"), false, "language of input file containing tag", DataType::STRING, Renderer::Language),
    builtin!('m', Some("implementation"), false, "implementation information", DataType::STRING, Renderer::Implementation),
    builtin!('n', Some("line"), false, "line number of tag definition", DataType::INTEGER, Renderer::LineNumber),
    builtin!('S', Some("signature"), false, "signature of routine (e.g. prototype or parameter list)", DataType::STRING, Renderer::Signature),
    builtin!('s', None, true, "scope of tag definition", DataType::STRING, Renderer::Scope),
    builtin!('t', Some("typeref"), true, "type and name of a variable or typedef", DataType::STRING, Renderer::Typeref),
    builtin!('z', Some("kind"), false, "include the \"kind:\" key in kind field", DataType::STRING, Renderer::KindName),
];

/// Universal tier; these get the ecosystem name prefix.
const UNIVERSAL_FIELDS: &[BuiltinSpec] = &[
    builtin!('r', Some("role"), false, "role", DataType::STRING, Renderer::Role),
    builtin!('R', None, false, "marker (R or D) for reference or definition tags", DataType::STRING, Renderer::RefMarker),
    builtin!('Z', Some("scope"), false, "include the \"scope:\" key in scope field", DataType::STRING, Renderer::Scope),
    builtin!('E', Some("extras"), false, "extra tag type information", DataType::STRING, Renderer::Extras),
    builtin!('p', Some("scopeKind"), false, "kind of scope as full name", DataType::STRING, Renderer::ScopeKindName),
    builtin!('e', Some("end"), false, "end lines of various items", DataType::INTEGER, Renderer::End),
];

/// The registry itself: built-in tiers plus runtime registrations.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<FieldDescriptor>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRegistry {
    /// Registry seeded with the built-in tiers in deterministic order.
    pub fn new() -> Self {
        let mut fields = Vec::with_capacity(BUILTIN_COUNT);
        for (tier, fixed, prefixed) in [
            (FIXED_FIELDS, true, false),
            (EXUBERANT_FIELDS, false, false),
            (UNIVERSAL_FIELDS, false, true),
        ] {
            for spec in tier {
                fields.push(FieldDescriptor {
                    letter: Some(spec.letter),
                    name: spec.name.map(str::to_string),
                    name_with_prefix: if prefixed {
                        spec.name.map(|n| format!("{FIELD_NAME_PREFIX}{n}"))
                    } else {
                        spec.name.map(str::to_string)
                    },
                    description: spec.description.to_string(),
                    enabled: spec.enabled,
                    fixed,
                    language: None,
                    data_type: spec.data_type,
                    renderer: spec.renderer,
                    sibling: None,
                });
            }
        }
        debug_assert_eq!(fields.len(), BUILTIN_COUNT);
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = FieldId> {
        (0..self.fields.len()).map(FieldId)
    }

    fn get(&self, id: FieldId) -> &FieldDescriptor {
        &self.fields[id.0]
    }

    /// Field keyed by its option letter. Unknown letters resolve to `None`;
    /// callers treat that as absent.
    pub fn field_for_letter(&self, letter: char) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f.letter == Some(letter))
            .map(FieldId)
    }

    /// First field registered under a name, regardless of owning language.
    pub fn field_for_name(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
            .map(FieldId)
    }

    /// Field registered under a name for a specific language (`None` means
    /// the language-agnostic built-ins). Walk [`Self::next_sibling`] to
    /// visit other languages' variants of the same name.
    pub fn field_for_name_and_language(
        &self,
        name: &str,
        language: Option<&str>,
    ) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name) && f.language.as_deref() == language)
            .map(FieldId)
    }

    /// Next field registered under the same name, if any.
    pub fn next_sibling(&self, id: FieldId) -> Option<FieldId> {
        self.get(id).sibling
    }

    /// Field name as it should appear in output: the prefixed form when the
    /// prefix option is on, the plain name otherwise.
    pub fn field_name(&self, id: FieldId, put_prefix: bool) -> Option<&str> {
        let f = self.get(id);
        if put_prefix {
            f.name_with_prefix.as_deref()
        } else {
            f.name.as_deref()
        }
    }

    pub fn letter(&self, id: FieldId) -> Option<char> {
        self.get(id).letter
    }

    pub fn description(&self, id: FieldId) -> &str {
        &self.get(id).description
    }

    pub fn language(&self, id: FieldId) -> Option<&str> {
        self.get(id).language.as_deref()
    }

    pub fn data_type(&self, id: FieldId) -> DataType {
        self.get(id).data_type
    }

    pub fn renderer(&self, id: FieldId) -> Renderer {
        self.get(id).renderer
    }

    pub fn is_enabled(&self, id: FieldId) -> bool {
        self.get(id).enabled
    }

    pub fn is_fixed(&self, id: FieldId) -> bool {
        self.get(id).fixed
    }

    /// Set a field's enabled state, returning the previous one. Fixed
    /// fields ignore the request; with `warn_if_fixed` the refusal is
    /// reported.
    pub fn enable(&mut self, id: FieldId, state: bool, warn_if_fixed: bool) -> bool {
        let fixed = self.get(id).fixed;
        let old = self.get(id).enabled;
        if fixed {
            if !state && warn_if_fixed {
                let f = self.get(id);
                match (f.letter, f.name.as_deref()) {
                    (Some(l), Some(n)) => {
                        diag::warning(format_args!("cannot disable fixed field: '{l}'{{{n}}}"))
                    }
                    (None, Some(n)) => {
                        diag::warning(format_args!("cannot disable fixed field: {{{n}}}"))
                    }
                    (Some(l), None) => {
                        diag::warning(format_args!("cannot disable fixed field: '{l}'"))
                    }
                    (None, None) => unreachable!("fixed field without letter or name"),
                }
            }
            return old;
        }
        self.fields[id.0].enabled = state;
        old
    }

    /// Whether the tag actually carries a value for the field. Fields
    /// without a predicate are always available.
    pub fn has_value(&self, id: FieldId, tag: &TagEntry) -> bool {
        match self.get(id).renderer {
            Renderer::Language => tag.language.is_some(),
            Renderer::Typeref => {
                tag.extension.type_ref[0].is_some() && tag.extension.type_ref[1].is_some()
            }
            Renderer::FileScopeMarker => tag.is_file_scope,
            Renderer::Inherits => tag.extension.inheritance.is_some(),
            Renderer::Access => tag.extension.access.is_some(),
            Renderer::Implementation => tag.extension.implementation.is_some(),
            Renderer::Signature => tag.extension.signature.is_some(),
            Renderer::Role => tag.role_index != crate::kinds::ROLE_DEFINITION,
            Renderer::Extras => !tag.extras.is_empty(),
            Renderer::End => tag.extension.end_line != 0,
            _ => true,
        }
    }

    /// Render a field's value for a writer flavor.
    ///
    /// `parser_value` carries the raw value for runtime-registered parser
    /// fields and is ignored by the built-in renderers.
    pub fn render(
        &self,
        flavor: WriterFlavor,
        id: FieldId,
        tag: &TagEntry,
        opts: &Options,
        source: &dyn InputSource,
        parser_value: Option<&str>,
    ) -> FieldValue {
        render::render(self.get(id).renderer, flavor, tag, opts, source, parser_value)
    }

    /// Register a new field at runtime, owned by a language. Returns its
    /// id. If an older field shares the name, its sibling link is updated
    /// to point at the new registration.
    pub fn define_field(&mut self, def: FieldDefinition, language: &str) -> FieldId {
        debug_assert!(def.name.chars().all(|c| c.is_ascii_alphanumeric()));
        let id = FieldId(self.fields.len());
        self.fields.push(FieldDescriptor {
            letter: None,
            name_with_prefix: Some(format!("{FIELD_NAME_PREFIX}{}", def.name)),
            name: Some(def.name.clone()),
            description: def.description,
            enabled: def.enabled,
            fixed: false,
            language: Some(Arc::from(language)),
            data_type: def.data_type,
            renderer: def.renderer,
            sibling: None,
        });
        // Chain the most recent earlier registration of this name forward.
        for i in (0..id.0).rev() {
            if self.fields[i].name.as_deref() == Some(def.name.as_str()) {
                debug_assert!(self.fields[i].sibling.is_none());
                self.fields[i].sibling = Some(id);
                break;
            }
        }
        id
    }

    /// Apply a `+`/`-` letter spec such as `+nS-k`. Unknown letters are
    /// skipped silently.
    pub fn apply_spec(&mut self, spec: &str) {
        let mut state = true;
        for c in spec.chars() {
            match c {
                '+' => state = true,
                '-' => state = false,
                _ => match self.field_for_letter(c) {
                    Some(id) => {
                        self.enable(id, state, true);
                    }
                    None => diag::verbose(format_args!("ignoring unknown field letter: {c}")),
                },
            }
        }
    }

    /// Aligned table of every field, for `--list-fields`.
    pub fn list(&self, put_prefix: bool) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<7} {:<15} {:<7} {:<16} {:<6} {}\n",
            "#LETTER", "NAME", "ENABLED", "LANGUAGE", "JSTYPE", "DESCRIPTION"
        ));
        for id in self.ids() {
            let f = self.get(id);
            out.push_str(&format!(
                "{:<7} {:<15} {:<7} {:<16} {:<6} {}\n",
                f.letter.unwrap_or('-'),
                self.field_name(id, put_prefix).unwrap_or("NONE"),
                if f.enabled { "on" } else { "off" },
                f.language.as_deref().unwrap_or("NONE"),
                f.data_type.flags(),
                f.description,
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::SourceFile;
    use crate::kinds::Kind;

    fn entry() -> TagEntry {
        let source = SourceFile::from_text("a.c", Some("C"), "int main(void) {\n}\n");
        TagEntry::new("main", &Kind::new('f', "function", "functions").shared(), &source, 1)
    }

    #[test]
    fn test_builtin_ids_are_deterministic() {
        let reg = FieldRegistry::new();
        assert_eq!(reg.len(), BUILTIN_COUNT);
        assert_eq!(reg.field_for_letter('N'), Some(NAME));
        assert_eq!(reg.field_for_letter('F'), Some(INPUT_FILE));
        assert_eq!(reg.field_for_letter('n'), Some(LINE));
        assert_eq!(reg.field_for_letter('s'), Some(SCOPE));
        assert_eq!(reg.field_for_letter('e'), Some(END));
        assert_eq!(reg.field_for_name("typeref"), Some(TYPEREF));
        assert_eq!(reg.field_for_letter('Q'), None);
        assert_eq!(reg.field_for_name("nope"), None);
    }

    #[test]
    fn test_enable_disable_roundtrip() {
        let mut reg = FieldRegistry::new();
        let initial = reg.is_enabled(LINE);
        let prev = reg.enable(LINE, true, true);
        assert_eq!(prev, initial);
        reg.enable(LINE, false, true);
        reg.enable(LINE, initial, true);
        assert_eq!(reg.is_enabled(LINE), initial);
    }

    #[test]
    fn test_fixed_fields_cannot_be_disabled() {
        let mut reg = FieldRegistry::new();
        assert!(reg.is_fixed(NAME));
        let prev = reg.enable(NAME, false, false);
        assert!(prev);
        assert!(reg.is_enabled(NAME));
    }

    #[test]
    fn test_define_field_chains_siblings() {
        let mut reg = FieldRegistry::new();
        let first = reg.define_field(FieldDefinition::new("sectionMarker", "section"), "Make");
        let second = reg.define_field(FieldDefinition::new("sectionMarker", "section"), "Asm");

        assert_eq!(reg.next_sibling(first), Some(second));
        assert_eq!(reg.next_sibling(second), None);
        assert_eq!(
            reg.field_for_name_and_language("sectionMarker", Some("Make")),
            Some(first)
        );
        assert_eq!(
            reg.field_for_name_and_language("sectionMarker", Some("Asm")),
            Some(second)
        );
        assert_eq!(
            reg.field_name(first, true),
            Some("riptags_sectionMarker")
        );
        assert_eq!(reg.field_name(first, false), Some("sectionMarker"));
    }

    #[test]
    fn test_apply_spec_toggles_letters() {
        let mut reg = FieldRegistry::new();
        assert!(!reg.is_enabled(LINE));
        assert!(reg.is_enabled(KIND));
        reg.apply_spec("+n-k");
        assert!(reg.is_enabled(LINE));
        assert!(!reg.is_enabled(KIND));
        // Unknown letters are skipped, fixed fields survive a disable.
        reg.apply_spec("-QN");
        assert!(reg.is_enabled(NAME));
    }

    #[test]
    fn test_availability_predicates() {
        let reg = FieldRegistry::new();
        let mut tag = entry();
        assert!(reg.has_value(NAME, &tag));
        assert!(reg.has_value(LANGUAGE, &tag));
        assert!(!reg.has_value(SIGNATURE, &tag));
        assert!(!reg.has_value(TYPEREF, &tag));
        assert!(!reg.has_value(ROLE, &tag));
        assert!(!reg.has_value(FILE_SCOPE, &tag));

        tag.extension.signature = Some("(void)".into());
        tag.is_file_scope = true;
        tag.extension.type_ref = [Some("typename".into()), Some("int".into())];
        assert!(reg.has_value(SIGNATURE, &tag));
        assert!(reg.has_value(FILE_SCOPE, &tag));
        assert!(reg.has_value(TYPEREF, &tag));
    }

    #[test]
    fn test_data_type_flags() {
        assert_eq!(DataType::STRING.flags(), "s--");
        assert_eq!(DataType::INTEGER.flags(), "-i-");
        assert_eq!(DataType::STRING.union(DataType::BOOL).flags(), "s-b");
    }

    #[test]
    fn test_list_has_header_and_rows() {
        let reg = FieldRegistry::new();
        let listing = reg.list(false);
        assert!(listing.starts_with("#LETTER"));
        assert_eq!(listing.lines().count(), BUILTIN_COUNT + 1);
    }
}
