//! Regex-based language parsers.
//!
//! Each supported language owns its kind catalog and a pattern set, and
//! walks the input line by line emitting tag entries through the engine.
//! Scope nesting rides on the cork queue: a class or impl block gets its
//! cork index, and members emitted while it is current carry that index as
//! their `scope_index`, so the writer can synthesize `class:Foo` columns
//! at flush time.
//!
//! Regex extraction is deliberately shallow - definitions at predictable
//! line shapes, one scope level of nesting. It covers the common layout of
//! real codebases without pulling in a parsing framework.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::entry::{TagEntry, SCOPE_NONE};
use crate::input::SourceFile;
use crate::kinds::{Kind, Role};
use crate::output::TagFile;

/// Languages the regex scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Python,
    Rust,
}

impl Language {
    /// Detect language from file extension.
    pub fn for_path(path: &Path) -> Option<Language> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("c" | "h") => Some(Language::C),
            Some("py") => Some(Language::Python),
            Some("rs") => Some(Language::Rust),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Python => "Python",
            Language::Rust => "Rust",
        }
    }

    /// Emit tags for one already-loaded source file.
    pub fn parse(self, tag_file: &mut TagFile, source: &SourceFile) -> Result<()> {
        match self {
            Language::C => parse_c(tag_file, source),
            Language::Python => parse_python(tag_file, source),
            Language::Rust => parse_rust(tag_file, source),
        }
    }
}

// ============================================================================
// C
// ============================================================================

/// C kind catalog. The header kind is reference-only: an include never
/// defines the header, it uses it in the "system" or "local" role.
struct CKinds {
    function: Arc<Kind>,
    macro_def: Arc<Kind>,
    struct_: Arc<Kind>,
    variable: Arc<Kind>,
    header: Arc<Kind>,
}

static C_KINDS: Lazy<CKinds> = Lazy::new(|| CKinds {
    function: Kind::new('f', "function", "function definitions").shared(),
    macro_def: Kind::new('d', "macro", "macro definitions").shared(),
    struct_: Kind::new('s', "struct", "structure names").shared(),
    variable: Kind::new('v', "variable", "variable definitions").shared(),
    header: Kind::new('h', "header", "included header files")
        .with_roles(vec![
            Role::new("system", "header included with angle brackets"),
            Role::new("local", "header included with double quotes"),
        ])
        .reference_only()
        .shared(),
});

/// Role indices on the C header kind.
const ROLE_HEADER_SYSTEM: usize = 1;
const ROLE_HEADER_LOCAL: usize = 2;

mod c_patterns {
    use super::*;

    /// Match includes: `#include <stdio.h>` or `#include "local.h"`
    pub static INCLUDE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"^\s*#\s*include\s*([<"])([^>"]+)[>"]"#).expect("Invalid C include regex")
    });

    /// Match macro definitions: `#define NAME`
    pub static DEFINE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\s*#\s*define\s+(\w+)").expect("Invalid C define regex")
    });

    /// Match struct declarations: `struct name {` or `typedef struct name`
    pub static STRUCT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:typedef\s+)?struct\s+(\w+)").expect("Invalid C struct regex")
    });

    /// Match function definitions at the left margin:
    /// `int main(void) {`, `static void helper(...)`.
    pub static FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(static\s+)?[A-Za-z_][A-Za-z0-9_]*(?:[ \t*]+[A-Za-z_][A-Za-z0-9_]*)*[ \t*]+\**([A-Za-z_][A-Za-z0-9_]*)\s*\(")
            .expect("Invalid C function regex")
    });

    /// Match file-scope variables: `int counter;`, `static char *name = ...`
    pub static VARIABLE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(static\s+)?[A-Za-z_][A-Za-z0-9_]*(?:[ \t*]+[A-Za-z_][A-Za-z0-9_]*)*[ \t*]+\**([A-Za-z_][A-Za-z0-9_]*)\s*(?:=[^=]|;)")
            .expect("Invalid C variable regex")
    });
}

/// Language keywords that the function/variable patterns would otherwise
/// capture as a name or a return type.
const C_KEYWORDS: &[&str] = &["if", "else", "while", "for", "switch", "return", "sizeof", "case"];

fn is_c_keyword(word: &str) -> bool {
    C_KEYWORDS.contains(&word)
}

/// Parse C source for functions, macros, structs, variables and includes.
///
/// Extraction strategy:
/// - Includes become reference tags on the header kind, role "system" or
///   "local" by delimiter
/// - Macros: `#define NAME` lines
/// - Functions: definitions starting at the left margin and not ending in
///   `;` (which would be a declaration); `static` marks file scope
/// - Variables: `type name;` or `type name = ...` at the left margin
///
/// Limitations: K&R definitions, multi-line declarators and functions with
/// the return type on its own line are not recognized.
fn parse_c(tag_file: &mut TagFile, source: &SourceFile) -> Result<()> {
    for (i, line) in source.text().lines().enumerate() {
        let line_number = i as u64 + 1;

        if let Some(cap) = c_patterns::INCLUDE.captures(line) {
            let role = if &cap[1] == "<" { ROLE_HEADER_SYSTEM } else { ROLE_HEADER_LOCAL };
            let tag = TagEntry::with_role(&cap[2], &C_KINDS.header, source, line_number, role);
            tag_file.make_tag(&tag, source)?;
            continue;
        }

        if let Some(cap) = c_patterns::DEFINE.captures(line) {
            let tag = TagEntry::new(&cap[1], &C_KINDS.macro_def, source, line_number);
            tag_file.make_tag(&tag, source)?;
            continue;
        }

        if let Some(cap) = c_patterns::STRUCT.captures(line) {
            let tag = TagEntry::new(&cap[1], &C_KINDS.struct_, source, line_number);
            tag_file.make_tag(&tag, source)?;
            continue;
        }

        let trimmed = line.trim_end();
        if let Some(cap) = c_patterns::FUNCTION.captures(line) {
            let name = cap.get(2).map_or("", |m| m.as_str());
            // Declarations end in ';'; control flow is not a definition.
            if !trimmed.ends_with(';') && !is_c_keyword(name) {
                let mut tag = TagEntry::new(name, &C_KINDS.function, source, line_number);
                tag.is_file_scope = cap.get(1).is_some();
                tag_file.make_tag(&tag, source)?;
                continue;
            }
        }

        if let Some(cap) = c_patterns::VARIABLE.captures(line) {
            let name = cap.get(2).map_or("", |m| m.as_str());
            if !is_c_keyword(name) {
                let mut tag = TagEntry::new(name, &C_KINDS.variable, source, line_number);
                tag.is_file_scope = cap.get(1).is_some();
                tag_file.make_tag(&tag, source)?;
            }
        }
    }
    Ok(())
}

// ============================================================================
// PYTHON
// ============================================================================

struct PythonKinds {
    class: Arc<Kind>,
    function: Arc<Kind>,
    member: Arc<Kind>,
    variable: Arc<Kind>,
}

static PYTHON_KINDS: Lazy<PythonKinds> = Lazy::new(|| PythonKinds {
    class: Kind::new('c', "class", "classes").shared(),
    function: Kind::new('f', "function", "functions").shared(),
    member: Kind::new('m', "member", "class members").shared(),
    variable: Kind::new('v', "variable", "module-level variables").shared(),
});

mod python_patterns {
    use super::*;

    /// Match class definitions: `class Foo:` or `class Foo(Bar):`
    pub static CLASS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^class\s+(\w+)\s*(?:\(([^)]*)\))?").expect("Invalid Python class regex")
    });

    /// Match top-level function definitions: `def foo(`
    pub static FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:async\s+)?def\s+(\w+)\s*\(").expect("Invalid Python function regex")
    });

    /// Match method definitions (indented): `    def bar(`
    pub static METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[ \t]+(?:async\s+)?def\s+(\w+)\s*\(").expect("Invalid Python method regex")
    });

    /// Match module-level constants: `FOO = ...`
    pub static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^([A-Z_][A-Z0-9_]*)\s*=").expect("Invalid Python assignment regex")
    });
}

/// Parse Python source for classes, functions, methods and constants.
///
/// The most recent top-level class stays current until the next top-level
/// definition; indented `def`s inside it become members scoped through the
/// cork queue. Base classes land in the inherits field.
///
/// Limitations: nested classes and functions defined inside functions are
/// tagged but not scoped.
fn parse_python(tag_file: &mut TagFile, source: &SourceFile) -> Result<()> {
    let mut class_index = SCOPE_NONE;

    for (i, line) in source.text().lines().enumerate() {
        let line_number = i as u64 + 1;

        if let Some(cap) = python_patterns::CLASS.captures(line) {
            let mut tag = TagEntry::new(&cap[1], &PYTHON_KINDS.class, source, line_number);
            if let Some(bases) = cap.get(2) {
                if !bases.as_str().trim().is_empty() {
                    tag.extension.inheritance = Some(bases.as_str().trim().into());
                }
            }
            class_index = tag_file.make_tag(&tag, source)?;
            continue;
        }

        if let Some(cap) = python_patterns::FUNCTION.captures(line) {
            class_index = SCOPE_NONE;
            let tag = TagEntry::new(&cap[1], &PYTHON_KINDS.function, source, line_number);
            tag_file.make_tag(&tag, source)?;
            continue;
        }

        if let Some(cap) = python_patterns::METHOD.captures(line) {
            let kind = if class_index != SCOPE_NONE {
                &PYTHON_KINDS.member
            } else {
                &PYTHON_KINDS.function
            };
            let mut tag = TagEntry::new(&cap[1], kind, source, line_number);
            tag.extension.scope_index = class_index;
            tag_file.make_tag(&tag, source)?;
            continue;
        }

        if let Some(cap) = python_patterns::ASSIGNMENT.captures(line) {
            class_index = SCOPE_NONE;
            let tag = TagEntry::new(&cap[1], &PYTHON_KINDS.variable, source, line_number);
            tag_file.make_tag(&tag, source)?;
        }
    }
    Ok(())
}

// ============================================================================
// RUST
// ============================================================================

struct RustKinds {
    module: Arc<Kind>,
    function: Arc<Kind>,
    struct_: Arc<Kind>,
    enum_: Arc<Kind>,
    trait_: Arc<Kind>,
    implementation: Arc<Kind>,
    constant: Arc<Kind>,
    macro_def: Arc<Kind>,
}

static RUST_KINDS: Lazy<RustKinds> = Lazy::new(|| RustKinds {
    module: Kind::new('n', "module", "modules").shared(),
    function: Kind::new('f', "function", "function definitions").shared(),
    struct_: Kind::new('s', "struct", "structs").shared(),
    enum_: Kind::new('g', "enum", "enum definitions").shared(),
    trait_: Kind::new('t', "trait", "traits").shared(),
    implementation: Kind::new('c', "implementation", "implementations").shared(),
    constant: Kind::new('C', "constant", "constants and statics").shared(),
    macro_def: Kind::new('M', "macro", "macro definitions").shared(),
});

mod rust_patterns {
    use super::*;

    /// Match function definitions: `fn foo(`, `pub async fn bar(`
    pub static FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(\s*)(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(\w+)\s*(?:<[^>]*>)?(\([^)]*\))?")
            .expect("Invalid Rust fn regex")
    });

    /// Match struct definitions: `struct Foo` or `pub struct Foo<T>`
    pub static STRUCT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?struct\s+(\w+)").expect("Invalid Rust struct regex")
    });

    /// Match enum definitions: `enum Bar` or `pub enum Bar`
    pub static ENUM: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?enum\s+(\w+)").expect("Invalid Rust enum regex")
    });

    /// Match trait definitions: `trait Baz` or `pub trait Baz`
    pub static TRAIT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+(\w+)").expect("Invalid Rust trait regex")
    });

    /// Match impl blocks: `impl Foo {` or `impl Trait for Foo {`
    pub static IMPL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^impl(?:\s*<[^>]*>)?\s+(?:(?:\w+(?:::\w+)*)\s+for\s+)?(\w+)")
            .expect("Invalid Rust impl regex")
    });

    /// Match consts and statics: `const FOO:` or `pub static BAR:`
    pub static CONST: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(?:const|static)\s+(?:mut\s+)?(\w+)\s*:")
            .expect("Invalid Rust const regex")
    });

    /// Match inline module declarations: `mod name {` or `pub mod name;`
    pub static MODULE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)").expect("Invalid Rust mod regex")
    });

    /// Match macro definitions: `macro_rules! name`
    pub static MACRO: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^macro_rules!\s+(\w+)").expect("Invalid Rust macro regex")
    });
}

/// Parse Rust source for top-level items and impl-block methods.
///
/// An `impl` line becomes the current scope; indented `fn`s until the
/// closing margin-level `}` carry its cork index, so methods come out as
/// `implementation:Type` in the extended format. Function signatures (the
/// parenthesized parameter list, when it closes on the same line) land in
/// the signature field.
///
/// Limitations: one scope level; items inside functions and nested modules
/// are tagged unscoped.
fn parse_rust(tag_file: &mut TagFile, source: &SourceFile) -> Result<()> {
    let mut impl_index = SCOPE_NONE;

    for (i, line) in source.text().lines().enumerate() {
        let line_number = i as u64 + 1;

        if line.starts_with('}') {
            impl_index = SCOPE_NONE;
            continue;
        }

        if let Some(cap) = rust_patterns::IMPL.captures(line) {
            let tag = TagEntry::new(&cap[1], &RUST_KINDS.implementation, source, line_number);
            impl_index = tag_file.make_tag(&tag, source)?;
            continue;
        }

        if let Some(cap) = rust_patterns::FUNCTION.captures(line) {
            let indented = !cap[1].is_empty();
            let mut tag = TagEntry::new(&cap[2], &RUST_KINDS.function, source, line_number);
            if let Some(sig) = cap.get(3) {
                tag.extension.signature = Some(sig.as_str().into());
            }
            if indented && impl_index != SCOPE_NONE {
                tag.extension.scope_index = impl_index;
            } else if !indented {
                impl_index = SCOPE_NONE;
            }
            tag_file.make_tag(&tag, source)?;
            continue;
        }

        for (pattern, kind) in [
            (&rust_patterns::STRUCT, &RUST_KINDS.struct_),
            (&rust_patterns::ENUM, &RUST_KINDS.enum_),
            (&rust_patterns::TRAIT, &RUST_KINDS.trait_),
            (&rust_patterns::CONST, &RUST_KINDS.constant),
            (&rust_patterns::MODULE, &RUST_KINDS.module),
            (&rust_patterns::MACRO, &RUST_KINDS.macro_def),
        ] {
            if let Some(cap) = pattern.captures(line) {
                let tag = TagEntry::new(&cap[1], kind, source, line_number);
                tag_file.make_tag(&tag, source)?;
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldRegistry;
    use crate::options::{Options, SortKind};

    /// Run a parser over in-memory text and return the non-pseudo lines.
    fn scan_text(language: Language, name: &str, text: &str) -> Vec<String> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags");
        let opts = Options {
            tag_file_name: path.clone(),
            sorted: SortKind::Unsorted,
            pseudo_tags: false,
            ..Options::default()
        };
        let mut registry = FieldRegistry::new();
        registry.apply_spec("+r");
        let mut tag_file = TagFile::open(opts, registry).unwrap();
        let source = SourceFile::from_text(name, Some(language.name()), text);
        tag_file.cork();
        language.parse(&mut tag_file, &source).unwrap();
        tag_file.uncork(&source).unwrap();
        tag_file.close(false).unwrap();
        std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::for_path(Path::new("a.c")), Some(Language::C));
        assert_eq!(Language::for_path(Path::new("a.h")), Some(Language::C));
        assert_eq!(Language::for_path(Path::new("m.py")), Some(Language::Python));
        assert_eq!(Language::for_path(Path::new("m.rs")), Some(Language::Rust));
        assert_eq!(Language::for_path(Path::new("m.txt")), None);
    }

    #[test]
    fn test_c_function_and_static() {
        let lines = scan_text(
            Language::C,
            "a.c",
            "int main(void) {\n}\n\nstatic void helper(int x) {\n}\n\nint declared(void);\n",
        );
        assert!(lines.iter().any(|l| l.starts_with("main\t") && l.ends_with("\tf")));
        assert!(lines.iter().any(|l| l.starts_with("helper\t") && l.ends_with("\tf\tfile:")));
        assert!(!lines.iter().any(|l| l.starts_with("declared\t")));
    }

    #[test]
    fn test_c_includes_have_roles() {
        let lines = scan_text(
            Language::C,
            "a.c",
            "#include <stdio.h>\n#include \"local.h\"\n",
        );
        assert!(lines.iter().any(|l| l.starts_with("stdio.h\t") && l.contains("role:system")));
        assert!(lines.iter().any(|l| l.starts_with("local.h\t") && l.contains("role:local")));
    }

    #[test]
    fn test_c_define_and_struct() {
        let lines = scan_text(
            Language::C,
            "a.h",
            "#define MAX_LEN 64\ntypedef struct node {\n    int v;\n} node;\n",
        );
        assert!(lines.iter().any(|l| l.starts_with("MAX_LEN\t") && l.ends_with("\td")));
        assert!(lines.iter().any(|l| l.starts_with("node\t") && l.ends_with("\ts")));
    }

    #[test]
    fn test_python_class_scoping() {
        let lines = scan_text(
            Language::Python,
            "m.py",
            "class Foo(Base):\n    def bar(self):\n        pass\n\ndef standalone():\n    pass\n\nLIMIT = 3\n",
        );
        assert!(lines.iter().any(|l| l.starts_with("Foo\t") && l.ends_with("\tc")));
        assert!(lines.iter().any(|l| l.starts_with("bar\t") && l.contains("\tm\tclass:Foo")));
        assert!(lines.iter().any(|l| l.starts_with("standalone\t") && l.ends_with("\tf")));
        assert!(lines.iter().any(|l| l.starts_with("LIMIT\t") && l.ends_with("\tv")));
    }

    #[test]
    fn test_python_def_after_class_is_unscoped() {
        let lines = scan_text(
            Language::Python,
            "m.py",
            "class Foo:\n    pass\n\ndef later():\n    def inner():\n        pass\n",
        );
        let later = lines.iter().find(|l| l.starts_with("later\t")).unwrap();
        assert!(!later.contains("class:"));
        // Indented def with no current class falls back to a plain function.
        let inner = lines.iter().find(|l| l.starts_with("inner\t")).unwrap();
        assert!(!inner.contains("class:"));
    }

    #[test]
    fn test_rust_impl_scoping_and_signature() {
        let lines = scan_text(
            Language::Rust,
            "m.rs",
            "pub struct Point;\n\nimpl Point {\n    pub fn len(&self) -> f64 {\n        0.0\n    }\n}\n\nfn free() {}\n",
        );
        assert!(lines.iter().any(|l| l.starts_with("Point\t") && l.ends_with("\ts")));
        assert!(lines.iter().any(|l| l.starts_with("Point\t") && l.ends_with("\tc")));
        let method = lines.iter().find(|l| l.starts_with("len\t")).unwrap();
        assert!(method.contains("implementation:Point"));
        let free = lines.iter().find(|l| l.starts_with("free\t")).unwrap();
        assert!(!free.contains("implementation:"));
    }

    #[test]
    fn test_rust_items() {
        let lines = scan_text(
            Language::Rust,
            "m.rs",
            "pub enum Color { Red }\npub trait Draw {}\nconst MAX: usize = 8;\nmod detail;\nmacro_rules! ok { () => {} }\n",
        );
        assert!(lines.iter().any(|l| l.starts_with("Color\t") && l.ends_with("\tg")));
        assert!(lines.iter().any(|l| l.starts_with("Draw\t") && l.ends_with("\tt")));
        assert!(lines.iter().any(|l| l.starts_with("MAX\t") && l.ends_with("\tC")));
        assert!(lines.iter().any(|l| l.starts_with("detail\t") && l.ends_with("\tn")));
        assert!(lines.iter().any(|l| l.starts_with("ok\t") && l.ends_with("\tM")));
    }

    #[test]
    fn test_rust_trait_impl_uses_type_name() {
        let lines = scan_text(
            Language::Rust,
            "m.rs",
            "impl std::fmt::Display for Badge {\n    fn fmt(&self) -> () {}\n}\n",
        );
        // The implemented type names the scope, not the trait.
        let impl_line = lines.iter().find(|l| l.ends_with("\tc")).unwrap();
        assert!(impl_line.starts_with("Badge\t"));
    }
}
