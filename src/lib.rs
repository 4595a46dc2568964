//! riptags - fast ctags-family tag generation
//!
//! riptags scans source files and emits an index of identifiers that
//! editors and code-navigation tools consume, in one of four flavors:
//! traditional ctags, extended ctags, Emacs etags, or JSON - plus a
//! human-readable cross-reference dump.
//!
//! # Architecture
//!
//! ```text
//! File Discovery → Regex Parsing → Tag Entries → Emission Engine → Tag File
//!       ↓               ↓              ↓              ↓                ↓
//!    ignore          regex +       TagEntry      field registry    pseudo-tags
//!    crate         once_cell       records       cork queue        sort stage
//!                                                writers           append merge
//! ```
//!
//! The emission engine is the heart of the crate: a field registry of
//! letter-keyed tag attributes with per-writer renderers, a deferred
//! emission queue ("cork") that gives parsers stable indices for
//! not-yet-finished scopes, pattern construction with a position-keyed
//! cache, and a tag-file lifecycle manager that validates, merges,
//! truncates and sorts the destination.
//!
//! Emission is strictly single-threaded: one [`output::TagFile`] serves
//! one run, and everything it owns is mutated from the thread driving the
//! parsers.

pub mod config;
pub mod diag;
pub mod entry;
pub mod fields;
pub mod input;
pub mod kinds;
pub mod options;
pub mod output;
pub mod scan;

// Re-export core types
pub use config::Config;
pub use entry::{ExtensionFields, Extras, TagEntry, SCOPE_NONE};
pub use fields::{FieldDefinition, FieldId, FieldRegistry, FieldValue, Renderer, WriterFlavor};
pub use input::{InputSource, SourceFile};
pub use kinds::{Kind, Role, ROLE_DEFINITION};
pub use options::{ExCmd, Options, OutputMode, SortKind, TagFormat};
pub use output::{CorkQueue, PatternCache, TagFile};
