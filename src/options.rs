//! Engine-facing option storage.
//!
//! [`Options`] is the plain-data value every stage of the emission engine
//! reads. The CLI and the config file both funnel into it; the engine never
//! touches clap or toml itself, which keeps tests free to construct options
//! directly.

use std::path::PathBuf;

/// Tag file format: traditional (no extension fields) or extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    /// `--format=1`: `NAME\tFILE\tEXCMD` and nothing else.
    Original,
    /// `--format=2`: extension fields after a `;"` separator.
    Extended,
}

impl TagFormat {
    pub fn as_number(self) -> u32 {
        match self {
            TagFormat::Original => 1,
            TagFormat::Extended => 2,
        }
    }

    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(TagFormat::Original),
            2 => Some(TagFormat::Extended),
            _ => None,
        }
    }
}

/// Sort policy for the finished tag file, also recorded in the
/// `!_TAG_FILE_SORTED` pseudo-tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Unsorted,
    Sorted,
    FoldSorted,
}

impl SortKind {
    /// The one-character flag stored in `!_TAG_FILE_SORTED`.
    pub fn flag_char(self) -> char {
        match self {
            SortKind::Unsorted => '0',
            SortKind::Sorted => '1',
            SortKind::FoldSorted => '2',
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no" | "unsorted" | "0" => Some(SortKind::Unsorted),
            "yes" | "sorted" | "1" => Some(SortKind::Sorted),
            "foldcase" | "foldsorted" | "2" => Some(SortKind::FoldSorted),
            _ => None,
        }
    }
}

/// Which writer formats tag records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// ctags format, traditional or extended per [`TagFormat`].
    Tags,
    /// Emacs etags format with per-file sections.
    Etags,
    /// Human-readable columnar cross-reference dump.
    Xref,
    /// One JSON object per record.
    Json,
}

/// How the ex command column locates a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExCmd {
    /// `/^pattern$/` search command.
    Pattern,
    /// Decimal line number.
    Number,
}

/// Everything the emission engine reads. Constructed by the CLI layer or
/// directly by tests.
#[derive(Debug, Clone)]
pub struct Options {
    /// Destination tag file; "-" means stdout via a temp file.
    pub tag_file_name: PathBuf,
    pub format: TagFormat,
    pub sorted: SortKind,
    pub mode: OutputMode,
    /// Merge into an existing tag file instead of overwriting it.
    pub append: bool,
    /// Use `?...?` backward search commands instead of `/.../`.
    pub backward: bool,
    /// Locate tags by pattern or by line number.
    pub excmd: ExCmd,
    /// Upper bound on emitted pattern bytes; hitting it drops the `$` anchor.
    pub pattern_length_limit: usize,
    /// Honor `#line`-directive source overrides carried by tag entries.
    pub line_directives: bool,
    /// Emit registry field names with the ecosystem prefix.
    pub put_field_prefix: bool,
    /// Recorded in the `!_TAG_FILE_ENCODING` pseudo-tag; no conversion is
    /// performed.
    pub output_encoding: Option<String>,
    /// printf-style override for the xref column layout.
    pub custom_xfmt: Option<String>,
    /// Write the `!_` metadata header lines.
    pub pseudo_tags: bool,
    /// Extra `\f\n<path>,include\n` directives for the etags output.
    pub etags_include: Vec<String>,
    /// External sort program; `None` selects the internal sorter.
    pub sort_program: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tag_file_name: PathBuf::from("tags"),
            format: TagFormat::Extended,
            sorted: SortKind::Sorted,
            mode: OutputMode::Tags,
            append: false,
            backward: false,
            excmd: ExCmd::Pattern,
            pattern_length_limit: 96,
            line_directives: false,
            put_field_prefix: false,
            output_encoding: None,
            custom_xfmt: None,
            pseudo_tags: true,
            etags_include: Vec::new(),
            sort_program: None,
        }
    }
}

impl Options {
    pub fn to_stdout(&self) -> bool {
        self.tag_file_name.as_os_str() == "-"
    }

    /// Extension fields only exist in the extended tags format.
    pub fn include_extension_fields(&self) -> bool {
        self.mode == OutputMode::Tags && self.format == TagFormat::Extended
    }

    /// Whether a tag's address column is a line number: either the entry
    /// asked for one or `--excmd=number` forces it globally.
    pub fn address_by_line(&self, entry_flag: bool) -> bool {
        entry_flag || self.excmd == ExCmd::Number
    }
}
