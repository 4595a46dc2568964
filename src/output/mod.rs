//! The tag-emission engine.
//!
//! [`TagFile`] owns everything on the output side: the destination handle,
//! the field registry, the cork queue, the single-slot pattern cache and
//! the record counters. Parsers construct [`TagEntry`](crate::entry::TagEntry)
//! values and hand them to [`TagFile::make_tag`]; the active writer formats
//! them, or the cork queue buffers them so a parser can reference a scope
//! it has not finished walking.
//!
//! Lifecycle: [`TagFile::open`] selects and validates the destination
//! (refusing to clobber files that do not look like tag files), writes the
//! pseudo-tag header or merges it in append mode, and [`TagFile::close`]
//! flushes, optionally truncates, runs the sort stage and - for a stdout
//! destination - copies the temp file out and removes it.
//!
//! Everything here is single-threaded; one `TagFile` serves one run.

mod cork;
mod ctags;
mod etags;
mod json;
pub mod pattern;
mod sort;
mod xref;

pub use cork::CorkQueue;
pub use pattern::PatternCache;

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;

use crate::diag;
use crate::entry::{TagEntry, SCOPE_NONE};
use crate::fields::FieldRegistry;
use crate::input::InputSource;
use crate::options::{Options, OutputMode, TagFormat};
use etags::EtagsSection;

const PSEUDO_TAG_PREFIX: &str = "!_";
const PSEUDO_TAG_SEPARATOR: &str = "!";

pub const PROGRAM_NAME: &str = "riptags";
pub const PROGRAM_URL: &str = "https://github.com/holo-q/riptags";
pub const PROGRAM_AUTHOR: &str = "riptags contributors";
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where records go: a named file, or a removable temp file that is copied
/// to stdout at close.
#[derive(Debug)]
enum Destination {
    File(File),
    Stdout(NamedTempFile),
}

impl Destination {
    fn file_mut(&mut self) -> &mut File {
        match self {
            Destination::File(f) => f,
            Destination::Stdout(t) => t.as_file_mut(),
        }
    }
}

/// The tag file and the emission state attached to it.
#[derive(Debug)]
pub struct TagFile {
    opts: Options,
    registry: FieldRegistry,
    /// Path actually being written (the temp path for stdout).
    path: PathBuf,
    /// Absolute directory containing the tag file.
    directory: PathBuf,
    dest: Destination,
    num_added: u64,
    num_prev: u64,
    max_tag_width: usize,
    max_line_width: usize,
    line_buf: String,
    cork_depth: usize,
    cork_queue: Option<CorkQueue>,
    pattern_cache: PatternCache,
    etags_section: Option<EtagsSection>,
}

impl TagFile {
    /// Open the destination named by the options and write or merge the
    /// pseudo-tag header.
    ///
    /// Overwriting is refused unless the existing file looks like a tag
    /// file (its first line parses as a ctags record or starts with the
    /// etags form feed). Append mode instead walks the existing header and
    /// updates the `TAG_FILE_SORTED` flag in place.
    pub fn open(opts: Options, registry: FieldRegistry) -> Result<Self> {
        // An append-mode merge keeps the existing header; every other
        // destination gets a fresh one.
        let mut merged = false;
        let mut tag_file = if opts.to_stdout() {
            let temp = NamedTempFile::new().context("cannot create temporary tag file")?;
            let path = temp.path().to_path_buf();
            let directory = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            Self::assemble(opts, registry, path, directory, Destination::Stdout(temp))
        } else {
            let path = opts.tag_file_name.clone();
            let exists = path.exists();
            if exists && !is_tag_file(&path)? {
                bail!(
                    "\"{}\" doesn't look like a tag file; I refuse to overwrite it.",
                    path.display()
                );
            }
            let directory = absolute_directory(&path);

            merged = opts.append && exists;
            let mut num_prev = 0;
            let dest = if opts.mode == OutputMode::Etags {
                let file = if opts.append && exists {
                    OpenOptions::new().append(true).open(&path)
                } else {
                    OpenOptions::new().write(true).create(true).truncate(true).open(&path)
                }
                .with_context(|| format!("cannot open tag file: {}", path.display()))?;
                Destination::File(file)
            } else if opts.append && exists {
                let mut file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(&path)
                    .with_context(|| format!("cannot open tag file: {}", path.display()))?;
                num_prev = update_pseudo_tags(&mut file, &opts);
                drop(file);
                let file = OpenOptions::new()
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("cannot open tag file: {}", path.display()))?;
                Destination::File(file)
            } else {
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&path)
                    .with_context(|| format!("cannot open tag file: {}", path.display()))?;
                Destination::File(file)
            };

            let mut tf = Self::assemble(opts, registry, path, directory, dest);
            tf.num_prev = num_prev;
            tf
        };

        // Fresh destinations get the metadata header; merged ones had it
        // rewritten above.
        if tag_file.opts.pseudo_tags && !merged {
            tag_file.add_pseudo_tags()?;
        }
        Ok(tag_file)
    }

    fn assemble(
        opts: Options,
        registry: FieldRegistry,
        path: PathBuf,
        directory: PathBuf,
        dest: Destination,
    ) -> Self {
        Self {
            opts,
            registry,
            path,
            directory,
            dest,
            num_added: 0,
            num_prev: 0,
            max_tag_width: 0,
            max_line_width: 0,
            line_buf: String::new(),
            cork_depth: 0,
            cork_queue: None,
            pattern_cache: PatternCache::new(),
            etags_section: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FieldRegistry {
        &mut self.registry
    }

    /// Records written so far, pseudo-tags included.
    pub fn tag_count(&self) -> u64 {
        self.num_added
    }

    /// Lines found in the destination before an append-mode merge.
    pub fn previous_line_count(&self) -> u64 {
        self.num_prev
    }

    /// Longest tag name and longest record seen, for layout consumers.
    pub fn max_widths(&self) -> (usize, usize) {
        (self.max_tag_width, self.max_line_width)
    }

    /// Drop the cached pattern. Call whenever the input file changes.
    pub fn invalidate_pattern_cache(&mut self) {
        self.pattern_cache.invalidate();
    }

    fn remember_max_lengths(&mut self, name_len: usize, line_len: usize) {
        self.max_tag_width = self.max_tag_width.max(name_len);
        self.max_line_width = self.max_line_width.max(line_len);
    }

    // ---- pseudo tags -----------------------------------------------------

    /// Write one `!_` metadata line: `!_<name>\t<value>\t/<comment>/`, or
    /// the language-suffixed variant for parser-scoped pseudo-tags. In
    /// JSON mode the same data goes out as a `ptag` object.
    pub fn write_pseudo_tag(
        &mut self,
        name: &str,
        value: &str,
        comment: &str,
        language: Option<&str>,
    ) -> Result<()> {
        let line = if self.opts.mode == OutputMode::Json {
            let full_name = match language {
                Some(l) => format!("{name}{PSEUDO_TAG_SEPARATOR}{l}"),
                None => name.to_string(),
            };
            format!(
                "{}\n",
                serde_json::json!({
                    "_type": "ptag",
                    "name": full_name,
                    "path": value,
                    "pattern": comment,
                })
            )
        } else {
            match language {
                Some(l) => format!(
                    "{PSEUDO_TAG_PREFIX}{name}{PSEUDO_TAG_SEPARATOR}{l}\t{value}\t{comment}\n"
                ),
                None => format!("{PSEUDO_TAG_PREFIX}{name}\t{value}\t/{comment}/\n"),
            }
        };
        self.dest
            .file_mut()
            .write_all(line.as_bytes())
            .context("cannot write tag file")?;
        self.num_added += 1;
        self.remember_max_lengths(name.len(), line.len());
        Ok(())
    }

    /// The standard metadata header. Xref and etags output carry no
    /// pseudo-tags.
    fn add_pseudo_tags(&mut self) -> Result<()> {
        if matches!(self.opts.mode, OutputMode::Xref | OutputMode::Etags) {
            return Ok(());
        }
        let format_comment = match self.opts.format {
            TagFormat::Original => "original ctags format",
            TagFormat::Extended => {
                "extended format; --format=1 will not append ;\" to lines"
            }
        };
        let format = self.opts.format.as_number().to_string();
        let sorted = self.opts.sorted.flag_char().to_string();
        let encoding = self.opts.output_encoding.clone();

        self.write_pseudo_tag("TAG_FILE_FORMAT", &format, format_comment, None)?;
        self.write_pseudo_tag(
            "TAG_FILE_SORTED",
            &sorted,
            "0=unsorted, 1=sorted, 2=foldcase",
            None,
        )?;
        self.write_pseudo_tag("TAG_PROGRAM_AUTHOR", PROGRAM_AUTHOR, "", None)?;
        self.write_pseudo_tag("TAG_PROGRAM_NAME", PROGRAM_NAME, "", None)?;
        self.write_pseudo_tag("TAG_PROGRAM_URL", PROGRAM_URL, "official site", None)?;
        self.write_pseudo_tag("TAG_PROGRAM_VERSION", PROGRAM_VERSION, "", None)?;
        if let Some(encoding) = encoding {
            self.write_pseudo_tag("TAG_FILE_ENCODING", &encoding, "", None)?;
        }
        Ok(())
    }

    // ---- tag emission ----------------------------------------------------

    /// Submit one tag record.
    ///
    /// Outside a cork session the record is formatted and written
    /// immediately and 0 is returned. Inside one, an owned copy joins the
    /// queue and its index comes back for use as a later tag's
    /// `scope_index`.
    ///
    /// Empty names are skipped (with a warning when the input language
    /// forbids them) unless the entry is a placeholder.
    pub fn make_tag(&mut self, tag: &TagEntry, source: &dyn InputSource) -> Result<usize> {
        debug_assert!(
            tag.role_index == crate::kinds::ROLE_DEFINITION
                || tag.kind.role(tag.role_index).is_some()
        );

        if tag.name.is_empty() && !tag.placeholder {
            if !source.allows_null_tags() {
                diag::warning(format_args!(
                    "ignoring null tag in {} (line: {})",
                    source.file_name(),
                    tag.line_number
                ));
            }
            return Ok(SCOPE_NONE);
        }

        if self.cork_depth > 0 {
            return self.queue_tag(tag, source);
        }
        self.write_tag(tag, source, None)?;
        Ok(SCOPE_NONE)
    }

    /// Copy a tag into the cork queue, building its pattern now so the
    /// queued record owns everything it needs at flush time.
    fn queue_tag(&mut self, tag: &TagEntry, source: &dyn InputSource) -> Result<usize> {
        let mut owned = tag.clone();
        if owned.pattern.is_none()
            && !self.opts.address_by_line(owned.line_number_entry)
            && !owned.placeholder
        {
            let pattern = self
                .pattern_cache
                .pattern_for(&owned, &self.opts, source)
                .with_context(|| format!("bad tag in {}", source.file_name()))?;
            owned.pattern = Some(pattern.into());
        }
        let queue = self.cork_queue.get_or_insert_with(CorkQueue::new);
        Ok(queue.push(owned))
    }

    /// Format and write one record with the active writer.
    fn write_tag(
        &mut self,
        tag: &TagEntry,
        source: &dyn InputSource,
        cork: Option<&CorkQueue>,
    ) -> Result<()> {
        if tag.placeholder {
            return Ok(());
        }

        let Self {
            opts,
            registry,
            line_buf,
            pattern_cache,
            dest,
            etags_section,
            ..
        } = self;
        line_buf.clear();

        let written = match opts.mode {
            OutputMode::Etags => {
                let section = etags_section.get_or_insert_with(EtagsSection::new);
                section.write_entry(tag, source)
            }
            OutputMode::Xref => {
                xref::write_entry(line_buf, tag, opts, registry, source)?;
                dest.file_mut()
                    .write_all(line_buf.as_bytes())
                    .context("cannot write tag file")?;
                line_buf.len()
            }
            OutputMode::Json => {
                json::write_entry(line_buf, tag, opts, registry, pattern_cache, source, cork)?;
                dest.file_mut()
                    .write_all(line_buf.as_bytes())
                    .context("cannot write tag file")?;
                line_buf.len()
            }
            OutputMode::Tags => {
                ctags::write_entry(line_buf, tag, opts, registry, pattern_cache, source, cork)?;
                dest.file_mut()
                    .write_all(line_buf.as_bytes())
                    .context("cannot write tag file")?;
                line_buf.len()
            }
        };

        self.num_added += 1;
        self.remember_max_lengths(tag.name.len(), written);
        Ok(())
    }

    // ---- cork ------------------------------------------------------------

    /// Start (or nest) a cork session. Records are buffered until the
    /// matching outermost [`Self::uncork`].
    pub fn cork(&mut self) {
        self.cork_depth += 1;
        if self.cork_depth == 1 {
            self.cork_queue = Some(CorkQueue::new());
        }
    }

    /// Leave a cork session. Only the outermost uncork flushes: queued
    /// records are written in insertion order and the queue is discarded,
    /// invalidating its indices.
    pub fn uncork(&mut self, source: &dyn InputSource) -> Result<()> {
        debug_assert!(self.cork_depth > 0);
        self.cork_depth = self.cork_depth.saturating_sub(1);
        if self.cork_depth > 0 {
            return Ok(());
        }
        let queue = self.cork_queue.take().unwrap_or_default();
        for entry in queue.iter() {
            self.write_tag(entry, source, Some(&queue))?;
        }
        Ok(())
    }

    pub fn corked(&self) -> bool {
        self.cork_depth > 0
    }

    /// Borrow a queued entry by its cork index. Valid only within the
    /// current cork session.
    pub fn cork_entry(&self, index: usize) -> Option<&TagEntry> {
        self.cork_queue.as_ref()?.get(index)
    }

    /// Occupied cork indices, sentinel included; 0 outside a session.
    pub fn cork_count(&self) -> usize {
        self.cork_queue.as_ref().map_or(0, CorkQueue::len)
    }

    // ---- etags sections --------------------------------------------------

    /// Start the per-file etags sidecar.
    pub fn begin_etags_section(&mut self) {
        self.etags_section = Some(EtagsSection::new());
    }

    /// Finalize the per-file sidecar: write the section header and the
    /// buffered records to the main output.
    pub fn end_etags_section(&mut self, file: &str) -> Result<()> {
        let section = self.etags_section.take().unwrap_or_default();
        let header = etags::section_header(file, section.byte_count());
        let dest = self.dest.file_mut();
        dest.write_all(header.as_bytes())
            .and_then(|_| dest.write_all(section.contents().as_bytes()))
            .context("cannot write tag file")
    }

    // ---- shutdown --------------------------------------------------------

    /// Flush, optionally truncate to the written length, sort, and - for a
    /// stdout destination - copy the temp file out and remove it.
    pub fn close(mut self, resize: bool) -> Result<()> {
        if self.opts.mode == OutputMode::Etags {
            for include in self.opts.etags_include.clone() {
                let line = etags::include_line(&include);
                self.dest
                    .file_mut()
                    .write_all(line.as_bytes())
                    .context("cannot write tag file")?;
            }
        }

        let file = self.dest.file_mut();
        file.flush().context("cannot write tag file")?;
        let written = file.stream_position().context("cannot write tag file")?;
        let size = file.seek(SeekFrom::End(0)).context("cannot write tag file")?;

        match self.dest {
            Destination::File(file) => {
                drop(file);
                if resize && self.num_added > 0 && written < size {
                    diag::verbose(format_args!(
                        "shrinking {} from {size} to {written} bytes",
                        self.path.display()
                    ));
                    truncate_file(&self.path, written)?;
                }
                if self.num_added > 0 && self.opts.sorted != crate::options::SortKind::Unsorted {
                    diag::verbose("sorting tag file");
                    run_sort(&self.opts, &self.path)?;
                }
            }
            Destination::Stdout(temp) => {
                if self.num_added > 0 {
                    if self.opts.sorted != crate::options::SortKind::Unsorted {
                        diag::verbose("sorting tag file");
                        run_sort(&self.opts, &self.path)?;
                    }
                    let mut reader = File::open(&self.path)
                        .with_context(|| format!("cannot reopen {}", self.path.display()))?;
                    let stdout = std::io::stdout();
                    let mut out = stdout.lock();
                    std::io::copy(&mut reader, &mut out).context("cannot write to stdout")?;
                }
                temp.close().context("cannot remove temporary tag file")?;
            }
        }
        Ok(())
    }
}

fn run_sort(opts: &Options, path: &Path) -> Result<()> {
    match &opts.sort_program {
        Some(program) => sort::external_sort(program, path, opts.sorted),
        None => sort::internal_sort(path, opts.sorted),
    }
}

/// Shorten a file to `len` bytes with the platform truncation primitive.
fn truncate_file(path: &Path, len: u64) -> Result<()> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|f| f.set_len(len))
        .with_context(|| format!("cannot shorten tag file: {}", path.display()))
}

fn absolute_directory(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    parent
        .canonicalize()
        .unwrap_or(parent)
}

// ---- destination validation ---------------------------------------------

/// Does an ex address column look plausible: a search command or a line
/// number (possibly followed by `;`-separated extras)?
fn is_valid_tag_address(excmd: &str) -> bool {
    if excmd.starts_with('/') || excmd.starts_with('?') {
        return true;
    }
    let address = excmd.split(';').next().unwrap_or("");
    !address.is_empty() && address.bytes().all(|b| b.is_ascii_digit())
}

/// First-line grammar check for a ctags file: exactly single tabs between
/// three non-empty columns, a tag that is not a comment, a file name not
/// ending in `;`, and a plausible address.
fn is_ctags_line(line: &str) -> bool {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut parts = line.splitn(3, '\t');
    let (Some(tag), Some(file), Some(excmd)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !tag.is_empty()
        && !tag.starts_with('#')
        && !file.is_empty()
        && !file.ends_with(';')
        && !excmd.is_empty()
        && is_valid_tag_address(excmd)
}

/// Etags files open with a form feed line.
fn is_etags_line(line: &str) -> bool {
    let mut bytes = line.bytes();
    bytes.next() == Some(0x0c) && matches!(bytes.next(), Some(b'\n') | Some(b'\r'))
}

/// Whether an existing destination may be overwritten: missing and empty
/// files are fine, otherwise the first line must look like a tag file.
fn is_tag_file(path: &Path) -> Result<bool> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("cannot open tag file: {}", path.display()))
        }
    };
    let mut line = String::new();
    let mut reader = BufReader::new(file);
    let read = reader.read_line(&mut line);
    match read {
        Ok(0) => Ok(true),
        Ok(_) => Ok(is_ctags_line(&line) || is_etags_line(&line)),
        // Binary content that is not UTF-8 certainly is not a tag file.
        Err(_) => Ok(false),
    }
}

// ---- append-mode header merge --------------------------------------------

/// Walk the leading `!_TAG_FILE*` lines of an existing file and rewrite
/// the one-character `TAG_FILE_SORTED` flag in place when it disagrees
/// with the current options. Returns the total number of lines in the
/// file. Failure to rewrite is a warning, never fatal.
fn update_pseudo_tags(file: &mut File, opts: &Options) -> u64 {
    let mut lines_read = 0u64;
    let mut offset = 0u64;
    let mut reader = BufReader::new(&mut *file);
    let mut in_header = true;
    let mut sorted_fix: Option<u64> = None;

    let mut line = String::new();
    loop {
        line.clear();
        let n = match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        lines_read += 1;
        if in_header && line.starts_with(PSEUDO_TAG_PREFIX) {
            if let Some(rest) = line.strip_prefix("!_TAG_FILE_SORTED") {
                if let Some(tab_idx) = rest.find('\t') {
                    let flag_offset = offset + "!_TAG_FILE_SORTED".len() as u64 + tab_idx as u64 + 1;
                    let flag = rest.as_bytes().get(tab_idx + 1).copied();
                    if matches!(flag, Some(b'0'..=b'2'))
                        && flag != Some(opts.sorted.flag_char() as u8)
                    {
                        sorted_fix = Some(flag_offset);
                    }
                }
            }
        } else {
            in_header = false;
        }
        offset += n as u64;
    }
    drop(reader);

    if let Some(flag_offset) = sorted_fix {
        let result = file
            .seek(SeekFrom::Start(flag_offset))
            .and_then(|_| file.write_all(&[opts.sorted.flag_char() as u8]));
        if result.is_err() {
            diag::warning("failed to update 'sorted' pseudo-tag");
        }
    }
    lines_read
}
