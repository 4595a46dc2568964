//! The scan front end: find source files and run them through the engine.
//!
//! Discovery walks the project with the `ignore` crate, so .gitignore and
//! friends are respected for free, then filters through the project
//! config's include/exclude globs and the scanner's known extensions.
//! Results are sorted for reproducible tag files.
//!
//! Each file is tagged inside its own cork session: scope references
//! resolve when the session flushes, and the pattern cache is invalidated
//! at the file boundary.

mod languages;

pub use languages::Language;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use ignore::WalkBuilder;

use crate::config::Config;
use crate::diag;
use crate::input::{InputSource, SourceFile};
use crate::options::OutputMode;
use crate::output::TagFile;

/// Find taggable source files under a root, respecting .gitignore and the
/// project config. A root that is itself a file is returned as-is.
pub fn find_source_files(root: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        bail!("path does not exist: {}", root.display());
    }

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                diag::verbose(format_args!("skipping unreadable entry: {err}"));
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if Language::for_path(path).is_none() {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if !config.should_include(relative) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    files.sort();
    Ok(files)
}

/// Tag one file. Returns the number of records submitted, which is 0 for
/// files in no supported language.
pub fn tag_file(tag_file: &mut TagFile, path: &Path, tag_path: &str) -> Result<usize> {
    let Some(language) = Language::for_path(path) else {
        return Ok(0);
    };
    let source = SourceFile::open(path, tag_path, Some(language.name()))?;
    tag_one_source(tag_file, language, &source)
}

/// Tag an already-loaded source: one cork session, one etags section.
pub fn tag_one_source(
    tag_file: &mut TagFile,
    language: Language,
    source: &SourceFile,
) -> Result<usize> {
    tag_file.invalidate_pattern_cache();
    let etags = tag_file.options().mode == OutputMode::Etags;
    if etags {
        tag_file.begin_etags_section();
    }

    tag_file.cork();
    language.parse(tag_file, source)?;
    let submitted = tag_file.cork_count().saturating_sub(1);
    tag_file.uncork(source)?;

    if etags {
        tag_file.end_etags_section(source.file_name())?;
    }
    Ok(submitted)
}
