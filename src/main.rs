//! riptags CLI - fast ctags-family tag generation
//!
//! Command-line entry point. The pipeline:
//!
//! 1. Load riptags.toml defaults and merge the command line over them
//! 2. Seed the field registry and apply field specs
//! 3. Open the tag file (validate, merge or truncate the destination)
//! 4. Discover source files respecting .gitignore and config globs
//! 5. Tag each file inside its own cork session
//! 6. Close: truncate if shorter, sort, copy to stdout if requested
//!
//! Design philosophy:
//! - The engine never sees clap or toml; everything funnels into Options
//! - Fail fast on destination problems, keep going on per-file ones
//! - Defaults match what editors expect (extended format, sorted output)

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use riptags::config::Config;
use riptags::diag;
use riptags::fields::FieldRegistry;
use riptags::options::{ExCmd, Options, OutputMode, SortKind, TagFormat};
use riptags::output::TagFile;
use riptags::scan;

/// Fast ctags-family tag generator
///
/// riptags indexes the identifiers of a codebase - functions, types,
/// variables and friends - and writes them as a tag file for editors and
/// code-navigation tools.
///
/// Examples:
///   riptags .                          # Tag the whole project into ./tags
///   riptags -f - src/main.c            # Extended ctags lines on stdout
///   riptags --etags -f TAGS src/       # Emacs TAGS file
///   riptags -x src/lib.rs              # Human-readable cross-reference
#[derive(Parser, Debug)]
#[command(name = "riptags")]
#[command(version)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Files or directories to tag
    ///
    /// Directories are walked recursively, respecting .gitignore and the
    /// include/exclude globs from riptags.toml. Defaults to the current
    /// directory.
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Output tag file ("-" writes to stdout)
    ///
    /// Defaults to "tags", or "TAGS" in etags mode. Stdout output goes
    /// through a temporary file so it can still be sorted.
    #[arg(short = 'f', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Tag file format
    ///
    /// 1 = traditional (no extension fields), 2 = extended (extension
    /// fields after a ;" separator).
    #[arg(long, value_name = "LEVEL", value_parser = ["1", "2"])]
    pub format: Option<String>,

    /// Sort the tag file: no, yes, or foldcase
    ///
    /// Sorted output allows binary search in editors. foldcase sorts
    /// case-insensitively; the choice is recorded in the
    /// !_TAG_FILE_SORTED pseudo-tag.
    #[arg(long, value_name = "KIND", value_parser = ["no", "yes", "foldcase"])]
    pub sort: Option<String>,

    /// Write Emacs etags format
    #[arg(short = 'e', long)]
    pub etags: bool,

    /// Print a human-readable cross-reference instead of a tag file
    #[arg(short = 'x', long)]
    pub xref: bool,

    /// Write one JSON object per tag
    #[arg(long)]
    pub json: bool,

    /// Append to an existing tag file instead of overwriting
    ///
    /// The existing pseudo-tag header is kept; only the sortedness flag
    /// is rewritten in place when it disagrees with --sort.
    #[arg(short = 'a', long)]
    pub append: bool,

    /// Use backward search patterns (?...?)
    #[arg(short = 'B', long)]
    pub backward: bool,

    /// Locate tags by search pattern or by line number
    #[arg(long, value_name = "TYPE", value_parser = ["pattern", "number"])]
    pub excmd: Option<String>,

    /// Maximum pattern length in bytes
    ///
    /// A pattern that hits the bound is cut short and loses its trailing
    /// `$` anchor.
    #[arg(long, value_name = "N", default_value_t = 96)]
    pub pattern_length_limit: usize,

    /// Honor #line directives when emitting locations
    #[arg(long)]
    pub line_directives: bool,

    /// Prefix extension field names with the riptags namespace
    #[arg(long)]
    pub put_field_prefix: bool,

    /// Record an encoding name in the !_TAG_FILE_ENCODING pseudo-tag
    #[arg(long, value_name = "ENCODING")]
    pub output_encoding: Option<String>,

    /// Enable or disable extension fields, e.g. "+n-k"
    ///
    /// Letters name fields (see --list-fields); a leading + enables and
    /// - disables everything that follows it. Unknown letters are
    /// ignored.
    #[arg(long, value_name = "SPEC")]
    pub fields: Option<String>,

    /// Custom xref column layout, e.g. "%-16N %4n %-16F %C"
    ///
    /// printf-style specs %[-][width]<letter> select registry fields by
    /// their option letter.
    #[arg(long, value_name = "FMT")]
    pub xformat: Option<String>,

    /// Add an etags include directive for another tag table
    #[arg(long, value_name = "FILE")]
    pub etags_include: Vec<String>,

    /// External sort program (defaults to the internal sorter)
    #[arg(long, value_name = "PATH")]
    pub sort_program: Option<PathBuf>,

    /// Skip the !_ pseudo-tag header
    #[arg(long)]
    pub no_pseudo_tags: bool,

    /// List the field registry and exit
    #[arg(long)]
    pub list_fields: bool,

    /// Show progress messages on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Merge config-file defaults and command-line flags into the engine
    /// options. The command line wins wherever both speak.
    fn to_options(&self, config: &Config) -> Options {
        let mode = if self.etags {
            OutputMode::Etags
        } else if self.xref {
            OutputMode::Xref
        } else if self.json {
            OutputMode::Json
        } else {
            OutputMode::Tags
        };

        let format = self
            .format
            .as_deref()
            .and_then(|s| s.parse().ok())
            .or(config.format)
            .and_then(TagFormat::from_number)
            .unwrap_or(TagFormat::Extended);

        let sorted = self
            .sort
            .as_deref()
            .or(config.sort.as_deref())
            .and_then(SortKind::parse)
            .unwrap_or(SortKind::Sorted);

        let tag_file_name = match &self.output {
            Some(path) => path.clone(),
            None if mode == OutputMode::Etags => PathBuf::from("TAGS"),
            None => PathBuf::from("tags"),
        };

        Options {
            tag_file_name,
            format,
            sorted,
            mode,
            append: self.append,
            backward: self.backward,
            excmd: match self.excmd.as_deref() {
                Some("number") => ExCmd::Number,
                _ => ExCmd::Pattern,
            },
            pattern_length_limit: self.pattern_length_limit,
            line_directives: self.line_directives,
            put_field_prefix: self.put_field_prefix,
            output_encoding: self.output_encoding.clone(),
            custom_xfmt: self.xformat.clone(),
            pseudo_tags: !self.no_pseudo_tags,
            etags_include: self.etags_include.clone(),
            sort_program: self.sort_program.clone(),
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    diag::set_verbose(cli.verbose);

    let cwd = std::env::current_dir()?;
    let config = Config::load(&cwd);
    if cli.verbose {
        eprintln!("{}", config.display_summary());
    }

    let mut registry = FieldRegistry::new();
    if let Some(spec) = &config.fields {
        registry.apply_spec(spec);
    }
    if let Some(spec) = &cli.fields {
        registry.apply_spec(spec);
    }

    if cli.list_fields {
        print!("{}", registry.list(cli.put_field_prefix));
        return Ok(());
    }

    let opts = cli.to_options(&config);
    let mut tag_file = TagFile::open(opts, registry)?;

    let roots: Vec<PathBuf> = if cli.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        cli.paths.clone()
    };

    let mut scanned = 0usize;
    let mut submitted = 0usize;
    for root in &roots {
        let files = scan::find_source_files(root, &config)?;
        diag::verbose(format_args!(
            "scanning {} ({} files)",
            root.display(),
            files.len()
        ));
        for file in files {
            let rel = file
                .strip_prefix(&cwd)
                .unwrap_or(&file)
                .to_string_lossy()
                .into_owned();
            let rel = rel.strip_prefix("./").unwrap_or(&rel).to_string();
            match scan::tag_file(&mut tag_file, &file, &rel) {
                Ok(n) => {
                    scanned += 1;
                    submitted += n;
                }
                Err(err) => diag::warning(format_args!("{}: {err}", file.display())),
            }
        }
    }

    diag::verbose(format_args!(
        "{submitted} tags from {scanned} files"
    ));
    tag_file.close(true)?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("riptags: {err:#}");
            ExitCode::FAILURE
        }
    }
}
