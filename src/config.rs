//! Configuration loading from riptags.toml.
//!
//! Command-line flags always win; the config file supplies project-level
//! defaults so a repository can pin its tagging conventions:
//!
//! ```toml
//! include = ["src/**", "lib/**"]
//! exclude = ["**/generated/**"]
//! extend-exclude = ["**/vendor/**"]
//! fields = "+n"
//! format = 2
//! sort = "yes"
//! ```
//!
//! `exclude` replaces the default exclude set; `extend-exclude` adds to it.

use std::path::Path;

use serde::Deserialize;

/// Default exclude patterns (common non-source directories).
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/target/**",
    "**/build/**",
    "**/dist/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "**/venv/**",
    "**/.mypy_cache/**",
    "**/.pytest_cache/**",
    "**/vendor/**",
    "**/third_party/**",
];

/// Project configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Source file for this config (for display).
    pub source: Option<String>,

    /// Glob patterns for files to include. If empty, include all source files.
    pub include: Vec<String>,

    /// Glob patterns for files to exclude. Replaces defaults if set.
    pub exclude: Vec<String>,

    /// Additional exclude patterns (extends defaults).
    pub extend_exclude: Vec<String>,

    /// Default field spec applied before any --fields flag.
    pub fields: Option<String>,

    /// Default tag file format (1 or 2).
    pub format: Option<u32>,

    /// Default sort policy ("no", "yes", "foldcase").
    pub sort: Option<String>,
}

/// Raw config as deserialized from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    extend_exclude: Option<Vec<String>>,
    fields: Option<String>,
    format: Option<u32>,
    sort: Option<String>,
}

impl Config {
    /// Load configuration from the given directory, walking up to the
    /// nearest riptags.toml. Returns defaults when nothing is found or the
    /// file does not parse.
    pub fn load(directory: &Path) -> Self {
        let mut current = Some(directory.to_path_buf());
        while let Some(dir) = current {
            let candidate = dir.join("riptags.toml");
            if candidate.exists() {
                if let Some(config) = Self::load_file(&candidate) {
                    return config;
                }
            }
            current = dir.parent().map(Path::to_path_buf);
        }
        Self::default()
    }

    fn load_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let raw: RawConfig = toml::from_str(&content).ok()?;
        Some(Self {
            source: Some(path.display().to_string()),
            include: raw.include.unwrap_or_default(),
            exclude: raw.exclude.unwrap_or_default(),
            extend_exclude: raw.extend_exclude.unwrap_or_default(),
            fields: raw.fields,
            format: raw.format,
            sort: raw.sort,
        })
    }

    /// Get effective exclude patterns (defaults + extend-exclude, or custom exclude).
    pub fn effective_excludes(&self) -> Vec<String> {
        if !self.exclude.is_empty() {
            self.exclude.clone()
        } else {
            let mut patterns: Vec<String> =
                DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
            patterns.extend(self.extend_exclude.clone());
            patterns
        }
    }

    /// Check if a path matches any include pattern.
    /// Returns true if no include patterns (include all), or if path matches any pattern.
    pub fn matches_include(&self, path: &Path) -> bool {
        if self.include.is_empty() {
            return true;
        }
        let path_str = path.to_string_lossy();
        self.include
            .iter()
            .any(|pattern| Self::matches_pattern(pattern, &path_str))
    }

    /// Check if a path matches any exclude pattern.
    pub fn matches_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.effective_excludes()
            .iter()
            .any(|pattern| Self::matches_pattern(pattern, &path_str))
    }

    /// Match a pattern against a path, handling both globs and directory
    /// prefixes ("src" matches "src/foo.c").
    fn matches_pattern(pattern: &str, path: &str) -> bool {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            glob_match::glob_match(pattern, path)
        } else {
            let prefix = pattern.trim_end_matches('/');
            path == prefix || path.starts_with(&format!("{}/", prefix))
        }
    }

    /// Check if a path should be scanned (matches include AND not exclude).
    pub fn should_include(&self, path: &Path) -> bool {
        self.matches_include(path) && !self.matches_exclude(path)
    }

    /// Format config for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        match &self.source {
            Some(source) => lines.push(format!("   Config: {}", source)),
            None => lines.push("   Config: (defaults)".to_string()),
        }

        if !self.include.is_empty() {
            lines.push(format!("   Include: {}", self.include.join(", ")));
        }

        let excludes = self.effective_excludes();
        if !excludes.is_empty() {
            if excludes.len() <= 3 {
                lines.push(format!("   Exclude: {}", excludes.join(", ")));
            } else {
                lines.push(format!(
                    "   Exclude: {}, ... (+{} more)",
                    excludes[..2].join(", "),
                    excludes.len() - 2
                ));
            }
        }

        if let Some(fields) = &self.fields {
            lines.push(format!("   Fields: {}", fields));
        }

        lines.join("\n")
    }
}
