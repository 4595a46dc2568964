//! The sort stage: put the finished tag file in the order readers expect.
//!
//! Readers binary-search tag files, so the sort is plain byte order (or
//! ASCII case-folded order for `--sort=foldcase`). Pseudo-tag lines start
//! with `!_` and sort ahead of every identifier under byte order, keeping
//! the metadata header at the top without special-casing.
//!
//! The internal sorter reads the whole file; an external program can be
//! substituted for tag files too large to hold in memory.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::options::SortKind;

fn fold_key(line: &str) -> Vec<u8> {
    line.bytes().map(|b| b.to_ascii_lowercase()).collect()
}

/// Sort lines in place, byte order or case-folded.
pub(crate) fn sort_lines(lines: &mut [String], fold: bool) {
    if fold {
        lines.sort_by(|a, b| fold_key(a).cmp(&fold_key(b)));
    } else {
        lines.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
    }
}

/// Sort a written tag file in place with the internal sorter.
pub(crate) fn internal_sort(path: &Path, kind: SortKind) -> Result<()> {
    if kind == SortKind::Unsorted {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read tag file for sorting: {}", path.display()))?;
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    sort_lines(&mut lines, kind == SortKind::FoldSorted);

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    std::fs::write(path, out)
        .with_context(|| format!("cannot write sorted tag file: {}", path.display()))
}

/// Spawn an external sort program over the tag file. The program receives
/// `-o <file> <file>` plus `-f` for case folding, the calling convention
/// of POSIX sort(1).
pub(crate) fn external_sort(program: &Path, path: &Path, kind: SortKind) -> Result<()> {
    if kind == SortKind::Unsorted {
        return Ok(());
    }
    let mut cmd = Command::new(program);
    if kind == SortKind::FoldSorted {
        cmd.arg("-f");
    }
    // Byte order regardless of the user's locale.
    cmd.env("LC_COLLATE", "C");
    cmd.arg("-o").arg(path).arg(path);

    let status = cmd
        .status()
        .with_context(|| format!("cannot run sort program: {}", program.display()))?;
    if !status.success() {
        bail!("sort program failed: {} ({status})", program.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order() {
        let mut lines = vec![
            "zebra\tz.c\t1".to_string(),
            "Apple\ta.c\t1".to_string(),
            "apple\ta.c\t2".to_string(),
        ];
        sort_lines(&mut lines, false);
        // Uppercase sorts before lowercase under byte order.
        assert_eq!(lines[0], "Apple\ta.c\t1");
        assert_eq!(lines[1], "apple\ta.c\t2");
        assert_eq!(lines[2], "zebra\tz.c\t1");
    }

    #[test]
    fn test_fold_order() {
        let mut lines = vec!["b\t".to_string(), "A\t".to_string(), "a\t".to_string()];
        sort_lines(&mut lines, true);
        assert_eq!(lines[2], "b\t");
    }

    #[test]
    fn test_pseudo_tags_sort_first() {
        let mut lines = vec![
            "main\ta.c\t/^int main$/".to_string(),
            "!_TAG_FILE_FORMAT\t2\t/extended/".to_string(),
            "Abc\ta.c\t/^Abc$/".to_string(),
        ];
        sort_lines(&mut lines, false);
        assert!(lines[0].starts_with("!_"));
    }

    #[test]
    fn test_internal_sort_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags");
        std::fs::write(&path, "b\tb.c\t1\na\ta.c\t1\n").unwrap();
        internal_sort(&path, SortKind::Sorted).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\ta.c\t1\nb\tb.c\t1\n");
    }

    #[test]
    fn test_unsorted_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags");
        std::fs::write(&path, "b\na\n").unwrap();
        internal_sort(&path, SortKind::Unsorted).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "b\na\n");
    }
}
