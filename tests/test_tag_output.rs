//! End-to-end tests of the emission engine through the public API:
//! open a tag file, submit entries, close, and check the bytes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use riptags::{
    FieldRegistry, Kind, Options, OutputMode, SortKind, SourceFile, TagEntry, TagFile, TagFormat,
};

fn options(path: &Path) -> Options {
    Options {
        tag_file_name: path.to_path_buf(),
        sorted: SortKind::Unsorted,
        ..Options::default()
    }
}

fn function_kind() -> Arc<Kind> {
    Kind::new('f', "function", "function definitions").shared()
}

fn class_kind() -> Arc<Kind> {
    Kind::new('c', "class", "classes").shared()
}

fn records(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.starts_with("!_"))
        .map(str::to_string)
        .collect()
}

#[test]
fn extended_format_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags");
    let src = SourceFile::from_text("a.c", Some("C"), "int main(void) {\n}\n");

    let mut tf = TagFile::open(options(&path), FieldRegistry::new()).unwrap();
    tf.make_tag(&TagEntry::new("main", &function_kind(), &src, 1), &src)
        .unwrap();
    tf.close(false).unwrap();

    assert_eq!(records(&path), vec!["main\ta.c\t/^int main(void) {$/;\"\tf"]);
}

#[test]
fn traditional_format_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags");
    let src = SourceFile::from_text("a.c", Some("C"), "int main(void) {\n}\n");

    let mut opts = options(&path);
    opts.format = TagFormat::Original;
    let mut tf = TagFile::open(opts, FieldRegistry::new()).unwrap();
    tf.make_tag(&TagEntry::new("main", &function_kind(), &src, 1), &src)
        .unwrap();
    tf.close(false).unwrap();

    assert_eq!(records(&path), vec!["main\ta.c\t/^int main(void) {$/"]);
}

#[test]
fn corked_scope_appears_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags");
    let src = SourceFile::from_text(
        "m.py",
        Some("Python"),
        "class Foo:\n    def bar(self):\n        pass\n",
    );

    let mut tf = TagFile::open(options(&path), FieldRegistry::new()).unwrap();
    tf.cork();
    let foo = tf
        .make_tag(&TagEntry::new("Foo", &class_kind(), &src, 1), &src)
        .unwrap();
    assert_eq!(foo, 1);
    let mut bar = TagEntry::new("bar", &function_kind(), &src, 2);
    bar.extension.scope_index = foo;
    tf.make_tag(&bar, &src).unwrap();
    tf.uncork(&src).unwrap();
    tf.close(false).unwrap();

    assert_eq!(
        records(&path),
        vec![
            "Foo\tm.py\t/^class Foo:$/;\"\tc",
            "bar\tm.py\t/^    def bar(self):$/;\"\tf\tclass:Foo",
        ]
    );
}

#[test]
fn every_extended_line_has_two_unescaped_tabs_before_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags");
    let src = SourceFile::from_text("a.mk", Some("Make"), "odd\tname = 1\nplain = 2\n");
    let kind = Kind::new('m', "macro", "macros").shared();

    let mut tf = TagFile::open(options(&path), FieldRegistry::new()).unwrap();
    for (name, line) in [("odd\tname", 1), ("plain", 2)] {
        let mut tag = TagEntry::new(name, &kind, &src, line);
        tag.line_number_entry = true;
        tf.make_tag(&tag, &src).unwrap();
    }
    tf.close(false).unwrap();

    for record in records(&path) {
        let before_suffix = record.split(";\"").next().unwrap();
        let unescaped_tabs = before_suffix
            .replace("\\t", "")
            .matches('\t')
            .count();
        assert_eq!(unescaped_tabs, 2, "bad record: {record:?}");
        // No raw control characters anywhere in the record.
        assert!(record.chars().all(|c| c == '\t' || !c.is_control()));
    }
}

#[test]
fn round_trip_extended_line_grammar() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags");
    let src = SourceFile::from_text("p.py", Some("Python"), "def handler(event):\n    pass\n");

    let mut registry = FieldRegistry::new();
    registry.apply_spec("+nlS");
    let mut tf = TagFile::open(options(&path), registry).unwrap();
    let mut tag = TagEntry::new("handler", &function_kind(), &src, 1);
    tag.extension.signature = Some("(event)".into());
    tf.make_tag(&tag, &src).unwrap();
    tf.close(false).unwrap();

    let record = records(&path).remove(0);
    // name \t file \t exaddr ;" \t key:value...
    let (prefix, suffix) = record.split_once(";\"\t").unwrap();
    let mut columns = prefix.splitn(3, '\t');
    assert_eq!(columns.next(), Some("handler"));
    assert_eq!(columns.next(), Some("p.py"));
    assert_eq!(columns.next(), Some("/^def handler(event):$/"));

    let fields: Vec<(&str, &str)> = suffix
        .split('\t')
        .filter_map(|f| f.split_once(':').or(Some((f, ""))))
        .collect();
    assert!(fields.contains(&("line", "1")));
    assert!(fields.contains(&("language", "Python")));
    assert!(fields.contains(&("signature", "(event)")));
}

#[test]
fn append_mode_flag_rewrite_preserves_length() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags");

    // First run, unsorted.
    let src = SourceFile::from_text("a.c", Some("C"), "int aaa;\n");
    let kind = Kind::new('v', "variable", "variables").shared();
    let mut tf = TagFile::open(options(&path), FieldRegistry::new()).unwrap();
    tf.make_tag(&TagEntry::new("aaa", &kind, &src, 1), &src).unwrap();
    tf.close(false).unwrap();
    let first = std::fs::read_to_string(&path).unwrap();
    assert!(first.contains("!_TAG_FILE_SORTED\t0\t"));

    // Second run appends sorted: exactly the flag byte changes in the
    // header, and the old record survives.
    let mut opts = options(&path);
    opts.append = true;
    opts.sorted = SortKind::Sorted;
    let src2 = SourceFile::from_text("b.c", Some("C"), "int bbb;\n");
    let mut tf = TagFile::open(opts, FieldRegistry::new()).unwrap();
    tf.make_tag(&TagEntry::new("bbb", &kind, &src2, 1), &src2).unwrap();
    tf.close(true).unwrap();

    let second = std::fs::read_to_string(&path).unwrap();
    assert!(second.contains("!_TAG_FILE_SORTED\t1\t"));
    assert!(second.contains("aaa\ta.c\t"));
    assert!(second.contains("bbb\tb.c\t"));
    let header_len = |s: &str| s.lines().filter(|l| l.starts_with("!_")).map(|l| l.len()).sum::<usize>();
    assert_eq!(header_len(&first), header_len(&second));
}

#[test]
fn stdout_destination_cleans_up_its_temp_file() {
    let src = SourceFile::from_text("a.c", Some("C"), "int main(void) {\n}\n");
    let opts = Options {
        tag_file_name: PathBuf::from("-"),
        sorted: SortKind::Unsorted,
        ..Options::default()
    };

    let mut tf = TagFile::open(opts, FieldRegistry::new()).unwrap();
    let temp_path = tf.path().to_path_buf();
    assert!(temp_path.exists());
    tf.make_tag(&TagEntry::new("main", &function_kind(), &src, 1), &src)
        .unwrap();
    tf.close(false).unwrap();
    assert!(!temp_path.exists());
}

#[test]
fn etags_output_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("TAGS");
    let src = SourceFile::from_text("a.c", Some("C"), "int x;\nint main(void) {\n}\n");

    let mut opts = options(&path);
    opts.mode = OutputMode::Etags;
    let mut tf = TagFile::open(opts, FieldRegistry::new()).unwrap();
    tf.begin_etags_section();
    tf.make_tag(&TagEntry::new("main", &function_kind(), &src, 2), &src)
        .unwrap();
    tf.end_etags_section("a.c").unwrap();
    tf.close(false).unwrap();

    let record = "int main(void) {\x7fmain\x012,7\n";
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        format!("\x0c\na.c,{}\n{record}", record.len())
    );
}

#[test]
fn sorted_file_keeps_pseudo_tags_first() {
    // Sorting a finished file must keep the pseudo-tag header at the top.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags");
    let src = SourceFile::from_text("a.c", Some("C"), "int zz;\nint aa;\n");
    let kind = Kind::new('v', "variable", "variables").shared();

    let mut opts = options(&path);
    opts.sorted = SortKind::Sorted;
    let mut tf = TagFile::open(opts, FieldRegistry::new()).unwrap();
    tf.make_tag(&TagEntry::new("zz", &kind, &src, 1), &src).unwrap();
    tf.make_tag(&TagEntry::new("aa", &kind, &src, 2), &src).unwrap();
    tf.close(false).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    let first_real = lines.iter().position(|l| !l.starts_with("!_")).unwrap();
    assert!(lines[..first_real].iter().all(|l| l.starts_with("!_")));
    assert!(lines[first_real].starts_with("aa\t"));
}

#[test]
fn pattern_limit_drops_anchor_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags");
    let long = format!("{}\n", "y".repeat(4096));
    let src = SourceFile::from_text("big.c", Some("C"), &long);
    let kind = Kind::new('v', "variable", "variables").shared();

    let mut opts = options(&path);
    opts.format = TagFormat::Original;
    opts.pattern_length_limit = 80;
    let mut tf = TagFile::open(opts, FieldRegistry::new()).unwrap();
    tf.make_tag(&TagEntry::new("y", &kind, &src, 1), &src).unwrap();
    tf.close(false).unwrap();

    let record = records(&path).remove(0);
    let pattern = record.split('\t').nth(2).unwrap();
    assert_eq!(pattern, format!("/^{}/", "y".repeat(80)));
}
