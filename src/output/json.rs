//! The JSON writer: one object per record, raw UTF-8 values.
//!
//! JSON needs no backslash escaping of its own - serde handles the string
//! encoding - so this writer draws from the no-escape renderer seats.
//! A renderer that rejects a value (whitespace inside a name, for
//! example) drops that field from the record, never the record itself.

use std::fmt::Write as _;

use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::entry::TagEntry;
use crate::fields::{self, FieldRegistry, FieldValue, WriterFlavor};
use crate::input::InputSource;
use crate::options::Options;
use crate::output::cork::CorkQueue;
use crate::output::pattern::PatternCache;

/// Format one tag as a JSON line into `buf`.
pub(crate) fn write_entry(
    buf: &mut String,
    tag: &TagEntry,
    opts: &Options,
    registry: &FieldRegistry,
    cache: &mut PatternCache,
    source: &dyn InputSource,
    cork: Option<&CorkQueue>,
) -> Result<()> {
    let mut obj = Map::new();
    obj.insert("_type".to_string(), json!("tag"));

    let render = |id| registry.render(WriterFlavor::Json, id, tag, opts, source, None);

    if let FieldValue::Text(name) = render(fields::NAME) {
        obj.insert("name".to_string(), json!(name));
    }
    if let FieldValue::Text(path) = render(fields::INPUT_FILE) {
        obj.insert("path".to_string(), json!(path));
    }

    if opts.address_by_line(tag.line_number_entry) {
        obj.insert(
            "line".to_string(),
            json!(tag.effective_line(opts.line_directives)),
        );
    } else if let Some(p) = tag
        .pattern
        .as_ref()
        .map(|p| p.to_string())
        .or_else(|| cache.pattern_for(tag, opts, source))
    {
        obj.insert("pattern".to_string(), json!(p));
    }

    if registry.is_enabled(fields::KIND_LONG) || registry.is_enabled(fields::KIND) {
        match &tag.kind.name {
            Some(name) if registry.is_enabled(fields::KIND_LONG) => {
                obj.insert("kind".to_string(), json!(name));
            }
            _ => {
                obj.insert("kind".to_string(), json!(tag.kind.letter.to_string()));
            }
        }
    }

    if registry.is_enabled(fields::LINE) {
        obj.insert(
            "line".to_string(),
            json!(tag.effective_line(opts.line_directives)),
        );
    }

    if registry.is_enabled(fields::LANGUAGE) && registry.has_value(fields::LANGUAGE, tag) {
        if let Some(l) = tag.effective_language(opts.line_directives) {
            obj.insert("language".to_string(), json!(l));
        }
    }

    if registry.is_enabled(fields::SCOPE) {
        insert_scope(&mut obj, tag, render(fields::SCOPE), cork);
    }

    if registry.is_enabled(fields::TYPEREF) && registry.has_value(fields::TYPEREF, tag) {
        if let [Some(kind_name), Some(name)] = &tag.extension.type_ref {
            obj.insert(
                "typeref".to_string(),
                json!(format!("{kind_name}:{name}")),
            );
        }
    }

    if registry.is_enabled(fields::FILE_SCOPE) && tag.is_file_scope {
        obj.insert("file".to_string(), json!(true));
    }

    for (id, key, value) in [
        (fields::INHERITS, "inherits", tag.extension.inheritance.as_deref()),
        (fields::ACCESS, "access", tag.extension.access.as_deref()),
        (fields::IMPLEMENTATION, "implementation", tag.extension.implementation.as_deref()),
        (fields::SIGNATURE, "signature", tag.extension.signature.as_deref()),
    ] {
        if registry.is_enabled(id) && registry.has_value(id, tag) {
            if let Some(v) = value {
                obj.insert(key.to_string(), json!(v));
            }
        }
    }

    if registry.is_enabled(fields::ROLE) && registry.has_value(fields::ROLE, tag) {
        if let FieldValue::Text(role) = render(fields::ROLE) {
            obj.insert("role".to_string(), json!(role));
        }
    }

    if registry.is_enabled(fields::END) && tag.extension.end_line != 0 {
        obj.insert("end".to_string(), json!(tag.extension.end_line));
    }

    let _ = writeln!(buf, "{}", Value::Object(obj));
    Ok(())
}

/// Scope comes out as two keys: the qualified name and its kind.
fn insert_scope(
    obj: &mut Map<String, Value>,
    tag: &TagEntry,
    rendered: FieldValue,
    cork: Option<&CorkQueue>,
) {
    if let (Some(kind), Some(_)) = (&tag.extension.scope_kind, &tag.extension.scope_name) {
        if let FieldValue::Text(scope) = rendered {
            obj.insert("scope".to_string(), json!(scope));
            obj.insert(
                "scopeKind".to_string(),
                json!(kind.name.clone().unwrap_or_else(|| kind.letter.to_string())),
            );
        }
    } else if tag.extension.scope_index != crate::entry::SCOPE_NONE {
        if let Some((kind, qualified)) =
            cork.and_then(|q| q.qualified_scope(tag.extension.scope_index))
        {
            obj.insert("scope".to_string(), json!(qualified));
            obj.insert(
                "scopeKind".to_string(),
                json!(kind.name.clone().unwrap_or_else(|| kind.letter.to_string())),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::SourceFile;
    use crate::kinds::Kind;

    fn write(tag: &TagEntry, registry: &FieldRegistry, src: &SourceFile) -> Value {
        let mut buf = String::new();
        let mut cache = PatternCache::new();
        let opts = Options::default();
        write_entry(&mut buf, tag, &opts, registry, &mut cache, src, None).unwrap();
        serde_json::from_str(&buf).unwrap()
    }

    #[test]
    fn test_basic_object() {
        let src = SourceFile::from_text("a.c", Some("C"), "int main(void) {\n}\n");
        let tag = TagEntry::new(
            "main",
            &Kind::new('f', "function", "functions").shared(),
            &src,
            1,
        );
        let v = write(&tag, &FieldRegistry::new(), &src);

        assert_eq!(v["_type"], "tag");
        assert_eq!(v["name"], "main");
        assert_eq!(v["path"], "a.c");
        assert_eq!(v["pattern"], "/^int main(void) {$/");
        assert_eq!(v["kind"], "f");
    }

    #[test]
    fn test_rejected_name_is_dropped_not_record() {
        let src = SourceFile::from_text("a.mk", Some("Make"), "odd name = 1\n");
        let tag = TagEntry::new(
            "odd name",
            &Kind::new('m', "macro", "macros").shared(),
            &src,
            1,
        );
        let v = write(&tag, &FieldRegistry::new(), &src);

        assert!(v.get("name").is_none());
        assert_eq!(v["_type"], "tag");
        assert_eq!(v["path"], "a.mk");
    }

    #[test]
    fn test_numeric_line_and_bool_file() {
        let src = SourceFile::from_text("a.c", Some("C"), "static int counter;\n");
        let mut tag = TagEntry::new(
            "counter",
            &Kind::new('v', "variable", "variables").shared(),
            &src,
            1,
        );
        tag.is_file_scope = true;

        let mut registry = FieldRegistry::new();
        registry.apply_spec("+n");
        let v = write(&tag, &registry, &src);

        assert_eq!(v["line"], 1);
        assert_eq!(v["file"], true);
    }
}
