//! The ctags writers: traditional (`--format=1`) and extended
//! (`--format=2`).
//!
//! Both formats share the fixed prefix `NAME\tFILE\tEXCMD`; the extended
//! format appends `;"` and tab-separated extension fields in a fixed
//! order: kind, line, language, scope, typeref, file-scope marker,
//! inheritance, access, implementation, signature, role. A field is
//! emitted only when its descriptor is enabled and the tag carries a
//! value for it.

use std::fmt::Write as _;

use anyhow::{anyhow, Result};

use crate::entry::TagEntry;
use crate::fields::{self, FieldRegistry, FieldValue, WriterFlavor};
use crate::input::InputSource;
use crate::options::Options;
use crate::output::cork::CorkQueue;
use crate::output::pattern::PatternCache;

/// Lazily-emitted separator: `;"` before the first extension field, a bare
/// tab before each one after that.
struct Separator {
    first: bool,
}

impl Separator {
    fn new() -> Self {
        Self { first: true }
    }

    fn next(&mut self) -> &'static str {
        if self.first {
            self.first = false;
            ";\"\t"
        } else {
            "\t"
        }
    }
}

/// Format one tag as a complete ctags line (with trailing newline) into
/// `buf`. Fails when the pattern column needs a line the input can no
/// longer provide.
pub(crate) fn write_entry(
    buf: &mut String,
    tag: &TagEntry,
    opts: &Options,
    registry: &FieldRegistry,
    cache: &mut PatternCache,
    source: &dyn InputSource,
    cork: Option<&CorkQueue>,
) -> Result<()> {
    let render = |id, tag| registry.render(WriterFlavor::UCtags, id, tag, opts, source, None);

    let name = render(fields::NAME, tag)
        .text()
        .unwrap_or_default();
    let file = render(fields::INPUT_FILE, tag)
        .text()
        .unwrap_or_default();
    let _ = write!(buf, "{name}\t{file}\t");

    if opts.address_by_line(tag.line_number_entry) {
        let _ = write!(buf, "{}", tag.effective_line(opts.line_directives));
    } else if let Some(p) = &tag.pattern {
        buf.push_str(p);
    } else {
        let p = cache
            .pattern_for(tag, opts, source)
            .ok_or_else(|| anyhow!("bad tag in {}", source.file_name()))?;
        buf.push_str(&p);
    }

    if opts.include_extension_fields() {
        add_extension_fields(buf, tag, opts, registry, source, cork);
    }

    buf.push('\n');
    Ok(())
}

/// Append the extension-field suffix in its fixed order.
fn add_extension_fields(
    buf: &mut String,
    tag: &TagEntry,
    opts: &Options,
    registry: &FieldRegistry,
    source: &dyn InputSource,
    cork: Option<&CorkQueue>,
) {
    let mut sep = Separator::new();
    let key = |id| registry.field_name(id, opts.put_field_prefix).unwrap_or("");
    let render = |id| {
        registry
            .render(WriterFlavor::UCtags, id, tag, opts, source, None)
            .text()
    };

    // Kind: the long name when the K field asks for it, the letter
    // otherwise; the z field turns the "kind:" key on.
    let kind_key = if registry.is_enabled(fields::KIND_KEY) {
        format!("{}:", key(fields::KIND_KEY))
    } else {
        String::new()
    };
    let long_on = registry.is_enabled(fields::KIND_LONG);
    let letter_on = registry.is_enabled(fields::KIND);
    if long_on && tag.kind.name.is_some() {
        if let Some(v) = render(fields::KIND_LONG) {
            let _ = write!(buf, "{}{kind_key}{v}", sep.next());
        }
    } else if letter_on || (long_on && tag.kind.name.is_none()) {
        if let Some(v) = render(fields::KIND) {
            let _ = write!(buf, "{}{kind_key}{v}", sep.next());
        }
    }

    if registry.is_enabled(fields::LINE) {
        let _ = write!(
            buf,
            "{}{}:{}",
            sep.next(),
            key(fields::LINE),
            tag.effective_line(opts.line_directives)
        );
    }

    if registry.is_enabled(fields::LANGUAGE) && registry.has_value(fields::LANGUAGE, tag) {
        if let Some(v) = render(fields::LANGUAGE) {
            let _ = write!(buf, "{}{}:{v}", sep.next(), key(fields::LANGUAGE));
        }
    }

    if registry.is_enabled(fields::SCOPE) {
        // The Z field turns the "scope:" key on; the value is always
        // `<scope-kind>:<scope-name>`.
        let scope_key = if registry.is_enabled(fields::SCOPE_KEY) {
            format!("{}:", key(fields::SCOPE_KEY))
        } else {
            String::new()
        };
        if tag.extension.scope_kind.is_some() && tag.extension.scope_name.is_some() {
            let kind_name = scope_kind_name(tag);
            if let FieldValue::Text(v) =
                registry.render(WriterFlavor::UCtags, fields::SCOPE, tag, opts, source, None)
            {
                let _ = write!(buf, "{}{scope_key}{kind_name}:{v}", sep.next());
            }
        } else if tag.extension.scope_index != crate::entry::SCOPE_NONE {
            if let Some((kind, qualified)) =
                cork.and_then(|q| q.qualified_scope(tag.extension.scope_index))
            {
                let kind_name = kind
                    .name
                    .clone()
                    .unwrap_or_else(|| kind.letter.to_string());
                let _ = write!(buf, "{}{scope_key}{kind_name}:{qualified}", sep.next());
            }
        }
    }

    if registry.is_enabled(fields::TYPEREF) && registry.has_value(fields::TYPEREF, tag) {
        if let (Some(kind_name), Some(v)) =
            (tag.extension.type_ref[0].as_deref(), render(fields::TYPEREF))
        {
            let _ = write!(buf, "{}{}:{kind_name}:{v}", sep.next(), key(fields::TYPEREF));
        }
    }

    // The file-scope marker is a bare key with an empty value.
    if registry.is_enabled(fields::FILE_SCOPE) && registry.has_value(fields::FILE_SCOPE, tag) {
        let _ = write!(buf, "{}{}:", sep.next(), key(fields::FILE_SCOPE));
    }

    if registry.is_enabled(fields::INHERITS) && registry.has_value(fields::INHERITS, tag) {
        if let Some(v) = render(fields::INHERITS) {
            let _ = write!(buf, "{}{}:{v}", sep.next(), key(fields::INHERITS));
        }
    }

    if registry.is_enabled(fields::ACCESS) && registry.has_value(fields::ACCESS, tag) {
        if let Some(v) = render(fields::ACCESS) {
            let _ = write!(buf, "{}{}:{v}", sep.next(), key(fields::ACCESS));
        }
    }

    if registry.is_enabled(fields::IMPLEMENTATION)
        && registry.has_value(fields::IMPLEMENTATION, tag)
    {
        if let Some(v) = render(fields::IMPLEMENTATION) {
            let _ = write!(buf, "{}{}:{v}", sep.next(), key(fields::IMPLEMENTATION));
        }
    }

    if registry.is_enabled(fields::SIGNATURE) && registry.has_value(fields::SIGNATURE, tag) {
        if let Some(v) = render(fields::SIGNATURE) {
            let _ = write!(buf, "{}{}:{v}", sep.next(), key(fields::SIGNATURE));
        }
    }

    if registry.is_enabled(fields::ROLE) && registry.has_value(fields::ROLE, tag) {
        if let Some(v) = render(fields::ROLE) {
            let _ = write!(buf, "{}{}:{v}", sep.next(), key(fields::ROLE));
        }
    }
}

fn scope_kind_name(tag: &TagEntry) -> String {
    match &tag.extension.scope_kind {
        Some(kind) => kind
            .name
            .clone()
            .unwrap_or_else(|| kind.letter.to_string()),
        None => String::new(),
    }
}
