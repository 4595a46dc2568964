//! The cork queue: deferred tag emission with stable indices.
//!
//! While corked, tag records are copied into this queue instead of being
//! written, and the caller gets back an index it can store as the
//! `scope_index` of later tags - letting a parser reference a scope whose
//! body it has not finished walking. Index 0 is reserved as the "no scope"
//! sentinel, so a zero scope index never aliases a real entry.
//!
//! Indices are stable for the lifetime of one cork session; the queue is
//! drained and discarded by the outermost uncork. Entries hold parent
//! *indices*, never references, so growth cannot invalidate a scope chain.

use std::sync::Arc;

use crate::entry::{TagEntry, SCOPE_NONE};
use crate::fields::escape_string;
use crate::kinds::Kind;

/// Ordered buffer of owned tag copies. Slot 0 is the reserved sentinel and
/// has no storage; real entries start at index 1.
#[derive(Debug, Default)]
pub struct CorkQueue {
    entries: Vec<TagEntry>,
}

impl CorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied indices, counting the sentinel.
    pub fn len(&self) -> usize {
        self.entries.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queue an owned copy and return its index.
    pub fn push(&mut self, entry: TagEntry) -> usize {
        // A scope reference must point at an earlier entry; anything else
        // would allow cycles through the parent chain.
        debug_assert!(entry.extension.scope_index < self.len());
        self.entries.push(entry);
        self.entries.len()
    }

    /// Borrow the entry at an index. The sentinel and out-of-range indices
    /// yield `None`.
    pub fn get(&self, index: usize) -> Option<&TagEntry> {
        if index == SCOPE_NONE {
            return None;
        }
        self.entries.get(index - 1)
    }

    /// Entries in insertion order, sentinel excluded.
    pub fn iter(&self) -> impl Iterator<Item = &TagEntry> {
        self.entries.iter()
    }

    /// Synthesize the fully-qualified scope for a tag whose `scope_index`
    /// points into this queue: the scope's kind plus the dot-joined chain
    /// of non-placeholder names from outermost to innermost.
    pub fn qualified_scope(&self, scope_index: usize) -> Option<(Arc<Kind>, String)> {
        let scope = self.get(scope_index)?;
        let mut names: Vec<String> = Vec::new();
        let mut cursor = Some(scope);
        while let Some(entry) = cursor {
            if !entry.placeholder {
                names.push(escape_string(&entry.name));
            }
            cursor = self.get(entry.extension.scope_index);
        }
        names.reverse();
        Some((Arc::clone(&scope.kind), names.join(".")))
    }
}
