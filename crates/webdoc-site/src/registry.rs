//! Identity registry mapping node ids to arena handles.
//!
//! One registry belongs to one [`Document`](crate::Document), so independent
//! builds in the same process never share ids. The registry is filled while
//! the tree is built and only read (plus transient render-time entries that
//! are rolled back) while publishing.

use std::collections::HashMap;

use crate::document::NodeHandle;

/// Prefix used for synthesized ids when the caller supplies none.
pub const DEFAULT_ID_PREFIX: &str = "id";

/// Returned when an explicit id is already registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DuplicateId {
    /// Node that holds the id.
    pub existing: NodeHandle,
}

/// Registry of globally unique node ids.
///
/// Synthesized ids have the form `<prefix>-<n>` where `n` is the smallest
/// positive integer that yields an unregistered id. Synthesis depends only on
/// the sequence of registrations, so output is reproducible across runs.
#[derive(Debug, Default)]
pub struct IdRegistry {
    index: HashMap<String, NodeHandle>,
    /// Lowest suffix per prefix that may still be free.
    next_suffix: HashMap<String, usize>,
}

impl IdRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` under `preferred`, or under a synthesized id if `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateId`] if `preferred` is already registered.
    pub fn register(
        &mut self,
        node: NodeHandle,
        preferred: Option<&str>,
    ) -> Result<String, DuplicateId> {
        match preferred {
            Some(id) => {
                if let Some(&existing) = self.index.get(id) {
                    return Err(DuplicateId { existing });
                }
                self.index.insert(id.to_owned(), node);
                Ok(id.to_owned())
            }
            None => Ok(self.synthesize(node, DEFAULT_ID_PREFIX)),
        }
    }

    /// Register `node` under a fresh `<prefix>-<n>` id.
    pub fn synthesize(&mut self, node: NodeHandle, prefix: &str) -> String {
        let mut suffix = self.next_suffix.get(prefix).copied().unwrap_or(1);
        loop {
            let candidate = format!("{prefix}-{suffix}");
            if !self.index.contains_key(&candidate) {
                tracing::debug!(id = %candidate, "synthesized id");
                self.index.insert(candidate.clone(), node);
                self.next_suffix.insert(prefix.to_owned(), suffix + 1);
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Look up the node registered under `id`.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<NodeHandle> {
        self.index.get(id).copied()
    }

    /// Remove `id`, making it (and its synthesis slot) available again.
    pub fn unregister(&mut self, id: &str) -> Option<NodeHandle> {
        let removed = self.index.remove(id)?;
        if let Some((prefix, suffix)) = id.rsplit_once('-')
            && let Ok(suffix) = suffix.parse::<usize>()
            && let Some(next) = self.next_suffix.get_mut(prefix)
            && *next > suffix
        {
            *next = suffix;
        }
        Some(removed)
    }

    /// Number of registered ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if no id is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
