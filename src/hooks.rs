//! Index maintenance driven by registry create/delete notifications.
//!
//! When an entry is added to or removed from the registry outside a scan, the
//! matching index row is patched right away instead of waiting for the next
//! full rescan. Canonicalization and ignore evaluation are the same ones the
//! scan path uses, so a patched row is identical to what a rescan would write.

use crate::registry::ManagedEntity;
use crate::scanner::IgnoreMatcher;
use crate::storage::{IndexRecord, IndexStore};
use crate::uri::{Scheme, directory_depth};
use crate::utils::file_mtime;
use tracing::debug;

/// What a notification did to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEffect {
    /// The entity is outside the scanned scheme; nothing changed
    Skipped,
    /// The row was inserted or updated
    Upserted,
    /// The row was removed because the file is gone
    Removed,
}

/// Applies registry notifications to an [`IndexStore`].
#[derive(Debug, Clone, Copy)]
pub struct EntityLifecycleHook<'a> {
    /// Scheme the entity URIs belong to
    scheme: &'a Scheme,
    /// Patterns deciding the ignored flag
    matcher: &'a IgnoreMatcher,
}

impl<'a> EntityLifecycleHook<'a> {
    /// Creates a hook evaluating paths under `scheme` against `matcher`.
    #[must_use]
    pub const fn new(scheme: &'a Scheme, matcher: &'a IgnoreMatcher) -> Self {
        Self { scheme, matcher }
    }

    /// A registry entry was created: the file is now managed.
    pub fn on_entity_insert(&self, index: &mut IndexStore, entity: &ManagedEntity) -> HookEffect {
        let Some((uri, relative)) = self.locate(entity) else {
            return HookEffect::Skipped;
        };

        let timestamp = self
            .scheme
            .real_path(&uri)
            .and_then(|path| file_mtime(&path))
            .unwrap_or(entity.timestamp);

        debug!(uri = %uri, "Marking file managed after registry insert");
        index.upsert(IndexRecord::new(
            uri,
            self.matcher.is_ignored(&relative),
            true,
            directory_depth(&relative),
            timestamp,
        ));
        HookEffect::Upserted
    }

    /// A registry entry was deleted.
    ///
    /// A file still on disk becomes unmanaged again; a file that is gone too
    /// loses its row.
    pub fn on_entity_delete(&self, index: &mut IndexStore, entity: &ManagedEntity) -> HookEffect {
        let Some((uri, relative)) = self.locate(entity) else {
            return HookEffect::Skipped;
        };

        let on_disk = self.scheme.real_path(&uri).filter(|path| path.exists());
        match on_disk {
            Some(path) => {
                debug!(uri = %uri, "Marking file unmanaged after registry delete");
                let timestamp = file_mtime(&path).unwrap_or(entity.timestamp);
                index.upsert(IndexRecord::new(
                    uri,
                    self.matcher.is_ignored(&relative),
                    false,
                    directory_depth(&relative),
                    timestamp,
                ));
                HookEffect::Upserted
            }
            None => {
                debug!(uri = %uri, "Dropping index row for deleted file");
                index.delete(&uri);
                HookEffect::Removed
            }
        }
    }

    /// Canonical URI and relative path of an entity under this scheme.
    fn locate(&self, entity: &ManagedEntity) -> Option<(String, String)> {
        let uri = self.scheme.canonicalize(&entity.uri);
        let relative = self.scheme.relative_path(&uri)?;
        Some((uri, relative))
    }
}
