use super::ReconciliationEngine;
use crate::hooks::{EntityLifecycleHook, HookEffect};
use crate::registry::{ManagedEntity, ManagedRegistry, ManagedSet};
use crate::utils::{file_mtime, get_current_timestamp};
use anyhow::Result;
use tracing::{Level, debug, error, info, span};

/// Result of one adoption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdoptOutcome {
    /// A registry entry was created
    Adopted(ManagedEntity),
    /// The file was already in the registry
    AlreadyManaged,
    /// The file matches an ignore pattern
    Ignored,
    /// The URI is invalid or the registry rejected the entry
    Failed(String),
}

impl AdoptOutcome {
    /// Returns `true` when a registry entry was created.
    #[must_use]
    pub const fn is_adopted(&self) -> bool {
        matches!(self, Self::Adopted(_))
    }
}

/// Aggregate of a batch adoption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdoptionSummary {
    /// URIs processed
    pub attempted: usize,
    /// Registry entries created
    pub adopted: usize,
    /// Already managed or ignored
    pub skipped: usize,
    /// `(uri, reason)` for every failed attempt
    pub failures: Vec<(String, String)>,
}

impl AdoptionSummary {
    fn record(&mut self, uri: &str, outcome: &AdoptOutcome) {
        self.attempted += 1;
        match outcome {
            AdoptOutcome::Adopted(_) => self.adopted += 1,
            AdoptOutcome::AlreadyManaged | AdoptOutcome::Ignored => self.skipped += 1,
            AdoptOutcome::Failed(reason) => self.failures.push((uri.to_string(), reason.clone())),
        }
    }
}

impl<R: ManagedRegistry> ReconciliationEngine<R> {
    /// Adopts a single file.
    ///
    /// Returns `false` when the file is already managed, ignored, or the
    /// registry rejected the entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried or a table cannot be
    /// saved
    pub fn adopt_file(&mut self, uri: &str) -> Result<bool> {
        let summary = self.adopt_files([uri])?;
        Ok(summary.adopted == 1)
    }

    /// Adopts each URI in turn.
    ///
    /// A failure is logged and recorded in the summary; the batch carries on.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried or a table cannot be
    /// saved
    pub fn adopt_files<I, S>(&mut self, uris: I) -> Result<AdoptionSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let span = span!(Level::DEBUG, "adopt_files");
        let _guard = span.enter();

        let mut managed = self.load_managed()?;
        let mut summary = AdoptionSummary::default();
        for uri in uris {
            let uri = uri.as_ref();
            let outcome = self.adopt_canonical(&mut managed, uri);
            summary.record(uri, &outcome);
        }

        self.flush()?;
        info!(
            attempted = summary.attempted,
            adopted = summary.adopted,
            failed = summary.failures.len(),
            "Adoption finished"
        );
        Ok(summary)
    }

    /// Adopts up to `limit` indexed files that are neither managed nor ignored.
    ///
    /// Candidates come from the index in row order, so the index should be
    /// current (see [`Self::scan_public_files`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried or a table cannot be
    /// saved
    pub fn adopt_unmanaged(&mut self, limit: usize) -> Result<AdoptionSummary> {
        let candidates = self.index.list_unmanaged_unignored(limit, None);
        debug!(candidates = candidates.len(), "Adopting unmanaged files from index");
        self.adopt_files(candidates)
    }

    /// Deletes the registry entry for `uri` and patches the index.
    ///
    /// Returns `None` when the URI has no entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be updated or the index cannot
    /// be saved
    pub fn release_file(&mut self, uri: &str) -> Result<Option<HookEffect>> {
        let uri = self.scheme.canonicalize(uri);
        let Some(entity) = self.find_entity(&uri)? else {
            return Ok(None);
        };

        let Some(removed) = self.registry.delete_managed_entry(entity.id)? else {
            return Ok(None);
        };
        info!(uri = %uri, "Released file from registry");
        self.on_entity_delete(&removed).map(Some)
    }

    /// Adoption of one URI against an already-loaded snapshot.
    pub(super) fn adopt_canonical(&mut self, managed: &mut ManagedSet, uri: &str) -> AdoptOutcome {
        let uri = self.scheme.canonicalize(uri);
        let Some(relative) = self.scheme.relative_path(&uri) else {
            error!(uri = %uri, "Cannot adopt file outside the {} scheme", self.scheme.name());
            return AdoptOutcome::Failed(format!("Not a {} URI", self.scheme.prefix()));
        };
        let Some(path) = self.scheme.real_path(&uri) else {
            error!(uri = %uri, "Cannot adopt a path outside the scan root");
            return AdoptOutcome::Failed("Path escapes the scan root".to_string());
        };
        if path.is_dir() {
            error!(uri = %uri, "Cannot adopt a directory");
            return AdoptOutcome::Failed("Not a regular file".to_string());
        }

        if managed.contains(&uri) {
            if self.verbose {
                debug!(uri = %uri, "Already managed");
            }
            return AdoptOutcome::AlreadyManaged;
        }
        if self.matcher.is_ignored(&relative) {
            if self.verbose {
                debug!(uri = %uri, "Ignored by pattern");
            }
            return AdoptOutcome::Ignored;
        }

        let timestamp = file_mtime(&path).unwrap_or_else(get_current_timestamp);
        let filename = relative.rsplit('/').next().unwrap_or(&relative);

        match self.registry.create_managed_entry(&uri, filename, timestamp) {
            Ok(entity) => {
                managed.insert(uri.clone());
                self.orphans.delete(&uri);
                EntityLifecycleHook::new(&self.scheme, &self.matcher)
                    .on_entity_insert(&mut self.index, &entity);
                info!(uri = %uri, id = entity.id, "Adopted file");
                AdoptOutcome::Adopted(entity)
            }
            Err(e) => {
                let reason = format!("{e:#}");
                error!(uri = %uri, error = %reason, "Failed to adopt file");
                AdoptOutcome::Failed(reason)
            }
        }
    }

    /// Registry entry for a canonical URI, matching any stored spelling.
    fn find_entity(&self, uri: &str) -> Result<Option<ManagedEntity>> {
        if let Some(entity) = self.registry.find_managed_entry(uri)? {
            return Ok(Some(entity));
        }
        let stored = self
            .registry
            .list_all_managed_uris()?
            .into_iter()
            .find(|candidate| self.scheme.canonicalize(candidate) == uri);
        match stored {
            Some(stored) => self.registry.find_managed_entry(&stored),
            None => Ok(None),
        }
    }
}
