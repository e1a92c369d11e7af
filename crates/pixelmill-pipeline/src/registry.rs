//! Result registry with transient payload views.
//!
//! The registry is an owned object (never global state) that the coordinator
//! holds alongside its [`DispatchQueue`](crate::DispatchQueue), so multiple
//! independent pipelines can coexist. Compressed payloads are stored behind
//! shared handles: a [`ResultView`] keeps the bytes alive while a consumer
//! (preview rendering, archiving) is reading them, and dropping the view
//! releases that claim. Re-processing a job supersedes its prior entry;
//! clearing the registry releases the whole batch at once.

use std::collections::HashMap;
use std::sync::Arc;

use crate::job::JobResult;

struct RegistryEntry {
    /// The result record, with `compressed_bytes` moved out into `payload`.
    result: JobResult,
    payload: Option<Arc<[u8]>>,
}

/// Per-batch store of job results, keyed by job id.
#[derive(Default)]
pub struct ResultRegistry {
    entries: HashMap<String, RegistryEntry>,
}

/// A transient handle onto one result's compressed bytes.
///
/// The underlying buffer stays alive until the registry entry is superseded
/// or cleared *and* every outstanding view has been dropped.
#[derive(Debug, Clone)]
pub struct ResultView {
    id: String,
    payload: Arc<[u8]>,
}

impl ResultView {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl ResultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result, superseding any prior entry for the same job id.
    ///
    /// The superseded payload is released as soon as its last outstanding
    /// view drops.
    pub fn insert(&mut self, mut result: JobResult) {
        let payload = result.compressed_bytes.take().map(Arc::<[u8]>::from);
        let entry = RegistryEntry {
            result,
            payload,
        };
        self.entries.insert(entry.result.id.clone(), entry);
    }

    /// The stored result record for a job, if present.
    ///
    /// `compressed_bytes` is always `None` on the returned record; the
    /// payload is reachable only through [`ResultRegistry::view`].
    pub fn get(&self, id: &str) -> Option<&JobResult> {
        self.entries.get(id).map(|entry| &entry.result)
    }

    /// A view onto the compressed payload of a successful result.
    ///
    /// Returns `None` for unknown ids and for failure results, which carry
    /// no payload.
    pub fn view(&self, id: &str) -> Option<ResultView> {
        let entry = self.entries.get(id)?;
        let payload = entry.payload.as_ref()?;
        Some(ResultView {
            id: id.to_string(),
            payload: Arc::clone(payload),
        })
    }

    /// Remove one entry, releasing its payload. Returns true if it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Release every entry in the registry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
