//! Editable paginated grid: fetched rows plus a sparse edit overlay.
//!
//! ARCHITECTURE
//! ============
//! Fetched rows are never mutated. User edits land in an overlay keyed by
//! the record's immutable `id`, so in-progress edits survive page
//! navigation until a successful save clears them; the cell-level API still
//! addresses rows by their position within the current page, which is how
//! the presentation sees them. `save` submits one batch of partial records
//! (changed fields plus `id`) and clears the overlay only on success.
//!
//! Fetches are tagged with a generation so a late response for a page the
//! user has already navigated away from is discarded instead of clobbering
//! newer state.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{FetchError, SaveError};
use crate::net::client::RecordApi;
use crate::net::types::{is_non_empty, Dataset, Record, RecordPage, ID_FIELD};

/// Fixed page size for every grid fetch.
pub const PAGE_SIZE: u32 = 20;

/// Per-navigation fetch lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GridPhase {
    #[default]
    Idle,
    Fetching,
    Ready,
    /// The last fetch failed; rows are whatever they were before. The user
    /// retries by navigating again.
    FetchFailed,
}

/// How a cell should be edited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    /// The `id` column: always rendered read-only.
    Id,
    /// Decimal-step numeric input.
    Numeric,
    /// Free text.
    Text,
}

/// Tag carried by an in-flight fetch so a stale response can be recognized.
#[derive(Clone, Copy, Debug)]
pub struct FetchTicket {
    page: u32,
    generation: u64,
}

/// Grid state for one dataset, owned by a single view instance.
pub struct GridState {
    dataset: Dataset,
    page: u32,
    rows: Vec<Record>,
    total: u64,
    overlay: BTreeMap<i64, Record>,
    phase: GridPhase,
    generation: u64,
}

impl GridState {
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            page: 1,
            rows: Vec::new(),
            total: 0,
            overlay: BTreeMap::new(),
            phase: GridPhase::Idle,
            generation: 0,
        }
    }

    #[must_use]
    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Current page number (1-based).
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn phase(&self) -> GridPhase {
        self.phase
    }

    /// Unsaved edits, keyed by record id. Exposed for the navigation guard
    /// and for save assertions; mutate only through [`Self::edit_cell`].
    #[must_use]
    pub fn overlay(&self) -> &BTreeMap<i64, Record> {
        &self.overlay
    }

    #[must_use]
    pub fn has_unsaved_edits(&self) -> bool {
        !self.overlay.is_empty()
    }

    /// Whether this dataset accepts edits at all.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.dataset.save_path().is_some()
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        u32::try_from(self.total.div_ceil(u64::from(PAGE_SIZE))).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn is_last_page(&self) -> bool {
        self.page >= self.total_pages()
    }

    // -------------------------------------------------------------------------
    // Fetching
    // -------------------------------------------------------------------------

    /// Start a fetch for `page`, invalidating any earlier in-flight fetch.
    pub fn begin_fetch(&mut self, page: u32) -> FetchTicket {
        self.generation += 1;
        self.phase = GridPhase::Fetching;
        FetchTicket { page, generation: self.generation }
    }

    /// Apply a fetch outcome. `Ok(false)` means the response was stale
    /// (a newer fetch has started since) and was discarded untouched.
    ///
    /// # Errors
    ///
    /// Passes the fetch error back through after recording `FetchFailed`;
    /// rows remain whatever they were (empty on first load).
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<RecordPage, FetchError>,
    ) -> Result<bool, FetchError> {
        if ticket.generation != self.generation {
            tracing::debug!(page = ticket.page, "discarding stale page response");
            return Ok(false);
        }
        match result {
            Ok(fetched) => {
                self.page = ticket.page;
                self.rows = fetched.items;
                self.total = fetched.total;
                self.phase = GridPhase::Ready;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(page = ticket.page, error = %e, "page fetch failed");
                self.phase = GridPhase::FetchFailed;
                Err(e)
            }
        }
    }

    /// Fetch and apply one page with the fixed page size.
    ///
    /// # Errors
    ///
    /// `FetchError` from the transport; the grid is left in `FetchFailed`
    /// with its previous rows.
    pub async fn load_page(&mut self, api: &dyn RecordApi, page: u32) -> Result<(), FetchError> {
        let ticket = self.begin_fetch(page);
        let result = api.fetch_page(self.dataset, page, PAGE_SIZE).await;
        self.apply_fetch(ticket, result).map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    /// Id of the record at a current-page position, if it has one.
    fn row_id(&self, position: usize) -> Option<i64> {
        self.rows.get(position)?.get(ID_FIELD)?.as_i64()
    }

    /// Record an edit at (position, field). Returns `false` if the edit was
    /// refused: the `id` field, a read-only dataset, or a position with no
    /// identifiable row. Writing a field back to its fetched value removes
    /// it from the overlay, so the overlay only ever holds real changes.
    pub fn edit_cell(&mut self, position: usize, field: &str, value: Value) -> bool {
        if field == ID_FIELD {
            tracing::warn!(position, "refusing edit of immutable id field");
            return false;
        }
        if !self.is_editable() {
            tracing::warn!(dataset = ?self.dataset, "refusing edit of read-only dataset");
            return false;
        }
        let Some(id) = self.row_id(position) else {
            tracing::warn!(position, "refusing edit of unidentifiable row");
            return false;
        };
        let fetched = self.rows[position].get(field);
        if fetched == Some(&value) {
            if let Some(patch) = self.overlay.get_mut(&id) {
                patch.remove(field);
                if patch.is_empty() {
                    self.overlay.remove(&id);
                }
            }
            return true;
        }
        self.overlay.entry(id).or_default().insert(field.to_owned(), value);
        true
    }

    /// Effective cell value: the overlay entry if the field was edited,
    /// otherwise the fetched value.
    #[must_use]
    pub fn effective_value(&self, position: usize, field: &str) -> Option<&Value> {
        let row = self.rows.get(position)?;
        if let Some(patch) = self.row_id(position).and_then(|id| self.overlay.get(&id)) {
            if let Some(edited) = patch.get(field) {
                return Some(edited);
            }
        }
        row.get(field)
    }

    // -------------------------------------------------------------------------
    // Saving
    // -------------------------------------------------------------------------

    /// Batch to submit: one partial record per overlay entry, ascending by
    /// id, each carrying the changed fields plus `id`.
    fn build_batch(&self) -> Vec<Record> {
        self.overlay
            .iter()
            .map(|(id, patch)| {
                let mut record = patch.clone();
                record.insert(ID_FIELD.to_owned(), Value::from(*id));
                record
            })
            .collect()
    }

    /// Persist all unsaved edits in one batch. An empty overlay is a
    /// successful no-op with no network call, so callers may invoke this
    /// unconditionally before navigating away.
    ///
    /// # Errors
    ///
    /// `SaveError` from the transport; the overlay is preserved intact so
    /// no edits are lost, and the caller decides whether navigation is
    /// blocked.
    pub async fn save(&mut self, api: &dyn RecordApi) -> Result<(), SaveError> {
        if self.overlay.is_empty() {
            return Ok(());
        }
        let batch = self.build_batch();
        api.save_batch(self.dataset, &batch).await?;
        self.overlay.clear();
        Ok(())
    }

    /// Save, then advance to the next page if not already on the last one.
    /// Advancement proceeds even when the save failed; the save error is
    /// still returned so the caller can surface it.
    ///
    /// # Errors
    ///
    /// The save's error, if any. A fetch failure during advancement is
    /// recorded in the grid phase, not returned here.
    pub async fn save_and_advance(&mut self, api: &dyn RecordApi) -> Result<(), SaveError> {
        let saved = self.save(api).await;
        if !self.is_last_page() {
            let next = self.page + 1;
            if let Err(e) = self.load_page(api, next).await {
                tracing::warn!(page = next, error = %e, "advance fetch failed");
            }
        }
        saved
    }

    // -------------------------------------------------------------------------
    // Display derivations
    // -------------------------------------------------------------------------

    /// Columns to display for the current page: fields where at least one
    /// loaded row has a non-empty value. Recomputed per page load; purely a
    /// display derivation.
    #[must_use]
    pub fn visible_columns(&self) -> Vec<String> {
        let Some(first) = self.rows.first() else {
            return Vec::new();
        };
        first
            .keys()
            .filter(|field| {
                self.rows
                    .iter()
                    .any(|row| row.get(field.as_str()).is_some_and(is_non_empty))
            })
            .cloned()
            .collect()
    }

    /// Input semantics for a column: `id` is read-only, columns whose
    /// fetched values are all numeric (the amount column in either its
    /// string or number encoding) get a decimal-step input, the rest are
    /// free text.
    #[must_use]
    pub fn cell_kind(&self, field: &str) -> CellKind {
        if field == ID_FIELD {
            return CellKind::Id;
        }
        if field == "amount" {
            return CellKind::Numeric;
        }
        let mut saw_value = false;
        for row in &self.rows {
            match row.get(field) {
                Some(Value::Number(_)) => saw_value = true,
                Some(v) if is_non_empty(v) => return CellKind::Text,
                _ => {}
            }
        }
        if saw_value { CellKind::Numeric } else { CellKind::Text }
    }
}
