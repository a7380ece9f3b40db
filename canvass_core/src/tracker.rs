use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;
use snafu::prelude::*;

use crate::error::*;
use crate::export::{self, ExportKind, ExportSet};
use crate::normalizer::{coerce_status, normalize_batch};
use crate::store::{KeyValueStore, Store};
use crate::view::{self, derive_view, PageInfo, View};
use crate::{Record, RecordEdit, SortColumn, SortDirection, Status, ViewState, ViewStatePatch};

/// Outcome of a successful import.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
pub struct ImportSummary {
    #[serde(rename = "recordCount")]
    pub record_count: usize,
    /// Rows dropped because they had no name and no address.
    pub discarded: usize,
}

/// The command interface of the tracker.
///
/// Each command runs to completion and leaves the state persisted. Commands that
/// reference an unknown id return [`CanvassError::RecordNotFound`] and change nothing.
pub struct Tracker<K: KeyValueStore> {
    store: Store<K>,
}

impl<K: KeyValueStore> Tracker<K> {
    pub fn open(kv: K) -> Tracker<K> {
        Tracker::open_with_defaults(kv, ViewState::default())
    }

    /// Opens the stored state; `defaults` fill in whatever the stored view state lacks.
    pub fn open_with_defaults(kv: K, defaults: ViewState) -> Tracker<K> {
        Tracker {
            store: Store::open(kv, defaults),
        }
    }

    pub fn store(&self) -> &Store<K> {
        &self.store
    }

    pub fn records(&self) -> &[Record] {
        self.store.get_all()
    }

    pub fn view_state(&self) -> &ViewState {
        self.store.view_state()
    }

    /// A failed write of the last command, if any.
    pub fn last_persist_error(&self) -> Option<&CanvassError> {
        self.store.last_persist_error()
    }

    /// Replaces every record with the content of `raw_text`.
    ///
    /// On error the current records and view are left untouched.
    pub fn import(&mut self, raw_text: &str) -> CanvassResult<ImportSummary> {
        self.store.clear_persist_error();
        let batch = normalize_batch(raw_text)?;
        let summary = ImportSummary {
            record_count: batch.records.len(),
            discarded: batch.discarded,
        };
        self.store.replace_all(batch.records);
        self.store.set_view_state(&ViewStatePatch {
            page_number: Some(1),
            ..ViewStatePatch::default()
        });
        info!("import: {:?}", summary);
        Ok(summary)
    }

    /// Updates the filters that are given and goes back to the first page.
    pub fn apply_filter(&mut self, precinct: Option<&str>, query: Option<&str>) {
        self.store.clear_persist_error();
        self.store.set_view_state(&ViewStatePatch {
            precinct_filter: precinct.map(|p| p.to_string()),
            search_query: query.map(|q| q.trim().to_string()),
            page_number: Some(1),
            ..ViewStatePatch::default()
        });
    }

    pub fn clear_filters(&mut self) {
        self.apply_filter(Some(""), Some(""));
    }

    /// Sorts on `column`; the direction is kept when not given.
    pub fn apply_sort(&mut self, column: SortColumn, direction: Option<SortDirection>) {
        self.store.clear_persist_error();
        self.store.set_view_state(&ViewStatePatch {
            sort_column: Some(column),
            sort_direction: direction,
            ..ViewStatePatch::default()
        });
    }

    pub fn toggle_sort_direction(&mut self) -> SortDirection {
        self.store.clear_persist_error();
        let direction = self.view_state().sort_direction.toggled();
        self.store.set_view_state(&ViewStatePatch {
            sort_direction: Some(direction),
            ..ViewStatePatch::default()
        });
        direction
    }

    /// Goes to `page`, clamped to the pages of the current view.
    pub fn apply_page(&mut self, page: usize) -> PageInfo {
        self.store.clear_persist_error();
        let state = self.view_state();
        let total = view::filter(self.records(), state).len();
        let (info, _) = view::paginate(total, page, state.page_size);
        self.store.set_view_state(&ViewStatePatch {
            page_number: Some(info.page),
            ..ViewStatePatch::default()
        });
        info
    }

    pub fn next_page(&mut self) -> PageInfo {
        let current = self.view().page.page;
        self.apply_page(current + 1)
    }

    pub fn prev_page(&mut self) -> PageInfo {
        let current = self.view().page.page;
        self.apply_page(current.saturating_sub(1))
    }

    pub fn apply_page_size(&mut self, page_size: usize) {
        self.store.clear_persist_error();
        self.store.set_view_state(&ViewStatePatch {
            page_size: Some(page_size),
            page_number: Some(1),
            ..ViewStatePatch::default()
        });
    }

    /// Applies `edit` to the record.
    ///
    /// An edit that would leave the record without last name, first name and address
    /// is refused with [`CanvassError::BlankRecord`]: such a record could not be
    /// imported back from an export.
    pub fn edit(&mut self, id: &str, edit: &RecordEdit) -> CanvassResult<&Record> {
        debug!("edit: {} {:?}", id, edit);
        self.store.clear_persist_error();
        let mut edited = self
            .store
            .get(id)
            .context(RecordNotFoundSnafu { id })?
            .clone();
        edit.apply(&mut edited);
        ensure!(!edited.is_blank(), BlankRecordSnafu { id });
        self.store.update(id, |r| edit.apply(r))
    }

    pub fn set_status(&mut self, id: &str, status: Status) -> CanvassResult<&Record> {
        self.store.clear_persist_error();
        self.store.update(id, |r| r.status = status)
    }

    /// Sets the status from free text, with the same coercion as CSV input.
    pub fn set_status_text(&mut self, id: &str, raw: &str) -> CanvassResult<&Record> {
        self.set_status(id, coerce_status(raw))
    }

    /// Moves the record to the next status in display order.
    pub fn cycle_status(&mut self, id: &str) -> CanvassResult<&Record> {
        self.store.clear_persist_error();
        self.store.update(id, |r| r.status = r.status.next())
    }

    pub fn delete(&mut self, id: &str) -> CanvassResult<Record> {
        self.store.clear_persist_error();
        let removed = self.store.delete(id)?;
        info!("delete: {} ({} {})", removed.id, removed.last_name, removed.first_name);
        Ok(removed)
    }

    pub fn view(&self) -> View<'_> {
        derive_view(self.records(), self.view_state())
    }

    /// Options of the precinct filter.
    pub fn precincts(&self) -> Vec<String> {
        self.store.precincts()
    }

    pub fn export(&self, kind: ExportKind, now: &NaiveDateTime) -> ExportSet<'_> {
        let view = self.view();
        ExportSet {
            kind,
            file_name: export::file_name(kind, now),
            rows: export::select(kind, self.records(), &view.rows),
        }
    }

    /// The file name and the CSV content of an export.
    pub fn export_csv(&self, kind: ExportKind, now: &NaiveDateTime) -> CanvassResult<(String, String)> {
        let set = self.export(kind, now);
        let content = set.to_csv()?;
        Ok((set.file_name, content))
    }
}
