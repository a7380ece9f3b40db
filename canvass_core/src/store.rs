// The record collection and the view state, persisted after every change.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::error::*;
use crate::normalizer::new_record_id;
use crate::view::compare_text;
use crate::{Record, ViewState, ViewStatePatch};

pub const RECORDS_KEY: &str = "canvass-records-v1";
pub const VIEW_KEY: &str = "canvass-view-v1";

/// The external key-value collaborator holding the serialized state.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError>;
}

/// An in-memory key-value store.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> MemoryStore {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn entry(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn read_key<K: KeyValueStore>(kv: &K, key: &str) -> CanvassResult<Option<String>> {
    kv.get(key).context(PersistenceAccessSnafu { key })
}

fn load_records<K: KeyValueStore>(kv: &K) -> CanvassResult<Vec<Record>> {
    let raw = match read_key(kv, RECORDS_KEY)? {
        Some(s) => s,
        None => return Ok(Vec::new()),
    };
    let mut records: Vec<Record> =
        serde_json::from_str(&raw).context(PersistenceReadSnafu { key: RECORDS_KEY })?;

    // Stored data may have been edited by hand: enforce the id invariant again.
    let mut seen: HashSet<String> = HashSet::new();
    for r in records.iter_mut() {
        if r.id.is_empty() || seen.contains(&r.id) {
            let fresh = new_record_id();
            warn!("load_records: invalid or duplicate id {:?}, replaced by {:?}", r.id, fresh);
            r.id = fresh;
        }
        seen.insert(r.id.clone());
    }
    Ok(records)
}

/// Reads the stored view state, merged over `defaults` key by key.
fn load_view<K: KeyValueStore>(kv: &K, defaults: &ViewState) -> CanvassResult<ViewState> {
    let raw = match read_key(kv, VIEW_KEY)? {
        Some(s) => s,
        None => return Ok(defaults.clone()),
    };
    let stored: JSValue = serde_json::from_str(&raw).context(PersistenceReadSnafu { key: VIEW_KEY })?;
    let mut merged: JSValue =
        serde_json::to_value(defaults).context(PersistenceEncodeSnafu { key: VIEW_KEY })?;
    if let (Some(target), JSValue::Object(source)) = (merged.as_object_mut(), stored) {
        for (k, v) in source {
            target.insert(k, v);
        }
    }
    let view: ViewState =
        serde_json::from_value(merged).context(PersistenceReadSnafu { key: VIEW_KEY })?;
    Ok(view.sanitized())
}

/// Owns the records and the view state.
///
/// Every mutation writes the affected key back to the key-value collaborator before returning.
/// A failed write is logged and kept in [`Store::last_persist_error`] until
/// [`Store::clear_persist_error`]; the in-memory change stays.
pub struct Store<K: KeyValueStore> {
    kv: K,
    records: Vec<Record>,
    view: ViewState,
    last_persist_error: Option<CanvassError>,
}

impl<K: KeyValueStore> Store<K> {
    /// Loads the stored state. Unreadable or malformed entries fall back to the defaults.
    pub fn open(kv: K, defaults: ViewState) -> Store<K> {
        let records = match load_records(&kv) {
            Ok(r) => r,
            Err(e) => {
                warn!("Store::open: discarding stored records: {}", e);
                Vec::new()
            }
        };
        let view = match load_view(&kv, &defaults) {
            Ok(v) => v,
            Err(e) => {
                warn!("Store::open: discarding stored view state: {}", e);
                defaults.sanitized()
            }
        };
        info!("Store::open: {} records", records.len());
        Store {
            kv,
            records,
            view,
            last_persist_error: None,
        }
    }

    fn write_key(&mut self, key: &str, value: CanvassResult<String>) {
        let res = value.and_then(|s| self.kv.set(key, &s).context(PersistenceWriteSnafu { key }));
        match res {
            Ok(()) => {
                debug!("Store: persisted {}", key);
            }
            Err(e) => {
                warn!("Store: {}", e);
                self.last_persist_error = Some(e);
            }
        }
    }

    fn persist_records(&mut self) {
        let value =
            serde_json::to_string(&self.records).context(PersistenceEncodeSnafu { key: RECORDS_KEY });
        self.write_key(RECORDS_KEY, value);
    }

    fn persist_view(&mut self) {
        let value = serde_json::to_string(&self.view).context(PersistenceEncodeSnafu { key: VIEW_KEY });
        self.write_key(VIEW_KEY, value);
    }

    /// Replaces the whole collection.
    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.records = records;
        self.persist_records();
    }

    /// Replaces the record with the same id, or appends it. An empty id gets a fresh one.
    pub fn upsert(&mut self, mut record: Record) {
        if record.id.is_empty() {
            record.id = new_record_id();
        }
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        self.persist_records();
    }

    /// Applies `f` to the record with the given id.
    pub fn update<F>(&mut self, id: &str, f: F) -> CanvassResult<&Record>
    where
        F: FnOnce(&mut Record),
    {
        let idx = self
            .records
            .iter()
            .position(|r| r.id == id)
            .context(RecordNotFoundSnafu { id })?;
        f(&mut self.records[idx]);
        // The id is the record's identity and must survive any edit.
        if self.records[idx].id != id {
            self.records[idx].id = id.to_string();
        }
        self.persist_records();
        Ok(&self.records[idx])
    }

    pub fn delete(&mut self, id: &str) -> CanvassResult<Record> {
        let idx = self
            .records
            .iter()
            .position(|r| r.id == id)
            .context(RecordNotFoundSnafu { id })?;
        let removed = self.records.remove(idx);
        self.persist_records();
        Ok(removed)
    }

    pub fn get_all(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn set_view_state(&mut self, patch: &ViewStatePatch) {
        patch.apply(&mut self.view);
        self.persist_view();
    }

    /// The distinct non-empty precincts of the current records, sorted.
    pub fn precincts(&self) -> Vec<String> {
        let mut res: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for r in self.records.iter() {
            if !r.precinct.is_empty() && seen.insert(r.precinct.as_str()) {
                res.push(r.precinct.clone());
            }
        }
        res.sort_by(|a, b| compare_text(a, b));
        res
    }

    /// The most recent failed write since the last call to [`Store::clear_persist_error`].
    /// Later successful writes do not reset it.
    pub fn last_persist_error(&self) -> Option<&CanvassError> {
        self.last_persist_error.as_ref()
    }

    pub fn clear_persist_error(&mut self) {
        self.last_persist_error = None;
    }

    pub fn backend(&self) -> &K {
        &self.kv
    }

    pub fn into_backend(self) -> K {
        self.kv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SortColumn, SortDirection, Status};

    fn rec(id: &str, last: &str, precinct: &str) -> Record {
        Record {
            id: id.to_string(),
            last_name: last.to_string(),
            precinct: precinct.to_string(),
            ..Record::default()
        }
    }

    /// Accepts reads, refuses every write.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
            Ok(None)
        }
        fn set(&mut self, key: &str, _value: &str) -> Result<(), KvError> {
            Err(format!("{} is read-only", key).into())
        }
    }

    #[test]
    fn empty_backend_gives_defaults() {
        let store = Store::open(MemoryStore::new(), ViewState::default());
        assert!(store.get_all().is_empty());
        assert_eq!(*store.view_state(), ViewState::default());
    }

    #[test]
    fn mutations_are_persisted_before_returning() {
        let mut store = Store::open(MemoryStore::new(), ViewState::default());
        store.replace_all(vec![rec("1", "Dupont", "101")]);
        let saved = store.backend().entry(RECORDS_KEY).unwrap().to_string();
        assert!(saved.contains("Dupont"));

        store.update("1", |r| r.status = Status::Favorable).unwrap();
        assert!(store.backend().entry(RECORDS_KEY).unwrap().contains("\"favorable\""));

        store.set_view_state(&ViewStatePatch {
            search_query: Some("dup".to_string()),
            ..ViewStatePatch::default()
        });
        assert!(store.backend().entry(VIEW_KEY).unwrap().contains("\"searchQuery\":\"dup\""));

        // Reopening sees everything.
        let reopened = Store::open(store.into_backend(), ViewState::default());
        assert_eq!(reopened.get("1").unwrap().status, Status::Favorable);
        assert_eq!(reopened.view_state().search_query, "dup");
    }

    #[test]
    fn corrupt_records_fall_back_to_empty() {
        let kv = MemoryStore::new()
            .with_entry(RECORDS_KEY, "[{\"id\":")
            .with_entry(VIEW_KEY, r#"{"searchQuery":"kept"}"#);
        let store = Store::open(kv, ViewState::default());
        assert!(store.get_all().is_empty());
        assert_eq!(store.view_state().search_query, "kept");
    }

    #[test]
    fn corrupt_view_falls_back_to_defaults() {
        let kv = MemoryStore::new()
            .with_entry(RECORDS_KEY, r#"[{"id":"1","lastName":"Dupont"}]"#)
            .with_entry(VIEW_KEY, r#"{"sortColumn":"shoeSize"}"#);
        let defaults = ViewState::with_page_size(50);
        let store = Store::open(kv, defaults.clone());
        assert_eq!(store.get_all().len(), 1);
        assert_eq!(*store.view_state(), defaults);
    }

    #[test]
    fn partial_view_is_merged_over_defaults() {
        let kv = MemoryStore::new()
            .with_entry(VIEW_KEY, r#"{"sortDirection":"desc","pageNumber":0}"#);
        let store = Store::open(kv, ViewState::with_page_size(25));
        let view = store.view_state();
        assert_eq!(view.sort_direction, SortDirection::Descending);
        assert_eq!(view.sort_column, SortColumn::LastName);
        assert_eq!(view.page_size, 25);
        assert_eq!(view.page_number, 1);
    }

    #[test]
    fn duplicate_stored_ids_are_repaired() {
        let kv = MemoryStore::new().with_entry(
            RECORDS_KEY,
            r#"[{"id":"1","lastName":"A"},{"id":"1","lastName":"B"},{"id":"","lastName":"C"}]"#,
        );
        let store = Store::open(kv, ViewState::default());
        let ids: HashSet<&str> = store.get_all().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(store.get("1").unwrap().last_name, "A");
    }

    #[test]
    fn unknown_ids_leave_state_unchanged() {
        let mut store = Store::open(MemoryStore::new(), ViewState::default());
        store.replace_all(vec![rec("1", "Dupont", "101")]);
        let before = store.backend().clone();
        assert!(store.delete("nope").unwrap_err().is_not_found());
        assert!(store
            .update("nope", |r| r.remark = "x".to_string())
            .unwrap_err()
            .is_not_found());
        assert_eq!(*store.backend(), before);
        assert_eq!(store.get_all().len(), 1);
    }

    #[test]
    fn upsert_replaces_or_appends() {
        let mut store = Store::open(MemoryStore::new(), ViewState::default());
        store.upsert(rec("1", "Dupont", ""));
        store.upsert(rec("1", "Durand", ""));
        store.upsert(rec("", "Martin", ""));
        assert_eq!(store.get_all().len(), 2);
        assert_eq!(store.get("1").unwrap().last_name, "Durand");
        assert!(!store.get_all()[1].id.is_empty());
    }

    #[test]
    fn update_cannot_change_the_id() {
        let mut store = Store::open(MemoryStore::new(), ViewState::default());
        store.replace_all(vec![rec("1", "Dupont", "")]);
        let r = store.update("1", |r| r.id = "2".to_string()).unwrap();
        assert_eq!(r.id, "1");
    }

    #[test]
    fn precincts_follow_the_records() {
        let mut store = Store::open(MemoryStore::new(), ViewState::default());
        store.replace_all(vec![
            rec("1", "A", "BV 10"),
            rec("2", "B", "BV 2"),
            rec("3", "C", ""),
            rec("4", "D", "BV 2"),
        ]);
        assert_eq!(store.precincts(), vec!["BV 2", "BV 10"]);
        store.delete("1").unwrap();
        assert_eq!(store.precincts(), vec!["BV 2"]);
    }

    /// Refuses writes to the records key only.
    #[derive(Default)]
    struct NoRecordsStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for NoRecordsStore {
        fn get(&self, key: &str) -> Result<Option<String>, KvError> {
            self.inner.get(key)
        }
        fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
            if key == RECORDS_KEY {
                return Err("disk full".into());
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn failed_write_is_kept_after_later_successes() {
        let mut store = Store::open(NoRecordsStore::default(), ViewState::default());
        store.replace_all(vec![rec("1", "Dupont", "")]);
        store.set_view_state(&ViewStatePatch {
            page_number: Some(1),
            ..ViewStatePatch::default()
        });
        assert!(store.backend().inner.entry(VIEW_KEY).is_some());
        assert!(matches!(
            store.last_persist_error(),
            Some(CanvassError::PersistenceWrite { key, .. }) if key == RECORDS_KEY
        ));
        store.clear_persist_error();
        assert!(store.last_persist_error().is_none());
    }

    #[test]
    fn failed_writes_do_not_block_mutations() {
        let mut store = Store::open(ReadOnlyStore, ViewState::default());
        store.replace_all(vec![rec("1", "Dupont", "")]);
        assert_eq!(store.get_all().len(), 1);
        assert!(matches!(
            store.last_persist_error(),
            Some(CanvassError::PersistenceWrite { .. })
        ));
        store.delete("1").unwrap();
        assert!(store.get_all().is_empty());
    }
}
