// ********* Records ***********

use std::cmp::Ordering;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::normalizer::coerce_status;

/// The outcome of a visit.
///
/// The declaration order is the display order and the cycling order.
/// Deserialization goes through the same coercion rules as CSV input, so a stored
/// value that is not a canonical name never fails to load.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Status {
    Favorable,
    Undecided,
    Unfavorable,
    Absent,
    #[default]
    NotContacted,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Favorable,
        Status::Undecided,
        Status::Unfavorable,
        Status::Absent,
        Status::NotContacted,
    ];

    /// The canonical name, as written in exports and in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Favorable => "favorable",
            Status::Undecided => "undecided",
            Status::Unfavorable => "unfavorable",
            Status::Absent => "absent",
            Status::NotContacted => "not_contacted",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Favorable => "Favorable",
            Status::Undecided => "Undecided",
            Status::Unfavorable => "Unfavorable",
            Status::Absent => "Absent",
            Status::NotContacted => "Not contacted",
        }
    }

    /// Exact match on a canonical name.
    pub fn from_canonical(name: &str) -> Option<Status> {
        Status::ALL.iter().copied().find(|s| s.as_str() == name)
    }

    /// The next status in display order, wrapping around.
    pub fn next(self) -> Status {
        let idx = Status::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Status::ALL[(idx + 1) % Status::ALL.len()]
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Status {
        coerce_status(&raw)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One contacted person.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(default)]
    pub precinct: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub status: Status,
}

impl Record {
    /// The text a column sorts on.
    pub fn field(&self, column: SortColumn) -> &str {
        match column {
            SortColumn::LastName => &self.last_name,
            SortColumn::FirstName => &self.first_name,
            SortColumn::Precinct => &self.precinct,
            SortColumn::Address => &self.address,
            SortColumn::Email => &self.email,
            SortColumn::Phone => &self.phone,
            SortColumn::Remark => &self.remark,
            SortColumn::Status => self.status.as_str(),
        }
    }

    /// `"<lastName> <firstName>"`, the tiebreak key of every sort.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// Lower-cased text matched by the search box.
    pub fn search_text(&self) -> String {
        [
            &self.last_name,
            &self.first_name,
            &self.address,
            &self.email,
            &self.phone,
            &self.remark,
        ]
        .iter()
        .map(|s| s.to_lowercase())
        .collect::<Vec<String>>()
        .join(" ")
    }

    /// True for rows that carry no identity at all (typically blank trailing lines).
    pub fn is_blank(&self) -> bool {
        self.last_name.is_empty() && self.first_name.is_empty() && self.address.is_empty()
    }
}

/// A partial update of the free-text fields of a record.
///
/// Fields left to `None` are not touched. Values are trimmed when applied.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RecordEdit {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub precinct: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub remark: Option<String>,
}

impl RecordEdit {
    pub fn is_empty(&self) -> bool {
        *self == RecordEdit::default()
    }

    pub fn apply(&self, record: &mut Record) {
        let pairs = [
            (&self.last_name, &mut record.last_name),
            (&self.first_name, &mut record.first_name),
            (&self.precinct, &mut record.precinct),
            (&self.address, &mut record.address),
            (&self.email, &mut record.email),
            (&self.phone, &mut record.phone),
            (&self.remark, &mut record.remark),
        ];
        for (update, field) in pairs {
            if let Some(value) = update {
                *field = value.trim().to_string();
            }
        }
    }
}

// ********* View state **********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SortColumn {
    #[serde(rename = "lastName")]
    LastName,
    #[serde(rename = "firstName")]
    FirstName,
    #[serde(rename = "precinct")]
    Precinct,
    #[serde(rename = "address")]
    Address,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "phone")]
    Phone,
    #[serde(rename = "remark")]
    Remark,
    #[serde(rename = "status")]
    Status,
}

impl SortColumn {
    /// Resolves a user-provided column name. Accepts anything the CSV header mapping accepts
    /// for the same field (`"Prénom"`, `"first_name"`, `"firstName"`, ...).
    pub fn from_name(name: &str) -> Option<SortColumn> {
        use crate::field_mapper::{aliases, canonical_key};
        let key = canonical_key(name);
        let table: [(&[&str], SortColumn); 8] = [
            (aliases::LAST_NAME, SortColumn::LastName),
            (aliases::FIRST_NAME, SortColumn::FirstName),
            (aliases::PRECINCT, SortColumn::Precinct),
            (aliases::ADDRESS, SortColumn::Address),
            (aliases::EMAIL, SortColumn::Email),
            (aliases::PHONE, SortColumn::Phone),
            (aliases::REMARK, SortColumn::Remark),
            (aliases::STATUS, SortColumn::Status),
        ];
        table
            .iter()
            .find(|(names, _)| names.contains(&key.as_str()))
            .map(|(_, col)| *col)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> SortDirection {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

/// Filter, sort and pagination settings of the session.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ViewState {
    /// Exact precinct to keep. Empty means no filter.
    #[serde(rename = "precinctFilter")]
    pub precinct_filter: String,
    /// Free text searched in names, address, contact fields and remark. Empty means no filter.
    #[serde(rename = "searchQuery")]
    pub search_query: String,
    #[serde(rename = "sortColumn")]
    pub sort_column: SortColumn,
    #[serde(rename = "sortDirection")]
    pub sort_direction: SortDirection,
    /// 1-based. May be out of range: the view engine clamps it.
    #[serde(rename = "pageNumber")]
    pub page_number: usize,
    #[serde(rename = "pageSize")]
    pub page_size: usize,
}

impl ViewState {
    pub const DEFAULT_PAGE_SIZE: usize = 1000;

    pub fn with_page_size(page_size: usize) -> ViewState {
        ViewState {
            page_size: page_size.max(1),
            ..ViewState::default()
        }
    }

    /// Raises the page number and the page size to their minimum of 1.
    pub fn sanitized(mut self) -> ViewState {
        self.page_number = self.page_number.max(1);
        self.page_size = self.page_size.max(1);
        self
    }
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            precinct_filter: String::new(),
            search_query: String::new(),
            sort_column: SortColumn::LastName,
            sort_direction: SortDirection::Ascending,
            page_number: 1,
            page_size: ViewState::DEFAULT_PAGE_SIZE,
        }
    }
}

/// A partial update of the view state, as produced by one user interaction.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ViewStatePatch {
    pub precinct_filter: Option<String>,
    pub search_query: Option<String>,
    pub sort_column: Option<SortColumn>,
    pub sort_direction: Option<SortDirection>,
    pub page_number: Option<usize>,
    pub page_size: Option<usize>,
}

impl ViewStatePatch {
    pub fn apply(&self, state: &mut ViewState) {
        if let Some(p) = &self.precinct_filter {
            state.precinct_filter = p.clone();
        }
        if let Some(q) = &self.search_query {
            state.search_query = q.clone();
        }
        if let Some(c) = self.sort_column {
            state.sort_column = c;
        }
        if let Some(d) = self.sort_direction {
            state.sort_direction = d;
        }
        if let Some(n) = self.page_number {
            state.page_number = n.max(1);
        }
        if let Some(n) = self.page_size {
            state.page_size = n.max(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_cycles_in_display_order() {
        assert_eq!(Status::Favorable.next(), Status::Undecided);
        assert_eq!(Status::Absent.next(), Status::NotContacted);
        assert_eq!(Status::NotContacted.next(), Status::Favorable);
    }

    #[test]
    fn status_serializes_to_canonical_name() {
        let js = serde_json::to_string(&Status::NotContacted).unwrap();
        assert_eq!(js, "\"not_contacted\"");
        let back: Status = serde_json::from_str(&js).unwrap();
        assert_eq!(back, Status::NotContacted);
    }

    #[test]
    fn stored_status_is_coerced() {
        let s: Status = serde_json::from_str("\"Défavorable\"").unwrap();
        assert_eq!(s, Status::Unfavorable);
        let s: Status = serde_json::from_str("\"whatever\"").unwrap();
        assert_eq!(s, Status::NotContacted);
    }

    #[test]
    fn record_reads_with_missing_fields() {
        let r: Record = serde_json::from_str(r#"{"id":"a","lastName":"Martin"}"#).unwrap();
        assert_eq!(r.last_name, "Martin");
        assert_eq!(r.first_name, "");
        assert_eq!(r.status, Status::NotContacted);
    }

    #[test]
    fn edit_only_touches_given_fields() {
        let mut r = Record {
            id: "x".to_string(),
            last_name: "Durand".to_string(),
            remark: "old".to_string(),
            ..Record::default()
        };
        let edit = RecordEdit {
            remark: Some("  call back after 6pm ".to_string()),
            ..RecordEdit::default()
        };
        edit.apply(&mut r);
        assert_eq!(r.remark, "call back after 6pm");
        assert_eq!(r.last_name, "Durand");
        assert!(RecordEdit::default().is_empty());
    }

    #[test]
    fn sort_column_from_header_names() {
        assert_eq!(SortColumn::from_name("Prénom"), Some(SortColumn::FirstName));
        assert_eq!(SortColumn::from_name("last_name"), Some(SortColumn::LastName));
        assert_eq!(SortColumn::from_name("Bureau de vote"), Some(SortColumn::Precinct));
        assert_eq!(SortColumn::from_name("statut"), Some(SortColumn::Status));
        assert_eq!(SortColumn::from_name("shoe size"), None);
    }

    #[test]
    fn patch_keeps_page_values_positive() {
        let mut state = ViewState::default();
        ViewStatePatch {
            page_number: Some(0),
            page_size: Some(0),
            search_query: Some("dupont".to_string()),
            ..ViewStatePatch::default()
        }
        .apply(&mut state);
        assert_eq!(state.page_number, 1);
        assert_eq!(state.page_size, 1);
        assert_eq!(state.search_query, "dupont");
        assert_eq!(state.sort_column, SortColumn::LastName);
    }
}
