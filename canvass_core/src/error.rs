use snafu::Snafu;

/// Errors reported by the key-value collaborator.
pub type KvError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CanvassError {
    #[snafu(display("Could not parse the CSV input: {source}"))]
    CsvParse { source: csv::Error },
    #[snafu(display("The CSV input has no header row"))]
    MissingHeader {},

    #[snafu(display("Stored value under {key} is malformed: {source}"))]
    PersistenceRead {
        key: String,
        source: serde_json::Error,
    },
    #[snafu(display("Could not read {key} from storage: {source}"))]
    PersistenceAccess { key: String, source: KvError },
    #[snafu(display("Could not encode {key} for storage: {source}"))]
    PersistenceEncode {
        key: String,
        source: serde_json::Error,
    },
    #[snafu(display("Could not write {key} to storage: {source}"))]
    PersistenceWrite { key: String, source: KvError },

    #[snafu(display("No record with id {id}"))]
    RecordNotFound { id: String },
    #[snafu(display("Record {id} would have no last name, first name nor address"))]
    BlankRecord { id: String },

    #[snafu(display("Could not write the CSV export: {source}"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("Could not flush the CSV export: {source}"))]
    CsvFlush { source: std::io::Error },
    #[snafu(display("The CSV export is not valid UTF-8: {source}"))]
    CsvEncoding { source: std::string::FromUtf8Error },
}

impl CanvassError {
    /// Unknown ids are reported but leave the state untouched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CanvassError::RecordNotFound { .. })
    }
}

pub type CanvassResult<T> = Result<T, CanvassError>;
