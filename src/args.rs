use canvass_core::RecordEdit;
use clap::{Parser, Subcommand};

/// Tracker for door-to-door canvassing lists.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. If not given, canvass.json in the state
    /// directory is read when it exists. See the manual of canvass_core for the keys.
    #[clap(short, long, global = true, value_parser)]
    pub config: Option<String>,

    /// (directory, default .canvass) Where the records and the view state are kept between runs.
    /// Setting this option overrides the stateDirectory value of the configuration.
    #[clap(long, global = true, value_parser)]
    pub state_dir: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, global = true, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Replaces all the records with the content of a CSV file.
    Import {
        #[clap(value_parser)]
        file: String,
    },
    /// Prints the current page.
    List {
        /// Goes to this page first.
        #[clap(long, value_parser)]
        page: Option<usize>,
    },
    /// Sets the precinct filter and/or the search query. An empty value clears it.
    Filter {
        #[clap(long, value_parser)]
        precinct: Option<String>,
        #[clap(long, value_parser)]
        search: Option<String>,
    },
    ClearFilters,
    /// Sorts on a column (lastName, firstName, precinct, address, email, phone, remark, status).
    Sort {
        #[clap(value_parser)]
        column: String,
        #[clap(long, takes_value = false, conflicts_with = "ascending")]
        descending: bool,
        #[clap(long, takes_value = false)]
        ascending: bool,
    },
    /// Changes the number of rows per page.
    PageSize {
        #[clap(value_parser)]
        size: usize,
    },
    Next,
    Prev,
    Goto {
        #[clap(value_parser)]
        page: usize,
    },
    /// Lists the precincts found in the records.
    Precincts,
    /// Sets the status of a record. Accepts the canonical names and the usual campaign
    /// vocabulary (Favorable, Indécis, Opposé, ...).
    Status {
        #[clap(value_parser)]
        id: String,
        #[clap(value_parser)]
        status: String,
    },
    /// Moves a record to the next status.
    Cycle {
        #[clap(value_parser)]
        id: String,
    },
    /// Changes the text fields of a record.
    Edit {
        #[clap(value_parser)]
        id: String,
        #[clap(flatten)]
        fields: EditFields,
    },
    Delete {
        #[clap(value_parser)]
        id: String,
    },
    /// Writes an export file (full, view, favorable or favorable-undecided) and prints its path.
    Export {
        #[clap(value_parser)]
        kind: String,
        /// Overrides the exportDirectory of the configuration.
        #[clap(long, value_parser)]
        out_dir: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct EditFields {
    #[clap(long, value_parser)]
    pub last_name: Option<String>,
    #[clap(long, value_parser)]
    pub first_name: Option<String>,
    #[clap(long, value_parser)]
    pub precinct: Option<String>,
    #[clap(long, value_parser)]
    pub address: Option<String>,
    #[clap(long, value_parser)]
    pub email: Option<String>,
    #[clap(long, value_parser)]
    pub phone: Option<String>,
    #[clap(long, value_parser)]
    pub remark: Option<String>,
}

impl EditFields {
    pub fn to_edit(&self) -> RecordEdit {
        RecordEdit {
            last_name: self.last_name.clone(),
            first_name: self.first_name.clone(),
            precinct: self.precinct.clone(),
            address: self.address.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            remark: self.remark.clone(),
        }
    }
}
