pub mod config_reader;
pub mod file_store;
pub mod io_csv;
pub mod render;

use std::io::Write;
use std::path::{Path, PathBuf};

use canvass_core::*;
use log::{debug, info, warn};
use snafu::{prelude::*, Snafu};

use crate::args::{Args, Command};
use crate::cli::config_reader::resolve_settings;
use crate::cli::file_store::FileStore;
use crate::cli::io_csv::{read_input, write_export};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Error opening configuration file {path}: {source}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing configuration file {path}: {source}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error reading input file {path}: {source}"))]
    ReadingInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing export file {path}: {source}"))]
    WritingExport {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error creating directory {path}: {source}"))]
    CreatingDirectory {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing to the output: {source}"))]
    WritingOutput { source: std::io::Error },
    #[snafu(display("Unknown column {name:?}, expected one of: {expected}"))]
    UnknownSortColumn { name: String, expected: String },
    #[snafu(display("Unknown export {name:?}, expected one of: {expected}"))]
    UnknownExportKind { name: String, expected: String },
    #[snafu(display("{source}"))]
    Tracker { source: CanvassError },
}

impl CliError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CliError::Tracker { source } if source.is_not_found())
    }
}

pub type CliResult<T> = Result<T, CliError>;

fn sort_column(name: &str) -> CliResult<SortColumn> {
    SortColumn::from_name(name).context(UnknownSortColumnSnafu {
        name,
        expected: "lastName, firstName, precinct, address, email, phone, remark, status",
    })
}

fn export_kind(name: &str) -> CliResult<ExportKind> {
    let expected: Vec<&str> = ExportKind::ALL.iter().map(|k| k.name()).collect();
    ExportKind::from_name(name).context(UnknownExportKindSnafu {
        name,
        expected: expected.join(", "),
    })
}

fn print_record<W: Write>(out: &mut W, r: &Record) -> CliResult<()> {
    writeln!(
        out,
        "{} {} {} [{}] {}",
        r.id,
        r.last_name,
        r.first_name,
        r.status.label(),
        r.remark
    )
    .context(WritingOutputSnafu {})
}

/// Runs one command against the state kept in the state directory.
pub fn run<W: Write>(args: &Args, out: &mut W) -> CliResult<()> {
    let settings = resolve_settings(args)?;
    debug!("run: settings: {:?}", settings);
    let kv = FileStore::open(&settings.state_dir)?;
    debug!("run: state directory {:?}", kv.dir());
    let mut tracker =
        Tracker::open_with_defaults(kv, ViewState::with_page_size(settings.page_size));

    match &args.command {
        Command::Import { file } => {
            let text = read_input(Path::new(file))?;
            let summary = tracker.import(&text).context(TrackerSnafu {})?;
            info!("run: imported {} records from {}", summary.record_count, file);
            writeln!(
                out,
                "Imported {} records ({} blank rows skipped)",
                summary.record_count, summary.discarded
            )
            .context(WritingOutputSnafu {})?;
        }
        Command::List { page } => {
            if let Some(p) = page {
                tracker.apply_page(*p);
            }
            render::write_page(out, &tracker.view())?;
        }
        Command::Filter { precinct, search } => {
            tracker.apply_filter(precinct.as_deref(), search.as_deref());
            render::write_page(out, &tracker.view())?;
        }
        Command::ClearFilters => {
            tracker.clear_filters();
            render::write_page(out, &tracker.view())?;
        }
        Command::Sort {
            column,
            descending,
            ascending,
        } => {
            let col = sort_column(column)?;
            let direction = if *descending {
                Some(SortDirection::Descending)
            } else if *ascending {
                Some(SortDirection::Ascending)
            } else {
                None
            };
            tracker.apply_sort(col, direction);
            render::write_page(out, &tracker.view())?;
        }
        Command::PageSize { size } => {
            tracker.apply_page_size(*size);
            render::write_page(out, &tracker.view())?;
        }
        Command::Next => {
            tracker.next_page();
            render::write_page(out, &tracker.view())?;
        }
        Command::Prev => {
            tracker.prev_page();
            render::write_page(out, &tracker.view())?;
        }
        Command::Goto { page } => {
            tracker.apply_page(*page);
            render::write_page(out, &tracker.view())?;
        }
        Command::Precincts => {
            for p in tracker.precincts() {
                writeln!(out, "{}", p).context(WritingOutputSnafu {})?;
            }
        }
        Command::Status { id, status } => {
            let r = tracker.set_status_text(id, status).context(TrackerSnafu {})?;
            print_record(out, r)?;
        }
        Command::Cycle { id } => {
            let r = tracker.cycle_status(id).context(TrackerSnafu {})?;
            print_record(out, r)?;
        }
        Command::Edit { id, fields } => {
            let edit = fields.to_edit();
            if edit.is_empty() {
                warn!("run: edit {}: no field given", id);
            }
            let r = tracker.edit(id, &edit).context(TrackerSnafu {})?;
            print_record(out, r)?;
        }
        Command::Delete { id } => {
            let r = tracker.delete(id).context(TrackerSnafu {})?;
            writeln!(out, "Deleted {} {} {}", r.id, r.last_name, r.first_name)
                .context(WritingOutputSnafu {})?;
        }
        Command::Export { kind, out_dir } => {
            let kind = export_kind(kind)?;
            let now = chrono::Local::now().naive_local();
            let (file_name, content) = tracker.export_csv(kind, &now).context(TrackerSnafu {})?;
            let dir = match out_dir {
                Some(d) => PathBuf::from(d),
                None => settings.export_dir.clone(),
            };
            let path = write_export(&dir, &file_name, &content)?;
            writeln!(out, "{}", path.display()).context(WritingOutputSnafu {})?;
        }
    }

    if let Some(e) = tracker.last_persist_error() {
        warn!("run: state not saved: {}", e);
        writeln!(out, "Warning: the changes could not be saved: {}", e)
            .context(WritingOutputSnafu {})?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    const INPUT: &str = "Nom;Prénom;Bureau;Adresse;Téléphone;Statut\n\
        Dupont;Jean;101;1 rue A;0601;Favorable\n\
        Martin;Luc;102;2 rue B;;Indécis\n\
        Durand;Anne;101;3 rue C;;\n";

    struct Session {
        dir: tempfile::TempDir,
    }

    impl Session {
        fn new() -> Session {
            let _ = env_logger::builder().is_test(true).try_init();
            Session {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn state_dir(&self) -> String {
            self.dir.path().join("state").display().to_string()
        }

        fn run(&self, cmd: &[&str]) -> CliResult<String> {
            let state_dir = self.state_dir();
            let mut argv = vec!["canvass", "--state-dir", state_dir.as_str()];
            argv.extend_from_slice(cmd);
            let args = Args::parse_from(argv);
            let mut out: Vec<u8> = Vec::new();
            run(&args, &mut out)?;
            Ok(String::from_utf8(out).unwrap())
        }

        fn import(&self) {
            let input = self.dir.path().join("voters.csv");
            fs::write(&input, INPUT).unwrap();
            let out = self.run(&["import", input.to_str().unwrap()]).unwrap();
            assert_eq!(out, "Imported 3 records (0 blank rows skipped)\n");
        }

        fn id_of(&self, last_name: &str) -> String {
            let tracker = Tracker::open(FileStore::open(self.state_dir()).unwrap());
            tracker
                .records()
                .iter()
                .find(|r| r.last_name == last_name)
                .unwrap()
                .id
                .clone()
        }
    }

    #[test]
    fn import_then_list_across_invocations() {
        let s = Session::new();
        s.import();
        let out = s.run(&["list"]).unwrap();
        assert!(out.contains("Dupont"));
        assert!(out.contains("Page 1 / 1 - 3 rows"));

        let out = s.run(&["filter", "--search", "JEAN"]).unwrap();
        assert!(out.contains("Dupont"));
        assert!(!out.contains("Martin"));

        // The filter is remembered by the next invocation.
        let out = s.run(&["list"]).unwrap();
        assert!(out.contains("Page 1 / 1 - 1 rows"));

        let out = s.run(&["clear-filters"]).unwrap();
        assert!(out.contains("3 rows"));
    }

    #[test]
    fn paging_commands() {
        let s = Session::new();
        s.import();
        s.run(&["page-size", "1"]).unwrap();
        assert!(s.run(&["next"]).unwrap().contains("Page 2 / 3"));
        assert!(s.run(&["goto", "9"]).unwrap().contains("Page 3 / 3"));
        assert!(s.run(&["prev"]).unwrap().contains("Page 2 / 3"));
        assert!(s.run(&["list", "--page", "1"]).unwrap().contains("Page 1 / 3"));
    }

    #[test]
    fn sort_and_precincts() {
        let s = Session::new();
        s.import();
        let out = s.run(&["sort", "Prénom", "--descending"]).unwrap();
        let luc = out.find("Luc").unwrap();
        let anne = out.find("Anne").unwrap();
        assert!(luc < anne);

        assert!(matches!(
            s.run(&["sort", "shoe size"]),
            Err(CliError::UnknownSortColumn { .. })
        ));
        assert_eq!(s.run(&["precincts"]).unwrap(), "101\n102\n");
    }

    #[test]
    fn annotate_and_delete() {
        let s = Session::new();
        s.import();
        let id = s.id_of("Durand");

        let out = s.run(&["status", &id, "absente"]).unwrap();
        assert!(out.contains("[Absent]"));
        let out = s.run(&["cycle", &id]).unwrap();
        assert!(out.contains("[Not contacted]"));
        let out = s
            .run(&["edit", &id, "--remark", "revenir samedi", "--phone", "0699"])
            .unwrap();
        assert!(out.contains("revenir samedi"));

        let out = s.run(&["delete", &id]).unwrap();
        assert!(out.starts_with("Deleted"));
        assert_eq!(s.run(&["precincts"]).unwrap(), "101\n102\n");

        let err = s.run(&["delete", &id]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn export_writes_timestamped_file() {
        let s = Session::new();
        s.import();
        let out_dir = s.dir.path().join("exports");
        let out = s
            .run(&["export", "favorable-undecided", "--out-dir", out_dir.to_str().unwrap()])
            .unwrap();
        let path = PathBuf::from(out.trim());
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("favorable_undecided_"));
        assert!(name.ends_with(".csv"));

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("last_name,first_name,precinct,address,email,phone,remark,status,id")
        );
        assert_eq!(lines.count(), 2);

        assert!(matches!(
            s.run(&["export", "everything"]),
            Err(CliError::UnknownExportKind { .. })
        ));
    }

    #[test]
    fn missing_input_is_reported() {
        let s = Session::new();
        let err = s.run(&["import", "/nonexistent/voters.csv"]).unwrap_err();
        assert!(matches!(err, CliError::ReadingInput { .. }));
        assert!(!err.is_not_found());
    }
}
