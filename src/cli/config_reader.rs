use std::fs;
use std::path::{Path, PathBuf};

use canvass_core::ViewState;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::args::Args;
use crate::cli::*;

pub const DEFAULT_STATE_DIR: &str = ".canvass";
pub const CONFIG_FILE_NAME: &str = "canvass.json";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvassConfig {
    #[serde(rename = "stateDirectory")]
    pub state_directory: Option<String>,
    #[serde(rename = "exportDirectory")]
    pub export_directory: Option<String>,
    #[serde(rename = "defaultPageSize")]
    pub default_page_size: Option<usize>,
}

/// The resolved settings of one invocation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub state_dir: PathBuf,
    pub export_dir: PathBuf,
    pub page_size: usize,
}

pub fn read_config(path: &Path) -> CliResult<CanvassConfig> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu { path: &path_s })?;
    let config: CanvassConfig =
        serde_json::from_str(&contents).context(ParsingConfigSnafu { path: &path_s })?;
    info!("read_config: {:?}", config);
    Ok(config)
}

// Relative paths of a configuration file are relative to the file itself.
fn relative_to(base: Option<&Path>, p: &str) -> PathBuf {
    match base {
        Some(b) if Path::new(p).is_relative() => b.join(p),
        _ => PathBuf::from(p),
    }
}

/// Combines the command line, the configuration file and the built-in defaults.
pub fn resolve_settings(args: &Args) -> CliResult<Settings> {
    let (config, config_path) = match &args.config {
        Some(p) => (read_config(Path::new(p))?, Some(PathBuf::from(p))),
        None => {
            let dir = args.state_dir.as_deref().unwrap_or(DEFAULT_STATE_DIR);
            let p = Path::new(dir).join(CONFIG_FILE_NAME);
            if p.is_file() {
                (read_config(&p)?, Some(p))
            } else {
                debug!("resolve_settings: no configuration at {:?}", p);
                (CanvassConfig::default(), None)
            }
        }
    };
    let base = config_path.as_deref().and_then(|p| p.parent());

    let state_dir = match (&args.state_dir, &config.state_directory) {
        (Some(d), _) => PathBuf::from(d),
        (None, Some(d)) => relative_to(base, d),
        (None, None) => PathBuf::from(DEFAULT_STATE_DIR),
    };
    let export_dir = match &config.export_directory {
        Some(d) => relative_to(base, d),
        None => PathBuf::from("."),
    };
    let page_size = config
        .default_page_size
        .unwrap_or(ViewState::DEFAULT_PAGE_SIZE)
        .max(1);
    Ok(Settings {
        state_dir,
        export_dir,
        page_size,
    })
}
