//! Configuration loading and view bootstrapping.
//!
//! Settings are merged from three sources, later ones winning: built-in
//! defaults, a TOML file (either an explicit path or the per-user default
//! location), and `LECTERN_`-prefixed environment variables.
//!
//! This crate also owns first-run bootstrapping: when the metadata store
//! has no views yet, [`bootstrap_views`] seeds it from the configured view
//! list, or with the single [`DEFAULT_VIEW_FORMAT`] view if none are
//! configured.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use lectern_metadata::{Charset, EscapeMode, MetadataStore, View};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Naming template of the view created on first run.
pub const DEFAULT_VIEW_FORMAT: &str = "{course} ({type})/{path}/{name}.{ext}";

/// Top-level settings, merged from defaults, file and environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The sync root. Required: there is no sensible default directory to
    /// start scattering hardlinks into.
    pub sync_dir: Option<PathBuf>,
    /// Server-side name of a course's default folder, stripped by the
    /// `short-path` template token when it leads a file's path.
    pub general_folder: String,
    /// Views to seed the metadata store with on first run.
    pub views: Vec<ViewConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sync_dir: None,
            general_folder: "Allgemeiner Dateiordner".to_string(),
            views: Vec::new(),
        }
    }
}

/// One view as written in the configuration file; identical to [`View`]
/// minus the store-assigned id, with the same defaults as the first-run
/// view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    pub name: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_escape")]
    pub escape: EscapeMode,
    #[serde(default = "default_charset")]
    pub charset: Charset,
    #[serde(default)]
    pub base: Option<String>,
}

fn default_format() -> String {
    DEFAULT_VIEW_FORMAT.to_string()
}

fn default_escape() -> EscapeMode {
    EscapeMode::Similar
}

fn default_charset() -> Charset {
    Charset::Unicode
}

impl ViewConfig {
    fn into_view(self, id: i64) -> View {
        View {
            id,
            name: self.name,
            format: self.format,
            escape: self.escape,
            charset: self.charset,
            base: self.base,
        }
    }
}

impl Settings {
    /// Loads settings, merging defaults, the TOML file and `LECTERN_`
    /// environment variables (later sources win).
    ///
    /// With no explicit `file`, the per-user default location is consulted;
    /// a missing file at either location is simply an empty source.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = file.map(Path::to_path_buf).or_else(default_config_path);
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = &file {
            figment = figment.merge(Toml::file(file));
        }
        let settings: Self = figment
            .merge(Env::prefixed("LECTERN_"))
            .extract()
            .map_err(ErrorKind::Extract)?;
        tracing::debug!(file = ?file, "loaded configuration");
        Ok(settings)
    }

    /// The configured sync root.
    pub fn sync_dir(&self) -> Result<&Path> {
        match &self.sync_dir {
            Some(dir) => Ok(dir),
            None => Err(ErrorKind::Missing("sync_dir"))?,
        }
    }
}

/// Per-user default configuration file location
/// (`$XDG_CONFIG_HOME/lectern/config.toml` or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "lectern").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Seeds the metadata store with views on first run and commits.
///
/// A store that already has views is left untouched. Otherwise the
/// configured views are added, or a single view named `default` using
/// [`DEFAULT_VIEW_FORMAT`] when the configuration names none. Returns the
/// stored view list either way.
#[instrument(skip_all)]
pub fn bootstrap_views<S: MetadataStore>(store: &S, settings: &Settings) -> Result<Vec<View>> {
    let existing = store.list_views().or_raise(|| ErrorKind::Metadata)?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    if settings.views.is_empty() {
        tracing::info!("no views configured; creating the default view");
        let default = ViewConfig {
            name: "default".to_string(),
            format: default_format(),
            escape: default_escape(),
            charset: default_charset(),
            base: None,
        };
        store.add_view(default.into_view(1)).or_raise(|| ErrorKind::Metadata)?;
    } else {
        for (index, config) in settings.views.iter().cloned().enumerate() {
            store
                .add_view(config.into_view(index as i64 + 1))
                .or_raise(|| ErrorKind::Metadata)?;
        }
    }
    store.commit().or_raise(|| ErrorKind::Metadata)?;
    store.list_views().or_raise(|| ErrorKind::Metadata)
}
