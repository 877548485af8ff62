use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gateway::TableNames;

/// Configuration file read when no `--config` path is given
pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    /// Address the HTTP listener binds to, e.g. `127.0.0.1:3000`
    pub bind: String,

    /// How long a login stays valid, in seconds
    pub session_ttl_secs: u64,

    /// Send the session cookie only over HTTPS
    pub secure_cookies: bool,
}

impl Server {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Which backend holds the portal's tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A Google Sheets document, read with a service-account key
    Google,
    /// A local directory of `<title>.csv` files
    Csv,
}

/// `[source]` section
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    /// Backend selector
    pub kind: SourceKind,

    /// Document id from the spreadsheet URL (Google only)
    pub spreadsheet_id: String,

    /// Service-account key file, used when `GCP_SERVICE_ACCOUNT` is unset
    pub credentials_file: PathBuf,

    /// Root of the Sheets REST API; overridden in tests
    pub api_base: String,

    /// Directory holding the CSV exports (CSV only)
    pub csv_dir: PathBuf,
}

/// Complete portal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Listener and session options
    pub server: Server,

    /// Where the tables are read from
    pub source: Source,

    /// Sheet titles of the three tables
    pub tables: TableNames,
}

impl Settings {
    /// Defaults, then the TOML file, then `PORTAL__SECTION__KEY` variables.
    ///
    /// An explicit `path` must exist; the default file is optional.
    ///
    /// # Arguments
    /// * `path` - Configuration file given on the command line, if any
    ///
    /// # Returns
    /// * `Result<Settings, ConfigError>` - The merged settings, or why they could not be read
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE)
                .format(FileFormat::Toml)
                .required(false),
        };

        let tables = TableNames::default();
        let config = Config::builder()
            .set_default("server.bind", "127.0.0.1:3000")?
            .set_default("server.session_ttl_secs", 24 * 60 * 60_i64)?
            .set_default("server.secure_cookies", true)?
            .set_default("source.kind", "google")?
            .set_default("source.spreadsheet_id", "")?
            .set_default("source.credentials_file", "credentials.json")?
            .set_default("source.api_base", "https://sheets.googleapis.com")?
            .set_default("source.csv_dir", "data")?
            .set_default("tables.clients", tables.clients)?
            .set_default("tables.processes", tables.processes)?
            .set_default("tables.history", tables.history)?
            .add_source(file)
            .add_source(
                Environment::with_prefix("PORTAL")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_shared_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.server.bind, "127.0.0.1:3000");
        assert_eq!(settings.server.session_ttl(), Duration::from_secs(86400));
        assert!(settings.server.secure_cookies);
        assert_eq!(settings.source.kind, SourceKind::Google);
        assert_eq!(settings.source.credentials_file, PathBuf::from("credentials.json"));
        assert_eq!(settings.tables, TableNames::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
bind = "0.0.0.0:8080"
secure_cookies = false

[source]
kind = "csv"
csv_dir = "fixtures"

[tables]
history = "Historico"
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.server.bind, "0.0.0.0:8080");
        assert!(!settings.server.secure_cookies);
        assert_eq!(settings.source.kind, SourceKind::Csv);
        assert_eq!(settings.source.csv_dir, PathBuf::from("fixtures"));
        assert_eq!(settings.tables.history, "Historico");
        assert_eq!(settings.tables.clients, "Clientes");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/portal.toml"))).is_err());
    }

    #[test]
    fn unknown_source_kind_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[source]\nkind = \"excel\"").unwrap();
        assert!(Settings::load(Some(file.path())).is_err());
    }
}
