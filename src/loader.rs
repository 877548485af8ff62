use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::GatewayError;
use crate::gateway::TableSource;

/// A directory of CSV exports, one `<sheet title>.csv` per sheet
///
/// Lets the portal run against a local copy of the document.
///
/// # Examples
/// ```no_run
/// use case_portal::loader::CsvDirectory;
///
/// let source = CsvDirectory::new("data");
/// assert_eq!(source.dir().to_str(), Some("data"));
/// ```
pub struct CsvDirectory {
    dir: PathBuf,
}

impl CsvDirectory {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        CsvDirectory {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn sheet_path(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", title))
    }
}

/// Parse CSV bytes into a grid; rows may have different lengths
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, GatewayError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

#[async_trait]
impl TableSource for CsvDirectory {
    fn backend_tag(&self) -> &'static str {
        "csv"
    }

    async fn sheet_titles(&self) -> Result<Vec<String>, GatewayError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            GatewayError::Unreachable(format!("cannot open {}: {}", self.dir.display(), e))
        })?;

        let mut titles = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if is_csv {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    titles.push(stem.to_string());
                }
            }
        }
        titles.sort();
        Ok(titles)
    }

    async fn read_sheet(&self, title: &str) -> Result<Vec<Vec<String>>, GatewayError> {
        let bytes = match tokio::fs::read(self.sheet_path(title)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GatewayError::MissingTable(title.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        parse_csv(&bytes)
    }
}
