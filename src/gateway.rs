use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::{ConnectionError, GatewayError};
use crate::table::Table;

/// The three logical tables the portal reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRef {
    /// Registered users and their credentials; required
    Clients,
    /// One row per legal case; required
    Processes,
    /// Dated updates per case; may be absent from the document
    History,
}

/// Sheet titles backing each logical table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableNames {
    /// Title of the Clients sheet
    pub clients: String,

    /// Title of the Processes sheet
    pub processes: String,

    /// Title of the History sheet
    pub history: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            clients: "Clientes".to_string(),
            processes: "ProcessosJuridicos".to_string(),
            history: "HistoricoProcessos".to_string(),
        }
    }
}

impl TableNames {
    pub fn title(&self, table: TableRef) -> &str {
        match table {
            TableRef::Clients => &self.clients,
            TableRef::Processes => &self.processes,
            TableRef::History => &self.history,
        }
    }
}

/// A spreadsheet-like document holding named sheets.
///
/// Implementations return raw grids; header handling and row shaping happen in
/// [`Table::from_grid`].
#[async_trait]
pub trait TableSource: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Titles of every sheet in the document
    async fn sheet_titles(&self) -> Result<Vec<String>, GatewayError>;

    /// Every non-trailing-empty row of one sheet, header row first
    async fn read_sheet(&self, title: &str) -> Result<Vec<Vec<String>>, GatewayError>;
}

/// Read-only access to the portal's tables.
pub struct Gateway {
    source: Arc<dyn TableSource>,
    names: TableNames,
    history_available: bool,
}

impl Gateway {
    /// Validate the document once at startup.
    ///
    /// Clients and Processes must exist. History is optional; when it is absent
    /// every later read of it yields an empty table.
    pub async fn connect(
        source: Arc<dyn TableSource>,
        names: TableNames,
    ) -> Result<Gateway, ConnectionError> {
        let titles = source.sheet_titles().await?;

        for required in [TableRef::Clients, TableRef::Processes] {
            let title = names.title(required);
            if !titles.iter().any(|t| t == title) {
                return Err(ConnectionError::MissingTable(title.to_string()));
            }
        }

        let history_available = titles.iter().any(|t| t == names.title(TableRef::History));
        if !history_available {
            info!(
                "history table '{}' not present, case history will be empty",
                names.history
            );
        }

        info!(
            "connected to {} source ({} sheets)",
            source.backend_tag(),
            titles.len()
        );

        Ok(Gateway {
            source,
            names,
            history_available,
        })
    }

    pub fn backend_tag(&self) -> &'static str {
        self.source.backend_tag()
    }

    pub fn names(&self) -> &TableNames {
        &self.names
    }

    pub fn has_history(&self) -> bool {
        self.history_available
    }

    /// Read a whole table, reporting why it could not be read
    pub async fn fetch(&self, table: TableRef) -> Result<Table, GatewayError> {
        let title = self.names.title(table);
        if table == TableRef::History && !self.history_available {
            return Err(GatewayError::MissingTable(title.to_string()));
        }

        let grid = self.source.read_sheet(title).await?;
        debug!("read {} rows from '{}'", grid.len().saturating_sub(1), title);
        Ok(Table::from_grid(title, grid))
    }

    /// Read a whole table, treating every failure as "no data".
    ///
    /// # Arguments
    /// * `table` - Which of the three tables to read
    ///
    /// # Returns
    /// * `Table` - The table as currently stored, or an empty one if it could not be read
    pub async fn load_table(&self, table: TableRef) -> Table {
        let title = self.names.title(table);
        match self.fetch(table).await {
            Ok(loaded) => loaded,
            Err(GatewayError::MissingTable(_)) if table == TableRef::History => {
                Table::empty(title)
            }
            Err(e) => {
                warn!("loading '{}' failed, treating as empty: {}", title, e);
                Table::empty(title)
            }
        }
    }
}

/// In-memory document, used by tests and as a stand-in source.
#[derive(Default)]
pub struct MemorySource {
    sheets: HashMap<String, Vec<Vec<String>>>,
    order: Vec<String>,
    unreachable: AtomicBool,
    reads: AtomicU64,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet; its first row is the header row
    pub fn with_sheet(self, title: &str, rows: &[&[&str]]) -> Self {
        let grid = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        self.with_grid(title, grid)
    }

    pub fn with_grid(mut self, title: &str, grid: Vec<Vec<String>>) -> Self {
        if !self.sheets.contains_key(title) {
            self.order.push(title.to_string());
        }
        self.sheets.insert(title.to_string(), grid);
        self
    }

    /// Make every later call fail as if the network were down
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of successful sheet reads so far
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn check_reachable(&self) -> Result<(), GatewayError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unreachable("memory source offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TableSource for MemorySource {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn sheet_titles(&self) -> Result<Vec<String>, GatewayError> {
        self.check_reachable()?;
        Ok(self.order.clone())
    }

    async fn read_sheet(&self, title: &str) -> Result<Vec<Vec<String>>, GatewayError> {
        self.check_reachable()?;
        let grid = self
            .sheets
            .get(title)
            .cloned()
            .ok_or_else(|| GatewayError::MissingTable(title.to_string()))?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> MemorySource {
        MemorySource::new()
            .with_sheet(
                "Clientes",
                &[
                    &["Email", "Senha", "IDCliente", "NomeCompleto", "Role"],
                    &["a@x.com", "p1", "1", "Ana", "Cliente"],
                ],
            )
            .with_sheet(
                "ProcessosJuridicos",
                &[&["IDCliente", "NumeroProcesso"], &["1", "P001"], &["2", "P002"]],
            )
    }

    #[tokio::test]
    async fn connect_requires_clients_and_processes() {
        let source = Arc::new(MemorySource::new().with_sheet("Clientes", &[&["Email"]]));
        let err = Gateway::connect(source, TableNames::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ConnectionError::MissingTable(t) if t == "ProcessosJuridicos"));
    }

    #[tokio::test]
    async fn connect_fails_when_source_is_down() {
        let source = Arc::new(document());
        source.set_unreachable(true);
        let err = Gateway::connect(source, TableNames::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ConnectionError::Source(GatewayError::Unreachable(_))));
    }

    #[tokio::test]
    async fn missing_history_loads_as_empty_without_touching_other_tables() {
        let gateway = Gateway::connect(Arc::new(document()), TableNames::default())
            .await
            .unwrap();
        assert!(!gateway.has_history());

        let history = gateway.load_table(TableRef::History).await;
        assert!(history.is_empty());
        assert_eq!(history.name(), "HistoricoProcessos");

        let processes = gateway.load_table(TableRef::Processes).await;
        assert_eq!(processes.len(), 2);
        assert!(matches!(
            gateway.fetch(TableRef::History).await,
            Err(GatewayError::MissingTable(_))
        ));
    }

    #[tokio::test]
    async fn read_failures_become_empty_tables() {
        let source = Arc::new(document());
        let gateway = Gateway::connect(source.clone(), TableNames::default())
            .await
            .unwrap();
        source.set_unreachable(true);

        assert!(gateway.load_table(TableRef::Clients).await.is_empty());
        assert!(gateway.fetch(TableRef::Clients).await.is_err());
    }

    #[tokio::test]
    async fn repeated_loads_are_identical() {
        let source = Arc::new(document());
        let gateway = Gateway::connect(source.clone(), TableNames::default())
            .await
            .unwrap();
        let first = gateway.load_table(TableRef::Processes).await;
        let second = gateway.load_table(TableRef::Processes).await;
        assert_eq!(first, second);
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn custom_titles_are_honoured() {
        let source = Arc::new(
            MemorySource::new()
                .with_sheet("Clients", &[&["Email"]])
                .with_sheet("Processes", &[&["IDCliente"]])
                .with_sheet("History", &[&["NumeroProcesso"]]),
        );
        let names = TableNames {
            clients: "Clients".into(),
            processes: "Processes".into(),
            history: "History".into(),
        };
        let gateway = Gateway::connect(source, names).await.unwrap();
        assert!(gateway.has_history());
        assert!(gateway.load_table(TableRef::History).await.has_column("NumeroProcesso"));
    }
}
