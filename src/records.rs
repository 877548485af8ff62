use serde::Serialize;

use crate::error::SchemaError;
use crate::table::Table;

/// Column headers of the three tables, as they appear in the shared document.
pub mod columns {
    pub const EMAIL: &str = "Email";
    pub const PASSWORD: &str = "Senha";
    pub const CLIENT_ID: &str = "IDCliente";
    pub const FULL_NAME: &str = "NomeCompleto";
    pub const ROLE: &str = "Role";

    pub const CASE_NUMBER: &str = "NumeroProcesso";
    pub const CASE_TYPE: &str = "TipoProcesso";
    pub const STATUS: &str = "Status";
    pub const START_DATE: &str = "DataInicio";
    pub const DESCRIPTION: &str = "DescricaoDetalhada";
    pub const NEXT_DEADLINE: &str = "Próximo Prazo";

    pub const UPDATE_DATE: &str = "DataAtualizacao";
    pub const HISTORY_DESCRIPTION: &str = "DescricaoHistorico";
}

/// Shown in place of a value whose column is absent from the table
pub const PLACEHOLDER: &str = "-";

/// Role label used when the Clients table has no role for a user
pub const DEFAULT_ROLE_LABEL: &str = "Cliente";

/// Access level of a portal user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    /// Sees only the cases registered under their own client id
    Client,
    /// Sees every case and the settings section
    Lawyer,
}

impl Role {
    /// Interpret the free-text role column.
    ///
    /// Only `Advogado` and `Lawyer` grant the lawyer role; anything else, blank
    /// included, is a client.
    pub fn from_label(label: &str) -> Role {
        match label.trim() {
            "Advogado" | "Lawyer" => Role::Lawyer,
            _ => Role::Client,
        }
    }

    pub fn is_lawyer(self) -> bool {
        self == Role::Lawyer
    }
}

/// A row of the Clients table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Client id (`IDCliente`), trimmed; links the user to their cases
    pub id: String,

    /// Full name shown in the sidebar
    pub name: String,

    /// Login email, as stored
    pub email: String,

    /// Plaintext password cell (`Senha`), as stored
    pub password: String,

    /// Access level derived from the role column
    pub role: Role,

    /// Role text as stored, for display
    pub role_label: String,
}

impl Client {
    /// Decode every row of the Clients table.
    ///
    /// `Email`, `Senha`, `IDCliente` and `NomeCompleto` are required; a missing
    /// `Role` column makes every row a client.
    pub fn from_table(table: &Table) -> Result<Vec<Client>, SchemaError> {
        let email = table.require(columns::EMAIL)?;
        let password = table.require(columns::PASSWORD)?;
        let id = table.require(columns::CLIENT_ID)?;
        let name = table.require(columns::FULL_NAME)?;
        let role = table.column_index(columns::ROLE);

        Ok(table
            .rows()
            .map(|row| {
                let role_label = match role.map(|idx| row.at(idx).trim()) {
                    Some(label) if !label.is_empty() => label.to_string(),
                    _ => DEFAULT_ROLE_LABEL.to_string(),
                };
                Client {
                    id: row.at(id).trim().to_string(),
                    name: row.at(name).to_string(),
                    email: row.at(email).to_string(),
                    password: row.at(password).to_string(),
                    role: Role::from_label(&role_label),
                    role_label,
                }
            })
            .collect())
    }
}

/// A row of the Processes table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Case {
    /// Case number (`NumeroProcesso`), the key into the History table
    pub number: String,

    /// Owning client's id, compared trimmed against the session's user id
    pub client_id: String,

    /// Kind of case (`TipoProcesso`)
    pub case_type: String,

    /// Current status text
    pub status: String,

    /// Start date, displayed as stored
    pub start_date: String,

    /// Free-text description (`DescricaoDetalhada`)
    pub description: String,

    /// Next deadline (`Próximo Prazo`), displayed as stored
    pub next_deadline: String,
}

impl Case {
    /// Decode every row of the Processes table.
    ///
    /// `IDCliente` and `NumeroProcesso` are required. Descriptive columns that are
    /// absent read as [`PLACEHOLDER`].
    pub fn from_table(table: &Table) -> Result<Vec<Case>, SchemaError> {
        let client_id = table.require(columns::CLIENT_ID)?;
        let number = table.require(columns::CASE_NUMBER)?;
        let optional = |column: &str| table.column_index(column);
        let case_type = optional(columns::CASE_TYPE);
        let status = optional(columns::STATUS);
        let start_date = optional(columns::START_DATE);
        let description = optional(columns::DESCRIPTION);
        let next_deadline = optional(columns::NEXT_DEADLINE);

        Ok(table
            .rows()
            .map(|row| {
                let or_placeholder = |idx: Option<usize>| {
                    idx.map(|i| row.at(i).to_string())
                        .unwrap_or_else(|| PLACEHOLDER.to_string())
                };
                Case {
                    number: row.at(number).to_string(),
                    client_id: row.at(client_id).to_string(),
                    case_type: or_placeholder(case_type),
                    status: or_placeholder(status),
                    start_date: or_placeholder(start_date),
                    description: or_placeholder(description),
                    next_deadline: or_placeholder(next_deadline),
                }
            })
            .collect())
    }
}

/// A row of the History table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Case this update belongs to
    pub case_number: String,

    /// Update date exactly as stored; parsed lazily when sorting
    pub updated: String,

    /// What happened (`DescricaoHistorico`)
    pub description: String,
}

impl HistoryEntry {
    /// Decode every row of the History table. Only `NumeroProcesso` is required.
    pub fn from_table(table: &Table) -> Result<Vec<HistoryEntry>, SchemaError> {
        let case_number = table.require(columns::CASE_NUMBER)?;
        let updated = table.column_index(columns::UPDATE_DATE);
        let description = table.column_index(columns::HISTORY_DESCRIPTION);

        Ok(table
            .rows()
            .map(|row| HistoryEntry {
                case_number: row.at(case_number).to_string(),
                updated: updated.map(|i| row.at(i).to_string()).unwrap_or_default(),
                description: description
                    .map(|i| row.at(i).to_string())
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
            })
            .collect())
    }
}
