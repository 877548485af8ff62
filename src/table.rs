use crate::error::SchemaError;

/// A whole sheet as read from the data source.
///
/// The first row of the source grid becomes the header row. Header whitespace is
/// stripped so lookups by column name are exact. Every data row holds exactly one
/// cell per header: short rows are padded with empty cells and extra cells are
/// dropped. Row order is the order the source returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// An empty table, used whenever a fetch fails or a table does not exist
    pub fn empty(name: &str) -> Self {
        Table {
            name: name.to_string(),
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Build a table from a raw grid whose first row is the header row
    pub fn from_grid(name: &str, grid: Vec<Vec<String>>) -> Self {
        let mut grid = grid.into_iter();
        let headers: Vec<String> = match grid.next() {
            Some(header_row) => header_row.iter().map(|h| h.trim().to_string()).collect(),
            None => return Table::empty(name),
        };

        let width = headers.len();
        let rows = grid
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Table {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows (the header row is not counted)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Position of the first header equal to `column`
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Like [`Table::column_index`], but a missing column is a schema error
    pub fn require(&self, column: &str) -> Result<usize, SchemaError> {
        self.column_index(column)
            .ok_or_else(|| SchemaError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row { table: self, cells })
    }
}

/// Borrowed view of one data row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    cells: &'a [String],
}

impl<'a> Row<'a> {
    /// Cell under the named column, `None` when the table has no such column
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table
            .column_index(column)
            .map(|idx| self.cells[idx].as_str())
    }

    /// Cell at a column position obtained from [`Table::require`]
    pub fn at(&self, idx: usize) -> &'a str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }
}
