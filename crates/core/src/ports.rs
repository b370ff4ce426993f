//! Port interfaces for the record source and the sheet target

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::stream::BoxStream;
use sheetsync_domain::{Cell, Record, Result, RowPosition, RowUpdate, SheetId, SheetSnapshot};

/// Lower bound on a source date field, expressed in the source's local time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinceFilter {
    pub field: String,
    pub after: NaiveDateTime,
}

/// What to pull from the source for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceQuery {
    pub endpoint: String,
    pub since: Option<SinceFilter>,
    /// Exact-match constraints, ANDed with `since`.
    pub equals: Vec<(String, String)>,
    pub order_by: Option<String>,
    pub max_records: Option<usize>,
}

impl SourceQuery {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), ..Self::default() }
    }
}

/// Paginated source of records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Lazily streams every record matching `query`. Each page is fetched only
    /// when consumed; the first error ends the stream.
    fn records(&self, query: SourceQuery) -> BoxStream<'_, Result<Record>>;

    /// Fetches the detail document of one record.
    async fn record_detail(&self, endpoint: &str, id: &str) -> Result<Record>;
}

/// Keyed tabular target.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Reads the full sheet: columns and every row.
    async fn load_sheet(&self, sheet: SheetId) -> Result<SheetSnapshot>;

    /// Inserts rows in one call. Callers keep `rows.len()` within the API limit.
    async fn add_rows(&self, sheet: SheetId, position: RowPosition, rows: &[Vec<Cell>])
        -> Result<()>;

    /// Updates existing rows in one call.
    async fn update_rows(&self, sheet: SheetId, rows: &[RowUpdate]) -> Result<()>;
}

/// Column of a sheet about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewColumn {
    pub title: String,
    pub primary: bool,
}

/// Sheets grouped under a workspace, addressed by name.
#[async_trait]
pub trait SheetDirectory: Send + Sync {
    /// Id of the sheet called exactly `name` in `workspace`, if any.
    async fn find_sheet(&self, workspace: i64, name: &str) -> Result<Option<SheetId>>;

    /// Creates an empty sheet with `columns`, in order.
    async fn create_sheet(
        &self,
        workspace: i64,
        name: &str,
        columns: &[NewColumn],
    ) -> Result<SheetId>;
}
