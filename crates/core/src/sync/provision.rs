//! Finds a catalog's sheet by name, creating it when the workspace lacks one.

use sheetsync_domain::{Result, SheetId};
use tracing::{info, instrument};

use super::catalog::CatalogSpec;
use crate::ports::{NewColumn, SheetDirectory};

/// Columns a fresh sheet for `spec` starts with; the first is primary.
pub fn sheet_columns(spec: &CatalogSpec) -> Vec<NewColumn> {
    spec.mapping
        .columns()
        .enumerate()
        .map(|(position, title)| NewColumn { title: title.to_string(), primary: position == 0 })
        .collect()
}

/// Sheet named `spec.sheet_name` in `workspace`, created from the catalog's
/// mapped columns on first use.
///
/// # Errors
/// Whatever the directory reports; a failed lookup is not retried as a
/// create, so an unreachable workspace never yields a duplicate sheet.
#[instrument(skip(directory, spec), fields(catalog = spec.name, sheet = spec.sheet_name))]
pub async fn get_or_create_sheet(
    directory: &dyn SheetDirectory,
    workspace: i64,
    spec: &CatalogSpec,
) -> Result<SheetId> {
    if let Some(sheet) = directory.find_sheet(workspace, spec.sheet_name).await? {
        info!(sheet_id = %sheet, "using existing sheet");
        return Ok(sheet);
    }

    let sheet = directory.create_sheet(workspace, spec.sheet_name, &sheet_columns(spec)).await?;
    info!(sheet_id = %sheet, "sheet created");
    Ok(sheet)
}
