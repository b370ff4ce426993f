//! Declared schema of one synchronised source entity.

use sheetsync_domain::{BusinessKey, Record, RowPosition};

use super::mapping::FieldMapping;

/// How the business key is read from a source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRule {
    Field(&'static str),
    /// First field with a non-empty value.
    FirstOf(&'static [&'static str]),
}

impl KeyRule {
    /// Key for `record`; empty when no configured field holds a value.
    pub fn key(&self, record: &Record) -> BusinessKey {
        let text = match self {
            Self::Field(field) => record.text(field),
            Self::FirstOf(fields) => fields.iter().find_map(|field| record.text(field)),
        };
        text.map(BusinessKey::new).unwrap_or_else(|| BusinessKey::new(String::new()))
    }
}

/// One source record becomes one target row per line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItemExpansion {
    /// Detail endpoint prefix; the record id is appended (`/Invoices/{id}`).
    pub detail_endpoint: &'static str,
    /// Field holding the id passed to the detail endpoint.
    pub id_field: &'static str,
    /// Array field listing the line items.
    pub items_field: &'static str,
}

#[derive(Debug, Clone)]
pub struct CatalogSpec {
    /// Stable name used in configuration and logs.
    pub name: &'static str,
    /// Sheet title; also the name looked up in the target workspace.
    pub sheet_name: &'static str,
    pub endpoint: &'static str,
    pub key: KeyRule,
    /// Target column holding the business key.
    pub key_column: &'static str,
    pub mapping: FieldMapping,
    pub max_records: Option<usize>,
    /// Enables the incremental "since" filter.
    pub date_field: Option<&'static str>,
    pub order_by: Option<&'static str>,
    pub expansion: Option<LineItemExpansion>,
    pub position: RowPosition,
}

impl CatalogSpec {
    /// Catalog keyed by `ID` into an `ID` column, appended at the bottom.
    pub fn new(
        name: &'static str,
        sheet_name: &'static str,
        endpoint: &'static str,
        mapping: FieldMapping,
    ) -> Self {
        Self {
            name,
            sheet_name,
            endpoint,
            key: KeyRule::Field("ID"),
            key_column: "ID",
            mapping,
            max_records: None,
            date_field: None,
            order_by: None,
            expansion: None,
            position: RowPosition::Bottom,
        }
    }

    #[must_use]
    pub fn keyed(mut self, key: KeyRule, key_column: &'static str) -> Self {
        self.key = key;
        self.key_column = key_column;
        self
    }

    #[must_use]
    pub fn max_records(mut self, cap: usize) -> Self {
        self.max_records = Some(cap);
        self
    }

    #[must_use]
    pub fn date_field(mut self, field: &'static str) -> Self {
        self.date_field = Some(field);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: &'static str) -> Self {
        self.order_by = Some(order);
        self
    }

    #[must_use]
    pub fn expand(mut self, expansion: LineItemExpansion) -> Self {
        self.expansion = Some(expansion);
        self
    }

    #[must_use]
    pub fn position(mut self, position: RowPosition) -> Self {
        self.position = position;
        self
    }

    /// Smaller of the catalog cap and `global`.
    pub fn effective_max_records(&self, global: Option<usize>) -> Option<usize> {
        match (self.max_records, global) {
            (Some(own), Some(global)) => Some(own.min(global)),
            (own, global) => own.or(global),
        }
    }
}
