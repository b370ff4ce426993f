//! Registry of every catalog synchronised from the ERP.
//!
//! Column titles are the exact titles used on the target sheets. The last
//! column of each sheet records when the row was last written.

use chrono::{DateTime, NaiveDateTime};
use sheetsync_domain::{CellValue, Result, RowPosition, SheetSyncError};

use super::catalog::{CatalogSpec, KeyRule, LineItemExpansion};
use super::mapping::{format_money, number_value, FieldMapping, FieldSource, RowSource};

const UPDATED_AT: &str = "Última Actualización";

/// Every known catalog, in the order a full sync runs them.
pub fn all() -> Vec<CatalogSpec> {
    vec![
        warehouses(),
        clients(),
        products(),
        providers(),
        users(),
        currencies(),
        price_lists(),
        bank_accounts(),
        banks(),
        locations(),
        orders(),
        quotes(),
        invoices(),
        inventory(),
    ]
}

pub fn names() -> Vec<&'static str> {
    all().iter().map(|spec| spec.name).collect()
}

/// Looks a catalog up by its configuration name.
pub fn find(name: &str) -> Result<CatalogSpec> {
    all().into_iter().find(|spec| spec.name == name).ok_or_else(|| {
        SheetSyncError::InvalidInput(format!(
            "unknown catalog '{name}' (known: {})",
            names().join(", ")
        ))
    })
}

fn stamped(mapping: FieldMapping) -> FieldMapping {
    mapping.rule(UPDATED_AT, FieldSource::SyncTimestamp)
}

pub fn warehouses() -> CatalogSpec {
    CatalogSpec::new(
        "warehouses",
        "Bind - Almacenes",
        "/Warehouses",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Nombre", FieldSource::Field("Name"))
                .rule("LocationID", FieldSource::Field("LocationID"))
                .rule("Disponible Otras Ubicaciones", FieldSource::Field("AvailableInOtherLoc")),
        ),
    )
}

pub fn clients() -> CatalogSpec {
    CatalogSpec::new(
        "clients",
        "Bind - Clientes",
        "/Clients",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Número", FieldSource::Field("Number"))
                .rule("Nombre Comercial", FieldSource::Field("ClientName"))
                .rule("Razón Social", FieldSource::Field("LegalName"))
                .rule("RFC", FieldSource::Field("RFC"))
                .rule("Email", FieldSource::Field("Email"))
                .rule("Teléfono", FieldSource::Field("Phone"))
                .rule("Régimen Fiscal", FieldSource::Field("RegimenFiscal")),
        ),
    )
}

pub fn products() -> CatalogSpec {
    CatalogSpec::new(
        "products",
        "Bind - Productos",
        "/Products",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Código", FieldSource::Field("Code"))
                .rule("Nombre", FieldSource::Field("Title"))
                .rule("SKU", FieldSource::Field("SKU"))
                .rule("Costo", FieldSource::Field("Cost"))
                .rule("Inventario Actual", FieldSource::Field("CurrentInventory"))
                .rule("Unidad", FieldSource::Field("Unit"))
                .rule("Moneda", FieldSource::Field("CurrencyCode"))
                .rule("Tipo", FieldSource::Field("TypeText")),
        ),
    )
    .max_records(5000)
}

pub fn providers() -> CatalogSpec {
    CatalogSpec::new(
        "providers",
        "Bind - Proveedores",
        "/Providers",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Número", FieldSource::Field("Number"))
                .rule("Nombre", FieldSource::Field("ProviderName"))
                .rule("Razón Social", FieldSource::Field("LegalName"))
                .rule("RFC", FieldSource::Field("RFC"))
                .rule("Email", FieldSource::Field("Email"))
                .rule("Teléfono", FieldSource::Field("Phone"))
                .rule("Ciudad", FieldSource::Field("City")),
        ),
    )
    .max_records(3000)
}

pub fn users() -> CatalogSpec {
    CatalogSpec::new(
        "users",
        "Bind - Usuarios",
        "/Users",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Nombre Completo", FieldSource::Field("FullName"))
                .rule("Puesto", FieldSource::Field("JobPosition"))
                .rule("Email", FieldSource::Field("Email"))
                .rule("Usuario", FieldSource::Field("UserName")),
        ),
    )
}

pub fn currencies() -> CatalogSpec {
    CatalogSpec::new(
        "currencies",
        "Bind - Monedas",
        "/Currencies",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Nombre", FieldSource::Field("Name"))
                .rule("Código", FieldSource::Field("Code"))
                .rule("Tipo de Cambio", FieldSource::Field("ExchangeRate")),
        ),
    )
}

pub fn price_lists() -> CatalogSpec {
    CatalogSpec::new(
        "pricelists",
        "Bind - Listas de Precios",
        "/PriceLists",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Nombre", FieldSource::Field("Name")),
        ),
    )
}

pub fn bank_accounts() -> CatalogSpec {
    CatalogSpec::new(
        "bankaccounts",
        "Bind - Cuentas Bancarias",
        "/BankAccounts",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Nombre", FieldSource::Field("Name"))
                .rule("Tipo", FieldSource::Field("TypeText"))
                .rule("Banco", FieldSource::Field("BankName"))
                .rule("Saldo", FieldSource::Field("Balance"))
                .rule("Moneda", FieldSource::Field("CurrencyCode")),
        ),
    )
}

pub fn banks() -> CatalogSpec {
    CatalogSpec::new(
        "banks",
        "Bind - Bancos",
        "/Banks",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Nombre", FieldSource::Field("Name")),
        ),
    )
}

pub fn locations() -> CatalogSpec {
    CatalogSpec::new(
        "locations",
        "Bind - Ubicaciones",
        "/Locations",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Nombre", FieldSource::Field("Name"))
                .rule("Calle", FieldSource::Field("Street"))
                .rule("Número Ext", FieldSource::Field("ExtNumber"))
                .rule("Colonia", FieldSource::Field("Colonia"))
                .rule("Ciudad", FieldSource::Field("City"))
                .rule("Estado", FieldSource::Field("State"))
                .rule("CP", FieldSource::Field("ZipCode")),
        ),
    )
}

pub fn orders() -> CatalogSpec {
    CatalogSpec::new(
        "orders",
        "Bind - Pedidos",
        "/Orders",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Número", FieldSource::Field("Number"))
                .rule("Serie", FieldSource::Field("Serie"))
                .rule("Fecha", FieldSource::Field("OrderDate"))
                .rule("Cliente", FieldSource::Field("ClientName"))
                .rule("RFC", FieldSource::Field("RFC"))
                .rule("Orden Compra", FieldSource::Field("PurchaseOrder"))
                .rule("Total", FieldSource::Field("Total"))
                .rule("Moneda", FieldSource::Field("CurrencyName"))
                .rule("Estado", FieldSource::Field("Status"))
                .rule("Vendedor", FieldSource::Field("EmployeeName")),
        ),
    )
    .max_records(2000)
    .date_field("OrderDate")
}

pub fn quotes() -> CatalogSpec {
    CatalogSpec::new(
        "quotes",
        "Bind - Cotizaciones",
        "/Quotes",
        stamped(
            FieldMapping::default()
                .rule("ID", FieldSource::Field("ID"))
                .rule("Número", FieldSource::Field("Number"))
                .rule("Fecha", FieldSource::Field("CreationDate"))
                .rule("Cliente", FieldSource::Field("ClientName"))
                .rule("Ubicación", FieldSource::Field("Locations"))
                .rule("Total", FieldSource::Field("Total"))
                .rule("Moneda", FieldSource::Field("Currency"))
                .rule("Estado", FieldSource::Field("StatusText"))
                .rule("Comentarios", FieldSource::Field("Comments")),
        ),
    )
    .max_records(2000)
    .date_field("CreationDate")
}

/// Invoices, one row per product line, newest on top.
///
/// Keyed by fiscal UUID (`<uuid>-<n>` when an invoice has several lines);
/// drafts without a UUID are skipped.
pub fn invoices() -> CatalogSpec {
    CatalogSpec::new(
        "invoices",
        "Bind - Facturas",
        "/Invoices",
        FieldMapping::default()
            .rule("Nueva", FieldSource::BusinessKey)
            .rule("Serie", FieldSource::Derived(invoice_serie))
            .rule("No.", FieldSource::Derived(invoice_number))
            .rule("Emision", FieldSource::Derived(invoice_issue_date))
            .rule("Cliente", FieldSource::Text("ClientName"))
            .rule("RFC Cliente", FieldSource::Text("RFC"))
            .rule("Subtotal", FieldSource::Money("Subtotal"))
            .rule("I.V.A", FieldSource::Money("VAT"))
            .rule("Total", FieldSource::Money("Total"))
            .rule("Moneda", FieldSource::Derived(invoice_currency))
            .rule("Folio Fiscal", FieldSource::Text("UUID"))
            .rule("Estatus", FieldSource::Derived(invoice_status_cell))
            .rule("Vendedor", FieldSource::Text("SellerName"))
            .rule("OrdenDeCompra", FieldSource::Text("PurchaseOrder"))
            .rule("Pendiente", FieldSource::Derived(invoice_pending))
            .rule("Pagos", FieldSource::Money("PaidAmount"))
            .rule("Folio", FieldSource::Text("Number"))
            .rule("Fecha", FieldSource::Derived(invoice_issue_date))
            .rule("RFC", FieldSource::Text("RFC"))
            .rule("IVA", FieldSource::Money("VAT"))
            .rule("Metodo Pago", FieldSource::Derived(invoice_payment_method))
            .rule("Uso CFDI", FieldSource::Derived(invoice_cfdi_use))
            .rule("Orden Compra", FieldSource::Text("PurchaseOrder"))
            .rule("Bind ID", FieldSource::Text("ID"))
            .rule("Ultima Sync", FieldSource::SyncTimestamp)
            .rule("Pagada", FieldSource::Derived(invoice_is_paid))
            .rule("Cancelada", FieldSource::Derived(invoice_is_cancelled))
            .rule("Código Prod/Serv", FieldSource::Item("Code"))
            .rule("Producto/Concepto", FieldSource::Item("Name"))
            .rule("Cantidad", FieldSource::Item("Qty"))
            .rule("Cantidad Total", FieldSource::Item("Qty")),
    )
    .keyed(KeyRule::Field("UUID"), "Nueva")
    .max_records(2000)
    .date_field("Date")
    .order_by("Date desc")
    .expand(LineItemExpansion {
        detail_endpoint: "/Invoices",
        id_field: "ID",
        items_field: "Products",
    })
    .position(RowPosition::Top)
}

/// Product stock keyed by product id.
pub fn inventory() -> CatalogSpec {
    CatalogSpec::new(
        "inventory",
        "Inventario",
        "/Products",
        FieldMapping::default()
            .rule("ID Producto", FieldSource::BusinessKey)
            .rule("Codigo", FieldSource::FirstOf(&["Code", "code"]))
            .rule("Nombre Producto", FieldSource::FirstOf(&["Name", "name", "Title"]))
            .rule("Descripcion", FieldSource::FirstOf(&["Description", "description"]))
            .rule("Existencias", FieldSource::Derived(inventory_stock))
            .rule("Unidad", FieldSource::FirstOf(&["Unit", "UnitName"]))
            .rule("Precio Unitario", FieldSource::Derived(inventory_unit_price))
            .rule("Almacen ID", FieldSource::Derived(configured_warehouse))
            .rule("Almacen Nombre", FieldSource::Text("WarehouseName"))
            .rule("Ultima Actualizacion", FieldSource::SyncTimestamp),
    )
    .keyed(KeyRule::FirstOf(&["ID", "id"]), "ID Producto")
}

/// Peso currency ids all share this prefix.
const MXN_CURRENCY_MARKER: &str = "b7e2c065";

const CFDI_USES: [&str; 25] = [
    "G01 - Adquisicion de mercancias",
    "G02 - Devoluciones, descuentos",
    "G03 - Gastos en general",
    "I01 - Construcciones",
    "I02 - Mobiliario y equipo",
    "I03 - Equipo de transporte",
    "I04 - Equipo de computo",
    "I05 - Dados, troqueles, moldes",
    "I06 - Comunicaciones telefonicas",
    "I07 - Comunicaciones satelitales",
    "I08 - Otra maquinaria",
    "D01 - Honorarios medicos",
    "D02 - Gastos medicos",
    "D03 - Gastos funerales",
    "D04 - Donativos",
    "D05 - Intereses hipotecarios",
    "D06 - Aportaciones SAR",
    "D07 - Primas seguros",
    "D08 - Gastos transportacion",
    "D09 - Depositos cuentas ahorro",
    "D10 - Servicios educativos",
    "P01 - Por definir",
    "S01 - Sin efectos fiscales",
    "CP01 - Pagos",
    "CN01 - Nomina",
];

/// Lifecycle state shown on the invoice sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Draft,
    Active,
    Paid,
    Cancelled,
    Unknown,
}

impl InvoiceStatus {
    pub fn of(source: &RowSource<'_>) -> Self {
        let has_uuid = source.record.text("UUID").is_some();
        #[allow(clippy::cast_possible_truncation)]
        let code = match source.field("Status").and_then(number_value) {
            Some(n) if n.fract() == 0.0 => n as i64,
            Some(_) => -1,
            None => 0,
        };
        match code {
            2 => Self::Cancelled,
            1 => Self::Paid,
            0 if has_uuid => Self::Active,
            0 => Self::Draft,
            _ => Self::Unknown,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Borrador",
            Self::Active => "Vigente",
            Self::Paid => "Pagada",
            Self::Cancelled => "Cancelada",
            Self::Unknown => "Desconocido",
        }
    }
}

fn serie_text(source: &RowSource<'_>) -> String {
    source
        .record
        .text("Serie")
        .map(|serie| serie.trim_end_matches(['-', ' ']).to_string())
        .unwrap_or_default()
}

fn invoice_serie(source: &RowSource<'_>) -> CellValue {
    CellValue::text(serie_text(source))
}

fn invoice_number(source: &RowSource<'_>) -> CellValue {
    let folio = source.record.text("Number").unwrap_or_default();
    let serie = serie_text(source);
    if serie.is_empty() {
        CellValue::text(folio)
    } else {
        CellValue::text(format!("{serie}-{folio}"))
    }
}

/// Issue date as a local `YYYY-MM-DD`.
fn invoice_issue_date(source: &RowSource<'_>) -> CellValue {
    let Some(raw) = source.record.text("Date") else {
        return CellValue::empty();
    };
    let tz = source.context.timezone;

    if raw.contains('T') {
        if let Ok(stamp) = DateTime::parse_from_rfc3339(&raw) {
            return CellValue::text(stamp.with_timezone(&tz).format("%Y-%m-%d").to_string());
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return CellValue::text(naive.format("%Y-%m-%d").to_string());
        }
    }
    CellValue::text(raw.chars().take(10).collect::<String>())
}

fn invoice_currency(source: &RowSource<'_>) -> CellValue {
    let currency_id = source.record.text("CurrencyID").unwrap_or_default();
    CellValue::text(if currency_id.contains(MXN_CURRENCY_MARKER) { "MXN" } else { "USD" })
}

fn invoice_status_cell(source: &RowSource<'_>) -> CellValue {
    CellValue::text(InvoiceStatus::of(source).label())
}

fn invoice_is_paid(source: &RowSource<'_>) -> CellValue {
    CellValue::Bool(InvoiceStatus::of(source) == InvoiceStatus::Paid)
}

fn invoice_is_cancelled(source: &RowSource<'_>) -> CellValue {
    CellValue::Bool(InvoiceStatus::of(source) == InvoiceStatus::Cancelled)
}

fn invoice_payment_method(source: &RowSource<'_>) -> CellValue {
    let fiscal = source.field("IsFiscalInvoice").and_then(serde_json::Value::as_bool);
    CellValue::text(if fiscal == Some(true) { "PUE" } else { "PPD" })
}

fn invoice_cfdi_use(source: &RowSource<'_>) -> CellValue {
    let label = source
        .field("CFDIUse")
        .and_then(serde_json::Value::as_u64)
        .and_then(|idx| usize::try_from(idx).ok())
        .and_then(|idx| CFDI_USES.get(idx).copied())
        .unwrap_or("Desconocido");
    CellValue::text(label)
}

/// Open balance; falls back to the total for active invoices without one.
fn invoice_pending(source: &RowSource<'_>) -> CellValue {
    let amount = |field: &str| source.field(field).and_then(number_value).unwrap_or(0.0);
    let balance = amount("Balance");
    let pending = if balance != 0.0 {
        balance
    } else if InvoiceStatus::of(source) == InvoiceStatus::Active {
        amount("Total")
    } else {
        0.0
    };
    CellValue::text(format_money(pending))
}

fn first_number_or_zero(source: &RowSource<'_>, fields: &[&str]) -> CellValue {
    fields
        .iter()
        .filter_map(|field| source.field(field))
        .find(|value| value.is_number())
        .map_or(CellValue::Integer(0), CellValue::from_json)
}

fn inventory_stock(source: &RowSource<'_>) -> CellValue {
    first_number_or_zero(source, &["Stock", "Quantity", "CurrentInventory"])
}

fn inventory_unit_price(source: &RowSource<'_>) -> CellValue {
    first_number_or_zero(source, &["Price", "UnitPrice"])
}

fn configured_warehouse(source: &RowSource<'_>) -> CellValue {
    source.context.warehouse_id.as_deref().map_or_else(CellValue::empty, CellValue::text)
}
