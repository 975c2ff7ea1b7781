//! Parser for the purchase-order CSV report.
//!
//! Two layouts exist in the wild and both are handled:
//! - the full report with a header row (`FECHA_PROCESO, ..., PRODUCTO,
//!   ENTIDAD, PROVEEDOR, ...`), columns resolved by name;
//! - the cleaned training extract without a recognizable header, where
//!   `producto` and `entidad` sit at fixed positions 1 and 2.
//!
//! Rows that cannot be interpreted (too few fields, empty product or entity)
//! are skipped, not fatal: the dataset is scraped and a handful of broken
//! rows must not abort a training pass.

use crate::error::{DataLoadError, Result};
use crate::types::{PurchaseOrder, TransactionRecord};
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Resolved column positions for one file layout
struct ColumnMap {
    fecha_proceso: Option<usize>,
    acuerdo_marco: Option<usize>,
    producto: usize,
    entidad: usize,
    proveedor: Option<usize>,
    tipo_procedimiento: Option<usize>,
    sub_total: Option<usize>,
    igv: Option<usize>,
    total: Option<usize>,
}

impl ColumnMap {
    /// Positional layout of the cleaned training extract
    fn positional() -> Self {
        Self {
            fecha_proceso: Some(0),
            acuerdo_marco: None,
            producto: 1,
            entidad: 2,
            proveedor: None,
            tipo_procedimiento: None,
            sub_total: None,
            igv: None,
            total: None,
        }
    }

    /// Build a map from a header row, if it looks like one
    fn from_headers(headers: &csv::StringRecord) -> Option<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        // PRODUCTO and ENTIDAD are the columns the core needs; without both
        // this is not a header row.
        let producto = find("PRODUCTO")?;
        let entidad = find("ENTIDAD")?;

        Some(Self {
            fecha_proceso: find("FECHA_PROCESO"),
            acuerdo_marco: find("ACUERDO_MARCO"),
            producto,
            entidad,
            proveedor: find("PROVEEDOR"),
            tipo_procedimiento: find("TIPO_PROCEDIMIENTO"),
            sub_total: find("SUB_TOTAL"),
            igv: find("IGV"),
            total: find("TOTAL"),
        })
    }

    fn field<'a>(&self, row: &'a csv::StringRecord, idx: Option<usize>) -> &'a str {
        idx.and_then(|i| row.get(i)).unwrap_or("")
    }

    fn numeric(&self, row: &csv::StringRecord, idx: Option<usize>) -> f64 {
        self.field(row, idx).trim().parse().unwrap_or(0.0)
    }

    fn order(&self, row: &csv::StringRecord) -> Option<PurchaseOrder> {
        let producto = row.get(self.producto)?.trim();
        let entidad = row.get(self.entidad)?.trim();
        if producto.is_empty() || entidad.is_empty() {
            return None;
        }

        Some(PurchaseOrder {
            fecha_proceso: self.field(row, self.fecha_proceso).trim().to_string(),
            acuerdo_marco: self.field(row, self.acuerdo_marco).trim().to_string(),
            producto: producto.to_string(),
            entidad: entidad.to_string(),
            proveedor: self.field(row, self.proveedor).trim().to_string(),
            tipo_procedimiento: self
                .field(row, self.tipo_procedimiento)
                .trim()
                .to_string(),
            sub_total: self.numeric(row, self.sub_total),
            igv: self.numeric(row, self.igv),
            total: self.numeric(row, self.total),
        })
    }
}

/// Parse the purchase-order report at `path`.
///
/// # Returns
/// All interpretable rows, in file order. Skipped rows are logged at debug
/// level with their row number.
pub fn parse_purchase_orders(path: &Path) -> Result<Vec<PurchaseOrder>> {
    let file = File::open(path).map_err(|_| DataLoadError::FileNotFound {
        path: path.display().to_string(),
    })?;

    // Header detection happens on the first row, so the reader runs headerless
    // and flexible (row widths vary in the scraped report).
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut rows = reader.records();

    let first = match rows.next() {
        Some(row) => row?,
        None => return Ok(Vec::new()),
    };

    let (columns, mut orders) = match ColumnMap::from_headers(&first) {
        Some(columns) => (columns, Vec::new()),
        None => {
            // No header row: positional layout, and the first row is data.
            let columns = ColumnMap::positional();
            let mut orders = Vec::new();
            if let Some(order) = columns.order(&first) {
                orders.push(order);
            } else {
                debug!("Skipping uninterpretable first row of {}", path.display());
            }
            (columns, orders)
        }
    };

    let mut skipped = 0usize;
    for (idx, row) in rows.enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                debug!("Skipping unreadable row {} in {}: {}", idx + 2, path.display(), e);
                skipped += 1;
                continue;
            }
        };
        match columns.order(&row) {
            Some(order) => orders.push(order),
            None => {
                debug!("Skipping malformed row {} in {}", idx + 2, path.display());
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(
            "Parsed {} purchase orders from {} ({} rows skipped)",
            orders.len(),
            path.display(),
            skipped
        );
    } else {
        debug!(
            "Parsed {} purchase orders from {}",
            orders.len(),
            path.display()
        );
    }

    Ok(orders)
}

/// Parse `path` and reduce every row to its (product, entity) pair.
pub fn load_transactions(path: &Path) -> Result<Vec<TransactionRecord>> {
    let orders = parse_purchase_orders(path)?;
    Ok(orders.iter().map(TransactionRecord::from).collect())
}
