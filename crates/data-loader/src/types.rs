//! Core domain types for the procurement purchase-order dataset.
//!
//! This module defines the raw dataset row (`PurchaseOrder`) and the
//! distilled pair the training pipeline actually consumes
//! (`TransactionRecord`).

use serde::{Deserialize, Serialize};

// =============================================================================
// Raw Dataset Types
// =============================================================================

/// One row of the framework-agreement purchase-order report.
///
/// The ranking core only uses `producto` and `entidad`; the remaining
/// procurement fields are carried so the dataset surface stays complete
/// (they are streamed back verbatim by the dataset download endpoint and
/// available to future scoring passes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub fecha_proceso: String,
    pub acuerdo_marco: String,
    /// Catalog product description, e.g. "COMPUTADORAS PORTÁTILES"
    pub producto: String,
    /// Purchasing entity, e.g. a ministry or regional government
    pub entidad: String,
    pub proveedor: String,
    pub tipo_procedimiento: String,
    pub sub_total: f64,
    pub igv: f64,
    pub total: f64,
}

// =============================================================================
// Training Input
// =============================================================================

/// A single (product, entity) co-occurrence observed in the dataset.
///
/// Immutable; produced by a [`TransactionSource`](crate::TransactionSource)
/// and consumed once per training pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub producto: String,
    pub entidad: String,
}

impl TransactionRecord {
    pub fn new(producto: impl Into<String>, entidad: impl Into<String>) -> Self {
        Self {
            producto: producto.into(),
            entidad: entidad.into(),
        }
    }

    /// A record with an empty product or entity carries no signal and is
    /// skipped by the trainer.
    pub fn is_malformed(&self) -> bool {
        self.producto.trim().is_empty() || self.entidad.trim().is_empty()
    }
}

impl From<&PurchaseOrder> for TransactionRecord {
    fn from(order: &PurchaseOrder) -> Self {
        Self {
            producto: order.producto.clone(),
            entidad: order.entidad.clone(),
        }
    }
}
