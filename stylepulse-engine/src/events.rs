//! Typed events and the in-memory event store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::IngestionFailure;
use crate::normalizer::{ColumnMapping, IngestWarning, Ingested, Normalizer, RawRow, SourceKind};

/// One sold unit. Quantity is always 1: every sales row is one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleEvent {
    pub style_id: String,
    pub date: NaiveDate,
    pub quantity: u32,
    /// Row price in minor units when a price column was mapped.
    pub amount_cents: Option<i64>,
}

/// How a return came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ReturnType {
    /// Return to Origin: undeliverable, shipped back by the courier.
    Rto,
    CustomerReturn,
    Unknown,
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Rto => write!(f, "RTO"),
            ReturnType::CustomerReturn => write!(f, "Customer Return"),
            ReturnType::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnEvent {
    pub style_id: String,
    pub date: NaiveDate,
    pub return_type: ReturnType,
    /// Raw reason text, trimmed.
    pub reason: String,
}

/// Descriptive attributes for one style.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CatalogEntry {
    pub style_id: String,
    pub attributes: BTreeMap<String, String>,
}

/// Per-file ingestion outcome, reported alongside the store.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub warnings: Vec<IngestWarning>,
    pub failures: Vec<IngestionFailure>,
    pub mappings: Vec<ColumnMapping>,
}

impl IngestReport {
    /// True when the file of this kind was rejected as a whole.
    pub fn failed(&self, kind: SourceKind) -> bool {
        self.failures.iter().any(|f| f.kind() == kind)
    }

    fn absorb<E>(&mut self, result: Result<Ingested<E>, IngestionFailure>) -> Vec<E> {
        match result {
            Ok(ingested) => {
                self.warnings.extend(ingested.warnings);
                self.mappings.push(ingested.mapping);
                ingested.events
            }
            Err(failure) => {
                log::warn!("ingestion failed: {}", failure);
                self.failures.push(failure);
                Vec::new()
            }
        }
    }
}

/// All normalized events of one upload.
///
/// Nothing downstream mutates it. A re-upload replaces it file by file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventStore {
    pub sales: Vec<SaleEvent>,
    pub returns: Vec<ReturnEvent>,
    pub catalog: Vec<CatalogEntry>,
}

impl EventStore {
    pub fn new(sales: Vec<SaleEvent>, returns: Vec<ReturnEvent>, catalog: Vec<CatalogEntry>) -> Self {
        Self {
            sales,
            returns,
            catalog,
        }
    }

    /// Normalize each file independently. A failing file contributes no
    /// events and is recorded in the report; the others still load.
    pub fn ingest(
        normalizer: &Normalizer,
        sales: &[RawRow],
        returns: Option<&[RawRow]>,
        catalog: Option<&[RawRow]>,
    ) -> (Self, IngestReport) {
        let mut report = IngestReport::default();

        let sales = report.absorb(normalizer.normalize::<SaleEvent>(sales));
        let returns = returns
            .map(|rows| report.absorb(normalizer.normalize::<ReturnEvent>(rows)))
            .unwrap_or_default();
        let catalog = catalog
            .map(|rows| report.absorb(normalizer.normalize::<CatalogEntry>(rows)))
            .unwrap_or_default();

        log::info!(
            "event store: {} sales, {} returns, {} catalog rows ({} warnings, {} failed files)",
            sales.len(),
            returns.len(),
            catalog.len(),
            report.warnings.len(),
            report.failures.len()
        );

        (Self::new(sales, returns, catalog), report)
    }

    /// Sale events grouped per style, styles in sorted order.
    pub fn sales_by_style(&self) -> BTreeMap<&str, Vec<&SaleEvent>> {
        let mut grouped: BTreeMap<&str, Vec<&SaleEvent>> = BTreeMap::new();
        for sale in &self.sales {
            grouped.entry(sale.style_id.as_str()).or_default().push(sale);
        }
        grouped
    }

    /// One merged catalog entry per style.
    ///
    /// Attributes from duplicate rows are unioned. When two rows disagree on
    /// a value the lexicographically smallest wins, so the result does not
    /// depend on row order.
    pub fn catalog_by_style(&self) -> BTreeMap<String, CatalogEntry> {
        let mut merged: BTreeMap<String, CatalogEntry> = BTreeMap::new();
        for entry in &self.catalog {
            let target = merged
                .entry(entry.style_id.clone())
                .or_insert_with(|| CatalogEntry {
                    style_id: entry.style_id.clone(),
                    attributes: BTreeMap::new(),
                });
            for (key, value) in &entry.attributes {
                match target.attributes.get_mut(key) {
                    Some(existing) if *existing != *value => {
                        log::warn!(
                            "catalog conflict for {} {}: {:?} vs {:?}",
                            entry.style_id,
                            key,
                            existing,
                            value
                        );
                        if *value < *existing {
                            *existing = value.clone();
                        }
                    }
                    Some(_) => {}
                    None => {
                        target.attributes.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        merged
    }
}
