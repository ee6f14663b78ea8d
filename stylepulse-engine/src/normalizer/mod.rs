//! Raw tabular rows → typed events.
//!
//! Marketplace exports disagree on column names ("Created On" vs
//! "order_date", "Style ID" vs "seller sku code"), date formats and style id
//! casing. The normalizer resolves each canonical field to one header using
//! the [`AliasTable`] and [`score_header`], then converts every row into a
//! typed event. Bad rows become [`IngestWarning`]s; only file-level problems
//! are errors.

pub mod aliases;
pub mod dates;
pub mod return_type;
pub mod style_id;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IngestionFailure;
use crate::events::{CatalogEntry, ReturnEvent, SaleEvent};
use crate::thresholds::MIN_COLUMN_CONFIDENCE;

pub use aliases::{best_alias, normalize_header, score_header, AliasTable, FieldAliases};
pub use dates::{parse_date, DateParser, DATE_PARSERS};
pub use return_type::classify_return_reason;
pub use style_id::normalize_style_id;

// ---------------------------------------------------------------------------
// Source and field identifiers
// ---------------------------------------------------------------------------

/// Which uploaded file a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Sales,
    Returns,
    Catalog,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Sales => write!(f, "sales"),
            SourceKind::Returns => write!(f, "returns"),
            SourceKind::Catalog => write!(f, "catalog"),
        }
    }
}

/// Canonical fields a raw header can be mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Date,
    StyleId,
    Quantity,
    Price,
    ReturnReason,
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalField::Date => write!(f, "date"),
            CanonicalField::StyleId => write!(f, "style id"),
            CanonicalField::Quantity => write!(f, "quantity"),
            CanonicalField::Price => write!(f, "price"),
            CanonicalField::ReturnReason => write!(f, "return reason"),
        }
    }
}

/// Fields resolved for a source kind, in resolution order, with whether each
/// is required. Earlier fields claim columns first.
pub fn fields_for(kind: SourceKind) -> &'static [(CanonicalField, bool)] {
    match kind {
        SourceKind::Sales => &[
            (CanonicalField::Date, true),
            (CanonicalField::StyleId, true),
            (CanonicalField::Price, false),
            (CanonicalField::Quantity, false),
        ],
        SourceKind::Returns => &[
            (CanonicalField::Date, true),
            (CanonicalField::StyleId, true),
            (CanonicalField::ReturnReason, false),
        ],
        SourceKind::Catalog => &[(CanonicalField::StyleId, true)],
    }
}

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// One untyped input row: `(header, value)` pairs in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub source: SourceKind,
    pub cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            cells: Vec::new(),
        }
    }

    /// Builder-style cell append.
    pub fn with(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.push((header.into(), value.into()));
        self
    }

    /// Value of the first cell under `header`.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }
}

// ---------------------------------------------------------------------------
// Column mapping and warnings
// ---------------------------------------------------------------------------

/// The header chosen for one canonical field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMatch {
    pub header: String,
    pub alias: String,
    pub score: f64,
}

/// Result of column auto-detection for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMapping {
    pub kind: SourceKind,
    pub columns: BTreeMap<CanonicalField, ColumnMatch>,
    /// Fields that were detected but are deliberately never read.
    pub ignored: Vec<CanonicalField>,
}

impl ColumnMapping {
    pub fn header(&self, field: CanonicalField) -> Option<&str> {
        self.columns.get(&field).map(|m| m.header.as_str())
    }
}

/// Why a single row was dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    MissingValue { field: CanonicalField },
    EmptyStyleId,
    UnparseableDate { value: String },
    SourceMismatch { found: SourceKind },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::MissingValue { field } => write!(f, "missing {}", field),
            ExclusionReason::EmptyStyleId => write!(f, "empty style id"),
            ExclusionReason::UnparseableDate { value } => {
                write!(f, "unparseable date {:?}", value)
            }
            ExclusionReason::SourceMismatch { found } => {
                write!(f, "row tagged {} in the wrong file", found)
            }
        }
    }
}

/// Non-fatal ingestion finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestWarning {
    /// A row was skipped. `row` is the 1-based data row number (header excluded).
    RowExcluded {
        kind: SourceKind,
        row: usize,
        reason: ExclusionReason,
    },
    /// Two headers scored the same for one field; `chosen` won on alias rank
    /// or position.
    AmbiguousColumn {
        kind: SourceKind,
        field: CanonicalField,
        chosen: String,
        rival: String,
        score: f64,
    },
}

impl fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestWarning::RowExcluded { kind, row, reason } => {
                write!(f, "{} row {} excluded: {}", kind, row, reason)
            }
            IngestWarning::AmbiguousColumn {
                kind,
                field,
                chosen,
                rival,
                score,
            } => write!(
                f,
                "{} {}: {:?} and {:?} both scored {:.2}; using {:?}",
                kind, field, chosen, rival, score, chosen
            ),
        }
    }
}

/// Output of normalizing one file.
#[derive(Debug, Clone)]
pub struct Ingested<E> {
    pub events: Vec<E>,
    pub warnings: Vec<IngestWarning>,
    pub mapping: ColumnMapping,
    pub rows_seen: usize,
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

/// An event type that can be built from one mapped raw row.
pub trait FromRawRow: Sized {
    const KIND: SourceKind;

    fn from_row(row: &RawRow, mapping: &ColumnMapping) -> Result<Self, ExclusionReason>;
}

impl FromRawRow for SaleEvent {
    const KIND: SourceKind = SourceKind::Sales;

    fn from_row(row: &RawRow, mapping: &ColumnMapping) -> Result<Self, ExclusionReason> {
        let style_id = required_style_id(row, mapping)?;
        let date = required_date(row, mapping)?;
        let amount_cents = mapping
            .header(CanonicalField::Price)
            .and_then(|h| row.get(h))
            .and_then(parse_amount_cents);
        Ok(SaleEvent {
            style_id,
            date,
            quantity: 1,
            amount_cents,
        })
    }
}

impl FromRawRow for ReturnEvent {
    const KIND: SourceKind = SourceKind::Returns;

    fn from_row(row: &RawRow, mapping: &ColumnMapping) -> Result<Self, ExclusionReason> {
        let style_id = required_style_id(row, mapping)?;
        let date = required_date(row, mapping)?;
        let reason = mapping
            .header(CanonicalField::ReturnReason)
            .and_then(|h| row.get(h))
            .unwrap_or("")
            .trim()
            .to_string();
        Ok(ReturnEvent {
            style_id,
            date,
            return_type: classify_return_reason(&reason),
            reason,
        })
    }
}

impl FromRawRow for CatalogEntry {
    const KIND: SourceKind = SourceKind::Catalog;

    fn from_row(row: &RawRow, mapping: &ColumnMapping) -> Result<Self, ExclusionReason> {
        let style_id = required_style_id(row, mapping)?;
        let style_header = mapping.header(CanonicalField::StyleId);
        let mut attributes = BTreeMap::new();
        for (header, value) in &row.cells {
            let value = value.trim();
            if Some(header.as_str()) == style_header || value.is_empty() {
                continue;
            }
            attributes
                .entry(header.trim().to_string())
                .or_insert_with(|| value.to_string());
        }
        Ok(CatalogEntry {
            style_id,
            attributes,
        })
    }
}

fn required_style_id(row: &RawRow, mapping: &ColumnMapping) -> Result<String, ExclusionReason> {
    let raw = mapping
        .header(CanonicalField::StyleId)
        .and_then(|h| row.get(h))
        .ok_or(ExclusionReason::MissingValue {
            field: CanonicalField::StyleId,
        })?;
    normalize_style_id(raw).ok_or(ExclusionReason::EmptyStyleId)
}

fn required_date(
    row: &RawRow,
    mapping: &ColumnMapping,
) -> Result<chrono::NaiveDate, ExclusionReason> {
    let raw = mapping
        .header(CanonicalField::Date)
        .and_then(|h| row.get(h))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ExclusionReason::MissingValue {
            field: CanonicalField::Date,
        })?;
    parse_date(raw).ok_or_else(|| ExclusionReason::UnparseableDate {
        value: raw.to_string(),
    })
}

/// Parse a price cell into integer minor units.
///
/// Currency prefixes, thousands separators and spaces are skipped:
/// `"Rs. 1,299.50"` → `129950`. Returns `None` when no number is present.
pub fn parse_amount_cents(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '_') && !c.is_whitespace())
        .collect();
    let first_digit = cleaned.find(|c: char| c.is_ascii_digit())?;
    let negative = cleaned[..first_digit].ends_with('-');
    let number: String = cleaned[first_digit..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = number.trim_end_matches('.').parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let cents = (value * 100.0).round() as i64;
    Some(if negative { -cents } else { cents })
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Column detection plus row conversion, driven by an alias table.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    pub aliases: AliasTable,
}

impl Normalizer {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    /// Map canonical fields onto `headers` for one source kind.
    ///
    /// Fields are resolved in [`fields_for`] order and each header is claimed
    /// at most once. Candidates sort by score, then alias rank, then header
    /// position; a header must reach [`MIN_COLUMN_CONFIDENCE`]. A required
    /// field with no qualifying header fails the whole file.
    pub fn detect_columns(
        &self,
        headers: &[String],
        kind: SourceKind,
    ) -> Result<(ColumnMapping, Vec<IngestWarning>), IngestionFailure> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut claimed = vec![false; headers.len()];
        let mut columns = BTreeMap::new();
        let mut warnings = Vec::new();

        for &(field, required) in fields_for(kind) {
            let aliases: Vec<String> = self
                .aliases
                .aliases(kind, field)
                .iter()
                .map(|a| normalize_header(a))
                .filter(|a| !a.is_empty())
                .collect();

            // (score, alias rank, header index)
            let mut candidates: Vec<(f64, usize, usize)> = normalized
                .iter()
                .enumerate()
                .filter(|(idx, _)| !claimed[*idx])
                .filter_map(|(idx, header)| {
                    best_alias(header, &aliases).map(|(rank, score)| (score, rank, idx))
                })
                .collect();
            candidates.sort_by(|a, b| {
                b.0.total_cmp(&a.0)
                    .then(a.1.cmp(&b.1))
                    .then(a.2.cmp(&b.2))
            });

            match candidates.first() {
                Some(&(score, rank, idx)) if score >= MIN_COLUMN_CONFIDENCE => {
                    if let Some(&(rival_score, _, rival_idx)) = candidates.get(1) {
                        if rival_score == score {
                            log::warn!(
                                "{} {}: {:?} and {:?} tie at {:.2}",
                                kind,
                                field,
                                headers[idx],
                                headers[rival_idx],
                                score
                            );
                            warnings.push(IngestWarning::AmbiguousColumn {
                                kind,
                                field,
                                chosen: headers[idx].clone(),
                                rival: headers[rival_idx].clone(),
                                score,
                            });
                        }
                    }
                    claimed[idx] = true;
                    columns.insert(
                        field,
                        ColumnMatch {
                            header: headers[idx].clone(),
                            alias: aliases[rank].clone(),
                            score,
                        },
                    );
                }
                best if required => {
                    return Err(IngestionFailure::UnmappedField {
                        kind,
                        field,
                        best_header: best.map(|&(_, _, idx)| headers[idx].clone()),
                        best_score: best.map_or(0.0, |&(score, _, _)| score),
                        threshold: MIN_COLUMN_CONFIDENCE,
                    });
                }
                _ => {}
            }
        }

        let ignored = if columns.contains_key(&CanonicalField::Quantity) {
            vec![CanonicalField::Quantity]
        } else {
            Vec::new()
        };

        Ok((
            ColumnMapping {
                kind,
                columns,
                ignored,
            },
            warnings,
        ))
    }

    /// Normalize every row of one file into events of type `E`.
    pub fn normalize<E: FromRawRow>(
        &self,
        rows: &[RawRow],
    ) -> Result<Ingested<E>, IngestionFailure> {
        let kind = E::KIND;
        let first = rows.first().ok_or(IngestionFailure::EmptyInput { kind })?;
        let headers: Vec<String> = first.headers().map(str::to_string).collect();
        let (mapping, mut warnings) = self.detect_columns(&headers, kind)?;

        if let Some(header) = mapping.header(CanonicalField::Quantity) {
            log::info!(
                "{}: quantity column {:?} ignored; every row counts as one unit",
                kind,
                header
            );
        }

        let mut events = Vec::with_capacity(rows.len());
        let mut excluded = 0usize;
        for (i, row) in rows.iter().enumerate() {
            let result = if row.source != kind {
                Err(ExclusionReason::SourceMismatch { found: row.source })
            } else {
                E::from_row(row, &mapping)
            };
            match result {
                Ok(event) => events.push(event),
                Err(reason) => {
                    excluded += 1;
                    log::debug!("{} row {} excluded: {}", kind, i + 1, reason);
                    warnings.push(IngestWarning::RowExcluded {
                        kind,
                        row: i + 1,
                        reason,
                    });
                }
            }
        }

        if events.is_empty() {
            return Err(IngestionFailure::NoUsableRows {
                kind,
                seen: rows.len(),
                excluded,
            });
        }

        log::info!(
            "{}: {} rows seen, {} kept, {} excluded",
            kind,
            rows.len(),
            events.len(),
            excluded
        );

        Ok(Ingested {
            events,
            warnings,
            mapping,
            rows_seen: rows.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ReturnType;
    use chrono::NaiveDate;

    fn sale_row(date: &str, style: &str) -> RawRow {
        RawRow::new(SourceKind::Sales)
            .with("Created On", date)
            .with("Style ID", style)
            .with("Final Price", "499.00")
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn detects_legacy_sales_headers() {
        let normalizer = Normalizer::default();
        let (mapping, warnings) = normalizer
            .detect_columns(
                &headers(&["Order ID", "Created On", "Style ID", "Final Price", "Qty"]),
                SourceKind::Sales,
            )
            .unwrap();
        assert_eq!(mapping.header(CanonicalField::Date), Some("Created On"));
        assert_eq!(mapping.header(CanonicalField::StyleId), Some("Style ID"));
        assert_eq!(mapping.header(CanonicalField::Price), Some("Final Price"));
        assert_eq!(mapping.header(CanonicalField::Quantity), Some("Qty"));
        assert_eq!(mapping.ignored, vec![CanonicalField::Quantity]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn detects_renamed_headers_by_token_containment() {
        let normalizer = Normalizer::default();
        let (mapping, _) = normalizer
            .detect_columns(
                &headers(&["order_date_ist", "Seller SKU Code"]),
                SourceKind::Sales,
            )
            .unwrap();
        assert_eq!(mapping.header(CanonicalField::Date), Some("order_date_ist"));
        assert_eq!(
            mapping.header(CanonicalField::StyleId),
            Some("Seller SKU Code")
        );
    }

    #[test]
    fn tied_headers_raise_ambiguity_and_keep_first() {
        let normalizer = Normalizer::default();
        let (mapping, warnings) = normalizer
            .detect_columns(
                &headers(&["Style ID", "date", "Date "]),
                SourceKind::Sales,
            )
            .unwrap();
        assert_eq!(mapping.header(CanonicalField::Date), Some("date"));
        assert!(matches!(
            &warnings[0],
            IngestWarning::AmbiguousColumn { field: CanonicalField::Date, rival, .. } if rival == "Date "
        ));
    }

    #[test]
    fn columns_are_claimed_once() {
        // "created on" is the sales date; the style field must not reuse it
        let normalizer = Normalizer::default();
        let err = normalizer
            .detect_columns(&headers(&["Created On"]), SourceKind::Sales)
            .unwrap_err();
        assert!(matches!(
            err,
            IngestionFailure::UnmappedField {
                field: CanonicalField::StyleId,
                ..
            }
        ));
    }

    #[test]
    fn missing_style_column_fails_file() {
        let rows = vec![RawRow::new(SourceKind::Sales)
            .with("Created On", "2024-01-05")
            .with("Brand", "Acme")];
        let err = Normalizer::default().normalize::<SaleEvent>(&rows).unwrap_err();
        match err {
            IngestionFailure::UnmappedField {
                kind,
                field,
                threshold,
                ..
            } => {
                assert_eq!(kind, SourceKind::Sales);
                assert_eq!(field, CanonicalField::StyleId);
                assert!((threshold - MIN_COLUMN_CONFIDENCE).abs() < 1e-12);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn empty_input_fails_file() {
        let err = Normalizer::default()
            .normalize::<ReturnEvent>(&[])
            .unwrap_err();
        assert_eq!(
            err,
            IngestionFailure::EmptyInput {
                kind: SourceKind::Returns
            }
        );
    }

    #[test]
    fn bad_rows_become_warnings() {
        let rows = vec![
            sale_row("2024-01-05", "  ABC-1 "),
            sale_row("someday", "abc-2"),
            sale_row("2024-01-06", "   "),
            RawRow::new(SourceKind::Returns)
                .with("Created On", "2024-01-06")
                .with("Style ID", "abc-3"),
        ];
        let ingested = Normalizer::default().normalize::<SaleEvent>(&rows).unwrap();
        assert_eq!(ingested.rows_seen, 4);
        assert_eq!(ingested.events.len(), 1);
        assert_eq!(ingested.events[0].style_id, "abc-1");
        assert_eq!(
            ingested.events[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(ingested.events[0].amount_cents, Some(49_900));

        let reasons: Vec<_> = ingested
            .warnings
            .iter()
            .map(|w| match w {
                IngestWarning::RowExcluded { row, reason, .. } => (*row, reason.clone()),
                other => panic!("unexpected warning: {:?}", other),
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                (
                    2,
                    ExclusionReason::UnparseableDate {
                        value: "someday".into()
                    }
                ),
                (3, ExclusionReason::EmptyStyleId),
                (
                    4,
                    ExclusionReason::SourceMismatch {
                        found: SourceKind::Returns
                    }
                ),
            ]
        );
    }

    #[test]
    fn all_rows_excluded_fails_file() {
        let rows = vec![sale_row("never", "abc-1"), sale_row("", "abc-2")];
        let err = Normalizer::default().normalize::<SaleEvent>(&rows).unwrap_err();
        assert_eq!(
            err,
            IngestionFailure::NoUsableRows {
                kind: SourceKind::Sales,
                seen: 2,
                excluded: 2
            }
        );
    }

    #[test]
    fn quantity_column_is_never_read() {
        let rows = vec![RawRow::new(SourceKind::Sales)
            .with("Order Date", "2024-02-01")
            .with("SKU", "x-1")
            .with("Quantity", "12")];
        let ingested = Normalizer::default().normalize::<SaleEvent>(&rows).unwrap();
        assert_eq!(ingested.events[0].quantity, 1);
        assert_eq!(ingested.events[0].amount_cents, None);
    }

    #[test]
    fn returns_are_typed_from_reason_column() {
        let rows = vec![
            RawRow::new(SourceKind::Returns)
                .with("Return Date", "2024-03-01")
                .with("Style ID", "s-1")
                .with("Return Reason Type", "RTO"),
            RawRow::new(SourceKind::Returns)
                .with("Return Date", "2024-03-02")
                .with("Style ID", "s-1")
                .with("Return Reason Type", "Customer Return"),
        ];
        let ingested = Normalizer::default().normalize::<ReturnEvent>(&rows).unwrap();
        assert_eq!(ingested.events[0].return_type, ReturnType::Rto);
        assert_eq!(ingested.events[1].return_type, ReturnType::CustomerReturn);
        assert_eq!(ingested.events[1].reason, "Customer Return");
    }

    #[test]
    fn catalog_rows_keep_other_columns_as_attributes() {
        let rows = vec![RawRow::new(SourceKind::Catalog)
            .with("Style Code", "9001.0")
            .with("Brand", "Acme")
            .with("Colour", "")
            .with("Category", " Tops ")];
        let ingested = Normalizer::default().normalize::<CatalogEntry>(&rows).unwrap();
        let entry = &ingested.events[0];
        assert_eq!(entry.style_id, "9001");
        assert_eq!(entry.attributes.len(), 2);
        assert_eq!(entry.attributes["Brand"], "Acme");
        assert_eq!(entry.attributes["Category"], "Tops");
    }

    #[test]
    fn amounts_parse_to_cents() {
        assert_eq!(parse_amount_cents("499"), Some(49_900));
        assert_eq!(parse_amount_cents("Rs. 1,299.50"), Some(129_950));
        assert_eq!(parse_amount_cents("-12.5"), Some(-1_250));
        assert_eq!(parse_amount_cents("0.005"), Some(1));
        assert_eq!(parse_amount_cents("n/a"), None);
        assert_eq!(parse_amount_cents(""), None);
    }
}
