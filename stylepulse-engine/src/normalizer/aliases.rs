//! Header alias table and fuzzy header scoring.
//!
//! Each canonical field has an ordered alias list per source kind. The order
//! matters: when two headers score the same, the one matching the earlier
//! alias wins. The table deserializes from JSON so deployments can extend it
//! without a rebuild:
//!
//! ```json
//! { "sales": { "style_id": ["style id", "seller sku"], "date": ["order date"] } }
//! ```
//!
//! A kind present in the JSON replaces that kind's whole default map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CanonicalField, SourceKind};

/// Ordered alias lists per canonical field.
pub type FieldAliases = BTreeMap<CanonicalField, Vec<String>>;

/// Alias lists for every source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasTable {
    pub sales: FieldAliases,
    pub returns: FieldAliases,
    pub catalog: FieldAliases,
}

const STYLE_ALIASES: &[&str] = &[
    "style id",
    "style code",
    "stylecode",
    "product id",
    "productid",
    "product code",
    "sku",
    "sku code",
    "sku id",
];

impl Default for AliasTable {
    fn default() -> Self {
        let mut sales = FieldAliases::new();
        insert(
            &mut sales,
            CanonicalField::Date,
            &[
                "created on",
                "order date",
                "created date",
                "order creation date",
                "order created on",
                "date",
            ],
        );
        insert(&mut sales, CanonicalField::StyleId, STYLE_ALIASES);
        insert(
            &mut sales,
            CanonicalField::Price,
            &[
                "final price",
                "selling price",
                "sale price",
                "net price",
                "unit price",
                "item price",
                "price",
                "gmv",
                "gross gmv",
                "net amount",
                "item total",
            ],
        );
        insert(
            &mut sales,
            CanonicalField::Quantity,
            &[
                "qty",
                "quantity",
                "units",
                "order qty",
                "qty ordered",
                "ordered qty",
                "item qty",
            ],
        );

        let mut returns = FieldAliases::new();
        insert(
            &mut returns,
            CanonicalField::Date,
            &[
                "return registered on",
                "return date",
                "registered on",
                "return created on",
                "created on",
                "date",
            ],
        );
        insert(&mut returns, CanonicalField::StyleId, STYLE_ALIASES);
        insert(
            &mut returns,
            CanonicalField::ReturnReason,
            &[
                "return reason type",
                "return type",
                "return reason",
                "reason",
                "status",
                "type",
            ],
        );

        let mut catalog = FieldAliases::new();
        insert(&mut catalog, CanonicalField::StyleId, STYLE_ALIASES);
        if let Some(styles) = catalog.get_mut(&CanonicalField::StyleId) {
            styles.extend(["article id", "code", "id"].map(String::from));
        }

        Self {
            sales,
            returns,
            catalog,
        }
    }
}

impl AliasTable {
    /// Aliases for one field of one source kind (empty when none configured).
    pub fn aliases(&self, kind: SourceKind, field: CanonicalField) -> &[String] {
        let map = match kind {
            SourceKind::Sales => &self.sales,
            SourceKind::Returns => &self.returns,
            SourceKind::Catalog => &self.catalog,
        };
        map.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn insert(map: &mut FieldAliases, field: CanonicalField, aliases: &[&str]) {
    map.insert(field, aliases.iter().map(|a| a.to_string()).collect());
}

/// Canonical header form: lowercase, every non-alphanumeric run collapsed to a
/// single space, trimmed. `"Order_Date "` and `"order-date"` both become
/// `"order date"`.
pub fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Score a normalized header against a normalized alias in [0, 1].
///
/// - exact match: 1.0
/// - alias tokens appear as a contiguous run inside the header:
///   0.8 + 0.2 x (alias length / header length)
/// - otherwise: normalized Levenshtein similarity
pub fn score_header(header: &str, alias: &str) -> f64 {
    if header.is_empty() || alias.is_empty() {
        return 0.0;
    }
    if header == alias {
        return 1.0;
    }
    if contains_token_run(header, alias) {
        return 0.8 + 0.2 * (alias.len() as f64 / header.len() as f64);
    }
    strsim::normalized_levenshtein(header, alias)
}

/// Best alias for a normalized header: `(alias rank, score)`.
/// Ties keep the earlier alias.
pub fn best_alias(header: &str, normalized_aliases: &[String]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (rank, alias) in normalized_aliases.iter().enumerate() {
        let score = score_header(header, alias);
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((rank, score)),
        }
    }
    best
}

fn contains_token_run(header: &str, alias: &str) -> bool {
    let header_tokens: Vec<&str> = header.split(' ').collect();
    let alias_tokens: Vec<&str> = alias.split(' ').collect();
    if alias_tokens.len() > header_tokens.len() {
        return false;
    }
    header_tokens
        .windows(alias_tokens.len())
        .any(|window| window == alias_tokens.as_slice())
}
