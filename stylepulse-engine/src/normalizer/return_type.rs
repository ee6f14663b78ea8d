//! Return reason → return type.

use crate::events::ReturnType;

const RTO_MARKERS: &[&str] = &["rto", "return to origin", "returned to origin"];

const CUSTOMER_MARKERS: &[&str] = &[
    "return",
    "customer",
    "refund",
    "exchange",
    "size",
    "fit",
    "quality",
    "defect",
    "damage",
    "wrong",
    "colour",
    "color",
    "not as described",
];

/// Classify free-text return reasons by case-insensitive keyword match.
/// RTO markers are checked first since "return to origin" also contains
/// "return". Anything unrecognised is `Unknown` and still counts as a return.
pub fn classify_return_reason(reason: &str) -> ReturnType {
    let reason = reason.to_lowercase();
    if RTO_MARKERS.iter().any(|m| reason.contains(m)) {
        ReturnType::Rto
    } else if CUSTOMER_MARKERS.iter().any(|m| reason.contains(m)) {
        ReturnType::CustomerReturn
    } else {
        ReturnType::Unknown
    }
}
