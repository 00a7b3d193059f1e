//! Platform-version inference from model identifiers.
//!
//! Model strings encode the hardware generation. The table maps generation
//! markers to platform versions, most recent generation first; the first
//! matching rule wins. The table is a compatibility surface: changing its
//! contents or order changes what existing histories report.

/// Ordered (markers, version) rules. Order is part of the contract.
const VERSION_RULES: &[(&[&str], &str)] = &[
    (&["CU", "DU"], "7.0"),
    (&["BU"], "6.5"),
    (&["AU"], "6.0"),
    (&["TU"], "5.5"),
    (&["RU"], "5.0"),
    (&["NU"], "4.0"),
    (&["MU", "M5"], "3.0"),
    (&["KU", "KS"], "2.4"),
    (&["JU", "JS"], "2.3"),
];

/// Version label reported when no rule matches.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Infer the platform version from a model identifier.
///
/// Matching is case-insensitive; empty input and unrecognized models both
/// yield [`UNKNOWN_VERSION`].
pub fn infer_version(model: &str) -> &'static str {
    if model.is_empty() {
        return UNKNOWN_VERSION;
    }
    let model = model.to_uppercase();
    for (markers, version) in VERSION_RULES {
        if markers.iter().any(|marker| model.contains(marker)) {
            return version;
        }
    }
    UNKNOWN_VERSION
}
