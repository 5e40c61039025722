//! Administrative-code to region lookup (§4.H): a small static table, not a
//! generated gazetteer — enough ISO 3166-2 state codes to resolve the
//! Brazil-focused scenarios without depending on an external places
//! service.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use floracat_core::RegionCode;

/// `ISO 3166-2:BR` state code → WGSRPD level-3 region code.
static ADMIN_CODE_TABLE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("BR-AM", "BZN"),
        ("BR-RR", "BZN"),
        ("BR-AP", "BZN"),
        ("BR-PA", "BZN"),
        ("BR-AC", "BZN"),
        ("BR-RO", "BZN"),
        ("BR-TO", "BZN"),
        ("BR-MA", "BZE"),
        ("BR-PI", "BZE"),
        ("BR-CE", "BZE"),
        ("BR-RN", "BZE"),
        ("BR-PB", "BZE"),
        ("BR-PE", "BZE"),
        ("BR-AL", "BZE"),
        ("BR-SE", "BZE"),
        ("BR-BA", "BZE"),
        ("BR-MT", "BZC"),
        ("BR-MS", "BZC"),
        ("BR-GO", "BZC"),
        ("BR-DF", "BZC"),
        ("BR-MG", "BZL"),
        ("BR-ES", "BZL"),
        ("BR-RJ", "BZL"),
        ("BR-SP", "BZL"),
        ("BR-PR", "BZS"),
        ("BR-SC", "BZS"),
        ("BR-RS", "BZS"),
    ])
});

/// Resolve an administrative code (e.g. `"BR-SC"`) to its containing region,
/// or `None` if the code isn't in the table.
pub fn region_for_admin_code(code: &str) -> Option<RegionCode> {
    ADMIN_CODE_TABLE.get(code).map(|r| RegionCode::new(*r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_state_resolves_to_brazil_south() {
        assert_eq!(region_for_admin_code("BR-SC"), Some(RegionCode::new("BZS")));
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(region_for_admin_code("XX-00"), None);
    }
}
