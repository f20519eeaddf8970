//! Variable matching
//!
//! A filter is a `Variable` whose absent fields are wildcards. A present field
//! matches by exact equality, or by substring containment when `alike` is set.
//! Matching is case-sensitive.

use crate::storage::Variable;

fn field_matches(filter: Option<&str>, candidate: Option<&str>, alike: bool) -> bool {
    match (filter, candidate) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(wanted), Some(actual)) if alike => actual.contains(wanted),
        (Some(wanted), Some(actual)) => actual == wanted,
    }
}

/// Check a candidate against a single filter; every field must match
pub fn matches(filter: &Variable, candidate: &Variable, alike: bool) -> bool {
    filter
        .fields()
        .iter()
        .zip(candidate.fields().iter())
        .all(|(wanted, actual)| field_matches(*wanted, *actual, alike))
}

/// Keep the candidates matched by at least one filter, in candidate order
pub fn select_matching<'a, T>(
    filters: &[Variable],
    candidates: impl IntoIterator<Item = (T, &'a Variable)>,
    alike: bool,
) -> Vec<(T, &'a Variable)> {
    candidates
        .into_iter()
        .filter(|(_, candidate)| filters.iter().any(|f| matches(f, candidate, alike)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone_temp() -> Variable {
        Variable::new("BLOCK1:ZONE1", "Zone Mean Air Temperature", "C")
    }

    #[test]
    fn test_exact_match() {
        let candidate = zone_temp();
        assert!(matches(&zone_temp(), &candidate, false));
        assert!(!matches(
            &Variable::any().with_key("BLOCK1"),
            &candidate,
            false
        ));
    }

    #[test]
    fn test_alike_match() {
        let candidate = zone_temp();
        let filter = Variable::any().with_key("ZONE1").with_type("Temperature");
        assert!(matches(&filter, &candidate, true));
        assert!(!matches(&filter, &candidate, false));
    }

    #[test]
    fn test_case_sensitive() {
        let filter = Variable::any().with_key("zone1");
        assert!(!matches(&filter, &zone_temp(), true));
    }

    #[test]
    fn test_wildcards() {
        assert!(matches(&Variable::any(), &zone_temp(), false));
        assert!(matches(&Variable::any().with_units("C"), &zone_temp(), false));
        assert!(!matches(&Variable::any().with_units("W"), &zone_temp(), false));

        // empty units are a value, not a wildcard
        let unitless = Variable::new("Environment", "Site Day Type Index", "");
        assert!(matches(&Variable::any().with_units(""), &unitless, false));
        assert!(!matches(&Variable::any().with_units(""), &zone_temp(), false));
    }

    #[test]
    fn test_select_matching_is_ordered_and_unique() {
        let a = zone_temp();
        let b = Variable::new("BLOCK1:ZONE2", "Zone Mean Air Temperature", "C");
        let c = Variable::new("Environment", "Site Outdoor Air Drybulb Temperature", "C");
        let candidates = vec![(3u32, &a), (1, &b), (2, &c)];

        let filters = vec![
            Variable::any().with_key("Environment"),
            Variable::any().with_type("Zone Mean Air Temperature"),
            Variable::any().with_units("C"),
        ];
        let selected = select_matching(&filters, candidates.clone(), false);
        let ids: Vec<u32> = selected.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![3, 1, 2]);

        let selected = select_matching(&[Variable::any().with_key("ZONE2")], candidates, true);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].1, &b);
    }
}
