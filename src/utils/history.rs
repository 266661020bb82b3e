// History ids - correlate the same logical test across runs

use crate::model::Parameter;
use uuid::Uuid;

/// Deterministic history id for a test and its parameters
///
/// Excluded parameters are ignored and the rest are sorted by name and value,
/// so the id does not depend on the order parameters were reported in.
pub fn history_id(full_name: &str, parameters: &[Parameter]) -> String {
    let mut params: Vec<&Parameter> = parameters.iter().filter(|p| !p.excluded).collect();
    params.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value)));

    let mut material = Vec::with_capacity(full_name.len() + params.len() * 16);
    material.extend_from_slice(full_name.as_bytes());
    for param in params {
        material.push(0);
        material.extend_from_slice(param.name.as_bytes());
        material.push(0);
        material.extend_from_slice(param.value.as_bytes());
    }

    Uuid::new_v5(&Uuid::NAMESPACE_OID, &material)
        .simple()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_id_is_stable() {
        let params = vec![Parameter::new("user", "alice")];
        let first = history_id("auth::login", &params);
        let second = history_id("auth::login", &params);

        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_history_id_ignores_parameter_order() {
        let a = vec![Parameter::new("a", "1"), Parameter::new("b", "2")];
        let b = vec![Parameter::new("b", "2"), Parameter::new("a", "1")];
        assert_eq!(history_id("t", &a), history_id("t", &b));
    }

    #[test]
    fn test_history_id_sensitive_to_values_and_name() {
        let base = history_id("t", &[Parameter::new("a", "1")]);
        assert_ne!(base, history_id("t", &[Parameter::new("a", "2")]));
        assert_ne!(base, history_id("u", &[Parameter::new("a", "1")]));
        assert_ne!(base, history_id("t", &[]));
    }

    #[test]
    fn test_history_id_separates_fields() {
        // "ab" + "c" must not collide with "a" + "bc"
        let left = history_id("t", &[Parameter::new("ab", "c")]);
        let right = history_id("t", &[Parameter::new("a", "bc")]);
        assert_ne!(left, right);
    }

    #[test]
    fn test_history_id_skips_excluded_parameters() {
        let with_excluded = vec![
            Parameter::new("a", "1"),
            Parameter::new("timestamp", "1700000000").excluded(),
        ];
        assert_eq!(
            history_id("t", &with_excluded),
            history_id("t", &[Parameter::new("a", "1")])
        );
    }
}
