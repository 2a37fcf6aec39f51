//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for EngineConfig.
///
/// Maintained by hand to match the struct hierarchy in engine_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [lens]
        "lens",
        "lens.a_constant",
        "lens.haigis_a0",
        "lens.haigis_a1",
        "lens.haigis_a2",
        // [target]
        "target",
        "target.refraction_d",
        // [crosscheck]
        "crosscheck",
        "crosscheck.formulas",
        "crosscheck.spread_warning_d",
    ];
    keys.iter().copied().collect()
}

/// Recursively collect dotted key paths from a TOML value.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Never fails; parse errors are left for serde to report.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed EngineConfig.
///
/// Returns (errors, warnings). Errors are values no formula can use;
/// warnings are legal but unusual.
pub fn validate_ranges(config: &super::EngineConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let lens = &config.lens;
    let finite_fields = [
        ("lens.a_constant", lens.a_constant),
        ("lens.haigis_a1", lens.haigis_a1),
        ("lens.haigis_a2", lens.haigis_a2),
        ("target.refraction_d", config.target.refraction_d),
        ("crosscheck.spread_warning_d", config.crosscheck.spread_warning_d),
    ];
    for (field, value) in finite_fields {
        if !value.is_finite() {
            errors.push(format!("{field} = {value} must be a finite number"));
        }
    }
    if let Some(a0) = lens.haigis_a0 {
        if !a0.is_finite() {
            errors.push(format!("lens.haigis_a0 = {a0} must be a finite number"));
        }
    }

    if config.crosscheck.spread_warning_d <= 0.0 {
        errors.push(format!(
            "crosscheck.spread_warning_d = {:.3} must be > 0",
            config.crosscheck.spread_warning_d
        ));
    }
    if config.crosscheck.formulas.is_empty() {
        errors.push("crosscheck.formulas must list at least one formula".to_string());
    }

    // Commercial SRK/T A-constants sit roughly between 110 and 125
    if !(110.0..=125.0).contains(&lens.a_constant) {
        warnings.push(ValidationWarning {
            field: "lens.a_constant".to_string(),
            message: format!(
                "a_constant = {:.2} is outside the typical range (110-125)",
                lens.a_constant
            ),
            suggestion: None,
        });
    }

    if config.target.refraction_d.abs() > 10.0 {
        warnings.push(ValidationWarning {
            field: "target.refraction_d".to_string(),
            message: format!(
                "refraction_d = {:.2} D is an unusual target refraction",
                config.target.refraction_d
            ),
            suggestion: None,
        });
    }

    let mut seen = HashSet::new();
    for f in &config.crosscheck.formulas {
        if !seen.insert(*f) {
            warnings.push(ValidationWarning {
                field: "crosscheck.formulas".to_string(),
                message: format!("formula '{}' listed more than once", f.as_str()),
                suggestion: None,
            });
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("a_constnt", "a_constant"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [lens]
            a_constant = 118.4
            [crosscheck]
            formulas = ["srk_t", "haigis"]
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"lens".to_string()));
        assert!(keys.contains(&"lens.a_constant".to_string()));
        assert!(keys.contains(&"crosscheck.formulas".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[lens]
a_constnat = 118.7
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "lens.a_constnat");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("lens.a_constant"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_default_config_has_no_range_findings() {
        let (errors, warnings) = validate_ranges(&EngineConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_non_positive_spread_is_error() {
        let mut config = EngineConfig::default();
        config.crosscheck.spread_warning_d = 0.0;
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("spread_warning_d")));
    }

    #[test]
    fn test_unusual_a_constant_is_warning_only() {
        let mut config = EngineConfig::default();
        config.lens.a_constant = 105.0;
        let (errors, warnings) = validate_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "lens.a_constant"));
    }

    #[test]
    fn test_nan_is_error() {
        let mut config = EngineConfig::default();
        config.lens.haigis_a1 = f64::NAN;
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("haigis_a1")));
    }
}
