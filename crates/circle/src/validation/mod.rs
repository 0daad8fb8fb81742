//! Validation of order data against the CIRCLE rule file.
//!
//! A [`CircleValidator`] pairs a [`RuleSet`] with a [`ValuesLookup`] that
//! supplies reference values. Validation never fails as an operation; it
//! returns a [`ValidationReport`] that is empty when the data is valid.

pub mod lookup;
pub mod reference;
pub mod rules;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use lookup::{Product, StaticLookup, ValuesLookup};
pub use reference::ReferenceData;
pub use rules::{Rule, RuleSet};

use crate::order::{value_text, CircleData};
use rules::RuleContext;

/// Field holding the CIRCLE version.
const VERSION_FIELD: &str = "C0";

/// Validation errors, keyed by field code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationReport {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationReport {
    /// Record an error for a field.
    pub fn push(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(code.into()).or_default().push(message.into());
    }

    /// Whether the data passed every rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Errors for one field.
    #[must_use]
    pub fn errors_for(&self, code: &str) -> &[String] {
        self.errors.get(code).map_or(&[], Vec::as_slice)
    }

    /// All errors, keyed by field code.
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (code, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{code}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Validates order data against a rule set.
#[derive(Debug, Clone)]
pub struct CircleValidator {
    rules: RuleSet,
    lookup: Arc<dyn ValuesLookup>,
    current_year: i32,
}

impl CircleValidator {
    /// Create a validator.
    #[must_use]
    pub fn new(rules: RuleSet, lookup: Arc<dyn ValuesLookup>) -> Self {
        Self {
            rules,
            lookup,
            current_year: Utc::now().year(),
        }
    }

    /// A validator with no rules.
    #[must_use]
    pub fn permissive() -> Self {
        Self::new(RuleSet::default(), Arc::new(StaticLookup::new()))
    }

    /// Fix the year used to reject future vintages.
    #[must_use]
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    /// The configured rules.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Check `values` against every configured rule.
    ///
    /// Fields that are absent or `null` are skipped. Unknown rule types are
    /// ignored.
    #[must_use]
    pub fn validate(&self, values: &CircleData) -> ValidationReport {
        let version = values.get(VERSION_FIELD).and_then(value_text);
        let mut report = ValidationReport::default();

        for (code, rules) in self.rules.iter() {
            let Some(value) = values.get(code).filter(|v| !v.is_null()) else {
                continue;
            };

            let ctx = RuleContext {
                code,
                value,
                values,
                version: version.as_deref(),
                lookup: self.lookup.as_ref(),
                current_year: self.current_year,
            };

            for rule in rules {
                if let Some(message) = rule.check(&ctx) {
                    report.push(code, message);
                }
            }
        }

        if !report.is_empty() {
            tracing::debug!(fields = report.len(), "validation failed: {report}");
        }
        report
    }
}

/// Convert a JSON payload into CIRCLE data, or `None` if it is not an object.
#[must_use]
pub fn as_circle_data(value: Value) -> Option<CircleData> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> CircleData {
        as_circle_data(value).unwrap()
    }

    fn lookup() -> Arc<dyn ValuesLookup> {
        Arc::new(
            StaticLookup::new()
                .with_values("C0", ["11"])
                .with_values("C1", ["A0", "B0", "C0"])
                .with_values("C22", ["00", "A2", "B2"])
                .with_values("C23", ["01", "02"])
                .with_product(
                    Product::new("1111A0")
                        .with_vintages("2000", "2020")
                        .with_excluded(["2013"]),
                )
                .with_product(Product::new("2222B0")),
        )
    }

    fn validator(rules: Value) -> CircleValidator {
        let rules = RuleSet::from_json(&rules.to_string()).unwrap();
        CircleValidator::new(rules, lookup()).with_current_year(2024)
    }

    #[test]
    fn test_report_display() {
        let mut report = ValidationReport::default();
        assert!(report.is_empty());
        report.push("C1", "bad colour");
        report.push("C0", "bad version");
        report.push("C1", "too many");

        assert_eq!(report.len(), 2);
        assert_eq!(report.to_string(), "C0: bad version; C1: bad colour; C1: too many");
        assert_eq!(report.errors_for("C1").len(), 2);
    }

    #[test]
    fn test_report_serializes_as_map() {
        let mut report = ValidationReport::default();
        report.push("C10", "unknown product");
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"C10": ["unknown product"]})
        );
    }

    #[test]
    fn test_in_database() {
        let v = validator(json!({"C1": {"validations": [{"type": "in_database"}]}}));
        assert!(v.validate(&data(json!({"C1": "A0"}))).is_empty());
        assert!(v.validate(&data(json!({"C1": ["A0", "B0"]}))).is_empty());

        let report = v.validate(&data(json!({"C1": ["A0", "Z9"]})));
        assert!(report.errors_for("C1")[0].contains("Z9"));
    }

    #[test]
    fn test_absent_and_null_fields_are_skipped() {
        let v = validator(json!({"C1": {"validations": [{"type": "in_database"}]}}));
        assert!(v.validate(&data(json!({}))).is_empty());
        assert!(v.validate(&data(json!({"C1": null}))).is_empty());
    }

    #[test]
    fn test_unknown_rule_is_ignored() {
        let v = validator(json!({"C1": {"validations": [{"type": "sparkle"}]}}));
        assert!(v.validate(&data(json!({"C1": "anything"}))).is_empty());
    }

    #[test]
    fn test_combined_codes() {
        let v = validator(json!({"C21": {"validations": [{
            "type": "in_database_combination", "combination_codes": ["C22", "C23"]
        }]}}));

        assert!(v.validate(&data(json!({"C21": [["A2", "01"], ["B2", "02"]]}))).is_empty());
        assert!(v.validate(&data(json!({"C21": [[["A2", "01"], ["B2", "02"]]]}))).is_empty());
        assert!(v.validate(&data(json!({"C21": "00"}))).is_empty());

        assert!(!v.validate(&data(json!({"C21": [["A2", "99"]]}))).is_empty());
        assert!(!v.validate(&data(json!({"C21": [["A2"]]}))).is_empty());
        assert!(!v.validate(&data(json!({"C21": ["A2", "01"]}))).is_empty());
        assert!(!v.validate(&data(json!({"C21": "A2"}))).is_empty());
    }

    #[test]
    fn test_single_code() {
        let v = validator(json!({"C21": {"validations": [{
            "type": "in_database_combination",
            "combination_codes": ["C22", "C23"],
            "combinaison_mode": "single_code"
        }]}}));

        assert!(v.validate(&data(json!({"C21": ["A2", ["01", "02"]]}))).is_empty());
        assert!(!v.validate(&data(json!({"C21": ["A2"]}))).is_empty());
        assert!(!v.validate(&data(json!({"C21": ["A2", ["01", "03"]]}))).is_empty());
    }

    #[test]
    fn test_unknown_combination_mode() {
        let v = validator(json!({"C21": {"validations": [{
            "type": "in_database_combination",
            "combination_codes": ["C22"],
            "combinaison_mode": "sideways"
        }]}}));
        let report = v.validate(&data(json!({"C21": [["A2"]]})));
        assert!(report.errors_for("C21")[0].contains("sideways"));
    }

    #[test]
    fn test_single_value_outside_casket() {
        let v = validator(json!({"C40": {"validations": [{"type": "single_value"}]}}));
        assert!(v.validate(&data(json!({"C40": "1200"}))).is_empty());
        assert!(v.validate(&data(json!({"C40": ["1200"]}))).is_empty());
        assert!(!v.validate(&data(json!({"C40": ["1200", "600"]}))).is_empty());
        assert!(v
            .validate(&data(json!({"C2": "00", "C40": ["1200", "600"]})))
            .is_empty());
    }

    #[test]
    fn test_duplicate_value() {
        let v = validator(json!({"C1": {"validations": [{"type": "duplicate_value"}]}}));
        assert!(v.validate(&data(json!({"C1": ["A0", "B0"]}))).is_empty());
        assert!(!v.validate(&data(json!({"C1": ["A0", "A0"]}))).is_empty());
    }

    #[test]
    fn test_forbidden_value() {
        let v = validator(json!({"C1": {"validations": [
            {"type": "forbidden_value", "forbidden_values": ["C0"]}
        ]}}));
        assert!(v.validate(&data(json!({"C1": "A0"}))).is_empty());
        assert!(!v.validate(&data(json!({"C1": ["A0", "C0"]}))).is_empty());
    }

    #[test]
    fn test_match_value() {
        let v = validator(json!({"C11": {"validations": [
            {"type": "match_value", "pattern": "(19|20)[0-9]{2}"}
        ]}}));
        assert!(v.validate(&data(json!({"C11": "2019"}))).is_empty());
        assert!(v.validate(&data(json!({"C11": 2019}))).is_empty());
        assert!(!v.validate(&data(json!({"C11": "vintage 2019"}))).is_empty());
    }

    #[test]
    fn test_dependency() {
        let v = validator(json!({"C41": {"validations": [{
            "type": "dependency", "source_code": "C1", "source_value": "B0", "target_value": "75CL"
        }]}}));
        assert!(v.validate(&data(json!({"C1": "A0", "C41": "150CL"}))).is_empty());
        assert!(v.validate(&data(json!({"C1": ["B0"], "C41": "75CL"}))).is_empty());

        let report = v.validate(&data(json!({"C1": "B0", "C41": "150CL"})));
        assert!(report.errors_for("C41")[0].contains("75CL"));
    }

    #[test]
    fn test_excluded_combinations() {
        let v = validator(json!({"C21": {"validations": [{
            "type": "excluded_combinations",
            "excluded_combinations": [["/A.*/", "/A.*/"], ["B2", "01"]]
        }]}}));
        assert!(v.validate(&data(json!({"C21": ["A2", "B2"]}))).is_empty());
        assert!(!v.validate(&data(json!({"C21": ["A2", "A3"]}))).is_empty());
        assert!(!v.validate(&data(json!({"C21": ["01", "X", "B2"]}))).is_empty());
        assert!(v.validate(&data(json!({"C21": "A2"}))).is_empty());
    }

    #[test]
    fn test_casket_length() {
        let v = validator(json!({"C40": {"validations": [
            {"type": "casket_value", "match_array_length": true}
        ]}}));

        assert!(v.validate(&data(json!({"C2": "01", "C40": "1"}))).is_empty());
        assert!(!v.validate(&data(json!({"C2": "00", "C40": "1"}))).is_empty());
        assert!(v.validate(&data(json!({"C2": "00", "C40": ["1"]}))).is_empty());
        assert!(!v.validate(&data(json!({"C2": "00", "C40": ["1", "2"]}))).is_empty());
    }

    #[test]
    fn test_casket_allowed_values() {
        let v = validator(json!({"C3": {"validations": [
            {"type": "casket_value", "allowed_values": ["00"]}
        ]}}));
        assert!(v.validate(&data(json!({"C2": "00", "C3": "00"}))).is_empty());
        assert!(!v.validate(&data(json!({"C2": "00", "C3": "FR"}))).is_empty());
        assert!(v.validate(&data(json!({"C2": "01", "C3": "FR"}))).is_empty());

        let v = validator(json!({"C41": {"validations": [
            {"type": "casket_value", "allowed_values": [75, "50CL"]}
        ]}}));
        assert!(v.validate(&data(json!({"C2": "00", "C41": ["75", "50CL"]}))).is_empty());
        assert!(!v.validate(&data(json!({"C2": "00", "C41": "37"}))).is_empty());
    }

    #[test]
    fn test_product_validation() {
        let v = validator(json!({"C10": {"validations": [{"type": "product_validation"}]}}));
        let check = |product: &str, vintage: &str| {
            v.validate(&data(json!({"C10": product, "C11": vintage})))
        };

        assert!(check("1111A0", "2010").is_empty());
        assert!(!check("1111A0", "2013").is_empty());
        assert!(!check("1111A0", "1999").is_empty());
        assert!(!check("1111A0", "2021").is_empty());
        assert!(check("2222B0", "1950").is_empty());
        assert!(!check("2222B0", "2030").is_empty());
        assert!(check("9999", "2030").is_empty());
        assert!(v.validate(&data(json!({"C10": "1111A0"}))).is_empty());
    }

    #[test]
    fn test_version_reaches_lookup() {
        #[derive(Debug)]
        struct VersionedLookup;

        impl ValuesLookup for VersionedLookup {
            fn allowed_values(&self, _code: &str, version: Option<&str>) -> &[String] {
                static V11: std::sync::OnceLock<Vec<String>> = std::sync::OnceLock::new();
                match version {
                    Some("11") => V11.get_or_init(|| vec!["A0".to_string()]).as_slice(),
                    _ => &[],
                }
            }

            fn product(&self, _code: &str) -> Option<&Product> {
                None
            }
        }

        let rules =
            RuleSet::from_json(r#"{"C1": {"validations": [{"type": "in_database"}]}}"#).unwrap();
        let v = CircleValidator::new(rules, Arc::new(VersionedLookup));
        assert!(v.validate(&data(json!({"C0": "11", "C1": "A0"}))).is_empty());
        assert!(!v.validate(&data(json!({"C0": "12", "C1": "A0"}))).is_empty());
    }

    #[test]
    fn test_several_rules_on_one_field() {
        let v = validator(json!({"C1": {"validations": [
            {"type": "in_database"},
            {"type": "single_value"},
            {"type": "duplicate_value"}
        ]}}));
        let report = v.validate(&data(json!({"C1": ["Z9", "Z9"]})));
        assert_eq!(report.errors_for("C1").len(), 3);
    }

    #[test]
    fn test_permissive_validator() {
        let v = CircleValidator::permissive();
        assert!(v.rules().is_empty());
        assert!(v.validate(&data(json!({"C1": "anything"}))).is_empty());
    }
}
