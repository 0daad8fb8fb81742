//! CIRCLE rule definitions and their evaluation.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::lookup::{ValuesLookup, UNBOUNDED};
use crate::error::{Error, Result};
use crate::order::{value_text, CircleData};

/// Field holding the casket composition.
pub(crate) const CASKET_FIELD: &str = "C2";

/// `C2` value that switches an order into casket mode.
pub(crate) const CASKET_MARKER: &str = "00";

/// Product field checked by `product_validation`.
pub(crate) const PRODUCT_FIELD: &str = "C10";

/// Vintage field checked by `product_validation`.
pub(crate) const VINTAGE_FIELD: &str = "C11";

/// Placeholder value that disables combination checks.
const NO_COMBINATION: &str = "00";

/// The parsed rule file: field code to rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    fields: BTreeMap<String, FieldRules>,
}

/// Rules configured for one field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldRules {
    /// Rules, in file order.
    #[serde(default, deserialize_with = "lenient_rules")]
    pub validations: Vec<Rule>,
}

/// Entries without a string `type`, or with a type this version does not
/// know, become [`Rule::Unknown`]. Known types with bad parameters still fail.
fn lenient_rules<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<Rule>, D::Error> {
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|entry| {
            let rule = if entry.get("type").is_some_and(Value::is_string) {
                Rule::deserialize(&entry).map_err(<D::Error as serde::de::Error>::custom)?
            } else {
                Rule::Unknown
            };
            if matches!(rule, Rule::Unknown) {
                tracing::warn!(rule = %entry, "ignoring rule of unknown type");
            }
            Ok(rule)
        })
        .collect()
}

impl RuleSet {
    /// Parse a rule file's contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a rule has bad parameters.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a rule file. A missing file yields an empty rule set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RuleFile`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "rule file not found, no rules will apply");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| Error::RuleFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let rules = Self::from_json(&contents).map_err(|e| Error::RuleFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), fields = rules.len(), "loaded rule file");
        Ok(rules)
    }

    /// Add rules for a field.
    pub fn insert(&mut self, code: impl Into<String>, rules: Vec<Rule>) {
        self.fields.insert(code.into(), FieldRules { validations: rules });
    }

    /// Iterate over configured fields and their rules.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.fields
            .iter()
            .map(|(code, field)| (code.as_str(), field.validations.as_slice()))
    }

    /// Number of configured fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field has rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One validation rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Every value must be a reference value of the field.
    InDatabase,
    /// Values are combinations of other fields' reference values.
    InDatabaseCombination {
        /// Codes making up one combination, in order.
        #[serde(default)]
        combination_codes: Vec<String>,
        /// `combined_codes` (default) or `single_code`.
        #[serde(default, rename = "combinaison_mode", alias = "combination_mode")]
        mode: Option<String>,
    },
    /// A list may hold only one value, outside casket mode.
    SingleValue,
    /// A list may not repeat a value.
    DuplicateValue,
    /// Listed values are refused.
    ForbiddenValue {
        /// Refused values.
        #[serde(default)]
        forbidden_values: Vec<Value>,
    },
    /// Every value must match a pattern at its start.
    MatchValue {
        /// The pattern.
        pattern: Pattern,
    },
    /// A value in another field requires a value in this one.
    Dependency {
        /// Field to look at.
        #[serde(default)]
        source_code: String,
        /// Triggering value in the source field.
        #[serde(default)]
        source_value: Value,
        /// Value this field must then contain.
        #[serde(default)]
        target_value: Value,
    },
    /// Sets of values that may not appear together.
    ExcludedCombinations {
        /// Each inner list is one refused combination.
        #[serde(default)]
        excluded_combinations: Vec<Vec<ComboPattern>>,
    },
    /// Shape constraints that apply in casket mode.
    CasketValue {
        /// The field must hold one element per casket element.
        #[serde(default)]
        match_array_length: bool,
        /// Values allowed in casket mode, compared by their text.
        #[serde(default)]
        allowed_values: Vec<Value>,
    },
    /// Vintage must be valid for the product.
    ProductValidation,
    /// A rule type this version does not know; ignored.
    #[serde(other)]
    Unknown,
}

/// A compiled regular expression that matches at the start of a value.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex error if the pattern does not compile.
    pub fn new(source: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    /// Whether the pattern matches at the start of `text`.
    #[must_use]
    pub fn matches_start(&self, text: &str) -> bool {
        self.regex.find(text).is_some_and(|m| m.start() == 0)
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(&source).map_err(serde::de::Error::custom)
    }
}

/// One element of an excluded combination: `/re/` or a literal value.
#[derive(Debug, Clone)]
pub enum ComboPattern {
    /// Matches values whose text matches at the start.
    Regex(Pattern),
    /// Matches an equal value.
    Literal(Value),
}

impl ComboPattern {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Regex(pattern) => value_text(value).is_some_and(|text| pattern.matches_start(&text)),
            Self::Literal(expected) => expected == value,
        }
    }
}

impl<'de> Deserialize<'de> for ComboPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value.as_str() {
            Some(s) if s.len() >= 2 && s.starts_with('/') && s.ends_with('/') => {
                Pattern::new(&s[1..s.len() - 1])
                    .map(Self::Regex)
                    .map_err(serde::de::Error::custom)
            }
            _ => Ok(Self::Literal(value)),
        }
    }
}

/// Everything a rule needs to look at besides its own parameters.
pub(crate) struct RuleContext<'a> {
    pub code: &'a str,
    pub value: &'a Value,
    pub values: &'a CircleData,
    pub version: Option<&'a str>,
    pub lookup: &'a dyn ValuesLookup,
    pub current_year: i32,
}

impl RuleContext<'_> {
    fn casket_mode(&self) -> bool {
        self.values.get(CASKET_FIELD).and_then(Value::as_str) == Some(CASKET_MARKER)
    }

    fn allowed(&self, code: &str) -> &[String] {
        self.lookup.allowed_values(code, self.version)
    }

    fn is_allowed(&self, code: &str, value: &Value) -> bool {
        value_text(value).is_some_and(|text| self.allowed(code).contains(&text))
    }
}

impl Rule {
    /// Evaluate the rule, returning an error message if it fails.
    pub(crate) fn check(&self, ctx: &RuleContext<'_>) -> Option<String> {
        match self {
            Self::InDatabase => check_in_database(ctx),
            Self::InDatabaseCombination {
                combination_codes,
                mode,
            } => check_combination(ctx, combination_codes, mode.as_deref()),
            Self::SingleValue => check_single_value(ctx),
            Self::DuplicateValue => check_duplicates(ctx),
            Self::ForbiddenValue { forbidden_values } => check_forbidden(ctx, forbidden_values),
            Self::MatchValue { pattern } => check_match(ctx, pattern),
            Self::Dependency {
                source_code,
                source_value,
                target_value,
            } => check_dependency(ctx, source_code, source_value, target_value),
            Self::ExcludedCombinations {
                excluded_combinations,
            } => check_excluded(ctx, excluded_combinations),
            Self::CasketValue {
                match_array_length,
                allowed_values,
            } => check_casket(ctx, *match_array_length, allowed_values),
            Self::ProductValidation => check_product(ctx),
            Self::Unknown => None,
        }
    }
}

/// A scalar is a one-element list.
fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn display(value: &Value) -> String {
    value_text(value).unwrap_or_else(|| "null".to_string())
}

fn display_all(values: &[&Value]) -> String {
    values.iter().map(|v| display(v)).collect::<Vec<_>>().join(", ")
}

fn check_in_database(ctx: &RuleContext<'_>) -> Option<String> {
    let missing: Vec<&Value> = as_list(ctx.value)
        .into_iter()
        .filter(|v| !ctx.is_allowed(ctx.code, v))
        .collect();
    if missing.is_empty() {
        None
    } else {
        Some(format!(
            "value '{}' is not an allowed {} value",
            display_all(&missing),
            ctx.code
        ))
    }
}

fn check_combination(ctx: &RuleContext<'_>, codes: &[String], mode: Option<&str>) -> Option<String> {
    if ctx.value.as_str() == Some(NO_COMBINATION) {
        return None;
    }

    match mode.unwrap_or("combined_codes") {
        "combined_codes" => {
            let Value::Array(combinations) = ctx.value else {
                return Some(format!(
                    "{} must be a list of combinations of {}",
                    ctx.code,
                    codes.join(", ")
                ));
            };
            for combination in combinations {
                let Value::Array(entries) = combination else {
                    return Some(format!(
                        "each {} combination must be a list, got '{}'",
                        ctx.code,
                        display(combination)
                    ));
                };
                if entries.first().is_some_and(Value::is_array) {
                    for ensemble in entries {
                        if let Some(message) = check_ensemble(ctx, codes, ensemble) {
                            return Some(message);
                        }
                    }
                } else if let Some(message) = check_ensemble(ctx, codes, combination) {
                    return Some(message);
                }
            }
            None
        }
        "single_code" => {
            let elements = match ctx.value {
                Value::Array(elements) if elements.len() == codes.len() => elements,
                _ => {
                    return Some(format!(
                        "{} must hold one element per code ({})",
                        ctx.code,
                        codes.join(", ")
                    ))
                }
            };
            for (code, element) in codes.iter().zip(elements) {
                let missing: Vec<&Value> = as_list(element)
                    .into_iter()
                    .filter(|v| !ctx.is_allowed(code, v))
                    .collect();
                if !missing.is_empty() {
                    return Some(format!(
                        "value '{}' of {} is not an allowed {code} value",
                        display_all(&missing),
                        ctx.code
                    ));
                }
            }
            None
        }
        other => Some(format!("unknown combination mode '{other}' for {}", ctx.code)),
    }
}

fn check_ensemble(ctx: &RuleContext<'_>, codes: &[String], ensemble: &Value) -> Option<String> {
    let entries = match ensemble {
        Value::Array(entries) if entries.len() == codes.len() => entries,
        _ => {
            return Some(format!(
                "combination '{}' of {} must have one entry per code ({})",
                display(ensemble),
                ctx.code,
                codes.join(", ")
            ))
        }
    };

    codes
        .iter()
        .zip(entries)
        .find(|(code, entry)| !ctx.is_allowed(code, entry))
        .map(|(code, entry)| {
            format!(
                "value '{}' of {} is not an allowed {code} value",
                display(entry),
                ctx.code
            )
        })
}

fn check_single_value(ctx: &RuleContext<'_>) -> Option<String> {
    if ctx.casket_mode() {
        return None;
    }
    match ctx.value {
        Value::Array(items) if items.len() != 1 => {
            Some(format!("{} must hold a single value", ctx.code))
        }
        _ => None,
    }
}

fn check_duplicates(ctx: &RuleContext<'_>) -> Option<String> {
    let Value::Array(items) = ctx.value else {
        return None;
    };
    let mut seen = HashSet::new();
    let duplicated: Vec<&Value> = items
        .iter()
        .filter(|item| !seen.insert(item.to_string()))
        .collect();
    if duplicated.is_empty() {
        None
    } else {
        Some(format!(
            "{} repeats value '{}'",
            ctx.code,
            display_all(&duplicated)
        ))
    }
}

fn check_forbidden(ctx: &RuleContext<'_>, forbidden: &[Value]) -> Option<String> {
    let refused: Vec<&Value> = as_list(ctx.value)
        .into_iter()
        .filter(|v| forbidden.contains(v))
        .collect();
    if refused.is_empty() {
        None
    } else {
        Some(format!(
            "value '{}' is not allowed for {}",
            display_all(&refused),
            ctx.code
        ))
    }
}

fn check_match(ctx: &RuleContext<'_>, pattern: &Pattern) -> Option<String> {
    as_list(ctx.value)
        .into_iter()
        .find(|v| !pattern.matches_start(&display(v)))
        .map(|v| {
            format!(
                "value '{}' of {} does not match '{}'",
                display(v),
                ctx.code,
                pattern.as_str()
            )
        })
}

fn check_dependency(
    ctx: &RuleContext<'_>,
    source_code: &str,
    source_value: &Value,
    target_value: &Value,
) -> Option<String> {
    let triggered = ctx
        .values
        .get(source_code)
        .is_some_and(|source| as_list(source).contains(&source_value));
    if !triggered || as_list(ctx.value).contains(&target_value) {
        return None;
    }
    Some(format!(
        "when {source_code} is '{}', {} must be '{}' (got '{}')",
        display(source_value),
        ctx.code,
        display(target_value),
        display(ctx.value)
    ))
}

fn check_excluded(ctx: &RuleContext<'_>, combinations: &[Vec<ComboPattern>]) -> Option<String> {
    let values = as_list(ctx.value);
    combinations.iter().find_map(|combination| {
        let matched = match_combination(combination, &values)?;
        Some(format!(
            "combination '{}' is not allowed for {}",
            display_all(&matched),
            ctx.code
        ))
    })
}

/// Match each pattern against a distinct value, in order. Returns the
/// matched values if every pattern found one.
fn match_combination<'v>(patterns: &[ComboPattern], values: &[&'v Value]) -> Option<Vec<&'v Value>> {
    if patterns.is_empty() {
        return None;
    }
    let mut used = vec![false; values.len()];
    let mut matched = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let index = (0..values.len()).find(|&i| !used[i] && pattern.matches(values[i]))?;
        used[index] = true;
        matched.push(values[index]);
    }
    Some(matched)
}

fn check_casket(ctx: &RuleContext<'_>, match_array_length: bool, allowed: &[Value]) -> Option<String> {
    if !ctx.casket_mode() {
        return None;
    }

    if match_array_length {
        let expected = match ctx.values.get(CASKET_FIELD) {
            Some(Value::Array(items)) => items.len(),
            _ => 1,
        };
        return match ctx.value {
            Value::Array(items) if items.len() == expected => None,
            Value::Array(items) => Some(format!(
                "in casket mode, {} must have {expected} elements (got {})",
                ctx.code,
                items.len()
            )),
            _ => Some(format!(
                "in casket mode, {} must be a list of {expected} elements",
                ctx.code
            )),
        };
    }

    let allowed: Vec<String> = allowed.iter().filter_map(value_text).collect();
    let refused: Vec<&Value> = as_list(ctx.value)
        .into_iter()
        .filter(|v| !value_text(v).is_some_and(|text| allowed.contains(&text)))
        .collect();
    if refused.is_empty() {
        None
    } else {
        Some(format!(
            "in casket mode, {} must be one of {} (got '{}')",
            ctx.code,
            allowed.join(", "),
            display_all(&refused)
        ))
    }
}

fn check_product(ctx: &RuleContext<'_>) -> Option<String> {
    let vintage = ctx
        .values
        .get(VINTAGE_FIELD)
        .and_then(value_text)
        .filter(|v| !v.is_empty())?;
    let product_code = ctx.values.get(PRODUCT_FIELD).and_then(value_text)?;
    let product = ctx.lookup.product(&product_code)?;

    let bounded = |bound: &str| !bound.is_empty() && bound != UNBOUNDED;

    if product.excluded_vintages.contains(&vintage) {
        return Some(format!(
            "vintage {vintage} is excluded for product {product_code}"
        ));
    }
    if bounded(&product.starting_vintage) && vintage < product.starting_vintage {
        return Some(format!(
            "vintage {vintage} is before the first vintage {} of product {product_code}",
            product.starting_vintage
        ));
    }
    if bounded(&product.late_vintage) && vintage > product.late_vintage {
        return Some(format!(
            "vintage {vintage} is after the last vintage {} of product {product_code}",
            product.late_vintage
        ));
    }
    if vintage.parse::<i32>().is_ok_and(|year| year > ctx.current_year) {
        return Some(format!(
            "vintage {vintage} of product {product_code} cannot be in the future"
        ));
    }
    None
}
