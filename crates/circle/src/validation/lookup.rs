//! Reference value lookups used by the CIRCLE rules.

use std::collections::HashMap;
use std::fmt::Debug;

/// A wine product from the `C10` reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// The product's CIRCLE code.
    pub code: String,
    /// First vintage produced, or `ND` when unbounded.
    pub starting_vintage: String,
    /// Last vintage produced, or `ND` when unbounded.
    pub late_vintage: String,
    /// Vintages that were never produced.
    pub excluded_vintages: Vec<String>,
}

impl Product {
    /// Create a product with unbounded vintages.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            starting_vintage: UNBOUNDED.to_string(),
            late_vintage: UNBOUNDED.to_string(),
            excluded_vintages: Vec::new(),
        }
    }

    /// Set the vintage range.
    #[must_use]
    pub fn with_vintages(mut self, starting: impl Into<String>, late: impl Into<String>) -> Self {
        self.starting_vintage = starting.into();
        self.late_vintage = late.into();
        self
    }

    /// Set the excluded vintages.
    #[must_use]
    pub fn with_excluded<I, S>(mut self, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_vintages = excluded.into_iter().map(Into::into).collect();
        self
    }
}

/// Marker for "no bound" in the reference tables.
pub const UNBOUNDED: &str = "ND";

/// Source of the allowed values for each field code.
pub trait ValuesLookup: Send + Sync + Debug {
    /// Allowed values for `code`. `version` is the order's `C0` value.
    fn allowed_values(&self, code: &str, version: Option<&str>) -> &[String];

    /// Product details for a `C10` code.
    fn product(&self, code: &str) -> Option<&Product>;
}

/// An in-memory lookup table.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    values: HashMap<String, Vec<String>>,
    products: HashMap<String, Product>,
}

impl StaticLookup {
    /// Create an empty lookup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the allowed values for a code.
    #[must_use]
    pub fn with_values<I, S>(mut self, code: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_values(code, values.into_iter().map(Into::into).collect());
        self
    }

    /// Register a product.
    #[must_use]
    pub fn with_product(mut self, product: Product) -> Self {
        self.insert_product(product);
        self
    }

    /// Replace the allowed values for a code.
    pub fn insert_values(&mut self, code: &str, values: Vec<String>) {
        self.values.insert(code.to_string(), values);
    }

    /// Add or replace a product.
    pub fn insert_product(&mut self, product: Product) {
        self.products.insert(product.code.clone(), product);
    }

    /// Codes with registered values.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of registered products.
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

impl ValuesLookup for StaticLookup {
    fn allowed_values(&self, code: &str, _version: Option<&str>) -> &[String] {
        self.values.get(code).map_or(&[], Vec::as_slice)
    }

    fn product(&self, code: &str) -> Option<&Product> {
        self.products.get(code)
    }
}
