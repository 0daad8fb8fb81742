//! Reference values loaded from a directory of CSV files.
//!
//! Each file is named `<CODE>_<anything>.csv` and has a `CircleCode` column
//! listing the allowed values of that field. The `C10` file also describes
//! products with `StartingVintage`, `LateVintage` and `ExcludedVintage`
//! columns.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::lookup::{Product, ValuesLookup, UNBOUNDED};
use super::rules::PRODUCT_FIELD;
use crate::error::{Error, Result};

const CODE_COLUMN: &str = "CircleCode";
const STARTING_VINTAGE_COLUMN: &str = "StartingVintage";
const LATE_VINTAGE_COLUMN: &str = "LateVintage";
const EXCLUDED_VINTAGE_COLUMN: &str = "ExcludedVintage";

/// Reference values read from CSV files.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    dir: PathBuf,
    values: HashMap<String, Vec<String>>,
    products: HashMap<String, Product>,
}

impl ReferenceData {
    /// Load every `<CODE>_*.csv` file in `dir`.
    ///
    /// A missing directory yields empty reference data. When several files
    /// share a code, the first by name wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or a file is not
    /// valid CSV.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut data = Self {
            dir: dir.to_path_buf(),
            ..Self::default()
        };

        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "reference directory not found, no reference values");
            return Ok(data);
        }

        let mut files: Vec<(String, PathBuf)> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter_map(|path| code_for_file(&path).map(|code| (code, path)))
            .collect();
        files.sort_by(|a, b| a.1.cmp(&b.1));

        for (code, path) in files {
            if data.values.contains_key(&code) {
                tracing::warn!(code = %code, path = %path.display(), "duplicate reference file ignored");
                continue;
            }
            data.load_file(&code, &path)?;
        }

        tracing::debug!(
            dir = %dir.display(),
            codes = data.values.len(),
            products = data.products.len(),
            "loaded reference data"
        );
        Ok(data)
    }

    fn load_file(&mut self, code: &str, path: &Path) -> Result<()> {
        let reference_error = |source| Error::ReferenceData {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(reference_error)?;
        let headers = reader.headers().map_err(reference_error)?.clone();

        let Some(code_idx) = headers.iter().position(|h| h == CODE_COLUMN) else {
            tracing::warn!(path = %path.display(), "reference file has no {CODE_COLUMN} column");
            return Ok(());
        };
        let column = |name: &str| headers.iter().position(|h| h == name);
        let starting_idx = column(STARTING_VINTAGE_COLUMN);
        let late_idx = column(LATE_VINTAGE_COLUMN);
        let excluded_idx = column(EXCLUDED_VINTAGE_COLUMN);

        let mut values = Vec::new();
        for record in reader.records() {
            let record = record.map_err(reference_error)?;
            let Some(value) = record.get(code_idx).filter(|v| !v.is_empty()) else {
                continue;
            };
            if !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }

            if code == PRODUCT_FIELD {
                let field = |idx: Option<usize>| {
                    idx.and_then(|i| record.get(i))
                        .filter(|v| !v.is_empty())
                        .unwrap_or(UNBOUNDED)
                };
                let excluded = excluded_idx
                    .and_then(|i| record.get(i))
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty() && *v != UNBOUNDED)
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                let product = Product::new(value)
                    .with_vintages(field(starting_idx), field(late_idx))
                    .with_excluded(excluded);
                self.products.insert(product.code.clone(), product);
            }
        }

        self.values.insert(code.to_string(), values);
        Ok(())
    }

    /// Directory the data was loaded from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of codes with reference values.
    #[must_use]
    pub fn code_count(&self) -> usize {
        self.values.len()
    }

    /// Number of known products.
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

impl ValuesLookup for ReferenceData {
    fn allowed_values(&self, code: &str, _version: Option<&str>) -> &[String] {
        self.values.get(code).map_or(&[], Vec::as_slice)
    }

    fn product(&self, code: &str) -> Option<&Product> {
        self.products.get(code)
    }
}

/// The field code a reference file belongs to, from its name.
fn code_for_file(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("csv") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (code, _) = stem.split_once('_')?;
    (!code.is_empty()).then(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_code_for_file() {
        assert_eq!(code_for_file(Path::new("/x/C1_colours.csv")).as_deref(), Some("C1"));
        assert_eq!(code_for_file(Path::new("C10_products_2024.csv")).as_deref(), Some("C10"));
        assert_eq!(code_for_file(Path::new("C1.csv")), None);
        assert_eq!(code_for_file(Path::new("C1_colours.txt")), None);
        assert_eq!(code_for_file(Path::new("_x.csv")), None);
    }

    #[test]
    fn test_load_missing_dir() {
        let data = ReferenceData::load(Path::new("/nonexistent/champs")).unwrap();
        assert_eq!(data.code_count(), 0);
        assert!(data.allowed_values("C1", None).is_empty());
    }

    #[test]
    fn test_load_values() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "C1_colours.csv", "CircleCode,Label\nA0,Red\nB0,White\nA0,Red again\n");
        write(dir.path(), "C41_sizes.csv", "Label,CircleCode\nBottle,75CL\n, \n");
        write(dir.path(), "notes.csv", "CircleCode\nZZ\n");

        let data = ReferenceData::load(dir.path()).unwrap();
        assert_eq!(data.code_count(), 2);
        assert_eq!(data.allowed_values("C1", Some("11")), ["A0", "B0"]);
        assert_eq!(data.allowed_values("C41", None), ["75CL"]);
        assert_eq!(data.dir(), dir.path());
    }

    #[test]
    fn test_load_products() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "C10_products.csv",
            "CircleCode,StartingVintage,LateVintage,ExcludedVintage\n\
             1111A0,2000,ND,\"2013, 2017\"\n\
             2222B0,,2015,ND\n",
        );

        let data = ReferenceData::load(dir.path()).unwrap();
        assert_eq!(data.product_count(), 2);

        let first = data.product("1111A0").unwrap();
        assert_eq!(first.starting_vintage, "2000");
        assert_eq!(first.late_vintage, "ND");
        assert_eq!(first.excluded_vintages, vec!["2013", "2017"]);

        let second = data.product("2222B0").unwrap();
        assert_eq!(second.starting_vintage, "ND");
        assert_eq!(second.late_vintage, "2015");
        assert!(second.excluded_vintages.is_empty());
    }

    #[test]
    fn test_file_without_code_column_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "C3_regions.csv", "Code,Label\nFR,France\n");

        let data = ReferenceData::load(dir.path()).unwrap();
        assert_eq!(data.code_count(), 0);
    }

    #[test]
    fn test_first_file_wins_for_duplicate_code() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "C1_a.csv", "CircleCode\nA0\n");
        write(dir.path(), "C1_b.csv", "CircleCode\nB0\n");

        let data = ReferenceData::load(dir.path()).unwrap();
        assert_eq!(data.allowed_values("C1", None), ["A0"]);
    }
}
