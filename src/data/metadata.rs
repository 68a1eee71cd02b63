//! Sample metadata handling for beta-diversity analyses.

use crate::error::{BetaDivError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A metadata value: numeric, categorical, or missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Numeric value.
    Numeric(f64),
    /// Categorical value with a string level.
    Categorical(String),
    /// Missing value (empty string or NA in the source file).
    Missing,
}

impl Variable {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }

    /// Try to get as numeric f64.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Variable::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Display label for group naming; None when missing.
    pub fn label(&self) -> Option<String> {
        match self {
            Variable::Numeric(v) => Some(format!("{}", v)),
            Variable::Categorical(s) => Some(s.clone()),
            Variable::Missing => None,
        }
    }
}

/// Inferred type of a metadata column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Numeric,
    Categorical,
}

fn is_missing_token(raw: &str) -> bool {
    raw.is_empty() || raw == "NA" || raw == "na"
}

/// Infer a column type from raw values: numeric only when every non-missing
/// value parses as f64, otherwise the whole column stays categorical.
fn infer_type<'a, I: Iterator<Item = &'a str>>(values: I) -> VariableType {
    let mut all_numeric = true;
    for raw in values {
        let raw = raw.trim();
        if is_missing_token(raw) {
            continue;
        }
        if raw.parse::<f64>().is_err() {
            all_numeric = false;
            break;
        }
    }
    if all_numeric {
        VariableType::Numeric
    } else {
        VariableType::Categorical
    }
}

fn parse_variable(raw: &str, var_type: VariableType) -> Variable {
    let raw = raw.trim();
    if is_missing_token(raw) {
        return Variable::Missing;
    }
    match var_type {
        // Inference guarantees the parse succeeds for numeric columns.
        VariableType::Numeric => raw
            .parse::<f64>()
            .map(Variable::Numeric)
            .unwrap_or(Variable::Missing),
        VariableType::Categorical => Variable::Categorical(raw.to_string()),
    }
}

/// Sample metadata: an id-keyed table of columns.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Sample IDs in file order.
    sample_ids: Vec<String>,
    /// Column names in file order.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Variable.
    data: HashMap<String, HashMap<String, Variable>>,
    /// Inferred type per column.
    column_types: HashMap<String, VariableType>,
}

impl Metadata {
    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is sample ID)
    /// - Subsequent rows: sample ID followed by values
    ///
    /// Column types are inferred all-or-nothing: a column is numeric only
    /// when every non-missing value parses as a number. Empty strings and
    /// `NA` are treated as missing.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| BetaDivError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(BetaDivError::EmptyData(
                "Metadata must have at least one column".to_string(),
            ));
        }
        let column_names: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();

        let mut raw_data: Vec<(String, Vec<String>)> = Vec::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let sample_id = fields[0].to_string();
            let values: Vec<String> = fields[1..].iter().map(|s| s.to_string()).collect();
            raw_data.push((sample_id, values));
        }

        if raw_data.is_empty() {
            return Err(BetaDivError::EmptyData("No samples in metadata".to_string()));
        }

        let mut column_types = HashMap::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            let var_type = infer_type(
                raw_data
                    .iter()
                    .filter_map(|(_, values)| values.get(col_idx))
                    .map(String::as_str),
            );
            column_types.insert(col_name.clone(), var_type);
        }

        let mut sample_ids = Vec::new();
        let mut data = HashMap::new();
        for (sample_id, values) in raw_data {
            sample_ids.push(sample_id.clone());
            let mut sample_data = HashMap::new();
            for (col_idx, col_name) in column_names.iter().enumerate() {
                let var = match values.get(col_idx) {
                    None => Variable::Missing,
                    Some(raw) => parse_variable(raw, column_types[col_name]),
                };
                sample_data.insert(col_name.clone(), var);
            }
            data.insert(sample_id, sample_data);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
            column_types,
        })
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names in order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    /// Get a value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Inferred type of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_types.get(column).copied()
    }

    /// Names of all numeric columns, in file order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.column_names
            .iter()
            .filter(|c| self.column_types[*c] == VariableType::Numeric)
            .cloned()
            .collect()
    }

    /// Names of all categorical columns, in file order.
    pub fn categorical_columns(&self) -> Vec<String> {
        self.column_names
            .iter()
            .filter(|c| self.column_types[*c] == VariableType::Categorical)
            .cloned()
            .collect()
    }

    /// All values for a column, in sample order.
    pub fn column(&self, column: &str) -> Result<Vec<&Variable>> {
        if !self.column_names.iter().any(|c| c == column) {
            return Err(BetaDivError::MissingColumn(column.to_string()));
        }
        Ok(self
            .sample_ids
            .iter()
            .map(|sid| {
                self.data
                    .get(sid)
                    .and_then(|m| m.get(column))
                    .unwrap_or(&Variable::Missing)
            })
            .collect())
    }

    /// Extract one column as a [`CategoryColumn`] series.
    pub fn category(&self, column: &str) -> Result<CategoryColumn> {
        let values = self.column(column)?;
        Ok(CategoryColumn {
            name: column.to_string(),
            ids: self.sample_ids.clone(),
            values: values.into_iter().cloned().collect(),
        })
    }
}

/// A single metadata column as an id-indexed series.
///
/// This is the input form of the group-significance driver: one value per
/// sample id, with missing values preserved until the aligner drops them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryColumn {
    name: String,
    ids: Vec<String>,
    values: Vec<Variable>,
}

impl CategoryColumn {
    /// Build a column from raw (id, value) pairs, applying the same type
    /// inference as [`Metadata::from_tsv`]: the column is numeric only when
    /// every non-missing value parses.
    pub fn from_pairs(name: &str, pairs: &[(&str, &str)]) -> Self {
        let var_type = infer_type(pairs.iter().map(|(_, v)| *v));
        let ids = pairs.iter().map(|(id, _)| id.to_string()).collect();
        let values = pairs
            .iter()
            .map(|(_, raw)| parse_variable(raw, var_type))
            .collect();
        Self {
            name: name.to_string(),
            ids,
            values,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sample ids in series order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Values in series order.
    pub fn values(&self) -> &[Variable] {
        &self.values
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Value for a sample id.
    pub fn get(&self, id: &str) -> Option<&Variable> {
        self.ids
            .iter()
            .position(|i| i == id)
            .map(|idx| &self.values[idx])
    }

    /// True when every non-missing value is numeric.
    pub fn is_numeric(&self) -> bool {
        self.values
            .iter()
            .all(|v| !matches!(v, Variable::Categorical(_)))
    }

    /// Restrict to the given ids, in the given order. Ids absent from the
    /// series are skipped.
    pub fn restrict(&self, order: &[String]) -> CategoryColumn {
        let lookup: HashMap<&str, usize> = self
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let mut ids = Vec::new();
        let mut values = Vec::new();
        for id in order {
            if let Some(&i) = lookup.get(id.as_str()) {
                ids.push(id.clone());
                values.push(self.values[i].clone());
            }
        }
        CategoryColumn {
            name: self.name.clone(),
            ids,
            values,
        }
    }

    /// Drop entries whose value is missing.
    pub fn drop_missing(&self) -> CategoryColumn {
        let mut ids = Vec::new();
        let mut values = Vec::new();
        for (id, value) in self.ids.iter().zip(self.values.iter()) {
            if !value.is_missing() {
                ids.push(id.clone());
                values.push(value.clone());
            }
        }
        CategoryColumn {
            name: self.name.clone(),
            ids,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_tsv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tgroup\tph\tnotes").unwrap();
        writeln!(file, "s1\tgut\t6.8\tfirst").unwrap();
        writeln!(file, "s2\ttongue\t7.1\tsecond").unwrap();
        writeln!(file, "s3\tgut\t6.5\tthird").unwrap();
        writeln!(file, "s4\tpalm\t\tfourth").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_metadata() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert_eq!(meta.n_samples(), 4);
        assert_eq!(meta.n_columns(), 3);
        assert_eq!(meta.sample_ids(), &["s1", "s2", "s3", "s4"]);
        assert_eq!(meta.column_names(), &["group", "ph", "notes"]);
    }

    #[test]
    fn test_type_inference() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert_eq!(meta.column_type("group"), Some(VariableType::Categorical));
        assert_eq!(meta.column_type("ph"), Some(VariableType::Numeric));
        assert_eq!(meta.numeric_columns(), vec!["ph"]);
        assert_eq!(meta.categorical_columns(), vec!["group", "notes"]);
    }

    #[test]
    fn test_all_or_nothing_coercion() {
        // One non-numeric cell keeps the entire column categorical.
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tdepth").unwrap();
        writeln!(file, "s1\t1").unwrap();
        writeln!(file, "s2\t2").unwrap();
        writeln!(file, "s3\tshallow").unwrap();
        file.flush().unwrap();

        let meta = Metadata::from_tsv(file.path()).unwrap();
        assert_eq!(meta.column_type("depth"), Some(VariableType::Categorical));
        assert_eq!(meta.get("s1", "depth").unwrap().as_categorical(), Some("1"));
    }

    #[test]
    fn test_missing_values() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert!(meta.get("s4", "ph").unwrap().is_missing());
        assert_eq!(meta.get("s1", "ph").unwrap().as_numeric(), Some(6.8));
    }

    #[test]
    fn test_category_extraction() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let col = meta.category("group").unwrap();
        assert_eq!(col.name(), "group");
        assert_eq!(col.len(), 4);
        assert!(!col.is_numeric());
        assert_eq!(col.get("s1").unwrap().as_categorical(), Some("gut"));
    }

    #[test]
    fn test_category_missing_column() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();
        assert!(meta.category("nope").is_err());
    }

    #[test]
    fn test_column_from_pairs_numeric() {
        let col = CategoryColumn::from_pairs(
            "depth",
            &[("a", "1"), ("b", "2"), ("c", "3"), ("d", ""), ("e", "5")],
        );
        assert!(col.is_numeric());
        assert!(col.get("d").unwrap().is_missing());

        let kept = col.drop_missing();
        assert_eq!(kept.ids(), &["a", "b", "c", "e"]);
    }

    #[test]
    fn test_restrict_order_and_intersection() {
        let col = CategoryColumn::from_pairs("site", &[("a", "x"), ("b", "y"), ("c", "z")]);
        let restricted = col.restrict(&["c".to_string(), "q".to_string(), "a".to_string()]);
        assert_eq!(restricted.ids(), &["c", "a"]);
        assert_eq!(restricted.values()[0].as_categorical(), Some("z"));
    }
}
