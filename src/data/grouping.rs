//! Partitioning of samples into named groups from a metadata column.

use crate::data::metadata::CategoryColumn;
use crate::error::{BetaDivError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An ordered mapping from group label to the ordered list of member
/// sample ids.
///
/// Groups are ordered by ascending label: numerically when the source
/// column coerces to numeric, lexicographically otherwise. Member order
/// within a group is the metadata's row order. The group order drives both
/// test iteration and display order downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grouping {
    labels: Vec<String>,
    members: Vec<Vec<String>>,
}

impl Grouping {
    /// Partition a (cleaned) metadata column into groups.
    ///
    /// Entries with missing values are ignored; the aligner is expected to
    /// have dropped them already.
    pub fn from_column(column: &CategoryColumn) -> Result<Self> {
        let mut order: Vec<String> = Vec::new();
        let mut by_label: HashMap<String, Vec<String>> = HashMap::new();

        for (id, value) in column.ids().iter().zip(column.values().iter()) {
            let label = match value.label() {
                Some(label) => label,
                None => continue,
            };
            by_label
                .entry(label.clone())
                .or_insert_with(|| {
                    order.push(label);
                    Vec::new()
                })
                .push(id.clone());
        }

        if order.is_empty() {
            return Err(BetaDivError::EmptyData(format!(
                "Column '{}' has no non-missing values",
                column.name()
            )));
        }

        if column.is_numeric() {
            // Every label formats a parsed f64, so re-parsing cannot fail.
            order.sort_by(|a, b| {
                let va: f64 = a.parse().unwrap_or(f64::NAN);
                let vb: f64 = b.parse().unwrap_or(f64::NAN);
                va.total_cmp(&vb)
            });
        } else {
            order.sort();
        }

        let members = order
            .iter()
            .map(|label| by_label.remove(label).unwrap_or_default())
            .collect();

        Ok(Self {
            labels: order,
            members,
        })
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether there are no groups.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Group labels in display order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Member ids of the group at `index`.
    pub fn members(&self, index: usize) -> &[String] {
        &self.members[index]
    }

    /// Member ids of the group with the given label.
    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.members[i].as_slice())
    }

    /// Iterate over (label, members) pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.members.iter().map(Vec::as_slice))
    }

    /// Total number of samples across all groups.
    pub fn n_samples(&self) -> usize {
        self.members.iter().map(Vec::len).sum()
    }

    /// Map each of `ids` to its group index, for the permutation-test
    /// routines.
    ///
    /// # Errors
    ///
    /// Returns an error listing ids that belong to no group.
    pub fn integer_labels(&self, ids: &[String]) -> Result<Vec<usize>> {
        let mut lookup: HashMap<&str, usize> = HashMap::new();
        for (g, members) in self.members.iter().enumerate() {
            for id in members {
                lookup.insert(id.as_str(), g);
            }
        }

        let mut labels = Vec::with_capacity(ids.len());
        let mut unknown: Vec<&str> = Vec::new();
        for id in ids {
            match lookup.get(id.as_str()) {
                Some(&g) => labels.push(g),
                None => unknown.push(id),
            }
        }
        if !unknown.is_empty() {
            return Err(BetaDivError::id_mismatch(unknown));
        }
        Ok(labels)
    }
}
