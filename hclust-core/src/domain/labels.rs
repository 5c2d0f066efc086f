//! Ordered, deduplicated instrument identifiers.
//!
//! A `LabelSet` fixes the row/column order for every matrix derived during one
//! analysis run. Derived matrices share it through `Arc<LabelSet>`.

use crate::error::{CoreError, Stage};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelSet {
    /// Build a label set, rejecting empty and duplicate labels.
    pub fn new<I, S>(labels: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(CoreError::invalid_input(
                    Stage::Distance,
                    format!("label at position {i} is empty"),
                ));
            }
            if index.insert(label.clone(), i).is_some() {
                return Err(CoreError::invalid_input(
                    Stage::Distance,
                    format!("duplicate label '{label}'"),
                ));
            }
        }
        Ok(Self { labels, index })
    }

    /// Build a label set from a user list, keeping the first occurrence of each label.
    ///
    /// Blank entries are skipped.
    pub fn dedup<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kept = Vec::new();
        let mut index = HashMap::new();
        for label in labels {
            let label: String = label.into();
            let label = label.trim().to_string();
            if label.is_empty() || index.contains_key(&label) {
                continue;
            }
            index.insert(label.clone(), kept.len());
            kept.push(label);
        }
        Self {
            labels: kept,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.labels.get(i).map(|s| s.as_str())
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|s| s.as_str())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.labels.clone()
    }

    /// Label at a position known to be in range.
    ///
    /// Internal indices always come from the same set, so this only panics on a
    /// broken invariant.
    pub(crate) fn name(&self, i: usize) -> &str {
        &self.labels[i]
    }

    /// Keep the labels at the given positions, in the given order.
    pub fn select(&self, positions: &[usize]) -> Result<Self, CoreError> {
        let picked: Vec<String> = positions
            .iter()
            .map(|&i| {
                self.labels.get(i).cloned().ok_or_else(|| {
                    CoreError::invalid_input(
                        Stage::Distance,
                        format!("label position {i} out of range (len {})", self.len()),
                    )
                })
            })
            .collect::<Result<_, _>>()?;
        Self::new(picked)
    }
}
