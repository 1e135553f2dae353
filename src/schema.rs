use crate::parsers::header_parser::VariableLabel;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Structural,
    Variable,
    Filler,
}

/// Final column names for the grid body, exactly one per grid column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    names: Vec<String>,
    kinds: Vec<ColumnKind>,
    pub padded: usize,
    pub truncated: usize,
}

impl ColumnSchema {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn kind(&self, position: usize) -> Option<ColumnKind> {
        self.kinds.get(position).copied()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// (position, name) of every column named after a variable label.
    pub fn variable_columns(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns_of(ColumnKind::Variable)
    }

    /// (position, name) of structural and filler columns.
    pub fn text_columns(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names
            .iter()
            .zip(&self.kinds)
            .enumerate()
            .filter(|(_, (_, kind))| **kind != ColumnKind::Variable)
            .map(|(i, (name, _))| (i, name.as_str()))
    }

    fn columns_of(&self, wanted: ColumnKind) -> impl Iterator<Item = (usize, &str)> {
        self.names
            .iter()
            .zip(&self.kinds)
            .enumerate()
            .filter(move |(_, (_, kind))| **kind == wanted)
            .map(|(i, (name, _))| (i, name.as_str()))
    }
}

/// Structural names followed by label display names, reconciled to `width`:
/// missing names become `Col{index}` (index within the combined list),
/// surplus names are cut from the end. Column positions never move.
pub fn build_schema(structural: &[String], labels: &[VariableLabel], width: usize) -> ColumnSchema {
    let mut names = Vec::with_capacity(width);
    let mut kinds = Vec::with_capacity(width);

    for name in structural {
        names.push(name.clone());
        kinds.push(ColumnKind::Structural);
    }
    for label in labels {
        names.push(label.display_name());
        kinds.push(ColumnKind::Variable);
    }

    let combined = names.len();
    let mut padded = 0;
    let mut truncated = 0;
    if combined < width {
        for index in combined..width {
            names.push(format!("Col{}", index));
            kinds.push(ColumnKind::Filler);
        }
        padded = width - combined;
    } else if combined > width {
        names.truncate(width);
        kinds.truncate(width);
        truncated = combined - width;
    }

    if padded > 0 || truncated > 0 {
        log::debug!(
            "Schema reconciled to {} columns ({} derived, {} padded, {} truncated)",
            width,
            combined,
            padded,
            truncated
        );
    }

    ColumnSchema {
        names,
        kinds,
        padded,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(tag: &str, column: usize) -> VariableLabel {
        VariableLabel {
            tag: tag.to_string(),
            description: None,
            unit: None,
            source_column: column,
        }
    }

    fn structural() -> Vec<String> {
        ["Type", "Id", "Date", "Time"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pads_with_positional_names() {
        let schema = build_schema(&structural(), &[label("T1", 4)], 7);
        assert_eq!(schema.names(), &["Type", "Id", "Date", "Time", "T1", "Col5", "Col6"]);
        assert_eq!(schema.padded, 2);
        assert_eq!(schema.kind(5), Some(ColumnKind::Filler));
        assert_eq!(schema.variable_columns().collect::<Vec<_>>(), vec![(4, "T1")]);
    }

    #[test]
    fn test_truncates_from_the_end() {
        let labels = vec![label("T1", 4), label("T2", 5), label("T3", 6)];
        let schema = build_schema(&structural(), &labels, 5);
        assert_eq!(schema.names(), &["Type", "Id", "Date", "Time", "T1"]);
        assert_eq!(schema.truncated, 2);

        let narrow = build_schema(&structural(), &labels, 2);
        assert_eq!(narrow.names(), &["Type", "Id"]);
        assert_eq!(narrow.variable_columns().count(), 0);
    }

    #[test]
    fn test_length_always_matches_width() {
        let labels = vec![label("A", 4), label("B", 5)];
        for width in 0..12 {
            assert_eq!(build_schema(&structural(), &labels, width).len(), width);
        }
    }

    #[test]
    fn test_builder_is_idempotent() {
        let labels = vec![label("A", 4)];
        assert_eq!(
            build_schema(&structural(), &labels, 9),
            build_schema(&structural(), &labels, 9)
        );
    }

    #[test]
    fn test_text_columns_skip_variables() {
        let schema = build_schema(&structural(), &[label("A", 4)], 6);
        let text: Vec<_> = schema.text_columns().map(|(_, n)| n).collect();
        assert_eq!(text, vec!["Type", "Id", "Date", "Time", "Col5"]);
    }
}
