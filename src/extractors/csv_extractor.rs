//! CSV column extraction
//!
//! Reads one column from the rows of a CSV document.

use std::collections::HashMap;

use serde_json::Value;

use super::{Context, Scope};
use crate::error::{Error, Result};

/// One CSV row: header to cell
pub type Row = HashMap<String, String>;

/// Column lookup over a row group
#[derive(Debug, Clone)]
pub struct CsvColumn {
    pub column: String,
    /// Collect the column from every row instead of only the first
    pub multiple: bool,
    /// Cell values that count as missing
    pub convert_to_none: Vec<String>,
}

impl CsvColumn {
    pub fn new(column: impl Into<String>) -> Self {
        CsvColumn {
            column: column.into(),
            multiple: false,
            convert_to_none: vec![String::new()],
        }
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn convert_to_none(mut self, values: Vec<String>) -> Self {
        self.convert_to_none = values;
        self
    }

    pub(super) fn extract(&self, ctx: &Context<'_>) -> Result<Value> {
        let Scope::Rows(rows) = ctx.scope else {
            return Err(Error::ContextMismatch {
                extractor: "CSV",
                expected: "row group",
            });
        };

        let Some(first) = rows.first() else {
            return Ok(Value::Null);
        };
        if !first.contains_key(&self.column) {
            return Ok(Value::Null);
        }

        if self.multiple {
            Ok(Value::Array(
                rows.iter().map(|row| self.cell(row.get(&self.column))).collect(),
            ))
        } else {
            Ok(self.cell(first.get(&self.column)))
        }
    }

    fn cell(&self, value: Option<&String>) -> Value {
        match value {
            Some(v) if !self.convert_to_none.contains(v) => Value::String(v.clone()),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Extractor, Metadata};
    use serde_json::json;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_first_row_and_multiple() {
        let rows = vec![
            row(&[("character", "GHOST"), ("line", "My hour is almost come,")]),
            row(&[("character", "GHOST"), ("line", "When I to sulph'rous and tormenting flames")]),
        ];
        let meta = Metadata::new();
        let ctx = Context::new(Scope::Rows(&rows), &meta);

        let character = Extractor::csv(CsvColumn::new("character"));
        assert_eq!(character.apply(&ctx).unwrap(), json!("GHOST"));

        let lines = Extractor::csv(CsvColumn::new("line").multiple());
        assert_eq!(
            lines.apply(&ctx).unwrap(),
            json!(["My hour is almost come,", "When I to sulph'rous and tormenting flames"])
        );
    }

    #[test]
    fn test_blank_and_missing_cells() {
        let rows = vec![row(&[("character", ""), ("act", "-")]), row(&[("character", "HAMLET"), ("act", "I")])];
        let meta = Metadata::new();
        let ctx = Context::new(Scope::Rows(&rows), &meta);

        assert_eq!(Extractor::csv(CsvColumn::new("character")).apply(&ctx).unwrap(), Value::Null);
        assert_eq!(Extractor::csv(CsvColumn::new("missing")).apply(&ctx).unwrap(), Value::Null);

        let act = CsvColumn::new("act").multiple().convert_to_none(vec!["-".into()]);
        assert_eq!(Extractor::csv(act).apply(&ctx).unwrap(), json!([null, "I"]));
    }
}
