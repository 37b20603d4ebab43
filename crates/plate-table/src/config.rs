use serde::{Deserialize, Serialize};

use crate::core::Attrs;

const DEFAULT_MAX_NORMALIZE_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub max_normalize_iterations: usize,
    #[serde(default)]
    pub table: TableConfig,
}

impl EditorConfig {
    pub(crate) fn with_defaults(mut self) -> Self {
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = DEFAULT_MAX_NORMALIZE_ITERATIONS;
        }
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(s).map(Self::with_defaults)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Heading sections given to tables created by `table.insert` when the command does not say.
    #[serde(default)]
    pub default_headings: DefaultHeadings,
    /// Attributes every newly created cell receives. Empty means no defaults.
    #[serde(default)]
    pub default_cell_properties: Attrs,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultHeadings {
    #[serde(default)]
    pub rows: usize,
    #[serde(default)]
    pub columns: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = EditorConfig::from_json_str("{}").unwrap();
        assert_eq!(config.max_normalize_iterations, 100);
        assert_eq!(config.table, TableConfig::default());
    }

    #[test]
    fn table_section_parses() {
        let config = EditorConfig::from_json_str(
            r#"{
                "max_normalize_iterations": 8,
                "table": {
                    "default_headings": { "rows": 1 },
                    "default_cell_properties": { "border_style": "solid" }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_normalize_iterations, 8);
        assert_eq!(config.table.default_headings.rows, 1);
        assert_eq!(config.table.default_headings.columns, 0);
        assert_eq!(
            config.table.default_cell_properties.get("border_style"),
            Some(&serde_json::json!("solid"))
        );
    }
}
