use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::Document;

pub const SCHEMA: &str = "gpui-plate-table";
pub const VERSION: u32 = 1;

fn default_schema() -> String {
    SCHEMA.to_string()
}

fn default_version() -> u32 {
    VERSION
}

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported schema {found:?}, expected {expected:?}", expected = SCHEMA)]
    Schema { found: String },
    #[error("unsupported version {found}, at most {supported} is understood", supported = VERSION)]
    Version { found: u32 },
}

/// Versioned envelope for persisting or exchanging a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub document: Document,
}

impl PlateValue {
    pub fn from_document(document: Document) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            document,
        }
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses an envelope, rejecting foreign schemas and versions newer than this crate.
    pub fn from_json_str(s: &str) -> Result<Self, ValueError> {
        let value: Self = serde_json::from_str(s)?;
        if value.schema != SCHEMA {
            return Err(ValueError::Schema {
                found: value.schema,
            });
        }
        if value.version > VERSION {
            return Err(ValueError::Version {
                found: value.version,
            });
        }
        Ok(value)
    }
}
