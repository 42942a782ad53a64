//! Table layout of the document store
//!
//! ```text
//! <data_table>  id TEXT(32) PRIMARY KEY, data BLOB
//! <path_table>  id TEXT(32) PRIMARY KEY,
//!               data_id TEXT(32) REFERENCES <data_table>(id) ON DELETE CASCADE,
//!               path TEXT, value_raw TEXT NULL
//!               INDEX idx_path_value_raw (data_id, path, value_raw)
//! ```

use crate::config::StoreConfig;
use crate::engine::{ColumnDefinition, OnDelete, TableDefinition};

pub const ID_COLUMN: &str = "id";
pub const DATA_COLUMN: &str = "data";
pub const DATA_ID_COLUMN: &str = "data_id";
pub const PATH_COLUMN: &str = "path";
pub const VALUE_COLUMN: &str = "value_raw";

/// Alias of the data table in store queries
pub const DATA_ALIAS: &str = "data_table";
/// Alias of the path table in store queries
pub const PATH_ALIAS: &str = "path_table";

pub const PATH_VALUE_INDEX: &str = "idx_path_value_raw";
pub const ID_LENGTH: u32 = 32;

/// Names and definitions of the two store tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSchema {
    data_table: String,
    path_table: String,
}

impl StoreSchema {
    pub fn new(data_table: impl Into<String>, path_table: impl Into<String>) -> Self {
        Self {
            data_table: data_table.into(),
            path_table: path_table.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.data_table.clone(), config.path_table.clone())
    }

    pub fn data_table(&self) -> &str {
        &self.data_table
    }

    pub fn path_table(&self) -> &str {
        &self.path_table
    }

    pub fn data_definition(&self) -> TableDefinition {
        TableDefinition::new(self.data_table.as_str())
            .column(ColumnDefinition::text(ID_COLUMN).with_length(ID_LENGTH))
            .column(ColumnDefinition::blob(DATA_COLUMN))
            .primary_key(ID_COLUMN)
    }

    pub fn path_definition(&self) -> TableDefinition {
        TableDefinition::new(self.path_table.as_str())
            .column(ColumnDefinition::text(ID_COLUMN).with_length(ID_LENGTH))
            .column(ColumnDefinition::text(DATA_ID_COLUMN).with_length(ID_LENGTH))
            .column(ColumnDefinition::text(PATH_COLUMN))
            .column(ColumnDefinition::text(VALUE_COLUMN).nullable())
            .primary_key(ID_COLUMN)
            .foreign_key(DATA_ID_COLUMN, self.data_table.as_str(), ID_COLUMN, OnDelete::Cascade)
            .index(PATH_VALUE_INDEX, [DATA_ID_COLUMN, PATH_COLUMN, VALUE_COLUMN])
    }

    /// Both definitions, referenced table first
    pub fn definitions(&self) -> [TableDefinition; 2] {
        [self.data_definition(), self.path_definition()]
    }
}

impl Default for StoreSchema {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}
