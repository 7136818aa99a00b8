use std::sync::Arc;

use crate::{
    cells::Cell,
    errors::{SnowflakeError, SnowflakeResult},
    statement::WireStatementMetaData,
};

pub type StringTable = Vec<Vec<Option<String>>>;

/// One chunk of a result set, as Snowflake returns it
pub struct Partition {
    pub(crate) meta_data: WireStatementMetaData,
    pub(crate) data: Arc<StringTable>,
    pub(crate) index: usize,
}

impl Partition {
    /// Get the index of this partition
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the number of rows in just this partition
    /// This is obtained from data.len() rather than the metadata
    /// because this partition may have been constructed by concatenating
    pub fn num_rows(&self) -> usize {
        self.data.len()
    }

    /// Get the cells in this partition as strings just as they were returned from Snowflake
    pub fn raw_cells(&self) -> &[Vec<Option<String>>] {
        self.data.as_ref()
    }

    /// Decode every value into a typed `Cell`, row by row in column order
    pub fn cells(&self) -> SnowflakeResult<Vec<Vec<Cell>>> {
        let expected = self.meta_data.row_type.len();
        self.data
            .iter()
            .map(|row| {
                if row.len() != expected {
                    return Err(SnowflakeError::ColumnCountMismatch {
                        expected,
                        actual: row.len(),
                    });
                }
                row.iter()
                    .zip(&self.meta_data.row_type)
                    .map(|(value, row_type)| row_type.data_type.to_cell(value))
                    .collect()
            })
            .collect()
    }
}
