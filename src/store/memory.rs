use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SheetError, SheetStore, Table};

/// Worksheets held in process. Sheets spring into existence on first write,
/// matching a workbook where every tab already exists but may be blank.
#[derive(Default)]
pub struct MemorySheets {
    sheets: RwLock<HashMap<String, Vec<Vec<String>>>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a sheet with raw grid values, header row first.
    #[cfg(test)]
    pub async fn seed(&self, sheet: &str, values: Vec<Vec<String>>) {
        self.sheets.write().await.insert(sheet.to_string(), values);
    }
}

#[async_trait]
impl SheetStore for MemorySheets {
    async fn read(&self, sheet: &str) -> Result<Table, SheetError> {
        let sheets = self.sheets.read().await;
        Ok(sheets
            .get(sheet)
            .map(|values| Table::from_values(values.clone()))
            .unwrap_or_default())
    }

    async fn append(
        &self,
        sheet: &str,
        headers: &[String],
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetError> {
        let mut sheets = self.sheets.write().await;
        let grid = sheets.entry(sheet.to_string()).or_default();
        if grid.is_empty() {
            grid.push(headers.to_vec());
        }
        grid.extend(rows);
        Ok(())
    }

    async fn update_row(
        &self,
        sheet: &str,
        index: usize,
        values: Vec<String>,
    ) -> Result<(), SheetError> {
        let mut sheets = self.sheets.write().await;
        let grid = sheets
            .get_mut(sheet)
            .ok_or_else(|| SheetError::UnknownSheet(sheet.to_string()))?;

        // +1 skips the header row
        let row = grid
            .get_mut(index + 1)
            .ok_or_else(|| SheetError::RowOutOfRange {
                sheet: sheet.to_string(),
                index,
            })?;
        *row = values;
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, index: usize) -> Result<(), SheetError> {
        let mut sheets = self.sheets.write().await;
        let grid = sheets
            .get_mut(sheet)
            .ok_or_else(|| SheetError::UnknownSheet(sheet.to_string()))?;

        if index + 1 >= grid.len() {
            return Err(SheetError::RowOutOfRange {
                sheet: sheet.to_string(),
                index,
            });
        }
        grid.remove(index + 1);
        Ok(())
    }

    async fn ensure_headers(&self, sheet: &str, headers: &[String]) -> Result<(), SheetError> {
        let mut sheets = self.sheets.write().await;
        let grid = sheets.entry(sheet.to_string()).or_default();
        if grid.is_empty() {
            grid.push(headers.to_vec());
        }
        Ok(())
    }
}
