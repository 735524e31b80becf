//! In-Memory Workbook
//!
//! テストや組み込み用途向けの、メモリ上に保持したワークブック。

use crate::error::ProdSheetError;
use crate::parser::SheetSource;
use crate::types::{CellValue, SheetRow, SheetRows};

/// メモリ上のワークブック
///
/// シートは追加順に保持されます。非表示行は`add_hidden_row`で指定でき、
/// `visible_rows`の結果から除外されます。
///
/// # 使用例
///
/// ```rust
/// use prodsheet::{CellValue, MemoryWorkbook, SheetSource};
///
/// let mut workbook = MemoryWorkbook::new();
/// workbook.add_sheet(
///     "Bronco",
///     vec![
///         vec![CellValue::text("Bronco")],
///         vec![CellValue::text("22MY")],
///     ],
/// );
/// assert_eq!(workbook.sheet_names(), vec!["Bronco".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
}

#[derive(Debug, Clone)]
struct MemorySheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
    hidden: Vec<u32>,
}

impl MemoryWorkbook {
    /// 空のワークブックを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// シートを追加（同名のシートがあれば置き換える）
    pub fn add_sheet(&mut self, name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> &mut Self {
        let name = name.into();
        self.sheets.retain(|s| s.name != name);
        self.sheets.push(MemorySheet {
            name,
            rows,
            hidden: Vec::new(),
        });
        self
    }

    /// 行を非表示にする（0始まり）
    ///
    /// 存在しないシートを指定した場合は何もしません。
    pub fn add_hidden_row(&mut self, sheet_name: &str, row: u32) -> &mut Self {
        if let Some(sheet) = self.sheets.iter_mut().find(|s| s.name == sheet_name) {
            sheet.hidden.push(row);
        }
        self
    }
}

impl SheetSource for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn visible_rows(&mut self, sheet_name: &str) -> Result<SheetRows, ProdSheetError> {
        let sheet = self
            .sheets
            .iter()
            .find(|s| s.name == sheet_name)
            .ok_or_else(|| ProdSheetError::SheetNotFound(sheet_name.to_string()))?;

        let rows = sheet
            .rows
            .iter()
            .enumerate()
            .map(|(i, cells)| (i as u32, cells))
            .filter(|(i, _)| !sheet.hidden.contains(i))
            .map(|(i, cells)| SheetRow::new(i, cells.clone()))
            .collect();

        Ok(SheetRows::new(sheet_name, rows))
    }
}
