//! Workbook Reader Module
//!
//! calamineを使用したXLSXワークブックの読み込み。
//! XMLメタデータ（非表示行・1904年エポック）と組み合わせて、表示行のみを返します。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets, Xlsx};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;
use tracing::debug;

use crate::error::ProdSheetError;
use crate::formatter::DateFormatter;
use crate::parser::metadata::WorkbookMetadata;
use crate::parser::SheetSource;
use crate::security::ZipLimits;
use crate::types::{CellValue, SheetRow, SheetRows};

/// XLSXワークブック
///
/// calamineのラッパーとして、シート単位で表示行を取り出します。
pub struct XlsxWorkbook {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<Cursor<Vec<u8>>>,
    /// XMLメタデータ
    metadata: WorkbookMetadata,
}

impl XlsxWorkbook {
    /// ワークブックを開き、XMLメタデータも解析する
    ///
    /// 入力全体を一度メモリに読み込み、calamineとメタデータパーサーの両方で使用します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxWorkbook)` - 読み込みに成功した場合
    /// * `Err(ProdSheetError::Config)` - XLSX以外の形式の場合
    /// * `Err(ProdSheetError)` - その他の読み込み・解析エラー
    pub fn open<R: Read>(mut reader: R) -> Result<Self, ProdSheetError> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        ZipLimits::default().check_input_size(buffer.len())?;

        let metadata = WorkbookMetadata::parse(Cursor::new(buffer.as_slice()))?;

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer))?;
        let workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(ProdSheetError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        Ok(Self { workbook, metadata })
    }

    /// パスを指定してワークブックを開く
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, ProdSheetError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening workbook");
        let file = File::open(path)?;
        Self::open(BufReader::new(file))
    }

    /// calamineのセル値を変換
    fn convert_cell(&self, cell: &Data) -> Result<CellValue, ProdSheetError> {
        let value = match cell {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
            Data::DateTime(dt) => {
                CellValue::Date(DateFormatter.from_serial(dt.as_f64(), self.metadata.is_1904())?)
            }
            Data::DateTimeIso(s) => DateFormatter
                .from_iso(s)
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::Text(s.clone())),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(e) => CellValue::Text(e.to_string()),
            Data::Empty => CellValue::Absent,
            #[allow(unreachable_patterns)]
            _ => CellValue::Absent,
        };
        Ok(value)
    }
}

impl SheetSource for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// 表示行を取得
    ///
    /// 使用範囲がA1から始まらない場合でも、行・列の位置はワークシートの
    /// 絶対位置（A列 = 0、1行目 = 0）に揃えます。使用範囲より上の行は空行として返します。
    fn visible_rows(&mut self, sheet_name: &str) -> Result<SheetRows, ProdSheetError> {
        if !self.workbook.sheet_names().iter().any(|n| n == sheet_name) {
            return Err(ProdSheetError::SheetNotFound(sheet_name.to_string()));
        }

        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| ProdSheetError::Parse(e.into()))?;

        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for index in 0..start_row {
            if self.metadata.is_row_hidden(sheet_name, index) {
                skipped += 1;
                continue;
            }
            rows.push(SheetRow::new(index, Vec::new()));
        }

        for (offset, row) in range.rows().enumerate() {
            let index = start_row + offset as u32;
            if self.metadata.is_row_hidden(sheet_name, index) {
                skipped += 1;
                continue;
            }

            let mut cells = vec![CellValue::Absent; start_col as usize];
            for cell in row {
                cells.push(self.convert_cell(cell)?);
            }
            rows.push(SheetRow::new(index, cells));
        }

        debug!(
            sheet = sheet_name,
            visible = rows.len(),
            hidden = skipped,
            "read sheet rows"
        );
        Ok(SheetRows::new(sheet_name, rows))
    }
}

// XLSXの読み込みは実ファイルが必要なため、統合テスト（tests/）で検証します。
