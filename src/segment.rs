//! Table Segmenter Module
//!
//! 分類済みの行を1パスで走査し、モデルイヤーごとのサブテーブルに分割するモジュール。
//!
//! シート上のデータは転置されたレイアウトです。各行がひとつの列（フィールド）に対応し、
//! 行の先頭付近のセルが列名、それ以降のセルがその列の値になります。

use tracing::{debug, warn};

use crate::classify::{RowClassifier, RowKind};
use crate::config::EtlConfig;
use crate::error::ProdSheetError;
use crate::formatter::CellFormatter;
use crate::types::{CellValue, SheetRow, SheetRows};

/// 列名が置かれる最初の位置（A列はモデルイヤー用）
const NAME_START: usize = 1;

/// 値が置かれる最初の位置
const VALUE_START: usize = 2;

/// 列名を正規化する
///
/// `LPO Paint`の部分文字列は`lpo_paint`に、それ以外は次の順に置換します。
/// `S/L`→`State & Local`、`&`→`and`、`Commerical`→`Commercial`、`- `を削除、
/// ` -`→空白、`/`→` or `、前後の空白を除去、空白→`_`、小文字化。
///
/// # 使用例
///
/// ```rust
/// use prodsheet::normalize_column_name;
///
/// assert_eq!(normalize_column_name("S/L Order Bank"), "state_and_local_order_bank");
/// assert_eq!(normalize_column_name("Paint"), "lpo_paint");
/// ```
pub fn normalize_column_name(raw: &str) -> String {
    if "LPO Paint".contains(raw) {
        return "lpo_paint".to_string();
    }
    raw.replace("S/L", "State & Local")
        .replace('&', "and")
        .replace("Commerical", "Commercial")
        .replace("- ", "")
        .replace(" -", " ")
        .replace('/', " or ")
        .trim()
        .replace(' ', "_")
        .to_lowercase()
}

/// 名前付き列の順序付きテーブル
///
/// 列は追加順に保持され、「直近に名前を付けた列」をカーソルで明示的に管理します。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTable {
    columns: Vec<(String, Vec<CellValue>)>,
    cursor: Option<usize>,
}

impl ColumnTable {
    /// 空のテーブルを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 列を1つも持たないかどうか
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// 新しい列を追加し、カーソルをその列へ移す
    ///
    /// 同じ名前の列が既にある場合は`<name>_2`、`<name>_3`…と番号を付けます。
    /// 実際に付けた列名を返します。
    pub fn name_column(&mut self, name: &str) -> &str {
        let mut unique = name.to_string();
        let mut n = 2;
        while self.columns.iter().any(|(c, _)| *c == unique) {
            unique = format!("{}_{}", name, n);
            n += 1;
        }
        self.columns.push((unique, Vec::new()));
        let idx = self.columns.len() - 1;
        self.cursor = Some(idx);
        &self.columns[idx].0
    }

    /// 値を持つ新しい列を追加し、カーソルをその列へ移す
    ///
    /// 実際に付けた列名を返します（`name_column`と同じ規則）。
    pub fn add_column(&mut self, name: &str, values: Vec<CellValue>) -> &str {
        self.name_column(name);
        let idx = self.columns.len() - 1;
        self.columns[idx].1.extend(values);
        &self.columns[idx].0
    }

    /// カーソル位置の列に値を追加
    ///
    /// 列に名前が付いていない場合は`None`を返します。
    pub fn push_value(&mut self, value: CellValue) -> Option<()> {
        let idx = self.cursor?;
        self.columns[idx].1.push(value);
        Some(())
    }

    /// 列名と値の一覧（追加順）
    pub fn columns(&self) -> &[(String, Vec<CellValue>)] {
        &self.columns
    }

    /// 列名の一覧
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// 指定した列の値
    pub fn values(&self, name: &str) -> Option<&[CellValue]> {
        self.columns
            .iter()
            .find(|(c, _)| c == name)
            .map(|(_, v)| v.as_slice())
    }

    /// テーブルの行数（最も長い列の長さ）
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0)
    }

    /// 定型文と単一の空白を取り除いた新しいテーブルを返す
    fn without_boilerplate(self, formatter: &CellFormatter, boilerplate: &[String]) -> Self {
        let columns = self
            .columns
            .into_iter()
            .map(|(name, values)| {
                let kept = values
                    .into_iter()
                    .filter(|v| !is_boilerplate(formatter, v, boilerplate))
                    .collect();
                (name, kept)
            })
            .collect();
        Self {
            columns,
            cursor: self.cursor,
        }
    }

    /// すべての列を最長の列に合わせて空セルで埋める
    ///
    /// 埋めた列があれば`true`を返します。
    fn pad_columns(&mut self) -> bool {
        let rows = self.row_count();
        let mut padded = false;
        for (_, values) in &mut self.columns {
            if values.len() < rows {
                values.resize(rows, CellValue::Absent);
                padded = true;
            }
        }
        padded
    }
}

fn is_boilerplate(formatter: &CellFormatter, value: &CellValue, boilerplate: &[String]) -> bool {
    match formatter.to_text(value) {
        Some(text) => text == " " || boilerplate.iter().any(|b| b.as_str() == text.trim_end()),
        None => false,
    }
}

/// モデルイヤーごとのサブテーブル
#[derive(Debug, Clone, PartialEq)]
pub struct ModelYearTable {
    /// モデルイヤー（例: `22MY`）
    pub model_year: String,

    /// 列テーブル（すべての列が同じ長さ）
    pub table: ColumnTable,
}

impl ModelYearTable {
    /// 行数
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }
}

/// テーブル分割器
#[derive(Debug, Clone)]
pub struct TableSegmenter<'a> {
    classifier: RowClassifier<'a>,
    boilerplate: &'a [String],
    formatter: CellFormatter,
}

/// 1シート分の走査状態
struct SegmentState<'s> {
    vehicle_line: &'s str,
    opened: Vec<String>,
    table: ColumnTable,
    closed: Vec<ModelYearTable>,
}

impl<'a> TableSegmenter<'a> {
    /// 設定から分割器を生成
    pub fn new(config: &'a EtlConfig) -> Self {
        Self {
            classifier: RowClassifier::new(config),
            boilerplate: &config.boilerplate,
            formatter: CellFormatter,
        }
    }

    /// シートをモデルイヤーごとのテーブルに分割する
    ///
    /// # 引数
    ///
    /// * `sheet` - 表示行
    /// * `start_row` - 走査を開始する表示行のインデックス（見出し行を読み飛ばす）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<ModelYearTable>)` - 閉じた順のテーブル
    /// * `Err(ProdSheetError::MalformedSheet)` - モデルイヤーが開かれる前にテーブルを閉じようとした場合
    ///
    /// 終端行が現れずにシートの末尾に達した場合も、開いているテーブルは閉じられます。
    pub fn segment(
        &self,
        sheet: &SheetRows,
        start_row: usize,
    ) -> Result<Vec<ModelYearTable>, ProdSheetError> {
        let mut state = SegmentState {
            vehicle_line: &sheet.name,
            opened: Vec::new(),
            table: ColumnTable::new(),
            closed: Vec::new(),
        };
        let mut last_index = None;

        for row in sheet.rows.iter().skip(start_row) {
            last_index = Some(row.index);
            match self.classifier.classify(row, &state.opened) {
                RowKind::Terminator => {
                    debug!(sheet = %sheet.name, row = row.index, "terminator row");
                    self.close(&mut state, Some(row.index))?;
                    return Ok(state.closed);
                }
                RowKind::Empty => self.close(&mut state, Some(row.index))?,
                RowKind::ModelYearStart(tag) => {
                    debug!(sheet = %sheet.name, model_year = %tag, row = row.index, "model year opened");
                    state.opened.push(tag);
                    self.collect(&mut state, row);
                }
                RowKind::Content => self.collect(&mut state, row),
            }
        }

        self.close(&mut state, last_index)?;
        Ok(state.closed)
    }

    /// 行から列名と値を取り込む
    ///
    /// 列名のない行（B列以降がすべて空）は何も追加しません。
    fn collect(&self, state: &mut SegmentState<'_>, row: &SheetRow) {
        let Some((name_col, raw)) = row
            .tail(NAME_START)
            .find_map(|(col, cell)| self.formatter.to_text(cell).map(|raw| (col, raw)))
        else {
            return;
        };

        let values = row
            .tail(VALUE_START)
            .filter(|(col, value)| *col != name_col && !value.is_absent())
            .map(|(_, value)| value.clone())
            .collect();
        state.table.add_column(&normalize_column_name(&raw), values);
    }

    /// 開いているテーブルを直近のモデルイヤーに結び付けて閉じる
    fn close(&self, state: &mut SegmentState<'_>, row: Option<u32>) -> Result<(), ProdSheetError> {
        if state.table.is_empty() {
            return Ok(());
        }
        let Some(model_year) = state.opened.last().cloned() else {
            return Err(ProdSheetError::malformed(
                state.vehicle_line,
                row,
                "table closed before any model year was opened",
            ));
        };

        let mut table = std::mem::take(&mut state.table)
            .without_boilerplate(&self.formatter, self.boilerplate);
        if table.pad_columns() {
            warn!(
                sheet = %state.vehicle_line,
                model_year = %model_year,
                rows = table.row_count(),
                "ragged columns padded with empty values"
            );
        }

        debug!(
            sheet = %state.vehicle_line,
            model_year = %model_year,
            columns = table.columns().len(),
            rows = table.row_count(),
            "table closed"
        );
        state.closed.push(ModelYearTable { model_year, table });
        Ok(())
    }
}
