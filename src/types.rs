//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use chrono::NaiveDateTime;
use serde::Serialize;

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 文字列
    Text(String),

    /// 数値（f64）
    Number(f64),

    /// 日付・日時
    Date(NaiveDateTime),

    /// 論理値
    Bool(bool),

    /// 空セル（値なし）
    Absent,
}

impl CellValue {
    /// 文字列セルを生成するヘルパー
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// 値が存在しないかどうかを判定
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    /// 値が「偽」とみなされるかを判定
    ///
    /// 空セル、空文字列、数値の0、`false`が偽として扱われます。
    /// 行全体が偽の値のみで構成される場合、その行は空行です。
    pub fn is_falsy(&self) -> bool {
        match self {
            CellValue::Absent => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(n) => *n == 0.0,
            CellValue::Bool(b) => !*b,
            CellValue::Date(_) => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Absent)
    }
}

/// 表示されている1行分のセル
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// ワークシート上の行インデックス（0始まり、非表示行も数える）
    pub index: u32,

    /// A列から順に並んだセル値
    pub cells: Vec<CellValue>,
}

impl SheetRow {
    /// 新しい行を生成
    pub fn new(index: u32, cells: Vec<CellValue>) -> Self {
        Self { index, cells }
    }

    /// 指定列のセルを取得（範囲外は空セル扱い）
    pub fn cell(&self, col: usize) -> &CellValue {
        self.cells.get(col).unwrap_or(&CellValue::Absent)
    }

    /// 先頭セルを取得
    pub fn first(&self) -> &CellValue {
        self.cell(0)
    }

    /// 指定列以降のセルを列番号付きで走査
    pub fn tail(&self, from: usize) -> impl Iterator<Item = (usize, &CellValue)> {
        self.cells.iter().enumerate().skip(from)
    }
}

/// 1シート分の表示行
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRows {
    /// シート名（車種ライン名）
    pub name: String,

    /// 表示行（非表示行は除外済み）
    pub rows: Vec<SheetRow>,
}

impl SheetRows {
    /// 新しいシートを生成
    pub fn new(name: impl Into<String>, rows: Vec<SheetRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// 表示行の数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 表示行が存在しないかどうか
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 平坦化後のレコード集合
///
/// 列名のリストと、各列に対応する文字列の行からなる矩形データです。
/// シンクへ渡される唯一の成果物です。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSet {
    /// 列名（出力順）
    pub columns: Vec<String>,

    /// 行データ（各行の長さは`columns`と等しい）
    pub rows: Vec<Vec<String>>,
}

impl RecordSet {
    /// 列名から列インデックスを取得
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 指定列の値をすべて取得
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// レコード数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// レコードが存在しないかどうか
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
