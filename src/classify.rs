//! Row Classifier Module
//!
//! 1行ごとに、その行が解析範囲の終端か、空行か、モデルイヤーの開始行か、
//! 通常の内容行かを判定するモジュール。

use crate::config::EtlConfig;
use crate::formatter::CellFormatter;
use crate::types::{CellValue, SheetRow};

/// 行の種別
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    /// 解析範囲の終端（停止語句、既出のモデルイヤー、空白セルを含む）
    Terminator,

    /// すべてのセルが偽の値
    Empty,

    /// 先頭セルがモデルイヤータグ（前後の空白は除去済み）
    ModelYearStart(String),

    /// 列名と値を含む通常の行
    Content,
}

/// 行分類器
///
/// 判定は行・既出モデルイヤー・設定のみに依存する純粋な関数です。
#[derive(Debug, Clone)]
pub struct RowClassifier<'a> {
    stop_markers: &'a [String],
    model_year_tags: &'a [String],
    formatter: CellFormatter,
}

impl<'a> RowClassifier<'a> {
    /// 設定から分類器を生成
    pub fn new(config: &'a EtlConfig) -> Self {
        Self {
            stop_markers: &config.stop_markers,
            model_year_tags: &config.model_year_tags,
            formatter: CellFormatter,
        }
    }

    /// 行を分類する
    ///
    /// # 引数
    ///
    /// * `row` - 対象の行
    /// * `seen_model_years` - これまでに開いたモデルイヤー（出現順）
    ///
    /// # 判定順序
    ///
    /// 1. いずれかのセルが停止語句・既出モデルイヤー・空白文字列に一致すれば`Terminator`
    /// 2. すべてのセルが偽の値なら`Empty`
    /// 3. 先頭セルがモデルイヤータグなら`ModelYearStart`
    /// 4. それ以外は`Content`
    pub fn classify(&self, row: &SheetRow, seen_model_years: &[String]) -> RowKind {
        if row
            .cells
            .iter()
            .any(|cell| self.is_terminator_cell(cell, seen_model_years))
        {
            return RowKind::Terminator;
        }

        if row.cells.iter().all(CellValue::is_falsy) {
            return RowKind::Empty;
        }

        match self.model_year_tag(row.first()) {
            Some(tag) => RowKind::ModelYearStart(tag),
            None => RowKind::Content,
        }
    }

    /// セルがモデルイヤータグであればタグ文字列を返す
    pub fn model_year_tag(&self, cell: &CellValue) -> Option<String> {
        let text = self.formatter.to_trimmed_text(cell)?;
        self.model_year_tags
            .iter()
            .any(|tag| tag.trim() == text)
            .then_some(text)
    }

    fn is_terminator_cell(&self, cell: &CellValue, seen_model_years: &[String]) -> bool {
        // 空セルは終端にならない
        let Some(text) = self.formatter.to_trimmed_text(cell) else {
            return false;
        };
        text.is_empty()
            || self.stop_markers.iter().any(|m| m.trim() == text)
            || seen_model_years.iter().any(|y| *y == text)
    }
}
