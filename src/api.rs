//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ディメンションの抽出方針
///
/// 車種ラインごとに設定で指定します。レコードは有効なディメンションの
/// すべての組み合わせに対して複製されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DimensionPolicy {
    /// ディメンションなし（デフォルト）
    ///
    /// テーブルの各行がそのまま1レコードになります。
    #[default]
    None,

    /// 燃料種別
    ///
    /// シートの1行目（B列以降）から燃料種別の一覧を読み取ります。
    Fuel,

    /// 燃料種別 + サブ燃料種別
    ///
    /// 1行目に加え、2行目（C列以降）からサブ燃料種別の一覧を読み取ります。
    FuelAndSubFuel,
}

impl DimensionPolicy {
    /// この方針でのセグメンテーション開始行（表示行の0始まりインデックス）
    ///
    /// 見出し行を読み飛ばすため、`None`と`Fuel`は1、`FuelAndSubFuel`は2です。
    pub fn default_start_row(self) -> usize {
        match self {
            DimensionPolicy::None | DimensionPolicy::Fuel => 1,
            DimensionPolicy::FuelAndSubFuel => 2,
        }
    }

    /// 燃料種別の列を持つかどうか
    pub fn has_fuel(self) -> bool {
        matches!(self, DimensionPolicy::Fuel | DimensionPolicy::FuelAndSubFuel)
    }

    /// サブ燃料種別の列を持つかどうか
    pub fn has_sub_fuel(self) -> bool {
        matches!(self, DimensionPolicy::FuelAndSubFuel)
    }
}

/// 出力フォーマット
///
/// `FileSink`がレコードを書き出す形式を指定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum OutputFormat {
    /// CSV形式（デフォルト）
    ///
    /// 1行目が列名、以降が各レコードです。
    ///
    /// # 出力例
    ///
    /// ```csv
    /// serial_key,vehicle_line,model_year,trim
    /// bronco_22my,Bronco,22MY,LX
    /// ```
    #[default]
    Csv,

    /// JSON形式
    ///
    /// 列名をキーとするオブジェクトの配列として出力します。
    ///
    /// # 出力例
    ///
    /// ```json
    /// [
    ///   {"serial_key": "bronco_22my", "vehicle_line": "Bronco", "model_year": "22MY", "trim": "LX"}
    /// ]
    /// ```
    Json,

    /// PostgreSQL用のロードスクリプト
    ///
    /// `preorder_<車種ライン>`テーブルを作り直し、全レコードを挿入するSQLを出力します。
    /// `serial_key`が主キー、その他の列はすべて`character varying`です。
    Sql,
}

impl OutputFormat {
    /// 出力ファイルの拡張子
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Sql => "sql",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "sql" => Ok(OutputFormat::Sql),
            other => Err(format!(
                "Unknown output format '{}' (expected csv, json or sql)",
                other
            )),
        }
    }
}
