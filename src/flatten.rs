//! Record Flattener Module
//!
//! モデルイヤーごとのテーブルを1つの平坦なレコード集合に変換するモジュール。
//! ディメンションの付与と複合キー（`serial_key`）の生成もここで行います。

use std::collections::HashSet;

use crate::dimension::Dimensions;
use crate::error::ProdSheetError;
use crate::formatter::CellFormatter;
use crate::segment::ModelYearTable;
use crate::types::RecordSet;

/// 複合キーの列名
pub const SERIAL_KEY: &str = "serial_key";
/// 車種ラインの列名
pub const VEHICLE_LINE: &str = "vehicle_line";
/// 燃料種別の列名
pub const FUEL_TYPE: &str = "fuel_type";
/// サブ燃料種別の列名
pub const SUB_FUEL_TYPE: &str = "sub_fuel_type";
/// モデルイヤーの列名
pub const MODEL_YEAR: &str = "model_year";

/// レコード平坦化器
///
/// 出力列の順序は常に次のとおりです。
///
/// `serial_key`, `vehicle_line`, `fuel_type`（有効時）, `sub_fuel_type`（有効時）,
/// `model_year`, データ列（初出順）
#[derive(Debug, Clone)]
pub struct RecordFlattener<'a> {
    vehicle_line: &'a str,
    dimensions: &'a Dimensions,
    formatter: CellFormatter,
}

impl<'a> RecordFlattener<'a> {
    /// 平坦化器を生成
    pub fn new(vehicle_line: &'a str, dimensions: &'a Dimensions) -> Self {
        Self {
            vehicle_line,
            dimensions,
            formatter: CellFormatter,
        }
    }

    /// テーブルを平坦化する
    ///
    /// # 引数
    ///
    /// * `tables` - モデルイヤーの出現順に並んだテーブル
    ///
    /// # 戻り値
    ///
    /// * `Ok(RecordSet)` - テーブルの行数の合計と同じ数のレコード
    /// * `Err(ProdSheetError::DimensionMismatch)` - 行数が複製単位で割り切れないテーブルがある場合
    pub fn flatten(&self, tables: &[ModelYearTable]) -> Result<RecordSet, ProdSheetError> {
        let unit = self.dimensions.unit();
        for table in tables {
            let rows = table.row_count();
            if unit == 0 || rows % unit != 0 {
                return Err(ProdSheetError::DimensionMismatch {
                    vehicle_line: self.vehicle_line.to_string(),
                    model_year: table.model_year.clone(),
                    rows,
                    unit,
                });
            }
        }

        let data_columns = data_columns(tables);
        let policy = self.dimensions.policy;

        let mut columns = vec![SERIAL_KEY.to_string(), VEHICLE_LINE.to_string()];
        if policy.has_fuel() {
            columns.push(FUEL_TYPE.to_string());
        }
        if policy.has_sub_fuel() {
            columns.push(SUB_FUEL_TYPE.to_string());
        }
        columns.push(MODEL_YEAR.to_string());
        for name in &data_columns {
            let unique = disambiguate(&columns, name);
            columns.push(unique);
        }

        let mut keys = HashSet::new();
        let mut rows = Vec::with_capacity(tables.iter().map(ModelYearTable::row_count).sum());

        for table in tables {
            for offset in 0..table.row_count() {
                let (fuel, sub_fuel) = self.dimensions.combination(offset);

                let mut key_parts = vec![self.vehicle_line, table.model_year.as_str()];
                key_parts.extend(fuel);
                key_parts.extend(sub_fuel);

                let mut row = Vec::with_capacity(columns.len());
                row.push(unique_key(&mut keys, &key_parts));
                row.push(self.vehicle_line.to_string());
                if policy.has_fuel() {
                    row.push(fuel.unwrap_or_default().to_string());
                }
                if policy.has_sub_fuel() {
                    row.push(sub_fuel.unwrap_or_default().to_string());
                }
                row.push(table.model_year.clone());

                for column in &data_columns {
                    let value = table
                        .table
                        .values(column)
                        .and_then(|values| values.get(offset))
                        .and_then(|cell| self.formatter.to_text(cell))
                        .unwrap_or_default();
                    row.push(value);
                }
                rows.push(row);
            }
        }

        Ok(RecordSet { columns, rows })
    }
}

/// すべてのテーブルのデータ列の和集合（初出順）
fn data_columns(tables: &[ModelYearTable]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for name in tables.iter().flat_map(|t| t.table.column_names()) {
        if !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
    }
    columns
}

/// 既存の列名と重ならない列名を返す
///
/// `fuel_type`などの付与列と同じ名前のデータ列は`fuel_type_2`、`fuel_type_3`…になります。
fn disambiguate(taken: &[String], name: &str) -> String {
    let mut unique = name.to_string();
    let mut n = 2;
    while taken.iter().any(|c| *c == unique) {
        unique = format!("{}_{}", name, n);
        n += 1;
    }
    unique
}

/// 複合キーを生成する
///
/// 各要素の空白を`_`に置き換えて小文字化し、`_`で連結します。
/// 既に使われたキーには`_2`、`_3`…を付けて一意にします。
fn unique_key(used: &mut HashSet<String>, parts: &[&str]) -> String {
    let base = parts
        .iter()
        .map(|p| p.replace(' ', "_").to_lowercase())
        .collect::<Vec<_>>()
        .join("_");

    let mut key = base.clone();
    let mut n = 2;
    while used.contains(&key) {
        key = format!("{}_{}", base, n);
        n += 1;
    }
    used.insert(key.clone());
    key
}
