//! Dimension Extractor Module
//!
//! シートの見出し行から、レコードを複製する補助ディメンション
//! （燃料種別・サブ燃料種別）を読み取るモジュール。

use tracing::debug;

use crate::api::DimensionPolicy;
use crate::error::ProdSheetError;
use crate::formatter::CellFormatter;
use crate::types::{SheetRow, SheetRows};

/// 燃料種別の読み取り開始位置
const FUEL_START: usize = 1;

/// サブ燃料種別の読み取り開始位置
const SUB_FUEL_START: usize = 2;

/// 1シート分のディメンション
///
/// シートごとに一度だけ読み取られ、すべてのモデルイヤーで共通です。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dimensions {
    /// 抽出方針
    pub policy: DimensionPolicy,

    /// 燃料種別（`Fuel`・`FuelAndSubFuel`のみ）
    pub fuel: Vec<String>,

    /// サブ燃料種別（`FuelAndSubFuel`のみ）
    pub sub_fuel: Vec<String>,
}

impl Dimensions {
    /// ディメンションなし
    pub fn none() -> Self {
        Self::default()
    }

    /// 見出し行からディメンションを読み取る
    ///
    /// # 引数
    ///
    /// * `sheet` - 表示行（1行目が燃料種別、2行目がサブ燃料種別の見出し）
    /// * `policy` - 抽出方針
    ///
    /// # 戻り値
    ///
    /// * `Ok(Dimensions)` - 読み取りに成功した場合
    /// * `Err(ProdSheetError::MalformedSheet)` - 見出し行が存在しない、またはラベルが1つもない場合
    pub fn extract(sheet: &SheetRows, policy: DimensionPolicy) -> Result<Self, ProdSheetError> {
        let mut dimensions = Self {
            policy,
            ..Self::default()
        };

        if policy.has_fuel() {
            dimensions.fuel = read_labels(sheet, 0, FUEL_START, "fuel type")?;
        }
        if policy.has_sub_fuel() {
            let labels = read_labels(sheet, 1, SUB_FUEL_START, "sub fuel type")?;
            dimensions.sub_fuel = collapse_repeated(labels, dimensions.fuel.len());
        }

        debug!(
            sheet = %sheet.name,
            fuel = ?dimensions.fuel,
            sub_fuel = ?dimensions.sub_fuel,
            "dimensions extracted"
        );
        Ok(dimensions)
    }

    /// 複製単位（有効なディメンションのサイズの積）
    ///
    /// ディメンションがない場合は1です。
    pub fn unit(&self) -> usize {
        let fuel = if self.policy.has_fuel() { self.fuel.len() } else { 1 };
        let sub_fuel = if self.policy.has_sub_fuel() {
            self.sub_fuel.len()
        } else {
            1
        };
        fuel * sub_fuel
    }

    /// ブロック内の`offset`行目に対応する組み合わせ
    ///
    /// 燃料種別を外側、サブ燃料種別を内側として巡回します。
    pub fn combination(&self, offset: usize) -> (Option<&str>, Option<&str>) {
        let unit = self.unit().max(1);
        let position = offset % unit;
        let inner = if self.policy.has_sub_fuel() {
            self.sub_fuel.len().max(1)
        } else {
            1
        };

        let fuel = if self.policy.has_fuel() {
            self.fuel.get(position / inner).map(String::as_str)
        } else {
            None
        };
        let sub_fuel = if self.policy.has_sub_fuel() {
            self.sub_fuel.get(position % inner).map(String::as_str)
        } else {
            None
        };
        (fuel, sub_fuel)
    }
}

fn read_labels(
    sheet: &SheetRows,
    row: usize,
    start: usize,
    what: &str,
) -> Result<Vec<String>, ProdSheetError> {
    let header: &SheetRow = sheet.rows.get(row).ok_or_else(|| {
        ProdSheetError::malformed(&sheet.name, None, format!("missing {} header row", what))
    })?;

    let formatter = CellFormatter;
    let labels: Vec<String> = header
        .tail(start)
        .filter_map(|(_, cell)| formatter.to_trimmed_text(cell))
        .filter(|label| !label.is_empty())
        .collect();

    if labels.is_empty() {
        return Err(ProdSheetError::malformed(
            &sheet.name,
            Some(header.index),
            format!("no {} labels in header row", what),
        ));
    }
    Ok(labels)
}

/// 燃料種別ごとに同じラベル列が繰り返される見出しを1ブロックにまとめる
///
/// 例: 燃料種別2つ、`[Base, Premium, Base, Premium]` → `[Base, Premium]`
fn collapse_repeated(labels: Vec<String>, groups: usize) -> Vec<String> {
    if groups < 2 || labels.len() % groups != 0 {
        return labels;
    }
    let block = labels.len() / groups;
    let repeated = labels
        .chunks(block)
        .all(|chunk| chunk == &labels[..block]);
    if repeated {
        labels[..block].to_vec()
    } else {
        labels
    }
}
