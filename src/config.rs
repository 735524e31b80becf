//! Configuration Module
//!
//! YAML設定ファイルを読み込み、実行全体で共有する不変の設定を構築するモジュール。
//! 設定は起動時に一度だけ読み込まれ、各コンポーネントへ明示的に渡されます。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::{DimensionPolicy, OutputFormat};
use crate::error::ProdSheetError;

/// 解析の終端を示す既定の語句
pub const DEFAULT_STOP_MARKERS: &[&str] = &[
    "Down Weeks",
    "Allocation Quarter",
    "Constrained Commodity Information",
    "Constrained Commodity Information-Explorer",
];

/// 出力から除去する既定の定型文（凡例など）
pub const DEFAULT_BOILERPLATE: &[&str] = &[
    "Updates highlighted in orange",
    "Past dates highlighted in gray",
    "State and Local",
];

/// 既定のモデルイヤータグ
pub const DEFAULT_MODEL_YEAR_TAGS: &[&str] = &["22MY", "23MY", "24MY"];

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("csvs_generated")
}

fn default_missing_report() -> PathBuf {
    PathBuf::from("missing_csvs.txt")
}

fn default_stop_markers() -> Vec<String> {
    to_strings(DEFAULT_STOP_MARKERS)
}

fn default_boilerplate() -> Vec<String> {
    to_strings(DEFAULT_BOILERPLATE)
}

fn default_model_year_tags() -> Vec<String> {
    to_strings(DEFAULT_MODEL_YEAR_TAGS)
}

/// 車種ライン（1シート）の設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleLine {
    /// シート名
    pub name: String,

    /// ディメンションの抽出方針
    #[serde(default)]
    pub policy: DimensionPolicy,

    /// セグメンテーション開始行（省略時は方針ごとの既定値）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_row: Option<usize>,
}

impl VehicleLine {
    /// 既定の開始行で車種ラインを生成
    pub fn new(name: impl Into<String>, policy: DimensionPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            start_row: None,
        }
    }

    /// 開始行を指定する
    pub fn with_start_row(mut self, start_row: usize) -> Self {
        self.start_row = Some(start_row);
        self
    }

    /// 実際に使用する開始行
    pub fn start_row(&self) -> usize {
        self.start_row
            .unwrap_or_else(|| self.policy.default_start_row())
    }
}

/// ETL全体の設定
///
/// # 設定ファイルの例
///
/// ```yaml
/// workbook: preorder.xlsx
/// output_dir: csvs_generated
/// output_format: csv
/// stop_markers:
///   - Down Weeks
///   - Allocation Quarter
/// vehicle_lines:
///   - name: Aviator
///   - name: Escape
///     policy: fuel
///   - name: Super Duty
///     policy: fuel_and_sub_fuel
/// ```
///
/// 省略した項目には既定値が使われます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EtlConfig {
    /// 入力ワークブックのパス
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workbook: Option<PathBuf>,

    /// 出力ディレクトリ
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 失敗した車種ラインを書き出すファイル
    #[serde(default = "default_missing_report")]
    pub missing_report: PathBuf,

    /// 出力フォーマット
    #[serde(default)]
    pub output_format: OutputFormat,

    /// 解析の終端を示す語句
    #[serde(default = "default_stop_markers")]
    pub stop_markers: Vec<String>,

    /// 出力から除去する定型文
    #[serde(default = "default_boilerplate")]
    pub boilerplate: Vec<String>,

    /// モデルイヤーとして認識するタグ
    #[serde(default = "default_model_year_tags")]
    pub model_year_tags: Vec<String>,

    /// 処理対象の車種ライン（記載順に処理）
    #[serde(default)]
    pub vehicle_lines: Vec<VehicleLine>,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            workbook: None,
            output_dir: default_output_dir(),
            missing_report: default_missing_report(),
            output_format: OutputFormat::default(),
            stop_markers: default_stop_markers(),
            boilerplate: default_boilerplate(),
            model_year_tags: default_model_year_tags(),
            vehicle_lines: Vec::new(),
        }
    }
}

impl EtlConfig {
    /// YAML文字列から設定を読み込み、検証する
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ProdSheetError> {
        let config: EtlConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// YAMLファイルから設定を読み込む
    ///
    /// `workbook`と`output_dir`が相対パスの場合、設定ファイルのディレクトリを基準に解決します。
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProdSheetError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&content)?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.workbook = config.workbook.map(|w| resolve(base, w));
            config.output_dir = resolve(base, config.output_dir);
            config.missing_report = resolve(base, config.missing_report);
        }
        Ok(config)
    }

    /// 車種ラインを名前で検索
    pub fn vehicle_line(&self, name: &str) -> Option<&VehicleLine> {
        self.vehicle_lines.iter().find(|v| v.name == name)
    }

    /// 設定の整合性を検証
    ///
    /// # 発生し得るエラー
    ///
    /// * `ProdSheetError::Config(String)`
    ///   * モデルイヤータグが空、または空白のみのタグを含む
    ///   * 車種ライン名が空、または重複している
    pub fn validate(&self) -> Result<(), ProdSheetError> {
        if self.model_year_tags.is_empty() {
            return Err(ProdSheetError::Config(
                "At least one model year tag is required".to_string(),
            ));
        }
        if self.model_year_tags.iter().any(|t| t.trim().is_empty()) {
            return Err(ProdSheetError::Config(
                "Model year tags must not be blank".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for line in &self.vehicle_lines {
            if line.name.trim().is_empty() {
                return Err(ProdSheetError::Config(
                    "Vehicle line name must not be empty".to_string(),
                ));
            }
            if !seen.insert(line.name.as_str()) {
                return Err(ProdSheetError::Config(format!(
                    "Vehicle line '{}' is listed more than once",
                    line.name
                )));
            }
        }
        Ok(())
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
