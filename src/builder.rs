//! Builder Module
//!
//! Fluent Builder APIを提供し、`Pipeline`インスタンスを段階的に構築する。

use std::path::PathBuf;

use crate::api::OutputFormat;
use crate::config::{EtlConfig, VehicleLine};
use crate::error::ProdSheetError;
use crate::pipeline::Pipeline;

/// Fluent Builder APIを提供する構造体
///
/// `Pipeline`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust
/// use prodsheet::{DimensionPolicy, PipelineBuilder, VehicleLine};
///
/// # fn main() -> Result<(), prodsheet::ProdSheetError> {
/// let pipeline = PipelineBuilder::new()
///     .with_vehicle_line(VehicleLine::new("Aviator", DimensionPolicy::None))
///     .with_vehicle_line(VehicleLine::new("Escape", DimensionPolicy::Fuel))
///     .add_stop_marker("Allocation Quarter")
///     .build()?;
/// assert_eq!(pipeline.config().vehicle_lines.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    /// 内部設定（構築中）
    config: EtlConfig,

    /// 車種ラインの絞り込み（`None`の場合はすべて）
    only: Option<Vec<String>>,
}

impl PipelineBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 停止語句: `Down Weeks`、`Allocation Quarter`、`Constrained Commodity Information`、
    ///   `Constrained Commodity Information-Explorer`
    /// - モデルイヤータグ: `22MY`、`23MY`、`24MY`
    /// - 出力: `csvs_generated/`にCSV
    /// - 車種ライン: なし
    pub fn new() -> Self {
        Self::default()
    }

    /// 読み込み済みの設定から開始する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use prodsheet::{EtlConfig, PipelineBuilder};
    ///
    /// # fn main() -> Result<(), prodsheet::ProdSheetError> {
    /// let config = EtlConfig::from_path("config.yaml")?;
    /// let pipeline = PipelineBuilder::from_config(config).build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: EtlConfig) -> Self {
        Self { config, only: None }
    }

    /// 処理対象の車種ラインを追加する
    ///
    /// # 引数
    ///
    /// * `line: VehicleLine`: シート名とディメンションの抽出方針
    pub fn with_vehicle_line(mut self, line: VehicleLine) -> Self {
        self.config.vehicle_lines.push(line);
        self
    }

    /// 処理対象の車種ラインを置き換える
    pub fn with_vehicle_lines(mut self, lines: impl IntoIterator<Item = VehicleLine>) -> Self {
        self.config.vehicle_lines = lines.into_iter().collect();
        self
    }

    /// 処理対象の車種ラインを名前で絞り込む
    ///
    /// 設定にない名前が含まれる場合、`build()`時にエラーになります。
    pub fn only_vehicle_lines<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// 停止語句を置き換える
    pub fn with_stop_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.stop_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// 停止語句を追加する
    pub fn add_stop_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.stop_markers.push(marker.into());
        self
    }

    /// 除去する定型文を置き換える
    pub fn with_boilerplate<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.boilerplate = phrases.into_iter().map(Into::into).collect();
        self
    }

    /// モデルイヤータグを置き換える
    ///
    /// # 制約
    ///
    /// * 1つ以上のタグが必要（空の場合、`build()`時に`ProdSheetError::Config`を返す）
    pub fn with_model_year_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.model_year_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// 入力ワークブックを指定する
    pub fn with_workbook(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.workbook = Some(path.into());
        self
    }

    /// 出力ディレクトリを指定する
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// 出力フォーマットを指定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use prodsheet::{OutputFormat, PipelineBuilder};
    ///
    /// let builder = PipelineBuilder::new().with_output_format(OutputFormat::Sql);
    /// ```
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// 失敗した車種ラインの書き出し先を指定する
    pub fn with_missing_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.missing_report = path.into();
        self
    }

    /// 設定を検証して`Pipeline`を構築する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Pipeline)`: 設定が有効な場合
    /// * `Err(ProdSheetError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * `ProdSheetError::Config(String)`: 設定の検証に失敗した場合
    ///   * モデルイヤータグが空、または空白のみのタグを含む
    ///   * 車種ライン名が空、または重複している
    ///   * `only_vehicle_lines`に設定にない名前が含まれる
    pub fn build(self) -> Result<Pipeline, ProdSheetError> {
        let mut config = self.config;

        // 1. 絞り込み
        if let Some(only) = self.only {
            if let Some(unknown) = only.iter().find(|n| config.vehicle_line(n).is_none()) {
                return Err(ProdSheetError::Config(format!(
                    "Vehicle line '{}' is not configured",
                    unknown
                )));
            }
            config.vehicle_lines.retain(|line| only.contains(&line.name));
        }

        // 2. 設定全体の検証
        config.validate()?;

        Ok(Pipeline::new(config))
    }
}
