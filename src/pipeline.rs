//! Pipeline Module
//!
//! 1シート分の解析（読み込み → ディメンション抽出 → 分割 → 平坦化）と、
//! 設定された全車種ラインを順に処理するオーケストレーションを提供するモジュール。

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::{EtlConfig, VehicleLine};
use crate::dimension::Dimensions;
use crate::error::ProdSheetError;
use crate::flatten::RecordFlattener;
use crate::output::RecordSink;
use crate::parser::{SheetSource, XlsxWorkbook};
use crate::segment::TableSegmenter;
use crate::types::RecordSet;

/// 1シート分の解析パイプライン
#[derive(Debug, Clone)]
pub struct SheetPipeline<'a> {
    config: &'a EtlConfig,
}

impl<'a> SheetPipeline<'a> {
    /// 設定からパイプラインを生成
    pub fn new(config: &'a EtlConfig) -> Self {
        Self { config }
    }

    /// 車種ラインのシートを解析し、レコード集合を返す
    ///
    /// # 処理フロー
    ///
    /// 1. 表示行の読み込み
    /// 2. ディメンションの抽出（シートごとに1回）
    /// 3. モデルイヤーごとのテーブルへの分割
    /// 4. 平坦化
    pub fn run<S: SheetSource + ?Sized>(
        &self,
        source: &mut S,
        line: &VehicleLine,
    ) -> Result<RecordSet, ProdSheetError> {
        let sheet = source.visible_rows(&line.name)?;
        let dimensions = Dimensions::extract(&sheet, line.policy)?;
        let tables = TableSegmenter::new(self.config).segment(&sheet, line.start_row())?;
        RecordFlattener::new(&line.name, &dimensions).flatten(&tables)
    }

    /// シートの構造を要約する（出力は行わない）
    pub fn inspect<S: SheetSource + ?Sized>(
        &self,
        source: &mut S,
        line: &VehicleLine,
    ) -> Result<SheetSummary, ProdSheetError> {
        let sheet = source.visible_rows(&line.name)?;
        let dimensions = Dimensions::extract(&sheet, line.policy)?;
        let tables = TableSegmenter::new(self.config).segment(&sheet, line.start_row())?;
        let unit = dimensions.unit();

        Ok(SheetSummary {
            vehicle_line: line.name.clone(),
            visible_rows: sheet.len(),
            fuel_types: dimensions.fuel,
            sub_fuel_types: dimensions.sub_fuel,
            tables: tables
                .iter()
                .map(|t| TableSummary {
                    model_year: t.model_year.clone(),
                    rows: t.row_count(),
                    divisible: unit != 0 && t.row_count() % unit == 0,
                    columns: t.table.column_names().map(str::to_string).collect(),
                })
                .collect(),
        })
    }
}

/// シート構造の要約
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetSummary {
    pub vehicle_line: String,
    pub visible_rows: usize,
    pub fuel_types: Vec<String>,
    pub sub_fuel_types: Vec<String>,
    pub tables: Vec<TableSummary>,
}

/// モデルイヤーテーブルの要約
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub model_year: String,
    pub rows: usize,
    /// 行数が複製単位で割り切れるか
    pub divisible: bool,
    pub columns: Vec<String>,
}

/// 成功した車種ライン
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineSuccess {
    pub vehicle_line: String,
    pub records: usize,
}

/// 失敗した車種ライン
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFailure {
    pub vehicle_line: String,
    pub error: String,
}

/// 実行結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// 成功した車種ライン（処理順）
    pub succeeded: Vec<LineSuccess>,
    /// 失敗した車種ライン（処理順）
    pub failed: Vec<LineFailure>,
}

impl RunReport {
    /// すべての車種ラインが成功したかどうか
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// 出力したレコードの合計
    pub fn total_records(&self) -> usize {
        self.succeeded.iter().map(|s| s.records).sum()
    }

    /// 失敗した車種ライン名
    pub fn failed_lines(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(|f| f.vehicle_line.as_str())
    }

    /// 失敗した車種ライン名を1行ずつ書き出す
    pub fn write_missing_report<W: Write>(&self, writer: &mut W) -> Result<(), ProdSheetError> {
        for line in self.failed_lines() {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// 失敗した車種ライン名をファイルに書き出す（失敗がなくても空ファイルを作成）
    pub fn save_missing_report(&self, path: impl AsRef<Path>) -> Result<(), ProdSheetError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_missing_report(&mut writer)
    }
}

/// ETLパイプライン
///
/// `PipelineBuilder`で構築します。設定は構築時に固定され、実行中は変更されません。
///
/// # 使用例
///
/// ```rust,no_run
/// use prodsheet::{DimensionPolicy, FileSink, OutputFormat, PipelineBuilder, VehicleLine, XlsxWorkbook};
///
/// # fn main() -> Result<(), prodsheet::ProdSheetError> {
/// let pipeline = PipelineBuilder::new()
///     .with_vehicle_line(VehicleLine::new("Escape", DimensionPolicy::Fuel))
///     .build()?;
///
/// let mut workbook = XlsxWorkbook::open_path("preorder.xlsx")?;
/// let mut sink = FileSink::new("csvs_generated", OutputFormat::Csv);
/// let report = pipeline.run_all(&mut workbook, &mut sink);
/// println!("{} records", report.total_records());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: EtlConfig,
}

impl Pipeline {
    pub(crate) fn new(config: EtlConfig) -> Self {
        Self { config }
    }

    /// 設定を取得
    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// 設定されたワークブックを開く
    pub fn open_workbook(&self) -> Result<XlsxWorkbook, ProdSheetError> {
        let path = self
            .config
            .workbook
            .as_ref()
            .ok_or_else(|| ProdSheetError::Config("No workbook path configured".to_string()))?;
        XlsxWorkbook::open_path(path)
    }

    fn vehicle_line(&self, name: &str) -> Result<&VehicleLine, ProdSheetError> {
        self.config.vehicle_line(name).ok_or_else(|| {
            ProdSheetError::Config(format!("Vehicle line '{}' is not configured", name))
        })
    }

    /// 1つの車種ラインを解析する
    ///
    /// # 戻り値
    ///
    /// * `Ok(RecordSet)` - 解析に成功した場合
    /// * `Err(ProdSheetError::Config)` - 車種ラインが設定にない場合
    /// * `Err(ProdSheetError)` - シートの読み込み・解析エラー
    pub fn parse_sheet<S: SheetSource + ?Sized>(
        &self,
        source: &mut S,
        vehicle_line: &str,
    ) -> Result<RecordSet, ProdSheetError> {
        let line = self.vehicle_line(vehicle_line)?;
        SheetPipeline::new(&self.config).run(source, line)
    }

    /// 1つの車種ラインの構造を要約する
    pub fn inspect_sheet<S: SheetSource + ?Sized>(
        &self,
        source: &mut S,
        vehicle_line: &str,
    ) -> Result<SheetSummary, ProdSheetError> {
        let line = self.vehicle_line(vehicle_line)?;
        SheetPipeline::new(&self.config).inspect(source, line)
    }

    /// 設定されたすべての車種ラインを順に処理する
    ///
    /// 車種ラインごとのエラー（シートの不正、シートの欠落、シンクのエラー）は記録され、
    /// 残りの車種ラインの処理は継続されます。
    pub fn run_all<S, K>(&self, source: &mut S, sink: &mut K) -> RunReport
    where
        S: SheetSource + ?Sized,
        K: RecordSink + ?Sized,
    {
        let pipeline = SheetPipeline::new(&self.config);
        let mut report = RunReport::default();

        for line in &self.config.vehicle_lines {
            info!(vehicle_line = %line.name, policy = ?line.policy, "processing");

            let result = pipeline
                .run(source, line)
                .and_then(|records| sink.accept(&line.name, &records).map(|_| records.len()));

            match result {
                Ok(records) => {
                    if records == 0 {
                        warn!(vehicle_line = %line.name, "no records produced");
                    }
                    report.succeeded.push(LineSuccess {
                        vehicle_line: line.name.clone(),
                        records,
                    });
                }
                Err(e) => {
                    error!(vehicle_line = %line.name, error = %e, "vehicle line skipped");
                    report.failed.push(LineFailure {
                        vehicle_line: line.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            records = report.total_records(),
            "run finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DimensionPolicy;
    use crate::output::MemorySink;
    use crate::parser::MemoryWorkbook;
    use crate::types::CellValue;

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    const A: CellValue = CellValue::Absent;

    fn config(lines: Vec<VehicleLine>) -> EtlConfig {
        EtlConfig {
            vehicle_lines: lines,
            ..EtlConfig::default()
        }
    }

    fn workbook() -> MemoryWorkbook {
        let mut wb = MemoryWorkbook::new();
        wb.add_sheet(
            "Edge",
            vec![
                vec![t("Edge")],
                vec![t("22MY")],
                vec![A, t("Trim"), t("SE"), t("ST")],
                vec![t("Down Weeks")],
            ],
        );
        wb.add_sheet(
            "Escape",
            vec![
                vec![t("Escape"), t("Gas"), t("Hybrid")],
                vec![t("23MY")],
                vec![A, t("Trim"), t("S"), t("SE"), t("ST")],
                vec![],
            ],
        );
        wb
    }

    #[test]
    fn test_sheet_pipeline_run() {
        let config = config(vec![]);
        let line = VehicleLine::new("Edge", DimensionPolicy::None);
        let records = SheetPipeline::new(&config)
            .run(&mut workbook(), &line)
            .unwrap();
        assert_eq!(records.column("serial_key"), Some(vec!["edge_22my", "edge_22my_2"]));
    }

    #[test]
    fn test_run_all_isolates_failures() {
        let pipeline = Pipeline::new(config(vec![
            VehicleLine::new("Escape", DimensionPolicy::Fuel),
            VehicleLine::new("Ranger", DimensionPolicy::None),
            VehicleLine::new("Edge", DimensionPolicy::None),
        ]));
        let mut sink = MemorySink::new();
        let report = pipeline.run_all(&mut workbook(), &mut sink);

        assert!(!report.is_success());
        assert_eq!(report.failed_lines().collect::<Vec<_>>(), vec!["Escape", "Ranger"]);
        assert!(report.failed[0].error.contains("Dimension mismatch"));
        assert!(report.failed[1].error.contains("not found"));
        assert_eq!(
            report.succeeded,
            vec![LineSuccess {
                vehicle_line: "Edge".to_string(),
                records: 2
            }]
        );
        assert_eq!(sink.vehicle_lines(), &["Edge".to_string()]);
    }

    #[test]
    fn test_missing_report_lists_failed_lines() {
        let report = RunReport {
            succeeded: Vec::new(),
            failed: vec![
                LineFailure {
                    vehicle_line: "Explorer".to_string(),
                    error: "x".to_string(),
                },
                LineFailure {
                    vehicle_line: "Transit".to_string(),
                    error: "y".to_string(),
                },
            ],
        };
        let mut out = Vec::new();
        report.write_missing_report(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Explorer\nTransit\n");
    }

    #[test]
    fn test_parse_sheet_unknown_line() {
        let pipeline = Pipeline::new(config(vec![]));
        let err = pipeline.parse_sheet(&mut workbook(), "Edge").unwrap_err();
        assert!(matches!(err, ProdSheetError::Config(_)));
    }

    #[test]
    fn test_inspect_sheet() {
        let pipeline = Pipeline::new(config(vec![VehicleLine::new(
            "Escape",
            DimensionPolicy::Fuel,
        )]));
        let summary = pipeline.inspect_sheet(&mut workbook(), "Escape").unwrap();
        assert_eq!(summary.fuel_types, vec!["Gas", "Hybrid"]);
        assert_eq!(summary.tables.len(), 1);
        assert_eq!(summary.tables[0].rows, 3);
        assert!(!summary.tables[0].divisible);
        assert_eq!(summary.tables[0].columns, vec!["trim"]);
    }
}
