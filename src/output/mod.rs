//! Output Sink Module
//!
//! 平坦化済みのレコード集合を受け取るシンクと、
//! Strategy Patternによる出力フォーマットの抽象化を提供するモジュール。

mod formatters;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::api::OutputFormat;
use crate::error::ProdSheetError;
use crate::types::RecordSet;

pub use formatters::*;

/// SQLテーブル名の接頭辞
pub const TABLE_PREFIX: &str = "preorder_";

/// レコード集合の受け取り先
pub trait RecordSink {
    /// 1車種ライン分のレコードを受け取る
    fn accept(&mut self, vehicle_line: &str, records: &RecordSet) -> Result<(), ProdSheetError>;
}

/// 車種ライン名から出力ファイル名（拡張子なし）を生成
///
/// `-`を`_`に置換し、末尾の空白を除去、空白を`_`に置換して小文字化します。
///
/// # 使用例
///
/// ```rust
/// use prodsheet::file_stem;
///
/// assert_eq!(file_stem("F-150"), "f_150");
/// assert_eq!(file_stem("Mustang Mach E "), "mustang_mach_e");
/// ```
pub fn file_stem(vehicle_line: &str) -> String {
    vehicle_line
        .replace('-', "_")
        .trim_end()
        .replace(' ', "_")
        .to_lowercase()
}

/// 出力フォーマッター（Strategy Pattern）
#[derive(Debug, Clone, Copy)]
pub enum OutputFormatter {
    Csv,
    Json,
    Sql,
}

impl OutputFormatter {
    /// 出力フォーマットからフォーマッターを生成
    pub fn from_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => OutputFormatter::Csv,
            OutputFormat::Json => OutputFormatter::Json,
            OutputFormat::Sql => OutputFormatter::Sql,
        }
    }

    /// レコード集合を指定されたフォーマットで出力する
    ///
    /// # 引数
    ///
    /// * `vehicle_line` - 車種ライン名（SQLのテーブル名に使用）
    /// * `records` - 出力するレコード集合
    /// * `writer` - 出力先のライター
    pub fn render<W: Write>(
        &self,
        vehicle_line: &str,
        records: &RecordSet,
        writer: &mut W,
    ) -> Result<(), ProdSheetError> {
        match self {
            OutputFormatter::Csv => CsvFormatter.render(records, writer),
            OutputFormatter::Json => JsonFormatter.render(records, writer),
            OutputFormatter::Sql => {
                let table = format!("{}{}", TABLE_PREFIX, file_stem(vehicle_line));
                SqlFormatter.render(&table, records, writer)
            }
        }
    }
}

/// ディレクトリにファイルを書き出すシンク
///
/// 車種ラインごとに`<output_dir>/<file_stem>.<拡張子>`を作成（上書き）します。
#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
    format: OutputFormat,
    written: Vec<PathBuf>,
}

impl FileSink {
    /// シンクを生成（ディレクトリは最初の書き込み時に作成）
    pub fn new(output_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
            written: Vec::new(),
        }
    }

    /// 車種ラインの出力先パス
    pub fn path_for(&self, vehicle_line: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", file_stem(vehicle_line), self.format.extension()))
    }

    /// これまでに書き出したファイル
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// 出力ディレクトリ
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl RecordSink for FileSink {
    fn accept(&mut self, vehicle_line: &str, records: &RecordSet) -> Result<(), ProdSheetError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(vehicle_line);
        let mut writer = BufWriter::new(File::create(&path)?);

        OutputFormatter::from_format(self.format).render(vehicle_line, records, &mut writer)?;
        writer.flush()?;

        info!(
            vehicle_line,
            records = records.len(),
            path = %path.display(),
            "records written"
        );
        self.written.push(path);
        Ok(())
    }
}

/// メモリ上にレコードを保持するシンク
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: BTreeMap<String, RecordSet>,
    order: Vec<String>,
}

impl MemorySink {
    /// 空のシンクを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 車種ラインのレコードを取得
    pub fn get(&self, vehicle_line: &str) -> Option<&RecordSet> {
        self.records.get(vehicle_line)
    }

    /// 受け取った車種ライン（受け取り順）
    pub fn vehicle_lines(&self) -> &[String] {
        &self.order
    }

    /// 受け取った車種ラインの数
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// 何も受け取っていないかどうか
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl RecordSink for MemorySink {
    fn accept(&mut self, vehicle_line: &str, records: &RecordSet) -> Result<(), ProdSheetError> {
        if self
            .records
            .insert(vehicle_line.to_string(), records.clone())
            .is_none()
        {
            self.order.push(vehicle_line.to_string());
        }
        Ok(())
    }
}
