//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// prodsheetクレート全体で使用するエラー型
///
/// エラーは大きく3種類に分かれます。
///
/// - シート形式の不正: `MalformedSheet`, `DimensionMismatch`
/// - 実行環境のエラー: `SheetNotFound`, `Config`, `Yaml`, `Io`, `Parse`, `Zip`, `Xml`,
///   `SecurityViolation`
/// - 出力先（シンク）のエラー: `Csv`, `Json`
///
/// シート単位のエラーは`Pipeline::run_all`でのみ捕捉され、該当する車種ラインは
/// スキップとして記録されます。それ以外の場所ではすべて`?`で伝播させます。
#[derive(Error, Debug)]
pub enum ProdSheetError {
    /// I/O操作中に発生したエラー
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// calamineがワークブックを解析する際に発生したエラー
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー（XML属性の読み取り時）
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 数値の解析エラー（XML属性の読み取り時）
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// ワークシートXMLの解析エラー
    #[error("XML error: {0}")]
    Xml(String),

    /// 設定の検証に失敗したエラー
    ///
    /// 設定ファイルに存在しない車種ラインを指定した場合や、
    /// 開始行・モデルイヤータグの指定が不正な場合に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML設定ファイルの読み込みエラー
    #[error("Failed to read YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// 指定されたシートがワークブックに存在しない
    #[error("Sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    /// シートの構造が想定と異なる
    ///
    /// `row`はワークシート上の0始まりの行番号です（非表示行を含めた絶対位置）。
    /// 行に依存しないエラーの場合は`None`になります。
    #[error("Malformed sheet '{vehicle_line}'{}: {message}", fmt_row(.row))]
    MalformedSheet {
        /// 車種ライン（シート名）
        vehicle_line: String,
        /// 問題が検出された行
        row: Option<u32>,
        /// 詳細メッセージ
        message: String,
    },

    /// テーブルの行数がディメンションの組み合わせ数で割り切れない
    #[error(
        "Dimension mismatch in '{vehicle_line}' model year {model_year}: \
         {rows} rows is not a multiple of {unit} dimension combinations"
    )]
    DimensionMismatch {
        /// 車種ライン（シート名）
        vehicle_line: String,
        /// 対象のモデルイヤー
        model_year: String,
        /// テーブルの行数
        rows: usize,
        /// ディメンションの組み合わせ数（燃料種別数 × サブ燃料種別数）
        unit: usize,
    },

    /// ワークブックのZIP構造がセキュリティ制限に違反した
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// CSV出力エラー
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON出力エラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProdSheetError {
    /// 行番号付きの`MalformedSheet`を生成するヘルパー
    pub(crate) fn malformed(vehicle_line: &str, row: Option<u32>, message: impl Into<String>) -> Self {
        ProdSheetError::MalformedSheet {
            vehicle_line: vehicle_line.to_string(),
            row,
            message: message.into(),
        }
    }
}

fn fmt_row(row: &Option<u32>) -> String {
    match row {
        // 表示は1始まり（Excel上の行番号）
        Some(r) => format!(" at row {}", r + 1),
        None => String::new(),
    }
}
