//! Output Formatters Implementation
//!
//! 各出力フォーマットの実装を提供するモジュール。

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::io::Write;

use crate::error::ProdSheetError;
use crate::flatten::SERIAL_KEY;
use crate::types::RecordSet;

/// CSV形式のフォーマッター
pub struct CsvFormatter;

impl CsvFormatter {
    pub fn render<W: Write>(&self, records: &RecordSet, writer: &mut W) -> Result<(), ProdSheetError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&records.columns)?;
        for row in &records.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// JSON形式のフォーマッター
///
/// 列の順序を保ったまま、各レコードをオブジェクトとして出力します。
pub struct JsonFormatter;

/// 列名と値の組をJSONオブジェクトとして直列化するためのラッパー
struct JsonRecord<'a> {
    columns: &'a [String],
    values: &'a [String],
}

impl Serialize for JsonRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl JsonFormatter {
    pub fn render<W: Write>(&self, records: &RecordSet, writer: &mut W) -> Result<(), ProdSheetError> {
        let objects: Vec<JsonRecord<'_>> = records
            .rows
            .iter()
            .map(|row| JsonRecord {
                columns: &records.columns,
                values: row,
            })
            .collect();

        serde_json::to_writer_pretty(&mut *writer, &objects)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// PostgreSQLロードスクリプトのフォーマッター
///
/// テーブルを削除・再作成し、全レコードを挿入するSQLを出力します。
pub struct SqlFormatter;

impl SqlFormatter {
    pub fn render<W: Write>(
        &self,
        table_name: &str,
        records: &RecordSet,
        writer: &mut W,
    ) -> Result<(), ProdSheetError> {
        let table = quote_identifier(table_name);

        writeln!(writer, "BEGIN;")?;
        writeln!(writer, "DROP TABLE IF EXISTS {};", table)?;

        let fields: Vec<String> = records
            .columns
            .iter()
            .map(|column| {
                let column_type = if column == SERIAL_KEY {
                    "character varying PRIMARY KEY"
                } else {
                    "character varying"
                };
                format!("{} {}", quote_identifier(column), column_type)
            })
            .collect();
        writeln!(writer, "CREATE TABLE {} ({});", table, fields.join(", "))?;

        let column_list = records
            .columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        for row in &records.rows {
            let values = row
                .iter()
                .map(|v| quote_literal(v))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                writer,
                "INSERT INTO {} ({}) VALUES ({});",
                table, column_list, values
            )?;
        }

        writeln!(writer, "COMMIT;")?;
        writer.flush()?;
        Ok(())
    }
}

/// SQL識別子をダブルクォートで囲む（内部のダブルクォートは2つに）
fn quote_identifier(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// SQL文字列リテラルをシングルクォートで囲む（内部のシングルクォートは2つに）
fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
