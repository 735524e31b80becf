//! Formatter Module
//!
//! セル値を比較・出力用の文字列へ正規化するモジュール。
//! 日付は常に`MM/DD/YYYY`（ゼロ埋め）形式に揃えます。

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::ProdSheetError;
use crate::types::CellValue;

/// 日付の出力形式（月/日/年、ゼロ埋め）
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// セルフォーマッター
///
/// セル値を文字列に変換します。値が存在しない場合は`None`を返します。
#[derive(Debug, Default, Clone, Copy)]
pub struct CellFormatter;

impl CellFormatter {
    /// セル値を文字列に変換
    ///
    /// # 戻り値
    ///
    /// * `Some(String)` - 値が存在する場合
    /// * `None` - 空セルの場合
    pub fn to_text(&self, value: &CellValue) -> Option<String> {
        match value {
            CellValue::Absent => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            CellValue::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        }
    }

    /// 比較用に文字列化し、前後の空白を除去
    pub fn to_trimmed_text(&self, value: &CellValue) -> Option<String> {
        self.to_text(value).map(|s| s.trim().to_string())
    }
}

/// 数値を文字列化
///
/// 整数値は小数点なしで出力します（例: `5.0` -> `"5"`）。
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// 日付フォーマッター
///
/// Excelのシリアル日付値を`NaiveDateTime`に変換します。
#[derive(Debug, Default, Clone, Copy)]
pub struct DateFormatter;

impl DateFormatter {
    /// シリアル値を日時に変換
    ///
    /// # 引数
    ///
    /// * `serial_value` - Excelのシリアル日付値
    /// * `is_1904` - 1904年エポックを使用するかどうか
    ///
    /// # エポックシステム
    ///
    /// - 1900年システム（デフォルト）: 1899年12月30日起算
    ///   - Excelは1900年2月29日（存在しない日、シリアル値60）を数えるため、
    ///     シリアル値60以下は1日ずらして補正する
    /// - 1904年システム: 1904年1月1日起算（Mac版Excel）
    pub fn from_serial(
        &self,
        serial_value: f64,
        is_1904: bool,
    ) -> Result<NaiveDateTime, ProdSheetError> {
        let (epoch, days_offset) = if is_1904 {
            let epoch = NaiveDate::from_ymd_opt(1904, 1, 1)
                .ok_or_else(|| ProdSheetError::Config("Invalid epoch date".to_string()))?;
            (epoch, 0i64)
        } else {
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
                .ok_or_else(|| ProdSheetError::Config("Invalid epoch date".to_string()))?;
            let offset = if serial_value < 61.0 { 1i64 } else { 0i64 };
            (epoch, offset)
        };

        let days = serial_value.floor() as i64;
        // 小数部は時刻（秒単位に丸める）
        let seconds = ((serial_value - serial_value.floor()) * 86_400.0).round() as i64;

        let midnight = epoch
            .checked_add_signed(Duration::days(days + days_offset))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| {
                ProdSheetError::Config(format!(
                    "Date calculation overflow: serial_value={}, is_1904={}",
                    serial_value, is_1904
                ))
            })?;

        Ok(midnight + Duration::seconds(seconds))
    }

    /// ISO 8601形式の文字列（calamineの`DateTimeIso`）を日時に変換
    pub fn from_iso(&self, iso: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(iso, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_to_text_variants() {
        let formatter = CellFormatter;
        assert_eq!(formatter.to_text(&CellValue::Absent), None);
        assert_eq!(formatter.to_text(&CellValue::text("LX")), Some("LX".to_string()));
        assert_eq!(formatter.to_text(&CellValue::Number(5.0)), Some("5".to_string()));
        assert_eq!(formatter.to_text(&CellValue::Number(2.5)), Some("2.5".to_string()));
        assert_eq!(formatter.to_text(&CellValue::Bool(true)), Some("TRUE".to_string()));
    }

    #[test]
    fn test_date_is_zero_padded_month_day_year() {
        let formatter = CellFormatter;
        assert_eq!(
            formatter.to_text(&CellValue::Date(date(2023, 3, 7))),
            Some("03/07/2023".to_string())
        );
    }

    #[test]
    fn test_to_trimmed_text() {
        let formatter = CellFormatter;
        assert_eq!(
            formatter.to_trimmed_text(&CellValue::text("  Down Weeks ")),
            Some("Down Weeks".to_string())
        );
        assert_eq!(formatter.to_trimmed_text(&CellValue::text("   ")), Some(String::new()));
    }

    #[test]
    fn test_from_serial_1900_system() {
        let formatter = DateFormatter;
        assert_eq!(formatter.from_serial(1.0, false).unwrap(), date(1900, 1, 1));
        assert_eq!(formatter.from_serial(59.0, false).unwrap(), date(1900, 2, 28));
        assert_eq!(formatter.from_serial(61.0, false).unwrap(), date(1900, 3, 1));
        assert_eq!(formatter.from_serial(45292.0, false).unwrap(), date(2024, 1, 1));
    }

    #[test]
    fn test_from_serial_1904_system() {
        let formatter = DateFormatter;
        assert_eq!(formatter.from_serial(0.0, true).unwrap(), date(1904, 1, 1));
        assert_eq!(formatter.from_serial(1.0, true).unwrap(), date(1904, 1, 2));
    }

    #[test]
    fn test_from_serial_keeps_time_of_day() {
        let formatter = DateFormatter;
        let dt = formatter.from_serial(45292.5, false).unwrap();
        assert_eq!(dt, date(2024, 1, 1) + Duration::hours(12));
    }

    #[test]
    fn test_from_iso() {
        let formatter = DateFormatter;
        assert_eq!(formatter.from_iso("2024-05-01"), Some(date(2024, 5, 1)));
        assert_eq!(
            formatter.from_iso("2024-05-01T00:00:00"),
            Some(date(2024, 5, 1))
        );
        assert_eq!(formatter.from_iso("not a date"), None);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// シリアル値の大小関係が日時の大小関係と一致する（1900年3月1日以降）
            #[test]
            fn test_from_serial_monotonicity(
                serial1 in 61.0f64..50000.0,
                serial2 in 61.0f64..50000.0,
                is_1904 in any::<bool>()
            ) {
                let formatter = DateFormatter;
                let date1 = formatter.from_serial(serial1, is_1904).unwrap();
                let date2 = formatter.from_serial(serial2, is_1904).unwrap();

                if serial1 <= serial2 {
                    prop_assert!(date1 <= date2,
                        "serial1={} ({}) <= serial2={} ({})", serial1, date1, serial2, date2);
                } else {
                    prop_assert!(date1 >= date2,
                        "serial1={} ({}) > serial2={} ({})", serial1, date1, serial2, date2);
                }
            }
        }
    }
}
