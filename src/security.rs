//! Security Module
//!
//! ワークブック（ZIPアーカイブ）を展開する前の安全性チェック。
//! ZIP bomb、パストラバーサル、過大な入力ファイルを拒否します。

use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::ProdSheetError;

/// ZIPアーカイブの展開制限
#[derive(Debug, Clone)]
pub(crate) struct ZipLimits {
    /// 展開後の合計サイズの上限（バイト）
    pub max_decompressed_size: u64,
    /// アーカイブ内のエントリ数の上限
    pub max_entry_count: usize,
    /// 単一エントリのサイズ上限（バイト）
    pub max_entry_size: u64,
    /// 入力ファイルのサイズ上限（バイト）
    pub max_input_size: u64,
}

impl Default for ZipLimits {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_entry_count: 10_000,
            max_entry_size: 104_857_600,  // 100MB
            max_input_size: 536_870_912,  // 512MB
        }
    }
}

impl ZipLimits {
    /// 入力サイズを検証
    pub fn check_input_size(&self, len: usize) -> Result<(), ProdSheetError> {
        if len as u64 > self.max_input_size {
            return Err(ProdSheetError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                len, self.max_input_size
            )));
        }
        Ok(())
    }

    /// アーカイブ全体を検証
    ///
    /// エントリ数、各エントリのパスとサイズ、展開後の合計サイズをチェックします。
    pub fn check_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<(), ProdSheetError> {
        if archive.len() > self.max_entry_count {
            return Err(ProdSheetError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                self.max_entry_count
            )));
        }

        let mut total: u64 = 0;
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| ProdSheetError::Zip(e.to_string()))?;

            validate_zip_path(entry.name()).map_err(ProdSheetError::SecurityViolation)?;

            if entry.size() > self.max_entry_size {
                return Err(ProdSheetError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    entry.name(),
                    entry.size(),
                    self.max_entry_size
                )));
            }

            total = total.checked_add(entry.size()).ok_or_else(|| {
                ProdSheetError::SecurityViolation(
                    "Total decompressed size calculation overflow".to_string(),
                )
            })?;
            if total > self.max_decompressed_size {
                return Err(ProdSheetError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total, self.max_decompressed_size
                )));
            }
        }

        Ok(())
    }
}

/// ZIPエントリのパスを検証
///
/// 空のパス、絶対パス、`..`、バックスラッシュを含むパスを拒否します。
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }
    let bytes = path.as_bytes();
    let is_drive_path = bytes.len() > 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if path.starts_with('/') || is_drive_path {
        return Err(format!("Absolute path is not allowed: {}", path));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }
    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }
    Ok(())
}
