//! Parser Module
//!
//! ワークブックからシートの表示行を取り出すための読み込み層。
//! パイプラインは`SheetSource`トレイトのみに依存し、XLSXかメモリ上のデータかを区別しません。

mod memory;
mod metadata;
mod workbook;

pub use memory::MemoryWorkbook;
pub use workbook::XlsxWorkbook;

use crate::error::ProdSheetError;
use crate::types::SheetRows;

/// シートの読み込み元
///
/// 車種ラインごとに1回だけ`visible_rows`が呼ばれます。
pub trait SheetSource {
    /// ワークブック内のシート名一覧（ブック内の順序）
    fn sheet_names(&self) -> Vec<String>;

    /// 指定シートの表示行を取得する
    ///
    /// # 戻り値
    ///
    /// * `Ok(SheetRows)` - 非表示行を除いた行（A列から始まるセル配列）
    /// * `Err(ProdSheetError::SheetNotFound)` - シートが存在しない場合
    fn visible_rows(&mut self, sheet_name: &str) -> Result<SheetRows, ProdSheetError>;
}
