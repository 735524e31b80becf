//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得不可能な情報を抽出するモジュール。
//! シート名とワークシートXMLの対応付け、非表示行、1904年エポック判定を提供します。

use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};

use quick_xml::events::attributes::Attribute;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use zip::ZipArchive;

use crate::error::ProdSheetError;
use crate::security::{validate_zip_path, ZipLimits};

/// XLSXメタデータ
///
/// XLSXファイル（ZIPアーカイブ）からXMLを直接解析し、
/// calamineで取得できない情報を保持します。
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkbookMetadata {
    /// シート名 -> 非表示行インデックス（0始まり）のセット
    hidden_rows: HashMap<String, HashSet<u32>>,
    /// 1904年エポックを使用するかどうか
    is_1904: bool,
}

impl WorkbookMetadata {
    /// XLSXファイルからメタデータを解析
    ///
    /// # 引数
    ///
    /// * `xlsx_reader` - XLSXファイルのリーダー（Read + Seek）
    ///
    /// # 処理フロー
    ///
    /// 1. アーカイブのセキュリティチェック
    /// 2. `xl/workbook.xml` からシート名・リレーションシップID・エポックを取得
    /// 3. `xl/_rels/workbook.xml.rels` からリレーションシップID -> ワークシートXMLパスを解決
    /// 4. 各ワークシートXMLの `<row hidden="1">` を収集
    pub fn parse<R: Read + Seek>(xlsx_reader: R) -> Result<Self, ProdSheetError> {
        let mut archive =
            ZipArchive::new(xlsx_reader).map_err(|e| ProdSheetError::Zip(e.to_string()))?;
        ZipLimits::default().check_archive(&mut archive)?;

        let (sheets, is_1904) = match read_entry(&mut archive, "xl/workbook.xml")? {
            Some(xml) => parse_workbook_xml(&xml)?,
            None => (Vec::new(), false),
        };

        let targets = match read_entry(&mut archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => parse_relationships_xml(&xml)?,
            None => HashMap::new(),
        };

        let mut hidden_rows = HashMap::new();
        for (sheet_name, rel_id) in sheets {
            let Some(target) = targets.get(&rel_id) else {
                debug!(sheet = %sheet_name, rel_id = %rel_id, "no worksheet relationship");
                continue;
            };
            let path = resolve_target(target);
            validate_zip_path(&path).map_err(ProdSheetError::SecurityViolation)?;

            if let Some(xml) = read_entry(&mut archive, &path)? {
                let rows = parse_hidden_rows(&xml)?;
                if !rows.is_empty() {
                    debug!(sheet = %sheet_name, hidden = rows.len(), "hidden rows found");
                    hidden_rows.insert(sheet_name, rows);
                }
            }
        }

        Ok(Self {
            hidden_rows,
            is_1904,
        })
    }

    /// 行が非表示かどうかを判定
    ///
    /// 情報が取得できないシートでは常に`false`を返します。
    pub fn is_row_hidden(&self, sheet_name: &str, row: u32) -> bool {
        self.hidden_rows
            .get(sheet_name)
            .map(|rows| rows.contains(&row))
            .unwrap_or(false)
    }

    /// 1904年エポックを使用するかどうか
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }
}

/// ZIPエントリをメモリに読み込む（存在しない場合は`None`）
fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, ProdSheetError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ProdSheetError::Zip(e.to_string())),
    };
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

/// リレーションシップのターゲットをアーカイブ内パスに変換
///
/// `worksheets/sheet1.xml` -> `xl/worksheets/sheet1.xml`、
/// `/xl/worksheets/sheet1.xml` -> `xl/worksheets/sheet1.xml`
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn xml_error(e: impl std::fmt::Display) -> ProdSheetError {
    ProdSheetError::Xml(e.to_string())
}

fn attr_str(attr: &Attribute<'_>) -> Result<String, ProdSheetError> {
    let raw = std::str::from_utf8(&attr.value)?;
    Ok(unescape(raw).map_err(xml_error)?.into_owned())
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value == "true"
}

/// `xl/workbook.xml` を解析
///
/// `<sheet name="..." r:id="..."/>` の一覧（ブック内の順序）と
/// `<workbookPr date1904="1"/>` の値を返します。
fn parse_workbook_xml(xml: &[u8]) -> Result<(Vec<(String, String)>, bool), ProdSheetError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut is_1904 = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"sheet" => {
                    let mut name = None;
                    let mut rel_id = None;
                    for attr in e.attributes() {
                        let attr = attr.map_err(xml_error)?;
                        match attr.key.as_ref() {
                            b"name" => name = Some(attr_str(&attr)?),
                            _ if attr.key.local_name().as_ref() == b"id" => {
                                rel_id = Some(attr_str(&attr)?)
                            }
                            _ => {}
                        }
                    }
                    if let (Some(name), Some(rel_id)) = (name, rel_id) {
                        sheets.push((name, rel_id));
                    }
                }
                b"workbookPr" => {
                    for attr in e.attributes() {
                        let attr = attr.map_err(xml_error)?;
                        if attr.key.as_ref() == b"date1904" {
                            is_1904 = is_truthy(std::str::from_utf8(&attr.value)?);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, is_1904))
}

/// リレーションシップファイルを解析（Id -> Target）
fn parse_relationships_xml(xml: &[u8]) -> Result<HashMap<String, String>, ProdSheetError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(xml_error)?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr_str(&attr)?),
                        b"Target" => target = Some(attr_str(&attr)?),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    relationships.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// ワークシートXMLから非表示行（0始まり）を収集
///
/// `r`属性が省略された`<row>`は直前の行番号+1として扱います。
fn parse_hidden_rows(xml: &[u8]) -> Result<HashSet<u32>, ProdSheetError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut hidden_rows = HashSet::new();
    let mut next_row: u32 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"row" => {
                let mut row = next_row;
                let mut hidden = false;
                for attr in e.attributes() {
                    let attr = attr.map_err(xml_error)?;
                    match attr.key.as_ref() {
                        // Excelの行番号は1始まり
                        b"r" => row = std::str::from_utf8(&attr.value)?.parse::<u32>()?.saturating_sub(1),
                        b"hidden" => hidden = is_truthy(std::str::from_utf8(&attr.value)?),
                        _ => {}
                    }
                }
                if hidden {
                    hidden_rows.insert(row);
                }
                next_row = row + 1;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(hidden_rows)
}
