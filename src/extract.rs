//! Client-side text extraction for files that are not sent to `/summarize`.
//!
//! | Kind | Extensions | Handling |
//! |------|------------|----------|
//! | [`FileKind::Pdf`] | `pdf` | not handled here, uploaded for summarization |
//! | [`FileKind::Text`] | `txt`, `csv`, `md`, `json`, ... | decoded as UTF-8 (lossy) |
//! | [`FileKind::Spreadsheet`] | `xlsx` | cell text, one line per row |
//! | [`FileKind::Other`] | anything else | accepted only if it is clean UTF-8 text |
//!
//! Extraction never panics; failures come back as [`ExtractError`].

use std::io::Read;

use crate::models::SelectedFile;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "text", "csv", "tsv", "md", "markdown", "rst", "json", "jsonl", "log", "xml", "html",
    "htm", "yaml", "yml", "toml", "ini",
];

/// Maximum sheets to read from one workbook.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to read per sheet.
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Column count of the widest sheet Excel allows (`XFD`).
const XLSX_MAX_COLUMNS: usize = 16_384;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
    Spreadsheet,
    Other,
}

impl FileKind {
    pub fn of(file: &SelectedFile) -> Self {
        match file.extension().as_deref() {
            Some("pdf") => FileKind::Pdf,
            Some("xlsx") => FileKind::Spreadsheet,
            Some(ext) if TEXT_EXTENSIONS.contains(&ext) => FileKind::Text,
            _ => FileKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// PDFs are summarized remotely, never read locally.
    RemoteOnly(String),
    /// Unknown extension whose bytes are not plain text.
    Binary(String),
    Spreadsheet(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::RemoteOnly(name) => {
                write!(f, "{} must be summarized by the backend", name)
            }
            ExtractError::Binary(name) => {
                write!(f, "unsupported file: {} is not a text document", name)
            }
            ExtractError::Spreadsheet(e) => write!(f, "spreadsheet extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Read a file's text content locally.
pub fn extract_local(file: &SelectedFile) -> Result<String, ExtractError> {
    match FileKind::of(file) {
        FileKind::Pdf => Err(ExtractError::RemoteOnly(file.name.clone())),
        FileKind::Text => Ok(decode_text(&file.bytes)),
        FileKind::Spreadsheet => extract_xlsx(&file.bytes),
        FileKind::Other => {
            let bytes = file.bytes.strip_prefix(UTF8_BOM).unwrap_or(&file.bytes);
            if bytes.contains(&0) {
                return Err(ExtractError::Binary(file.name.clone()));
            }
            std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|_| ExtractError::Binary(file.name.clone()))
        }
    }
}

/// UTF-8 decode with replacement characters, dropping a leading BOM.
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
) -> Result<Option<Vec<u8>>, ExtractError> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ExtractError::Spreadsheet(e.to_string())),
    };
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Spreadsheet(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(Some(out))
}

/// Workbook text: sheets separated by a blank line, rows by newlines,
/// cells by tabs.
fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;
    let shared_strings = match read_zip_entry_bounded(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let mut sheets = Vec::new();
    for name in worksheet_names(&archive).into_iter().take(XLSX_MAX_SHEETS) {
        let Some(xml) = read_zip_entry_bounded(&mut archive, &name)? else {
            continue;
        };
        let rows = parse_sheet_rows(&xml, &shared_strings)?;
        if !rows.is_empty() {
            sheets.push(rows.join("\n"));
        }
    }
    Ok(sheets.join("\n\n"))
}

fn worksheet_names(archive: &Archive<'_>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Each `<si>` becomes one string; rich-text runs are concatenated.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    use quick_xml::events::Event;

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = current.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.extend(current.take()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Spreadsheet(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CellType {
    SharedString,
    Inline,
    Value,
}

/// Zero-based column of a cell reference such as `C7` (`A` is 0).
/// `None` when the reference has no letters or lies past column `XFD`.
fn column_index(reference: &[u8]) -> Option<usize> {
    let letters = reference
        .iter()
        .take_while(|b| b.is_ascii_alphabetic())
        .try_fold(0usize, |acc, b| {
            let acc = acc * 26 + usize::from(b.to_ascii_uppercase() - b'A') + 1;
            (acc <= XLSX_MAX_COLUMNS).then_some(acc)
        })?;
    letters.checked_sub(1)
}

fn parse_sheet_rows(xml: &[u8], shared_strings: &[String]) -> Result<Vec<String>, ExtractError> {
    use quick_xml::events::Event;

    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<String> = None;
    let mut cell_type = CellType::Value;
    let mut cell_column: Option<usize> = None;
    let mut in_value = false;
    let mut cell_count = 0usize;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        if cell_count >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    cell = Some(String::new());
                    cell_type = CellType::Value;
                    cell_column = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"t" => {
                                cell_type = match attr.value.as_ref() {
                                    b"s" => CellType::SharedString,
                                    b"inlineStr" => CellType::Inline,
                                    _ => CellType::Value,
                                }
                            }
                            b"r" => cell_column = column_index(&attr.value),
                            _ => {}
                        }
                    }
                }
                b"v" => in_value = cell.is_some(),
                b"t" => in_value = cell.is_some() && cell_type == CellType::Inline,
                _ => {}
            },
            Ok(Event::Text(te)) if in_value => {
                let raw = te.unescape().unwrap_or_default();
                if let Some(c) = cell.as_mut() {
                    match cell_type {
                        CellType::SharedString => {
                            if let Some(s) = raw
                                .trim()
                                .parse::<usize>()
                                .ok()
                                .and_then(|i| shared_strings.get(i))
                            {
                                c.push_str(s);
                            }
                        }
                        CellType::Inline | CellType::Value => c.push_str(&raw),
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        if let Some(column) = cell_column.take() {
                            if column > row.len() {
                                row.resize(column, String::new());
                            }
                        }
                        row.push(c);
                        cell_count += 1;
                    }
                }
                b"row" => {
                    while row.last().is_some_and(|c| c.is_empty()) {
                        row.pop();
                    }
                    if !row.is_empty() {
                        rows.push(row.join("\t"));
                    }
                    row.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Spreadsheet(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}
