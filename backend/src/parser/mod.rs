//! Spec document reader.
//!
//! Finds the spec document in the work root and returns its rows as
//! positional text cells. Workbooks (`.xlsx`, `.xlsm`, `.xls`, `.ods`) are
//! read from their first visible worksheet via `calamine`; `.csv` files go through
//! encoding and delimiter auto-detection first. There is no header
//! detection: every non-empty row is returned.

use calamine::{open_workbook_auto, Data, Reader, SheetType, SheetVisible};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SheetError, SheetResult};

/// Extensions accepted as spec documents, lowercase.
pub const SPEC_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "ods", "csv"];

/// One row of the spec document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    /// 1-based row number in the document.
    pub number: usize,
    /// Cell text by column position; trailing empty cells removed.
    pub cells: Vec<String>,
}

/// Find the spec document in `dir`: first match by name, skipping Office lock files (`~$`).
pub fn find_spec_document(dir: &Path) -> SheetResult<PathBuf> {
    let entries = fs::read_dir(dir).map_err(|source| SheetError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with("~$") && has_spec_extension(name))
        .collect();
    names.sort();

    names
        .into_iter()
        .next()
        .map(|name| dir.join(name))
        .ok_or_else(|| SheetError::NotFound(dir.to_path_buf()))
}

fn has_spec_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SPEC_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read all non-empty rows of a spec document.
pub fn read_spec_rows(path: &Path) -> SheetResult<Vec<SheetRow>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        let bytes = fs::read(path).map_err(|source| SheetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_csv_bytes(&bytes)
    } else {
        read_workbook(path)
    }
}

/// First visible worksheet of a workbook, else the first sheet.
///
/// calamine does not expose the active sheet; Excel never activates a
/// hidden one, so the first visible worksheet is where the user left off
/// in the common single-visible-sheet case.
fn read_workbook(path: &Path) -> SheetResult<Vec<SheetRow>> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| SheetError::Workbook(format!("{}: {}", path.display(), e)))?;

    let visible = workbook
        .sheets_metadata()
        .iter()
        .find(|s| matches!(s.typ, SheetType::WorkSheet) && matches!(s.visible, SheetVisible::Visible))
        .map(|s| s.name.clone());

    let range = match visible {
        Some(name) => workbook.worksheet_range(&name),
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SheetError::Workbook(format!("{}: no worksheet", path.display())))?,
    }
    .map_err(|e| SheetError::Workbook(e.to_string()))?;

    // The used range may start below/right of A1; keep positions absolute.
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let rows = range
        .rows()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = vec![String::new(); start_col];
            cells.extend(row.iter().map(cell_text));
            (start_row + i + 1, cells)
        });

    Ok(collect_rows(rows))
}

/// Render a workbook cell as text. Whole floats lose their `.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

fn collect_rows(rows: impl Iterator<Item = (usize, Vec<String>)>) -> Vec<SheetRow> {
    rows.filter_map(|(number, mut cells)| {
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        (!cells.is_empty()).then_some(SheetRow { number, cells })
    })
    .collect()
}

/// Parse CSV bytes with encoding and delimiter auto-detection.
pub fn parse_csv_bytes(bytes: &[u8]) -> SheetResult<Vec<SheetRow>> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    parse_csv_str(&content, delimiter)
}

/// Parse CSV text with an explicit delimiter. No header row.
pub fn parse_csv_str(content: &str, delimiter: char) -> SheetResult<Vec<SheetRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let mut raw = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let cells = record.iter().map(|c| c.trim().to_string()).collect();
        raw.push((i + 1, cells));
    }
    Ok(collect_rows(raw.into_iter()))
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    // A BOM settles it
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the given encoding label.
///
/// Unknown labels fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding_rs::Encoding::for_label(encoding.as_bytes()) {
        Some(enc) => enc.decode(bytes).0.into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_csv_rows_are_positional() {
        let csv = "G1,G2,STYLE1-A,ITEM1,,,RED,,5\nG1,G2,STYLE2,ITEM2,,,BLUE,,3,1,2,chip\n";
        let rows = parse_csv_str(csv, ',').unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, 1);
        assert_eq!(rows[0].cells[8], "5");
        assert_eq!(rows[1].cells.len(), 12);
        assert_eq!(rows[1].cells[11], "chip");
    }

    #[test]
    fn test_trailing_empty_cells_trimmed() {
        let rows = parse_csv_str("a;b;c;;;\n;;;\nx\n", ';').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells, vec!["a", "b", "c"]);
        assert_eq!(rows[1].number, 3);
    }

    #[test]
    fn test_quoted_cells() {
        let rows = parse_csv_str("\"G 1\",\"a,b\"\n", ',').unwrap();
        assert_eq!(rows[0].cells, vec!["G 1", "a,b"]);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_unknown_label_falls_back() {
        assert_eq!(decode_content(b"plain", "no-such-charset"), "plain");
    }

    #[test]
    fn test_find_spec_document() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("~$spec.xlsx"), b"lock").unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();
        fs::write(dir.path().join("spec.csv"), b"x").unwrap();
        fs::create_dir(dir.path().join("org")).unwrap();

        let found = find_spec_document(dir.path()).unwrap();
        assert_eq!(found, dir.path().join("spec.csv"));
    }

    #[test]
    fn test_find_spec_document_missing() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            find_spec_document(dir.path()),
            Err(SheetError::NotFound(_))
        ));
    }

    #[test]
    fn test_read_csv_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spec.CSV");
        fs::write(&path, "G1;G2;S-1;IT;;;R;;2\n").unwrap();

        let rows = read_spec_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells[3], "IT");
    }

    #[test]
    fn test_read_workbook_keeps_positions() {
        use crate::models::SpecRow;
        use rust_xlsxwriter::Workbook;

        let dir = tempdir().unwrap();
        let path = dir.path().join("spec.xlsx");

        // Used range starts at C4: nothing in columns A/B or rows 1-3
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(3, 2, "STYLE1-A").unwrap();
        sheet.write_string(3, 3, "ITEM1").unwrap();
        sheet.write_string(3, 6, "RED").unwrap();
        sheet.write_number(3, 8, 5.0).unwrap();
        sheet.write_number(3, 9, 2.0).unwrap();
        sheet.write_number(5, 8, 2.5).unwrap();
        workbook.save(&path).unwrap();

        let rows = read_spec_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, 4);
        assert_eq!(rows[0].cells[0], "");
        assert_eq!(rows[0].cells[2], "STYLE1-A");
        assert_eq!(rows[0].cells[8], "5");
        assert_eq!(rows[0].cells[9], "2");
        assert_eq!(rows[0].cells.len(), 10);
        assert_eq!(rows[1].number, 6);
        assert_eq!(rows[1].cells[8], "2.5");

        let row = SpecRow::from_cells(&rows[0].cells).unwrap();
        assert_eq!(row.item_code, "ITEM1");
        assert_eq!(row.step_count, 5);
        assert_eq!(row.primary_default, Some(2));
    }

    #[test]
    fn test_read_workbook_skips_hidden_sheet() {
        use rust_xlsxwriter::Workbook;

        let dir = tempdir().unwrap();
        let path = dir.path().join("spec.xlsx");

        let mut workbook = Workbook::new();
        let notes = workbook.add_worksheet();
        notes.set_name("Notes").unwrap();
        notes.write_string(0, 0, "draft").unwrap();
        notes.set_hidden(true);
        let spec = workbook.add_worksheet();
        spec.set_name("Spec").unwrap();
        spec.write_string(0, 3, "ITEM1").unwrap();
        spec.set_active(true);
        workbook.save(&path).unwrap();

        let rows = read_spec_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells[3], "ITEM1");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(5.0)), "5");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String(" A1 ".into())), "A1");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
