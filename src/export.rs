//! Spreadsheet export of research results.
//!
//! A [`Workbook`] holds named sheets of typed cells and is written as one
//! `.xlsx` file with a worksheet per non-empty sheet.

use rust_xlsxwriter::{Format, Worksheet, XlsxError};
use serde_json::{Map, Value};

use crate::error::{ResearchError, Result};
use crate::schema::{FilingSet, ResearchResults, SourceItem};

/// MIME type of an `.xlsx` workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Longest text a worksheet cell can hold.
const MAX_CELL_CHARS: usize = 32_767;

/// One cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    fn text(s: &str) -> Self {
        if s.is_empty() {
            Cell::Blank
        } else {
            Cell::Text(s.to_owned())
        }
    }

    /// Render a JSON value as a cell. `null` is blank, nested values are JSON text.
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Blank,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n.as_f64().map_or_else(|| Cell::text(&n.to_string()), Cell::Number),
            Value::String(s) => Cell::text(s),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// One sheet: a header row plus data rows of the same width.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    fn with_columns(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            headers: columns.iter().map(|c| (*c).to_owned()).collect(),
            rows: Vec::new(),
        }
    }

    /// Raw rows with columns in first-seen key order. Missing cells are blank.
    fn from_raw_rows(name: &str, rows: &[Map<String, Value>]) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
        let rows = rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|h| row.get(h).map_or(Cell::Blank, Cell::from_value))
                    .collect()
            })
            .collect();
        Self {
            name: name.to_owned(),
            headers,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn write_to(&self, worksheet: &mut Worksheet, header: &Format) -> std::result::Result<(), XlsxError> {
        worksheet.set_name(self.name.as_str())?;
        for (col, title) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, column(col)?, clamp(title), header)?;
        }
        for (index, row) in self.rows.iter().enumerate() {
            let row_num = u32::try_from(index + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
            for (col, cell) in row.iter().enumerate() {
                let col = column(col)?;
                match cell {
                    Cell::Blank => {}
                    Cell::Text(s) => {
                        worksheet.write_string(row_num, col, clamp(s))?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(row_num, col, *n)?;
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(row_num, col, *b)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// A set of sheets exported together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Lay out research results as sheets, skipping empty ones.
    ///
    /// Sheets: `KOREA_SEC` (DART raw rows), `SEC` (SEC raw rows), `YouTube`,
    /// `Papers`, `Reports`, `News`.
    pub fn from_results(results: &ResearchResults) -> Self {
        let mut sheets = Vec::new();
        if let Some(set) = &results.dart {
            sheets.push(raw_sheet("KOREA_SEC", set));
        }
        if let Some(set) = &results.sec {
            sheets.push(raw_sheet("SEC", set));
        }

        sheets.push(item_sheet(
            "YouTube",
            &["title", "url", "duration_minutes", "published_at"],
            &results.youtube,
            |item| {
                vec![
                    Cell::text(&item.title),
                    Cell::text(&item.url),
                    Cell::from_value(item.field("duration_minutes")),
                    Cell::text(&item.date),
                ]
            },
        ));
        sheets.push(item_sheet(
            "Papers",
            &[
                "title",
                "authors",
                "year",
                "venue",
                "citation_count",
                "main_url",
                "pdf_url",
            ],
            &results.papers,
            |item| {
                vec![
                    Cell::text(&item.title),
                    Cell::from_value(item.field("authors")),
                    Cell::from_value(item.field("year")),
                    Cell::from_value(item.field("venue")),
                    Cell::from_value(item.field("citation_count")),
                    Cell::from_value(item.field("main_url")),
                    Cell::text(&item.url),
                ]
            },
        ));

        let mut reports = Sheet::with_columns(
            "Reports",
            &["source", "title", "url", "published_date", "score"],
        );
        reports.rows = results
            .reports
            .iter()
            .map(|entry| {
                let item = &entry.item;
                vec![
                    Cell::text(&item.source),
                    Cell::text(&item.title),
                    Cell::text(&item.url),
                    Cell::text(&item.published_date),
                    Cell::Number(item.score as f64),
                ]
            })
            .collect();
        sheets.push(reports);

        sheets.push(item_sheet(
            "News",
            &["title", "url", "published_at", "source_name"],
            &results.news,
            |item| {
                vec![
                    Cell::text(&item.title),
                    Cell::text(&item.url),
                    Cell::text(&item.date),
                    Cell::text(&item.snippet),
                ]
            },
        ));

        sheets.retain(|sheet| !sheet.is_empty());
        Self { sheets }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Write the workbook as `.xlsx` bytes, one worksheet per sheet with a
    /// bold header row.
    ///
    /// A workbook without sheets still produces a valid file holding one
    /// empty worksheet.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Export`] if a sheet cannot be written.
    pub fn to_xlsx(&self) -> Result<Vec<u8>> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let header = Format::new().set_bold();
        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            sheet
                .write_to(worksheet, &header)
                .map_err(|e| ResearchError::Export(format!("sheet {}: {e}", sheet.name)))?;
        }
        let bytes = workbook
            .save_to_buffer()
            .map_err(|e| ResearchError::Export(format!("saving workbook: {e}")))?;
        tracing::debug!(sheets = self.sheets.len(), "workbook exported");
        Ok(bytes)
    }
}

/// Download filename for a research slug.
pub fn filename(slug: &str) -> String {
    let safe: String = slug.chars().filter(|c| !c.is_control()).collect();
    format!("research_{safe}.xlsx")
}

fn raw_sheet(name: &str, set: &FilingSet) -> Sheet {
    Sheet::from_raw_rows(name, &set.raw)
}

fn item_sheet(
    name: &str,
    columns: &[&str],
    items: &[SourceItem],
    row: impl Fn(&SourceItem) -> Vec<Cell>,
) -> Sheet {
    let mut sheet = Sheet::with_columns(name, columns);
    sheet.rows = items.iter().map(row).collect();
    sheet
}

fn column(index: usize) -> std::result::Result<u16, XlsxError> {
    u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}

/// Cut text to what a cell can hold.
fn clamp(s: &str) -> &str {
    match s.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ReportEntry;
    use ac_search::ReportItem;
    use serde_json::json;
    use std::io::{Cursor, Read};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn sample_results() -> ResearchResults {
        let sec_raw = object(json!({
            "source_type": "SEC", "form": "10-K",
            "url": "https://www.sec.gov/a.htm", "published_date": "2023-11-03", "ticker": "AAPL"
        }));
        let paper_raw = object(json!({
            "title": "Inflation", "authors": "A, B", "year": 2021, "venue": "JME",
            "citation_count": 12, "is_open_access": true,
            "main_url": "https://openalex.org/W1", "pdf_url": "https://arxiv.org/pdf/1.pdf"
        }));
        ResearchResults {
            sec: Some(FilingSet {
                items: vec![SourceItem::new(sec_raw.clone(), "AAPL 10-K", "", "", "")],
                raw: vec![sec_raw],
            }),
            papers: vec![SourceItem::new(
                paper_raw,
                "Inflation",
                "https://arxiv.org/pdf/1.pdf",
                "2021",
                "A, B | JME",
            )],
            reports: vec![ReportEntry::from(ReportItem {
                source: "arxiv.org".into(),
                title: "Inflation revisited".into(),
                url: "https://arxiv.org/pdf/1.pdf".into(),
                published_date: "2021".into(),
                snippet: String::new(),
                score: 74,
            })],
            ..Default::default()
        }
    }

    /// Read one part of the `.xlsx` package as text.
    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("valid xlsx");
        let mut text = String::new();
        archive
            .by_name(name)
            .expect("package part")
            .read_to_string(&mut text)
            .expect("utf-8");
        text
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.into())
    }

    #[test]
    fn empty_sheets_are_skipped() {
        let workbook = Workbook::from_results(&sample_results());
        let names: Vec<&str> = workbook.sheets().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["SEC", "Papers", "Reports"]);
        assert!(Workbook::from_results(&ResearchResults::default())
            .sheets()
            .is_empty());
    }

    #[test]
    fn raw_sheet_uses_first_seen_key_order() {
        let rows = vec![
            object(json!({"a": 1, "b": "x"})),
            object(json!({"b": "y", "c": null, "d": [1, 2]})),
        ];
        let sheet = Sheet::from_raw_rows("SEC", &rows);
        assert_eq!(sheet.headers, vec!["a", "b", "c", "d"]);
        assert_eq!(sheet.rows[0], vec![Cell::Number(1.0), text("x"), Cell::Blank, Cell::Blank]);
        assert_eq!(sheet.rows[1], vec![Cell::Blank, text("y"), Cell::Blank, text("[1,2]")]);
    }

    #[test]
    fn papers_sheet_keeps_numbers_numeric() {
        let workbook = Workbook::from_results(&sample_results());
        let papers = workbook.sheet("Papers").expect("papers sheet");
        assert_eq!(papers.headers[6], "pdf_url");
        assert_eq!(
            papers.rows[0],
            vec![
                text("Inflation"),
                text("A, B"),
                Cell::Number(2021.0),
                text("JME"),
                Cell::Number(12.0),
                text("https://openalex.org/W1"),
                text("https://arxiv.org/pdf/1.pdf"),
            ]
        );
        let reports = workbook.sheet("Reports").expect("reports sheet");
        assert_eq!(reports.rows[0][4], Cell::Number(74.0));
    }

    #[test]
    fn xlsx_holds_one_worksheet_per_sheet() {
        let bytes = Workbook::from_results(&sample_results())
            .to_xlsx()
            .expect("export");

        let manifest = part(&bytes, "xl/workbook.xml");
        let sec = manifest.find("name=\"SEC\"").expect("SEC sheet");
        let papers = manifest.find("name=\"Papers\"").expect("Papers sheet");
        let reports = manifest.find("name=\"Reports\"").expect("Reports sheet");
        assert!(sec < papers && papers < reports);
        assert!(!manifest.contains("name=\"News\""));

        let strings = part(&bytes, "xl/sharedStrings.xml");
        assert!(strings.contains("published_date"));
        assert!(strings.contains("Inflation revisited"));
        assert!(strings.contains("arxiv.org"));
    }

    #[test]
    fn empty_workbook_is_a_valid_file() {
        let bytes = Workbook::default().to_xlsx().expect("export");
        assert!(part(&bytes, "xl/workbook.xml").contains("<sheets>"));
    }

    #[test]
    fn long_text_is_clamped() {
        let long = "가".repeat(MAX_CELL_CHARS + 5);
        assert_eq!(clamp(&long).chars().count(), MAX_CELL_CHARS);
        assert_eq!(clamp("short"), "short");
    }

    #[test]
    fn filename_strips_control_characters() {
        assert_eq!(filename("aapl"), "research_aapl.xlsx");
        assert_eq!(filename("a\u{1}b"), "research_ab.xlsx");
    }
}
