use crate::engine::line_hash;
use crate::error::{Result, SalesLedgerError};
use crate::locator::StructureLocator;
use crate::normalizers::{
    canonical_branch, canonical_date, canonical_time, parse_amount, raw_time_token,
};
use crate::offers::classify_offer;
use crate::schema::{fallback_date, FileKind, LocatorRules, OfferType, SaleLine, NO_PACKAGE};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;

/// One uploaded file, as handed over by the upload endpoint or the portal fetcher.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub filename: String,
    pub content: Vec<u8>,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_filename(&self.filename)
    }
}

/// An untyped grid of cells read from one sheet or CSV file. Header position unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
    }
}

/// Reads every sheet (spreadsheets) or the single grid (CSV) of a file.
pub fn read_tables(file: &SourceFile, rules: &LocatorRules) -> Result<Vec<RawTable>> {
    if file.content.is_empty() {
        return Err(SalesLedgerError::EmptyFile(file.filename.clone()));
    }

    match file.kind() {
        Some(FileKind::Spreadsheet) => read_workbook(&file.filename, &file.content),
        Some(FileKind::DelimitedText) => {
            read_delimited(&file.filename, &file.content, rules.csv_sniff_bytes)
        }
        None => Err(SalesLedgerError::UnsupportedFileType(file.filename.clone())),
    }
}

fn read_workbook(filename: &str, content: &[u8]) -> Result<Vec<RawTable>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content)).map_err(|e| {
        SalesLedgerError::Workbook {
            filename: filename.to_string(),
            details: e.to_string(),
        }
    })?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut tables = Vec::with_capacity(sheet_names.len());

    for name in &sheet_names {
        let rows = match workbook.worksheet_range(name) {
            Ok(range) => range_to_rows(&range),
            Err(e) => {
                warn!("Skipping sheet '{}' of {}: {}", name, filename, e);
                Vec::new()
            }
        };
        tables.push(RawTable {
            name: name.clone(),
            rows,
        });
    }

    debug!("Read {} sheet(s) from {}", tables.len(), filename);
    Ok(tables)
}

/// Keeps absolute sheet coordinates: rows and columns before the used range stay as blanks.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![String::new(); col_offset];
        cells.extend(row.iter().map(cell_to_string));
        rows.push(cells);
    }
    rows
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => {
            if *b {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERROR:{:?}", e),
    }
}

/// UTF-8 when valid, otherwise Latin-1 (Windows-1252). A UTF-8 BOM is dropped.
pub fn decode_text(content: &[u8]) -> String {
    let content = content.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(content);
    match std::str::from_utf8(content) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(content);
            text.into_owned()
        }
    }
}

/// `;` when any line of the leading sample contains one, else `,`.
pub fn sniff_delimiter(text: &str, sample_bytes: usize) -> u8 {
    let mut end = sample_bytes.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    if text[..end].lines().any(|line| line.contains(';')) {
        b';'
    } else {
        b','
    }
}

fn read_delimited(filename: &str, content: &[u8], sample_bytes: usize) -> Result<Vec<RawTable>> {
    let text = decode_text(content);
    let delimiter = sniff_delimiter(&text, sample_bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }

    debug!(
        "Read {} row(s) from {} (delimiter '{}')",
        rows.len(),
        filename,
        delimiter as char
    );

    Ok(vec![RawTable {
        name: filename.to_string(),
        rows,
    }])
}

/// Header form used to recognize already-cleaned ledgers.
pub fn normalize_canonical_header(header: &str) -> String {
    header
        .trim()
        .to_uppercase()
        .replace(' ', "_")
        .replace('.', "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CanonicalField {
    Branch,
    Date,
    Total,
    Product,
    Quantity,
    PackageOrigin,
    Time,
    Movement,
    OfferType,
    Hash,
}

fn canonical_field(normalized: &str) -> Option<CanonicalField> {
    let field = if normalized.contains("SUCURSAL") {
        CanonicalField::Branch
    } else if normalized.contains("FECHA") {
        CanonicalField::Date
    } else if normalized.contains("TOTAL_VENTA") || normalized.contains("TOTALVENTA") {
        CanonicalField::Total
    } else if normalized.contains("PRODUCTO_FINAL") || normalized.contains("PRODUCTOFINAL") {
        CanonicalField::Product
    } else if normalized.contains("CANTIDAD") {
        CanonicalField::Quantity
    } else if normalized.contains("PAQUETE_ORIGEN") || normalized.contains("PAQUETEORIGEN") {
        CanonicalField::PackageOrigin
    } else if normalized.contains("HORA") {
        CanonicalField::Time
    } else if normalized.contains("MOVIMIENTO") {
        CanonicalField::Movement
    } else if normalized.contains("TIPO_OFERTA") || normalized.contains("TIPOOFERTA") {
        CanonicalField::OfferType
    } else if normalized == "HASH" {
        CanonicalField::Hash
    } else {
        return None;
    };
    Some(field)
}

/// Column layout of a file that is already in SaleLine shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalColumns {
    columns: HashMap<CanonicalField, usize>,
}

impl CanonicalColumns {
    /// Recognized when branch, date, total and final-product columns are all present.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Option<Self> {
        let mut columns = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            let normalized = normalize_canonical_header(header.as_ref());
            if let Some(field) = canonical_field(&normalized) {
                columns.entry(field).or_insert(idx);
            }
        }

        let required = [
            CanonicalField::Branch,
            CanonicalField::Date,
            CanonicalField::Total,
            CanonicalField::Product,
        ];
        if required.iter().all(|field| columns.contains_key(field)) {
            Some(Self { columns })
        } else {
            None
        }
    }

    fn cell<'r>(&self, row: &'r [String], field: CanonicalField) -> &'r str {
        self.columns
            .get(&field)
            .and_then(|idx| row.get(*idx))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    /// Converts the data rows (everything after the header) into SaleLines.
    pub fn sale_lines(&self, rows: &[Vec<String>]) -> Vec<SaleLine> {
        let mut occurrences: HashMap<(String, String), usize> = HashMap::new();
        let mut lines = Vec::with_capacity(rows.len());

        for row in rows {
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let branch = canonical_branch(self.cell(row, CanonicalField::Branch));
            let movement_id = self.cell(row, CanonicalField::Movement).to_string();
            let product = self.cell(row, CanonicalField::Product).to_string();
            let quantity = parse_amount(self.cell(row, CanonicalField::Quantity));
            let total = parse_amount(self.cell(row, CanonicalField::Total));
            let date =
                canonical_date(self.cell(row, CanonicalField::Date)).unwrap_or_else(fallback_date);

            let time_cell = self.cell(row, CanonicalField::Time);
            let raw_time = raw_time_token(time_cell);

            let package_origin = match self.cell(row, CanonicalField::PackageOrigin) {
                "" => NO_PACKAGE.to_string(),
                origin => origin.to_string(),
            };

            let offer_type = OfferType::from_label(self.cell(row, CanonicalField::OfferType))
                .unwrap_or_else(|| classify_offer(&product, total, quantity));

            let occurrence = occurrences
                .entry((movement_id.clone(), product.clone()))
                .or_insert(0);
            let hash = match self.cell(row, CanonicalField::Hash) {
                "" => line_hash(
                    &branch,
                    &movement_id,
                    &product,
                    quantity,
                    total,
                    &raw_time,
                    *occurrence,
                ),
                existing => existing.to_string(),
            };
            *occurrence += 1;

            lines.push(SaleLine {
                branch,
                movement_id,
                date,
                sale_time: canonical_time(time_cell),
                product,
                quantity,
                total,
                package_origin,
                offer_type,
                hash,
            });
        }

        lines
    }
}

/// Canonical SaleLines when the first table of the file is an already-cleaned ledger.
pub fn canonical_lines(tables: &[RawTable]) -> Option<Vec<SaleLine>> {
    let first = tables.first()?;
    let headers = first.rows.first()?;
    let columns = CanonicalColumns::detect(headers)?;
    Some(columns.sale_lines(&first.rows[1..]))
}

/// Result of a quick metadata scan of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileScan {
    pub filename: String,
    pub branch: String,
    pub date_range_label: Option<String>,
}

/// Sheet holding the sales detail: named like "Detalle de ventas", else the second sheet.
fn detail_sheet(tables: &[RawTable]) -> Option<&RawTable> {
    tables
        .iter()
        .find(|t| {
            let name = t.name.to_uppercase();
            name.contains("DETALLE") && name.contains("VENTAS")
        })
        .or_else(|| tables.get(1))
}

/// Branch and reported date range of a file, without reconstructing any rows.
/// Unreadable files still produce an entry with defaults.
pub fn scan_file(file: &SourceFile, rules: &LocatorRules) -> FileScan {
    let mut scan = FileScan {
        filename: file.filename.clone(),
        branch: canonical_branch(""),
        date_range_label: None,
    };

    let tables = match read_tables(file, rules) {
        Ok(tables) => tables,
        Err(e) => {
            warn!("Scan could not read {}: {}", file.filename, e);
            return scan;
        }
    };

    scan.branch = StructureLocator::new(rules).scan(&tables).branch();

    if file.kind() == Some(FileKind::Spreadsheet) {
        // The export writes its date range in C4.
        scan.date_range_label = detail_sheet(&tables)
            .and_then(|sheet| sheet.cell(3, 2))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
    }

    scan
}
