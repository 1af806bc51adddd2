//! Finds the branch preamble and the true header row inside a raw export.
//!
//! Exports open with a free-form metadata block (report title, branch, date
//! range) of unknown height. Each scanned row is flattened to one upper-cased
//! line and tested for the branch marker and the header signature.

use crate::ingestion::RawTable;
use crate::normalizers::canonical_branch;
use crate::schema::LocatorRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPosition {
    pub sheet_index: usize,
    pub row: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureScan {
    /// Text following the branch marker, as found (not yet canonical).
    pub branch_raw: Option<String>,
    pub header: Option<HeaderPosition>,
}

impl StructureScan {
    pub fn branch(&self) -> String {
        canonical_branch(self.branch_raw.as_deref().unwrap_or(""))
    }
}

/// A located sales table: header cells, the data rows below them and the branch they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesTable<'t> {
    pub sheet: &'t str,
    pub headers: &'t [String],
    pub rows: &'t [Vec<String>],
    pub branch: String,
}

pub struct StructureLocator<'a> {
    rules: &'a LocatorRules,
}

impl<'a> StructureLocator<'a> {
    pub fn new(rules: &'a LocatorRules) -> Self {
        Self { rules }
    }

    pub fn scan_line(row: &[String]) -> String {
        row.iter()
            .map(|cell| cell.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase()
    }

    /// Branch text between the marker and the next comma.
    pub fn branch_in_line(&self, line: &str) -> Option<String> {
        let marker = self.rules.branch_marker.to_uppercase();
        let (_, after) = line.split_once(marker.as_str())?;
        let branch = after.split(',').next().unwrap_or("").trim();
        Some(branch.to_string())
    }

    pub fn is_header_line(&self, line: &str) -> bool {
        let anchor = self.rules.header_anchor.to_uppercase();
        line.contains(anchor.as_str())
            && self
                .rules
                .header_companions
                .iter()
                .any(|token| line.contains(token.to_uppercase().as_str()))
    }

    /// Scans sheets in order and stops at the first one whose leading rows hold the header signature.
    /// The branch marker is remembered across sheets; the last one seen wins.
    pub fn scan(&self, sheets: &[RawTable]) -> StructureScan {
        let mut scan = StructureScan::default();

        for (sheet_index, sheet) in sheets.iter().enumerate() {
            for (row_idx, row) in sheet.rows.iter().take(self.rules.scan_rows).enumerate() {
                let line = Self::scan_line(row);

                if let Some(branch) = self.branch_in_line(&line) {
                    scan.branch_raw = Some(branch);
                }

                if self.is_header_line(&line) {
                    scan.header = Some(HeaderPosition {
                        sheet_index,
                        row: row_idx,
                    });
                    return scan;
                }
            }
        }

        scan
    }

    pub fn locate<'t>(&self, sheets: &'t [RawTable]) -> Option<SalesTable<'t>> {
        let scan = self.scan(sheets);
        let position = scan.header?;
        let sheet = sheets.get(position.sheet_index)?;
        let headers = sheet.rows.get(position.row)?;

        Some(SalesTable {
            sheet: &sheet.name,
            headers,
            rows: &sheet.rows[position.row + 1..],
            branch: scan.branch(),
        })
    }
}
