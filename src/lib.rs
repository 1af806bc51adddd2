//! # Sales Ledger Builder
//!
//! A library for turning noisy point-of-sale exports (spreadsheets and CSV files)
//! into a deduplicated sales ledger and time-bucketed reports.
//!
//! ## Core Concepts
//!
//! - **Raw export**: a POS report with a metadata preamble, a header row at an unknown
//!   offset, merged cells and modifier rows describing the item above them
//! - **Sale line**: one canonical record, identified by a content hash so that
//!   overlapping uploads are idempotent
//! - **Package / content**: modifier rows are linked to the last item row seen,
//!   which becomes their `Paquete_Origen`
//! - **Real units**: quantity times the unit multiplier of the product mapping
//!   (a dozen pack counts as 12)
//! - **Analysis**: date, category, branch and product filters followed by daily,
//!   weekly or monthly aggregations and a product-by-period pivot
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_ledger_builder::*;
//!
//! let config = PipelineConfig::default();
//! let files = vec![SourceFile::new("ventas_centro.csv", std::fs::read("ventas_centro.csv")?)];
//!
//! let request = AnalysisRequest::between("2024-01-01", "2024-01-31")?
//!     .with_view_mode(ViewMode::Weekly)
//!     .with_categories(&["Tamal"]);
//!
//! let report = analyze_sales(&config, &files, &request)?;
//! println!("{}", report.to_json()?);
//! ```

pub mod aggregation;
pub mod catalog;
pub mod columns;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod ledger;
pub mod locator;
pub mod normalizers;
pub mod offers;
pub mod schema;
pub mod utils;

pub use aggregation::{AggregationEngine, AnalysisReport, AnalysisRequest, Pivot, Summary};
pub use catalog::{NormalizedProduct, ProductCatalog, ProductMapping};
pub use columns::ColumnMap;
pub use engine::{line_hash, RowReconstructor};
pub use error::{Result, SalesLedgerError};
pub use ingestion::{read_tables, scan_file, FileScan, RawTable, SourceFile};
pub use ledger::{DateRange, Ledger, LedgerEntry};
pub use locator::{SalesTable, StructureLocator};
pub use offers::classify_offer;
pub use schema::*;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Output of the cleaning operation: ledger lines in canonical shape and the dates they span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanSales {
    pub lines: Vec<SaleLine>,
    pub date_range: Option<DateRange>,
}

pub struct SalesLedgerProcessor<'a> {
    config: &'a PipelineConfig,
}

impl<'a> SalesLedgerProcessor<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Sale lines of one file. Unstructured files yield an empty list, unreadable ones an error.
    pub fn lines_from_file(&self, file: &SourceFile) -> Result<Vec<SaleLine>> {
        let tables = read_tables(file, &self.config.locator)?;

        if let Some(lines) = ingestion::canonical_lines(&tables) {
            debug!(
                "{} is already clean, merging {} line(s) directly",
                file.filename,
                lines.len()
            );
            return Ok(lines);
        }

        let locator = StructureLocator::new(&self.config.locator);
        match locator.locate(&tables) {
            Some(table) => {
                debug!(
                    "{}: header found in sheet '{}' for branch {}",
                    file.filename, table.sheet, table.branch
                );
                Ok(RowReconstructor::new(&self.config.reconstruction).reconstruct(&table))
            }
            None => {
                debug!("{}: no sales header found, skipping", file.filename);
                Ok(Vec::new())
            }
        }
    }

    /// Lines of every readable file in the batch. Fails only when the batch as a whole is empty.
    pub fn collect_lines(&self, files: &[SourceFile]) -> Result<Vec<SaleLine>> {
        let mut lines = Vec::new();
        let mut skipped = 0;

        for file in files {
            match self.lines_from_file(file) {
                Ok(file_lines) => lines.extend(file_lines),
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", file.filename, e);
                    skipped += 1;
                }
            }
        }

        info!(
            "Collected {} sale line(s) from {} file(s), {} skipped",
            lines.len(),
            files.len(),
            skipped
        );

        if lines.is_empty() {
            return Err(SalesLedgerError::NoValidData);
        }
        Ok(lines)
    }

    pub fn build_ledger(&self, files: &[SourceFile]) -> Result<Ledger> {
        self.config.validate()?;
        let lines = self.collect_lines(files)?;
        Ok(Ledger::from_lines(lines, &self.config.catalog))
    }

    pub fn clean_sales(&self, files: &[SourceFile]) -> Result<CleanSales> {
        let ledger = self.build_ledger(files)?;
        let date_range = ledger.date_range();
        Ok(CleanSales {
            lines: ledger.into_lines(),
            date_range,
        })
    }

    pub fn analyze_ledger(&self, ledger: &Ledger, request: &AnalysisRequest) -> AnalysisReport {
        AggregationEngine::new(&self.config.catalog, &self.config.report).analyze(ledger, request)
    }

    pub fn analyze(&self, files: &[SourceFile], request: &AnalysisRequest) -> Result<AnalysisReport> {
        let ledger = self.build_ledger(files)?;
        info!(
            "Analyzing {} ledger line(s) with {:?} buckets",
            ledger.len(),
            request.view_mode
        );
        Ok(self.analyze_ledger(&ledger, request))
    }

    pub fn scan(&self, files: &[SourceFile]) -> Vec<FileScan> {
        files
            .iter()
            .map(|file| scan_file(file, &self.config.locator))
            .collect()
    }
}

pub fn build_ledger(config: &PipelineConfig, files: &[SourceFile]) -> Result<Ledger> {
    SalesLedgerProcessor::new(config).build_ledger(files)
}

pub fn clean_sales(config: &PipelineConfig, files: &[SourceFile]) -> Result<CleanSales> {
    SalesLedgerProcessor::new(config).clean_sales(files)
}

pub fn analyze_sales(
    config: &PipelineConfig,
    files: &[SourceFile],
    request: &AnalysisRequest,
) -> Result<AnalysisReport> {
    SalesLedgerProcessor::new(config).analyze(files, request)
}

pub fn scan_files(config: &PipelineConfig, files: &[SourceFile]) -> Vec<FileScan> {
    SalesLedgerProcessor::new(config).scan(files)
}
