use crate::catalog::ProductCatalog;
use crate::error::{Result, SalesLedgerError};
use crate::schema::{Category, SaleLine};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A sale line enriched with its normalized product, unit factor and category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(flatten)]
    pub line: SaleLine,
    #[serde(rename = "Producto_Normalizado")]
    pub normalized_product: String,
    #[serde(rename = "Factor")]
    pub factor: f64,
    #[serde(rename = "Unidades_Reales")]
    pub real_units: f64,
    #[serde(rename = "Categoria")]
    pub category: Category,
    #[serde(rename = "En_Paquete")]
    pub in_package: bool,
}

impl LedgerEntry {
    /// Factor and category depend on the final product name only.
    pub fn enrich(line: SaleLine, catalog: &ProductCatalog) -> Self {
        let normalized = catalog.normalize(&line.product);
        let category = catalog.categorize(&line.product);
        let in_package = line.in_package();

        Self {
            real_units: line.quantity * normalized.factor,
            normalized_product: normalized.name,
            factor: normalized.factor,
            category,
            in_package,
            line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateRange {
    pub fn of<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Option<Self> {
        dates.into_iter().fold(None, |range, date| match range {
            None => Some(DateRange { min: date, max: date }),
            Some(r) => Some(DateRange {
                min: r.min.min(date),
                max: r.max.max(date),
            }),
        })
    }
}

/// Deduplicated, enriched sale lines of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Keeps the first line seen for every hash, then orders by date, branch and time.
    pub fn from_lines(lines: Vec<SaleLine>, catalog: &ProductCatalog) -> Self {
        let incoming = lines.len();
        let mut seen = HashSet::with_capacity(incoming);
        let mut entries: Vec<LedgerEntry> = lines
            .into_iter()
            .filter(|line| seen.insert(line.hash.clone()))
            .map(|line| LedgerEntry::enrich(line, catalog))
            .collect();

        entries.sort_by(|a, b| {
            (a.line.date, &a.line.branch, &a.line.sale_time).cmp(&(
                b.line.date,
                &b.line.branch,
                &b.line.sale_time,
            ))
        });

        debug!(
            "Ledger holds {} line(s) after removing {} duplicate(s)",
            entries.len(),
            incoming - entries.len()
        );

        Self { entries }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn lines(&self) -> impl Iterator<Item = &SaleLine> {
        self.entries.iter().map(|e| &e.line)
    }

    pub fn into_lines(self) -> Vec<SaleLine> {
        self.entries.into_iter().map(|e| e.line).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn date_range(&self) -> Option<DateRange> {
        DateRange::of(self.entries.iter().map(|e| e.line.date))
    }

    /// Writes the canonical columns. The output is recognized again as a cleaned file on upload.
    pub fn to_canonical_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for line in self.lines() {
            writer.serialize(line)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| SalesLedgerError::IoError(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}
