//! Filtering, time bucketing and report shapes over an enriched [`Ledger`].

use crate::catalog::ProductCatalog;
use crate::error::Result;
use crate::ledger::{DateRange, Ledger, LedgerEntry};
use crate::normalizers::canonical_branch;
use crate::schema::{Category, ReportLayout, ViewMode};
use crate::utils::{parse_iso_date, parse_period_string, period_label};
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Value that disables a filter when present in its allow-list.
pub const ALL_VALUES: &str = "TODAS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisRequest {
    #[serde(default)]
    #[schemars(description = "First sale date kept (inclusive)")]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Last sale date kept (inclusive)")]
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Branch allow-list. Empty or containing TODAS keeps every branch.")]
    pub branches: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Category allow-list (Tamal, Bebida, Paquete, Otro). Empty or TODAS keeps all.")]
    pub categories: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Normalized product allow-list. Also enables the product trend.")]
    pub products: Vec<String>,

    #[serde(default)]
    pub view_mode: ViewMode,
}

impl AnalysisRequest {
    /// Request covering a "YYYY-MM" or "YYYY-MM:YYYY-MM" period.
    pub fn for_period(period: &str) -> Result<Self> {
        let (start, end) = parse_period_string(period)?;
        Ok(Self {
            start_date: Some(start),
            end_date: Some(end),
            ..Self::default()
        })
    }

    /// Request bounded by ISO dates; blank bounds stay open.
    pub fn between(start: &str, end: &str) -> Result<Self> {
        let bound = |value: &str| -> Result<Option<NaiveDate>> {
            if value.trim().is_empty() {
                Ok(None)
            } else {
                parse_iso_date(value).map(Some)
            }
        };
        Ok(Self {
            start_date: bound(start)?,
            end_date: bound(end)?,
            ..Self::default()
        })
    }

    pub fn with_view_mode(mut self, view_mode: ViewMode) -> Self {
        self.view_mode = view_mode;
        self
    }

    pub fn with_branches(mut self, branches: &[&str]) -> Self {
        self.branches = branches.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_products(mut self, products: &[&str]) -> Self {
        self.products = products.iter().map(|s| s.to_string()).collect();
        self
    }
}

fn is_unfiltered(values: &[String]) -> bool {
    values.is_empty() || values.iter().any(|v| v.trim().eq_ignore_ascii_case(ALL_VALUES))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSales {
    pub period: String,
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodUnits {
    pub period: String,
    pub real_units: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUnits {
    pub product: String,
    pub real_units: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSales {
    pub branch: String,
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStats {
    pub product: String,
    pub category: Category,
    pub total_units: f64,
    pub regular_units: f64,
    pub package_units: f64,
    pub daily_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageContent {
    pub package: String,
    pub product: String,
    pub real_units: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantTotals {
    pub group: String,
    pub variant: String,
    pub total_units: f64,
    pub outside_package_units: f64,
    pub inside_package_units: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductOption {
    pub name: String,
    pub category: Category,
}

/// Product-by-period matrix of real units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl Pivot {
    pub fn get(&self, product: &str, period: &str) -> Option<f64> {
        let row = self.rows.iter().position(|r| r == product)?;
        let col = self.columns.iter().position(|c| c == period)?;
        self.cells.get(row).and_then(|cells| cells.get(col)).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_sales: f64,
    pub total_units: f64,
    pub transaction_count: usize,
    pub active_days: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub sales_over_time: Vec<PeriodSales>,
    pub product_mix: Vec<ProductUnits>,
    pub branch_performance: Vec<BranchSales>,
    pub product_table: Vec<ProductStats>,
    pub package_breakdown: Vec<PackageContent>,
    pub product_trend: Vec<PeriodUnits>,
    pub pivot: Pivot,
    pub variant_totals: Vec<VariantTotals>,
    pub available_branches: Vec<String>,
    pub available_products: Vec<ProductOption>,
    pub date_range: Option<DateRange>,
    pub summary: Summary,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Rows of the ledger that survive the request filters, plus the choices offered to the caller.
struct FilteredView<'l> {
    entries: Vec<&'l LedgerEntry>,
    available_branches: Vec<String>,
    available_products: Vec<ProductOption>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct AggregationEngine<'a> {
    catalog: &'a ProductCatalog,
    layout: &'a ReportLayout,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(catalog: &'a ProductCatalog, layout: &'a ReportLayout) -> Self {
        Self { catalog, layout }
    }

    fn filter<'l>(&self, ledger: &'l Ledger, request: &AnalysisRequest) -> FilteredView<'l> {
        // 1. Date range, inclusive on both ends
        let mut entries: Vec<&LedgerEntry> = ledger
            .entries()
            .iter()
            .filter(|e| request.start_date.map_or(true, |start| e.line.date >= start))
            .filter(|e| request.end_date.map_or(true, |end| e.line.date <= end))
            .collect();

        // 2. Category
        if !is_unfiltered(&request.categories) {
            let wanted: HashSet<Category> = request
                .categories
                .iter()
                .filter_map(|c| Category::from_label(c))
                .collect();
            entries.retain(|e| wanted.contains(&e.category));
        }

        // 3. Branch
        let available_branches: Vec<String> = entries
            .iter()
            .map(|e| e.line.branch.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if !is_unfiltered(&request.branches) {
            let wanted: HashSet<String> = request
                .branches
                .iter()
                .map(|b| canonical_branch(b))
                .collect();
            entries.retain(|e| wanted.contains(&e.line.branch));
        }

        // 4. Product
        let available_products: Vec<ProductOption> = entries
            .iter()
            .map(|e| ProductOption {
                name: e.normalized_product.clone(),
                category: e.category,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if !request.products.is_empty() {
            let wanted: HashSet<&str> = request.products.iter().map(|p| p.trim()).collect();
            entries.retain(|e| wanted.contains(e.normalized_product.as_str()));
        }

        FilteredView {
            entries,
            available_branches,
            available_products,
        }
    }

    /// Curated position first, unseen products alphabetically after, pinned label always last.
    fn pivot_rank(&self, product: &str) -> (u8, usize) {
        if self.layout.pinned_last.as_deref() == Some(product) {
            return (2, 0);
        }
        match self.layout.pivot_priority.iter().position(|p| p == product) {
            Some(idx) => (0, idx),
            None => (1, 0),
        }
    }

    fn pivot(&self, entries: &[(&LedgerEntry, String)]) -> Pivot {
        let mut sums: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();
        let mut columns: BTreeSet<&str> = BTreeSet::new();

        for (entry, period) in entries {
            columns.insert(period.as_str());
            *sums
                .entry(entry.normalized_product.as_str())
                .or_default()
                .entry(period.as_str())
                .or_insert(0.0) += entry.real_units;
        }

        let mut rows: Vec<&str> = sums.keys().copied().collect();
        rows.sort_by(|a, b| {
            (self.pivot_rank(a), *a).cmp(&(self.pivot_rank(b), *b))
        });

        let cells = rows
            .iter()
            .map(|product| {
                columns
                    .iter()
                    .map(|period| {
                        sums.get(product)
                            .and_then(|by_period| by_period.get(period))
                            .copied()
                            .unwrap_or(0.0)
                    })
                    .collect()
            })
            .collect();

        Pivot {
            rows: rows.into_iter().map(String::from).collect(),
            columns: columns.into_iter().map(String::from).collect(),
            cells,
        }
    }

    fn variant_totals(&self, entries: &[&LedgerEntry]) -> Vec<VariantTotals> {
        let mut totals: BTreeMap<(String, String), (f64, f64)> = BTreeMap::new();

        for entry in entries {
            let Some(mapping) = self.catalog.lookup(&entry.line.product) else {
                continue;
            };
            let slot = totals
                .entry((mapping.group.clone(), mapping.variant.clone()))
                .or_insert((0.0, 0.0));
            if entry.in_package {
                slot.1 += entry.real_units;
            } else {
                slot.0 += entry.real_units;
            }
        }

        let mut rows: Vec<VariantTotals> = totals
            .into_iter()
            .map(|((group, variant), (outside, inside))| VariantTotals {
                group,
                variant,
                total_units: outside + inside,
                outside_package_units: outside,
                inside_package_units: inside,
            })
            .collect();
        rows.sort_by(|a, b| b.total_units.total_cmp(&a.total_units));
        rows
    }

    pub fn analyze(&self, ledger: &Ledger, request: &AnalysisRequest) -> AnalysisReport {
        let view = self.filter(ledger, request);
        let entries = &view.entries;

        let active_dates: BTreeSet<NaiveDate> = entries.iter().map(|e| e.line.date).collect();
        let active_days = active_dates.len().max(1);

        let bucketed: Vec<(&LedgerEntry, String)> = entries
            .iter()
            .map(|e| (*e, period_label(e.line.date, request.view_mode)))
            .collect();

        // Sales over time
        let mut sales_by_period: BTreeMap<&str, f64> = BTreeMap::new();
        for (entry, period) in &bucketed {
            *sales_by_period.entry(period.as_str()).or_insert(0.0) += entry.line.total;
        }
        let sales_over_time = sales_by_period
            .into_iter()
            .map(|(period, total_sales)| PeriodSales {
                period: period.to_string(),
                total_sales,
            })
            .collect();

        // Packages are wrappers, not sellable units
        let content: Vec<&LedgerEntry> = entries
            .iter()
            .copied()
            .filter(|e| e.category != Category::Paquete)
            .collect();

        // Product mix
        let mut units_by_product: BTreeMap<&str, f64> = BTreeMap::new();
        for entry in &content {
            *units_by_product
                .entry(entry.normalized_product.as_str())
                .or_insert(0.0) += entry.real_units;
        }
        let mut product_mix: Vec<ProductUnits> = units_by_product
            .into_iter()
            .map(|(product, real_units)| ProductUnits {
                product: product.to_string(),
                real_units,
            })
            .collect();
        product_mix.sort_by(|a, b| b.real_units.total_cmp(&a.real_units).then_with(|| a.product.cmp(&b.product)));
        product_mix.truncate(self.layout.product_mix_limit);

        // Branch performance
        let mut sales_by_branch: BTreeMap<&str, f64> = BTreeMap::new();
        for entry in entries {
            *sales_by_branch.entry(entry.line.branch.as_str()).or_insert(0.0) += entry.line.total;
        }
        let branch_performance = sales_by_branch
            .into_iter()
            .map(|(branch, total_sales)| BranchSales {
                branch: branch.to_string(),
                total_sales,
            })
            .collect();

        // Product table
        let mut stats: BTreeMap<(&str, Category), (f64, f64)> = BTreeMap::new();
        for entry in &content {
            let slot = stats
                .entry((entry.normalized_product.as_str(), entry.category))
                .or_insert((0.0, 0.0));
            if entry.in_package {
                slot.1 += entry.real_units;
            } else {
                slot.0 += entry.real_units;
            }
        }
        let mut product_table: Vec<ProductStats> = stats
            .into_iter()
            .map(|((product, category), (regular, package))| {
                let total_units = regular + package;
                ProductStats {
                    product: product.to_string(),
                    category,
                    total_units,
                    regular_units: regular,
                    package_units: package,
                    daily_average: round2(total_units / active_days as f64),
                }
            })
            .collect();
        product_table.sort_by(|a, b| b.total_units.total_cmp(&a.total_units).then_with(|| a.product.cmp(&b.product)));

        // Package breakdown
        let mut by_package: BTreeMap<(&str, &str), f64> = BTreeMap::new();
        for entry in content.iter().filter(|e| e.in_package) {
            *by_package
                .entry((
                    entry.line.package_origin.as_str(),
                    entry.normalized_product.as_str(),
                ))
                .or_insert(0.0) += entry.real_units;
        }
        let mut package_breakdown: Vec<PackageContent> = by_package
            .into_iter()
            .map(|((package, product), real_units)| PackageContent {
                package: package.to_string(),
                product: product.to_string(),
                real_units,
            })
            .collect();
        package_breakdown.sort_by(|a, b| {
            a.package
                .cmp(&b.package)
                .then_with(|| b.real_units.total_cmp(&a.real_units))
                .then_with(|| a.product.cmp(&b.product))
        });

        // Product trend
        let product_trend = if request.products.is_empty() {
            Vec::new()
        } else {
            let mut units_by_period: BTreeMap<&str, f64> = BTreeMap::new();
            for (entry, period) in &bucketed {
                *units_by_period.entry(period.as_str()).or_insert(0.0) += entry.real_units;
            }
            units_by_period
                .into_iter()
                .map(|(period, real_units)| PeriodUnits {
                    period: period.to_string(),
                    real_units,
                })
                .collect()
        };

        let summary = Summary {
            total_sales: entries.iter().map(|e| e.line.total).sum(),
            total_units: entries.iter().map(|e| e.real_units).sum(),
            transaction_count: entries.len(),
            active_days,
        };

        debug!(
            "Analysis kept {} of {} ledger line(s) over {} active day(s)",
            entries.len(),
            ledger.len(),
            active_days
        );

        AnalysisReport {
            sales_over_time,
            product_mix,
            branch_performance,
            product_table,
            package_breakdown,
            product_trend,
            pivot: self.pivot(&bucketed),
            variant_totals: self.variant_totals(entries),
            available_branches: view.available_branches,
            available_products: view.available_products,
            date_range: DateRange::of(active_dates.iter().copied()),
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{OfferType, SaleLine, NO_PACKAGE};

    fn sale(hash: &str, date: &str, branch: &str, product: &str, qty: f64, package: &str) -> SaleLine {
        SaleLine {
            branch: branch.to_string(),
            movement_id: hash.to_string(),
            date: parse_iso_date(date).unwrap(),
            sale_time: "12:00".to_string(),
            product: product.to_string(),
            quantity: qty,
            total: 15.0 * qty,
            package_origin: package.to_string(),
            offer_type: OfferType::RegularSale,
            hash: hash.to_string(),
        }
    }

    fn sample_ledger(catalog: &ProductCatalog) -> Ledger {
        Ledger::from_lines(
            vec![
                sale("1", "2024-01-01", "CENTRO", "Tamal Puerco", 2.0, NO_PACKAGE),
                sale("2", "2024-01-03", "CENTRO", "Tamales Pollo 12pz", 1.0, NO_PACKAGE),
                sale("3", "2024-01-07", "NORTE", "Media Docena", 1.0, NO_PACKAGE),
                sale("4", "2024-01-07", "NORTE", "Tamal Queso", 6.0, "Media Docena"),
                sale("5", "2024-01-08", "NORTE", "Refresco Lata 355ml", 1.0, NO_PACKAGE),
                sale("6", "2024-01-08", "NORTE", "Tamal Elote", 1.0, NO_PACKAGE),
            ],
            catalog,
        )
    }

    #[test]
    fn test_date_filter_is_inclusive() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout::default();
        let engine = AggregationEngine::new(&catalog, &layout);
        let ledger = sample_ledger(&catalog);

        let request = AnalysisRequest::between("2024-01-01", "2024-01-07").unwrap();
        let report = engine.analyze(&ledger, &request);

        assert_eq!(report.summary.transaction_count, 4);
        let range = report.date_range.unwrap();
        assert_eq!(range.min, parse_iso_date("2024-01-01").unwrap());
        assert_eq!(range.max, parse_iso_date("2024-01-07").unwrap());
        assert_eq!(report.summary.active_days, 3);
    }

    #[test]
    fn test_weekly_buckets_use_monday() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout::default();
        let engine = AggregationEngine::new(&catalog, &layout);
        let ledger = sample_ledger(&catalog);

        let request = AnalysisRequest::default().with_view_mode(ViewMode::Weekly);
        let report = engine.analyze(&ledger, &request);

        let periods: Vec<&str> = report.sales_over_time.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-01-01", "2024-01-08"]);
        assert_eq!(report.pivot.columns, vec!["2024-01-01", "2024-01-08"]);
    }

    #[test]
    fn test_product_mix_excludes_packages_and_uses_real_units() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout::default();
        let engine = AggregationEngine::new(&catalog, &layout);
        let report = engine.analyze(&sample_ledger(&catalog), &AnalysisRequest::default());

        assert!(report.product_mix.iter().all(|p| p.product != "Media Docena"));
        assert_eq!(report.product_mix[0].product, "Pollo (Tradicional)");
        assert_eq!(report.product_mix[0].real_units, 12.0);
    }

    #[test]
    fn test_product_table_splits_package_units() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout::default();
        let engine = AggregationEngine::new(&catalog, &layout);
        let report = engine.analyze(&sample_ledger(&catalog), &AnalysisRequest::default());

        let queso = report
            .product_table
            .iter()
            .find(|p| p.product == "Queso (Tradicional)")
            .unwrap();
        assert_eq!(queso.package_units, 6.0);
        assert_eq!(queso.regular_units, 0.0);
        // 6 units over 4 active days
        assert_eq!(queso.daily_average, 1.5);

        assert_eq!(report.package_breakdown.len(), 1);
        assert_eq!(report.package_breakdown[0].package, "Media Docena");
    }

    #[test]
    fn test_filters_and_available_snapshots() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout::default();
        let engine = AggregationEngine::new(&catalog, &layout);
        let ledger = sample_ledger(&catalog);

        let request = AnalysisRequest::default()
            .with_categories(&["Tamal"])
            .with_branches(&["centro"]);
        let report = engine.analyze(&ledger, &request);

        assert_eq!(report.available_branches, vec!["CENTRO", "NORTE"]);
        assert!(report.branch_performance.iter().all(|b| b.branch == "CENTRO"));
        assert_eq!(report.summary.transaction_count, 2);
        assert!(report
            .available_products
            .iter()
            .all(|p| p.category == Category::Tamal));

        let everything = AnalysisRequest::default().with_branches(&["Todas"]);
        assert_eq!(engine.analyze(&ledger, &everything).summary.transaction_count, 6);
    }

    #[test]
    fn test_branch_filter_matches_canonical_branch() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout::default();
        let engine = AggregationEngine::new(&catalog, &layout);
        let ledger = sample_ledger(&catalog);

        let exact = engine.analyze(&ledger, &AnalysisRequest::default().with_branches(&["CENTRO"]));
        let loose = engine.analyze(
            &ledger,
            &AnalysisRequest::default().with_branches(&[" centro  - 0012 "]),
        );

        assert!(exact.summary.transaction_count > 0);
        assert_eq!(loose.summary.transaction_count, exact.summary.transaction_count);
        assert!(loose.branch_performance.iter().all(|b| b.branch == "CENTRO"));
    }

    #[test]
    fn test_product_filter_enables_trend() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout::default();
        let engine = AggregationEngine::new(&catalog, &layout);
        let ledger = sample_ledger(&catalog);

        let request = AnalysisRequest::default().with_products(&["Puerco (Tradicional)"]);
        let report = engine.analyze(&ledger, &request);

        assert_eq!(report.product_trend.len(), 1);
        assert_eq!(report.product_trend[0].real_units, 2.0);
        assert!(report.available_products.len() > 1, "snapshot taken before product filter");
        assert!(engine.analyze(&ledger, &AnalysisRequest::default()).product_trend.is_empty());
    }

    #[test]
    fn test_pivot_row_order() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout {
            pinned_last: Some("Elote (Tradicional)".to_string()),
            ..ReportLayout::default()
        };
        let engine = AggregationEngine::new(&catalog, &layout);
        let report = engine.analyze(&sample_ledger(&catalog), &AnalysisRequest::default());

        assert_eq!(
            report.pivot.rows,
            vec![
                "Puerco (Tradicional)",
                "Pollo (Tradicional)",
                "Queso (Tradicional)",
                "Refresco Lata (355ml)",
                "Media Docena",
                "Elote (Tradicional)",
            ]
        );
        assert_eq!(report.pivot.get("Pollo (Tradicional)", "2024-01-03"), Some(12.0));
        assert_eq!(report.pivot.get("Pollo (Tradicional)", "2024-01-01"), Some(0.0));
    }

    #[test]
    fn test_unseen_products_sort_alphabetically_before_pinned() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout::default();
        let engine = AggregationEngine::new(&catalog, &layout);
        let ledger = Ledger::from_lines(
            vec![
                sale("1", "2024-01-01", "CENTRO", "Zarzamora", 1.0, NO_PACKAGE),
                sale("2", "2024-01-01", "CENTRO", "Atole", 1.0, NO_PACKAGE),
                sale("3", "2024-01-01", "CENTRO", "Tamal Elote", 1.0, NO_PACKAGE),
                sale("4", "2024-01-01", "CENTRO", "Tamal Dulce", 1.0, NO_PACKAGE),
            ],
            &catalog,
        );
        let report = engine.analyze(&ledger, &AnalysisRequest::default());
        assert_eq!(
            report.pivot.rows,
            vec!["Dulce (Tradicional)", "Atole", "Zarzamora", "Elote (Tradicional)"]
        );
    }

    #[test]
    fn test_variant_totals() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout::default();
        let engine = AggregationEngine::new(&catalog, &layout);
        let report = engine.analyze(&sample_ledger(&catalog), &AnalysisRequest::default());

        let pollo = report
            .variant_totals
            .iter()
            .find(|v| v.group == "Pollo" && v.variant == "Tradicional")
            .unwrap();
        assert_eq!(pollo.total_units, 12.0);
        assert_eq!(pollo.outside_package_units, 12.0);
        assert!(report.variant_totals.iter().all(|v| v.group != "Media Docena"));
    }

    #[test]
    fn test_empty_result_keeps_one_active_day() {
        let catalog = ProductCatalog::default();
        let layout = ReportLayout::default();
        let engine = AggregationEngine::new(&catalog, &layout);
        let request = AnalysisRequest::between("2030-01-01", "").unwrap();
        let report = engine.analyze(&sample_ledger(&catalog), &request);

        assert_eq!(report.summary.active_days, 1);
        assert_eq!(report.summary.transaction_count, 0);
        assert!(report.date_range.is_none());
        assert!(report.pivot.rows.is_empty());
    }

    #[test]
    fn test_request_for_period() {
        let request = AnalysisRequest::for_period("2024-01").unwrap();
        assert_eq!(request.end_date, Some(parse_iso_date("2024-01-31").unwrap()));
        assert!(AnalysisRequest::between("01/02/2024", "").is_err());
    }
}
