use crate::columns::ColumnMap;
use crate::locator::SalesTable;
use crate::normalizers::{canonical_date, canonical_time, normalize_text, parse_amount, raw_time_token};
use crate::offers::classify_offer;
use crate::schema::{fallback_date, ColumnRole, ReconstructionRules, SaleLine, NO_PACKAGE};
use log::debug;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Content hash identifying a sale line across uploads.
///
/// `occurrence` separates identical lines repeated inside one movement.
pub fn line_hash(
    branch: &str,
    movement_id: &str,
    product: &str,
    quantity: f64,
    total: f64,
    raw_time: &str,
    occurrence: usize,
) -> String {
    let key = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        branch, movement_id, product, quantity, total, raw_time, occurrence
    );
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Rebuilds package/content relationships from a located sales table.
pub struct RowReconstructor<'a> {
    rules: &'a ReconstructionRules,
}

// Internal struct to track state while walking the rows
struct WalkState {
    current_package: String,
    occurrences: HashMap<(String, String), usize>,
    last_movement: String,
    last_date: String,
    last_time: String,
}

impl WalkState {
    fn new(direct_sale_label: &str) -> Self {
        Self {
            current_package: direct_sale_label.to_string(),
            occurrences: HashMap::new(),
            last_movement: String::new(),
            last_date: String::new(),
            last_time: String::new(),
        }
    }

    /// Merged cells leave blanks below the first value; reuse the last one seen.
    fn fill(slot: &mut String, value: &str) -> String {
        if !value.is_empty() {
            *slot = value.to_string();
        }
        slot.clone()
    }

    fn next_occurrence(&mut self, movement_id: &str, product_cell: &str) -> usize {
        let counter = self
            .occurrences
            .entry((movement_id.to_string(), product_cell.to_string()))
            .or_insert(0);
        let current = *counter;
        *counter += 1;
        current
    }
}

impl<'a> RowReconstructor<'a> {
    pub fn new(rules: &'a ReconstructionRules) -> Self {
        Self { rules }
    }

    fn is_modifier(&self, flag: &str) -> bool {
        let flag = flag.trim().to_uppercase();
        !flag.is_empty() && self.rules.modifier_flag_values.iter().any(|v| *v == flag)
    }

    /// Channel and preparation notes ("PARA LLEVAR", "SIN SALSA") carry no content.
    fn is_channel_note(&self, modifier_name: &str) -> bool {
        let name = normalize_text(modifier_name);
        self.rules
            .channel_exclusions
            .iter()
            .any(|token| name.contains(token.as_str()))
    }

    pub fn reconstruct(&self, table: &SalesTable<'_>) -> Vec<SaleLine> {
        let columns = ColumnMap::resolve(table.headers);
        if !columns.is_usable() {
            debug!(
                "Sheet '{}' lacks movement or product columns, skipping",
                table.sheet
            );
            return Vec::new();
        }

        let mut state = WalkState::new(&self.rules.direct_sale_label);
        let mut lines = Vec::new();

        for row in table.rows {
            // 1. Forward-fill merged keys
            let movement_id =
                WalkState::fill(&mut state.last_movement, columns.cell(row, ColumnRole::MovementId));
            let date_cell = WalkState::fill(&mut state.last_date, columns.cell(row, ColumnRole::Date));
            let time_cell = WalkState::fill(&mut state.last_time, columns.cell(row, ColumnRole::Time));

            let product_cell = columns.cell(row, ColumnRole::ProductName);
            let occurrence = state.next_occurrence(&movement_id, product_cell);

            // 2. Subtotal and blank rows
            if movement_id.is_empty() || movement_id.to_uppercase().contains("TOTAL") {
                continue;
            }

            // 3. Item or modifier
            let is_modifier = self.is_modifier(columns.cell(row, ColumnRole::IsModifierFlag));
            let modifier_name = columns.cell(row, ColumnRole::ModifierName);

            // 4-5. Package pointer
            let (product, package_origin) = if is_modifier {
                if self.is_channel_note(modifier_name) {
                    continue;
                }
                let product = if modifier_name.is_empty() {
                    format!("{} {}", state.current_package, self.rules.detail_suffix)
                } else {
                    modifier_name.to_string()
                };
                (product, state.current_package.clone())
            } else {
                state.current_package = if product_cell.is_empty() {
                    self.rules.unknown_product_label.clone()
                } else {
                    product_cell.to_string()
                };
                (state.current_package.clone(), NO_PACKAGE.to_string())
            };

            // 6. Amounts
            let price = parse_amount(columns.cell(row, ColumnRole::UnitPrice));
            let quantity = parse_amount(columns.cell(row, ColumnRole::Quantity));
            let discount = parse_amount(columns.cell(row, ColumnRole::Discount));
            let total = price * quantity - discount;

            // 7. Offer type follows the package the row belongs to
            let offer_type = classify_offer(&state.current_package, total, quantity);

            // 8. Hash
            let raw_time = raw_time_token(&time_cell);
            let hash = line_hash(
                &table.branch,
                &movement_id,
                &product,
                quantity,
                total,
                &raw_time,
                occurrence,
            );

            lines.push(SaleLine {
                branch: table.branch.clone(),
                movement_id,
                date: canonical_date(&date_cell).unwrap_or_else(fallback_date),
                sale_time: canonical_time(&time_cell),
                product,
                quantity,
                total,
                package_origin,
                offer_type,
                hash,
            });
        }

        debug!(
            "Reconstructed {} sale line(s) from sheet '{}' ({})",
            lines.len(),
            table.sheet,
            table.branch
        );
        lines
    }
}
