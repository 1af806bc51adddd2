//! Header resolution: finds the physical column behind each [`ColumnRole`].
//!
//! Resolution is driven by [`COLUMN_RULES`], an ordered rule table evaluated by
//! a single resolver function. Headers are compared in normalized form
//! (upper-cased, accents folded).

use crate::normalizers::normalize_text;
use crate::schema::ColumnRole;
use std::collections::BTreeMap;

/// How a rule recognizes its header.
#[derive(Debug, Clone, Copy)]
pub enum HeaderMatcher {
    /// First alias contained in any header wins; aliases are tried in order.
    Aliases(&'static [&'static str]),
    /// A header equal to the token wins; otherwise the first header containing it.
    ExactThenContains(&'static str),
    /// Question-style boolean header: contains `¿`, starts with `ES MOD`, or contains `IS MOD`.
    Interrogative,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub role: ColumnRole,
    pub matcher: HeaderMatcher,
    /// Headers containing any of these tokens are never matched by the rule.
    pub excludes: &'static [&'static str],
    /// Headers that satisfy the interrogative test are never matched by the rule.
    pub skip_flag_headers: bool,
}

const PRICE_OR_COST: &[&str] = &["PRECIO", "COSTO"];

pub const COLUMN_RULES: &[ColumnRule] = &[
    ColumnRule {
        role: ColumnRole::MovementId,
        matcher: HeaderMatcher::Aliases(&["MOVIMIENTO", "FOLIO", "PDV"]),
        excludes: &[],
        skip_flag_headers: false,
    },
    ColumnRule {
        role: ColumnRole::ProductName,
        matcher: HeaderMatcher::Aliases(&["PLATILLO", "ARTICULO", "PRODUCTO"]),
        excludes: &[],
        skip_flag_headers: false,
    },
    ColumnRule {
        role: ColumnRole::UnitPrice,
        matcher: HeaderMatcher::Aliases(&["PRECIO", "UNITARIO"]),
        excludes: &[],
        skip_flag_headers: false,
    },
    ColumnRule {
        role: ColumnRole::Quantity,
        matcher: HeaderMatcher::Aliases(&["CANTIDAD", "CANT"]),
        excludes: &[],
        skip_flag_headers: false,
    },
    ColumnRule {
        role: ColumnRole::Time,
        matcher: HeaderMatcher::Aliases(&["HORA", "CAPTURA"]),
        excludes: &[],
        skip_flag_headers: false,
    },
    ColumnRule {
        role: ColumnRole::Date,
        matcher: HeaderMatcher::Aliases(&["FECHA", "OPERACION"]),
        excludes: &[],
        skip_flag_headers: false,
    },
    ColumnRule {
        role: ColumnRole::Discount,
        matcher: HeaderMatcher::Aliases(&["DESCUENTO"]),
        excludes: &[],
        skip_flag_headers: false,
    },
    ColumnRule {
        role: ColumnRole::ModifierName,
        matcher: HeaderMatcher::ExactThenContains("MODIFICADOR"),
        excludes: PRICE_OR_COST,
        skip_flag_headers: true,
    },
    ColumnRule {
        role: ColumnRole::IsModifierFlag,
        matcher: HeaderMatcher::Interrogative,
        excludes: PRICE_OR_COST,
        skip_flag_headers: false,
    },
];

fn is_interrogative(header: &str) -> bool {
    header.contains('¿') || header.starts_with("ES MOD") || header.contains("IS MOD")
}

/// Returns the index of the column the rule selects, if any.
pub fn resolve_rule(rule: &ColumnRule, normalized_headers: &[String]) -> Option<usize> {
    let eligible = |header: &str| {
        !rule.excludes.iter().any(|token| header.contains(token))
            && !(rule.skip_flag_headers && is_interrogative(header))
    };

    match rule.matcher {
        HeaderMatcher::Aliases(aliases) => aliases.iter().find_map(|alias| {
            normalized_headers
                .iter()
                .position(|header| header.contains(alias) && eligible(header))
        }),
        HeaderMatcher::ExactThenContains(token) => normalized_headers
            .iter()
            .position(|header| header == token)
            .or_else(|| {
                normalized_headers
                    .iter()
                    .position(|header| header.contains(token) && eligible(header))
            }),
        HeaderMatcher::Interrogative => normalized_headers
            .iter()
            .position(|header| is_interrogative(header) && eligible(header)),
    }
}

/// `ColumnRole → column index` mapping computed once per table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: BTreeMap<ColumnRole, usize>,
}

impl ColumnMap {
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_text(h.as_ref())).collect();

        let columns = COLUMN_RULES
            .iter()
            .filter_map(|rule| resolve_rule(rule, &normalized).map(|idx| (rule.role, idx)))
            .collect();

        Self { columns }
    }

    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        self.columns.get(&role).copied()
    }

    pub fn has(&self, role: ColumnRole) -> bool {
        self.columns.contains_key(&role)
    }

    /// A table is only usable when movements and products can be told apart.
    pub fn is_usable(&self) -> bool {
        self.has(ColumnRole::MovementId) && self.has(ColumnRole::ProductName)
    }

    /// Text of the cell playing `role` in `row`, trimmed; empty when absent.
    pub fn cell<'r>(&self, row: &'r [String], role: ColumnRole) -> &'r str {
        self.get(role)
            .and_then(|idx| row.get(idx))
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolves_typical_pos_header() {
        let map = ColumnMap::resolve(&headers(&[
            "Movimiento PDV",
            "Fecha Operación",
            "Hora Captura",
            "Platillo",
            "Cantidad",
            "Precio Unitario",
            "Descuento",
            "¿Es Modificador?",
            "Modificador",
            "Precio Modificador",
        ]));

        assert!(map.is_usable());
        assert_eq!(map.get(ColumnRole::MovementId), Some(0));
        assert_eq!(map.get(ColumnRole::Date), Some(1));
        assert_eq!(map.get(ColumnRole::Time), Some(2));
        assert_eq!(map.get(ColumnRole::ProductName), Some(3));
        assert_eq!(map.get(ColumnRole::Quantity), Some(4));
        assert_eq!(map.get(ColumnRole::UnitPrice), Some(5));
        assert_eq!(map.get(ColumnRole::Discount), Some(6));
        assert_eq!(map.get(ColumnRole::IsModifierFlag), Some(7));
        assert_eq!(map.get(ColumnRole::ModifierName), Some(8));
    }

    #[test]
    fn test_alias_order_beats_column_order() {
        // PLATILLO is tried before PRODUCTO even though PRODUCTO comes first.
        let map = ColumnMap::resolve(&headers(&["Folio", "Producto", "Platillo"]));
        assert_eq!(map.get(ColumnRole::ProductName), Some(2));
        assert_eq!(map.get(ColumnRole::MovementId), Some(0));
    }

    #[test]
    fn test_accented_article_header() {
        let map = ColumnMap::resolve(&headers(&["Movimiento", "Artículo"]));
        assert_eq!(map.get(ColumnRole::ProductName), Some(1));
    }

    #[test]
    fn test_modifier_name_skips_flag_and_price_headers() {
        let map = ColumnMap::resolve(&headers(&[
            "Movimiento",
            "Platillo",
            "¿Es modificador?",
            "Costo modificador",
            "Nombre modificador",
        ]));
        assert_eq!(map.get(ColumnRole::IsModifierFlag), Some(2));
        assert_eq!(map.get(ColumnRole::ModifierName), Some(4));
    }

    #[test]
    fn test_flag_header_variants() {
        let rule = COLUMN_RULES
            .iter()
            .find(|r| r.role == ColumnRole::IsModifierFlag)
            .unwrap();

        let resolve = |names: &[&str]| {
            let normalized: Vec<String> = names.iter().map(|n| normalize_text(n)).collect();
            resolve_rule(rule, &normalized)
        };

        assert_eq!(resolve(&["Platillo", "Es Mod"]), Some(1));
        assert_eq!(resolve(&["Platillo", "Is Modifier"]), Some(1));
        assert_eq!(resolve(&["¿Precio modificado?", "Es modificador"]), Some(1));
        assert_eq!(resolve(&["Platillo", "Cantidad"]), None);
    }

    #[test]
    fn test_missing_required_columns_is_unusable() {
        let map = ColumnMap::resolve(&headers(&["Platillo", "Cantidad", "Precio"]));
        assert!(!map.is_usable());
        assert!(map.has(ColumnRole::ProductName));
        assert!(!map.has(ColumnRole::MovementId));
    }

    #[test]
    fn test_cell_lookup_tolerates_short_rows() {
        let map = ColumnMap::resolve(&headers(&["Movimiento", "Platillo", "Descuento"]));
        let row = vec![" 10 ".to_string(), "Tamal Puerco".to_string()];
        assert_eq!(map.cell(&row, ColumnRole::MovementId), "10");
        assert_eq!(map.cell(&row, ColumnRole::Discount), "");
        assert_eq!(map.cell(&row, ColumnRole::ModifierName), "");
    }
}
