use crate::error::{Result, SalesLedgerError};
use crate::normalizers::normalize_text;
use crate::schema::Category;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProductMapping {
    #[schemars(description = "Product family, e.g. 'Puerco' or 'Refresco Lata'")]
    pub group: String,

    #[schemars(description = "Presentation within the family, e.g. 'Tradicional' or '355ml'")]
    pub variant: String,

    #[schemars(description = "Real units represented by one sold unit (12 for a dozen pack). Must be at least 1.")]
    pub unit_multiplier: u32,
}

impl ProductMapping {
    pub fn new(group: &str, variant: &str, unit_multiplier: u32) -> Self {
        Self {
            group: group.to_string(),
            variant: variant.to_string(),
            unit_multiplier,
        }
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.group, self.variant)
    }
}

/// Normalized name and unit factor of a raw product name.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProduct {
    pub name: String,
    pub factor: f64,
}

/// Product mapping table plus the keyword rules used to categorize names.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProductCatalog {
    #[schemars(description = "Raw POS product name -> (group, variant, unit multiplier)")]
    pub mappings: BTreeMap<String, ProductMapping>,

    #[schemars(description = "Names containing any of these are packages. Checked first.")]
    pub package_keywords: Vec<String>,

    #[schemars(description = "Names containing any of these are beverages")]
    pub beverage_keywords: Vec<String>,

    #[schemars(description = "Core product tokens; names containing any of these are tamales")]
    pub family_keywords: Vec<String>,

    #[schemars(description = "Category for names matching no rule")]
    pub default_category: Category,
}

fn entry(raw: &str, group: &str, variant: &str, unit_multiplier: u32) -> (String, ProductMapping) {
    (raw.to_string(), ProductMapping::new(group, variant, unit_multiplier))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ProductCatalog {
    fn default() -> Self {
        let mappings = [
            // Puerco
            entry("Tamal Puerco", "Puerco", "Tradicional", 1),
            entry("Puerco", "Puerco", "Tradicional", 1),
            entry("Tamales Puerco 12pz", "Puerco", "Tradicional", 12),
            entry("Tamal Borracho Puerco", "Puerco", "Borracho", 1),
            entry("Puerco (B)", "Puerco", "Borracho", 1),
            entry("Tamal Puerco Hoja de Platano", "Puerco", "Hoja de Platano", 1),
            entry("Puerco (HP)", "Puerco", "Hoja de Platano", 1),
            // Pollo
            entry("Tamal Pollo", "Pollo", "Tradicional", 1),
            entry("Pollo", "Pollo", "Tradicional", 1),
            entry("Tamales Pollo 12pz", "Pollo", "Tradicional", 12),
            entry("Tamal Pollo Hoja de Platano", "Pollo", "Hoja de Platano", 1),
            entry("Pollo (HP)", "Pollo", "Hoja de Platano", 1),
            entry("Tamal Borracho Salsa Verde", "Pollo Salsa Verde", "Borracho", 1),
            entry("Salsa Verde (B)", "Pollo Salsa Verde", "Borracho", 1),
            entry("Tamal Borracho Mole", "Pollo Mole", "Borracho", 1),
            entry("Mole (B)", "Pollo Mole", "Borracho", 1),
            // Queso
            entry("Tamal Queso", "Queso", "Tradicional", 1),
            entry("Queso", "Queso", "Tradicional", 1),
            entry("Tamales Queso 12pz", "Queso", "Tradicional", 12),
            entry("Tamal Borracho Queso", "Queso", "Borracho", 1),
            entry("Queso (B)", "Queso", "Borracho", 1),
            // Frijol
            entry("Tamal Frijol", "Frijol", "Tradicional", 1),
            entry("Frijol", "Frijol", "Tradicional", 1),
            entry("Frijoles", "Frijol", "Tradicional", 1),
            entry("Tamales Frijoles 12pz", "Frijol", "Tradicional", 12),
            // Dulce
            entry("Tamal Dulce", "Dulce", "Tradicional", 1),
            entry("Dulce", "Dulce", "Tradicional", 1),
            entry("Tamales Dulce 12pz", "Dulce", "Tradicional", 12),
            // Elote
            entry("Tamal Elote", "Elote", "Tradicional", 1),
            entry("Elote", "Elote", "Tradicional", 1),
            entry("Tamales Elote 12pz", "Elote", "Tradicional", 12),
            // Beverages
            entry("Refresco Vidrio 355ml", "Refresco Vidrio", "355ml", 1),
            entry("Refresco Vidrio 355", "Refresco Vidrio", "355ml", 1),
            entry("Refresco lata 355", "Refresco Lata", "355ml", 1),
            entry("Refresco Lata 355ml", "Refresco Lata", "355ml", 1),
            entry("Refresco Pet 600ml", "Refresco Pet", "600ml", 1),
        ]
        .into_iter()
        .collect();

        Self {
            mappings,
            package_keywords: strings(&["PAQUETE", "DOCENA", "COMBO", "CIENTO", "PROMO", "+"]),
            beverage_keywords: strings(&[
                "CAFÉ",
                "CHAMPURRADO",
                "REFRESCO",
                "AGUA",
                "ATOLE",
                "COCA",
                "SPRITE",
                "FANTA",
                "JUGO",
                "VASO",
                "VALLEFRUT",
                "FUZE TEA",
                "CIEL",
            ]),
            family_keywords: strings(&[
                "TAMAL", "PUERCO", "POLLO", "QUESO", "FRIJOL", "DULCE", "ELOTE",
            ]),
            default_category: Category::Otro,
        }
    }
}

impl ProductCatalog {
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: ProductCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        for (raw, mapping) in &self.mappings {
            if raw.trim().is_empty() {
                return Err(SalesLedgerError::InvalidConfig(
                    "Product mapping keys cannot be blank".to_string(),
                ));
            }
            if mapping.unit_multiplier < 1 {
                return Err(SalesLedgerError::InvalidConfig(format!(
                    "Product mapping '{}' has unit_multiplier {}; it must be at least 1",
                    raw, mapping.unit_multiplier
                )));
            }
        }
        Ok(())
    }

    pub fn lookup(&self, raw_name: &str) -> Option<&ProductMapping> {
        self.mappings
            .get(raw_name)
            .or_else(|| self.mappings.get(raw_name.trim()))
    }

    /// Maps a raw name to `"{group} ({variant})"` and its unit factor.
    /// Unknown names pass through with a factor of 1.
    pub fn normalize(&self, raw_name: &str) -> NormalizedProduct {
        match self.lookup(raw_name) {
            Some(mapping) => NormalizedProduct {
                name: mapping.label(),
                factor: f64::from(mapping.unit_multiplier),
            },
            None => NormalizedProduct {
                name: raw_name.to_string(),
                factor: 1.0,
            },
        }
    }

    /// Business category of a raw product name. Depends on the name alone.
    pub fn categorize(&self, raw_name: &str) -> Category {
        let name = normalize_text(raw_name);
        let contains_any =
            |keywords: &[String]| keywords.iter().any(|k| name.contains(normalize_text(k).as_str()));

        // 1. Packages first: a package name often mentions its contents
        if contains_any(&self.package_keywords) {
            return Category::Paquete;
        }

        // 2. Beverages by keyword
        if contains_any(&self.beverage_keywords) {
            return Category::Bebida;
        }

        // 3. Mapped products
        if let Some(mapping) = self.lookup(raw_name) {
            if mapping.group.contains("Refresco") {
                return Category::Bebida;
            }
            return Category::Tamal;
        }

        // 4. Family heuristic
        if contains_any(&self.family_keywords) {
            return Category::Tamal;
        }

        self.default_category
    }
}
