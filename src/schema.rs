use crate::catalog::ProductCatalog;
use crate::error::{Result, SalesLedgerError};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Package origin recorded for lines that are sold on their own.
pub const NO_PACKAGE: &str = "N/A";

/// Date used when a row carries no parseable sale date.
pub fn fallback_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Logical columns of a POS sales export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    MovementId,
    ProductName,
    UnitPrice,
    Quantity,
    Time,
    Date,
    Discount,
    ModifierName,
    IsModifierFlag,
}

/// Input format, selected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Spreadsheet,
    DelimitedText,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        if !filename.contains('.') {
            return None;
        }
        match ext.as_str() {
            "xlsx" | "xls" => Some(Self::Spreadsheet),
            "csv" => Some(Self::DelimitedText),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum OfferType {
    #[serde(rename = "PROMO 3 DOCENAS")]
    PromoThreeDozen,
    #[serde(rename = "PAQUETE BORRACHO ($55)")]
    BorrachoPackage,
    #[serde(rename = "PAQUETE HOJA PLATANO ($55)")]
    BananaLeafPackage,
    #[serde(rename = "PAQUETE #3 (5 PZ)")]
    PackageThree,
    #[serde(rename = "OTRA PROMOCION")]
    OtherPromotion,
    #[serde(rename = "VENTA REGULAR")]
    RegularSale,
}

impl OfferType {
    pub const ALL: [OfferType; 6] = [
        OfferType::PromoThreeDozen,
        OfferType::BorrachoPackage,
        OfferType::BananaLeafPackage,
        OfferType::PackageThree,
        OfferType::OtherPromotion,
        OfferType::RegularSale,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OfferType::PromoThreeDozen => "PROMO 3 DOCENAS",
            OfferType::BorrachoPackage => "PAQUETE BORRACHO ($55)",
            OfferType::BananaLeafPackage => "PAQUETE HOJA PLATANO ($55)",
            OfferType::PackageThree => "PAQUETE #3 (5 PZ)",
            OfferType::OtherPromotion => "OTRA PROMOCION",
            OfferType::RegularSale => "VENTA REGULAR",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_uppercase();
        Self::ALL.into_iter().find(|offer| offer.label() == wanted)
    }
}

impl fmt::Display for OfferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Business category of a product name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Category {
    Tamal,
    Bebida,
    Paquete,
    Otro,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Tamal => "Tamal",
            Category::Bebida => "Bebida",
            Category::Paquete => "Paquete",
            Category::Otro => "Otro",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "TAMAL" => Some(Category::Tamal),
            "BEBIDA" => Some(Category::Bebida),
            "PAQUETE" => Some(Category::Paquete),
            "OTRO" => Some(Category::Otro),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Time bucket used by the aggregation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl From<&str> for ViewMode {
    /// Unknown labels fall back to daily buckets.
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "weekly" | "semanal" => ViewMode::Weekly,
            "monthly" | "mensual" => ViewMode::Monthly,
            _ => ViewMode::Daily,
        }
    }
}

/// One canonical sales record produced by row reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    #[serde(rename = "Sucursal")]
    pub branch: String,
    #[serde(rename = "MovimientoPDV")]
    pub movement_id: String,
    #[serde(rename = "Fecha")]
    pub date: NaiveDate,
    #[serde(rename = "Hora_Venta")]
    pub sale_time: String,
    #[serde(rename = "Producto_Final")]
    pub product: String,
    #[serde(rename = "Cantidad")]
    pub quantity: f64,
    #[serde(rename = "Total_Venta")]
    pub total: f64,
    #[serde(rename = "Paquete_Origen")]
    pub package_origin: String,
    #[serde(rename = "Tipo_Oferta")]
    pub offer_type: OfferType,
    #[serde(rename = "Hash")]
    pub hash: String,
}

impl SaleLine {
    pub fn in_package(&self) -> bool {
        let origin = self.package_origin.trim().to_uppercase();
        !matches!(origin.as_str(), "" | NO_PACKAGE | "NAN" | "NONE" | "NAT")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReconstructionRules {
    #[schemars(
        description = "Values of the is-modifier column that mark a row as a modifier (compared upper-cased)"
    )]
    pub modifier_flag_values: Vec<String>,

    #[schemars(
        description = "Substrings of a modifier name that describe fulfillment channel or preparation rather than content. Matching modifier rows are dropped."
    )]
    pub channel_exclusions: Vec<String>,

    #[schemars(description = "Package name assumed before the first item row of a table")]
    pub direct_sale_label: String,

    #[schemars(description = "Product name used for item rows with a blank product cell")]
    pub unknown_product_label: String,

    #[schemars(
        description = "Suffix appended to the current package name for modifier rows with a blank modifier name"
    )]
    pub detail_suffix: String,
}

impl Default for ReconstructionRules {
    fn default() -> Self {
        Self {
            modifier_flag_values: ["SI", "SÍ", "S", "TRUE", "YES"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            channel_exclusions: ["LLEVAR", "DIDI", "UBER", "RAPPI", "COMEDOR", "SIN ", "CON "]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            direct_sale_label: "VENTA DIRECTA".to_string(),
            unknown_product_label: "PRODUCTO DESCONOCIDO".to_string(),
            detail_suffix: "(DETALLE)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocatorRules {
    #[schemars(description = "How many leading rows of each sheet are scanned for metadata and the header")]
    pub scan_rows: usize,

    #[schemars(description = "Marker preceding the branch name in the metadata preamble")]
    pub branch_marker: String,

    #[schemars(description = "Token that must appear in the header row")]
    pub header_anchor: String,

    #[schemars(description = "At least one of these tokens must appear next to the anchor in the header row")]
    pub header_companions: Vec<String>,

    #[schemars(description = "Number of leading bytes of a CSV file sampled to infer the separator")]
    pub csv_sniff_bytes: usize,
}

impl Default for LocatorRules {
    fn default() -> Self {
        Self {
            scan_rows: 50,
            branch_marker: "SUCURSAL:".to_string(),
            header_anchor: "MOVIMIENTO".to_string(),
            header_companions: vec!["PLATILLO".to_string(), "ART".to_string()],
            csv_sniff_bytes: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportLayout {
    #[schemars(
        description = "Normalized product names in the order they should head the product-by-period pivot"
    )]
    pub pivot_priority: Vec<String>,

    #[schemars(description = "Product label that is always placed last in the pivot")]
    pub pinned_last: Option<String>,

    #[schemars(description = "Number of products kept in the product mix ranking")]
    pub product_mix_limit: usize,
}

impl Default for ReportLayout {
    fn default() -> Self {
        let pivot_priority = [
            // Traditional
            "Puerco (Tradicional)",
            "Pollo (Tradicional)",
            "Frijol (Tradicional)",
            "Queso (Tradicional)",
            "Dulce (Tradicional)",
            // Banana leaf
            "Pollo (Hoja de Platano)",
            "Puerco (Hoja de Platano)",
            // Borracho
            "Pollo Salsa Verde (Borracho)",
            "Puerco (Borracho)",
            "Queso (Borracho)",
            "Pollo Mole (Borracho)",
            // Beverages, extras and packages
            "Refresco Vidrio (355ml)",
            "Refresco Lata (355ml)",
            "Refresco Pet (600ml)",
            "1 tamal borracho + 1 refresco",
            "1 tamal hp  + refresco",
            "5 tamales tradicionales + 1 refresco",
            "Cafe vaso",
            "Café vaso",
            "Ciel 1 lto.",
            "Ciel 600 ml",
            "Ciento",
            "Docena Mixta",
            "EMPANADA CAJETA Y NUEZ",
            "EMPANADA PIÑA",
            "Fuze Tea",
            "Media Docena",
            "Medio Ciento",
            "PAN DULCE",
            "Promo 3 Docenas",
            "Vallefrut",
            "Vaso de salsa 1/2 litro",
        ];

        Self {
            pivot_priority: pivot_priority.iter().map(|s| s.to_string()).collect(),
            pinned_last: Some("Elote (Tradicional)".to_string()),
            product_mix_limit: 15,
        }
    }
}

/// Immutable tables that drive the whole pipeline. Built once and shared by reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    #[serde(default)]
    #[schemars(description = "Product mapping table and category keyword rules")]
    pub catalog: ProductCatalog,

    #[serde(default)]
    #[schemars(description = "Rules for rebuilding package/content relationships between rows")]
    pub reconstruction: ReconstructionRules,

    #[serde(default)]
    #[schemars(description = "Rules for finding the branch name and header row inside an export")]
    pub locator: LocatorRules,

    #[serde(default)]
    #[schemars(description = "Presentation rules for the aggregation output")]
    pub report: ReportLayout,
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.locator.scan_rows == 0 {
            return Err(SalesLedgerError::InvalidConfig(
                "locator.scan_rows must be at least 1".to_string(),
            ));
        }
        if self.locator.header_anchor.trim().is_empty() {
            return Err(SalesLedgerError::InvalidConfig(
                "locator.header_anchor cannot be empty".to_string(),
            ));
        }
        if self.report.product_mix_limit == 0 {
            return Err(SalesLedgerError::InvalidConfig(
                "report.product_mix_limit must be at least 1".to_string(),
            ));
        }
        self.catalog.validate()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(FileKind::from_filename("ventas.XLSX"), Some(FileKind::Spreadsheet));
        assert_eq!(FileKind::from_filename("ventas.xls"), Some(FileKind::Spreadsheet));
        assert_eq!(FileKind::from_filename("ventas.csv"), Some(FileKind::DelimitedText));
        assert_eq!(FileKind::from_filename("ventas.pdf"), None);
        assert_eq!(FileKind::from_filename("csv"), None);
    }

    #[test]
    fn test_offer_type_labels_round_trip() {
        for offer in OfferType::ALL {
            assert_eq!(OfferType::from_label(offer.label()), Some(offer));
        }
        let json = serde_json::to_string(&OfferType::BorrachoPackage).unwrap();
        assert_eq!(json, "\"PAQUETE BORRACHO ($55)\"");
    }

    #[test]
    fn test_view_mode_parsing_is_lenient() {
        assert_eq!(ViewMode::from("weekly"), ViewMode::Weekly);
        assert_eq!(ViewMode::from("MONTHLY"), ViewMode::Monthly);
        assert_eq!(ViewMode::from("anything"), ViewMode::Daily);
    }

    #[test]
    fn test_in_package_detection() {
        let mut line = SaleLine {
            branch: "CENTRO".to_string(),
            movement_id: "1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            sale_time: "10:00".to_string(),
            product: "Tamal Puerco".to_string(),
            quantity: 1.0,
            total: 15.0,
            package_origin: NO_PACKAGE.to_string(),
            offer_type: OfferType::RegularSale,
            hash: String::new(),
        };
        assert!(!line.in_package());

        line.package_origin = "Media Docena".to_string();
        assert!(line.in_package());

        line.package_origin = "nan".to_string();
        assert!(!line.in_package());
    }

    #[test]
    fn test_config_json_round_trip_and_validation() {
        let config = PipelineConfig::default();
        let json = config.to_json().unwrap();
        let parsed = PipelineConfig::from_json(&json).unwrap();
        assert_eq!(parsed.locator.scan_rows, 50);
        assert_eq!(parsed.report.product_mix_limit, 15);

        let partial = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(partial.reconstruction.direct_sale_label, "VENTA DIRECTA");

        let broken = r#"{"report": {"pivot_priority": [], "pinned_last": null, "product_mix_limit": 0}}"#;
        assert!(PipelineConfig::from_json(broken).is_err());
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = PipelineConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("catalog"));
        assert!(schema_json.contains("pivot_priority"));
    }
}
