use crate::normalizers::normalize_text;
use crate::schema::OfferType;

const PROMO_UNIT_PRICE: f64 = 300.0;
const FIXED_PACKAGE_PRICE: std::ops::RangeInclusive<f64> = 50.0..=60.0;

/// Classifies a sale by the package name it belongs to and its unit price.
///
/// Rules are evaluated top-down and the first match wins. A zero quantity is
/// treated as one so the unit price stays defined.
pub fn classify_offer(name: &str, total: f64, quantity: f64) -> OfferType {
    let name = normalize_text(name);
    let quantity = if quantity == 0.0 { 1.0 } else { quantity };
    let unit_price = total / quantity;
    let fixed_price = FIXED_PACKAGE_PRICE.contains(&unit_price) || name.contains("PAQUETE");

    if name.contains("3 DOCENA") || unit_price >= PROMO_UNIT_PRICE {
        return OfferType::PromoThreeDozen;
    }

    if name.contains("BORRACHO") {
        return if fixed_price {
            OfferType::BorrachoPackage
        } else {
            OfferType::RegularSale
        };
    }

    if name.contains("HOJA") && name.contains("PLATANO") {
        return if fixed_price {
            OfferType::BananaLeafPackage
        } else {
            OfferType::RegularSale
        };
    }

    if name.contains("PAQUETE #3") || name.contains("5 TAMALES") {
        return OfferType::PackageThree;
    }

    if name.contains("PAQUETE") {
        return OfferType::OtherPromotion;
    }

    OfferType::RegularSale
}
