// Rate & supplement pricing engine: resolves which date-ranged records apply
// to a stay and composes them into an itemized total.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::pricelist::{CommonItems, PaymentType, PricelistItem, StayRequest, Unit};

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("invalid stay: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LineKind {
    Supplement,
    Discount,
    Tax,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdownLine {
    pub title: String,
    pub amount: f64,
    pub kind: LineKind,
}

/// Itemized pricing output. `total_price` always equals
/// `base_price + supplements - discounts + tourist_tax` and is deliberately
/// not clamped at zero: a negative total means the discount configuration is
/// wrong, and hiding that would mask the data error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResult {
    pub base_price: f64,
    pub supplements: Vec<PriceBreakdownLine>,
    pub discounts: Vec<PriceBreakdownLine>,
    pub tourist_tax: f64,
    pub total_price: f64,
    pub currency: String,
    pub breakdown: Vec<String>,
}

pub struct PricingEngine {
    currency: String,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new("EUR")
    }
}

impl PricingEngine {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }

    /// Price a stay against a unit's pricelist plus the inventory-wide items.
    ///
    /// Base rates are scanned per calendar night, first match wins.
    /// Supplements and discounts from the unit and the shared lists both
    /// contribute. Percent discounts apply to base + supplements; tourist
    /// tax is added last and never discounted.
    pub fn price(
        &self,
        unit: &Unit,
        common: &CommonItems,
        stay: &StayRequest,
    ) -> Result<PriceResult, PricingError> {
        let nights = stay.nights();
        if nights <= 0 {
            return Err(PricingError::Validation(
                "check-out must be after check-in".to_string(),
            ));
        }

        debug!(unit = %unit.name, nights, guests = stay.guests(), "calculating price");

        let base_price = base_price(&unit.pricelist.base_rate, stay, nights);

        let mut supplements = item_lines(
            &unit.pricelist.supplement,
            stay,
            nights,
            LineKind::Supplement,
            "Supplement",
        );
        supplements.extend(item_lines(
            &common.supplement,
            stay,
            nights,
            LineKind::Supplement,
            "Supplement",
        ));
        let supplements_total: f64 = supplements.iter().map(|l| l.amount).sum();

        let discount_base = base_price + supplements_total;
        let mut discounts = discount_lines(&unit.pricelist.discount, discount_base, stay, nights);
        discounts.extend(discount_lines(&common.discount, discount_base, stay, nights));
        let discounts_total: f64 = discounts.iter().map(|l| l.amount).sum();

        let tourist_tax = tax_total(&unit.pricelist.tourist_tax, stay, nights)
            + tax_total(&common.tourist_tax, stay, nights);

        let total_price = base_price + supplements_total - discounts_total + tourist_tax;

        let mut breakdown = vec![format!("Base price: €{base_price:.2} ({nights} nights)")];
        if !supplements.is_empty() {
            breakdown.push(format!("Supplements: €{supplements_total:.2}"));
            for line in &supplements {
                breakdown.push(format!("  - {}: €{:.2}", line.title, line.amount));
            }
        }
        if !discounts.is_empty() {
            breakdown.push(format!("Discounts: -€{discounts_total:.2}"));
            for line in &discounts {
                breakdown.push(format!("  - {}: -€{:.2}", line.title, line.amount));
            }
        }
        if tourist_tax > 0.0 {
            breakdown.push(format!("Tourist tax: €{tourist_tax:.2}"));
        }
        breakdown.push(format!("Total: €{total_price:.2}"));

        Ok(PriceResult {
            base_price,
            supplements,
            discounts,
            tourist_tax,
            total_price,
            currency: self.currency.clone(),
            breakdown,
        })
    }
}

/// Scan each calendar night and take the first applicable base rate.
///
/// First-match is the contract: suppliers order the list so earlier items
/// override later ones, so switching to best-match would silently change
/// configured prices. A night with no applicable rate contributes zero.
fn base_price(rates: &[PricelistItem], stay: &StayRequest, nights: i64) -> f64 {
    let mut total = 0.0;
    // A perStay rate spanning several nights is charged once per stay, on
    // the first night it matches.
    let mut charged_once: Vec<usize> = Vec::new();

    for night in 0..nights {
        let date = stay.check_in + Duration::days(night);
        let Some((idx, rate)) = rates
            .iter()
            .enumerate()
            .find(|(_, rate)| is_applicable(rate, date, stay, nights))
        else {
            continue;
        };
        let Some(price) = rate.price else { continue };

        match rate.payment_type {
            PaymentType::PerPerson | PaymentType::PerPersonPerNight => {
                total += price * f64::from(stay.guests());
            }
            PaymentType::PerStay => {
                if !charged_once.contains(&idx) {
                    charged_once.push(idx);
                    total += price;
                }
            }
            // Weekly base rates have no nightly proration on the wire; the
            // listed price is the nightly charge.
            PaymentType::PerNight | PaymentType::PerUnitPerWeek => total += price,
        }
    }

    total
}

/// Fixed-price contribution of a supplement/discount/tax record.
fn item_amount(item: &PricelistItem, stay: &StayRequest, nights: i64) -> f64 {
    let Some(price) = item.price else { return 0.0 };
    let guests = f64::from(stay.guests());

    match item.payment_type {
        PaymentType::PerPersonPerNight => price * guests * nights as f64,
        PaymentType::PerPerson => price * guests,
        PaymentType::PerNight => price * nights as f64,
        PaymentType::PerStay => price,
        PaymentType::PerUnitPerWeek => price * ((nights + 6) / 7) as f64,
    }
}

fn item_lines(
    items: &[PricelistItem],
    stay: &StayRequest,
    nights: i64,
    kind: LineKind,
    fallback_title: &str,
) -> Vec<PriceBreakdownLine> {
    let mut lines = Vec::new();
    for item in items {
        // Applicability is checked against the stay's start date.
        if !is_applicable(item, stay.check_in, stay, nights) {
            continue;
        }
        let amount = item_amount(item, stay, nights);
        if amount > 0.0 {
            lines.push(PriceBreakdownLine {
                title: item
                    .title
                    .clone()
                    .unwrap_or_else(|| fallback_title.to_string()),
                amount,
                kind,
            });
        }
    }
    lines
}

fn discount_lines(
    items: &[PricelistItem],
    discount_base: f64,
    stay: &StayRequest,
    nights: i64,
) -> Vec<PriceBreakdownLine> {
    let mut lines = Vec::new();
    for item in items {
        if !is_applicable(item, stay.check_in, stay, nights) {
            continue;
        }
        let amount = if let Some(percent) = item.percent {
            discount_base * percent / 100.0
        } else {
            item_amount(item, stay, nights)
        };
        if amount > 0.0 {
            lines.push(PriceBreakdownLine {
                title: item.title.clone().unwrap_or_else(|| "Discount".to_string()),
                amount,
                kind: LineKind::Discount,
            });
        }
    }
    lines
}

fn tax_total(items: &[PricelistItem], stay: &StayRequest, nights: i64) -> f64 {
    items
        .iter()
        .filter(|item| is_applicable(item, stay.check_in, stay, nights))
        .map(|item| item_amount(item, stay, nights))
        .sum()
}

/// Shared applicability predicate: the date must fall inside the item's
/// inclusive range, and every set occupancy/stay bound must hold.
fn is_applicable(item: &PricelistItem, date: NaiveDate, stay: &StayRequest, nights: i64) -> bool {
    if date < item.date_from || date > item.date_to {
        return false;
    }
    if let Some(min) = item.min_adults {
        if stay.adults < min {
            return false;
        }
    }
    if let Some(max) = item.max_adults {
        if stay.adults > max {
            return false;
        }
    }
    if let Some(min) = item.min_children {
        if stay.children < min {
            return false;
        }
    }
    if let Some(min) = item.min_stay {
        if nights < i64::from(min) {
            return false;
        }
    }
    if let Some(max) = item.max_stay {
        if nights > i64::from(max) {
            return false;
        }
    }
    true
}
