// Pricelist reference data shared by the pricing engine. Owned by the
// supplier-content side; the engine only reads it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentType {
    PerStay,
    PerNight,
    PerPerson,
    PerPersonPerNight,
    PerUnitPerWeek,
}

/// One date-ranged rate, supplement, discount or tourist-tax record.
///
/// `price` is null for percent-based items; every unset constraint is
/// unconstrained. Date bounds are inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricelistItem {
    #[serde(default)]
    pub title: Option<String>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub percent: Option<f64>,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub min_adults: Option<u32>,
    #[serde(default)]
    pub max_adults: Option<u32>,
    #[serde(default)]
    pub min_children: Option<u32>,
    #[serde(default)]
    pub min_stay: Option<u32>,
    #[serde(default)]
    pub max_stay: Option<u32>,
}

impl PricelistItem {
    /// A fixed-price item with no occupancy or stay constraints.
    pub fn rate(
        date_from: NaiveDate,
        date_to: NaiveDate,
        price: f64,
        payment_type: PaymentType,
    ) -> Self {
        Self {
            title: None,
            date_from,
            date_to,
            price: Some(price),
            percent: None,
            payment_type,
            min_adults: None,
            max_adults: None,
            min_children: None,
            min_stay: None,
            max_stay: None,
        }
    }

    /// A percent-based item (discounts only).
    pub fn percentage(date_from: NaiveDate, date_to: NaiveDate, percent: f64) -> Self {
        Self {
            price: None,
            percent: Some(percent),
            ..Self::rate(date_from, date_to, 0.0, PaymentType::PerStay)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A unit's own pricelist. Base rates are an ordered list: the first item
/// satisfying the applicability predicate wins, which is how suppliers
/// express seasonal overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pricelist {
    pub base_rate: Vec<PricelistItem>,
    pub supplement: Vec<PricelistItem>,
    pub discount: Vec<PricelistItem>,
    pub tourist_tax: Vec<PricelistItem>,
}

/// Inventory-wide items that apply on top of every unit's own pricelist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonItems {
    pub supplement: Vec<PricelistItem>,
    pub discount: Vec<PricelistItem>,
    pub tourist_tax: Vec<PricelistItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub pricelist: Pricelist,
}

/// Caller-supplied stay parameters. `check_out` must be after `check_in`;
/// the engine validates this before pricing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayRequest {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: u32,
    pub children: u32,
    #[serde(default)]
    pub children_ages: Vec<u32>,
}

impl StayRequest {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn guests(&self) -> u32 {
        self.adults + self.children
    }
}
