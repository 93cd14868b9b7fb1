// Typed builder for the hotel availability search operation.

use chrono::NaiveDate;

use crate::envelope::Params;

/// Tariff keys requested when the caller does not narrow them down.
/// 0 = default rate plan, 1993 = standard; without at least one tariff the
/// remote returns an empty result set.
pub const DEFAULT_TARIFFS: [i32; 2] = [0, 1993];

/// 0 = on request, 1 = on quota. Stop-sale inventory is never requested.
pub const DEFAULT_QUOTA_TYPES: [i32; 2] = [0, 1];

pub const DEFAULT_PAGE_SIZE: i32 = 500;

/// `YYYY-MM-DD`, the only date rendering the remote accepts.
pub fn format_wire_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone)]
pub struct HotelSearchRequest {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub city_key: Option<i32>,
    pub hotel_keys: Vec<i32>,
    pub adults: u32,
    pub children: u32,
    pub children_ages: Vec<i32>,
    pub tariffs: Vec<i32>,
    pub page_size: i32,
    pub row_index_from: i32,
}

impl HotelSearchRequest {
    pub fn new(date_from: NaiveDate, date_to: NaiveDate, adults: u32) -> Self {
        Self {
            date_from,
            date_to,
            city_key: None,
            hotel_keys: Vec::new(),
            adults,
            children: 0,
            children_ages: Vec::new(),
            tariffs: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            row_index_from: 0,
        }
    }

    /// Render the `request` parameter tree.
    ///
    /// The element order below is the remote sequence type's declared order;
    /// optional lists that are empty emit no tag at all, because an empty
    /// `<HotelKeys/>` filters everything out instead of nothing.
    pub fn into_params(self) -> Params {
        let mut request = Params::new()
            .push("PageSize", self.page_size)
            .push("RowIndexFrom", self.row_index_from)
            .push("DateFrom", format_wire_date(self.date_from))
            .push("DateTo", format_wire_date(self.date_to));

        if let Some(city) = self.city_key {
            request = request.push("CityKeys", Params::int_list(&[city]));
        }
        if !self.hotel_keys.is_empty() {
            request = request.push("HotelKeys", Params::int_list(&self.hotel_keys));
        }
        if !self.children_ages.is_empty() {
            request = request.push("Ages", Params::int_list(&self.children_ages));
        }

        let tariffs = if self.tariffs.is_empty() {
            DEFAULT_TARIFFS.to_vec()
        } else {
            self.tariffs
        };

        request = request
            .push("Tariffs", Params::int_list(&tariffs))
            .push("Pax", self.adults + self.children)
            .push("Mode", 0)
            // 1 = sort by daily price, grouped by hotel.
            .push("ResultView", 1)
            .push("QuotaTypes", Params::int_list(&DEFAULT_QUOTA_TYPES));

        Params::new().push("request", request)
    }
}
