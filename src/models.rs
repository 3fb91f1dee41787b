use serde::{Deserialize, Serialize};

/// Display label used when a search runs without a resolved location.
pub const NATIONWIDE_LABEL: &str = "hela Sverige";

/// A resolved location: the site's internal identifier plus its display
/// name and type tag. The type tag is whatever the remote autocomplete
/// reports, passed through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Structured search constraints. Every field is optional; the default
/// filter means "no constraint, nationwide".
///
/// Property types and sort order are open strings: recognized values map
/// through fixed tables, unrecognized values pass through to the query
/// string unchanged so new site vocabulary keeps working.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilter {
    pub min_rooms: Option<u32>,
    pub max_rooms: Option<u32>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub min_living_area: Option<u32>,
    pub max_living_area: Option<u32>,
    pub max_fee: Option<u64>,
    pub property_types: Vec<String>,
    pub construction_status: Option<String>,
    pub keywords: Option<String>,
    pub open_house: Option<String>,
    pub balcony: bool,
    pub elevator: bool,
    pub max_age_days: Option<u32>,
    pub sort: Option<String>,
}

/// One active-listing search hit.
///
/// All fields except `url` are raw display strings; a field that could not
/// be extracted is the empty string, never null, so downstream formatting
/// stays uniform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSummary {
    pub title: String,
    pub url: String,
    pub price: String,
    pub rooms: String,
    pub area: String,
    pub monthly_fee: String,
    pub description: String,
    pub location: String,
    pub thumbnail: String,
}

/// One sold-listing search hit. Same empty-string-for-absent convention
/// as [`ListingSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoldListingSummary {
    pub address: String,
    pub location: String,
    pub sold_price: String,
    pub price_change: String,
    pub sold_date: String,
    pub rooms: String,
    pub area: String,
    pub price_per_sqm: String,
    pub monthly_fee: String,
    pub property_type: String,
    pub agency: String,
    pub url: String,
}

/// Full detail record for a single listing page. String fields follow the
/// empty-string sentinel convention; only the coordinates are optional
/// because half a coordinate pair is useless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDetail {
    pub url: String,
    pub title: String,
    pub location: String,
    pub price: String,
    pub price_per_sqm: String,
    pub property_type: String,
    pub tenure: String,
    pub rooms: String,
    pub living_area: String,
    pub balcony: String,
    pub patio: String,
    pub floor: String,
    pub build_year: String,
    pub energy_class: String,
    pub monthly_fee: String,
    pub running_costs: String,
    pub description: String,
    pub viewing_times: Vec<String>,
    pub agent_name: String,
    pub agency_name: String,
    pub agency_url: String,
    pub image_count: usize,
    pub image_urls: Vec<String>,
    pub visit_count: String,
    pub distance_to_water: String,
    pub down_payment: String,
    pub area_price_trend: String,
    pub area_avg_price_per_sqm: String,
    pub has_floor_plan: bool,
    pub has_bankid_bidding: bool,
    pub coordinates: Option<(f64, f64)>,
}

impl ListingDetail {
    /// An all-empty record for `url`; extraction fills in whatever the
    /// markup yields and leaves the rest at these defaults.
    pub fn empty(url: &str) -> Self {
        ListingDetail {
            url: url.to_string(),
            title: String::new(),
            location: String::new(),
            price: String::new(),
            price_per_sqm: String::new(),
            property_type: String::new(),
            tenure: String::new(),
            rooms: String::new(),
            living_area: String::new(),
            balcony: String::new(),
            patio: String::new(),
            floor: String::new(),
            build_year: String::new(),
            energy_class: String::new(),
            monthly_fee: String::new(),
            running_costs: String::new(),
            description: String::new(),
            viewing_times: Vec::new(),
            agent_name: String::new(),
            agency_name: String::new(),
            agency_url: String::new(),
            image_count: 0,
            image_urls: Vec::new(),
            visit_count: String::new(),
            distance_to_water: String::new(),
            down_payment: String::new(),
            area_price_trend: String::new(),
            area_avg_price_per_sqm: String::new(),
            has_floor_plan: false,
            has_bankid_bidding: false,
            coordinates: None,
        }
    }
}

/// Raw markup for one fetched page, held only for the duration of a single
/// extraction pass.
#[derive(Debug)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}
