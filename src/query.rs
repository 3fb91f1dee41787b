use crate::models::{LocationRef, SearchFilter};

const SEARCH_BASE: &str = "https://www.hemnet.se/bostader";
const SOLD_BASE: &str = "https://www.hemnet.se/salda/bostader";

/// Build the active-listings search URL for a filter. Pure function:
/// identical input yields a byte-identical query string, parameters are
/// emitted in a fixed order, absent fields contribute nothing.
pub fn build_search_url(filter: &SearchFilter, location: Option<&LocationRef>) -> String {
    let mut params: Vec<(String, String)> = Vec::new();

    if let Some(loc) = location {
        params.push(("location_ids[]".into(), loc.id.clone()));
    }
    push_num(&mut params, "rooms_min", filter.min_rooms.map(u64::from));
    push_num(&mut params, "rooms_max", filter.max_rooms.map(u64::from));
    push_num(&mut params, "price_min", filter.min_price);
    push_num(&mut params, "price_max", filter.max_price);
    push_num(&mut params, "living_area_min", filter.min_living_area.map(u64::from));
    push_num(&mut params, "living_area_max", filter.max_living_area.map(u64::from));
    push_num(&mut params, "fee_max", filter.max_fee);
    for property_type in &filter.property_types {
        params.push(("item_types[]".into(), map_property_type(property_type)));
    }
    if let Some(status) = &filter.construction_status {
        params.push(("new_construction".into(), map_construction_status(status)));
    }
    if let Some(keywords) = &filter.keywords {
        params.push(("keywords".into(), keywords.clone()));
    }
    if let Some(window) = &filter.open_house {
        params.push(("open_house".into(), map_open_house(window)));
    }
    if filter.balcony {
        params.push(("balcony".into(), "1".into()));
    }
    if filter.elevator {
        params.push(("elevator".into(), "1".into()));
    }
    if let Some(days) = filter.max_age_days {
        params.push(("published_since".into(), map_age_bucket(days)));
    }
    if let Some(sort) = &filter.sort {
        params.push(("by".into(), map_sort_order(sort)));
    }

    assemble(SEARCH_BASE, &params)
}

/// Build the sold-listings search URL. Parameters that make no sense for
/// historical sales (fee ceiling, open house, amenity flags, construction
/// status, keywords) are omitted even when set on the filter.
pub fn build_sold_search_url(filter: &SearchFilter, location: Option<&LocationRef>) -> String {
    let mut params: Vec<(String, String)> = Vec::new();

    if let Some(loc) = location {
        params.push(("location_ids[]".into(), loc.id.clone()));
    }
    push_num(&mut params, "rooms_min", filter.min_rooms.map(u64::from));
    push_num(&mut params, "rooms_max", filter.max_rooms.map(u64::from));
    push_num(&mut params, "price_min", filter.min_price);
    push_num(&mut params, "price_max", filter.max_price);
    push_num(&mut params, "living_area_min", filter.min_living_area.map(u64::from));
    push_num(&mut params, "living_area_max", filter.max_living_area.map(u64::from));
    for property_type in &filter.property_types {
        params.push(("item_types[]".into(), map_property_type(property_type)));
    }
    if let Some(days) = filter.max_age_days {
        params.push(("sold_age".into(), map_age_bucket(days)));
    }
    if let Some(sort) = &filter.sort {
        params.push(("by".into(), map_sort_order(sort)));
    }

    assemble(SOLD_BASE, &params)
}

fn push_num(params: &mut Vec<(String, String)>, name: &str, value: Option<u64>) {
    if let Some(v) = value {
        params.push((name.into(), v.to_string()));
    }
}

fn assemble(base: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return base.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", base, query)
}

/// Caller vocabulary to the site's internal property-type tokens.
/// Unrecognized strings pass through unchanged so new site types keep
/// working without a release.
fn map_property_type(value: &str) -> String {
    match value.trim().to_lowercase().as_str() {
        "apartment" => "bostadsratt".to_string(),
        "house" | "villa" => "villa".to_string(),
        "townhouse" | "rowhouse" => "radhus".to_string(),
        "holiday" | "cottage" => "fritidshus".to_string(),
        "plot" | "land" => "tomt".to_string(),
        _ => value.to_string(),
    }
}

fn map_construction_status(value: &str) -> String {
    match value.trim().to_lowercase().as_str() {
        "new" => "only".to_string(),
        "existing" => "exclude".to_string(),
        _ => value.to_string(),
    }
}

fn map_open_house(value: &str) -> String {
    match value.trim().to_lowercase().as_str() {
        "today" => "today".to_string(),
        "weekend" => "this_weekend".to_string(),
        _ => value.to_string(),
    }
}

/// Nearest listing-age buckets the site understands. A value outside the
/// five known buckets is forwarded as the raw number.
fn map_age_bucket(days: u32) -> String {
    match days {
        1 => "1d".to_string(),
        3 => "3d".to_string(),
        7 => "1w".to_string(),
        14 => "2w".to_string(),
        30 => "1m".to_string(),
        other => other.to_string(),
    }
}

fn map_sort_order(value: &str) -> String {
    match value.trim().to_lowercase().as_str() {
        "newest" => "creation".to_string(),
        "price_asc" => "price_asc".to_string(),
        "price_desc" => "price_desc".to_string(),
        "fee_asc" => "fee_asc".to_string(),
        "size_desc" => "living_area_desc".to_string(),
        _ => value.to_string(),
    }
}
