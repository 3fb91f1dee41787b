use crate::models::SoldListingSummary;
use crate::strategies::{clean_number_text, collapse_whitespace, fee_from_text_nodes, rooms_from_text};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::search_extractor::MAX_RESULTS;

const SITE_BASE: &str = "https://www.hemnet.se";

// Sold-listing URL slugs carry the property type as their first segment.
const TYPE_SLUGS: &[(&str, &str)] = &[
    ("lagenhet", "Lägenhet"),
    ("villa", "Villa"),
    ("radhus", "Radhus"),
    ("fritidshus", "Fritidshus"),
    ("tomt", "Tomt"),
];

/// Extract sold-listing summaries from a sold-search results page. Same
/// per-field independence and cap as active-listing extraction.
pub fn extract_sold_summaries(html: &str, location_name: &str) -> Vec<SoldListingSummary> {
    let document = Html::parse_document(html);
    let anchor_selector = match Selector::parse("a[href*='/salda/']") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut summaries = Vec::new();
    let mut seen_urls: Vec<String> = Vec::new();

    for anchor in document.select(&anchor_selector) {
        if summaries.len() >= MAX_RESULTS {
            break;
        }

        let href = match anchor.value().attr("href") {
            Some(h) => h,
            None => continue,
        };
        let property_type = match type_from_sold_url(href) {
            Some(t) => t,
            None => continue,
        };

        let url = absolute_url(href);
        if seen_urls.contains(&url) {
            continue;
        }
        seen_urls.push(url.clone());

        summaries.push(build_sold_summary(&anchor, url, property_type, location_name));
    }

    debug!(count = summaries.len(), "extracted sold summaries");
    summaries
}

fn build_sold_summary(
    anchor: &ElementRef,
    url: String,
    property_type: &str,
    location_name: &str,
) -> SoldListingSummary {
    let text = collapse_whitespace(&anchor.text().collect::<Vec<_>>().join(" "));

    SoldListingSummary {
        address: first_heading(anchor),
        location: location_name.to_string(),
        sold_price: extract_sold_price(&text),
        price_change: extract_price_change(&text),
        sold_date: extract_sold_date(&text),
        rooms: rooms_from_text(&text),
        area: extract_area(anchor, &text),
        price_per_sqm: extract_price_per_sqm(&text),
        monthly_fee: fee_from_text_nodes(anchor.text()),
        property_type: property_type.to_string(),
        agency: extract_agency(anchor),
        url,
    }
}

fn type_from_sold_url(href: &str) -> Option<&'static str> {
    let slug = href.split("/salda/").nth(1)?;
    TYPE_SLUGS
        .iter()
        .find(|(prefix, _)| {
            slug.starts_with(prefix)
                && slug[prefix.len()..].starts_with(|c: char| c == '-' || c == '/')
        })
        .map(|(_, display)| *display)
}

fn first_heading(anchor: &ElementRef) -> String {
    let sel = match Selector::parse("h2, h3") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    anchor
        .select(&sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default()
}

fn extract_sold_price(text: &str) -> String {
    // Only amounts carrying the "Slutpris" label count as a sale price.
    let re = Regex::new(r"Slutpris\s*(\d(?:[\d\s\u{a0}]*\d)?)\s*kr").unwrap();
    re.captures(text)
        .map(|caps| format!("{} kr", clean_number_text(caps.get(1).unwrap().as_str())))
        .unwrap_or_default()
}

fn extract_price_change(text: &str) -> String {
    let re = Regex::new(r"([+\-−]\s?\d+(?:[.,]\d+)?)\s*%").unwrap();
    re.captures(text)
        .map(|caps| format!("{}%", collapse_whitespace(caps.get(1).unwrap().as_str())))
        .unwrap_or_default()
}

fn extract_sold_date(text: &str) -> String {
    let re = Regex::new(r"Såld\s+(\d{1,2}\s+\p{L}+\s+\d{4})").unwrap();
    re.captures(text)
        .map(|caps| caps.get(1).unwrap().as_str().to_string())
        .unwrap_or_default()
}

fn extract_area(anchor: &ElementRef, text: &str) -> String {
    if let Ok(sel) = Selector::parse("p, span") {
        let isolated = Regex::new(r"^(\d+(?:[.,]\d+)?)\s*m²$").unwrap();
        for el in anchor.select(&sel) {
            let el_text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
            if let Some(caps) = isolated.captures(&el_text) {
                return format!("{} m²", caps.get(1).unwrap().as_str());
            }
        }
    }

    let re = Regex::new(r"(\d+(?:[.,]\d+)?)\s*m²").unwrap();
    for caps in re.captures_iter(text) {
        // skip m² tokens inside a kr/m² price fragment
        let after = text[caps.get(0).unwrap().end()..].trim_start();
        if after.starts_with("kr") || after.starts_with("Slutpris") {
            continue;
        }
        return format!("{} m²", caps.get(1).unwrap().as_str());
    }
    String::new()
}

fn extract_price_per_sqm(text: &str) -> String {
    let re = Regex::new(r"(\d(?:[\d\s\u{a0}]*\d)?)\s*kr/m²").unwrap();
    re.captures(text)
        .map(|caps| format!("{} kr/m²", clean_number_text(caps.get(1).unwrap().as_str())))
        .unwrap_or_default()
}

// Agency branding on sold cards is an inline logo; the alt text names the agency.
fn extract_agency(anchor: &ElementRef) -> String {
    let sel = match Selector::parse("img[alt]") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    for img in anchor.select(&sel) {
        let src = img.value().attr("src").unwrap_or("");
        let class = img.value().attr("class").unwrap_or("");
        if src.contains("logo") || class.contains("logo") {
            if let Some(alt) = img.value().attr("alt") {
                let alt = collapse_whitespace(alt);
                if !alt.is_empty() {
                    return alt;
                }
            }
        }
    }
    String::new()
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", SITE_BASE, href)
    }
}
