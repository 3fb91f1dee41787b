use crate::models::ListingDetail;
use crate::strategies::{cascade, clean_number_text, collapse_whitespace, is_site_image_url};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const MAX_IMAGES: usize = 10;
const MAX_VIEWING_TIMES: usize = 10;

// Paragraphs shorter than this are treated as label values, not prose.
const DESCRIPTION_MIN_CHARS: usize = 200;

const SITE_BASE: &str = "https://www.hemnet.se";

// Last-resort agency name fragments for pages without an agency profile link.
const AGENCY_KEYWORDS: &[&str] = &[
    "Mäklarbyrå",
    "Fastighetsbyrå",
    "Fastighetsförmedling",
    "Mäklarhuset",
    "Bjurfors",
    "Notar",
    "HusmanHagberg",
    "Erik Olsson",
    "Länsförsäkringar",
];

/// Extract a full [`ListingDetail`] from a listing page.
///
/// Every field runs its own strategy chain; malformed or empty markup
/// yields a record of empty defaults and never an error.
pub fn extract_detail(html: &str, url: &str) -> ListingDetail {
    let document = Html::parse_document(html);
    let full_text = collapse_whitespace(
        &document.root_element().text().collect::<Vec<_>>().join(" "),
    );

    let mut detail = ListingDetail::empty(url);

    detail.title = cascade(
        &document,
        &[
            &|d: &Html| first_selected_text(d, "h1"),
            &|d: &Html| first_selected_text(d, "h2"),
        ],
    );
    detail.location = extract_location(&document);
    detail.price = extract_asking_price(&full_text);
    detail.price_per_sqm = term_value(&document, "Pris/m²");
    detail.property_type = term_value(&document, "Bostadstyp");
    detail.tenure = term_value(&document, "Upplåtelseform");
    detail.rooms = term_value(&document, "Antal rum");
    detail.living_area = term_value(&document, "Boarea");
    detail.balcony = term_value(&document, "Balkong");
    detail.patio = term_value(&document, "Uteplats");
    detail.floor = term_value(&document, "Våning");
    detail.build_year = term_value(&document, "Byggår");
    detail.energy_class = term_value(&document, "Energiklass");
    detail.monthly_fee = term_value(&document, "Avgift");
    detail.running_costs = term_value(&document, "Driftkostnad");
    detail.visit_count = term_value(&document, "besök");
    detail.distance_to_water = term_value(&document, "vatten");
    detail.description = extract_description(&document);
    detail.viewing_times = extract_viewing_times(html, &document);

    let (agent, agency_name, agency_url) = extract_people(&document);
    detail.agent_name = agent;
    detail.agency_name = agency_name;
    detail.agency_url = agency_url;

    let (count, urls) = extract_images(&document);
    detail.image_count = count;
    detail.image_urls = urls;

    // Inline data fragments without structural anchors come out of the raw
    // markup, not the parsed DOM.
    detail.down_payment = regex_capture(
        html,
        r"[Hh]andpenning[^0-9]{0,60}(\d(?:[\d\s\u{a0}]*\d)?)\s*kr",
        " kr",
    );
    detail.area_price_trend = regex_capture(
        html,
        r"[Pp]risutveckling[^0-9+\-−%]{0,80}([+\-−]?\d+(?:[.,]\d+)?)\s*%",
        "%",
    );
    detail.area_avg_price_per_sqm = regex_capture(
        html,
        r"[Ss]nittpris[^0-9]{0,80}(\d(?:[\d\s\u{a0}]*\d)?)\s*kr/m²",
        " kr/m²",
    );
    detail.has_floor_plan = html.to_lowercase().contains("planritning");
    detail.has_bankid_bidding = html.contains("BankID");
    detail.coordinates = extract_coordinates(html);

    debug!(url, title = %detail.title, "extracted listing detail");
    detail
}

// First dt whose text contains `term` yields the text of its dd sibling.
fn term_value(document: &Html, term: &str) -> String {
    let dt_selector = match Selector::parse("dt") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    let needle = term.to_lowercase();

    for dt in document.select(&dt_selector) {
        let label = dt.text().collect::<String>().to_lowercase();
        if !label.contains(&needle) {
            continue;
        }
        let mut sibling = dt.next_sibling();
        while let Some(node) = sibling {
            if let Some(value) = ElementRef::wrap(node) {
                return collapse_whitespace(&value.text().collect::<Vec<_>>().join(" "));
            }
            sibling = node.next_sibling();
        }
    }
    String::new()
}

fn first_selected_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
}

// Breadcrumb anchors link back into location-filtered searches; the last one
// is the most specific place name.
fn extract_location(document: &Html) -> String {
    let sel = match Selector::parse("a[href*='location_ids']") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    document
        .select(&sel)
        .last()
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default()
}

fn extract_asking_price(text: &str) -> String {
    let labelled =
        Regex::new(r"(?:Utgångspris|Begärt pris)\s*:?\s*(\d(?:[\d\s\u{a0}]*\d)?)\s*kr").unwrap();
    if let Some(caps) = labelled.captures(text) {
        return format!("{} kr", clean_number_text(caps.get(1).unwrap().as_str()));
    }

    let bare = Regex::new(r"(\d(?:[\d\s\u{a0}]*\d)?)\s*kr").unwrap();
    for caps in bare.captures_iter(text) {
        if text[caps.get(0).unwrap().end()..].starts_with('/') {
            continue;
        }
        return format!("{} kr", clean_number_text(caps.get(1).unwrap().as_str()));
    }
    String::new()
}

// First paragraph long enough to be prose rather than a label value.
fn extract_description(document: &Html) -> String {
    let sel = match Selector::parse("p, div[class*='description']") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    for el in document.select(&sel) {
        let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
        if text.chars().count() > DESCRIPTION_MIN_CHARS {
            return text;
        }
    }
    String::new()
}

// Day/date pattern over the text after the "Visningstider" heading, falling
// back to time-labelled controls.
fn extract_viewing_times(html: &str, document: &Html) -> Vec<String> {
    let mut times = Vec::new();

    if let Some(pos) = html.find("Visningstider") {
        // The window edge is a byte offset; pull it back onto a char
        // boundary so multibyte text cannot split the slice.
        let mut window_end = (pos + 4_000).min(html.len());
        while !html.is_char_boundary(window_end) {
            window_end -= 1;
        }
        let section = strip_tags(&html[pos..window_end]);
        let re = Regex::new(
            r"(?i)(mån|tis|ons|tors?|fre|lör|sön)(?:dag)?\s+\d{1,2}\s+\p{L}+(?:\s+kl\.?\s*\d{1,2}[.:]\d{2}(?:\s*[\-–]\s*\d{1,2}[.:]\d{2})?)?",
        )
        .unwrap();
        for m in re.find_iter(&section) {
            if times.len() >= MAX_VIEWING_TIMES {
                break;
            }
            times.push(collapse_whitespace(m.as_str()));
        }
    }

    if times.is_empty() {
        if let Ok(sel) =
            Selector::parse("button[aria-label*='visning'], button[data-testid*='time'], time")
        {
            for el in document.select(&sel) {
                if times.len() >= MAX_VIEWING_TIMES {
                    break;
                }
                let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
                if !text.is_empty() {
                    times.push(text);
                }
            }
        }
    }

    times
}

// Agent and agency come from profile links; when neither exists, paragraph
// text is scanned for well-known agency names.
fn extract_people(document: &Html) -> (String, String, String) {
    let mut agent = String::new();
    let mut agency_name = String::new();
    let mut agency_url = String::new();

    if let Ok(sel) = Selector::parse("a[href*='maklar']") {
        for link in document.select(&sel) {
            let href = link.value().attr("href").unwrap_or("");
            if is_agent_href(href) {
                if agent.is_empty() {
                    agent = heading_or_text(&link);
                }
            } else if agency_name.is_empty() {
                agency_name = heading_or_text(&link);
                agency_url = absolute_url(href);
            }
        }
    }

    if agency_name.is_empty() {
        if let Ok(sel) = Selector::parse("p") {
            'outer: for p in document.select(&sel) {
                let text = collapse_whitespace(&p.text().collect::<Vec<_>>().join(" "));
                for keyword in AGENCY_KEYWORDS {
                    if text.contains(keyword) {
                        agency_name = text;
                        break 'outer;
                    }
                }
            }
        }
    }

    (agent, agency_name, agency_url)
}

fn is_agent_href(href: &str) -> bool {
    href.contains("/maklare/") && !href.contains("/maklarbyra")
}

fn heading_or_text(link: &ElementRef) -> String {
    if let Ok(sel) = Selector::parse("h2, h3, h4") {
        if let Some(heading) = link.select(&sel).next() {
            return collapse_whitespace(&heading.text().collect::<Vec<_>>().join(" "));
        }
    }
    collapse_whitespace(&link.text().collect::<Vec<_>>().join(" "))
}

// The count covers every distinct CDN image found; the URL list is capped.
fn extract_images(document: &Html) -> (usize, Vec<String>) {
    let mut found: Vec<String> = Vec::new();

    if let Ok(sel) = Selector::parse("img") {
        for img in document.select(&sel) {
            if let Some(src) = img.value().attr("src") {
                if is_site_image_url(src) && !found.contains(&src.to_string()) {
                    found.push(src.to_string());
                }
            }
        }
        if found.is_empty() {
            for img in document.select(&sel) {
                if let Some(src) = img.value().attr("data-src") {
                    if is_site_image_url(src) && !found.contains(&src.to_string()) {
                        found.push(src.to_string());
                    }
                }
            }
        }
    }

    let count = found.len();
    found.truncate(MAX_IMAGES);
    (count, found)
}

// Coordinates come from a Google Maps link's ll query parameter.
fn extract_coordinates(html: &str) -> Option<(f64, f64)> {
    let link_re = Regex::new(r#"maps\.google\.[^"'\s]+"#).unwrap();
    let ll_re = Regex::new(r"[?&;](?:amp;)?ll=(-?\d+\.\d+)(?:%2C|,)(-?\d+\.\d+)").unwrap();

    for link in link_re.find_iter(html) {
        if let Some(caps) = ll_re.captures(link.as_str()) {
            let lat = caps.get(1).unwrap().as_str().parse::<f64>().ok()?;
            let lng = caps.get(2).unwrap().as_str().parse::<f64>().ok()?;
            return Some((lat, lng));
        }
    }
    None
}

fn regex_capture(html: &str, pattern: &str, suffix: &str) -> String {
    let re = match Regex::new(pattern) {
        Ok(r) => r,
        Err(_) => return String::new(),
    };
    re.captures(html)
        .map(|caps| format!("{}{}", clean_number_text(caps.get(1).unwrap().as_str()), suffix))
        .unwrap_or_default()
}

fn strip_tags(html: &str) -> String {
    let re = Regex::new(r"<[^>]*>").unwrap();
    collapse_whitespace(&re.replace_all(html, " "))
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", SITE_BASE, href)
    }
}
