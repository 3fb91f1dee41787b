use crate::models::ListingSummary;
use crate::strategies::{
    clean_number_text, collapse_whitespace, fee_from_text_nodes, is_site_image_url, rooms_from_text,
    truncate_chars,
};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Bounded work per request: at most this many summaries per page.
pub const MAX_RESULTS: usize = 25;

const SITE_BASE: &str = "https://www.hemnet.se";

/// Extract active-listing summaries from a search-results page.
///
/// Every field is extracted independently; a miss leaves that field empty
/// and never drops the listing, and a malformed listing fragment never
/// aborts the rest of the batch. Empty or garbage markup yields an empty
/// vector.
pub fn extract_summaries(html: &str, location_name: &str) -> Vec<ListingSummary> {
    let document = Html::parse_document(html);
    let anchor_selector = match Selector::parse("a[href*='/bostad/']") {
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
            Some(h) if h.contains("/bostad/") => h,
            _ => continue,
        };
        let url = absolute_url(href);
        if seen_urls.contains(&url) {
            continue;
        }
        seen_urls.push(url.clone());

        summaries.push(build_summary(&anchor, url, location_name));
    }

    debug!(count = summaries.len(), "extracted listing summaries");
    summaries
}

fn build_summary(anchor: &ElementRef, url: String, location_name: &str) -> ListingSummary {
    let text = collapse_whitespace(&anchor.text().collect::<Vec<_>>().join(" "));

    ListingSummary {
        title: first_text(anchor, "h2, h3"),
        url,
        price: extract_price(&text),
        rooms: rooms_from_text(&text),
        area: extract_area(&text),
        monthly_fee: fee_from_text_nodes(anchor.text()),
        description: truncate_chars(&first_text(anchor, "p"), 200),
        location: location_name.to_string(),
        thumbnail: extract_thumbnail(anchor),
    }
}

fn first_text(anchor: &ElementRef, selector: &str) -> String {
    let sel = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    anchor
        .select(&sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default()
}

fn extract_price(text: &str) -> String {
    // A slash right after "kr" means a per-unit figure, not the price.
    let re = Regex::new(r"(\d(?:[\d\s\u{a0}]*\d)?)\s*kr").unwrap();
    for caps in re.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        if text[whole.end()..].starts_with('/') {
            continue;
        }
        return format!("{} kr", clean_number_text(caps.get(1).unwrap().as_str()));
    }
    String::new()
}

fn extract_area(text: &str) -> String {
    let re = Regex::new(r"(\d+(?:[.,]\d+)?)\s*m²").unwrap();
    re.captures(text)
        .map(|caps| format!("{} m²", caps.get(1).unwrap().as_str()))
        .unwrap_or_default()
}

// Thumbnail candidates in priority order: src, first srcset entry, lazy-load
// data-src. First URL on the site image host wins.
fn extract_thumbnail(anchor: &ElementRef) -> String {
    let img_selector = match Selector::parse("img") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    for img in anchor.select(&img_selector) {
        let mut candidates: Vec<&str> = Vec::new();
        if let Some(src) = img.value().attr("src") {
            candidates.push(src);
        }
        if let Some(srcset) = img.value().attr("srcset") {
            if let Some(first) = srcset.split(',').next().and_then(|c| c.split_whitespace().next()) {
                candidates.push(first);
            }
        }
        if let Some(data_src) = img.value().attr("data-src") {
            candidates.push(data_src);
        }

        for candidate in candidates {
            if is_site_image_url(candidate) {
                return candidate.to_string();
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

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_anchor(n: usize, body: &str) -> String {
        format!(r#"<a href="/bostad/lagenhet-{n}">{body}</a>"#)
    }

    #[test]
    fn full_card_extracts_every_field() {
        let html = format!(
            "<html><body>{}</body></html>",
            listing_anchor(
                1,
                r#"<h2>Folkungagatan 101</h2>
                   <img src="https://bilder.hemnet.se/images/itemgallery/li1.jpg">
                   <p>Ljus tvåa med balkong och fri utsikt över gården, nära till allt.</p>
                   <span>3 495 000 kr</span><span>2 rum</span><span>39 m²</span>
                   <span>2 416 kr/mån</span>"#
            )
        );
        let results = extract_summaries(&html, "Stockholm");
        assert_eq!(results.len(), 1);
        let listing = &results[0];
        assert_eq!(listing.title, "Folkungagatan 101");
        assert_eq!(listing.url, "https://www.hemnet.se/bostad/lagenhet-1");
        assert_eq!(listing.price, "3 495 000 kr");
        assert_eq!(listing.rooms, "2 rum");
        assert_eq!(listing.area, "39 m²");
        assert_eq!(listing.monthly_fee, "2 416 kr/mån");
        assert_eq!(listing.location, "Stockholm");
        assert_eq!(
            listing.thumbnail,
            "https://bilder.hemnet.se/images/itemgallery/li1.jpg"
        );
        assert!(listing.description.starts_with("Ljus tvåa"));
    }

    #[test]
    fn result_cap_is_enforced_in_document_order() {
        let anchors: String = (0..30)
            .map(|n| listing_anchor(n, &format!("<h2>Listing {}</h2>", n)))
            .collect();
        let html = format!("<html><body>{}</body></html>", anchors);
        let results = extract_summaries(&html, "");
        assert_eq!(results.len(), 25);
        assert_eq!(results[0].title, "Listing 0");
        assert_eq!(results[24].title, "Listing 24");
    }

    #[test]
    fn price_ignores_per_month_amounts() {
        let html = format!(
            "<html><body>{}</body></html>",
            listing_anchor(1, "<span>4 200 kr/mån</span>")
        );
        let results = extract_summaries(&html, "");
        assert_eq!(results[0].price, "");
        assert_eq!(results[0].monthly_fee, "4 200 kr/mån");
    }

    #[test]
    fn fee_does_not_merge_across_text_nodes() {
        // "1 200" and "kr/mån" live in non-adjacent nodes; the node-scoped
        // scan must not stitch them together.
        let html = format!(
            "<html><body>{}</body></html>",
            listing_anchor(1, "<span>1 200</span><span>vån 3</span><span>kr/mån</span>")
        );
        let results = extract_summaries(&html, "");
        assert_eq!(results[0].monthly_fee, "");
    }

    #[test]
    fn srcset_and_data_src_fallbacks() {
        let html = format!(
            "<html><body>{}</body></html>",
            listing_anchor(
                1,
                r#"<img srcset="https://bilder.hemnet.se/a.jpg 300w, https://bilder.hemnet.se/b.jpg 600w">"#
            )
        );
        assert_eq!(
            extract_summaries(&html, "")[0].thumbnail,
            "https://bilder.hemnet.se/a.jpg"
        );

        let html = format!(
            "<html><body>{}</body></html>",
            listing_anchor(1, r#"<img src="/spinner.gif" data-src="https://bilder.hemnet.se/c.jpg">"#)
        );
        assert_eq!(
            extract_summaries(&html, "")[0].thumbnail,
            "https://bilder.hemnet.se/c.jpg"
        );
    }

    #[test]
    fn foreign_image_hosts_are_rejected() {
        let html = format!(
            "<html><body>{}</body></html>",
            listing_anchor(1, r#"<img src="https://tracker.example.com/pixel.jpg">"#)
        );
        assert_eq!(extract_summaries(&html, "")[0].thumbnail, "");
    }

    #[test]
    fn duplicate_hrefs_collapse_to_one_summary() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            listing_anchor(7, "<h2>Card</h2>"),
            listing_anchor(7, "<img src=\"x.jpg\">")
        );
        assert_eq!(extract_summaries(&html, "").len(), 1);
    }

    #[test]
    fn non_listing_anchors_are_skipped() {
        let html = r#"<html><body>
            <a href="/kop/guide">Guide</a>
            <a href="/bostad/villa-9"><h2>Villa</h2></a>
        </body></html>"#;
        let results = extract_summaries(html, "");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Villa");
    }

    #[test]
    fn empty_or_garbage_markup_yields_empty_batch() {
        assert!(extract_summaries("", "Stockholm").is_empty());
        assert!(extract_summaries("<<<%%% not html", "Stockholm").is_empty());
    }
}
