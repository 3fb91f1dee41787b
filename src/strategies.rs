use scraper::Html;

/// Host serving the site's listing photography. Thumbnails and gallery
/// images are only accepted from here.
pub const IMAGE_HOST: &str = "bilder.hemnet.se";

/// One extraction strategy: a pure function over the parsed document that
/// either yields a value or defers to the next strategy in the chain.
pub type Strategy<'a> = &'a dyn Fn(&Html) -> Option<String>;

/// Run strategies in order and return the first non-empty result, or the
/// empty string when every strategy misses.
pub fn cascade(document: &Html, strategies: &[Strategy]) -> String {
    for strategy in strategies {
        if let Some(value) = strategy(document) {
            let trimmed = collapse_whitespace(&value);
            if !trimmed.is_empty() {
                return trimmed;
            }
        }
    }
    String::new()
}

/// Collapse runs of whitespace (including non-breaking spaces) into single
/// spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a digit run copied out of display text: non-breaking spaces
/// become ordinary spaces, surrounding whitespace goes away.
pub fn clean_number_text(text: &str) -> String {
    collapse_whitespace(&text.replace('\u{a0}', " "))
}

/// Truncate to at most `max` characters on a char boundary, appending an
/// ellipsis when something was cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    let collapsed = collapse_whitespace(text);
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

/// First "N rum" token in display text.
pub fn rooms_from_text(text: &str) -> String {
    let re = regex::Regex::new(r"(\d+(?:[.,]\d+)?)\s*rum").unwrap();
    re.captures(text)
        .map(|caps| format!("{} rum", caps.get(1).unwrap().as_str()))
        .unwrap_or_default()
}

/// Monthly fee scanned over individual text nodes, never concatenated
/// text: joining nodes would let unrelated adjacent digit runs merge into
/// one spurious number.
pub fn fee_from_text_nodes<'a>(nodes: impl Iterator<Item = &'a str>) -> String {
    let re = regex::Regex::new(r"(\d(?:[\d\s\u{a0}]*\d)?)\s*kr/mån").unwrap();
    for node_text in nodes {
        if let Some(caps) = re.captures(node_text) {
            return format!("{} kr/mån", clean_number_text(caps.get(1).unwrap().as_str()));
        }
    }
    String::new()
}

/// Accept only absolute URLs served from the site's image host.
pub fn is_site_image_url(url: &str) -> bool {
    let rest = if let Some(r) = url.strip_prefix("https://") {
        r
    } else if let Some(r) = url.strip_prefix("http://") {
        r
    } else {
        return false;
    };
    rest.split(['/', '?']).next() == Some(IMAGE_HOST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    fn miss(_: &Html) -> Option<String> {
        None
    }

    fn blank(_: &Html) -> Option<String> {
        Some("   ".to_string())
    }

    fn heading(doc: &Html) -> Option<String> {
        let sel = Selector::parse("h2").unwrap();
        doc.select(&sel).next().map(|e| e.text().collect())
    }

    #[test]
    fn cascade_takes_first_non_empty_result() {
        let document = Html::parse_document("<html><body><h2>Hello</h2></body></html>");
        let value = cascade(&document, &[&miss, &blank, &heading]);
        assert_eq!(value, "Hello");
    }

    #[test]
    fn cascade_with_no_hits_yields_empty_string() {
        let document = Html::parse_document("<html></html>");
        assert_eq!(cascade(&document, &[&miss, &miss]), "");
    }

    #[test]
    fn nbsp_digit_runs_are_cleaned() {
        assert_eq!(clean_number_text("3\u{a0}495\u{a0}000"), "3 495 000");
    }

    #[test]
    fn truncation_respects_multibyte_chars() {
        let text = "ö".repeat(300);
        let cut = truncate_chars(&text, 200);
        assert!(cut.chars().count() <= 200);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn image_host_filter() {
        assert!(is_site_image_url("https://bilder.hemnet.se/images/itemgallery/abc.jpg"));
        assert!(is_site_image_url("https://bilder.hemnet.se?x=1"));
        assert!(!is_site_image_url("https://cdn.example.com/abc.jpg"));
        assert!(!is_site_image_url("/images/itemgallery/abc.jpg"));
        assert!(!is_site_image_url("https://bilder.hemnet.se.evil.com/a.jpg"));
    }
}
