//! Helpers for locating page controls
//!
//! Used by the collector to build selectors for detail links, to check page
//! readiness and to enumerate the country dropdown.

use scraper::{Html, Selector};

/// One `<option>` of a dropdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

/// Returns true if any element on the page matches `selector`
///
/// An unparsable selector never matches.
pub fn page_contains(html: &str, selector: &str) -> bool {
    let Ok(selector) = Selector::parse(selector) else {
        return false;
    };
    Html::parse_document(html).select(&selector).next().is_some()
}

/// Lists the options of the first dropdown matching `selector`
///
/// Returns `None` when the page has no such dropdown.
pub fn dropdown_options(html: &str, selector: &str) -> Option<Vec<DropdownOption>> {
    let dropdown_selector = Selector::parse(selector).ok()?;
    let option_selector = Selector::parse("option").ok()?;
    let document = Html::parse_document(html);
    let dropdown = document.select(&dropdown_selector).next()?;

    let options = dropdown
        .select(&option_selector)
        .map(|option| {
            let label = option
                .text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ");
            let value = option
                .value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| label.clone());
            DropdownOption { value, label }
        })
        .collect();
    Some(options)
}

/// Builds a selector matching the anchor whose `href` is exactly `href`
pub fn link_selector(href: &str) -> String {
    let escaped = href.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"a[href="{}"]"#, escaped)
}
