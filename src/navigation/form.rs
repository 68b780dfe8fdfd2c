//! Planning what activating an element does
//!
//! The parsed document is not `Send`, so everything here runs synchronously
//! and returns an owned [`Activation`] that the session can await on.

use crate::{NavigationError, NavigationResult};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

/// Request produced by activating an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Follow a link
    Get(Url),

    /// Submit a form
    Submit {
        post: bool,
        action: Url,
        fields: Vec<(String, String)>,
    },
}

/// Works out the request triggered by clicking the element matching `selector`
pub fn plan_activation(
    html: &str,
    page_url: &Url,
    selector: &str,
    selections: &HashMap<String, String>,
) -> NavigationResult<Activation> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let element = document
        .select(&parsed)
        .next()
        .ok_or_else(|| NavigationError::not_found(selector))?;

    match element.value().name() {
        "a" => plan_link(&document, element, page_url, selections),
        "input" | "button" if is_submit_control(element) => {
            let form = enclosing_form(element).ok_or_else(|| {
                NavigationError::fatal(format!("submit control `{}` is outside a form", selector))
            })?;
            let mut fields = form_fields(form, selections);
            if let Some(name) = element.value().attr("name") {
                let value = element.value().attr("value").unwrap_or_default();
                set_field(&mut fields, name, value);
            }
            submission(form, page_url, fields)
        }
        other => Err(NavigationError::fatal(format!(
            "element <{}> matched by `{}` cannot be activated",
            other, selector
        ))),
    }
}

/// Resolves the option of the dropdown matching `selector` whose value or label is `wanted`
///
/// Returns the dropdown's field name and the option value to submit.
pub fn resolve_selection(
    html: &str,
    selector: &str,
    wanted: &str,
) -> NavigationResult<(String, String)> {
    let parsed = parse_selector(selector)?;
    let option_selector = parse_selector("option")?;
    let document = Html::parse_document(html);

    let dropdown = document
        .select(&parsed)
        .find(|e| e.value().name() == "select")
        .ok_or_else(|| NavigationError::not_found(selector))?;

    let name = dropdown.value().attr("name").ok_or_else(|| {
        NavigationError::fatal(format!("dropdown `{}` has no name attribute", selector))
    })?;

    let wanted = wanted.trim();
    dropdown
        .select(&option_selector)
        .map(|option| (option_value(option), option_label(option)))
        .find(|(value, label)| value == wanted || label == wanted)
        .map(|(value, _)| (name.to_string(), value))
        .ok_or_else(|| NavigationError::not_found(format!("{} option `{}`", selector, wanted)))
}

fn parse_selector(selector: &str) -> NavigationResult<Selector> {
    Selector::parse(selector)
        .map_err(|_| NavigationError::fatal(format!("invalid selector `{}`", selector)))
}

fn plan_link(
    document: &Html,
    anchor: ElementRef<'_>,
    page_url: &Url,
    selections: &HashMap<String, String>,
) -> NavigationResult<Activation> {
    let href = anchor.value().attr("href").unwrap_or_default().trim();

    if let Some((target, argument)) = parse_postback(href) {
        // ASP.NET postback links submit the page's form with the event fields set
        let form = enclosing_form(anchor)
            .or_else(|| first_form(document))
            .ok_or_else(|| NavigationError::fatal("postback link without a form"))?;
        let mut fields = form_fields(form, selections);
        set_field(&mut fields, "__EVENTTARGET", &target);
        set_field(&mut fields, "__EVENTARGUMENT", &argument);
        return submission(form, page_url, fields);
    }

    if href.is_empty() || href.starts_with("javascript:") || href.starts_with('#') {
        return Err(NavigationError::fatal(format!(
            "link `{}` does not lead to a page",
            href
        )));
    }

    page_url
        .join(href)
        .map(Activation::Get)
        .map_err(|e| NavigationError::fatal(format!("invalid link `{}`: {}", href, e)))
}

fn submission(
    form: ElementRef<'_>,
    page_url: &Url,
    fields: Vec<(String, String)>,
) -> NavigationResult<Activation> {
    let post = form
        .value()
        .attr("method")
        .map(|m| m.eq_ignore_ascii_case("post"))
        .unwrap_or(false);

    let action = match form.value().attr("action").map(str::trim) {
        Some(action) if !action.is_empty() => page_url.join(action).map_err(|e| {
            NavigationError::fatal(format!("invalid form action `{}`: {}", action, e))
        })?,
        _ => page_url.clone(),
    };

    Ok(Activation::Submit {
        post,
        action,
        fields,
    })
}

fn is_submit_control(element: ElementRef<'_>) -> bool {
    let kind = element
        .value()
        .attr("type")
        .map(str::to_ascii_lowercase);
    match element.value().name() {
        "input" => matches!(kind.as_deref(), Some("submit") | Some("image")),
        "button" => !matches!(kind.as_deref(), Some("button") | Some("reset")),
        _ => false,
    }
}

fn enclosing_form(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "form")
}

fn first_form(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("form").ok()?;
    document.select(&selector).next()
}

/// Collects the successful controls of a form, applying pending dropdown selections
fn form_fields(
    form: ElementRef<'_>,
    selections: &HashMap<String, String>,
) -> Vec<(String, String)> {
    let Ok(controls) = Selector::parse("input[name], select[name], textarea[name]") else {
        return Vec::new();
    };
    let Ok(option_selector) = Selector::parse("option") else {
        return Vec::new();
    };

    let mut fields = Vec::new();
    for control in form.select(&controls) {
        let element = control.value();
        let name = element.attr("name").unwrap_or_default().to_string();

        match element.name() {
            "input" => {
                let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "button" | "image" | "reset" | "file" => continue,
                    "checkbox" | "radio" if element.attr("checked").is_none() => continue,
                    "checkbox" | "radio" => {
                        fields.push((name, element.attr("value").unwrap_or("on").to_string()))
                    }
                    _ => fields.push((name, element.attr("value").unwrap_or_default().to_string())),
                }
            }
            "select" => {
                if let Some(chosen) = selections.get(&name) {
                    fields.push((name, chosen.clone()));
                    continue;
                }
                let options: Vec<ElementRef<'_>> = control.select(&option_selector).collect();
                let selected = options
                    .iter()
                    .find(|o| o.value().attr("selected").is_some())
                    .or_else(|| options.first());
                if let Some(option) = selected {
                    fields.push((name, option_value(*option)));
                }
            }
            "textarea" => fields.push((name, control.text().collect())),
            _ => {}
        }
    }
    fields
}

fn set_field(fields: &mut Vec<(String, String)>, name: &str, value: &str) {
    match fields.iter_mut().find(|(n, _)| n == name) {
        Some(field) => field.1 = value.to_string(),
        None => fields.push((name.to_string(), value.to_string())),
    }
}

fn option_label(option: ElementRef<'_>) -> String {
    option
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn option_value(option: ElementRef<'_>) -> String {
    option
        .value()
        .attr("value")
        .map(str::to_string)
        .unwrap_or_else(|| option_label(option))
}

/// Parses `javascript:__doPostBack('target','argument')`
fn parse_postback(href: &str) -> Option<(String, String)> {
    let inner = href
        .strip_prefix("javascript:__doPostBack(")?
        .trim_end_matches(';')
        .strip_suffix(')')?;
    let (target, argument) = inner.split_once(',')?;
    let unquote = |s: &str| s.trim().trim_matches(|c| c == '\'' || c == '"').to_string();
    Some((unquote(target), unquote(argument)))
}
