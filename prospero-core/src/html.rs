//! Small conveniences over `scraper` shared by the venue adapters.

use scraper::{ElementRef, Selector};

use crate::ports::FetchError;

/// Compile a CSS selector.
///
/// # Errors
///
/// Returns [`FetchError::InvalidSelector`] if the selector does not parse.
pub fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|err| FetchError::InvalidSelector(format!("{css}: {err}")))
}

/// First descendant of `element` matching `selector`.
#[must_use]
pub fn first<'doc>(element: ElementRef<'doc>, selector: &Selector) -> Option<ElementRef<'doc>> {
    element.select(selector).next()
}

/// First descendant matching `selector`, or [`FetchError::MissingElement`] naming `what`.
///
/// # Errors
///
/// Returns [`FetchError::MissingElement`] if nothing matches.
pub fn require<'doc>(
    element: ElementRef<'doc>,
    selector: &Selector,
    what: &'static str,
) -> Result<ElementRef<'doc>, FetchError> {
    first(element, selector).ok_or(FetchError::MissingElement(what))
}

/// Text content with runs of whitespace collapsed to single spaces.
#[must_use]
pub fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-empty, trimmed text nodes in document order.
#[must_use]
pub fn stripped_strings(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Trimmed, non-empty attribute value.
#[must_use]
pub fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Text of the first match, `None` when absent or blank.
#[must_use]
pub fn optional_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    first(element, selector)
        .map(text_of)
        .filter(|text| !text.is_empty())
}
