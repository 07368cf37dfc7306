//! HTML extraction for listing, headline and article pages
//!
//! All functions here are synchronous and return owned data: a parsed
//! `scraper::Html` is not `Send`, so it must never live across an `.await`
//! in the coordinator.

use crate::config::SelectorConfig;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Errors raised while preparing extraction
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid selector '{name}': {selector}")]
    InvalidSelector { name: String, selector: String },
}

/// Compiled selectors for every extraction step
#[derive(Debug, Clone)]
pub struct PageSelectors {
    item: Selector,
    title: Selector,
    date: Selector,
    link: Selector,
    total_count: Selector,
    next_page: Selector,
    full_article_link: Selector,
    headline_content: Selector,
    article_content: Selector,
}

impl PageSelectors {
    /// Compiles the configured selectors
    ///
    /// # Returns
    ///
    /// * `Ok(PageSelectors)` - Every selector compiled
    /// * `Err(ParseError::InvalidSelector)` - The first selector that did not
    pub fn compile(config: &SelectorConfig) -> Result<Self, ParseError> {
        let compile = |name: &str, selector: &str| {
            Selector::parse(selector).map_err(|_| ParseError::InvalidSelector {
                name: name.to_string(),
                selector: selector.to_string(),
            })
        };

        Ok(Self {
            item: compile("item", &config.item)?,
            title: compile("title", &config.title)?,
            date: compile("date", &config.date)?,
            link: compile("link", &config.link)?,
            total_count: compile("total-count", &config.total_count)?,
            next_page: compile("next-page", &config.next_page)?,
            full_article_link: compile("full-article-link", &config.full_article_link)?,
            headline_content: compile("headline-content", &config.headline_content)?,
            article_content: compile("article-content", &config.article_content)?,
        })
    }
}

/// One entry of a listing page, as published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub title: Option<String>,
    pub raw_date: Option<String>,
    /// Unresolved `href` of the item link
    pub href: Option<String>,
}

/// Everything read from one listing page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingPage {
    /// Total number of items the site claims to list
    pub total_advertised: Option<u64>,
    pub items: Vec<ListingItem>,
    /// Unresolved `href` of the next-page link
    pub next_page: Option<String>,
}

/// What a headline page offers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Headline {
    /// The page links to a full article; the body lives there
    FullArticle(String),

    /// No full-article link; the body (if any) is on this page
    Inline(Option<String>),
}

/// Parses a listing page
///
/// # Example
///
/// ```
/// use newsharvest::config::SelectorConfig;
/// use newsharvest::crawler::{parse_listing, PageSelectors};
///
/// let config = SelectorConfig {
///     listing_container: "div#topics".to_string(),
///     item: "li".to_string(),
///     title: "span".to_string(),
///     date: "time".to_string(),
///     link: "a".to_string(),
///     total_count: "p.total".to_string(),
///     next_page: "a.next".to_string(),
///     article_container: "article".to_string(),
///     full_article_link: "a.full".to_string(),
///     headline_content: "div.headline".to_string(),
///     article_content: "div.body".to_string(),
/// };
/// let selectors = PageSelectors::compile(&config).unwrap();
///
/// let html = r#"<div id="topics"><p class="total">2件</p><ul>
///   <li><a href="/pickup/1"><span>A</span><time>10/19(日) 9:05</time></a></li>
/// </ul></div>"#;
/// let page = parse_listing(html, &selectors);
/// assert_eq!(page.total_advertised, Some(2));
/// assert_eq!(page.items[0].href.as_deref(), Some("/pickup/1"));
/// ```
pub fn parse_listing(html: &str, selectors: &PageSelectors) -> ListingPage {
    let document = Html::parse_document(html);

    let total_advertised = document
        .select(&selectors.total_count)
        .next()
        .and_then(|element| parse_count(&element.text().collect::<String>()));

    let items = document
        .select(&selectors.item)
        .map(|item| ListingItem {
            title: first_text(item, &selectors.title),
            raw_date: first_text(item, &selectors.date),
            href: first_href(item, &selectors.link),
        })
        .collect();

    let next_page = document
        .select(&selectors.next_page)
        .find_map(non_empty_href);

    ListingPage {
        total_advertised,
        items,
        next_page,
    }
}

/// Decides whether a headline page carries the body or links onward
pub fn parse_headline(html: &str, selectors: &PageSelectors) -> Headline {
    let document = Html::parse_document(html);

    let full_article = document
        .select(&selectors.full_article_link)
        .find_map(non_empty_href);

    match full_article {
        Some(href) => Headline::FullArticle(href),
        None => Headline::Inline(extract_body(&document, &selectors.headline_content)),
    }
}

/// Extracts the body of a full article page
pub fn parse_body(html: &str, selectors: &PageSelectors) -> Option<String> {
    let document = Html::parse_document(html);
    extract_body(&document, &selectors.article_content)
}

/// Concatenated, cleaned text of every element matching `selector`
fn extract_body(document: &Html, selector: &Selector) -> Option<String> {
    let text = clean_text(document.select(selector).flat_map(|element| element.text()));
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Joins text nodes and strips line breaks and ASCII spaces
///
/// Article text on the target site is Japanese, where spaces carry no
/// meaning and only come from markup indentation.
pub fn clean_text<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    let joined: String = fragments.into_iter().collect();
    joined
        .chars()
        .filter(|c| *c != '\n' && *c != '\r' && *c != ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Digits of a count label such as `"1,234件"`
fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}

fn first_href(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).find_map(non_empty_href)
}

fn non_empty_href(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(String::from)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
