//! Shared fixtures: a scripted site, configuration and page builders

use async_trait::async_trait;
use chrono::NaiveDate;
use newsharvest::config::{
    Config, CrawlerConfig, NotifyConfig, OutputConfig, RendererConfig, SelectorConfig, SiteConfig,
};
use newsharvest::crawler::{FetchError, RenderedDocument, RenderingFetcher};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const LISTING_URL: &str = "https://news.example.jp/topics/top-picks";

/// 2026-10-19 is a Sunday
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub type RequestLog = Arc<Mutex<Vec<(String, String)>>>;

/// Serves scripted responses per URL and records every request
///
/// Each URL has a queue of outcomes; the last one repeats forever, so a
/// page scripted once can be fetched by any number of runs. Unscripted URLs
/// fail with a navigation error.
pub struct ScriptedSite {
    pages: Mutex<HashMap<String, VecDeque<Result<String, FetchError>>>>,
    requests: RequestLog,
}

impl ScriptedSite {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn page(self, url: &str, html: impl Into<String>) -> Self {
        self.script(url, vec![Ok(html.into())])
    }

    pub fn script(self, url: &str, outcomes: Vec<Result<String, FetchError>>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), outcomes.into());
        self
    }

    pub fn requests(&self) -> RequestLog {
        self.requests.clone()
    }
}

#[async_trait]
impl RenderingFetcher for ScriptedSite {
    async fn fetch(
        &self,
        url: &str,
        wait_selector: &str,
        _timeout: Duration,
    ) -> Result<RenderedDocument, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), wait_selector.to_string()));

        let mut pages = self.pages.lock().unwrap();
        let outcome = match pages.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Err(FetchError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_ABORTED 404".to_string(),
            }),
        };

        outcome.map(|html| RenderedDocument {
            url: url.to_string(),
            html,
        })
    }
}

pub fn urls(log: &RequestLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
}

pub fn timeout(url: &str) -> FetchError {
    FetchError::Timeout {
        url: url.to_string(),
    }
}

pub fn selectors() -> SelectorConfig {
    SelectorConfig {
        listing_container: "div#topics".to_string(),
        item: "li.item".to_string(),
        title: "span.title".to_string(),
        date: "time".to_string(),
        link: "a".to_string(),
        total_count: "p.total".to_string(),
        next_page: "a.next".to_string(),
        article_container: "article".to_string(),
        full_article_link: "a.full".to_string(),
        headline_content: "div.headline".to_string(),
        article_content: "div.article_body".to_string(),
    }
}

/// Configuration with the given output directory (no sinks when `None`)
pub fn config(listing_url: &str, output_dir: Option<&Path>) -> Config {
    Config {
        site: SiteConfig {
            listing_url: listing_url.to_string(),
            base_url: "https://news.example.jp".to_string(),
        },
        selectors: selectors(),
        crawler: CrawlerConfig {
            timeout_ms: 1000,
            max_retries: 2,
            restrict_to_today: true,
            inter_item_delay_ms: 0,
        },
        renderer: RendererConfig {
            endpoint: "http://localhost:3000".to_string(),
            token: None,
        },
        output: OutputConfig {
            csv_path: output_dir.map(|d| d.join("news.csv").display().to_string()),
            database_path: output_dir.map(|d| d.join("news.db").display().to_string()),
            ..OutputConfig::default()
        },
        notify: NotifyConfig::default(),
    }
}

/// A listing page of `(title, date, href)` entries
pub fn listing(total: u64, items: &[(&str, &str, &str)], next: Option<&str>) -> String {
    let mut html = format!(
        "<html><body><div id=\"topics\"><p class=\"total\">{}件</p><ul>",
        total
    );
    for (title, date, href) in items {
        html.push_str(&format!(
            "<li class=\"item\"><a href=\"{}\"><span class=\"title\">{}</span><time>{}</time></a></li>",
            href, title, date
        ));
    }
    html.push_str("</ul>");
    if let Some(next) = next {
        html.push_str(&format!("<a class=\"next\" href=\"{}\">次へ</a>", next));
    }
    html.push_str("</div></body></html>");
    html
}

/// A headline page carrying its body inline
pub fn inline_article(body: &str) -> String {
    format!(
        "<html><body><article><div class=\"headline\">{}</div></article></body></html>",
        body
    )
}

/// A headline page linking to the full article
pub fn headline_with_link(href: &str) -> String {
    format!(
        "<html><body><article><div class=\"headline\">要約</div>\
         <a class=\"full\" href=\"{}\">記事全文を読む</a></article></body></html>",
        href
    )
}

pub fn full_article(body: &str) -> String {
    format!(
        "<html><body><article><div class=\"article_body\"><p>{}</p></div></article></body></html>",
        body
    )
}

/// Data rows of a CSV sink file, header excluded
pub fn csv_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}
