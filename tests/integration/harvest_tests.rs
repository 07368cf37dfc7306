//! Coordinator behavior: stop rule, pagination, retries and accounting

use crate::common::*;
use async_trait::async_trait;
use newsharvest::crawler::{Coordinator, FetchError, RenderedDocument, RenderingFetcher};
use newsharvest::storage::open_sinks;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

const TODAY_0905: &str = "10/19(日) 9:05";
const TODAY_0830: &str = "10/19(日) 8:30";
const TODAY_0700: &str = "10/19(日) 7:00";
const YESTERDAY: &str = "10/18(土) 23:40";

fn page2() -> String {
    format!("{}?page=2", LISTING_URL)
}

#[tokio::test]
async fn test_day_boundary_stops_dispatch_and_pagination() {
    let site = ScriptedSite::new()
        .page(
            LISTING_URL,
            listing(
                40,
                &[
                    ("一", TODAY_0905, "/pickup/1"),
                    ("二", TODAY_0830, "/pickup/2"),
                    ("三", YESTERDAY, "/pickup/3"),
                    ("四", TODAY_0700, "/pickup/4"),
                ],
                Some("?page=2"),
            ),
        )
        .page("https://news.example.jp/pickup/1", inline_article("本文一"))
        .page("https://news.example.jp/pickup/2", inline_article("本文二"));
    let log = site.requests();

    let mut coordinator = Coordinator::new(config(LISTING_URL, None), Box::new(site), Vec::new())
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;

    assert_eq!(stats.fetched, 2);
    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.total_advertised, Some(40));
    assert_eq!(
        urls(&log),
        vec![
            LISTING_URL.to_string(),
            "https://news.example.jp/pickup/1".to_string(),
            "https://news.example.jp/pickup/2".to_string(),
        ]
    );
    assert!(!urls(&log).contains(&page2()));
}

#[tokio::test]
async fn test_paginates_while_window_is_open() {
    let site = ScriptedSite::new()
        .page(
            LISTING_URL,
            listing(3, &[("一", TODAY_0905, "/pickup/1")], Some("?page=2")),
        )
        .page(
            &page2(),
            listing(
                3,
                &[("二", TODAY_0830, "/pickup/2"), ("三", YESTERDAY, "/pickup/3")],
                Some("?page=3"),
            ),
        )
        .page("https://news.example.jp/pickup/1", inline_article("本文一"))
        .page("https://news.example.jp/pickup/2", inline_article("本文二"));
    let log = site.requests();
    let dir = TempDir::new().unwrap();
    let config = config(LISTING_URL, Some(dir.path()));
    let sinks = open_sinks(&config.output).unwrap();

    let mut coordinator = Coordinator::new(config, Box::new(site), sinks)
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;
    coordinator.close_sinks().unwrap();

    assert_eq!(stats.pages, 2);
    assert_eq!(stats.fetched, 2);
    let listing_requests: Vec<_> = log
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, wait)| wait == "div#topics")
        .map(|(url, _)| url.clone())
        .collect();
    assert_eq!(listing_requests, vec![LISTING_URL.to_string(), page2()]);

    let rows = csv_rows(&dir.path().join("news.csv"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], "1-1");
    assert_eq!(rows[0][2], "202610190905");
    assert_eq!(rows[1][1], "2-1");
    assert_eq!(rows[1][2], "202610190830");
}

#[tokio::test]
async fn test_restrict_to_today_off_harvests_everything() {
    let site = ScriptedSite::new()
        .page(
            LISTING_URL,
            listing(
                2,
                &[("一", TODAY_0905, "/pickup/1"), ("三", YESTERDAY, "/pickup/3")],
                None,
            ),
        )
        .page("https://news.example.jp/pickup/1", inline_article("本文一"))
        .page("https://news.example.jp/pickup/3", inline_article("本文三"));
    let mut config = config(LISTING_URL, None);
    config.crawler.restrict_to_today = false;

    let mut coordinator = Coordinator::new(config, Box::new(site), Vec::new())
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;

    assert_eq!(stats.fetched, 2);
    assert_eq!(stats.delivered, 2);
}

#[tokio::test]
async fn test_detail_final_retry_resumes_at_body() {
    let article_url = "https://news.example.jp/articles/abc";
    let site = ScriptedSite::new()
        .page(LISTING_URL, listing(1, &[("一", TODAY_0905, "/pickup/1")], None))
        .page(
            "https://news.example.jp/pickup/1",
            headline_with_link("/articles/abc"),
        )
        .script(
            article_url,
            vec![Err(timeout(article_url)), Ok(full_article("全文の本文"))],
        );
    let log = site.requests();
    let dir = TempDir::new().unwrap();
    let config = config(LISTING_URL, Some(dir.path()));
    let sinks = open_sinks(&config.output).unwrap();

    let mut coordinator = Coordinator::new(config, Box::new(site), sinks)
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;
    coordinator.close_sinks().unwrap();

    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.failed, 0);

    let requests = log.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![
            (LISTING_URL.to_string(), "div#topics".to_string()),
            ("https://news.example.jp/pickup/1".to_string(), "article".to_string()),
            (article_url.to_string(), "article".to_string()),
            (article_url.to_string(), "article".to_string()),
        ]
    );

    let rows = csv_rows(&dir.path().join("news.csv"));
    assert_eq!(rows.len(), 1);
    // keyed by the listing link, body from the full article
    assert_eq!(rows[0][3], "https://news.example.jp/pickup/1");
    assert_eq!(rows[0][4], "全文の本文");
}

#[tokio::test]
async fn test_terminal_failure_accounting() {
    let failing = "https://news.example.jp/pickup/1";
    let site = ScriptedSite::new()
        .page(
            LISTING_URL,
            listing(
                2,
                &[("一", TODAY_0905, "/pickup/1"), ("二", TODAY_0830, "/pickup/2")],
                None,
            ),
        )
        .script(failing, vec![Err(timeout(failing))])
        .page("https://news.example.jp/pickup/2", inline_article("本文二"));
    let log = site.requests();
    let dir = TempDir::new().unwrap();
    let config = config(LISTING_URL, Some(dir.path()));
    let max_retries = config.crawler.max_retries as usize;
    let sinks = open_sinks(&config.output).unwrap();

    let mut coordinator = Coordinator::new(config, Box::new(site), sinks)
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;
    coordinator.close_sinks().unwrap();

    assert_eq!(stats.fetched, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.failed_urls, vec![failing.to_string()]);
    assert_eq!(
        urls(&log).iter().filter(|u| u.as_str() == failing).count(),
        max_retries + 1
    );
    // the next item starts with a fresh budget
    assert_eq!(
        urls(&log)
            .iter()
            .filter(|u| u.as_str() == "https://news.example.jp/pickup/2")
            .count(),
        1
    );

    let rows = csv_rows(&dir.path().join("news.csv"));
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0],
        vec!["Error", "Error", "Error", failing, "Error"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
    assert_eq!(rows[1][4], "本文二");
}

#[tokio::test]
async fn test_budget_spans_both_hops_of_an_item() {
    let pickup = "https://news.example.jp/pickup/1";
    let article_url = "https://news.example.jp/articles/abc";
    let site = ScriptedSite::new()
        .page(LISTING_URL, listing(1, &[("一", TODAY_0905, "/pickup/1")], None))
        .script(
            pickup,
            vec![
                Err(timeout(pickup)),
                Ok(headline_with_link("/articles/abc")),
            ],
        )
        .script(
            article_url,
            vec![Err(timeout(article_url)), Err(timeout(article_url))],
        );
    let log = site.requests();

    let mut coordinator = Coordinator::new(config(LISTING_URL, None), Box::new(site), Vec::new())
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;

    // two retries in total: one spent on the headline, one on the article
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.failed_urls, vec![pickup.to_string()]);
    assert_eq!(
        urls(&log).iter().filter(|u| u.as_str() == article_url).count(),
        2
    );
}

#[tokio::test]
async fn test_missing_body_is_degraded() {
    let site = ScriptedSite::new()
        .page(LISTING_URL, listing(1, &[("一", TODAY_0905, "/pickup/1")], None))
        .page(
            "https://news.example.jp/pickup/1",
            "<html><body><article><p>動画のみ</p></article></body></html>",
        );
    let dir = TempDir::new().unwrap();
    let config = config(LISTING_URL, Some(dir.path()));
    let sinks = open_sinks(&config.output).unwrap();

    let mut coordinator = Coordinator::new(config, Box::new(site), sinks)
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;
    coordinator.close_sinks().unwrap();

    assert_eq!(stats.fetched, 1);
    assert_eq!(stats.degraded, 1);
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.persisted, 1);
    assert_eq!(
        stats.degraded_urls,
        vec!["https://news.example.jp/pickup/1".to_string()]
    );

    let rows = csv_rows(&dir.path().join("news.csv"));
    assert_eq!(rows[0][4], "-");
}

#[tokio::test]
async fn test_failed_listing_page_is_recorded() {
    let site = ScriptedSite::new().script(LISTING_URL, vec![Err(timeout(LISTING_URL))]);
    let dir = TempDir::new().unwrap();
    let config = config(LISTING_URL, Some(dir.path()));
    let sinks = open_sinks(&config.output).unwrap();

    let mut coordinator = Coordinator::new(config, Box::new(site), sinks)
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;
    coordinator.close_sinks().unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.fetched, 0);
    assert_eq!(stats.failed_urls, vec![LISTING_URL.to_string()]);

    let rows = csv_rows(&dir.path().join("news.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][3], LISTING_URL);
    assert_eq!(rows[0][0], "Error");
}

#[tokio::test]
async fn test_every_dispatched_item_has_one_outcome() {
    let site = ScriptedSite::new()
        .page(
            LISTING_URL,
            listing(
                3,
                &[
                    ("一", TODAY_0905, "/pickup/1"),
                    ("二", TODAY_0830, "/pickup/2"),
                    ("三", TODAY_0700, "/pickup/3"),
                ],
                None,
            ),
        )
        .page("https://news.example.jp/pickup/1", inline_article("本文一"))
        .page(
            "https://news.example.jp/pickup/2",
            "<html><body><article></article></body></html>",
        );

    let mut coordinator = Coordinator::new(config(LISTING_URL, None), Box::new(site), Vec::new())
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;

    assert_eq!(stats.fetched, 3);
    assert_eq!(stats.delivered + stats.degraded + stats.failed, stats.fetched);
}

/// Records the virtual time of every request it forwards
struct TimedSite {
    inner: ScriptedSite,
    times: Arc<Mutex<Vec<(String, Instant)>>>,
}

#[async_trait]
impl RenderingFetcher for TimedSite {
    async fn fetch(
        &self,
        url: &str,
        wait_selector: &str,
        timeout: Duration,
    ) -> Result<RenderedDocument, FetchError> {
        self.times
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        self.inner.fetch(url, wait_selector, timeout).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_inter_item_delay_between_items_only() {
    let delay = Duration::from_millis(1500);
    let site = ScriptedSite::new()
        .page(
            LISTING_URL,
            listing(
                3,
                &[
                    ("一", TODAY_0905, "/pickup/1"),
                    ("二", TODAY_0830, "/pickup/2"),
                    ("三", TODAY_0700, "/pickup/3"),
                ],
                None,
            ),
        )
        .page("https://news.example.jp/pickup/1", inline_article("本文一"))
        .page("https://news.example.jp/pickup/2", inline_article("本文二"))
        .page("https://news.example.jp/pickup/3", inline_article("本文三"));
    let times = Arc::new(Mutex::new(Vec::new()));
    let site = TimedSite {
        inner: site,
        times: times.clone(),
    };

    let mut config = config(LISTING_URL, None);
    config.crawler.inter_item_delay_ms = delay.as_millis() as u64;

    let start = Instant::now();
    let mut coordinator = Coordinator::new(config, Box::new(site), Vec::new())
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;

    assert_eq!(stats.fetched, 3);
    assert!(start.elapsed() >= delay * 2);

    let times = times.lock().unwrap();
    let item_times: Vec<Instant> = times
        .iter()
        .filter(|(url, _)| url.contains("/pickup/"))
        .map(|(_, at)| *at)
        .collect();
    assert_eq!(item_times.len(), 3);
    // the first item goes out right after the listing
    assert!(item_times[0] - start < delay);
    assert!(item_times[1] - item_times[0] >= delay);
    assert!(item_times[2] - item_times[1] >= delay);
}
