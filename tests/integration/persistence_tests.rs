//! Sink behavior across runs and across sink configurations

use crate::common::*;
use newsharvest::config::Config;
use newsharvest::crawler::Coordinator;
use newsharvest::output::RunStats;
use newsharvest::storage::{open_sinks, SqliteSink};
use tempfile::TempDir;

fn site() -> ScriptedSite {
    ScriptedSite::new()
        .page(
            LISTING_URL,
            listing(
                3,
                &[
                    ("円相場", "10/19(日) 9:05", "/pickup/1"),
                    ("日経平均, 続伸", "10/19(日) 8:30", "/pickup/2?utm_source=top"),
                    ("台風", "10/19(日) 7:00", "/pickup/3"),
                ],
                None,
            ),
        )
        .page("https://news.example.jp/pickup/1", inline_article("円相場の本文"))
        .page("https://news.example.jp/pickup/2", inline_article("株価の本文"))
        .page(
            "https://news.example.jp/pickup/3",
            "<html><body><article></article></body></html>",
        )
}

async fn run(config: Config) -> RunStats {
    let sinks = open_sinks(&config.output).unwrap();
    let mut coordinator = Coordinator::new(config, Box::new(site()), sinks)
        .unwrap()
        .with_today(today());
    let stats = coordinator.run().await;
    coordinator.close_sinks().unwrap();
    stats
}

#[tokio::test]
async fn test_both_sinks_store_every_item() {
    let dir = TempDir::new().unwrap();
    let stats = run(config(LISTING_URL, Some(dir.path()))).await;

    assert_eq!(stats.persisted, 3);
    assert_eq!(stats.sinks["csv"].stored, 3);
    assert_eq!(stats.sinks["sqlite"].stored, 3);

    let rows = csv_rows(&dir.path().join("news.csv"));
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][0], "日経平均, 続伸");
    // tracking parameters never reach the key
    assert_eq!(rows[1][3], "https://news.example.jp/pickup/2");

    let db = SqliteSink::open(&dir.path().join("news.db")).unwrap();
    assert_eq!(db.count_articles().unwrap(), 3);
    assert_eq!(db.count_degraded().unwrap(), 1);
    let article = db
        .get_article("https://news.example.jp/pickup/1")
        .unwrap()
        .unwrap();
    assert_eq!(article.title, "円相場");
    assert_eq!(article.sequence_id, "1-1");
    assert_eq!(article.published_at, "202610190905");
    assert_eq!(article.body, "円相場の本文");
}

#[tokio::test]
async fn test_second_run_writes_nothing_new() {
    let dir = TempDir::new().unwrap();

    let first = run(config(LISTING_URL, Some(dir.path()))).await;
    let csv_after_first = std::fs::read_to_string(dir.path().join("news.csv")).unwrap();

    let second = run(config(LISTING_URL, Some(dir.path()))).await;
    let csv_after_second = std::fs::read_to_string(dir.path().join("news.csv")).unwrap();

    assert_eq!(first.persisted, 3);
    assert_eq!(second.fetched, 3);
    assert_eq!(second.persisted, 0);
    assert_eq!(second.sinks["csv"].stored, 0);
    assert_eq!(second.sinks["csv"].duplicates, 3);
    assert_eq!(second.sinks["sqlite"].duplicates, 3);
    assert_eq!(csv_after_first, csv_after_second);

    let db = SqliteSink::open(&dir.path().join("news.db")).unwrap();
    assert_eq!(db.count_articles().unwrap(), 3);
}

#[tokio::test]
async fn test_disabling_one_sink_leaves_the_other_unchanged() {
    let both_dir = TempDir::new().unwrap();
    let csv_only_dir = TempDir::new().unwrap();

    let both = run(config(LISTING_URL, Some(both_dir.path()))).await;

    let mut csv_only_config = config(LISTING_URL, Some(csv_only_dir.path()));
    csv_only_config.output.database_path = None;
    let csv_only = run(csv_only_config).await;

    assert!(!csv_only.sinks.contains_key("sqlite"));
    assert!(!csv_only_dir.path().join("news.db").exists());
    assert_eq!(both.sinks["csv"], csv_only.sinks["csv"]);
    assert_eq!(both.fetched, csv_only.fetched);
    assert_eq!(both.delivered, csv_only.delivered);
    assert_eq!(both.degraded, csv_only.degraded);
    assert_eq!(
        csv_rows(&both_dir.path().join("news.csv")),
        csv_rows(&csv_only_dir.path().join("news.csv"))
    );
}

#[tokio::test]
async fn test_sqlite_only_run() {
    let dir = TempDir::new().unwrap();
    let mut config = config(LISTING_URL, Some(dir.path()));
    config.output.csv_path = None;

    let stats = run(config).await;

    assert_eq!(stats.sinks.len(), 1);
    assert_eq!(stats.sinks["sqlite"].stored, 3);
    assert!(!dir.path().join("news.csv").exists());
}

#[tokio::test]
async fn test_unopenable_sink_is_an_error() {
    let mut config = config(LISTING_URL, None);
    config.output.csv_path = Some("/nonexistent/dir/news.csv".to_string());

    assert!(open_sinks(&config.output).is_err());
}
