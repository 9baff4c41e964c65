// tests/pipeline_e2e.rs
//
// End-to-end runs over the RSS fixture with a scripted extractor.
// No network: the news source parses the fixture, the extractor returns
// canned JSON keyed by article title.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use funding_feed::classify::{Classifier, Taxonomy};
use funding_feed::config::FeedConfig;
use funding_feed::error::{ExtractError, PipelineError};
use funding_feed::extract::{Announcement, ArticleOutcome, Orchestrator, ScriptedExtractor};
use funding_feed::feed::{FeedMeta, FeedSink, FileSink};
use funding_feed::ingest::types::{Article, ArticleSource};
use funding_feed::ingest::GoogleNewsSource;
use funding_feed::Pipeline;
use std::sync::Arc;
use std::time::Duration;

const GN_XML: &str = include_str!("fixtures/google_news_rss.xml");

fn acme_json() -> &'static str {
    r#"{"project":"Acme","amount_raised":"$5M","lead_investors":["Sequoia"],
        "other_backers":["Y Combinator"],"funding_stage":"Seed",
        "use_of_funds":"build blockchain settlement rails","twitter_handle":"@acme"}"#
}

fn nova_json() -> &'static str {
    r#"```json
{"project":"Nova Health","amount_raised":"$12M","lead_investors":["a16z Bio"],
 "other_backers":[],"funding_stage":"Series A",
 "use_of_funds":"expand telemedicine and medical staffing","twitter_handle":null}
```"#
}

fn orchestrator(ex: ScriptedExtractor) -> Orchestrator {
    let classifier = Arc::new(Classifier::new(&Taxonomy::builtin()).unwrap());
    Orchestrator::new(Arc::new(ex), classifier, Duration::from_secs(5), 4)
}

fn pipeline(
    source: Arc<dyn ArticleSource>,
    ex: ScriptedExtractor,
    sink: Box<dyn FeedSink>,
) -> Pipeline {
    Pipeline::new(
        source,
        orchestrator(ex),
        sink,
        FeedMeta::from(&FeedConfig::default()),
        "startup funding",
        20,
    )
}

fn full_script() -> ScriptedExtractor {
    ScriptedExtractor::new()
        .reply("Acme raises", acme_json())
        .reply("Acme lands", acme_json())
        .reply("Opinion:", "This article does not describe a funding round.")
        .reply("Nova Health", nova_json())
}

#[tokio::test]
async fn fixture_run_extracts_dedups_and_publishes() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("funding_announcements.xml");

    let p = pipeline(
        Arc::new(GoogleNewsSource::from_fixture_str(GN_XML)),
        full_script(),
        Box::new(FileSink::new(&out)),
    );
    let now = Utc.with_ymd_and_hms(2024, 5, 7, 12, 0, 0).unwrap();
    let summary = p.run_at(now).await.expect("run ok");

    assert_eq!(summary.fetched, 4);
    assert_eq!(summary.extracted, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.published, 2);

    let xml = std::fs::read_to_string(&out).unwrap();
    assert_eq!(xml.matches("<item>").count(), 2);
    assert!(xml.contains("<title>Acme raises $5M</title>"));
    assert!(xml.contains("<title>Nova Health raises $12M</title>"));
    // first occurrence (TechCrunch) survives dedup
    assert!(xml.contains("https://news.google.com/rss/articles/acme-techcrunch"));
    assert!(!xml.contains("acme-venturebeat"));
    // categories land in the JSON description
    let plain = xml.replace("&quot;", "\"");
    assert!(plain.contains(r#""category": "Web3""#));
    assert!(plain.contains(r#""category": "Healthcare""#));
    // feed order follows article order
    assert!(xml.find("Acme raises").unwrap() < xml.find("Nova Health raises").unwrap());
    // guid is the article link, byte for byte
    assert_eq!(
        guids(&xml),
        vec![
            "https://news.google.com/rss/articles/acme-techcrunch",
            "https://news.google.com/rss/articles/nova-fierce",
        ]
    );
}

fn guids(xml: &str) -> Vec<&str> {
    xml.split("<guid isPermaLink=\"true\">")
        .skip(1)
        .filter_map(|rest| rest.split("</guid>").next())
        .collect()
}

struct StaticSource(Vec<Article>);

#[async_trait]
impl ArticleSource for StaticSource {
    async fn fetch_latest(&self, _query: &str, limit: usize) -> Result<Vec<Article>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
    fn name(&self) -> &'static str {
        "Static"
    }
}

fn article(title: &str, published: &str) -> Article {
    Article {
        title: title.to_string(),
        link: format!("https://news.test/{}", title.to_lowercase().replace(' ', "-")),
        published: published.to_string(),
        source: None,
        description: String::new(),
    }
}

#[tokio::test]
async fn one_of_two_failing_still_publishes_one_item() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("feed.xml");

    let arts = vec![
        article("Acme raises", "Mon, 06 May 2024 14:03:00 GMT"),
        article("Broken story", "Mon, 06 May 2024 15:00:00 GMT"),
    ];
    let script = || {
        ScriptedExtractor::new()
            .reply("Acme raises", acme_json())
            .reply("Broken story", r#"{"project":"Broken"}"#)
    };

    let p = pipeline(
        Arc::new(StaticSource(arts.clone())),
        script(),
        Box::new(FileSink::new(&out)),
    );
    let summary = p.run().await.expect("partial failure must not abort");

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.published, 1);
    let xml = std::fs::read_to_string(&out).unwrap();
    assert_eq!(xml.matches("<item>").count(), 1);

    // the skipped outcome names the failed article and why
    let report = orchestrator(script()).run(&arts).await;
    let skipped: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| !o.is_extracted())
        .collect();
    assert_eq!(skipped.len(), 1);
    match skipped[0] {
        ArticleOutcome::Skipped {
            title,
            link,
            reason,
        } => {
            assert_eq!(title, "Broken story");
            assert_eq!(link, "https://news.test/broken-story");
            assert_eq!(*reason, ExtractError::MissingField("amount_raised"));
        }
        other => panic!("expected a skipped outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_survivors_still_writes_valid_feed() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("feed.xml");

    let p = pipeline(
        Arc::new(StaticSource(vec![])),
        ScriptedExtractor::new(),
        Box::new(FileSink::new(&out)),
    );
    let summary = p.run().await.unwrap();
    assert_eq!(summary.published, 0);

    let xml = std::fs::read_to_string(&out).unwrap();
    assert!(xml.contains("<title>Funding Announcements</title>"));
    assert!(!xml.contains("<item>"));
}

struct DownSource;

#[async_trait]
impl ArticleSource for DownSource {
    async fn fetch_latest(&self, _query: &str, _limit: usize) -> Result<Vec<Article>> {
        anyhow::bail!("connection refused")
    }
    fn name(&self) -> &'static str {
        "Down"
    }
}

#[tokio::test]
async fn fetch_failure_aborts_with_fetch_stage() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("feed.xml");
    let ex = ScriptedExtractor::new();

    let p = pipeline(Arc::new(DownSource), ex, Box::new(FileSink::new(&out)));
    let err = p.run().await.unwrap_err();

    assert_eq!(err.stage(), "fetch");
    assert!(format!("{err}").contains("connection refused"));
    assert!(!out.exists(), "nothing is published after a fetch failure");
}

#[tokio::test]
async fn malformed_pubdate_aborts_with_assemble_stage() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("feed.xml");

    let source = StaticSource(vec![article("Acme raises", "yesterday-ish")]);
    let ex = ScriptedExtractor::new().reply("Acme raises", acme_json());

    let p = pipeline(Arc::new(source), ex, Box::new(FileSink::new(&out)));
    let err = p.run().await.unwrap_err();
    assert_eq!(err.stage(), "assemble");
    assert!(matches!(err, PipelineError::Assemble(_)));
    assert!(!out.exists());
}

struct BrokenSink;

impl FeedSink for BrokenSink {
    fn publish(&self, _xml: &str) -> Result<()> {
        anyhow::bail!("read-only filesystem")
    }
    fn target(&self) -> String {
        "broken".into()
    }
}

#[tokio::test]
async fn sink_failure_aborts_with_publish_stage() {
    let source = StaticSource(vec![article("Acme raises", "Mon, 06 May 2024 14:03:00 GMT")]);
    let ex = ScriptedExtractor::new().reply("Acme raises", acme_json());

    let p = pipeline(Arc::new(source), ex, Box::new(BrokenSink));
    let err = p.run().await.unwrap_err();
    assert_eq!(err.stage(), "publish");
}

#[tokio::test]
async fn orchestrator_skips_transport_and_timeout_failures() {
    let ex = ScriptedExtractor::new()
        .fail("Down", ExtractError::Transport("reset by peer".into()))
        .reply("Acme raises", acme_json());
    let o = orchestrator(ex);

    let arts = vec![
        article("Down story", "Mon, 06 May 2024 14:03:00 GMT"),
        article("Acme raises", "Mon, 06 May 2024 14:03:00 GMT"),
    ];
    let anns: Vec<Announcement> = o.run(&arts).await.into_announcements();
    assert_eq!(anns.len(), 1);
    assert_eq!(anns[0].project, "Acme");
    assert_eq!(anns[0].category, "Web3");
}
