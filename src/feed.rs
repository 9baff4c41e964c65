//! Feed assembler: announcements → RSS 2.0 items → XML → sink.
//!
//! Item mapping:
//! - title: "{project} raises {amount_raised}"
//! - link / guid: the originating article link
//! - description: the whole announcement as pretty JSON
//! - pubDate: `published` parsed as RFC 2822, re-emitted as RFC 2822
//!
//! A `published` value that does not parse fails the whole run; it comes
//! from the fetcher and is expected to be well-formed.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::extract::types::Announcement;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    pub title: String,
    pub link: String,
    pub description: String,
}

impl From<&FeedConfig> for FeedMeta {
    fn from(cfg: &FeedConfig) -> Self {
        Self {
            title: cfg.title.clone(),
            link: cfg.link.clone(),
            description: cfg.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub guid: String,
    pub pub_date: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub meta: FeedMeta,
    pub last_build: DateTime<Utc>,
    pub items: Vec<FeedItem>,
}

pub fn parse_published(link: &str, value: &str) -> Result<DateTime<FixedOffset>, FeedError> {
    DateTime::parse_from_rfc2822(value.trim()).map_err(|source| FeedError::MalformedTimestamp {
        link: link.to_string(),
        value: value.to_string(),
        source,
    })
}

pub fn item_for(a: &Announcement) -> Result<FeedItem, FeedError> {
    let description =
        serde_json::to_string_pretty(a).map_err(|e| FeedError::Render(e.to_string()))?;
    Ok(FeedItem {
        title: format!("{} raises {}", a.project, a.amount_raised),
        link: a.link.clone(),
        description,
        guid: a.link.clone(),
        pub_date: parse_published(&a.link, &a.published)?,
    })
}

/// Build the feed; `now` becomes lastBuildDate.
pub fn assemble(
    announcements: &[Announcement],
    meta: &FeedMeta,
    now: DateTime<Utc>,
) -> Result<Feed, FeedError> {
    let items = announcements
        .iter()
        .map(item_for)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Feed {
        meta: meta.clone(),
        last_build: now,
        items,
    })
}

// ------------------------------------------------------------
// RSS rendering
// ------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename = "rss")]
struct RssDoc<'a> {
    #[serde(rename = "@version")]
    version: &'a str,
    channel: RssChannel<'a>,
}

#[derive(Serialize)]
struct RssChannel<'a> {
    title: &'a str,
    link: &'a str,
    description: &'a str,
    #[serde(rename = "lastBuildDate")]
    last_build_date: String,
    generator: &'a str,
    #[serde(rename = "item")]
    items: Vec<RssItem<'a>>,
}

#[derive(Serialize)]
struct RssItem<'a> {
    title: &'a str,
    link: &'a str,
    description: &'a str,
    guid: RssGuid<'a>,
    #[serde(rename = "pubDate")]
    pub_date: String,
}

#[derive(Serialize)]
struct RssGuid<'a> {
    #[serde(rename = "@isPermaLink")]
    is_perma_link: bool,
    #[serde(rename = "$text")]
    value: &'a str,
}

impl Feed {
    pub fn to_rss_xml(&self) -> Result<String, FeedError> {
        let doc = RssDoc {
            version: "2.0",
            channel: RssChannel {
                title: &self.meta.title,
                link: &self.meta.link,
                description: &self.meta.description,
                last_build_date: self.last_build.to_rfc2822(),
                generator: concat!("funding-feed ", env!("CARGO_PKG_VERSION")),
                items: self
                    .items
                    .iter()
                    .map(|it| RssItem {
                        title: &it.title,
                        link: &it.link,
                        description: &it.description,
                        guid: RssGuid {
                            is_perma_link: true,
                            value: &it.guid,
                        },
                        pub_date: it.pub_date.to_rfc2822(),
                    })
                    .collect(),
            },
        };

        // No indentation: the indenting serializer pads `$text` content, which
        // would corrupt guid values.
        let mut body = String::new();
        let ser = quick_xml::se::Serializer::new(&mut body);
        doc.serialize(ser)
            .map_err(|e| FeedError::Render(e.to_string()))?;

        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}\n"))
    }
}

// ------------------------------------------------------------
// Sinks
// ------------------------------------------------------------

pub trait FeedSink: Send + Sync {
    fn publish(&self, xml: &str) -> Result<()>;
    /// Where the feed goes, for logs.
    fn target(&self) -> String;
}

/// Writes to a temp file next to `path`, then renames over it.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSink for FileSink {
    fn publish(&self, xml: &str) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating feed dir {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("xml.tmp");
        let res = write_then_rename(&tmp, &self.path, xml);
        if res.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        res
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }
}

fn write_then_rename(tmp: &Path, path: &Path, xml: &str) -> Result<()> {
    let mut f = fs::File::create(tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(xml.as_bytes())
        .with_context(|| format!("writing {}", tmp.display()))?;
    f.sync_all()
        .with_context(|| format!("syncing {}", tmp.display()))?;
    drop(f);
    fs::rename(tmp, path).with_context(|| format!("renaming feed into {}", path.display()))?;
    Ok(())
}

/// Any `io::Write` (stdout, a buffer in tests).
pub struct WriterSink<W: Write + Send> {
    inner: Mutex<W>,
    label: &'static str,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(inner: W, label: &'static str) -> Self {
        Self {
            inner: Mutex::new(inner),
            label,
        }
    }

    pub fn into_inner(self) -> W {
        match self.inner.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> FeedSink for WriterSink<W> {
    fn publish(&self, xml: &str) -> Result<()> {
        let mut w = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("feed writer lock poisoned"))?;
        w.write_all(xml.as_bytes()).context("writing feed")?;
        w.flush().context("flushing feed")?;
        Ok(())
    }

    fn target(&self) -> String {
        self.label.to_string()
    }
}

/// "-" means stdout, anything else is a file path.
pub fn sink_for_path(path: &Path) -> Box<dyn FeedSink> {
    if path == Path::new("-") {
        Box::new(WriterSink::new(std::io::stdout(), "stdout"))
    } else {
        Box::new(FileSink::new(path))
    }
}
