use crate::adapter::SourceAdapter;
use crate::raw_item::RawItem;
use async_trait::async_trait;
use sentinel_common::{collapse_whitespace, hex32, SentinelError};
use serde_json::json;
use tracing::warn;

/// RSS/Atom adapter — §4.1 "Feed adapter".
pub struct FeedAdapter {
    client: reqwest::Client,
    feed_urls: Vec<String>,
}

impl FeedAdapter {
    pub fn new(feed_urls: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            feed_urls,
        }
    }

    async fn fetch_one(&self, feed_url: &str) -> Result<Vec<RawItem>, SentinelError> {
        let bytes = self
            .client
            .get(feed_url)
            .send()
            .await
            .map_err(|e| SentinelError::Fetch {
                adapter: self.name().to_string(),
                source: e.into(),
            })?
            .bytes()
            .await
            .map_err(|e| SentinelError::Fetch {
                adapter: self.name().to_string(),
                source: e.into(),
            })?;

        let feed = match feed_rs::parser::parse(&bytes[..]) {
            Ok(feed) => feed,
            Err(e) => {
                warn!(feed_url, error = %e, "feed failed to parse, yielding no items");
                return Ok(vec![]);
            }
        };

        let mut items = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            let link = match entry.links.first() {
                Some(l) => l.href.clone(),
                None => {
                    warn!(feed_url, entry_id = %entry.id, "feed entry has no link, skipping");
                    continue;
                }
            };

            let external_id = hex32(&format!("rss:{link}"));
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "(untitled)".to_string());

            let summary = entry.summary.map(|t| strip_html(&t.content));
            let content = entry
                .content
                .and_then(|c| c.body)
                .map(|body| strip_html(&body));

            let authors: Vec<String> = entry
                .authors
                .iter()
                .flat_map(|p| p.name.split(','))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();

            let published_at = entry.published.or(entry.updated);

            let tags: Vec<String> = entry.categories.iter().map(|c| c.term.clone()).collect();

            let mut item = RawItem::new(self.name(), external_id, title);
            item.summary = summary;
            item.content = content;
            item.authors = authors;
            item.published_at = published_at;
            item.source_url = Some(link);
            item.metadata
                .insert("feed_url".to_string(), json!(feed_url));
            item.metadata.insert("tags".to_string(), json!(tags));
            items.push(item);
        }
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    fn name(&self) -> &str {
        "feed"
    }

    async fn fetch(&self) -> Result<Vec<RawItem>, SentinelError> {
        let mut all = Vec::new();
        for feed_url in &self.feed_urls {
            match self.fetch_one(feed_url).await {
                Ok(items) => all.extend(items),
                Err(e) => {
                    warn!(feed_url, error = %e, "feed fetch failed, skipping this feed");
                }
            }
        }
        Ok(all)
    }
}

/// Strip HTML tags and collapse whitespace, per §4.1. Grounded in the
/// teacher's `html2text::from_read` usage for page-text extraction.
fn strip_html(html: &str) -> String {
    let text = html2text::from_read(html.as_bytes(), usize::MAX);
    collapse_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_collapses_tags_and_whitespace() {
        let out = strip_html("<p>Hello   <b>world</b></p>\n\n<p>again</p>");
        assert_eq!(out, "Hello world again");
    }

    #[test]
    fn strip_html_handles_empty_input() {
        assert_eq!(strip_html(""), "");
    }
}
