//! Content extraction: stored summary or downloaded page to plain text.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;

use crate::error::ExtractionError;
use crate::store::Article;

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, article: &Article, ct: &CancellationToken) -> Result<String, ExtractionError>;
}

pub struct ReadabilityExtractor {
    client: Client,
    blank_runs: Regex,
}

impl ReadabilityExtractor {
    pub fn new(client: Client) -> Result<Self, regex::Error> {
        Ok(Self { client, blank_runs: Regex::new(r"\n{3,}")? })
    }

    /// Collapse runs of three or more newlines into one.
    pub fn clean_text(&self, text: &str) -> String {
        self.blank_runs.replace_all(text, "\n").into_owned()
    }

    async fn download(&self, url: &str) -> Result<String, ExtractionError> {
        let http = |source| ExtractionError::Http { url: url.to_string(), source };
        let resp = self.client.get(url).send().await.map_err(http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractionError::Status { url: url.to_string(), status });
        }
        resp.text().await.map_err(http)
    }

    async fn fetch_readable(&self, url: &str) -> Result<String, ExtractionError> {
        let html = self.download(url).await?;
        scrape_page(&html).ok_or_else(|| ExtractionError::NoContent { url: url.to_string() })
    }
}

#[async_trait]
impl Extractor for ReadabilityExtractor {
    async fn extract(&self, article: &Article, ct: &CancellationToken) -> Result<String, ExtractionError> {
        if !article.summary.trim().is_empty() {
            let text = fragment_text(&article.summary);
            if text.is_empty() {
                return Err(ExtractionError::NoContent { url: article.link.clone() });
            }
            return Ok(self.clean_text(&text));
        }

        let text = tokio::select! {
            biased;
            _ = ct.cancelled() => return Err(ExtractionError::Cancelled),
            res = self.fetch_readable(&article.link) => res?,
        };
        Ok(self.clean_text(&text))
    }
}

/// Text content of an HTML (or plain) fragment, trimmed.
fn fragment_text(summary: &str) -> String {
    let frag = Html::parse_fragment(summary);
    frag.root_element().text().collect::<String>().trim().to_string()
}

/// Readable text of a full page: the first likely article container with
/// enough text, else every paragraph joined by newlines.
fn scrape_page(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    let candidates = [
        "article",
        "main",
        "[role=main]",
        "#content",
        "[itemprop=articleBody]",
        ".post-content",
        ".entry-content",
    ];
    for sel in candidates.iter() {
        if let Some(text) = text_of(&doc, sel) {
            if text.len() >= 200 { return Some(text); }
        }
    }

    let p_sel = Selector::parse("p").ok()?;
    let paragraphs: Vec<String> = doc
        .select(&p_sel)
        .map(|p| squeeze_lines(&p.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .collect();
    let joined = paragraphs.join("\n");
    if joined.trim().is_empty() { None } else { Some(joined) }
}

fn text_of(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let node = doc.select(&sel).next()?;
    let s = squeeze_lines(&node.text().collect::<String>());
    if s.is_empty() { None } else { Some(s) }
}

fn squeeze_lines(s: &str) -> String {
    s.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(summary: &str, link: &str) -> Article {
        Article {
            id: 1,
            source_id: 1,
            title: "t".into(),
            link: link.into(),
            summary: summary.into(),
            published_at: Utc::now(),
            posted_at: None,
            created_at: Utc::now(),
        }
    }

    fn extractor() -> ReadabilityExtractor {
        ReadabilityExtractor::new(Client::new()).unwrap()
    }

    #[test]
    fn blank_line_runs_collapse_to_one_newline() {
        let ex = extractor();
        assert_eq!(ex.clean_text("a\n\n\nb\n\n\n\n\nc"), "a\nb\nc");
        assert_eq!(ex.clean_text("a\n\nb"), "a\n\nb");
        assert_eq!(ex.clean_text("  keep  spacing "), "  keep  spacing ");
    }

    #[tokio::test]
    async fn summary_is_used_without_network() {
        // unroutable link: any network attempt would fail the test
        let art = article("<p>Hello <b>world</b></p>\n\n\n<p>again</p>", "http://127.0.0.1:1/never");
        let text = extractor().extract(&art, &CancellationToken::new()).await.unwrap();
        assert_eq!(text, "Hello world\nagain");
    }

    #[tokio::test]
    async fn plain_text_summary_passes_through() {
        let art = article("Just a sentence.", "http://127.0.0.1:1/never");
        let text = extractor().extract(&art, &CancellationToken::new()).await.unwrap();
        assert_eq!(text, "Just a sentence.");
    }

    #[tokio::test]
    async fn markup_only_summary_never_downloads_link() {
        let art = article(r#"<img src="https://x.test/a.png">"#, "http://127.0.0.1:1/never");
        let err = extractor().extract(&art, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::NoContent { ref url } if url == "http://127.0.0.1:1/never"));
    }

    #[tokio::test]
    async fn cancelled_before_download() {
        let ct = CancellationToken::new();
        ct.cancel();
        let err = extractor().extract(&article("", "http://127.0.0.1:1/x"), &ct).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Cancelled));
    }

    #[tokio::test]
    async fn unreachable_link_is_http_error() {
        let err = extractor()
            .extract(&article("   ", "http://127.0.0.1:1/x"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Http { .. }));
    }

    #[test]
    fn article_container_preferred_when_long_enough() {
        let body = "word ".repeat(60);
        let html = format!("<html><body><nav><p>menu</p></nav><article>\n<h1>Title</h1>\n<p>{body}</p>\n</article></body></html>");
        let text = scrape_page(&html).unwrap();
        assert!(text.starts_with("Title\n"));
        assert!(!text.contains("menu"));
    }

    #[test]
    fn falls_back_to_paragraphs() {
        let html = "<html><body><article>short</article><p> one </p><div><p>two</p></div></body></html>";
        assert_eq!(scrape_page(html).unwrap(), "one\ntwo");
    }

    #[test]
    fn empty_page_has_no_content() {
        assert!(scrape_page("<html><body><script>x()</script></body></html>").is_none());
    }
}
