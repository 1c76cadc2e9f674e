// src/extract.rs
//! Raw markup -> [`ContentRecord`].

use chrono::Local;
use scraper::{ElementRef, Html, Selector};

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::record::ContentRecord;

pub struct Extractor {
    content: Vec<(String, Selector)>,
    dates: Vec<Selector>,
    title: Selector,
    default_title: String,
    max_lines: usize,
    source_url: String,
}

pub(crate) fn compile(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

impl Extractor {
    pub fn new(cfg: &ExtractConfig, source_url: impl Into<String>) -> Result<Self, ExtractError> {
        let content = cfg
            .content_selectors
            .iter()
            .map(|s| compile(s).map(|sel| (s.clone(), sel)))
            .collect::<Result<Vec<_>, _>>()?;
        let dates = cfg
            .date_selectors
            .iter()
            .map(|s| compile(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            content,
            dates,
            title: compile("title")?,
            default_title: cfg.default_title.clone(),
            max_lines: cfg.max_lines,
            source_url: source_url.into(),
        })
    }

    /// Dated with today's local date when the page carries none.
    pub fn extract(&self, raw: &str) -> Result<ContentRecord, ExtractError> {
        let today = Local::now().format("%Y-%m-%d").to_string();
        self.extract_with_capture_date(raw, &today)
    }

    pub fn extract_with_capture_date(
        &self,
        raw: &str,
        capture_date: &str,
    ) -> Result<ContentRecord, ExtractError> {
        let doc = Html::parse_document(raw);

        let region = self
            .content
            .iter()
            .find_map(|(_, sel)| doc.select(sel).next())
            .ok_or_else(|| ExtractError::ContentNotFound {
                selectors: self.content.iter().map(|(s, _)| s.clone()).collect(),
            })?;

        let title = doc
            .select(&self.title)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.default_title.clone());

        let date = self
            .find_date(&doc)
            .unwrap_or_else(|| capture_date.to_string());

        let body = normalize_lines(&region_text(region), self.max_lines);

        Ok(ContentRecord::new(title, date, body, self.source_url.clone()))
    }

    fn find_date(&self, doc: &Html) -> Option<String> {
        self.dates.iter().find_map(|sel| {
            let el = doc.select(sel).next()?;
            let v = el.value();
            let raw = v
                .attr("datetime")
                .or_else(|| v.attr("content"))
                .map(str::to_string)
                .unwrap_or_else(|| el.text().collect::<String>());
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
    }
}

/// Text nodes of the region, each trimmed, one per line.
fn region_text(region: ElementRef<'_>) -> String {
    region
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim every line, drop blank ones, keep the first `max_lines`.
pub fn normalize_lines(text: &str, max_lines: usize) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(&ExtractConfig::default(), "https://example.test/page").unwrap()
    }

    #[test]
    fn extracts_title_date_and_body() {
        let html = r#"<html><head><title> Visa news </title></head><body>
            <main><article>
              <time datetime="2025-08-30">30 Aug</time>
              <h1>Nomination update</h1>
              <p>  Applications reopen on Monday.  </p>
              <p>   </p>
            </article></main></body></html>"#;
        let r = extractor().extract_with_capture_date(html, "2000-01-01").unwrap();
        assert_eq!(r.title, "Visa news");
        assert_eq!(r.published_date, "2025-08-30");
        assert_eq!(r.body_text, "30 Aug\nNomination update\nApplications reopen on Monday.");
        assert_eq!(r.source_url, "https://example.test/page");
    }

    #[test]
    fn falls_back_to_second_selector_and_defaults() {
        let html = r#"<div class="content-wrapper"><p>Only text</p></div>"#;
        let r = extractor().extract_with_capture_date(html, "2025-09-01").unwrap();
        assert_eq!(r.title, ExtractConfig::default().default_title);
        assert_eq!(r.published_date, "2025-09-01");
        assert_eq!(r.body_text, "Only text");
    }

    #[test]
    fn meta_content_is_used_for_date() {
        let html = r#"<html><head>
            <meta property="article:published_time" content="2025-07-01T10:00:00Z">
            </head><body><main><article>x</article></main></body></html>"#;
        let r = extractor().extract_with_capture_date(html, "1999-01-01").unwrap();
        assert_eq!(r.published_date, "2025-07-01T10:00:00Z");
    }

    #[test]
    fn missing_region_is_an_error() {
        let err = extractor()
            .extract_with_capture_date("<p>nothing here</p>", "2025-01-01")
            .unwrap_err();
        assert!(matches!(err, ExtractError::ContentNotFound { .. }));
    }

    #[test]
    fn body_is_capped_at_max_lines() {
        let items: String = (0..30).map(|i| format!("<p>line {i}</p>")).collect();
        let html = format!("<main><article>{items}</article></main>");
        let r = extractor().extract_with_capture_date(&html, "2025-01-01").unwrap();
        assert_eq!(r.lines().count(), 20);
        assert_eq!(r.lines().last(), Some("line 19"));
    }

    #[test]
    fn invalid_selector_is_rejected_up_front() {
        let mut cfg = ExtractConfig::default();
        cfg.content_selectors = vec!["main[".into()];
        assert!(matches!(
            Extractor::new(&cfg, "u"),
            Err(ExtractError::InvalidSelector { .. })
        ));
    }
}
