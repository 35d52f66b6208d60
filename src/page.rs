use anyhow::anyhow;
use scraper::{ElementRef, Html, Selector};

/// A parsed homepage plus its raw markup.
pub struct Page {
    document: Html,
    raw: String,
}

impl Page {
    pub fn parse(raw: &str) -> Self {
        Self {
            document: Html::parse_document(raw),
            raw: raw.to_string(),
        }
    }

    pub fn raw_lowercase(&self) -> String {
        self.raw.to_lowercase()
    }

    /// Concatenated text nodes of the whole document, scripts included.
    pub fn text(&self) -> String {
        self.document.root_element().text().collect()
    }

    pub fn count(&self, css: &str) -> anyhow::Result<usize> {
        let selector = selector(css)?;
        Ok(self.document.select(&selector).count())
    }

    pub fn link_hrefs(&self) -> anyhow::Result<Vec<String>> {
        let selector = selector("a[href]")?;
        Ok(self
            .document
            .select(&selector)
            .filter_map(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .collect())
    }

    /// True when any element matching `css` has text containing `needle`,
    /// compared case-insensitively.
    pub fn any_text_contains(&self, css: &str, needle: &str) -> anyhow::Result<bool> {
        let selector = selector(css)?;
        let needle = needle.to_lowercase();
        Ok(self
            .document
            .select(&selector)
            .any(|el| element_text(&el).to_lowercase().contains(&needle)))
    }

    pub fn first_text(&self, css: &str) -> anyhow::Result<Option<String>> {
        let selector = selector(css)?;
        Ok(self.document.select(&selector).next().map(|el| element_text(&el)))
    }

    pub fn first_attr(&self, css: &str, attr: &str) -> anyhow::Result<Option<String>> {
        let selector = selector(css)?;
        Ok(self
            .document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr(attr))
            .map(str::to_string))
    }

    pub fn json_ld_blocks(&self) -> anyhow::Result<Vec<String>> {
        let selector = selector(r#"script[type="application/ld+json"]"#)?;
        Ok(self.document.select(&selector).map(|el| element_text(&el)).collect())
    }
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect()
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css}: {e}"))
}
