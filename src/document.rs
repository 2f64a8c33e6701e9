use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::StoreError;

// @module: Document data model

// @const: <title> element
static TITLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap()
});

// @const: <meta> element, quoted attribute values may contain `>`
static META_ELEMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap()
});

// @const: name='value' or name="value" attribute
static ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z][a-z0-9_:-]*)\s*=\s*(?:'([^']*)'|"([^"]*)")"#).unwrap()
});

static HTML_ELEMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(html|body)[\s>]").unwrap()
});

/// Reference to the storage location of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    // @field: Storage provider id
    pub provider: String,

    // @field: Path inside the provider
    pub path: String,

    // @field: Human readable service label
    pub service: String,

    // @field: Public URL, when the provider exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FileInfo {
    /// Create a file reference for the given provider
    pub fn new(provider: impl Into<String>, path: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            path: path.into(),
            service: service.into(),
            url: None,
        }
    }

    /// A file on the local disk
    pub fn local(path: impl Into<String>) -> Self {
        Self::new("fs", path, "local disk")
    }

    /// Attach a public URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.path)
    }
}

/// Where a finished document gets deployed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PublicationTarget {
    /// Destination path on the hosting service
    #[serde(default)]
    pub path: String,

    /// Public base URL of the published site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Service label of the hosting provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl PublicationTarget {
    /// Target identified by its destination path only
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the public base URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Link to the published index page, when the public URL is known
    pub fn preview_url(&self) -> Option<String> {
        self.url.as_deref().map(index_page_url)
    }
}

/// Index page of a published site rooted at `base`
pub fn index_page_url(base: &str) -> String {
    format!("{}/index.html", base.trim_end_matches('/'))
}

/// In-memory representation of the website being edited
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Serialized markup
    pub content: String,

    /// Content of the `<title>` element
    pub title: Option<String>,

    /// Target read from the `publication-path` meta element
    pub publication_target: Option<PublicationTarget>,

    /// Where the document was opened from, `None` for templates
    pub source: Option<FileInfo>,
}

impl Document {
    /// Build a document from raw markup, extracting its metadata
    ///
    /// With `validate_compat`, markup without an `<html>` or `<body>` element is rejected.
    pub fn from_markup(content: impl Into<String>, source: Option<FileInfo>, validate_compat: bool) -> Result<Self, StoreError> {
        let content = content.into();

        if validate_compat {
            if content.trim().is_empty() {
                return Err(StoreError::Parse("document is empty".to_string()));
            }
            if !HTML_ELEMENT_REGEX.is_match(&content) {
                return Err(StoreError::Parse("no <html> or <body> element found".to_string()));
            }
        }

        let title = TITLE_REGEX
            .captures(&content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty());

        let publication_target = publication_meta_content(&content)
            .and_then(|raw| parse_publication_target(&raw));

        Ok(Self {
            content,
            title,
            publication_target,
            source,
        })
    }
}

// Content of the first publication-path meta, whatever the attribute order.
fn publication_meta_content(markup: &str) -> Option<String> {
    META_ELEMENT_REGEX.find_iter(markup).find_map(|element| {
        let mut name = None;
        let mut content = None;
        for caps in ATTRIBUTE_REGEX.captures_iter(element.as_str()) {
            let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            match caps[1].to_ascii_lowercase().as_str() {
                "name" => name = value,
                "content" => content = value,
                _ => {}
            }
        }
        match name {
            Some(name) if name.eq_ignore_ascii_case("publication-path") => content.map(str::to_string),
            _ => None,
        }
    })
}

// Meta content is JSON, possibly HTML-escaped. A bare string is taken as a path.
fn parse_publication_target(raw: &str) -> Option<PublicationTarget> {
    let unescaped = raw.replace("&quot;", "\"").replace("&amp;", "&");
    let trimmed = unescaped.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<PublicationTarget>(trimmed) {
        Ok(target) => Some(target),
        Err(_) if !trimmed.starts_with('{') => Some(PublicationTarget::new(trimmed)),
        Err(e) => {
            log::warn!("Ignoring malformed publication-path meta: {}", e);
            None
        }
    }
}
