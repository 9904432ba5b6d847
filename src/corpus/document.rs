//! Source documents before chunking

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::Scalar;

/// Kind of publication a document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    ResearchPaper,
    PodcastTranscript,
    BookExcerpt,
    WebsiteContent,
    BlogPost,
    NewsArticle,
    #[default]
    Unknown,
}

impl DocumentSource {
    /// Map a loosely written source name; unrecognised names are `Unknown`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "research_paper" | "research" | "paper" => DocumentSource::ResearchPaper,
            "podcast" | "podcast_transcript" => DocumentSource::PodcastTranscript,
            "book" | "book_excerpt" => DocumentSource::BookExcerpt,
            "website" | "web" | "website_content" => DocumentSource::WebsiteContent,
            "blog" | "blog_post" => DocumentSource::BlogPost,
            "news" | "article" | "news_article" => DocumentSource::NewsArticle,
            _ => DocumentSource::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentSource::ResearchPaper => "research_paper",
            DocumentSource::PodcastTranscript => "podcast_transcript",
            DocumentSource::BookExcerpt => "book_excerpt",
            DocumentSource::WebsiteContent => "website_content",
            DocumentSource::BlogPost => "blog_post",
            DocumentSource::NewsArticle => "news_article",
            DocumentSource::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document in the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub source: DocumentSource,
    pub source_url: Option<String>,
    pub author: Option<String>,
    pub metadata: BTreeMap<String, Scalar>,
}

impl Document {
    /// Citation shown to users: the URL when known, else the title
    pub fn source_reference(&self) -> String {
        self.source_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.title.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_mapping() {
        assert_eq!(DocumentSource::from_name("Paper"), DocumentSource::ResearchPaper);
        assert_eq!(DocumentSource::from_name("podcast"), DocumentSource::PodcastTranscript);
        assert_eq!(DocumentSource::from_name("web"), DocumentSource::WebsiteContent);
        assert_eq!(DocumentSource::from_name("article"), DocumentSource::NewsArticle);
        assert_eq!(DocumentSource::from_name("tweet"), DocumentSource::Unknown);
    }

    #[test]
    fn test_source_reference_prefers_url() {
        let mut doc = Document {
            id: "d1".to_string(),
            title: "Fasting and autophagy".to_string(),
            content: "...".to_string(),
            source: DocumentSource::BlogPost,
            source_url: Some("https://example.org/fasting".to_string()),
            author: None,
            metadata: BTreeMap::new(),
        };
        assert_eq!(doc.source_reference(), "https://example.org/fasting");

        doc.source_url = None;
        assert_eq!(doc.source_reference(), "Fasting and autophagy");
    }
}
