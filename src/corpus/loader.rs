//! Document loading from JSON and JSON Lines files
//!
//! A `.json` file holds one document object or an array of them; a
//! `.jsonl` file holds one object per line. A directory is scanned
//! (non-recursively) for both, in file-name order.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::corpus::document::{Document, DocumentSource};
use crate::errors::{RagError, Result};
use crate::types::Scalar;

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, alias = "url")]
    source_url: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
    /// Unrecognised top-level keys become metadata
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

fn scalar_from(value: &Value) -> Option<Scalar> {
    match value {
        Value::Bool(b) => Some(Scalar::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(Scalar::Int)
            .or_else(|| n.as_f64().map(Scalar::Float)),
        Value::String(s) => Some(Scalar::Text(s.clone())),
        _ => None,
    }
}

impl RawDocument {
    fn into_document(self) -> Option<Document> {
        let content = self.content.trim().to_string();
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Untitled Document".to_string());

        if content.is_empty() {
            warn!(title = %title, "skipping document with empty content");
            return None;
        }

        let id = self.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| {
            Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}\n{}", title, content).as_bytes()).to_string()
        });

        let metadata = self
            .metadata
            .iter()
            .chain(self.extra.iter())
            .filter_map(|(key, value)| scalar_from(value).map(|s| (key.clone(), s)))
            .collect();

        Some(Document {
            id,
            title,
            content,
            source: self
                .source
                .as_deref()
                .map(DocumentSource::from_name)
                .unwrap_or_default(),
            source_url: self.source_url,
            author: self.author,
            metadata,
        })
    }
}

fn parse_item(value: Value, origin: &Path) -> Option<Document> {
    match serde_json::from_value::<RawDocument>(value) {
        Ok(raw) => raw.into_document(),
        Err(e) => {
            warn!(file = %origin.display(), error = %e, "skipping malformed document");
            None
        }
    }
}

/// Parse the contents of a `.json` file
pub fn parse_json(text: &str, origin: &Path) -> Result<Vec<Document>> {
    let data: Value = serde_json::from_str(text)
        .map_err(|e| RagError::Corpus(format!("Invalid JSON in {}: {}", origin.display(), e)))?;

    let documents = match data {
        Value::Array(items) => items.into_iter().filter_map(|item| parse_item(item, origin)).collect(),
        object @ Value::Object(_) => parse_item(object, origin).into_iter().collect(),
        _ => {
            return Err(RagError::Corpus(format!(
                "{} must contain a document object or an array of them",
                origin.display()
            )))
        }
    };

    Ok(documents)
}

/// Parse the contents of a `.jsonl` file; blank lines are ignored
pub fn parse_jsonl(text: &str, origin: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| {
            RagError::Corpus(format!("Invalid JSON on line {} of {}: {}", line_no + 1, origin.display(), e))
        })?;
        documents.extend(parse_item(value, origin));
    }

    Ok(documents)
}

fn is_corpus_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("jsonl")
    )
}

/// Load documents from a file or a directory of files
pub fn load_path(path: &Path) -> Result<Vec<Document>> {
    if !path.exists() {
        return Err(RagError::Corpus(format!("{} does not exist", path.display())));
    }

    let files: Vec<PathBuf> = if path.is_dir() {
        let mut files = Vec::new();
        for entry in fs::read_dir(path)? {
            let file = entry?.path();
            if file.is_file() && is_corpus_file(&file) {
                files.push(file);
            }
        }
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut documents = Vec::new();
    for file in &files {
        let text = fs::read_to_string(file)?;
        let loaded = match file.extension().and_then(|e| e.to_str()) {
            Some("jsonl") => parse_jsonl(&text, file)?,
            Some("json") => parse_json(&text, file)?,
            _ => {
                return Err(RagError::Corpus(format!(
                    "Unsupported corpus file {} (expected .json or .jsonl)",
                    file.display()
                )))
            }
        };
        debug!(file = %file.display(), documents = loaded.len(), "loaded corpus file");
        documents.extend(loaded);
    }

    info!(files = files.len(), documents = documents.len(), "corpus loaded");
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_json_array() {
        let text = r#"[
            {"id": "rapamycin-1", "title": "Rapamycin in mice", "content": "Rapamycin extended median lifespan.",
             "source": "paper", "url": "https://example.org/rapa", "year": 2009, "metadata": {"species": "mouse"}},
            {"title": "Empty", "content": "   "}
        ]"#;
        let docs = parse_json(text, Path::new("test.json")).unwrap();

        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.id, "rapamycin-1");
        assert_eq!(doc.source, DocumentSource::ResearchPaper);
        assert_eq!(doc.source_url.as_deref(), Some("https://example.org/rapa"));
        assert_eq!(doc.metadata.get("year"), Some(&Scalar::Int(2009)));
        assert_eq!(doc.metadata.get("species"), Some(&Scalar::Text("mouse".to_string())));
    }

    #[test]
    fn test_generated_ids_are_stable() {
        let text = r#"{"title": "Sleep and ageing", "content": "Deep sleep declines with age."}"#;
        let first = parse_json(text, Path::new("a.json")).unwrap();
        let second = parse_json(text, Path::new("b.json")).unwrap();
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].source, DocumentSource::Unknown);
    }

    #[test]
    fn test_parse_jsonl_reports_bad_line() {
        let text = "{\"title\": \"A\", \"content\": \"alpha\"}\n\nnot json\n";
        let err = parse_jsonl(text, Path::new("bad.jsonl")).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_load_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"[{"title": "A", "content": "Zone 2 cardio improves VO2 max."}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.jsonl"),
            "{\"title\": \"B\", \"content\": \"Protein intake matters after 65.\"}\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = load_path(dir.path()).unwrap();
        let titles: Vec<_> = docs.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_missing_path() {
        assert!(matches!(
            load_path(Path::new("/definitely/not/here.json")),
            Err(RagError::Corpus(_))
        ));
    }
}
