//! Corpus ingestion: turns a directory of Markdown/text documents into
//! indexed chunks.
//!
//! Each document is converted to plain text, segmented, filtered for
//! meaningful length and indexed in one batch. A failing document is
//! recorded in the report; it never aborts the rest.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use ragline_core::error::IngestError;
use regex_lite::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::index::SemanticIndex;
use crate::segmenter::segments;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(```|~~~).*$").expect("fence regex is valid"));
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s+").expect("heading regex is valid"));
static RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*([-*_]\s*){3,}$").expect("rule regex is valid"));
static QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*>\s?").expect("quote regex is valid"));
static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*([-*+]|\d+[.)])\s+").expect("list regex is valid"));
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").expect("image regex is valid"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("link regex is valid"));
static STRONG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\*\*|__)([^\n]+?)(\*\*|__)").expect("strong regex is valid"));
static EM_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").expect("emphasis regex is valid"));
static EM_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)_([^_\n]+)_").expect("emphasis regex is valid"));
static HTML_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html regex is valid"));
static SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Convert Markdown to plain text, keeping link and image text.
pub fn markdown_to_text(markdown: &str) -> String {
    let text = FENCE_RE.replace_all(markdown, "");
    let text = HEADING_RE.replace_all(&text, "");
    let text = RULE_RE.replace_all(&text, "");
    let text = QUOTE_RE.replace_all(&text, "");
    let text = LIST_RE.replace_all(&text, "");
    let text = IMAGE_RE.replace_all(&text, "$1");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = STRONG_RE.replace_all(&text, "$2");
    let text = EM_STAR_RE.replace_all(&text, "$1");
    let text = EM_UNDERSCORE_RE.replace_all(&text, "$1$2");
    let text = text.replace('`', "");
    let text = HTML_RE.replace_all(&text, " ");
    SPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Knobs for ingestion.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub max_chunk_size: usize,
    /// Chunks with fewer characters than this are dropped.
    pub min_chunk_chars: usize,
    /// Accepted file extensions, without the dot.
    pub extensions: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            min_chunk_chars: 50,
            extensions: vec!["md".into(), "txt".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Documents that were indexed
    pub documents: usize,
    /// Chunks added to the index
    pub chunks: usize,
    /// Chunks dropped for being shorter than the minimum
    pub skipped: usize,
    pub failures: Vec<IngestFailure>,
}

pub struct DocumentIngestor {
    index: Arc<SemanticIndex>,
    options: IngestOptions,
}

impl DocumentIngestor {
    pub fn new(index: Arc<SemanticIndex>, options: IngestOptions) -> Self {
        Self { index, options }
    }

    fn has_accepted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.options
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    /// Ingest every accepted file directly inside `dir` (non-recursive),
    /// in file-name order.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport, IngestError> {
        let is_dir = tokio::fs::metadata(dir).await.is_ok_and(|m| m.is_dir());
        if !is_dir {
            return Err(IngestError::MissingDirectory(dir.to_path_buf()));
        }

        let read_error = |e: std::io::Error| IngestError::Read {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };
        let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;

        let mut files: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
            let path = entry.path();
            if !self.has_accepted_extension(&path) {
                continue;
            }
            // Follows symlinks, like `Path::is_file`.
            if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
                files.push(path);
            }
        }
        files.sort();

        let mut report = IngestReport::default();
        for path in files {
            match self.ingest_file(&path).await {
                Ok((added, skipped)) => {
                    report.documents += 1;
                    report.chunks += added;
                    report.skipped += skipped;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping document");
                    report.failures.push(IngestFailure {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            documents = report.documents,
            chunks = report.chunks,
            skipped = report.skipped,
            failures = report.failures.len(),
            "Corpus ingested"
        );
        Ok(report)
    }

    /// Ingest one file. Returns `(chunks added, chunks skipped)`.
    pub async fn ingest_file(&self, path: &Path) -> Result<(usize, usize), IngestError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IngestError::Read {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.ingest_text(&source, &path.display().to_string(), &raw)
            .await
    }

    /// Ingest an in-memory document under `source`.
    pub async fn ingest_text(
        &self,
        source: &str,
        path: &str,
        raw: &str,
    ) -> Result<(usize, usize), IngestError> {
        let text = markdown_to_text(raw);
        let (kept, dropped): (Vec<_>, Vec<_>) = segments(&text, self.options.max_chunk_size)
            .into_iter()
            .partition(|s| s.text.chars().count() >= self.options.min_chunk_chars);

        for seg in kept.iter().filter(|s| s.oversized) {
            warn!(source, len = seg.text.chars().count(), "Oversized sentence kept as its own chunk");
        }

        let mut metadata = Map::new();
        metadata.insert("path".into(), Value::from(path));

        let contents: Vec<String> = kept.into_iter().map(|s| s.text).collect();
        let added = self
            .index
            .add_document_chunks(source, contents, metadata)
            .await
            .map_err(|e| IngestError::Index {
                source_name: source.to_string(),
                reason: e.to_string(),
            })?
            .len();

        info!(source, chunks = added, skipped = dropped.len(), "Document processed");
        Ok((added, dropped.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Rust Guide\n\n\
        Rust is a systems programming language focused on safety and speed. \
        It achieves memory safety without a garbage collector.\n\n\
        ## Ownership\n\n\
        Each value in Rust has a single **owner** that controls its lifetime. \
        See [the book](https://doc.rust-lang.org/book/) for more details.\n\n\
        Short one.\n";

    fn ingestor(max: usize) -> (Arc<SemanticIndex>, DocumentIngestor) {
        let index = Arc::new(SemanticIndex::new(64, None));
        let opts = IngestOptions {
            max_chunk_size: max,
            ..Default::default()
        };
        (Arc::clone(&index), DocumentIngestor::new(index, opts))
    }

    #[test]
    fn markdown_is_flattened() {
        let text = markdown_to_text(
            "# Title\n\nSome *em* and **strong** and `code`.\n\n\
             - item [link](http://x) ![alt text](img.png)\n\n<b>bold</b>\n\n```rust\nlet x = 1;\n```",
        );
        assert_eq!(
            text,
            "Title Some em and strong and code. item link alt text bold let x = 1;"
        );
    }

    #[test]
    fn underscores_inside_words_survive() {
        assert_eq!(markdown_to_text("call snake_case_name _now_"), "call snake_case_name now");
    }

    #[tokio::test]
    async fn short_chunks_are_skipped() {
        let (index, ingestor) = ingestor(80);
        let (added, skipped) = ingestor.ingest_text("guide.md", "guide.md", DOC).await.unwrap();
        // The last chunk, "See the book for more details. Short one.", is too short.
        assert_eq!((added, skipped), (3, 1));
        assert_eq!(index.len().await, 3);
        for chunk in index.chunks().await {
            assert!(chunk.content.chars().count() >= 50);
            assert_eq!(chunk.source, "guide.md");
            assert!(chunk.metadata.contains_key("chunk_index"));
        }
    }

    #[tokio::test]
    async fn directory_ingestion_reports_per_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), DOC).unwrap();
        std::fs::write(
            dir.path().join("b.txt"),
            "Plain text documents are accepted as well, as long as they are long enough.",
        )
        .unwrap();
        std::fs::write(dir.path().join("c.json"), "{}").unwrap();
        std::fs::write(dir.path().join("tiny.md"), "Too short.").unwrap();

        let (index, ingestor) = ingestor(1000);
        let report = ingestor.ingest_dir(dir.path()).await.unwrap();

        assert_eq!(report.documents, 3);
        assert!(report.failures.is_empty());
        assert_eq!(report.chunks, index.len().await);
        assert!(report.skipped >= 1);

        let sources: Vec<String> = index.chunks().await.iter().map(|c| c.source.clone()).collect();
        assert!(sources.contains(&"a.md".to_string()));
        assert!(sources.contains(&"b.txt".to_string()));
        assert!(!sources.contains(&"c.json".to_string()));
    }

    #[tokio::test]
    async fn unreadable_document_does_not_abort_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        std::fs::write(
            dir.path().join("good.md"),
            "This document is perfectly valid UTF-8 and long enough to be indexed.",
        )
        .unwrap();

        let (_, ingestor) = ingestor(1000);
        let report = ingestor.ingest_dir(dir.path()).await.unwrap();
        assert_eq!(report.documents, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("bad.md"));
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let (_, ingestor) = ingestor(1000);
        let err = ingestor
            .ingest_dir(Path::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::MissingDirectory(_)));
    }

    #[tokio::test]
    async fn a_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.md");
        std::fs::write(&file, DOC).unwrap();

        let (_, ingestor) = ingestor(1000);
        let err = ingestor.ingest_dir(&file).await.unwrap_err();
        assert!(matches!(err, IngestError::MissingDirectory(_)));
    }

    #[tokio::test]
    async fn subdirectories_are_not_descended() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("archive.md");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("inner.md"), DOC).unwrap();
        std::fs::write(dir.path().join("top.md"), DOC).unwrap();

        let (index, ingestor) = ingestor(1000);
        let report = ingestor.ingest_dir(dir.path()).await.unwrap();
        assert_eq!(report.documents, 1);
        assert!(report.failures.is_empty());
        assert!(index.chunks().await.iter().all(|c| c.source == "top.md"));
    }
}
