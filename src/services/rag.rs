use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value as _, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, TantivyDocument};

use crate::models::AnswerResponse;
use crate::services::ai::{ask, LlmProvider};

pub const CHUNK_SIZE: usize = 500;
pub const CHUNK_OVERLAP: usize = 50;
pub const TOP_K: usize = 10;
pub const MAX_CHUNKS_PER_SOURCE: usize = 5;

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

const RAG_PROMPT: &str = r#"You are an expert medical AI assistant. Use the provided context and your own knowledge to answer the question in a clear, concise, and professional manner. Remember, always answer in Bahasa Indonesia.

### Instructions:
1. First, prioritize using the context to provide the answer.
2. If additional information is needed, supplement your response with your own knowledge (use Bahasa Indonesia).
3. If the context does not answer the question and you rely solely on your own knowledge, clearly state that no external sources were used (use Bahasa Indonesia).

### Context:
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub source: String,
    pub text: String,
}

/// In-memory full-text index over the hospital's reference documents.
///
/// Built once at startup and shared read-only between requests.
pub struct KnowledgeBase {
    index: Index,
    reader: IndexReader,
    text_field: Field,
    source_field: Field,
    chunks: usize,
}

impl KnowledgeBase {
    /// Loads every `.pdf`, `.txt` and `.md` file directly under `dir`.
    ///
    /// A missing directory yields an empty knowledge base. A PDF whose text
    /// cannot be extracted is skipped with a warning.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        if !dir.exists() {
            tracing::warn!(
                dir = %dir.display(),
                "documents directory not found, RAG context will be empty"
            );
            return Self::empty();
        }

        let mut paths: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("failed to read documents directory: {}", dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "pdf" || ext == "txt" || ext == "md")
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = if path.extension().is_some_and(|ext| ext == "pdf") {
                match read_pdf(&path) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable PDF");
                        continue;
                    }
                }
            } else {
                fs::read_to_string(&path)
                    .with_context(|| format!("failed to read document: {}", path.display()))?
            };
            documents.push((path.display().to_string(), text));
        }

        let kb = Self::from_documents(documents)?;
        tracing::info!(chunks = kb.len(), "knowledge base loaded");
        Ok(kb)
    }

    pub fn empty() -> anyhow::Result<Self> {
        Self::from_documents(Vec::new())
    }

    /// Chunks `(source, text)` pairs and indexes every chunk.
    pub fn from_documents(documents: Vec<(String, String)>) -> anyhow::Result<Self> {
        let mut builder = Schema::builder();
        let text_field = builder.add_text_field("text", TEXT | STORED);
        let source_field = builder.add_text_field("source", STRING | STORED);
        let index = Index::create_in_ram(builder.build());

        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_MEMORY_BUDGET)
            .context("failed to create search index writer")?;
        let mut chunks = 0;
        for (source, text) in documents {
            for piece in split_text(&text, CHUNK_SIZE, CHUNK_OVERLAP) {
                writer.add_document(doc!(
                    text_field => piece,
                    source_field => source.as_str(),
                ))?;
                chunks += 1;
            }
        }
        writer.commit().context("failed to commit search index")?;

        let reader = index
            .reader()
            .context("failed to open search index reader")?;

        Ok(Self {
            index,
            reader,
            text_field,
            source_field,
            chunks,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }

    /// Top [`TOP_K`] chunks by BM25 relevance to `query`, then at most
    /// [`MAX_CHUNKS_PER_SOURCE`] of them from any single document.
    pub fn retrieve(&self, query: &str) -> anyhow::Result<Vec<Chunk>> {
        // Bare lower-case terms only, so user punctuation and words like
        // AND/OR never reach the query grammar.
        let terms: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() || self.is_empty() {
            return Ok(Vec::new());
        }

        let parser = QueryParser::for_index(&self.index, vec![self.text_field]);
        let parsed = parser
            .parse_query(&terms.join(" "))
            .context("failed to parse search query")?;

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(TOP_K))?;

        let mut per_source: HashMap<String, usize> = HashMap::new();
        let mut results = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let field = |f: Field| {
                doc.get_first(f)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            let chunk = Chunk {
                source: field(self.source_field),
                text: field(self.text_field),
            };

            let seen = per_source.entry(chunk.source.clone()).or_insert(0);
            *seen += 1;
            if *seen <= MAX_CHUNKS_PER_SOURCE {
                results.push(chunk);
            }
        }

        Ok(results)
    }
}

/// Answers `query` from retrieved context plus the model's own knowledge.
pub async fn answer(
    llm: &dyn LlmProvider,
    kb: &KnowledgeBase,
    query: &str,
) -> anyhow::Result<AnswerResponse> {
    let retrieved = kb.retrieve(query)?;
    tracing::info!(chunks = retrieved.len(), "retrieved context");

    let context = retrieved
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let system = format!("{RAG_PROMPT}{context}\n");

    let response = ask(llm, &system, query).await?;
    Ok(AnswerResponse { response })
}

fn read_pdf(path: &Path) -> anyhow::Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read PDF: {}", path.display()))?;
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| anyhow::anyhow!("failed to extract text from {}: {e}", path.display()))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Splits `text` into windows of at most `chunk_size` bytes that overlap by
/// roughly `overlap` bytes, preferring paragraph, sentence, then word breaks.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = snap_to_char_boundary(text, start + chunk_size);
        if end <= start {
            end = next_char_boundary(text, start);
        }
        if end < text.len() {
            end = find_break_point(text, start, end);
        }

        let piece = text[start..end].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        if end >= text.len() {
            break;
        }

        let step = if end - start > overlap {
            end - start - overlap
        } else {
            end - start
        };
        start = snap_to_char_boundary(text, start + step).max(next_char_boundary(text, start));
    }

    chunks
}

fn find_break_point(text: &str, start: usize, preferred_end: usize) -> usize {
    let search_start = snap_to_char_boundary(text, preferred_end.saturating_sub(200).max(start));
    if search_start >= preferred_end {
        return preferred_end;
    }
    let region = &text[search_start..preferred_end];

    // Priority: paragraph break > sentence end > line break > word break
    if let Some(pos) = region.rfind("\n\n") {
        return search_start + pos + 2;
    }
    if let Some(pos) = region.rfind(". ") {
        return search_start + pos + 2;
    }
    if let Some(pos) = region.rfind('\n') {
        return search_start + pos + 1;
    }
    if let Some(pos) = region.rfind(' ') {
        return search_start + pos + 1;
    }
    preferred_end
}

fn snap_to_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = (pos + 1).min(text.len());
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}
