//! Corpus loading and the sliding-window chunker.
//!
//! Chunking is a pure function of `(text, chunk_size, overlap)`: a window of
//! `chunk_size` characters advances by `chunk_size - overlap` until the text
//! is exhausted. The last chunk may be shorter; no chunk is ever empty.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::sample_corpus::SAMPLE_DOCUMENTS;
use crate::types::{ChunkRecord, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    /// `chunk_size` and `overlap` are measured in characters; requires `0 <= overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than zero".into()));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize { self.chunk_size }

    pub fn overlap(&self) -> usize { self.overlap }

    pub fn step(&self) -> usize { self.chunk_size - self.overlap }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 200, overlap: 50 }
    }
}

/// Splits `text` into overlapping character windows.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    // Byte offset of every char start, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let n_chars = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < n_chars {
        let end = (start + config.chunk_size).min(n_chars);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == n_chars {
            break;
        }
        start += config.step();
    }
    chunks
}

/// Collapses whitespace runs to a single space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// An ordered set of source documents.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// The five-topic demo corpus compiled into the binary.
    pub fn sample() -> Self {
        Self::from_documents(SAMPLE_DOCUMENTS.iter().map(|(name, text)| Document::new(*name, *text)).collect())
    }

    /// Loads every `.txt` file under `dir`, sorted by path. The document name is the file stem.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::InvalidConfig(format!("corpus directory {} does not exist", dir.display())));
        }
        let files = list_txt_files(dir);
        if files.is_empty() {
            warn!(dir = %dir.display(), "no .txt files found");
        }
        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            debug!(file = %path.display(), "reading document");
            documents.push(Document::new(document_name(path), read_file_content(path)?));
        }
        Ok(Self { documents })
    }

    pub fn documents(&self) -> &[Document] { &self.documents }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}

#[derive(Debug, Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    pub fn chunking_config(&self) -> &ChunkingConfig { &self.chunking_config }

    /// Chunks every document in corpus order. Ids run sequentially across documents.
    pub fn process(&self, corpus: &Corpus) -> Vec<ChunkRecord> {
        let mut records = Vec::new();
        for document in corpus.documents() {
            let text = normalize_whitespace(&document.text);
            if text.is_empty() {
                warn!(document = %document.name, "skipping empty document");
                continue;
            }
            let chunks = chunk_text(&text, &self.chunking_config);
            debug!(document = %document.name, chunks = chunks.len(), "chunked document");
            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                records.push(ChunkRecord { id: records.len(), document: document.name.clone(), text: chunk, chunk_index });
            }
        }
        info!(documents = corpus.len(), chunks = records.len(), "processed corpus");
        records
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn document_name(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map_or_else(|| file_path.to_string_lossy().to_string(), |s| s.to_string_lossy().to_string())
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    txt_files.sort();
    txt_files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(ChunkingConfig::new(10, 10).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(10, 9).is_ok());
    }

    #[test]
    fn window_advances_by_step() {
        let cfg = ChunkingConfig::new(4, 1).expect("config");
        assert_eq!(chunk_text("abcdefghij", &cfg), vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn last_chunk_may_be_short() {
        let cfg = ChunkingConfig::new(4, 0).expect("config");
        assert_eq!(chunk_text("abcdefghij", &cfg), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(normalize_whitespace("  a \n\n b\tc  "), "a b c");
    }
}
