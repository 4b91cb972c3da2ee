//! Domain types shared by the preprocessor, the retrieval index and the
//! HTTP layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type ChunkId = usize;

/// A named source document. The name is the grouping key carried by every
/// chunk cut from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }
}

/// Output of the preprocessor, before any embedding has happened.
///
/// - `id`: corpus-wide sequential id, stable for the process lifetime
/// - `document`: name of the parent document
/// - `chunk_index`: position of the chunk inside its document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: ChunkId,
    pub document: String,
    pub text: String,
    pub chunk_index: usize,
}

/// A fully loaded chunk: text, display coordinates and the full-dimension
/// embedding. Immutable once the index is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document: String,
    pub text: String,
    pub position: Vec<f32>,
    pub embedding: Vec<f32>,
}

/// Wire view of a chunk. Embeddings never leave the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPoint {
    pub id: ChunkId,
    pub document: String,
    pub text: String,
    pub position: Vec<f32>,
}

impl From<&Chunk> for ChunkPoint {
    fn from(chunk: &Chunk) -> Self {
        Self {
            id: chunk.id,
            document: chunk.document.clone(),
            text: chunk.text.clone(),
            position: chunk.position.clone(),
        }
    }
}

/// A query placed into display space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryProjection {
    pub text: String,
    pub position: Vec<f32>,
    #[serde(skip_serializing, default)]
    pub embedding: Vec<f32>,
}

/// One ranked hit. `distance` is measured in the original embedding space;
/// `similarity` is a display-only transform of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborResult {
    pub id: ChunkId,
    pub document: String,
    pub text: String,
    pub distance: f32,
    pub similarity: f32,
    pub position: Vec<f32>,
}

/// Which reduction strategy lays out the display space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionMethod {
    Pca,
    #[default]
    Umap,
}

impl ReductionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ReductionMethod::Pca => "pca",
            ReductionMethod::Umap => "umap",
        }
    }
}

impl fmt::Display for ReductionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReductionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pca" => Ok(ReductionMethod::Pca),
            "umap" => Ok(ReductionMethod::Umap),
            other => Err(Error::InvalidConfig(format!("unknown reduction method '{other}' (expected pca or umap)"))),
        }
    }
}
