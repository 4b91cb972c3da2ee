use std::collections::HashSet;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

use vecscope_core::data_processor::{chunk_text, ChunkingConfig, Corpus, DataProcessor};
use vecscope_core::types::Document;

/// Undo the window overlap: keep the first chunk whole, drop the first
/// `overlap` characters of every later chunk.
fn reassemble(chunks: &[String], overlap: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 { out.push_str(chunk); } else { out.extend(chunk.chars().skip(overlap)); }
    }
    out
}

#[test]
fn chunks_reassemble_to_original_text() {
    let texts = [
        "a",
        "short",
        "The quick brown fox jumps over the lazy dog and keeps running far away.",
        "Température moyenne: 1.1°C — Ωmega ünïcödé text to make sure windows cut on chars.",
    ];
    for (size, overlap) in [(1, 0), (4, 1), (7, 3), (10, 0), (16, 15), (200, 50)] {
        let cfg = ChunkingConfig::new(size, overlap).expect("config");
        for text in texts {
            let chunks = chunk_text(text, &cfg);
            assert!(!chunks.is_empty(), "non-empty text yields chunks");
            for c in &chunks {
                assert!(!c.is_empty(), "no empty chunk");
                assert!(c.chars().count() <= size, "chunk longer than window: {c:?}");
            }
            assert_eq!(reassemble(&chunks, overlap), text, "size={size} overlap={overlap}");
        }
    }
}

#[test]
fn chunking_is_deterministic() {
    let cfg = ChunkingConfig::default();
    let text = "lorem ipsum ".repeat(100);
    assert_eq!(chunk_text(&text, &cfg), chunk_text(&text, &cfg));
}

#[test]
fn processor_assigns_sequential_ids_across_documents() {
    let corpus = Corpus::from_documents(vec![
        Document::new("a", "alpha ".repeat(60)),
        Document::new("empty", "   \n\t "),
        Document::new("b", "bravo ".repeat(60)),
    ]);
    let records = DataProcessor::new(ChunkingConfig::new(100, 20).expect("config")).process(&corpus);

    let ids: Vec<usize> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, (0..records.len()).collect::<Vec<_>>());
    assert!(records.iter().all(|r| r.document != "empty"), "blank documents are skipped");
    assert_eq!(records[0].document, "a");
    assert_eq!(records.last().map(|r| r.document.as_str()), Some("b"));
    let b_indices: Vec<usize> = records.iter().filter(|r| r.document == "b").map(|r| r.chunk_index).collect();
    assert_eq!(b_indices, (0..b_indices.len()).collect::<Vec<_>>());
}

#[test]
fn sample_corpus_covers_five_documents() {
    let records = DataProcessor::default().process(&Corpus::sample());
    let docs: HashSet<&str> = records.iter().map(|r| r.document.as_str()).collect();
    assert_eq!(docs.len(), 5);
    assert!(records.len() > 20, "sample corpus should chunk into dozens of pieces, got {}", records.len());
    assert!(records.iter().all(|r| r.text.chars().count() <= 200));
}

#[test]
fn from_dir_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let mut f = fs::File::create(dir.join("notes.txt")).unwrap();
    writeln!(f, "Short text").unwrap();
    fs::write(dir.join("ignored.md"), "not a txt file").unwrap();

    let corpus = Corpus::from_dir(dir).expect("load");
    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus.documents()[0].name, "notes");

    let records = DataProcessor::default().process(&corpus);
    assert_eq!(records.len(), 1, "one small file becomes one chunk");
    assert_eq!(records[0].text, "Short text");
}

#[test]
fn from_dir_walks_subdirectories_in_path_order() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("b.txt"), "bravo").unwrap();
    fs::write(dir.join("a.txt"), "alpha").unwrap();
    fs::write(dir.join("nested/c.txt"), "charlie").unwrap();

    let corpus = Corpus::from_dir(dir).expect("load");
    let names: Vec<&str> = corpus.documents().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn from_dir_missing_directory_is_an_error() {
    let tmp = TempDir::new().unwrap();
    assert!(Corpus::from_dir(&tmp.path().join("nope")).is_err());
}
