use std::cmp::Ordering;

use vecscope_core::distance::{euclidean, similarity};
use vecscope_core::types::{Chunk, NeighborResult};

/// Exact k-nearest search by Euclidean distance over `chunks`.
///
/// Results are sorted by ascending distance with ties broken by ascending id,
/// so repeated calls return the same list. Returns `min(k, chunks.len())` hits.
pub fn nearest(chunks: &[Chunk], query: &[f32], k: usize) -> Vec<NeighborResult> {
    let k = k.min(chunks.len());
    if k == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(f32, usize)> = chunks.iter().enumerate().map(|(i, c)| (euclidean(query, &c.embedding), i)).collect();

    let order = |a: &(f32, usize), b: &(f32, usize)| -> Ordering {
        a.0.total_cmp(&b.0).then_with(|| chunks[a.1].id.cmp(&chunks[b.1].id))
    };
    if k < scored.len() {
        scored.select_nth_unstable_by(k - 1, order);
        scored.truncate(k);
    }
    scored.sort_by(order);

    scored
        .into_iter()
        .map(|(distance, i)| {
            let chunk = &chunks[i];
            NeighborResult {
                id: chunk.id,
                document: chunk.document.clone(),
                text: chunk.text.clone(),
                distance,
                similarity: similarity(distance),
                position: chunk.position.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: usize, embedding: Vec<f32>) -> Chunk {
        Chunk { id, document: format!("doc{id}"), text: format!("text {id}"), position: vec![id as f32, 0.0], embedding }
    }

    #[test]
    fn ties_break_by_id() {
        // Out of id order on purpose.
        let chunks = vec![chunk(3, vec![1.0, 0.0]), chunk(1, vec![0.0, 1.0]), chunk(2, vec![-1.0, 0.0])];
        let hits = nearest(&chunks, &[0.0, 0.0], 3);
        let ids: Vec<usize> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(hits.iter().all(|h| (h.distance - 1.0).abs() < 1e-6));
        assert!((hits[0].similarity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn partial_selection_matches_full_sort() {
        let chunks: Vec<Chunk> = (0..50).map(|i| chunk(i, vec![(i as f32 * 0.37).sin(), (i as f32 * 0.11).cos()])).collect();
        let all = nearest(&chunks, &[0.2, 0.1], 50);
        let top = nearest(&chunks, &[0.2, 0.1], 7);
        assert_eq!(&all[..7], &top[..]);
        assert!(all.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn hits_carry_position() {
        let chunks = vec![chunk(0, vec![1.0]), chunk(1, vec![5.0])];
        let hits = nearest(&chunks, &[4.0], 1);
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[0].position, vec![1.0, 0.0]);
    }
}
