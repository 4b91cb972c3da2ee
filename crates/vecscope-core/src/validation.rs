//! Input checks shared by the index and the HTTP layer.
use crate::error::{Error, Result};

/// Rejects empty or whitespace-only query text.
pub fn validate_query(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::Validation("query must be a non-empty string".into()));
    }
    Ok(())
}

/// Validates a caller-supplied neighbour count before clamping.
pub fn neighbor_count(raw: i64) -> Result<usize> {
    if raw < 1 {
        return Err(Error::Validation(format!("n must be a positive integer, got {raw}")));
    }
    Ok(usize::try_from(raw).unwrap_or(usize::MAX))
}

/// Clamps a validated count to `[1, corpus_size]`.
pub fn clamp_count(k: usize, corpus_size: usize) -> usize {
    k.clamp(1, corpus_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_queries_are_rejected() {
        assert!(matches!(validate_query(""), Err(Error::Validation(_))));
        assert!(matches!(validate_query("   \n"), Err(Error::Validation(_))));
        assert!(validate_query("ok").is_ok());
    }

    #[test]
    fn non_positive_counts_are_rejected() {
        assert!(matches!(neighbor_count(0), Err(Error::Validation(_))));
        assert!(matches!(neighbor_count(-4), Err(Error::Validation(_))));
        assert_eq!(neighbor_count(7).expect("valid"), 7);
    }

    #[test]
    fn counts_clamp_to_corpus_size() {
        assert_eq!(clamp_count(500, 12), 12);
        assert_eq!(clamp_count(3, 12), 3);
    }
}
