//! Fixed-width bag-of-words vectorization.
//!
//! Every text maps to exactly [`VECTOR_SIZE`] token counts. There is no
//! persistent vocabulary: counts are written out in whatever order the
//! token-count map exposes for that call, so the same word can land at
//! different positions across different inputs. This is preserved observed
//! behavior and a known reproducibility caveat; callers that need stable
//! cross-call features must build a fixed vocabulary table upstream.

use ahash::AHashMap;

/// Fixed feature-vector width.
pub const VECTOR_SIZE: usize = 50;

/// Tokens this short carry too little signal and are discarded.
const MIN_TOKEN_CHARS: usize = 3;

/// Vectorize `text` into exactly [`VECTOR_SIZE`] non-negative counts.
///
/// Lowercases, strips everything that is neither a word character nor
/// whitespace, splits on whitespace, drops tokens shorter than three
/// characters, and counts the rest. Distinct tokens beyond the first
/// [`VECTOR_SIZE`] are silently dropped; unused trailing positions stay 0.
/// Total: never fails, empty text yields the zero vector.
pub fn vectorize(text: &str) -> Vec<u32> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    let mut counts: AHashMap<&str, u32> = AHashMap::new();
    for token in cleaned.split_whitespace() {
        if token.chars().count() >= MIN_TOKEN_CHARS {
            *counts.entry(token).or_insert(0) += 1;
        }
    }

    let mut vector = vec![0u32; VECTOR_SIZE];
    for (slot, (_, count)) in vector.iter_mut().zip(counts.into_iter()) {
        *slot = count;
    }
    vector
}

/// Vectorize into `f64` network inputs.
pub fn vectorize_f64(text: &str) -> Vec<f64> {
    vectorize(text).into_iter().map(f64::from).collect()
}
