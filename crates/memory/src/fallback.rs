//! Deterministic fallback embeddings.
//!
//! Used when the embedding backend is absent or failing. Each lower-cased
//! alphanumeric token is hashed with SHA-256 into one of `dimension`
//! buckets with a signed weight; the result is L2-normalized. Texts that
//! share words therefore land near each other, which keeps lexical
//! retrieval working while the backend is down.

use sha2::{Digest, Sha256};

/// Produce a unit-length vector of `dimension` floats derived from `text`.
///
/// `dimension` must be non-zero. A text with no tokens hashes as a whole;
/// the empty string maps to the zero vector.
pub fn fallback_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimension];
    if dimension == 0 {
        return vector;
    }

    let lowered = text.to_lowercase();
    let mut tokens = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .peekable();

    if tokens.peek().is_none() {
        if !text.is_empty() {
            accumulate(&mut vector, text);
        }
    } else {
        for token in tokens {
            accumulate(&mut vector, token);
        }
    }

    normalize(&mut vector);
    vector
}

fn accumulate(vector: &mut [f32], token: &str) {
    let digest = Sha256::digest(token.as_bytes());
    let mut bucket_bytes = [0u8; 8];
    bucket_bytes.copy_from_slice(&digest[..8]);
    let bucket = (u64::from_le_bytes(bucket_bytes) % vector.len() as u64) as usize;
    let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
    vector[bucket] += sign;
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
