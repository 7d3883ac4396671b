//! Vector normalization and pgvector literal encoding.

use crate::error::{Error, Result};

/// L2-normalize a vector to unit Euclidean length.
///
/// Errors on a zero or non-finite norm instead of producing NaN
/// components; a degenerate embedding upstream is an embedding
/// failure, not a value.
pub fn l2_normalize(vector: Vec<f32>) -> Result<Vec<f32>> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();

    if norm == 0.0 || !norm.is_finite() {
        return Err(Error::Embedding(format!(
            "cannot normalize vector with norm {}",
            norm
        )));
    }

    Ok(vector.into_iter().map(|v| v / norm).collect())
}

/// Serialize a vector into the pgvector literal syntax:
/// `"[v1,v2,...,vn]"` with each component formatted to exactly six
/// decimal digits.
///
/// Deterministic and total over any finite-length input, including
/// empty. Assumes an already-normalized vector; no validation here.
pub fn encode_vector(vector: &[f32]) -> String {
    let components: Vec<String> = vector.iter().map(|v| format!("{:.6}", v)).collect();
    format!("[{}]", components.join(","))
}

/// Parse a pgvector literal back into components. Used by tests and
/// diagnostics; the search path only ever encodes.
pub fn decode_vector(literal: &str) -> Result<Vec<f32>> {
    let inner = literal
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| {
            Error::InvalidInput(format!("not a vector literal: {:.32}", literal))
        })?;

    if inner.is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| Error::InvalidInput(format!("bad vector component {:?}: {}", part, e)))
        })
        .collect()
}
