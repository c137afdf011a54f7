//! Symbol-to-vector encoding.
//!
//! Maps symbols into hypervector space using deterministic seeded random
//! generation, ensuring the same symbol always maps to the same vector.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;

use crate::symbol::SymbolId;

use super::HyperVec;
use super::ops::{VsaOps, VsaResult};

/// Encode a symbol ID into a hypervector using deterministic seeded randomness.
///
/// The same `SymbolId` always produces the same `HyperVec`, regardless of
/// when or where it's computed. The seed is derived from the symbol's raw ID.
pub fn encode_symbol(ops: &VsaOps, symbol: SymbolId) -> HyperVec {
    let mut rng = rand::rngs::StdRng::seed_from_u64(symbol.get());
    ops.random(&mut rng)
}

/// Encode a sequence of symbols as a permutation-bound chain.
///
/// This captures order information: `encode_sequence([A, B, C])` produces
/// `permute(A, 2) ⊕ permute(B, 1) ⊕ C` — each element is permuted by its
/// distance from the end of the sequence.
pub fn encode_sequence(ops: &VsaOps, symbols: &[SymbolId]) -> Option<HyperVec> {
    if symbols.is_empty() {
        return None;
    }
    let n = symbols.len();
    let vecs: Vec<HyperVec> = symbols
        .iter()
        .enumerate()
        .map(|(i, &sym)| {
            let base = encode_symbol(ops, sym);
            let shift = n - 1 - i;
            if shift > 0 {
                ops.permute(&base, shift)
            } else {
                base
            }
        })
        .collect();

    let refs: Vec<&HyperVec> = vecs.iter().collect();
    ops.bundle(&refs).ok()
}

/// Encode a role-filler pair: `bind(role_vec, filler_vec)`.
///
/// This is the standard VSA pattern for structured knowledge:
/// "color" ⊗ "blue" represents "the color is blue".
pub fn encode_role_filler(
    ops: &VsaOps,
    role: SymbolId,
    filler: SymbolId,
) -> Result<HyperVec, crate::error::VsaError> {
    let role_vec = encode_symbol(ops, role);
    let filler_vec = encode_symbol(ops, filler);
    ops.bind(&role_vec, &filler_vec)
}

/// Create a synthetic [`SymbolId`] from a text token by hashing it.
///
/// Uses the high-bit convention (`hash | (1<<63)`) to avoid collisions
/// with real allocated SymbolIds. The same token always produces the
/// same synthetic ID.
fn synthetic_id_from_token(token: &str) -> SymbolId {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    let hash = hasher.finish();
    SymbolId::new(hash | (1u64 << 63)).expect("non-zero hash with high bit set")
}

/// Encode a single word token into a hypervector.
///
/// Hashes the token into a synthetic [`SymbolId`] and encodes it
/// deterministically. The same token always produces the same vector.
pub fn encode_token(ops: &VsaOps, token: &str) -> HyperVec {
    let id = synthetic_id_from_token(token);
    encode_symbol(ops, id)
}

/// Encode a multi-word label into a hypervector.
///
/// Splits the label on whitespace, encodes each word via [`encode_token`],
/// and bundles them into a single vector. Single-word labels fall through
/// to `encode_token` directly.
///
/// Returns an error if the label is empty (no words to encode).
pub fn encode_label(ops: &VsaOps, label: &str) -> VsaResult<HyperVec> {
    let words: Vec<&str> = label.split_whitespace().collect();

    if words.is_empty() {
        return Err(crate::error::VsaError::EmptyBundle);
    }

    if words.len() == 1 {
        return Ok(encode_token(ops, words[0]));
    }

    let vecs: Vec<HyperVec> = words.iter().map(|w| encode_token(ops, w)).collect();
    let refs: Vec<&HyperVec> = vecs.iter().collect();
    ops.bundle(&refs)
}
