//! Digest adapter: variable-length items to fixed-width keyed digests.

use std::fmt;

use psi_engine_api::{DigestFn, EngineModule, Export, Ptr, symbols};

use crate::bind;
use crate::error::HarnessError;
use crate::marshal::ForeignBuf;

/// Digest width in bytes. Fixed by the engine contract.
pub const DIGEST_LEN: usize = 16;

/// Fixed-width keyed digest of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Adapter over the engine's keyed digest export.
///
/// Binds the entry point at construction, so a missing digest capability
/// is reported before any batch work begins rather than midway through.
pub struct DigestAdapter<'m, M: EngineModule> {
    module: &'m M,
    digest: DigestFn,
}

impl<'m, M: EngineModule> DigestAdapter<'m, M> {
    /// Resolves the digest entry point, failing fast if it is missing.
    pub fn bind(module: &'m M) -> Result<Self, HarnessError> {
        match bind::resolve(module, symbols::DIGEST)? {
            Export::Digest(digest) => Ok(DigestAdapter { module, digest }),
            _ => Err(HarnessError::WrongSignature {
                symbol: symbols::DIGEST,
            }),
        }
    }

    /// Digests one item.
    ///
    /// An empty item crosses the boundary as a null pointer with zero
    /// length; no input buffer is allocated for it.
    pub fn digest(&self, data: &[u8]) -> Result<Digest, HarnessError> {
        let input = if data.is_empty() {
            None
        } else {
            Some(ForeignBuf::copy_in(self.module, data)?)
        };
        let out = ForeignBuf::zeroed(self.module, DIGEST_LEN)?;

        let input_ptr = input.as_ref().map_or(Ptr::NULL, |buf| buf.ptr());
        (self.digest)(input_ptr, data.len(), out.ptr());

        let mut bytes = [0u8; DIGEST_LEN];
        out.read_into(&mut bytes)?;
        Ok(Digest(bytes))
    }

    /// Digests the first `count` of `items` into one packed batch of
    /// `count * DIGEST_LEN` bytes, gap-free and in order.
    pub fn digest_batch(&self, items: &[String], count: usize) -> Result<Vec<u8>, HarnessError> {
        let mut flat = Vec::with_capacity(count * DIGEST_LEN);
        for item in &items[..count] {
            flat.extend_from_slice(&self.digest(item.as_bytes())?.0);
        }
        Ok(flat)
    }
}

impl<M: EngineModule> fmt::Debug for DigestAdapter<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestAdapter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use psi_engine_native::NativeEngine;

    use super::*;

    #[test]
    fn digest_is_deterministic_and_leak_free() {
        let engine = NativeEngine::new();
        let adapter = DigestAdapter::bind(&engine).unwrap();

        let a = adapter.digest(b"alice@example.com").unwrap();
        let b = adapter.digest(b"alice@example.com").unwrap();
        assert_eq!(a, b);
        assert_eq!(engine.live_allocations(), 0);
    }

    #[test]
    fn empty_item_digests_without_input_buffer() {
        let engine = NativeEngine::new();
        let adapter = DigestAdapter::bind(&engine).unwrap();

        let a = adapter.digest(b"").unwrap();
        let b = adapter.digest(b"").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, adapter.digest(b"x").unwrap());
        assert_eq!(engine.live_allocations(), 0);
    }

    #[test]
    fn batch_is_packed_in_item_order() {
        let engine = NativeEngine::new();
        let adapter = DigestAdapter::bind(&engine).unwrap();

        let items = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        let flat = adapter.digest_batch(&items, 2).unwrap();
        assert_eq!(flat.len(), 2 * DIGEST_LEN);
        assert_eq!(flat[..DIGEST_LEN], adapter.digest(b"x").unwrap().0);
        assert_eq!(flat[DIGEST_LEN..], adapter.digest(b"y").unwrap().0);
    }
}
