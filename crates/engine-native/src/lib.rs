//! In-process PSI comparison engine.
//!
//! Implements the full [`EngineModule`] export surface against a private
//! linear memory: the keyed digest export, context management, and two
//! independently implemented equality computes (naive pairwise and
//! branchless data-independent). Not `Sync`; drive one run at a time and
//! reuse the module across sequential runs.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use psi_engine_api::{CtxHandle, EngineModule, Export, MemoryError, Ptr, symbols};

mod compute;
mod digest;
mod memory;

pub use digest::{DIGEST_KEY, DIGEST_LEN, keyed_digest};

use compute::{
    STATUS_BAD_ARG, STATUS_MEMORY_FAULT, STATUS_OVER_CAPACITY, baseline_mask, oblivious_mask,
};
use memory::LinearMemory;

/// Comparison context: capacity and per-record width fixed at creation.
#[derive(Debug, Clone, Copy)]
struct EqContext {
    max_elems: usize,
    elem_bits: usize,
}

#[derive(Debug)]
struct Inner {
    memory: RefCell<LinearMemory>,
    contexts: RefCell<HashMap<u32, EqContext>>,
    next_handle: Cell<u32>,
}

#[derive(Debug, Clone, Copy)]
enum Variant {
    Baseline,
    Oblivious,
}

/// The in-process engine module.
///
/// Cheap to clone the inner state into export closures; the module itself
/// is constructed once by the caller and injected into each harness run.
#[derive(Debug)]
pub struct NativeEngine {
    inner: Rc<Inner>,
}

impl NativeEngine {
    /// Creates a fresh engine module with empty linear memory.
    pub fn new() -> Self {
        NativeEngine {
            inner: Rc::new(Inner {
                memory: RefCell::new(LinearMemory::new()),
                contexts: RefCell::new(HashMap::new()),
                next_handle: Cell::new(1),
            }),
        }
    }

    /// Number of linear-memory allocations not yet released.
    pub fn live_allocations(&self) -> usize {
        self.inner.memory.borrow().live_count()
    }

    /// Number of contexts created but not yet destroyed.
    pub fn live_contexts(&self) -> usize {
        self.inner.contexts.borrow().len()
    }

    fn resolve_symbol(&self, name: &str) -> Option<Export> {
        let inner = Rc::clone(&self.inner);
        match name {
            symbols::DIGEST => Some(Export::Digest(Rc::new(move |data, len, out| {
                run_digest(&inner, data, len, out);
            }))),
            symbols::CREATE => Some(Export::Create(Rc::new(move |count, elem_bits| {
                run_create(&inner, count, elem_bits)
            }))),
            symbols::DESTROY => Some(Export::Destroy(Rc::new(move |ctx| {
                inner.contexts.borrow_mut().remove(&ctx.raw());
            }))),
            symbols::PREPARE => Some(Export::Prepare(Rc::new(move |ctx| {
                if inner.contexts.borrow().contains_key(&ctx.raw()) {
                    0
                } else {
                    STATUS_BAD_ARG
                }
            }))),
            symbols::COMPUTE_BASELINE => Some(Export::Compute(Rc::new(
                move |ctx, a, b, count, out| {
                    run_compute(&inner, Variant::Baseline, ctx, a, b, count, out)
                },
            ))),
            symbols::COMPUTE_OBLIVIOUS => Some(Export::Compute(Rc::new(
                move |ctx, a, b, count, out| {
                    run_compute(&inner, Variant::Oblivious, ctx, a, b, count, out)
                },
            ))),
            _ => None,
        }
    }
}

impl Default for NativeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineModule for NativeEngine {
    fn raw_export(&self, name: &str) -> Option<Export> {
        self.resolve_symbol(name)
    }

    fn wrap_export(&self, name: &str) -> Option<Export> {
        // The native module's wrapper surface mirrors the raw table; the
        // split matters for modules whose raw table is partial.
        self.resolve_symbol(name)
    }

    fn alloc(&self, len: usize) -> Result<Ptr, MemoryError> {
        self.inner.memory.borrow_mut().alloc(len)
    }

    fn free(&self, ptr: Ptr) -> Result<(), MemoryError> {
        self.inner.memory.borrow_mut().free(ptr)
    }

    fn store(&self, ptr: Ptr, bytes: &[u8]) -> Result<(), MemoryError> {
        self.inner.memory.borrow_mut().store(ptr, bytes)
    }

    fn load(&self, ptr: Ptr, out: &mut [u8]) -> Result<(), MemoryError> {
        self.inner.memory.borrow().load(ptr, out)
    }
}

/// Digest export body. The export has a void signature; on a memory fault
/// the output region is left untouched.
fn run_digest(inner: &Inner, data: Ptr, len: usize, out: Ptr) {
    let mut input = vec![0u8; len];
    if len > 0 && inner.memory.borrow().load(data, &mut input).is_err() {
        return;
    }
    let digest = keyed_digest(&input);
    let _ = inner.memory.borrow_mut().store(out, &digest);
}

fn run_create(inner: &Inner, count: usize, elem_bits: usize) -> CtxHandle {
    if count == 0 || elem_bits == 0 {
        return CtxHandle::NULL;
    }
    let handle = inner.next_handle.get();
    inner.next_handle.set(handle + 1);
    inner.contexts.borrow_mut().insert(
        handle,
        EqContext {
            max_elems: count,
            elem_bits,
        },
    );
    CtxHandle::from_raw(handle)
}

fn run_compute(
    inner: &Inner,
    variant: Variant,
    ctx: CtxHandle,
    a: Ptr,
    b: Ptr,
    count: usize,
    out: Ptr,
) -> i32 {
    let Some(EqContext {
        max_elems,
        elem_bits,
    }) = inner.contexts.borrow().get(&ctx.raw()).copied()
    else {
        return STATUS_BAD_ARG;
    };
    if a.is_null() || b.is_null() || out.is_null() {
        return STATUS_BAD_ARG;
    }
    if count == 0 {
        return 0;
    }
    if count > max_elems {
        return STATUS_OVER_CAPACITY;
    }

    let elem_bytes = elem_bits.div_ceil(8);
    let mut recs_a = vec![0u8; count * elem_bytes];
    let mut recs_b = vec![0u8; count * elem_bytes];
    {
        let mem = inner.memory.borrow();
        if mem.load(a, &mut recs_a).is_err() || mem.load(b, &mut recs_b).is_err() {
            return STATUS_MEMORY_FAULT;
        }
    }

    let mask = match variant {
        Variant::Baseline => baseline_mask(&recs_a, &recs_b, count, elem_bytes),
        Variant::Oblivious => oblivious_mask(&recs_a, &recs_b, count, elem_bytes),
    };
    match inner.memory.borrow_mut().store(out, &mask) {
        Ok(()) => 0,
        Err(_) => STATUS_MEMORY_FAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn bind_compute(engine: &NativeEngine, name: &str) -> psi_engine_api::ComputeFn {
        match engine.raw_export(name) {
            Some(Export::Compute(f)) => f,
            other => panic!("expected compute export for {name}, got {other:?}"),
        }
    }

    fn bind_create(engine: &NativeEngine) -> psi_engine_api::CreateFn {
        match engine.raw_export(symbols::CREATE) {
            Some(Export::Create(f)) => f,
            other => panic!("expected create export, got {other:?}"),
        }
    }

    /// Digests `items` through the digest export, returning the packed batch.
    fn digest_batch(engine: &NativeEngine, items: &[&[u8]]) -> Vec<u8> {
        let Some(Export::Digest(digest)) = engine.raw_export(symbols::DIGEST) else {
            panic!("digest export missing");
        };
        let mut flat = Vec::with_capacity(items.len() * DIGEST_LEN);
        for item in items {
            let data = if item.is_empty() {
                Ptr::NULL
            } else {
                let ptr = engine.alloc(item.len()).unwrap();
                engine.store(ptr, item).unwrap();
                ptr
            };
            let out = engine.alloc(DIGEST_LEN).unwrap();
            digest(data, item.len(), out);

            let mut buf = [0u8; DIGEST_LEN];
            engine.load(out, &mut buf).unwrap();
            flat.extend_from_slice(&buf);

            engine.free(out).unwrap();
            if !data.is_null() {
                engine.free(data).unwrap();
            }
        }
        flat
    }

    #[test]
    fn exports_cover_the_full_surface() {
        let engine = NativeEngine::new();
        for name in [
            symbols::DIGEST,
            symbols::CREATE,
            symbols::DESTROY,
            symbols::PREPARE,
            symbols::COMPUTE_BASELINE,
            symbols::COMPUTE_OBLIVIOUS,
        ] {
            assert!(engine.raw_export(name).is_some(), "missing {name}");
            assert!(engine.wrap_export(name).is_some(), "missing wrapped {name}");
        }
        assert!(engine.raw_export("psi_gc_frobnicate").is_none());
    }

    #[test]
    fn create_rejects_zero_dimensions() {
        let engine = NativeEngine::new();
        let create = bind_create(&engine);
        assert!(create(0, 128).is_null());
        assert!(create(4, 0).is_null());
        assert_eq!(engine.live_contexts(), 0);
    }

    #[test]
    fn both_variants_agree_end_to_end() {
        let engine = NativeEngine::new();
        let items_a: Vec<&[u8]> = vec![b"x", b"y", b"z", b""];
        let items_b: Vec<&[u8]> = vec![b"z", b"q", b"x", b""];
        let count = 4;

        let flat_a = digest_batch(&engine, &items_a);
        let flat_b = digest_batch(&engine, &items_b);

        let buf_a = engine.alloc(flat_a.len()).unwrap();
        let buf_b = engine.alloc(flat_b.len()).unwrap();
        engine.store(buf_a, &flat_a).unwrap();
        engine.store(buf_b, &flat_b).unwrap();
        let mask_base = engine.alloc(count).unwrap();
        let mask_obliv = engine.alloc(count).unwrap();

        let create = bind_create(&engine);
        let ctx = create(count, DIGEST_LEN * 8);
        assert!(!ctx.is_null());

        let baseline = bind_compute(&engine, symbols::COMPUTE_BASELINE);
        let oblivious = bind_compute(&engine, symbols::COMPUTE_OBLIVIOUS);
        assert_eq!(baseline(ctx, buf_a, buf_b, count, mask_base), 0);
        assert_eq!(oblivious(ctx, buf_a, buf_b, count, mask_obliv), 0);

        let mut got_base = vec![0u8; count];
        let mut got_obliv = vec![0u8; count];
        engine.load(mask_base, &mut got_base).unwrap();
        engine.load(mask_obliv, &mut got_obliv).unwrap();

        // "x" and "z" are shared (out of order); "" matches "".
        assert_eq!(got_base, vec![1, 0, 1, 1]);
        assert_eq!(got_base, got_obliv);

        let Some(Export::Destroy(destroy)) = engine.raw_export(symbols::DESTROY) else {
            panic!("destroy export missing");
        };
        destroy(ctx);
        for ptr in [buf_a, buf_b, mask_base, mask_obliv] {
            engine.free(ptr).unwrap();
        }
        assert_eq!(engine.live_allocations(), 0);
        assert_eq!(engine.live_contexts(), 0);
    }

    #[test]
    fn compute_status_codes_match_the_contract() {
        let engine = NativeEngine::new();
        let create = bind_create(&engine);
        let compute = bind_compute(&engine, symbols::COMPUTE_BASELINE);

        let buf = engine.alloc(DIGEST_LEN).unwrap();
        let mask = engine.alloc(1).unwrap();

        let ctx = create(1, DIGEST_LEN * 8);
        assert_eq!(compute(CtxHandle::NULL, buf, buf, 1, mask), -1);
        assert_eq!(compute(ctx, Ptr::NULL, buf, 1, mask), -1);
        assert_eq!(compute(ctx, buf, buf, 2, mask), -2);
        assert_eq!(compute(ctx, buf, buf, 0, mask), 0);

        // Stale input pointer is a memory fault, not silence.
        let stale = engine.alloc(DIGEST_LEN).unwrap();
        engine.free(stale).unwrap();
        assert_eq!(compute(ctx, stale, buf, 1, mask), -3);

        let Some(Export::Prepare(prepare)) = engine.raw_export(symbols::PREPARE) else {
            panic!("prepare export missing");
        };
        assert_eq!(prepare(ctx), 0);
        assert_eq!(prepare(CtxHandle::from_raw(999)), -1);
    }

    #[test]
    fn variants_agree_on_random_batches() {
        let mut rng = StdRng::seed_from_u64(0x5051);
        let engine = NativeEngine::new();
        let count = 64;

        let mut flat_a = vec![0u8; count * DIGEST_LEN];
        let mut flat_b = vec![0u8; count * DIGEST_LEN];
        rng.fill(&mut flat_a[..]);
        rng.fill(&mut flat_b[..]);
        // Plant overlaps at a few positions.
        for i in [0usize, 17, 42] {
            let src = i * DIGEST_LEN;
            let dst = ((i * 7) % count) * DIGEST_LEN;
            let rec: Vec<u8> = flat_a[src..src + DIGEST_LEN].to_vec();
            flat_b[dst..dst + DIGEST_LEN].copy_from_slice(&rec);
        }

        let buf_a = engine.alloc(flat_a.len()).unwrap();
        let buf_b = engine.alloc(flat_b.len()).unwrap();
        engine.store(buf_a, &flat_a).unwrap();
        engine.store(buf_b, &flat_b).unwrap();
        let mask_base = engine.alloc(count).unwrap();
        let mask_obliv = engine.alloc(count).unwrap();

        let ctx = bind_create(&engine)(count, DIGEST_LEN * 8);
        let baseline = bind_compute(&engine, symbols::COMPUTE_BASELINE);
        let oblivious = bind_compute(&engine, symbols::COMPUTE_OBLIVIOUS);
        assert_eq!(baseline(ctx, buf_a, buf_b, count, mask_base), 0);
        assert_eq!(oblivious(ctx, buf_a, buf_b, count, mask_obliv), 0);

        let mut got_base = vec![0u8; count];
        let mut got_obliv = vec![0u8; count];
        engine.load(mask_base, &mut got_base).unwrap();
        engine.load(mask_obliv, &mut got_obliv).unwrap();
        assert_eq!(got_base, got_obliv);
        assert!(got_base.iter().any(|&m| m == 1));
    }
}
