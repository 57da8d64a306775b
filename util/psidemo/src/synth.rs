//! Seeded synthesis of overlapping email-like test sets.

use std::collections::HashSet;

use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};

const NAMES: &[&str] = &[
    "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy", "mallory",
    "nick", "olivia", "peggy", "trent", "victor", "wendy",
];

const DOMAINS: &[&str] = &["example.com", "test.example", "demo.local", "psi-demo.net"];

/// Expands a 64-bit seed into a ChaCha20 stream.
pub fn seeded_rng(seed: u64) -> ChaCha20Rng {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    ChaCha20Rng::from_seed(bytes)
}

fn random_email(rng: &mut ChaCha20Rng) -> String {
    let name = NAMES[(rng.next_u32() as usize) % NAMES.len()];
    let domain = DOMAINS[(rng.next_u32() as usize) % DOMAINS.len()];
    // Short hex tag to keep collisions rare across a run.
    let tag = rng.next_u32() & 0xffff;
    format!("{name}{tag:04x}@{domain}")
}

/// Generates two item lists of length `n` with roughly 25% overlap.
///
/// The shared items land at the head of both lists; everything else is
/// unique across both parties.
pub fn overlapping_sets(n: usize, rng: &mut ChaCha20Rng) -> (Vec<String>, Vec<String>) {
    let overlap = (n / 4).max(1);

    let mut used = HashSet::new();
    let mut shared = Vec::with_capacity(overlap);
    while shared.len() < overlap {
        let email = random_email(rng);
        if used.insert(email.clone()) {
            shared.push(email);
        }
    }

    let mut alice = shared.clone();
    let mut bob = shared;
    while alice.len() < n {
        let email = random_email(rng);
        if used.insert(email.clone()) {
            alice.push(email);
        }
    }
    while bob.len() < n {
        let email = random_email(rng);
        if used.insert(email.clone()) {
            bob.push(email);
        }
    }

    (alice, bob)
}
