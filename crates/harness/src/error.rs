//! Error taxonomy for a harness run.
//!
//! Everything here is fatal to the run and leaves the engine module ready
//! for an independent retry by the caller; nothing is retried internally.
//! A backend disagreement is *not* an error; see
//! [`RunOutcome`](crate::RunOutcome).

use std::error::Error;
use std::fmt;

use psi_engine_api::{Lookup, MemoryError};

/// One of the two parties to the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    /// The first party; the intersection is projected from her items.
    Alice,
    /// The second party.
    Bob,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Alice => write!(f, "Alice"),
            Party::Bob => write!(f, "Bob"),
        }
    }
}

/// One of the two comparison backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Naive pairwise comparison engine.
    Baseline,
    /// Oblivious equality engine.
    Oblivious,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Baseline => write!(f, "baseline"),
            Backend::Oblivious => write!(f, "oblivious"),
        }
    }
}

/// A required entry point could not be resolved by any lookup tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityError {
    /// The unresolved symbol.
    pub symbol: &'static str,
    /// Every lookup tier that was attempted, in order.
    pub attempted: Vec<Lookup>,
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry point `{}` is not exported (tried", self.symbol)?;
        for (i, via) in self.attempted.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {via}")?;
        }
        write!(f, ")")
    }
}

impl Error for CapabilityError {}

/// Fatal failure of a harness run.
#[derive(Debug)]
pub enum HarnessError {
    /// A party supplied no items; reported before any engine interaction.
    EmptyInput(Party),
    /// An entry point is missing from the engine's export surface.
    MissingCapability(CapabilityError),
    /// An entry point resolved but with the wrong call signature.
    WrongSignature {
        /// The offending symbol.
        symbol: &'static str,
    },
    /// Context creation returned the null handle.
    ContextCreate {
        /// Requested comparison count.
        count: usize,
        /// Requested per-element width in bits.
        elem_bits: usize,
    },
    /// Circuit preparation returned a non-zero status.
    Prepare {
        /// The engine's status code.
        status: i32,
    },
    /// A compute call returned a non-zero status.
    Compute {
        /// Which backend failed.
        backend: Backend,
        /// The engine's status code.
        status: i32,
    },
    /// A linear-memory operation failed while marshaling.
    Memory(MemoryError),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::EmptyInput(party) => {
                write!(f, "{party} supplied no items")
            }
            HarnessError::MissingCapability(err) => err.fmt(f),
            HarnessError::WrongSignature { symbol } => {
                write!(f, "entry point `{symbol}` has an unexpected signature")
            }
            HarnessError::ContextCreate { count, elem_bits } => write!(
                f,
                "engine refused to create a context for {count} elements of {elem_bits} bits"
            ),
            HarnessError::Prepare { status } => {
                write!(f, "circuit preparation failed with status {status}")
            }
            HarnessError::Compute { backend, status } => {
                write!(f, "{backend} compute failed with status {status}")
            }
            HarnessError::Memory(err) => err.fmt(f),
        }
    }
}

impl Error for HarnessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HarnessError::MissingCapability(err) => Some(err),
            HarnessError::Memory(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CapabilityError> for HarnessError {
    fn from(err: CapabilityError) -> Self {
        HarnessError::MissingCapability(err)
    }
}

impl From<MemoryError> for HarnessError {
    fn from(err: MemoryError) -> Self {
        HarnessError::Memory(err)
    }
}
