//! Deterministic simulation randomness.
//!
//! All stochastic decisions go through the [`SimRandom`] trait so tests can
//! inject any `RngCore` source; the default source is the [`SimRng`] resource
//! wrapping `ChaCha8Rng` for cross-platform determinism. Identical seeds
//! produce identical cities.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Default seed used when no explicit seed is provided.
const DEFAULT_SEED: u64 = 42;

// ---------------------------------------------------------------------------
// SimRandom trait
// ---------------------------------------------------------------------------

/// The five random operations the simulation uses. Blanket-implemented for
/// every `RngCore`, including `dyn RngCore`, so handler code can hold a
/// trait object without caring about the concrete generator.
pub trait SimRandom {
    /// Uniform value in `0..=max` (inclusive).
    fn get_random(&mut self, max: u16) -> u16;

    /// Minimum of two uniform draws; biased toward small values.
    fn get_e_random(&mut self, max: u16) -> u16;

    /// Uniform value in `0..=65535`.
    fn get_random16(&mut self) -> u16;

    /// Uniform value in `-32768..=32767`.
    fn get_random16_signed(&mut self) -> i16;

    /// True with probability `1 / (mask + 1)` for an all-ones mask; the
    /// canonical "1-in-N" gate is `get_chance(N - 1)` with N a power of two.
    fn get_chance(&mut self, mask: u16) -> bool;
}

impl<R: RngCore + ?Sized> SimRandom for R {
    fn get_random(&mut self, max: u16) -> u16 {
        (self.next_u32() % (max as u32 + 1)) as u16
    }

    fn get_e_random(&mut self, max: u16) -> u16 {
        let a = self.get_random(max);
        let b = self.get_random(max);
        a.min(b)
    }

    fn get_random16(&mut self) -> u16 {
        (self.next_u32() & 0xffff) as u16
    }

    fn get_random16_signed(&mut self) -> i16 {
        self.get_random16() as i16
    }

    fn get_chance(&mut self, mask: u16) -> bool {
        self.get_random16() & mask == 0
    }
}

// ---------------------------------------------------------------------------
// Serializable snapshot of ChaCha8Rng state
// ---------------------------------------------------------------------------

/// Captures the full internal state of a `ChaCha8Rng` so a loaded game
/// resumes the exact random stream it saved at.
#[derive(Encode, Decode)]
struct RngSnapshot {
    seed: [u8; 32],
    word_pos: u128,
    stream: u64,
}

impl RngSnapshot {
    fn from_rng(rng: &ChaCha8Rng) -> Self {
        Self {
            seed: rng.get_seed(),
            word_pos: rng.get_word_pos(),
            stream: rng.get_stream(),
        }
    }

    fn to_rng(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::from_seed(self.seed);
        rng.set_stream(self.stream);
        rng.set_word_pos(self.word_pos);
        rng
    }
}

// ---------------------------------------------------------------------------
// SimRng resource
// ---------------------------------------------------------------------------

/// Deterministic RNG resource for all simulation randomness.
///
/// Systems take `ResMut<SimRng>` and pass `&mut rng.0` down as the
/// `SimRandom` source.
#[derive(Resource)]
pub struct SimRng(pub ChaCha8Rng);

impl Default for SimRng {
    fn default() -> Self {
        Self(ChaCha8Rng::seed_from_u64(DEFAULT_SEED))
    }
}

impl SimRng {
    /// Create a new `SimRng` seeded from the given `u64` value.
    pub fn from_seed_u64(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl crate::Saveable for SimRng {
    const SAVE_KEY: &'static str = "sim_rng";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        let snapshot = RngSnapshot::from_rng(&self.0);
        Some(bitcode::encode(&snapshot))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        match bitcode::decode::<RngSnapshot>(bytes) {
            Ok(snapshot) => Self(snapshot.to_rng()),
            Err(e) => {
                bevy::log::warn!(
                    "SimRng: failed to decode save data, falling back to default: {}",
                    e
                );
                Self::default()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
