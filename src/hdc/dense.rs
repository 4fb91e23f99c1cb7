//! Dense bit-packed binary strategy.
//!
//! The classical hyperdimensional substrate: fixed bit-count vectors,
//! bind = XOR (self-inverse), bundle = per-bit majority vote, similarity
//! = 1 − normalized Hamming distance. Random baseline sits at 0.5 and
//! bundle capacity scales with √d.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{name_seed, DecodedCandidate, Geometry, Strategy, StrategyId, Vector};

pub struct DenseBinaryStrategy {
    geometry: Geometry,
}

impl DenseBinaryStrategy {
    pub fn new(geometry: Geometry) -> Self {
        // Geometry below one word would make majority votes meaningless.
        let dimension = geometry.dimension.max(64);
        Self {
            geometry: Geometry::new(dimension),
        }
    }

    fn bits(&self) -> u32 {
        self.geometry.dimension
    }

    fn word_count(&self) -> usize {
        (self.bits() as usize + 63) / 64
    }

    fn from_rng(&self, mut rng: StdRng) -> Vector {
        let mut words: Vec<u64> = (0..self.word_count()).map(|_| rng.gen()).collect();
        self.mask_tail(&mut words);
        Vector::Dense {
            words,
            bits: self.bits(),
        }
    }

    /// Zero the bits past `dimension` in the last word so equality and
    /// Hamming counts never see garbage.
    fn mask_tail(&self, words: &mut [u64]) {
        let rem = self.bits() as usize % 64;
        if rem != 0 {
            if let Some(last) = words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }

    fn words_of<'a>(&self, v: &'a Vector) -> &'a [u64] {
        match v {
            Vector::Dense { words, .. } => words,
            _ => &[],
        }
    }
}

impl Strategy for DenseBinaryStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::DenseBinary
    }

    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn create_zero(&self) -> Vector {
        Vector::Dense {
            words: vec![0u64; self.word_count()],
            bits: self.bits(),
        }
    }

    fn create_random(&mut self, seed: u64) -> Vector {
        self.from_rng(StdRng::seed_from_u64(seed))
    }

    fn create_from_name(&mut self, name: &str, theory_id: &str) -> Vector {
        self.from_rng(StdRng::seed_from_u64(name_seed(name, theory_id)))
    }

    fn bind(&self, a: &Vector, b: &Vector) -> Vector {
        let (wa, wb) = (self.words_of(a), self.words_of(b));
        let words = (0..self.word_count())
            .map(|i| wa.get(i).copied().unwrap_or(0) ^ wb.get(i).copied().unwrap_or(0))
            .collect();
        Vector::Dense {
            words,
            bits: self.bits(),
        }
    }

    fn bundle(&self, vectors: &[Vector]) -> Vector {
        if vectors.is_empty() {
            return self.create_zero();
        }
        if vectors.len() == 1 {
            return vectors[0].clone();
        }
        let n = vectors.len();
        let mut words = vec![0u64; self.word_count()];
        for (w, word) in words.iter_mut().enumerate() {
            for bit in 0..64 {
                let index = w * 64 + bit;
                if index >= self.bits() as usize {
                    break;
                }
                let mut ones = 0usize;
                let mut parity = false;
                for v in vectors {
                    if self
                        .words_of(v)
                        .get(w)
                        .map(|x| (x >> bit) & 1 == 1)
                        .unwrap_or(false)
                    {
                        ones += 1;
                        parity = !parity;
                    }
                }
                // Strict majority wins; an exact tie takes the XOR parity
                // of the inputs at that bit. Multiset-invariant and keeps
                // every input represented (a two-vector bundle is their
                // union, not the first vector).
                let set = if 2 * ones == n {
                    parity
                } else {
                    2 * ones > n
                };
                if set {
                    *word |= 1u64 << bit;
                }
            }
        }
        self.mask_tail(&mut words);
        Vector::Dense {
            words,
            bits: self.bits(),
        }
    }

    fn unbind(&self, composite: &Vector, component: &Vector) -> Vector {
        // XOR is its own inverse.
        self.bind(composite, component)
    }

    fn similarity(&self, a: &Vector, b: &Vector) -> f64 {
        let (wa, wb) = (self.words_of(a), self.words_of(b));
        let hamming: u32 = (0..self.word_count())
            .map(|i| {
                (wa.get(i).copied().unwrap_or(0) ^ wb.get(i).copied().unwrap_or(0)).count_ones()
            })
            .sum();
        1.0 - hamming as f64 / self.bits() as f64
    }

    fn xor_class(&self) -> bool {
        true
    }

    fn random_baseline(&self) -> f64 {
        0.5
    }

    fn soft_capacity(&self) -> usize {
        (0.6 * (self.bits() as f64).sqrt()) as usize
    }

    fn min_decode_score(&self) -> f64 {
        // Comfortably above baseline noise for d >= 1024.
        0.55
    }

    fn decode_unbound_candidates(
        &self,
        _residual: &Vector,
        _domain: &[(String, Vector)],
    ) -> Option<Vec<DecodedCandidate>> {
        // An XOR residual IS the candidate vector; generic top-K similarity
        // against the vocabulary is the decoder.
        None
    }
}
