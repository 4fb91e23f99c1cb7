//! Metric-affine strategy.
//!
//! Byte vectors under modular affine algebra: bind is elementwise
//! wrapping addition (so unbind, its exact inverse, is wrapping
//! subtraction) and similarity is one minus normalized L1 distance. Two
//! unrelated vectors land near 0.67 rather than 0.5, which is the price
//! of the metric embedding. Bundling averages byte-wise and saturates
//! quickly; this substrate is chosen when small bundles with exact
//! unbinding are wanted.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{name_seed, DecodedCandidate, Geometry, Strategy, StrategyId, Vector};

pub struct MetricAffineStrategy {
    geometry: Geometry,
}

impl MetricAffineStrategy {
    pub fn new(geometry: Geometry) -> Self {
        let dimension = geometry.dimension.max(64);
        Self {
            geometry: Geometry::new(dimension),
        }
    }

    fn len(&self) -> usize {
        self.geometry.dimension as usize
    }

    fn bytes_of<'a>(&self, v: &'a Vector) -> &'a [u8] {
        match v {
            Vector::Bytes { data } => data,
            _ => &[],
        }
    }

    fn from_rng(&self, mut rng: StdRng) -> Vector {
        let data = (0..self.len()).map(|_| rng.gen()).collect();
        Vector::Bytes { data }
    }
}

impl Strategy for MetricAffineStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::MetricAffine
    }

    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn create_zero(&self) -> Vector {
        Vector::Bytes {
            data: vec![0u8; self.len()],
        }
    }

    fn create_random(&mut self, seed: u64) -> Vector {
        self.from_rng(StdRng::seed_from_u64(seed))
    }

    fn create_from_name(&mut self, name: &str, theory_id: &str) -> Vector {
        self.from_rng(StdRng::seed_from_u64(name_seed(name, theory_id)))
    }

    fn bind(&self, a: &Vector, b: &Vector) -> Vector {
        let (ba, bb) = (self.bytes_of(a), self.bytes_of(b));
        let data = (0..self.len())
            .map(|i| {
                ba.get(i)
                    .copied()
                    .unwrap_or(0)
                    .wrapping_add(bb.get(i).copied().unwrap_or(0))
            })
            .collect();
        Vector::Bytes { data }
    }

    fn bundle(&self, vectors: &[Vector]) -> Vector {
        if vectors.is_empty() {
            return self.create_zero();
        }
        let n = vectors.len() as u32;
        let data = (0..self.len())
            .map(|i| {
                let sum: u32 = vectors
                    .iter()
                    .map(|v| self.bytes_of(v).get(i).copied().unwrap_or(0) as u32)
                    .sum();
                // Floor division: multiset-invariant and free of float drift.
                (sum / n) as u8
            })
            .collect();
        Vector::Bytes { data }
    }

    fn unbind(&self, composite: &Vector, component: &Vector) -> Vector {
        let (bc, bk) = (self.bytes_of(composite), self.bytes_of(component));
        let data = (0..self.len())
            .map(|i| {
                bc.get(i)
                    .copied()
                    .unwrap_or(0)
                    .wrapping_sub(bk.get(i).copied().unwrap_or(0))
            })
            .collect();
        Vector::Bytes { data }
    }

    fn similarity(&self, a: &Vector, b: &Vector) -> f64 {
        let (ba, bb) = (self.bytes_of(a), self.bytes_of(b));
        let l1: u64 = (0..self.len())
            .map(|i| {
                let x = ba.get(i).copied().unwrap_or(0) as i32;
                let y = bb.get(i).copied().unwrap_or(0) as i32;
                (x - y).unsigned_abs() as u64
            })
            .sum();
        1.0 - l1 as f64 / (255.0 * self.len() as f64)
    }

    fn random_baseline(&self) -> f64 {
        // E[|a-b|] for independent uniform bytes is 255/3.
        2.0 / 3.0
    }

    fn soft_capacity(&self) -> usize {
        // Byte averaging washes members out fast.
        8
    }

    fn min_decode_score(&self) -> f64 {
        0.75
    }

    fn decode_unbound_candidates(
        &self,
        _residual: &Vector,
        _domain: &[(String, Vector)],
    ) -> Option<Vec<DecodedCandidate>> {
        // Wrapping subtraction already restores the exact partner; generic
        // similarity ranking is the decoder.
        None
    }
}
