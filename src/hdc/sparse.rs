//! Sparse-polynomial strategy.
//!
//! Vectors are small sets of quasi-orthogonal active indices drawn from a
//! large universe. Binding forms the modular cross-sum of the two index
//! sets (a discrete convolution of sparse polynomials), unbinding forms
//! the cross-difference, and the decoder scores candidates by exact
//! intersection of their index sets with the residual.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{name_seed, DecodedCandidate, Geometry, Strategy, StrategyId, Vector};

/// Active indices per atom vector.
const ACTIVE_PER_ATOM: usize = 16;

/// Bind output cap; the smallest indices are kept so the cut is
/// deterministic for a given input pair.
const MAX_BIND_TERMS: usize = 8192;

/// Unbind output cap; generous because the cross-difference must retain
/// every true partner index for the intersection decoder to find it. Past
/// the cap the decoder loses recall and the engine falls back to the
/// symbolic path, which is the intended degradation.
const MAX_UNBIND_TERMS: usize = 1 << 20;

pub struct SparsePolynomialStrategy {
    geometry: Geometry,
}

impl SparsePolynomialStrategy {
    pub fn new(geometry: Geometry) -> Self {
        // A small universe makes accidental collisions routine.
        let dimension = geometry.dimension.max(1 << 12);
        Self {
            geometry: Geometry::new(dimension),
        }
    }

    fn universe(&self) -> u64 {
        self.geometry.dimension as u64
    }

    fn indices_of<'a>(&self, v: &'a Vector) -> &'a [u64] {
        match v {
            Vector::Set { indices } => indices,
            _ => &[],
        }
    }

    fn from_rng(&self, mut rng: StdRng) -> Vector {
        let mut indices = Vec::with_capacity(ACTIVE_PER_ATOM);
        while indices.len() < ACTIVE_PER_ATOM {
            let idx = rng.gen_range(0..self.universe());
            if !indices.contains(&idx) {
                indices.push(idx);
            }
        }
        indices.sort_unstable();
        Vector::Set { indices }
    }

    fn cross<F>(&self, a: &[u64], b: &[u64], cap: usize, op: F) -> Vector
    where
        F: Fn(u64, u64) -> u64,
    {
        let mut out: Vec<u64> = Vec::with_capacity(a.len() * b.len());
        for &x in a {
            for &y in b {
                out.push(op(x, y));
            }
        }
        out.sort_unstable();
        out.dedup();
        out.truncate(cap);
        Vector::Set { indices: out }
    }
}

impl Strategy for SparsePolynomialStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::SparsePolynomial
    }

    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn create_zero(&self) -> Vector {
        Vector::Set { indices: Vec::new() }
    }

    fn create_random(&mut self, seed: u64) -> Vector {
        self.from_rng(StdRng::seed_from_u64(seed))
    }

    fn create_from_name(&mut self, name: &str, theory_id: &str) -> Vector {
        self.from_rng(StdRng::seed_from_u64(name_seed(name, theory_id)))
    }

    fn bind(&self, a: &Vector, b: &Vector) -> Vector {
        let u = self.universe();
        self.cross(
            self.indices_of(a),
            self.indices_of(b),
            MAX_BIND_TERMS,
            |x, y| (x + y) % u,
        )
    }

    fn bundle(&self, vectors: &[Vector]) -> Vector {
        let mut out: Vec<u64> = Vec::new();
        for v in vectors {
            out.extend_from_slice(self.indices_of(v));
        }
        out.sort_unstable();
        out.dedup();
        Vector::Set { indices: out }
    }

    fn unbind(&self, composite: &Vector, component: &Vector) -> Vector {
        let u = self.universe();
        self.cross(
            self.indices_of(composite),
            self.indices_of(component),
            MAX_UNBIND_TERMS,
            |z, x| (z + u - x) % u,
        )
    }

    fn similarity(&self, a: &Vector, b: &Vector) -> f64 {
        let ia = self.indices_of(a);
        let ib = self.indices_of(b);
        if ia.is_empty() && ib.is_empty() {
            return 1.0;
        }
        // Both sides are sorted; merge-count the intersection.
        let (mut i, mut j, mut inter) = (0usize, 0usize, 0usize);
        while i < ia.len() && j < ib.len() {
            match ia[i].cmp(&ib[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    inter += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        let union = ia.len() + ib.len() - inter;
        inter as f64 / union as f64
    }

    fn random_baseline(&self) -> f64 {
        // Two 16-sets in a >=4096 universe essentially never overlap.
        0.0
    }

    fn soft_capacity(&self) -> usize {
        // Union stays decodable while total actives are well under the
        // universe; past this the cross-difference drowns in collisions.
        (self.universe() as usize / ACTIVE_PER_ATOM) / 32
    }

    fn min_decode_score(&self) -> f64 {
        0.6
    }

    fn decode_unbound_candidates(
        &self,
        residual: &Vector,
        domain: &[(String, Vector)],
    ) -> Option<Vec<DecodedCandidate>> {
        let res = self.indices_of(residual);
        let mut out = Vec::new();
        for (name, vec) in domain {
            let candidate = self.indices_of(vec);
            if candidate.is_empty() {
                continue;
            }
            let hits: Vec<u64> = candidate
                .iter()
                .copied()
                .filter(|idx| res.binary_search(idx).is_ok())
                .collect();
            let score = hits.len() as f64 / candidate.len() as f64;
            if score >= self.min_decode_score() {
                out.push(DecodedCandidate {
                    name: name.clone(),
                    score,
                    witnesses: hits.iter().take(4).map(|i| format!("index:{}", i)).collect(),
                });
            }
        }
        out.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strat() -> SparsePolynomialStrategy {
        SparsePolynomialStrategy::new(Geometry::new(1 << 20))
    }

    #[test]
    fn atoms_have_fixed_active_count() {
        let mut s = strat();
        let v = s.create_from_name("A", "t");
        let Vector::Set { indices } = &v else {
            panic!("set payload expected");
        };
        assert_eq!(indices.len(), ACTIVE_PER_ATOM);
    }

    #[test]
    fn name_vectors_deterministic_and_disjoint() {
        let mut s = strat();
        let a1 = s.create_from_name("A", "t");
        let a2 = s.create_from_name("A", "t");
        let b = s.create_from_name("B", "t");
        assert_eq!(a1, a2);
        assert_eq!(s.similarity(&a1, &b), 0.0);
    }

    #[test]
    fn unbind_residual_contains_partner_indices() {
        let mut s = strat();
        let a = s.create_from_name("a", "t");
        let b = s.create_from_name("b", "t");
        let bound = s.bind(&a, &b);
        let residual = s.unbind(&bound, &a);
        let domain = vec![
            ("b".to_string(), b),
            ("c".to_string(), s.create_from_name("c", "t")),
        ];
        let decoded = s.decode_unbound_candidates(&residual, &domain).unwrap();
        assert_eq!(decoded[0].name, "b");
        assert_eq!(decoded[0].score, 1.0);
        assert!(decoded.iter().all(|c| c.name != "c"));
    }

    #[test]
    fn position_markers_keep_order_distinct() {
        let mut s = strat();
        let p1 = s.create_from_name("Pos_1", "");
        let p2 = s.create_from_name("Pos_2", "");
        let x = s.create_from_name("X", "t");
        let y = s.create_from_name("Y", "t");
        let xy = s.bundle(&[s.bind(&p1, &x), s.bind(&p2, &y)]);
        let yx = s.bundle(&[s.bind(&p1, &y), s.bind(&p2, &x)]);
        assert_ne!(xy, yx);
    }

    #[test]
    fn bundle_union_is_multiset_invariant() {
        let mut s = strat();
        let a = s.create_from_name("a", "t");
        let b = s.create_from_name("b", "t");
        assert_eq!(
            s.bundle(&[a.clone(), b.clone()]),
            s.bundle(&[b, a])
        );
    }

    #[test]
    fn decode_through_bundled_composite() {
        let mut s = strat();
        let op = s.create_from_name("loves", "t");
        let p1 = s.create_from_name("Pos_1", "");
        let p2 = s.create_from_name("Pos_2", "");
        let john = s.create_from_name("John", "t");
        let mary = s.create_from_name("Mary", "t");
        let fact = {
            let args = s.bundle(&[s.bind(&p1, &john), s.bind(&p2, &mary)]);
            s.bind(&op, &args)
        };
        let residual = s.unbind(&fact, &op);
        let raw = s.unbind(&residual, &p1);
        let domain = vec![
            ("John".to_string(), john),
            ("Mary".to_string(), mary),
        ];
        let decoded = s.decode_unbound_candidates(&raw, &domain).unwrap();
        assert!(decoded.iter().any(|c| c.name == "John" && c.score == 1.0));
    }
}
