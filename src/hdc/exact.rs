//! Exact session-local appearance-index strategy.
//!
//! Every named atom gets the next small integer in first-seen order; its
//! vector is the singleton index set. Binding two sets pairs their
//! elements through a session-local product table, so composition is
//! loss-free: unbind is a true quotient and decoding walks postings back
//! to names. Two sessions assign disjoint tables because the tables live
//! in the strategy instance.
//!
//! The product table replaces the plain set union/symmetric difference a
//! naive exact substrate would use: union collapses argument order, and
//! position semantics (`encode(op, X, Y) != encode(op, Y, X)`) are
//! mandatory for every strategy.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use super::{DecodedCandidate, Geometry, Strategy, StrategyId, Vector};

/// Indices at or above this are bind products; below, appearance indices.
const PRODUCT_BASE: u64 = 1 << 32;

#[derive(Default)]
struct ProductTable {
    forward: HashMap<(u64, u64), u64>,
    reverse: Vec<(u64, u64)>,
}

impl ProductTable {
    fn intern(&mut self, a: u64, b: u64) -> u64 {
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(&idx) = self.forward.get(&key) {
            return idx;
        }
        let idx = PRODUCT_BASE + self.reverse.len() as u64;
        self.forward.insert(key, idx);
        self.reverse.push(key);
        idx
    }

    fn factors_of(&self, idx: u64) -> Option<(u64, u64)> {
        if idx >= PRODUCT_BASE {
            self.reverse.get((idx - PRODUCT_BASE) as usize).copied()
        } else {
            None
        }
    }
}

pub struct ExactStrategy {
    atoms: HashMap<String, u64>,
    names: Vec<String>,
    // Bind products are created during read-only algebra calls; the table
    // is session-local state, not shared.
    products: RefCell<ProductTable>,
}

impl ExactStrategy {
    pub fn new() -> Self {
        Self {
            atoms: HashMap::new(),
            names: Vec::new(),
            products: RefCell::new(ProductTable::default()),
        }
    }

    fn intern_atom(&mut self, key: String, display: &str) -> u64 {
        if let Some(&idx) = self.atoms.get(&key) {
            return idx;
        }
        let idx = self.names.len() as u64;
        self.names.push(display.to_string());
        self.atoms.insert(key, idx);
        idx
    }

    fn indices_of<'a>(&self, v: &'a Vector) -> &'a [u64] {
        match v {
            Vector::Set { indices } => indices,
            _ => &[],
        }
    }

    /// Expand every element of `component` into its transitive factor set,
    /// so quotients dissolve one layer of a product per call.
    fn factor_closure(&self, component: &Vector) -> BTreeSet<u64> {
        let products = self.products.borrow();
        let mut closure = BTreeSet::new();
        let mut stack: Vec<u64> = self.indices_of(component).to_vec();
        while let Some(idx) = stack.pop() {
            if !closure.insert(idx) {
                continue;
            }
            if let Some((a, b)) = products.factors_of(idx) {
                stack.push(a);
                stack.push(b);
            }
        }
        closure
    }

    fn set(indices: BTreeSet<u64>) -> Vector {
        Vector::Set {
            indices: indices.into_iter().collect(),
        }
    }
}

impl Default for ExactStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ExactStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Exact
    }

    fn geometry(&self) -> Geometry {
        // The index space grows with the vocabulary; there is no fixed size.
        Geometry::new(0)
    }

    fn create_zero(&self) -> Vector {
        Vector::Set { indices: Vec::new() }
    }

    fn create_random(&mut self, seed: u64) -> Vector {
        // "Random" material is just a fresh appearance index; the seed only
        // names it so repeated calls with one seed agree.
        let idx = self.intern_atom(format!("__random\u{0}{}", seed), &format!("__random_{}", seed));
        Vector::Set { indices: vec![idx] }
    }

    fn create_from_name(&mut self, name: &str, theory_id: &str) -> Vector {
        let idx = self.intern_atom(format!("{}\u{0}{}", theory_id, name), name);
        Vector::Set { indices: vec![idx] }
    }

    fn bind(&self, a: &Vector, b: &Vector) -> Vector {
        let (ia, ib) = (self.indices_of(a), self.indices_of(b));
        let mut products = self.products.borrow_mut();
        let mut out = BTreeSet::new();
        for &x in ia {
            for &y in ib {
                out.insert(products.intern(x, y));
            }
        }
        drop(products);
        Self::set(out)
    }

    fn bundle(&self, vectors: &[Vector]) -> Vector {
        let mut out = BTreeSet::new();
        for v in vectors {
            out.extend(self.indices_of(v).iter().copied());
        }
        Self::set(out)
    }

    fn unbind(&self, composite: &Vector, component: &Vector) -> Vector {
        let factors = self.factor_closure(component);
        let products = self.products.borrow();
        let mut out = BTreeSet::new();
        for &idx in self.indices_of(composite) {
            match products.factors_of(idx) {
                Some((x, y)) => {
                    // Quotient: keep the partner of any factored element.
                    if factors.contains(&x) {
                        out.insert(y);
                    } else if factors.contains(&y) {
                        out.insert(x);
                    }
                }
                None => {
                    // Plain appearance indices fall back to set difference.
                    if !factors.contains(&idx) {
                        out.insert(idx);
                    }
                }
            }
        }
        drop(products);
        Self::set(out)
    }

    fn similarity(&self, a: &Vector, b: &Vector) -> f64 {
        let ia: BTreeSet<u64> = self.indices_of(a).iter().copied().collect();
        let ib: BTreeSet<u64> = self.indices_of(b).iter().copied().collect();
        if ia.is_empty() && ib.is_empty() {
            return 1.0;
        }
        let inter = ia.intersection(&ib).count();
        let union = ia.union(&ib).count();
        inter as f64 / union as f64
    }

    fn random_baseline(&self) -> f64 {
        0.0
    }

    fn soft_capacity(&self) -> usize {
        // Set union never saturates; no capacity pressure to warn about.
        usize::MAX
    }

    fn min_decode_score(&self) -> f64 {
        0.99
    }

    fn decode_unbound_candidates(
        &self,
        residual: &Vector,
        domain: &[(String, Vector)],
    ) -> Option<Vec<DecodedCandidate>> {
        let mut out = Vec::new();
        for &idx in self.indices_of(residual) {
            if idx >= PRODUCT_BASE {
                // A product survived unbinding; it is not a nameable atom.
                continue;
            }
            let Some(name) = self.names.get(idx as usize) else {
                continue;
            };
            if !domain.is_empty() && !domain.iter().any(|(n, _)| n == name) {
                continue;
            }
            out.push(DecodedCandidate {
                name: name.clone(),
                score: 1.0,
                witnesses: vec![format!("appearance:{}", idx)],
            });
        }
        // Appearance order == first-seen order; deterministic.
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appearance_indices_assigned_in_first_seen_order() {
        let mut s = ExactStrategy::new();
        let a = s.create_from_name("first", "t");
        let b = s.create_from_name("second", "t");
        let a_again = s.create_from_name("first", "t");
        assert_eq!(a, Vector::Set { indices: vec![0] });
        assert_eq!(b, Vector::Set { indices: vec![1] });
        assert_eq!(a, a_again);
    }

    #[test]
    fn theory_scoping_distinguishes_same_surface_name() {
        let mut s = ExactStrategy::new();
        let core = s.create_from_name("John", "Core");
        let family = s.create_from_name("John", "Family");
        assert_ne!(core, family);
    }

    #[test]
    fn unbind_inverts_bind_for_atoms() {
        let mut s = ExactStrategy::new();
        let a = s.create_from_name("a", "t");
        let b = s.create_from_name("b", "t");
        let bound = s.bind(&a, &b);
        assert_eq!(s.unbind(&bound, &b), a);
        assert_eq!(s.unbind(&bound, &a), b);
    }

    #[test]
    fn bind_is_commutative() {
        let mut s = ExactStrategy::new();
        let a = s.create_from_name("a", "t");
        let b = s.create_from_name("b", "t");
        assert_eq!(s.bind(&a, &b), s.bind(&b, &a));
    }

    #[test]
    fn position_tagging_keeps_argument_order_distinct() {
        let mut s = ExactStrategy::new();
        let p1 = s.create_from_name("Pos_1", "");
        let p2 = s.create_from_name("Pos_2", "");
        let x = s.create_from_name("X", "t");
        let y = s.create_from_name("Y", "t");
        let xy = s.bundle(&[s.bind(&p1, &x), s.bind(&p2, &y)]);
        let yx = s.bundle(&[s.bind(&p1, &y), s.bind(&p2, &x)]);
        assert_ne!(xy, yx);
    }

    #[test]
    fn quotient_through_bundle_recovers_partner() {
        let mut s = ExactStrategy::new();
        let op = s.create_from_name("loves", "t");
        let p1 = s.create_from_name("Pos_1", "");
        let p2 = s.create_from_name("Pos_2", "");
        let john = s.create_from_name("John", "t");
        let mary = s.create_from_name("Mary", "t");

        let args = s.bundle(&[s.bind(&p1, &john), s.bind(&p2, &mary)]);
        let fact = s.bind(&op, &args);

        let residual = s.unbind(&fact, &op);
        let raw = s.unbind(&residual, &p1);
        assert_eq!(raw, john);
    }

    #[test]
    fn decoder_names_appearance_indices() {
        let mut s = ExactStrategy::new();
        let john = s.create_from_name("John", "t");
        let mary = s.create_from_name("Mary", "t");
        let residual = s.bundle(&[john.clone(), mary]);
        let domain = vec![("John".to_string(), john)];
        let decoded = s.decode_unbound_candidates(&residual, &domain).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "John");
        assert_eq!(decoded[0].score, 1.0);
    }

    #[test]
    fn jaccard_similarity_ranges() {
        let mut s = ExactStrategy::new();
        let a = s.create_from_name("a", "t");
        let b = s.create_from_name("b", "t");
        assert_eq!(s.similarity(&a, &a), 1.0);
        assert_eq!(s.similarity(&a, &b), 0.0);
        let ab = s.bundle(&[a.clone(), b.clone()]);
        assert!((s.similarity(&ab, &a) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn two_instances_assign_independent_indices() {
        let mut s1 = ExactStrategy::new();
        let mut s2 = ExactStrategy::new();
        s1.create_from_name("only_in_one", "t");
        let a1 = s1.create_from_name("shared", "t");
        let a2 = s2.create_from_name("shared", "t");
        // Different first-seen order, different indices: no shared state.
        assert_ne!(a1, a2);
    }

    #[test]
    fn empty_sets_are_identical_and_self_similar() {
        let s = ExactStrategy::new();
        let zero = s.create_zero();
        assert_eq!(s.similarity(&zero, &zero), 1.0);
        assert_eq!(s.bundle(&[]), zero);
    }
}
