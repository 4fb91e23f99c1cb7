//! The HDC substrate: one algebra, several representations.
//!
//! Every strategy exposes the same narrow contract — deterministic atom
//! creation, bind, bundle, unbind, similarity — over an opaque [`Vector`].
//! The session owns exactly one boxed strategy instance; stateful
//! strategies (the exact appearance index) keep their state inside that
//! instance so nothing leaks across sessions.

pub mod contract;
pub mod dense;
pub mod exact;
pub mod metric;
pub mod sparse;

pub use contract::{check_contract, ContractReport, ContractViolation};
pub use dense::DenseBinaryStrategy;
pub use exact::ExactStrategy;
pub use metric::MetricAffineStrategy;
pub use sparse::SparsePolynomialStrategy;

use serde::{Deserialize, Serialize};

/// Which substrate a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyId {
    Exact,
    DenseBinary,
    SparsePolynomial,
    MetricAffine,
}

impl StrategyId {
    /// Configuration-surface names (`strategy = "dense-binary"`).
    pub fn parse(name: &str) -> Option<StrategyId> {
        match name {
            "exact" => Some(StrategyId::Exact),
            "dense-binary" | "dense_binary" => Some(StrategyId::DenseBinary),
            "sparse-polynomial" | "sparse_polynomial" => Some(StrategyId::SparsePolynomial),
            "metric-affine" | "metric_affine" => Some(StrategyId::MetricAffine),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Exact => "exact",
            StrategyId::DenseBinary => "dense-binary",
            StrategyId::SparsePolynomial => "sparse-polynomial",
            StrategyId::MetricAffine => "metric-affine",
        }
    }
}

/// Strategy-specific size parameter, fixed at session creation.
///
/// Dense: bit count. Sparse: index universe. Metric: byte count. The exact
/// strategy ignores it (its index space grows with the vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub dimension: u32,
}

impl Geometry {
    pub fn new(dimension: u32) -> Self {
        Self { dimension }
    }

    /// Per-strategy default when the config leaves geometry unset.
    pub fn default_for(id: StrategyId) -> Self {
        match id {
            StrategyId::Exact => Geometry::new(0),
            StrategyId::DenseBinary => Geometry::new(8192),
            StrategyId::SparsePolynomial => Geometry::new(1 << 20),
            StrategyId::MetricAffine => Geometry::new(1024),
        }
    }
}

/// Opaque vector representation. Which payload a strategy produces is an
/// implementation detail; callers only move vectors between strategy calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vector {
    /// Bit-packed words, `bits` of which are meaningful.
    Dense { words: Vec<u64>, bits: u32 },
    /// Sorted, deduplicated index set (exact and sparse strategies).
    Set { indices: Vec<u64> },
    /// Raw byte vector (metric-affine).
    Bytes { data: Vec<u8> },
}

impl Vector {
    /// Structural equality is derived; this is the contract's `equals`.
    pub fn equals(&self, other: &Vector) -> bool {
        self == other
    }

    pub fn serialize_json(&self) -> String {
        // Vector payloads are plain data; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn deserialize_json(text: &str) -> Option<Vector> {
        serde_json::from_str(text).ok()
    }
}

/// One ranked candidate from a structural decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCandidate {
    pub name: String,
    pub score: f64,
    /// Strategy-internal evidence (postings hits, overlapping indices).
    pub witnesses: Vec<String>,
}

/// The strategy contract: the core algebra plus capacity bookkeeping.
///
/// `create_from_name` takes `&mut self` because the exact strategy assigns
/// appearance indices in first-seen order; pure strategies simply derive
/// material from the name hash. `Send` so whole sessions can move between
/// threads; instances are still never shared between sessions.
pub trait Strategy: Send {
    fn id(&self) -> StrategyId;
    fn geometry(&self) -> Geometry;

    /// The additive identity.
    fn create_zero(&self) -> Vector;

    /// Roughly balanced random vector, fully determined by `seed`.
    fn create_random(&mut self, seed: u64) -> Vector;

    /// Deterministic vector for a named atom, scoped by theory id.
    /// Equal inputs yield equal vectors for the life of the session.
    fn create_from_name(&mut self, name: &str, theory_id: &str) -> Vector;

    /// Associative, commutative composition.
    fn bind(&self, a: &Vector, b: &Vector) -> Vector;

    /// Deterministic superposition. How a strategy resolves ambiguities
    /// (e.g. majority votes with equal counts) is its own, but the rule
    /// must depend only on the input multiset — never on wall clock or
    /// map iteration order.
    fn bundle(&self, vectors: &[Vector]) -> Vector;

    /// Inverse/quotient of `bind`. XOR-class strategies reuse bind; others
    /// produce a residual that needs [`Strategy::decode_unbound_candidates`].
    fn unbind(&self, composite: &Vector, component: &Vector) -> Vector;

    /// Symmetric similarity in [0, 1] with `similarity(v, v) == 1.0`.
    fn similarity(&self, a: &Vector, b: &Vector) -> f64;

    /// True when `bind` is its own exact inverse (`bind(bind(a,b),b) == a`
    /// byte-for-byte). The contract tester checks involution only here.
    fn xor_class(&self) -> bool {
        false
    }

    /// Expected similarity of two unrelated vectors.
    fn random_baseline(&self) -> f64;

    /// Bundled-item count past which similarity margins degrade; the
    /// session emits a capacity warning when a bundle crosses this.
    fn soft_capacity(&self) -> usize;

    /// Score floor below which decoded candidates are dropped.
    fn min_decode_score(&self) -> f64;

    /// Structural decoding of an unbound residual against a candidate
    /// domain. `None` means the strategy has no decoder and callers fall
    /// back to generic top-K similarity.
    fn decode_unbound_candidates(
        &self,
        residual: &Vector,
        domain: &[(String, Vector)],
    ) -> Option<Vec<DecodedCandidate>>;
}

/// Construct a fresh strategy instance for one session.
pub fn create_strategy(id: StrategyId, geometry: Geometry) -> Box<dyn Strategy> {
    match id {
        StrategyId::Exact => Box::new(ExactStrategy::new()),
        StrategyId::DenseBinary => Box::new(DenseBinaryStrategy::new(geometry)),
        StrategyId::SparsePolynomial => Box::new(SparsePolynomialStrategy::new(geometry)),
        StrategyId::MetricAffine => Box::new(MetricAffineStrategy::new(geometry)),
    }
}

/// FNV-1a over the theory id and name; the seed for deterministic atom
/// material. Stable across platforms and runs.
pub(crate) fn name_seed(name: &str, theory_id: &str) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for byte in theory_id.bytes().chain([0u8]).chain(name.bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Generic candidate ranking by raw similarity, used when a strategy has
/// no structural decoder. Deterministic: score descending, then name.
pub fn top_k_similar(
    strategy: &dyn Strategy,
    residual: &Vector,
    domain: &[(String, Vector)],
    k: usize,
    min_score: f64,
) -> Vec<DecodedCandidate> {
    let mut scored: Vec<DecodedCandidate> = domain
        .iter()
        .map(|(name, vec)| DecodedCandidate {
            name: name.clone(),
            score: strategy.similarity(residual, vec),
            witnesses: Vec::new(),
        })
        .filter(|c| c.score >= min_score)
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    scored.truncate(k);
    scored
}
