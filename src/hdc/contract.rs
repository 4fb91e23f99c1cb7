//! Strategy contract tester.
//!
//! Exercises a strategy instance against the algebra invariants every
//! substrate must satisfy. Diagnostic only: violations are reported, never
//! raised during normal operation.

use std::fmt;

use super::{Strategy, Vector};

#[derive(Debug, Clone, PartialEq)]
pub enum ContractViolation {
    /// `similarity(v, v)` strayed from 1.0.
    Reflexivity { name: String, got: f64 },

    /// `similarity(a, b) != similarity(b, a)`.
    Symmetry { left: String, right: String, forward: f64, backward: f64 },

    /// Similarity outside [0, 1].
    Range { left: String, right: String, got: f64 },

    /// `create_from_name` returned different vectors for equal inputs.
    NameDeterminism { name: String },

    /// `bundle` over the same inputs produced different outputs.
    BundleDeterminism,

    /// XOR-class strategy where `bind(bind(a, b), b) != a`.
    Involution { left: String, right: String },

    /// `encode(op, X, Y)` collided with `encode(op, Y, X)`.
    PositionSemantics { left: String, right: String },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::Reflexivity { name, got } => {
                write!(f, "similarity({0}, {0}) = {1}, expected 1.0", name, got)
            }
            ContractViolation::Symmetry { left, right, forward, backward } => write!(
                f,
                "similarity({}, {}) = {} but similarity({}, {}) = {}",
                left, right, forward, right, left, backward
            ),
            ContractViolation::Range { left, right, got } => {
                write!(f, "similarity({}, {}) = {} outside [0, 1]", left, right, got)
            }
            ContractViolation::NameDeterminism { name } => {
                write!(f, "create_from_name('{}') is not deterministic", name)
            }
            ContractViolation::BundleDeterminism => {
                write!(f, "bundle over identical inputs is not deterministic")
            }
            ContractViolation::Involution { left, right } => {
                write!(f, "bind(bind({0}, {1}), {1}) != {0}", left, right)
            }
            ContractViolation::PositionSemantics { left, right } => write!(
                f,
                "position-tagged encodings of ({0}, {1}) and ({1}, {0}) collide",
                left, right
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct ContractReport {
    pub violations: Vec<ContractViolation>,
}

impl ContractReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ContractReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "contract: all invariants hold");
        }
        writeln!(f, "contract: {} violation(s)", self.violations.len())?;
        for v in &self.violations {
            writeln!(f, "  - {}", v)?;
        }
        Ok(())
    }
}

const SAMPLE_NAMES: [&str; 6] = ["Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta"];

/// Run the full invariant suite against one strategy instance.
pub fn check_contract(strategy: &mut dyn Strategy) -> ContractReport {
    let mut report = ContractReport::default();

    let samples: Vec<(String, Vector)> = SAMPLE_NAMES
        .iter()
        .map(|name| (name.to_string(), strategy.create_from_name(name, "contract")))
        .collect();

    // 1. Reflexivity.
    for (name, vec) in &samples {
        let sim = strategy.similarity(vec, vec);
        if (sim - 1.0).abs() > 1e-9 {
            report.violations.push(ContractViolation::Reflexivity {
                name: name.clone(),
                got: sim,
            });
        }
    }

    // 2 & 3. Symmetry and range over all pairs.
    for (i, (ln, lv)) in samples.iter().enumerate() {
        for (rn, rv) in samples.iter().skip(i + 1) {
            let forward = strategy.similarity(lv, rv);
            let backward = strategy.similarity(rv, lv);
            if (forward - backward).abs() > 1e-9 {
                report.violations.push(ContractViolation::Symmetry {
                    left: ln.clone(),
                    right: rn.clone(),
                    forward,
                    backward,
                });
            }
            if !(0.0..=1.0).contains(&forward) {
                report.violations.push(ContractViolation::Range {
                    left: ln.clone(),
                    right: rn.clone(),
                    got: forward,
                });
            }
        }
    }

    // 4. Deterministic atom creation.
    for name in SAMPLE_NAMES {
        let again = strategy.create_from_name(name, "contract");
        let original = &samples
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| strategy.create_zero());
        if !again.equals(original) {
            report.violations.push(ContractViolation::NameDeterminism {
                name: name.to_string(),
            });
        }
    }

    // 5. Bundle determinism over identical input lists.
    let inputs: Vec<Vector> = samples.iter().map(|(_, v)| v.clone()).collect();
    if !strategy.bundle(&inputs).equals(&strategy.bundle(&inputs)) {
        report.violations.push(ContractViolation::BundleDeterminism);
    }

    // 6. Involution, XOR-class only.
    if strategy.xor_class() {
        for (i, (ln, lv)) in samples.iter().enumerate() {
            for (rn, rv) in samples.iter().skip(i + 1) {
                let round_trip = strategy.bind(&strategy.bind(lv, rv), rv);
                if !round_trip.equals(lv) {
                    report.violations.push(ContractViolation::Involution {
                        left: ln.clone(),
                        right: rn.clone(),
                    });
                }
            }
        }
    }

    // Position semantics: swapped argument encodings must stay distinct.
    let pos1 = strategy.create_from_name("Pos_1", "");
    let pos2 = strategy.create_from_name("Pos_2", "");
    for (i, (ln, lv)) in samples.iter().enumerate() {
        for (rn, rv) in samples.iter().skip(i + 1) {
            let fwd = strategy.bundle(&[strategy.bind(&pos1, lv), strategy.bind(&pos2, rv)]);
            let rev = strategy.bundle(&[strategy.bind(&pos1, rv), strategy.bind(&pos2, lv)]);
            if fwd.equals(&rev) {
                report.violations.push(ContractViolation::PositionSemantics {
                    left: ln.clone(),
                    right: rn.clone(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdc::{create_strategy, Geometry, StrategyId};

    #[test]
    fn all_strategies_pass_the_contract() {
        for id in [
            StrategyId::Exact,
            StrategyId::DenseBinary,
            StrategyId::SparsePolynomial,
            StrategyId::MetricAffine,
        ] {
            let mut strategy = create_strategy(id, Geometry::default_for(id));
            let report = check_contract(strategy.as_mut());
            assert!(
                report.passed(),
                "{} failed: {}",
                id.as_str(),
                report
            );
        }
    }

    #[test]
    fn report_displays_violations() {
        let report = ContractReport {
            violations: vec![ContractViolation::BundleDeterminism],
        };
        assert!(!report.passed());
        assert!(report.to_string().contains("1 violation"));
    }
}
