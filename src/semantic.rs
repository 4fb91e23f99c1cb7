//! Semantic and canonical-rewrite indices.
//!
//! Relation properties are declared as ordinary facts with reserved
//! operators (`Transitive isA`, `MutuallyExclusive hasState Open Closed`,
//! `Canonical loves adores`, …). The knowledge base routes those
//! declarations here at insert time; the reasoning engines and the
//! contradiction detector read the tables at runtime.

use std::collections::{BTreeSet, HashMap, HashSet};

/// Reserved declaration operators.
pub const DECL_TRANSITIVE: &str = "Transitive";
pub const DECL_SYMMETRIC: &str = "Symmetric";
pub const DECL_REFLEXIVE: &str = "Reflexive";
pub const DECL_INHERITABLE: &str = "Inheritable";
pub const DECL_MUTUALLY_EXCLUSIVE: &str = "MutuallyExclusive";
pub const DECL_CONTRADICTS: &str = "Contradicts";
pub const DECL_CANONICAL: &str = "Canonical";

/// Operator properties read at reasoning time.
#[derive(Debug, Default)]
pub struct SemanticIndex {
    transitive: HashSet<String>,
    symmetric: HashSet<String>,
    reflexive: HashSet<String>,
    inheritable: HashSet<String>,
    /// operator → declared exclusive value sets (a subject may hold at
    /// most one value from each set).
    mutually_exclusive: HashMap<String, Vec<BTreeSet<String>>>,
    /// operator → operators that cannot hold over the same arguments.
    contradicts: HashMap<String, BTreeSet<String>>,
}

impl SemanticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration if `op` is a reserved declaration operator.
    /// Returns true when the fact was consumed as a declaration.
    pub fn apply_declaration(&mut self, op: &str, args: &[String]) -> bool {
        match op {
            DECL_TRANSITIVE if args.len() == 1 => {
                self.transitive.insert(args[0].clone());
                true
            }
            DECL_SYMMETRIC if args.len() == 1 => {
                self.symmetric.insert(args[0].clone());
                true
            }
            DECL_REFLEXIVE if args.len() == 1 => {
                self.reflexive.insert(args[0].clone());
                true
            }
            DECL_INHERITABLE if args.len() == 1 => {
                self.inheritable.insert(args[0].clone());
                true
            }
            DECL_MUTUALLY_EXCLUSIVE if args.len() >= 3 => {
                let values: BTreeSet<String> = args[1..].iter().cloned().collect();
                self.mutually_exclusive
                    .entry(args[0].clone())
                    .or_default()
                    .push(values);
                true
            }
            DECL_CONTRADICTS if args.len() == 2 => {
                // Stored in both directions so lookup is single-step.
                self.contradicts
                    .entry(args[0].clone())
                    .or_default()
                    .insert(args[1].clone());
                self.contradicts
                    .entry(args[1].clone())
                    .or_default()
                    .insert(args[0].clone());
                true
            }
            _ => false,
        }
    }

    pub fn is_transitive(&self, op: &str) -> bool {
        self.transitive.contains(op)
    }

    pub fn is_symmetric(&self, op: &str) -> bool {
        self.symmetric.contains(op)
    }

    pub fn is_reflexive(&self, op: &str) -> bool {
        self.reflexive.contains(op)
    }

    pub fn is_inheritable(&self, op: &str) -> bool {
        self.inheritable.contains(op)
    }

    pub fn exclusive_sets(&self, op: &str) -> &[BTreeSet<String>] {
        self.mutually_exclusive
            .get(op)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contradicting_operators(&self, op: &str) -> impl Iterator<Item = &str> {
        self.contradicts
            .get(op)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }
}

/// Surface-alias → canonical-name rewriting, applied to operators and
/// atoms before compilation.
#[derive(Debug, Default)]
pub struct CanonicalIndex {
    rewrites: HashMap<String, String>,
}

impl CanonicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Canonical canonical alias1 [alias2 …]`. Returns true when consumed.
    pub fn apply_declaration(&mut self, op: &str, args: &[String]) -> bool {
        if op != DECL_CANONICAL || args.len() < 2 {
            return false;
        }
        let canonical = &args[0];
        for alias in &args[1..] {
            if alias != canonical {
                self.rewrites.insert(alias.clone(), canonical.clone());
            }
        }
        true
    }

    /// Resolve a surface name. Chains are followed with a step bound so a
    /// cyclic declaration cannot loop.
    pub fn canonicalize<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        for _ in 0..8 {
            match self.rewrites.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.rewrites.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn transitive_declaration() {
        let mut idx = SemanticIndex::new();
        assert!(idx.apply_declaration(DECL_TRANSITIVE, &strings(&["isA"])));
        assert!(idx.is_transitive("isA"));
        assert!(!idx.is_transitive("loves"));
    }

    #[test]
    fn mutually_exclusive_needs_operator_and_two_values() {
        let mut idx = SemanticIndex::new();
        assert!(!idx.apply_declaration(DECL_MUTUALLY_EXCLUSIVE, &strings(&["hasState", "Open"])));
        assert!(idx.apply_declaration(
            DECL_MUTUALLY_EXCLUSIVE,
            &strings(&["hasState", "Open", "Closed"])
        ));
        let sets = idx.exclusive_sets("hasState");
        assert_eq!(sets.len(), 1);
        assert!(sets[0].contains("Open") && sets[0].contains("Closed"));
    }

    #[test]
    fn contradicts_is_symmetric_in_lookup() {
        let mut idx = SemanticIndex::new();
        idx.apply_declaration(DECL_CONTRADICTS, &strings(&["likes", "hates"]));
        assert!(idx.contradicting_operators("likes").any(|o| o == "hates"));
        assert!(idx.contradicting_operators("hates").any(|o| o == "likes"));
    }

    #[test]
    fn non_declaration_operators_are_ignored() {
        let mut idx = SemanticIndex::new();
        assert!(!idx.apply_declaration("loves", &strings(&["John", "Mary"])));
    }

    #[test]
    fn canonical_rewrites_aliases() {
        let mut idx = CanonicalIndex::new();
        assert!(idx.apply_declaration(DECL_CANONICAL, &strings(&["loves", "adores", "cherishes"])));
        assert_eq!(idx.canonicalize("adores"), "loves");
        assert_eq!(idx.canonicalize("cherishes"), "loves");
        assert_eq!(idx.canonicalize("loves"), "loves");
        assert!(idx.is_alias("adores"));
    }

    #[test]
    fn canonical_chains_terminate() {
        let mut idx = CanonicalIndex::new();
        idx.apply_declaration(DECL_CANONICAL, &strings(&["b", "a"]));
        idx.apply_declaration(DECL_CANONICAL, &strings(&["c", "b"]));
        assert_eq!(idx.canonicalize("a"), "c");
        // A cycle cannot hang the resolver.
        idx.apply_declaration(DECL_CANONICAL, &strings(&["a", "c"]));
        let _ = idx.canonicalize("a");
    }

    #[test]
    fn self_alias_is_ignored() {
        let mut idx = CanonicalIndex::new();
        idx.apply_declaration(DECL_CANONICAL, &strings(&["x", "x"]));
        assert!(!idx.is_alias("x"));
    }
}
