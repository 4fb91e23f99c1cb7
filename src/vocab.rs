//! Session vocabulary: canonical name → atom.
//!
//! Atoms are created lazily on first reference, never destroyed, and never
//! rebound to a different vector. The vocabulary is monotonic even across
//! rejected learn batches: an atom once seen stays known.

use std::collections::HashMap;

use crate::hdc::{Strategy, Vector};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AtomId(u32);

impl AtomId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type tags from the core hierarchy. Assigned at most once per atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Entity,
    Person,
    Object,
    Place,
    Property,
    State,
    Category,
    Relation,
    Action,
    TimePoint,
    Number,
    Role,
    Event,
}

impl TypeTag {
    pub fn parse(name: &str) -> Option<TypeTag> {
        match name {
            "Entity" => Some(TypeTag::Entity),
            "Person" => Some(TypeTag::Person),
            "Object" => Some(TypeTag::Object),
            "Place" => Some(TypeTag::Place),
            "Property" => Some(TypeTag::Property),
            "State" => Some(TypeTag::State),
            "Category" => Some(TypeTag::Category),
            "Relation" => Some(TypeTag::Relation),
            "Action" => Some(TypeTag::Action),
            "TimePoint" => Some(TypeTag::TimePoint),
            "Number" => Some(TypeTag::Number),
            "Role" => Some(TypeTag::Role),
            "Event" => Some(TypeTag::Event),
            _ => None,
        }
    }
}

pub struct Vocabulary {
    map: HashMap<String, AtomId>,
    names: Vec<String>,
    vectors: Vec<Vector>,
    type_tags: Vec<Option<TypeTag>>,
    /// Theory id passed to `create_from_name`; pushed while a theory block
    /// is loading so same-named atoms in different theories get distinct
    /// material.
    theory_stack: Vec<String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            names: Vec::new(),
            vectors: Vec::new(),
            type_tags: Vec::new(),
            theory_stack: vec!["Core".to_string()],
        }
    }

    pub fn current_theory(&self) -> &str {
        self.theory_stack.last().map(String::as_str).unwrap_or("Core")
    }

    pub fn push_theory(&mut self, theory_id: &str) {
        self.theory_stack.push(theory_id.to_string());
    }

    pub fn pop_theory(&mut self) {
        if self.theory_stack.len() > 1 {
            self.theory_stack.pop();
        }
    }

    /// Return the atom for `name`, creating it through the strategy on
    /// first sight.
    pub fn intern(&mut self, strategy: &mut dyn Strategy, name: &str) -> AtomId {
        if let Some(&id) = self.map.get(name) {
            return id;
        }
        let theory = self.current_theory().to_string();
        let vector = strategy.create_from_name(name, &theory);
        self.insert(name, vector)
    }

    /// Intern a name with an externally supplied vector (exported facts
    /// become referable atoms carrying the fact's vector).
    pub fn intern_with_vector(&mut self, name: &str, vector: Vector) -> AtomId {
        if let Some(&id) = self.map.get(name) {
            // Atoms cannot be rebound; the first vector stands.
            return id;
        }
        self.insert(name, vector)
    }

    fn insert(&mut self, name: &str, vector: Vector) -> AtomId {
        let id = AtomId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.vectors.push(vector);
        self.type_tags.push(None);
        self.map.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<AtomId> {
        self.map.get(name).copied()
    }

    pub fn name(&self, id: AtomId) -> &str {
        &self.names[id.index()]
    }

    pub fn vector(&self, id: AtomId) -> &Vector {
        &self.vectors[id.index()]
    }

    pub fn type_tag(&self, id: AtomId) -> Option<TypeTag> {
        self.type_tags[id.index()]
    }

    /// Assign a type tag. Once set, a tag cannot change; a conflicting
    /// assignment is refused.
    pub fn set_type_tag(&mut self, id: AtomId, tag: TypeTag) -> bool {
        match self.type_tags[id.index()] {
            None => {
                self.type_tags[id.index()] = Some(tag);
                true
            }
            Some(existing) => existing == tag,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All atoms in id (first-seen) order — the deterministic candidate
    /// domain for holographic decoding.
    pub fn atoms_in_order(&self) -> impl Iterator<Item = (AtomId, &str, &Vector)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (AtomId(i as u32), name.as_str(), &self.vectors[i]))
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}
