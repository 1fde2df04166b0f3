//! Small dense integer identifiers for ground atoms.
//!
//! The solver only ever sees integers: atom `n` is the `n`-th ground
//! atom registered, and a negative integer `-n` is its negation as
//! failure. The registry remembers the mapping in both directions so
//! that the solver's answers can be translated back.

use std::collections::BTreeMap;

use aspify_syntax::*;

use super::GroundingError;

/// Map atom identifiers back to ground atoms.
pub type IdMap = BTreeMap<i32, GroundAtom>;

/// A bidirectional map between ground atoms and positive integers.
///
/// A registry belongs to exactly one grounding run; nothing is shared
/// between instances.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Registry {
    ids: BTreeMap<GroundAtom, i32>,
    atoms: IdMap,
    next: i32,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            ids: BTreeMap::new(),
            atoms: IdMap::new(),
            next: 1,
        }
    }

    /// The signed identifier of `literal`'s predicate applied to `terms`:
    /// registered on first use, cached afterwards. Negative literals
    /// get the negated identifier of their atom.
    pub fn id_for(
        &mut self,
        literal: &Literal<Term>,
        terms: Vec<Constant>,
    ) -> Result<i32, GroundingError> {
        let id = self.atom_id(Application::new(literal.atom().predicate.clone(), terms))?;
        Ok(if literal.is_negative() { -id } else { id })
    }

    /// The (positive) identifier of a ground atom.
    pub fn atom_id(&mut self, atom: GroundAtom) -> Result<i32, GroundingError> {
        if let Some(&id) = self.ids.get(&atom) {
            return Ok(id);
        }
        let id = self.fresh_id()?;
        self.atoms.insert(id, atom.clone());
        self.ids.insert(atom, id);
        Ok(id)
    }

    /// A new identifier that denotes no atom, e.g., for the solver's
    /// own bookkeeping. It never collides with an atom's identifier.
    pub fn fresh_id(&mut self) -> Result<i32, GroundingError> {
        let id = self.next;
        self.next = id
            .checked_add(1)
            .ok_or(GroundingError::IdsExhausted(self.atoms.len()))?;
        Ok(id)
    }

    /// Find the atom an identifier (or its negation) denotes.
    pub fn reverse_lookup(&self, id: i32) -> Option<&GroundAtom> {
        self.atoms.get(&id.abs())
    }

    /// Every registered atom by identifier.
    pub fn literals(&self) -> &IdMap {
        &self.atoms
    }

    pub fn into_literals(self) -> IdMap {
        self.atoms
    }

    /// The number of registered atoms (not counting fresh identifiers).
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Forget everything and start counting from 1 again.
    pub fn reset(&mut self) {
        self.ids.clear();
        self.atoms.clear();
        self.next = 1;
    }
}
