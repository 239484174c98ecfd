// signal.rs — Signal set types for component inputs and outputs
//
// A component's inputs and outputs are either a flat set of named signals
// or a pair of sets (the tuple form produced by fanout combinators). Type
// equality is structural set equality; signal order never matters.
//
// Preconditions: none (types only).
// Postconditions: Display is deterministic (names sorted).
// Failure modes: none.
// Side effects: none.

use std::collections::BTreeSet;
use std::fmt;

use crate::ast::{Ident, SignalList};

/// An unordered set of signal names (kept sorted for deterministic output).
pub type SignalSet = BTreeSet<String>;

/// Inputs or outputs of an arrow expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignalType {
    Flat(SignalSet),
    Tuple(SignalSet, SignalSet),
}

impl SignalType {
    pub fn flat<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        SignalType::Flat(names.into_iter().map(Into::into).collect())
    }

    pub fn tuple<S: Into<String>, T: Into<String>>(
        top: impl IntoIterator<Item = S>,
        bottom: impl IntoIterator<Item = T>,
    ) -> Self {
        SignalType::Tuple(
            top.into_iter().map(Into::into).collect(),
            bottom.into_iter().map(Into::into).collect(),
        )
    }

    /// The type of a declared `inputs`/`outputs` clause.
    pub fn from_list(list: &SignalList) -> Self {
        let names = |ids: &[Ident]| ids.iter().map(|id| id.name.clone()).collect();
        match list {
            SignalList::Flat(ids) => SignalType::Flat(names(ids)),
            SignalList::Tuple(top, bottom) => SignalType::Tuple(names(top), names(bottom)),
        }
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, SignalType::Tuple(_, _))
    }

    /// Every name, both halves for a tuple.
    pub fn all_names(&self) -> SignalSet {
        match self {
            SignalType::Flat(set) => set.clone(),
            SignalType::Tuple(top, bottom) => top.union(bottom).cloned().collect(),
        }
    }

    /// Top half of a tuple, `None` for a flat type.
    pub fn top(&self) -> Option<&SignalSet> {
        match self {
            SignalType::Tuple(top, _) => Some(top),
            SignalType::Flat(_) => None,
        }
    }

    /// Bottom half of a tuple, `None` for a flat type.
    pub fn bottom(&self) -> Option<&SignalSet> {
        match self {
            SignalType::Tuple(_, bottom) => Some(bottom),
            SignalType::Flat(_) => None,
        }
    }
}

fn write_set(f: &mut fmt::Formatter<'_>, set: &SignalSet) -> fmt::Result {
    write!(f, "(")?;
    for (i, name) in set.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{name}")?;
    }
    write!(f, ")")
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Flat(set) => write_set(f, set),
            SignalType::Tuple(top, bottom) => {
                write_set(f, top)?;
                write!(f, ", ")?;
                write_set(f, bottom)
            }
        }
    }
}
