// id.rs — Stable identifiers for PCL compiler phases
//
// These IDs provide deterministic, span-independent identity for compiler
// artifacts. Allocated in source order; threaded through resolve,
// type_infer, analyze, lir and codegen.

/// Index of an arrow expression node in an `ExprArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Index of a scope frame in a `ScopeArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

/// Identity of a do-block variable binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Allocator for stable IDs. Produces monotonically increasing IDs in
/// allocation (source) order, ensuring deterministic assignment.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_var: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_var(&mut self) -> VarId {
        let id = VarId(self.next_var);
        self.next_var += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vars_allocated_in_order() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.alloc_var(), VarId(0));
        assert_eq!(ids.alloc_var(), VarId(1));
        assert_eq!(ids.alloc_var(), VarId(2));
    }
}
