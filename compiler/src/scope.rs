// scope.rs — Lexical scopes for do-block variables
//
// An arena of scope frames addressed by `ScopeId`. Each frame stores its
// parent index, so lookups walk upward without any owning back-pointers.
// The resolver keeps an explicit current frame and moves it with
// `push`/`pop` as it enters `then`, `else` and `let` blocks.
//
// Preconditions: none.
// Postconditions: frame 0 is the root; every binding has a unique `VarId`.
// Failure modes: `bind` refuses a name already bound in the current frame.
// Side effects: none.

use std::collections::HashMap;

use crate::id::{IdAllocator, ScopeId, VarId};

#[derive(Debug, Clone)]
struct Frame {
    parent: Option<ScopeId>,
    bindings: HashMap<String, VarId>,
}

/// A variable introduced by an assignment or a let binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub scope: ScopeId,
}

#[derive(Debug, Clone)]
pub struct ScopeArena {
    frames: Vec<Frame>,
    vars: HashMap<VarId, Binding>,
    current: ScopeId,
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeArena {
    pub fn new() -> Self {
        ScopeArena {
            frames: vec![Frame {
                parent: None,
                bindings: HashMap::new(),
            }],
            vars: HashMap::new(),
            current: ScopeId(0),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    /// Open a child of the current frame and make it current.
    pub fn push(&mut self) -> ScopeId {
        let id = ScopeId(self.frames.len() as u32);
        self.frames.push(Frame {
            parent: Some(self.current),
            bindings: HashMap::new(),
        });
        self.current = id;
        id
    }

    /// Return to the parent of the current frame. Popping the root is a no-op.
    pub fn pop(&mut self) {
        if let Some(parent) = self.frames[self.current.index()].parent {
            self.current = parent;
        }
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.frames[scope.index()].parent
    }

    /// Bind `name` in the current frame. Returns `None` if the name is
    /// already bound in this frame (outer frames may be shadowed).
    pub fn bind(&mut self, name: &str, alloc: &mut IdAllocator) -> Option<VarId> {
        if self.in_current_scope(name) {
            return None;
        }
        let var = alloc.alloc_var();
        let current = self.current;
        self.frames[current.index()]
            .bindings
            .insert(name.to_string(), var);
        self.vars.insert(
            var,
            Binding {
                name: name.to_string(),
                scope: current,
            },
        );
        Some(var)
    }

    pub fn in_current_scope(&self, name: &str) -> bool {
        self.frames[self.current.index()]
            .bindings
            .contains_key(name)
    }

    /// Look `name` up from the current frame outward.
    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.lookup_from(self.current, name)
    }

    /// Look `name` up from `scope` outward.
    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let frame = &self.frames[id.index()];
            if let Some(var) = frame.bindings.get(name) {
                return Some(*var);
            }
            cursor = frame.parent;
        }
        None
    }

    /// The binding record of a variable.
    pub fn binding(&self, var: VarId) -> Option<&Binding> {
        self.vars.get(&var)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents() {
        let mut ids = IdAllocator::new();
        let mut scopes = ScopeArena::new();
        let x = scopes.bind("x", &mut ids).expect("bind x");
        let inner = scopes.push();
        assert_eq!(scopes.lookup("x"), Some(x));
        assert!(!scopes.in_current_scope("x"));
        let y = scopes.bind("y", &mut ids).expect("bind y");
        scopes.pop();
        assert_eq!(scopes.lookup("y"), None);
        assert_eq!(scopes.lookup_from(inner, "y"), Some(y));
        assert_eq!(scopes.parent(inner), Some(scopes.root()));
    }

    #[test]
    fn duplicate_in_same_frame_rejected() {
        let mut ids = IdAllocator::new();
        let mut scopes = ScopeArena::new();
        assert!(scopes.bind("x", &mut ids).is_some());
        assert!(scopes.bind("x", &mut ids).is_none());
    }

    #[test]
    fn shadowing_in_child_frame_allowed() {
        let mut ids = IdAllocator::new();
        let mut scopes = ScopeArena::new();
        let outer = scopes.bind("x", &mut ids).expect("outer");
        scopes.push();
        let inner = scopes.bind("x", &mut ids).expect("inner");
        assert_ne!(outer, inner);
        assert_eq!(scopes.lookup("x"), Some(inner));
        scopes.pop();
        assert_eq!(scopes.lookup("x"), Some(outer));
    }

    #[test]
    fn sibling_frames_are_independent() {
        let mut ids = IdAllocator::new();
        let mut scopes = ScopeArena::new();
        let then_scope = scopes.push();
        scopes.bind("t", &mut ids);
        scopes.pop();
        let else_scope = scopes.push();
        assert_eq!(scopes.lookup("t"), None);
        scopes.pop();
        assert_ne!(then_scope, else_scope);
        assert_eq!(scopes.frame_count(), 3);
    }

    #[test]
    fn binding_records_name_and_scope() {
        let mut ids = IdAllocator::new();
        let mut scopes = ScopeArena::new();
        scopes.push();
        let v = scopes.bind("v", &mut ids).expect("bind");
        let b = scopes.binding(v).expect("binding");
        assert_eq!(b.name, "v");
        assert_eq!(b.scope, ScopeId(1));
    }

    #[test]
    fn pop_root_is_noop() {
        let mut scopes = ScopeArena::new();
        scopes.pop();
        assert_eq!(scopes.current(), scopes.root());
    }
}
