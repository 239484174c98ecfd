// pass.rs — Pass descriptors: metadata, dependency edges, artifact IDs
//
// Declares the compiler's semantic passes (parse runs before the pipeline),
// the passes each one consumes and the artifacts it produces. The pipeline
// runner uses this table to run the smallest pass subset for an --emit
// target.

use std::collections::HashSet;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

/// Identifies each compiler pass (parse excluded, it runs before the runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Resolve,
    BuildHir,
    TypeInfer,
    Analyze,
    BuildLir,
    Codegen,
}

/// Artifacts held by `CompilationState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Symbols,   // ModuleSymbols
    Arena,     // ExprArena
    Lir,       // LirLeaf
    Generated, // GeneratedCode
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a compiler pass.
pub struct PassDescriptor {
    /// Name used in verbose output and logs.
    pub name: &'static str,
    /// Passes whose outputs this pass consumes.
    pub inputs: &'static [PassId],
    pub outputs: &'static [ArtifactId],
    /// Postcondition summary (documentation only).
    pub invariants: &'static str,
    /// Which component dialect the pass applies to; the runner skips it
    /// for the other one.
    pub dialect: Dialect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Any,
    Arrow,
    Leaf,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Resolve => PassDescriptor {
            name: "resolve",
            inputs: &[],
            outputs: &[ArtifactId::Symbols],
            invariants: "imports loaded, declarations and do-block scopes bound",
            dialect: Dialect::Any,
        },
        PassId::BuildHir => PassDescriptor {
            name: "build_hir",
            inputs: &[PassId::Resolve],
            outputs: &[ArtifactId::Arena],
            invariants: "every non-root node has its parent index",
            dialect: Dialect::Arrow,
        },
        PassId::TypeInfer => PassDescriptor {
            name: "type_infer",
            inputs: &[PassId::BuildHir],
            outputs: &[ArtifactId::Arena],
            invariants: "bottom-up typeable nodes typed",
            dialect: Dialect::Arrow,
        },
        PassId::Analyze => PassDescriptor {
            name: "analyze",
            inputs: &[PassId::TypeInfer],
            outputs: &[ArtifactId::Arena, ArtifactId::Symbols],
            invariants: "context types derived, root matches the declaration",
            dialect: Dialect::Arrow,
        },
        PassId::BuildLir => PassDescriptor {
            name: "build_lir",
            inputs: &[PassId::Resolve],
            outputs: &[ArtifactId::Lir],
            invariants: "every do-block operand pre-resolved",
            dialect: Dialect::Leaf,
        },
        PassId::Codegen => PassDescriptor {
            name: "codegen",
            inputs: &[PassId::Analyze, PassId::BuildLir],
            outputs: &[ArtifactId::Generated],
            invariants: "Python module emitted",
            dialect: Dialect::Any,
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

pub const ALL_PASSES: [PassId; 6] = [
    PassId::Resolve,
    PassId::BuildHir,
    PassId::TypeInfer,
    PassId::Analyze,
    PassId::BuildLir,
    PassId::Codegen,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codegen_needs_every_pass() {
        assert_eq!(
            required_passes(PassId::Codegen),
            vec![
                PassId::Resolve,
                PassId::BuildHir,
                PassId::TypeInfer,
                PassId::Analyze,
                PassId::BuildLir,
                PassId::Codegen,
            ]
        );
    }

    #[test]
    fn lir_skips_type_passes() {
        assert_eq!(
            required_passes(PassId::BuildLir),
            vec![PassId::Resolve, PassId::BuildLir]
        );
    }

    #[test]
    fn resolve_is_minimal() {
        assert_eq!(required_passes(PassId::Resolve), vec![PassId::Resolve]);
    }

    #[test]
    fn dependencies_precede_dependents() {
        for pass in ALL_PASSES {
            let order = required_passes(pass);
            let pos = |p: &PassId| order.iter().position(|q| q == p);
            for dep in descriptor(pass).inputs {
                assert!(
                    pos(dep) < pos(&pass),
                    "{:?} depends on {:?} but runs first",
                    pass,
                    dep
                );
            }
        }
    }

    #[test]
    fn dialects_partition_type_and_leaf_passes() {
        assert_eq!(descriptor(PassId::Analyze).dialect, Dialect::Arrow);
        assert_eq!(descriptor(PassId::BuildLir).dialect, Dialect::Leaf);
        assert!(ALL_PASSES
            .iter()
            .all(|p| !descriptor(*p).outputs.is_empty()));
    }
}
