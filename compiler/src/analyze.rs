// analyze.rs — Pass 3: contextual type derivation and verification
//
// Derives the types of `first`, `second`, `split` and `if` nodes from the
// signals flowing into them, recomputes the combinators above them, then
// verifies composition compatibility, fanout symmetry, conditional branch
// agreement and condition terminals, and finally checks the root against
// the declared component interface.
//
// Preconditions: `arena` has been through pass 2 (`type_infer::infer`);
//                `symbols` is the pass 1 result for the same module.
// Postconditions: `symbols.inputs`/`symbols.outputs` hold the root types
//                 when they match the declaration. Node types only ever go
//                 from unknown to known.
// Failure modes: incompatible compositions, asymmetric fanouts, mismatched
//                branches, undefined condition terminals, untypeable nodes
//                and root mismatches produce `Diagnostic` entries.
// Side effects: mutates node types in `arena` and root types in `symbols`.

use crate::ast::{Condition, Operand, Span};
use crate::diag::{codes, DiagCode, Diagnostic};
use crate::hir::{ExprArena, NodeKind};
use crate::id::NodeId;
use crate::resolve::ModuleSymbols;
use crate::signal::{SignalSet, SignalType};
use crate::type_infer::combinator_types;

// ── Public entry point ──────────────────────────────────────────────────────

/// Run contextual derivation, verification and the root check.
pub fn analyze(arena: &mut ExprArena, symbols: &mut ModuleSymbols) -> Vec<Diagnostic> {
    let mut ctx = AnalyzeCtx {
        diagnostics: Vec::new(),
    };
    let order: Vec<NodeId> = arena.post_order().collect();

    // Phase 1: contextual derivation
    let mut nested = Vec::new();
    for &id in &order {
        if derive(arena, id, &symbols.declared_inputs) == Derived::Nested {
            nested.push(id);
        }
    }

    // Phase 2: verification
    for &id in &order {
        ctx.verify_node(arena, symbols, id, nested.contains(&id));
    }

    // Phase 3: root check
    ctx.check_root(arena, symbols);

    ctx.diagnostics
}

// ── Contextual derivation ───────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Derived {
    Done,
    Nested,
}

fn derive(arena: &mut ExprArena, id: NodeId, root_inputs: &SignalType) -> Derived {
    if let Some(types) = combinator_types(arena, id) {
        if !arena.node(id).is_typed() {
            arena.set_types(id, types.inputs, types.outputs);
        }
        return if types.nested {
            Derived::Nested
        } else {
            Derived::Done
        };
    }
    if arena.node(id).is_typed() {
        return Derived::Done;
    }

    let mut nested = false;
    let (inputs, outputs) = match &arena.node(id).kind {
        NodeKind::First(child) => {
            let child = *child;
            let bottom = context(arena, id, root_inputs).map(|ctx| pass_through(&ctx, false));
            let (c_in, c_out) = arena.types(child);
            (
                half_pair(c_in, bottom.as_ref(), true, &mut nested),
                half_pair(c_out, bottom.as_ref(), true, &mut nested),
            )
        }
        NodeKind::Second(child) => {
            let child = *child;
            let top = context(arena, id, root_inputs).map(|ctx| pass_through(&ctx, true));
            let (c_in, c_out) = arena.types(child);
            (
                half_pair(c_in, top.as_ref(), false, &mut nested),
                half_pair(c_out, top.as_ref(), false, &mut nested),
            )
        }
        NodeKind::Split => match context(arena, id, root_inputs) {
            Some(SignalType::Flat(set)) => (
                Some(SignalType::Flat(set.clone())),
                Some(SignalType::Tuple(set.clone(), set)),
            ),
            Some(tuple @ SignalType::Tuple(..)) => (Some(tuple), None),
            None => (None, None),
        },
        NodeKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            let (t_in, t_out) = arena.types(*then_branch);
            let (e_in, e_out) = arena.types(*else_branch);
            (t_in.or(e_in).cloned(), t_out.or(e_out).cloned())
        }
        _ => return Derived::Done,
    };
    arena.set_types(id, inputs, outputs);
    if nested {
        Derived::Nested
    } else {
        Derived::Done
    }
}

/// The half of a `first`/`second` context that passes through untouched.
/// A flat context passes through as a whole.
fn pass_through(ctx: &SignalType, top: bool) -> SignalSet {
    match ctx {
        SignalType::Flat(set) => set.clone(),
        SignalType::Tuple(t, b) => {
            if top {
                t.clone()
            } else {
                b.clone()
            }
        }
    }
}

/// Pair a child type with the pass-through half; `child_top` says which
/// side the child occupies.
fn half_pair(
    child: Option<&SignalType>,
    other: Option<&SignalSet>,
    child_top: bool,
    nested: &mut bool,
) -> Option<SignalType> {
    let other = other?.clone();
    match child? {
        SignalType::Flat(set) => Some(if child_top {
            SignalType::Tuple(set.clone(), other)
        } else {
            SignalType::Tuple(other, set.clone())
        }),
        SignalType::Tuple(..) => {
            *nested = true;
            None
        }
    }
}

/// The input type flowing into node `id`, from its position in the tree.
/// At the root this is the component's declared inputs.
pub fn context(arena: &ExprArena, id: NodeId, root_inputs: &SignalType) -> Option<SignalType> {
    let Some(parent) = arena.node(id).parent else {
        return Some(root_inputs.clone());
    };
    let parent_ctx = || {
        arena
            .types(parent)
            .0
            .cloned()
            .or_else(|| context(arena, parent, root_inputs))
    };
    match &arena.node(parent).kind {
        NodeKind::Composition(left, right) if *right == id => arena.types(*left).1.cloned(),
        NodeKind::ParallelTuple(left, _) => half(parent_ctx(), *left == id),
        NodeKind::First(_) => half(parent_ctx(), true),
        NodeKind::Second(_) => half(parent_ctx(), false),
        NodeKind::Composition(..)
        | NodeKind::ParallelScalar(..)
        | NodeKind::If { .. }
        | NodeKind::Paren(_) => parent_ctx(),
        NodeKind::Split
        | NodeKind::Merge(_)
        | NodeKind::Wire(_)
        | NodeKind::WireTuple(..)
        | NodeKind::Identifier(_)
        | NodeKind::Error => None,
    }
}

/// Whether a sibling of `id` or of one of its ancestors holds a node that
/// earlier passes already failed on.
fn context_broken_upstream(arena: &ExprArena, id: NodeId) -> bool {
    let mut current = id;
    while let Some(parent) = arena.node(current).parent {
        if arena
            .children(parent)
            .into_iter()
            .any(|c| c != current && holds_failed_node(arena, c))
        {
            return true;
        }
        current = parent;
    }
    false
}

/// Parse error nodes and unresolved components in the subtree at `id`.
fn holds_failed_node(arena: &ExprArena, id: NodeId) -> bool {
    let node = arena.node(id);
    match node.kind {
        NodeKind::Error => true,
        NodeKind::Identifier(_) => !node.is_typed(),
        _ => arena
            .children(id)
            .into_iter()
            .any(|c| holds_failed_node(arena, c)),
    }
}

fn half(ctx: Option<SignalType>, top: bool) -> Option<SignalType> {
    match ctx? {
        SignalType::Tuple(t, b) => Some(SignalType::Flat(if top { t } else { b })),
        SignalType::Flat(_) => None,
    }
}

// ── Verification ────────────────────────────────────────────────────────────

struct AnalyzeCtx {
    diagnostics: Vec<Diagnostic>,
}

impl AnalyzeCtx {
    fn error(&mut self, code: DiagCode, span: Span, message: String) {
        self.diagnostics.push(Diagnostic::error(code, span, message));
    }

    fn verify_node(&mut self, arena: &ExprArena, symbols: &ModuleSymbols, id: NodeId, nested: bool) {
        let node = arena.node(id);
        match &node.kind {
            NodeKind::Composition(l, r) => {
                if let (Some(left_out), Some(right_in)) = (arena.types(*l).1, arena.types(*r).0) {
                    if left_out != right_in {
                        self.error(
                            codes::E0201,
                            node.span,
                            format!(
                                "attempted composition with incompatible components:\n\texpected {}\n\tgot {}",
                                left_out, right_in
                            ),
                        );
                    }
                }
            }
            NodeKind::ParallelScalar(l, r) => {
                if let (Some(left_in), Some(right_in)) = (arena.types(*l).0, arena.types(*r).0) {
                    if left_in != right_in {
                        self.error(
                            codes::E0202,
                            node.span,
                            format!(
                                "attempted fanout with incompatible components:\n\tleft = {}\n\tright = {}",
                                left_in, right_in
                            ),
                        );
                    }
                }
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let (t_in, t_out) = arena.types(*then_branch);
                let (e_in, e_out) = arena.types(*else_branch);
                if let (Some(t), Some(e)) = (t_in, e_in) {
                    if t != e {
                        self.error(
                            codes::E0203,
                            node.span,
                            format!(
                                "if components have mismatched component inputs:\n\tthen = {}\n\telse = {}",
                                t, e
                            ),
                        );
                    }
                }
                if let (Some(t), Some(e)) = (t_out, e_out) {
                    if t != e {
                        self.error(
                            codes::E0203,
                            node.span,
                            format!(
                                "if components have mismatched component outputs:\n\tthen = {}\n\telse = {}",
                                t, e
                            ),
                        );
                    }
                }
                self.verify_condition(condition, node.inputs.as_ref(), symbols);
            }
            NodeKind::Split => {
                if let Some(tuple @ SignalType::Tuple(..)) = &node.inputs {
                    self.error(
                        codes::E0208,
                        node.span,
                        format!("attempted split with tuple inputs:\n\tgot {}", tuple),
                    );
                    return;
                }
            }
            _ => {}
        }

        if nested {
            self.error(
                codes::E0209,
                node.span,
                "tuple fanout of tuple signals is not supported".to_string(),
            );
            return;
        }

        // Report an untypeable node only where the gap starts: its children
        // are typed but it is not. Unknown components were reported by pass 1,
        // and a gap whose context flows from one of them is not a new error.
        let untyped = !node.is_typed()
            && !matches!(node.kind, NodeKind::Error | NodeKind::Identifier(_))
            && arena
                .children(id)
                .iter()
                .all(|c| arena.node(*c).is_typed())
            && !context_broken_upstream(arena, id);
        if untyped {
            self.error(
                codes::E0206,
                node.span,
                format!("unable to infer the type of {}", node.kind.describe()),
            );
        }
    }

    fn verify_condition(&mut self, condition: &Condition, inputs: Option<&SignalType>, symbols: &ModuleSymbols) {
        let mut terminals = Vec::new();
        condition.for_each_terminal(&mut |op| terminals.push(op));
        for op in terminals {
            match op {
                Operand::State(id) => {
                    if !symbols.has_configuration(&id.name) {
                        self.error(
                            codes::E0204,
                            id.span,
                            format!("identifier {} not defined in component configuration", id),
                        );
                    }
                }
                Operand::Ident(id) => {
                    if let Some(inputs) = inputs {
                        if !inputs.all_names().contains(&id.name) {
                            self.error(
                                codes::E0205,
                                id.span,
                                format!("identifier {} not defined in if inputs", id),
                            );
                        }
                    }
                }
                Operand::Literal(_) => {}
            }
        }
    }

    // ── Root ────────────────────────────────────────────────────────────

    fn check_root(&mut self, arena: &ExprArena, symbols: &mut ModuleSymbols) {
        let root = arena.node(arena.root());
        let span = root.span;

        symbols.inputs = match &root.inputs {
            Some(got) if *got != symbols.declared_inputs => {
                self.error(
                    codes::E0207,
                    span,
                    format!(
                        "component defines mismatched inputs:\n\texpected {}\n\tgot {}",
                        symbols.declared_inputs, got
                    ),
                );
                None
            }
            other => other.clone(),
        };
        symbols.outputs = match &root.outputs {
            Some(got) if *got != symbols.declared_outputs => {
                self.error(
                    codes::E0207,
                    span,
                    format!(
                        "component defines mismatched outputs:\n\texpected {}\n\tgot {}",
                        symbols.declared_outputs, got
                    ),
                );
                None
            }
            other => other.clone(),
        };
    }
}
