// type_infer.rs — Pass 2: bottom-up signal type inference
//
// Visits the expression arena children-first and writes the input and
// output signal types of every node whose type follows from its own
// content or its children: component references take their leaf
// signature, wires and merges take their mapping sets, and combinators
// combine their children. `first`, `second`, `split` and `if` need their
// surrounding context and are left for pass 3.
//
// Preconditions: `arena` was built from the component's arrow expression;
//   `symbols` is the pass 1 result for the same module.
// Postconditions: every node that is typeable bottom-up has both types set.
//   Already-typed nodes are left untouched, so the pass is idempotent.
// Failure modes: duplicate mapping identifiers produce `Diagnostic` entries.
//   Nodes that would need a nested tuple stay untyped (reported by pass 3).
// Side effects: mutates node types in `arena`.

use crate::ast::{Ident, MergeSource, Operand, WireMapping};
use crate::diag::{codes, Diagnostic};
use crate::hir::{ExprArena, NodeKind};
use crate::id::NodeId;
use crate::resolve::{duplicates, ModuleSymbols};
use crate::signal::{SignalSet, SignalType};

/// Mapping target that discards its value.
pub const DISCARD: &str = "_";

// ── Combinator rules ────────────────────────────────────────────────────────

/// Types of a node derived from its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTypes {
    pub inputs: Option<SignalType>,
    pub outputs: Option<SignalType>,
    /// A tuple fanout would need a tuple inside a tuple.
    pub nested: bool,
}

/// Pair two types into a tuple. Only flat halves can be paired.
fn pair(left: Option<&SignalType>, right: Option<&SignalType>, nested: &mut bool) -> Option<SignalType> {
    match (left?, right?) {
        (SignalType::Flat(l), SignalType::Flat(r)) => Some(SignalType::Tuple(l.clone(), r.clone())),
        _ => {
            *nested = true;
            None
        }
    }
}

/// Types of a combinator node (`>>>`, `***`, `&&&`, parentheses) computed
/// from the current types of its children. `None` for other node kinds.
pub fn combinator_types(arena: &ExprArena, id: NodeId) -> Option<NodeTypes> {
    let mut nested = false;
    let (inputs, outputs) = match &arena.node(id).kind {
        NodeKind::Composition(l, r) => {
            let (l_in, _) = arena.types(*l);
            let (_, r_out) = arena.types(*r);
            (l_in.cloned(), r_out.cloned())
        }
        NodeKind::ParallelTuple(l, r) => {
            let (l_in, l_out) = arena.types(*l);
            let (r_in, r_out) = arena.types(*r);
            (
                pair(l_in, r_in, &mut nested),
                pair(l_out, r_out, &mut nested),
            )
        }
        NodeKind::ParallelScalar(l, r) => {
            let (l_in, l_out) = arena.types(*l);
            let (r_in, r_out) = arena.types(*r);
            // Best guess from whichever side is known; pass 3 checks that
            // both sides agree.
            let inputs = match (l_in, r_in) {
                (Some(SignalType::Flat(a)), Some(SignalType::Flat(b))) => {
                    Some(SignalType::Flat(a.union(b).cloned().collect()))
                }
                (Some(t), _) | (None, Some(t)) => Some(t.clone()),
                (None, None) => None,
            };
            (inputs, pair(l_out, r_out, &mut nested))
        }
        NodeKind::Paren(c) => {
            let (c_in, c_out) = arena.types(*c);
            (c_in.cloned(), c_out.cloned())
        }
        _ => return None,
    };
    Some(NodeTypes {
        inputs,
        outputs,
        nested,
    })
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Infer node types bottom-up. Returns the diagnostics produced.
pub fn infer(arena: &mut ExprArena, symbols: &ModuleSymbols) -> Vec<Diagnostic> {
    let mut ctx = InferCtx {
        symbols,
        diagnostics: Vec::new(),
    };
    let order: Vec<NodeId> = arena.post_order().collect();
    for id in order {
        if arena.node(id).is_typed() {
            continue;
        }
        let types = ctx.node_types(arena, id);
        arena.set_types(id, types.inputs, types.outputs);
    }
    log::trace!("inferred types for {} nodes", arena.len());
    ctx.diagnostics
}

// ── Internal context ────────────────────────────────────────────────────────

struct InferCtx<'a> {
    symbols: &'a ModuleSymbols,
    diagnostics: Vec<Diagnostic>,
}

impl InferCtx<'_> {
    fn node_types(&mut self, arena: &ExprArena, id: NodeId) -> NodeTypes {
        if let Some(types) = combinator_types(arena, id) {
            return types;
        }
        let (inputs, outputs) = match &arena.node(id).kind {
            NodeKind::Identifier(name) => match self.symbols.leaf_of(&name.name) {
                Some(leaf) => (Some(leaf.inputs.clone()), Some(leaf.outputs.clone())),
                None => (None, None),
            },
            NodeKind::Merge(mappings) => {
                let mut top: Vec<&Ident> = Vec::new();
                let mut bottom: Vec<&Ident> = Vec::new();
                for m in mappings {
                    match &m.source {
                        MergeSource::Top(from) => top.push(from),
                        MergeSource::Bottom(from) => bottom.push(from),
                        MergeSource::Literal(_) => {}
                    }
                }
                let to: Vec<&Ident> = mappings
                    .iter()
                    .map(|m| &m.to)
                    .filter(|t| t.name != DISCARD)
                    .collect();
                self.report_duplicates(&top, "merge top mapping contains duplicate identifier");
                self.report_duplicates(&bottom, "merge bottom mapping contains duplicate identifier");
                self.report_duplicates(&to, "merge output mapping contains duplicate identifier");
                (
                    Some(SignalType::Tuple(names(top), names(bottom))),
                    Some(SignalType::Flat(names(to))),
                )
            }
            NodeKind::Wire(mappings) => {
                let (ins, outs) = wire_sides(mappings);
                self.report_duplicates(&ins, "wire mapping contains duplicate input identifier");
                self.report_duplicates(&outs, "wire mapping contains duplicate output identifier");
                (
                    Some(SignalType::Flat(names(ins))),
                    Some(SignalType::Flat(names(outs))),
                )
            }
            NodeKind::WireTuple(top, bottom) => {
                let (top_in, top_out) = wire_sides(top);
                let (bottom_in, bottom_out) = wire_sides(bottom);
                self.report_duplicates(
                    &top_in,
                    "tuple wire mapping contains duplicate top input identifier",
                );
                self.report_duplicates(
                    &top_out,
                    "tuple wire mapping contains duplicate top output identifier",
                );
                self.report_duplicates(
                    &bottom_in,
                    "tuple wire mapping contains duplicate bottom input identifier",
                );
                self.report_duplicates(
                    &bottom_out,
                    "tuple wire mapping contains duplicate bottom output identifier",
                );
                (
                    Some(SignalType::Tuple(names(top_in), names(bottom_in))),
                    Some(SignalType::Tuple(names(top_out), names(bottom_out))),
                )
            }
            // Need their context: derived in pass 3.
            NodeKind::First(_) | NodeKind::Second(_) | NodeKind::Split | NodeKind::If { .. } => {
                (None, None)
            }
            NodeKind::Error => (None, None),
            NodeKind::Composition(..)
            | NodeKind::ParallelTuple(..)
            | NodeKind::ParallelScalar(..)
            | NodeKind::Paren(_) => (None, None),
        };
        NodeTypes {
            inputs,
            outputs,
            nested: false,
        }
    }

    fn report_duplicates(&mut self, ids: &[&Ident], message: &str) {
        for dup in duplicates(ids.iter().copied()) {
            self.diagnostics.push(Diagnostic::error(
                codes::E0200,
                dup.span,
                format!("{} {}", message, dup),
            ));
        }
    }
}

/// Input identifiers (literal sources excluded) and kept output targets
/// (`_` excluded) of a wire mapping list.
fn wire_sides(mappings: &[WireMapping]) -> (Vec<&Ident>, Vec<&Ident>) {
    let inputs = mappings
        .iter()
        .filter_map(|m| match &m.from {
            Operand::Ident(id) | Operand::State(id) => Some(id),
            Operand::Literal(_) => None,
        })
        .collect();
    let outputs = mappings
        .iter()
        .map(|m| &m.to)
        .filter(|t| t.name != DISCARD)
        .collect();
    (inputs, outputs)
}

fn names<'i>(ids: impl IntoIterator<Item = &'i Ident>) -> SignalSet {
    ids.into_iter().map(|id| id.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Definition;
    use crate::registry::{ComponentSignature, Registry, SignalShape};

    fn leaf(inputs: SignalShape, outputs: SignalShape) -> ComponentSignature {
        ComponentSignature {
            inputs: Some(inputs),
            outputs: Some(outputs),
            configuration: Some(vec![]),
            configure: true,
            initialise: true,
        }
    }

    fn flat(names: &[&str]) -> SignalShape {
        SignalShape::Flat(names.iter().map(|s| s.to_string()).collect())
    }

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.insert_component("ab_c", leaf(flat(&["a", "b"]), flat(&["c"])));
        reg.insert_component("c_d", leaf(flat(&["c"]), flat(&["d"])));
        reg.insert_component("a_e", leaf(flat(&["a"]), flat(&["e"])));
        reg
    }

    /// Parse, resolve and infer `arrow` with declarations `p` (ab_c),
    /// `q` (c_d) and `r` (a_e) in scope.
    fn infer_arrow(arrow: &str) -> (ExprArena, Vec<Diagnostic>) {
        let src = format!(
            "import ab_c as abc\nimport c_d as cd\nimport a_e as ae\n\
             component c inputs a, b outputs d\n\
             declare p := new abc q := new cd r := new ae\n\
             as {arrow}"
        );
        let parsed = crate::parser::parse(&src);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let module = parsed.module.expect("module");
        let resolved = crate::resolve::resolve(&module, "c.pcl", &registry());
        let Definition::Arrow(expr) = &module.component.definition else {
            panic!("expected arrow")
        };
        let mut arena = ExprArena::build(expr);
        let diags = infer(&mut arena, &resolved.symbols);
        (arena, diags)
    }

    fn root_types(arena: &ExprArena) -> (Option<String>, Option<String>) {
        let (i, o) = arena.types(arena.root());
        (i.map(|t| t.to_string()), o.map(|t| t.to_string()))
    }

    fn messages(diags: &[Diagnostic]) -> Vec<String> {
        diags.iter().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn identifier_takes_leaf_signature() {
        let (arena, diags) = infer_arrow("p");
        assert!(diags.is_empty());
        assert_eq!(
            root_types(&arena),
            (Some("(a, b)".into()), Some("(c)".into()))
        );
    }

    #[test]
    fn composition_joins_ends() {
        let (arena, _) = infer_arrow("p >>> q");
        assert_eq!(
            root_types(&arena),
            (Some("(a, b)".into()), Some("(d)".into()))
        );
    }

    #[test]
    fn tuple_fanout_pairs_both_ends() {
        let (arena, _) = infer_arrow("p *** r");
        assert_eq!(
            root_types(&arena),
            (Some("(a, b), (a)".into()), Some("(c), (e)".into()))
        );
    }

    #[test]
    fn scalar_fanout_unions_inputs() {
        let (arena, _) = infer_arrow("p &&& r");
        assert_eq!(
            root_types(&arena),
            (Some("(a, b)".into()), Some("(c), (e)".into()))
        );
    }

    #[test]
    fn scalar_fanout_falls_back_to_known_side() {
        let (arena, _) = infer_arrow("p &&& first q");
        let (inputs, outputs) = root_types(&arena);
        assert_eq!(inputs, Some("(a, b)".into()));
        assert_eq!(outputs, None);
    }

    #[test]
    fn context_dependent_nodes_left_absent() {
        for arrow in ["first p", "second p", "split", "if @k then p else p"] {
            let (arena, _) = infer_arrow(arrow);
            assert!(!arena.node(arena.root()).is_typed(), "{arrow}");
        }
    }

    #[test]
    fn paren_passes_through() {
        let (arena, _) = infer_arrow("(p)");
        assert_eq!(
            root_types(&arena),
            (Some("(a, b)".into()), Some("(c)".into()))
        );
    }

    #[test]
    fn wire_types_from_mappings() {
        let (arena, diags) = infer_arrow("wire a -> x, b -> _, 3 -> y");
        assert!(diags.is_empty());
        assert_eq!(
            root_types(&arena),
            (Some("(a, b)".into()), Some("(x, y)".into()))
        );
    }

    #[test]
    fn wire_duplicates_reported() {
        let (_, diags) = infer_arrow("wire a -> x, a -> y, b -> x, c -> _, d -> _");
        assert_eq!(
            messages(&diags),
            vec![
                "wire mapping contains duplicate input identifier a",
                "wire mapping contains duplicate output identifier x",
            ]
        );
    }

    #[test]
    fn tuple_wire_types_and_duplicates() {
        let (arena, diags) = infer_arrow("wire (a -> x, a -> y), (b -> z, c -> z)");
        assert_eq!(
            root_types(&arena),
            (Some("(a), (b, c)".into()), Some("(x, y), (z)".into()))
        );
        assert_eq!(
            messages(&diags),
            vec![
                "tuple wire mapping contains duplicate top input identifier a",
                "tuple wire mapping contains duplicate bottom output identifier z",
            ]
        );
    }

    #[test]
    fn merge_types_and_duplicates() {
        let (arena, diags) = infer_arrow("merge top[c] -> x, bottom[e] -> y, 1 -> z, top[d] -> _");
        assert!(diags.is_empty());
        assert_eq!(
            root_types(&arena),
            (Some("(c, d), (e)".into()), Some("(x, y, z)".into()))
        );

        let (_, diags) = infer_arrow("merge top[c] -> x, top[c] -> y, bottom[e] -> x");
        assert_eq!(
            messages(&diags),
            vec![
                "merge top mapping contains duplicate identifier c",
                "merge output mapping contains duplicate identifier x",
            ]
        );
    }

    #[test]
    fn nested_tuple_left_untyped() {
        let (arena, diags) = infer_arrow("(p *** r) *** q");
        assert!(diags.is_empty());
        assert!(!arena.node(arena.root()).is_typed());
        let types = combinator_types(&arena, arena.root()).expect("combinator");
        assert!(types.nested);
    }

    #[test]
    fn inference_is_idempotent() {
        let parsed = crate::parser::parse(
            "import ab_c as abc\ncomponent c inputs a, b outputs c declare p := new abc as wire a -> a, a -> b >>> p",
        );
        let module = parsed.module.expect("module");
        let symbols = crate::resolve::resolve(&module, "c.pcl", &registry()).symbols;
        let Definition::Arrow(expr) = &module.component.definition else {
            panic!("expected arrow")
        };
        let mut arena = ExprArena::build(expr);
        let first = infer(&mut arena, &symbols);
        assert_eq!(first.len(), 1);
        let before = root_types(&arena);
        let again = infer(&mut arena, &symbols);
        assert!(again.is_empty());
        assert_eq!(root_types(&arena), before);
    }

    #[test]
    fn unknown_component_left_absent() {
        let (arena, _) = infer_arrow("p >>> nope");
        let (inputs, outputs) = root_types(&arena);
        assert_eq!(inputs, Some("(a, b)".into()));
        assert_eq!(outputs, None);
    }
}
