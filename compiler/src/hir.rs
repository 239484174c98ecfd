// hir.rs — Arena form of arrow expressions.
//
// Flattens the AST expression tree into an `ExprArena` of nodes addressed
// by `NodeId`. Each node stores its parent as a plain index, which lets the
// contextual pass walk upward without reference cycles, and carries the
// `inputs`/`outputs` slots that the resolver passes fill in.
//
// Preconditions: built from a parsed arrow expression (may contain `Error`
//   nodes from syntax recovery).
// Postconditions: every non-root node has `parent` set before any pass
//   runs; nodes are allocated children-first, so index order is post-order.
// Failure modes: none.
// Side effects: none.

use crate::ast::{Condition, Expr, ExprKind, Ident, MergeMapping, Span, WireMapping};
use crate::id::NodeId;
use crate::signal::SignalType;

// ── Nodes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub span: Span,
    /// `None` while the type is not yet known.
    pub inputs: Option<SignalType>,
    pub outputs: Option<SignalType>,
}

impl ExprNode {
    pub fn is_typed(&self) -> bool {
        self.inputs.is_some() && self.outputs.is_some()
    }
}

/// Expression kinds with child links replaced by arena indices. Mapping
/// lists and conditions reuse the AST types.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Composition(NodeId, NodeId),
    ParallelTuple(NodeId, NodeId),
    ParallelScalar(NodeId, NodeId),
    First(NodeId),
    Second(NodeId),
    Split,
    Merge(Vec<MergeMapping>),
    Wire(Vec<WireMapping>),
    WireTuple(Vec<WireMapping>, Vec<WireMapping>),
    If {
        condition: Condition,
        then_branch: NodeId,
        else_branch: NodeId,
    },
    Identifier(Ident),
    Paren(NodeId),
    Error,
}

impl NodeKind {
    /// Short name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            NodeKind::Composition(..) => "composition",
            NodeKind::ParallelTuple(..) => "tuple fanout",
            NodeKind::ParallelScalar(..) => "scalar fanout",
            NodeKind::First(_) => "first",
            NodeKind::Second(_) => "second",
            NodeKind::Split => "split",
            NodeKind::Merge(_) => "merge",
            NodeKind::Wire(_) => "wire",
            NodeKind::WireTuple(..) => "tuple wire",
            NodeKind::If { .. } => "if",
            NodeKind::Identifier(_) => "component",
            NodeKind::Paren(_) => "parenthesised expression",
            NodeKind::Error => "erroneous expression",
        }
    }
}

// ── Arena ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
    root: NodeId,
}

impl ExprArena {
    /// Flatten an AST expression.
    pub fn build(expr: &Expr) -> Self {
        let mut arena = ExprArena {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        arena.root = arena.lower(expr);
        arena
    }

    fn lower(&mut self, expr: &Expr) -> NodeId {
        let kind = match &expr.kind {
            ExprKind::Composition(l, r) => {
                let (l, r) = (self.lower(l), self.lower(r));
                NodeKind::Composition(l, r)
            }
            ExprKind::ParallelTuple(l, r) => {
                let (l, r) = (self.lower(l), self.lower(r));
                NodeKind::ParallelTuple(l, r)
            }
            ExprKind::ParallelScalar(l, r) => {
                let (l, r) = (self.lower(l), self.lower(r));
                NodeKind::ParallelScalar(l, r)
            }
            ExprKind::First(e) => NodeKind::First(self.lower(e)),
            ExprKind::Second(e) => NodeKind::Second(self.lower(e)),
            ExprKind::Split => NodeKind::Split,
            ExprKind::Merge(m) => NodeKind::Merge(m.clone()),
            ExprKind::Wire(m) => NodeKind::Wire(m.clone()),
            ExprKind::WireTuple(t, b) => NodeKind::WireTuple(t.clone(), b.clone()),
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let then_branch = self.lower(then_branch);
                let else_branch = self.lower(else_branch);
                NodeKind::If {
                    condition: condition.clone(),
                    then_branch,
                    else_branch,
                }
            }
            ExprKind::Identifier(id) => NodeKind::Identifier(id.clone()),
            ExprKind::Paren(e) => NodeKind::Paren(self.lower(e)),
            ExprKind::Error => NodeKind::Error,
        };

        let id = NodeId(self.nodes.len() as u32);
        let children = children_of(&kind);
        self.nodes.push(ExprNode {
            kind,
            parent: None,
            span: expr.span,
            inputs: None,
            outputs: None,
        });
        for child in children {
            self.nodes[child.index()].parent = Some(id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &ExprNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ExprNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids children-first. Every child precedes its parent.
    pub fn post_order(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        children_of(&self.node(id).kind)
    }

    pub fn types(&self, id: NodeId) -> (Option<&SignalType>, Option<&SignalType>) {
        let n = self.node(id);
        (n.inputs.as_ref(), n.outputs.as_ref())
    }

    pub fn set_types(&mut self, id: NodeId, inputs: Option<SignalType>, outputs: Option<SignalType>) {
        let n = self.node_mut(id);
        n.inputs = inputs;
        n.outputs = outputs;
    }
}

fn children_of(kind: &NodeKind) -> Vec<NodeId> {
    match kind {
        NodeKind::Composition(l, r)
        | NodeKind::ParallelTuple(l, r)
        | NodeKind::ParallelScalar(l, r) => vec![*l, *r],
        NodeKind::First(c) | NodeKind::Second(c) | NodeKind::Paren(c) => vec![*c],
        NodeKind::If {
            then_branch,
            else_branch,
            ..
        } => vec![*then_branch, *else_branch],
        NodeKind::Split
        | NodeKind::Merge(_)
        | NodeKind::Wire(_)
        | NodeKind::WireTuple(..)
        | NodeKind::Identifier(_)
        | NodeKind::Error => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Definition;

    fn arena_of(arrow: &str) -> ExprArena {
        let src = format!("component c inputs a outputs a as {arrow}");
        let result = crate::parser::parse(&src);
        assert!(result.errors.is_empty(), "{:#?}", result.errors);
        let module = result.module.expect("module");
        match &module.component.definition {
            Definition::Arrow(e) => ExprArena::build(e),
            Definition::Do(_) => panic!("expected arrow"),
        }
    }

    #[test]
    fn parents_set_for_every_child() {
        let arena = arena_of("a >>> (first b *** c)");
        let root = arena.root();
        assert!(arena.node(root).parent.is_none());
        for id in arena.post_order() {
            for child in arena.children(id) {
                assert_eq!(arena.node(child).parent, Some(id));
            }
        }
    }

    #[test]
    fn post_order_children_first() {
        let arena = arena_of("a >>> b &&& c");
        let order: Vec<NodeId> = arena.post_order().collect();
        assert_eq!(order.len(), arena.len());
        for id in &order {
            for child in arena.children(*id) {
                assert!(child < *id);
            }
        }
        assert_eq!(*order.last().expect("root"), arena.root());
    }

    #[test]
    fn if_branches_are_children() {
        let arena = arena_of("if @k then l else r");
        let NodeKind::If {
            then_branch,
            else_branch,
            ..
        } = &arena.node(arena.root()).kind
        else {
            panic!("expected if")
        };
        assert!(matches!(&arena.node(*then_branch).kind, NodeKind::Identifier(id) if id.name == "l"));
        assert!(matches!(&arena.node(*else_branch).kind, NodeKind::Identifier(id) if id.name == "r"));
    }

    #[test]
    fn nodes_start_untyped() {
        let arena = arena_of("wire a -> b");
        assert!(!arena.node(arena.root()).is_typed());
    }
}
