// AST node types for PCL .pcl source files.
//
// Mirrors the PCL grammar: a module holds imports and exactly one component,
// whose definition is either an arrow (combinator) expression or a do-block
// of imperative commands. Every node carries a `SimpleSpan` for error
// reporting in downstream phases.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use std::fmt;

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Root ──

/// The compilation unit: imports followed by one component definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub imports: Vec<Import>,
    pub component: Component,
    pub span: Span,
}

// ── import: 'import' path 'as' IDENT ──

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    /// Plain or dotted module path (`lowercase`, `text.lowercase`).
    pub module_path: Ident,
    pub alias: Ident,
    pub span: Span,
}

// ── Component ──

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: Ident,
    pub inputs: SignalList,
    pub outputs: SignalList,
    pub configuration: Vec<Ident>,
    pub declarations: Vec<Declaration>,
    pub definition: Definition,
    pub span: Span,
}

impl Component {
    /// A component is a leaf iff it is defined by a do-block.
    pub fn is_leaf(&self) -> bool {
        matches!(self.definition, Definition::Do(_))
    }
}

/// Signal names of an `inputs`/`outputs` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalList {
    /// `a, b, c`
    Flat(Vec<Ident>),
    /// `(a, b), (c, d)`
    Tuple(Vec<Ident>, Vec<Ident>),
}

impl SignalList {
    /// Every name in the list, both halves for a tuple.
    pub fn names(&self) -> impl Iterator<Item = &Ident> {
        let (top, bottom): (&[Ident], &[Ident]) = match self {
            SignalList::Flat(names) => (names, &[]),
            SignalList::Tuple(top, bottom) => (top, bottom),
        };
        top.iter().chain(bottom.iter())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|id| id.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    /// `as <arrow expression>`
    Arrow(Expr),
    /// `do <commands> return <mappings>`
    Do(DoBlock),
}

// ── declaration: IDENT ':=' 'new' IDENT ['with' mappings] ──

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: Ident,
    /// Import alias of the instantiated component.
    pub component: Ident,
    /// `None` when the declaration has no with-clause.
    pub with_clause: Option<Vec<ConfigMapping>>,
    pub span: Span,
}

impl Declaration {
    pub fn mappings(&self) -> &[ConfigMapping] {
        self.with_clause.as_deref().unwrap_or(&[])
    }
}

/// `from -> to` inside a with-clause. `from` is a component configuration
/// name or a literal; `to` is a configuration key of the instantiated leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigMapping {
    pub from: Operand,
    pub to: Ident,
    pub span: Span,
}

// ── Arrow expressions ──

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `l >>> r`
    Composition(Box<Expr>, Box<Expr>),
    /// `l *** r`
    ParallelTuple(Box<Expr>, Box<Expr>),
    /// `l &&& r`
    ParallelScalar(Box<Expr>, Box<Expr>),
    First(Box<Expr>),
    Second(Box<Expr>),
    Split,
    Merge(Vec<MergeMapping>),
    Wire(Vec<WireMapping>),
    WireTuple(Vec<WireMapping>, Vec<WireMapping>),
    If {
        condition: Condition,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// Reference to a declared sub-component.
    Identifier(Ident),
    /// `( expr )`
    Paren(Box<Expr>),
    /// Placeholder for a region skipped by syntax error recovery.
    Error,
}

/// `top[x] -> y`, `bottom[x] -> y` or `literal -> y`.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeMapping {
    pub source: MergeSource,
    pub to: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeSource {
    Top(Ident),
    Bottom(Ident),
    Literal(Literal),
}

/// `x -> y` or `literal -> y`.
#[derive(Debug, Clone, PartialEq)]
pub struct WireMapping {
    pub from: Operand,
    pub to: Ident,
    pub span: Span,
}

// ── Conditions ──

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Binary {
        op: CondOp,
        left: Box<Condition>,
        right: Box<Condition>,
        span: Span,
    },
    Paren(Box<Condition>, Span),
    Terminal(Operand),
}

impl Condition {
    pub fn span(&self) -> Span {
        match self {
            Condition::Binary { span, .. } | Condition::Paren(_, span) => *span,
            Condition::Terminal(op) => op.span(),
        }
    }

    /// Visit every terminal operand, left to right.
    pub fn for_each_terminal<'a>(&'a self, f: &mut impl FnMut(&'a Operand)) {
        match self {
            Condition::Binary { left, right, .. } => {
                left.for_each_terminal(f);
                right.for_each_terminal(f);
            }
            Condition::Paren(inner, _) => inner.for_each_terminal(f),
            Condition::Terminal(op) => f(op),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOp {
    Or,
    And,
    Xor,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

// ── Do-block ──

/// Leaf component body: commands followed by the output return mappings.
#[derive(Debug, Clone, PartialEq)]
pub struct DoBlock {
    pub commands: Vec<Command>,
    pub returns: Vec<ReturnMapping>,
    pub return_span: Span,
    pub span: Span,
}

/// `out <- operand` in the final return.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMapping {
    pub to: Ident,
    pub from: Operand,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// `x <- ...` assignment target.
    pub target: Option<Ident>,
    pub kind: CommandKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Call(FunctionCall),
    Let {
        bindings: Vec<LetBinding>,
        body: FunctionCall,
    },
    If {
        condition: Condition,
        then_block: Block,
        else_block: Block,
    },
    /// Placeholder for a command skipped by syntax error recovery.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
    pub target: Ident,
    pub call: FunctionCall,
    pub span: Span,
}

/// Body of a `then` or `else` branch: commands ending in a return.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub commands: Vec<Command>,
    pub ret: ReturnValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    /// `return ()`
    Unit(Span),
    Value(Operand),
}

/// `alias.function(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub package: Ident,
    pub function: Ident,
    pub args: Vec<Operand>,
    pub span: Span,
}

impl FunctionCall {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package.name, self.function.name)
    }
}

// ── Leaves ──

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Identifier, literal or `@state` reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Ident(Ident),
    Literal(Literal),
    /// `@name`: a configuration (state) reference.
    State(Ident),
}

impl Operand {
    pub fn span(&self) -> Span {
        match self {
            Operand::Ident(id) | Operand::State(id) => id.span,
            Operand::Literal(lit) => lit.span,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Ident(id) => write!(f, "{}", id),
            Operand::Literal(lit) => write!(f, "{}", lit.value),
            Operand::State(id) => write!(f, "@{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Integer(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Integer(v) => write!(f, "{v}"),
            LiteralValue::Float(v) => write!(f, "{v:?}"),
            LiteralValue::Str(s) => write!(f, "\"{s}\""),
            LiteralValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
        }
    }
}
