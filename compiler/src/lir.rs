//! LIR – Leaf IR for do-block components.
//!
//! `LirLeaf` is a self-contained, pre-resolved form of a do-block: every
//! operand already says whether it reads an input, a local variable, the
//! component state or a literal, and every command carries the sequence
//! number its generated function is named after. Codegen reads it and
//! emits Python without consulting the scope tables.

use std::fmt;

use crate::ast::{
    Block, Command, CommandKind, CondOp, Condition, DoBlock, FunctionCall, Ident, LiteralValue,
    Operand, ReturnValue, Span,
};
use crate::id::VarId;
use crate::resolve::{DoTables, VarRef};

// ── Top-level ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct LirLeaf {
    pub commands: Vec<LirCommand>,
    /// Output name and its value, in source order.
    pub returns: Vec<(String, LirValue)>,
}

// ── Commands ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct LirCommand {
    /// Source-order sequence number, unique within the leaf.
    pub index: usize,
    pub target: Option<LirVar>,
    pub kind: LirCommandKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LirCommandKind {
    Call(LirCall),
    Let {
        bindings: Vec<(LirVar, LirCall)>,
        body: LirCall,
    },
    If {
        condition: LirCond,
        then_block: LirBlock,
        else_block: LirBlock,
    },
}

/// Commands of a `then`/`else` branch. `ret` is `None` for `return ()`.
#[derive(Debug, Clone, PartialEq)]
pub struct LirBlock {
    pub commands: Vec<LirCommand>,
    pub ret: Option<LirValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LirCall {
    /// Import alias of the function package.
    pub package: String,
    pub function: String,
    pub args: Vec<LirValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LirCond {
    Binary {
        op: CondOp,
        left: Box<LirCond>,
        right: Box<LirCond>,
    },
    Paren(Box<LirCond>),
    Value(LirValue),
}

// ── Values ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LirValue {
    Input(String),
    Local(LirVar),
    State(String),
    Literal(LiteralValue),
}

/// A do-block variable. Shadowed names stay distinct through `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LirVar {
    pub name: String,
    pub id: VarId,
}

impl LirVar {
    /// Name of the Python local holding this variable.
    pub fn python_name(&self) -> String {
        format!("____{}_{}", self.name, self.id.0)
    }
}

// ── Errors ─────────────────────────────────────────────────────────────────

/// The scope tables do not cover a node of the do-block. Only happens when
/// lowering a block that failed resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LirError {
    pub span: Span,
    pub message: String,
}

impl fmt::Display for LirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LirError {}

// ── Builder ────────────────────────────────────────────────────────────────

/// Lower a resolved do-block.
pub fn build_lir(block: &DoBlock, tables: &DoTables) -> Result<LirLeaf, LirError> {
    let mut builder = LirBuilder {
        tables,
        next_index: 0,
    };
    let commands = builder.commands(&block.commands)?;
    let returns = block
        .returns
        .iter()
        .map(|m| Ok((m.to.name.clone(), builder.value(&m.from)?)))
        .collect::<Result<Vec<_>, LirError>>()?;
    Ok(LirLeaf { commands, returns })
}

struct LirBuilder<'a> {
    tables: &'a DoTables,
    next_index: usize,
}

impl LirBuilder<'_> {
    fn commands(&mut self, commands: &[Command]) -> Result<Vec<LirCommand>, LirError> {
        commands.iter().map(|c| self.command(c)).collect()
    }

    fn command(&mut self, command: &Command) -> Result<LirCommand, LirError> {
        let index = self.next_index;
        self.next_index += 1;

        let kind = match &command.kind {
            CommandKind::Call(call) => LirCommandKind::Call(self.call(call)?),
            CommandKind::Let { bindings, body } => {
                let bindings = bindings
                    .iter()
                    .map(|b| Ok((self.var(&b.target)?, self.call(&b.call)?)))
                    .collect::<Result<Vec<_>, LirError>>()?;
                LirCommandKind::Let {
                    bindings,
                    body: self.call(body)?,
                }
            }
            CommandKind::If {
                condition,
                then_block,
                else_block,
            } => LirCommandKind::If {
                condition: self.condition(condition)?,
                then_block: self.block(then_block)?,
                else_block: self.block(else_block)?,
            },
            CommandKind::Error => {
                return Err(LirError {
                    span: command.span,
                    message: "erroneous command in do-block".to_string(),
                })
            }
        };

        let target = command.target.as_ref().map(|t| self.var(t)).transpose()?;
        Ok(LirCommand {
            index,
            target,
            kind,
        })
    }

    fn block(&mut self, block: &Block) -> Result<LirBlock, LirError> {
        let commands = self.commands(&block.commands)?;
        let ret = match &block.ret {
            ReturnValue::Unit(_) => None,
            ReturnValue::Value(v) => Some(self.value(v)?),
        };
        Ok(LirBlock { commands, ret })
    }

    fn call(&self, call: &FunctionCall) -> Result<LirCall, LirError> {
        Ok(LirCall {
            package: call.package.name.clone(),
            function: call.function.name.clone(),
            args: call
                .args
                .iter()
                .map(|a| self.value(a))
                .collect::<Result<_, _>>()?,
        })
    }

    fn condition(&self, condition: &Condition) -> Result<LirCond, LirError> {
        Ok(match condition {
            Condition::Binary {
                op, left, right, ..
            } => LirCond::Binary {
                op: *op,
                left: Box::new(self.condition(left)?),
                right: Box::new(self.condition(right)?),
            },
            Condition::Paren(inner, _) => LirCond::Paren(Box::new(self.condition(inner)?)),
            Condition::Terminal(op) => LirCond::Value(self.value(op)?),
        })
    }

    fn var(&self, target: &Ident) -> Result<LirVar, LirError> {
        match self.tables.targets.get(&target.span) {
            Some(id) => Ok(LirVar {
                name: target.name.clone(),
                id: *id,
            }),
            None => Err(LirError {
                span: target.span,
                message: format!("variable {} was never bound", target),
            }),
        }
    }

    fn value(&self, operand: &Operand) -> Result<LirValue, LirError> {
        let id = match operand {
            Operand::Literal(lit) => return Ok(LirValue::Literal(lit.value.clone())),
            Operand::Ident(id) | Operand::State(id) => id,
        };
        match self.tables.refs.get(&id.span) {
            Some(VarRef::Input) => Ok(LirValue::Input(id.name.clone())),
            Some(VarRef::Local(var)) => Ok(LirValue::Local(LirVar {
                name: id.name.clone(),
                id: *var,
            })),
            Some(VarRef::State) => Ok(LirValue::State(id.name.clone())),
            Some(VarRef::Literal) | None => Err(LirError {
                span: id.span,
                message: format!("unresolved reference {}", operand),
            }),
        }
    }
}

// ── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for LirLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "leaf {{")?;
        for command in &self.commands {
            fmt_command(f, command, 1)?;
        }
        let returns: Vec<String> = self
            .returns
            .iter()
            .map(|(to, v)| format!("{} <- {}", to, v))
            .collect();
        writeln!(f, "  return {}", returns.join(", "))?;
        writeln!(f, "}}")
    }
}

fn fmt_command(f: &mut fmt::Formatter<'_>, command: &LirCommand, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    let target = match &command.target {
        Some(v) => format!("{} <- ", v),
        None => String::new(),
    };
    match &command.kind {
        LirCommandKind::Call(call) => writeln!(f, "{indent}#{} {target}{call}", command.index),
        LirCommandKind::Let { bindings, body } => {
            writeln!(f, "{indent}#{} {target}let", command.index)?;
            for (var, call) in bindings {
                writeln!(f, "{indent}    {var} <- {call}")?;
            }
            writeln!(f, "{indent}  in {body}")
        }
        LirCommandKind::If {
            condition,
            then_block,
            else_block,
        } => {
            writeln!(f, "{indent}#{} {target}if {condition}", command.index)?;
            fmt_block(f, "then", then_block, depth)?;
            fmt_block(f, "else", else_block, depth)
        }
    }
}

fn fmt_block(f: &mut fmt::Formatter<'_>, label: &str, block: &LirBlock, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    writeln!(f, "{indent}{label}")?;
    for command in &block.commands {
        fmt_command(f, command, depth + 1)?;
    }
    match &block.ret {
        Some(v) => writeln!(f, "{indent}  return {v}"),
        None => writeln!(f, "{indent}  return ()"),
    }
}

impl fmt::Display for LirVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%{}", self.name, self.id.0)
    }
}

impl fmt::Display for LirValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LirValue::Input(name) => write!(f, "in:{name}"),
            LirValue::Local(var) => write!(f, "{var}"),
            LirValue::State(name) => write!(f, "@{name}"),
            LirValue::Literal(lit) => write!(f, "{lit}"),
        }
    }
}

impl fmt::Display for LirCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "{}.{}({})", self.package, self.function, args.join(", "))
    }
}

impl fmt::Display for LirCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LirCond::Binary { op, left, right } => write!(f, "{left} {} {right}", op_symbol(*op)),
            LirCond::Paren(inner) => write!(f, "({inner})"),
            LirCond::Value(v) => write!(f, "{v}"),
        }
    }
}

/// PCL spelling of a condition operator.
pub fn op_symbol(op: CondOp) -> &'static str {
    match op {
        CondOp::Or => "or",
        CondOp::And => "and",
        CondOp::Xor => "xor",
        CondOp::Eq => "==",
        CondOp::Ne => "!=",
        CondOp::Gt => ">",
        CondOp::Lt => "<",
        CondOp::Ge => ">=",
        CondOp::Le => "<=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Definition;
    use crate::registry::{FunctionPackage, FunctionSignature, Registry};

    fn registry() -> Registry {
        let mut strings = FunctionPackage::new();
        for (name, params) in [("lower", 1), ("concat", 2)] {
            strings.insert(
                name.to_string(),
                FunctionSignature {
                    params: (0..params).map(|i| format!("p{i}")).collect(),
                    ..FunctionSignature::default()
                },
            );
        }
        let mut reg = Registry::new();
        reg.insert_package("strings", strings);
        reg
    }

    fn lower(src: &str) -> LirLeaf {
        let parsed = crate::parser::parse(src);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let module = parsed.module.expect("module");
        let resolved = crate::resolve::resolve(&module, "c.pcl", &registry());
        assert!(
            resolved
                .diagnostics
                .iter()
                .all(|d| d.level != crate::diag::DiagLevel::Error),
            "{:?}",
            resolved.diagnostics
        );
        let Definition::Do(block) = &module.component.definition else {
            panic!("expected do-block")
        };
        build_lir(block, &resolved.symbols.do_tables).expect("lir")
    }

    #[test]
    fn echo_has_no_commands() {
        let leaf = lower("component c inputs a outputs b do return b <- a");
        assert!(leaf.commands.is_empty());
        assert_eq!(
            leaf.returns,
            vec![("b".to_string(), LirValue::Input("a".to_string()))]
        );
    }

    #[test]
    fn calls_numbered_in_source_order() {
        let leaf = lower(
            "import strings as s\ncomponent c inputs a outputs b configuration k do\n\
             x <- s.lower(a)\n\
             s.concat(x, @k)\n\
             return b <- x",
        );
        assert_eq!(leaf.commands.len(), 2);
        assert_eq!(leaf.commands[0].index, 0);
        assert_eq!(leaf.commands[1].index, 1);
        let x = leaf.commands[0].target.clone().expect("target");
        assert_eq!(x.name, "x");
        let LirCommandKind::Call(call) = &leaf.commands[1].kind else {
            panic!("expected call")
        };
        assert_eq!(
            call.args,
            vec![LirValue::Local(x.clone()), LirValue::State("k".to_string())]
        );
        assert_eq!(leaf.returns[0].1, LirValue::Local(x));
    }

    #[test]
    fn nested_commands_share_numbering() {
        let leaf = lower(
            "import strings as s\ncomponent c inputs a outputs b configuration k do\n\
             x <- if @k == 1 then\n\
                    t <- s.lower(a)\n\
                    return t\n\
                  else\n\
                    return a\n\
                  endif\n\
             y <- let u <- s.lower(x) in s.concat(u, x)\n\
             return b <- y",
        );
        assert_eq!(leaf.commands.len(), 2);
        let LirCommandKind::If {
            then_block,
            else_block,
            condition,
        } = &leaf.commands[0].kind
        else {
            panic!("expected if")
        };
        assert_eq!(then_block.commands[0].index, 1);
        assert_eq!(leaf.commands[1].index, 2);
        assert!(matches!(then_block.ret, Some(LirValue::Local(_))));
        assert_eq!(else_block.ret, Some(LirValue::Input("a".to_string())));
        assert_eq!(condition.to_string(), "@k == 1");
        let LirCommandKind::Let { bindings, .. } = &leaf.commands[1].kind else {
            panic!("expected let")
        };
        assert_eq!(bindings[0].0.name, "u");
    }

    #[test]
    fn unit_return_lowers_to_none() {
        let leaf = lower(
            "import strings as s\ncomponent c inputs a outputs b configuration k do\n\
             if @k then\n\
               s.lower(a)\n\
               return ()\n\
             else\n\
               return ()\n\
             endif\n\
             return b <- a",
        );
        let LirCommandKind::If { then_block, .. } = &leaf.commands[0].kind else {
            panic!("expected if")
        };
        assert!(then_block.ret.is_none());
        assert!(leaf.commands[0].target.is_none());
    }

    #[test]
    fn missing_tables_are_errors() {
        let module = crate::parser::parse(
            "import strings as s\ncomponent c inputs a outputs b do x <- s.lower(a) return b <- x",
        )
        .module
        .expect("module");
        let Definition::Do(block) = &module.component.definition else {
            panic!("expected do-block")
        };
        let err = build_lir(block, &DoTables::default()).expect_err("unresolved");
        assert_eq!(err.message, "unresolved reference a");
    }

    #[test]
    fn display_lists_commands() {
        let leaf = lower(
            "import strings as s\ncomponent c inputs a outputs b do\n\
             x <- s.lower(a)\n\
             return b <- x",
        );
        let text = leaf.to_string();
        assert!(text.contains("#0 x%0 <- s.lower(in:a)"), "{text}");
        assert!(text.contains("return b <- x%0"), "{text}");
    }
}
