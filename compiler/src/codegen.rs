// codegen.rs — Python code generation for PCL components
//
// Writes a pypeline module for one component: the header and runtime
// imports, the imported modules, the interface functions (`get_name`,
// `get_inputs`, `get_outputs`, `get_configuration`, `configure`) and an
// `initialise(config)` function. Arrow components build their arrow from
// the declared sub-components, one temporary per expression node in
// post-order. Do-block components return a function of `(a, s)` built from
// the leaf IR.
//
// Preconditions: all upstream passes completed without errors.
// Postconditions: returns the complete Python source text.
// Failure modes: erroneous or unresolved nodes left in the tree produce a
//                `CodegenError`; these only occur on trees that failed
//                resolution.
// Side effects: none.

use std::collections::HashMap;
use std::fmt::{self, Write as _};

use crate::ast::*;
use crate::diag::LineIndex;
use crate::hir::{ExprArena, NodeKind};
use crate::id::NodeId;
use crate::lir::{LirBlock, LirCall, LirCommand, LirCommandKind, LirCond, LirLeaf, LirValue};
use crate::pipeline::Provenance;
use crate::resolve::ModuleSymbols;
use crate::type_infer::DISCARD;

const INDENT: &str = "  ";

const RUNTIME_IMPORTS: &str = "\
from pypeline.helpers.parallel_helpers import cons_function_component, cons_wire, cons_dictionary_wire, cons_split_wire, cons_unsplit_wire, cons_if_component
from pypeline.core.arrows.kleisli_arrow import KleisliArrow
from pypeline.core.arrows.kleisli_arrow_choice import KleisliArrowChoice
from pypeline.core.types.either import Left, Right
from pypeline.core.types.state import return_
";

const INSTRUMENTATION_FUNCTIONS: &str = "\
import sys, threading, datetime
def ____instr_component(component_decl_id, component_id, event, a, s):
  sys.stderr.write('%s: %s: Component %s is %s %s (id = %s) with input %s and state %s\\n' % (datetime.datetime.now().strftime('%x %X.%f'), threading.current_thread().name, get_name(), event, component_decl_id, component_id, a, dict((skey, s[skey]) for skey in s.keys() if skey != '____prev_')))
  return a
def ____instr_component_construction(component_decl_id, component_id, component_config, invoked_component, decl_line_no):
  sys.stderr.write('%s: %s: Component %s is constructing %s (id = %s) with configuration %s (%s instance declared at line %d)\\n' % (datetime.datetime.now().strftime('%x %X.%f'), threading.current_thread().name, get_name(), component_decl_id, component_id, component_config, invoked_component, decl_line_no))
";

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GeneratedCode {
    pub python_source: String,
}

#[derive(Debug, Clone, Default)]
pub struct CodegenOptions {
    /// Emit `____instr_component` trace calls.
    pub instrument: bool,
    /// Timestamp written into the header.
    pub generated_at: String,
    pub provenance: Option<Provenance>,
}

/// The analysed definition of the component.
#[derive(Debug, Clone, Copy)]
pub enum Body<'a> {
    Arrow(&'a ExprArena),
    Leaf(&'a LirLeaf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// A node of the arrow has no generated value.
    UnresolvedNode { span: Span, what: &'static str },
    /// A declaration names an import that is not in the symbol table.
    UnknownImport { declaration: String, alias: String },
    /// The body does not match the component's definition kind.
    DefinitionMismatch,
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::UnresolvedNode { span, what } => {
                write!(f, "no value generated for {} at offset {}", what, span.start)
            }
            CodegenError::UnknownImport { declaration, alias } => {
                write!(f, "declaration {} refers to unknown import {}", declaration, alias)
            }
            CodegenError::DefinitionMismatch => {
                f.write_str("component body does not match its definition")
            }
        }
    }
}

impl std::error::Error for CodegenError {}

// ── Public entry point ──────────────────────────────────────────────────────

pub fn generate(
    module: &Module,
    symbols: &ModuleSymbols,
    body: Body<'_>,
    lines: &LineIndex,
    options: &CodegenOptions,
) -> Result<GeneratedCode, CodegenError> {
    let mut ctx = CodegenCtx {
        module,
        symbols,
        lines,
        options,
        out: String::with_capacity(4096),
        indent: 0,
        temps: 0,
    };
    ctx.emit_header();
    ctx.emit_imports();
    ctx.emit_interface();
    match (&module.component.definition, body) {
        (Definition::Arrow(_), Body::Arrow(arena)) => ctx.emit_arrow_initialise(arena)?,
        (Definition::Do(_), Body::Leaf(leaf)) => ctx.emit_leaf_initialise(leaf),
        _ => return Err(CodegenError::DefinitionMismatch),
    }
    Ok(GeneratedCode {
        python_source: ctx.out,
    })
}

// ── Internal context ────────────────────────────────────────────────────────

struct CodegenCtx<'a> {
    module: &'a Module,
    symbols: &'a ModuleSymbols,
    lines: &'a LineIndex,
    options: &'a CodegenOptions,
    out: String,
    indent: usize,
    temps: usize,
}

impl CodegenCtx<'_> {
    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn function(&mut self, name: &str, args: &[&str], body: &[String]) {
        self.indent = 0;
        self.line(&format!("def {}({}):", name, args.join(", ")));
        self.indent = 1;
        for stmt in body {
            self.line(stmt);
        }
        self.indent = 0;
        self.line("");
    }

    fn next_temp(&mut self) -> String {
        let name = format!("____tmp_{}", self.temps);
        self.temps += 1;
        name
    }

    // ── Header ──────────────────────────────────────────────────────────

    fn emit_header(&mut self) {
        self.out.push_str("#\n# DO NOT EDIT THIS FILE!\n#\n");
        let _ = writeln!(
            self.out,
            "# This file was automatically generated by PCLc on\n# {}.\n#",
            self.options.generated_at
        );
        if let Some(p) = &self.options.provenance {
            let _ = writeln!(
                self.out,
                "# pclc {}\n# source sha256 {}\n# signatures sha256 {}\n#",
                p.compiler_version,
                p.source_hash_hex(),
                p.registry_fingerprint_hex()
            );
        }
        self.out.push_str(RUNTIME_IMPORTS);
        if self.options.instrument {
            self.out.push_str(INSTRUMENTATION_FUNCTIONS);
        }
    }

    fn emit_imports(&mut self) {
        for import in &self.module.imports {
            let _ = writeln!(
                self.out,
                "import {} as ____{}",
                import.module_path.name, import.alias.name
            );
        }
    }

    // ── Interface functions ─────────────────────────────────────────────

    fn emit_interface(&mut self) {
        let (module, symbols) = (self.module, self.symbols);
        let component = &module.component;
        self.line("");
        self.line("");
        self.function("get_name", &[], &[format!("return {}", py_str(&component.name.name))]);
        self.function(
            "get_inputs",
            &[],
            &[format!("return {}", py_signal_list(&component.inputs))],
        );
        self.function(
            "get_outputs",
            &[],
            &[format!("return {}", py_signal_list(&component.outputs))],
        );
        let keys: Vec<&str> = symbols.configuration_names().collect();
        self.function(
            "get_configuration",
            &[],
            &[format!("return {}", py_list(keys.iter().copied()))],
        );
        let entries: Vec<String> = keys
            .iter()
            .map(|k| format!("{} : args[{}]", py_str(k), py_str(k)))
            .collect();
        self.function(
            "configure",
            &["args"],
            &[format!("return {{{}}}", entries.join(", "))],
        );
    }

    // ── Arrow components ────────────────────────────────────────────────

    fn emit_arrow_initialise(&mut self, arena: &ExprArena) -> Result<(), CodegenError> {
        let mut body = Vec::new();
        let mut values: HashMap<String, String> = HashMap::new();

        for decl in &self.module.component.declarations {
            let Some(entry) = self.symbols.declaration(&decl.name.name) else {
                continue;
            };
            // Duplicates are dropped by resolution; only the first occurrence
            // is generated.
            if entry.span != decl.span {
                continue;
            }
            let alias = self
                .symbols
                .import(&entry.alias)
                .map(|i| i.alias.clone())
                .ok_or_else(|| CodegenError::UnknownImport {
                    declaration: entry.name.clone(),
                    alias: entry.alias.clone(),
                })?;
            self.declaration_statements(decl, &alias, &mut body);
            values.insert(decl.name.name.clone(), decl.name.name.clone());
        }
        body.push(String::new());

        let mut temps: HashMap<NodeId, String> = HashMap::new();
        for id in arena.post_order() {
            let node = arena.node(id);
            let value = |child: NodeId| {
                temps
                    .get(&child)
                    .cloned()
                    .ok_or(CodegenError::UnresolvedNode {
                        span: arena.node(child).span,
                        what: arena.node(child).kind.describe(),
                    })
            };
            let expr = match &node.kind {
                NodeKind::Identifier(name) => {
                    let v = values.get(&name.name).cloned().ok_or(CodegenError::UnresolvedNode {
                        span: node.span,
                        what: node.kind.describe(),
                    })?;
                    temps.insert(id, v);
                    continue;
                }
                NodeKind::Paren(child) => {
                    let v = value(*child)?;
                    temps.insert(id, v);
                    continue;
                }
                NodeKind::Composition(l, r) => format!("{} >> {}", value(*l)?, value(*r)?),
                NodeKind::ParallelTuple(l, r) => format!("{} ** {}", value(*l)?, value(*r)?),
                NodeKind::ParallelScalar(l, r) => format!("{} & {}", value(*l)?, value(*r)?),
                NodeKind::First(c) => format!("{}.first()", value(*c)?),
                NodeKind::Second(c) => format!("{}.second()", value(*c)?),
                NodeKind::Split => "cons_split_wire()".to_string(),
                NodeKind::Merge(mappings) => merge_expr(mappings),
                NodeKind::Wire(mappings) => wire_expr(mappings),
                NodeKind::WireTuple(top, bottom) => {
                    format!("{} ** {}", wire_expr(top), wire_expr(bottom))
                }
                NodeKind::If {
                    condition,
                    then_branch,
                    else_branch,
                } => format!(
                    "cons_if_component(lambda a, s: {}, {}, {})",
                    arrow_condition(condition),
                    value(*then_branch)?,
                    value(*else_branch)?
                ),
                NodeKind::Error => {
                    return Err(CodegenError::UnresolvedNode {
                        span: node.span,
                        what: node.kind.describe(),
                    })
                }
            };
            let temp = self.next_temp();
            body.push(format!("{} = {}", temp, expr));
            temps.insert(id, temp);
        }

        let root = arena.root();
        let result = temps.get(&root).cloned().ok_or(CodegenError::UnresolvedNode {
            span: arena.node(root).span,
            what: arena.node(root).kind.describe(),
        })?;
        body.push(String::new());
        body.push(format!("return {}", result));
        self.function("initialise", &["config"], &body);
        log::trace!("generated {} temporaries", self.temps);
        Ok(())
    }

    fn declaration_statements(&self, decl: &Declaration, alias: &str, body: &mut Vec<String>) {
        let id = &decl.name.name;
        let config: Vec<String> = decl
            .mappings()
            .iter()
            .map(|m| format!("{} : {}", py_str(&m.to.name), config_source(&m.from, "config")))
            .collect();
        body.push(format!("{}_configuration = {{{}}}", id, config.join(", ")));
        body.push(format!(
            "{id} = ____{alias}.initialise(____{alias}.configure({id}_configuration))"
        ));
        body.push(format!(
            "{id} = {id} if isinstance({id}, KleisliArrow) else cons_function_component({id})"
        ));
        if self.options.instrument {
            let line = self.lines.line_of(decl.span.start);
            body.push(format!("{id}_id = id({id})"));
            body.push(format!(
                "____instr_component_construction('{id}', {id}_id, {id}_configuration, ____{alias}.get_name(), {line})"
            ));
            body.push(format!(
                "{id} = ((cons_function_component(lambda a, s: ____instr_component('{id}', {id}_id, 'starting', a, s)) >> {id}) >> \
                 cons_function_component(lambda a, s: ____instr_component('{id}', {id}_id, 'finishing', a, s)))"
            ));
        }
        if !decl.mappings().is_empty() {
            let state: Vec<String> = decl
                .mappings()
                .iter()
                .map(|m| format!("{} : {}", py_str(&m.to.name), config_source(&m.from, "s")))
                .collect();
            body.push(format!(
                "{id} = ((cons_function_component(lambda a, s: a, state_mutator = lambda s: {{{}, '____prev_' : s}})) >> {id}) >> \
                 cons_function_component(lambda a, s: a, state_mutator = lambda s: s['____prev_'])",
                state.join(", ")
            ));
        }
    }

    // ── Do-block components ─────────────────────────────────────────────

    fn emit_leaf_initialise(&mut self, leaf: &LirLeaf) {
        let mut body = vec!["def ____leaf(a, s):".to_string()];
        let mut inner = Vec::new();
        if self.options.instrument {
            inner.push(
                "____instr_component(get_name(), id(____leaf), 'starting', a, s)".to_string(),
            );
        }
        for command in &leaf.commands {
            self.command(command, &mut inner);
        }
        let outputs: Vec<String> = leaf
            .returns
            .iter()
            .map(|(to, v)| format!("{} : {}", py_str(to), py_value(v)))
            .collect();
        if self.options.instrument {
            inner.push(format!("____outputs = {{{}}}", outputs.join(", ")));
            inner.push(
                "____instr_component(get_name(), id(____leaf), 'finishing', ____outputs, s)"
                    .to_string(),
            );
            inner.push("return ____outputs".to_string());
        } else {
            inner.push(format!("return {{{}}}", outputs.join(", ")));
        }
        body.extend(indented(inner));
        body.push(String::new());
        body.push("return ____leaf".to_string());
        self.function("initialise", &["config"], &body);
    }

    /// One command as a nested function followed by its invocation.
    fn command(&self, command: &LirCommand, out: &mut Vec<String>) {
        let n = command.index;
        let name = format!("____cmd_{n}");
        let mut inner = Vec::new();
        if self.options.instrument {
            inner.push(format!(
                "____instr_component('{name}', id({name}), 'starting', a, s)"
            ));
        }
        match &command.kind {
            LirCommandKind::Call(call) => inner.push(format!("return {}", py_call(call))),
            LirCommandKind::Let { bindings, body } => {
                let mut let_body: Vec<String> = bindings
                    .iter()
                    .map(|(var, call)| format!("{} = {}", var.python_name(), py_call(call)))
                    .collect();
                let_body.push(format!("return {}", py_call(body)));
                inner.push(format!("def ____let_{n}():"));
                inner.extend(indented(let_body));
                inner.push(format!("return ____let_{n}()"));
            }
            LirCommandKind::If {
                condition,
                then_block,
                else_block,
            } => {
                for (label, block) in [("then", then_block), ("else", else_block)] {
                    inner.push(format!("def ____{label}_{n}():"));
                    inner.extend(indented(self.block(block)));
                }
                inner.push(format!(
                    "return ____then_{n}() if {} else ____else_{n}()",
                    leaf_condition(condition)
                ));
            }
        }
        out.push(format!("def {name}():"));
        out.extend(indented(inner));
        match &command.target {
            Some(var) => out.push(format!("{} = {}()", var.python_name(), name)),
            None => out.push(format!("{}()", name)),
        }
    }

    fn block(&self, block: &LirBlock) -> Vec<String> {
        let mut out = Vec::new();
        for command in &block.commands {
            self.command(command, &mut out);
        }
        match &block.ret {
            Some(v) => out.push(format!("return {}", py_value(v))),
            None => out.push("return None".to_string()),
        }
        out
    }
}

// ── Free helpers ────────────────────────────────────────────────────────────

fn indented(lines: Vec<String>) -> impl Iterator<Item = String> {
    lines.into_iter().map(|l| {
        if l.is_empty() {
            l
        } else {
            format!("{INDENT}{l}")
        }
    })
}

/// Python string literal for `s`.
pub fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Python source for a PCL literal.
pub fn py_literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Integer(v) => v.to_string(),
        LiteralValue::Float(v) => format!("{v:?}"),
        LiteralValue::Str(s) => py_str(s),
        LiteralValue::Bool(true) => "True".to_string(),
        LiteralValue::Bool(false) => "False".to_string(),
    }
}

fn py_list<'s>(names: impl IntoIterator<Item = &'s str>) -> String {
    let items: Vec<String> = names.into_iter().map(py_str).collect();
    format!("[{}]", items.join(", "))
}

fn py_signal_list(list: &SignalList) -> String {
    let names = |ids: &[Ident]| py_list(ids.iter().map(|i| i.name.as_str()));
    match list {
        SignalList::Flat(ids) => names(ids),
        SignalList::Tuple(top, bottom) => format!("({}, {})", names(top), names(bottom)),
    }
}

/// Source of a with-clause value: a configuration key read from `dict`, or
/// a literal.
fn config_source(from: &Operand, dict: &str) -> String {
    match from {
        Operand::Ident(id) | Operand::State(id) => format!("{}[{}]", dict, py_str(&id.name)),
        Operand::Literal(lit) => py_literal(&lit.value),
    }
}

fn wire_expr(mappings: &[WireMapping]) -> String {
    let entries: Vec<String> = mappings
        .iter()
        .filter(|m| m.to.name != DISCARD)
        .map(|m| {
            let value = match &m.from {
                Operand::Literal(lit) => py_literal(&lit.value),
                Operand::Ident(id) | Operand::State(id) => format!("a[{}]", py_str(&id.name)),
            };
            format!("{} : {}", py_str(&m.to.name), value)
        })
        .collect();
    format!("cons_wire(lambda a, s: {{{}}})", entries.join(", "))
}

fn merge_expr(mappings: &[MergeMapping]) -> String {
    let kept = || mappings.iter().filter(|m| m.to.name != DISCARD);
    let top = kept().filter_map(|m| match &m.source {
        MergeSource::Top(from) => Some(format!("{} : t[{}]", py_str(&m.to.name), py_str(&from.name))),
        _ => None,
    });
    let bottom = kept().filter_map(|m| match &m.source {
        MergeSource::Bottom(from) => {
            Some(format!("{} : b[{}]", py_str(&m.to.name), py_str(&from.name)))
        }
        _ => None,
    });
    let literal = kept().filter_map(|m| match &m.source {
        MergeSource::Literal(lit) => Some(format!("{} : {}", py_str(&m.to.name), py_literal(&lit.value))),
        _ => None,
    });
    let entries: Vec<String> = top.chain(bottom).chain(literal).collect();
    format!("cons_unsplit_wire(lambda t, b: {{{}}})", entries.join(", "))
}

fn py_op(op: CondOp) -> &'static str {
    match op {
        CondOp::Or => "or",
        CondOp::And => "and",
        CondOp::Xor => "^",
        CondOp::Eq => "==",
        CondOp::Ne => "!=",
        CondOp::Gt => ">",
        CondOp::Lt => "<",
        CondOp::Ge => ">=",
        CondOp::Le => "<=",
    }
}

fn binary(op: CondOp, left: String, right: String) -> String {
    if op == CondOp::Xor {
        format!("(bool({}) ^ bool({}))", left, right)
    } else {
        format!("({} {} {})", left, py_op(op), right)
    }
}

/// Condition of an arrow `if`: identifiers read the input, `@x` the state.
fn arrow_condition(condition: &Condition) -> String {
    match condition {
        Condition::Binary {
            op, left, right, ..
        } => binary(*op, arrow_condition(left), arrow_condition(right)),
        Condition::Paren(inner, _) => format!("({})", arrow_condition(inner)),
        Condition::Terminal(Operand::State(id)) => format!("s[{}]", py_str(&id.name)),
        Condition::Terminal(Operand::Ident(id)) => format!("a[{}]", py_str(&id.name)),
        Condition::Terminal(Operand::Literal(lit)) => py_literal(&lit.value),
    }
}

fn leaf_condition(condition: &LirCond) -> String {
    match condition {
        LirCond::Binary { op, left, right } => {
            binary(*op, leaf_condition(left), leaf_condition(right))
        }
        LirCond::Paren(inner) => format!("({})", leaf_condition(inner)),
        LirCond::Value(v) => py_value(v),
    }
}

fn py_value(value: &LirValue) -> String {
    match value {
        LirValue::Input(name) => format!("a[{}]", py_str(name)),
        LirValue::Local(var) => var.python_name(),
        LirValue::State(name) => format!("s[{}]", py_str(name)),
        LirValue::Literal(lit) => py_literal(lit),
    }
}

fn py_call(call: &LirCall) -> String {
    let args: Vec<String> = call.args.iter().map(py_value).collect();
    format!("____{}.{}({})", call.package, call.function, args.join(", "))
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::DiagLevel;
    use crate::registry::{
        ComponentSignature, FunctionPackage, FunctionSignature, Registry, SignalShape,
    };

    fn registry() -> Registry {
        let flat = |xs: &[&str]| SignalShape::Flat(xs.iter().map(|s| s.to_string()).collect());
        let mut reg = Registry::new();
        reg.insert_component(
            "lowercase",
            ComponentSignature {
                inputs: Some(flat(&["string"])),
                outputs: Some(flat(&["string"])),
                configuration: Some(vec![]),
                configure: true,
                initialise: true,
            },
        );
        reg.insert_component(
            "greet",
            ComponentSignature {
                inputs: Some(flat(&["name"])),
                outputs: Some(flat(&["message"])),
                configuration: Some(vec!["greeting".into(), "count".into()]),
                configure: true,
                initialise: true,
            },
        );
        let mut strings = FunctionPackage::new();
        strings.insert(
            "lower".into(),
            FunctionSignature {
                params: vec!["s".into()],
                ..FunctionSignature::default()
            },
        );
        reg.insert_package("strings", strings);
        reg
    }

    fn options(instrument: bool) -> CodegenOptions {
        CodegenOptions {
            instrument,
            generated_at: "Monday 01 January 2024 at 00:00:00".to_string(),
            provenance: None,
        }
    }

    fn compile(src: &str, file: &str, instrument: bool) -> String {
        let parsed = crate::parser::parse(src);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let module = parsed.module.expect("module");
        let resolved = crate::resolve::resolve(&module, file, &registry());
        let mut symbols = resolved.symbols;
        let mut diags = resolved.diagnostics;
        let lines = LineIndex::new(src);
        let code = match &module.component.definition {
            Definition::Arrow(expr) => {
                let mut arena = ExprArena::build(expr);
                diags.extend(crate::type_infer::infer(&mut arena, &symbols));
                diags.extend(crate::analyze::analyze(&mut arena, &mut symbols));
                assert!(diags.iter().all(|d| d.level != DiagLevel::Error), "{diags:?}");
                generate(&module, &symbols, Body::Arrow(&arena), &lines, &options(instrument))
            }
            Definition::Do(block) => {
                assert!(diags.iter().all(|d| d.level != DiagLevel::Error), "{diags:?}");
                let leaf = crate::lir::build_lir(block, &symbols.do_tables).expect("lir");
                generate(&module, &symbols, Body::Leaf(&leaf), &lines, &options(instrument))
            }
        };
        code.expect("codegen").python_source
    }

    #[test]
    fn header_and_interface() {
        let py = compile("component echo inputs a outputs b do return b <- a", "echo.pcl", false);
        assert!(py.starts_with("#\n# DO NOT EDIT THIS FILE!\n#\n"));
        assert!(py.contains("# Monday 01 January 2024 at 00:00:00.\n"));
        assert!(py.contains("def get_name():\n  return 'echo'\n"));
        assert!(py.contains("def get_inputs():\n  return ['a']\n"));
        assert!(py.contains("def get_outputs():\n  return ['b']\n"));
        assert!(py.contains("def get_configuration():\n  return []\n"));
        assert!(py.contains("def configure(args):\n  return {}\n"));
        assert!(!py.contains("____instr_component"));
    }

    #[test]
    fn echo_leaf_body() {
        let py = compile("component echo inputs a outputs b do return b <- a", "echo.pcl", false);
        assert!(
            py.contains(
                "def initialise(config):\n  def ____leaf(a, s):\n    return {'b' : a['a']}\n\n  return ____leaf\n"
            ),
            "{py}"
        );
    }

    #[test]
    fn arrow_declarations_and_temporaries() {
        let src = "import lowercase as lc\n\
                   component pipe inputs string outputs string\n\
                   declare l := new lc m := new lc\n\
                   as l >>> (m)";
        let py = compile(src, "pipe.pcl", false);
        assert!(py.contains("import lowercase as ____lc\n"));
        assert!(py.contains("  l_configuration = {}\n"));
        assert!(py.contains("  l = ____lc.initialise(____lc.configure(l_configuration))\n"));
        assert!(py.contains("  l = l if isinstance(l, KleisliArrow) else cons_function_component(l)\n"));
        assert!(py.contains("  ____tmp_0 = l >> m\n"));
        assert!(py.contains("\n  return ____tmp_0\n"));
        assert!(!py.contains("state_mutator"));
    }

    #[test]
    fn with_clause_generates_state_wrapper() {
        let src = "import greet as g\n\
                   component hello inputs name outputs message configuration salutation\n\
                   declare h := new g with salutation -> greeting, 3 -> count\n\
                   as h";
        let py = compile(src, "hello.pcl", false);
        assert!(py.contains("  h_configuration = {'greeting' : config['salutation'], 'count' : 3}\n"));
        assert!(py.contains(
            "state_mutator = lambda s: {'greeting' : s['salutation'], 'count' : 3, '____prev_' : s}"
        ));
        assert!(py.contains("def configure(args):\n  return {'salutation' : args['salutation']}\n"));
    }

    #[test]
    fn wires_merges_and_conditions() {
        let src = "import lowercase as lc\n\
                   component w inputs string outputs out configuration k\n\
                   declare l := new lc\n\
                   as if @k == \"x\" xor string then l else l >>> \
                   split >>> merge top[string] -> out, bottom[string] -> _, 1 -> n >>> wire out -> out, n -> _";
        let py = compile(src, "w.pcl", false);
        assert!(py.contains("cons_split_wire()"));
        assert!(py.contains("cons_unsplit_wire(lambda t, b: {'out' : t['string'], 'n' : 1})"), "{py}");
        assert!(py.contains("cons_wire(lambda a, s: {'out' : a['out']})"));
        assert!(py.contains(
            "cons_if_component(lambda a, s: (bool((s['k'] == 'x')) ^ bool(a['string'])), l, l)"
        ));
    }

    #[test]
    fn instrumented_arrow() {
        let src = "import lowercase as lc\n\
                   component pipe inputs string outputs string\n\
                   declare l := new lc\n\
                   as l";
        let py = compile(src, "pipe.pcl", true);
        assert!(py.contains("def ____instr_component(component_decl_id, component_id, event, a, s):"));
        assert!(py.contains("  l_id = id(l)\n"));
        assert!(py.contains("____instr_component_construction('l', l_id, l_configuration, ____lc.get_name(), 3)"));
        assert!(py.contains("'starting', a, s)) >> l) >> "));
    }

    #[test]
    fn leaf_commands_nest_functions() {
        let src = "import strings as st\n\
                   component leafy inputs a outputs b configuration k do\n\
                   x <- st.lower(a)\n\
                   y <- if @k then return x else return () endif\n\
                   z <- let t <- st.lower(x) in st.lower(t)\n\
                   return b <- z";
        let py = compile(src, "leafy.pcl", false);
        assert!(py.contains("import strings as ____st\n"));
        assert!(py.contains("    def ____cmd_0():\n      return ____st.lower(a['a'])\n    ____x_0 = ____cmd_0()\n"), "{py}");
        assert!(py.contains("      def ____then_1():\n        return ____x_0\n"));
        assert!(py.contains("      def ____else_1():\n        return None\n"));
        assert!(py.contains("      return ____then_1() if s['k'] else ____else_1()\n"));
        assert!(py.contains("      def ____let_2():\n        ____t_2 = ____st.lower(____x_0)\n        return ____st.lower(____t_2)\n"), "{py}");
        assert!(py.contains("    return {'b' : ____z_3}\n"), "{py}");
    }

    #[test]
    fn body_must_match_definition() {
        let src = "component echo inputs a outputs b do return b <- a";
        let module = crate::parser::parse(src).module.expect("module");
        let resolved = crate::resolve::resolve(&module, "echo.pcl", &registry());
        let arena_src = crate::parser::parse("component c inputs a outputs a as wire a -> a")
            .module
            .expect("module");
        let Definition::Arrow(expr) = &arena_src.component.definition else {
            panic!("expected arrow")
        };
        let arena = ExprArena::build(expr);
        let err = generate(
            &module,
            &resolved.symbols,
            Body::Arrow(&arena),
            &LineIndex::new(src),
            &options(false),
        )
        .expect_err("mismatch");
        assert_eq!(err, CodegenError::DefinitionMismatch);
    }

    #[test]
    fn python_literals() {
        assert_eq!(py_str("it's"), "'it\\'s'");
        assert_eq!(py_literal(&LiteralValue::Float(2.5)), "2.5");
        assert_eq!(py_literal(&LiteralValue::Bool(false)), "False");
        assert_eq!(py_literal(&LiteralValue::Integer(-3)), "-3");
    }
}
