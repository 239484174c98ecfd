// resolve.rs — Pass 1: declarations, imports and do-block scopes
//
// Walks the parsed module once, resolves imports through the signature
// provider, checks the component header and declarations, binds do-block
// variables in a scope arena, and marks imports, declarations and
// configuration as used. Unused entities are reported as warnings once the
// whole module has been visited.
//
// Preconditions: `module` is an AST from the parser (may contain recovered
//                `Error` nodes, which are skipped).
// Postconditions: returns the module symbol tables plus all accumulated
//                 diagnostics. Resolution continues past errors.
// Failure modes: unknown names, duplicates, failed imports and scope
//                violations produce `Diagnostic` entries.
// Side effects: the provider may read leaf modules from disk.

use std::collections::HashMap;
use std::path::Path;

use crate::ast::*;
use crate::diag::{codes, DiagCode, Diagnostic};
use crate::id::{IdAllocator, ScopeId, VarId};
use crate::registry::{FunctionPackage, SignatureProvider};
use crate::scope::ScopeArena;
use crate::signal::SignalType;

// ── Public types ────────────────────────────────────────────────────────────

/// Result of pass 1.
#[derive(Debug)]
pub struct ResolveResult {
    pub symbols: ModuleSymbols,
    pub diagnostics: Vec<Diagnostic>,
}

/// Interface of an imported leaf component as seen by the type passes.
/// Missing entry points and failed imports read as empty lists.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafSignature {
    pub inputs: SignalType,
    pub outputs: SignalType,
    pub configuration: Vec<String>,
    /// False when the module could not be loaded.
    pub loaded: bool,
}

impl LeafSignature {
    fn dummy() -> Self {
        LeafSignature {
            inputs: SignalType::flat(Vec::<String>::new()),
            outputs: SignalType::flat(Vec::<String>::new()),
            configuration: Vec::new(),
            loaded: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ImportKind {
    /// Imported by an arrow component.
    Component(LeafSignature),
    /// Imported by a do-block component.
    Package(FunctionPackage),
}

#[derive(Debug, Clone)]
pub struct ImportEntry {
    pub alias: String,
    pub module_path: String,
    pub span: Span,
    pub kind: ImportKind,
    pub used: bool,
}

#[derive(Debug, Clone)]
pub struct DeclEntry {
    pub name: String,
    /// Import alias of the instantiated component.
    pub alias: String,
    /// Index into `Component::declarations`.
    pub index: usize,
    pub span: Span,
    pub used: bool,
}

#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub name: String,
    pub span: Span,
    pub used: bool,
}

/// What a do-block operand refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef {
    Input,
    Local(VarId),
    State,
    Literal,
}

/// Scope tables for a do-block component.
#[derive(Debug, Default)]
pub struct DoTables {
    pub scopes: ScopeArena,
    /// Scope each command was resolved in, keyed by command span.
    pub command_scopes: HashMap<Span, ScopeId>,
    /// Variable bound by each assignment target, keyed by the target span.
    pub targets: HashMap<Span, VarId>,
    /// Resolution of each operand, keyed by the operand span.
    pub refs: HashMap<Span, VarRef>,
}

/// Symbol tables for one module. Entries are kept in source order with
/// duplicates dropped (the first occurrence wins).
#[derive(Debug)]
pub struct ModuleSymbols {
    pub component: String,
    pub imports: Vec<ImportEntry>,
    pub declarations: Vec<DeclEntry>,
    pub configuration: Vec<ConfigEntry>,
    pub do_tables: DoTables,
    /// Declared interface.
    pub declared_inputs: SignalType,
    pub declared_outputs: SignalType,
    /// Interface inferred for the definition (set by pass 3 for arrow
    /// components, copied from the declaration for do-blocks).
    pub inputs: Option<SignalType>,
    pub outputs: Option<SignalType>,
}

impl ModuleSymbols {
    pub fn import(&self, alias: &str) -> Option<&ImportEntry> {
        self.imports.iter().find(|i| i.alias == alias)
    }

    fn import_mut(&mut self, alias: &str) -> Option<&mut ImportEntry> {
        self.imports.iter_mut().find(|i| i.alias == alias)
    }

    pub fn declaration(&self, name: &str) -> Option<&DeclEntry> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// The leaf signature instantiated by declaration `name`.
    pub fn leaf_of(&self, name: &str) -> Option<&LeafSignature> {
        let decl = self.declaration(name)?;
        match &self.import(&decl.alias)?.kind {
            ImportKind::Component(sig) => Some(sig),
            ImportKind::Package(_) => None,
        }
    }

    pub fn has_configuration(&self, name: &str) -> bool {
        self.configuration.iter().any(|c| c.name == name)
    }

    pub fn configuration_names(&self) -> impl Iterator<Item = &str> {
        self.configuration.iter().map(|c| c.name.as_str())
    }
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Resolve declarations and scopes of a parsed module. `file` is the path
/// the module was read from; its stem must match the component name.
pub fn resolve(module: &Module, file: &str, provider: &dyn SignatureProvider) -> ResolveResult {
    let mut ctx = ResolveCtx::new(module, provider);

    ctx.resolve_imports(module);
    ctx.check_header(file);
    ctx.collect_declarations();

    match &module.component.definition {
        Definition::Arrow(expr) => ctx.resolve_arrow(expr),
        Definition::Do(block) => ctx.resolve_do(block),
    }

    ctx.report_unused();

    ResolveResult {
        symbols: ctx.symbols,
        diagnostics: ctx.diagnostics,
    }
}

/// Names occurring more than once, each reported once at its second
/// occurrence. The set of reported names does not depend on order.
pub fn duplicates<'a>(ids: impl IntoIterator<Item = &'a Ident>) -> Vec<&'a Ident> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut dups = Vec::new();
    for id in ids {
        let count = counts.entry(id.name.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            dups.push(id);
        }
    }
    dups
}

// ── Internal context ────────────────────────────────────────────────────────

struct ResolveCtx<'a> {
    provider: &'a dyn SignatureProvider,
    component: &'a Component,
    symbols: ModuleSymbols,
    diagnostics: Vec<Diagnostic>,
    ids: IdAllocator,
}

impl<'a> ResolveCtx<'a> {
    fn new(module: &'a Module, provider: &'a dyn SignatureProvider) -> Self {
        let component = &module.component;
        ResolveCtx {
            provider,
            component,
            symbols: ModuleSymbols {
                component: component.name.name.clone(),
                imports: Vec::new(),
                declarations: Vec::new(),
                configuration: Vec::new(),
                do_tables: DoTables::default(),
                declared_inputs: SignalType::from_list(&component.inputs),
                declared_outputs: SignalType::from_list(&component.outputs),
                inputs: None,
                outputs: None,
            },
            diagnostics: Vec::new(),
            ids: IdAllocator::new(),
        }
    }

    fn error(&mut self, code: DiagCode, span: Span, message: String) {
        self.diagnostics.push(Diagnostic::error(code, span, message));
    }

    fn warning(&mut self, code: DiagCode, span: Span, message: String) {
        self.diagnostics.push(Diagnostic::warning(code, span, message));
    }

    // ── Imports ─────────────────────────────────────────────────────────

    fn resolve_imports(&mut self, module: &Module) {
        let is_leaf = self.component.is_leaf();
        for import in &module.imports {
            let alias = &import.alias.name;
            let path = &import.module_path.name;
            if self.symbols.import(alias).is_some() {
                self.error(
                    codes::E0300,
                    import.alias.span,
                    format!("duplicate import alias found {}", alias),
                );
                continue;
            }

            let kind = if is_leaf {
                ImportKind::Package(self.import_package(import))
            } else {
                ImportKind::Component(self.import_component(import))
            };
            log::trace!("import {} as {}", path, alias);

            self.symbols.imports.push(ImportEntry {
                alias: alias.clone(),
                module_path: path.clone(),
                span: import.span,
                kind,
                used: false,
            });
        }
    }

    fn import_component(&mut self, import: &Import) -> LeafSignature {
        let path = &import.module_path.name;
        let sig = match self.provider.component(path) {
            Ok(sig) => sig,
            Err(e) => {
                self.error(
                    codes::E0301,
                    import.span,
                    format!("error importing module {}: {}", path, e),
                );
                return LeafSignature::dummy();
            }
        };
        for missing in sig.missing_entry_points() {
            self.error(
                codes::E0302,
                import.span,
                format!(
                    "imported Python module {} does not define {} function",
                    path, missing
                ),
            );
        }
        let empty = || SignalType::flat(Vec::<String>::new());
        LeafSignature {
            inputs: sig.inputs.as_ref().map(|s| s.to_type()).unwrap_or_else(empty),
            outputs: sig.outputs.as_ref().map(|s| s.to_type()).unwrap_or_else(empty),
            configuration: sig.configuration_keys().to_vec(),
            loaded: true,
        }
    }

    fn import_package(&mut self, import: &Import) -> FunctionPackage {
        let path = &import.module_path.name;
        let mut package = match self.provider.functions(path) {
            Ok(package) => package,
            Err(e) => {
                self.error(
                    codes::E0301,
                    import.span,
                    format!("error importing module {}: {}", path, e),
                );
                return FunctionPackage::new();
            }
        };
        let dropped: Vec<String> = package
            .iter()
            .filter(|(_, f)| f.keywords)
            .map(|(name, _)| name.clone())
            .collect();
        for name in dropped {
            package.remove(&name);
            self.warning(
                codes::W0004,
                import.span,
                format!(
                    "dropping function {} imported from module {} since arguments are unsupported.",
                    name, path
                ),
            );
        }
        package
    }

    // ── Component header ────────────────────────────────────────────────

    fn check_header(&mut self, file: &str) {
        let component = self.component;
        let name = &component.name;
        let stem = Path::new(file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if stem != name.name {
            self.error(
                codes::E0100,
                name.span,
                format!(
                    "component {} should be declared in a file called {}.pcl",
                    name, name
                ),
            );
        }

        if component.is_leaf() {
            if let SignalList::Tuple(..) = component.inputs {
                self.error(
                    codes::E0102,
                    component.span,
                    "only one input is supported".to_string(),
                );
            }
            if let SignalList::Tuple(..) = component.outputs {
                self.error(
                    codes::E0102,
                    component.span,
                    "only one output is supported".to_string(),
                );
            }
        }

        for (list, what) in [(&component.inputs, "input"), (&component.outputs, "output")] {
            let dups = match list {
                SignalList::Flat(ids) => duplicates(ids),
                SignalList::Tuple(top, bottom) => {
                    let mut dups = duplicates(top);
                    dups.extend(duplicates(bottom));
                    dups
                }
            };
            for dup in dups {
                self.error(
                    codes::E0101,
                    dup.span,
                    format!("{} declaration contains duplicate identifier {}", what, dup),
                );
            }
        }

        for dup in duplicates(&component.configuration) {
            self.error(
                codes::E0101,
                dup.span,
                format!("configuration declaration contains duplicate identifier {}", dup),
            );
        }
        for id in &component.configuration {
            if !self.symbols.has_configuration(&id.name) {
                self.symbols.configuration.push(ConfigEntry {
                    name: id.name.clone(),
                    span: id.span,
                    used: false,
                });
            }
        }

        if component.is_leaf() {
            self.symbols.inputs = Some(self.symbols.declared_inputs.clone());
            self.symbols.outputs = Some(self.symbols.declared_outputs.clone());
        }
    }

    // ── Declarations ────────────────────────────────────────────────────

    fn collect_declarations(&mut self) {
        let component = self.component;
        for dup in duplicates(component.declarations.iter().map(|d| &d.name)) {
            self.error(
                codes::E0101,
                dup.span,
                format!("component declaration contains duplicate identifier {}", dup),
            );
        }

        for (index, decl) in component.declarations.iter().enumerate() {
            self.check_declaration(decl);
            if self.symbols.declaration(&decl.name.name).is_none() {
                self.symbols.declarations.push(DeclEntry {
                    name: decl.name.name.clone(),
                    alias: decl.component.name.clone(),
                    index,
                    span: decl.span,
                    used: false,
                });
            }
        }
    }

    fn check_declaration(&mut self, decl: &Declaration) {
        let alias = &decl.component.name;
        let leaf = match self.symbols.import_mut(alias) {
            Some(entry) => {
                entry.used = true;
                match &entry.kind {
                    ImportKind::Component(sig) => {
                        Some((sig.clone(), entry.module_path.clone()))
                    }
                    ImportKind::Package(_) => None,
                }
            }
            None => None,
        };
        if leaf.is_none() {
            self.error(
                codes::E0104,
                decl.component.span,
                format!("import not found in declaration of {}", alias),
            );
        }

        for mapping in decl.mappings() {
            match &mapping.from {
                Operand::Ident(from) | Operand::State(from) => {
                    if !self.use_configuration(&from.name) {
                        self.error(
                            codes::E0105,
                            from.span,
                            format!("component configuration does not exist {}", from),
                        );
                    }
                }
                Operand::Literal(_) => {}
            }
            if let Some((sig, module_path)) = &leaf {
                if sig.loaded && !sig.configuration.contains(&mapping.to.name) {
                    self.error(
                        codes::E0106,
                        mapping.to.span,
                        format!(
                            "configuration {} used which is not defined in module {}",
                            mapping.to, module_path
                        ),
                    );
                }
            }
        }

        if let (Some(mappings), Some((sig, _))) = (&decl.with_clause, &leaf) {
            let missing: Vec<&str> = sig
                .configuration
                .iter()
                .filter(|key| !mappings.iter().any(|m| &m.to.name == *key))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                self.error(
                    codes::E0107,
                    decl.span,
                    format!(
                        "missing configuration in declaration of component {} with alias {}: {}",
                        decl.name,
                        alias,
                        missing.join(", ")
                    ),
                );
            }
        }
    }

    /// Mark configuration `name` used. Returns false if it is not defined.
    fn use_configuration(&mut self, name: &str) -> bool {
        match self.symbols.configuration.iter_mut().find(|c| c.name == name) {
            Some(entry) => {
                entry.used = true;
                true
            }
            None => false,
        }
    }

    // ── Arrow definition ────────────────────────────────────────────────

    fn resolve_arrow(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Composition(l, r)
            | ExprKind::ParallelTuple(l, r)
            | ExprKind::ParallelScalar(l, r) => {
                self.resolve_arrow(l);
                self.resolve_arrow(r);
            }
            ExprKind::First(e) | ExprKind::Second(e) | ExprKind::Paren(e) => {
                self.resolve_arrow(e)
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut states = Vec::new();
                condition.for_each_terminal(&mut |op| {
                    if let Operand::State(id) = op {
                        states.push(id);
                    }
                });
                for id in states {
                    self.use_configuration(&id.name);
                }
                self.resolve_arrow(then_branch);
                self.resolve_arrow(else_branch);
            }
            ExprKind::Identifier(id) => {
                let known = self
                    .symbols
                    .declarations
                    .iter_mut()
                    .find(|d| d.name == id.name)
                    .map(|decl| decl.used = true)
                    .is_some();
                if !known {
                    self.error(codes::E0103, id.span, format!("unknown component {}", id));
                }
            }
            ExprKind::Split
            | ExprKind::Merge(_)
            | ExprKind::Wire(_)
            | ExprKind::WireTuple(..)
            | ExprKind::Error => {}
        }
    }

    // ── Do-block definition ─────────────────────────────────────────────

    fn resolve_do(&mut self, block: &DoBlock) {
        for command in &block.commands {
            self.resolve_command(command);
        }
        self.resolve_returns(block);
    }

    fn resolve_command(&mut self, command: &Command) {
        let scope = self.symbols.do_tables.scopes.current();
        self.symbols
            .do_tables
            .command_scopes
            .insert(command.span, scope);

        match &command.kind {
            CommandKind::Call(call) => self.resolve_call(call),
            CommandKind::Let { bindings, body } => {
                self.symbols.do_tables.scopes.push();
                for binding in bindings {
                    self.resolve_call(&binding.call);
                    self.assign(&binding.target);
                }
                self.resolve_call(body);
                self.symbols.do_tables.scopes.pop();
            }
            CommandKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.resolve_do_condition(condition);
                for block in [then_block, else_block] {
                    self.symbols.do_tables.scopes.push();
                    self.resolve_block(block);
                    self.symbols.do_tables.scopes.pop();
                }
            }
            CommandKind::Error => {}
        }

        // The target is bound after the right-hand side, in the scope the
        // command runs in.
        if let Some(target) = &command.target {
            self.assign(target);
        }
    }

    fn resolve_block(&mut self, block: &Block) {
        for command in &block.commands {
            self.resolve_command(command);
        }
        let ReturnValue::Value(value) = &block.ret else {
            return;
        };
        match value {
            Operand::State(id) => {
                if self.use_configuration(&id.name) {
                    self.record_ref(id.span, VarRef::State);
                } else {
                    self.error(
                        codes::E0117,
                        id.span,
                        format!("unknown configuration in return {}", value),
                    );
                }
            }
            Operand::Ident(id) => {
                if self.component.outputs.contains(&id.name) {
                    self.error(
                        codes::E0118,
                        id.span,
                        format!("output signal used in return {}", id),
                    );
                } else if let Some(r) = self.lookup_var(&id.name) {
                    self.record_ref(id.span, r);
                } else {
                    self.error(
                        codes::E0119,
                        id.span,
                        format!("unknown variable in return {}", id),
                    );
                }
            }
            Operand::Literal(lit) => self.record_ref(lit.span, VarRef::Literal),
        }
    }

    fn resolve_returns(&mut self, block: &DoBlock) {
        let component = self.component;

        for dup in duplicates(block.returns.iter().map(|m| &m.to)) {
            self.error(
                codes::E0120,
                dup.span,
                format!("duplicate output in return {}", dup),
            );
        }

        for output in component.outputs.names() {
            if !block.returns.iter().any(|m| m.to.name == output.name) {
                self.error(
                    codes::E0121,
                    block.return_span,
                    format!("defined output is missing in return {}", output),
                );
            }
        }

        let mut reported: Vec<&str> = Vec::new();
        for mapping in &block.returns {
            let to = &mapping.to;
            if !component.outputs.contains(&to.name) && !reported.contains(&to.name.as_str()) {
                reported.push(&to.name);
                self.error(
                    codes::E0122,
                    to.span,
                    format!("unknown output in return {}", to),
                );
            }

            match &mapping.from {
                Operand::Ident(id) => match self.lookup_var(&id.name) {
                    Some(r) => self.record_ref(id.span, r),
                    None => self.error(
                        codes::E0119,
                        id.span,
                        format!("unknown variable in return {}", id),
                    ),
                },
                Operand::State(id) => {
                    if self.use_configuration(&id.name) {
                        self.record_ref(id.span, VarRef::State);
                    } else {
                        self.error(
                            codes::E0117,
                            id.span,
                            format!("unknown configuration in return {}", mapping.from),
                        );
                    }
                }
                Operand::Literal(lit) => self.record_ref(lit.span, VarRef::Literal),
            }
        }
    }

    fn resolve_call(&mut self, call: &FunctionCall) {
        let alias = &call.package.name;
        let function = &call.function.name;

        // None: unknown alias; Some(None): unknown function.
        let lookup = self.symbols.import_mut(alias).map(|entry| {
            entry.used = true;
            match &entry.kind {
                ImportKind::Package(package) => package.get(function).cloned(),
                ImportKind::Component(_) => None,
            }
        });
        let spec = match lookup {
            None => {
                self.error(
                    codes::E0113,
                    call.package.span,
                    format!("unknown function package alias {}", alias),
                );
                None
            }
            Some(None) => {
                let message = format!("unknown function {}", call.qualified_name());
                self.error(codes::E0114, call.span, message);
                None
            }
            Some(spec) => spec,
        };

        if let Some(spec) = spec {
            let given = call.args.len();
            if !spec.is_variadic() && given != spec.params.len() {
                self.error(
                    codes::E0115,
                    call.span,
                    format!(
                        "function {} called with {} arguments, expected {}",
                        call.qualified_name(),
                        given,
                        spec.params.len()
                    ),
                );
            } else if spec.is_variadic() && given < spec.min_args() {
                self.error(
                    codes::E0115,
                    call.span,
                    format!(
                        "function {} called with {} arguments, expected at least {}",
                        call.qualified_name(),
                        given,
                        spec.min_args()
                    ),
                );
            }
        }

        for arg in &call.args {
            match arg {
                Operand::State(id) => {
                    if self.use_configuration(&id.name) {
                        self.record_ref(id.span, VarRef::State);
                    } else {
                        self.error(
                            codes::E0116,
                            id.span,
                            format!("unknown function argument {}", arg),
                        );
                    }
                }
                Operand::Ident(id) => match self.lookup_var(&id.name) {
                    Some(r) => self.record_ref(id.span, r),
                    None => self.error(
                        codes::E0116,
                        id.span,
                        format!("unknown function argument {}", id),
                    ),
                },
                Operand::Literal(lit) => self.record_ref(lit.span, VarRef::Literal),
            }
        }
    }

    fn resolve_do_condition(&mut self, condition: &Condition) {
        let mut terminals = Vec::new();
        condition.for_each_terminal(&mut |op| terminals.push(op));
        for op in terminals {
            match op {
                Operand::State(id) => {
                    if self.use_configuration(&id.name) {
                        self.record_ref(id.span, VarRef::State);
                    } else {
                        self.error(
                            codes::E0204,
                            id.span,
                            format!("identifier {} not defined in component configuration", id),
                        );
                    }
                }
                Operand::Ident(id) => match self.lookup_var(&id.name) {
                    Some(r) => self.record_ref(id.span, r),
                    None => self.error(
                        codes::E0123,
                        id.span,
                        format!("unknown variable in condition {}", id),
                    ),
                },
                Operand::Literal(lit) => self.record_ref(lit.span, VarRef::Literal),
            }
        }
    }

    fn assign(&mut self, target: &Ident) {
        if self.component.inputs.contains(&target.name) {
            self.error(
                codes::E0110,
                target.span,
                format!("attempt to write read-only input {}", target),
            );
        }
        if self.component.outputs.contains(&target.name) {
            self.error(
                codes::E0111,
                target.span,
                format!("attempt to write output {} outside a return", target),
            );
        }
        match self.symbols.do_tables.scopes.bind(&target.name, &mut self.ids) {
            Some(var) => {
                self.symbols.do_tables.targets.insert(target.span, var);
            }
            None => self.error(
                codes::E0112,
                target.span,
                format!("duplicate assignment variable {}", target),
            ),
        }
    }

    /// Local bindings shadow inputs.
    fn lookup_var(&self, name: &str) -> Option<VarRef> {
        if let Some(var) = self.symbols.do_tables.scopes.lookup(name) {
            return Some(VarRef::Local(var));
        }
        self.component.inputs.contains(name).then_some(VarRef::Input)
    }

    fn record_ref(&mut self, span: Span, r: VarRef) {
        self.symbols.do_tables.refs.insert(span, r);
    }

    // ── Unused entities ─────────────────────────────────────────────────

    fn report_unused(&mut self) {
        let unused_imports: Vec<(Span, String)> = self
            .symbols
            .imports
            .iter()
            .filter(|i| !i.used)
            .map(|i| (i.span, i.module_path.clone()))
            .collect();
        for (span, path) in unused_imports {
            self.warning(
                codes::W0001,
                span,
                format!("imported component {} is not used", path),
            );
        }

        let unused_decls: Vec<(Span, String)> = self
            .symbols
            .declarations
            .iter()
            .filter(|d| !d.used)
            .map(|d| (d.span, d.name.clone()))
            .collect();
        for (span, name) in unused_decls {
            self.warning(
                codes::W0002,
                span,
                format!("component {} is defined but not used", name),
            );
        }

        let unused_config: Vec<(Span, String)> = self
            .symbols
            .configuration
            .iter()
            .filter(|c| !c.used)
            .map(|c| (c.span, c.name.clone()))
            .collect();
        for (span, name) in unused_config {
            self.warning(
                codes::W0003,
                span,
                format!("component configuration {} is not used", name),
            );
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
