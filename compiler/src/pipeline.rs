// pipeline.rs — Compilation state and pass orchestration
//
// Holds the parsed module, the signature registry and every pass artifact,
// and runs the minimal set of passes for a given terminal PassId. Passes
// that do not apply to the component's dialect (the type passes for a
// do-block, the leaf IR for an arrow) are skipped.
//
// Preconditions: the module was parsed without errors.
// Postconditions: all artifacts for required passes are populated, or has_error is set.
// Failure modes: any pass emitting error-level diagnostics; codegen failures
//                are turned into an E0400 diagnostic.
// Side effects: calls on_pass_complete after each pass for immediate display;
//               the registry may read leaf modules from disk during resolve.

use std::time::{Duration, Instant};

use crate::ast::{Definition, Module};
use crate::codegen::{Body, CodegenOptions, GeneratedCode};
use crate::diag::{codes, has_errors, Diagnostic, LineIndex};
use crate::hir::ExprArena;
use crate::lir::LirLeaf;
use crate::pass::{descriptor, required_passes, Dialect, PassId};
use crate::registry::Registry;
use crate::resolve::ModuleSymbols;

// ── Provenance ─────────────────────────────────────────────────────────────

/// Hashes identifying the inputs of a build.
///
/// `source_hash`: SHA-256 of the raw `.pcl` source text.
/// `registry_fingerprint`: SHA-256 of `Registry::canonical_json()`.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub registry_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    pub fn source_hash_hex(&self) -> String {
        hex(&self.source_hash)
    }

    pub fn registry_fingerprint_hex(&self) -> String {
        hex(&self.registry_fingerprint)
    }
}

fn hex(bytes: &[u8; 32]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(64);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(text: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.finalize().into()
}

/// Compute provenance from source text and registry. The fingerprint uses
/// the compact canonical JSON so it does not depend on load order.
pub fn compute_provenance(source: &str, registry: &Registry) -> Provenance {
    Provenance {
        source_hash: sha256(source),
        registry_fingerprint: sha256(&registry.canonical_json()),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Compilation state ──────────────────────────────────────────────────────

/// Holds all compilation artifacts and accumulated diagnostics.
pub struct CompilationState {
    pub module: Module,
    pub registry: Registry,
    /// Path the module was read from, used for the file-name check.
    pub file: String,
    pub lines: LineIndex,
    pub symbols: Option<ModuleSymbols>,
    pub arena: Option<ExprArena>,
    pub lir: Option<LirLeaf>,
    pub generated: Option<GeneratedCode>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
    pub provenance: Option<Provenance>,
}

impl CompilationState {
    pub fn new(module: Module, registry: Registry, file: &str, source: &str) -> Self {
        Self {
            module,
            registry,
            file: file.to_string(),
            lines: LineIndex::new(source),
            symbols: None,
            arena: None,
            lir: None,
            generated: None,
            diagnostics: Vec::new(),
            has_error: false,
            provenance: None,
        }
    }

    fn dialect(&self) -> Dialect {
        match self.module.component.definition {
            Definition::Arrow(_) => Dialect::Arrow,
            Definition::Do(_) => Dialect::Leaf,
        }
    }
}

// ── Error type ─────────────────────────────────────────────────────────────

/// Pipeline execution failed due to error-level diagnostics in a pass.
/// The specific diagnostics are available in `CompilationState.diagnostics`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    pub failing_pass: PassId,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pass {} failed", descriptor(self.failing_pass).name)
    }
}

impl std::error::Error for PipelineError {}

// ── Per-pass bookkeeping ───────────────────────────────────────────────────

/// Callback, accumulate, log, error check.
fn finish_pass(
    state: &mut CompilationState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    verbose: bool,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    on_pass_complete(pass_id, &diags);
    let is_err = has_errors(&diags);
    state.diagnostics.extend(diags);
    let name = descriptor(pass_id).name;
    let ms = elapsed.as_secs_f64() * 1000.0;
    log::debug!("pass {} complete, {:.1}ms", name, ms);
    if verbose {
        eprintln!("pclc: {} complete, {:.1}ms", name, ms);
    }
    if is_err {
        state.has_error = true;
        return Err(PipelineError {
            failing_pass: pass_id,
        });
    }
    Ok(())
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: execute, on_pass_complete(callback), log, error check.
pub fn run_pipeline(
    state: &mut CompilationState,
    terminal: PassId,
    codegen_options: &CodegenOptions,
    verbose: bool,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    let dialect = state.dialect();

    for pass_id in required_passes(terminal) {
        let applies = descriptor(pass_id).dialect;
        if applies != Dialect::Any && applies != dialect {
            log::trace!("pass {} skipped", descriptor(pass_id).name);
            continue;
        }

        let t = Instant::now();
        let diags = match pass_id {
            PassId::Resolve => {
                let result = crate::resolve::resolve(&state.module, &state.file, &state.registry);
                state.symbols = Some(result.symbols);
                result.diagnostics
            }
            PassId::BuildHir => {
                if let Definition::Arrow(expr) = &state.module.component.definition {
                    state.arena = Some(ExprArena::build(expr));
                }
                Vec::new()
            }
            PassId::TypeInfer => match (&mut state.arena, &state.symbols) {
                (Some(arena), Some(symbols)) => crate::type_infer::infer(arena, symbols),
                _ => missing_artifact(pass_id),
            },
            PassId::Analyze => match (&mut state.arena, &mut state.symbols) {
                (Some(arena), Some(symbols)) => crate::analyze::analyze(arena, symbols),
                _ => missing_artifact(pass_id),
            },
            PassId::BuildLir => match (&state.module.component.definition, &state.symbols) {
                (Definition::Do(block), Some(symbols)) => {
                    match crate::lir::build_lir(block, &symbols.do_tables) {
                        Ok(leaf) => {
                            state.lir = Some(leaf);
                            Vec::new()
                        }
                        Err(e) => vec![codegen_failure(e.span, &e)],
                    }
                }
                _ => missing_artifact(pass_id),
            },
            PassId::Codegen => run_codegen(state, codegen_options),
        };
        finish_pass(
            state,
            pass_id,
            diags,
            t.elapsed(),
            verbose,
            &mut on_pass_complete,
        )?;
    }
    Ok(())
}

fn run_codegen(state: &mut CompilationState, options: &CodegenOptions) -> Vec<Diagnostic> {
    let span = state.module.span;
    let Some(symbols) = &state.symbols else {
        return missing_artifact(PassId::Codegen);
    };
    let body = match (&state.arena, &state.lir) {
        (Some(arena), _) => Body::Arrow(arena),
        (None, Some(leaf)) => Body::Leaf(leaf),
        (None, None) => return missing_artifact(PassId::Codegen),
    };
    let mut options = options.clone();
    if options.provenance.is_none() {
        options.provenance = state.provenance.clone();
    }
    match crate::codegen::generate(&state.module, symbols, body, &state.lines, &options) {
        Ok(code) => {
            state.generated = Some(code);
            Vec::new()
        }
        Err(e) => vec![codegen_failure(span, &e)],
    }
}

fn codegen_failure(span: crate::ast::Span, err: &dyn std::error::Error) -> Diagnostic {
    Diagnostic::error(codes::E0400, span, format!("Code generation failed: {}", err))
}

fn missing_artifact(pass_id: PassId) -> Vec<Diagnostic> {
    let span: crate::ast::Span = (0..0).into();
    vec![Diagnostic::error(
        codes::E0400,
        span,
        format!(
            "Code generation failed: pass {} ran without its inputs",
            descriptor(pass_id).name
        ),
    )]
}

// ── Signature export ───────────────────────────────────────────────────────

/// Registry holding the signature of every successfully loaded import,
/// whether it came from a manifest or was scanned from Python source.
pub fn resolved_signatures(state: &CompilationState) -> Registry {
    use crate::registry::SignatureProvider;
    use crate::resolve::ImportKind;

    let mut out = Registry::new();
    let Some(symbols) = &state.symbols else {
        return out;
    };
    for import in &symbols.imports {
        match &import.kind {
            ImportKind::Component(leaf) if leaf.loaded => {
                if let Ok(sig) = state.registry.component(&import.module_path) {
                    out.insert_component(&import.module_path, sig);
                }
            }
            ImportKind::Component(_) => {}
            ImportKind::Package(_) => {
                if let Ok(pkg) = state.registry.functions(&import.module_path) {
                    out.insert_package(&import.module_path, pkg);
                }
            }
        }
    }
    out
}

// ── Convenience entry point ────────────────────────────────────────────────

/// Outcome of compiling one source text.
#[derive(Debug)]
pub struct CompileOutput {
    pub diagnostics: Vec<Diagnostic>,
    /// `None` when any error was reported.
    pub generated: Option<GeneratedCode>,
}

/// Parse and compile `source` (read from `file`) down to Python.
pub fn compile(
    source: &str,
    file: &str,
    registry: Registry,
    options: &CodegenOptions,
) -> CompileOutput {
    let parsed = crate::parser::parse(source);
    let module = match parsed.module {
        Some(m) if !has_errors(&parsed.errors) => m,
        _ => {
            return CompileOutput {
                diagnostics: parsed.errors,
                generated: None,
            }
        }
    };
    let mut state = CompilationState::new(module, registry, file, source);
    state.provenance = Some(compute_provenance(source, &state.registry));
    let _ = run_pipeline(&mut state, PassId::Codegen, options, false, |_, _| {});
    CompileOutput {
        diagnostics: state.diagnostics,
        generated: if state.has_error { None } else { state.generated },
    }
}
