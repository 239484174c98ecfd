use clap::Parser;
use std::path::{Path, PathBuf};

use pclc::codegen::CodegenOptions;
use pclc::diag::{Diagnostic, LineIndex};
use pclc::pass::PassId;
use pclc::pipeline::{compute_provenance, run_pipeline, CompilationState};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum EmitStage {
    Python,
    Ast,
    Lir,
    Signatures,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "pclc",
    version,
    disable_version_flag = true,
    about = "PCL compiler: translates .pcl pipeline components into Python modules"
)]
struct Cli {
    /// Input .pcl source file (the extension may be omitted)
    source: PathBuf,

    /// Logging level (RUST_LOG is used when absent)
    #[arg(short, long = "loglevel", value_enum)]
    loglevel: Option<LogLevel>,

    /// Instrument the generated code with trace output
    #[arg(short, long)]
    instrument: bool,

    /// Signature manifest JSON (repeatable)
    #[arg(long = "signatures")]
    signatures: Vec<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Python)]
    emit: EmitStage,

    /// Print compiler phases and timing
    #[arg(long)]
    verbose: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: (),
}

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if let Some(level) = cli.loglevel {
        logger.filter_level(level.into());
    }
    logger.format_timestamp(None).init();

    let source_path = with_pcl_extension(&cli.source);
    let file = source_path.display().to_string();
    if cli.verbose {
        eprintln!("pclc: source = {}", file);
        eprintln!("pclc: emit   = {:?}", cli.emit);
    }

    // ── Load signature registry ──
    let search_paths = import_search_paths(std::env::var("PCL_IMPORT_PATH").ok().as_deref());
    log::debug!("import search path {:?}", search_paths);
    let mut registry = pclc::registry::Registry::with_search_paths(search_paths);
    for path in &cli.signatures {
        match registry.load_manifest(path) {
            Ok(n) => {
                if cli.verbose {
                    eprintln!("pclc: loaded {} signatures from {}", n, path.display());
                }
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        }
    }

    // ── Read and parse source ──
    let source = match std::fs::read_to_string(&source_path) {
        Ok(s) => s,
        Err(e) => {
            log::debug!("cannot read {}: {}", file, e);
            eprintln!("ERROR: Cannot find file {}", file);
            std::process::exit(1);
        }
    };
    let lines = LineIndex::new(&source);

    let parse_result = pclc::parser::parse(&source);
    report(&parse_result.errors, &file, &lines);
    let module = match parse_result.module {
        Some(m) if !pclc::diag::has_errors(&parse_result.errors) => m,
        _ => std::process::exit(1),
    };

    if matches!(cli.emit, EmitStage::Ast) {
        println!("{:#?}", module);
        std::process::exit(0);
    }

    let component = module.component.name.name.clone();
    let mut state = CompilationState::new(module, registry, &file, &source);
    state.provenance = Some(compute_provenance(&source, &state.registry));

    let terminal = match cli.emit {
        EmitStage::Signatures => PassId::Resolve,
        EmitStage::Lir => PassId::BuildLir,
        _ => PassId::Codegen,
    };
    let options = CodegenOptions {
        instrument: cli.instrument,
        generated_at: chrono::Local::now()
            .format("%A %d %B %Y at %H:%M:%S")
            .to_string(),
        provenance: None,
    };

    let result = run_pipeline(&mut state, terminal, &options, cli.verbose, |_, diags| {
        report(diags, &file, &lines)
    });
    if let Err(e) = result {
        log::info!("{}", e);
        std::process::exit(1);
    }

    match cli.emit {
        EmitStage::Signatures => {
            println!("{}", pclc::pipeline::resolved_signatures(&state).pretty_json());
        }
        EmitStage::Lir => match &state.lir {
            Some(leaf) => print!("{}", leaf),
            None => eprintln!("pclc: {} is not a do-block component", component),
        },
        EmitStage::Python => {
            let Some(generated) = &state.generated else {
                std::process::exit(1);
            };
            let dir = source_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            if let Err(e) = write_outputs(&dir, &component, &generated.python_source) {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
            if cli.verbose {
                eprintln!("pclc: wrote {}", dir.join(format!("{}.py", component)).display());
            }
        }
        EmitStage::Ast => {}
    }
}

fn report(diags: &[Diagnostic], file: &str, lines: &LineIndex) {
    for diag in diags {
        eprintln!("{}", diag.render(file, lines));
    }
}

/// `name` becomes `name.pcl`; an explicit extension is kept.
fn with_pcl_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension("pcl")
    }
}

/// Colon-separated directories from `PCL_IMPORT_PATH`, then `.`.
fn import_search_paths(var: Option<&str>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = var
        .unwrap_or_default()
        .split(':')
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect();
    paths.push(PathBuf::from("."));
    paths
}

/// Write `<component>.py` and, if absent, an empty `__init__.py`.
fn write_outputs(dir: &Path, component: &str, python: &str) -> std::io::Result<()> {
    std::fs::write(dir.join(format!("{}.py", component)), python)?;
    let init = dir.join("__init__.py");
    if !init.exists() {
        std::fs::write(init, "")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_added_when_missing() {
        assert_eq!(with_pcl_extension(Path::new("a/echo")), PathBuf::from("a/echo.pcl"));
        assert_eq!(with_pcl_extension(Path::new("echo.pcl")), PathBuf::from("echo.pcl"));
    }

    #[test]
    fn search_path_ends_with_cwd() {
        assert_eq!(import_search_paths(None), vec![PathBuf::from(".")]);
        assert_eq!(
            import_search_paths(Some("/a::/b")),
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from(".")]
        );
    }
}
