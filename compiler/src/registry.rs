// registry.rs — Leaf signature registry
//
// Supplies the interfaces of imported leaf components and function
// packages to the resolver through the `SignatureProvider` trait. The
// concrete `Registry` answers from in-memory entries loaded out of JSON
// manifests, and falls back to scanning Python leaf modules on the search
// path at the text level. No Python is executed: the entry points have a
// fixed shape (`def get_inputs():` followed by a literal `return`) that
// maps to simple string operations.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::signal::SignalType;

// ── Data types ──────────────────────────────────────────────────────────────

/// Declared inputs or outputs of a leaf: a list, or a `(list, list)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalShape {
    Flat(Vec<String>),
    Tuple(Vec<String>, Vec<String>),
}

impl SignalShape {
    pub fn to_type(&self) -> SignalType {
        match self {
            SignalShape::Flat(names) => SignalType::flat(names.iter().cloned()),
            SignalShape::Tuple(top, bottom) => {
                SignalType::tuple(top.iter().cloned(), bottom.iter().cloned())
            }
        }
    }
}

/// Interface of a leaf component module. A `None`/`false` field means the
/// module does not define that entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSignature {
    #[serde(default)]
    pub inputs: Option<SignalShape>,
    #[serde(default)]
    pub outputs: Option<SignalShape>,
    #[serde(default)]
    pub configuration: Option<Vec<String>>,
    #[serde(default = "entry_point_present")]
    pub configure: bool,
    #[serde(default = "entry_point_present")]
    pub initialise: bool,
}

fn entry_point_present() -> bool {
    true
}

impl ComponentSignature {
    /// Entry points a component module must define but this one lacks.
    pub fn missing_entry_points(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.inputs.is_none() {
            missing.push("get_inputs");
        }
        if self.outputs.is_none() {
            missing.push("get_outputs");
        }
        if self.configuration.is_none() {
            missing.push("get_configuration");
        }
        if !self.configure {
            missing.push("configure");
        }
        if !self.initialise {
            missing.push("initialise");
        }
        missing
    }

    pub fn configuration_keys(&self) -> &[String] {
        self.configuration.as_deref().unwrap_or(&[])
    }
}

/// Argument spec of one imported function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub params: Vec<String>,
    /// Number of trailing parameters with default values.
    #[serde(default)]
    pub defaults: usize,
    /// `*args`
    #[serde(default)]
    pub varargs: bool,
    /// `**kwargs`
    #[serde(default)]
    pub keywords: bool,
}

impl FunctionSignature {
    pub fn min_args(&self) -> usize {
        self.params.len().saturating_sub(self.defaults)
    }

    pub fn is_variadic(&self) -> bool {
        self.defaults > 0 || self.varargs
    }
}

/// Functions exported by a package module, by name.
pub type FunctionPackage = BTreeMap<String, FunctionSignature>;

/// On-disk manifest: leaf components and function packages by module path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub components: BTreeMap<String, ComponentSignature>,
    #[serde(default)]
    pub packages: BTreeMap<String, FunctionPackage>,
}

/// Errors that can occur during registry loading and lookup.
#[derive(Debug)]
pub enum RegistryError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ManifestError {
        path: PathBuf,
        message: String,
    },
    ParseError {
        file: PathBuf,
        line: usize,
        message: String,
    },
    DuplicateEntry {
        module: String,
        first: PathBuf,
        second: PathBuf,
    },
    NotFound {
        module: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::IoError { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            RegistryError::ManifestError { path, message } => {
                write!(f, "{}: {}", path.display(), message)
            }
            RegistryError::ParseError {
                file,
                line,
                message,
            } => {
                write!(f, "{}:{}: {}", file.display(), line, message)
            }
            RegistryError::DuplicateEntry {
                module,
                first,
                second,
            } => {
                write!(
                    f,
                    "duplicate module '{}': first defined in {}, redefined in {}",
                    module,
                    first.display(),
                    second.display()
                )
            }
            RegistryError::NotFound { module } => write!(f, "No module named {}", module),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ── Provider trait ──────────────────────────────────────────────────────────

/// Source of leaf interfaces consumed by the resolver.
pub trait SignatureProvider {
    /// Interface of a leaf component module (for arrow components).
    fn component(&self, module_path: &str) -> Result<ComponentSignature, RegistryError>;

    /// Functions of a package module (for do-block components).
    fn functions(&self, module_path: &str) -> Result<FunctionPackage, RegistryError>;
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Signature registry. Populated from JSON manifests and in-memory
/// entries; misses are looked up as Python source on the search path.
#[derive(Debug, Default)]
pub struct Registry {
    components: BTreeMap<String, (ComponentSignature, PathBuf)>,
    packages: BTreeMap<String, (FunctionPackage, PathBuf)>,
    search_paths: Vec<PathBuf>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that scans Python modules under `paths`, in order.
    pub fn with_search_paths(paths: Vec<PathBuf>) -> Self {
        Registry {
            search_paths: paths,
            ..Self::default()
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn insert_component(&mut self, module: &str, sig: ComponentSignature) {
        self.components
            .insert(module.to_string(), (sig, PathBuf::from("<memory>")));
    }

    pub fn insert_package(&mut self, module: &str, pkg: FunctionPackage) {
        self.packages
            .insert(module.to_string(), (pkg, PathBuf::from("<memory>")));
    }

    /// Load a JSON manifest file. Returns the number of entries found.
    pub fn load_manifest(&mut self, path: &Path) -> Result<usize, RegistryError> {
        let text = std::fs::read_to_string(path).map_err(|e| RegistryError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.load_manifest_str(&text, path)
    }

    /// Load manifest JSON text; `origin` is used in error messages.
    pub fn load_manifest_str(&mut self, text: &str, origin: &Path) -> Result<usize, RegistryError> {
        let manifest: Manifest =
            serde_json::from_str(text).map_err(|e| RegistryError::ManifestError {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;
        let count = manifest.components.len() + manifest.packages.len();

        for (module, sig) in manifest.components {
            if let Some((_, first)) = self.components.get(&module) {
                return Err(RegistryError::DuplicateEntry {
                    module,
                    first: first.clone(),
                    second: origin.to_path_buf(),
                });
            }
            self.components.insert(module, (sig, origin.to_path_buf()));
        }
        for (module, pkg) in manifest.packages {
            if let Some((_, first)) = self.packages.get(&module) {
                return Err(RegistryError::DuplicateEntry {
                    module,
                    first: first.clone(),
                    second: origin.to_path_buf(),
                });
            }
            self.packages.insert(module, (pkg, origin.to_path_buf()));
        }

        log::debug!("loaded {} signature entries from {}", count, origin.display());
        Ok(count)
    }

    /// Compact JSON of every in-memory entry, keys sorted. Stable across
    /// runs, so it can be hashed for provenance.
    pub fn canonical_json(&self) -> String {
        let manifest = self.manifest();
        serde_json::to_string(&manifest).unwrap_or_default()
    }

    /// Pretty JSON of every in-memory entry (the manifest file format).
    pub fn pretty_json(&self) -> String {
        let manifest = self.manifest();
        serde_json::to_string_pretty(&manifest).unwrap_or_default()
    }

    fn manifest(&self) -> Manifest {
        Manifest {
            components: self
                .components
                .iter()
                .map(|(k, (sig, _))| (k.clone(), sig.clone()))
                .collect(),
            packages: self
                .packages
                .iter()
                .map(|(k, (pkg, _))| (k.clone(), pkg.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len() + self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.packages.is_empty()
    }

    /// Find the Python source of `a.b.c` as `a/b/c.py` or `a/b/c/__init__.py`.
    pub fn locate(&self, module_path: &str) -> Option<PathBuf> {
        let rel: PathBuf = module_path.split('.').collect();
        self.search_paths.iter().find_map(|dir| {
            let file = dir.join(&rel).with_extension("py");
            if file.is_file() {
                return Some(file);
            }
            let package = dir.join(&rel).join("__init__.py");
            package.is_file().then_some(package)
        })
    }

    fn read_module(&self, module_path: &str) -> Result<(String, PathBuf), RegistryError> {
        let path = self
            .locate(module_path)
            .ok_or_else(|| RegistryError::NotFound {
                module: module_path.to_string(),
            })?;
        let source = std::fs::read_to_string(&path).map_err(|e| RegistryError::IoError {
            path: path.clone(),
            source: e,
        })?;
        Ok((source, path))
    }
}

impl SignatureProvider for Registry {
    fn component(&self, module_path: &str) -> Result<ComponentSignature, RegistryError> {
        if let Some((sig, _)) = self.components.get(module_path) {
            log::trace!("component {} found in registry", module_path);
            return Ok(sig.clone());
        }
        let (source, path) = self.read_module(module_path)?;
        log::trace!("component {} scanned from {}", module_path, path.display());
        scan_component(&source, &path)
    }

    fn functions(&self, module_path: &str) -> Result<FunctionPackage, RegistryError> {
        if let Some((pkg, _)) = self.packages.get(module_path) {
            log::trace!("package {} found in registry", module_path);
            return Ok(pkg.clone());
        }
        let (source, path) = self.read_module(module_path)?;
        log::trace!("package {} scanned from {}", module_path, path.display());
        Ok(scan_functions(&source))
    }
}

// ── Python source scanner ───────────────────────────────────────────────────

/// A top-level `def` found in a module.
struct PyDef<'s> {
    name: &'s str,
    /// Text between the parentheses of the signature.
    params: &'s str,
    /// Body lines (indented lines following the signature).
    body: Vec<(usize, &'s str)>,
}

/// Scan a leaf component module for its entry points.
pub fn scan_component(source: &str, file: &Path) -> Result<ComponentSignature, RegistryError> {
    let stripped = strip_comments(source);
    let defs = scan_defs(&stripped);
    let find = |name: &str| defs.iter().find(|d| d.name == name);

    let shape_of = |name: &str| -> Result<Option<SignalShape>, RegistryError> {
        match find(name) {
            None => Ok(None),
            Some(def) => {
                let (line, literal) = return_literal(def).ok_or_else(|| RegistryError::ParseError {
                    file: file.to_path_buf(),
                    line: def.body.first().map(|(l, _)| *l).unwrap_or(0),
                    message: format!("{} does not return a literal", name),
                })?;
                parse_shape(literal)
                    .map(Some)
                    .ok_or_else(|| RegistryError::ParseError {
                        file: file.to_path_buf(),
                        line,
                        message: format!("unsupported return value in {}: {}", name, literal),
                    })
            }
        }
    };

    let inputs = shape_of("get_inputs")?;
    let outputs = shape_of("get_outputs")?;
    let configuration = match shape_of("get_configuration")? {
        None => None,
        Some(SignalShape::Flat(keys)) => Some(keys),
        Some(SignalShape::Tuple(..)) => {
            return Err(RegistryError::ParseError {
                file: file.to_path_buf(),
                line: 0,
                message: "get_configuration must return a list".to_string(),
            })
        }
    };

    Ok(ComponentSignature {
        inputs,
        outputs,
        configuration,
        configure: find("configure").is_some(),
        initialise: find("initialise").is_some(),
    })
}

/// Scan a function package module: every top-level `def` with its
/// argument spec.
pub fn scan_functions(source: &str) -> FunctionPackage {
    let stripped = strip_comments(source);
    scan_defs(&stripped)
        .into_iter()
        .map(|def| (def.name.to_string(), parse_params(def.params)))
        .collect()
}

/// Find top-level `def name(...)` blocks.
fn scan_defs(source: &str) -> Vec<PyDef<'_>> {
    let bytes = source.as_bytes();
    let mut defs = Vec::new();
    let mut offset = 0;
    let lines: Vec<&str> = source.split('\n').collect();
    let mut line_starts = Vec::with_capacity(lines.len());
    for line in &lines {
        line_starts.push(offset);
        offset += line.len() + 1;
    }

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let Some(rest) = line.strip_prefix("def ") else {
            i += 1;
            continue;
        };
        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let name = &rest[..name_len];
        let paren = line_starts[i] + 4 + name_len;
        let Some(close) = extract_balanced(bytes, paren, b'(', b')') else {
            i += 1;
            continue;
        };
        let params = &source[paren + 1..close];

        // Skip to the line holding the closing paren, then collect the body.
        let mut j = i;
        while j + 1 < lines.len() && line_starts[j + 1] <= close {
            j += 1;
        }
        let mut body = Vec::new();
        // A one-line body after the colon (`def f(): return 1`).
        let tail = &source[close + 1..line_starts[j] + lines[j].len()];
        if let Some(inline) = tail.trim_start().strip_prefix(':') {
            if !inline.trim().is_empty() {
                body.push((j + 1, inline.trim()));
            }
        }
        j += 1;
        while j < lines.len() {
            let l = lines[j];
            if l.trim().is_empty() {
                j += 1;
                continue;
            }
            if !l.starts_with(' ') && !l.starts_with('\t') {
                break;
            }
            body.push((j + 1, l.trim()));
            j += 1;
        }

        defs.push(PyDef { name, params, body });
        i = j;
    }
    defs
}

/// First `return <literal>` in a body, with its 1-based line.
fn return_literal<'s>(def: &PyDef<'s>) -> Option<(usize, &'s str)> {
    def.body
        .iter()
        .find_map(|(line, text)| text.strip_prefix("return").map(|r| (*line, r.trim())))
}

/// Parse `['a', "b"]`, `[]`, `(['a'], ['b'])` or `('a', 'b')`.
fn parse_shape(literal: &str) -> Option<SignalShape> {
    let literal = literal.trim();
    let bytes = literal.as_bytes();
    match bytes.first()? {
        b'[' => {
            let close = extract_balanced(bytes, 0, b'[', b']')?;
            parse_string_list(&literal[1..close]).map(SignalShape::Flat)
        }
        b'(' => {
            let close = extract_balanced(bytes, 0, b'(', b')')?;
            let inner = &literal[1..close];
            let parts: Vec<&str> = split_top_level_commas(inner)
                .into_iter()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() == 2 && parts.iter().all(|p| p.starts_with('[')) {
                match (parse_shape(parts[0])?, parse_shape(parts[1])?) {
                    (SignalShape::Flat(top), SignalShape::Flat(bottom)) => {
                        Some(SignalShape::Tuple(top, bottom))
                    }
                    _ => None,
                }
            } else {
                parse_string_list(inner).map(SignalShape::Flat)
            }
        }
        _ => None,
    }
}

fn parse_string_list(inner: &str) -> Option<Vec<String>> {
    split_top_level_commas(inner)
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let quote = item.chars().next()?;
            if (quote == '\'' || quote == '"') && item.len() >= 2 && item.ends_with(quote) {
                Some(item[1..item.len() - 1].to_string())
            } else {
                None
            }
        })
        .collect()
}

fn parse_params(params: &str) -> FunctionSignature {
    let mut sig = FunctionSignature::default();
    for raw in split_top_level_commas(params) {
        let p = raw.trim();
        if p.is_empty() {
            continue;
        }
        if p.starts_with("**") {
            sig.keywords = true;
        } else if p.starts_with('*') {
            sig.varargs = true;
        } else if let Some((name, _default)) = p.split_once('=') {
            sig.params.push(name.trim().to_string());
            sig.defaults += 1;
        } else {
            sig.params.push(p.to_string());
        }
    }
    sig
}

/// Strip `#` comments, leaving string literals intact.
fn strip_comments(source: &str) -> String {
    let mut result = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                result.push(c);
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        result.push(next);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '#' {
                    // Line comment: skip to end of line, preserve newline
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                } else {
                    if c == '\'' || c == '"' {
                        quote = Some(c);
                    }
                    result.push(c);
                }
            }
        }
    }

    result
}

/// Extract balanced delimiter content. Returns index of closing delimiter.
fn extract_balanced(bytes: &[u8], start: usize, open: u8, close: u8) -> Option<usize> {
    if start >= bytes.len() || bytes[start] != open {
        return None;
    }

    let mut depth = 0;
    let mut i = start;

    while i < bytes.len() {
        if bytes[i] == open {
            depth += 1;
        } else if bytes[i] == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }

    None
}

/// Split a string by commas at the top level (respecting nested `()`, `[]`
/// and quoted strings).
fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let bytes = s.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOWERCASE: &str = "\
#
# leaf component
#
def get_name():
  return 'lowercase'

def get_inputs():
  return ['string']

def get_outputs():
  return ['string']

def get_configuration():
  return []

def configure(args):
  return dict()

def initialise(config):
  return lambda a, s: {'string' : a['string'].lower()}
";

    fn scan(src: &str) -> ComponentSignature {
        scan_component(src, Path::new("test.py")).expect("scan failed")
    }

    // ── Component scanning ──

    #[test]
    fn scan_simple_leaf() {
        let sig = scan(LOWERCASE);
        assert_eq!(sig.inputs, Some(SignalShape::Flat(vec!["string".into()])));
        assert_eq!(sig.outputs, Some(SignalShape::Flat(vec!["string".into()])));
        assert_eq!(sig.configuration, Some(vec![]));
        assert!(sig.configure);
        assert!(sig.initialise);
        assert!(sig.missing_entry_points().is_empty());
    }

    #[test]
    fn scan_tuple_shape_and_double_quotes() {
        let src = "def get_inputs():\n    return ([\"a\", 'b'], ['c'])\n\ndef get_outputs():\n    return ('x', 'y')\n";
        let sig = scan(src);
        assert_eq!(
            sig.inputs,
            Some(SignalShape::Tuple(
                vec!["a".into(), "b".into()],
                vec!["c".into()]
            ))
        );
        assert_eq!(
            sig.outputs,
            Some(SignalShape::Flat(vec!["x".into(), "y".into()]))
        );
    }

    #[test]
    fn missing_entry_points_listed_in_order() {
        let sig = scan("def get_inputs():\n  return ['a']\n");
        assert_eq!(
            sig.missing_entry_points(),
            vec!["get_outputs", "get_configuration", "configure", "initialise"]
        );
    }

    #[test]
    fn non_literal_return_is_error() {
        let err = scan_component("def get_inputs():\n  return compute()\n", Path::new("m.py"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::ParseError { line: 2, .. }));
    }

    #[test]
    fn nested_defs_are_not_top_level() {
        let src = "def initialise(config):\n  def get_inputs():\n    return ['x']\n  return get_inputs\n";
        let sig = scan(src);
        assert!(sig.inputs.is_none());
        assert!(sig.initialise);
    }

    #[test]
    fn comments_ignored() {
        let src = "# def get_inputs():\ndef get_outputs(): # trailing\n  return ['o'] # ['p']\n";
        let sig = scan(src);
        assert!(sig.inputs.is_none());
        assert_eq!(sig.outputs, Some(SignalShape::Flat(vec!["o".into()])));
    }

    // ── Function packages ──

    #[test]
    fn scan_function_specs() {
        let src = "\
def lower(s):
  return s.lower()

def join(sep, *parts):
  return sep.join(parts)

def pad(s, width=10,
        fill=' '):
  return s

def opts(a, **kw):
  return a
";
        let pkg = scan_functions(src);
        assert_eq!(pkg.len(), 4);
        assert_eq!(pkg["lower"].params, vec!["s"]);
        assert!(!pkg["lower"].is_variadic());
        assert!(pkg["join"].varargs);
        assert_eq!(pkg["join"].min_args(), 1);
        assert_eq!(pkg["pad"].defaults, 2);
        assert_eq!(pkg["pad"].min_args(), 1);
        assert!(pkg["opts"].keywords);
    }

    // ── Manifests ──

    #[test]
    fn manifest_round_trip_is_canonical() {
        let json = r#"{
            "components": {
                "lowercase": { "inputs": ["string"], "outputs": ["string"], "configuration": [] },
                "pair": { "inputs": [["a"], ["b"]], "outputs": ["c"], "configuration": ["k"] }
            },
            "packages": {
                "str": { "lower": { "params": ["s"] } }
            }
        }"#;
        let mut reg = Registry::new();
        assert_eq!(reg.load_manifest_str(json, Path::new("m.json")).unwrap(), 3);
        let pair = reg.component("pair").unwrap();
        assert_eq!(
            pair.inputs,
            Some(SignalShape::Tuple(vec!["a".into()], vec!["b".into()]))
        );
        assert!(pair.configure && pair.initialise);

        let canonical = reg.canonical_json();
        let mut reg2 = Registry::new();
        reg2.load_manifest_str(&canonical, Path::new("again.json"))
            .unwrap();
        assert_eq!(reg2.canonical_json(), canonical);
    }

    #[test]
    fn duplicate_manifest_entry_rejected() {
        let json = r#"{ "components": { "m": { "inputs": [], "outputs": [], "configuration": [] } } }"#;
        let mut reg = Registry::new();
        reg.load_manifest_str(json, Path::new("a.json")).unwrap();
        let err = reg.load_manifest_str(json, Path::new("b.json")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateEntry { .. }));
    }

    #[test]
    fn malformed_manifest_rejected() {
        let mut reg = Registry::new();
        let err = reg
            .load_manifest_str("{ not json", Path::new("bad.json"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::ManifestError { .. }));
    }

    #[test]
    fn unknown_module_not_found() {
        let reg = Registry::new();
        let err = reg.component("nowhere.mod").unwrap_err();
        assert_eq!(err.to_string(), "No module named nowhere.mod");
    }

    #[test]
    fn locate_on_search_path() {
        let dir = std::env::temp_dir().join(format!("pclc_registry_{}", std::process::id()));
        let pkg_dir = dir.join("text");
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(pkg_dir.join("lowercase.py"), LOWERCASE).unwrap();
        std::fs::write(pkg_dir.join("__init__.py"), "def helper(x):\n  return x\n").unwrap();

        let reg = Registry::with_search_paths(vec![dir.clone()]);
        assert_eq!(
            reg.locate("text.lowercase"),
            Some(pkg_dir.join("lowercase.py"))
        );
        assert_eq!(reg.locate("text"), Some(pkg_dir.join("__init__.py")));
        let sig = reg.component("text.lowercase").unwrap();
        assert_eq!(sig.inputs, Some(SignalShape::Flat(vec!["string".into()])));
        let pkg = reg.functions("text").unwrap();
        assert!(pkg.contains_key("helper"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
