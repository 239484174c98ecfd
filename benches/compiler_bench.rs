use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pclc::registry::{ComponentSignature, Registry, SignalShape};

// Scenarios use in-memory signatures only, so no leaf module is read from disk.

const ECHO: &str = "component echo inputs a outputs b do return b <- a";

const PIPE: &str = r#"
import text.lowercase as lc
import text.reverse as rev
component pipe
  inputs string
  outputs gnirts
  configuration upper
declare
  l := new lc
  r := new rev with upper -> upper_case
as l >>> r
"#;

const FANOUT: &str = r#"
import text.lowercase as lc
import text.reverse as rev
component fanout
  inputs string
  outputs left, right
  configuration upper
declare
  l := new lc
  r := new rev with upper -> upper_case
  q := new rev with upper -> upper_case
as split >>> (l *** (r >>> wire gnirts -> string)) >>> second q
   >>> merge top[string] -> left, bottom[gnirts] -> right
"#;

const DO_BLOCK: &str = r#"
import strings as st
component words
  inputs text
  outputs n
  configuration lowered
do
  w <- if @lowered then return text else return text endif
  t <- let u <- st.lower(w) in st.tokens(u)
  c <- st.count(t)
  return n <- c
"#;

fn registry() -> Registry {
    let flat = |names: &[&str]| SignalShape::Flat(names.iter().map(|n| n.to_string()).collect());
    let mut registry = Registry::new();
    registry.insert_component(
        "text.lowercase",
        ComponentSignature {
            inputs: Some(flat(&["string"])),
            outputs: Some(flat(&["string"])),
            configuration: Some(Vec::new()),
            configure: true,
            initialise: true,
        },
    );
    registry.insert_component(
        "text.reverse",
        ComponentSignature {
            inputs: Some(flat(&["string"])),
            outputs: Some(flat(&["gnirts"])),
            configuration: Some(vec!["upper_case".to_string()]),
            configure: true,
            initialise: true,
        },
    );
    let manifest = r#"{"packages": {"strings": {
        "lower": {"params": ["s"]},
        "tokens": {"params": ["s", "sep"], "defaults": 1},
        "count": {"params": ["words"]}
    }}}"#;
    let _ = registry.load_manifest_str(manifest, std::path::Path::new("<bench>"));
    registry
}

const SCENARIOS: [(&str, &str); 4] = [
    ("echo", ECHO),
    ("pipe", PIPE),
    ("fanout", FANOUT),
    ("words", DO_BLOCK),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, source) in SCENARIOS {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| pclc::parser::parse(black_box(src)))
        });
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("resolve");
    for (name, source) in SCENARIOS {
        let Some(module) = pclc::parser::parse(source).module else {
            continue;
        };
        let file = format!("{}.pcl", name);
        group.bench_with_input(BenchmarkId::from_parameter(name), &module, |b, m| {
            b.iter(|| pclc::resolve::resolve(black_box(m), &file, &registry))
        });
    }
    group.finish();
}

fn bench_full_compile(c: &mut Criterion) {
    let options = pclc::codegen::CodegenOptions {
        generated_at: "bench".to_string(),
        ..Default::default()
    };
    let mut group = c.benchmark_group("compile");
    for (name, source) in SCENARIOS {
        let file = format!("{}.pcl", name);
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| pclc::pipeline::compile(black_box(src), &file, registry(), &options))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_resolve, bench_full_compile);
criterion_main!(benches);
