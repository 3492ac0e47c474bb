//! End-to-end Reconstruction Tests
//!
//! Loads JSON definition bundles from `tests/fixtures` and checks the
//! documents produced by a full generation run.

use std::path::{Path, PathBuf};

use proto_reconstruct::codegen::{generate, Generator};
use proto_reconstruct::config::OutputConfig;
use proto_reconstruct::{load_bundle, DiagnosticCode, EnumNumbering, ReconError};

const ECHO_TARGET: &str = "proto/pkg/v1/echo_connectweb";
const CATALOG_TARGET: &str = "proto/cat/v1/catalog_connectweb";

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn generator(bundle: &str) -> Generator {
    Generator::new(load_bundle(&fixture(bundle)).unwrap())
}

fn lines(lines: &[&str]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// =============================================================================
// Echo
// =============================================================================

#[test]
fn test_echo_document() {
    let mut gen = generator("echo_bundle.json");
    let doc = generate(&mut gen, &[ECHO_TARGET.to_string()], &OutputConfig::default()).unwrap();

    assert_eq!(
        doc.contents,
        lines(&[
            "syntax = \"proto3\";",
            "package pkg.v1;",
            "option go_package = \"cursor/gen/pkg/v1;pkgv1\";",
            "message EchoRequest { // pkg.v1.EchoRequest",
            "\trepeated string messages = 1;",
            "}",
            "message EchoResponse { // pkg.v1.EchoResponse",
            "\tint32 count = 2;",
            "}",
            "service Echo {",
            "\trpc Say(EchoRequest) returns (stream EchoResponse) {}",
            "}",
        ])
    );
    assert!(gen.diagnostics().is_empty());
}

#[test]
fn test_echo_service_line() {
    let mut gen = generator("echo_bundle.json");
    let doc = generate(&mut gen, &[ECHO_TARGET.to_string()], &OutputConfig::default()).unwrap();

    let flat = doc.contents.split_whitespace().collect::<Vec<_>>().join(" ");
    assert!(flat.contains("service Echo { rpc Say(EchoRequest) returns (stream EchoResponse) {} }"));
}

#[test]
fn test_write_document_under_package_path() {
    let mut gen = generator("echo_bundle.json");
    let doc = generate(&mut gen, &[ECHO_TARGET.to_string()], &OutputConfig::default()).unwrap();

    let out = tempfile::tempdir().unwrap();
    let path = doc.write_to(out.path()).unwrap();

    assert_eq!(path, out.path().join("pkg").join("v1").join("pkg.proto"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), doc.contents);
}

#[test]
fn test_output_overrides() {
    let mut gen = generator("echo_bundle.json");
    let output = OutputConfig {
        package: Some("echo.v2".into()),
        file_name: Some("echo_service.proto".into()),
        go_prefix: "example.com/gen/".into(),
        ..OutputConfig::default()
    };
    let doc = generate(&mut gen, &[ECHO_TARGET.to_string()], &output).unwrap();

    assert!(doc.contents.contains("package echo.v2;\n"));
    assert!(doc.contents.contains("option go_package = \"example.com/gen/echo/v2;echov2\";\n"));
    assert_eq!(doc.relative_path(), PathBuf::from("echo/v2/echo_service.proto"));
}

#[test]
fn test_missing_target_service_is_fatal() {
    let mut gen = generator("echo_bundle.json");
    let err = generate(
        &mut gen,
        &[ECHO_TARGET.to_string(), "proto/pkg/v1/echo_pb".to_string()],
        &OutputConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ReconError::MissingService { ref module } if module == "proto/pkg/v1/echo_pb"
    ));
}

// =============================================================================
// Catalog: nesting, cycles, lossy fields
// =============================================================================

#[test]
fn test_catalog_document() {
    let mut gen = generator("catalog_bundle.json");
    let doc = generate(&mut gen, &[CATALOG_TARGET.to_string()], &OutputConfig::default()).unwrap();

    assert_eq!(doc.file_name, "cat.proto");
    assert_eq!(
        doc.contents,
        lines(&[
            "syntax = \"proto3\";",
            "package cat.v1;",
            "option go_package = \"cursor/gen/cat/v1;catv1\";",
            "enum Status { // cat.v1.Status",
            "\tSTATUS_ACTIVE = 0;",
            "\tSTATUS_ARCHIVED = 1;",
            "}",
            "message ListRequest { // cat.v1.ListRequest",
            "\tint32 page_size = 1;",
            "\toptional Status status = 2;",
            "}",
            "message ListResponse { // cat.v1.ListResponse",
            "\trepeated Item items = 1;",
            "}",
            "message Item { // cat.v1.Item",
            "\tenum Kind { // cat.v1.Item.Kind",
            "\t\tKIND_UNSPECIFIED = 0;",
            "\t\tKIND_BOOK = 1;",
            "\t}",
            "\tmessage Part { // cat.v1.Item.Part",
            "\t\tstring label = 1;",
            "\t}",
            "\tstring id = 1;",
            "\tKind kind = 2;",
            "\tPart main = 3;",
            "\trepeated Part spares = 4;",
            "\tOwner owner = 5;",
            "\t weird = 7;",
            "}",
            "message Owner { // cat.v1.Owner",
            "\tstring name = 1;",
            "\toptional Item favorite = 2;",
            "}",
            "service CatalogService {",
            "\trpc List(ListRequest) returns (ListResponse) {}",
            "\trpc Watch(ListRequest) returns (stream Item) {}",
            "\trpc Upload(Item) returns (ListResponse) {}",
            "}",
        ])
    );
}

#[test]
fn test_nested_types_never_top_level() {
    let mut gen = generator("catalog_bundle.json");
    let doc = generate(&mut gen, &[CATALOG_TARGET.to_string()], &OutputConfig::default()).unwrap();

    assert_eq!(doc.contents.matches("message Part {").count(), 1);
    assert_eq!(doc.contents.matches("enum Kind {").count(), 1);
    assert!(!doc.contents.contains("\nmessage Part"));
    assert!(!doc.contents.contains("\nenum Kind"));

    let registries = gen.registries();
    let part = registries.types.find("cat.v1.Item.Part").unwrap();
    assert!(!registries.types.get(part).global);
}

#[test]
fn test_lossy_fields_reported() {
    let mut gen = generator("catalog_bundle.json");
    generate(&mut gen, &[CATALOG_TARGET.to_string()], &OutputConfig::default()).unwrap();

    let diagnostics = gen.diagnostics();
    assert!(diagnostics.has_errors());
    assert_eq!(diagnostics.with_code(DiagnosticCode::UnknownScalar).count(), 1);
    assert_eq!(diagnostics.with_code(DiagnosticCode::UnknownFieldKind).count(), 1);
    assert_eq!(diagnostics.with_code(DiagnosticCode::StreamingDowngraded).count(), 1);

    let undefined: Vec<_> = diagnostics
        .with_code(DiagnosticCode::UndefinedModule)
        .map(|d| d.subject.as_str())
        .collect();
    assert_eq!(undefined, vec!["google/protobuf/empty_pb"]);
}

#[test]
fn test_mutually_dependent_modules_resolve() {
    let mut gen = generator("catalog_bundle.json");
    gen.resolve(CATALOG_TARGET).unwrap();

    let modules = gen.modules();
    let catalog = modules.get("proto/cat/v1/catalog_pb").unwrap();
    let shared = modules.get("proto/cat/v1/shared_pb").unwrap();
    assert!(modules.exports(catalog).contains_key("Item"));
    assert!(modules.exports(shared).contains_key("Owner"));

    assert_eq!(
        modules.cycles(),
        vec![vec![
            "proto/cat/v1/catalog_pb".to_string(),
            "proto/cat/v1/shared_pb".to_string(),
        ]]
    );
    assert!(modules.to_dot().contains("digraph"));
}

#[test]
fn test_declared_enum_numbering() {
    let mut gen = generator("catalog_bundle.json").with_numbering(EnumNumbering::Declared);
    let doc = generate(&mut gen, &[CATALOG_TARGET.to_string()], &OutputConfig::default()).unwrap();

    assert!(doc.contents.contains("\t\tKIND_BOOK = 5;\n"));
    // values without a declared number keep their position
    assert!(doc.contents.contains("\tSTATUS_ARCHIVED = 1;\n"));
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_identical_input_identical_output() {
    let targets = vec![CATALOG_TARGET.to_string(), ECHO_TARGET.to_string()];
    let run = || {
        let mut definitions = load_bundle(&fixture("catalog_bundle.json")).unwrap();
        definitions.extend(load_bundle(&fixture("echo_bundle.json")).unwrap().into_records());
        let mut gen = Generator::new(definitions);
        generate(&mut gen, &targets, &OutputConfig::default()).unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first.contents, second.contents);
    assert_eq!(first.checksum(), second.checksum());
    // the first emitted service names the package
    assert_eq!(first.package, "cat.v1");
}

#[test]
fn test_reset_reproduces_document() {
    let targets = vec![CATALOG_TARGET.to_string()];
    let mut gen = generator("catalog_bundle.json");
    let first = generate(&mut gen, &targets, &OutputConfig::default()).unwrap();

    gen.reset();
    let second = generate(&mut gen, &targets, &OutputConfig::default()).unwrap();

    assert_eq!(first.contents, second.contents);
    assert_eq!(gen.diagnostics().with_code(DiagnosticCode::UnknownScalar).count(), 1);
}
