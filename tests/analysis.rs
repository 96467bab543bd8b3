// tests/analysis.rs
//
// Whole-project analysis through the public API: import graphs, the
// standard library layer and the impl post-pass.

use sable::errors::{SemanticError, render_to_string};
use sable::frontend::ast::{Expr, Item};
use sable::frontend::{AstBuilder, Interner, Publish};
use sable::project::{Bootstrap, BuildVariant, CompileOutput, MemoryProvider, PassOutput, Project, ProjectConfig};

fn compile(config: ProjectConfig, provider: &MemoryProvider) -> (Interner, CompileOutput) {
    sable::logging::init_from_env();
    let mut interner = Interner::new();
    let bootstrap = Bootstrap::for_project(&config, provider, &mut interner).expect("bootstrap");
    assert!(!bootstrap.has_errors(), "stdlib errors: {:?}", bootstrap.diagnostics);
    let mut project = Project::new(config, provider);
    let output = project.compile(&mut interner, &bootstrap);
    (interner, output)
}

fn server(output: &CompileOutput) -> &PassOutput {
    output.pass(BuildVariant::Server).expect("server pass")
}

fn errors<'a>(pass: &'a PassOutput, path: &str) -> Vec<&'a SemanticError> {
    pass.module(path)
        .unwrap_or_else(|| panic!("module {path} not in pass"))
        .diagnostics()
        .errors
        .iter()
        .map(|e| &e.error)
        .collect()
}

fn main_fn(b: &mut AstBuilder, stmts: Vec<sable::frontend::ast::Stmt>) -> Item {
    let body = b.block(stmts);
    Item::Function(b.func("main", vec![], None, body))
}

/// `pub fn helper() -> number`, private `fn secret()`, and
/// `pub struct Point { x: number, private y: number? }`.
fn util(b: &mut AstBuilder) -> Vec<Item> {
    let ret = b.ty("number");
    let one = b.num(1.0);
    let tail = b.tail(one);
    let body = b.block(vec![tail]);
    let helper = b.func("helper", vec![], Some(ret), body).public();

    let body = b.block(vec![]);
    let secret = b.func("secret", vec![], None, body);

    let number = b.ty("number");
    let x = b.field_decl("x", number);
    let number = b.ty("number");
    let nilable = b.nilable_ty(number);
    let y = b.field_decl("y", nilable).private();
    let point = b.struct_decl("Point", vec![], vec![x, y]).public();

    vec![Item::Function(helper), Item::Function(secret), Item::Struct(point)]
}

#[test]
fn public_members_cross_module_boundaries() {
    let provider = MemoryProvider::new()
        .with_module("src/util.sbl", util)
        .with_module("src/main.sbl", |b| {
            let import = b.import("src/util", "u");
            let u = b.var("u");
            let helper = b.field(u, "helper");
            let call = b.call(helper, vec![]);
            let number = b.ty("number");
            let n = b.let_typed(vec![("n", Some(number))], vec![call]);
            let one = b.num(1.0);
            let lit = b.struct_lit("u.Point", vec![("x", one)]);
            let point_ty = b.ty("u.Point");
            let p = b.let_typed(vec![("p", Some(point_ty))], vec![lit]);
            let p_var = b.var("p");
            let x = b.field(p_var, "x");
            let read = b.let_stmt(&["x"], vec![x]);
            vec![Item::Import(import), main_fn(b, vec![n, p, read])]
        });
    let (_, output) = compile(ProjectConfig::default(), &provider);
    let pass = server(&output);
    assert_eq!(
        pass.modules.iter().map(|m| m.path.as_str()).collect::<Vec<_>>(),
        ["src/util.sbl", "src/main.sbl"]
    );
    assert!(!output.has_errors(), "{:?}", errors(pass, "src/main.sbl"));
}

#[test]
fn private_items_and_fields_are_rejected_across_modules() {
    let provider = MemoryProvider::new()
        .with_module("src/util.sbl", util)
        .with_module("src/main.sbl", |b| {
            let import = b.import("src/util", "u");
            let u = b.var("u");
            let secret = b.field(u, "secret");
            let call = b.call(secret, vec![]);
            let call = b.expr_stmt(call);
            let one = b.num(1.0);
            let lit = b.struct_lit("u.Point", vec![("x", one)]);
            let p = b.let_stmt(&["p"], vec![lit]);
            let p_var = b.var("p");
            let y = b.field(p_var, "y");
            let read = b.let_stmt(&["y"], vec![y]);
            vec![Item::Import(import), main_fn(b, vec![call, p, read])]
        });
    let (_, output) = compile(ProjectConfig::default(), &provider);
    let errs = errors(server(&output), "src/main.sbl");
    assert_eq!(errs.len(), 2, "{errs:?}");
    assert!(matches!(errs[0], SemanticError::PrivateItem { name, .. } if name == "secret"));
    assert!(matches!(errs[1], SemanticError::PrivateField { field, .. } if field == "y"));
    assert!(errors(server(&output), "src/util.sbl").is_empty());
}

#[test]
fn references_resolve_to_the_declaring_module() {
    let provider = MemoryProvider::new()
        .with_module("src/util.sbl", util)
        .with_module("src/main.sbl", |b| {
            let import = b.import("src/util", "u");
            let u = b.var("u");
            let helper = b.field(u, "helper");
            let call = b.call(helper, vec![]);
            let stmt = b.let_stmt(&["n"], vec![call]);
            vec![Item::Import(import), main_fn(b, vec![stmt])]
        });
    let (interner, output) = compile(ProjectConfig::default(), &provider);
    let pass = server(&output);
    let util_module = pass.module("src/util.sbl").unwrap().module;
    let main = pass.module("src/main.sbl").unwrap().analysis().expect("main analyzed");

    let helper_ref = main
        .symbols
        .iter()
        .find(|r| !r.is_declaration && r.binding.module == util_module)
        .expect("reference into util");
    let query = main.query(&interner);
    let (module, decl) = query.definition_of(helper_ref.span.start).expect("definition");
    assert_eq!(module, util_module);
    assert!(query.references_to(module, decl).contains(&helper_ref.span));
}

#[test]
fn circular_import_is_reported_without_aborting() {
    let provider = MemoryProvider::new()
        .with_module("src/main.sbl", |b| {
            let import = b.import("src/other", "other");
            vec![Item::Import(import), main_fn(b, vec![])]
        })
        .with_module("src/other.sbl", |b| {
            let import = b.import("src/main", "main");
            vec![Item::Import(import)]
        });
    let (_, output) = compile(ProjectConfig::default(), &provider);
    let pass = server(&output);
    let other = pass.module("src/other.sbl").unwrap();
    assert!(!other.is_aborted());
    let errs = errors(pass, "src/other.sbl");
    assert_eq!(errs.len(), 1);
    assert!(matches!(errs[0], SemanticError::CircularImport { .. }));
    assert!(errors(pass, "src/main.sbl").is_empty());
}

#[test]
fn missing_import_aborts_the_importer() {
    let provider = MemoryProvider::new().with_module("src/main.sbl", |b| {
        let import = b.import("src/nowhere", "n");
        let x = b.var("undefined_after_import");
        let stmt = b.let_stmt(&["x"], vec![x]);
        vec![Item::Import(import), main_fn(b, vec![stmt])]
    });
    let (_, output) = compile(ProjectConfig::default(), &provider);
    let pass = server(&output);
    let main = pass.module("src/main.sbl").unwrap();
    assert!(main.is_aborted());
    let errs = errors(pass, "src/main.sbl");
    assert_eq!(errs.len(), 1, "analysis stops at the import: {errs:?}");
    assert!(matches!(errs[0], SemanticError::ImportFailed { path, .. } if path == "src/nowhere"));
}

#[test]
fn broken_dependency_does_not_cascade() {
    let provider = MemoryProvider::new()
        .with_broken_module("src/bad.sbl", "unexpected token")
        .with_module("src/main.sbl", |b| {
            let import = b.import("src/bad", "bad");
            let bad = b.var("bad");
            let anything = b.field(bad, "anything");
            let call = b.call(anything, vec![]);
            let stmt = b.let_stmt(&["x"], vec![call]);
            vec![Item::Import(import), main_fn(b, vec![stmt])]
        });
    let (_, output) = compile(ProjectConfig::default(), &provider);
    let pass = server(&output);
    let bad = pass.module("src/bad.sbl").unwrap();
    assert!(bad.is_aborted());
    assert!(matches!(errors(pass, "src/bad.sbl")[0], SemanticError::Internal { .. }));

    let main = pass.module("src/main.sbl").unwrap();
    assert!(!main.is_aborted());
    assert!(errors(pass, "src/main.sbl").is_empty());
}

#[test]
fn diamond_dependency_is_analyzed_once_per_pass() {
    let provider = MemoryProvider::new()
        .with_module("src/base.sbl", util)
        .with_module("src/left.sbl", |b| vec![Item::Import(b.import("src/base", "base"))])
        .with_module("src/right.sbl", |b| vec![Item::Import(b.import("src/base", "base"))])
        .with_module("src/main.sbl", |b| {
            let left = b.import("src/left", "left");
            let right = b.import("src/right", "right");
            vec![Item::Import(left), Item::Import(right)]
        });
    let (_, output) = compile(ProjectConfig::default(), &provider);
    for pass in &output.passes {
        let paths: Vec<_> = pass.modules.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, ["src/base.sbl", "src/left.sbl", "src/right.sbl", "src/main.sbl"]);
    }
    // Ids are assigned once and reused by the second pass.
    let server_ids: Vec<_> = server(&output).modules.iter().map(|m| m.module).collect();
    let client_ids: Vec<_> = output
        .pass(BuildVariant::Client)
        .unwrap()
        .modules
        .iter()
        .map(|m| m.module)
        .collect();
    assert_eq!(server_ids, client_ids);
}

#[test]
fn stdlib_bindings_are_visible_without_import() {
    let provider = MemoryProvider::new()
        .with_module("std/prelude.sbl", |b| {
            let number = b.ty("number");
            let param = b.param("x", number);
            let ret = b.ty("number");
            let x = b.var("x");
            let tail = b.tail(x);
            let body = b.block(vec![tail]);
            vec![Item::Function(b.func("clamp", vec![param], Some(ret), body).public())]
        })
        .with_module("src/main.sbl", |b| {
            let one = b.num(1.0);
            let call = b.call_named("clamp", vec![one]);
            let number = b.ty("number");
            let stmt = b.let_typed(vec![("n", Some(number))], vec![call]);
            vec![main_fn(b, vec![stmt])]
        });
    let config = ProjectConfig {
        stdlib_entry: Some("std/prelude.sbl".to_string()),
        ..ProjectConfig::default()
    };
    let (_, output) = compile(config, &provider);
    assert!(!output.has_errors(), "{:?}", errors(server(&output), "src/main.sbl"));
}

#[test]
fn std_projects_skip_the_stdlib_layer() {
    let provider = MemoryProvider::new().with_module("src/main.sbl", |b| {
        let one = b.num(1.0);
        let call = b.call_named("clamp", vec![one]);
        let stmt = b.let_stmt(&["n"], vec![call]);
        vec![main_fn(b, vec![stmt])]
    });
    let config = ProjectConfig {
        std: true,
        stdlib_entry: Some("std/prelude.sbl".to_string()),
        ..ProjectConfig::default()
    };
    let (_, output) = compile(config, &provider);
    let errs = errors(server(&output), "src/main.sbl");
    assert!(matches!(errs[0], SemanticError::UndefinedVariable { name, .. } if name == "clamp"));
}

#[test]
fn conflicting_impls_across_files_are_reported_on_the_later_file() {
    let provider = MemoryProvider::new()
        .with_module("src/shapes.sbl", |b| {
            let string = b.ty("string");
            let method = b.trait_method("show", vec![], Some(string), None);
            let show = b.trait_decl("Show", vec![], vec![], vec![method]).public();
            let dot = b.struct_decl("Dot", vec![], vec![]).public();
            let string = b.ty("string");
            let text = b.string("dot");
            let tail = b.tail(text);
            let body = b.block(vec![tail]);
            let imp = b.method("show", vec![], Some(string), body);
            let trait_ref = b.ty("Show");
            let target = b.ty("Dot");
            let block = b.impl_block(Some(trait_ref), target, vec![imp]);
            vec![Item::Trait(show), Item::Struct(dot), Item::Impl(block)]
        })
        .with_module("src/main.sbl", |b| {
            let import = b.import("src/shapes", "shapes");
            let string = b.ty("string");
            let text = b.string("again");
            let tail = b.tail(text);
            let body = b.block(vec![tail]);
            let imp = b.method("show", vec![], Some(string), body);
            let trait_ref = b.ty("shapes.Show");
            let target = b.ty("shapes.Dot");
            let block = b.impl_block(Some(trait_ref), target, vec![imp]);
            vec![Item::Import(import), Item::Impl(block)]
        });
    let (_, output) = compile(ProjectConfig::default(), &provider);
    let pass = server(&output);
    assert!(errors(pass, "src/shapes.sbl").is_empty());
    assert!(
        errors(pass, "src/main.sbl")
            .iter()
            .any(|e| matches!(e, SemanticError::ConflictingImpl { ty, .. } if ty == "Dot"))
    );
}

/// `struct Dog { v: <ty> }`, an array of one dog, and a loop reading `v`
/// back as `<ty>`.
fn dogs(b: &mut AstBuilder, field_ty: &str, value: fn(&mut AstBuilder) -> Expr) -> Vec<Item> {
    let ty = b.ty(field_ty);
    let v = b.field_decl("v", ty);
    let dog = b.struct_decl("Dog", vec![], vec![v]);
    let value = value(b);
    let lit = b.struct_lit("Dog", vec![("v", value)]);
    let array = b.array(vec![lit]);
    let xs = b.let_stmt(&["xs"], vec![array]);
    let d = b.var("d");
    let read = b.field(d, "v");
    let ty = b.ty(field_ty);
    let check = b.let_typed(vec![("w", Some(ty))], vec![read]);
    let body = b.block(vec![check]);
    let list = b.var("xs");
    let each = b.for_in(None, "d", list, body);
    vec![Item::Struct(dog), main_fn(b, vec![xs, each])]
}

#[test]
fn variants_keep_their_own_instances_of_same_keyed_structs() {
    // Both variants declare `Dog` at the same position, so the two
    // definitions share a key; `Array<Dog>` must still differ per pass.
    let provider = MemoryProvider::new()
        .with_variant_module("src/main.sbl", BuildVariant::Server, |b| {
            dogs(b, "string", |b| b.string("hi"))
        })
        .with_variant_module("src/main.sbl", BuildVariant::Client, |b| {
            dogs(b, "number", |b| b.num(1.0))
        });
    let (_, output) = compile(ProjectConfig::default(), &provider);
    for variant in [BuildVariant::Server, BuildVariant::Client] {
        let pass = output.pass(variant).expect("pass");
        let errs = errors(pass, "src/main.sbl");
        assert!(errs.is_empty(), "{variant:?}: {errs:?}");
    }
}

#[test]
fn diagnostics_render_with_codes() {
    let provider = MemoryProvider::new().with_module("src/main.sbl", |b| {
        let x = b.var("missing");
        let stmt = b.let_stmt(&["x"], vec![x]);
        vec![main_fn(b, vec![stmt])]
    });
    let (_, output) = compile(ProjectConfig::default(), &provider);
    let (path, diagnostics) = server(&output).diagnostics().next().expect("a diagnostic");
    assert_eq!(path, "src/main.sbl");
    let source = " ".repeat(256);
    let reports = diagnostics.to_reports(path, &source);
    let rendered = render_to_string(&*reports[0]);
    assert!(rendered.contains("missing"), "{rendered}");
}
