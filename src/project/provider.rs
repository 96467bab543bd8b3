// src/project/provider.rs
//
// Where module sources come from. Lexing, parsing and preprocessing happen
// outside this crate; a provider hands the driver finished ASTs.

use std::path::PathBuf;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::errors::LoadError;
use crate::frontend::ast::Item;
use crate::frontend::{AstBuilder, Interner, Program};
use crate::project::config::BuildVariant;

pub const SOURCE_EXTENSION: &str = ".sbl";

/// Locates and parses modules for the driver.
pub trait SourceProvider {
    /// Canonical module path for `import` as written in the module at
    /// `from`.
    fn resolve(&self, from: &str, import: &str) -> Result<String, LoadError> {
        resolve_import(from, import)
    }

    /// Parse the module at a canonical path. `variant` is `None` for the
    /// standard library, which is shared by both builds.
    fn load(&self, path: &str, variant: Option<BuildVariant>, interner: &mut Interner) -> Result<Program, LoadError>;
}

/// Resolve an import path. `./` and `../` are relative to the importing
/// module; anything else is relative to the project root. The source
/// extension is added when missing.
pub fn resolve_import(from: &str, import: &str) -> Result<String, LoadError> {
    let mut segments: Vec<&str> = Vec::new();
    if import.starts_with("./") || import.starts_with("../") {
        segments.extend(from.split('/'));
        segments.pop();
    }
    for segment in import.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(LoadError::InvalidPath(import.to_string()));
                }
            }
            segment => segments.push(segment),
        }
    }
    if segments.is_empty() {
        return Err(LoadError::InvalidPath(import.to_string()));
    }
    let mut path = segments.join("/");
    if !path.ends_with(SOURCE_EXTENSION) {
        path.push_str(SOURCE_EXTENSION);
    }
    Ok(path)
}

type BuildFn = Rc<dyn Fn(&mut AstBuilder) -> Vec<Item>>;

#[derive(Clone)]
enum MemorySource {
    Build(BuildFn),
    /// Simulates a parse failure
    Broken(String),
}

/// In-memory modules, each built with [`AstBuilder`] against the
/// interner the driver passes in. Used by embedders with their own parser
/// and by tests.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    /// Keyed by path, with `None` for the source shared by both builds
    modules: FxHashMap<(String, Option<BuildVariant>), MemorySource>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Module seen identically by both builds.
    pub fn with_module(mut self, path: &str, build: impl Fn(&mut AstBuilder) -> Vec<Item> + 'static) -> Self {
        self.modules
            .insert((path.to_string(), None), MemorySource::Build(Rc::new(build)));
        self
    }

    /// Module text after preprocessing for one build; overrides the shared
    /// source for that build.
    pub fn with_variant_module(
        mut self,
        path: &str,
        variant: BuildVariant,
        build: impl Fn(&mut AstBuilder) -> Vec<Item> + 'static,
    ) -> Self {
        self.modules
            .insert((path.to_string(), Some(variant)), MemorySource::Build(Rc::new(build)));
        self
    }

    /// Module whose parse fails with `message`.
    pub fn with_broken_module(mut self, path: &str, message: &str) -> Self {
        self.modules
            .insert((path.to_string(), None), MemorySource::Broken(message.to_string()));
        self
    }
}

impl SourceProvider for MemoryProvider {
    fn load(&self, path: &str, variant: Option<BuildVariant>, interner: &mut Interner) -> Result<Program, LoadError> {
        let source = variant
            .and_then(|v| self.modules.get(&(path.to_string(), Some(v))))
            .or_else(|| self.modules.get(&(path.to_string(), None)))
            .ok_or_else(|| LoadError::NotFound(path.to_string()))?;
        match source {
            MemorySource::Build(build) => {
                let mut builder = AstBuilder::new(interner);
                let items = build(&mut builder);
                Ok(builder.program(items))
            }
            MemorySource::Broken(message) => Err(LoadError::Parse {
                path: PathBuf::from(path),
                message: message.clone(),
            }),
        }
    }
}

/// Modules read from disk under `root` and handed to an external parser.
pub struct FsProvider<F> {
    root: PathBuf,
    parse: F,
}

impl<F> FsProvider<F>
where
    F: Fn(&str, Option<BuildVariant>, &mut Interner) -> Result<Program, String>,
{
    pub fn new(root: impl Into<PathBuf>, parse: F) -> Self {
        Self {
            root: root.into(),
            parse,
        }
    }
}

impl<F> SourceProvider for FsProvider<F>
where
    F: Fn(&str, Option<BuildVariant>, &mut Interner) -> Result<Program, String>,
{
    fn load(&self, path: &str, variant: Option<BuildVariant>, interner: &mut Interner) -> Result<Program, LoadError> {
        let file = self.root.join(path);
        let text = match std::fs::read_to_string(&file) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(path.to_string()));
            }
            Err(err) => {
                return Err(LoadError::Io {
                    path: file,
                    message: err.to_string(),
                });
            }
        };
        tracing::trace!(path, bytes = text.len(), "read module");
        (self.parse)(&text, variant, interner).map_err(|message| LoadError::Parse { path: file, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_relative_imports_gain_extension() {
        assert_eq!(resolve_import("src/main.sbl", "src/util").unwrap(), "src/util.sbl");
        assert_eq!(resolve_import("src/main.sbl", "lib/math.sbl").unwrap(), "lib/math.sbl");
    }

    #[test]
    fn relative_imports_follow_the_importer() {
        assert_eq!(resolve_import("src/game/main.sbl", "./util").unwrap(), "src/game/util.sbl");
        assert_eq!(resolve_import("src/game/main.sbl", "../shared/net").unwrap(), "src/shared/net.sbl");
    }

    #[test]
    fn escaping_the_root_is_invalid() {
        assert!(matches!(
            resolve_import("main.sbl", "../../x"),
            Err(LoadError::InvalidPath(_))
        ));
        assert!(matches!(resolve_import("main.sbl", ""), Err(LoadError::InvalidPath(_))));
    }

    #[test]
    fn memory_provider_prefers_variant_source() {
        let provider = MemoryProvider::new()
            .with_module("main.sbl", |_| Vec::new())
            .with_variant_module("main.sbl", BuildVariant::Client, |b| {
                let body = b.block(vec![]);
                vec![Item::Function(b.func("client_only", vec![], None, body))]
            });
        let mut interner = Interner::new();
        let server = provider
            .load("main.sbl", Some(BuildVariant::Server), &mut interner)
            .unwrap();
        let client = provider
            .load("main.sbl", Some(BuildVariant::Client), &mut interner)
            .unwrap();
        assert!(server.items.is_empty());
        assert_eq!(client.items.len(), 1);
    }

    #[test]
    fn memory_provider_reports_missing_and_broken_modules() {
        let provider = MemoryProvider::new().with_broken_module("bad.sbl", "unexpected token");
        let mut interner = Interner::new();
        assert!(matches!(
            provider.load("missing.sbl", None, &mut interner),
            Err(LoadError::NotFound(_))
        ));
        assert!(matches!(
            provider.load("bad.sbl", None, &mut interner),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn fs_provider_reads_through_the_parser() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.sbl"), "empty").unwrap();
        let provider = FsProvider::new(dir.path(), |text: &str, _variant: Option<BuildVariant>, interner: &mut Interner| {
            if text == "empty" {
                Ok(AstBuilder::new(interner).program(Vec::new()))
            } else {
                Err(format!("cannot parse {text:?}"))
            }
        });
        let mut interner = Interner::new();
        assert!(provider.load("main.sbl", None, &mut interner).is_ok());
        assert!(matches!(
            provider.load("other.sbl", None, &mut interner),
            Err(LoadError::NotFound(_))
        ));
        std::fs::write(dir.path().join("other.sbl"), "garbage").unwrap();
        assert!(matches!(
            provider.load("other.sbl", None, &mut interner),
            Err(LoadError::Parse { .. })
        ));
    }
}
