// src/sema/resolve.rs
//
// Name and path resolution across scopes and imported modules.

use std::rc::Rc;

use crate::frontend::ast::Ident;
use crate::frontend::{Span, Symbol};
use crate::sema::prelude::Builtins;
use crate::sema::scope::{Binding, BindingKind, ModuleInterface, ScopeId, ScopeTree};

/// Why a path failed to resolve.
#[derive(Debug, Clone)]
pub enum ResolveError {
    NotFound { name: Symbol, span: Span },
    /// Reached through a later segment but not declared public
    Private {
        name: Symbol,
        module: String,
        span: Span,
    },
    /// A non-module was followed by another segment
    NotAModule { name: Symbol, span: Span },
    /// Went through a module whose analysis was aborted; already reported
    Placeholder,
}

/// Everything needed to resolve a name in one file.
pub struct PathResolver<'a> {
    pub scopes: &'a ScopeTree,
    pub builtins: &'a Builtins,
    /// Standard library interface layered under every file
    pub prelude: Option<&'a ModuleInterface>,
}

impl<'a> PathResolver<'a> {
    /// Innermost binding, then the standard library, then builtins.
    pub fn lookup(&self, scope: ScopeId, name: Symbol) -> Option<Rc<Binding>> {
        self.scopes
            .lookup(scope, name)
            .or_else(|| {
                self.prelude
                    .and_then(|p| p.get(name))
                    .filter(|b| b.visibility.is_public())
                    .cloned()
            })
            .or_else(|| self.builtins.lookup(name))
    }

    /// Resolve a dotted path. The first segment resolves locally with any
    /// visibility; every later segment must be a public member of the module
    /// the previous segment named. Each hop is appended to `hops`.
    pub fn resolve_path(
        &self,
        scope: ScopeId,
        path: &[Ident],
        hops: &mut Vec<(Span, Rc<Binding>)>,
    ) -> Result<Rc<Binding>, ResolveError> {
        let Some((first, rest)) = path.split_first() else {
            return Err(ResolveError::Placeholder);
        };
        let mut current = self.lookup(scope, first.name).ok_or(ResolveError::NotFound {
            name: first.name,
            span: first.span,
        })?;
        hops.push((first.span, Rc::clone(&current)));

        let mut previous = first;
        for segment in rest {
            let BindingKind::Import(module) = &current.kind else {
                return Err(ResolveError::NotAModule {
                    name: previous.name,
                    span: previous.span,
                });
            };
            let next = member(module, *segment)?;
            hops.push((segment.span, Rc::clone(&next)));
            current = next;
            previous = segment;
        }
        Ok(current)
    }
}

/// Public member `segment` of an imported module.
pub fn member(module: &ModuleInterface, segment: Ident) -> Result<Rc<Binding>, ResolveError> {
    if module.placeholder {
        return Err(ResolveError::Placeholder);
    }
    let found = module.get(segment.name).ok_or(ResolveError::NotFound {
        name: segment.name,
        span: segment.span,
    })?;
    if !found.visibility.is_public() {
        return Err(ResolveError::Private {
            name: segment.name,
            module: module.path.clone(),
            span: segment.span,
        });
    }
    Ok(Rc::clone(found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Interner;
    use crate::frontend::ast::Visibility;
    use crate::identity::ModuleId;
    use crate::sema::scope::{ValueKind, FunctionContext};
    use crate::sema::types::Type;

    fn value(name: Symbol, visibility: Visibility, module: ModuleId) -> Binding {
        Binding {
            name,
            visibility,
            span: Span::new(0, 1, 1, 1),
            module,
            kind: BindingKind::Value {
                kind: ValueKind::Local {
                    index: 0,
                    item_level: true,
                },
                ty: Type::error(Span::default()),
            },
        }
    }

    fn ident(name: Symbol, start: usize) -> Ident {
        Ident {
            name,
            span: Span::new(start, start + 1, 1, 1),
        }
    }

    fn import_of(interface: ModuleInterface, alias: Symbol) -> Binding {
        Binding {
            name: alias,
            visibility: Visibility::Private,
            span: Span::new(0, 1, 1, 1),
            module: ModuleId::new(1),
            kind: BindingKind::Import(Rc::new(interface)),
        }
    }

    #[test]
    fn later_segments_must_be_public() {
        let mut interner = Interner::new();
        let builtins = Builtins::new(&mut interner);
        let util = interner.intern("util");
        let helper = interner.intern("helper");
        let secret = interner.intern("secret");

        let other = ModuleId::new(2);
        let mut interface = ModuleInterface {
            module: other,
            path: "src/util.sbl".to_string(),
            ..ModuleInterface::default()
        };
        interface.bindings.insert(helper, Rc::new(value(helper, Visibility::Public, other)));
        interface.bindings.insert(secret, Rc::new(value(secret, Visibility::Private, other)));

        let mut scopes = ScopeTree::new();
        scopes.declare(ScopeId::ROOT, import_of(interface, util)).unwrap();
        let resolver = PathResolver {
            scopes: &scopes,
            builtins: &builtins,
            prelude: None,
        };

        let mut hops = Vec::new();
        let found = resolver
            .resolve_path(ScopeId::ROOT, &[ident(util, 0), ident(helper, 5)], &mut hops)
            .unwrap();
        assert_eq!(found.name, helper);
        assert_eq!(hops.len(), 2);

        let err = resolver
            .resolve_path(ScopeId::ROOT, &[ident(util, 0), ident(secret, 5)], &mut hops)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Private { .. }));
    }

    #[test]
    fn first_segment_ignores_visibility() {
        let mut interner = Interner::new();
        let builtins = Builtins::new(&mut interner);
        let local = interner.intern("local");
        let mut scopes = ScopeTree::new();
        scopes
            .declare(ScopeId::ROOT, value(local, Visibility::Private, ModuleId::new(1)))
            .unwrap();
        let body = scopes.child(ScopeId::ROOT, crate::sema::scope::ScopeMode::Fresh, None);
        scopes.set_function(
            body,
            FunctionContext {
                ret: Type::error(Span::default()),
                throws: false,
            },
        );
        let resolver = PathResolver {
            scopes: &scopes,
            builtins: &builtins,
            prelude: None,
        };
        let mut hops = Vec::new();
        assert!(resolver.resolve_path(body, &[ident(local, 0)], &mut hops).is_ok());
    }

    #[test]
    fn values_are_not_modules() {
        let mut interner = Interner::new();
        let builtins = Builtins::new(&mut interner);
        let x = interner.intern("x");
        let y = interner.intern("y");
        let mut scopes = ScopeTree::new();
        scopes
            .declare(ScopeId::ROOT, value(x, Visibility::Private, ModuleId::new(1)))
            .unwrap();
        let resolver = PathResolver {
            scopes: &scopes,
            builtins: &builtins,
            prelude: None,
        };
        let mut hops = Vec::new();
        let err = resolver
            .resolve_path(ScopeId::ROOT, &[ident(x, 0), ident(y, 2)], &mut hops)
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotAModule { .. }));
    }

    #[test]
    fn placeholder_modules_fail_silently() {
        let mut interner = Interner::new();
        let builtins = Builtins::new(&mut interner);
        let broken = interner.intern("broken");
        let thing = interner.intern("thing");
        let mut scopes = ScopeTree::new();
        scopes
            .declare(
                ScopeId::ROOT,
                import_of(ModuleInterface::placeholder(ModuleId::new(3), "src/broken.sbl"), broken),
            )
            .unwrap();
        let resolver = PathResolver {
            scopes: &scopes,
            builtins: &builtins,
            prelude: None,
        };
        let mut hops = Vec::new();
        let err = resolver
            .resolve_path(ScopeId::ROOT, &[ident(broken, 0), ident(thing, 7)], &mut hops)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Placeholder));
    }
}
