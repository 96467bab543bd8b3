// src/sema/analyzer/declarations.rs
//
// Item-level declarations: imports, struct and trait shells, `use`
// aliases, struct bodies and function signatures.

use super::*;

/// A struct or class whose name is bound but whose contents are pending.
pub(super) struct StructShell<'p> {
    pub decl: &'p StructDecl,
    pub def: Rc<StructDef>,
    /// Scope holding the generic parameters
    pub scope: ScopeId,
}

pub(super) struct TraitShell<'p> {
    pub decl: &'p TraitDecl,
    pub def: Rc<TraitDef>,
    pub scope: ScopeId,
}

pub(super) struct FunctionShell<'p> {
    pub decl: &'p FuncDecl,
    pub def: Rc<FunctionDef>,
}

impl Analyzer<'_> {
    pub(super) fn declare_imports(&mut self, program: &Program) -> Result<(), FileFatal> {
        for item in &program.items {
            let Item::Import(import) = item else {
                continue;
            };
            let interface = match self.ctx.imports.get(&import.path) {
                Some(ImportedModule::Ready(interface)) => Rc::clone(interface),
                Some(ImportedModule::Circular) => {
                    self.add_error(
                        SemanticError::CircularImport {
                            path: import.path.clone(),
                            span: import.span.into(),
                        },
                        import.span,
                    );
                    Rc::new(ModuleInterface::placeholder(self.module, import.path.clone()))
                }
                Some(ImportedModule::Failed(reason)) => {
                    return Err(FileFatal::ImportFailed {
                        path: import.path.clone(),
                        reason: reason.clone(),
                        span: import.span,
                    });
                }
                None => {
                    return Err(FileFatal::ImportFailed {
                        path: import.path.clone(),
                        reason: "module was not loaded".to_string(),
                        span: import.span,
                    });
                }
            };
            tracing::trace!(path = %import.path, placeholder = interface.placeholder, "bind import");
            self.declare(
                ScopeId::ROOT,
                Binding {
                    name: import.alias.name,
                    visibility: import.visibility,
                    span: import.alias.span,
                    module: self.module,
                    kind: BindingKind::Import(interface),
                },
            );
        }
        Ok(())
    }

    /// Bind every struct and class name before any type expression is
    /// resolved, so declarations may refer to each other in any order.
    pub(super) fn declare_struct_shells<'p>(&mut self, program: &'p Program) -> Vec<StructShell<'p>> {
        let mut shells = Vec::new();
        for item in &program.items {
            let Item::Struct(decl) = item else {
                continue;
            };
            let key = DefKey::declared(self.module, decl.span);
            let def = Rc::new(StructDef::new(
                decl.name.name,
                key,
                decl.kind,
                self.module,
                decl.span,
                decl.visibility,
            ));
            let scope = self
                .scopes
                .child(ScopeId::ROOT, ScopeMode::Inherit, Some(decl.span));
            let generics = self.declare_generic_params(scope, key, &decl.generics);
            def.set_generics(generics);
            self.declare(
                ScopeId::ROOT,
                Binding {
                    name: decl.name.name,
                    visibility: decl.visibility,
                    span: decl.name.span,
                    module: self.module,
                    kind: BindingKind::Type(TypeBinding::Struct(Rc::clone(&def))),
                },
            );
            self.structs.push(Rc::clone(&def));
            shells.push(StructShell { decl, def, scope });
        }
        shells
    }

    pub(super) fn declare_trait_shells<'p>(&mut self, program: &'p Program) -> Vec<TraitShell<'p>> {
        let mut shells = Vec::new();
        for item in &program.items {
            let Item::Trait(decl) = item else {
                continue;
            };
            let key = DefKey::declared(self.module, decl.span);
            let def = Rc::new(TraitDef::new(
                decl.name.name,
                self.ctx.builtins.names.self_type,
                key,
                self.module,
                decl.span,
                decl.visibility,
            ));
            let scope = self
                .scopes
                .child(ScopeId::ROOT, ScopeMode::Inherit, Some(decl.span));
            let generics = self.declare_generic_params(scope, key, &decl.generics);
            def.set_generics(generics);
            self.scopes
                .set_self_type(scope, Type::generic(Rc::clone(&def.self_param), decl.span));
            self.declare(
                ScopeId::ROOT,
                Binding {
                    name: decl.name.name,
                    visibility: decl.visibility,
                    span: decl.name.span,
                    module: self.module,
                    kind: BindingKind::Trait(Rc::clone(&def)),
                },
            );
            self.traits.push(Rc::clone(&def));
            shells.push(TraitShell { decl, def, scope });
        }
        shells
    }

    /// `use a.b.c as d`: bind the resolved declaration under a new name.
    /// The alias keeps the declaration's identity and takes the `use`'s
    /// visibility, which is how re-exports work.
    pub(super) fn declare_uses(&mut self, program: &Program) {
        for item in &program.items {
            let Item::Use(decl) = item else {
                continue;
            };
            let Some(alias) = decl.bound_name() else {
                continue;
            };
            let target = match self.resolve_path(ScopeId::ROOT, &decl.path) {
                Ok(target) => target,
                Err(err) => {
                    self.report_resolve_error(err, false);
                    continue;
                }
            };
            let binding = Binding {
                name: alias.name,
                visibility: decl.visibility,
                ..(*target).clone()
            };
            if let Err(previous) = self.scopes.declare(ScopeId::ROOT, binding) {
                self.add_error(
                    SemanticError::DuplicateDefinition {
                        name: self.name(alias.name),
                        span: alias.span.into(),
                        previous: previous.span.into(),
                    },
                    alias.span,
                );
            }
        }
    }

    pub(super) fn resolve_structs(&mut self, shells: &[StructShell<'_>]) {
        for shell in shells {
            let StructShell { decl, def, scope } = shell;
            self.resolve_generic_bounds(*scope, &def.generics(), &decl.generics);
            let own = Type::instance(self_instance(def, &self.instances), decl.span);
            self.scopes.set_self_type(*scope, own);
            def.set_attributes(self.struct_attributes(&decl.attributes));

            let mut fields: Vec<FieldDef> = Vec::with_capacity(decl.fields.len());
            for field in &decl.fields {
                let ty = self.resolve_type_expr(*scope, &field.ty);
                if fields.iter().any(|f| f.name == field.name.name) {
                    self.add_error(
                        SemanticError::DuplicateField {
                            field: self.name(field.name.name),
                            span: field.name.span.into(),
                        },
                        field.name.span,
                    );
                    continue;
                }
                fields.push(FieldDef {
                    name: field.name.name,
                    ty,
                    visibility: field.visibility,
                    span: field.name.span,
                });
            }
            def.set_fields(fields);

            if let Some(expr) = &decl.supertype {
                let supertype = self.resolve_supertype(*scope, def, expr);
                def.set_supertype(supertype);
            }
            def.mark_resolved();
            tracing::trace!(name = %self.name(def.name), "struct resolved");
        }
    }

    fn struct_attributes(&mut self, attributes: &[Attribute]) -> StructAttributes {
        let names = &self.ctx.builtins.names;
        let (no_impl, named_fields, global) = (names.no_impl, names.named_fields, names.global);
        let mut out = StructAttributes::default();
        for attribute in attributes {
            match attribute.name.name {
                name if name == no_impl => out.no_impl = true,
                name if name == named_fields => out.named_fields = true,
                name if name == global => out.global = true,
                name => self.add_error(
                    SemanticError::UnknownAttribute {
                        name: self.name(name),
                        span: attribute.span.into(),
                    },
                    attribute.span,
                ),
            }
        }
        out
    }

    /// Superclass of `def`: must be a class, and must not lead back to `def`.
    fn resolve_supertype(&mut self, scope: ScopeId, def: &Rc<StructDef>, expr: &TypeExpr) -> Option<Type> {
        let ty = self.resolve_type_expr(scope, expr);
        if ty.is_error() {
            return None;
        }
        let parent = match ty.as_struct() {
            Some(parent) if parent.def.is_class() && !ty.is_nilable() => Rc::clone(parent),
            _ => {
                self.add_error(
                    SemanticError::InvalidSupertype {
                        ty: self.display(&ty),
                        span: expr.span.into(),
                    },
                    expr.span,
                );
                return None;
            }
        };
        if inherits_from(&parent.def, def) {
            self.add_error(
                SemanticError::CyclicInheritance {
                    name: self.name(def.name),
                    span: expr.span.into(),
                },
                expr.span,
            );
            return None;
        }
        Some(ty)
    }

    pub(super) fn declare_functions<'p>(&mut self, program: &'p Program) -> Vec<FunctionShell<'p>> {
        let mut shells = Vec::new();
        for item in &program.items {
            let Item::Function(decl) = item else {
                continue;
            };
            let sig = self.resolve_signature(ScopeId::ROOT, &decl.sig);
            let def = Rc::new(FunctionDef {
                name: decl.sig.name.name,
                key: DefKey::declared(self.module, decl.span),
                module: self.module,
                span: decl.sig.name.span,
                visibility: decl.visibility,
                ty: Rc::new(sig),
                owner: None,
                has_receiver: false,
            });
            let ty = Type::new(TypeKind::Function(Rc::clone(&def.ty)), decl.sig.name.span);
            self.declare(
                ScopeId::ROOT,
                Binding {
                    name: decl.sig.name.name,
                    visibility: decl.visibility,
                    span: decl.sig.name.span,
                    module: self.module,
                    kind: BindingKind::Value {
                        kind: ValueKind::Function(Rc::clone(&def)),
                        ty,
                    },
                },
            );
            self.functions.push(Rc::clone(&def));
            shells.push(FunctionShell { decl, def });
        }
        shells
    }

    /// Item-level `let`s, in source order.
    pub(super) fn check_item_lets(&mut self, program: &Program) {
        for item in &program.items {
            if let Item::Let(stmt) = item {
                self.check_let(ScopeId::ROOT, stmt, true);
            }
        }
    }
}

/// Whether following `start`'s superclass chain reaches `target`.
fn inherits_from(start: &Rc<StructDef>, target: &StructDef) -> bool {
    let mut current = Rc::clone(start);
    let mut seen: Vec<DefKey> = Vec::new();
    loop {
        if current.same_definition(target) {
            return true;
        }
        if seen.contains(&current.key) {
            return false;
        }
        seen.push(current.key);
        let Some(next) = current.supertype().and_then(|t| t.as_struct().map(|i| Rc::clone(&i.def))) else {
            return false;
        };
        current = next;
    }
}
