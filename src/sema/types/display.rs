// src/sema/types/display.rs
//
// Human-readable type names for diagnostics and inlay hints.

use crate::frontend::Interner;

use super::{TraitInstance, Type, TypeKind};

/// Render a type the way it would be written in source.
pub fn display_type(ty: &Type, interner: &Interner) -> String {
    let base = display_kind(ty, interner);
    if !ty.is_nilable() {
        return base;
    }
    match ty.kind() {
        TypeKind::Function(_) => format!("({})?", base),
        _ => format!("{}?", base),
    }
}

fn display_kind(ty: &Type, interner: &Interner) -> String {
    match ty.kind() {
        TypeKind::Struct(instance) => {
            let name = interner.resolve(instance.def.name);
            if instance.args.is_empty() {
                name.to_string()
            } else {
                format!("{}<{}>", name, display_list(&instance.args, interner))
            }
        }
        TypeKind::Function(func) => {
            let throws = if func.throws { " throws" } else { "" };
            format!(
                "fn({}){} -> {}",
                display_list(&func.params, interner),
                throws,
                display_type(&func.ret, interner)
            )
        }
        TypeKind::Tuple(elems) => format!("({})", display_list(elems, interner)),
        TypeKind::Vararg(inner) => format!("...{}", display_type(inner, interner)),
        TypeKind::Generic(param) => interner.resolve(param.name).to_string(),
        TypeKind::DynTrait(trait_ref) => format!("dyn {}", display_trait(trait_ref, interner)),
        TypeKind::Unreachable => "never".to_string(),
        TypeKind::Error => "<error>".to_string(),
    }
}

/// Trait reference as written in a bound or impl header.
pub fn display_trait(trait_ref: &TraitInstance, interner: &Interner) -> String {
    let name = interner.resolve(trait_ref.def.name);
    if trait_ref.args.is_empty() {
        name.to_string()
    } else {
        format!("{}<{}>", name, display_list(&trait_ref.args, interner))
    }
}

fn display_list(types: &[Type], interner: &Interner) -> String {
    types
        .iter()
        .map(|t| display_type(t, interner))
        .collect::<Vec<_>>()
        .join(", ")
}
