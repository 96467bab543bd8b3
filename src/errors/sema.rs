// src/errors/sema.rs
//! Semantic analysis errors (E2xxx) and warnings (W2xxx).

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(E2001))]
    TypeMismatch {
        expected: String,
        found: String,
        #[label("type mismatch")]
        span: SourceSpan,
    },

    #[error("undefined variable '{name}'")]
    #[diagnostic(code(E2002))]
    UndefinedVariable {
        name: String,
        #[label("not found in scope")]
        span: SourceSpan,
    },

    #[error("unknown type '{name}'")]
    #[diagnostic(code(E2003))]
    UnknownType {
        name: String,
        #[label("not a known struct, class or trait")]
        span: SourceSpan,
    },

    #[error("unknown trait '{name}'")]
    #[diagnostic(code(E2004))]
    UnknownTrait {
        name: String,
        #[label("not a known trait")]
        span: SourceSpan,
    },

    #[error("'{name}' is not a trait")]
    #[diagnostic(code(E2005))]
    NotATrait {
        name: String,
        #[label("expected a trait here")]
        span: SourceSpan,
    },

    #[error("'{name}' is not a type")]
    #[diagnostic(code(E2006))]
    NotAType {
        name: String,
        #[label("expected a type here")]
        span: SourceSpan,
    },

    #[error("'{name}' is already defined in this scope")]
    #[diagnostic(code(E2007))]
    DuplicateDefinition {
        name: String,
        #[label("redefined here")]
        span: SourceSpan,
        #[label("first defined here")]
        previous: SourceSpan,
    },

    #[error("'{keyword}' outside of loop")]
    #[diagnostic(code(E2008))]
    InvalidBreak {
        keyword: &'static str,
        #[label("not inside a loop")]
        span: SourceSpan,
    },

    #[error("unknown loop label '{label}'")]
    #[diagnostic(code(E2009), help("labels must name an enclosing loop"))]
    UnknownLabel {
        label: String,
        #[label("no enclosing loop has this label")]
        span: SourceSpan,
    },

    #[error("'{name}' is private to module '{module}'")]
    #[diagnostic(code(E2010), help("mark the declaration `pub` to use it from another file"))]
    PrivateItem {
        name: String,
        module: String,
        #[label("private item")]
        span: SourceSpan,
    },

    #[error("'{name}' is not a module")]
    #[diagnostic(code(E2011))]
    NotAModule {
        name: String,
        #[label("cannot look up names inside this")]
        span: SourceSpan,
    },

    #[error("expected {expected} arguments, found {found}")]
    #[diagnostic(code(E2012))]
    WrongArgumentCount {
        expected: usize,
        found: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("expected {expected} type arguments, found {found}")]
    #[diagnostic(code(E2013))]
    WrongTypeArgCount {
        expected: usize,
        found: usize,
        #[label("wrong number of type arguments")]
        span: SourceSpan,
    },

    #[error("nilable type '{ty}' cannot be made nilable again")]
    #[diagnostic(code(E2014))]
    NestedNilable {
        ty: String,
        #[label("nested nilable")]
        span: SourceSpan,
    },

    #[error("'{ty}' cannot be used as a type argument: {reason}")]
    #[diagnostic(code(E2015))]
    InvalidTypeArgument {
        ty: String,
        reason: &'static str,
        #[label("invalid type argument")]
        span: SourceSpan,
    },

    #[error("type '{ty}' does not satisfy bound '{bound}'")]
    #[diagnostic(code(E2016))]
    BoundNotSatisfied {
        ty: String,
        bound: String,
        #[label("required by this type parameter")]
        span: SourceSpan,
    },

    #[error("cannot infer generic parameter '{param}' of '{ty}'")]
    #[diagnostic(code(E2017), help("provide explicit type arguments"))]
    CannotInferTypeParam {
        param: String,
        ty: String,
        #[label("type parameter not inferred")]
        span: SourceSpan,
    },

    #[error("expected {expected} values, found {found}")]
    #[diagnostic(code(E2018))]
    ArityMismatch {
        expected: usize,
        found: usize,
        #[label("value count does not match targets")]
        span: SourceSpan,
    },

    #[error("{what} can only appear as the last value")]
    #[diagnostic(code(E2019))]
    MisplacedSpread {
        what: &'static str,
        #[label("not in trailing position")]
        span: SourceSpan,
    },

    #[error("variadic element must be the last")]
    #[diagnostic(code(E2020))]
    VarargNotLast {
        #[label("vararg not in trailing position")]
        span: SourceSpan,
    },

    #[error("missing field '{field}' in struct literal for '{ty}'")]
    #[diagnostic(code(E2021))]
    MissingField {
        ty: String,
        field: String,
        #[label("this field is required")]
        span: SourceSpan,
    },

    #[error("unknown field '{field}' in type '{ty}'")]
    #[diagnostic(code(E2022))]
    UnknownField {
        ty: String,
        field: String,
        #[label("no such field")]
        span: SourceSpan,
    },

    #[error("unknown method '{method}' on type '{ty}'")]
    #[diagnostic(code(E2023))]
    UnknownMethod {
        ty: String,
        method: String,
        #[label("no such method")]
        span: SourceSpan,
    },

    #[error("ambiguous method '{method}' on type '{ty}'")]
    #[diagnostic(code(E2024), help("candidates come from: {candidates}"))]
    AmbiguousMethod {
        ty: String,
        method: String,
        candidates: String,
        #[label("more than one method matches")]
        span: SourceSpan,
    },

    #[error("field '{field}' specified more than once")]
    #[diagnostic(code(E2025))]
    DuplicateField {
        field: String,
        #[label("duplicate field")]
        span: SourceSpan,
    },

    #[error("field '{field}' of '{ty}' is private")]
    #[diagnostic(code(E2026))]
    PrivateField {
        ty: String,
        field: String,
        #[label("private field")]
        span: SourceSpan,
    },

    #[error("condition must be boolean, found {found}")]
    #[diagnostic(code(E2027))]
    ConditionNotBool {
        found: String,
        #[label("expected boolean")]
        span: SourceSpan,
    },

    #[error("cannot call non-function type '{ty}'")]
    #[diagnostic(code(E2028))]
    NotCallable {
        ty: String,
        #[label("not a function")]
        span: SourceSpan,
    },

    #[error("'try' used outside of an error-returning function")]
    #[diagnostic(code(E2029), help("mark the enclosing function `throws`, or use `catch`"))]
    TryOutsideThrowingFunction {
        #[label("cannot propagate from here")]
        span: SourceSpan,
    },

    #[error("'throw' used outside of an error-returning function")]
    #[diagnostic(code(E2030), help("mark the enclosing function `throws`"))]
    ThrowOutsideThrowingFunction {
        #[label("cannot throw here")]
        span: SourceSpan,
    },

    #[error("'{keyword}' requires a call to an error-returning function")]
    #[diagnostic(code(E2031))]
    NotAThrowingCall {
        keyword: &'static str,
        #[label("this does not return an error")]
        span: SourceSpan,
    },

    #[error("'return' outside of a function")]
    #[diagnostic(code(E2032))]
    ReturnOutsideFunction {
        #[label("not inside a function")]
        span: SourceSpan,
    },

    #[error("function must return {expected}")]
    #[diagnostic(code(E2033), help("add a return statement or a trailing expression"))]
    MissingReturn {
        expected: String,
        #[label("body completes without a value")]
        span: SourceSpan,
    },

    #[error("branches have incompatible types: expected {expected}, found {found}")]
    #[diagnostic(code(E2034))]
    BranchTypeMismatch {
        expected: String,
        found: String,
        #[label("this branch has type {found}")]
        span: SourceSpan,
    },

    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    #[diagnostic(code(E2035))]
    InvalidOperands {
        op: &'static str,
        left: String,
        right: String,
        #[label("invalid operands")]
        span: SourceSpan,
    },

    #[error("operator '{op}' cannot be applied to {ty}")]
    #[diagnostic(code(E2036))]
    InvalidOperand {
        op: &'static str,
        ty: String,
        #[label("invalid operand")]
        span: SourceSpan,
    },

    #[error("value of type '{ty}' may be nil")]
    #[diagnostic(code(E2037), help("check the value against nil first"))]
    NilableAccess {
        ty: String,
        #[label("possibly nil")]
        span: SourceSpan,
    },

    #[error("type '{ty}' cannot be indexed")]
    #[diagnostic(code(E2038))]
    NotIndexable {
        ty: String,
        #[label("not indexable")]
        span: SourceSpan,
    },

    #[error("type '{ty}' is not iterable")]
    #[diagnostic(code(E2039))]
    NotIterable {
        ty: String,
        #[label("not iterable")]
        span: SourceSpan,
    },

    #[error("invalid assignment target")]
    #[diagnostic(code(E2040))]
    InvalidAssignTarget {
        #[label("cannot assign to this")]
        span: SourceSpan,
    },

    #[error("method '{method}' needs a receiver")]
    #[diagnostic(code(E2041), help("call it on a value: `value.{method}(..)`"))]
    MissingReceiver {
        method: String,
        #[label("called without an instance")]
        span: SourceSpan,
    },

    #[error("trait '{name}' inherits from itself")]
    #[diagnostic(code(E2042))]
    CyclicSupertraits {
        name: String,
        #[label("supertrait cycle")]
        span: SourceSpan,
    },

    #[error("method '{method}' is already declared by supertrait '{supertrait}'")]
    #[diagnostic(code(E2043))]
    SupertraitMethodRedeclared {
        method: String,
        supertrait: String,
        #[label("redeclared here")]
        span: SourceSpan,
    },

    #[error("type '{ty}' does not implement trait method `{method}` of '{trait_name}'")]
    #[diagnostic(code(E2044))]
    MissingTraitMethod {
        ty: String,
        trait_name: String,
        method: String,
        #[label("missing `{method}`")]
        span: SourceSpan,
    },

    #[error("method '{method}' has wrong signature for trait '{trait_name}'")]
    #[diagnostic(code(E2045), help("trait requires: {expected}\nfound: {found}"))]
    TraitMethodSignatureMismatch {
        trait_name: String,
        method: String,
        expected: String,
        found: String,
        #[label("signature mismatch")]
        span: SourceSpan,
    },

    #[error("method '{method}' is not a member of trait '{trait_name}'")]
    #[diagnostic(code(E2046))]
    MethodNotInTrait {
        trait_name: String,
        method: String,
        #[label("not declared by the trait")]
        span: SourceSpan,
    },

    #[error("type '{ty}' does not allow impl blocks")]
    #[diagnostic(code(E2047))]
    ImplNotAllowed {
        ty: String,
        #[label("'{ty}' is marked no_impl")]
        span: SourceSpan,
    },

    #[error("conflicting implementations of trait '{trait_name}' for '{ty}'")]
    #[diagnostic(code(E2048))]
    ConflictingImpl {
        ty: String,
        trait_name: String,
        #[label("conflicting implementation")]
        span: SourceSpan,
    },

    #[error("method '{method}' of '{ty}' is inherited from both '{first}' and '{second}'")]
    #[diagnostic(code(E2049), help("implement '{method}' directly on '{ty}' to disambiguate"))]
    AmbiguousInheritedMethod {
        ty: String,
        method: String,
        first: String,
        second: String,
        #[label("ambiguous default method")]
        span: SourceSpan,
    },

    #[error("impl target '{ty}' is not a struct or class")]
    #[diagnostic(code(E2050))]
    ImplTargetNotStruct {
        ty: String,
        #[label("expected a struct or class")]
        span: SourceSpan,
    },

    #[error("impl target '{ty}' must not have type arguments")]
    #[diagnostic(code(E2051), help("impl blocks apply to every instantiation of the definition"))]
    ImplTargetHasTypeArgs {
        ty: String,
        #[label("remove the type arguments")]
        span: SourceSpan,
    },

    #[error("unknown attribute '{name}'")]
    #[diagnostic(code(E2052))]
    UnknownAttribute {
        name: String,
        #[label("unknown attribute")]
        span: SourceSpan,
    },

    #[error("global type '{ty}' cannot be constructed")]
    #[diagnostic(code(E2053))]
    GlobalConstructed {
        ty: String,
        #[label("'{ty}' is marked global")]
        span: SourceSpan,
    },

    #[error("supertype '{ty}' is not a class")]
    #[diagnostic(code(E2054))]
    InvalidSupertype {
        ty: String,
        #[label("only classes can be inherited from")]
        span: SourceSpan,
    },

    #[error("class '{name}' inherits from itself")]
    #[diagnostic(code(E2055))]
    CyclicInheritance {
        name: String,
        #[label("inheritance cycle")]
        span: SourceSpan,
    },

    #[error("circular import of '{path}'")]
    #[diagnostic(code(E2056), help("break the cycle by moving shared items into a third file"))]
    CircularImport {
        path: String,
        #[label("this import closes a cycle")]
        span: SourceSpan,
    },

    #[error("cannot import '{path}': {reason}")]
    #[diagnostic(code(E2057))]
    ImportFailed {
        path: String,
        reason: String,
        #[label("import failed")]
        span: SourceSpan,
    },

    #[error("'Self' is only valid inside traits and impl blocks")]
    #[diagnostic(code(E2058))]
    SelfOutsideImpl {
        #[label("no enclosing trait or impl")]
        span: SourceSpan,
    },

    #[error("method '{method}' is defined more than once for '{ty}'")]
    #[diagnostic(code(E2059))]
    DuplicateMethod {
        ty: String,
        method: String,
        #[label("duplicate method")]
        span: SourceSpan,
    },

    #[error("'{name}' is not a value")]
    #[diagnostic(code(E2060))]
    NotAValue {
        name: String,
        #[label("expected a value here")]
        span: SourceSpan,
    },

    #[error("'{ty}' implements '{trait_name}' but not its supertrait '{supertrait}'")]
    #[diagnostic(code(E2061), help("add `impl {supertrait} for {ty}`"))]
    MissingSupertraitImpl {
        ty: String,
        trait_name: String,
        supertrait: String,
        #[label("supertrait not implemented")]
        span: SourceSpan,
    },

    #[error("'{ty}' cannot be made nilable")]
    #[diagnostic(code(E2062), help("tuples and variadic values have no single absent value"))]
    NotNilable {
        ty: String,
        #[label("not nilable")]
        span: SourceSpan,
    },

    #[error("method '{method}' of '{ty}' has no receiver")]
    #[diagnostic(code(E2063), help("call it on the type: `{ty}.{method}(..)`"))]
    StaticMethodOnInstance {
        ty: String,
        method: String,
        #[label("called on an instance")]
        span: SourceSpan,
    },

    #[error("internal analyzer error: {message}")]
    #[diagnostic(code(E2099))]
    Internal {
        message: String,
        #[label("analysis of this file was aborted")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticWarning {
    #[error("error from '{callee}' is not handled")]
    #[diagnostic(
        code(W2001),
        help("propagate it with `try` or handle it with `catch`")
    )]
    UnhandledError {
        callee: String,
        #[label("call can fail")]
        span: SourceSpan,
    },

    #[error("unreachable code")]
    #[diagnostic(code(W2002))]
    UnreachableCode {
        #[label("this statement never runs")]
        span: SourceSpan,
    },
}
