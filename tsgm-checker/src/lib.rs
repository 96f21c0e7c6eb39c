//! Name binding, type checking and semantic queries for tsgm
//!
//! A [`Program`] parses its input files next to a small prelude of built-in
//! declarations; [`Program::check`] binds and checks them into a read-only
//! [`Checker`] the code generators query.

pub mod binder;
pub mod checker;
pub mod decorators;
pub mod diagnostics;
pub mod helpers;
pub mod prelude;
pub mod program;
pub mod symbols;
pub mod types;

pub use binder::{module_path, normalize_path, ScopeId, ScopeKind};
pub use checker::Checker;
pub use decorators::{Decorator, DecoratorKind, DecoratorTarget, Decorators};
pub use diagnostics::Diagnostic;
pub use helpers::{
    is_access_expression_with_evaluation_effects, is_default_array_call_method_name, is_default_array_property_name,
    is_expression_with_evaluation_effect, AccessorLookup, ContextType, EnumError, EnumValue,
};
pub use program::{CheckOptions, Program};
pub use symbols::{Decl, Symbol, SymbolFlags, SymbolId};
pub use types::{Signature, SignatureId, SignatureKind, TypeArena, TypeId, TypeKind};
