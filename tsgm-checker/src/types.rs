//! Type arena and signatures
//!
//! Types are interned in a [`TypeArena`] and referred to by [`TypeId`].
//! Primitive types have fixed ids so that they can be compared and created
//! without touching the arena. Generic instantiation is not modelled: type
//! parameters behave like their constraint, or `any` without one.

use crate::symbols::SymbolId;
use tsgm_syntax::{JsDocTag, NodeId};

/// Type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const ANY: TypeId = TypeId(0);
    pub const UNKNOWN: TypeId = TypeId(1);
    pub const NEVER: TypeId = TypeId(2);
    pub const VOID: TypeId = TypeId(3);
    pub const UNDEFINED: TypeId = TypeId(4);
    pub const NULL: TypeId = TypeId(5);
    pub const BOOLEAN: TypeId = TypeId(6);
    pub const NUMBER: TypeId = TypeId(7);
    pub const STRING: TypeId = TypeId(8);
    pub const SYMBOL: TypeId = TypeId(9);
    pub const TRUE: TypeId = TypeId(10);
    pub const FALSE: TypeId = TypeId(11);
}

/// Signature identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    Boolean,
    BooleanLiteral(bool),
    Number,
    NumberLiteral(f64),
    String,
    StringLiteral(String),
    /// ES symbol primitive
    Symbol,
    Array(TypeId),
    Tuple(Vec<TypeId>),
    /// Instance side of a class or interface, or an object/type literal
    Instance(SymbolId),
    /// Constructor side of a class, an enum object, a namespace or a module
    Static(SymbolId),
    /// Function value; `symbol` is the declaring function or method, if any
    Function {
        symbol: Option<SymbolId>,
        signatures: Vec<SignatureId>,
    },
    Union(Vec<TypeId>),
    Intersection(Vec<TypeId>),
    TypeParameter {
        symbol: SymbolId,
        constraint: Option<TypeId>,
    },
}

/// Where a signature was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    FunctionDeclaration,
    /// Class method
    Method,
    /// Interface or type literal method
    MethodSignature,
    FunctionExpression,
    Arrow,
    /// Function type node or call signature
    FunctionType,
    Constructor,
    /// Signature synthesised for a built-in member
    Builtin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignatureParam {
    pub name: String,
    pub ty: TypeId,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<SignatureParam>,
    pub return_type: TypeId,
    /// Type of an explicit `this` parameter
    pub this_type: Option<TypeId>,
    pub kind: SignatureKind,
    pub tags: Vec<JsDocTag>,
    /// Function, method or type node that declared the signature
    pub decl: Option<NodeId>,
}

impl Signature {
    pub fn builtin(params: Vec<TypeId>, return_type: TypeId) -> Self {
        Signature {
            params: params
                .into_iter()
                .enumerate()
                .map(|(index, ty)| SignatureParam {
                    name: format!("arg{index}"),
                    ty,
                    optional: true,
                    rest: false,
                })
                .collect(),
            return_type,
            this_type: None,
            kind: SignatureKind::Builtin,
            tags: Vec::new(),
            decl: None,
        }
    }

    /// Number of arguments the signature requires
    pub fn min_arguments(&self) -> usize {
        self.params.iter().filter(|param| !param.optional && !param.rest).count()
    }

    pub fn accepts(&self, count: usize) -> bool {
        let has_rest = self.params.iter().any(|param| param.rest);
        count >= self.min_arguments() && (has_rest || count <= self.params.len())
    }
}

/// Storage for every type and signature of a program
#[derive(Debug)]
pub struct TypeArena {
    types: Vec<TypeKind>,
    signatures: Vec<Signature>,
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeArena {
    pub fn new() -> Self {
        TypeArena {
            types: vec![
                TypeKind::Any,
                TypeKind::Unknown,
                TypeKind::Never,
                TypeKind::Void,
                TypeKind::Undefined,
                TypeKind::Null,
                TypeKind::Boolean,
                TypeKind::Number,
                TypeKind::String,
                TypeKind::Symbol,
                TypeKind::BooleanLiteral(true),
                TypeKind::BooleanLiteral(false),
            ],
            signatures: Vec::new(),
        }
    }

    pub fn get(&self, id: TypeId) -> &TypeKind {
        self.types.get(id.0 as usize).unwrap_or(&TypeKind::Any)
    }

    /// Intern a type, reusing the fixed ids of primitives
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        match kind {
            TypeKind::Any => return TypeId::ANY,
            TypeKind::Unknown => return TypeId::UNKNOWN,
            TypeKind::Never => return TypeId::NEVER,
            TypeKind::Void => return TypeId::VOID,
            TypeKind::Undefined => return TypeId::UNDEFINED,
            TypeKind::Null => return TypeId::NULL,
            TypeKind::Boolean => return TypeId::BOOLEAN,
            TypeKind::Number => return TypeId::NUMBER,
            TypeKind::String => return TypeId::STRING,
            TypeKind::Symbol => return TypeId::SYMBOL,
            TypeKind::BooleanLiteral(true) => return TypeId::TRUE,
            TypeKind::BooleanLiteral(false) => return TypeId::FALSE,
            _ => {}
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind);
        id
    }

    pub fn signature(&self, id: SignatureId) -> &Signature {
        &self.signatures[id.0 as usize]
    }

    pub fn add_signature(&mut self, signature: Signature) -> SignatureId {
        let id = SignatureId(self.signatures.len() as u32);
        self.signatures.push(signature);
        id
    }

    /// Fill in a return type once it has been inferred
    pub fn set_return_type(&mut self, id: SignatureId, return_type: TypeId) {
        if let Some(signature) = self.signatures.get_mut(id.0 as usize) {
            signature.return_type = return_type;
        }
    }

    pub fn array(&mut self, element: TypeId) -> TypeId {
        self.intern(TypeKind::Array(element))
    }

    pub fn function(&mut self, symbol: Option<SymbolId>, signatures: Vec<SignatureId>) -> TypeId {
        self.intern(TypeKind::Function { symbol, signatures })
    }

    /// Structural equality, used to collapse unions
    pub fn same(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (TypeKind::Array(x), TypeKind::Array(y)) => self.same(*x, *y),
            (TypeKind::Tuple(xs), TypeKind::Tuple(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.same(*x, *y))
            }
            (TypeKind::Function { signatures: x, .. }, TypeKind::Function { signatures: y, .. }) => x == y,
            (TypeKind::Union(xs), TypeKind::Union(ys)) => {
                xs.len() == ys.len() && xs.iter().all(|x| ys.iter().any(|y| self.same(*x, *y)))
            }
            (x, y) => x == y,
        }
    }

    /// Literal types widened to their primitive
    pub fn widen(&mut self, id: TypeId) -> TypeId {
        match self.get(id).clone() {
            TypeKind::BooleanLiteral(_) => TypeId::BOOLEAN,
            TypeKind::NumberLiteral(_) => TypeId::NUMBER,
            TypeKind::StringLiteral(_) => TypeId::STRING,
            TypeKind::Union(members) => {
                let widened = members.into_iter().map(|member| self.widen(member)).collect();
                self.union(widened)
            }
            _ => id,
        }
    }

    /// Union of `members`, flattened and deduplicated
    pub fn union(&mut self, members: Vec<TypeId>) -> TypeId {
        let mut flat: Vec<TypeId> = Vec::new();
        for member in members {
            let nested = match self.get(member) {
                TypeKind::Union(nested) => nested.clone(),
                TypeKind::Any => return TypeId::ANY,
                TypeKind::Never => continue,
                _ => vec![member],
            };
            for ty in nested {
                if !flat.iter().any(|existing| self.same(*existing, ty)) {
                    flat.push(ty);
                }
            }
        }
        match flat.len() {
            0 => TypeId::NEVER,
            1 => flat[0],
            _ => self.intern(TypeKind::Union(flat)),
        }
    }

    /// Remove `null` and `undefined` from a type
    pub fn non_nullable(&mut self, id: TypeId) -> TypeId {
        match self.get(id).clone() {
            TypeKind::Union(members) => {
                let kept = members
                    .into_iter()
                    .filter(|member| !matches!(self.get(*member), TypeKind::Null | TypeKind::Undefined))
                    .collect();
                self.union(kept)
            }
            _ => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_have_fixed_ids() {
        let mut arena = TypeArena::new();
        assert_eq!(arena.intern(TypeKind::Number), TypeId::NUMBER);
        assert_eq!(arena.intern(TypeKind::BooleanLiteral(false)), TypeId::FALSE);
        assert_eq!(arena.get(TypeId::STRING), &TypeKind::String);
    }

    #[test]
    fn test_union_flattens_and_dedupes() {
        let mut arena = TypeArena::new();
        let one = arena.intern(TypeKind::NumberLiteral(1.0));
        let one_again = arena.intern(TypeKind::NumberLiteral(1.0));
        let inner = arena.union(vec![TypeId::STRING, one]);
        let outer = arena.union(vec![inner, one_again, TypeId::STRING]);
        match arena.get(outer) {
            TypeKind::Union(members) => assert_eq!(members.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(arena.union(vec![TypeId::NUMBER]), TypeId::NUMBER);
        assert_eq!(arena.union(vec![TypeId::NUMBER, TypeId::ANY]), TypeId::ANY);
    }

    #[test]
    fn test_widen_literals() {
        let mut arena = TypeArena::new();
        let literal = arena.intern(TypeKind::StringLiteral("a".into()));
        assert_eq!(arena.widen(literal), TypeId::STRING);
        let union = arena.union(vec![TypeId::TRUE, TypeId::FALSE]);
        assert_eq!(arena.widen(union), TypeId::BOOLEAN);
    }

    #[test]
    fn test_signature_arity() {
        let mut signature = Signature::builtin(vec![TypeId::NUMBER], TypeId::VOID);
        signature.params[0].optional = false;
        assert!(signature.accepts(1));
        assert!(!signature.accepts(0));
        assert!(!signature.accepts(2));
    }
}
