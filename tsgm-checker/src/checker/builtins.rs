//! Members of primitive, array and function types

use super::Checker;
use crate::types::{Signature, SignatureKind, SignatureParam, TypeId, TypeKind};

/// Parameter of a built-in member signature
enum Arg {
    Required(TypeId),
    Optional(TypeId),
    Rest(TypeId),
}

impl<'a> Checker<'a> {
    /// Function type with a single built-in signature
    fn builtin_method(&mut self, args: Vec<Arg>, return_type: TypeId) -> TypeId {
        let mut params = Vec::with_capacity(args.len());
        for (index, arg) in args.into_iter().enumerate() {
            let (ty, optional, rest) = match arg {
                Arg::Required(ty) => (ty, false, false),
                Arg::Optional(ty) => (ty, true, false),
                Arg::Rest(ty) => (self.arena.array(ty), false, true),
            };
            params.push(SignatureParam {
                name: format!("arg{index}"),
                ty,
                optional,
                rest,
            });
        }
        let signature = self.arena.add_signature(Signature {
            params,
            return_type,
            this_type: None,
            kind: SignatureKind::Builtin,
            tags: Vec::new(),
            decl: None,
        });
        self.arena.function(None, vec![signature])
    }

    /// `(value: T, index: number, array: T[]) => ret`
    fn element_callback(&mut self, array: TypeId, element: TypeId, return_type: TypeId) -> TypeId {
        let signature = Signature::builtin(vec![element, TypeId::NUMBER, array], return_type);
        let signature = self.arena.add_signature(signature);
        self.arena.function(None, vec![signature])
    }

    fn cached_member(&mut self, key: TypeId, name: &str) -> Option<TypeId> {
        self.builtin_members.get(&(key, name.to_string())).copied()
    }

    fn cache_member(&mut self, key: TypeId, name: &str, ty: TypeId) -> TypeId {
        self.builtin_members.insert((key, name.to_string()), ty);
        ty
    }

    pub(crate) fn array_member(&mut self, array: TypeId, element: TypeId, name: &str) -> Option<TypeId> {
        if let Some(ty) = self.cached_member(array, name) {
            return Some(ty);
        }
        let ty = match name {
            "length" => TypeId::NUMBER,
            "push" | "unshift" => self.builtin_method(vec![Arg::Rest(element)], TypeId::NUMBER),
            "pop" | "shift" => self.builtin_method(Vec::new(), element),
            "concat" => self.builtin_method(vec![Arg::Rest(TypeId::ANY)], array),
            "reverse" => self.builtin_method(Vec::new(), array),
            "sort" => {
                let compare = Signature::builtin(vec![element, element], TypeId::NUMBER);
                let compare = self.arena.add_signature(compare);
                let compare = self.arena.function(None, vec![compare]);
                self.builtin_method(vec![Arg::Optional(compare)], array)
            }
            "forEach" => {
                let callback = self.element_callback(array, element, TypeId::VOID);
                self.builtin_method(vec![Arg::Required(callback)], TypeId::VOID)
            }
            "map" => {
                let callback = self.element_callback(array, element, TypeId::ANY);
                let result = self.arena.array(TypeId::ANY);
                self.builtin_method(vec![Arg::Required(callback)], result)
            }
            "filter" => {
                let callback = self.element_callback(array, element, TypeId::BOOLEAN);
                self.builtin_method(vec![Arg::Required(callback)], array)
            }
            "some" | "every" => {
                let callback = self.element_callback(array, element, TypeId::BOOLEAN);
                self.builtin_method(vec![Arg::Required(callback)], TypeId::BOOLEAN)
            }
            "find" => {
                let callback = self.element_callback(array, element, TypeId::BOOLEAN);
                self.builtin_method(vec![Arg::Required(callback)], element)
            }
            "findIndex" => {
                let callback = self.element_callback(array, element, TypeId::BOOLEAN);
                self.builtin_method(vec![Arg::Required(callback)], TypeId::NUMBER)
            }
            "reduce" => {
                let signature = Signature::builtin(vec![TypeId::ANY, element, TypeId::NUMBER, array], TypeId::ANY);
                let signature = self.arena.add_signature(signature);
                let callback = self.arena.function(None, vec![signature]);
                self.builtin_method(vec![Arg::Required(callback), Arg::Optional(TypeId::ANY)], TypeId::ANY)
            }
            "indexOf" => self.builtin_method(vec![Arg::Required(element), Arg::Optional(TypeId::NUMBER)], TypeId::NUMBER),
            "includes" => self.builtin_method(vec![Arg::Required(element)], TypeId::BOOLEAN),
            "slice" => self.builtin_method(
                vec![Arg::Optional(TypeId::NUMBER), Arg::Optional(TypeId::NUMBER)],
                array,
            ),
            "splice" => self.builtin_method(
                vec![Arg::Required(TypeId::NUMBER), Arg::Optional(TypeId::NUMBER), Arg::Rest(element)],
                array,
            ),
            "join" => self.builtin_method(vec![Arg::Optional(TypeId::STRING)], TypeId::STRING),
            "toString" => self.builtin_method(Vec::new(), TypeId::STRING),
            _ => return None,
        };
        Some(self.cache_member(array, name, ty))
    }

    pub(crate) fn string_member(&mut self, name: &str) -> Option<TypeId> {
        if let Some(ty) = self.cached_member(TypeId::STRING, name) {
            return Some(ty);
        }
        let number = Arg::Optional(TypeId::NUMBER);
        let ty = match name {
            "length" => TypeId::NUMBER,
            "charAt" => self.builtin_method(vec![Arg::Required(TypeId::NUMBER)], TypeId::STRING),
            "charCodeAt" => self.builtin_method(vec![Arg::Required(TypeId::NUMBER)], TypeId::NUMBER),
            "concat" => self.builtin_method(vec![Arg::Rest(TypeId::STRING)], TypeId::STRING),
            "indexOf" | "lastIndexOf" => {
                self.builtin_method(vec![Arg::Required(TypeId::STRING), number], TypeId::NUMBER)
            }
            "replace" => self.builtin_method(
                vec![Arg::Required(TypeId::STRING), Arg::Required(TypeId::ANY)],
                TypeId::STRING,
            ),
            "slice" | "substr" | "substring" => {
                self.builtin_method(vec![Arg::Required(TypeId::NUMBER), number], TypeId::STRING)
            }
            "split" => {
                let parts = self.arena.array(TypeId::STRING);
                self.builtin_method(vec![Arg::Optional(TypeId::STRING)], parts)
            }
            "toLowerCase" | "toUpperCase" | "trim" | "toString" => self.builtin_method(Vec::new(), TypeId::STRING),
            "includes" | "startsWith" | "endsWith" => {
                self.builtin_method(vec![Arg::Required(TypeId::STRING), number], TypeId::BOOLEAN)
            }
            _ => return None,
        };
        Some(self.cache_member(TypeId::STRING, name, ty))
    }

    pub(crate) fn number_member(&mut self, name: &str) -> Option<TypeId> {
        if let Some(ty) = self.cached_member(TypeId::NUMBER, name) {
            return Some(ty);
        }
        let ty = match name {
            "toString" | "toFixed" => self.builtin_method(vec![Arg::Optional(TypeId::NUMBER)], TypeId::STRING),
            _ => return None,
        };
        Some(self.cache_member(TypeId::NUMBER, name, ty))
    }

    pub(crate) fn boolean_member(&mut self, name: &str) -> Option<TypeId> {
        if let Some(ty) = self.cached_member(TypeId::BOOLEAN, name) {
            return Some(ty);
        }
        let ty = match name {
            "toString" => self.builtin_method(Vec::new(), TypeId::STRING),
            _ => return None,
        };
        Some(self.cache_member(TypeId::BOOLEAN, name, ty))
    }

    pub(crate) fn function_member(&mut self, function: TypeId, name: &str) -> Option<TypeId> {
        if let Some(ty) = self.cached_member(function, name) {
            return Some(ty);
        }
        let return_type = match self.arena.get(function) {
            TypeKind::Function { signatures, .. } => signatures
                .first()
                .map(|signature| self.arena.signature(*signature).return_type)
                .unwrap_or(TypeId::ANY),
            _ => TypeId::ANY,
        };
        let ty = match name {
            "call" => self.builtin_method(vec![Arg::Optional(TypeId::ANY), Arg::Rest(TypeId::ANY)], return_type),
            "apply" => {
                let args = self.arena.array(TypeId::ANY);
                self.builtin_method(vec![Arg::Optional(TypeId::ANY), Arg::Optional(args)], return_type)
            }
            "bind" => self.builtin_method(vec![Arg::Optional(TypeId::ANY), Arg::Rest(TypeId::ANY)], function),
            "length" => TypeId::NUMBER,
            "name" => TypeId::STRING,
            _ => return None,
        };
        Some(self.cache_member(function, name, ty))
    }
}

#[cfg(test)]
mod tests {
    use crate::program::{CheckOptions, Program};
    use crate::types::{TypeId, TypeKind};

    fn check(source: &str) -> Program {
        Program::new(vec![("main.ts".into(), source.into())], CheckOptions::default())
    }

    #[test]
    fn test_array_and_string_members() {
        let program = check("const xs = [1, 2];\nconst n = xs.length;\nconst s = \"ab\".toUpperCase();\nconst parts = s.split(\",\");");
        let checker = program.check();
        assert!(checker.diagnostics().is_empty());
        let n = checker.resolve_value("n", checker.global).unwrap();
        assert_eq!(checker.type_of_symbol(n), TypeId::NUMBER);
        let s = checker.resolve_value("s", checker.global).unwrap();
        assert_eq!(checker.type_of_symbol(s), TypeId::STRING);
        let parts = checker.resolve_value("parts", checker.global).unwrap();
        assert_eq!(checker.type_kind(checker.type_of_symbol(parts)), &TypeKind::Array(TypeId::STRING));
    }

    #[test]
    fn test_callback_parameters_are_contextually_typed() {
        let program = check("const xs = [\"a\"];\nxs.forEach((x, i) => { const y = x; const j = i; });");
        let checker = program.check();
        assert!(checker.diagnostics().is_empty());
        let y = checker
            .symbols
            .iter()
            .position(|symbol| symbol.name == "y")
            .map(|index| crate::symbols::SymbolId(index as u32))
            .unwrap();
        assert_eq!(checker.type_of_symbol(y), TypeId::STRING);
    }
}
