//! Classes become tables with a metatable-based `new`

use super::declarations::validate_decorators;
use super::{Binding, Context, DeclarationKind, LuaTransformer, TransformResult};
use crate::error::TranspileError;
use crate::lua::ast::{BinaryOperator, Expression, Statement};
use tsgm_checker::{DecoratorKind, DecoratorTarget, Decorators, SymbolId};
use tsgm_syntax::{BindingName, ClassDecl, ClassMember, ClassMemberKind, Function, PropertyName};

impl<'c, 'a> LuaTransformer<'c, 'a> {
    /// Statements declaring `class`; `name` overrides the declared name for class expressions
    pub(crate) fn transform_class_declaration(
        &mut self,
        class: &ClassDecl,
        name: Option<&str>,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        validate_decorators(class.jsdoc.as_ref(), DecoratorTarget::Class, class.span)?;
        let symbol = self.checker.symbol_of_decl(class.id);
        let decorators = symbol
            .and_then(|symbol| self.checker.decorators_of_symbol(symbol))
            .cloned()
            .unwrap_or_default();
        if decorators.has(DecoratorKind::PureAbstract) {
            return Ok(Vec::new());
        }
        let is_extension = decorators.has(DecoratorKind::Extension);
        let is_meta_extension = decorators.has(DecoratorKind::MetaExtension);
        if is_extension && is_meta_extension {
            return Err(TranspileError::invalid_extension_meta_extension(class.span));
        }

        let declared_name = match (name, &class.name) {
            (Some(name), _) => name.to_string(),
            (None, Some(ident)) => self.lua_name(&ident.name, ident.span)?,
            (None, None) => return Err(TranspileError::missing_class_name(class.span)),
        };
        let base = self.checker.extended_class_of(class.id);

        let mut statements = Vec::new();
        let table = if is_meta_extension {
            let Some(base) = base else {
                return Err(TranspileError::missing_meta_extension(class.span));
            };
            let base_name = self.checker.symbol(base).name.clone();
            let meta_name = format!("__meta__{base_name}");
            let registry = Expression::call(Expression::path(&["debug", "getregistry"]), Vec::new());
            statements.push(Statement::local1(
                meta_name.clone(),
                Some(Expression::index(registry, Expression::string(base_name))),
            ));
            Expression::identifier(meta_name)
        } else if is_extension {
            let extended = decorators
                .get(DecoratorKind::Extension)
                .and_then(|decorator| decorator.args.first().cloned())
                .or_else(|| base.map(|base| self.checker.symbol(base).name.clone()))
                .unwrap_or(declared_name);
            Expression::identifier(extended)
        } else {
            // A class expression builds its table in a local of its own function
            let kind = if name.is_some() {
                DeclarationKind::LetOrConst
            } else {
                DeclarationKind::Var
            };
            statements.extend(self.class_creation(class, &declared_name, symbol, base, kind, cx)?);
            self.exported_identifier(&declared_name, symbol, cx)
        };

        let class_cx = cx.with_class(table.clone());
        let is_plain = !is_extension && !is_meta_extension;

        if !is_plain {
            for member in class.members.iter().filter(|member| !member.is_static()) {
                if let Some(statement) = self.field_initializer(member, &table, &class_cx)? {
                    statements.push(statement);
                }
            }
        }
        for member in class.members.iter().filter(|member| member.is_static()) {
            if let Some(statement) = self.field_initializer(member, &table, &class_cx)? {
                statements.push(statement);
            }
        }

        let constructor = class.members.iter().find_map(|member| match &member.kind {
            ClassMemberKind::Constructor(function) if function.body.is_some() => Some(function),
            _ => None,
        });
        match constructor {
            Some(constructor) => statements.push(self.transform_constructor(constructor, &table, &class_cx)?),
            None if is_plain && base.is_none() => statements.push(Statement::assign1(
                Expression::field(table.clone(), "constructor"),
                Expression::function(vec!["self".to_string()], false, Vec::new()),
            )),
            None => {}
        }

        for member in &class.members {
            if let ClassMemberKind::GetAccessor { name, function } = &member.kind {
                statements.push(self.transform_accessor("get", name, function, &table, &class_cx)?);
            }
        }
        for member in &class.members {
            if let ClassMemberKind::SetAccessor { name, function } = &member.kind {
                statements.push(self.transform_accessor("set", name, function, &table, &class_cx)?);
            }
        }
        for member in &class.members {
            if let ClassMemberKind::Method { name, function, .. } = &member.kind {
                if let Some(statement) = self.transform_method(name, function, &table, &class_cx)? {
                    statements.push(statement);
                }
            }
        }
        Ok(statements)
    }

    /// The class table, its metatable links and `new`
    fn class_creation(
        &mut self,
        class: &ClassDecl,
        name: &str,
        symbol: Option<SymbolId>,
        base: Option<SymbolId>,
        kind: DeclarationKind,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        let table = self.exported_identifier(name, symbol, cx);
        let base_table = match &class.extends {
            Some(extends) => Some(self.transform_expression(extends, cx)?),
            None => None,
        };
        let no_class_or = base
            .and_then(|base| self.checker.decorators_of_symbol(base))
            .is_some_and(|decorators: &Decorators| decorators.has(DecoratorKind::NoClassOr));

        let initial = match &base_table {
            Some(base_table) => Expression::call(Expression::field(base_table.clone(), "new"), Vec::new()),
            None => Expression::table(Vec::new()),
        };
        let value = if no_class_or && base_table.is_some() {
            initial
        } else {
            Expression::binary(BinaryOperator::Or, table.clone(), initial)
        };
        let binding = Binding {
            name: name.to_string(),
            symbol,
        };
        let mut statements = self.declare(vec![binding], vec![value], kind, cx);

        statements.push(Statement::assign1(Expression::field(table.clone(), "__index"), table.clone()));
        if let Some(base_table) = base_table {
            statements.push(Statement::assign1(Expression::field(table.clone(), "__base"), base_table));
        }

        let id = self.next_id();
        let new_cx = cx.with_class(table.clone()).enter_function(class.id, id, false);
        let self_id = Expression::identifier("self");
        let mut body = vec![Statement::local1(
            "self",
            Some(Expression::call(
                Expression::identifier("setmetatable"),
                vec![Expression::table(Vec::new()), table.clone()],
            )),
        )];
        for member in class.members.iter().filter(|member| !member.is_static()) {
            if let ClassMemberKind::Property { name, init: Some(init), .. } = &member.kind {
                let key = self.transform_property_name(name, &new_cx)?;
                let value = self.transform_expression(init, &new_cx)?;
                body.push(Statement::assign1(Expression::index(self_id.clone(), key), value));
            }
        }
        let constructor = Expression::field(table.clone(), "constructor");
        body.push(Statement::if_then(
            Expression::binary(BinaryOperator::And, Expression::identifier("construct"), constructor.clone()),
            vec![Statement::expression(Expression::call(
                constructor,
                vec![self_id.clone(), Expression::dots()],
            ))],
            None,
        ));
        body.push(Statement::ret(vec![self_id]));
        statements.push(Statement::assign1(
            Expression::field(table, "new"),
            Expression::function(vec!["construct".to_string()], true, body),
        ));
        Ok(statements)
    }

    /// `Table[name] = init` for a property with an initializer
    fn field_initializer(
        &mut self,
        member: &ClassMember,
        table: &Expression,
        cx: &Context,
    ) -> TransformResult<Option<Statement>> {
        let ClassMemberKind::Property { name, init: Some(init), .. } = &member.kind else {
            return Ok(None);
        };
        let key = self.transform_property_name(name, cx)?;
        let value = self.transform_expression(init, cx)?;
        Ok(Some(Statement::assign1(Expression::index(table.clone(), key), value)))
    }

    fn transform_constructor(
        &mut self,
        constructor: &Function,
        table: &Expression,
        cx: &Context,
    ) -> TransformResult<Statement> {
        let id = self.next_id();
        let inner = cx.enter_function(constructor.id, id, false);
        let (params, dots, rest) = self.transform_parameters(&constructor.params, Some("self"))?;

        let mut body = Vec::new();
        for param in constructor.params.iter().filter(|param| param.modifiers.is_parameter_property()) {
            let BindingName::Ident(ident) = &param.name else {
                continue;
            };
            let local = Expression::identifier(self.lua_name(&ident.name, ident.span)?);
            let value = match &param.init {
                Some(init) => Expression::binary(BinaryOperator::Or, local, self.transform_expression(init, &inner)?),
                None => local,
            };
            body.push(Statement::assign1(
                Expression::field(Expression::identifier("self"), ident.name.clone()),
                value,
            ));
        }
        body.extend(self.transform_function_body(&constructor.params, constructor.body.as_ref(), rest, &inner)?);

        Ok(Statement::assign1(
            Expression::field(table.clone(), "constructor"),
            Expression::function(params, dots, body),
        ))
    }

    /// `Table.get__name` or `Table.set__name`
    fn transform_accessor(
        &mut self,
        prefix: &str,
        name: &PropertyName,
        function: &Function,
        table: &Expression,
        cx: &Context,
    ) -> TransformResult<Statement> {
        let Some(name) = name.text() else {
            return Err(TranspileError::unsupported_kind("accessor name", "computed", name.span()));
        };
        let value = self.transform_function(function, Some("self"), cx)?;
        Ok(Statement::assign1(
            Expression::field(table.clone(), format!("{prefix}__{name}")),
            value,
        ))
    }

    fn transform_method(
        &mut self,
        name: &PropertyName,
        function: &Function,
        table: &Expression,
        cx: &Context,
    ) -> TransformResult<Option<Statement>> {
        if function.body.is_none() {
            return Ok(None);
        }
        let key = match name {
            PropertyName::Ident(ident) if ident.name == "toString" => Expression::string("__tostring"),
            name => self.transform_property_name(name, cx)?,
        };
        let context = self.function_has_context(function.id).then_some("self");
        let value = self.transform_function(function, context, cx)?;
        Ok(Some(Statement::assign1(Expression::index(table.clone(), key), value)))
    }
}

#[cfg(test)]
mod tests {
    use crate::transform::test_support::*;

    const SHAPES: &str = "class Shape {\n\
        name = \"shape\";\n\
        static count = 0;\n\
        constructor(public sides: number) {}\n\
        area(): number { return 0; }\n\
        toString(): string { return this.name; }\n\
    }\n\
    class Square extends Shape {\n\
        constructor(private size: number) { super(4); }\n\
        area(): number { return this.size * this.size; }\n\
        get diagonal(): number { return this.size * 1.41; }\n\
        set diagonal(value: number) { this.size = value / 1.41; }\n\
    }\n";

    #[test]
    fn test_class_table_and_new() {
        let lua = lua(SHAPES);
        assert!(lua.contains("Shape = Shape or {};"), "{lua}");
        assert!(lua.contains("Shape.__index = Shape;"), "{lua}");
        assert!(lua.contains("Shape.new = function(construct, ...)"), "{lua}");
        assert!(lua.contains("local self = setmetatable({}, Shape);"), "{lua}");
        assert!(lua.contains("self.name = \"shape\";"), "{lua}");
        assert!(lua.contains("if construct and Shape.constructor then"), "{lua}");
        assert!(lua.contains("Shape.constructor(self, ...);"), "{lua}");
        assert!(lua.contains("Shape.count = 0;"), "{lua}");
    }

    #[test]
    fn test_constructor_parameter_properties() {
        let lua = lua(SHAPES);
        assert!(lua.contains("Shape.constructor = function(self, sides)"), "{lua}");
        assert!(lua.contains("self.sides = sides;"), "{lua}");
    }

    #[test]
    fn test_inheritance_and_super_call() {
        let lua = lua(SHAPES);
        assert!(lua.contains("Square = Square or Shape.new();"), "{lua}");
        assert!(lua.contains("Square.__base = Shape;"), "{lua}");
        assert!(lua.contains("Square.__base.constructor(self, 4);"), "{lua}");
    }

    #[test]
    fn test_methods_and_accessors() {
        let lua = lua(SHAPES);
        assert!(lua.contains("Shape.area = function(self)"), "{lua}");
        assert!(lua.contains("Shape.__tostring = function(self)"), "{lua}");
        assert!(lua.contains("Square.get__diagonal = function(self)"), "{lua}");
        assert!(lua.contains("Square.set__diagonal = function(self, value)"), "{lua}");
    }

    #[test]
    fn test_accessor_use() {
        let lua = lua(&format!("{SHAPES}let sq = new Square(2);\nsq.diagonal = 3;\nlet d = sq.diagonal;"));
        assert!(lua.contains("local sq = Square.new(true, 2);"), "{lua}");
        assert!(lua.contains("sq:set__diagonal(3);"), "{lua}");
        assert!(lua.contains("local d = sq:get__diagonal();"), "{lua}");
    }

    #[test]
    fn test_no_class_or() {
        let lua = lua("/** @noClassOr */\nclass Base {}\nclass Derived extends Base {}");
        assert!(lua.contains("Derived = Base.new();"), "{lua}");
    }

    #[test]
    fn test_extension_class() {
        let lua = lua(
            "declare class Entity { x: number; }\n\
             /** @extension */\n\
             class EntityExt extends Entity { speed = 2; move(): void { this.x = this.x + this.speed; } }",
        );
        assert!(!lua.contains("EntityExt"), "{lua}");
        assert!(lua.contains("Entity.speed = 2;"), "{lua}");
        assert!(lua.contains("Entity.move = function(self)"), "{lua}");
    }

    #[test]
    fn test_meta_extension_class() {
        let lua = lua(
            "declare class _LOADED {}\n\
             /** @metaExtension */\n\
             class LoadedExt extends _LOADED { count(): number { return 0; } }",
        );
        assert!(lua.contains("local __meta___LOADED = debug.getregistry()._LOADED;"), "{lua}");
        assert!(lua.contains("__meta___LOADED.count = function(self)"), "{lua}");
    }

    #[test]
    fn test_new_on_extension_is_rejected() {
        let message = error(
            "declare class Entity {}\n/** @extension */\nclass EntityExt extends Entity {}\nlet e = new EntityExt();",
        );
        assert_eq!(message, "Cannot construct classes with decorator '@extension' or '@metaExtension'.");
    }

    #[test]
    fn test_pure_abstract_class_is_elided() {
        let lua = lua("/** @pureAbstract */\nclass Api { run(): void {} }");
        assert_eq!(lua, "");
    }

    #[test]
    fn test_class_expression() {
        let lua = lua("let Point = class { x = 0; };\nlet Size = class { w = 0; };");
        assert!(lua.contains("local Point = (function()"), "{lua}");
        assert!(lua.contains("local Size = (function()"), "{lua}");
        assert_eq!(lua.matches("local ____ = ____ or {};").count(), 2, "{lua}");
        assert!(!lua.contains("\n    ____ = ____ or {};"), "{lua}");
        assert!(lua.contains("return ____;"), "{lua}");
    }

    #[test]
    fn test_exported_class_in_module() {
        let lua = lua("export class Player { hp = 10; }");
        assert!(lua.contains("exports.Player = exports.Player or {};"), "{lua}");
        assert!(lua.contains("exports.Player.__index = exports.Player;"), "{lua}");
    }
}
