//! Objects and rooms
//!
//! A class is an object when one of its bases carries `@object` and a room
//! when one carries `@room`. Object methods named after an event, or tagged
//! `@action <type> <number>`, become event code; the remaining methods
//! become scripts called `<Class>_<method>`.

use super::{push_line, GmlContext, GmlRenderer, OutputFile};
use crate::error::TranspileError;
use crate::gmx::{builder, xml};
use crate::transform::TransformResult;
use indexmap::IndexMap;
use tracing::warn;
use tsgm_checker::{DecoratorKind, Decorators, SymbolId};
use tsgm_syntax::{ClassDecl, ClassMember, ClassMemberKind, Function, PropertyName};

/// Events bound by method name: (method, event type, event number)
pub(crate) const NAMED_EVENTS: &[(&str, u32, u32)] = &[
    ("create", 0, 0),
    ("destroy", 1, 0),
    ("step", 3, 0),
    ("beginStep", 3, 1),
    ("endStep", 3, 2),
    ("draw", 8, 0),
];

const CREATE_EVENT: (u32, u32) = (0, 0);

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassRole {
    /// `parent` is the generated object the class derives from, if any
    Object { parent: Option<String> },
    Room,
}

impl<'c, 'a> GmlRenderer<'c, 'a> {
    pub(super) fn render_class(&mut self, class: &ClassDecl) -> TransformResult<()> {
        let Some(name) = &class.name else {
            return Err(TranspileError::missing_class_name(class.span));
        };
        let symbol = self.checker.symbol_of_decl(class.id);
        let role = symbol.and_then(|symbol| self.classify(symbol));
        match (symbol, role) {
            (Some(symbol), Some(ClassRole::Object { parent })) => {
                self.render_object(class, &name.name, symbol, parent.as_deref())
            }
            (_, Some(ClassRole::Room)) => self.render_room(class, &name.name),
            _ => Err(TranspileError::unsupported_kind(
                "class",
                "class without an object or room base",
                name.span,
            )),
        }
    }

    fn classify(&self, symbol: SymbolId) -> Option<ClassRole> {
        let direct = self.checker.base_class_of(symbol)?;
        let mut visited = Vec::new();
        let mut current = Some(direct);
        while let Some(base) = current {
            if visited.contains(&base) {
                break;
            }
            visited.push(base);

            let decorators = self.checker.decorators_of_type(self.checker.declared_type_of_symbol(base));
            if decorators.has(DecoratorKind::Room) {
                return Some(ClassRole::Room);
            }
            if decorators.has(DecoratorKind::Object) {
                let parent = (base != direct).then(|| self.checker.symbol(direct).name.clone());
                return Some(ClassRole::Object { parent });
            }
            current = self.checker.base_class_of(base);
        }
        None
    }

    fn render_object(
        &mut self,
        class: &ClassDecl,
        name: &str,
        symbol: SymbolId,
        parent: Option<&str>,
    ) -> TransformResult<()> {
        let cx = GmlContext::with_object(symbol);
        let mut events: IndexMap<(u32, u32), String> = IndexMap::new();
        let mut fields = String::new();

        for member in &class.members {
            if member.is_static() {
                return Err(TranspileError::unsupported_kind("object member", "static member", member.span));
            }
            match &member.kind {
                ClassMemberKind::Property {
                    name: property,
                    init: Some(init),
                    ..
                } => {
                    let field = member_name(property, member)?;
                    let value = self.render_expression(init, &cx)?;
                    self.flush_hoisted(&mut fields, &cx);
                    push_line(&mut fields, &cx, &format!("{field} = {value};"));
                }
                ClassMemberKind::Property { .. } | ClassMemberKind::IndexSignature => {}
                ClassMemberKind::Method {
                    name: method, function, ..
                } => {
                    if function.body.is_none() {
                        continue;
                    }
                    let method = member_name(method, member)?;
                    match event_of(&method, member, function)? {
                        Some(code) => {
                            if let Some(param) = function.params.first() {
                                return Err(TranspileError::unsupported_kind(
                                    "event",
                                    "event with parameters",
                                    param.span,
                                ));
                            }
                            let body = self.render_function_body(function, &cx)?;
                            // Methods bound to the same event share it, in declaration order
                            events.entry(code).or_default().push_str(&body);
                        }
                        None => {
                            let script = self.render_script(&format!("{name}_{method}"), function, &cx)?;
                            self.outputs.push(script);
                        }
                    }
                }
                ClassMemberKind::Constructor(_) => {
                    return Err(TranspileError::unsupported_kind("object member", "constructor", member.span))
                }
                ClassMemberKind::GetAccessor { .. } | ClassMemberKind::SetAccessor { .. } => {
                    return Err(TranspileError::unsupported_kind("object member", "accessor", member.span))
                }
            }
        }

        // Field initialisers run at the start of the create event
        if !fields.is_empty() {
            match events.get_mut(&CREATE_EVENT) {
                Some(body) => body.insert_str(0, &fields),
                None => {
                    events.shift_insert(0, CREATE_EVENT, fields);
                }
            }
        }

        let mut object = builder::new_object();
        if let Some(parent) = parent {
            object.set_child_text("parentName", parent);
        }
        if let Some(element) = object.child_mut("events") {
            for ((event_type, event_number), code) in &events {
                element
                    .children
                    .push(builder::new_event(*event_type, *event_number, code.trim_end()));
            }
        }
        let content = xml::to_string(&object).map_err(|error| TranspileError::new(error.to_string(), class.span))?;
        self.outputs.push(OutputFile::object(name, content));
        Ok(())
    }

    fn render_room(&mut self, class: &ClassDecl, name: &str) -> TransformResult<()> {
        let mut room = builder::new_room();
        for member in &class.members {
            match &member.kind {
                ClassMemberKind::Method {
                    name: method, function, ..
                } if method.text().as_deref() == Some("creationCode") => {
                    let code = self.render_function_body(function, &GmlContext::default())?;
                    room.set_child_text("code", code.trim_end());
                }
                ClassMemberKind::IndexSignature => {}
                _ => warn!(room = name, "Ignoring room member other than creationCode"),
            }
        }
        let content = xml::to_string(&room).map_err(|error| TranspileError::new(error.to_string(), class.span))?;
        self.outputs.push(OutputFile::room(name, content));
        Ok(())
    }

    /// Script implementing `this.<method>()` inside the current object
    pub(super) fn method_script(&self, cx: &GmlContext, method: &str) -> Option<String> {
        let object = cx.object?;
        let member = self.checker.find_property(object, method)?;
        let owner = self.checker.symbol(member).parent?;
        if self.is_ambient(owner) || NAMED_EVENTS.iter().any(|(event, _, _)| *event == method) {
            return None;
        }
        Some(format!("{}_{method}", self.checker.symbol(owner).name))
    }
}

fn member_name(name: &PropertyName, member: &ClassMember) -> TransformResult<String> {
    name.text()
        .ok_or_else(|| TranspileError::unsupported_kind("object member name", "computed", member.span))
}

/// Event a method implements, from its `@action` tag or its name
fn event_of(method: &str, member: &ClassMember, function: &Function) -> TransformResult<Option<(u32, u32)>> {
    let decorators = member
        .jsdoc
        .as_ref()
        .or(function.jsdoc.as_ref())
        .map(|doc| Decorators::from_tags(&doc.tags))
        .unwrap_or_default();
    if let Some(action) = decorators.get(DecoratorKind::Action) {
        if action.args.len() != 2 {
            return Err(TranspileError::invalid_decorator_argument_number(
                "@action",
                action.args.len(),
                2,
                member.span,
            ));
        }
        return match action.action_code() {
            Some(code) => Ok(Some(code)),
            None => Err(TranspileError::new(
                format!("@action expects event numbers but got '{}'.", action.args.join(" ")),
                member.span,
            )),
        };
    }
    Ok(NAMED_EVENTS
        .iter()
        .find(|(event, _, _)| *event == method)
        .map(|(_, event_type, event_number)| (*event_type, *event_number)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::OutputKind;
    use crate::gmx::xml;

    const PLAYER: &str = "\
class Player extends GMObject {
    speed = 4;
    create() {
        this.x = 10;
    }
    step() {
        this.move(this.speed);
    }
    /** @action 6 50 */
    onMouse() {
        instance_destroy();
    }
    move(amount: number) {
        this.x += amount;
    }
}";

    fn events(content: &str) -> Vec<(String, String, String)> {
        let object = xml::parse(content).unwrap();
        object
            .child("events")
            .unwrap()
            .children_named("event")
            .map(|event| {
                let code = event
                    .child("action")
                    .and_then(|action| action.child("arguments"))
                    .and_then(|arguments| arguments.child("argument"))
                    .and_then(|argument| argument.child_text("string"))
                    .unwrap_or_default();
                (
                    event.attribute("eventtype").unwrap_or_default().to_string(),
                    event.attribute("enumb").unwrap_or_default().to_string(),
                    code.to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_object_events_and_scripts() {
        let files = render(PLAYER);
        let bindings: Vec<String> = files.iter().map(|file| file.binding_path()).collect();
        assert_eq!(bindings, vec!["scripts\\Player_move.gml", "objects\\Player.object.gmx"]);

        let object = resource(PLAYER, OutputKind::Object, "Player.object.gmx");
        assert_eq!(
            events(&object),
            vec![
                ("0".to_string(), "0".to_string(), "speed = 4;\nself.x = 10;".to_string()),
                ("3".to_string(), "0".to_string(), "Player_move(self.speed);".to_string()),
                ("6".to_string(), "50".to_string(), "instance_destroy();".to_string()),
            ]
        );
        assert_eq!(xml::parse(&object).unwrap().child_text("parentName"), Some("<undefined>"));

        let script = resource(PLAYER, OutputKind::Script, "Player_move.gml");
        assert_eq!(
            script,
            "/// Usage:  Player_move(amount)\nvar amount = argument[0];\nself.x += amount;\n"
        );
    }

    #[test]
    fn test_fields_create_the_create_event() {
        let object = resource(
            "class Coin extends GMObject { value = 10; draw() { draw_self(); } }",
            OutputKind::Object,
            "Coin.object.gmx",
        );
        assert_eq!(
            events(&object),
            vec![
                ("0".to_string(), "0".to_string(), "value = 10;".to_string()),
                ("8".to_string(), "0".to_string(), "draw_self();".to_string()),
            ]
        );
    }

    #[test]
    fn test_methods_sharing_an_event() {
        let object = resource(
            "class Clock extends GMObject { step() { this.x += 1; } /** @action 3 0 */ tick() { this.y += 1; } }",
            OutputKind::Object,
            "Clock.object.gmx",
        );
        assert_eq!(
            events(&object),
            vec![("3".to_string(), "0".to_string(), "self.x += 1;\nself.y += 1;".to_string())]
        );
    }

    #[test]
    fn test_parent_object() {
        let source = "class Enemy extends GMObject { hurt() {} }\nclass Bat extends Enemy { step() { this.hurt(); } }";
        let bat = resource(source, OutputKind::Object, "Bat.object.gmx");
        assert_eq!(xml::parse(&bat).unwrap().child_text("parentName"), Some("Enemy"));
        assert_eq!(events(&bat)[0].2, "Enemy_hurt();");
        let enemy = resource(source, OutputKind::Object, "Enemy.object.gmx");
        assert_eq!(xml::parse(&enemy).unwrap().child_text("parentName"), Some("<undefined>"));
    }

    #[test]
    fn test_room_creation_code() {
        let room = resource(
            "class Level1 extends Room { creationCode() { show_debug_message(\"start\"); } other = 1; }",
            OutputKind::Room,
            "Level1.room.gmx",
        );
        let room = xml::parse(&room).unwrap();
        assert_eq!(room.child_text("code"), Some("show_debug_message(\"start\");"));
        assert_eq!(room.child_text("width"), Some("1024"));
    }

    #[test]
    fn test_unsupported_classes_and_members() {
        assert_eq!(
            error("class Plain { }"),
            "Unsupported class kind: class without an object or room base"
        );
        assert_eq!(
            error("class P extends GMObject { static count = 0; }"),
            "Unsupported object member kind: static member"
        );
        assert_eq!(
            error("class P extends GMObject { constructor() { super(); } }"),
            "Unsupported object member kind: constructor"
        );
        assert_eq!(
            error("class P extends GMObject { step(dt: number) {} }"),
            "Unsupported event kind: event with parameters"
        );
    }

    #[test]
    fn test_action_arguments() {
        assert_eq!(
            error("class P extends GMObject { /** @action 6 */ click() {} }"),
            "@action expects 2 argument(s) but got 1."
        );
        assert_eq!(
            error("class P extends GMObject { /** @action six fifty */ click() {} }"),
            "@action expects event numbers but got 'six fifty'."
        );
    }
}
