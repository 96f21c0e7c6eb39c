//! Decorators written as JSDoc tags
//!
//! Tags are matched once, when the checker finishes, and stored per symbol as
//! [`Decorators`]. Code generators only ever look at the parsed kinds.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use tsgm_syntax::JsDocTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DecoratorKind {
    /// Class adds members to an existing host table
    Extension,
    /// Class adds members to the metatable of a registry entry
    MetaExtension,
    /// `new` calls the named function instead of the class constructor
    CustomConstructor,
    /// Enum members become plain declarations
    CompileMembersOnly,
    /// Class exists for typing only and is not emitted
    PureAbstract,
    /// Namespace body is emitted without the namespace table
    Phantom,
    /// Function returns several values
    TupleReturn,
    /// Class table is created without the `or {}` fallback
    NoClassOr,
    /// Type is iterated with the native `for ... in` protocol
    LuaIterator,
    /// Base of game objects
    Object,
    /// Base of rooms
    Room,
    /// Method handles the event with an explicit type and number
    Action,
}

impl DecoratorKind {
    pub const ALL: [DecoratorKind; 12] = [
        DecoratorKind::Extension,
        DecoratorKind::MetaExtension,
        DecoratorKind::CustomConstructor,
        DecoratorKind::CompileMembersOnly,
        DecoratorKind::PureAbstract,
        DecoratorKind::Phantom,
        DecoratorKind::TupleReturn,
        DecoratorKind::NoClassOr,
        DecoratorKind::LuaIterator,
        DecoratorKind::Object,
        DecoratorKind::Room,
        DecoratorKind::Action,
    ];

    /// Case-insensitive lookup of a tag name
    pub fn from_tag_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag_name().to_ascii_lowercase() == lower)
    }

    /// Canonical spelling of the tag
    pub fn tag_name(self) -> &'static str {
        match self {
            DecoratorKind::Extension => "extension",
            DecoratorKind::MetaExtension => "metaExtension",
            DecoratorKind::CustomConstructor => "customConstructor",
            DecoratorKind::CompileMembersOnly => "compileMembersOnly",
            DecoratorKind::PureAbstract => "pureAbstract",
            DecoratorKind::Phantom => "phantom",
            DecoratorKind::TupleReturn => "tupleReturn",
            DecoratorKind::NoClassOr => "noClassOr",
            DecoratorKind::LuaIterator => "luaIterator",
            DecoratorKind::Object => "object",
            DecoratorKind::Room => "room",
            DecoratorKind::Action => "action",
        }
    }
}

/// Declarations a decorator is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecoratorTarget {
    Class,
    Function,
    Enum,
    Namespace,
}

impl DecoratorTarget {
    /// Where `kind` may be written; `None` when it is not restricted to one
    /// kind of declaration
    pub fn of(kind: DecoratorKind) -> Option<Self> {
        match kind {
            DecoratorKind::Extension
            | DecoratorKind::MetaExtension
            | DecoratorKind::CustomConstructor
            | DecoratorKind::PureAbstract
            | DecoratorKind::NoClassOr
            | DecoratorKind::Object
            | DecoratorKind::Room => Some(DecoratorTarget::Class),
            DecoratorKind::TupleReturn => Some(DecoratorTarget::Function),
            DecoratorKind::CompileMembersOnly => Some(DecoratorTarget::Enum),
            DecoratorKind::Phantom => Some(DecoratorTarget::Namespace),
            DecoratorKind::LuaIterator | DecoratorKind::Action => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DecoratorTarget::Class => "a class",
            DecoratorTarget::Function => "a function",
            DecoratorTarget::Enum => "an enum",
            DecoratorTarget::Namespace => "a namespace",
        }
    }
}

impl fmt::Display for DecoratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decorator {
    pub kind: DecoratorKind,
    /// Tag text split on spaces
    pub args: Vec<String>,
}

impl Decorator {
    pub fn from_tag(tag: &JsDocTag) -> Option<Self> {
        let kind = DecoratorKind::from_tag_name(&tag.name)?;
        let args = tag
            .text
            .split(' ')
            .filter(|arg| !arg.is_empty())
            .map(str::to_string)
            .collect();
        Some(Decorator { kind, args })
    }

    /// Event type and number of an `@action` decorator
    pub fn action_code(&self) -> Option<(u32, u32)> {
        if self.kind != DecoratorKind::Action {
            return None;
        }
        let mut numbers = self.args.iter().map(|arg| arg.parse::<u32>());
        match (numbers.next(), numbers.next()) {
            (Some(Ok(event_type)), Some(Ok(event_number))) => Some((event_type, event_number)),
            _ => None,
        }
    }
}

/// Decorators of one declaration, keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Decorators {
    entries: IndexMap<DecoratorKind, Decorator>,
}

impl Decorators {
    /// Parse the recognised tags; a repeated tag keeps its first occurrence
    pub fn from_tags(tags: &[JsDocTag]) -> Self {
        let mut decorators = Decorators::default();
        for decorator in tags.iter().filter_map(Decorator::from_tag) {
            decorators.entries.entry(decorator.kind).or_insert(decorator);
        }
        decorators
    }

    pub fn has(&self, kind: DecoratorKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn get(&self, kind: DecoratorKind) -> Option<&Decorator> {
        self.entries.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decorator> {
        self.entries.values()
    }

    /// Add the decorators of `other` that are not present yet
    pub fn extend(&mut self, other: &Decorators) {
        for decorator in other.iter() {
            self.entries.entry(decorator.kind).or_insert_with(|| decorator.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, text: &str) -> JsDocTag {
        JsDocTag {
            name: name.into(),
            text: text.into(),
        }
    }

    #[test]
    fn test_tag_names_are_case_insensitive() {
        assert_eq!(DecoratorKind::from_tag_name("TupleReturn"), Some(DecoratorKind::TupleReturn));
        assert_eq!(DecoratorKind::from_tag_name("metaextension"), Some(DecoratorKind::MetaExtension));
        assert_eq!(DecoratorKind::from_tag_name("param"), None);
    }

    #[test]
    fn test_arguments_are_split_on_spaces() {
        let decorator = Decorator::from_tag(&tag("customConstructor", "make_thing")).unwrap();
        assert_eq!(decorator.args, vec!["make_thing".to_string()]);
        let empty = Decorator::from_tag(&tag("extension", "")).unwrap();
        assert!(empty.args.is_empty());
    }

    #[test]
    fn test_action_code() {
        let decorator = Decorator::from_tag(&tag("action", "7 10")).unwrap();
        assert_eq!(decorator.action_code(), Some((7, 10)));
        let broken = Decorator::from_tag(&tag("action", "x")).unwrap();
        assert_eq!(broken.action_code(), None);
    }

    #[test]
    fn test_from_tags_ignores_unknown_tags() {
        let decorators = Decorators::from_tags(&[tag("param", "x"), tag("phantom", ""), tag("phantom", "again")]);
        assert!(decorators.has(DecoratorKind::Phantom));
        assert!(!decorators.has(DecoratorKind::Extension));
        assert_eq!(decorators.iter().count(), 1);
        assert!(decorators.get(DecoratorKind::Phantom).unwrap().args.is_empty());
    }

    #[test]
    fn test_decorator_targets() {
        assert_eq!(DecoratorTarget::of(DecoratorKind::TupleReturn), Some(DecoratorTarget::Function));
        assert_eq!(DecoratorTarget::of(DecoratorKind::CustomConstructor), Some(DecoratorTarget::Class));
        assert_eq!(DecoratorTarget::of(DecoratorKind::CompileMembersOnly), Some(DecoratorTarget::Enum));
        assert_eq!(DecoratorTarget::of(DecoratorKind::LuaIterator), None);
        assert_eq!(DecoratorTarget::Enum.description(), "an enum");
    }
}
