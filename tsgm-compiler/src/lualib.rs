//! Runtime library features the generated Lua calls into

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// File name the runtime bundle is written to and required by
pub const LUALIB_BUNDLE_NAME: &str = "lualib_bundle.lua";

/// Source of the runtime bundle
pub const LUALIB_BUNDLE: &str = include_str!("lualib_bundle.lua");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LuaLibFeature {
    ArrayConcat,
    ArrayEvery,
    ArrayFilter,
    ArrayForEach,
    ArrayIndexOf,
    ArrayMap,
    ArrayPush,
    ArrayReverse,
    ArrayShift,
    ArrayUnshift,
    ArraySort,
    ArraySlice,
    ArraySome,
    ArraySplice,
    FunctionApply,
    FunctionBind,
    FunctionCall,
    InstanceOf,
    Iterator,
    Map,
    Set,
    StringReplace,
    StringSplit,
    StringConcat,
    Symbol,
}

impl LuaLibFeature {
    pub fn name(self) -> &'static str {
        match self {
            LuaLibFeature::ArrayConcat => "ArrayConcat",
            LuaLibFeature::ArrayEvery => "ArrayEvery",
            LuaLibFeature::ArrayFilter => "ArrayFilter",
            LuaLibFeature::ArrayForEach => "ArrayForEach",
            LuaLibFeature::ArrayIndexOf => "ArrayIndexOf",
            LuaLibFeature::ArrayMap => "ArrayMap",
            LuaLibFeature::ArrayPush => "ArrayPush",
            LuaLibFeature::ArrayReverse => "ArrayReverse",
            LuaLibFeature::ArrayShift => "ArrayShift",
            LuaLibFeature::ArrayUnshift => "ArrayUnshift",
            LuaLibFeature::ArraySort => "ArraySort",
            LuaLibFeature::ArraySlice => "ArraySlice",
            LuaLibFeature::ArraySome => "ArraySome",
            LuaLibFeature::ArraySplice => "ArraySplice",
            LuaLibFeature::FunctionApply => "FunctionApply",
            LuaLibFeature::FunctionBind => "FunctionBind",
            LuaLibFeature::FunctionCall => "FunctionCall",
            LuaLibFeature::InstanceOf => "InstanceOf",
            LuaLibFeature::Iterator => "Iterator",
            LuaLibFeature::Map => "Map",
            LuaLibFeature::Set => "Set",
            LuaLibFeature::StringReplace => "StringReplace",
            LuaLibFeature::StringSplit => "StringSplit",
            LuaLibFeature::StringConcat => "StringConcat",
            LuaLibFeature::Symbol => "Symbol",
        }
    }

    /// Global the generated code calls, `__TS__<Name>`
    pub fn function_name(self) -> String {
        format!("__TS__{}", self.name())
    }

    /// Array method implemented by the runtime
    pub fn from_array_method(method: &str) -> Option<Self> {
        Some(match method {
            "concat" => LuaLibFeature::ArrayConcat,
            "push" => LuaLibFeature::ArrayPush,
            "reverse" => LuaLibFeature::ArrayReverse,
            "shift" => LuaLibFeature::ArrayShift,
            "unshift" => LuaLibFeature::ArrayUnshift,
            "sort" => LuaLibFeature::ArraySort,
            "forEach" => LuaLibFeature::ArrayForEach,
            "indexOf" => LuaLibFeature::ArrayIndexOf,
            "map" => LuaLibFeature::ArrayMap,
            "filter" => LuaLibFeature::ArrayFilter,
            "some" => LuaLibFeature::ArraySome,
            "every" => LuaLibFeature::ArrayEvery,
            "slice" => LuaLibFeature::ArraySlice,
            "splice" => LuaLibFeature::ArraySplice,
            _ => return None,
        })
    }

    /// Features this one calls at run time
    pub fn dependencies(self) -> &'static [LuaLibFeature] {
        match self {
            LuaLibFeature::Iterator => &[LuaLibFeature::Symbol],
            LuaLibFeature::Map | LuaLibFeature::Set => &[LuaLibFeature::Iterator, LuaLibFeature::Symbol],
            _ => &[],
        }
    }

    /// `features` plus everything they depend on
    pub fn closure(features: &BTreeSet<LuaLibFeature>) -> BTreeSet<LuaLibFeature> {
        let mut result = features.clone();
        let mut pending: Vec<LuaLibFeature> = features.iter().copied().collect();
        while let Some(feature) = pending.pop() {
            for dependency in feature.dependencies() {
                if result.insert(*dependency) {
                    pending.push(*dependency);
                }
            }
        }
        result
    }
}

impl fmt::Display for LuaLibFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_names() {
        assert_eq!(LuaLibFeature::ArrayPush.function_name(), "__TS__ArrayPush");
        assert_eq!(LuaLibFeature::from_array_method("splice"), Some(LuaLibFeature::ArraySplice));
        assert_eq!(LuaLibFeature::from_array_method("pop"), None);
    }

    #[test]
    fn test_closure_adds_dependencies() {
        let features = BTreeSet::from([LuaLibFeature::Map]);
        let closure = LuaLibFeature::closure(&features);
        assert!(closure.contains(&LuaLibFeature::Iterator));
        assert!(closure.contains(&LuaLibFeature::Symbol));
        assert_eq!(closure.len(), 3);
    }

    #[test]
    fn test_bundle_defines_every_feature() {
        let features = [
            LuaLibFeature::ArrayConcat,
            LuaLibFeature::ArraySplice,
            LuaLibFeature::FunctionBind,
            LuaLibFeature::InstanceOf,
            LuaLibFeature::Iterator,
            LuaLibFeature::StringSplit,
        ];
        for feature in features {
            assert!(
                LUALIB_BUNDLE.contains(&format!("function {}(", feature.function_name())),
                "{feature} missing from bundle"
            );
        }
        assert!(LUALIB_BUNDLE.contains("Map.new = function"));
        assert!(LUALIB_BUNDLE.contains("Set.new = function"));
    }
}
