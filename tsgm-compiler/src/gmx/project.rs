//! Typed view of a `.project.gmx` manifest

use super::builder;
use super::xml::{self, Element};
use crate::error::ManifestError;
use std::path::Path;
use tracing::debug;

/// Asset collections of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Script,
    Object,
    Room,
    Sprite,
    Sound,
    Background,
    Path,
    Shader,
    Font,
    Timeline,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::Sprite,
        ResourceKind::Sound,
        ResourceKind::Background,
        ResourceKind::Path,
        ResourceKind::Script,
        ResourceKind::Shader,
        ResourceKind::Font,
        ResourceKind::Timeline,
        ResourceKind::Object,
        ResourceKind::Room,
    ];

    /// Element name of the collection, which is also the resource directory
    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::Script => "scripts",
            ResourceKind::Object => "objects",
            ResourceKind::Room => "rooms",
            ResourceKind::Sprite => "sprites",
            ResourceKind::Sound => "sounds",
            ResourceKind::Background => "backgrounds",
            ResourceKind::Path => "paths",
            ResourceKind::Shader => "shaders",
            ResourceKind::Font => "fonts",
            ResourceKind::Timeline => "timelines",
        }
    }

    /// Element name of one entry
    pub fn entry(self) -> &'static str {
        match self {
            ResourceKind::Script => "script",
            ResourceKind::Object => "object",
            ResourceKind::Room => "room",
            ResourceKind::Sprite => "sprite",
            ResourceKind::Sound => "sound",
            ResourceKind::Background => "background",
            ResourceKind::Path => "path",
            ResourceKind::Shader => "shader",
            ResourceKind::Font => "font",
            ResourceKind::Timeline => "timeline",
        }
    }

    pub fn from_directory(directory: &str) -> Option<Self> {
        ResourceKind::ALL.into_iter().find(|kind| kind.collection() == directory)
    }
}

/// Manifest entries are written `folder\name`
pub fn directory_of(entry: &str) -> &str {
    entry.split(['\\', '/']).next().unwrap_or("")
}

/// Last component of a `folder\name` entry
pub fn base_name(entry: &str) -> &str {
    entry.rsplit(['\\', '/']).next().unwrap_or(entry)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    root: Element,
}

impl Default for Project {
    fn default() -> Self {
        Project::new()
    }
}

impl Project {
    pub fn new() -> Self {
        Project {
            root: builder::new_project(),
        }
    }

    pub fn from_element(root: Element) -> Result<Self, ManifestError> {
        if root.name != "assets" {
            return Err(ManifestError::Malformed(format!(
                "expected <assets> as the root element, found <{}>",
                root.name
            )));
        }
        Ok(Project { root })
    }

    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        Project::from_element(xml::parse(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::FileNotFound(path.display().to_string()));
        }
        Project::from_element(xml::read_file(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        xml::write_file(path, &self.root)
    }

    pub fn to_xml(&self) -> Result<String, ManifestError> {
        xml::to_string(&self.root)
    }

    pub fn element(&self) -> &Element {
        &self.root
    }

    /// Every entry of a collection, nested folders included, in document order
    pub fn entries(&self, kind: ResourceKind) -> Vec<String> {
        let mut entries = Vec::new();
        if let Some(collection) = self.root.child(kind.collection()) {
            collect_entries(collection, kind, &mut entries);
        }
        entries
    }

    pub fn contains(&self, kind: ResourceKind, entry: &str) -> bool {
        self.entries(kind).iter().any(|existing| existing == entry)
    }

    /// Add `entry` to the top level of its collection; returns false when it was already listed
    pub fn add(&mut self, kind: ResourceKind, entry: &str) -> bool {
        if self.contains(kind, entry) {
            return false;
        }
        debug!(collection = kind.collection(), entry, "Adding manifest entry");
        let collection = match self.root.children.iter().position(|child| child.name == kind.collection()) {
            Some(index) => &mut self.root.children[index],
            None => {
                self.root
                    .children
                    .push(Element::new(kind.collection()).with_attribute("name", kind.collection()));
                let last = self.root.children.len() - 1;
                &mut self.root.children[last]
            }
        };
        collection.children.push(Element::leaf(kind.entry(), entry));
        true
    }

    /// Remove `entry` wherever it is listed; returns false when it was not
    pub fn remove(&mut self, kind: ResourceKind, entry: &str) -> bool {
        match self.root.child_mut(kind.collection()) {
            Some(collection) => remove_entry(collection, kind, entry),
            None => false,
        }
    }
}

fn collect_entries(folder: &Element, kind: ResourceKind, entries: &mut Vec<String>) {
    for child in &folder.children {
        if child.name == kind.entry() {
            entries.push(child.text().to_string());
        } else if child.name == kind.collection() {
            collect_entries(child, kind, entries);
        }
    }
}

fn remove_entry(folder: &mut Element, kind: ResourceKind, entry: &str) -> bool {
    let before = folder.children.len();
    folder
        .children
        .retain(|child| !(child.name == kind.entry() && child.text() == entry));
    let mut removed = folder.children.len() != before;
    for child in folder.children.iter_mut().filter(|child| child.name == kind.collection()) {
        removed |= remove_entry(child, kind, entry);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<assets>
  <sprites name="sprites">
    <sprite>sprites\spr_player</sprite>
  </sprites>
  <scripts name="scripts">
    <script>scripts\init.gml</script>
    <scripts name="enemies">
      <script>scripts\enemies\spawn.gml</script>
    </scripts>
  </scripts>
  <objects name="objects"/>
</assets>
"#;

    #[test]
    fn test_entries_recurse_into_folders() {
        let project = Project::parse(PROJECT).unwrap();
        assert_eq!(
            project.entries(ResourceKind::Script),
            vec!["scripts\\init.gml", "scripts\\enemies\\spawn.gml"]
        );
        assert_eq!(project.entries(ResourceKind::Sprite), vec!["sprites\\spr_player"]);
        assert!(project.entries(ResourceKind::Room).is_empty());
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut project = Project::parse(PROJECT).unwrap();
        assert!(project.add(ResourceKind::Object, "objects\\Player"));
        assert!(!project.add(ResourceKind::Object, "objects\\Player"));
        assert!(!project.add(ResourceKind::Script, "scripts\\enemies\\spawn.gml"));
        assert_eq!(project.entries(ResourceKind::Object), vec!["objects\\Player"]);
    }

    #[test]
    fn test_add_creates_missing_collection() {
        let mut project = Project::parse(PROJECT).unwrap();
        assert!(project.add(ResourceKind::Room, "rooms\\Level1"));
        assert_eq!(project.entries(ResourceKind::Room), vec!["rooms\\Level1"]);
    }

    #[test]
    fn test_remove_only_the_named_entry() {
        let mut project = Project::parse(PROJECT).unwrap();
        project.add(ResourceKind::Script, "scripts\\later.gml");
        assert!(project.remove(ResourceKind::Script, "scripts\\enemies\\spawn.gml"));
        assert!(!project.remove(ResourceKind::Script, "scripts\\missing.gml"));
        assert_eq!(
            project.entries(ResourceKind::Script),
            vec!["scripts\\init.gml", "scripts\\later.gml"]
        );
    }

    #[test]
    fn test_unmodified_manifest_roundtrip() {
        let project = Project::parse(PROJECT).unwrap();
        let reread = Project::parse(&project.to_xml().unwrap()).unwrap();
        assert_eq!(project, reread);
    }

    #[test]
    fn test_rejects_other_documents() {
        assert!(matches!(
            Project::parse("<object><solid>0</solid></object>"),
            Err(ManifestError::Malformed(_))
        ));
    }

    #[test]
    fn test_entry_names() {
        assert_eq!(directory_of("scripts\\enemies\\spawn.gml"), "scripts");
        assert_eq!(base_name("scripts\\enemies\\spawn.gml"), "spawn.gml");
        assert_eq!(ResourceKind::from_directory("rooms"), Some(ResourceKind::Room));
        assert_eq!(ResourceKind::from_directory("datafiles"), None);
    }
}
