//! Declarations for the resources of an existing GameMaker project
//!
//! Sprites, sounds, rooms and the other assets created in the editor are
//! globals in GML. Declaring them as constants lets source files refer to
//! them without type errors. Resources the compiler generated itself (those
//! listed in `bindings.json`) already have a source declaration and are
//! left out.

use crate::gmx::{base_name, directory_of, Project, ResourceKind};
use crate::pipeline::read_bindings;
use crate::{CompilerError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Type given to the resources of a collection
fn declared_type(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Sprite => "Sprite",
        ResourceKind::Sound => "Sound",
        ResourceKind::Background => "Background",
        ResourceKind::Path => "Path",
        ResourceKind::Script => "Function",
        ResourceKind::Shader => "Shader",
        ResourceKind::Font => "Font",
        ResourceKind::Timeline => "Timeline",
        ResourceKind::Object => "GMObject",
        ResourceKind::Room => "Room",
    }
}

/// Identifier of the resource behind a manifest entry
fn resource_name(kind: ResourceKind, entry: &str) -> &str {
    let name = base_name(entry);
    match kind {
        ResourceKind::Script => name.strip_suffix(".gml").unwrap_or(name),
        ResourceKind::Shader => name.strip_suffix(".shader").unwrap_or(name),
        _ => name,
    }
}

/// Path a generated resource is recorded under in `bindings.json`
fn binding_of(kind: ResourceKind, entry: &str) -> String {
    match directory_of(entry) {
        "objects" if kind == ResourceKind::Object => format!("{entry}.object.gmx"),
        "rooms" if kind == ResourceKind::Room => format!("{entry}.room.gmx"),
        _ => entry.to_string(),
    }
}

/// `declare const` lines for every resource of `project` not in `bindings`
pub fn render_definitions(project: &Project, bindings: &[String]) -> String {
    let mut content = String::new();
    for kind in ResourceKind::ALL {
        for entry in project.entries(kind) {
            if bindings.contains(&binding_of(kind, &entry)) {
                debug!(entry = %entry, "Skipping generated resource");
                continue;
            }
            content.push_str(&format!(
                "declare const {}: {};\n",
                resource_name(kind, &entry),
                declared_type(kind)
            ));
        }
    }
    content
}

/// Write the declarations of the resources of `project_file` to `out_file`
///
/// Returns the written text.
pub fn extract_definitions(project_file: &Path, out_file: &Path) -> Result<String> {
    let project = Project::load(project_file)?;
    let project_dir = project_file.parent().unwrap_or(Path::new(""));
    let bindings = read_bindings(project_dir)?;
    let content = render_definitions(&project, &bindings);

    if let Some(parent) = out_file.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|error| CompilerError::Io {
            path: parent.to_path_buf(),
            error,
        })?;
    }
    std::fs::write(out_file, &content).map_err(|error| CompilerError::Io {
        path: out_file.to_path_buf(),
        error,
    })?;
    info!(
        path = %out_file.display(),
        declarations = content.lines().count(),
        "Extracted resource definitions"
    );
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_project() -> Project {
        let mut project = Project::new();
        project.add(ResourceKind::Sprite, "sprites\\spr_player");
        project.add(ResourceKind::Sound, "sound\\snd_jump");
        project.add(ResourceKind::Script, "scripts\\scr_legacy.gml");
        project.add(ResourceKind::Script, "scripts\\generated.gml");
        project.add(ResourceKind::Shader, "shaders\\sh_glow.shader");
        project.add(ResourceKind::Object, "objects\\obj_wall");
        project.add(ResourceKind::Object, "objects\\Player");
        project.add(ResourceKind::Room, "rooms\\rm_start");
        project
    }

    #[test]
    fn test_every_collection_is_declared() {
        let content = render_definitions(&sample_project(), &[]);
        assert_eq!(
            content,
            "declare const spr_player: Sprite;\n\
             declare const snd_jump: Sound;\n\
             declare const scr_legacy: Function;\n\
             declare const generated: Function;\n\
             declare const sh_glow: Shader;\n\
             declare const obj_wall: GMObject;\n\
             declare const Player: GMObject;\n\
             declare const rm_start: Room;\n"
        );
    }

    #[test]
    fn test_generated_resources_are_skipped() {
        let bindings = vec![
            "scripts\\generated.gml".to_string(),
            "objects\\Player.object.gmx".to_string(),
        ];
        let content = render_definitions(&sample_project(), &bindings);
        assert!(!content.contains("generated"), "{content}");
        assert!(!content.contains("Player"), "{content}");
        assert!(content.contains("declare const obj_wall: GMObject;"), "{content}");
    }

    #[test]
    fn test_rooms_match_room_bindings() {
        let bindings = vec!["rooms\\rm_start.room.gmx".to_string()];
        let content = render_definitions(&sample_project(), &bindings);
        assert!(!content.contains("rm_start"), "{content}");
    }

    #[test]
    fn test_extract_writes_file() {
        let dir = TempDir::new().unwrap();
        let project_file = dir.path().join("game.project.gmx");
        sample_project().save(&project_file).unwrap();
        std::fs::write(dir.path().join("bindings.json"), r#"["scripts\\generated.gml"]"#).unwrap();

        let out_file = dir.path().join("typings").join("project.d.ts");
        let content = extract_definitions(&project_file, &out_file).unwrap();
        assert_eq!(std::fs::read_to_string(&out_file).unwrap(), content);
        assert_eq!(content.lines().count(), 7);
    }

    #[test]
    fn test_missing_project() {
        let dir = TempDir::new().unwrap();
        let error = extract_definitions(&dir.path().join("none.project.gmx"), &dir.path().join("out.d.ts")).unwrap_err();
        assert!(error.to_string().contains("File not found"), "{error}");
    }
}
