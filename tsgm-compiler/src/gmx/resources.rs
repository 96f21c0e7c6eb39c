//! Keeping generated files and the manifest in step

use super::project::{directory_of, Project};
use crate::error::ManifestError;
use crate::gml::{binding_to_path, OutputFile, OutputKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check that a generated resource exists on disk and is listed in the manifest
///
/// `rpath` is relative to the project directory, e.g. `scripts\init.gml`.
pub fn validate_resource(rpath: &str, project_file: &Path) -> Result<(), ManifestError> {
    let project = Project::load(project_file)?;
    let project_dir = project_file.parent().unwrap_or(Path::new(""));
    let full_path = binding_to_path(project_dir, rpath);
    if !full_path.exists() {
        return Err(ManifestError::FileNotFound(full_path.display().to_string()));
    }

    let directory = directory_of(rpath);
    let kind = match directory {
        "scripts" => OutputKind::Script,
        "objects" => OutputKind::Object,
        "rooms" => OutputKind::Room,
        _ => return Err(ManifestError::UnsupportedDirectory(directory.to_string())),
    };
    let entry = rpath.strip_suffix(kind.manifest_suffix()).unwrap_or(rpath);
    if !project.contains(kind.resource_kind(), entry) {
        return Err(ManifestError::NotReferenced {
            resource: entry.to_string(),
            project: project_file.display().to_string(),
        });
    }
    Ok(())
}

/// List `file` in the manifest and write it into the project directory
pub fn add_resource(file: &OutputFile, project: &mut Project, project_dir: &Path) -> Result<PathBuf, ManifestError> {
    project.add(file.kind.resource_kind(), &file.xml_name());
    let path = file.path_in(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|error| ManifestError::Io {
            path: parent.to_path_buf(),
            error,
        })?;
    }
    std::fs::write(&path, &file.content).map_err(|error| ManifestError::Io {
        path: path.clone(),
        error,
    })?;
    debug!(path = %path.display(), "Wrote resource");
    Ok(path)
}

/// Drop a previously generated resource from the manifest and delete its file
///
/// `binding` is the project-relative path the file was written to.
pub fn remove_resource(binding: &str, project: &mut Project, project_dir: &Path) -> Result<(), ManifestError> {
    let directory = directory_of(binding);
    let kind = match directory {
        "scripts" => OutputKind::Script,
        "objects" => OutputKind::Object,
        "rooms" => OutputKind::Room,
        _ => return Err(ManifestError::UnknownRemoveDirectory(directory.to_string())),
    };
    let entry = binding.strip_suffix(kind.manifest_suffix()).unwrap_or(binding);
    project.remove(kind.resource_kind(), entry);

    let path = binding_to_path(project_dir, binding);
    if path.exists() {
        std::fs::remove_file(&path).map_err(|error| ManifestError::Io {
            path: path.clone(),
            error,
        })?;
    }
    info!(resource = entry, "Removed stale resource");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmx::ResourceKind;
    use tempfile::TempDir;

    fn project_dir() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let project_file = dir.path().join("game.project.gmx");
        Project::new().save(&project_file).unwrap();
        (dir, project_file)
    }

    #[test]
    fn test_add_then_validate() {
        let (dir, project_file) = project_dir();
        let mut project = Project::load(&project_file).unwrap();
        let file = OutputFile::object("Player", "<object/>".to_string());
        let written = add_resource(&file, &mut project, dir.path()).unwrap();
        assert!(written.ends_with("Player.object.gmx"));
        add_resource(&file, &mut project, dir.path()).unwrap();
        assert_eq!(project.entries(ResourceKind::Object), vec!["objects\\Player"]);
        project.save(&project_file).unwrap();

        validate_resource("objects\\Player.object.gmx", &project_file).unwrap();
    }

    #[test]
    fn test_validation_errors() {
        let (dir, project_file) = project_dir();
        let missing = validate_resource("scripts\\nope.gml", &project_file).unwrap_err();
        assert!(missing.to_string().starts_with("File not found, "), "{missing}");

        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::write(dir.path().join("scripts").join("loose.gml"), "").unwrap();
        let unreferenced = validate_resource("scripts\\loose.gml", &project_file).unwrap_err();
        assert!(
            unreferenced.to_string().starts_with("Resource scripts\\loose.gml not referenced in"),
            "{unreferenced}"
        );

        std::fs::create_dir_all(dir.path().join("sounds")).unwrap();
        std::fs::write(dir.path().join("sounds").join("snd.gmx"), "").unwrap();
        let unsupported = validate_resource("sounds\\snd.gmx", &project_file).unwrap_err();
        assert_eq!(unsupported.to_string(), "Unsupported resource directory, sounds");
    }

    #[test]
    fn test_remove_resource() {
        let (dir, project_file) = project_dir();
        let mut project = Project::load(&project_file).unwrap();
        let keep = OutputFile::script("keep", "return 1;".to_string());
        let stale = OutputFile::script("stale", "return 2;".to_string());
        add_resource(&keep, &mut project, dir.path()).unwrap();
        let stale_path = add_resource(&stale, &mut project, dir.path()).unwrap();

        remove_resource(&stale.binding_path(), &mut project, dir.path()).unwrap();
        assert!(!stale_path.exists());
        assert_eq!(project.entries(ResourceKind::Script), vec!["scripts\\keep.gml"]);

        let error = remove_resource("sprites\\spr", &mut project, dir.path()).unwrap_err();
        assert_eq!(error.to_string(), "Unknown directory to remove resource from, sprites");
    }
}
