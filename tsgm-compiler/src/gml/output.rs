//! Files produced by the GameMaker renderer

use crate::gmx::ResourceKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Script,
    Object,
    Room,
}

impl OutputKind {
    /// Directory next to the `.project.gmx` that holds this kind of file
    pub fn directory(self) -> &'static str {
        self.resource_kind().collection()
    }

    pub fn resource_kind(self) -> ResourceKind {
        match self {
            OutputKind::Script => ResourceKind::Script,
            OutputKind::Object => ResourceKind::Object,
            OutputKind::Room => ResourceKind::Room,
        }
    }

    /// Suffix of the file name that the manifest entry leaves out
    pub fn manifest_suffix(self) -> &'static str {
        match self {
            OutputKind::Script => "",
            OutputKind::Object => ".object.gmx",
            OutputKind::Room => ".room.gmx",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub kind: OutputKind,
    /// Path relative to the kind's directory
    pub rpath: String,
    pub content: String,
}

impl OutputFile {
    pub fn script(name: &str, content: String) -> Self {
        OutputFile {
            kind: OutputKind::Script,
            rpath: format!("{name}.gml"),
            content,
        }
    }

    pub fn object(name: &str, content: String) -> Self {
        OutputFile {
            kind: OutputKind::Object,
            rpath: format!("{name}.object.gmx"),
            content,
        }
    }

    pub fn room(name: &str, content: String) -> Self {
        OutputFile {
            kind: OutputKind::Room,
            rpath: format!("{name}.room.gmx"),
            content,
        }
    }

    /// Path relative to the project directory, `scripts\name.gml`
    pub fn binding_path(&self) -> String {
        format!("{}\\{}", self.kind.directory(), self.rpath)
    }

    /// Entry referencing the resource in the manifest, `objects\Player` for objects
    pub fn xml_name(&self) -> String {
        let name = self.rpath.strip_suffix(self.kind.manifest_suffix()).unwrap_or(&self.rpath);
        format!("{}\\{}", self.kind.directory(), name)
    }

    pub fn file_name(&self) -> &str {
        self.rpath.rsplit(['\\', '/']).next().unwrap_or(&self.rpath)
    }

    pub fn path_in(&self, project_dir: &Path) -> PathBuf {
        binding_to_path(project_dir, &self.binding_path())
    }
}

/// Absolute path of a project-relative `folder\name` path
pub fn binding_to_path(project_dir: &Path, binding: &str) -> PathBuf {
    binding
        .split(['\\', '/'])
        .filter(|part| !part.is_empty())
        .fold(project_dir.to_path_buf(), |path, part| path.join(part))
}
