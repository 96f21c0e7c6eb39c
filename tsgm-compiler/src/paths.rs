//! Lexical path helpers shared by the require-path and output-path logic

use std::path::{Component, Path, PathBuf};

/// Path rendered with forward slashes
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Resolve `.` and `..` components without touching the file system
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(result.components().next_back(), Some(Component::Normal(_))) && result.pop();
                if !popped {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// `path` relative to `base` when it lies inside it
pub fn strip_root(path: &Path, base: &Path) -> Option<PathBuf> {
    let path = normalize(path);
    let base = normalize(base);
    if base.as_os_str().is_empty() {
        return Some(path);
    }
    path.strip_prefix(&base).ok().map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("./src/../lib/a.ts")), PathBuf::from("lib/a.ts"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_strip_root() {
        assert_eq!(
            strip_root(Path::new("src/folder/Module"), Path::new("./src")),
            Some(PathBuf::from("folder/Module"))
        );
        assert_eq!(strip_root(Path::new("folder/Module"), Path::new(".")), Some(PathBuf::from("folder/Module")));
        assert_eq!(strip_root(Path::new("../Module"), Path::new("src")), None);
    }
}
