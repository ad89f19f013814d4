// src/path.rs

//! Typed absolute paths.
//!
//! `PackagePath`, `TargetPath` and `FilePath` wrap a normalized absolute
//! path string each. They exist so the rest of the core cannot pass a
//! source path where a target path is expected, or vice versa — the
//! classic mixed-up-argument bug becomes a type error instead of a
//! runtime surprise.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

fn validate_absolute(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidPath("empty path".to_string()));
    }
    if !path.is_absolute() {
        return Err(Error::InvalidPath(format!(
            "path must be absolute: {}",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

macro_rules! typed_path {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(PathBuf);

        impl $name {
            pub fn new(path: impl AsRef<Path>) -> Result<Self> {
                Ok(Self(validate_absolute(path.as_ref())?))
            }

            pub fn as_path(&self) -> &Path {
                &self.0
            }

            pub fn join(&self, component: impl AsRef<Path>) -> Self {
                Self(self.0.join(component))
            }

            pub fn parent(&self) -> Option<Self> {
                self.0.parent().map(|p| Self(p.to_path_buf()))
            }

            pub fn equals(&self, other: &Self) -> bool {
                self.0 == other.0
            }

            pub fn file_name(&self) -> Option<&str> {
                self.0.file_name().and_then(|n| n.to_str())
            }

            pub fn starts_with(&self, other: &Self) -> bool {
                self.0.starts_with(&other.0)
            }

            pub fn to_string_lossy(&self) -> String {
                self.0.to_string_lossy().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.display())
            }
        }

        impl AsRef<Path> for $name {
            fn as_ref(&self) -> &Path {
                &self.0
            }
        }
    };
}

typed_path!(PackagePath);
typed_path!(TargetPath);
typed_path!(FilePath);

/// Sanitize a relative path from an untrusted source (package-tree entry).
///
/// Rejects `..` components, skips `.` components, strips leading
/// separators. Used by the Scanner and Adopt before joining onto a
/// `PackagePath`/`TargetPath` root.
pub fn sanitize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    use std::path::Component;

    let path = path.as_ref();
    let path_str = path.to_string_lossy();
    let relative = path_str.trim_start_matches('/');
    let mut normalized = PathBuf::new();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => return Err(Error::PathTraversal(path_str.to_string())),
            Component::Prefix(_) | Component::RootDir => {}
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidPath(
            "empty path after sanitization".to_string(),
        ));
    }

    Ok(normalized)
}

/// Join a root with an untrusted relative path, verifying the result
/// cannot escape the root.
pub fn safe_join(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let root = root.as_ref();
    let sanitized = sanitize_path(path.as_ref())?;
    let joined = root.join(&sanitized);

    if let (Ok(canonical_root), Ok(canonical_joined)) =
        (root.canonicalize(), joined.canonicalize())
        && !canonical_joined.starts_with(&canonical_root)
    {
        return Err(Error::PathTraversal(format!(
            "path {} escapes root {}",
            joined.display(),
            root.display()
        )));
    }

    Ok(joined)
}

/// Compute a relative symlink target from `from` (the link's parent
/// directory) to `to` (the link's intended destination).
pub fn relative_from(from: &Path, to: &Path) -> PathBuf {
    let from_components: Vec<_> = from.components().collect();
    let to_components: Vec<_> = to.components().collect();

    let common = from_components
        .iter()
        .zip(to_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from_components.len() {
        result.push("..");
    }
    for component in &to_components[common..] {
        result.push(component.as_os_str());
    }

    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}

/// Resolve a symlink's raw `read_link` value to an absolute path,
/// joining a relative value against `link_dir` (the link's own parent
/// directory — the `LinkMode::Relative` links `planner/resolver.rs`
/// produces are relative to exactly that directory) and lexically
/// collapsing `.`/`..` components without touching the filesystem.
/// `sanitize_path` rejects `..` outright (it's for untrusted input) and
/// `relative_from` only goes absolute-to-relative, so neither fits
/// resolving a relative symlink target back to absolute.
pub fn resolve_relative(link_dir: &Path, raw_target: &Path) -> PathBuf {
    use std::path::Component;

    if raw_target.is_absolute() {
        return raw_target.to_path_buf();
    }

    let mut out: Vec<Component> = Vec::new();
    for component in link_dir.join(raw_target).components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.into_iter().collect()
}
