// src/dotfile.rs

//! Dotfile name translation (spec §3): a stored path component `dot-x`
//! corresponds to a target-side component `.x`. Applied per path
//! component, not just to the final name.

use std::path::{Component, Path, PathBuf};

const STORED_PREFIX: &str = "dot-";

/// Translate a package-stored relative path to its target-side form:
/// each `dot-x` component becomes `.x`.
pub fn to_target(stored: &Path) -> PathBuf {
    translate_components(stored, |component| {
        component
            .strip_prefix(STORED_PREFIX)
            .map(|rest| format!(".{rest}"))
            .unwrap_or_else(|| component.to_string())
    })
}

/// Translate a target-side relative path to its package-stored form:
/// each `.x` component becomes `dot-x`.
pub fn to_stored(target: &Path) -> PathBuf {
    translate_components(target, |component| {
        component
            .strip_prefix('.')
            .filter(|rest| !rest.is_empty())
            .map(|rest| format!("{STORED_PREFIX}{rest}"))
            .unwrap_or_else(|| component.to_string())
    })
}

fn translate_components(path: &Path, f: impl Fn(&str) -> String) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(c) => out.push(f(&c.to_string_lossy())),
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_to_target_single_component() {
        assert_eq!(to_target(Path::new("dot-vimrc")), PathBuf::from(".vimrc"));
    }

    #[test]
    fn stored_to_target_multi_component() {
        assert_eq!(
            to_target(Path::new("dot-ssh/config")),
            PathBuf::from(".ssh/config")
        );
        assert_eq!(
            to_target(Path::new("dot-config/dot-cache/x")),
            PathBuf::from(".config/.cache/x")
        );
    }

    #[test]
    fn non_dotfile_names_pass_through() {
        assert_eq!(to_target(Path::new("bin/script")), PathBuf::from("bin/script"));
        assert_eq!(to_stored(Path::new("bin/script")), PathBuf::from("bin/script"));
    }

    #[test]
    fn target_to_stored_round_trips() {
        let target = Path::new(".config/.cache/x");
        let stored = to_stored(target);
        assert_eq!(stored, PathBuf::from("dot-config/dot-cache/x"));
        assert_eq!(to_target(&stored), target);
    }
}
