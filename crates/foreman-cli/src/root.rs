use std::path::{Path, PathBuf};

/// Resolve the foreman root directory.
///
/// Priority:
/// 1. `--root` flag / `FOREMAN_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.foreman/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    for marker in [".foreman", ".git"] {
        if let Some(dir) = cwd.ancestors().find(|d| d.join(marker).is_dir()) {
            return dir.to_path_buf();
        }
    }

    cwd
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_foreman_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".foreman")).unwrap();
        let subdir = dir.path().join("src/deep");
        std::fs::create_dir_all(&subdir).unwrap();

        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(&subdir).unwrap();
        let result = resolve_root(None);
        std::env::set_current_dir(original).unwrap();

        assert_eq!(
            result.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
