//! Common functionality and types.

use anyhow::{Context, Result, bail};
use console::Emoji;
use once_cell::sync::Lazy;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

pub static GENERATING: Emoji = Emoji("📦 ", "");
pub static SUCCESS: Emoji = Emoji("✅ ", "");
pub static ERROR: Emoji = Emoji("❌ ", "");
pub static STARTING: Emoji = Emoji("🚀 ", "");
pub static WATCHING: Emoji = Emoji("👀 ", "");

// If we fail to get the current_dir, we can't do much and just fail, so we can use expect(..).
#[allow(clippy::expect_used)]
static CWD: Lazy<PathBuf> =
    Lazy::new(|| std::env::current_dir().expect("error getting current dir"));

/// Checks if path exists.
pub async fn path_exists(path: impl AsRef<Path>) -> Result<bool> {
    tokio::fs::metadata(path.as_ref())
        .await
        .map(|_| true)
        .or_else(|error| {
            if error.kind() == ErrorKind::NotFound {
                Ok(false)
            } else {
                Err(error)
            }
        })
        .with_context(|| {
            format!(
                "error checking for existence of path at {:?}",
                path.as_ref()
            )
        })
}

/// Strip the CWD prefix from the given path.
///
/// Returns `target` unmodified if an error is returned from the operation.
pub fn strip_prefix(target: &Path) -> &Path {
    target.strip_prefix(CWD.as_path()).unwrap_or(target)
}

/// Resolve an output path against a base directory.
///
/// The path must be relative, and must not leave the base directory using `..`.
pub fn target_path(base: &Path, path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty()
        || path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        bail!(
            "Invalid output path '{}'. Must be a relative path without '..'.",
            path.display()
        );
    }
    Ok(base.join(path))
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("app.json", true)]
    #[case("nested/dir/app.yaml", true)]
    #[case("./app.json", true)]
    #[case("", false)]
    #[case("../app.json", false)]
    #[case("nested/../../app.json", false)]
    fn target_paths(#[case] path: &str, #[case] valid: bool) {
        let result = target_path(Path::new("base"), Path::new(path));
        assert_eq!(result.is_ok(), valid, "{result:?}");
    }

    #[cfg(unix)]
    #[test]
    fn absolute_target_path() {
        assert!(target_path(Path::new("base"), Path::new("/etc/app.json")).is_err());
    }

    #[tokio::test]
    async fn exists() {
        let dir = tempfile::tempdir().expect("should be able to create temp directory");
        assert!(path_exists(dir.path()).await.expect("must check"));
        assert!(
            !path_exists(dir.path().join("missing"))
                .await
                .expect("must check")
        );
    }
}
