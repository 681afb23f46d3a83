//! Finding definition files.

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use globset::GlobSet;
use std::path::{Path, PathBuf};

/// Recursively scans a directory for definition files.
///
/// Patterns are matched against the path relative to the scanned root.
#[derive(Clone, Debug)]
pub struct Scanner {
    include: GlobSet,
    exclude: GlobSet,
}

impl Scanner {
    pub fn new(include: GlobSet, exclude: GlobSet) -> Self {
        Self { include, exclude }
    }

    /// Check if a path, relative to the root, selects a definition file.
    pub fn matches(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    /// Find all definition files below `root`, in a stable order.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn find(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        self.walk(root, root, &mut found).await?;
        found.sort();

        tracing::debug!("found {} definition(s) in {}", found.len(), root.display());
        Ok(found)
    }

    fn walk<'a>(
        &'a self,
        root: &'a Path,
        dir: &'a Path,
        found: &'a mut Vec<PathBuf>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut read_dir = tokio::fs::read_dir(dir)
                .await
                .with_context(|| format!("error reading directory '{}'", dir.display()))?;

            while let Some(entry) = read_dir
                .next_entry()
                .await
                .with_context(|| format!("error reading entries of '{}'", dir.display()))?
            {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    self.walk(root, &path, found).await?;
                    continue;
                }

                let relative = path.strip_prefix(root).unwrap_or(&path);
                if self.matches(relative) {
                    found.push(path);
                }
            }

            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use globset::{Glob, GlobSetBuilder};
    use std::fs;

    fn glob_set(patterns: &[&str]) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern).expect("valid pattern"));
        }
        builder.build().expect("valid glob set")
    }

    fn scanner() -> Scanner {
        Scanner::new(
            glob_set(&["**/*.confgen.{toml,yaml,yml,json}"]),
            glob_set(&["**/.git/**", "**/node_modules/**", "**/target/**"]),
        )
    }

    #[tokio::test]
    async fn find_sorted() {
        let dir = tempfile::tempdir().expect("should be able to create temp directory");
        let root = dir.path();
        for path in [
            "z.confgen.toml",
            "a/b.confgen.yaml",
            "a.confgen.json",
            "a/nested/c.confgen.yml",
            "README.md",
            "app.toml",
            "node_modules/pkg/x.confgen.json",
            ".git/y.confgen.json",
            "crate/target/z.confgen.json",
        ] {
            let path = root.join(path);
            fs::create_dir_all(path.parent().expect("has parent")).expect("must create dir");
            fs::write(path, "").expect("must write file");
        }

        let found = scanner().find(root).await.expect("must scan");
        let found = found
            .iter()
            .map(|path| path.strip_prefix(root).expect("below root"))
            .collect::<Vec<_>>();

        assert_eq!(
            found,
            [
                Path::new("a/b.confgen.yaml"),
                Path::new("a/nested/c.confgen.yml"),
                Path::new("a.confgen.json"),
                Path::new("z.confgen.toml"),
            ]
        );
    }

    #[tokio::test]
    async fn missing_root() {
        let dir = tempfile::tempdir().expect("should be able to create temp directory");
        assert!(scanner().find(&dir.path().join("missing")).await.is_err());
    }

    #[test]
    fn matches_relative() {
        let scanner = scanner();
        assert!(scanner.matches(Path::new("app.confgen.toml")));
        assert!(scanner.matches(Path::new("deep/er/app.confgen.json")));
        assert!(!scanner.matches(Path::new("target/app.confgen.toml")));
        assert!(!scanner.matches(Path::new("app.confgen.ini")));
    }
}
