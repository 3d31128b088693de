//! Archive packaging for ADD/COPY
//!
//! Sources are glob patterns rooted at the build context. [`CopyPlan`] applies
//! the destination rule and decides where each source lands; [`build_archive`]
//! writes the tar stream that is extracted into the container at
//! [`CopyPlan::upload_root`].
//!
//! Destination rule:
//!
//! - no trailing `/` and exactly one matched source: the destination is the
//!   target name and its parent directory is the upload root,
//! - trailing `/` (or a final `.`/`..` component): the destination is a
//!   directory; files keep their base name inside it. The archive is
//!   extracted at `/` with the full destination path in every entry name, so
//!   missing parent directories are created by the extraction,
//! - no trailing `/` with several sources is rejected.
//!
//! Directories contribute their contents, recursively.

use crate::error::ArchiveError;
use std::path::{Component, Path, PathBuf};

/// A matched source, relative to the build context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePath {
    pub relative: PathBuf,
    pub is_dir: bool,
}

/// One source and the path it takes inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub source: PathBuf,
    pub is_dir: bool,
    /// Path inside the archive; empty for a directory extracted straight into the upload root
    pub name: String,
}

/// Where the archive is extracted and what goes into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    pub upload_root: String,
    pub entries: Vec<ArchiveEntry>,
}

/// Expands one source pattern against the build context
///
/// Matches are returned relative to `base_dir`, in glob order. A match that
/// escapes the context is an error.
pub fn expand_source(base_dir: &Path, pattern: &str) -> Result<Vec<SourcePath>, ArchiveError> {
    let base_dir = base_dir.canonicalize().map_err(|source| ArchiveError::Io {
        path: base_dir.to_path_buf(),
        source,
    })?;
    let base_dir = base_dir.as_path();
    let base = glob::Pattern::escape(&base_dir.to_string_lossy());
    let full = format!("{}/{}", base.trim_end_matches('/'), pattern.trim_start_matches('/'));

    let paths = glob::glob(&full).map_err(|source| ArchiveError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut matched = Vec::new();
    for path in paths {
        let path = path?;
        let relative = path
            .strip_prefix(base_dir)
            .map(Path::to_path_buf)
            .map_err(|_| ArchiveError::OutsideContext(path.clone()))?;
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ArchiveError::OutsideContext(path));
        }
        matched.push(SourcePath {
            is_dir: path.is_dir(),
            relative,
        });
    }
    Ok(matched)
}

/// Resolves a container path against the working directory and normalizes it
pub fn resolve_container_path(path: &str, workdir: Option<&str>) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", workdir.unwrap_or("/"), path)
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Splits a normalized absolute path into parent directory and final component
fn split_parent(path: &str) -> (String, String) {
    match path.rfind('/') {
        Some(0) => ("/".to_string(), path[1..].to_string()),
        Some(i) => (path[..i].to_string(), path[i + 1..].to_string()),
        None => ("/".to_string(), path.to_string()),
    }
}

fn names_directory(destination: &str) -> bool {
    destination.ends_with('/')
        || matches!(destination.rsplit('/').next(), Some(".") | Some(".."))
}

fn entry_name(prefix: &str, source: &SourcePath) -> String {
    let base = if source.is_dir {
        None
    } else {
        source
            .relative
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    };
    match (prefix.is_empty(), base) {
        (_, None) => prefix.to_string(),
        (true, Some(base)) => base,
        (false, Some(base)) => format!("{}/{}", prefix, base),
    }
}

impl CopyPlan {
    /// Applies the destination rule; the error is an explanation for the user
    pub fn new(
        sources: Vec<SourcePath>,
        destination: &str,
        workdir: Option<&str>,
    ) -> Result<Self, String> {
        let target = resolve_container_path(destination, workdir);

        if !names_directory(destination) {
            if sources.len() != 1 {
                return Err(format!(
                    "Destination directory must end with a slash when copying {} sources",
                    sources.len()
                ));
            }
            let (upload_root, name) = split_parent(&target);
            let entries = sources
                .into_iter()
                .map(|source| ArchiveEntry {
                    source: source.relative,
                    is_dir: source.is_dir,
                    name: name.clone(),
                })
                .collect();
            return Ok(Self {
                upload_root,
                entries,
            });
        }

        let prefix = target.trim_start_matches('/');
        let entries = sources
            .into_iter()
            .map(|source| ArchiveEntry {
                name: entry_name(prefix, &source),
                source: source.relative,
                is_dir: source.is_dir,
            })
            .collect();
        Ok(Self {
            upload_root: "/".to_string(),
            entries,
        })
    }
}

/// Writes a tar archive containing the planned entries, reading from `base_dir`
pub fn build_archive(base_dir: &Path, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);

    for entry in entries {
        let origin = base_dir.join(&entry.source);
        let result = if entry.is_dir {
            builder.append_dir_all(&entry.name, &origin)
        } else {
            builder.append_path_with_name(&origin, &entry.name)
        };
        result.map_err(|source| ArchiveError::Io {
            path: origin.clone(),
            source,
        })?;
    }

    builder.into_inner().map_err(|source| ArchiveError::Io {
        path: base_dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn file(relative: &str) -> SourcePath {
        SourcePath {
            relative: PathBuf::from(relative),
            is_dir: false,
        }
    }

    fn dir(relative: &str) -> SourcePath {
        SourcePath {
            relative: PathBuf::from(relative),
            is_dir: true,
        }
    }

    fn names(plan: &CopyPlan) -> Vec<&str> {
        plan.entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn archive_names(archive: &[u8]) -> Vec<String> {
        let mut archive = tar::Archive::new(archive);
        archive
            .entries()
            .unwrap()
            .map(|e| {
                e.unwrap()
                    .path()
                    .unwrap()
                    .to_string_lossy()
                    .trim_end_matches('/')
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_single_source_without_slash_renames() {
        let plan = CopyPlan::new(vec![file("src.txt")], "dest.txt", None).unwrap();
        assert_eq!(plan.upload_root, "/");
        assert_eq!(names(&plan), vec!["dest.txt"]);

        let plan = CopyPlan::new(vec![file("src.txt")], "/etc/app/conf.txt", None).unwrap();
        assert_eq!(plan.upload_root, "/etc/app");
        assert_eq!(names(&plan), vec!["conf.txt"]);
    }

    #[test]
    fn test_trailing_slash_keeps_basename() {
        let plan = CopyPlan::new(vec![file("sub/src.txt")], "dest/", None).unwrap();
        assert_eq!(plan.upload_root, "/");
        assert_eq!(names(&plan), vec!["dest/src.txt"]);

        let plan = CopyPlan::new(vec![file("a.txt"), file("b.txt")], "/opt/app/", None).unwrap();
        assert_eq!(plan.upload_root, "/");
        assert_eq!(names(&plan), vec!["opt/app/a.txt", "opt/app/b.txt"]);
    }

    #[test]
    fn test_multiple_sources_need_trailing_slash() {
        let err = CopyPlan::new(vec![file("a.txt"), file("b.txt")], "dest", None).unwrap_err();
        assert!(err.contains("must end with a slash"));
    }

    #[test]
    fn test_no_sources_need_trailing_slash() {
        assert!(CopyPlan::new(vec![], "dest", None).is_err());
    }

    #[test]
    fn test_root_destination() {
        let plan = CopyPlan::new(vec![file("a.txt")], "/", None).unwrap();
        assert_eq!(plan.upload_root, "/");
        assert_eq!(names(&plan), vec!["a.txt"]);
    }

    #[test]
    fn test_directory_contents_land_in_destination() {
        let plan = CopyPlan::new(vec![dir("site")], "/var/www/", None).unwrap();
        assert_eq!(plan.upload_root, "/");
        assert_eq!(names(&plan), vec!["var/www"]);
    }

    #[test]
    fn test_relative_destination_uses_workdir() {
        let plan = CopyPlan::new(vec![file("a.txt")], "conf/", Some("/app")).unwrap();
        assert_eq!(plan.upload_root, "/");
        assert_eq!(names(&plan), vec!["app/conf/a.txt"]);

        let plan = CopyPlan::new(vec![file("a.txt"), file("b.txt")], ".", Some("/app")).unwrap();
        assert_eq!(plan.upload_root, "/");
        assert_eq!(names(&plan), vec!["app/a.txt", "app/b.txt"]);
    }

    #[test]
    fn test_resolve_container_path() {
        assert_eq!(resolve_container_path("/a/./b/../c", None), "/a/c");
        assert_eq!(resolve_container_path("x", Some("/srv")), "/srv/x");
        assert_eq!(resolve_container_path("x", Some("srv")), "/srv/x");
        assert_eq!(resolve_container_path("..", None), "/");
    }

    #[test]
    fn test_expand_source_globs_relative_to_context() {
        let context = TempDir::new().unwrap();
        fs::write(context.path().join("a.txt"), "a").unwrap();
        fs::write(context.path().join("b.txt"), "b").unwrap();
        fs::write(context.path().join("c.md"), "c").unwrap();
        fs::create_dir(context.path().join("docs")).unwrap();

        let matched = expand_source(context.path(), "*.txt").unwrap();
        assert_eq!(matched, vec![file("a.txt"), file("b.txt")]);

        let matched = expand_source(context.path(), "/docs").unwrap();
        assert_eq!(matched, vec![dir("docs")]);

        assert!(expand_source(context.path(), "missing.txt").unwrap().is_empty());
    }

    #[test]
    #[serial]
    fn test_expand_source_from_relative_context() {
        let context = TempDir::new().unwrap();
        fs::create_dir(context.path().join("a b")).unwrap();
        fs::write(context.path().join("a b/c.txt"), "c").unwrap();
        fs::write(context.path().join("src.txt"), "s").unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(context.path()).unwrap();
        let spaced = expand_source(Path::new("."), "a b/*.txt");
        let dotted = expand_source(Path::new("./"), "src.txt");
        std::env::set_current_dir(previous).unwrap();

        assert_eq!(spaced.unwrap(), vec![file("a b/c.txt")]);
        assert_eq!(dotted.unwrap(), vec![file("src.txt")]);
    }

    #[test]
    fn test_expand_source_missing_context() {
        let outer = TempDir::new().unwrap();
        assert!(matches!(
            expand_source(&outer.path().join("gone"), "*.txt"),
            Err(ArchiveError::Io { .. })
        ));
    }

    #[test]
    fn test_expand_source_rejects_escape() {
        let outer = TempDir::new().unwrap();
        let context = outer.path().join("ctx");
        fs::create_dir(&context).unwrap();
        fs::write(outer.path().join("secret.txt"), "s").unwrap();

        assert!(matches!(
            expand_source(&context, "../secret.txt"),
            Err(ArchiveError::OutsideContext(_))
        ));
    }

    #[test]
    fn test_build_archive_names_entries() {
        let context = TempDir::new().unwrap();
        fs::write(context.path().join("a.txt"), "hello").unwrap();
        fs::create_dir_all(context.path().join("site/css")).unwrap();
        fs::write(context.path().join("site/index.html"), "<html>").unwrap();
        fs::write(context.path().join("site/css/main.css"), "body{}").unwrap();

        let entries = vec![
            ArchiveEntry {
                source: PathBuf::from("a.txt"),
                is_dir: false,
                name: "app/renamed.txt".to_string(),
            },
            ArchiveEntry {
                source: PathBuf::from("site"),
                is_dir: true,
                name: "www".to_string(),
            },
        ];
        let archive = build_archive(context.path(), &entries).unwrap();
        let names = archive_names(&archive);

        assert!(names.contains(&"app/renamed.txt".to_string()));
        assert!(names.contains(&"www/index.html".to_string()));
        assert!(names.contains(&"www/css/main.css".to_string()));
    }

    #[test]
    fn test_build_archive_missing_source() {
        let context = TempDir::new().unwrap();
        let entries = vec![ArchiveEntry {
            source: PathBuf::from("gone.txt"),
            is_dir: false,
            name: "gone.txt".to_string(),
        }];
        assert!(matches!(
            build_archive(context.path(), &entries),
            Err(ArchiveError::Io { .. })
        ));
    }
}
