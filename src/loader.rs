//! Source loading
//!
//! Walks a directory tree and reads every YANG file into a
//! [`YangTextSource`]. Files are returned sorted by path so a build over the
//! same directory always sees the same order.

use crate::config::LoaderConfig;
use crate::error::Result;
use crate::source::YangTextSource;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Find every source file below `root` that the configuration accepts
pub fn discover(root: &Path, config: &LoaderConfig) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !config.skip_prefixes.iter().any(|p| name.starts_with(p.as_str()))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| config.extensions.iter().any(|wanted| ext == wanted.as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    paths
}

/// Load all sources from a directory
pub fn load_from_directory(root: &Path, config: &LoaderConfig) -> Result<Vec<YangTextSource>> {
    let paths = discover(root, config);
    debug!(root = %root.display(), files = paths.len(), "Loading YANG sources");
    paths.iter().map(|path| Ok(YangTextSource::from_path(path)?)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_filters_by_extension_and_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.yang"), "module b {}").unwrap();
        fs::write(dir.path().join("a.yang"), "module a {}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join(".hidden").join("c.yang"), "module c {}").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("d.yang"), "module d {}").unwrap();

        let config = LoaderConfig { extensions: vec!["yang".into()], skip_prefixes: vec![".".into()] };
        let sources = load_from_directory(dir.path(), &config).unwrap();
        let texts: Vec<&str> = sources.iter().map(|s| s.text()).collect();
        assert_eq!(texts, vec!["module a {}", "module b {}", "module d {}"]);
        assert!(sources[0].name().ends_with("a.yang"));
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sources = load_from_directory(&dir.path().join("absent"), &LoaderConfig::default()).unwrap();
        assert!(sources.is_empty());
    }
}
