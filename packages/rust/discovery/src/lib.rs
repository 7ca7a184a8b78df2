//! Example discovery over the examples tree.
//!
//! The tree is scanned once into a [`FileIndex`]; every category's glob
//! patterns are then matched against that index, filtered through the
//! category's exclusion substrings, stripped of their extension, and sorted.
//! Sorting is what makes repeated generator runs byte-identical.

mod pattern;

use std::collections::BTreeSet;
use std::path::Path;

use examplegen_shared::{
    CategoryConfig, DiscoveredItem, DiscoveryConfig, ExampleGenError, Inventory, Result,
};
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

pub use pattern::{GlobPattern, compile_all};

/// File name suffixes that mark an endpoint's deployment definitions.
const DEPLOYMENT_SUFFIXES: [&str; 2] = ["deployment.yml", "deployment.yaml"];

// ---------------------------------------------------------------------------
// FileIndex
// ---------------------------------------------------------------------------

/// Sorted list of every non-hidden file below a root, as `/`-separated
/// root-relative paths.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    files: Vec<String>,
}

impl FileIndex {
    /// Walk the root recursively. Hidden files and directories are skipped,
    /// the same way shell globs skip them. Symlinks are followed; a link
    /// cycle surfaces as an I/O error.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn scan(root: &Path) -> Result<Self> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                ExampleGenError::io(path, source)
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(rel) = relative_path(root, entry.path()) {
                files.push(rel);
            }
        }

        files.sort();
        debug!(files = files.len(), "indexed examples tree");
        Ok(Self { files })
    }

    /// Build an index from known paths (used by tests and dry runs).
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut files: Vec<String> = paths
            .into_iter()
            .map(|p| p.as_ref().replace('\\', "/"))
            .collect();
        files.sort();
        files.dedup();
        Self { files }
    }

    /// Files matching any of the patterns, deduplicated and sorted.
    pub fn matching(&self, patterns: &[GlobPattern]) -> Vec<String> {
        let matched: BTreeSet<&String> = self
            .files
            .iter()
            .filter(|path| patterns.iter().any(|p| p.matches(path)))
            .collect();
        matched.into_iter().cloned().collect()
    }

    /// Files matching a single glob.
    pub fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self.matching(&[GlobPattern::new(pattern)?]))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Main entry points
// ---------------------------------------------------------------------------

/// Scan the root and discover every configured category.
pub fn discover(root: &Path, config: &DiscoveryConfig) -> Result<Inventory> {
    let index = FileIndex::scan(root)?;
    discover_in(&index, config)
}

/// Discover every configured category from an existing index.
#[instrument(skip_all, fields(files = index.len(), categories = config.categories.len()))]
pub fn discover_in(index: &FileIndex, config: &DiscoveryConfig) -> Result<Inventory> {
    let mut inventory = Inventory::default();

    for rules in &config.categories {
        let items = discover_category(index, rules)?;
        info!(category = %rules.category, count = items.len(), "discovered examples");
        *inventory.items_mut(rules.category) = items;
    }

    Ok(inventory)
}

/// Discover one category: match, exclude, strip extension, sort.
pub fn discover_category(index: &FileIndex, rules: &CategoryConfig) -> Result<Vec<DiscoveredItem>> {
    let patterns = compile_all(&rules.patterns)?;
    let extension = rules.category.source_extension();

    let mut paths: BTreeSet<String> = BTreeSet::new();
    for file in index.matching(&patterns) {
        if let Some(excluded) = excluded_by(&file, &rules.excluded) {
            debug!(path = %file, excluded, category = %rules.category, "excluded");
            continue;
        }

        match file.strip_suffix(extension) {
            Some(stem) => {
                paths.insert(stem.to_string());
            }
            None => {
                warn!(
                    path = %file,
                    category = %rules.category,
                    expected = extension,
                    "pattern matched a file with an unexpected extension, skipping"
                );
            }
        }
    }

    Ok(paths
        .into_iter()
        .map(|path| DiscoveredItem::new(path, rules.category))
        .collect())
}

/// Deployment definitions beside an endpoint, sorted by path, with any
/// path containing an excluded substring dropped.
///
/// Returned paths are root-relative and keep their extension, since both
/// `.yml` and `.yaml` deployments are picked up.
#[instrument(skip_all, fields(endpoint = %endpoint.path))]
pub fn find_deployments(
    index: &FileIndex,
    endpoint: &DiscoveredItem,
    excluded: &[String],
) -> Vec<String> {
    let dir = endpoint.project_dir();
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    };

    let deployments: Vec<String> = index
        .files
        .iter()
        .filter_map(|file| {
            let name = file.strip_prefix(&prefix)?;
            // Direct children only
            if name.contains('/') {
                return None;
            }
            DEPLOYMENT_SUFFIXES
                .iter()
                .any(|suffix| name.ends_with(suffix))
                .then(|| file.clone())
        })
        .filter(|file| excluded_by(file, excluded).is_none())
        .collect();

    debug!(count = deployments.len(), "found deployments");
    deployments
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The first exclusion substring contained in the path, if any.
///
/// Substring matching is deliberately loose and can catch unrelated
/// paths (`instance` also excludes `compute-instance-*`).
pub fn excluded_by<'a>(path: &str, excluded: &'a [String]) -> Option<&'a str> {
    let normalized = path.replace('\\', "/");
    excluded
        .iter()
        .find(|needle| normalized.contains(needle.as_str()))
        .map(String::as_str)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
