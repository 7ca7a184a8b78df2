//! Core domain types for discovered examples.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The kind of example a definition file describes.
///
/// Each category drives its own workflow template and README table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Command job or pipeline job.
    Job,
    /// Pipeline job whose components are pulled from a shared registry.
    RegistryJob,
    /// Online or batch endpoint (with sibling deployments).
    Endpoint,
    /// Workspace resource such as a compute target.
    Resource,
    /// Asset such as data, an environment, or a model.
    Asset,
    /// Top-level shell script.
    Script,
    /// Job schedule.
    Schedule,
}

impl Category {
    /// All categories in discovery order.
    pub const ALL: [Category; 7] = [
        Category::Job,
        Category::RegistryJob,
        Category::Endpoint,
        Category::Resource,
        Category::Asset,
        Category::Script,
        Category::Schedule,
    ];

    /// Extension of the definition file on disk (including the dot).
    pub fn source_extension(self) -> &'static str {
        match self {
            Category::Script => ".sh",
            _ => ".yml",
        }
    }

    /// Prefix of the generated workflow name.
    pub fn workflow_prefix(self) -> &'static str {
        match self {
            Category::Script => "cli-scripts-",
            Category::Schedule => "cli-schedules-",
            _ => "cli-",
        }
    }

    /// Suffix of the generated workflow name.
    ///
    /// Registry jobs share their source file with a plain job, so their
    /// workflow needs a distinct name.
    pub fn workflow_suffix(self) -> &'static str {
        match self {
            Category::RegistryJob => "-registry",
            _ => "",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Job => "job",
            Category::RegistryJob => "registry-job",
            Category::Endpoint => "endpoint",
            Category::Resource => "resource",
            Category::Asset => "asset",
            Category::Script => "script",
            Category::Schedule => "schedule",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// DiscoveredItem
// ---------------------------------------------------------------------------

/// A discovered example definition, identified by its root-relative path
/// without extension (always `/`-separated).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscoveredItem {
    /// Root-relative path without extension, e.g. `jobs/basics/hello-world-job`.
    pub path: String,
    /// Category the item was discovered under.
    pub category: Category,
}

impl DiscoveredItem {
    /// Create an item, normalizing OS separators to `/`.
    pub fn new(path: impl AsRef<str>, category: Category) -> Self {
        Self {
            path: path.as_ref().replace('\\', "/"),
            category,
        }
    }

    /// Last path segment, e.g. `hello-world-job`.
    pub fn filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Everything before the last segment, e.g. `jobs/basics`. Empty for
    /// top-level items.
    pub fn project_dir(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }

    /// Name of the directory directly containing the item.
    pub fn folder_name(&self) -> &str {
        let dir = self.project_dir();
        dir.rsplit('/').next().unwrap_or(dir)
    }

    /// Number of directories between the root and the item.
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }

    /// Path with `/` replaced by `-`, used as a unique identifier.
    pub fn hyphenated(&self) -> String {
        self.path.replace('/', "-")
    }

    /// Name of the generated workflow, e.g. `cli-jobs-basics-hello-world-job`.
    pub fn workflow_name(&self) -> String {
        format!(
            "{}{}{}",
            self.category.workflow_prefix(),
            self.hyphenated(),
            self.category.workflow_suffix()
        )
    }

    /// File name of the generated workflow.
    pub fn workflow_file(&self) -> String {
        format!("{}.yml", self.workflow_name())
    }

    /// Root-relative path of the definition file, with extension.
    pub fn source_file(&self) -> String {
        format!("{}{}", self.path, self.category.source_extension())
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Sorted, filtered item lists for every category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub jobs: Vec<DiscoveredItem>,
    pub registry_jobs: Vec<DiscoveredItem>,
    pub endpoints: Vec<DiscoveredItem>,
    pub resources: Vec<DiscoveredItem>,
    pub assets: Vec<DiscoveredItem>,
    pub scripts: Vec<DiscoveredItem>,
    pub schedules: Vec<DiscoveredItem>,
}

impl Inventory {
    /// Items discovered for one category.
    pub fn items(&self, category: Category) -> &[DiscoveredItem] {
        match category {
            Category::Job => &self.jobs,
            Category::RegistryJob => &self.registry_jobs,
            Category::Endpoint => &self.endpoints,
            Category::Resource => &self.resources,
            Category::Asset => &self.assets,
            Category::Script => &self.scripts,
            Category::Schedule => &self.schedules,
        }
    }

    /// Mutable access to one category's list.
    pub fn items_mut(&mut self, category: Category) -> &mut Vec<DiscoveredItem> {
        match category {
            Category::Job => &mut self.jobs,
            Category::RegistryJob => &mut self.registry_jobs,
            Category::Endpoint => &mut self.endpoints,
            Category::Resource => &mut self.resources,
            Category::Asset => &mut self.assets,
            Category::Script => &mut self.scripts,
            Category::Schedule => &mut self.schedules,
        }
    }

    /// All items in workflow emission order.
    pub fn iter(&self) -> impl Iterator<Item = &DiscoveredItem> {
        Category::ALL
            .into_iter()
            .flat_map(move |category| self.items(category).iter())
    }

    /// Total number of items across categories.
    pub fn len(&self) -> usize {
        Category::ALL
            .iter()
            .map(|category| self.items(*category).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
