//! Generator configuration for examplegen.
//!
//! The config lives next to the scanned examples as `examplegen.toml`.
//! CLI flags override the config file, which overrides built-in defaults.
//! The defaults reproduce the examples repository's own conventions.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExampleGenError, Result};
use crate::types::Category;

/// Default configuration file name, looked up in the scanned root.
pub const CONFIG_FILE_NAME: &str = "examplegen.toml";

// ---------------------------------------------------------------------------
// Config structs (matching examplegen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level generator config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// CI constants baked into generated workflows and badges.
    #[serde(default)]
    pub ci: CiConfig,

    /// Notebook normalization.
    #[serde(default)]
    pub notebooks: NotebookConfig,

    /// Endpoint deployment lookup.
    #[serde(default)]
    pub deployments: DeploymentsConfig,

    /// Discovery rules, one entry per category.
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            ci: CiConfig::default(),
            notebooks: NotebookConfig::default(),
            deployments: DeploymentsConfig::default(),
            categories: default_categories(),
        }
    }
}

/// `[ci]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiConfig {
    /// GitHub `owner/name` hosting the workflows (used for badges).
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Branch the workflows and badges target.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Stride of the generated cron hour field.
    #[serde(default = "default_hours_between_runs")]
    pub hours_between_runs: u32,

    /// Credentials placeholder passed to the login step.
    #[serde(default = "default_credentials")]
    pub credentials: String,

    /// Output directory for workflows, relative to the scanned root.
    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: String,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            branch: default_branch(),
            hours_between_runs: default_hours_between_runs(),
            credentials: default_credentials(),
            workflows_dir: default_workflows_dir(),
        }
    }
}

fn default_repository() -> String {
    "Azure/azureml-examples".into()
}
fn default_branch() -> String {
    "main".into()
}
fn default_hours_between_runs() -> u32 {
    12
}
fn default_credentials() -> String {
    "${{secrets.AZUREML_CREDENTIALS}}".into()
}
fn default_workflows_dir() -> String {
    "../.github/workflows".into()
}

/// `[notebooks]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookConfig {
    /// Whether notebooks are normalized at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Kernel descriptor written into every notebook's metadata.
    #[serde(default)]
    pub kernelspec: KernelSpec,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kernelspec: KernelSpec::default(),
        }
    }
}

/// `[notebooks.kernelspec]` table. Field order matches the serialized
/// notebook metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub display_name: String,
    pub language: String,
    pub name: String,
}

impl Default for KernelSpec {
    fn default() -> Self {
        Self {
            display_name: "Python 3.8 - AzureML".into(),
            language: "python".into(),
            name: "python38-azureml".into(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[deployments]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentsConfig {
    /// Deployment files whose path contains any of these are not deployed.
    #[serde(default = "default_excluded_deployments")]
    pub excluded: Vec<String>,
}

impl Default for DeploymentsConfig {
    fn default() -> Self {
        Self {
            excluded: default_excluded_deployments(),
        }
    }
}

fn default_excluded_deployments() -> Vec<String> {
    strings(&[
        "minimal-multimodel-deployment",
        "minimal-single-model-conda-in-dockerfile-deployment",
        "mlflow-deployment",
        "r-deployment",
        "torchserve-deployment",
        "triton-cc-deployment",
        "2-sai-deployment",
        "kubernetes-green-deployment",
    ])
}

/// `[[categories]]` entry: discovery rules for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Which category these rules discover.
    pub category: Category,
    /// Root-relative glob patterns (`**`, `*`, `?`).
    pub patterns: Vec<String>,
    /// Paths containing any of these substrings are dropped.
    #[serde(default)]
    pub excluded: Vec<String>,
}

fn default_categories() -> Vec<CategoryConfig> {
    let excluded_jobs = strings(&[
        "java",
        "spark-job-component",
        "storage_pe",
        "user-assigned-identity",
    ]);

    vec![
        CategoryConfig {
            category: Category::Job,
            patterns: strings(&[
                "jobs/**/*job*.yml",
                "jobs/basics/*.yml",
                "jobs/*/basics/**/*job*.yml",
                "jobs/pipelines/**/*pipeline*.yml",
                "jobs/spark/*.yml",
                "jobs/automl-standalone-jobs/**/cli-automl-*.yml",
                "jobs/pipelines-with-components/**/*pipeline*.yml",
                "jobs/automl-standalone-jobs/**/*cli-automl*.yml",
                "responsible-ai/**/cli-*.yml",
                "jobs/parallel/**/*pipeline*.yml",
            ]),
            excluded: excluded_jobs.clone(),
        },
        CategoryConfig {
            category: Category::RegistryJob,
            patterns: strings(&["jobs/pipelines-with-components/basics/**/*pipeline*.yml"]),
            excluded: excluded_jobs,
        },
        CategoryConfig {
            category: Category::Endpoint,
            patterns: strings(&["endpoints/**/*endpoint.yml"]),
            excluded: strings(&[
                "1-uai-create-endpoint",
                "1-sai-create-endpoint",
                "tfserving-endpoint",
            ]),
        },
        CategoryConfig {
            category: Category::Resource,
            patterns: strings(&["resources/**/*.yml"]),
            excluded: strings(&[
                "workspace",
                "datastore",
                "vm-attach",
                "instance",
                "connections",
                "compute/cluster-user-identity",
                "compute/attached-spark",
                "compute/attached-spark-system-identity",
                "compute/attached-spark-user-identity",
                "registry",
            ]),
        },
        CategoryConfig {
            category: Category::Asset,
            patterns: strings(&["assets/**/*.yml"]),
            excluded: strings(&["conda-yamls", "mlflow-models"]),
        },
        CategoryConfig {
            category: Category::Script,
            patterns: strings(&["*.sh"]),
            excluded: strings(&[
                "setup",
                "cleanup",
                "run-job",
                "run-pipeline-job-with-registry-components",
                "deploy-custom-container-multimodel-minimal",
                "run-pipeline-jobs",
            ]),
        },
        CategoryConfig {
            category: Category::Schedule,
            patterns: strings(&["schedules/**/*schedule.yml"]),
            excluded: Vec::new(),
        },
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

// ---------------------------------------------------------------------------
// Discovery config (runtime view handed to the discovery crate)
// ---------------------------------------------------------------------------

/// Runtime discovery configuration: the category rules plus the
/// deployment deny-list, detached from the rest of the config.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Rules per category. Categories without an entry discover nothing.
    pub categories: Vec<CategoryConfig>,
    /// Deployment deny-list for endpoint workflows.
    pub excluded_deployments: Vec<String>,
}

impl From<&GeneratorConfig> for DiscoveryConfig {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            categories: config.categories.clone(),
            excluded_deployments: config.deployments.excluded.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the config file for a scanned root.
pub fn config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Load the config for a root. Returns defaults if the file does not exist.
pub fn load_config(root: &Path) -> Result<GeneratorConfig> {
    let path = config_file_path(root);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(GeneratorConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<GeneratorConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ExampleGenError::io(path, e))?;

    let config: GeneratorConfig = toml::from_str(&content).map_err(|e| {
        ExampleGenError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate_config(&config)?;
    tracing::debug!(?path, "loaded config file");
    Ok(config)
}

/// Write a default config file into the root. Returns the path written.
pub fn init_config(root: &Path) -> Result<PathBuf> {
    let path = config_file_path(root);
    if path.exists() {
        return Err(ExampleGenError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&GeneratorConfig::default())
        .map_err(|e| ExampleGenError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ExampleGenError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configs the generator cannot render sensibly.
pub fn validate_config(config: &GeneratorConfig) -> Result<()> {
    let hours = config.ci.hours_between_runs;
    if hours == 0 || hours > 24 {
        return Err(ExampleGenError::config(format!(
            "ci.hours_between_runs must be between 1 and 24, got {hours}"
        )));
    }

    let mut seen = HashSet::new();
    for entry in &config.categories {
        if !seen.insert(entry.category) {
            return Err(ExampleGenError::config(format!(
                "category '{}' is configured more than once",
                entry.category
            )));
        }
        if entry.patterns.is_empty() {
            return Err(ExampleGenError::config(format!(
                "category '{}' has no patterns",
                entry.category
            )));
        }
    }

    Ok(())
}
