//! End-to-end generation pipeline: scan → notebooks → discovery → workflows → README.

use std::path::PathBuf;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

use examplegen_discovery::{FileIndex, discover_in};
use examplegen_shared::{DiscoveryConfig, ExampleGenError, GeneratorConfig, Result};

use crate::notebook::normalize_notebooks;
use crate::readme::{read_readme, write_readme};
use crate::workflow::{WorkflowPlanner, render, workflow_path};

/// Glob selecting every notebook in the examples tree.
const NOTEBOOK_GLOB: &str = "**/*.ipynb";

/// Inputs of one generator run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Root of the examples tree (`prefix.md`, `suffix.md` and `README.md` live here).
    pub root: PathBuf,
    /// Resolved generator configuration.
    pub config: GeneratorConfig,
}

/// Outcome of one generator run.
#[derive(Debug)]
pub struct GenerateResult {
    /// Discovered items across all categories.
    pub item_count: usize,
    /// Workflow files written.
    pub workflows_written: usize,
    /// Notebooks whose kernelspec was rewritten.
    pub notebooks_changed: usize,
    /// Whether `README.md` differs from its content before the run.
    pub readme_changed: bool,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each workflow file is written.
    fn workflow_written(&self, file: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &GenerateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn workflow_written(&self, _file: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &GenerateResult) {}
}

/// Run the generator with an entropy-seeded RNG for endpoint names.
pub fn generate(
    options: &GenerateOptions,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    generate_with_rng(options, StdRng::from_entropy(), progress)
}

/// Run the generator.
///
/// 1. Index the examples tree
/// 2. Normalize notebook kernelspecs (if enabled)
/// 3. Discover items per category
/// 4. Plan and write one workflow per item
/// 5. Regenerate `README.md` and compare with its previous content
#[instrument(skip_all, fields(root = %options.root.display()))]
pub fn generate_with_rng<R: Rng>(
    options: &GenerateOptions,
    rng: R,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let start = Instant::now();
    let root = &options.root;
    let config = &options.config;

    info!("starting generation");

    // --- Phase 1: Index ---
    progress.phase("Scanning examples");
    let index = FileIndex::scan(root)?;

    // --- Phase 2: Notebooks ---
    let notebooks_changed = if config.notebooks.enabled {
        progress.phase("Normalizing notebooks");
        let notebooks = index.glob(NOTEBOOK_GLOB)?;
        normalize_notebooks(root, &notebooks, &config.notebooks.kernelspec)?
    } else {
        debug!("notebook normalization disabled");
        0
    };

    // --- Phase 3: Discovery ---
    progress.phase("Discovering examples");
    let discovery = DiscoveryConfig::from(config);
    let inventory = discover_in(&index, &discovery)?;

    // --- Phase 4: Workflows ---
    progress.phase("Writing workflows");
    let workflows_dir = root.join(&config.ci.workflows_dir);
    std::fs::create_dir_all(&workflows_dir)
        .map_err(|e| ExampleGenError::io(&workflows_dir, e))?;

    let mut planner = WorkflowPlanner::new(
        &index,
        &discovery.excluded_deployments,
        &config.ci,
        rng,
    );
    let total = inventory.len();
    let mut workflows_written = 0;
    for item in inventory.iter() {
        let plan = planner.plan(item)?;
        let path = workflow_path(root, &config.ci, &plan);
        std::fs::write(&path, render(&plan, &config.ci))
            .map_err(|e| ExampleGenError::io(&path, e))?;

        workflows_written += 1;
        debug!(path = %path.display(), "workflow written");
        progress.workflow_written(&plan.file_name(), workflows_written, total);
    }
    info!(workflows_written, "workflows written");

    // --- Phase 5: README ---
    progress.phase("Writing README");
    let before = read_readme(root)?;
    write_readme(root, &inventory, &config.ci)?;
    let after = read_readme(root)?;
    let readme_changed = before != after;

    let result = GenerateResult {
        item_count: inventory.len(),
        workflows_written,
        notebooks_changed,
        readme_changed,
        elapsed: start.elapsed(),
    };

    info!(
        items = result.item_count,
        notebooks_changed,
        readme_changed,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "generation complete"
    );

    progress.done(&result);
    Ok(result)
}
