//! Workflow planning.
//!
//! A [`WorkflowPlan`] captures everything category-specific about one
//! generated workflow as data: which extra path filters it watches, which
//! preparation steps run, and how the example is executed. Planning reads
//! the path markers (`jobs/spark`, `automl` + `image`, `autotuning`, ...) and
//! looks up endpoint deployments; rendering in [`render`] is then a pure
//! function of the plan.

pub mod render;

use std::path::Path;

use rand::Rng;
use tracing::{debug, warn};

use examplegen_discovery::{FileIndex, find_deployments};
use examplegen_shared::{Category, CiConfig, DiscoveredItem, ExampleGenError, Result};

use crate::schedule::{ScheduleTime, schedule_time};

pub use render::render;

/// Number of trailing characters of the hyphenated name kept in endpoint names.
const ENDPOINT_NAME_TAIL: usize = 28;

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

/// Everything needed to render one workflow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPlan {
    /// The example the workflow runs.
    pub item: DiscoveredItem,
    /// Cron slot derived from the item's filename.
    pub schedule: ScheduleTime,
    /// Category-specific policy.
    pub kind: WorkflowKind,
}

impl WorkflowPlan {
    /// Output file name of the workflow.
    pub fn file_name(&self) -> String {
        self.item.workflow_file()
    }
}

/// Category-specific workflow policy, one variant per template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowKind {
    Job(JobPolicy),
    RegistryJob(RegistryJobPolicy),
    Endpoint(EndpointPlan),
    /// Resources and assets share one template.
    Asset(AssetPlan),
    Script,
    Schedule,
}

/// Extra behaviour of a plain job workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPolicy {
    /// Pipeline samples also watch the shared pipeline runner script.
    pub pipeline: bool,
    /// Spark samples upload data and set up identities/attached compute.
    pub spark: Option<SparkSetup>,
    /// Commands run before the job is submitted.
    pub preparation: JobPreparation,
}

/// Spark-specific setup steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparkSetup {
    /// Run `setup-identities.sh` before submitting.
    pub managed_identity: bool,
    /// Attach a Synapse Spark pool with the given identity.
    pub attached: Option<AttachedSparkIdentity>,
}

/// Identity of an attached Spark pool, selecting its resource definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachedSparkIdentity {
    User,
    System,
    Default,
}

impl AttachedSparkIdentity {
    /// Root-relative resource definition used to attach the pool.
    pub fn resource_file(self) -> &'static str {
        match self {
            AttachedSparkIdentity::User => "resources/compute/attached-spark-user-identity.yml",
            AttachedSparkIdentity::System => "resources/compute/attached-spark-system-identity.yml",
            AttachedSparkIdentity::Default => "resources/compute/attached-spark.yml",
        }
    }
}

/// Commands run inside the "run job" step before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPreparation {
    None,
    /// AutoML image samples download and register their data first.
    AutomlImageData,
    /// Autotuning samples generate their job YAML first.
    AutotuningYaml,
}

/// Extra behaviour of a registry-component job workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryJobPolicy {
    pub pipeline: bool,
}

/// Endpoint kind, derived from the item path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointType {
    Online,
    Batch,
    Unknown,
}

impl EndpointType {
    pub fn from_path(path: &str) -> Self {
        if path.contains("endpoints/online/") {
            EndpointType::Online
        } else if path.contains("endpoints/batch/") {
            EndpointType::Batch
        } else {
            EndpointType::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointType::Online => "online",
            EndpointType::Batch => "batch",
            EndpointType::Unknown => "unknown",
        }
    }
}

/// Endpoint workflow details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPlan {
    pub endpoint_type: EndpointType,
    /// Name the endpoint is created under in CI.
    pub endpoint_name: String,
    /// Root-relative deployment files (with extension), sorted.
    pub deployments: Vec<String>,
}

/// Resource/asset workflow details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPlan {
    /// `az ml` sub-command, taken from the second path segment.
    pub subcommand: String,
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Builds workflow plans for discovered items.
///
/// The planner owns the random source used for endpoint name suffixes, so
/// callers that need reproducible output can seed it.
pub struct WorkflowPlanner<'a, R> {
    index: &'a FileIndex,
    excluded_deployments: &'a [String],
    hours_between_runs: u32,
    rng: R,
}

impl<'a, R: Rng> WorkflowPlanner<'a, R> {
    pub fn new(
        index: &'a FileIndex,
        excluded_deployments: &'a [String],
        ci: &CiConfig,
        rng: R,
    ) -> Self {
        Self {
            index,
            excluded_deployments,
            hours_between_runs: ci.hours_between_runs,
            rng,
        }
    }

    /// Plan the workflow for one item.
    pub fn plan(&mut self, item: &DiscoveredItem) -> Result<WorkflowPlan> {
        let kind = match item.category {
            Category::Job => WorkflowKind::Job(job_policy(&item.path)),
            Category::RegistryJob => WorkflowKind::RegistryJob(RegistryJobPolicy {
                pipeline: is_pipeline(&item.path),
            }),
            Category::Endpoint => WorkflowKind::Endpoint(self.endpoint_plan(item)),
            Category::Resource | Category::Asset => WorkflowKind::Asset(asset_plan(item)?),
            Category::Script => WorkflowKind::Script,
            Category::Schedule => WorkflowKind::Schedule,
        };

        Ok(WorkflowPlan {
            item: item.clone(),
            schedule: schedule_time(item.filename(), self.hours_between_runs),
            kind,
        })
    }

    fn endpoint_plan(&mut self, item: &DiscoveredItem) -> EndpointPlan {
        let suffix: u16 = self.rng.gen_range(1000..9999);
        let endpoint_name = format!("{}{suffix}", endpoint_name_stem(&item.hyphenated()));
        let deployments = find_deployments(self.index, item, self.excluded_deployments);

        debug!(
            endpoint = %item.path,
            name = %endpoint_name,
            deployments = deployments.len(),
            "planned endpoint workflow"
        );

        EndpointPlan {
            endpoint_type: EndpointType::from_path(&item.path),
            endpoint_name,
            deployments,
        }
    }
}

/// Output path of a workflow under the configured workflows directory.
pub fn workflow_path(root: &Path, ci: &CiConfig, plan: &WorkflowPlan) -> std::path::PathBuf {
    root.join(&ci.workflows_dir).join(plan.file_name())
}

// ---------------------------------------------------------------------------
// Policy derivation
// ---------------------------------------------------------------------------

fn is_pipeline(path: &str) -> bool {
    path.contains("jobs/pipelines")
}

/// Derive a plain job's policy from markers in its path.
pub fn job_policy(path: &str) -> JobPolicy {
    let spark = path.contains("jobs/spark").then(|| spark_setup(path));

    let preparation = if path.contains("automl") && path.contains("image") {
        JobPreparation::AutomlImageData
    } else if path.contains("autotuning") {
        JobPreparation::AutotuningYaml
    } else {
        JobPreparation::None
    };

    JobPolicy {
        pipeline: is_pipeline(path),
        spark,
        preparation,
    }
}

fn spark_setup(path: &str) -> SparkSetup {
    let managed_identity = path.contains("managed-identity");

    let attached = if !path.contains("attached-spark") {
        None
    } else if path.contains("user-identity") {
        Some(AttachedSparkIdentity::User)
    } else if managed_identity {
        Some(AttachedSparkIdentity::System)
    } else if path.contains("default-identity") {
        Some(AttachedSparkIdentity::Default)
    } else {
        warn!(path, "attached spark sample without an identity marker, skipping attach step");
        None
    };

    SparkSetup {
        managed_identity,
        attached,
    }
}

fn asset_plan(item: &DiscoveredItem) -> Result<AssetPlan> {
    match item.path.split('/').nth(1) {
        Some(sub) if !sub.is_empty() => Ok(AssetPlan {
            subcommand: sub.to_string(),
        }),
        _ => Err(ExampleGenError::validation(format!(
            "cannot derive az ml sub-command from '{}': expected <kind>/<subcommand>/...",
            item.path
        ))),
    }
}

/// Last characters of the hyphenated name with the hyphens removed.
pub fn endpoint_name_stem(hyphenated: &str) -> String {
    let count = hyphenated.chars().count();
    hyphenated
        .chars()
        .skip(count.saturating_sub(ENDPOINT_NAME_TAIL))
        .filter(|c| *c != '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn planner<'a>(index: &'a FileIndex, excluded: &'a [String]) -> WorkflowPlanner<'a, StdRng> {
        WorkflowPlanner::new(index, excluded, &CiConfig::default(), StdRng::seed_from_u64(7))
    }

    #[test]
    fn plain_job_has_no_extras() {
        let policy = job_policy("jobs/basics/hello-world-job");
        assert_eq!(
            policy,
            JobPolicy {
                pipeline: false,
                spark: None,
                preparation: JobPreparation::None,
            }
        );
    }

    #[test]
    fn pipeline_marker() {
        assert!(job_policy("jobs/pipelines/nyc-taxi/pipeline").pipeline);
        assert!(job_policy("jobs/pipelines-with-components/basics/1a_e2e/pipeline").pipeline);
        assert!(!job_policy("jobs/parallel/1a_oj/pipeline").pipeline);
    }

    #[test]
    fn automl_image_wins_over_autotuning() {
        let p = job_policy(
            "jobs/automl-standalone-jobs/cli-automl-image-classification/cli-automl-image",
        );
        assert_eq!(p.preparation, JobPreparation::AutomlImageData);

        let p = job_policy("jobs/single-step/pytorch/autotuning/job");
        assert_eq!(p.preparation, JobPreparation::AutotuningYaml);

        let p = job_policy("jobs/automl-standalone-jobs/cli-automl-classification/cli-automl");
        assert_eq!(p.preparation, JobPreparation::None);
    }

    #[test]
    fn spark_identity_markers() {
        let p = job_policy("jobs/spark/serverless-spark-standalone-managed-identity");
        assert_eq!(
            p.spark,
            Some(SparkSetup {
                managed_identity: true,
                attached: None,
            })
        );

        let p = job_policy("jobs/spark/attached-spark-standalone-user-identity");
        assert_eq!(p.spark.unwrap().attached, Some(AttachedSparkIdentity::User));

        let p = job_policy("jobs/spark/attached-spark-pipeline-managed-identity");
        let spark = p.spark.unwrap();
        assert!(spark.managed_identity);
        assert_eq!(spark.attached, Some(AttachedSparkIdentity::System));

        let p = job_policy("jobs/spark/attached-spark-pipeline-default-identity");
        assert_eq!(p.spark.unwrap().attached, Some(AttachedSparkIdentity::Default));

        assert!(job_policy("jobs/basics/hello-world-job").spark.is_none());
    }

    #[test]
    fn endpoint_type_from_path() {
        assert_eq!(
            EndpointType::from_path("endpoints/online/foo/foo-endpoint"),
            EndpointType::Online
        );
        assert_eq!(
            EndpointType::from_path("endpoints/batch/foo/foo-endpoint"),
            EndpointType::Batch
        );
        assert_eq!(
            EndpointType::from_path("endpoints/other/foo-endpoint"),
            EndpointType::Unknown
        );
    }

    #[test]
    fn endpoint_name_stem_takes_last_28_chars() {
        let hyphenated = "endpoints-online-managed-sample-endpoint";
        // last 28 characters are "line-managed-sample-endpoint"
        assert_eq!(endpoint_name_stem(hyphenated), "linemanagedsampleendpoint");
        assert_eq!(endpoint_name_stem("short-name"), "shortname");
    }

    #[test]
    fn endpoint_plan_has_name_and_deployments() {
        let index = FileIndex::from_paths([
            "endpoints/online/foo/foo-endpoint.yml",
            "endpoints/online/foo/green-deployment.yml",
            "endpoints/online/foo/blue-deployment.yml",
        ]);
        let excluded: Vec<String> = Vec::new();
        let mut planner = planner(&index, &excluded);
        let item = DiscoveredItem::new("endpoints/online/foo/foo-endpoint", Category::Endpoint);

        let plan = planner.plan(&item).unwrap();
        let WorkflowKind::Endpoint(endpoint) = plan.kind else {
            panic!("expected endpoint plan");
        };

        assert_eq!(endpoint.endpoint_type, EndpointType::Online);
        assert_eq!(
            endpoint.deployments,
            vec![
                "endpoints/online/foo/blue-deployment.yml",
                "endpoints/online/foo/green-deployment.yml",
            ]
        );

        let stem = endpoint_name_stem(&item.hyphenated());
        let suffix = endpoint.endpoint_name.strip_prefix(&stem).unwrap();
        let number: u16 = suffix.parse().unwrap();
        assert!((1000..9999).contains(&number));
    }

    #[test]
    fn seeded_planner_is_reproducible() {
        let index = FileIndex::from_paths(["endpoints/batch/x/x-endpoint.yml"]);
        let excluded: Vec<String> = Vec::new();
        let item = DiscoveredItem::new("endpoints/batch/x/x-endpoint", Category::Endpoint);

        let a = planner(&index, &excluded).plan(&item).unwrap();
        let b = planner(&index, &excluded).plan(&item).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn asset_subcommand_from_second_segment() {
        let index = FileIndex::default();
        let excluded: Vec<String> = Vec::new();
        let mut planner = planner(&index, &excluded);

        let item = DiscoveredItem::new("resources/compute/cluster-minimal", Category::Resource);
        let plan = planner.plan(&item).unwrap();
        assert_eq!(
            plan.kind,
            WorkflowKind::Asset(AssetPlan {
                subcommand: "compute".into()
            })
        );

        let item = DiscoveredItem::new("assets/data/local-file", Category::Asset);
        let WorkflowKind::Asset(asset) = planner.plan(&item).unwrap().kind else {
            panic!("expected asset plan");
        };
        assert_eq!(asset.subcommand, "data");

        let flat = DiscoveredItem::new("lonely", Category::Asset);
        assert!(planner.plan(&flat).is_err());
    }

    #[test]
    fn schedule_comes_from_filename() {
        let index = FileIndex::default();
        let excluded: Vec<String> = Vec::new();
        let mut planner = planner(&index, &excluded);

        let item = DiscoveredItem::new("jobs/basics/my-job", Category::Job);
        let plan = planner.plan(&item).unwrap();
        assert_eq!(plan.schedule, ScheduleTime { hour: 7, minute: 45 });
        assert_eq!(plan.file_name(), "cli-jobs-basics-my-job.yml");
    }

    #[test]
    fn workflow_path_uses_configured_dir() {
        let index = FileIndex::default();
        let excluded: Vec<String> = Vec::new();
        let item = DiscoveredItem::new("deploy-moe", Category::Script);
        let plan = planner(&index, &excluded).plan(&item).unwrap();

        let path = workflow_path(Path::new("/repo/cli"), &CiConfig::default(), &plan);
        assert_eq!(
            path,
            Path::new("/repo/cli/../.github/workflows/cli-scripts-deploy-moe.yml")
        );
    }
}
