//! Workflow document rendering.
//!
//! Every workflow shares one skeleton: read-only header, triggers (manual,
//! cron, pull request path filters), a concurrency group, and a single
//! `build` job that checks out, logs in, bootstraps, sets up the CLI and
//! then runs the category steps.

use examplegen_shared::CiConfig;

use super::{
    AssetPlan, EndpointPlan, JobPolicy, JobPreparation, RegistryJobPolicy, SparkSetup,
    WorkflowKind, WorkflowPlan,
};

/// Banner at the top of every generated workflow.
pub const READONLY_HEADER: &str = "# This code is autogenerated.\n\
# Code is generated by running custom script: examplegen\n\
# Any manual changes to this file may cause incorrect behavior.\n\
# Any manual changes will be overwritten if the code is regenerated.\n";

/// Directory of the examples tree inside the repository.
const EXAMPLES_DIR: &str = "cli";

const GITHUB_WORKSPACE: &str = "${{ github.workspace }}";

const CONCURRENCY_GROUP: &str =
    "${{ github.workflow }}-${{ github.event.pull_request.number || github.ref }}";

/// Render a workflow plan to YAML text.
pub fn render(plan: &WorkflowPlan, ci: &CiConfig) -> String {
    let mut out = String::with_capacity(4096);

    out.push_str(READONLY_HEADER);
    out.push('\n');
    out.push_str(&format!("name: {}\n", plan.item.workflow_name()));
    render_triggers(&mut out, plan, ci);
    render_concurrency(&mut out);
    render_job_preamble(&mut out, plan, ci);

    for step in category_steps(plan) {
        step.render_into(&mut out);
    }

    out
}

// ---------------------------------------------------------------------------
// Skeleton
// ---------------------------------------------------------------------------

fn render_triggers(out: &mut String, plan: &WorkflowPlan, ci: &CiConfig) {
    out.push_str("on:\n");
    out.push_str("  workflow_dispatch:\n");
    out.push_str("  schedule:\n");
    out.push_str(&format!(
        "    - cron: \"{}\"\n",
        plan.schedule.cron(ci.hours_between_runs)
    ));
    out.push_str("  pull_request:\n");
    out.push_str("    branches:\n");
    out.push_str(&format!("      - {}\n", ci.branch));
    out.push_str("    paths:\n");
    for path in path_filters(plan) {
        out.push_str(&format!("      - {path}\n"));
    }
}

fn render_concurrency(out: &mut String) {
    out.push_str("concurrency:\n");
    out.push_str(&format!("  group: {CONCURRENCY_GROUP}\n"));
    out.push_str("  cancel-in-progress: true\n");
}

fn render_job_preamble(out: &mut String, plan: &WorkflowPlan, ci: &CiConfig) {
    out.push_str("jobs:\n");
    out.push_str("  build:\n");
    out.push_str("    runs-on: ubuntu-latest\n");
    out.push_str("    steps:\n");
    out.push_str("    - name: check out repo\n");
    out.push_str("      uses: actions/checkout@v2\n");
    out.push_str("    - name: azure login\n");
    out.push_str("      uses: azure/login@v1\n");
    out.push_str("      with:\n");
    out.push_str(&format!("        creds: {}\n", ci.credentials));

    let echo_group = matches!(plan.kind, WorkflowKind::Job(_) | WorkflowKind::RegistryJob(_));
    let mut bootstrap = Step::new("bootstrap resources")
        .working_directory("infra/bootstrapping")
        .continue_on_error(false);
    if echo_group {
        bootstrap = bootstrap.run(format!("echo '{CONCURRENCY_GROUP}';"));
    }
    bootstrap.run("bash bootstrap.sh").render_into(out);

    Step::new("setup-cli")
        .sourced()
        .run("bash setup.sh")
        .working_directory(EXAMPLES_DIR)
        .continue_on_error(true)
        .render_into(out);
}

/// Paths whose changes trigger the workflow on pull requests.
fn path_filters(plan: &WorkflowPlan) -> Vec<String> {
    let item = &plan.item;
    let own_workflow = format!(".github/workflows/{}", item.workflow_file());
    let project = format!("{EXAMPLES_DIR}/{}/**", item.project_dir());
    let source = format!("{EXAMPLES_DIR}/{}", item.source_file());
    let bootstrapping = "infra/bootstrapping/**".to_string();
    let setup = format!("{EXAMPLES_DIR}/setup.sh");

    let mut paths = match &plan.kind {
        WorkflowKind::Job(policy) => {
            let mut paths = vec![project, bootstrapping, own_workflow];
            if policy.pipeline {
                paths.push(format!("{EXAMPLES_DIR}/run-pipeline-jobs.sh"));
            }
            if policy.spark.is_some() {
                paths.push(format!("{EXAMPLES_DIR}/jobs/spark/data/titanic.csv"));
            }
            paths
        }
        WorkflowKind::RegistryJob(policy) => {
            let mut paths = vec![project, bootstrapping, own_workflow];
            if policy.pipeline {
                paths.push(format!("{EXAMPLES_DIR}/run-pipeline-jobs.sh"));
            }
            paths
        }
        WorkflowKind::Endpoint(endpoint) => vec![
            project,
            format!(
                "{EXAMPLES_DIR}/endpoints/{}/**",
                endpoint.endpoint_type.as_str()
            ),
            bootstrapping,
            own_workflow,
        ],
        WorkflowKind::Asset(_) | WorkflowKind::Script | WorkflowKind::Schedule => {
            vec![source, bootstrapping, own_workflow]
        }
    };

    paths.push(setup);
    paths
}

// ---------------------------------------------------------------------------
// Category steps
// ---------------------------------------------------------------------------

fn category_steps(plan: &WorkflowPlan) -> Vec<Step> {
    match &plan.kind {
        WorkflowKind::Job(policy) => job_steps(plan, policy),
        WorkflowKind::RegistryJob(policy) => registry_job_steps(plan, policy),
        WorkflowKind::Endpoint(endpoint) => endpoint_steps(plan, endpoint),
        WorkflowKind::Asset(asset) => asset_steps(plan, asset),
        WorkflowKind::Script => script_steps(plan),
        WorkflowKind::Schedule => schedule_steps(plan),
    }
}

/// Plain jobs validate the README after running.
fn job_steps(plan: &WorkflowPlan, policy: &JobPolicy) -> Vec<Step> {
    let item = &plan.item;
    let dir = item.project_dir();
    let mut steps = Vec::new();

    if let Some(spark) = &policy.spark {
        steps.extend(spark_steps(plan, spark));
    }

    let mut run = Step::new("run job").sourced();
    run = match policy.preparation {
        JobPreparation::None => run,
        JobPreparation::AutomlImageData => run
            .run(format!(
                "bash \"{GITHUB_WORKSPACE}/infra/bootstrapping/sdk_helpers.sh\" replace_template_values \"prepare_data.py\";"
            ))
            .run("pip install azure-identity")
            .run(format!("bash \"{GITHUB_WORKSPACE}/sdk/python/setup.sh\""))
            .run("python prepare_data.py --subscription $SUBSCRIPTION_ID --group $RESOURCE_GROUP_NAME --workspace $WORKSPACE_NAME"),
        JobPreparation::AutotuningYaml => run.run("bash -x generate-yml.sh"),
    };
    steps.push(
        run.run(format!(
            "bash -x {}/run-job.sh {}.yml",
            relative_root(item.depth()),
            item.filename()
        ))
        .working_directory(format!("{EXAMPLES_DIR}/{dir}")),
    );

    steps.push(validate_readme(dir));
    steps
}

fn spark_steps(plan: &WorkflowPlan, spark: &SparkSetup) -> Vec<Step> {
    let item = &plan.item;
    let dir = item.project_dir();

    let mut steps = vec![
        Step::new("upload data")
            .run("bash -x upload-data-to-blob.sh jobs/spark/")
            .working_directory(EXAMPLES_DIR)
            .continue_on_error(true),
    ];

    if spark.managed_identity {
        steps.push(
            Step::new("setup identities")
                .run("bash -x setup-identities.sh")
                .working_directory(format!("{EXAMPLES_DIR}/{dir}"))
                .continue_on_error(true),
        );
    }

    if let Some(identity) = spark.attached {
        steps.push(
            Step::new("setup attached spark")
                .run(format!(
                    "bash -x {dir}/setup-attached-resources.sh {} {dir}/{}.yml",
                    identity.resource_file(),
                    item.filename()
                ))
                .working_directory(EXAMPLES_DIR)
                .continue_on_error(true),
        );
    }

    steps
}

/// Registry jobs validate the README before running.
fn registry_job_steps(plan: &WorkflowPlan, _policy: &RegistryJobPolicy) -> Vec<Step> {
    let item = &plan.item;
    let dir = item.project_dir();

    vec![
        validate_readme(dir),
        Step::new("run job")
            .sourced()
            .run(format!(
                "bash -x {}/run-pipeline-job-with-registry-components.sh {} {}",
                relative_root(item.depth()),
                item.filename(),
                item.folder_name()
            ))
            .working_directory(format!("{EXAMPLES_DIR}/{dir}")),
    ]
}

fn endpoint_steps(plan: &WorkflowPlan, endpoint: &EndpointPlan) -> Vec<Step> {
    let item = &plan.item;
    let kind = endpoint.endpoint_type.as_str();
    let name = &endpoint.endpoint_name;
    let definition = item.source_file();

    let mut steps = vec![
        validate_readme(item.project_dir()),
        Step::new("delete endpoint if existing")
            .sourced()
            .run(format!("az ml {kind}-endpoint delete -n {name} -y"))
            .working_directory(EXAMPLES_DIR)
            .continue_on_error(true),
        Step::new("create endpoint")
            .sourced()
            .run(format!("cat {definition}"))
            .run(format!("az ml {kind}-endpoint create -n {name} -f {definition}"))
            .working_directory(EXAMPLES_DIR),
    ];

    for deployment in &endpoint.deployments {
        steps.push(
            Step::new("create deployment")
                .sourced()
                .run(format!("cat {deployment}"))
                .run(format!("az ml {kind}-deployment create -e {name} -f {deployment}"))
                .working_directory(EXAMPLES_DIR),
        );
    }

    steps.push(
        Step::new("cleanup endpoint")
            .sourced()
            .run(format!("az ml {kind}-endpoint delete -n {name} -y"))
            .working_directory(EXAMPLES_DIR),
    );

    steps
}

fn asset_steps(plan: &WorkflowPlan, asset: &AssetPlan) -> Vec<Step> {
    let item = &plan.item;
    vec![
        validate_readme(item.project_dir()),
        Step::new("create asset")
            .sourced()
            .run(format!(
                "az ml {} create -f {}",
                asset.subcommand,
                item.source_file()
            ))
            .working_directory(EXAMPLES_DIR),
    ]
}

fn script_steps(plan: &WorkflowPlan) -> Vec<Step> {
    let item = &plan.item;
    vec![
        validate_readme(item.project_dir()),
        Step::new("test script script")
            .sourced()
            .run(format!("set -e; bash -x {}", item.source_file()))
            .working_directory(EXAMPLES_DIR),
    ]
}

fn schedule_steps(plan: &WorkflowPlan) -> Vec<Step> {
    let item = &plan.item;
    let test_name = format!("ci_test_{}", item.filename());
    vec![
        validate_readme(item.project_dir()),
        Step::new("create schedule")
            .sourced()
            .run(format!(
                "az ml schedule create -f ./{} --set name=\"{test_name}\"",
                item.source_file()
            ))
            .working_directory(EXAMPLES_DIR),
        Step::new("disable schedule")
            .sourced()
            .run(format!("az ml schedule disable --name {test_name}"))
            .working_directory(EXAMPLES_DIR),
    ]
}

fn validate_readme(project_dir: &str) -> Step {
    Step::new("validate readme")
        .run(format!(
            "bash check-readme.sh \"{GITHUB_WORKSPACE}\" \"{GITHUB_WORKSPACE}/{EXAMPLES_DIR}/{project_dir}\""
        ))
        .working_directory("infra/bootstrapping")
        .continue_on_error(false)
}

/// Relative path from a directory `depth` levels down back to the root.
fn relative_root(depth: usize) -> String {
    if depth == 0 {
        ".".to_string()
    } else {
        vec![".."; depth].join("/")
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One `run` step of the build job.
#[derive(Debug, Clone)]
struct Step {
    name: &'static str,
    lines: Vec<String>,
    working_directory: String,
    continue_on_error: Option<bool>,
}

impl Step {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            lines: Vec::new(),
            working_directory: String::new(),
            continue_on_error: None,
        }
    }

    /// Load the bootstrapping helpers before the step's own commands.
    fn sourced(self) -> Self {
        self.run(format!(
            "source \"{GITHUB_WORKSPACE}/infra/bootstrapping/sdk_helpers.sh\";"
        ))
        .run(format!(
            "source \"{GITHUB_WORKSPACE}/infra/bootstrapping/init_environment.sh\";"
        ))
    }

    fn run(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    fn working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = dir.into();
        self
    }

    fn continue_on_error(mut self, value: bool) -> Self {
        self.continue_on_error = Some(value);
        self
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(&format!("    - name: {}\n", self.name));
        out.push_str("      run: |\n");
        for line in &self.lines {
            out.push_str(&format!("          {line}\n"));
        }
        out.push_str(&format!(
            "      working-directory: {}\n",
            self.working_directory
        ));
        if let Some(value) = self.continue_on_error {
            out.push_str(&format!("      continue-on-error: {value}\n"));
        }
    }
}
