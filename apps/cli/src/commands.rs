//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use examplegen_core::pipeline::{
    GenerateOptions, GenerateResult, ProgressReporter, SilentProgress, generate,
};
use examplegen_shared::{GeneratorConfig, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Exit code reported when `--check-readme` finds an out-of-date README.
const README_MISMATCH_EXIT: u8 = 2;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// examplegen: keep the examples README and CI workflows in sync.
#[derive(Parser, Debug)]
#[command(
    name = "examplegen",
    version,
    about = "Regenerate the examples README and one CI workflow per example.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Root of the examples tree.
    #[arg(long, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Config file (defaults to <root>/examplegen.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Fail with exit code 2 if README.md changed during regeneration.
    #[arg(
        long,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
    )]
    pub check_readme: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    pub no_progress: bool,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands. Without one, the generator runs.
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Write examplegen.toml with defaults into the root.
    Init,
    /// Print the resolved configuration as TOML.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Install the global subscriber: `RUST_LOG` wins, else `-v` picks the level.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "examplegen=info",
        1 => "examplegen=debug",
        _ => "examplegen=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Dispatch to the generator or a config subcommand.
pub(crate) fn run(cli: Cli) -> Result<ExitCode> {
    match &cli.command {
        None => cmd_generate(&cli),
        Some(Command::Config { action }) => {
            match action {
                ConfigAction::Init => cmd_config_init(&cli.root)?,
                ConfigAction::Show => cmd_config_show(&cli.root, cli.config.as_deref())?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Resolve the config: explicit file, else `<root>/examplegen.toml`, else defaults.
fn resolve_config(root: &Path, explicit: Option<&Path>) -> Result<GeneratorConfig> {
    Ok(match explicit {
        Some(path) => load_config_from(path)?,
        None => load_config(root)?,
    })
}

fn cmd_generate(cli: &Cli) -> Result<ExitCode> {
    let config = resolve_config(&cli.root, cli.config.as_deref())?;
    let options = GenerateOptions {
        root: cli.root.clone(),
        config,
    };

    info!(
        root = %cli.root.display(),
        check_readme = cli.check_readme,
        "generating workflows and README"
    );

    let result = if cli.no_progress {
        generate(&options, &SilentProgress)?
    } else {
        generate(&options, &CliProgress::new())?
    };

    println!();
    println!("  Examples:   {}", result.item_count);
    println!("  Workflows:  {}", result.workflows_written);
    println!("  Notebooks:  {} rewritten", result.notebooks_changed);
    println!(
        "  README:     {}",
        if result.readme_changed { "updated" } else { "unchanged" }
    );
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();

    let status = exit_status(cli.check_readme, result.readme_changed);
    if status == README_MISMATCH_EXIT {
        eprintln!("README.md file did not match...");
    }

    Ok(ExitCode::from(status))
}

/// Process status after a successful run: a changed README fails check mode.
fn exit_status(check_readme: bool, readme_changed: bool) -> u8 {
    if check_readme && readme_changed {
        README_MISMATCH_EXIT
    } else {
        0
    }
}

fn cmd_config_init(root: &Path) -> Result<()> {
    let path = init_config(root)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(root: &Path, explicit: Option<&Path>) -> Result<()> {
    let config = resolve_config(root, explicit)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn workflow_written(&self, file: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {file}"));
    }

    fn done(&self, _result: &GenerateResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("examplegen").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.root, PathBuf::from("."));
        assert!(!cli.check_readme);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn check_readme_accepts_bare_flag_and_boolish_values() {
        assert!(parse(&["--check-readme"]).check_readme);
        assert!(parse(&["--check-readme", "True"]).check_readme);
        assert!(parse(&["--check-readme", "yes"]).check_readme);
        assert!(!parse(&["--check-readme", "false"]).check_readme);
        assert!(!parse(&["--check-readme", "False"]).check_readme);
    }

    #[test]
    fn config_subcommand_takes_global_root() {
        let cli = parse(&["config", "show", "--root", "cli", "-vv"]);
        assert_eq!(cli.root, PathBuf::from("cli"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn readme_mismatch_only_fails_in_check_mode() {
        assert_eq!(exit_status(false, false), 0);
        assert_eq!(exit_status(false, true), 0);
        assert_eq!(exit_status(true, false), 0);
        assert_eq!(exit_status(true, true), 2);
    }

    #[test]
    fn check_mode_on_temp_tree() {
        let base = std::env::temp_dir().join(format!(
            "examplegen-cli-test-{}",
            uuid::Uuid::now_v7()
        ));
        let root = base.join("cli");
        std::fs::create_dir_all(root.join("jobs/basics")).unwrap();
        std::fs::write(root.join("prefix.md"), "# Examples\n").unwrap();
        std::fs::write(root.join("suffix.md"), "").unwrap();
        std::fs::write(root.join("jobs/basics/hello-job.yml"), "description: hi\n").unwrap();

        let root_arg = root.to_string_lossy().into_owned();
        let check = [
            "--root",
            root_arg.as_str(),
            "--no-progress",
            "--check-readme",
            "True",
        ];

        // README does not exist yet, so the first check fails.
        let first = parse(&check);
        let result = generate(
            &GenerateOptions {
                root: first.root.clone(),
                config: GeneratorConfig::default(),
            },
            &SilentProgress,
        )
        .unwrap();
        assert_eq!(exit_status(first.check_readme, result.readme_changed), 2);

        // Up to date now.
        let second = parse(&check);
        let result = generate(
            &GenerateOptions {
                root: second.root.clone(),
                config: GeneratorConfig::default(),
            },
            &SilentProgress,
        )
        .unwrap();
        assert_eq!(exit_status(second.check_readme, result.readme_changed), 0);

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let res = Cli::try_parse_from(["examplegen", "--log-format", "xml"]);
        assert!(res.is_err());
    }
}
