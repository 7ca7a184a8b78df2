//! README table of contents.
//!
//! `README.md` is rebuilt in full from `prefix.md`, one markdown table per
//! category and `suffix.md`. Each row links the definition file and shows
//! the status badge of its generated workflow.

use std::io;
use std::path::Path;

use tracing::{debug, info, instrument};

use examplegen_shared::{Category, CiConfig, DiscoveredItem, ExampleGenError, Inventory, Result};

pub const README_FILE: &str = "README.md";
pub const PREFIX_FILE: &str = "prefix.md";
pub const SUFFIX_FILE: &str = "suffix.md";

/// Shown when a definition has no `description:` line.
pub const NO_DESCRIPTION: &str = "*no description*";

/// A README table: category, title, and the directory its title links to.
/// Tables without a link have no description column.
struct Table {
    category: Category,
    title: &'static str,
    link: Option<&'static str>,
}

const TABLES: [Table; 6] = [
    Table {
        category: Category::Script,
        title: "Scripts",
        link: None,
    },
    Table {
        category: Category::Job,
        title: "Jobs",
        link: Some("jobs"),
    },
    Table {
        category: Category::Endpoint,
        title: "Endpoints",
        link: Some("endpoints"),
    },
    Table {
        category: Category::Resource,
        title: "Resources",
        link: Some("resources"),
    },
    Table {
        category: Category::Asset,
        title: "Assets",
        link: Some("assets"),
    },
    Table {
        category: Category::Schedule,
        title: "Schedules",
        link: None,
    },
];

/// Assemble the full README: prefix, tables, suffix.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn render_readme(root: &Path, inventory: &Inventory, ci: &CiConfig) -> Result<String> {
    let prefix = read_file(&root.join(PREFIX_FILE))?;
    let suffix = read_file(&root.join(SUFFIX_FILE))?;
    Ok(format!("{prefix}{}{suffix}", render_tables(root, inventory, ci)))
}

/// Regenerate `README.md` under `root`.
pub fn write_readme(root: &Path, inventory: &Inventory, ci: &CiConfig) -> Result<()> {
    let content = render_readme(root, inventory, ci)?;
    let path = root.join(README_FILE);
    std::fs::write(&path, &content).map_err(|e| ExampleGenError::io(&path, e))?;
    info!(path = %path.display(), bytes = content.len(), "README written");
    Ok(())
}

/// Current `README.md` content; a missing file reads as empty.
pub fn read_readme(root: &Path) -> Result<String> {
    let path = root.join(README_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(ExampleGenError::io(&path, e)),
    }
}

/// Render the six category tables in README order.
pub fn render_tables(root: &Path, inventory: &Inventory, ci: &CiConfig) -> String {
    let mut out = String::new();

    for table in &TABLES {
        match table.link {
            Some(link) => {
                out.push_str(&format!("\n**{}** ([{link}]({link}))\n\n", table.title));
                out.push_str("path|status|description\n-|-|-\n");
            }
            None => {
                out.push_str(&format!("\n**{}**\n\n", table.title));
                out.push_str("path|status|\n-|-\n");
            }
        }

        for item in inventory.items(table.category) {
            let source = item.source_file();
            let mut row = format!("[{source}]({source})|{}", badge(item, ci));
            if table.link.is_some() {
                row.push('|');
                row.push_str(&read_description(root, item));
            }
            row.push('\n');
            out.push_str(&row);
        }
    }

    out
}

/// Status badge linking to the item's workflow runs.
pub fn badge(item: &DiscoveredItem, ci: &CiConfig) -> String {
    format!(
        "[![{path}](https://github.com/{repo}/workflows/{name}/badge.svg?branch={branch})](https://github.com/{repo}/actions/workflows/{file})",
        path = item.path,
        repo = ci.repository,
        name = item.workflow_name(),
        branch = ci.branch,
        file = item.workflow_file(),
    )
}

/// Text after the last `": "` on the first line mentioning `description: `.
pub fn extract_description(definition: &str) -> Option<String> {
    definition
        .lines()
        .find(|line| line.contains("description: "))
        .and_then(|line| line.rsplit(": ").next())
        .map(|desc| desc.trim().to_string())
}

fn read_description(root: &Path, item: &DiscoveredItem) -> String {
    let path = root.join(item.source_file());
    match std::fs::read_to_string(&path) {
        Ok(content) => extract_description(&content).unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "definition unreadable, no description");
            NO_DESCRIPTION.to_string()
        }
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| ExampleGenError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "examplegen-readme-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn description_from_first_matching_line() {
        let yaml = "$schema: x\ndescription: Train a model\ncommand: echo\n  description: later\n";
        assert_eq!(extract_description(yaml).as_deref(), Some("Train a model"));
    }

    #[test]
    fn description_takes_last_colon_segment() {
        let yaml = "description: Example: hello world  \n";
        assert_eq!(extract_description(yaml).as_deref(), Some("hello world"));
    }

    #[test]
    fn missing_description_line() {
        assert_eq!(extract_description("command: echo\ndescription:x\n"), None);
    }

    #[test]
    fn badge_format() {
        let item = DiscoveredItem::new("jobs/basics/hello-world-job", Category::Job);
        assert_eq!(
            badge(&item, &CiConfig::default()),
            "[![jobs/basics/hello-world-job](https://github.com/Azure/azureml-examples/workflows/cli-jobs-basics-hello-world-job/badge.svg?branch=main)](https://github.com/Azure/azureml-examples/actions/workflows/cli-jobs-basics-hello-world-job.yml)"
        );
    }

    #[test]
    fn schedule_badge_uses_workflow_name() {
        let item = DiscoveredItem::new("schedules/cron-job-schedule", Category::Schedule);
        let badge = badge(&item, &CiConfig::default());
        assert!(badge.contains("/workflows/cli-schedules-schedules-cron-job-schedule/badge.svg"));
        assert!(badge.ends_with("(https://github.com/Azure/azureml-examples/actions/workflows/cli-schedules-schedules-cron-job-schedule.yml)"));
    }

    #[test]
    fn empty_inventory_renders_headers_in_order() {
        let tmp = temp_dir();
        let tables = render_tables(&tmp, &Inventory::default(), &CiConfig::default());
        let expected = "\n**Scripts**\n\npath|status|\n-|-\n\
\n**Jobs** ([jobs](jobs))\n\npath|status|description\n-|-|-\n\
\n**Endpoints** ([endpoints](endpoints))\n\npath|status|description\n-|-|-\n\
\n**Resources** ([resources](resources))\n\npath|status|description\n-|-|-\n\
\n**Assets** ([assets](assets))\n\npath|status|description\n-|-|-\n\
\n**Schedules**\n\npath|status|\n-|-\n";
        assert_eq!(tables, expected);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rows_carry_descriptions_or_sentinel() {
        let tmp = temp_dir();
        write(&tmp, "jobs/basics/a.yml", "description: First job\n");
        write(&tmp, "jobs/basics/b.yml", "command: echo\n");

        let mut inventory = Inventory::default();
        inventory.jobs = vec![
            DiscoveredItem::new("jobs/basics/a", Category::Job),
            DiscoveredItem::new("jobs/basics/b", Category::Job),
            DiscoveredItem::new("jobs/basics/missing", Category::Job),
        ];
        inventory.scripts = vec![DiscoveredItem::new("deploy", Category::Script)];

        let tables = render_tables(&tmp, &inventory, &CiConfig::default());
        let ci = CiConfig::default();

        let row_a = format!(
            "[jobs/basics/a.yml](jobs/basics/a.yml)|{}|First job\n",
            badge(&inventory.jobs[0], &ci)
        );
        assert!(tables.contains(&row_a));
        assert!(tables.contains(&format!("|{}|*no description*\n", badge(&inventory.jobs[1], &ci))));
        assert!(tables.contains(&format!("|{}|*no description*\n", badge(&inventory.jobs[2], &ci))));

        let script_row = format!("[deploy.sh](deploy.sh)|{}\n", badge(&inventory.scripts[0], &ci));
        assert!(tables.contains(&script_row));
        assert!(tables.find(&script_row).unwrap() < tables.find("**Jobs**").unwrap());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn readme_is_prefix_tables_suffix() {
        let tmp = temp_dir();
        write(&tmp, PREFIX_FILE, "# Examples\n");
        write(&tmp, SUFFIX_FILE, "\n## Contributing\n");

        assert_eq!(read_readme(&tmp).unwrap(), "");
        write_readme(&tmp, &Inventory::default(), &CiConfig::default()).unwrap();

        let readme = read_readme(&tmp).unwrap();
        assert!(readme.starts_with("# Examples\n\n**Scripts**"));
        assert!(readme.ends_with("-|-\n\n## Contributing\n"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_prefix_is_an_error() {
        let tmp = temp_dir();
        let err = render_readme(&tmp, &Inventory::default(), &CiConfig::default()).unwrap_err();
        assert!(matches!(err, ExampleGenError::Io { .. }));
        assert!(err.to_string().contains(PREFIX_FILE));
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
