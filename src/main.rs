use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use system_finder::cli::{Cli, Commands, OutputFormat};
use system_finder::finder::{RebuildStats, SystemFinder};
use system_finder::index::{CategoryStats, QueryMode, QUERY_HELP};

fn main() -> Result<()> {
    env_logger::init();
    let cli = parse_cli();
    let roots = resolve_roots(&cli.paths)?;

    match cli.command.clone() {
        Commands::Find {
            query,
            format,
            output,
        } => {
            let mut finder = SystemFinder::new();
            let stats = finder.rebuild(&roots)?;
            let result = run_find(&finder, &stats, &roots, &query);
            write_find_output(&finder, &result, format, output.as_deref())?;
        }
        Commands::List => {
            let mut finder = SystemFinder::new();
            finder.rebuild(&roots)?;
            let result = list_systems(&finder, &roots);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Stats => {
            let mut finder = SystemFinder::new();
            let rebuild = finder.rebuild(&roots)?;
            let result = StatsOutput {
                roots: display_roots(&roots),
                rebuild,
                categories: finder.index().category_stats(),
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Syntax => {
            println!("{QUERY_HELP}");
        }
    }

    Ok(())
}

fn parse_cli() -> Cli {
    let args: Vec<String> = std::env::args().collect();
    Cli::parse_from(rewrite_args_for_implicit_find(args))
}

/// Lets `system-finder "&Transform +Player"` mean `system-finder find ...`:
/// the first free argument that is not a known subcommand selects `find`.
fn rewrite_args_for_implicit_find(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = ["find", "list", "stats", "syntax", "help"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if a == "--path" {
            idx += 2;
            continue;
        }

        if a.starts_with("--path=") {
            idx += 1;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "find".to_string());
        }
    }

    args
}

fn resolve_roots(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if paths.is_empty() {
        let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
        return Ok(vec![cwd]);
    }
    Ok(paths.to_vec())
}

fn display_roots(roots: &[PathBuf]) -> Vec<String> {
    roots
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect()
}

#[derive(Debug, Serialize)]
struct SystemMatch {
    name: String,
    file: String,
    line_start: usize,
    line_end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    declaration: Option<String>,
}

#[derive(Debug, Serialize)]
struct FindOutput {
    query: String,
    roots: Vec<String>,
    mode: QueryMode,
    total_systems: usize,
    matched: usize,
    duration_ms: u64,
    systems: Vec<SystemMatch>,
}

#[derive(Debug, Serialize)]
struct ListOutput {
    roots: Vec<String>,
    systems: Vec<SystemMatch>,
}

#[derive(Debug, Serialize)]
struct StatsOutput {
    roots: Vec<String>,
    rebuild: RebuildStats,
    categories: Vec<CategoryStats>,
}

fn run_find(
    finder: &SystemFinder,
    stats: &RebuildStats,
    roots: &[PathBuf],
    query: &str,
) -> FindOutput {
    let (names, mode) = finder.query(query);

    let systems = names
        .iter()
        .map(|name| system_match(finder, name, mode == QueryMode::Long))
        .collect::<Vec<_>>();

    FindOutput {
        query: query.to_string(),
        roots: display_roots(roots),
        mode,
        total_systems: stats.systems_indexed,
        matched: systems.len(),
        duration_ms: stats.duration_ms,
        systems,
    }
}

fn list_systems(finder: &SystemFinder, roots: &[PathBuf]) -> ListOutput {
    let systems = finder
        .index()
        .declared_systems()
        .into_iter()
        .map(|(name, _)| system_match(finder, name, false))
        .collect();

    ListOutput {
        roots: display_roots(roots),
        systems,
    }
}

fn system_match(finder: &SystemFinder, name: &str, with_declaration: bool) -> SystemMatch {
    let (file, line_start, line_end) = match finder.location(name) {
        Some(loc) => (
            loc.file.to_string_lossy().to_string(),
            loc.start_line,
            loc.end_line,
        ),
        None => (String::new(), 0, 0),
    };

    let declaration = with_declaration.then(|| finder.declaration_text(name).to_string());

    SystemMatch {
        name: name.to_string(),
        file,
        line_start,
        line_end,
        declaration,
    }
}

fn write_find_output(
    finder: &SystemFinder,
    result: &FindOutput,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("query: {}\n", result.query));
            out.push_str(&format!("matched: {}\n", result.matched));
            for system in &result.systems {
                out.push_str(&format!(
                    "- {} {}:{}\n",
                    system.name, system.file, system.line_start
                ));
            }
            out
        }
        OutputFormat::Code => {
            let mut out = String::new();
            for system in &result.systems {
                let decl = match &system.declaration {
                    Some(decl) => decl.clone(),
                    None => finder.declaration_text(&system.name).to_string(),
                };
                if !out.is_empty() {
                    out.push_str("\n\n");
                }
                out.push_str(&decl);
            }
            out
        }
    };

    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
    } else {
        print!("{content}");
        if !content.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
