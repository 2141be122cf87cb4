//! codebundle CLI - Command-line interface for the bundler
//!
//! This binary uses Clap for argument parsing. All core logic lives in the
//! library; this file only turns flags into a `BundleConfig`, picks the
//! output target and reports the result.

use anyhow::Context as _;
use clap::{ArgGroup, ArgMatches, CommandFactory, FromArgMatches, Parser};
use codebundle::core::models::DEFAULT_CONFIG_FILE;
use codebundle::{restore_into, BundleConfig, BundleEngine, BundleError, OutputTarget, SelectionOp};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the log filter
const LOG_ENV: &str = "CODEBUNDLE_LOG";

/// Bundle a source tree into a single Markdown document.
#[derive(Parser, Debug)]
#[command(name = "codebundle")]
#[command(version = codebundle::VERSION)]
#[command(about = "Bundle a source tree into a single Markdown document.")]
#[command(group(ArgGroup::new("target").args(["output", "append", "stdout"])))]
#[command(after_help = "Examples:
  # Sources, minus the build tree
  codebundle . -i '*.cpp,*.h' -x build/

  # Order matters: re-include one generated header
  codebundle . -i '*.h' -x gen/ -i gen/config.h --stdout

  # Legacy files in cp1251, logs listed without content
  codebundle . --encoding 'legacy/:cp1251' --paths-only '*.log'

  # Restore a bundle into a fresh directory
  codebundle restored --restore bundle.md
")]
struct Cli {
    // ═══════════════════════════════════════════════════════════════════════════
    // CORE ARGUMENTS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Root directory to bundle (or restore into)
    #[arg(value_name = "ROOT", default_value = ".")]
    root: PathBuf,

    /// Path to a JSON configuration file. Defaults to ROOT/.codebundle.json
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    config: Option<PathBuf>,

    // ═══════════════════════════════════════════════════════════════════════════
    // SELECTION (applied in command-line order)
    // ═══════════════════════════════════════════════════════════════════════════
    /// Add paths matching a comma-separated pattern list (commas inside {...} do not split)
    #[arg(short = 'i', long = "include", value_name = "LIST")]
    include: Vec<String>,

    /// Remove paths matching a comma-separated pattern list
    #[arg(short = 'x', long = "exclude", value_name = "LIST")]
    exclude: Vec<String>,

    // ═══════════════════════════════════════════════════════════════════════════
    // CONTENT RULES
    // ═══════════════════════════════════════════════════════════════════════════
    /// Emit matching files as placeholders without content
    #[arg(long = "paths-only", value_name = "LIST")]
    paths_only: Vec<String>,

    /// Force an encoding for matching files, as PATTERN:CODEC[,...]
    #[arg(long = "encoding", value_name = "RULES")]
    encoding: Vec<String>,

    /// Suppress the original-bytes block for matching files
    #[arg(long = "no-backup", value_name = "LIST")]
    no_backup: Vec<String>,

    /// Encoding for files no --encoding rule covers
    #[arg(long = "default-encoding", value_name = "CODEC")]
    default_encoding: Option<String>,

    /// Follow symbolic links while walking
    #[arg(long = "follow-symlinks")]
    follow_symlinks: bool,

    // ═══════════════════════════════════════════════════════════════════════════
    // OUTPUT
    // ═══════════════════════════════════════════════════════════════════════════
    /// Write to FILE, replacing it [default: bundle.md]
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Append to FILE, creating it if needed
    #[arg(short = 'a', long = "append", value_name = "FILE")]
    append: Option<PathBuf>,

    /// Write to standard output without a header
    #[arg(long = "stdout")]
    stdout: bool,

    /// Restore files from a bundle document into ROOT instead of bundling
    #[arg(long = "restore", value_name = "BUNDLE", conflicts_with = "target")]
    restore: Option<PathBuf>,

    // ═══════════════════════════════════════════════════════════════════════════
    // DIAGNOSTICS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Show debug diagnostics and the run report
    #[arg(short = 'v', long = "verbose", conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

impl Cli {
    fn target(&self) -> OutputTarget {
        if self.stdout {
            OutputTarget::Stdout
        } else if let Some(path) = &self.append {
            OutputTarget::Append(path.clone())
        } else if let Some(path) = &self.output {
            OutputTarget::Overwrite(path.clone())
        } else {
            OutputTarget::default()
        }
    }
}

/// Rebuild the include/exclude steps in the order they were typed.
///
/// Clap collects each flag into its own list; the argument indices tell
/// us how the two lists interleave.
fn ordered_selection(matches: &ArgMatches) -> Vec<SelectionOp> {
    let mut steps: Vec<(usize, SelectionOp)> = Vec::new();

    for id in ["include", "exclude"] {
        if let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<String>(id))
        {
            for (index, list) in indices.zip(values) {
                let op = match id {
                    "include" => SelectionOp::include(list.clone()),
                    _ => SelectionOp::exclude(list.clone()),
                };
                steps.push((index, op));
            }
        }
    }

    steps.sort_by_key(|(index, _)| *index);
    steps.into_iter().map(|(_, op)| op).collect()
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Config file contents merged with command-line flags
fn load_config(cli: &Cli, selection: Vec<SelectionOp>) -> anyhow::Result<BundleConfig> {
    let default_path = cli.root.join(DEFAULT_CONFIG_FILE);
    let mut config = match &cli.config {
        Some(path) => BundleConfig::from_file(path)?,
        None if default_path.is_file() => {
            tracing::debug!("Using config {}", default_path.display());
            BundleConfig::from_file(&default_path)?
        }
        None => BundleConfig::default(),
    };

    if !selection.is_empty() {
        config.selection = selection;
    }
    config.paths_only.extend(cli.paths_only.iter().cloned());
    config.encoding.extend(cli.encoding.iter().cloned());
    config.no_backup.extend(cli.no_backup.iter().cloned());
    if cli.default_encoding.is_some() {
        config.default_encoding = cli.default_encoding.clone();
    }
    config.follow_symlinks |= cli.follow_symlinks;

    Ok(config)
}

fn run_restore(bundle: &Path, root: &Path, cli: &Cli) -> anyhow::Result<()> {
    let document = std::fs::read_to_string(bundle)
        .with_context(|| format!("reading bundle {}", bundle.display()))?;
    std::fs::create_dir_all(root)
        .with_context(|| format!("creating {}", root.display()))?;

    let stats = restore_into(&document, root)?;
    if !cli.quiet {
        eprintln!(
            "Restored {} files and {} directories into {}",
            stats.files,
            stats.directories,
            root.display()
        );
        if stats.skipped > 0 || stats.mismatched > 0 {
            eprintln!(
                "  skipped: {}, checksum mismatches: {}",
                stats.skipped, stats.mismatched
            );
        }
    }
    Ok(())
}

fn run(cli: &Cli, matches: &ArgMatches) -> anyhow::Result<()> {
    if let Some(bundle) = &cli.restore {
        return run_restore(bundle, &cli.root, cli);
    }

    let config = load_config(cli, ordered_selection(matches))?;
    let engine = BundleEngine::with_config(config)?;
    let target = cli.target();

    let stats = engine.run(&cli.root, &target)?;

    if !cli.quiet {
        eprintln!(
            "Written {} with {} records",
            target.describe(),
            stats.total_records()
        );
    }
    if cli.verbose {
        stats.print_report();
    }
    Ok(())
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    init_logging(&cli);

    if let Err(e) = run(&cli, &matches) {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<BundleError>()
            .map(BundleError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (Cli, ArgMatches) {
        let matches = Cli::command().try_get_matches_from(args).unwrap();
        let cli = Cli::from_arg_matches(&matches).unwrap();
        (cli, matches)
    }

    #[test]
    fn test_selection_keeps_command_line_order() {
        let (_, matches) = parse(&["codebundle", ".", "-x", "gen/", "-i", "*.h", "--exclude", "a.h", "-i", "gen/x.h"]);
        assert_eq!(
            ordered_selection(&matches),
            vec![
                SelectionOp::exclude("gen/"),
                SelectionOp::include("*.h"),
                SelectionOp::exclude("a.h"),
                SelectionOp::include("gen/x.h"),
            ]
        );
    }

    #[test]
    fn test_no_selection_flags() {
        let (_, matches) = parse(&["codebundle"]);
        assert!(ordered_selection(&matches).is_empty());
    }

    #[test]
    fn test_default_target() {
        let (cli, _) = parse(&["codebundle", "."]);
        assert_eq!(cli.target(), OutputTarget::default());
        assert_eq!(cli.root, PathBuf::from("."));
    }

    #[test]
    fn test_targets() {
        let (cli, _) = parse(&["codebundle", "--stdout"]);
        assert_eq!(cli.target(), OutputTarget::Stdout);

        let (cli, _) = parse(&["codebundle", "-a", "out.md"]);
        assert_eq!(cli.target(), OutputTarget::Append(PathBuf::from("out.md")));

        let (cli, _) = parse(&["codebundle", "-o", "out.md"]);
        assert_eq!(cli.target(), OutputTarget::Overwrite(PathBuf::from("out.md")));
    }

    #[test]
    fn test_targets_are_exclusive() {
        let result = Cli::command().try_get_matches_from(["codebundle", "-o", "a.md", "--stdout"]);
        assert!(result.is_err());

        let result = Cli::command().try_get_matches_from(["codebundle", "--restore", "b.md", "--stdout"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rules_extend_config() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(DEFAULT_CONFIG_FILE),
            r#"{"selection": [{"include": ["*.c"]}], "encoding": ["old/:cp1251"]}"#,
        )
        .unwrap();
        let root = temp_dir.path().to_str().unwrap();

        let (cli, matches) = parse(&["codebundle", root, "--encoding", "*.txt:latin1"]);
        let config = load_config(&cli, ordered_selection(&matches)).unwrap();
        assert_eq!(config.selection, vec![SelectionOp::Include(vec!["*.c".to_string()])]);
        assert_eq!(config.encoding, vec!["old/:cp1251", "*.txt:latin1"]);

        let (cli, matches) = parse(&["codebundle", root, "-i", "*.h"]);
        let config = load_config(&cli, ordered_selection(&matches)).unwrap();
        assert_eq!(config.selection, vec![SelectionOp::include("*.h")]);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
