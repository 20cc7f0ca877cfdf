use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use deploylens_core::{AnalysisContext, DeployLensConfig, Finding, OutputFormat, Severity};
use deploylens_difflens::parser::{parse_unified_diff, DiffSummary};
use deploylens_difflens::risk::RiskScorer;
use deploylens_repo::client::Repository;
use deploylens_repo::context::{BuildOptions, ContextBuilder};
use deploylens_repo::runner::SystemGit;
use deploylens_review::analyzer::Analyzer;
use deploylens_review::pipeline::{AnalysisResult, Orchestrator};
use deploylens_review::rules::rule_analyzers;
use deploylens_review::runbook::{Runbook, RunbookGenerator};
use deploylens_review::state::{FileStore, MemoryStore, ResultStore};

const CONFIG_FILE: &str = ".deploylens.toml";

#[derive(Parser)]
#[command(
    name = "deploylens",
    version,
    about = "Deployment risk analysis for code changes",
    long_about = "deploylens reads a change from git, runs risk analyzers over it, and\n\
                   turns the findings into a risk score and a deployment runbook.\n\n\
                   Examples:\n  \
                     deploylens analyze                     Analyze working tree changes against the default branch\n  \
                     deploylens analyze --base v1.4 --head HEAD  Analyze a committed range\n  \
                     git diff main | deploylens diff        Summarize a diff from stdin\n  \
                     deploylens runbook --findings out.json Build a runbook from saved findings\n  \
                     deploylens init                        Create a .deploylens.toml template"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .deploylens.toml; analyze looks in the repository root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize the files in a unified diff
    #[command(long_about = "Summarize the files in a unified diff.\n\n\
        Reads a diff from stdin or a file and reports each file's status,\n\
        line counts, and hunks.\n\n\
        Examples:\n  git diff | deploylens diff\n  deploylens diff --file changes.patch")]
    Diff {
        /// Read diff from file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Analyze a change in a git repository
    #[command(long_about = "Analyze a change in a git repository.\n\n\
        Builds the before/after content of every changed file, runs the configured\n\
        [[rules]] over it, and prints the findings, risk score, and runbook.\n\
        Without --head the working tree (or the index with --staged) is compared\n\
        against --base, which defaults to the repository's default branch.\n\n\
        Examples:\n  deploylens analyze\n  deploylens analyze --base main --head feature/x --fail-on high\n  deploylens analyze --staged --save")]
    Analyze {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Base revision (default: detected default branch)
        #[arg(long)]
        base: Option<String>,
        /// Head revision (default: working tree)
        #[arg(long)]
        head: Option<String>,
        /// Compare the index instead of the working tree
        #[arg(long, conflicts_with = "head")]
        staged: bool,
        /// Restrict the analysis to these paths
        #[arg(long)]
        path: Vec<String>,
        /// Title used for the runbook (default: current branch)
        #[arg(long)]
        title: Option<String>,
        /// Exit with non-zero code if findings meet severity threshold
        #[arg(
            long,
            long_help = "Exit with non-zero code if findings of this severity or higher are found.\n\n\
                Severity ranking: critical > high > medium > low.\n\
                Useful in CI pipelines to block risky deploys."
        )]
        fail_on: Option<Severity>,
        /// Store the result under .deploylens/results/
        #[arg(long)]
        save: bool,
    },
    /// Generate a runbook from findings, or parse one back to JSON
    #[command(long_about = "Generate a runbook from findings, or parse one back to JSON.\n\n\
        --findings accepts a JSON array of findings or a saved analysis result.\n\
        Without --findings or --parse, findings are read from stdin.\n\n\
        Examples:\n  deploylens runbook --findings .deploylens/results/<id>.json --title 'Drop legacy tables'\n  deploylens runbook --parse RUNBOOK.md --format json")]
    Runbook {
        /// Read findings JSON from file instead of stdin
        #[arg(long)]
        findings: Option<PathBuf>,
        /// Parse a runbook markdown file
        #[arg(long, conflicts_with = "findings")]
        parse: Option<PathBuf>,
        /// Title of the change
        #[arg(long, default_value = "Untitled change")]
        title: String,
    },
    /// Create a default .deploylens.toml configuration file
    #[command(long_about = "Create a default .deploylens.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .deploylens.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Findings as written by `--format json` runs: a bare list or a full result.
#[derive(Deserialize)]
#[serde(untagged)]
enum FindingsInput {
    Findings(Vec<Finding>),
    Result(Box<AnalysisResult>),
}

impl FindingsInput {
    fn into_findings(self) -> Vec<Finding> {
        match self {
            FindingsInput::Findings(findings) => findings,
            FindingsInput::Result(result) => result.findings,
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!("deploylens v{version}: deployment risk analysis for code changes\n");

    println!("Quick start:");
    println!("  deploylens init           Create a .deploylens.toml config file");
    println!("  deploylens analyze        Analyze your changes against the default branch\n");

    println!("All commands:");
    println!("  analyze   Findings, risk score, and runbook for a git change");
    println!("  diff      Summarize a unified diff");
    println!("  runbook   Generate a runbook from findings, or parse one");
    println!("  init      Create default configuration\n");

    println!("Run 'deploylens <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load `--config`, or `.deploylens.toml` under `search_dir` if present.
fn load_config(path: Option<&Path>, search_dir: &Path) -> Result<DeployLensConfig> {
    let config = match path {
        Some(path) => DeployLensConfig::from_file(path)
            .wrap_err(format!("loading {}", path.display()))?,
        None => {
            let default_path = search_dir.join(CONFIG_FILE);
            if default_path.exists() {
                DeployLensConfig::from_file(&default_path)
                    .wrap_err(format!("loading {}", default_path.display()))?
            } else {
                DeployLensConfig::default()
            }
        }
    };
    Ok(config)
}

/// Where `analyze` looks for its config: the top level of the repository at
/// `repo`, or `repo` itself when git cannot tell.
fn config_dir_for(repo: &Path) -> PathBuf {
    Repository::new(SystemGit::new(repo))
        .root()
        .unwrap_or_else(|_| repo.to_path_buf())
}

fn read_input(file: &Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

fn run_analysis<S: ResultStore>(
    store: S,
    analyzers: Vec<Box<dyn Analyzer>>,
    scorer: RiskScorer,
    context: &AnalysisContext,
) -> Result<AnalysisResult> {
    let mut orchestrator = Orchestrator::new(store).with_scorer(scorer);
    for analyzer in analyzers {
        orchestrator.register(analyzer);
    }
    Ok(orchestrator.analyze(context)?)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_dir = match &cli.command {
        Some(Command::Analyze { repo, .. }) => config_dir_for(repo),
        _ => PathBuf::from("."),
    };
    let config = load_config(cli.config.as_deref(), &config_dir)?;
    tracing::debug!(
        rules = config.rules.len(),
        ignore_patterns = config.analysis.ignore_patterns.len(),
        format = %cli.format,
        "configuration loaded"
    );

    match cli.command {
        None => {
            print_welcome();
        }
        Some(Command::Diff { ref file }) => {
            let input = read_input(file)?;
            if input.trim().is_empty() {
                miette::bail!(miette::miette!(
                    help = "Pipe a diff to deploylens, e.g.: git diff main | deploylens diff\n       Or use --file <path>",
                    "Empty diff input"
                ));
            }
            let result = parse_unified_diff(&input, "", "");
            let summary = DiffSummary::from_result(&result);

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&summary).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => print!("{}", summary.to_markdown()),
                OutputFormat::Text => print!("{summary}"),
            }
        }
        Some(Command::Analyze {
            ref repo,
            ref base,
            ref head,
            staged,
            ref path,
            ref title,
            fail_on,
            save,
        }) => {
            let analyzers = rule_analyzers(&config.rules)?;
            if analyzers.is_empty() {
                tracing::warn!("no [[rules]] configured; the analysis will report no findings");
            }

            let git = SystemGit::new(repo);
            let options = BuildOptions {
                base: base.clone(),
                head: head.clone(),
                staged,
                paths: path.clone(),
                repo_config: config.analysis.clone(),
            };
            let built = ContextBuilder::new(&git).build(&options).map_err(|e| {
                miette::Report::new(e).wrap_err(format!("analyzing {}", repo.display()))
            })?;

            let scorer = RiskScorer::new(config.scoring);
            let result = if save {
                let store = FileStore::new(&built.repo_info.root);
                let dir = store.dir().to_path_buf();
                let result = run_analysis(store, analyzers, scorer, &built.context)?;
                eprintln!(
                    "Saved result to {}",
                    dir.join(format!("{}.json", result.id)).display()
                );
                result
            } else {
                run_analysis(MemoryStore::new(), analyzers, scorer, &built.context)?
            };

            let title = title
                .clone()
                .unwrap_or_else(|| built.repo_info.current_branch.clone());
            let runbook = RunbookGenerator::new(scorer, config.runbook.clone())
                .generate(&title, &result.findings);

            match cli.format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "repo": &built.repo_info,
                        "result": &result,
                        "runbook": &runbook,
                    });
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&output).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => {
                    print!("{}", result.to_markdown());
                    println!();
                    print!("{}", runbook.to_markdown());
                }
                OutputFormat::Text => {
                    print!("{result}");
                    println!();
                    print!("{runbook}");
                }
            }

            if let Some(threshold) = fail_on {
                if result.has_findings_at(threshold) {
                    std::process::exit(1);
                }
            }
        }
        Some(Command::Runbook {
            ref findings,
            ref parse,
            ref title,
        }) => {
            if let Some(path) = parse {
                let text = std::fs::read_to_string(path)
                    .into_diagnostic()
                    .wrap_err(format!("reading {}", path.display()))?;
                let runbook = Runbook::parse(&text);
                match cli.format {
                    OutputFormat::Markdown => print!("{}", runbook.to_markdown()),
                    OutputFormat::Json | OutputFormat::Text => println!(
                        "{}",
                        serde_json::to_string_pretty(&runbook).into_diagnostic()?
                    ),
                }
                return Ok(());
            }

            let input = read_input(findings)?;
            let findings = serde_json::from_str::<FindingsInput>(&input)
                .map_err(|e| {
                    miette::miette!(
                        help = "Expected a JSON array of findings or a saved analysis result",
                        "invalid findings JSON: {e}"
                    )
                })?
                .into_findings();

            let runbook =
                RunbookGenerator::new(RiskScorer::new(config.scoring), config.runbook.clone())
                    .generate(title, &findings);
            match cli.format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&runbook).into_diagnostic()?
                ),
                OutputFormat::Markdown | OutputFormat::Text => print!("{}", runbook.to_markdown()),
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "deploylens", &mut std::io::stdout());
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# deploylens configuration

[analysis]
# Paths left out of the analysis. Plain entries match by prefix; * and ? are wildcards.
# ignore_patterns = ["vendor/", "*.lock", "docs/*.md"]

# Free-form settings for individual analyzers, keyed by analyzer name.
# [analysis.analyzers.coverage]
# threshold = 80

[scoring]
# Lowest score of each risk level. Must be ascending.
# medium = 25
# high = 50
# critical = 80

[runbook]
# migrate_command = "make db-migrate"
# rollback_command = "make db-rollback"

# Pattern rules, matched against added lines.
# [[rules]]
# name = "drop-table"
# finding_type = "DESTRUCTIVE_MIGRATION"
# severity = "critical"
# pattern = "(?i)\\bdrop\\s+table\\b"
# title = "Table dropped"
# remediation = "Rename the table first and drop it in a later release"
# extensions = ["sql"]
"#;
