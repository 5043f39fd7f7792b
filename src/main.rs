//! RoleCouncil - multi-role LLM analysis of construction estimates
//!
//! A CLI over the orchestrator: loads a project context, consults a panel
//! of expert roles through Ollama and writes a consolidated report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, unknown role, etc.)
//!   2 - Some roles failed and --fail-on-partial was set

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rolecouncil::cli::{Args, OutputFormat};
use rolecouncil::config::{Config, CONFIG_FILE_NAME};
use rolecouncil::llm::{CompletionGateway, OllamaGateway};
use rolecouncil::models::{AnalysisContext, AnalysisReport, RoleAnswer};
use rolecouncil::report::{self, RenderOptions};
use rolecouncil::roles::{Role, RoleCatalog};
use rolecouncil::{Orchestrator, OrchestratorError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let (mut config, config_path) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("RoleCouncil v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .rolecouncil.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, parallelism and limits.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the selected command. Returns the exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let catalog = Arc::new(RoleCatalog::builtin());

    if args.list_roles {
        print_roles(&catalog);
        return Ok(0);
    }

    let context = load_context(&args)?;
    info!(
        "Loaded context '{}' with {} line items",
        context.project_name,
        context.line_items.len()
    );

    let settings = config.orchestrator_settings();

    if args.dry_run {
        return handle_dry_run(&args, &catalog, &context, settings);
    }

    let gateway = Arc::new(
        OllamaGateway::new(config.gateway_config()).context("Failed to create model client")?,
    );
    println!("🤖 Model: {} at {}", gateway.model_name(), config.model.ollama_url);
    println!(
        "   Parallel calls: {} | Timeout per role: {}s",
        config.orchestrator.max_parallel_calls, config.orchestrator.call_timeout_seconds
    );

    let orchestrator = Orchestrator::new(Arc::clone(&catalog), gateway, settings);

    let output_path = output_path(&args, &config);
    let render = RenderOptions {
        include_raw_responses: config.report.include_raw_responses,
    };

    if let (Some(role_id), Some(question)) = (args.ask.as_deref(), args.question.as_deref()) {
        let spinner = start_spinner(&args, format!("Asking {}...", role_id));
        let answer = orchestrator.ask_role(role_id, question, Some(&context)).await;
        spinner.finish_and_clear();

        let answer = match answer {
            Err(OrchestratorError::RoleNotFound { role_id }) => {
                anyhow::bail!(
                    "Unknown role '{}'. Use --list-roles to see available roles.",
                    role_id
                )
            }
            other => other?,
        };
        write_answer(&answer, args.format, &output_path)?;
        println!(
            "\n✅ Answer from {} saved to: {}",
            answer.role_display_name,
            output_path.display()
        );
        return Ok(0);
    }

    let spinner = start_spinner(&args, "Consulting expert roles...".to_string());
    let report = match args.task.as_deref() {
        Some(task) => orchestrator.analyze_with_roles(task, &context).await,
        None => orchestrator.analyze_project(&context).await,
    };
    spinner.finish_and_clear();
    let report = report?;

    write_report(&report, args.format, render, &output_path)?;
    print_summary(&report, &output_path);

    if args.fail_on_partial && report.is_partial() {
        eprintln!("\n⛔ Some roles failed. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so the loaded path is returned for
/// the caller to report.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, Some(config_path.clone())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, Some(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}", CONFIG_FILE_NAME, e);
            Ok((Config::default(), None))
        }
    }
}

/// Read the context JSON and apply --document.
fn load_context(args: &Args) -> Result<AnalysisContext> {
    let path = args
        .context
        .as_ref()
        .context("--context is required for analysis")?;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file: {}", path.display()))?;
    let mut context: AnalysisContext = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse context file: {}", path.display()))?;

    if let Some(ref document) = args.document {
        let text = std::fs::read_to_string(document)
            .with_context(|| format!("Failed to read document: {}", document.display()))?;
        context.document_text = Some(text);
    }

    Ok(context)
}

/// Handle --dry-run: print the prompts each selected role would receive.
fn handle_dry_run(
    args: &Args,
    catalog: &RoleCatalog,
    context: &AnalysisContext,
    settings: rolecouncil::OrchestratorSettings,
) -> Result<i32> {
    let prompts = rolecouncil::prompt::PromptBuilder::new(settings.prompt);

    println!("\n🔍 Dry run: rendering prompts (no LLM call)...\n");

    if let (Some(role_id), Some(question)) = (args.ask.as_deref(), args.question.as_deref()) {
        let role = catalog
            .get_role(role_id)
            .with_context(|| format!("Unknown role '{}'", role_id))?;
        print_prompt(role, &prompts.build_question(role, question, Some(context)));
    } else {
        let roles: Vec<&Role> = match args.task.as_deref() {
            Some(task) => catalog.roles_for_task(task),
            None => catalog.all_roles().iter().collect(),
        };
        let waves = roles.len().div_ceil(settings.batch.max_parallel.max(1));
        println!(
            "   {} roles in {} wave(s) of up to {}\n",
            roles.len(),
            waves,
            settings.batch.max_parallel
        );
        for role in roles {
            print_prompt(role, &prompts.build_prompt(role, context));
        }
    }

    println!("✅ Dry run complete. No LLM calls were made.");
    Ok(0)
}

fn print_prompt(role: &Role, prompt: &str) {
    println!("===== {} ({}) =====", role.display_name, role.id);
    println!("{}\n", prompt);
}

fn print_roles(catalog: &RoleCatalog) {
    println!("Roles:");
    for role in catalog.list() {
        println!(
            "  {:<18} {} / {} [{}]",
            role.id,
            role.display_name,
            role.localized_name,
            role.expertise_tags.join(", ")
        );
    }

    println!("\nTask types:");
    for (task, role_ids) in catalog.task_types() {
        println!(
            "  {:<18} aliases: {:<30} roles: {}",
            task.key(),
            task.aliases().join(", "),
            role_ids.join(", ")
        );
    }
}

fn start_spinner(args: &Args, message: String) -> ProgressBar {
    if args.quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn output_path(args: &Args, config: &Config) -> PathBuf {
    let path = PathBuf::from(&config.general.output);
    if args.output.is_none() && args.format == OutputFormat::Json {
        path.with_extension("json")
    } else {
        path
    }
}

fn write_report(
    report: &AnalysisReport,
    format: OutputFormat,
    render: RenderOptions,
    path: &Path,
) -> Result<()> {
    let output = match format {
        OutputFormat::Json => report::generate_json(report)?,
        OutputFormat::Markdown => report::generate_markdown_report(report, render),
    };

    std::fs::write(path, output)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn write_answer(answer: &RoleAnswer, format: OutputFormat, path: &Path) -> Result<()> {
    let output = match format {
        OutputFormat::Json => report::generate_json(answer)?,
        OutputFormat::Markdown => report::generate_markdown_answer(answer),
    };

    std::fs::write(path, output)
        .with_context(|| format!("Failed to write answer to {}", path.display()))
}

fn print_summary(report: &AnalysisReport, path: &Path) {
    let consolidated = &report.consolidated;
    let summary = consolidated.summary;

    println!("\n📊 Analysis Summary ({}):", report.label);
    println!(
        "   Roles: {} succeeded, {} failed, {} total",
        summary.successful_role_count, summary.failed_role_count, summary.total_role_count
    );
    println!(
        "   Recommendations: {} | Warnings: {} | Actions: {}",
        consolidated.recommendations.len(),
        consolidated.warnings.len(),
        consolidated.suggested_actions.len()
    );
    for failure in &consolidated.failed_analyses {
        println!("   ❌ {}: {}", failure.role_id, failure.error_message);
    }
    println!(
        "   Duration: {:.1}s",
        report.metadata.total_duration_ms as f64 / 1000.0
    );
    println!("\n✅ Report saved to: {}", path.display());
}
