//! aiclip CLI: preview, confirm and run media commands compiled from interpreter intents.

// CLI-specific lint allowances (CLI binary, not library)
#![allow(missing_docs)]
#![allow(clippy::print_stdout)] // CLI must print to stdout
#![allow(clippy::print_stderr)] // CLI must print to stderr
#![allow(clippy::exit)] // CLI uses exit codes
#![allow(clippy::unreachable)] // Used for exhaustive enum matching
#![allow(clippy::fn_params_excessive_bools)] // CLI flags are naturally bools

use aiclip::builder::BatchBuild;
use aiclip::config::{load_config, validate_config};
use aiclip::executor::{CancelToken, Executor, Preview};
use aiclip::explain::explain;
use aiclip::intent::Intent;
use aiclip::{pipeline, AiclipError, CommandPlan, Config, ExecutionResult};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use miette::{IntoDiagnostic, Result};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod confirm;
mod progress;

/// Color output mode
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and `NO_COLOR` env
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Debug, Parser)]
#[command(
    name = "aiclip",
    version,
    about = "Preview, confirm and run ffmpeg commands compiled from media intents"
)]
struct Cli {
    /// Control color output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    color: ColorMode,

    /// Config file (JSON, or YAML by extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug events to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile an intent and preview the resulting commands without running them
    Plan {
        #[arg(long, help = "Intent JSON file, or - for stdin")]
        intent: String,
        #[arg(long)]
        json: bool,
        #[arg(long, help = "Directory relative paths are resolved against")]
        cwd: Option<PathBuf>,
    },
    /// Compile, preview, confirm and execute an intent
    Run {
        #[arg(long, help = "Intent JSON file, or - for stdin")]
        intent: String,
        #[arg(long)]
        json: bool,
        #[arg(long, help = "Directory relative paths are resolved against")]
        cwd: Option<PathBuf>,
        #[arg(long, short = 'y', help = "Proceed without prompting, overwriting existing outputs")]
        yes: bool,
        #[arg(long, help = "Preview only")]
        dry_run: bool,
        #[arg(long, help = "Per-command timeout in seconds")]
        timeout: Option<u64>,
        #[arg(long, help = "Batch worker count (1-8)")]
        parallel: Option<usize>,
    },
    /// Explain an ffmpeg command in plain language
    Explain {
        #[arg(long)]
        json: bool,
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        #[arg(value_enum, help = "Shell to generate completions for")]
        shell: Shell,
    },
}

/// Options for the run command after flag parsing.
struct RunOptions {
    json: bool,
    yes: bool,
    dry_run: bool,
    timeout: Option<u64>,
    parallel: Option<usize>,
}

/// Configure color output based on CLI flag and environment
fn configure_colors(mode: ColorMode) -> bool {
    let use_color = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            if std::env::var("NO_COLOR").is_ok() {
                false
            } else {
                supports_color::on(supports_color::Stream::Stderr).is_some()
            }
        }
    };
    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .color(use_color)
                .unicode(use_color)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set
    use_color
}

fn init_tracing(verbose: bool, use_color: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(use_color)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let use_color = configure_colors(cli.color);
    init_tracing(cli.verbose, use_color);
    match cli.command {
        Commands::Plan { intent, json, cwd } => cmd_plan(cli.config.as_deref(), &intent, json, cwd),
        Commands::Run {
            intent,
            json,
            cwd,
            yes,
            dry_run,
            timeout,
            parallel,
        } => cmd_run(
            cli.config.as_deref(),
            &intent,
            cwd,
            &RunOptions {
                json,
                yes,
                dry_run,
                timeout,
                parallel,
            },
        ),
        Commands::Explain { json, command } => cmd_explain(json, &command),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

/// Handle the plan command.
fn cmd_plan(config_path: Option<&Path>, intent: &str, json: bool, cwd: Option<PathBuf>) -> Result<()> {
    let (config, build) = match prepare(config_path, intent, cwd) {
        Ok(prepared) => prepared,
        Err(err) => return fail(json, err),
    };
    let executor = Executor::new(&config);
    let previews: Vec<Preview> = build.plans().map(|plan| executor.preview(plan)).collect();
    emit_previews(json, &previews, &build.failures())?;
    match build.into_plans() {
        Ok(_) => Ok(()),
        Err(err) => exit_with(err.exit_code()),
    }
}

/// Handle the run command.
fn cmd_run(
    config_path: Option<&Path>,
    intent: &str,
    cwd: Option<PathBuf>,
    options: &RunOptions,
) -> Result<()> {
    let json = options.json;
    let (mut config, build) = match prepare(config_path, intent, cwd) {
        Ok(prepared) => prepared,
        Err(err) => return fail(json, err),
    };
    if let Some(seconds) = options.timeout {
        if seconds == 0 {
            return fail(json, AiclipError::cli_invalid_arg("--timeout must be at least 1 second"));
        }
        config.execution.timeout_ms = seconds.saturating_mul(1000);
    }
    if let Some(workers) = options.parallel {
        config.execution.max_parallelism = workers;
    }

    let executor = Executor::new(&config);
    let previews: Vec<Preview> = build.plans().map(|plan| executor.preview(plan)).collect();
    if !json {
        emit_previews(false, &previews, &build.failures())?;
    }
    // Nothing runs unless every item in the batch was built.
    let plans = match build.into_plans() {
        Ok(plans) => plans,
        Err(err) => return fail(json, err),
    };
    if options.dry_run || config.execution.dry_run {
        if json {
            emit_previews(true, &previews, &[])?;
        } else {
            eprintln!("dry run: nothing was executed");
        }
        return Ok(());
    }

    let allow_overwrite = match confirm_plans(&plans, options.yes) {
        Ok(true) => true,
        Ok(false) => {
            eprintln!("aborted: nothing was executed");
            return Ok(());
        }
        Err(err) => return fail(json, err),
    };

    let cancel = CancelToken::new();
    install_interrupt_handler(cancel.clone());
    let reporter: Box<dyn aiclip::executor::ProgressCallback> = if json {
        Box::new(aiclip::executor::NoopProgress)
    } else {
        Box::new(Arc::new(progress::BatchProgress::new()))
    };
    let executor = executor.with_cancel_token(cancel).with_progress(reporter);
    let results = executor.execute_batch(
        &plans,
        allow_overwrite,
        executor.default_timeout(),
        executor.default_parallelism(),
    );
    emit_results(json, &plans, &previews, results)
}

/// Handle the explain command.
fn cmd_explain(json: bool, command: &[String]) -> Result<()> {
    let explanation = explain(command);
    if json {
        let payload = serde_json::to_string(&explanation).into_diagnostic()?;
        println!("{payload}");
    } else {
        println!("What this command does:");
        print!("{explanation}");
    }
    Ok(())
}

/// Handle the completions command.
#[allow(clippy::unnecessary_wraps)] // Consistent with other command handlers
fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

/// Load config, read the intent and build its plans.
fn prepare(
    config_path: Option<&Path>,
    intent_source: &str,
    cwd: Option<PathBuf>,
) -> aiclip::AiclipResult<(Config, BatchBuild)> {
    let config = validate_config(load_config(config_path)?)?;
    let cwd = resolve_cwd(cwd)?;
    let intent = Intent::from_json(&read_intent(intent_source)?)?;
    let build = pipeline::plan(&intent, &config, &cwd)?;
    Ok((config, build))
}

fn resolve_cwd(cwd: Option<PathBuf>) -> aiclip::AiclipResult<PathBuf> {
    let dir = match cwd {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|err| AiclipError::io("failed to read current directory", err))?,
    };
    std::fs::canonicalize(&dir).map_err(|err| {
        AiclipError::cli_invalid_arg(format!("--cwd {} is not usable: {err}", dir.display()))
    })
}

fn read_intent(source: &str) -> aiclip::AiclipResult<String> {
    if source == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| AiclipError::io("failed to read intent from stdin", err))?;
        return Ok(text);
    }
    std::fs::read_to_string(source).map_err(|err| {
        AiclipError::io(format!("failed to read intent file {source}"), err)
    })
}

/// Decide whether to proceed and whether existing outputs may be replaced.
fn confirm_plans(plans: &[CommandPlan], yes: bool) -> aiclip::AiclipResult<bool> {
    if yes {
        return Ok(true);
    }
    if !confirm::is_interactive() {
        return Err(AiclipError::confirmation_required(
            "confirmation needed but no terminal is attached",
            serde_json::json!({ "fix": "Re-run with --yes to proceed without prompting" }),
        ));
    }
    let destructive = plans.iter().filter(|plan| plan.destructive()).count();
    let question = if destructive > 0 {
        format!(
            "Run {} command(s)? {destructive} existing file(s) will be overwritten.",
            plans.len()
        )
    } else {
        format!("Run {} command(s)?", plans.len())
    };
    confirm::prompt(&question).map_err(|err| AiclipError::io("failed to read answer", err))
}

fn install_interrupt_handler(cancel: CancelToken) {
    if let Err(err) = ctrlc::set_handler(move || cancel.cancel()) {
        tracing::warn!(error = %err, "could not install Ctrl-C handler");
    }
}

fn emit_previews(
    json: bool,
    previews: &[Preview],
    failures: &[(usize, &AiclipError)],
) -> Result<()> {
    if json {
        let payload = serde_json::json!({
            "plans": previews,
            "failures": failures
                .iter()
                .map(|(index, err)| serde_json::json!({ "index": index, "error": err.to_error_info() }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string(&payload).into_diagnostic()?);
        return Ok(());
    }
    for preview in previews {
        println!("{preview}");
    }
    for (index, err) in failures {
        eprintln!("item {index} could not be built: {err}");
    }
    Ok(())
}

fn emit_results(
    json: bool,
    plans: &[CommandPlan],
    previews: &[Preview],
    results: Vec<aiclip::AiclipResult<ExecutionResult>>,
) -> Result<()> {
    let all_succeeded = results
        .iter()
        .all(|result| result.as_ref().is_ok_and(ExecutionResult::succeeded));
    let single_error = match results.as_slice() {
        [Err(err)] => Some(err.exit_code()),
        _ => None,
    };
    if json {
        let items: Vec<serde_json::Value> = results
            .iter()
            .map(|result| match result {
                Ok(result) => serde_json::json!({ "result": result }),
                Err(err) => serde_json::json!({ "error": err.to_error_info() }),
            })
            .collect();
        let payload = serde_json::json!({ "plans": previews, "results": items });
        println!("{}", serde_json::to_string(&payload).into_diagnostic()?);
    } else {
        for (plan, result) in plans.iter().zip(&results) {
            println!("{}", progress::summary_line(plan, result));
        }
    }
    match single_error {
        Some(code) => exit_with(code),
        None if all_succeeded => Ok(()),
        None => exit_with(1),
    }
}

/// Report an error and exit with its code.
fn fail(json: bool, err: AiclipError) -> Result<()> {
    let code = err.exit_code();
    if json {
        let payload = serde_json::to_string(&err.to_error_info()).into_diagnostic()?;
        println!("{payload}");
    } else {
        eprintln!("{:?}", miette::Report::new(err));
    }
    exit_with(code)
}

fn exit_with(code: i32) -> ! {
    std::process::exit(code)
}
