mod error_formatter;
mod formatter;
mod server;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use formatter::Formatter;
use rulebook::{Engine, ExecutionOptions, MatchMode};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File suffix the `test` and `server` commands look for when walking a directory
const PROGRAM_SUFFIX: &str = ".rulebook.json";

#[derive(Parser)]
#[command(name = "rulebook")]
#[command(about = "Deterministic, explainable rule programs.")]
#[command(
    long_about = "Rulebook validates declarative rule programs and runs them against fact payloads.\nEvery decision is traced: which rules matched, what they wrote, and which constraints held."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    FirstMatch,
    AllMatches,
}

impl From<ModeArg> for MatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FirstMatch => MatchMode::FirstMatch,
            ModeArg::AllMatches => MatchMode::AllMatches,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a program against facts and show the trace
    ///
    /// Facts come from a JSON file, inline JSON, or `entity.field=value`
    /// overrides, applied in that order.
    Run {
        /// Program document (JSON)
        program: PathBuf,
        /// Fact overrides (format: entity.field=value)
        ///
        /// Examples: order.total=120, order.vip=true, order.status=open
        facts: Vec<String>,
        /// JSON file with the fact payload
        #[arg(short = 'f', long = "facts")]
        facts_file: Option<PathBuf>,
        /// Inline JSON fact payload
        #[arg(short = 'i', long, conflicts_with = "facts_file")]
        input: Option<String>,
        /// Override the program's default match mode
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,
        /// Repeat passes until no rule changes state
        #[arg(short = 'l', long = "loop")]
        loop_until_settled: bool,
        /// Simulate actions without writing
        #[arg(long)]
        dry_run: bool,
        /// Maximum matched rules per execution
        #[arg(long, default_value_t = 1000)]
        max_firings: usize,
        /// Maximum passes per execution
        #[arg(long, default_value_t = 100)]
        max_passes: usize,
        /// Also replay the program's examples
        #[arg(short = 'e', long)]
        examples: bool,
        /// Print the execution result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a program without running it
    ///
    /// Reports reference, type, unit and conflict findings. Exits non-zero
    /// when the program has errors.
    Check {
        /// Program document (JSON)
        program: PathBuf,
        /// Print the validation report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay declared examples
    ///
    /// Accepts one program file or a directory; directories are searched
    /// recursively for *.rulebook.json files.
    Test {
        /// Program document or directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Show how many examples make each rule fire
    Coverage {
        /// Program document (JSON)
        program: PathBuf,
    },
    /// Start HTTP REST API server (default: localhost:3000)
    ///
    /// Programs found under --dir are served by name; requests may also
    /// carry an inline program.
    /// API: POST /run with {program | name, facts, options}
    Server {
        /// Directory containing *.rulebook.json programs
        #[arg(short = 'd', long = "dir", default_value = ".")]
        workdir: PathBuf,
        /// Host address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port number to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Run {
            program,
            facts,
            facts_file,
            input,
            mode,
            loop_until_settled,
            dry_run,
            max_firings,
            max_passes,
            examples,
            json,
        } => {
            let options = ExecutionOptions {
                mode: mode.map(MatchMode::from),
                max_rule_firings: max_firings,
                max_passes,
                enable_actions: !dry_run,
                loop_until_settled,
                evaluate_examples: examples,
            };
            let payload = FactSource {
                file: facts_file,
                inline: input,
                overrides: facts,
            };
            run_command(&program, &payload, options, json)
        }
        Commands::Check { program, json } => check_command(&program, json),
        Commands::Test { path } => test_command(&path),
        Commands::Coverage { program } => coverage_command(&program),
        Commands::Server {
            workdir,
            host,
            port,
        } => server_command(&workdir, &host, port),
    };

    if let Err(e) = result {
        if let Some(rulebook_err) = e.downcast_ref::<rulebook::RulebookError>() {
            eprintln!("{}", error_formatter::format_error(rulebook_err));
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rulebook=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

struct FactSource {
    file: Option<PathBuf>,
    inline: Option<String>,
    overrides: Vec<String>,
}

impl FactSource {
    fn load(&self) -> Result<serde_json::Value> {
        let mut payload = if let Some(path) = &self.file {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read facts from {}", path.display()))?;
            parse_payload(&text)?
        } else if let Some(text) = &self.inline {
            parse_payload(text)?
        } else {
            serde_json::Value::Object(serde_json::Map::new())
        };

        for assignment in &self.overrides {
            apply_override(&mut payload, assignment)?;
        }
        Ok(payload)
    }
}

fn parse_payload(text: &str) -> Result<serde_json::Value> {
    if text.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    Ok(serde_json::from_str(text).context("Fact payload is not valid JSON")?)
}

/// Apply one `entity.field=value` override onto a payload object
fn apply_override(payload: &mut serde_json::Value, assignment: &str) -> Result<()> {
    let Some((path, raw)) = assignment.split_once('=') else {
        bail!("Invalid fact '{}': expected entity.field=value", assignment);
    };
    let Some((entity, field)) = path.trim().split_once('.') else {
        bail!("Invalid fact path '{}': expected entity.field", path);
    };
    if entity.is_empty() || field.is_empty() || field.contains('.') {
        bail!("Invalid fact path '{}': expected entity.field", path);
    }

    let serde_json::Value::Object(root) = payload else {
        bail!("Fact payload must be a JSON object");
    };
    let slot = root
        .entry(entity.to_string())
        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    let serde_json::Value::Object(fields) = slot else {
        bail!("Fact payload entry '{}' is not an object", entity);
    };
    fields.insert(field.to_string(), parse_fact_value(raw.trim())?);
    Ok(())
}

/// Booleans, `null`, exact decimals, quoted or bare text
fn parse_fact_value(raw: &str) -> Result<serde_json::Value> {
    match raw {
        "true" => return Ok(serde_json::Value::Bool(true)),
        "false" => return Ok(serde_json::Value::Bool(false)),
        "null" => return Ok(serde_json::Value::Null),
        _ => {}
    }
    if let Ok(number) = raw.parse::<Decimal>() {
        return Ok(serde_json::from_str(&number.normalize().to_string())?);
    }
    let text = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    Ok(serde_json::Value::String(text.to_string()))
}

fn load_engine(path: &Path) -> Result<Engine> {
    let document = fs::read_to_string(path)
        .with_context(|| format!("Failed to read program {}", path.display()))?;
    Ok(Engine::from_json(&document)?)
}

fn run_command(
    program: &Path,
    facts: &FactSource,
    options: ExecutionOptions,
    json: bool,
) -> Result<()> {
    let engine = load_engine(program)?;
    let payload = facts.load()?;
    let result = engine.run_with(&payload, &options)?;

    if json {
        let value = rulebook::serializers::result_to_json(&result)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let formatter = Formatter::default();
        print!("{}", formatter.format_validation(engine.validation()));
        print!("{}", formatter.format_result(&result));
    }

    if !result.success {
        bail!(
            "{} constraint(s) failed with severity error",
            result.constraints.errors.len()
        );
    }
    Ok(())
}

fn check_command(program: &Path, json: bool) -> Result<()> {
    let document = fs::read_to_string(program)
        .with_context(|| format!("Failed to read program {}", program.display()))?;
    let parsed = rulebook::serializers::program_from_json(&document)?;
    let report = rulebook::Validator::new().validate(&parsed);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let formatter = Formatter::default();
        print!("{}", formatter.format_validation(&report));
        if report.is_valid() {
            println!(
                "{} is valid ({} rule(s), {} warning(s))",
                program.display(),
                parsed.rules.len(),
                report.warnings.len()
            );
        }
    }

    if !report.is_valid() {
        bail!(
            "{} has {} validation error(s)",
            program.display(),
            report.errors.len()
        );
    }
    Ok(())
}

fn test_command(path: &Path) -> Result<()> {
    let files = collect_programs(path)?;
    if files.is_empty() {
        bail!("No {} files found under {}", PROGRAM_SUFFIX, path.display());
    }

    let formatter = Formatter::default();
    let mut total = 0;
    let mut failed = 0;
    for file in &files {
        let engine = load_engine(file)?;
        let report = engine.run_examples();
        total += report.total;
        failed += report.failed;
        print!("{}", formatter.format_examples(&file.display().to_string(), &report));
    }

    println!(
        "{} file(s), {} example(s), {} passed, {} failed",
        files.len(),
        total,
        total - failed,
        failed
    );
    if failed > 0 {
        bail!("{} example(s) failed", failed);
    }
    Ok(())
}

fn coverage_command(program: &Path) -> Result<()> {
    let engine = load_engine(program)?;
    let coverage = engine.assess_coverage();
    print!("{}", Formatter::default().format_coverage(&coverage));
    Ok(())
}

/// A single file is taken as-is; directories are walked for program documents
fn collect_programs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        let is_program = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(PROGRAM_SUFFIX));
        if entry.file_type().is_file() && is_program {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Program name for the server registry: the declared name, else the file stem
fn program_key(engine: &Engine, path: &Path) -> String {
    if let Some(name) = &engine.program().name {
        return name.clone();
    }
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    file_name
        .strip_suffix(PROGRAM_SUFFIX)
        .unwrap_or(file_name)
        .to_string()
}

fn server_command(workdir: &Path, host: &str, port: u16) -> Result<()> {
    #[cfg(feature = "server")]
    {
        use std::collections::BTreeMap;
        use tokio::runtime::Runtime;

        let mut programs = BTreeMap::new();
        for path in collect_programs(workdir)? {
            let engine = load_engine(&path)?;
            programs.insert(program_key(&engine, &path), engine);
        }

        println!(
            "Starting HTTP server with {} program(s) loaded",
            programs.len()
        );
        let rt = Runtime::new()?;
        rt.block_on(server::http::start_server(programs, host, port))?;
    }

    #[cfg(not(feature = "server"))]
    {
        let _ = (workdir, host, port);
        eprintln!("Error: Server feature not enabled");
        eprintln!("Recompile with: cargo build --features server");
        std::process::exit(1);
    }

    Ok(())
}
