//! apismoke CLI - REST API smoke testing with tallied verdicts

mod storage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use apismoke_core::preview::validate_config;
use apismoke_core::{
    Config, Plan, ProbeConfig, RunMeta, RunReport, ValidationStatus, VerdictPolicy, build_preview,
};
use apismoke_runner::{SmokeRunner, render_table, run_probe};

#[derive(Parser)]
#[command(name = "apismoke")]
#[command(about = "REST API smoke testing with tallied verdicts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Strict mode (any failure fails the run). Use `--strict false` to disable.
    #[arg(long, global = true, default_value_t = true, action = ArgAction::Set)]
    strict: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the smoke plan
    Run {
        /// Plan file (default: from config, smoke-plan.toml)
        #[arg(short, long)]
        plan: Option<String>,

        /// Config file (default: .apismoke.toml)
        #[arg(short, long)]
        config: Option<String>,

        /// Show the plan and validation results without sending requests
        #[arg(long)]
        dry_run: bool,

        /// Stop on first failed case (fast-fail for CI)
        #[arg(long)]
        stop_on_failure: bool,

        /// Run at most this many cases
        #[arg(long)]
        limit: Option<u32>,

        /// Write the JSON report here (overrides config report_path)
        #[arg(long)]
        report: Option<String>,

        /// Dump all exchanges to JSONL files
        #[arg(long)]
        dump: bool,

        /// Directory for dump files (default: .apismoke/dumps)
        #[arg(long)]
        dump_dir: Option<String>,

        /// Minimum overall pass rate (0.0-1.0, default 0.9)
        #[arg(long)]
        min_pass_rate: Option<f64>,
    },

    /// Fire concurrent GETs and report latency
    Probe {
        /// Config file (default: .apismoke.toml)
        #[arg(short, long)]
        config: Option<String>,

        /// Path to probe (repeatable; overrides config)
        #[arg(long = "path")]
        paths: Vec<String>,

        /// Requests per path
        #[arg(long)]
        rounds: Option<u32>,

        /// Worker threads (at most 5)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Initialize config and plan files
    Init,

    /// Show config and plan health
    Doctor,

    /// Export JSON Schema for the report format
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            plan,
            config,
            dry_run,
            stop_on_failure,
            limit,
            report,
            dump,
            dump_dir,
            min_pass_rate,
        } => {
            // Load config and plan
            let cfg = if let Some(path) = config {
                Config::load(Path::new(&path))?
            } else {
                Config::load_default()?
            };

            let plan_path = plan.map(PathBuf::from).unwrap_or_else(|| cfg.plan.clone());
            let plan = Plan::load(&plan_path)?;
            let plan_label = plan.label().to_string();
            let case_count = plan.cases.len();

            // Dry run: show plan preview and exit
            if dry_run {
                let preview = build_preview(&cfg, &plan);
                match cli.output {
                    OutputFormat::Terminal => {
                        println!("{}", preview.to_terminal());
                    }
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&preview)?);
                    }
                    OutputFormat::Silent => {}
                }
                return Ok(if preview.has_errors() { 1 } else { 0 });
            }

            if cli.output != OutputFormat::Silent {
                eprintln!("Config:");
                eprintln!("  plan:     {} ({case_count} cases)", plan_path.display());
                eprintln!("  base_url: {}", cfg.base_url);
                if let Some(auth) = &cfg.auth {
                    eprintln!("  auth:     {} via {}", auth.email, auth.login_path);
                }
                if cli.verbose {
                    eprintln!("  timeout:  {}s", cfg.timeout_secs);
                    if !cfg.headers.is_empty() {
                        eprintln!("  headers:  {} configured", cfg.headers.len());
                    }
                    if !cfg.path_params.is_empty() {
                        eprintln!("  params:   {} configured", cfg.path_params.len());
                    }
                }
                eprintln!();
            }

            let run_start = Instant::now();
            let output = SmokeRunner::new(cfg.clone(), plan)
                .with_stop_on_failure(stop_on_failure)
                .with_limit(limit)
                .run()?;
            let duration_secs = run_start.elapsed().as_secs_f64();

            // Safety check: no cases ran → tool error
            if output.summary.total == 0 {
                eprintln!("Error: No cases were run. Check the plan and base_url.");
                return Ok(3);
            }

            // Apply policy
            let policy = VerdictPolicy {
                strict: cli.strict,
                min_pass_rate: min_pass_rate.unwrap_or(0.9),
                ..Default::default()
            };
            let verdict = policy.verdict(&output.summary);

            let run_report = RunReport {
                meta: RunMeta {
                    base_url: cfg.base_url.clone(),
                    plan: plan_label,
                    timestamp: storage::timestamp_iso(),
                    duration_secs,
                },
                verdict,
                summary: output.summary,
                results: output.results,
            };

            match cli.output {
                OutputFormat::Terminal => {
                    println!("{}", run_report.to_terminal());
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&run_report)?);
                }
                OutputFormat::Silent => {}
            }

            // Optional report file (flag wins over config)
            let report_file = report.map(PathBuf::from).or_else(|| cfg.report_path.clone());
            if let Some(path) = report_file {
                match run_report.write_json(&path) {
                    Ok(()) => {
                        if cli.output != OutputFormat::Silent {
                            eprintln!("Report written: {}", path.display());
                        }
                    }
                    Err(e) => eprintln!("Warning: failed to write report: {e}"),
                }
            }

            // Dump all exchanges if requested (CLI flag or config)
            if dump || cfg.dump {
                let dump_path = dump_dir
                    .as_deref()
                    .map(PathBuf::from)
                    .or_else(|| cfg.dump_dir.clone())
                    .unwrap_or_else(|| PathBuf::from(".apismoke/dumps"));

                match apismoke_core::dump::write_dump(
                    &output.exchanges,
                    &dump_path,
                    true, // mask sensitive headers
                ) {
                    Ok(index) => {
                        if cli.output != OutputFormat::Silent {
                            eprintln!(
                                "Dump: {} exchanges → {} ({})",
                                index.total,
                                dump_path.display(),
                                index
                                    .categories
                                    .iter()
                                    .map(|e| e.file.as_str())
                                    .collect::<Vec<_>>()
                                    .join(", "),
                            );
                        }
                    }
                    Err(e) => {
                        eprintln!("Warning: failed to write dump: {e}");
                    }
                }
            }

            // Persist report to ~/.apismoke/reports/
            let report_data = storage::ReportData {
                config: &cfg,
                report: &run_report,
            };
            match storage::save_report(&report_data) {
                Ok(path) => {
                    if cli.output != OutputFormat::Silent {
                        eprintln!("Report saved: {}", path.display());
                    }
                }
                Err(e) => eprintln!("Warning: failed to save report: {e}"),
            }

            Ok(run_report.verdict.exit_code)
        }

        Commands::Probe {
            config,
            paths,
            rounds,
            workers,
        } => {
            let cfg = if let Some(path) = config {
                Config::load(Path::new(&path))?
            } else {
                Config::load_default()?
            };

            let mut probe = cfg.probe.clone().unwrap_or(ProbeConfig {
                paths: vec![],
                workers: 4,
                rounds: 5,
            });
            if !paths.is_empty() {
                probe.paths = paths;
            }
            if let Some(r) = rounds {
                probe.rounds = r;
            }
            if let Some(w) = workers {
                probe.workers = w;
            }

            if probe.paths.is_empty() {
                eprintln!("Error: no probe paths (use --path or [probe] in config)");
                return Ok(3);
            }

            if cli.output != OutputFormat::Silent {
                eprintln!(
                    "Probing {} paths on {}: {} rounds each, {} workers",
                    probe.paths.len(),
                    cfg.base_url,
                    probe.rounds,
                    probe.effective_workers(),
                );
            }

            let stats = run_probe(&cfg, &probe)?;

            match cli.output {
                OutputFormat::Terminal => println!("{}", render_table(&stats)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Silent => {}
            }

            Ok(0)
        }

        Commands::Init => {
            let config_path = ".apismoke.toml";
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");

            let plan_path = "smoke-plan.toml";
            if Path::new(plan_path).exists() {
                eprintln!("{plan_path} already exists, left untouched");
            } else {
                std::fs::write(plan_path, Plan::example())?;
                println!("Created {plan_path}");
            }

            println!("\nEdit the files to configure:");
            println!("  - base_url: environment to test (or set APISMOKE_BASE_URL)");
            println!("  - auth: login credentials and token pointer");
            println!("  - cases: the calls to run and their expected statuses");
            Ok(0)
        }

        Commands::Doctor => {
            println!("apismoke doctor");
            println!("===============\n");

            let config_ok = [".apismoke.toml", ".apismoke.json", "apismoke.toml"]
                .iter()
                .any(|p| Path::new(p).exists());
            println!(
                "[{}] Config file (.apismoke.toml)",
                if config_ok { "OK" } else { "--" }
            );

            if let Ok(cfg) = Config::load_default() {
                let plan_ok = cfg.plan.exists();
                println!(
                    "[{}] Plan file ({})",
                    if plan_ok { "OK" } else { "NG" },
                    cfg.plan.display()
                );
                println!(
                    "[{}] Auth ({})",
                    if cfg.auth.is_some() { "OK" } else { "--" },
                    cfg.auth
                        .as_ref()
                        .map_or("none configured".to_string(), |a| a.email.clone()),
                );

                for v in validate_config(&cfg) {
                    if v.status != ValidationStatus::Ok {
                        println!("[{}] {}", v.status, v.message);
                    }
                }
            }

            if !config_ok {
                println!("\nCreate config and plan files:");
                println!("  apismoke init");
            }

            println!("\nReady to run!");
            Ok(0)
        }

        Commands::Schema => {
            println!("{}", apismoke_core::generate_schema());
            Ok(0)
        }
    }
}
