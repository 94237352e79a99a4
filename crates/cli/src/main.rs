mod serve;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use time::macros::format_description;
use time::Date;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spillway_core::{decide, predict, DamRegistry, DecisionParams, Prediction};
use spillway_pipeline::today_utc;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Spillway dam water-level monitoring toolchain.
#[derive(Parser)]
#[command(name = "spillway", version, about = "Dam water-level monitoring toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP/WebSocket analysis server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
        /// Dam registry JSON file (defaults to the builtin registry)
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Base URL of the imagery-analysis service (defaults to builtin demo data)
        #[arg(long)]
        oracle_url: Option<String>,
        /// Base URL of the geocoding service (defaults to builtin demo places)
        #[arg(long)]
        geocode_url: Option<String>,
        /// Path to TLS certificate PEM file (requires --tls-key)
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// Path to TLS private key PEM file (requires --tls-cert)
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },

    /// Classify a reservoir state into a gate action
    Decide {
        /// Today's water level in meters
        #[arg(long)]
        today: f64,
        /// Yesterday's water level in meters
        #[arg(long)]
        yesterday: f64,
        /// Dam capacity (full reservoir level) in meters
        #[arg(long)]
        capacity: f64,
        /// Fraction of capacity where the warn band starts
        #[arg(long, default_value = "0.9")]
        warn_fraction: f64,
        /// Daily rise in meters considered dangerous
        #[arg(long, default_value = "1.0")]
        rate_threshold: f64,
        /// Headroom in meters above capacity before an emergency release
        #[arg(long, default_value = "0.0")]
        emergency_margin: f64,
    },

    /// Project the date a rising reservoir reaches capacity
    Predict {
        /// Current water level in meters
        #[arg(long)]
        level: f64,
        /// Observed rate of change in meters per day
        #[arg(long)]
        rate: f64,
        /// Dam capacity (full reservoir level) in meters
        #[arg(long)]
        capacity: f64,
        /// Reference date as YYYY-MM-DD (defaults to today, UTC)
        #[arg(long)]
        from: Option<String>,
    },

    /// Look up a dam's configuration in the registry
    Lookup {
        /// Dam name or free-text query
        name: String,
        /// Dam registry JSON file (defaults to the builtin registry)
        #[arg(long)]
        registry: Option<PathBuf>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            registry,
            oracle_url,
            geocode_url,
            tls_cert,
            tls_key,
        } => {
            // Validate TLS flags: both must be provided or neither
            if tls_cert.is_some() != tls_key.is_some() {
                eprintln!("error: --tls-cert and --tls-key must both be provided");
                process::exit(1);
            }
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            if let Err(e) = rt.block_on(serve::start_server(
                port,
                registry,
                oracle_url,
                geocode_url,
                tls_cert,
                tls_key,
            )) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
        Commands::Decide {
            today,
            yesterday,
            capacity,
            warn_fraction,
            rate_threshold,
            emergency_margin,
        } => {
            let params = DecisionParams {
                capacity_m: capacity,
                warn_fraction,
                emergency_margin_m: emergency_margin,
                rate_threshold_m_per_day: rate_threshold,
            };
            cmd_decide(today, yesterday, params, cli.output, cli.quiet);
        }
        Commands::Predict {
            level,
            rate,
            capacity,
            from,
        } => {
            cmd_predict(level, rate, capacity, from.as_deref(), cli.output, cli.quiet);
        }
        Commands::Lookup { name, registry } => {
            cmd_lookup(&name, registry.as_deref(), cli.output, cli.quiet);
        }
    }
}

// ── Decide ───────────────────────────────────────────────────────────

fn cmd_decide(
    today: f64,
    yesterday: f64,
    params: DecisionParams,
    output: OutputFormat,
    quiet: bool,
) {
    if !today.is_finite() || !yesterday.is_finite() {
        report_error("error: water levels must be finite numbers", output, quiet);
        process::exit(1);
    }
    if let Err(msg) = validate_params(&params) {
        report_error(&format!("error: {}", msg), output, quiet);
        process::exit(1);
    }

    let decision = decide(today, yesterday, &params);
    match output {
        OutputFormat::Text => {
            println!("Action: {}", decision.status);
            println!(
                "Level: {:.2} m of {:.2} m capacity (warn at {:.2} m)",
                decision.today_level_m, decision.dam_capacity_m, decision.warn_threshold_m
            );
            println!(
                "Rate: {:+.2} m/day (threshold {:.2})",
                decision.rate_of_change_m_per_day, decision.rate_threshold_m_per_day
            );
            println!("Predicted next: {:.2} m", decision.predicted_next_level_m);
            if decision.overflow_m3 > 0.0 {
                println!("Overflow: {:.0} m3 above capacity", decision.overflow_m3);
            }
        }
        OutputFormat::Json => print_json(&decision),
    }
}

fn validate_params(params: &DecisionParams) -> Result<(), String> {
    if !(params.capacity_m.is_finite() && params.capacity_m > 0.0) {
        return Err("--capacity must be a positive number".to_string());
    }
    if !(params.warn_fraction > 0.0 && params.warn_fraction <= 1.0) {
        return Err("--warn-fraction must be in (0, 1]".to_string());
    }
    if !(params.rate_threshold_m_per_day.is_finite() && params.rate_threshold_m_per_day > 0.0) {
        return Err("--rate-threshold must be a positive number".to_string());
    }
    if !(params.emergency_margin_m.is_finite() && params.emergency_margin_m >= 0.0) {
        return Err("--emergency-margin must be zero or positive".to_string());
    }
    Ok(())
}

// ── Predict ──────────────────────────────────────────────────────────

fn cmd_predict(
    level: f64,
    rate: f64,
    capacity: f64,
    from: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) {
    let reference = match from {
        Some(raw) => match Date::parse(raw, format_description!("[year]-[month]-[day]")) {
            Ok(date) => date,
            Err(e) => {
                report_error(
                    &format!("error: invalid --from date '{}': {}", raw, e),
                    output,
                    quiet,
                );
                process::exit(1);
            }
        },
        None => today_utc(),
    };

    let prediction = predict(level, Some(rate), Some(capacity), reference);
    match output {
        OutputFormat::Text => match &prediction {
            Prediction::Ready {
                rate_of_change_m_per_day,
                days_to_open,
                predicted_open_date,
                predicted_level_at_open,
            } => {
                println!(
                    "Gates projected to open in {} day(s), on {}",
                    days_to_open, predicted_open_date
                );
                println!(
                    "Projected level: {:.2} m (rising {:+.3} m/day)",
                    predicted_level_at_open, rate_of_change_m_per_day
                );
            }
            Prediction::Unavailable { message } => {
                println!("No projection: {}", message);
            }
        },
        OutputFormat::Json => print_json(&prediction),
    }
}

// ── Lookup ───────────────────────────────────────────────────────────

fn cmd_lookup(name: &str, registry_path: Option<&Path>, output: OutputFormat, quiet: bool) {
    let registry = load_registry(registry_path, output, quiet);
    match registry.find_entry(name) {
        Some((key, config)) => match output {
            OutputFormat::Text => {
                println!("Matched: {}", key);
                println!("Capacity: {:.2} m", config.capacity_m);
                println!(
                    "Warn threshold: {:.2} m (fraction {:.2})",
                    config.capacity_m * config.warn_fraction,
                    config.warn_fraction
                );
                println!("Rate threshold: {:.2} m/day", config.rate_threshold_m_per_day);
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "matched": key,
                "capacity_m": config.capacity_m,
                "warn_fraction": config.warn_fraction,
                "rate_threshold_m_per_day": config.rate_threshold_m_per_day,
            })),
        },
        None => {
            report_error(
                &format!("error: no registry entry matches '{}'", name),
                output,
                quiet,
            );
            process::exit(1);
        }
    }
}

fn load_registry(path: Option<&Path>, output: OutputFormat, quiet: bool) -> DamRegistry {
    match path {
        Some(path) => match DamRegistry::load(path) {
            Ok(registry) => registry,
            Err(e) => {
                report_error(
                    &format!("error: failed to load registry '{}': {}", path.display(), e),
                    output,
                    quiet,
                );
                process::exit(1);
            }
        },
        None => DamRegistry::builtin(),
    }
}

// ── Shared helpers ───────────────────────────────────────────────────

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("error: failed to serialize output: {}", e);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
