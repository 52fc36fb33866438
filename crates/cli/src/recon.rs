//! `mbook run` and `mbook validate`: match two CSV exports under a rule config.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::ValueEnum;

use matchbook_recon::mapping::{load_transactions, IdGenerator};
use matchbook_recon::source::ParsedSource;
use matchbook_recon::wire::{check_rows, FullResponse, IndicesResponse};
use matchbook_recon::{MatchKind, MatchingConfig, ReconStats, Side};

use crate::exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_USAGE, EXIT_UNMATCHED};
use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// Matched and unmatched transactions with stats
    #[default]
    Full,
    /// Row indices only
    Indices,
}

pub struct RunArgs {
    pub a: PathBuf,
    pub b: PathBuf,
    pub config: PathBuf,
    pub mode: OutputMode,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub fail_on_unmatched: bool,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn read_arg_file(path: &Path, what: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| recon_err(EXIT_USAGE, format!("cannot read {what} {}: {e}", path.display())))
}

/// Load a TOML or JSON config, chosen by extension (TOML unless `.json`).
pub fn load_config(path: &Path) -> Result<MatchingConfig, CliError> {
    let text = read_arg_file(path, "config")?;
    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        MatchingConfig::from_json(&text)
    } else {
        MatchingConfig::from_toml(&text)
    };
    parsed.map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: format!("{}: {e}", path.display()),
        hint: Some("run `mbook validate` on the config for details".into()),
    })
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let started = Instant::now();
    let config = load_config(&args.config)?;

    let source_a = ParsedSource::from_csv(Side::A, &read_arg_file(&args.a, "source A")?)
        .map_err(|e| recon_err(recon_exit_code(&e), e.to_string()))?;
    let source_b = ParsedSource::from_csv(Side::B, &read_arg_file(&args.b, "source B")?)
        .map_err(|e| recon_err(recon_exit_code(&e), e.to_string()))?;
    check_rows(source_a.len(), source_b.len()).map_err(|e| recon_err(recon_exit_code(&e), e.to_string()))?;

    let mut ids = IdGenerator::new();
    let transactions_a = load_transactions(&config, Side::A, &source_a, &mut ids);
    let transactions_b = load_transactions(&config, Side::B, &source_b, &mut ids);

    let assignment = matchbook_recon::run_assignment(&transactions_a, &transactions_b, &config)
        .map_err(|e| {
            let mut err = recon_err(recon_exit_code(&e), e.to_string());
            if e.is_size_error() {
                err = err.with_hint("add a tolerance_numeric rule or split the input");
            }
            err
        })?;

    let stats = ReconStats::from_assignment(&assignment, started.elapsed());

    let json_str = match args.mode {
        OutputMode::Full => {
            let result = assignment.resolve(&transactions_a, &transactions_b, &config);
            serde_json::to_string_pretty(&FullResponse { result, stats: stats.clone() })
        }
        OutputMode::Indices => serde_json::to_string_pretty(&IndicesResponse::from_assignment(
            &assignment,
            &transactions_a,
            &transactions_b,
        )),
    }
    .map_err(|e| recon_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_ERROR, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    } else {
        let groups = assignment.matched.iter().filter(|m| m.kind != MatchKind::OneToOne).count();
        println!(
            "{} A x {} B: {} matched ({} group), {} A unmatched, {} B unmatched, {:.1}% of transactions matched",
            stats.total_a,
            stats.total_b,
            stats.matched_count,
            groups,
            stats.unmatched_a_count,
            stats.unmatched_b_count,
            stats.match_rate * 100.0,
        );
    }

    if args.fail_on_unmatched && (stats.unmatched_a_count > 0 || stats.unmatched_b_count > 0) {
        return Err(recon_err(
            EXIT_UNMATCHED,
            format!(
                "{} unmatched transactions remain",
                stats.unmatched_a_count + stats.unmatched_b_count
            ),
        ));
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let warnings = config.warnings();

    println!(
        "{}: {} rules, threshold {}, {} matching",
        config_path.display(),
        config.rules.len(),
        config.min_confidence_threshold,
        match config.matching_type {
            matchbook_recon::MatchingType::OneToOne => "one-to-one",
            matchbook_recon::MatchingType::Group => "group",
        },
    );
    for rule in &config.rules {
        println!(
            "  {:<16} {:<18} {} <-> {} (weight {})",
            rule.id,
            rule.match_type.to_string(),
            rule.column_a,
            rule.column_b,
            rule.weight
        );
    }
    for warning in &warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}
