use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use kijin_core::domain::recommendation::MarketAnalysis;
use kijin_core::engine::EngineParams;
use serde::Serialize;
use std::io::Read;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "kijin_worker")]
struct Args {
    /// JSON price file: a bare array or `{"prices": [...]}`. Use `-` for stdin.
    #[arg(long, default_value = "-")]
    input: String,

    /// Label echoed in the report.
    #[arg(long, default_value = "bitcoin")]
    coin: String,

    /// Reduce timestamped prices to one close per UTC day before analysis.
    #[arg(long)]
    daily: bool,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct AnalysisReport {
    coin: String,
    generated_at: DateTime<Utc>,
    analysis: MarketAnalysis,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = kijin_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match run(&settings, &args) {
        Ok(()) => Ok(()),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(coin = %args.coin, error = %err, "analysis run failed");
            Err(err)
        }
    }
}

fn run(settings: &kijin_core::config::Settings, args: &Args) -> anyhow::Result<()> {
    let params = settings.engine_params()?;
    let text = read_input(&args.input, std::io::stdin())?;
    let report = build_report(args, &params, &text)?;

    let out = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");
    Ok(())
}

fn build_report(
    args: &Args,
    params: &EngineParams,
    text: &str,
) -> anyhow::Result<AnalysisReport> {
    let series = kijin_core::ingest::prices::parse_prices(text, args.daily)
        .with_context(|| format!("failed to load prices from {}", args.input))?;

    tracing::info!(
        coin = %args.coin,
        len = series.len(),
        daily = args.daily,
        rsi_period = params.rsi_period,
        forecast_window = params.forecast_window,
        "running market analysis"
    );

    let analysis = kijin_core::engine::analyze(&series, params)
        .with_context(|| format!("analysis failed for {}", args.coin))?;

    tracing::info!(
        coin = %args.coin,
        recommendation = %analysis.signal.recommendation,
        confidence = analysis.confidence,
        "analysis complete"
    );

    Ok(AnalysisReport {
        coin: args.coin.clone(),
        generated_at: Utc::now(),
        analysis,
    })
}

fn read_input(input: &str, mut stdin: impl Read) -> anyhow::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        stdin
            .read_to_string(&mut buf)
            .context("failed to read prices from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))
}

fn init_sentry(settings: &kijin_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["kijin_worker"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    fn price_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn report_from_file_has_expected_shape() {
        let file = price_file("[101, 102, 103, 104, 105, 106, 107, 108]");
        let path = file.path().to_str().unwrap();
        let args = args(&["--input", path, "--coin", "solana"]);

        let text = read_input(&args.input, std::io::empty()).unwrap();
        let report = build_report(&args, &EngineParams::default(), &text).unwrap();
        let v = serde_json::to_value(&report).unwrap();

        let mut keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["analysis", "coin", "generated_at"]);
        assert_eq!(v["coin"], "solana");
        assert_eq!(v["analysis"]["signal"]["recommendation"], "ACCUMULATE");
        assert_eq!(v["analysis"]["signal"]["reasons"].as_array().unwrap().len(), 3);
        assert_eq!(v["analysis"]["forecast"]["trend_direction"], "UP");
    }

    #[test]
    fn reads_stdin_for_dash() {
        let args = args(&[]);
        assert_eq!(args.input, "-");
        assert_eq!(args.coin, "bitcoin");

        let text = read_input(&args.input, "[5.0, 6.0]".as_bytes()).unwrap();
        let report = build_report(&args, &EngineParams::default(), &text).unwrap();
        assert_eq!(report.analysis.last_price, 6.0);
    }

    #[test]
    fn daily_flag_reduces_to_closes() {
        // 2026-01-01 00:00 UTC, two points that day, one the next.
        let day = 1_767_225_600_000_i64;
        let body = format!(
            "{{\"prices\": [[{}, 10.0], [{}, 12.0], [{}, 11.0]]}}",
            day,
            day + 3_600_000,
            day + 86_400_000
        );
        let args = args(&["--daily"]);
        let report = build_report(&args, &EngineParams::default(), &body).unwrap();
        assert_eq!(report.analysis.last_price, 11.0);
        assert_eq!(report.analysis.indicators.moving_average, 11.5);
    }

    #[test]
    fn empty_series_and_missing_file_carry_context() {
        let args = args(&["--coin", "cardano"]);
        let err = build_report(&args, &EngineParams::default(), "[]").unwrap_err();
        assert!(format!("{err:#}").contains("analysis failed for cardano"), "{err:#}");

        let err = build_report(&args, &EngineParams::default(), "not json").unwrap_err();
        assert!(format!("{err:#}").contains("failed to load prices from -"), "{err:#}");

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let missing = missing.to_str().unwrap();
        let err = read_input(missing, std::io::empty()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"), "{err:#}");
    }
}
