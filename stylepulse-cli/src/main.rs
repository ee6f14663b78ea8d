use std::env;
use std::process;
use std::str::FromStr;
use std::time::Instant;

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;

use stylepulse_engine::normalizer::IngestWarning;
use stylepulse_engine::{Normalizer, ParameterSet, RawRow, SourceKind};
use stylepulse_pipeline::config::{load_aliases_file, load_params_file};
use stylepulse_pipeline::{load_raw_rows_file, ReportSet, Session};

const USAGE: &str = "\
Usage: stylepulse --sales FILE [--returns FILE] [--catalog FILE] [options]

Options:
  --as-of YYYY-MM-DD      Reference date (default: today)
  --params FILE           JSON parameter file; missing fields use defaults
  --aliases FILE          JSON column alias table
  --zero-sale-age N       Days without a sale before a style is zero-sale (default 14)
  --high-return-pct F     Return rate that flags a style, as a fraction (default 0.35)
  --new-age N             Styles younger than N days are new (default 60)
  --lookback N            Forecast lookback in days (default 30)
  --horizon N             Forecast horizon in days (default 10)
  --top N                 Limit the watchlist and forecast to N rows
  --json                  Output as JSON instead of formatted text

Example:
  stylepulse --sales sales.csv --returns returns.csv --catalog catalog.csv --as-of 2024-06-30";

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Args {
    sales: Option<String>,
    returns: Option<String>,
    catalog: Option<String>,
    as_of: Option<NaiveDate>,
    params: Option<String>,
    aliases: Option<String>,
    zero_sale_age: Option<u32>,
    high_return_pct: Option<f64>,
    new_age: Option<u32>,
    lookback: Option<u32>,
    horizon: Option<u32>,
    top: Option<usize>,
    json: bool,
}

fn usage_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    eprintln!();
    eprintln!("{}", USAGE);
    process::exit(1);
}

/// Value following `flag`, advancing the cursor past both.
fn take_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> &'a str {
    match args.get(*i + 1) {
        Some(value) => {
            *i += 2;
            value.as_str()
        }
        None => usage_error(&format!("{} requires a value", flag)),
    }
}

fn take_parsed<T: FromStr>(args: &[String], i: &mut usize, flag: &str, expected: &str) -> T {
    let raw = take_value(args, i, flag);
    raw.parse()
        .unwrap_or_else(|_| usage_error(&format!("{} requires {}, got '{}'", flag, expected, raw)))
}

fn parse_args(args: &[String]) -> Args {
    let mut parsed = Args::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" => parsed.sales = Some(take_value(args, &mut i, "--sales").to_string()),
            "--returns" => parsed.returns = Some(take_value(args, &mut i, "--returns").to_string()),
            "--catalog" => parsed.catalog = Some(take_value(args, &mut i, "--catalog").to_string()),
            "--params" => parsed.params = Some(take_value(args, &mut i, "--params").to_string()),
            "--aliases" => parsed.aliases = Some(take_value(args, &mut i, "--aliases").to_string()),
            "--as-of" => {
                parsed.as_of = Some(take_parsed(args, &mut i, "--as-of", "a YYYY-MM-DD date"))
            }
            "--zero-sale-age" => {
                parsed.zero_sale_age =
                    Some(take_parsed(args, &mut i, "--zero-sale-age", "a whole number of days"))
            }
            "--high-return-pct" => {
                parsed.high_return_pct =
                    Some(take_parsed(args, &mut i, "--high-return-pct", "a fraction such as 0.35"))
            }
            "--new-age" => {
                parsed.new_age = Some(take_parsed(args, &mut i, "--new-age", "a whole number of days"))
            }
            "--lookback" => {
                parsed.lookback =
                    Some(take_parsed(args, &mut i, "--lookback", "a whole number of days"))
            }
            "--horizon" => {
                parsed.horizon = Some(take_parsed(args, &mut i, "--horizon", "a whole number of days"))
            }
            "--top" => parsed.top = Some(take_parsed(args, &mut i, "--top", "a positive integer")),
            "--json" => {
                parsed.json = true;
                i += 1;
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => usage_error(&format!("unknown argument: {}", other)),
        }
    }
    parsed
}

/// Parameter file first, then individual flags on top.
fn build_params(args: &Args) -> ParameterSet {
    let mut params = match &args.params {
        Some(path) => load_params_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading parameters: {}", e);
            process::exit(1);
        }),
        None => ParameterSet::default(),
    };
    if let Some(days) = args.zero_sale_age {
        params.zero_sale_age_days = days;
    }
    if let Some(pct) = args.high_return_pct {
        params.high_return_pct = pct;
    }
    if let Some(days) = args.new_age {
        params.new_age_days = days;
    }
    if let Some(days) = args.lookback {
        params.forecast_lookback_days = days;
    }
    if let Some(days) = args.horizon {
        params.forecast_horizon_days = days;
    }
    params
}

fn load_or_exit(path: &str, kind: SourceKind) -> Vec<RawRow> {
    load_raw_rows_file(path, kind).unwrap_or_else(|e| {
        eprintln!("Error loading {} file: {}", kind, e);
        process::exit(1);
    })
}

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DigestJson<'a> {
    generated_at: String,
    as_of: NaiveDate,
    pass_ms: u128,
    warnings: &'a [IngestWarning],
    failures: Vec<String>,
    reports: &'a ReportSet,
}

// ---------------------------------------------------------------------------
// Human-readable output
// ---------------------------------------------------------------------------

/// Format an integer with comma thousands separators.
fn format_thousands(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let digits = value.unsigned_abs().to_string();

    let mut result = String::new();
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    format!("{}{}", sign, result.chars().rev().collect::<String>())
}

/// Minor units as whole currency units.
fn format_money(cents: i64) -> String {
    format_thousands(cents / 100)
}

fn format_age(age: Option<i64>) -> String {
    match age {
        Some(days) => format!("{}d", days),
        None => "never".to_string(),
    }
}

const WATCHLIST_PREVIEW: usize = 15;
const TOP_REASONS: usize = 10;

fn print_human(
    reports: &ReportSet,
    warnings: &[IngestWarning],
    failures: &[String],
    load_ms: u128,
    pass_ms: u128,
) {
    let rule = format!("  {:\u{2500}<72}", "");
    let kpis = &reports.kpis;

    println!();
    println!("  STYLEPULSE \u{00b7} Style digest as of {}", reports.as_of);
    println!("{}", rule);
    println!(
        "  {} to {}  \u{00b7}  {} orders  \u{00b7}  GMV {}  \u{00b7}  {} returns ({:.1}%)",
        kpis.window_start,
        kpis.window_end,
        format_thousands(kpis.orders as i64),
        format_money(kpis.gmv_cents),
        format_thousands(kpis.returns as i64),
        kpis.return_rate * 100.0
    );
    println!(
        "  {} styles tracked  \u{00b7}  {} active  \u{00b7}  {} on watchlist  \u{00b7}  {} dormant",
        kpis.styles_tracked,
        kpis.active_styles,
        reports.watchlist.len(),
        reports.dormant.len()
    );
    println!();

    println!("  WATCHLIST");
    if reports.watchlist.is_empty() {
        println!("  No styles need attention. All clear!");
    } else {
        for (i, row) in reports.watchlist.iter().take(WATCHLIST_PREVIEW).enumerate() {
            println!(
                "  {:>3}. {:24} {:>6}  returns {:>5.1}%  {:>4} recent / {:>3} back  {:8} {:22} {}",
                i + 1,
                row.style_id,
                format_age(row.age_since_last_sale),
                row.return_rate * 100.0,
                row.orders_recent,
                row.returns_recent,
                row.tag.to_string(),
                row.reason(),
                row.note
            );
        }
        if reports.watchlist.len() > WATCHLIST_PREVIEW {
            println!("       +{} more", reports.watchlist.len() - WATCHLIST_PREVIEW);
        }
    }
    println!();

    let totals = &reports.returns.totals;
    println!("  RETURNS");
    println!(
        "  {} returns over {} units ({:.1}%)  \u{00b7}  RTO {}  \u{00b7}  customer {}  \u{00b7}  unknown {}",
        format_thousands(totals.total_returns as i64),
        format_thousands(totals.total_units_sold as i64),
        totals.overall_return_rate * 100.0,
        totals.rto_count,
        totals.customer_return_count,
        totals.unknown_return_count
    );
    for reason in reports.returns.reasons.iter().take(TOP_REASONS) {
        println!("    {:>6}  {}", format_thousands(reason.count as i64), reason.reason);
    }
    println!();

    println!("  FORECAST");
    let shown: Vec<_> = reports
        .forecast
        .iter()
        .filter(|r| r.projected_demand > 0)
        .take(WATCHLIST_PREVIEW)
        .collect();
    if shown.is_empty() {
        println!("  No demand projected for the horizon.");
    } else {
        for row in shown {
            println!(
                "  {:28} {:>6.2}/day  {:>5} in {}d  stock {:>5}{}",
                row.style_id,
                row.daily_run_rate,
                row.projected_demand,
                row.horizon_days,
                row.total_required,
                if row.low_confidence { "  (low confidence)" } else { "" }
            );
        }
    }
    println!("{}", rule);

    if !warnings.is_empty() {
        println!("  {} ingestion warnings (rerun with --json for details)", warnings.len());
    }
    for failure in failures {
        println!("  skipped file: {}", failure);
    }
    println!(
        "  \u{23f1}  CSV loaded in {}ms \u{00b7} Pass ran in {}ms \u{00b7} Total {}ms",
        load_ms,
        pass_ms,
        load_ms + pass_ms
    );
    println!();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let raw_args: Vec<String> = env::args().collect();
    let args = parse_args(&raw_args);
    let sales_path = match &args.sales {
        Some(path) => path.clone(),
        None => usage_error("--sales is required"),
    };
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());

    let normalizer = match &args.aliases {
        Some(path) => match load_aliases_file(path) {
            Ok(table) => Normalizer::new(table),
            Err(e) => {
                eprintln!("Error loading aliases: {}", e);
                process::exit(1);
            }
        },
        None => Normalizer::default(),
    };
    let mut session = match Session::new(build_params(&args)) {
        Ok(session) => session.with_normalizer(normalizer),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Load and normalize the uploads
    let load_start = Instant::now();
    let sales = load_or_exit(&sales_path, SourceKind::Sales);
    let returns = args
        .returns
        .as_deref()
        .map(|path| load_or_exit(path, SourceKind::Returns));
    let catalog = args
        .catalog
        .as_deref()
        .map(|path| load_or_exit(path, SourceKind::Catalog));
    let report = session.ingest(&sales, returns.as_deref(), catalog.as_deref());
    let load_ms = load_start.elapsed().as_millis();
    log::info!("uploads loaded and normalized in {}ms", load_ms);

    if let Some(failure) = report
        .failures
        .iter()
        .find(|f| f.kind() == SourceKind::Sales)
    {
        eprintln!("Error: {}", failure);
        process::exit(1);
    }
    let failures: Vec<String> = report.failures.iter().map(ToString::to_string).collect();

    // Run the pass
    let pass_start = Instant::now();
    let reports = match session.compute(as_of, args.top) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let pass_ms = pass_start.elapsed().as_millis();

    if args.json {
        let digest = DigestJson {
            generated_at: Utc::now().to_rfc3339(),
            as_of,
            pass_ms,
            warnings: &report.warnings,
            failures,
            reports: &reports,
        };
        match serde_json::to_string_pretty(&digest) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing reports: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_human(&reports, &report.warnings, &failures, load_ms, pass_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("stylepulse")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
        assert_eq!(format_thousands(-45_000), "-45,000");
        assert_eq!(format_money(978_900), "9,789");
    }

    #[test]
    fn flags_override_defaults() {
        let parsed = parse_args(&args(&[
            "--sales",
            "s.csv",
            "--zero-sale-age",
            "30",
            "--as-of",
            "2024-06-30",
            "--top",
            "5",
            "--json",
        ]));
        assert_eq!(parsed.sales.as_deref(), Some("s.csv"));
        assert_eq!(parsed.as_of, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(parsed.top, Some(5));
        assert!(parsed.json);

        let params = build_params(&parsed);
        assert_eq!(params.zero_sale_age_days, 30);
        assert_eq!(params.new_age_days, 60);
    }
}
