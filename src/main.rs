//! prodsheet command line interface
//!
//! 設定ファイルに従ってワークブックの各車種ラインを解析し、
//! CSV / JSON / SQL ファイルとして書き出します。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info};

use prodsheet::{EtlConfig, FileSink, OutputFormat, PipelineBuilder, ProdSheetError, SheetSource};

#[derive(Parser, Debug)]
#[command(name = "prodsheet", version, about = "Flatten vehicle-production workbooks into tabular records")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse every configured vehicle line and write one file per line
    Run(RunArgs),
    /// Print the detected structure of each vehicle line without writing output
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Workbook to read (overrides the configuration file)
    #[arg(short, long)]
    workbook: Option<PathBuf>,

    /// Restrict processing to these vehicle lines (repeatable)
    #[arg(short, long = "line")]
    lines: Vec<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output directory (overrides the configuration file)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format: csv, json or sql (overrides the configuration file)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// File receiving the names of vehicle lines that failed
    #[arg(long)]
    missing_report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn setup_logging(cli: &Cli) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("prodsheet={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}

/// 設定ファイルを読み込み、コマンドライン引数で上書きしたビルダーを返す
fn load_builder(source: &SourceArgs) -> Result<PipelineBuilder, ProdSheetError> {
    let config = EtlConfig::from_path(&source.config)?;
    let mut builder = PipelineBuilder::from_config(config);
    if let Some(workbook) = &source.workbook {
        builder = builder.with_workbook(workbook);
    }
    if !source.lines.is_empty() {
        builder = builder.only_vehicle_lines(source.lines.iter().cloned());
    }
    Ok(builder)
}

fn run(args: &RunArgs) -> Result<bool, ProdSheetError> {
    let mut builder = load_builder(&args.source)?;
    if let Some(dir) = &args.output_dir {
        builder = builder.with_output_dir(dir);
    }
    if let Some(format) = args.format {
        builder = builder.with_output_format(format);
    }
    if let Some(path) = &args.missing_report {
        builder = builder.with_missing_report(path);
    }
    let pipeline = builder.build()?;
    let config = pipeline.config();

    let mut workbook = pipeline.open_workbook()?;
    let mut sink = FileSink::new(&config.output_dir, config.output_format);
    let report = pipeline.run_all(&mut workbook, &mut sink);

    report.save_missing_report(&config.missing_report)?;
    if !report.is_success() {
        info!(
            path = %config.missing_report.display(),
            failed = report.failed.len(),
            "failed vehicle lines written"
        );
    }
    Ok(report.is_success())
}

fn inspect(args: &InspectArgs) -> Result<bool, ProdSheetError> {
    let pipeline = load_builder(&args.source)?.build()?;
    let mut workbook = pipeline.open_workbook()?;

    let sheets = workbook.sheet_names();
    let mut ok = true;
    let mut summaries = Vec::new();

    for line in &pipeline.config().vehicle_lines {
        if !sheets.contains(&line.name) {
            error!(vehicle_line = %line.name, "sheet not found in workbook");
            ok = false;
            continue;
        }
        match pipeline.inspect_sheet(&mut workbook, &line.name) {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                error!(vehicle_line = %line.name, error = %e, "inspection failed");
                ok = false;
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(ok);
    }

    for summary in &summaries {
        println!("{} ({} visible rows)", summary.vehicle_line, summary.visible_rows);
        if !summary.fuel_types.is_empty() {
            println!("  fuel types: {}", summary.fuel_types.join(", "));
        }
        if !summary.sub_fuel_types.is_empty() {
            println!("  sub fuel types: {}", summary.sub_fuel_types.join(", "));
        }
        for table in &summary.tables {
            let marker = if table.divisible { "" } else { "  [indivisible]" };
            println!(
                "  {}: {} rows, columns: {}{}",
                table.model_year,
                table.rows,
                table.columns.join(", "),
                marker
            );
        }
    }
    Ok(ok)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli);

    let result = match &cli.command {
        Command::Run(args) => run(args),
        Command::Inspect(args) => inspect(args),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(2)
        }
    }
}
