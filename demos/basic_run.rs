//! Basic Run Example
//!
//! Loads a YAML configuration and writes one file per vehicle line.
//!
//! ```sh
//! cargo run --example basic_run -- config.yaml
//! ```

use prodsheet::{EtlConfig, FileSink, PipelineBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    let config = EtlConfig::from_path(&config_path)?;
    let pipeline = PipelineBuilder::from_config(config).build()?;
    let mut workbook = pipeline.open_workbook()?;

    let config = pipeline.config();
    let mut sink = FileSink::new(&config.output_dir, config.output_format);
    let report = pipeline.run_all(&mut workbook, &mut sink);
    report.save_missing_report(&config.missing_report)?;

    for line in &report.succeeded {
        println!("{}: {} records", line.vehicle_line, line.records);
    }
    for line in &report.failed {
        println!("{}: FAILED ({})", line.vehicle_line, line.error);
    }
    println!("Output written to: {}", config.output_dir.display());
    Ok(())
}
