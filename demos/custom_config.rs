//! Custom Configuration Example
//!
//! Builds a small preorder workbook in memory, then parses it with a pipeline configured
//! entirely in code (custom stop marker, model-year tags and JSON output).

use prodsheet::{
    DimensionPolicy, MemorySink, OutputFormat, OutputFormatter, PipelineBuilder, VehicleLine,
    XlsxWorkbook,
};
use rust_xlsxwriter::Workbook;
use std::io::Cursor;

fn sample_workbook() -> Result<Vec<u8>, rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name("Maverick")?;
    ws.write_string(0, 0, "Maverick")?;
    ws.write_string(0, 1, "Gas")?;
    ws.write_string(0, 2, "Hybrid")?;
    ws.write_string(1, 0, "25MY")?;
    ws.write_string(2, 1, "Trim")?;
    ws.write_string(2, 2, "XL")?;
    ws.write_string(2, 3, "XL")?;
    ws.write_string(3, 1, "S/L Order Bank")?;
    ws.write_number(3, 2, 40.0)?;
    ws.write_number(3, 3, 25.0)?;
    ws.write_string(4, 0, "End of Orders")?;
    Ok(workbook.save_to_buffer()?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = PipelineBuilder::new()
        .with_vehicle_line(VehicleLine::new("Maverick", DimensionPolicy::Fuel))
        // Recognise next year's tag only
        .with_model_year_tags(["25MY"])
        // Stop at a sheet-specific marker in addition to the defaults
        .add_stop_marker("End of Orders")
        .with_output_format(OutputFormat::Json)
        .build()?;

    let mut workbook = XlsxWorkbook::open(Cursor::new(sample_workbook()?))?;
    let mut sink = MemorySink::new();
    let report = pipeline.run_all(&mut workbook, &mut sink);
    println!("{} records, {} failed lines", report.total_records(), report.failed.len());

    let formatter = OutputFormatter::from_format(pipeline.config().output_format);
    let mut stdout = std::io::stdout();
    for line in sink.vehicle_lines() {
        if let Some(records) = sink.get(line) {
            formatter.render(line, records, &mut stdout)?;
        }
    }
    Ok(())
}
