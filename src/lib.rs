//! prodsheet - Vehicle-production workbook flattener
//!
//! Reads vehicle-production workbooks (XLSX) in which every vehicle line has its own sheet
//! made of irregular, visually formatted sub-tables (one per model year), and flattens each
//! sheet into uniform records keyed by a composite `serial_key`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use prodsheet::{EtlConfig, FileSink, PipelineBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load the configuration once and build the pipeline
//!     let config = EtlConfig::from_path("config.yaml")?;
//!     let pipeline = PipelineBuilder::from_config(config).build()?;
//!
//!     // Open the workbook named in the configuration
//!     let mut workbook = pipeline.open_workbook()?;
//!
//!     // One CSV file per vehicle line
//!     let config = pipeline.config();
//!     let mut sink = FileSink::new(&config.output_dir, config.output_format);
//!     let report = pipeline.run_all(&mut workbook, &mut sink);
//!
//!     report.save_missing_report(&config.missing_report)?;
//!     Ok(())
//! }
//! ```
//!
//! # In-Memory Parsing
//!
//! ```rust
//! use prodsheet::{CellValue, DimensionPolicy, MemoryWorkbook, PipelineBuilder, VehicleLine};
//!
//! # fn main() -> Result<(), prodsheet::ProdSheetError> {
//! let mut workbook = MemoryWorkbook::new();
//! workbook.add_sheet(
//!     "X",
//!     vec![
//!         vec![CellValue::text("X")],
//!         vec![CellValue::text("22MY")],
//!         vec![CellValue::Absent, CellValue::text("Trim"), CellValue::text("LX"), CellValue::text("EX")],
//!         vec![CellValue::text("Down Weeks")],
//!     ],
//! );
//!
//! let pipeline = PipelineBuilder::new()
//!     .with_vehicle_line(VehicleLine::new("X", DimensionPolicy::None))
//!     .build()?;
//! let records = pipeline.parse_sheet(&mut workbook, "X")?;
//!
//! assert_eq!(records.column("serial_key"), Some(vec!["x_22my", "x_22my_2"]));
//! assert_eq!(records.column("trim"), Some(vec!["LX", "EX"]));
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod classify;
mod config;
mod dimension;
mod error;
mod flatten;
mod formatter;
mod output;
mod parser;
mod pipeline;
mod security;
mod segment;
mod types;

// 公開API
pub use api::{DimensionPolicy, OutputFormat};
pub use builder::PipelineBuilder;
pub use classify::{RowClassifier, RowKind};
pub use config::{EtlConfig, VehicleLine};
pub use dimension::Dimensions;
pub use error::ProdSheetError;
pub use flatten::{RecordFlattener, FUEL_TYPE, MODEL_YEAR, SERIAL_KEY, SUB_FUEL_TYPE, VEHICLE_LINE};
pub use formatter::{CellFormatter, DateFormatter, DATE_FORMAT};
pub use output::{file_stem, FileSink, MemorySink, OutputFormatter, RecordSink, TABLE_PREFIX};
pub use parser::{MemoryWorkbook, SheetSource, XlsxWorkbook};
pub use pipeline::{
    LineFailure, LineSuccess, Pipeline, RunReport, SheetPipeline, SheetSummary, TableSummary,
};
pub use segment::{normalize_column_name, ColumnTable, ModelYearTable, TableSegmenter};
pub use types::{CellValue, RecordSet, SheetRow, SheetRows};
