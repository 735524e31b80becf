//! Integration Tests for prodsheet
//!
//! Real XLSX fixtures are generated with rust_xlsxwriter and run through the whole pipeline:
//! workbook reading (hidden rows, dates), segmentation, dimensions, flattening and sinks.

use rust_xlsxwriter::*;
use std::fs;
use std::io::Cursor;
use prodsheet::{
    CellValue, DimensionPolicy, FileSink, MemorySink, OutputFormat, PipelineBuilder,
    ProdSheetError, SheetSource, VehicleLine, XlsxWorkbook,
};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    fn date_format() -> Format {
        Format::new().set_num_format("mm/dd/yyyy")
    }

    /// Fuel-type sheet with two model years, a date row and a stop marker
    pub fn write_escape(workbook: &mut Workbook) -> Result<(), XlsxError> {
        let ws = workbook.add_worksheet();
        ws.set_name("Escape")?;

        ws.write_string(0, 0, "Escape")?;
        ws.write_string(0, 1, "Gas")?;
        ws.write_string(0, 2, "Hybrid")?;

        ws.write_string(1, 0, "22MY")?;
        ws.write_string(2, 1, "Trim")?;
        for (i, trim) in ["S", "S", "SE", "SE"].iter().enumerate() {
            ws.write_string(2, 2 + i as u16, *trim)?;
        }
        ws.write_string(3, 1, "Job 1")?;
        for i in 0..4u16 {
            // 2023-01-02
            ws.write_number_with_format(3, 2 + i, 44928.0, &date_format())?;
        }

        // row 4 is left empty

        ws.write_string(5, 0, "23MY")?;
        ws.write_string(6, 1, "Trim")?;
        ws.write_string(6, 2, "ST")?;
        ws.write_string(6, 3, "ST")?;
        ws.write_string(7, 1, "Order Bank")?;
        ws.write_number(7, 2, 120.0)?;
        ws.write_number(7, 3, 80.5)?;

        ws.write_string(8, 0, "Down Weeks")?;
        ws.write_string(9, 1, "Ignored")?;
        ws.write_string(9, 2, "after terminator")?;
        Ok(())
    }

    /// No-dimension sheet with hidden rows (one of them holds a stop marker)
    pub fn write_edge(workbook: &mut Workbook) -> Result<(), XlsxError> {
        let ws = workbook.add_worksheet();
        ws.set_name("Edge")?;

        ws.write_string(0, 0, "Edge")?;
        ws.write_string(1, 0, "22MY")?;
        ws.write_string(2, 1, "Trim")?;
        ws.write_string(2, 2, "SE")?;
        ws.write_string(2, 3, "ST")?;

        ws.write_string(3, 0, "Down Weeks")?;
        ws.set_row_hidden(3)?;

        ws.write_string(4, 1, "Secret")?;
        ws.write_string(4, 2, "hidden value")?;
        ws.write_string(4, 3, "hidden value")?;
        ws.set_row_hidden(4)?;

        ws.write_string(5, 1, "Paint")?;
        ws.write_string(5, 2, "Red")?;
        ws.write_string(5, 3, "Updates highlighted in orange")?;
        ws.write_string(5, 4, "Blue")?;

        ws.write_string(6, 0, "Allocation Quarter")?;
        Ok(())
    }

    /// Fuel-type sheet whose table does not divide evenly by the fuel types
    pub fn write_bronco(workbook: &mut Workbook) -> Result<(), XlsxError> {
        let ws = workbook.add_worksheet();
        ws.set_name("Bronco")?;

        ws.write_string(0, 0, "Bronco")?;
        ws.write_string(0, 1, "Gas")?;
        ws.write_string(0, 2, "Electric")?;
        ws.write_string(1, 0, "24MY")?;
        ws.write_string(2, 1, "Trim")?;
        ws.write_string(2, 2, "Base")?;
        ws.write_string(2, 3, "Big Bend")?;
        ws.write_string(2, 4, "Badlands")?;
        Ok(())
    }

    /// Fuel + sub-fuel sheet with a merged-style fuel header and repeated sub-fuel labels
    pub fn write_super_duty(workbook: &mut Workbook) -> Result<(), XlsxError> {
        let ws = workbook.add_worksheet();
        ws.set_name("Super Duty")?;

        ws.write_string(0, 0, "Super Duty")?;
        ws.write_string(0, 1, "Gas")?;
        ws.write_string(0, 3, "Diesel")?;
        for (i, label) in ["SRW", "DRW", "SRW", "DRW"].iter().enumerate() {
            ws.write_string(1, 2 + i as u16, *label)?;
        }

        ws.write_string(2, 0, "24MY")?;
        ws.write_string(3, 1, "Cab")?;
        for (i, cab) in ["Regular", "Crew", "Regular", "Crew"].iter().enumerate() {
            ws.write_string(3, 2 + i as u16, *cab)?;
        }
        ws.write_string(4, 0, "Constrained Commodity Information")?;
        Ok(())
    }

    pub fn generate_preorder_workbook() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        write_escape(&mut workbook)?;
        write_edge(&mut workbook)?;
        write_bronco(&mut workbook)?;
        write_super_duty(&mut workbook)?;
        Ok(workbook.save_to_buffer()?)
    }

    /// No-dimension sheet whose lead-time row uses a duration format
    pub fn generate_duration_workbook() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name("Transit")?;

        let duration = Format::new().set_num_format("[hh]:mm:ss");
        ws.write_string(0, 0, "Transit")?;
        ws.write_string(1, 0, "22MY")?;
        ws.write_string(2, 1, "Trim")?;
        ws.write_string(2, 2, "XL")?;
        ws.write_string(2, 3, "XLT")?;
        ws.write_string(3, 1, "Lead Time")?;
        // 36:00:00 and 48:00:00
        ws.write_number_with_format(3, 2, 1.5, &duration)?;
        ws.write_number_with_format(3, 3, 2.0, &duration)?;
        ws.write_string(4, 0, "Down Weeks")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Fuel-type sheet with a data row named like the fuel type column
    pub fn generate_fuel_type_column_workbook() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name("Escape")?;

        ws.write_string(0, 0, "Escape")?;
        ws.write_string(0, 1, "Gas")?;
        ws.write_string(0, 2, "Hybrid")?;
        ws.write_string(1, 0, "22MY")?;
        ws.write_string(2, 1, "Fuel Type")?;
        ws.write_string(2, 2, "Gas engine")?;
        ws.write_string(2, 3, "Hybrid engine")?;
        ws.write_string(3, 1, "Trim")?;
        ws.write_string(3, 2, "S")?;
        ws.write_string(3, 3, "SE")?;
        ws.write_string(4, 0, "Down Weeks")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Sheet whose used range starts at C3
    pub fn generate_offset_range() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name("Offset")?;
        ws.write_string(2, 2, "first")?;
        ws.write_number(3, 3, 5.0)?;
        ws.write_boolean(3, 4, true)?;
        Ok(workbook.save_to_buffer()?)
    }
}

fn open_preorder() -> XlsxWorkbook {
    let data = fixtures::generate_preorder_workbook().unwrap();
    XlsxWorkbook::open(Cursor::new(data)).unwrap()
}

fn pipeline(lines: Vec<VehicleLine>) -> prodsheet::Pipeline {
    PipelineBuilder::new()
        .with_vehicle_lines(lines)
        .build()
        .unwrap()
}

#[test]
fn test_sheet_names_in_workbook_order() {
    let workbook = open_preorder();
    assert_eq!(
        workbook.sheet_names(),
        vec!["Escape", "Edge", "Bronco", "Super Duty"]
    );
}

#[test]
fn test_fuel_type_sheet() {
    let pipeline = pipeline(vec![VehicleLine::new("Escape", DimensionPolicy::Fuel)]);
    let records = pipeline.parse_sheet(&mut open_preorder(), "Escape").unwrap();

    assert_eq!(
        records.columns,
        vec![
            "serial_key",
            "vehicle_line",
            "fuel_type",
            "model_year",
            "trim",
            "job_1",
            "order_bank"
        ]
    );
    assert_eq!(records.len(), 6);
    assert_eq!(
        records.column("fuel_type"),
        Some(vec!["Gas", "Hybrid", "Gas", "Hybrid", "Gas", "Hybrid"])
    );
    assert_eq!(
        records.column("model_year"),
        Some(vec!["22MY", "22MY", "22MY", "22MY", "23MY", "23MY"])
    );
    assert_eq!(
        records.column("serial_key"),
        Some(vec![
            "escape_22my_gas",
            "escape_22my_hybrid",
            "escape_22my_gas_2",
            "escape_22my_hybrid_2",
            "escape_23my_gas",
            "escape_23my_hybrid",
        ])
    );
    assert_eq!(
        records.column("job_1"),
        Some(vec!["01/02/2023", "01/02/2023", "01/02/2023", "01/02/2023", "", ""])
    );
    assert_eq!(
        records.column("order_bank"),
        Some(vec!["", "", "", "", "120", "80.5"])
    );
}

#[test]
fn test_hidden_rows_never_reach_output() {
    let pipeline = pipeline(vec![VehicleLine::new("Edge", DimensionPolicy::None)]);
    let records = pipeline.parse_sheet(&mut open_preorder(), "Edge").unwrap();

    // The hidden stop marker does not end the table and the hidden row is not read
    assert_eq!(
        records.columns,
        vec!["serial_key", "vehicle_line", "model_year", "trim", "lpo_paint"]
    );
    assert_eq!(records.column("trim"), Some(vec!["SE", "ST"]));
    // Boilerplate is removed before the paint values are aligned
    assert_eq!(records.column("lpo_paint"), Some(vec!["Red", "Blue"]));
    for row in &records.rows {
        assert!(!row.iter().any(|v| v == "hidden value"));
        assert!(!row.iter().any(|v| v.starts_with("Updates highlighted")));
    }
}

#[test]
fn test_visible_rows_keep_absolute_row_index() {
    let mut workbook = open_preorder();
    let rows = workbook.visible_rows("Edge").unwrap();
    let indices: Vec<u32> = rows.rows.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 5, 6]);
}

#[test]
fn test_sub_fuel_type_sheet() {
    let pipeline = pipeline(vec![VehicleLine::new(
        "Super Duty",
        DimensionPolicy::FuelAndSubFuel,
    )]);
    let records = pipeline
        .parse_sheet(&mut open_preorder(), "Super Duty")
        .unwrap();

    assert_eq!(
        records.columns,
        vec![
            "serial_key",
            "vehicle_line",
            "fuel_type",
            "sub_fuel_type",
            "model_year",
            "cab"
        ]
    );
    assert_eq!(
        records.column("serial_key"),
        Some(vec![
            "super_duty_24my_gas_srw",
            "super_duty_24my_gas_drw",
            "super_duty_24my_diesel_srw",
            "super_duty_24my_diesel_drw",
        ])
    );
    assert_eq!(
        records.column("cab"),
        Some(vec!["Regular", "Crew", "Regular", "Crew"])
    );
}

#[test]
fn test_indivisible_table_fails_sheet() {
    let pipeline = pipeline(vec![VehicleLine::new("Bronco", DimensionPolicy::Fuel)]);
    let err = pipeline
        .parse_sheet(&mut open_preorder(), "Bronco")
        .unwrap_err();
    match err {
        ProdSheetError::DimensionMismatch {
            vehicle_line,
            model_year,
            rows,
            unit,
        } => {
            assert_eq!(vehicle_line, "Bronco");
            assert_eq!(model_year, "24MY");
            assert_eq!(rows, 3);
            assert_eq!(unit, 2);
        }
        e => panic!("Expected DimensionMismatch, got {:?}", e),
    }
}

#[test]
fn test_run_all_continues_after_failures() {
    let pipeline = pipeline(vec![
        VehicleLine::new("Bronco", DimensionPolicy::Fuel),
        VehicleLine::new("Escape", DimensionPolicy::Fuel),
        VehicleLine::new("Ranger", DimensionPolicy::None),
        VehicleLine::new("Edge", DimensionPolicy::None),
    ]);
    let mut sink = MemorySink::new();
    let report = pipeline.run_all(&mut open_preorder(), &mut sink);

    assert_eq!(report.failed_lines().collect::<Vec<_>>(), vec!["Bronco", "Ranger"]);
    assert_eq!(sink.vehicle_lines(), &["Escape".to_string(), "Edge".to_string()]);
    assert_eq!(report.total_records(), 8);
}

#[test]
fn test_file_sink_and_missing_report() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("csvs_generated");
    let missing = dir.path().join("missing_csvs.txt");

    let pipeline = PipelineBuilder::new()
        .with_vehicle_lines([
            VehicleLine::new("Super Duty", DimensionPolicy::FuelAndSubFuel),
            VehicleLine::new("Bronco", DimensionPolicy::Fuel),
        ])
        .with_output_dir(&out)
        .with_missing_report(&missing)
        .build()
        .unwrap();
    let config = pipeline.config();

    let mut sink = FileSink::new(&config.output_dir, OutputFormat::Csv);
    let report = pipeline.run_all(&mut open_preorder(), &mut sink);
    report.save_missing_report(&config.missing_report).unwrap();

    let csv = fs::read_to_string(out.join("super_duty.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("serial_key,vehicle_line,fuel_type,sub_fuel_type,model_year,cab")
    );
    assert_eq!(
        lines.next(),
        Some("super_duty_24my_gas_srw,Super Duty,Gas,SRW,24MY,Regular")
    );
    assert!(!out.join("bronco.csv").exists());
    assert_eq!(fs::read_to_string(&missing).unwrap(), "Bronco\n");
}

#[test]
fn test_json_and_sql_sinks() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(vec![VehicleLine::new("Edge", DimensionPolicy::None)]);

    let mut json_sink = FileSink::new(dir.path(), OutputFormat::Json);
    assert!(pipeline.run_all(&mut open_preorder(), &mut json_sink).is_success());
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("edge.json")).unwrap()).unwrap();
    assert_eq!(json[0]["serial_key"], "edge_22my");
    assert_eq!(json[1]["lpo_paint"], "Blue");

    let mut sql_sink = FileSink::new(dir.path(), OutputFormat::Sql);
    assert!(pipeline.run_all(&mut open_preorder(), &mut sql_sink).is_success());
    let sql = fs::read_to_string(dir.path().join("edge.sql")).unwrap();
    assert!(sql.contains("CREATE TABLE \"preorder_edge\""));
    assert!(sql.contains("\"serial_key\" character varying PRIMARY KEY"));
    assert_eq!(sql.matches("INSERT INTO").count(), 2);
}

#[test]
fn test_used_range_offset_is_padded_from_a1() {
    let data = fixtures::generate_offset_range().unwrap();
    let mut workbook = XlsxWorkbook::open(Cursor::new(data)).unwrap();
    let rows = workbook.visible_rows("Offset").unwrap();

    assert_eq!(rows.len(), 4);
    assert!(rows.rows[0].cells.is_empty());
    assert_eq!(rows.rows[2].index, 2);
    assert_eq!(rows.rows[2].cell(2), &CellValue::text("first"));
    assert!(rows.rows[2].cell(0).is_absent());
    assert_eq!(rows.rows[3].cell(3), &CellValue::Number(5.0));
    assert_eq!(rows.rows[3].cell(4), &CellValue::Bool(true));
}

#[test]
fn test_nonexistent_sheet() {
    let mut workbook = open_preorder();
    match workbook.visible_rows("Ranger") {
        Err(ProdSheetError::SheetNotFound(name)) => assert_eq!(name, "Ranger"),
        other => panic!("Expected SheetNotFound, got {:?}", other.map(|r| r.len())),
    }
}

#[test]
fn test_invalid_file_format() {
    let result = XlsxWorkbook::open(Cursor::new(b"This is not a valid Excel file".to_vec()));
    assert!(matches!(result, Err(ProdSheetError::Zip(_))));
}

#[test]
fn test_file_not_found() {
    let result = XlsxWorkbook::open_path("nonexistent_preorder_workbook.xlsx");
    assert!(matches!(result, Err(ProdSheetError::Io(_))));
}

#[test]
fn test_open_workbook_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preorder.xlsx");
    fs::write(&path, fixtures::generate_preorder_workbook().unwrap()).unwrap();

    let config = "workbook: preorder.xlsx\nvehicle_lines:\n  - name: Escape\n    policy: fuel\n";
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, config).unwrap();

    let pipeline = PipelineBuilder::from_config(prodsheet::EtlConfig::from_path(&config_path).unwrap())
        .build()
        .unwrap();
    let mut workbook = pipeline.open_workbook().unwrap();
    let report = pipeline.run_all(&mut workbook, &mut MemorySink::new());
    assert!(report.is_success());
    assert_eq!(report.total_records(), 6);
}

#[test]
fn test_duration_cells_stay_numeric() {
    let data = fixtures::generate_duration_workbook().unwrap();
    let mut workbook = XlsxWorkbook::open(Cursor::new(data)).unwrap();

    let rows = workbook.visible_rows("Transit").unwrap();
    assert_eq!(rows.rows[3].cell(2), &CellValue::Number(1.5));

    let pipeline = pipeline(vec![VehicleLine::new("Transit", DimensionPolicy::None)]);
    let records = pipeline.parse_sheet(&mut workbook, "Transit").unwrap();
    assert_eq!(records.column("lead_time"), Some(vec!["1.5", "2"]));
}

#[test]
fn test_data_column_named_like_dimension_is_kept_apart() {
    let data = fixtures::generate_fuel_type_column_workbook().unwrap();
    let mut workbook = XlsxWorkbook::open(Cursor::new(data)).unwrap();
    let pipeline = pipeline(vec![VehicleLine::new("Escape", DimensionPolicy::Fuel)]);

    let records = pipeline.parse_sheet(&mut workbook, "Escape").unwrap();
    assert_eq!(
        records.columns,
        vec!["serial_key", "vehicle_line", "fuel_type", "model_year", "fuel_type_2", "trim"]
    );
    assert_eq!(records.column("fuel_type"), Some(vec!["Gas", "Hybrid"]));
    assert_eq!(records.column("fuel_type_2"), Some(vec!["Gas engine", "Hybrid engine"]));

    let dir = tempfile::tempdir().unwrap();
    let mut sink = FileSink::new(dir.path(), OutputFormat::Sql);
    assert!(pipeline.run_all(&mut workbook, &mut sink).is_success());
    let sql = fs::read_to_string(dir.path().join("escape.sql")).unwrap();
    assert_eq!(sql.matches("\"fuel_type\" character varying").count(), 1);
    assert_eq!(sql.matches("\"fuel_type_2\" character varying").count(), 1);
}
