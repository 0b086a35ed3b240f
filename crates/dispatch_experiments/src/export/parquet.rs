use std::sync::Arc;

use anyhow::Result;
use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::metrics::SimulationResult;

pub(crate) fn export_to_parquet_impl(
    results: &[SimulationResult],
    file: std::fs::File,
) -> Result<()> {
    let batch = build_record_batch(results)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

fn build_record_batch(
    results: &[SimulationResult],
) -> Result<RecordBatch, arrow::error::ArrowError> {
    let schema = Arc::new(parquet_schema());
    let arrays = build_arrays(results);

    RecordBatch::try_new(schema, arrays)
}

fn parquet_schema() -> Schema {
    Schema::new(vec![
        Field::new("experiment_id", DataType::Utf8, false),
        Field::new("run_id", DataType::UInt64, false),
        Field::new("auction_type", DataType::Utf8, false),
        Field::new("payment_rule", DataType::Utf8, false),
        Field::new("bidding_strategy", DataType::Utf8, false),
        Field::new("payment_ratio", DataType::Float64, false),
        Field::new("simulated_hours", DataType::UInt64, false),
        Field::new("total_vehicles", DataType::UInt64, false),
        Field::new("total_requests", DataType::UInt64, false),
        Field::new("accepted_requests", DataType::UInt64, false),
        Field::new("dropped_requests", DataType::UInt64, false),
        Field::new("acceptance_rate", DataType::Float64, false),
        Field::new("coordinator_payoff", DataType::Float64, false),
        Field::new("vehicle_payoff_total", DataType::Float64, false),
        Field::new("vehicle_payoff_min", DataType::Float64, false),
        Field::new("vehicle_payoff_max", DataType::Float64, false),
        Field::new("avg_waiting_time", DataType::Float64, false),
        Field::new("median_waiting_time", DataType::Float64, false),
        Field::new("p90_waiting_time", DataType::Float64, false),
        Field::new("trained_experiences", DataType::UInt64, false),
    ])
}

fn strings(results: &[SimulationResult], f: impl Fn(&SimulationResult) -> &str) -> ArrayRef {
    Arc::new(StringArray::from(results.iter().map(f).collect::<Vec<_>>()))
}

fn counts(results: &[SimulationResult], f: impl Fn(&SimulationResult) -> u64) -> ArrayRef {
    Arc::new(UInt64Array::from(results.iter().map(f).collect::<Vec<_>>()))
}

fn floats(results: &[SimulationResult], f: impl Fn(&SimulationResult) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from(results.iter().map(f).collect::<Vec<_>>()))
}

fn build_arrays(results: &[SimulationResult]) -> Vec<ArrayRef> {
    vec![
        strings(results, |r| r.experiment_id.as_str()),
        counts(results, |r| r.run_id as u64),
        strings(results, |r| r.auction_type.as_str()),
        strings(results, |r| r.payment_rule.as_str()),
        strings(results, |r| r.bidding_strategy.as_str()),
        floats(results, |r| r.payment_ratio),
        counts(results, |r| u64::from(r.simulated_hours)),
        counts(results, |r| r.total_vehicles as u64),
        counts(results, |r| r.total_requests as u64),
        counts(results, |r| r.accepted_requests as u64),
        counts(results, |r| r.dropped_requests as u64),
        floats(results, |r| r.acceptance_rate),
        floats(results, |r| r.coordinator_payoff),
        floats(results, |r| r.vehicle_payoff_total),
        floats(results, |r| r.vehicle_payoff_min),
        floats(results, |r| r.vehicle_payoff_max),
        floats(results, |r| r.avg_waiting_time),
        floats(results, |r| r.median_waiting_time),
        floats(results, |r| r.p90_waiting_time),
        counts(results, |r| r.trained_experiences as u64),
    ]
}
