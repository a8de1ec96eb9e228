use crate::app::config::{OutputFormat, TomlConfig};
use crate::app::error::{AppError, Result};
use crate::app::filters::FilterRunner;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// One row of the input column. `z` is `None` for an empty cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub step: usize,
    pub t: f64,
    pub z: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateRow {
    pub step: usize,
    pub t: f64,
    pub z: Option<f64>,
    pub x: f64,
    pub dx: Option<f64>,
    pub variance: Option<f64>,
    pub residual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub name: String,
    pub filter: String,
    pub missing: usize,
    pub rms_residual: f64,
    pub rows: Vec<EstimateRow>,
}

pub trait Pipeline {
    fn extract(&self) -> Result<Vec<Measurement>>;
    fn transform(&self, data: Vec<Measurement>) -> Result<RunResult>;
    fn load(&self, result: RunResult) -> Result<String>;
}

/// Reads a measurement column from CSV, runs the configured filter over
/// it and writes the estimates as CSV or JSON.
pub struct FilterPipeline {
    config: TomlConfig,
}

impl FilterPipeline {
    pub fn new(config: TomlConfig) -> Self {
        Self { config }
    }
}

fn parse_cell(cell: &str, line: usize, column: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some).map_err(|_| {
        AppError::processing(format!(
            "row {}: '{}' in column '{}' is not a number",
            line, cell, column
        ))
    })
}

impl Pipeline for FilterPipeline {
    fn extract(&self) -> Result<Vec<Measurement>> {
        let input = &self.config.input;
        tracing::debug!("Reading measurements from: {}", input.path);

        let mut reader = csv::Reader::from_path(&input.path)?;
        let column = reader
            .headers()?
            .iter()
            .position(|h| h.trim() == input.column)
            .ok_or_else(|| AppError::InvalidConfigValueError {
                field: "input.column".to_string(),
                value: input.column.clone(),
                reason: format!("column not found in {}", input.path),
            })?;

        let mut measurements = Vec::new();
        for (step, record) in reader.records().enumerate() {
            let record = record?;
            let cell = record.get(column).unwrap_or("");
            measurements.push(Measurement {
                step,
                t: step as f64 * input.dt,
                z: parse_cell(cell, step + 2, &input.column)?,
            });
        }

        Ok(measurements)
    }

    fn transform(&self, data: Vec<Measurement>) -> Result<RunResult> {
        let z0 = data
            .iter()
            .find_map(|m| m.z)
            .ok_or_else(|| AppError::processing("the input column holds no measurements"))?;

        let filter = &self.config.filter;
        let mut runner = FilterRunner::build(filter, z0, self.config.input.dt)?;

        let mut rows = Vec::with_capacity(data.len());
        let mut missing = 0;
        let mut sum_sq = 0.0;
        let mut residuals = 0;
        for m in data {
            let estimate = runner.step(m.z)?;
            if m.z.is_none() {
                missing += 1;
            }
            if let Some(r) = estimate.residual {
                sum_sq += r * r;
                residuals += 1;
            }
            rows.push(EstimateRow {
                step: m.step,
                t: m.t,
                z: m.z,
                x: estimate.x,
                dx: estimate.dx,
                variance: estimate.variance,
                residual: estimate.residual,
            });
        }

        if missing > 0 {
            tracing::warn!("{} missing measurements were coasted over", missing);
        }

        let rms_residual = if residuals > 0 {
            (sum_sq / residuals as f64).sqrt()
        } else {
            0.0
        };

        Ok(RunResult {
            name: self.config.run.name.clone(),
            filter: filter.kind().to_string(),
            missing,
            rms_residual,
            rows,
        })
    }

    fn load(&self, result: RunResult) -> Result<String> {
        let output = &self.config.output;
        let path = Path::new(&output.path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        match output.format {
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_path(path)?;
                for row in &result.rows {
                    writer.serialize(row)?;
                }
                writer.flush()?;
            }
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&result)?;
                fs::write(path, json)?;
            }
        }

        tracing::debug!("Wrote {} rows as {:?}", result.rows.len(), output.format);
        Ok(output.path.clone())
    }
}
