use crate::app::error::Result;
use crate::app::pipeline::Pipeline;
use std::time::Instant;

pub struct RunEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> RunEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting filter run...");

        // Extract
        let measurements = self.pipeline.extract()?;
        tracing::info!("Extracted {} measurements", measurements.len());

        // Transform
        let result = self.pipeline.transform(measurements)?;
        tracing::info!(
            filter = %result.filter,
            rms_residual = result.rms_residual,
            "Filtered {} steps",
            result.rows.len()
        );

        // Load
        let output_path = self.pipeline.load(result)?;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Output saved to: {}",
            output_path
        );

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error::AppError;
    use crate::app::pipeline::{EstimateRow, Measurement, RunResult};
    use std::cell::RefCell;

    struct RecordingPipeline {
        calls: RefCell<Vec<&'static str>>,
        fail_transform: bool,
    }

    impl Pipeline for RecordingPipeline {
        fn extract(&self) -> Result<Vec<Measurement>> {
            self.calls.borrow_mut().push("extract");
            Ok(vec![Measurement { step: 0, t: 0.0, z: Some(1.0) }])
        }

        fn transform(&self, data: Vec<Measurement>) -> Result<RunResult> {
            self.calls.borrow_mut().push("transform");
            if self.fail_transform {
                return Err(AppError::processing("boom"));
            }
            Ok(RunResult {
                name: "test".to_string(),
                filter: "gh".to_string(),
                missing: 0,
                rms_residual: 0.0,
                rows: data
                    .iter()
                    .map(|m| EstimateRow {
                        step: m.step,
                        t: m.t,
                        z: m.z,
                        x: 1.0,
                        dx: None,
                        variance: None,
                        residual: None,
                    })
                    .collect(),
            })
        }

        fn load(&self, result: RunResult) -> Result<String> {
            self.calls.borrow_mut().push("load");
            Ok(format!("{}.csv", result.name))
        }
    }

    #[test]
    fn test_runs_phases_in_order() {
        let engine = RunEngine::new(RecordingPipeline {
            calls: RefCell::new(Vec::new()),
            fail_transform: false,
        });
        assert_eq!(engine.run().unwrap(), "test.csv");
        assert_eq!(*engine.pipeline.calls.borrow(), vec!["extract", "transform", "load"]);
    }

    #[test]
    fn test_stops_at_first_failure() {
        let engine = RunEngine::new(RecordingPipeline {
            calls: RefCell::new(Vec::new()),
            fail_transform: true,
        });
        assert!(engine.run().is_err());
        assert_eq!(*engine.pipeline.calls.borrow(), vec!["extract", "transform"]);
    }
}
