use crate::detector::frame::DetectionBatch;
use crate::prelude::{ProcessingStage, StageError, StageResult};
use crate::processing::extract::extract_records;
use crate::table::DetectionTable;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;

/// Concatenates every frame's records into one ordered table.
pub struct Aggregator<'m> {
    metrics: &'m MetricsRecorder,
    logger: LogManager,
}

impl<'m> Aggregator<'m> {
    pub fn new(metrics: &'m MetricsRecorder) -> Self {
        Self {
            metrics,
            logger: LogManager::new("aggregate"),
        }
    }
}

impl ProcessingStage for Aggregator<'_> {
    type Input = DetectionBatch;
    type Output = DetectionTable;

    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn execute(&self, batch: &DetectionBatch) -> StageResult<DetectionTable> {
        let mut records = Vec::with_capacity(batch.box_count());
        for (frame_index, frame) in batch.frames.iter().enumerate() {
            let extracted = extract_records(frame_index, frame, &batch.names).map_err(|err| {
                self.metrics.record_malformed();
                err
            })?;
            self.metrics.record_frame(extracted.len());
            records.extend(extracted);
        }

        let expected = batch.box_count();
        if records.len() != expected {
            return Err(StageError::Internal(format!(
                "aggregated {} records from {} boxes",
                records.len(),
                expected
            )));
        }

        self.logger.record(&format!(
            "{} records across {} frames",
            records.len(),
            batch.frames.len()
        ));
        Ok(DetectionTable::from_records(records))
    }
}
