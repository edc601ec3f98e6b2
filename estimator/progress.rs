/// Observer notified as resample pipelines complete. Callbacks may arrive from any
/// worker thread, in any order.
pub trait ResampleProgress: Sync {
    fn on_start(&self, total_resamples: usize) {
        let _ = total_resamples;
    }
    fn on_resample_finished(&self, resample: u32) {
        let _ = resample;
    }
    fn on_finish(&self) {}
}

#[derive(Debug, Default)]
pub struct NoopProgress;

impl ResampleProgress for NoopProgress {}
