/// Rows processed between two progress notifications.
pub const PROGRESS_INTERVAL: usize = 256;

/// Pipeline stage reporting progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detect,
    Extract,
}

/// Snapshot passed to a progress hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub stage: Stage,
    pub rows_done: usize,
    pub rows_total: usize,
}

/// Optional progress hook called at a bounded cadence. Never required for
/// correctness; a missing hook turns every call into a no-op.
pub struct Progress<'a> {
    hook: Option<&'a mut dyn FnMut(ScanProgress)>,
}

impl<'a> Progress<'a> {
    pub fn new(hook: &'a mut dyn FnMut(ScanProgress)) -> Self {
        Self { hook: Some(hook) }
    }

    pub fn none() -> Self {
        Self { hook: None }
    }

    /// Reports `rows_done` when it falls on the notification interval.
    pub fn tick(&mut self, stage: Stage, rows_done: usize, rows_total: usize) {
        if rows_done % PROGRESS_INTERVAL == 0 {
            self.emit(stage, rows_done, rows_total);
        }
    }

    /// Reports the end of a stage unconditionally.
    pub fn finish(&mut self, stage: Stage, rows_total: usize) {
        self.emit(stage, rows_total, rows_total);
    }

    fn emit(&mut self, stage: Stage, rows_done: usize, rows_total: usize) {
        if let Some(hook) = self.hook.as_mut() {
            hook(ScanProgress {
                stage,
                rows_done,
                rows_total,
            });
        }
    }
}

impl Default for Progress<'_> {
    fn default() -> Self {
        Self::none()
    }
}
