//! Export pass context
//!
//! Replaces process-wide state: the material cache and the log live here and
//! the context is passed by reference through every builder and compiler call.

use crate::material::MaterialCache;
use crate::report::ExportLog;

#[derive(Debug, Default)]
pub struct ExportContext {
    pub materials: MaterialCache,
    pub log: ExportLog,
}

impl ExportContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset state left over from a previous pass
    pub fn begin_pass(&mut self) {
        self.materials.clear();
        self.log.clear();
    }
}
