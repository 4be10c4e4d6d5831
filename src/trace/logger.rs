use std::{fs::OpenOptions, io::Write, path::Path, sync::Mutex};

use tracing::warn;

use crate::trace::trace::TraceEvent;

/// Appends one JSON object per line. A logger without a file drops events.
pub struct TraceLogger {
    file: Option<Mutex<std::fs::File>>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path);

        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open trace file");
                Self { file: None }
            }
        }
    }

    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(file_mutex) = &self.file else {
            return;
        };

        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                warn!(error = %e, "failed to serialize trace event");
                return;
            }
        };

        let mut file = match file_mutex.lock() {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "trace logger lock poisoned");
                return;
            }
        };

        if let Err(e) = writeln!(file, "{}", json) {
            warn!(error = %e, "failed to write trace event");
        }
    }
}

impl Default for TraceLogger {
    fn default() -> Self {
        Self::disabled()
    }
}
