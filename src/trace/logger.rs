use std::{fs::OpenOptions, io::Write, sync::Mutex};

use crate::trace::trace::TraceEvent;

enum TraceSink {
    Disabled,
    File(Mutex<std::fs::File>),
    Memory(Mutex<Vec<TraceEvent>>),
}

/// Append-only JSONL audit trail of protocol decisions.
pub struct TraceLogger {
    sink: TraceSink,
}

impl TraceLogger {
    pub fn new(path: &str) -> Self {
        let file = OpenOptions::new().create(true).append(true).open(path);

        match file {
            Ok(f) => Self {
                sink: TraceSink::File(Mutex::new(f)),
            },
            Err(e) => {
                eprintln!("Warning: could not open trace file '{}': {}", path, e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            sink: TraceSink::Disabled,
        }
    }

    /// Keeps events in memory; read them back with `events()`.
    pub fn in_memory() -> Self {
        Self {
            sink: TraceSink::Memory(Mutex::new(Vec::new())),
        }
    }

    pub fn log(&self, event: TraceEvent) {
        match &self.sink {
            TraceSink::Disabled => {}
            TraceSink::Memory(events) => match events.lock() {
                Ok(mut events) => events.push(event),
                Err(e) => eprintln!("Warning: trace logger lock poisoned: {}", e),
            },
            TraceSink::File(file_mutex) => {
                let json = match serde_json::to_string(&event) {
                    Ok(j) => j,
                    Err(e) => {
                        eprintln!("Warning: failed to serialize trace event: {}", e);
                        return;
                    }
                };

                let mut file = match file_mutex.lock() {
                    Ok(f) => f,
                    Err(e) => {
                        eprintln!("Warning: trace logger lock poisoned: {}", e);
                        return;
                    }
                };

                if let Err(e) = writeln!(file, "{}", json) {
                    eprintln!("Warning: failed to write trace event: {}", e);
                }
            }
        }
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        match &self.sink {
            TraceSink::Memory(events) => events.lock().map(|e| e.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

impl Default for TraceLogger {
    fn default() -> Self {
        Self::disabled()
    }
}
