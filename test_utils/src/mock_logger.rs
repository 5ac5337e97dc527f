use lazy_static::lazy_static;
use std::sync::{Arc, Mutex};

pub type CapturedLogs = Arc<Mutex<Vec<(log::Level, String)>>>;

#[derive(Debug, Clone, Default)]
struct MockLogger {
    pub logs: CapturedLogs,
}

impl log::Log for MockLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }
    fn flush(&self) {}
    fn log(&self, record: &log::Record) {
        self.logs
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }
}

/// Installs a process-wide logger that records every message, and returns the record.
///
/// Calling it again returns the same record, with the messages logged so far cleared.
pub fn mock_logger(max_level: Option<log::LevelFilter>) -> CapturedLogs {
    lazy_static! {
        static ref MOCK_LOGGER: MockLogger = MockLogger::default();
    }

    // Another call in the same process already installed it.
    let _ = log::set_logger(&*MOCK_LOGGER as &'static MockLogger);
    log::set_max_level(max_level.unwrap_or(log::LevelFilter::Debug));

    MOCK_LOGGER.logs.lock().unwrap().clear();
    MOCK_LOGGER.logs.clone()
}
