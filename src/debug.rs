use serde_json::{Map, Value, json};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Line-per-event JSON trace of burns, shared by every clone of a `Burner`.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn log_event(&self, event_type: &str, mut fields: Map<String, Value>) {
        fields.insert("type".to_string(), Value::String(event_type.to_string()));
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writeln!(writer, "{}", Value::Object(fields));
        }
    }

    pub fn emit_summary(&self, context: &str, counts: &BTreeMap<String, u64>) {
        let line = json!({
            "type": "burn.summary",
            "context": context,
            "counts": counts,
        });
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writeln!(writer, "{line}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writer.flush();
        }
    }
}

/// Events and counters of a single burn. Every line carries the burn id so
/// concurrent burns sharing one logger stay separable.
pub(crate) struct BurnTrace<'a> {
    logger: &'a DebugLogger,
    burn: String,
    counters: RefCell<BTreeMap<String, u64>>,
}

impl<'a> BurnTrace<'a> {
    pub fn new(logger: &'a DebugLogger, burn: impl Into<String>) -> Self {
        Self {
            logger,
            burn: burn.into(),
            counters: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn log_event(&self, event_type: &str, mut fields: Map<String, Value>) {
        fields.insert("burn".to_string(), Value::String(self.burn.clone()));
        self.logger.log_event(event_type, fields);
    }

    pub fn increment(&self, key: &str, amount: u64) {
        let mut counters = self.counters.borrow_mut();
        let entry = counters.entry(key.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Writes this burn's summary line and flushes.
    pub fn finish(self) {
        self.logger.emit_summary(&self.burn, &self.counters.borrow());
        self.logger.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_trace_path(label: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir()
            .join(format!(
                "fieldburn_debug_{}_{}_{}",
                label,
                std::process::id(),
                nanos
            ))
            .join("trace.jsonl")
    }

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .expect("read")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }

    #[test]
    fn events_and_sorted_summary_are_written_as_jsonl() {
        let path = temp_trace_path("single");
        let logger = DebugLogger::new(&path).expect("logger");

        let trace = BurnTrace::new(&logger, "doc-1");
        let mut fields = Map::new();
        fields.insert("index".into(), json!(0));
        trace.log_event("burn.field", fields);
        trace.increment("outcome.rendered", 2);
        trace.increment("kind.text", 1);
        trace.finish();

        let written = std::fs::read_to_string(&path).expect("read");
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "burn.field");
        assert_eq!(lines[0]["burn"], "doc-1");
        assert_eq!(lines[1]["type"], "burn.summary");
        assert_eq!(lines[1]["context"], "doc-1");
        assert_eq!(lines[1]["counts"]["outcome.rendered"], 2);
        assert!(written.contains(r#""counts":{"kind.text":1,"outcome.rendered":2}"#));

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn interleaved_burns_keep_their_own_counts() {
        let path = temp_trace_path("interleaved");
        let logger = DebugLogger::new(&path).expect("logger");

        let first = BurnTrace::new(&logger, "a");
        let second = BurnTrace::new(&logger, "b");
        first.increment("kind.text", 1);
        second.increment("kind.text", 3);
        second.increment("kind.radio", 1);
        first.finish();
        second.finish();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["context"], "a");
        assert_eq!(lines[0]["counts"], json!({"kind.text": 1}));
        assert_eq!(lines[1]["context"], "b");
        assert_eq!(lines[1]["counts"], json!({"kind.radio": 1, "kind.text": 3}));

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
