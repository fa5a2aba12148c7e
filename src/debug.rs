use serde_json::{Map, Value, json};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::rc::Rc;

/// JSON-lines sink for render records and running counters.
#[derive(Clone)]
pub struct DebugLogger {
    inner: Rc<RefCell<DebugState>>,
}

struct DebugState {
    writer: Box<dyn Write>,
    counters: BTreeMap<String, u64>,
}

impl DebugLogger {
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DebugState {
                writer,
                counters: BTreeMap::new(),
            })),
        }
    }

    pub fn log_json(&self, value: &Value) {
        let mut state = self.inner.borrow_mut();
        let _ = writeln!(state.writer, "{value}");
    }

    pub fn increment(&self, key: &str, amount: u64) {
        let mut state = self.inner.borrow_mut();
        let entry = state.counters.entry(key.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn log_render_pass(&self, first_build: bool, layout: &str, counts: &[(&str, u64)]) {
        let mut count_map = Map::new();
        for (key, value) in counts {
            count_map.insert((*key).to_string(), json!(value));
            self.increment(&format!("render.{key}"), *value);
        }
        self.increment("render.passes", 1);
        self.log_json(&json!({
            "type": "render.pass",
            "first_build": first_build,
            "layout": layout,
            "counts": Value::Object(count_map),
        }));
    }

    pub fn emit_summary(&self, context: &str) {
        let mut state = self.inner.borrow_mut();
        let counters = std::mem::take(&mut state.counters);
        let summary = json!({
            "type": "debug.summary",
            "context": context,
            "counts": counters,
        });
        let _ = writeln!(state.writer, "{summary}");
    }

    pub fn flush(&self) {
        let _ = self.inner.borrow_mut().writer.flush();
    }
}
