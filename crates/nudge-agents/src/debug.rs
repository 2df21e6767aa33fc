use serde::Serialize;
use serde_json::{Value, json};

/// Per-turn trace of retrieval, tool, and storage activity. Rendered by
/// the chat UI's debug panel and echoed back from `/chat`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct TurnDebug {
    pub mem0_queries: Vec<Value>,
    pub tool_calls: Vec<Value>,
    pub db_changes: Vec<Value>,
    pub webhook_events: Vec<Value>,
    pub behavior: Vec<Value>,
    pub retrieved_memories: Value,
}

impl TurnDebug {
    pub fn new() -> Self {
        Self {
            retrieved_memories: json!({}),
            ..Default::default()
        }
    }

    pub fn record_mem0_query(&mut self, query: &str, category: &str, results_count: usize) {
        self.mem0_queries.push(json!({
            "query": query,
            "category": category,
            "results_count": results_count,
        }));
    }

    pub fn record_tool_call(&mut self, tool: &str, input: &Value) -> usize {
        self.tool_calls.push(json!({
            "tool": tool,
            "input": input,
            "timestamp": nudge_common::now_epoch(),
        }));
        self.tool_calls.len() - 1
    }

    pub fn record_tool_result(&mut self, index: usize, result: &Value) {
        if let Some(entry) = self.tool_calls.get_mut(index) {
            entry["result"] = result.clone();
        }
    }

    pub fn record_db_change(&mut self, change: Value) {
        self.db_changes.push(change);
    }

    pub fn record_behavior(&mut self, summary: &str) {
        self.behavior.push(json!({ "summary": summary }));
    }

    pub fn record_webhook_event(&mut self, event: Value) {
        self.webhook_events.push(event);
    }

    pub fn set_retrieved_memories(&mut self, memories: Value) {
        self.retrieved_memories = memories;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_results_attach_to_their_call() {
        let mut debug = TurnDebug::new();
        let idx = debug.record_tool_call("list_reminders", &json!({"status": "active"}));
        debug.record_tool_result(idx, &json!({"success": true, "count": 2}));

        assert_eq!(debug.tool_calls.len(), 1);
        assert_eq!(debug.tool_calls[0]["tool"], "list_reminders");
        assert_eq!(debug.tool_calls[0]["result"]["count"], 2);
    }

    #[test]
    fn serializes_with_all_sections() {
        let debug = TurnDebug::new();
        let value = serde_json::to_value(&debug).expect("debug should serialize");
        for key in [
            "mem0_queries",
            "tool_calls",
            "db_changes",
            "webhook_events",
            "behavior",
            "retrieved_memories",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
