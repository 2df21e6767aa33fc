use nudge_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.mem0.ai";

/// Memory categories. Mirrored into metadata as `mem0_category` and
/// re-checked on read, since category filters are advisory server-side.
pub const CAT_REMINDER_ACTIVE: &str = "reminder_active";
pub const CAT_REMINDER_ARCHIVED: &str = "reminder_archived";
pub const CAT_USER_PREFS: &str = "user_prefs";
pub const CAT_CONVERSATION: &str = "conversation";
pub const CAT_USER_BEHAVIOR: &str = "user_behavior";

/// One memory as returned by the hosted Mem0 API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl MemoryItem {
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    pub fn metadata_i64(&self, key: &str) -> Option<i64> {
        self.metadata.get(key).and_then(|v| v.as_i64())
    }
}

/// Client for the hosted Mem0 long-term memory API.
///
/// Every helper degrades gracefully: a failed call logs a warning and
/// returns an empty result so the assistant keeps working without memory.
pub struct Mem0Client {
    client: reqwest::Client,
    api_key: String,
    org_id: Option<String>,
    project_id: Option<String>,
    base_url: String,
    store_conversation: bool,
}

impl Mem0Client {
    pub fn new(
        api_key: impl Into<String>,
        org_id: Option<String>,
        project_id: Option<String>,
        base_url: Option<String>,
        store_conversation: bool,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            org_id,
            project_id,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            store_conversation,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn scope(&self, mut payload: Value) -> Value {
        if let Some(org) = &self.org_id {
            payload["org_id"] = json!(org);
        }
        if let Some(project) = &self.project_id {
            payload["project_id"] = json!(project);
        }
        payload
    }

    async fn post_json(&self, path: &str, payload: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&self.scope(payload))
            .send()
            .await
            .map_err(|e| nudge_common::Error::Memory(format!("mem0 request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(nudge_common::Error::Memory(format!(
                "mem0 API error: status={status}, body={body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| nudge_common::Error::Memory(format!("failed to parse mem0 response: {e}")))
    }

    // --- Raw operations ---

    /// Semantic search, optionally restricted to categories.
    pub async fn search(
        &self,
        query: &str,
        user_id: &str,
        categories: &[&str],
        limit: usize,
    ) -> Vec<MemoryItem> {
        let mut payload = json!({
            "query": query,
            "filters": { "AND": [{ "user_id": user_id }] },
            "limit": limit,
        });
        if !categories.is_empty() {
            payload["categories"] = json!(categories);
        }

        match self.post_json("/v2/memories/search/", payload).await {
            Ok(value) => filter_by_category(parse_memories(value), categories),
            Err(e) => {
                warn!("mem0 search error: {e}");
                Vec::new()
            }
        }
    }

    pub async fn search_preferences(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
    ) -> Vec<MemoryItem> {
        self.search(query, user_id, &[CAT_USER_PREFS], limit).await
    }

    pub async fn search_behavior(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
    ) -> Vec<MemoryItem> {
        self.search(query, user_id, &[CAT_USER_BEHAVIOR], limit).await
    }

    /// All memories for a user, optionally post-filtered by category.
    pub async fn get_all(&self, user_id: &str, categories: &[&str]) -> Vec<MemoryItem> {
        let payload = json!({
            "filters": { "AND": [{ "user_id": user_id }] },
        });

        match self.post_json("/v2/memories/", payload).await {
            Ok(value) => filter_by_category(parse_memories(value), categories),
            Err(e) => {
                warn!("mem0 get_all error: {e}");
                Vec::new()
            }
        }
    }

    async fn add(
        &self,
        text: &str,
        user_id: &str,
        category: &str,
        metadata: Value,
    ) -> Option<String> {
        let metadata = apply_category_metadata(metadata, category);
        let payload = json!({
            "messages": [{ "role": "user", "content": text }],
            "user_id": user_id,
            "metadata": metadata,
            "categories": [category],
            "async_mode": false,
            "version": "v2",
        });

        match self.post_json("/v1/memories/", payload).await {
            Ok(value) => {
                let mem_id = extract_memory_id(&value);
                if mem_id.is_none() {
                    debug!("mem0 add returned no memory id: {value}");
                }
                mem_id
            }
            Err(e) => {
                warn!("mem0 add error: {e}");
                None
            }
        }
    }

    async fn update(&self, memory_id: &str, text: &str, metadata: Value) -> bool {
        let payload = json!({ "text": text, "metadata": metadata });
        let response = self
            .client
            .put(self.url(&format!("/v1/memories/{memory_id}/")))
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&self.scope(payload))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!("mem0 update error: status={}", resp.status());
                false
            }
            Err(e) => {
                warn!("mem0 update error: {e}");
                false
            }
        }
    }

    pub async fn delete(&self, memory_id: &str) -> bool {
        let response = self
            .client
            .delete(self.url(&format!("/v1/memories/{memory_id}/")))
            .header("Authorization", format!("Token {}", self.api_key))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!("mem0 delete error: status={}", resp.status());
                false
            }
            Err(e) => {
                warn!("mem0 delete error: {e}");
                false
            }
        }
    }

    // --- Domain upserts ---

    /// Add or refresh the active-reminder memory keyed by `reminder_id`.
    pub async fn upsert_active_reminder(
        &self,
        text: &str,
        user_id: &str,
        metadata: Value,
    ) -> Option<String> {
        let metadata = apply_category_metadata(metadata, CAT_REMINDER_ACTIVE);

        if let Some(reminder_id) = metadata.get("reminder_id").and_then(|v| v.as_i64()) {
            let existing = self
                .search(
                    &format!("reminder_id:{reminder_id}"),
                    user_id,
                    &[CAT_REMINDER_ACTIVE],
                    1,
                )
                .await;
            if let Some(memory_id) = existing.first().and_then(|m| m.id.clone())
                && self.update(&memory_id, text, metadata.clone()).await
            {
                return Some(memory_id);
            }
        }

        self.add(text, user_id, CAT_REMINDER_ACTIVE, metadata).await
    }

    /// Move a reminder memory from the active to the archived category.
    pub async fn upsert_archived_reminder(
        &self,
        text: &str,
        user_id: &str,
        metadata: Value,
    ) -> Option<String> {
        let metadata = apply_category_metadata(metadata, CAT_REMINDER_ARCHIVED);

        if let Some(reminder_id) = metadata.get("reminder_id").and_then(|v| v.as_i64()) {
            let existing = self
                .search(
                    &format!("reminder_id:{reminder_id}"),
                    user_id,
                    &[CAT_REMINDER_ACTIVE],
                    1,
                )
                .await;
            if let Some(memory_id) = existing.first().and_then(|m| m.id.clone()) {
                self.delete(&memory_id).await;
            }
        }

        self.add(text, user_id, CAT_REMINDER_ARCHIVED, metadata).await
    }

    /// Add or refresh a preference memory keyed by `pref_key`.
    pub async fn upsert_preference(
        &self,
        text: &str,
        user_id: &str,
        metadata: Value,
    ) -> Option<String> {
        let metadata = apply_category_metadata(metadata, CAT_USER_PREFS);

        if let Some(pref_key) = metadata.get("pref_key").and_then(|v| v.as_str()) {
            let existing = self
                .search(&format!("pref_key:{pref_key}"), user_id, &[CAT_USER_PREFS], 1)
                .await;
            if let Some(memory_id) = existing.first().and_then(|m| m.id.clone())
                && self.update(&memory_id, text, metadata.clone()).await
            {
                return Some(memory_id);
            }
        }

        self.add(text, user_id, CAT_USER_PREFS, metadata).await
    }

    /// Keep a single behavior-summary memory per user.
    pub async fn upsert_behavior_summary(
        &self,
        text: &str,
        user_id: &str,
        metadata: Value,
    ) -> Option<String> {
        let mut metadata = apply_category_metadata(metadata, CAT_USER_BEHAVIOR);
        if metadata.get("type").is_none() {
            metadata["type"] = json!("behavior_summary");
        }

        let existing = self
            .search("behavior_summary", user_id, &[CAT_USER_BEHAVIOR], 1)
            .await;
        if let Some(memory_id) = existing.first().and_then(|m| m.id.clone())
            && self.update(&memory_id, text, metadata.clone()).await
        {
            return Some(memory_id);
        }

        self.add(text, user_id, CAT_USER_BEHAVIOR, metadata).await
    }

    /// Record a conversation turn. Disabled by config flag.
    pub async fn add_conversation(&self, text: &str, user_id: &str) -> Option<String> {
        if !self.store_conversation {
            return None;
        }
        let metadata = json!({ "timestamp": nudge_common::now_epoch() });
        self.add(text, user_id, CAT_CONVERSATION, metadata).await
    }

    /// Active reminder memories that carry reschedule bookkeeping,
    /// most recently rescheduled first.
    pub async fn get_rescheduled_active_reminders(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Vec<MemoryItem> {
        let mut rescheduled: Vec<MemoryItem> = self
            .get_all(user_id, &[CAT_REMINDER_ACTIVE])
            .await
            .into_iter()
            .filter(|m| {
                m.metadata_i64("reschedule_count").unwrap_or(0) > 0
                    || m.metadata_i64("last_rescheduled_at_epoch").is_some()
            })
            .collect();

        rescheduled.sort_by_key(|m| {
            std::cmp::Reverse(m.metadata_i64("last_rescheduled_at_epoch").unwrap_or(0))
        });
        rescheduled.truncate(limit);
        rescheduled
    }
}

fn apply_category_metadata(metadata: Value, category: &str) -> Value {
    let mut metadata = if metadata.is_object() {
        metadata
    } else {
        json!({})
    };
    metadata["mem0_category"] = json!(category);
    metadata
}

/// The API wraps results differently across versions; accept a bare list,
/// `{"results": [...]}`, or `{"memories": [...]}`.
fn parse_memories(value: Value) -> Vec<MemoryItem> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results").or_else(|| map.remove("memories")) {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<MemoryItem>(item).ok())
        .collect()
}

fn filter_by_category(memories: Vec<MemoryItem>, categories: &[&str]) -> Vec<MemoryItem> {
    if categories.is_empty() {
        return memories;
    }
    memories
        .into_iter()
        .filter(|m| match m.metadata_str("mem0_category") {
            Some(cat) => categories.contains(&cat),
            None => true,
        })
        .collect()
}

/// Add responses vary in shape; probe the known locations for an id.
fn extract_memory_id(value: &Value) -> Option<String> {
    if let Some(id) = value.get("id").and_then(|v| v.as_str()) {
        return Some(id.to_string());
    }
    if let Some(id) = value.get("memory_id").and_then(|v| v.as_str()) {
        return Some(id.to_string());
    }
    if let Some(id) = value
        .get("memory")
        .and_then(|m| m.get("id"))
        .and_then(|v| v.as_str())
    {
        return Some(id.to_string());
    }
    if let Some(id) = value
        .get("data")
        .and_then(|d| d.get("id"))
        .and_then(|v| v.as_str())
    {
        return Some(id.to_string());
    }
    for key in ["memories", "results"] {
        if let Some(id) = value
            .get(key)
            .and_then(|v| v.as_array())
            .and_then(|items| items.first())
            .and_then(|first| first.get("id"))
            .and_then(|v| v.as_str())
        {
            return Some(id.to_string());
        }
    }
    if let Some(id) = value
        .as_array()
        .and_then(|items| items.first())
        .and_then(|first| first.get("id"))
        .and_then(|v| v.as_str())
    {
        return Some(id.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_memory_id_from_known_shapes() {
        assert_eq!(
            extract_memory_id(&json!({"id": "m1"})),
            Some("m1".to_string())
        );
        assert_eq!(
            extract_memory_id(&json!({"memory_id": "m2"})),
            Some("m2".to_string())
        );
        assert_eq!(
            extract_memory_id(&json!({"memory": {"id": "m3"}})),
            Some("m3".to_string())
        );
        assert_eq!(
            extract_memory_id(&json!({"data": {"id": "m4"}})),
            Some("m4".to_string())
        );
        assert_eq!(
            extract_memory_id(&json!({"memories": [{"id": "m5"}]})),
            Some("m5".to_string())
        );
        assert_eq!(
            extract_memory_id(&json!([{"id": "m6"}])),
            Some("m6".to_string())
        );
        assert_eq!(extract_memory_id(&json!([])), None);
        assert_eq!(extract_memory_id(&json!({})), None);
    }

    #[test]
    fn category_metadata_is_applied() {
        let metadata = apply_category_metadata(json!({"pref_key": "timezone"}), CAT_USER_PREFS);
        assert_eq!(metadata["mem0_category"], CAT_USER_PREFS);
        assert_eq!(metadata["pref_key"], "timezone");

        // Non-object metadata is replaced rather than merged.
        let metadata = apply_category_metadata(Value::Null, CAT_CONVERSATION);
        assert_eq!(metadata["mem0_category"], CAT_CONVERSATION);
    }

    #[test]
    fn parses_wrapped_and_bare_result_lists() {
        let bare = json!([{"id": "a", "memory": "text"}]);
        assert_eq!(parse_memories(bare).len(), 1);

        let wrapped = json!({"results": [{"id": "a"}, {"id": "b"}]});
        assert_eq!(parse_memories(wrapped).len(), 2);

        let memories = json!({"memories": [{"id": "a"}]});
        assert_eq!(parse_memories(memories).len(), 1);

        assert!(parse_memories(json!("oops")).is_empty());
    }

    #[test]
    fn category_filter_drops_mismatched_memories() {
        let memories = vec![
            MemoryItem {
                id: Some("keep".to_string()),
                metadata: json!({"mem0_category": CAT_REMINDER_ACTIVE}),
                ..Default::default()
            },
            MemoryItem {
                id: Some("drop".to_string()),
                metadata: json!({"mem0_category": CAT_REMINDER_ARCHIVED}),
                ..Default::default()
            },
            MemoryItem {
                id: Some("untagged".to_string()),
                metadata: json!({}),
                ..Default::default()
            },
        ];

        let filtered = filter_by_category(memories, &[CAT_REMINDER_ACTIVE]);
        let ids: Vec<_> = filtered.iter().filter_map(|m| m.id.as_deref()).collect();
        assert_eq!(ids, vec!["keep", "untagged"]);
    }
}
