use std::sync::Arc;

use chrono::TimeZone;
use chrono_tz::Tz;
use dashmap::DashMap;
use nudge_common::{Result, format_due_label, format_time_12h, now_epoch};
use nudge_db::{NewReminder, Reminder, ReminderChanges, ReminderStore};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::anthropic::{AnthropicClient, ChatMessage, ContentBlock};
use crate::debug::TurnDebug;
use crate::intent;
use crate::mem0::{CAT_USER_PREFS, Mem0Client};
use crate::timeparse;
use crate::tools::{self, StatusFilter, reminder_to_json};

/// Maximum number of tool-use round-trips before the loop is forcibly stopped.
const MAX_TOOL_ITERATIONS: usize = 10;

/// Orchestrates a chat turn: pending-action state, memory context,
/// the Anthropic tool loop, and reminder tool execution.
pub struct AgentRuntime {
    store: Arc<ReminderStore>,
    mem0: Arc<Mem0Client>,
    llm: AnthropicClient,
    timezone: Tz,
    conversation_window: usize,
    context_ttl_seconds: i64,
    pending: DashMap<String, PendingAction>,
}

/// A question the assistant asked that the next message may answer.
#[derive(Debug, Clone)]
pub enum PendingAction {
    /// Reminder creation is waiting on a confirmed time.
    ConfirmTime {
        title: String,
        description: String,
        due_str: String,
        category: String,
        suggested_time: Option<String>,
    },
    /// A due-date change could not be parsed and awaits confirmation.
    UpdateDue {
        reminder_id: i64,
        due_str: String,
        title: Option<String>,
    },
    /// Several reminders matched; the user must pick one.
    Clarify { matches: Vec<Value>, question: String },
}

impl PendingAction {
    fn to_json(&self) -> Value {
        match self {
            Self::ConfirmTime {
                title,
                description,
                due_str,
                category,
                suggested_time,
            } => json!({
                "type": "confirm_time",
                "title": title,
                "description": description,
                "due_str": due_str,
                "category": category,
                "suggested_time": suggested_time,
            }),
            Self::UpdateDue {
                reminder_id,
                due_str,
                title,
            } => json!({
                "type": "update_due",
                "reminder_id": reminder_id,
                "due_str": due_str,
                "title": title,
            }),
            Self::Clarify { matches, question } => json!({
                "type": "clarify_reminder",
                "matches": matches,
                "question": question,
            }),
        }
    }
}

pub struct TurnOutcome {
    pub response: String,
    pub debug: TurnDebug,
}

impl AgentRuntime {
    pub fn new(
        store: Arc<ReminderStore>,
        mem0: Arc<Mem0Client>,
        llm: AnthropicClient,
        timezone: Tz,
        conversation_window: usize,
        context_ttl_seconds: i64,
    ) -> Self {
        Self {
            store,
            mem0,
            llm,
            timezone,
            conversation_window,
            context_ttl_seconds,
            pending: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<ReminderStore> {
        &self.store
    }

    pub fn mem0(&self) -> &Arc<Mem0Client> {
        &self.mem0
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Run one full chat turn and return the assistant's reply plus the
    /// per-turn debug trace.
    #[instrument(skip(self, message), fields(user_id = %user_id))]
    pub async fn handle_turn(&self, user_id: &str, message: &str) -> Result<TurnOutcome> {
        let mut debug = TurnDebug::new();
        let has_time = intent::message_mentions_time(message);

        if let Some(response) = self
            .resolve_pending(user_id, message, has_time, &mut debug)
            .await?
        {
            return Ok(TurnOutcome { response, debug });
        }

        let skip_mem0 = intent::should_skip_mem0_prefetch(message);
        let mut mem0_context = self.get_mem0_context(message, user_id, skip_mem0, &mut debug).await;

        let common_times = self.get_common_times_by_category(user_id).await;

        let conversation: Vec<Value> = match self
            .store
            .get_recent_conversation(user_id, self.conversation_window)
        {
            Ok(turns) => turns
                .iter()
                .map(|t| json!({ "role": t.role, "content": t.content }))
                .collect(),
            Err(e) => {
                warn!("conversation history unavailable: {e}");
                Vec::new()
            }
        };
        mem0_context["conversation_history"] = json!(conversation);
        debug.set_retrieved_memories(mem0_context.clone());

        if let Err(e) = self.store.add_conversation_message(user_id, "user", message) {
            warn!("failed to record user message: {e}");
        }

        let (db_reminders, db_rescheduled) = self.load_reminder_context(user_id, &mut debug);

        let system_prompt = self.build_system_prompt(
            &db_reminders,
            &db_rescheduled,
            &mem0_context,
            &common_times,
        );

        let tool_defs = tools::tool_definitions();
        let mut messages = vec![ChatMessage::user_text(message)];
        let mut last_list_summary: Option<String> = None;

        for _iteration in 0..MAX_TOOL_ITERATIONS {
            let response = self.llm.complete(&system_prompt, &messages, &tool_defs).await?;

            if !response.has_tool_use() {
                let mut final_text = response.text();
                if let Some(summary) = last_list_summary {
                    final_text = summary;
                }
                self.finish_turn(user_id, message, &final_text);
                return Ok(TurnOutcome {
                    response: final_text,
                    debug,
                });
            }

            messages.push(ChatMessage::assistant_blocks(response.content.clone()));

            let mut tool_results = Vec::new();
            for block in &response.content {
                let ContentBlock::ToolUse { id, name, input } = block else {
                    continue;
                };

                let result = self.execute_tool(name, input, user_id, has_time, &mut debug).await;

                if name == "list_reminders"
                    && let Some(summary) = result.get("summary").and_then(|s| s.as_str())
                {
                    last_list_summary = Some(summary.to_string());
                }

                // A create that needs a time short-circuits the loop with
                // the confirmation question.
                if name == "create_reminder"
                    && result
                        .get("pending")
                        .and_then(|p| p.get("type"))
                        .and_then(|t| t.as_str())
                        == Some("confirm_time")
                    && let Some(prompt) = result.get("prompt").and_then(|p| p.as_str())
                {
                    self.finish_turn(user_id, message, prompt);
                    return Ok(TurnOutcome {
                        response: prompt.to_string(),
                        debug,
                    });
                }

                tool_results.push(ContentBlock::ToolResult {
                    tool_use_id: id.clone(),
                    content: result.to_string(),
                });
            }

            messages.push(ChatMessage::user_blocks(tool_results));
        }

        Ok(TurnOutcome {
            response: "Maximum iterations reached. Please try again.".to_string(),
            debug,
        })
    }

    /// Direct "Done" action from the UI or a Slack button.
    pub async fn action_mark_done(&self, user_id: &str, reminder_id: i64) -> (Value, TurnDebug) {
        let mut debug = TurnDebug::new();
        let result = self.execute_mark_done(user_id, reminder_id, &mut debug).await;
        (result, debug)
    }

    /// Direct "Snooze" action from the UI or a Slack button.
    pub async fn action_snooze(
        &self,
        user_id: &str,
        reminder_id: i64,
        snooze_str: &str,
    ) -> (Value, TurnDebug) {
        let mut debug = TurnDebug::new();
        let result = self
            .execute_snooze_reminder(user_id, reminder_id, snooze_str, &mut debug)
            .await;
        (result, debug)
    }

    // --- Pending-action state machine ---

    async fn resolve_pending(
        &self,
        user_id: &str,
        message: &str,
        has_time: bool,
        debug: &mut TurnDebug,
    ) -> Result<Option<String>> {
        let pending = match self.pending.get(user_id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };

        match pending {
            PendingAction::UpdateDue {
                reminder_id,
                due_str,
                ..
            } => {
                if intent::is_confirmation(message) {
                    self.pending.remove(user_id);
                    let result = self
                        .execute_update_reminder(user_id, reminder_id, None, None, Some(&due_str), debug)
                        .await;
                    let reply = if result.get("success").and_then(|s| s.as_bool()) == Some(true) {
                        result
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or("Reminder updated.")
                            .to_string()
                    } else {
                        result
                            .get("error")
                            .and_then(|e| e.as_str())
                            .unwrap_or("Sorry, I couldn't update that reminder.")
                            .to_string()
                    };
                    return Ok(Some(reply));
                }
                // Anything else falls through to the normal loop.
                Ok(None)
            }
            PendingAction::Clarify { matches, question } => {
                if let Some(index) = intent::parse_selection_index(message) {
                    if let Some(chosen) = matches.get(index) {
                        self.pending.remove(user_id);
                        let reminder_id = chosen
                            .get("id")
                            .or_else(|| chosen.get("reminder_id"))
                            .and_then(|v| v.as_i64());
                        if let Some(reminder_id) = reminder_id {
                            if has_time {
                                let result = self
                                    .execute_update_reminder(
                                        user_id,
                                        reminder_id,
                                        None,
                                        None,
                                        Some(message),
                                        debug,
                                    )
                                    .await;
                                let reply = result
                                    .get("message")
                                    .and_then(|m| m.as_str())
                                    .unwrap_or("Reminder updated.")
                                    .to_string();
                                return Ok(Some(reply));
                            }
                            let title = chosen
                                .get("title")
                                .and_then(|t| t.as_str())
                                .unwrap_or("that reminder");
                            return Ok(Some(format!("Which time should I set for '{title}'?")));
                        }
                    }
                }
                if intent::is_rejection(message) {
                    self.pending.remove(user_id);
                    return Ok(Some("Okay. Which reminder should I update instead?".to_string()));
                }
                Ok(Some(if question.is_empty() {
                    "Which reminder should I update?".to_string()
                } else {
                    question
                }))
            }
            PendingAction::ConfirmTime {
                title,
                description,
                due_str,
                suggested_time,
                ..
            } => {
                if intent::accepts_suggested_time(message) {
                    let Some(suggested) = suggested_time else {
                        return Ok(Some("What time should I set it for?".to_string()));
                    };
                    self.pending.remove(user_id);
                    let result = self
                        .execute_create_reminder(
                            user_id,
                            &title,
                            &format!("{due_str} {suggested}"),
                            &description,
                            true,
                            true,
                            debug,
                        )
                        .await;
                    let reply = result
                        .get("message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("Reminder created.")
                        .to_string();
                    return Ok(Some(reply));
                }
                if intent::is_rejection(message) {
                    return Ok(Some("What time should I set it for?".to_string()));
                }
                if has_time {
                    self.pending.remove(user_id);
                    let result = self
                        .execute_create_reminder(user_id, &title, message, &description, true, true, debug)
                        .await;
                    let reply = result
                        .get("message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("Reminder created.")
                        .to_string();
                    return Ok(Some(reply));
                }
                Ok(Some("What time should I set it for?".to_string()))
            }
        }
    }

    // --- Context assembly ---

    fn empty_mem0_context() -> Value {
        json!({
            "active_reminders": [],
            "rescheduled_active_reminders": [],
            "preferences": [],
            "behavior": [],
            "conversation_history": [],
        })
    }

    async fn get_mem0_context(
        &self,
        user_message: &str,
        user_id: &str,
        skip: bool,
        debug: &mut TurnDebug,
    ) -> Value {
        if skip {
            let context = Self::empty_mem0_context();
            debug.set_retrieved_memories(context.clone());
            return context;
        }

        if let Some(cached) = self.cached_mem0_context(user_id) {
            debug.set_retrieved_memories(cached.clone());
            return cached;
        }

        // Personalization only: preferences and behavior. Reminder state
        // comes from the relational store, which is ground truth.
        let behavior = self.mem0.search_behavior("behavior_summary", user_id, 3).await;
        debug.record_mem0_query("behavior_summary", "user_behavior", behavior.len());

        let preferences = self.mem0.search_preferences(user_message, user_id, 5).await;
        debug.record_mem0_query(user_message, "user_prefs", preferences.len());

        let context = json!({
            "active_reminders": [],
            "rescheduled_active_reminders": [],
            "preferences": preferences,
            "behavior": behavior,
            "conversation_history": [],
        });
        debug.set_retrieved_memories(context.clone());
        self.cache_mem0_context(user_id, &context);
        context
    }

    fn cached_mem0_context(&self, user_id: &str) -> Option<Value> {
        let entry = match self.store.get_mem0_cache(user_id) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("mem0 cache read failed: {e}");
                return None;
            }
        };

        if now_epoch() - entry.updated_at > self.context_ttl_seconds {
            return None;
        }

        let payload: Value = serde_json::from_str(&entry.payload).ok()?;
        // An empty object is the invalidation marker, not a cached context.
        if payload.as_object().map(|o| o.is_empty()).unwrap_or(true) {
            return None;
        }
        Some(payload)
    }

    fn cache_mem0_context(&self, user_id: &str, context: &Value) {
        if let Err(e) = self.store.set_mem0_cache(user_id, &context.to_string()) {
            warn!("mem0 cache write failed: {e}");
        }
    }

    fn invalidate_mem0_cache(store: &ReminderStore, user_id: &str) {
        if let Err(e) = store.set_mem0_cache(user_id, "{}") {
            warn!("mem0 cache invalidation failed: {e}");
        }
    }

    fn load_reminder_context(
        &self,
        user_id: &str,
        debug: &mut TurnDebug,
    ) -> (Vec<Reminder>, Vec<Reminder>) {
        let active = match self.store.list_active_reminders(user_id) {
            Ok(reminders) => reminders,
            Err(e) => {
                debug.record_db_change(json!({
                    "action": "db_read_failed",
                    "error": e.to_string(),
                    "note": "Using Mem0 as primary source",
                }));
                Vec::new()
            }
        };
        let rescheduled = self.store.list_rescheduled_reminders(user_id).unwrap_or_default();
        (active, rescheduled)
    }

    /// Mem0 time preferences merged with the most common historical time
    /// per category from the relational store. Mem0 wins on conflict.
    pub async fn get_common_times_by_category(&self, user_id: &str) -> Vec<(String, String)> {
        let mut common: Vec<(String, String)> = Vec::new();

        for memory in self.mem0.get_all(user_id, &[CAT_USER_PREFS]).await {
            let Some(key) = memory.metadata_str("pref_key") else {
                continue;
            };
            let Some(value) = memory.metadata_str("pref_value") else {
                continue;
            };
            if let Some(category) = intent::time_preference_category(key)
                && !common.iter().any(|(c, _)| *c == category)
            {
                common.push((category, value.trim().to_string()));
            }
        }

        let rows = match self.store.list_reminder_times_by_category(user_id) {
            Ok(rows) => rows,
            Err(_) => return common,
        };

        let mut buckets: Vec<(String, Vec<(String, u32)>)> = Vec::new();
        for (category, due_at_epoch) in rows {
            let Some(dt) = self.timezone.timestamp_opt(due_at_epoch, 0).single() else {
                continue;
            };
            let label = dt.format("%H:%M").to_string();
            let index = match buckets.iter().position(|(c, _)| *c == category) {
                Some(index) => index,
                None => {
                    buckets.push((category, Vec::new()));
                    buckets.len() - 1
                }
            };
            let bucket = &mut buckets[index].1;
            match bucket.iter_mut().find(|(l, _)| *l == label) {
                Some((_, count)) => *count += 1,
                None => bucket.push((label, 1)),
            }
        }

        for (category, times) in buckets {
            if common.iter().any(|(c, _)| *c == category) {
                continue;
            }
            if let Some((label, _)) = times.iter().max_by_key(|(_, count)| *count) {
                common.push((category, label.clone()));
            }
        }

        common
    }

    fn build_system_prompt(
        &self,
        active: &[Reminder],
        rescheduled: &[Reminder],
        mem0_context: &Value,
        common_times: &[(String, String)],
    ) -> String {
        let active_json = if active.is_empty() {
            "No active reminders".to_string()
        } else {
            let items: Vec<Value> = active.iter().map(reminder_to_json).collect();
            serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
        };

        let rescheduled_json = if rescheduled.is_empty() {
            "No rescheduled reminders".to_string()
        } else {
            let items: Vec<Value> = rescheduled.iter().map(reminder_to_json).collect();
            serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
        };

        let preferences = serde_json::to_string_pretty(&mem0_context["preferences"])
            .unwrap_or_else(|_| "[]".to_string());
        let behavior = serde_json::to_string_pretty(&mem0_context["behavior"])
            .unwrap_or_else(|_| "[]".to_string());

        let recent: Vec<Value> = mem0_context["conversation_history"]
            .as_array()
            .map(|turns| turns.iter().rev().take(3).rev().cloned().collect())
            .unwrap_or_default();
        let recent = serde_json::to_string_pretty(&recent).unwrap_or_else(|_| "[]".to_string());

        let times: serde_json::Map<String, Value> = common_times
            .iter()
            .map(|(category, time)| (category.clone(), json!(time)))
            .collect();
        let suggested_times =
            serde_json::to_string_pretty(&Value::Object(times)).unwrap_or_else(|_| "{}".to_string());

        let now = chrono::Utc::now().with_timezone(&self.timezone);
        let current = now.format("%A, %B %d, %Y at %I:%M %p").to_string();

        format!(
            r#"You are a proactive, friendly reminder companion. You help users stay organized while learning their habits and preferences over time.

## PERSONALITY & TONE
- Be conversational, supportive, and concise
- Use natural language (avoid robotic responses)
- Celebrate completions and encourage productivity
- Match the user's communication style (formal/casual)
- Proactively suggest improvements based on patterns

## CURRENT CONTEXT
**Active Reminders:**
{active_json}

**Rescheduled Active Reminders:**
{rescheduled_json}

**User Patterns:**
- Preferences: {preferences}
- Behavior: {behavior}
- Recent context: {recent}

**Time Context:**
- Current: {current}
- Timezone: {timezone}
- Suggested times: {suggested_times}

## CORE BEHAVIORS
1. Natural language first: parse "tomorrow at 3", "next Monday", "in 2 hours" automatically
2. Smart defaults: if no time given, suggest category-appropriate time from user patterns/common times, then confirm
3. Clarify ambiguity: use clarify_reminder tool when multiple matches exist
4. Proactive insights: notice patterns and suggest improvements when appropriate
5. DB is ground truth: always use DB-backed tools for reminder status/times; memory is context only
6. Clean responses: use tool summaries verbatim; never expose internal IDs or storage details
7. Respect user intent: only delete when explicitly requested
8. Accept short-term reminders (minutes) without refusing; never scold the user.
9. Never change or round user-provided times; preserve exact minutes/hours. If unclear, ask a brief clarification.
10. If the user asks for archived/completed reminders, call list_reminders with status="completed".

## RESPONSE GUIDELINES
- Confirmations: "Got it! I'll remind you about {{title}} on {{date}}"
- Lists: always call list_reminders and return its formatted summary verbatim with no extra text.
- Errors: be helpful, not apologetic ("Let me help you fix that...")
- Follow-ups: suggest related actions when relevant

Keep it human, helpful, and focused on the user's goals."#,
            timezone = self.timezone.name(),
        )
    }

    fn finish_turn(&self, user_id: &str, user_message: &str, final_text: &str) {
        if let Err(e) = self
            .store
            .add_conversation_message(user_id, "assistant", final_text)
        {
            warn!("failed to record assistant message: {e}");
        }

        let mem0 = Arc::clone(&self.mem0);
        let turn = format!("User: {user_message}\nAssistant: {final_text}");
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            mem0.add_conversation(&turn, &user_id).await;
        });
    }

    // --- Tool execution ---

    pub async fn execute_tool(
        &self,
        name: &str,
        input: &Value,
        user_id: &str,
        has_time: bool,
        debug: &mut TurnDebug,
    ) -> Value {
        let index = debug.record_tool_call(name, input);

        let str_arg = |key: &str| input.get(key).and_then(|v| v.as_str()).map(|s| s.to_string());
        let id_arg = input.get("reminder_id").and_then(|v| v.as_i64());

        let result = match name {
            "create_reminder" => match (str_arg("title"), str_arg("due_str")) {
                (Some(title), Some(due_str)) => {
                    self.execute_create_reminder(
                        user_id,
                        &title,
                        &due_str,
                        &str_arg("description").unwrap_or_default(),
                        false,
                        has_time,
                        debug,
                    )
                    .await
                }
                _ => json_error("create_reminder requires title and due_str"),
            },
            "update_reminder" => match id_arg {
                Some(reminder_id) => {
                    self.execute_update_reminder(
                        user_id,
                        reminder_id,
                        str_arg("title").as_deref(),
                        str_arg("description").as_deref(),
                        str_arg("due_str").as_deref(),
                        debug,
                    )
                    .await
                }
                None => json_error("update_reminder requires reminder_id"),
            },
            "mark_done" => match id_arg {
                Some(reminder_id) => self.execute_mark_done(user_id, reminder_id, debug).await,
                None => json_error("mark_done requires reminder_id"),
            },
            "snooze_reminder" => match (id_arg, str_arg("snooze_str")) {
                (Some(reminder_id), Some(snooze_str)) => {
                    self.execute_snooze_reminder(user_id, reminder_id, &snooze_str, debug)
                        .await
                }
                _ => json_error("snooze_reminder requires reminder_id and snooze_str"),
            },
            "list_reminders" => {
                let filter = tools::parse_status_filter(str_arg("status").as_deref());
                self.execute_list_reminders(user_id, filter)
            }
            "search_reminders" => match str_arg("query") {
                Some(query) => self.execute_search_reminders(user_id, &query),
                None => json_error("search_reminders requires query"),
            },
            "delete_reminder" => match id_arg {
                Some(reminder_id) => self.execute_delete_reminder(user_id, reminder_id, debug).await,
                None => json_error("delete_reminder requires reminder_id"),
            },
            "set_preference" => match (str_arg("key"), str_arg("value")) {
                (Some(key), Some(value)) => {
                    self.execute_set_preference(user_id, &key, &value, debug).await
                }
                _ => json_error("set_preference requires key and value"),
            },
            "get_preferences" => self.execute_get_preferences(user_id).await,
            "list_rescheduled_reminders" => self.execute_list_rescheduled(user_id).await,
            "clarify_reminder" => {
                let matches = input
                    .get("matches")
                    .and_then(|m| m.as_array())
                    .cloned()
                    .unwrap_or_default();
                let question = str_arg("question").unwrap_or_default();
                self.execute_clarify_reminder(user_id, matches, question)
            }
            other => json_error(&format!("Unknown tool: {other}")),
        };

        debug.record_tool_result(index, &result);
        result
    }

    async fn execute_create_reminder(
        &self,
        user_id: &str,
        title: &str,
        due_str: &str,
        description: &str,
        allow_unconfirmed: bool,
        has_time: bool,
        debug: &mut TurnDebug,
    ) -> Value {
        if !allow_unconfirmed && !has_time {
            let category = intent::infer_category(title, description).to_string();
            let common_times = self.get_common_times_by_category(user_id).await;
            let suggested_time = common_times
                .iter()
                .find(|(c, _)| *c == category)
                .map(|(_, t)| t.clone());

            let pending = PendingAction::ConfirmTime {
                title: title.to_string(),
                description: description.to_string(),
                due_str: due_str.to_string(),
                category: category.clone(),
                suggested_time: suggested_time.clone(),
            };
            let pending_json = pending.to_json();
            self.pending.insert(user_id.to_string(), pending);

            let prompt = match &suggested_time {
                Some(time) => format!(
                    "I usually schedule {category} reminders at {}. Would you like me to use that time?",
                    format_time_12h(time)
                ),
                None => "What time should I set this reminder for?".to_string(),
            };
            return json!({
                "success": false,
                "error": "Time confirmation needed",
                "pending": pending_json,
                "prompt": prompt,
            });
        }

        let Some(due_epoch) = timeparse::parse_datetime(due_str, self.timezone) else {
            return json_error("Could not parse date");
        };

        // Same title already active: treat as a reschedule of that reminder.
        if let Some(existing) = self.find_existing_active_reminder(user_id, title) {
            let mut result = self
                .execute_update_reminder(user_id, existing.id, None, None, Some(due_str), debug)
                .await;
            if result.get("success").and_then(|s| s.as_bool()) == Some(true) {
                result["message"] = json!(format!("Updated reminder '{title}' to {due_str}"));
            }
            return result;
        }

        let category = intent::infer_category(title, description).to_string();
        let reminder_id = match self.store.create_reminder(
            user_id,
            &NewReminder {
                title: title.to_string(),
                description: description.to_string(),
                due_at_epoch: Some(due_epoch),
                category: Some(category.clone()),
            },
        ) {
            Ok(id) => id,
            Err(e) => return json_error(&e.to_string()),
        };

        if let Err(e) = self.store.record_behavior_create(user_id) {
            warn!("behavior stat write failed: {e}");
        }
        self.spawn_behavior_update(user_id);

        let mem0_text = format!("Reminder: {title}. Due: {due_str}. Description: {description}");
        let metadata = json!({
            "reminder_id": reminder_id,
            "title": title,
            "description": description,
            "due_at_epoch": due_epoch,
            "status": "active",
            "reschedule_count": 0,
            "category": category,
        });
        self.spawn_active_upsert(reminder_id, user_id, mem0_text, metadata);

        debug.record_db_change(json!({
            "action": "create_reminder",
            "reminder_id": reminder_id,
            "mem0_id": Value::Null,
        }));

        json!({
            "success": true,
            "due_epoch": due_epoch,
            "message": format!("Reminder '{title}' created for {due_str}"),
        })
    }

    async fn execute_update_reminder(
        &self,
        user_id: &str,
        reminder_id: i64,
        title: Option<&str>,
        description: Option<&str>,
        due_str: Option<&str>,
        debug: &mut TurnDebug,
    ) -> Value {
        let reminder = match self.store.get_reminder(reminder_id, user_id) {
            Ok(Some(reminder)) => reminder,
            Ok(None) => return json_error(&format!("Reminder {reminder_id} not found")),
            Err(e) => return json_error(&e.to_string()),
        };

        let mut changes = ReminderChanges {
            title: title.map(|t| t.to_string()),
            description: description.map(|d| d.to_string()),
            ..Default::default()
        };

        if title.is_some() || description.is_some() {
            let current_title = title.unwrap_or(&reminder.title);
            let current_desc = description.unwrap_or(&reminder.description);
            changes.category = Some(intent::infer_category(current_title, current_desc).to_string());
        }

        if let Some(due_str) = due_str {
            match timeparse::parse_datetime(due_str, self.timezone) {
                Some(due_epoch) => {
                    changes.due_at_epoch = Some(due_epoch);
                    changes.rescheduled = true;
                }
                None => {
                    let pending = PendingAction::UpdateDue {
                        reminder_id,
                        due_str: due_str.to_string(),
                        title: Some(reminder.title.clone()),
                    };
                    let pending_json = pending.to_json();
                    self.pending.insert(user_id.to_string(), pending);
                    return json!({
                        "success": false,
                        "error": "Could not parse date",
                        "pending": pending_json,
                    });
                }
            }
        }

        let rescheduled = changes.rescheduled;
        if let Err(e) = self.store.update_reminder(reminder_id, user_id, &changes) {
            return json_error(&e.to_string());
        }
        if let Err(e) = self.store.record_behavior_update(user_id) {
            warn!("behavior stat write failed: {e}");
        }
        self.spawn_behavior_update(user_id);

        let new_title = title.unwrap_or(&reminder.title).to_string();
        let new_desc = description.unwrap_or(&reminder.description).to_string();
        let new_due = changes.due_at_epoch.or(reminder.due_at_epoch);
        let reschedule_count = reminder.reschedule_count + if rescheduled { 1 } else { 0 };
        let last_rescheduled_at = if rescheduled {
            Some(now_epoch())
        } else {
            reminder.last_rescheduled_at
        };

        let mem0_text = format!(
            "Reminder: {new_title}. Due: {}. Description: {new_desc}",
            self.format_epoch(new_due)
        );
        let metadata = json!({
            "reminder_id": reminder_id,
            "title": new_title,
            "description": new_desc,
            "due_at_epoch": new_due,
            "status": "active",
            "reschedule_count": reschedule_count,
            "last_rescheduled_at_epoch": last_rescheduled_at,
            "category": changes.category.clone().or(reminder.category),
        });
        self.spawn_active_upsert(reminder_id, user_id, mem0_text, metadata);

        debug.record_db_change(json!({
            "action": "update_reminder",
            "reminder_id": reminder_id,
            "mem0_id": Value::Null,
            "rescheduled": rescheduled,
        }));

        json!({
            "success": true,
            "message": format!("Reminder '{new_title}' updated"),
        })
    }

    async fn execute_mark_done(
        &self,
        user_id: &str,
        reminder_id: i64,
        debug: &mut TurnDebug,
    ) -> Value {
        let reminder = match self.store.get_reminder(reminder_id, user_id) {
            Ok(Some(reminder)) => reminder,
            Ok(None) => return json_error(&format!("Reminder {reminder_id} not found")),
            Err(e) => return json_error(&e.to_string()),
        };

        if let Err(e) = self.store.mark_reminder_done(reminder_id, user_id) {
            return json_error(&e.to_string());
        }

        let minutes_to_complete = ((now_epoch() - reminder.created_at) / 60).max(0);
        if let Err(e) = self.store.record_behavior_done(user_id, minutes_to_complete) {
            warn!("behavior stat write failed: {e}");
        }
        self.spawn_behavior_update(user_id);

        let mem0_text = format!(
            "Completed reminder: {}. Due: {}. Description: {}",
            reminder.title,
            self.format_epoch(reminder.due_at_epoch),
            reminder.description
        );
        let metadata = json!({
            "reminder_id": reminder_id,
            "title": reminder.title.clone(),
            "description": reminder.description.clone(),
            "due_at_epoch": reminder.due_at_epoch,
            "status": "completed",
            "reschedule_count": reminder.reschedule_count,
            "last_rescheduled_at_epoch": reminder.last_rescheduled_at,
            "category": reminder.category.clone(),
        });
        self.spawn_archive_upsert(
            reminder_id,
            user_id,
            mem0_text,
            metadata,
            reminder.mem0_memory_id.clone(),
        );

        debug.record_db_change(json!({
            "action": "mark_done",
            "reminder_id": reminder_id,
            "mem0_id": Value::Null,
        }));

        json!({
            "success": true,
            "message": format!("Reminder '{}' marked as done", reminder.title),
        })
    }

    async fn execute_snooze_reminder(
        &self,
        user_id: &str,
        reminder_id: i64,
        snooze_str: &str,
        debug: &mut TurnDebug,
    ) -> Value {
        let reminder = match self.store.get_reminder(reminder_id, user_id) {
            Ok(Some(reminder)) => reminder,
            Ok(None) => return json_error(&format!("Reminder {reminder_id} not found")),
            Err(e) => return json_error(&e.to_string()),
        };

        let Some(new_due) = timeparse::parse_datetime(snooze_str, self.timezone) else {
            return json_error("Could not parse snooze time");
        };

        if let Err(e) = self.store.update_reminder(
            reminder_id,
            user_id,
            &ReminderChanges {
                due_at_epoch: Some(new_due),
                rescheduled: true,
                ..Default::default()
            },
        ) {
            return json_error(&e.to_string());
        }

        let old_due = reminder.due_at_epoch.unwrap_or(new_due);
        let delta_minutes = ((new_due - old_due) / 60).max(0);
        if let Err(e) = self.store.record_behavior_snooze(user_id, delta_minutes) {
            warn!("behavior stat write failed: {e}");
        }
        self.spawn_behavior_update(user_id);

        let mem0_text = format!(
            "Reminder: {}. Due: {}. Description: {}",
            reminder.title,
            self.format_epoch(Some(new_due)),
            reminder.description
        );
        let metadata = json!({
            "reminder_id": reminder_id,
            "title": reminder.title,
            "description": reminder.description,
            "due_at_epoch": new_due,
            "status": "active",
            "reschedule_count": reminder.reschedule_count + 1,
            "last_rescheduled_at_epoch": now_epoch(),
            "category": reminder.category,
        });
        self.spawn_active_upsert(reminder_id, user_id, mem0_text, metadata);

        debug.record_db_change(json!({
            "action": "snooze_reminder",
            "reminder_id": reminder_id,
            "new_due": new_due,
            "mem0_id": Value::Null,
        }));

        json!({
            "success": true,
            "message": format!("Reminder snoozed to {snooze_str}"),
        })
    }

    fn execute_list_reminders(&self, user_id: &str, filter: StatusFilter) -> Value {
        let reminders = match filter {
            StatusFilter::Active => self.store.list_active_reminders(user_id),
            StatusFilter::Completed => self.store.list_completed_reminders(user_id),
            StatusFilter::Rescheduled => self.store.list_rescheduled_reminders(user_id),
            StatusFilter::All => self.store.list_all_reminders(user_id),
        };

        // DB might be unavailable temporarily; list as empty rather than fail.
        let formatted: Vec<Value> = reminders
            .unwrap_or_default()
            .iter()
            .map(reminder_to_json)
            .collect();

        let summary = tools::reminder_overview_summary(&formatted);
        json!({
            "success": true,
            "reminders": formatted,
            "count": formatted.len(),
            "summary": summary,
        })
    }

    fn execute_search_reminders(&self, user_id: &str, query: &str) -> Value {
        let formatted: Vec<Value> = match self.store.search_reminders(user_id, query) {
            Ok(reminders) => reminders.iter().map(reminder_to_json).collect(),
            Err(e) => return json_error(&e.to_string()),
        };

        json!({
            "success": true,
            "reminders": formatted,
            "count": formatted.len(),
        })
    }

    async fn execute_delete_reminder(
        &self,
        user_id: &str,
        reminder_id: i64,
        debug: &mut TurnDebug,
    ) -> Value {
        let reminder = match self.store.get_reminder(reminder_id, user_id) {
            Ok(Some(reminder)) => reminder,
            Ok(None) => return json_error(&format!("Reminder {reminder_id} not found")),
            Err(e) => return json_error(&e.to_string()),
        };

        if let Err(e) = self.store.delete_reminder(reminder_id, user_id) {
            return json_error(&e.to_string());
        }
        if let Some(mem0_id) = &reminder.mem0_memory_id {
            self.mem0.delete(mem0_id).await;
        }
        Self::invalidate_mem0_cache(&self.store, user_id);

        debug.record_db_change(json!({
            "action": "delete_reminder",
            "reminder_id": reminder_id,
        }));

        json!({
            "success": true,
            "message": format!("Reminder {reminder_id} deleted"),
        })
    }

    async fn execute_set_preference(
        &self,
        user_id: &str,
        key: &str,
        value: &str,
        debug: &mut TurnDebug,
    ) -> Value {
        // Relational mirror first, then the Mem0 upsert in the background.
        if let Err(e) = self.store.set_preference(user_id, key, value) {
            warn!("preference write failed: {e}");
        }

        let mem0_text = format!("User preference: {key} = {value}");
        let metadata = json!({ "pref_key": key, "pref_value": value });
        self.spawn_preference_upsert(user_id, key, mem0_text, metadata);

        debug.record_db_change(json!({
            "action": "set_preference",
            "key": key,
            "value": value,
            "mem0_id": Value::Null,
        }));

        json!({
            "success": true,
            "message": format!("Preference '{key}' set to '{value}'"),
        })
    }

    async fn execute_get_preferences(&self, user_id: &str) -> Value {
        let memories = self.mem0.get_all(user_id, &[CAT_USER_PREFS]).await;

        let mut prefs = serde_json::Map::new();
        for memory in memories {
            if let Some(key) = memory.metadata_str("pref_key") {
                let value = memory
                    .metadata_str("pref_value")
                    .map(|v| json!(v))
                    .unwrap_or(Value::Null);
                prefs.insert(key.to_string(), value);
            }
        }

        json!({ "success": true, "preferences": prefs })
    }

    async fn execute_list_rescheduled(&self, user_id: &str) -> Value {
        let memories = self.mem0.get_rescheduled_active_reminders(user_id, 50).await;
        let mut formatted: Vec<Value> = memories
            .iter()
            .map(|m| {
                json!({
                    "id": m.metadata_i64("reminder_id").map(Value::from)
                        .unwrap_or_else(|| json!(m.id.clone())),
                    "title": m.metadata_str("title").unwrap_or(""),
                    "description": m.metadata_str("description").unwrap_or(""),
                    "due_at": format_due_label(m.metadata_i64("due_at_epoch")),
                    "status": m.metadata_str("status").unwrap_or("active"),
                    "reschedule_count": m.metadata_i64("reschedule_count").unwrap_or(0),
                    "last_rescheduled_at_epoch": m.metadata_i64("last_rescheduled_at_epoch"),
                })
            })
            .collect();

        if formatted.is_empty()
            && let Ok(reminders) = self.store.list_rescheduled_reminders(user_id)
        {
            formatted = reminders
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id,
                        "title": r.title,
                        "description": r.description,
                        "due_at": format_due_label(r.due_at_epoch),
                        "status": r.status.as_str(),
                        "reschedule_count": r.reschedule_count,
                        "last_rescheduled_at_epoch": r.last_rescheduled_at,
                    })
                })
                .collect();
        }

        json!({
            "success": true,
            "reminders": formatted,
            "count": formatted.len(),
        })
    }

    fn execute_clarify_reminder(
        &self,
        user_id: &str,
        matches: Vec<Value>,
        question: String,
    ) -> Value {
        let result = json!({
            "success": true,
            "question": question,
            "matches": matches,
        });
        self.pending.insert(
            user_id.to_string(),
            PendingAction::Clarify { matches, question },
        );
        result
    }

    // --- Helpers ---

    fn find_existing_active_reminder(&self, user_id: &str, title: &str) -> Option<Reminder> {
        let reminders = self.store.list_active_reminders(user_id).ok()?;
        let target = intent::normalize_title(title);
        reminders
            .into_iter()
            .filter(|r| intent::normalize_title(&r.title) == target)
            .max_by_key(|r| r.updated_at)
    }

    fn format_epoch(&self, epoch: Option<i64>) -> String {
        match epoch.and_then(|e| self.timezone.timestamp_opt(e, 0).single()) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            None => "N/A".to_string(),
        }
    }

    fn spawn_behavior_update(&self, user_id: &str) {
        let store = Arc::clone(&self.store);
        let mem0 = Arc::clone(&self.mem0);
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            let stats = match store.get_behavior_stats(&user_id) {
                Ok(stats) => stats,
                Err(e) => {
                    warn!("behavior stats unavailable: {e}");
                    return;
                }
            };
            let Some(summary) = build_behavior_summary(&stats) else {
                return;
            };
            let metadata = json!({
                "create_count": stats.create_count,
                "update_count": stats.update_count,
                "snooze_count": stats.snooze_count,
                "avg_snooze_minutes": stats.avg_snooze_minutes,
                "done_count": stats.done_count,
                "avg_complete_minutes": stats.avg_complete_minutes,
            });
            if let Some(id) = mem0.upsert_behavior_summary(&summary, &user_id, metadata).await {
                info!("behavior summary refreshed: {id}");
            }
            Self::invalidate_mem0_cache(&store, &user_id);
        });
    }

    fn spawn_active_upsert(&self, reminder_id: i64, user_id: &str, text: String, metadata: Value) {
        let store = Arc::clone(&self.store);
        let mem0 = Arc::clone(&self.mem0);
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            if let Some(mem0_id) = mem0.upsert_active_reminder(&text, &user_id, metadata).await
                && let Err(e) = store.update_reminder_mem0_id(reminder_id, &user_id, &mem0_id)
            {
                warn!("failed to store mem0 id for reminder {reminder_id}: {e}");
            }
            Self::invalidate_mem0_cache(&store, &user_id);
        });
    }

    fn spawn_archive_upsert(
        &self,
        reminder_id: i64,
        user_id: &str,
        text: String,
        metadata: Value,
        active_mem0_id: Option<String>,
    ) {
        let store = Arc::clone(&self.store);
        let mem0 = Arc::clone(&self.mem0);
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            if let Some(active_id) = active_mem0_id {
                mem0.delete(&active_id).await;
            }
            if let Some(mem0_id) = mem0.upsert_archived_reminder(&text, &user_id, metadata).await
                && let Err(e) = store.update_reminder_mem0_id(reminder_id, &user_id, &mem0_id)
            {
                warn!("failed to store mem0 id for reminder {reminder_id}: {e}");
            }
            Self::invalidate_mem0_cache(&store, &user_id);
        });
    }

    fn spawn_preference_upsert(&self, user_id: &str, key: &str, text: String, metadata: Value) {
        let store = Arc::clone(&self.store);
        let mem0 = Arc::clone(&self.mem0);
        let user_id = user_id.to_string();
        let key = key.to_string();
        tokio::spawn(async move {
            if let Some(mem0_id) = mem0.upsert_preference(&text, &user_id, metadata).await
                && let Err(e) = store.update_preference_mem0_id(&user_id, &key, &mem0_id)
            {
                warn!("failed to store mem0 id for preference {key}: {e}");
            }
            Self::invalidate_mem0_cache(&store, &user_id);
        });
    }
}

/// One-line behavior recap stored as the user's single behavior memory.
pub fn build_behavior_summary(stats: &nudge_db::BehaviorStats) -> Option<String> {
    if stats.total_events() == 0 {
        return None;
    }
    Some(format!(
        "Behavior summary: created {} reminders, updated {} times, snoozed {} times (avg {} min), completed {} reminders (avg {} min after creation).",
        stats.create_count,
        stats.update_count,
        stats.snooze_count,
        stats.avg_snooze_minutes,
        stats.done_count,
        stats.avg_complete_minutes,
    ))
}

fn json_error(message: &str) -> Value {
    json!({ "success": false, "error": message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nudge_db::BehaviorStats;

    fn test_runtime() -> AgentRuntime {
        let store = Arc::new(ReminderStore::in_memory().expect("store should open"));
        let mem0 = Arc::new(Mem0Client::new(
            "test-key",
            None,
            None,
            // Unroutable loopback port: every Mem0 call degrades to empty.
            Some("http://127.0.0.1:9".to_string()),
            true,
        ));
        let llm = AnthropicClient::new("test-key", None, None, None);
        AgentRuntime::new(
            store,
            mem0,
            llm,
            chrono_tz::Asia::Kolkata,
            6,
            120,
        )
    }

    #[test]
    fn behavior_summary_skips_idle_users() {
        assert!(build_behavior_summary(&BehaviorStats::default()).is_none());

        let stats = BehaviorStats {
            create_count: 3,
            snooze_count: 2,
            snooze_minutes_total: 25,
            avg_snooze_minutes: 12.5,
            ..Default::default()
        };
        let summary = build_behavior_summary(&stats).expect("summary for active user");
        assert!(summary.contains("created 3 reminders"));
        assert!(summary.contains("avg 12.5 min"));
    }

    #[tokio::test]
    async fn create_without_time_asks_for_confirmation() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        let result = runtime
            .execute_create_reminder("u1", "pay rent", "tomorrow", "", false, false, &mut debug)
            .await;

        assert_eq!(result["success"], false);
        assert_eq!(result["pending"]["type"], "confirm_time");
        assert_eq!(result["pending"]["category"], "finance");
        assert!(result["prompt"].as_str().unwrap().contains("time"));
        assert!(runtime.pending.contains_key("u1"));
    }

    #[tokio::test]
    async fn create_with_time_persists_reminder() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        let result = runtime
            .execute_create_reminder(
                "u1",
                "pay rent",
                "tomorrow 9am",
                "",
                false,
                true,
                &mut debug,
            )
            .await;

        assert_eq!(result["success"], true);
        assert!(result["due_epoch"].as_i64().is_some());

        let active = runtime.store.list_active_reminders("u1").expect("list");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "pay rent");
        assert_eq!(active[0].category.as_deref(), Some("finance"));
        assert_eq!(debug.db_changes.len(), 1);
        assert_eq!(debug.db_changes[0]["action"], "create_reminder");
    }

    #[tokio::test]
    async fn duplicate_title_updates_instead_of_creating() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        runtime
            .execute_create_reminder("u1", "team call", "tomorrow 2pm", "", false, true, &mut debug)
            .await;
        let result = runtime
            .execute_create_reminder("u1", "Team Call!", "tomorrow 4pm", "", false, true, &mut debug)
            .await;

        assert_eq!(result["success"], true);
        assert!(
            result["message"]
                .as_str()
                .unwrap()
                .starts_with("Updated reminder")
        );

        let active = runtime.store.list_active_reminders("u1").expect("list");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].reschedule_count, 1);
    }

    #[tokio::test]
    async fn unparseable_create_date_errors() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        let result = runtime
            .execute_create_reminder("u1", "x", "whenever", "", true, true, &mut debug)
            .await;
        assert_eq!(result["success"], false);
        assert_eq!(result["error"], "Could not parse date");
    }

    #[tokio::test]
    async fn mark_done_records_behavior_and_status() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        runtime
            .execute_create_reminder("u1", "buy milk", "tomorrow 10am", "", false, true, &mut debug)
            .await;
        let id = runtime.store.list_active_reminders("u1").expect("list")[0].id;

        let result = runtime.execute_mark_done("u1", id, &mut debug).await;
        assert_eq!(result["success"], true);

        let completed = runtime.store.list_completed_reminders("u1").expect("list");
        assert_eq!(completed.len(), 1);

        let stats = runtime.store.get_behavior_stats("u1").expect("stats");
        assert_eq!(stats.done_count, 1);
    }

    #[tokio::test]
    async fn mark_done_missing_reminder_errors() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();
        let result = runtime.execute_mark_done("u1", 999, &mut debug).await;
        assert_eq!(result["success"], false);
        assert_eq!(result["error"], "Reminder 999 not found");
    }

    #[tokio::test]
    async fn snooze_reschedules_and_counts_minutes() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        runtime
            .execute_create_reminder("u1", "standup", "tomorrow 9am", "", false, true, &mut debug)
            .await;
        let id = runtime.store.list_active_reminders("u1").expect("list")[0].id;

        let result = runtime
            .execute_snooze_reminder("u1", id, "30 minutes", &mut debug)
            .await;
        assert_eq!(result["success"], true);

        let reminder = runtime.store.get_reminder(id, "u1").expect("get").expect("exists");
        assert_eq!(reminder.reschedule_count, 1);

        let stats = runtime.store.get_behavior_stats("u1").expect("stats");
        assert_eq!(stats.snooze_count, 1);
    }

    #[tokio::test]
    async fn list_tool_returns_summary_verbatim() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        runtime
            .execute_create_reminder("u1", "standup", "tomorrow 9am", "", false, true, &mut debug)
            .await;

        let result = runtime
            .execute_tool("list_reminders", &json!({"status": "active"}), "u1", false, &mut debug)
            .await;
        assert_eq!(result["success"], true);
        assert_eq!(result["count"], 1);
        assert!(
            result["summary"]
                .as_str()
                .unwrap()
                .contains("reminders overview (1 total)")
        );
    }

    #[tokio::test]
    async fn unknown_tool_reports_error() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();
        let result = runtime
            .execute_tool("frobnicate", &json!({}), "u1", false, &mut debug)
            .await;
        assert_eq!(result["success"], false);
        assert_eq!(result["error"], "Unknown tool: frobnicate");
        assert_eq!(debug.tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn clarify_sets_pending_and_selection_resolves_it() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        runtime
            .execute_create_reminder("u1", "meeting A", "tomorrow 2pm", "", false, true, &mut debug)
            .await;
        let id = runtime.store.list_active_reminders("u1").expect("list")[0].id;

        let matches = vec![json!({"id": id, "title": "meeting A"})];
        let result = runtime.execute_clarify_reminder(
            "u1",
            matches,
            "Which meeting do you mean?".to_string(),
        );
        assert_eq!(result["success"], true);

        // A time-bearing selection applies the update directly.
        let reply = runtime
            .resolve_pending("u1", "first", false, &mut debug)
            .await
            .expect("resolve should succeed");
        assert_eq!(
            reply,
            Some("Which time should I set for 'meeting A'?".to_string())
        );
        assert!(!runtime.pending.contains_key("u1"));
    }

    #[tokio::test]
    async fn clarify_rejection_clears_pending() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        runtime.execute_clarify_reminder("u1", vec![], "Which one?".to_string());
        let reply = runtime
            .resolve_pending("u1", "no", false, &mut debug)
            .await
            .expect("resolve should succeed");
        assert_eq!(
            reply,
            Some("Okay. Which reminder should I update instead?".to_string())
        );
        assert!(!runtime.pending.contains_key("u1"));
    }

    #[tokio::test]
    async fn confirm_time_with_explicit_time_creates() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        runtime
            .execute_create_reminder("u1", "pay rent", "tomorrow", "", false, false, &mut debug)
            .await;
        assert!(runtime.pending.contains_key("u1"));

        let reply = runtime
            .resolve_pending("u1", "9am", true, &mut debug)
            .await
            .expect("resolve should succeed")
            .expect("should reply");
        assert!(reply.contains("created"));

        let active = runtime.store.list_active_reminders("u1").expect("list");
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn confirm_time_rejection_asks_for_time() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        runtime
            .execute_create_reminder("u1", "pay rent", "tomorrow", "", false, false, &mut debug)
            .await;
        let reply = runtime
            .resolve_pending("u1", "nope", false, &mut debug)
            .await
            .expect("resolve should succeed");
        assert_eq!(reply, Some("What time should I set it for?".to_string()));
        // The pending action survives until a time arrives.
        assert!(runtime.pending.contains_key("u1"));
    }

    #[tokio::test]
    async fn update_due_pending_applies_on_confirmation() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        runtime
            .execute_create_reminder("u1", "standup", "tomorrow 9am", "", false, true, &mut debug)
            .await;
        let id = runtime.store.list_active_reminders("u1").expect("list")[0].id;

        runtime.pending.insert(
            "u1".to_string(),
            PendingAction::UpdateDue {
                reminder_id: id,
                due_str: "tomorrow 11am".to_string(),
                title: Some("standup".to_string()),
            },
        );

        let reply = runtime
            .resolve_pending("u1", "yes", false, &mut debug)
            .await
            .expect("resolve should succeed")
            .expect("should reply");
        assert!(reply.contains("updated"));

        let reminder = runtime.store.get_reminder(id, "u1").expect("get").expect("exists");
        assert_eq!(reminder.reschedule_count, 1);
    }

    #[tokio::test]
    async fn set_preference_mirrors_to_store() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        let result = runtime
            .execute_set_preference("u1", "timezone", "America/New_York", &mut debug)
            .await;
        assert_eq!(result["success"], true);
        assert_eq!(
            runtime.store.get_preference("u1", "timezone").expect("get"),
            Some("America/New_York".to_string())
        );
    }

    #[tokio::test]
    async fn delete_requires_existing_reminder() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();
        let result = runtime.execute_delete_reminder("u1", 42, &mut debug).await;
        assert_eq!(result["success"], false);
    }

    #[tokio::test]
    async fn common_times_fall_back_to_db_histogram() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        // Two work reminders at 09:00 IST, one at 14:00 IST.
        for due_str in ["tomorrow 9am", "day after tomorrow 9am"] {
            runtime
                .execute_create_reminder(
                    "u1",
                    &format!("meeting {due_str}"),
                    due_str,
                    "",
                    false,
                    true,
                    &mut debug,
                )
                .await;
        }
        runtime
            .execute_create_reminder("u1", "client sync", "tomorrow 2pm", "", false, true, &mut debug)
            .await;

        let times = runtime.get_common_times_by_category("u1").await;
        let work = times.iter().find(|(c, _)| c == "work").expect("work bucket");
        assert_eq!(work.1, "09:00");
    }

    #[tokio::test]
    async fn skip_prefetch_returns_empty_context() {
        let runtime = test_runtime();
        let mut debug = TurnDebug::new();

        let context = runtime
            .get_mem0_context("list my reminders", "u1", true, &mut debug)
            .await;
        assert_eq!(context["preferences"], json!([]));
        assert!(debug.mem0_queries.is_empty());
    }
}
