//! The dispatcher: turn state machine driving model calls and tool execution

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tars_ai::{ModelGateway, stream_response};
use tokio::sync::{broadcast, mpsc};

use crate::{
    context::{ContextBuilder, DEFAULT_MAX_TOKENS},
    error::Result,
    events::AgentEvent,
    handle::AgentHandle,
    invocation::{CallValidator, ToolKind, UPDATE_TASK_LIST},
    policy::{Mode, rejection_message},
    protocol::{ModelReply, RawInvocation, parse_reply},
    tasks::TaskChecklist,
    tool::BoxedTool,
};

/// Prefix of the operator message folded in when queued input cuts a batch short
pub const INTERRUPTION_NOTICE: &str = "[Interrupted by operator]";

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Window budget for the conversation section
    pub max_tokens: u32,
    /// Model calls allowed per query
    pub max_turns: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            max_turns: 50,
        }
    }
}

/// How a query ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced a final answer
    Final(String),
    /// The loop stopped without a final answer (undecodable reply, nothing to do)
    Completed,
    /// `max_turns` model calls were made without a final answer
    TurnLimit,
}

/// Operator-facing session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentStatus {
    pub mode: Mode,
    pub message_count: usize,
    pub total_tokens: u64,
}

/// One orchestration session
pub struct Agent {
    config: AgentConfig,
    context: ContextBuilder,
    gateway: Arc<dyn ModelGateway>,
    tools: HashMap<ToolKind, BoxedTool>,
    validator: CallValidator,
    task_list: Option<TaskChecklist>,
    mode: Arc<RwLock<Mode>>,
    queue_rx: mpsc::UnboundedReceiver<String>,
    handle: AgentHandle,
    event_tx: broadcast::Sender<AgentEvent>,
}

impl Agent {
    /// Create a new agent rooted at `root_dir`
    pub fn new(
        config: AgentConfig,
        gateway: Arc<dyn ModelGateway>,
        root_dir: impl Into<PathBuf>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let mode = Arc::new(RwLock::new(Mode::default()));
        Self {
            context: ContextBuilder::new(root_dir, config.max_tokens),
            config,
            gateway,
            tools: HashMap::new(),
            validator: CallValidator::new(),
            task_list: None,
            handle: AgentHandle::new(queue_tx, Arc::clone(&mode)),
            mode,
            queue_rx,
            event_tx,
        }
    }

    /// Subscribe to agent events
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_tx.subscribe()
    }

    /// Register a tool, replacing any tool of the same kind
    pub fn add_tool(&mut self, tool: BoxedTool) {
        self.tools.insert(tool.kind(), tool);
    }

    /// Set tools (replaces existing)
    pub fn set_tools(&mut self, tools: Vec<BoxedTool>) {
        self.tools.clear();
        for tool in tools {
            self.add_tool(tool);
        }
    }

    /// Get a cloneable handle for enqueueing messages and switching mode
    pub fn handle(&self) -> AgentHandle {
        self.handle.clone()
    }

    pub fn set_mode(&self, mode: Mode) {
        self.handle.set_mode(mode);
    }

    pub fn mode(&self) -> Mode {
        *self.mode.read()
    }

    pub fn status(&self) -> AgentStatus {
        let stats = self.context.stats();
        AgentStatus {
            mode: self.mode(),
            message_count: stats.message_count,
            total_tokens: stats.total_tokens,
        }
    }

    pub fn task_list(&self) -> Option<&TaskChecklist> {
        self.task_list.as_ref()
    }

    pub fn context(&self) -> &ContextBuilder {
        &self.context
    }

    /// Replace the file tree snapshot shown to the model
    pub fn refresh_file_tree(&mut self, snapshot: impl Into<String>) {
        self.context.set_file_tree(snapshot);
    }

    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) {
        self.context.set_cwd(cwd);
    }

    pub fn set_summary(&mut self, summary: Option<String>) {
        self.context.set_summary(summary);
    }

    /// Start a fresh window; history is kept but no longer shown to the
    /// model. Summary and checklist are dropped.
    pub fn clear_history(&mut self) {
        self.context.clear_history();
        self.task_list = None;
    }

    /// Run one operator query to completion
    pub async fn process_query(&mut self, query: &str) -> Result<TurnOutcome> {
        // Input typed after the previous query finished is kept, in order
        for stale in self.drain_queue() {
            self.context.append_operator_message(stale);
        }
        self.context.append_operator_message(query);
        let _ = self.event_tx.send(AgentEvent::AgentStart);

        let mut turn = 0u32;
        let result = loop {
            if turn >= self.config.max_turns {
                tracing::warn!(max_turns = self.config.max_turns, "Turn limit reached");
                break Ok(TurnOutcome::TurnLimit);
            }
            turn += 1;
            let _ = self.event_tx.send(AgentEvent::TurnStart { turn_number: turn });

            let response = match self.call_model().await {
                Ok(text) => text,
                Err(e) => {
                    let _ = self.event_tx.send(AgentEvent::Error {
                        message: e.to_string(),
                    });
                    break Err(e.into());
                }
            };

            let invocations = match parse_reply(&response) {
                Ok(ModelReply::Final(answer)) => {
                    let _ = self.event_tx.send(AgentEvent::FinalAnswer {
                        text: answer.text.clone(),
                    });
                    break Ok(TurnOutcome::Final(answer.text));
                }
                Ok(ModelReply::Invocations(list)) => self.extract_task_list(list),
                Err(e) => {
                    tracing::warn!("Failed to parse model reply: {}", e);
                    let _ = self.event_tx.send(AgentEvent::ParseFailed {
                        message: e.to_string(),
                    });
                    break Ok(TurnOutcome::Completed);
                }
            };

            if invocations.is_empty() {
                tracing::debug!(turn, "No invocations left, ending query");
                break Ok(TurnOutcome::Completed);
            }

            tracing::debug!(turn, count = invocations.len(), "Executing invocations");
            if self.execute_invocations(&invocations).await {
                tracing::debug!(turn, "Re-prompting with operator input");
            }
        };

        let _ = self.event_tx.send(AgentEvent::AgentEnd { total_turns: turn });
        result
    }

    /// Build the prompt, stream the reply and return its full text
    async fn call_model(&self) -> tars_ai::Result<String> {
        let prompt = self.context.build_prompt(self.mode());
        let event_tx = self.event_tx.clone();
        let text = stream_response(self.gateway.as_ref(), &prompt, move |delta| {
            let _ = event_tx.send(AgentEvent::ResponseDelta {
                delta: delta.to_string(),
            });
        })
        .await?;
        let _ = self.event_tx.send(AgentEvent::ResponseEnd { text: text.clone() });
        Ok(text)
    }

    /// Pull out every `update_task_list` call; the last valid one wins
    fn extract_task_list(&mut self, invocations: Vec<RawInvocation>) -> Vec<RawInvocation> {
        let (updates, rest): (Vec<_>, Vec<_>) = invocations
            .into_iter()
            .partition(|raw| raw.tool == UPDATE_TASK_LIST);

        for raw in &updates {
            match self.validator.validate_task_list(raw) {
                Ok(list) => {
                    let _ = self.event_tx.send(AgentEvent::TaskListUpdated {
                        task_list: list.clone(),
                    });
                    self.task_list = Some(list);
                }
                Err(e) => tracing::warn!("Ignoring invalid task list: {}", e),
            }
        }
        rest
    }

    /// Run a batch in order, checking the operator queue after each one.
    /// Returns `true` if the batch was cut short.
    async fn execute_invocations(&mut self, invocations: &[RawInvocation]) -> bool {
        for (idx, raw) in invocations.iter().enumerate() {
            self.dispatch(raw).await;

            let queued = self.drain_queue();
            if !queued.is_empty() {
                let skipped = invocations.len() - idx - 1;
                tracing::debug!(skipped, messages = queued.len(), "Batch interrupted by operator");
                self.context.append_operator_message(format!(
                    "{}\n{}",
                    INTERRUPTION_NOTICE,
                    queued.join("\n")
                ));
                let _ = self.event_tx.send(AgentEvent::Interrupted {
                    messages: queued.len(),
                    skipped,
                });
                return true;
            }
        }
        false
    }

    /// Policy, validation, execution. Every outcome is folded into history.
    async fn dispatch(&mut self, raw: &RawInvocation) {
        let mode = self.mode();
        if let Some(kind) = ToolKind::from_name(&raw.tool) {
            if !mode.permits(kind) {
                tracing::debug!(tool = %kind, %mode, "Blocked by mode policy");
                let _ = self.event_tx.send(AgentEvent::PolicyBlocked {
                    tool: raw.tool.clone(),
                    mode,
                });
                self.context
                    .append_tool_result(raw, &rejection_message(mode, kind));
                return;
            }
        }

        let invocation = match self.validator.validate(raw) {
            Ok(invocation) => invocation,
            Err(e) => {
                let message = e.to_string();
                tracing::debug!("{}", message);
                let _ = self.event_tx.send(AgentEvent::ValidationFailed {
                    tool: raw.tool.clone(),
                    message: message.clone(),
                });
                self.context.append_tool_result(raw, &message);
                return;
            }
        };

        let kind = invocation.kind();
        let _ = self.event_tx.send(AgentEvent::InvocationStart {
            tool: kind.name().to_string(),
            description: invocation.description.clone(),
            options: raw.options.clone(),
        });

        let outcome = match self.tools.get(&kind) {
            Some(tool) => tool.execute(&invocation.call).await,
            None => Err(crate::tool::ToolError::failed(format!(
                "No implementation registered for {}",
                kind
            ))),
        };

        match outcome {
            Ok(result) => {
                let _ = self.event_tx.send(AgentEvent::InvocationEnd {
                    tool: kind.name().to_string(),
                    display: result.display_result,
                    is_error: false,
                });
                self.context
                    .append_tool_result(&invocation, &result.llm_result);
            }
            Err(e) => {
                tracing::warn!(tool = %kind, "Tool failed: {}", e);
                let message = format!("Error: {}", e);
                let _ = self.event_tx.send(AgentEvent::InvocationEnd {
                    tool: kind.name().to_string(),
                    display: message.clone(),
                    is_error: true,
                });
                self.context.append_tool_result(&invocation, &message);
            }
        }
    }

    fn drain_queue(&mut self) -> Vec<String> {
        let mut drained = Vec::new();
        while let Ok(message) = self.queue_rx.try_recv() {
            drained.push(message);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::ToolCall;
    use crate::tasks::TaskStatus;
    use crate::tool::{Tool, ToolError, ToolResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tars_ai::TextStream;

    /// Replays canned replies and records every prompt it was sent
    struct MockGateway {
        responses: Mutex<Vec<String>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl MockGateway {
        fn new(responses: Vec<String>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let prompts = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    responses: Mutex::new(responses),
                    prompts: Arc::clone(&prompts),
                },
                prompts,
            )
        }
    }

    #[async_trait]
    impl ModelGateway for MockGateway {
        async fn stream(&self, prompt: &str) -> tars_ai::Result<TextStream> {
            self.prompts.lock().push(prompt.to_string());
            let reply = {
                let mut responses = self.responses.lock();
                if responses.is_empty() {
                    r#"{"text":"done"}"#.to_string()
                } else {
                    responses.remove(0)
                }
            };
            // split so deltas are exercised
            let mid = reply.len() / 2;
            let (a, b) = reply.split_at(mid);
            let chunks: Vec<tars_ai::Result<String>> = vec![Ok(a.to_string()), Ok(b.to_string())];
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl ModelGateway for FailingGateway {
        async fn stream(&self, _prompt: &str) -> tars_ai::Result<TextStream> {
            Err(tars_ai::Error::from_status(401, "API key not valid"))
        }
    }

    type Hook = Box<dyn Fn() + Send + Sync>;

    /// Counts executions and optionally runs a hook while "executing"
    struct SpyTool {
        kind: ToolKind,
        calls: Arc<AtomicU32>,
        hook: Option<Hook>,
        fail: bool,
        output: Option<String>,
    }

    impl SpyTool {
        fn new(kind: ToolKind) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    kind,
                    calls: Arc::clone(&calls),
                    hook: None,
                    fail: false,
                    output: None,
                },
                calls,
            )
        }

        fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
            self.hook = Some(Box::new(hook));
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn with_output(mut self, output: String) -> Self {
            self.output = Some(output);
            self
        }
    }

    #[async_trait]
    impl Tool for SpyTool {
        fn kind(&self) -> ToolKind {
            self.kind
        }

        async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
            assert_eq!(call.kind(), self.kind);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(hook) = &self.hook {
                hook();
            }
            if self.fail {
                return Err(ToolError::failed("disk on fire"));
            }
            Ok(ToolResult::new(
                self.output
                    .clone()
                    .unwrap_or_else(|| format!("{} output", self.kind)),
                format!("{} display", self.kind),
            ))
        }
    }

    fn valid_options(kind: ToolKind) -> Value {
        match kind {
            ToolKind::ReadFile => json!({"absolutePath": "/project/a.rs"}),
            ToolKind::EditFile => {
                json!({"filePath": "/project/a.rs", "oldString": "a", "newString": "b"})
            }
            ToolKind::NewFile => json!({"filePath": "/project/b.rs", "content": "fn b() {}"}),
            ToolKind::Grep => json!({"pattern": "fn main"}),
            ToolKind::Glob => json!({"pattern": "**/*.rs"}),
            ToolKind::ShellCommand => json!({"command": "cargo test"}),
        }
    }

    fn call(kind: ToolKind) -> Value {
        json!({"tool": kind.name(), "toolOptions": valid_options(kind)})
    }

    fn batch(items: Vec<Value>) -> String {
        Value::Array(items).to_string()
    }

    fn make_agent(responses: Vec<String>) -> (Agent, Arc<Mutex<Vec<String>>>) {
        let (gateway, prompts) = MockGateway::new(responses);
        let agent = Agent::new(AgentConfig::default(), Arc::new(gateway), "/project");
        (agent, prompts)
    }

    fn history_contains(agent: &Agent, needle: &str) -> bool {
        agent
            .context()
            .history()
            .iter()
            .any(|e| e.content().contains(needle))
    }

    #[tokio::test]
    async fn test_final_answer_on_first_turn() {
        let (mut agent, prompts) = make_agent(vec![r#"{"text":"done"}"#.into()]);
        let outcome = agent.process_query("list files").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Final("done".into()));
        assert_eq!(prompts.lock().len(), 1);
        assert!(prompts.lock()[0].ends_with("operator: list files"));
        assert_eq!(agent.status().message_count, 1);
    }

    #[tokio::test]
    async fn test_double_encoded_final_answer() {
        let encoded = serde_json::to_string(r#"{"text":"done"}"#).unwrap();
        let (mut agent, _) = make_agent(vec![encoded]);
        let outcome = agent.process_query("hi").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Final("done".into()));
    }

    #[tokio::test]
    async fn test_tool_results_fold_and_loop_continues() {
        let (mut agent, prompts) = make_agent(vec![
            batch(vec![call(ToolKind::Glob), call(ToolKind::ReadFile)]),
            r#"{"text":"found it"}"#.into(),
        ]);
        let (glob, glob_calls) = SpyTool::new(ToolKind::Glob);
        let (read, read_calls) = SpyTool::new(ToolKind::ReadFile);
        agent.set_tools(vec![Arc::new(glob), Arc::new(read)]);

        let outcome = agent.process_query("find main").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Final("found it".into()));
        assert_eq!(glob_calls.load(Ordering::SeqCst), 1);
        assert_eq!(read_calls.load(Ordering::SeqCst), 1);

        // operator + two folds
        assert_eq!(agent.status().message_count, 3);
        let second_prompt = prompts.lock()[1].clone();
        assert!(second_prompt.contains("Output of {\"tool\":\"glob\""));
        assert!(second_prompt.contains("glob output"));
        assert!(!second_prompt.contains("glob display"));
    }

    #[tokio::test]
    async fn test_mode_policy_never_invokes_mutating_tools() {
        for mode in [Mode::Ask, Mode::Planning] {
            for kind in crate::policy::MUTATING_TOOLS {
                let (mut agent, _) = make_agent(vec![batch(vec![call(*kind)])]);
                let (spy, calls) = SpyTool::new(*kind);
                agent.add_tool(Arc::new(spy));
                agent.set_mode(mode);

                agent.process_query("change something").await.unwrap();

                assert_eq!(
                    calls.load(Ordering::SeqCst),
                    0,
                    "{} ran in {} mode",
                    kind,
                    mode
                );
                assert!(history_contains(&agent, "Blocked"));
            }
        }
    }

    #[tokio::test]
    async fn test_read_only_mode_still_runs_reads() {
        let (mut agent, _) = make_agent(vec![batch(vec![call(ToolKind::Grep)])]);
        let (spy, calls) = SpyTool::new(ToolKind::Grep);
        agent.add_tool(Arc::new(spy));
        agent.set_mode(Mode::Ask);
        agent.process_query("where is main").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_task_list_extracted_before_dispatch() {
        let task_list = json!({
            "tool": UPDATE_TASK_LIST,
            "toolOptions": {
                "goal": "add logging",
                "items": [
                    {"id": "1", "title": "find entry point", "status": "in-progress"},
                    {"id": "2", "title": "wire tracing", "status": "todo"}
                ]
            }
        });
        let (mut agent, _) = make_agent(vec![batch(vec![
            call(ToolKind::Grep),
            task_list,
            call(ToolKind::Glob),
            call(ToolKind::ReadFile),
        ])]);
        let mut counters = Vec::new();
        for kind in [ToolKind::Grep, ToolKind::Glob, ToolKind::ReadFile] {
            let (spy, calls) = SpyTool::new(kind);
            agent.add_tool(Arc::new(spy));
            counters.push(calls);
        }

        agent.process_query("add logging").await.unwrap();

        for calls in &counters {
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
        let list = agent.task_list().unwrap();
        assert_eq!(list.goal, "add logging");
        assert_eq!(list.items[0].status, TaskStatus::InProgress);
        assert!(!history_contains(&agent, UPDATE_TASK_LIST));
        // operator + three folds
        assert_eq!(agent.status().message_count, 4);
    }

    #[tokio::test]
    async fn test_task_list_replaced_wholesale() {
        let first = json!({"tool": UPDATE_TASK_LIST, "toolOptions": {"goal": "a", "items": [
            {"id": "1", "title": "x", "status": "todo"},
            {"id": "2", "title": "y", "status": "todo"}
        ]}});
        let second = json!({"tool": UPDATE_TASK_LIST, "toolOptions": {"goal": "b", "items": [
            {"id": "9", "title": "z", "status": "done"}
        ]}});
        let (mut agent, _) = make_agent(vec![batch(vec![first]), batch(vec![second])]);
        // a list with only a checklist update ends the query
        assert_eq!(
            agent.process_query("go").await.unwrap(),
            TurnOutcome::Completed
        );
        assert_eq!(agent.task_list().unwrap().items.len(), 2);
        agent.process_query("more").await.unwrap();
        let list = agent.task_list().unwrap();
        assert_eq!(list.goal, "b");
        assert_eq!(list.items.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_task_list_ignored() {
        let bad = json!({"tool": UPDATE_TASK_LIST, "toolOptions": {"goal": "a", "items": "nope"}});
        let (mut agent, _) = make_agent(vec![batch(vec![bad])]);
        agent.process_query("go").await.unwrap();
        assert!(agent.task_list().is_none());
    }

    #[tokio::test]
    async fn test_interruption_skips_rest_of_batch() {
        let (mut agent, prompts) = make_agent(vec![
            batch(vec![
                call(ToolKind::ReadFile),
                call(ToolKind::Grep),
                call(ToolKind::Glob),
            ]),
            r#"{"text":"switched"}"#.into(),
        ]);
        let handle = agent.handle();
        let (read, read_calls) = SpyTool::new(ToolKind::ReadFile);
        let read = read.with_hook(move || handle.enqueue_message("use the other file"));
        let (grep, grep_calls) = SpyTool::new(ToolKind::Grep);
        let (glob, glob_calls) = SpyTool::new(ToolKind::Glob);
        agent.set_tools(vec![Arc::new(read), Arc::new(grep), Arc::new(glob)]);
        let mut events = agent.subscribe();

        let outcome = agent.process_query("fix it").await.unwrap();

        assert_eq!(outcome, TurnOutcome::Final("switched".into()));
        assert_eq!(read_calls.load(Ordering::SeqCst), 1);
        assert_eq!(grep_calls.load(Ordering::SeqCst), 0);
        assert_eq!(glob_calls.load(Ordering::SeqCst), 0);

        let prompts = prompts.lock();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains(INTERRUPTION_NOTICE));
        assert!(prompts[1].contains("use the other file"));

        let mut saw_interrupt = false;
        while let Ok(event) = events.try_recv() {
            if let AgentEvent::Interrupted { messages, skipped } = event {
                assert_eq!((messages, skipped), (1, 2));
                saw_interrupt = true;
            }
        }
        assert!(saw_interrupt);
    }

    #[tokio::test]
    async fn test_multiple_queued_messages_join_into_one() {
        let (mut agent, _) = make_agent(vec![batch(vec![
            call(ToolKind::Glob),
            call(ToolKind::Glob),
        ])]);
        let handle = agent.handle();
        let (glob, calls) = SpyTool::new(ToolKind::Glob);
        let glob = glob.with_hook(move || {
            handle.enqueue_message("first");
            handle.enqueue_message("second");
        });
        agent.add_tool(Arc::new(glob));

        agent.process_query("go").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let expected = format!("{}\nfirst\nsecond", INTERRUPTION_NOTICE);
        let entries: Vec<&str> = agent
            .context()
            .history()
            .iter()
            .map(|e| e.content())
            .collect();
        assert!(entries.contains(&expected.as_str()));
    }

    #[tokio::test]
    async fn test_mode_switch_mid_batch_applies_to_next_invocation() {
        let (mut agent, _) = make_agent(vec![batch(vec![
            call(ToolKind::ReadFile),
            call(ToolKind::EditFile),
        ])]);
        let handle = agent.handle();
        let (read, _) = SpyTool::new(ToolKind::ReadFile);
        let read = read.with_hook(move || handle.set_mode(Mode::Planning));
        let (edit, edit_calls) = SpyTool::new(ToolKind::EditFile);
        agent.set_tools(vec![Arc::new(read), Arc::new(edit)]);

        agent.process_query("edit").await.unwrap();

        assert_eq!(agent.mode(), Mode::Planning);
        assert_eq!(edit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_failure_folds_and_continues() {
        let bad_edit = json!({"tool": "edit_file", "toolOptions": {"filePath": "/project/a.rs", "newString": "x"}});
        let (mut agent, _) = make_agent(vec![batch(vec![bad_edit, call(ToolKind::Glob)])]);
        let (edit, edit_calls) = SpyTool::new(ToolKind::EditFile);
        let (glob, glob_calls) = SpyTool::new(ToolKind::Glob);
        agent.set_tools(vec![Arc::new(edit), Arc::new(glob)]);

        agent.process_query("edit").await.unwrap();

        assert_eq!(edit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(glob_calls.load(Ordering::SeqCst), 1);
        assert!(history_contains(&agent, "Invalid edit_file options"));
        assert!(history_contains(&agent, "oldString"));
    }

    #[tokio::test]
    async fn test_unknown_tool_folds_error() {
        let (mut agent, _) = make_agent(vec![batch(vec![
            json!({"tool": "rm_rf", "toolOptions": {}}),
        ])]);
        agent.process_query("clean").await.unwrap();
        assert!(history_contains(&agent, "Unknown tool"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_folded() {
        let (mut agent, prompts) = make_agent(vec![batch(vec![call(ToolKind::ReadFile)])]);
        let (read, _) = SpyTool::new(ToolKind::ReadFile);
        agent.add_tool(Arc::new(read.failing()));

        agent.process_query("read").await.unwrap();

        assert!(history_contains(&agent, "Error: disk on fire"));
        assert!(prompts.lock()[1].contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_missing_implementation_is_folded() {
        let (mut agent, _) = make_agent(vec![batch(vec![call(ToolKind::Glob)])]);
        agent.process_query("find").await.unwrap();
        assert!(history_contains(&agent, "No implementation registered for glob"));
    }

    #[tokio::test]
    async fn test_parse_failure_ends_turn() {
        let (mut agent, prompts) = make_agent(vec!["Sure! Let me look at that.".into()]);
        let outcome = agent.process_query("help").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(prompts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_list_completes() {
        let (mut agent, _) = make_agent(vec!["[]".into()]);
        let outcome = agent.process_query("help").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Completed);
    }

    #[tokio::test]
    async fn test_turn_limit() {
        let looping = batch(vec![call(ToolKind::Glob)]);
        let (gateway, prompts) = MockGateway::new(vec![looping; 10]);
        let config = AgentConfig {
            max_turns: 3,
            ..AgentConfig::default()
        };
        let mut agent = Agent::new(config, Arc::new(gateway), "/project");
        let (glob, _) = SpyTool::new(ToolKind::Glob);
        agent.add_tool(Arc::new(glob));

        let outcome = agent.process_query("loop").await.unwrap();
        assert_eq!(outcome, TurnOutcome::TurnLimit);
        assert_eq!(prompts.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_gateway_auth_error_propagates() {
        let mut agent = Agent::new(AgentConfig::default(), Arc::new(FailingGateway), "/project");
        let err = agent.process_query("hi").await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_stale_queue_kept_before_query() {
        let (mut agent, prompts) = make_agent(vec![]);
        agent.handle().enqueue_message("also check the tests");
        agent.process_query("fix the build").await.unwrap();
        let prompt = prompts.lock()[0].clone();
        let stale = prompt.find("operator: also check the tests").unwrap();
        let query = prompt.find("operator: fix the build").unwrap();
        assert!(stale < query);
    }

    #[tokio::test]
    async fn test_events_stream_deltas_and_final() {
        let (mut agent, _) = make_agent(vec![r#"{"text":"done"}"#.into()]);
        let mut events = agent.subscribe();
        agent.process_query("hi").await.unwrap();

        let mut deltas = String::new();
        let mut saw_final = false;
        let mut saw_end = false;
        while let Ok(event) = events.try_recv() {
            match event {
                AgentEvent::ResponseDelta { delta } => deltas.push_str(&delta),
                AgentEvent::FinalAnswer { text } => saw_final = text == "done",
                AgentEvent::AgentEnd { total_turns } => saw_end = total_turns == 1,
                _ => {}
            }
        }
        assert_eq!(deltas, r#"{"text":"done"}"#);
        assert!(saw_final && saw_end);
    }

    #[tokio::test]
    async fn test_clear_history_resets_session() {
        let (mut agent, prompts) = make_agent(vec![
            r#"{"text":"done"}"#.into(),
            r#"{"text":"done again"}"#.into(),
        ]);
        agent.process_query("hello").await.unwrap();
        let before = agent.status();
        assert_eq!(before.message_count, 1);

        agent.clear_history();
        assert!(agent.task_list().is_none());
        assert_eq!(agent.status().message_count, before.message_count);
        assert_eq!(agent.status().total_tokens, before.total_tokens);
        assert!(agent.context().window().is_empty());

        agent.process_query("next").await.unwrap();
        let prompts = prompts.lock();
        let last = prompts.last().unwrap();
        assert!(last.contains("operator: next"));
        assert!(!last.contains("operator: hello"));
        assert!(history_contains(&agent, "hello"));
    }

    #[tokio::test]
    async fn test_huge_tool_output_does_not_evict_query() {
        let (mut agent, prompts) = make_agent(vec![
            batch(vec![call(ToolKind::ShellCommand)]),
            r#"{"text":"done"}"#.into(),
        ]);
        let (shell, _) = SpyTool::new(ToolKind::ShellCommand);
        agent.add_tool(Arc::new(shell.with_output("x".repeat(100_000))));

        agent.process_query("fix the failing test").await.unwrap();

        let prompts = prompts.lock();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("operator: fix the failing test"));
        assert!(prompts[1].contains("(output truncated:"));
    }

    #[test]
    fn test_status_reflects_mode() {
        let (agent, _) = make_agent(vec![]);
        assert_eq!(agent.status().mode, Mode::Agent);
        agent.handle().set_mode(Mode::Ask);
        assert_eq!(agent.status().mode, Mode::Ask);
        assert_eq!(agent.status().message_count, 0);
    }
}
