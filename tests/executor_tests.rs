use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use stepflow::{
    action_fn, ActionHandler, EngineConfig, ExecutionStatus, Integration, IntegrationRegistry,
    MemoryStore, Step, StepOutcome, StepResult, StepflowError, TokenMode, TriggerDescriptor,
    Workflow, WorkflowExecutor,
};

/// 记录调用次数与收到的配置
struct RecordingAction {
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Map<String, Value>>>>,
    reply: Value,
}

impl RecordingAction {
    fn new(reply: Value) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
            reply,
        }
    }
}

#[async_trait]
impl ActionHandler for RecordingAction {
    async fn call(&self, config: Map<String, Value>) -> stepflow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(config);
        Ok(self.reply.clone())
    }
}

struct RejectingAction;

#[async_trait]
impl ActionHandler for RejectingAction {
    async fn call(&self, _config: Map<String, Value>) -> stepflow::Result<Value> {
        Err(StepflowError::Other(anyhow::anyhow!("candidate not found")))
    }
}

struct PanickingAction;

#[async_trait]
impl ActionHandler for PanickingAction {
    async fn call(&self, _config: Map<String, Value>) -> stepflow::Result<Value> {
        panic!("handler exploded")
    }
}

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn workflow(id: &str, name: &str) -> Workflow {
    Workflow::new(id, "org-1", name, TriggerDescriptor::new("greenhouse", "candidate.hired"))
}

#[tokio::test]
async fn welcome_workflow_end_to_end() -> AnyResult<()> {
    let executor = WorkflowExecutor::new(IntegrationRegistry::new());
    let wf = workflow("wf-welcome", "Welcome")
        .with_step(Step::new(1, "log").with_config("message", "{{trigger.name}} arrived"));

    let results = executor
        .execute_workflow(&wf, payload(json!({"name": "Alice"})))
        .await?;

    assert_eq!(
        results,
        vec![StepResult::success(1, "log", json!({"logged": "Alice arrived"}))]
    );
    assert_eq!(
        serde_json::to_value(&results)?,
        json!([{"step": 1, "type": "log", "status": "success", "result": {"logged": "Alice arrived"}}])
    );
    Ok(())
}

#[tokio::test]
async fn halts_after_first_failing_step() -> AnyResult<()> {
    let first = RecordingAction::new(json!({"ok": true}));
    let third = RecordingAction::new(json!({"ok": true}));
    let first_calls = Arc::clone(&first.calls);
    let third_calls = Arc::clone(&third.calls);

    let registry = IntegrationRegistry::new().with_integration(
        Integration::new("greenhouse")
            .with_action("get_candidate", Arc::new(first))
            .with_action("reject", Arc::new(RejectingAction))
            .with_action("archive", Arc::new(third)),
    );
    let executor = WorkflowExecutor::new(registry);
    let wf = workflow("wf-halt", "Halt")
        .with_step(Step::integration(1, "greenhouse", "get_candidate"))
        .with_step(Step::integration(2, "greenhouse", "reject"))
        .with_step(Step::integration(3, "greenhouse", "archive"));

    let run = executor.execute(&wf, Map::new()).await?;

    assert_eq!(run.results.len(), 2);
    assert!(run.results[0].is_success());
    assert_eq!(run.results[1].error_message(), Some("candidate not found"));
    assert_eq!(run.results[1].step, 2);
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(third_calls.load(Ordering::SeqCst), 0);

    let record = executor
        .execution_status(&run.execution_id)
        .await?
        .expect("record exists");
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.current_step, 1);
    assert_eq!(record.results.len(), 2);
    Ok(())
}

#[tokio::test]
async fn later_steps_see_earlier_results() -> AnyResult<()> {
    let lookup = RecordingAction::new(json!({"foo": "candidate-42", "score": 7}));
    let notify = RecordingAction::new(json!({"sent": true}));
    let seen = Arc::clone(&notify.seen);

    let registry = IntegrationRegistry::new()
        .with_integration(Integration::new("greenhouse").with_action("lookup", Arc::new(lookup)))
        .with_integration(Integration::new("gmail").with_action("send_email", Arc::new(notify)));
    let executor = WorkflowExecutor::new(registry);
    let wf = workflow("wf-ctx", "Context")
        .with_step(Step::integration(1, "greenhouse", "lookup"))
        .with_step(
            Step::integration(2, "gmail", "send_email")
                .with_config("subject", "Hired {{step_1_result.foo}} ({{step_1_result.score}})")
                .with_config("to", "{{email}}")
                .with_config("cc", "{{trigger.manager.email}}")
                .with_config("priority", 3),
        );

    executor
        .execute_workflow(
            &wf,
            payload(json!({"email": "ada@example.com", "manager": {"email": "boss@example.com"}})),
        )
        .await?;

    let configs = seen.lock();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0]["subject"], json!("Hired candidate-42 (7)"));
    assert_eq!(configs[0]["to"], json!("ada@example.com"));
    assert_eq!(configs[0]["cc"], json!("boss@example.com"));
    assert_eq!(configs[0]["priority"], json!(3));
    Ok(())
}

#[tokio::test]
async fn seeded_context_keys_are_resolvable() -> AnyResult<()> {
    let echo = RecordingAction::new(json!({}));
    let seen = Arc::clone(&echo.seen);
    let registry = IntegrationRegistry::new()
        .with_integration(Integration::new("debug").with_action("echo", Arc::new(echo)));
    let executor = WorkflowExecutor::new(registry);
    let wf = workflow("wf-seed", "Seeded").with_step(
        Step::integration(1, "debug", "echo")
            .with_config("workflow", "{{workflow}}")
            .with_config("execution", "{{execution_id}}")
            .with_config("missing", "[{{nope.nothing}}]"),
    );

    let run = executor.execute(&wf, Map::new()).await?;

    let configs = seen.lock();
    assert_eq!(configs[0]["workflow"], json!("Seeded"));
    assert_eq!(configs[0]["execution"], json!(run.execution_id));
    assert_eq!(configs[0]["missing"], json!("[]"));
    Ok(())
}

#[tokio::test]
async fn unknown_step_type_is_a_step_error() -> AnyResult<()> {
    let executor = WorkflowExecutor::new(IntegrationRegistry::new());
    let wf = workflow("wf-unknown", "Unknown")
        .with_step(Step::new(1, "nonsense"))
        .with_step(Step::new(2, "log"));

    let results = executor.execute_workflow(&wf, Map::new()).await?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].step_type, "nonsense");
    match &results[0].outcome {
        StepOutcome::Error { error } => assert!(error.contains("unknown step type")),
        other => panic!("expected error outcome, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unregistered_integration_or_action_is_a_step_error() -> AnyResult<()> {
    let registry = IntegrationRegistry::new().with_integration(Integration::new("gmail"));
    let executor = WorkflowExecutor::new(registry);

    let missing_integration =
        workflow("wf-a", "A").with_step(Step::integration(1, "bamboohr", "create_employee"));
    let results = executor.execute_workflow(&missing_integration, Map::new()).await?;
    assert_eq!(
        results[0].error_message(),
        Some("integration `bamboohr` not registered")
    );

    let missing_action = workflow("wf-b", "B").with_step(Step::integration(1, "gmail", "send_email"));
    let results = executor.execute_workflow(&missing_action, Map::new()).await?;
    assert_eq!(
        results[0].error_message(),
        Some("action `send_email` not registered on integration `gmail`")
    );
    Ok(())
}

#[tokio::test]
async fn integration_without_action_falls_back_to_step_type() -> AnyResult<()> {
    let executor = WorkflowExecutor::new(IntegrationRegistry::new());
    let mut step = Step::new(1, "log").with_config("message", "plain log");
    step.integration = Some("gmail".into());
    let wf = workflow("wf-fallback", "Fallback").with_step(step);

    let results = executor.execute_workflow(&wf, Map::new()).await?;
    assert_eq!(results[0].result(), Some(&json!({"logged": "plain log"})));
    Ok(())
}

#[tokio::test]
async fn bookkeeping_after_successful_run() -> AnyResult<()> {
    let executor = WorkflowExecutor::new(IntegrationRegistry::new());
    let wf = workflow("wf-book", "Bookkeeping")
        .with_step(Step::new(1, "log"))
        .with_step(Step::new(2, "webhook").with_config("url", "https://hooks.example.com/{{id}}"));

    let run = executor.execute(&wf, payload(json!({"id": "abc"}))).await?;
    assert_eq!(
        run.results[1].result(),
        Some(&json!({"webhook_sent": "https://hooks.example.com/abc"}))
    );

    let record = executor
        .execution_status(&run.execution_id)
        .await?
        .expect("record exists");
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.workflow_id, "wf-book");
    assert!(record.end_time.is_some());
    assert!(record.end_time.unwrap() >= record.start_time);
    assert_eq!(record.results.len(), wf.steps.len());
    assert_eq!(record.current_step, 1);
    assert!(record.error.is_none());

    assert!(executor.execution_status("does-not-exist").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn steps_run_in_array_order_not_order_field() -> AnyResult<()> {
    let executor = WorkflowExecutor::new(IntegrationRegistry::new());
    let wf = workflow("wf-order", "Order")
        .with_step(Step::new(20, "log").with_config("message", "first"))
        .with_step(Step::new(5, "log").with_config("message", "{{step_1_result.logged}} then second"));

    let results = executor.execute_workflow(&wf, Map::new()).await?;
    assert_eq!(results[0].step, 1);
    assert_eq!(results[1].step, 2);
    assert_eq!(
        results[1].result(),
        Some(&json!({"logged": "first then second"}))
    );
    Ok(())
}

#[tokio::test]
async fn delay_step_waits_on_timer() -> AnyResult<()> {
    let executor = WorkflowExecutor::new(IntegrationRegistry::new());
    let wf = workflow("wf-delay", "Delay").with_step(Step::new(1, "delay").with_config("delay", 50));

    let started = Instant::now();
    let results = executor.execute_workflow(&wf, Map::new()).await?;

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(results[0].result(), Some(&json!({"delayed": 50})));
    Ok(())
}

#[tokio::test]
async fn delay_default_comes_from_config() -> AnyResult<()> {
    let executor = WorkflowExecutor::with_config(
        IntegrationRegistry::new(),
        EngineConfig::default().with_default_delay_ms(5),
    );
    let wf = workflow("wf-delay-default", "Delay default")
        .with_step(Step::new(1, "delay").with_config("delay", "{{missing}}"));

    let results = executor.execute_workflow(&wf, Map::new()).await?;
    assert_eq!(results[0].result(), Some(&json!({"delayed": 5})));
    Ok(())
}

#[tokio::test]
async fn concurrent_executions_are_isolated() -> AnyResult<()> {
    let registry = IntegrationRegistry::new().with_integration(Integration::new("debug").with_action(
        "echo",
        action_fn(|config| async move { Ok::<_, StepflowError>(Value::Object(config)) }),
    ));
    let executor = WorkflowExecutor::new(registry);

    let slow = workflow("wf-slow", "Slow")
        .with_step(Step::new(1, "delay").with_config("delay", 40))
        .with_step(
            Step::integration(2, "debug", "echo")
                .with_config("who", "{{name}}")
                .with_config("execution", "{{execution_id}}"),
        );
    let fast = workflow("wf-fast", "Fast")
        .with_step(Step::new(1, "delay").with_config("delay", 10))
        .with_step(
            Step::integration(2, "debug", "echo")
                .with_config("who", "{{name}}")
                .with_config("execution", "{{execution_id}}"),
        );

    let slow_exec = executor.clone();
    let fast_exec = executor.clone();
    let (slow_run, fast_run) = tokio::join!(
        tokio::spawn(async move { slow_exec.execute(&slow, payload(json!({"name": "Ada"}))).await }),
        tokio::spawn(async move { fast_exec.execute(&fast, payload(json!({"name": "Grace"}))).await }),
    );
    let slow_run = slow_run??;
    let fast_run = fast_run??;

    assert_ne!(slow_run.execution_id, fast_run.execution_id);
    assert_eq!(
        slow_run.results[1].result(),
        Some(&json!({"who": "Ada", "execution": slow_run.execution_id}))
    );
    assert_eq!(
        fast_run.results[1].result(),
        Some(&json!({"who": "Grace", "execution": fast_run.execution_id}))
    );

    let records = executor.all_running_workflows().await?;
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|record| record.status == ExecutionStatus::Completed));
    Ok(())
}

#[tokio::test]
async fn empty_workflow_fails_without_running() -> AnyResult<()> {
    let executor = WorkflowExecutor::new(IntegrationRegistry::new());
    let wf = workflow("wf-empty", "Empty");

    let err = executor.execute_workflow(&wf, Map::new()).await.unwrap_err();
    assert!(matches!(err, StepflowError::EmptyWorkflow(ref id) if id == "wf-empty"));

    let failed = executor.executions_with_status(ExecutionStatus::Failed).await?;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].workflow_id, "wf-empty");
    assert!(failed[0].end_time.is_some());
    assert_eq!(failed[0].error.as_deref(), Some("workflow `wf-empty` has no steps"));
    Ok(())
}

#[tokio::test]
async fn panicking_handler_marks_execution_failed() -> AnyResult<()> {
    let registry = IntegrationRegistry::new()
        .with_integration(Integration::new("bamboohr").with_action("sync", Arc::new(PanickingAction)));
    let executor = WorkflowExecutor::new(registry);
    let wf = workflow("wf-panic", "Panic")
        .with_step(Step::new(1, "log"))
        .with_step(Step::integration(2, "bamboohr", "sync"));

    let err = executor.execute_workflow(&wf, Map::new()).await.unwrap_err();
    assert!(matches!(err, StepflowError::HandlerPanicked(ref msg) if msg == "handler exploded"));

    let records = executor.all_running_workflows().await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ExecutionStatus::Failed);
    assert_eq!(records[0].current_step, 1);
    assert!(records[0].results.is_empty());
    Ok(())
}

#[tokio::test]
async fn strict_mode_turns_missing_tokens_into_step_errors() -> AnyResult<()> {
    let executor = WorkflowExecutor::with_config(
        IntegrationRegistry::new(),
        EngineConfig::default().with_token_mode(TokenMode::Strict),
    );
    let wf = workflow("wf-strict", "Strict")
        .with_step(Step::new(1, "log").with_config("message", "hello {{trigger.name}}"))
        .with_step(Step::new(2, "log").with_config("message", "{{trigger.typo}}"))
        .with_step(Step::new(3, "log"));

    let run = executor.execute(&wf, payload(json!({"name": "Ada"}))).await?;

    assert_eq!(run.results.len(), 2);
    assert_eq!(run.results[0].result(), Some(&json!({"logged": "hello Ada"})));
    assert_eq!(
        run.results[1].error_message(),
        Some("unresolved token `{{trigger.typo}}`")
    );
    let record = executor.execution_status(&run.execution_id).await?.unwrap();
    assert_eq!(record.status, ExecutionStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn injected_store_receives_records_in_order() -> AnyResult<()> {
    let store = Arc::new(MemoryStore::with_capacity(2));
    let executor = WorkflowExecutor::new(IntegrationRegistry::new()).with_store(store.clone());

    let wf = workflow("wf-store", "Store").with_step(Step::new(1, "log"));
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(executor.execute(&wf, Map::new()).await?.execution_id);
    }

    assert_eq!(store.len(), 2);
    let listed: Vec<String> = executor
        .all_running_workflows()
        .await?
        .into_iter()
        .map(|record| record.execution_id)
        .collect();
    assert_eq!(listed, ids[1..].to_vec());
    Ok(())
}

#[tokio::test]
async fn completed_record_survives_full_store_with_running_execution() -> AnyResult<()> {
    let store = Arc::new(MemoryStore::with_capacity(1));
    let executor = WorkflowExecutor::new(IntegrationRegistry::new()).with_store(store.clone());

    let slow = workflow("wf-slow", "Slow").with_step(Step::new(1, "delay").with_config("delay", 100));
    let fast = workflow("wf-fast", "Fast").with_step(Step::new(1, "delay").with_config("delay", 10));

    let background = executor.clone();
    let slow_task = tokio::spawn(async move { background.execute(&slow, Map::new()).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fast_run = executor.execute(&fast, Map::new()).await?;
    let fast_record = executor
        .execution_status(&fast_run.execution_id)
        .await?
        .expect("completed record is still tracked");
    assert_eq!(fast_record.status, ExecutionStatus::Completed);

    let running = executor.executions_with_status(ExecutionStatus::Running).await?;
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].workflow_id, "wf-slow");

    let slow_run = slow_task.await??;
    let slow_record = executor.execution_status(&slow_run.execution_id).await?;
    assert_eq!(
        slow_record.map(|record| record.status),
        Some(ExecutionStatus::Completed)
    );
    assert_eq!(store.len(), 1);
    assert!(executor.execution_status(&fast_run.execution_id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn webhook_without_url_halts_but_completes() -> AnyResult<()> {
    let executor = WorkflowExecutor::new(IntegrationRegistry::new());
    let wf = workflow("wf-hook", "Hook")
        .with_step(Step::new(1, "webhook").with_config("body", "hello"))
        .with_step(Step::new(2, "log").with_config("message", "never"));

    let run = executor.execute(&wf, Map::new()).await?;

    assert_eq!(run.results.len(), 1);
    assert_eq!(
        run.results[0].error_message(),
        Some("invalid step config: webhook step requires a `url`")
    );
    let record = executor
        .execution_status(&run.execution_id)
        .await?
        .expect("record");
    assert_eq!(record.status, ExecutionStatus::Completed);
    Ok(())
}
