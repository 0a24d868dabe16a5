//! End-to-end protocol flows over a scripted in-memory surface.
//!
//! The surface double interprets selectors by which default probe group they
//! belong to, so the protocols run unmodified against it. The operator double
//! records every handoff and can mutate the surface, standing in for a human
//! fixing the page.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use paperchat::config::Timeouts;
use paperchat::error::Error;
use paperchat::prompts::{PromptLibrary, PromptVariant};
use paperchat::protocol::{ChatProtocol, ExchangeRequest, SummaryExchange};
use paperchat::selectors::Selectors;
use paperchat::session::{ChatSurface, OperatorPort};
use paperchat::storage::DebugSink;

#[derive(Default)]
struct State {
    editor_visible: bool,
    challenge: bool,
    file_input: bool,
    set_files_ok: bool,
    attach_button: bool,
    /// Clicking the attach affordance makes the hidden file input appear.
    attach_click_reveals_input: bool,
    chooser_ok: bool,
    uploading: bool,
    send_present: bool,
    send_click_ok: bool,
    generating: bool,
    /// Page body text; previews and upload phrases are matched against it.
    body: String,
    turns: Vec<String>,
    /// Replies released into `turns` when a send click dispatches.
    pending_replies: VecDeque<String>,
    /// Dispatched reply withheld for this many turn-count polls, simulating
    /// a DOM that lags behind the conversation.
    arrival_lag: u32,
    arriving: Option<String>,
    dispatches: u32,
    confirms: Vec<String>,
}

type Shared = Arc<Mutex<State>>;

struct FakeSurface {
    probes: Selectors,
    state: Shared,
}

impl FakeSurface {
    fn new(state: Shared) -> Self {
        Self {
            probes: Selectors::default(),
            state,
        }
    }

    fn in_group(group: &[String], selector: &str) -> bool {
        group.iter().any(|s| s == selector)
    }

    fn dispatch(state: &mut State) {
        state.dispatches += 1;
        if let Some(reply) = state.pending_replies.pop_front() {
            if state.arrival_lag > 0 {
                state.arriving = Some(reply);
            } else {
                state.turns.push(reply);
            }
        }
    }

    fn settle_arrival(state: &mut State) {
        if state.arriving.is_some() {
            if state.arrival_lag > 0 {
                state.arrival_lag -= 1;
            } else if let Some(reply) = state.arriving.take() {
                state.turns.push(reply);
            }
        }
    }
}

#[async_trait]
impl ChatSurface for FakeSurface {
    async fn goto(&self, _url: &str) -> paperchat::error::Result<()> {
        Ok(())
    }

    async fn count(&self, selector: &str) -> usize {
        let mut state = self.state.lock().unwrap();
        if selector == self.probes.assistant_turns {
            Self::settle_arrival(&mut state);
            return state.turns.len();
        }
        let present = if Self::in_group(&self.probes.editors, selector) {
            state.editor_visible
        } else if Self::in_group(&self.probes.send_buttons, selector) {
            state.send_present
        } else if Self::in_group(&self.probes.file_inputs, selector) {
            state.file_input
        } else if Self::in_group(&self.probes.attach_buttons, selector) {
            state.attach_button
        } else if Self::in_group(&self.probes.upload_busy, selector) {
            state.uploading
        } else if Self::in_group(&self.probes.stop_generating, selector) {
            state.generating
        } else if Self::in_group(&self.probes.challenge_frames, selector) {
            state.challenge
        } else {
            false
        };
        usize::from(present)
    }

    async fn is_visible(&self, selector: &str) -> bool {
        self.count(selector).await > 0
    }

    async fn click_first(&self, selector: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if Self::in_group(&self.probes.send_buttons, selector) {
            if state.send_click_ok {
                Self::dispatch(&mut state);
                return true;
            }
            return false;
        }
        if Self::in_group(&self.probes.attach_buttons, selector) {
            if state.attach_click_reveals_input {
                state.file_input = true;
                return true;
            }
            return false;
        }
        false
    }

    async fn attr_first(&self, _selector: &str, _name: &str) -> Option<String> {
        // Controls in these tests are never attribute-disabled.
        None
    }

    async fn text_at(&self, selector: &str, index: usize) -> Option<String> {
        let state = self.state.lock().unwrap();
        if selector == self.probes.assistant_turns {
            return state.turns.get(index).cloned();
        }
        None
    }

    async fn body_contains(&self, phrase: &str) -> bool {
        self.state.lock().unwrap().body.contains(phrase)
    }

    async fn button_with_text(&self, _phrase: &str) -> bool {
        false
    }

    async fn click_button_with_text(&self, _phrase: &str) -> bool {
        false
    }

    async fn focus_first(&self, selector: &str) -> bool {
        self.count(selector).await > 0
    }

    async fn clear_editor(&self, selector: &str) -> bool {
        self.count(selector).await > 0
    }

    async fn insert_text(&self, selector: &str, _chunk: &str) -> bool {
        self.count(selector).await > 0
    }

    async fn set_files(&self, _selector: &str, file: &Path) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.file_input || !state.set_files_ok {
            return false;
        }
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        state.body.push_str(&filename);
        true
    }

    async fn attach_via_chooser(&self, _trigger: &str, file: &Path) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.chooser_ok {
            return false;
        }
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        state.body.push_str(&filename);
        true
    }

    async fn close(&self) {}
}

/// Records every handoff and applies one queued mutation per confirmation.
struct ScriptedOperator {
    state: Shared,
    #[allow(clippy::type_complexity)]
    actions: Mutex<VecDeque<Box<dyn FnOnce(&mut State) + Send>>>,
}

impl ScriptedOperator {
    fn passive(state: Shared) -> Self {
        Self {
            state,
            actions: Mutex::new(VecDeque::new()),
        }
    }

    fn with_action(state: Shared, action: impl FnOnce(&mut State) + Send + 'static) -> Self {
        let operator = Self::passive(state);
        operator.actions.lock().unwrap().push_back(Box::new(action));
        operator
    }
}

#[async_trait]
impl OperatorPort for ScriptedOperator {
    async fn confirm(&self, instructions: &str) {
        let action = self.actions.lock().unwrap().pop_front();
        let mut state = self.state.lock().unwrap();
        state.confirms.push(instructions.to_string());
        if let Some(action) = action {
            action(&mut state);
        }
    }
}

fn fast_timeouts() -> Timeouts {
    Timeouts {
        upload_soft: Duration::from_millis(20),
        upload_hard: Duration::from_millis(80),
        upload_poll: Duration::from_millis(2),
        send_enabled_max: Duration::from_millis(200),
        send_poll: Duration::from_millis(2),
        dispatch_confirm: Duration::from_millis(100),
        dispatch_poll: Duration::from_millis(2),
        reply_complete: Duration::from_millis(500),
        reply_poll: Duration::from_millis(2),
        stability_rounds: 2,
        turn_fetch: Duration::from_millis(300),
        turn_poll: Duration::from_millis(2),
        chunk_pause: Duration::from_millis(1),
    }
}

fn protocol_over(state: Shared, operator: ScriptedOperator) -> ChatProtocol {
    ChatProtocol::new(
        Arc::new(FakeSurface::new(Arc::clone(&state))),
        Arc::new(operator),
        Selectors::default(),
        fast_timeouts(),
    )
}

fn ready_state() -> Shared {
    Arc::new(Mutex::new(State {
        editor_visible: true,
        send_present: true,
        send_click_ok: true,
        ..State::default()
    }))
}

fn valid_reply() -> String {
    r#"Here is the summary.
```json
{
  "title": "Effects of X on Y",
  "main_objectives": "Measure the effect of X.",
  "research_questions": "Does X change Y?",
  "study_type": "experimental",
  "methodology": "Randomized trial with 40 participants.",
  "main_findings": "X raised Y significantly.",
  "conclusions": "X matters for Y.",
  "limitations": "Single site."
}
```"#
        .to_string()
}

// ---------- readiness ----------

#[tokio::test]
async fn readiness_resumes_after_operator_fixes_the_page() {
    let state = Arc::new(Mutex::new(State {
        challenge: true,
        ..State::default()
    }));
    let operator = ScriptedOperator::with_action(Arc::clone(&state), |s| {
        s.challenge = false;
        s.editor_visible = true;
    });
    let protocol = protocol_over(Arc::clone(&state), operator);

    protocol.ensure_ready().await;

    let state = state.lock().unwrap();
    assert_eq!(state.confirms.len(), 1);
    assert!(state.confirms[0].contains("editor must be visible"));
}

// ---------- attachment ----------

#[tokio::test]
async fn direct_input_attach_completes_without_handoff() {
    let state = ready_state();
    {
        let mut s = state.lock().unwrap();
        s.file_input = true;
        s.set_files_ok = true;
    }
    let operator = ScriptedOperator::passive(Arc::clone(&state));
    let protocol = protocol_over(Arc::clone(&state), operator);

    protocol
        .attach(Path::new("/docs/paper-01.pdf"))
        .await
        .unwrap();

    let state = state.lock().unwrap();
    assert!(state.confirms.is_empty());
    assert!(state.body.contains("paper-01.pdf"));
}

#[tokio::test]
async fn attach_affordance_click_reveals_the_file_input() {
    let state = ready_state();
    {
        let mut s = state.lock().unwrap();
        // No file input until the attach affordance is clicked.
        s.set_files_ok = true;
        s.attach_button = true;
        s.attach_click_reveals_input = true;
    }
    let operator = ScriptedOperator::passive(Arc::clone(&state));
    let protocol = protocol_over(Arc::clone(&state), operator);

    protocol
        .attach(Path::new("/docs/paper-02.pdf"))
        .await
        .unwrap();

    let state = state.lock().unwrap();
    assert!(state.confirms.is_empty());
    assert!(state.body.contains("paper-02.pdf"));
}

#[tokio::test]
async fn chooser_interception_attaches_when_inputs_stay_hidden() {
    let state = ready_state();
    {
        let mut s = state.lock().unwrap();
        // Attach affordance exists but its click never exposes an input;
        // only the native chooser route works.
        s.attach_button = true;
        s.chooser_ok = true;
    }
    let operator = ScriptedOperator::passive(Arc::clone(&state));
    let protocol = protocol_over(Arc::clone(&state), operator);

    protocol
        .attach(Path::new("/docs/paper-03.pdf"))
        .await
        .unwrap();

    let state = state.lock().unwrap();
    assert!(state.confirms.is_empty());
    assert!(state.body.contains("paper-03.pdf"));
}

#[tokio::test]
async fn stuck_upload_hits_the_hard_timeout() {
    let state = ready_state();
    {
        let mut s = state.lock().unwrap();
        s.file_input = true;
        s.set_files_ok = true;
        s.uploading = true;
    }
    let operator = ScriptedOperator::passive(Arc::clone(&state));
    let protocol = protocol_over(Arc::clone(&state), operator);

    let err = protocol
        .attach(Path::new("/docs/paper-01.pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UploadTimeout(_)));
    // The soft timeout escalated at least once before the hard cut.
    assert!(!state.lock().unwrap().confirms.is_empty());
}

// ---------- submission ----------

#[tokio::test]
async fn unclickable_send_control_is_a_typed_error() {
    let state = ready_state();
    state.lock().unwrap().send_click_ok = false;
    let operator = ScriptedOperator::passive(Arc::clone(&state));
    let protocol = protocol_over(Arc::clone(&state), operator);

    let err = protocol.submit("prompt").await.unwrap_err();
    assert!(matches!(err, Error::NoSubmitControl));
}

#[tokio::test]
async fn submit_captures_the_pre_send_watermark() {
    let state = ready_state();
    {
        let mut s = state.lock().unwrap();
        s.turns.push("an earlier reply".into());
        s.pending_replies.push_back("the new reply".into());
    }
    let operator = ScriptedOperator::passive(Arc::clone(&state));
    let protocol = protocol_over(Arc::clone(&state), operator);

    let watermark = protocol.submit("prompt").await.unwrap();
    assert_eq!(watermark, 1);
}

#[tokio::test]
async fn manual_send_watermark_predates_a_fast_reply() {
    let state = Arc::new(Mutex::new(State {
        editor_visible: true,
        // No send control: the gate must expire into a manual handoff.
        send_present: false,
        ..State::default()
    }));
    // The operator sends manually and the reply lands before control returns.
    let operator = ScriptedOperator::with_action(Arc::clone(&state), |s| {
        s.turns.push("manual reply".into());
    });
    let protocol = protocol_over(Arc::clone(&state), operator);

    let watermark = protocol.submit("prompt").await.unwrap();
    assert_eq!(watermark, 0);

    let reply = protocol.await_reply(watermark).await;
    assert_eq!(reply, "manual reply");
}

// ---------- response retrieval ----------

#[tokio::test]
async fn stale_turn_is_never_returned_for_a_new_index() {
    let state = ready_state();
    {
        let mut s = state.lock().unwrap();
        s.turns.push("STALE OLD REPLY".into());
        s.pending_replies.push_back("fresh reply text".into());
        // The new turn only materializes after several count polls.
        s.arrival_lag = 4;
    }
    let operator = ScriptedOperator::passive(Arc::clone(&state));
    let protocol = protocol_over(Arc::clone(&state), operator);

    let watermark = protocol.submit("prompt").await.unwrap();
    let reply = protocol.await_reply(watermark).await;

    assert_eq!(reply, "fresh reply text");
}

// ---------- full exchanges ----------

async fn run_exchange(state: Shared, fix_attempts: u32) -> paperchat::error::Result<paperchat::summary::ArticleSummary> {
    let prompts_dir = tempfile::tempdir().unwrap();
    let debug_dir = tempfile::tempdir().unwrap();
    let prompts = PromptLibrary::load(prompts_dir.path(), PromptVariant::Zeroshot).unwrap();
    let debug = DebugSink::new(debug_dir.path().to_path_buf(), false);
    let operator = ScriptedOperator::passive(Arc::clone(&state));
    let protocol = protocol_over(Arc::clone(&state), operator);

    let exchange = SummaryExchange {
        protocol: &protocol,
        prompts: &prompts,
        debug: &debug,
        fix_attempts,
    };
    exchange
        .run(ExchangeRequest {
            stem: "paper-01",
            article_text: "Full article text.",
            file: None,
        })
        .await
}

#[tokio::test]
async fn fenced_reply_yields_a_validated_summary() {
    let state = ready_state();
    state.lock().unwrap().pending_replies.push_back(valid_reply());

    let summary = run_exchange(Arc::clone(&state), 2).await.unwrap();

    assert_eq!(summary.title, "Effects of X on Y");
    assert_eq!(summary.study_type, "experimental");
    assert_eq!(summary.rationale, None);
    assert_eq!(state.lock().unwrap().dispatches, 1);
}

#[tokio::test]
async fn corrective_prompt_recovers_an_unparseable_reply() {
    let state = ready_state();
    {
        let mut s = state.lock().unwrap();
        s.pending_replies.push_back("I could not find a PDF, sorry.".into());
        s.pending_replies.push_back(valid_reply());
    }

    let summary = run_exchange(Arc::clone(&state), 2).await.unwrap();

    assert_eq!(summary.title, "Effects of X on Y");
    assert_eq!(state.lock().unwrap().dispatches, 2);
}

#[tokio::test]
async fn corrective_budget_exhaustion_is_terminal() {
    let state = ready_state();
    {
        let mut s = state.lock().unwrap();
        for _ in 0..3 {
            s.pending_replies.push_back("still just prose, no data".into());
        }
    }

    let err = run_exchange(Arc::clone(&state), 2).await.unwrap_err();

    assert!(matches!(err, Error::Extraction { attempts: 3 }));
    assert_eq!(state.lock().unwrap().dispatches, 3);
}

#[tokio::test]
async fn persistent_schema_violation_is_reported_as_such() {
    let incomplete = r#"```json
{"title": "T", "study_type": "review"}
```"#;
    let state = ready_state();
    {
        let mut s = state.lock().unwrap();
        for _ in 0..2 {
            s.pending_replies.push_back(incomplete.to_string());
        }
    }

    let err = run_exchange(Arc::clone(&state), 1).await.unwrap_err();

    match err {
        Error::Schema { detail, attempts } => {
            assert_eq!(attempts, 2);
            assert!(detail.contains("missing"));
            assert!(detail.contains("methodology"));
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[tokio::test]
async fn schema_failure_then_valid_reply_succeeds() {
    let incomplete = r#"```json
{"title": "T"}
```"#;
    let state = ready_state();
    {
        let mut s = state.lock().unwrap();
        s.pending_replies.push_back(incomplete.to_string());
        s.pending_replies.push_back(valid_reply());
    }

    let summary = run_exchange(Arc::clone(&state), 2).await.unwrap();
    assert_eq!(summary.limitations, "Single site.");
}
