//! One conversation: history, slot-filling state and the per-turn policy.

use std::sync::Arc;

use medibook_backend::BookingBackend;
use medibook_core::config::MedibookConfig;
use medibook_core::{Location, Slot, TimeWindow};

use crate::decision::parse_decision;
use crate::executor::{ExecutorSettings, ToolExecutor};
use crate::extract::extract_entities;
use crate::llm::LanguageModel;
use crate::matcher::match_doctor;
use crate::nlu::NluClient;
use crate::prompt::SYSTEM_PROMPT;
use crate::selection::select_slot;
use crate::types::{
    ScheduleArgs, SearchArgs, SessionState, ToolCall, ToolResult, Turn, TurnContext, TurnReply,
    UserArgs,
};

/// Phrases that count as a go-ahead to book with what is already known.
const AFFIRMATIONS: &[&str] = &[
    "yes",
    "book",
    "schedule",
    "confirm",
    "proceed",
    "ok",
    "okay",
    "go ahead",
    "do it",
    "book the appointment",
];

/// Phrases where the user points out they already gave the details.
const ALREADY_GIVEN: &[&str] = &["i gave", "i told", "already told", "i said", "you have"];

/// Per-session policy knobs.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub executor: ExecutorSettings,
    /// User/assistant turns kept besides the system prompt; 0 keeps all.
    pub max_history_turns: usize,
    pub repeat_implicit_search: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&MedibookConfig::default())
    }
}

impl SessionSettings {
    pub fn from_config(config: &MedibookConfig) -> Self {
        Self {
            executor: ExecutorSettings::from_config(config),
            max_history_turns: config.dialogue.max_history_turns,
            repeat_implicit_search: config.dialogue.repeat_implicit_search,
        }
    }
}

/// A single booking conversation.
///
/// Turns must not interleave: callers hold the session exclusively for the
/// whole of [`process_message`](Self::process_message).
pub struct DialogueSession {
    history: Vec<Turn>,
    state: SessionState,
    executor: ToolExecutor,
    nlu: NluClient,
    llm: Arc<dyn LanguageModel>,
    settings: SessionSettings,
}

impl DialogueSession {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        backend: Arc<dyn BookingBackend>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            history: vec![Turn::system(SYSTEM_PROMPT)],
            state: SessionState::default(),
            executor: ToolExecutor::new(backend.clone(), settings.executor.clone()),
            nlu: NluClient::new(backend),
            llm,
            settings,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Drop all history and state. The backend probe is not repeated.
    pub fn reset(&mut self) {
        self.history = vec![Turn::system(SYSTEM_PROMPT)];
        self.state = SessionState::default();
        tracing::debug!("Dialogue session reset");
    }

    /// Run one user utterance through the session. Never fails: collaborator
    /// errors end up in the reply text, the tool result or `error`.
    pub async fn process_message(
        &mut self,
        message: &str,
        location: Option<Location>,
    ) -> TurnReply {
        let turn = self.absorb(message, location).await;
        let picked_slot = self.pick_slot(message);

        self.history.push(Turn::user(message));

        let raw = match self.llm.complete(&self.history).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(model = %self.llm.model(), error = %e, "Language model call failed");
                let reply = format!("Sorry, I encountered an error: {e}");
                self.record_reply(&reply);
                return TurnReply {
                    reply,
                    tool_result: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let decision = parse_decision(&raw);
        let mut reply = decision.reply;
        let mut tool_result = None;

        if let Some(call) = &decision.tool {
            let result = self.executor.execute(call, &mut self.state, &turn).await;
            reply = append_outcome(reply, &result);
            tool_result = Some(result);
        } else if self.booking_due(message, &turn, picked_slot.as_ref()) {
            tracing::debug!("Booking is due this turn, skipping implicit search");
        } else if let Some(specialty) = self.implicit_search(message, &turn) {
            tracing::info!(specialty = %specialty, "Running implicit doctor search");
            let call = ToolCall::SearchDoctors(SearchArgs {
                specialty: Some(specialty),
                ..SearchArgs::default()
            });
            let result = self.executor.execute(&call, &mut self.state, &turn).await;
            if let Some(summary) = result.summary() {
                reply = format!("{reply}\n\n{summary}");
            }
            tool_result = Some(result);
        }

        if tool_result.is_none() {
            if let Some((number, slot)) = picked_slot {
                if let Some(call) = self.slot_booking(&slot) {
                    tracing::info!(slot = number, "Booking the slot the user picked");
                    let result = self.executor.execute(&call, &mut self.state, &turn).await;
                    reply = match result.summary() {
                        Some(summary) => {
                            format!("Perfect! Booking slot {number} for you.\n\n{summary}")
                        }
                        None => append_outcome(reply, &result),
                    };
                    tool_result = Some(result);
                }
            }
        }

        if tool_result.is_none() && (affirms(message) || turn.extraction.email.is_some()) {
            if let Some(call) = self.full_booking() {
                tracing::info!("Booking with the details gathered so far");
                let result = self.executor.execute(&call, &mut self.state, &turn).await;
                reply = append_outcome(reply, &result);
                tool_result = Some(result);
            }
        }

        self.record_reply(&reply);
        TurnReply {
            reply,
            tool_result,
            error: None,
        }
    }

    /// Fold NLU and regex extraction into state, and match a named doctor.
    async fn absorb(&mut self, message: &str, location: Option<Location>) -> TurnContext {
        let nlu = self.nlu.parse(message).await;
        if let Some(nlu) = &nlu {
            if let Some(specialty) = nlu.entities.specialty.as_deref().filter(|s| !s.is_empty()) {
                self.state.specialty = Some(specialty.to_string());
            }
            if let Some(window) = nlu
                .entities
                .date_range
                .as_ref()
                .filter(|w| !w.start.trim().is_empty())
            {
                self.state.preferred_time = Some(window.clone());
            }
        }

        let extraction = extract_entities(message);
        if let Some(name) = &extraction.name {
            self.state.user_name = Some(name.clone());
        }
        if let Some(email) = &extraction.email {
            self.state.user_email = Some(email.clone());
        }
        if let Some(symptoms) = &extraction.symptoms {
            self.state.symptoms = Some(symptoms.clone());
        }
        if let Some(reason) = &extraction.reason {
            self.state.reason = Some(reason.clone());
        }

        let matched = self
            .state
            .search_results()
            .and_then(|doctors| match_doctor(message, doctors))
            .map(str::to_string);
        if let Some(doctor_id) = matched {
            let clear = self.settings.executor.clear_slots_on_doctor_change;
            if self.state.select_doctor(&doctor_id, clear) {
                tracing::info!(doctor_id = %doctor_id, "Doctor selected from utterance");
            }
        }

        TurnContext {
            nlu,
            extraction,
            location,
        }
    }

    /// Resolve a slot number in the utterance against the held slots and
    /// make that slot the preferred time.
    fn pick_slot(&mut self, message: &str) -> Option<(u32, Slot)> {
        let (number, slot) = self
            .state
            .slots()
            .and_then(|slots| select_slot(message, slots))
            .map(|(n, slot)| (n, slot.clone()))?;
        tracing::debug!(slot = number, "Slot selected from utterance");
        self.state.preferred_time = Some(TimeWindow::from(&slot));
        Some((number, slot))
    }

    /// Specialty to search for when the model asked for no tool, if a
    /// search should run at all.
    fn implicit_search(&self, message: &str, turn: &TurnContext) -> Option<String> {
        if turn.location.is_none() {
            return None;
        }
        let specialty = turn
            .nlu
            .as_ref()
            .filter(|nlu| nlu.is_search())
            .and_then(|_| turn.nlu_specialty())
            .or(self.state.specialty.as_deref())
            .filter(|s| !s.is_empty())?;

        if !self.settings.repeat_implicit_search
            && self.state.search_results().is_some()
            && !mentions_any(message, ALREADY_GIVEN)
        {
            return None;
        }
        Some(specialty.to_string())
    }

    /// Whether the slot pick or the full-details booking will fire this turn.
    fn booking_due(
        &self,
        message: &str,
        turn: &TurnContext,
        picked: Option<&(u32, Slot)>,
    ) -> bool {
        if picked.is_some_and(|(_, slot)| self.slot_booking(slot).is_some()) {
            return true;
        }
        (affirms(message) || turn.extraction.email.is_some()) && self.full_booking().is_some()
    }

    fn slot_booking(&self, slot: &Slot) -> Option<ToolCall> {
        self.state.slots()?;
        self.booking_call(&slot.start)
    }

    fn full_booking(&self) -> Option<ToolCall> {
        if !self.state.ready_to_book() {
            return None;
        }
        let start = self.state.preferred_time.as_ref()?.start.clone();
        self.booking_call(&start)
    }

    fn booking_call(&self, start: &str) -> Option<ToolCall> {
        let state = &self.state;
        Some(ToolCall::ScheduleAppointment(ScheduleArgs {
            doctor_id: Some(state.selected_doctor_id.clone()?),
            start_utc: Some(start.to_string()),
            user: Some(UserArgs {
                name: Some(state.user_name.clone()?),
                email: Some(state.user_email.clone()?),
            }),
            reason: state.reason.clone(),
            symptoms: state.symptoms.clone().map(|s| vec![s]),
            ..ScheduleArgs::default()
        }))
    }

    fn record_reply(&mut self, reply: &str) {
        self.history.push(Turn::assistant(reply));
        let max = self.settings.max_history_turns;
        if max > 0 && self.history.len() > max + 1 {
            let excess = self.history.len() - (max + 1);
            self.history.drain(1..=excess);
        }
    }
}

fn append_outcome(reply: String, result: &ToolResult) -> String {
    match (result.summary(), result.error()) {
        (Some(summary), _) => format!("{reply}\n\n{summary}"),
        (None, Some(error)) => format!("{reply}\n\nError: {error}"),
        (None, None) => reply,
    }
}

fn affirms(message: &str) -> bool {
    mentions_any(message, AFFIRMATIONS)
}

fn mentions_any(message: &str, phrases: &[&str]) -> bool {
    let lower = message.to_lowercase();
    phrases.iter().any(|phrase| lower.contains(phrase))
}
