use crate::client::{SubmissionOutcome, WaitlistClient};
use crate::domain::matches_permissive_shape;

/// How many ticks a success toast stays on screen before dismissing itself.
pub const TOAST_TICKS: u8 = 3;

const IDLE_LABEL: &str = "Join the Waitlist";
const BUSY_LABEL: &str = "Joining...";
const FALLBACK_ERROR: &str = "An unexpected error occurred. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Transient confirmation; dismissed automatically after `remaining`
    /// ticks.
    Toast { text: String, remaining: u8 },
    /// Persistent message; stays until replaced by the next submission.
    Inline { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    InputChanged(String),
    SubmitPressed,
    RequestSettled(SubmissionOutcome),
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormCommand {
    /// Issue the request for this (already trimmed) email.
    Submit(String),
}

/// The signup form, as one explicit state object: field value, in-flight
/// flag, current feedback. Created once and fed events; at most one
/// submission is ever in flight.
#[derive(Debug, Default)]
pub struct SubscribeForm {
    input: String,
    submitting: bool,
    feedback: Option<Feedback>,
}

impl SubscribeForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn label(&self) -> &'static str {
        if self.submitting { BUSY_LABEL } else { IDLE_LABEL }
    }

    /// Re-evaluated on every input change: the submit control is live only
    /// while the trimmed value looks like an email and nothing is in
    /// flight. A usability gate, not a security boundary; the endpoint
    /// validates on its own.
    pub fn submit_enabled(&self) -> bool {
        !self.submitting && matches_permissive_shape(self.input.trim())
    }

    pub fn handle(&mut self, event: FormEvent) -> Option<FormCommand> {
        match event {
            FormEvent::InputChanged(value) => {
                self.input = value;
                None
            }
            FormEvent::SubmitPressed => {
                // The shape check runs again here, whatever the UI believed
                // when the press happened.
                if !self.submit_enabled() {
                    return None;
                }
                self.submitting = true;
                self.feedback = None;
                Some(FormCommand::Submit(self.input.trim().to_owned()))
            }
            FormEvent::RequestSettled(outcome) => {
                self.settle(outcome);
                None
            }
            FormEvent::Tick => {
                if let Some(Feedback::Toast { remaining, .. }) = &mut self.feedback {
                    *remaining -= 1;
                    if *remaining == 0 {
                        self.feedback = None;
                    }
                }
                None
            }
        }
    }

    fn settle(&mut self, outcome: SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Accepted { message } => {
                self.input.clear();
                self.feedback = Some(Feedback::Toast {
                    text: message,
                    remaining: TOAST_TICKS,
                });
            }
            SubmissionOutcome::AlreadyRegistered { message }
            | SubmissionOutcome::Rejected { message }
            | SubmissionOutcome::Failed { message } => {
                self.feedback = Some(Feedback::Inline { text: message });
            }
        }
        // Single exit point: whatever came back, the form is usable again.
        self.submitting = false;
    }
}

/// The submit handler: asks the form for a command, runs the request, and
/// settles the form with the outcome. A transport error is logged and
/// settled as a generic failure, so the form is restored on every path.
pub async fn handle_submit(form: &mut SubscribeForm, client: &WaitlistClient) {
    let Some(FormCommand::Submit(email)) = form.handle(FormEvent::SubmitPressed) else {
        return;
    };
    let outcome = match client.submit(&email).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Waitlist submission failed: {e}");
            SubmissionOutcome::Failed {
                message: FALLBACK_ERROR.into(),
            }
        }
    };
    form.handle(FormEvent::RequestSettled(outcome));
}
