//! Asynchronous confirmation prompts
//!
//! Any task can ask the user a yes/no question with
//! [`ConfirmationBroker::show_confirmation`] and await the answer without
//! blocking the UI loop. The UI loop watches
//! [`subscribe`](ConfirmationBroker::subscribe) to know what to draw, and calls
//! [`answer`](ConfirmationBroker::answer) when the user picks a button.
//!
//! Each request gets its own queue slot and result channel. Prompts are shown
//! one at a time in request order; a second request made while a prompt is
//! showing waits its turn.
//!
//! # Example
//!
//! ```ignore
//! let broker = ConfirmationBroker::new();
//!
//! // From an async handler
//! let confirmed = broker
//!     .show_confirmation(
//!         ConfirmationContent::new("Delete cue", "Do you really want to delete cue 3.0?")
//!             .confirm_text("Delete")
//!             .destructive(),
//!     )
//!     .await;
//!
//! // From the UI loop, on Enter
//! broker.answer(true);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::{oneshot, watch};
use tracing::{debug, trace};

pub const DEFAULT_CONFIRM_TEXT: &str = "Confirm";
pub const DEFAULT_CANCEL_TEXT: &str = "Cancel";

/// Visual weight of the confirm button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfirmStyle {
    #[default]
    Default,
    /// The action cannot be undone
    Destructive,
}

/// What a prompt says.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationContent {
    pub title: String,
    pub message: String,
    pub cancel_text: Option<String>,
    pub confirm_text: Option<String>,
    pub confirm_style: ConfirmStyle,
}

impl ConfirmationContent {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            cancel_text: None,
            confirm_text: None,
            confirm_style: ConfirmStyle::Default,
        }
    }

    pub fn confirm_text(mut self, text: impl Into<String>) -> Self {
        self.confirm_text = Some(text.into());
        self
    }

    pub fn cancel_text(mut self, text: impl Into<String>) -> Self {
        self.cancel_text = Some(text.into());
        self
    }

    pub fn destructive(mut self) -> Self {
        self.confirm_style = ConfirmStyle::Destructive;
        self
    }

    /// Confirm button label, falling back to [`DEFAULT_CONFIRM_TEXT`].
    pub fn confirm_label(&self) -> &str {
        self.confirm_text.as_deref().unwrap_or(DEFAULT_CONFIRM_TEXT)
    }

    /// Cancel button label, falling back to [`DEFAULT_CANCEL_TEXT`].
    pub fn cancel_label(&self) -> &str {
        self.cancel_text.as_deref().unwrap_or(DEFAULT_CANCEL_TEXT)
    }
}

/// Identifies one confirmation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromptId(u64);

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prompt-{}", self.0)
    }
}

/// The prompt currently on screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub id: PromptId,
    pub content: ConfirmationContent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrokerPhase {
    Idle,
    Presenting(PromptId),
}

struct Pending {
    prompt: Prompt,
    responder: oneshot::Sender<bool>,
}

#[derive(Default)]
struct Queue {
    next_id: u64,
    pending: VecDeque<Pending>,
}

/// Serializes confirmation requests from any number of call sites.
///
/// Cheap to clone; clones share the queue.
#[derive(Clone)]
pub struct ConfirmationBroker {
    queue: Arc<Mutex<Queue>>,
    presented: Arc<watch::Sender<Option<Prompt>>>,
}

impl Default for ConfirmationBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationBroker {
    pub fn new() -> Self {
        let (presented, _) = watch::channel(None);
        Self {
            queue: Arc::new(Mutex::new(Queue::default())),
            presented: Arc::new(presented),
        }
    }

    /// Queue a prompt and return the future of its answer.
    ///
    /// The future resolves to `true` on confirm and `false` on cancel or
    /// dismissal. It also resolves to `false` if every broker handle is
    /// dropped before the prompt is answered.
    pub fn show_confirmation(&self, content: ConfirmationContent) -> Confirmation {
        let (responder, receiver) = oneshot::channel();

        let mut queue = self.lock();
        queue.next_id += 1;
        let id = PromptId(queue.next_id);
        queue.pending.push_back(Pending {
            prompt: Prompt { id, content },
            responder,
        });
        debug!(prompt = %id, queued = queue.pending.len(), "Confirmation requested");
        self.present_front(&mut queue);

        Confirmation { id, receiver }
    }

    /// Answer the prompt on screen and move on to the next one.
    ///
    /// Returns the id of the answered prompt, or `None` when idle.
    pub fn answer(&self, confirmed: bool) -> Option<PromptId> {
        let mut queue = self.lock();
        let answered = queue.pending.pop_front()?;
        let id = answered.prompt.id;

        if answered.responder.send(confirmed).is_err() {
            trace!(prompt = %id, "Answered prompt had no waiting caller");
        }
        debug!(prompt = %id, confirmed, "Confirmation answered");

        self.present_front(&mut queue);
        Some(id)
    }

    pub fn confirm(&self) -> Option<PromptId> {
        self.answer(true)
    }

    pub fn cancel(&self) -> Option<PromptId> {
        self.answer(false)
    }

    /// Close the prompt without choosing. Counts as cancel.
    pub fn dismiss(&self) -> Option<PromptId> {
        self.answer(false)
    }

    pub fn phase(&self) -> BrokerPhase {
        match self.presented.borrow().as_ref() {
            Some(prompt) => BrokerPhase::Presenting(prompt.id),
            None => BrokerPhase::Idle,
        }
    }

    /// The prompt on screen, if any.
    pub fn current(&self) -> Option<Prompt> {
        self.presented.borrow().clone()
    }

    /// Receiver notified each time the prompt on screen changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Prompt>> {
        self.presented.subscribe()
    }

    /// Requests not yet answered, including the one on screen.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn present_front(&self, queue: &mut Queue) {
        // Callers that gave up never get their prompt shown
        while queue
            .pending
            .front()
            .is_some_and(|pending| pending.responder.is_closed())
        {
            if let Some(abandoned) = queue.pending.pop_front() {
                trace!(prompt = %abandoned.prompt.id, "Skipping abandoned confirmation");
            }
        }

        let next = queue.pending.front().map(|pending| pending.prompt.clone());
        self.presented.send_if_modified(|current| {
            let changed = current.as_ref().map(|p| p.id) != next.as_ref().map(|p| p.id);
            if changed {
                *current = next;
            }
            changed
        });
    }
}

impl fmt::Debug for ConfirmationBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationBroker")
            .field("phase", &self.phase())
            .field("pending", &self.pending())
            .finish()
    }
}

/// The answer to one confirmation request.
#[must_use = "a confirmation does nothing unless awaited"]
#[derive(Debug)]
pub struct Confirmation {
    id: PromptId,
    receiver: oneshot::Receiver<bool>,
}

impl Confirmation {
    pub fn id(&self) -> PromptId {
        self.id
    }
}

impl Future for Confirmation {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|answer| answer.unwrap_or(false))
    }
}
