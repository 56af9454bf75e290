//! Terminal widgets for showsync
//!
//! - [`render_confirmation`] - modal dialog for the prompt a
//!   `ConfirmationBroker` is presenting
//! - [`handle_confirmation_key`] - routes key presses to that prompt
//! - [`render_modal`] - dimmed overlay the dialog is drawn on
//!
//! # Example
//!
//! ```ignore
//! use showsync_components::{handle_confirmation_key, render_confirmation, DialogStyle};
//!
//! // In your render function, after everything else:
//! if let Some(prompt) = broker.current() {
//!     render_confirmation(frame, &prompt, &DialogStyle::default());
//! }
//!
//! // In your key handler, before anything else:
//! if handle_confirmation_key(&broker, &key) {
//!     return;
//! }
//! ```

mod confirm_dialog;
mod modal;

pub use confirm_dialog::{answer_for_key, handle_confirmation_key, render_confirmation, DialogStyle};
pub use modal::{centered_rect, dim_buffer, render_modal, ModalStyle};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        answer_for_key, centered_rect, handle_confirmation_key, render_confirmation, render_modal,
        DialogStyle, ModalStyle,
    };
}
