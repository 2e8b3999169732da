//! PiP toggle state machine — arm, then apply PiP to the next video clicked.
//!
//! ```text
//! Idle  --command-->                 Armed   (capture listener attached)
//! Armed --command-->                 Idle    (capture listener removed)
//! Armed --click on capable target--> Idle    (mode toggled, listener removed)
//! Armed --click elsewhere-->         Armed   (click passes through)
//! ```
//!
//! Attaching and detaching the document capture-phase listener are the
//! only side effects of a transition. The armed state owns the listener
//! handle, so "armed without a listener" cannot be represented.

use crate::dom::{Document, PresentationMode, toggle_presentation};
use crate::page::{ClickEvent, Handler, ListenerId, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipState {
    Idle,
    Armed { interceptor: ListenerId },
}

#[derive(Debug)]
pub struct PipToggle {
    state: PipState,
}

impl PipToggle {
    pub fn new() -> Self {
        Self {
            state: PipState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PipState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, PipState::Armed { .. })
    }

    /// Inbound "toggle PiP" command: arm if idle, disarm if armed.
    pub fn on_command<D: Document>(&mut self, page: &mut Page<D>) -> PipState {
        self.state = match self.state {
            PipState::Idle => {
                let interceptor = page.add_capture_click_listener(Handler::PipInterceptor);
                tracing::info!("armed: next click on a video switches its presentation mode");
                PipState::Armed { interceptor }
            }
            PipState::Armed { interceptor } => {
                page.remove_listener(interceptor);
                tracing::info!("disarmed by command");
                PipState::Idle
            }
        };
        self.state
    }

    /// Capture-phase click while armed.
    ///
    /// Targets without the presentation-mode capability pass through
    /// untouched and the machine stays armed. A capable target has its
    /// mode switched, the click's default is prevented, and the machine
    /// disarms. Returns the new mode when a switch happened.
    pub fn on_click<D: Document>(
        &mut self,
        page: &mut Page<D>,
        event: &mut ClickEvent,
    ) -> Option<PresentationMode> {
        if !self.is_armed() {
            return None;
        }

        let target = event.target();
        if page.document().presentation_mode(target).is_none() {
            tracing::debug!(?target, "click target lacks PiP capability, passing through");
            return None;
        }

        event.prevent_default();
        let mode = toggle_presentation(page.document_mut(), target);
        self.disarm(page);
        if let Some(mode) = mode {
            tracing::info!(?target, mode = mode.as_str(), "presentation mode switched by click");
        }
        mode
    }

    /// Return to idle, detaching the interceptor if one is attached.
    pub fn disarm<D: Document>(&mut self, page: &mut Page<D>) {
        if let PipState::Armed { interceptor } = self.state {
            page.remove_listener(interceptor);
            tracing::debug!("disarmed");
        }
        self.state = PipState::Idle;
    }
}

impl Default for PipToggle {
    fn default() -> Self {
        Self::new()
    }
}
