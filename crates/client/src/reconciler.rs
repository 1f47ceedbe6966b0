// Per-todo reconciliation of optimistic completion toggles.
//
// The reconciler is a plain state machine with no I/O. The controller
// drives it: `begin_toggle` when the user clicks, `resolve` when the
// mutation service answers, `apply_authoritative` when the change feed
// pushes a canonical value.

use donelist_common::error::MutationError;

/// Monotonically increasing tag attached to each toggle request.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    /// No request in flight; the displayed value is the confirmed value.
    Idle { confirmed: bool },
    /// A prediction is displayed while `generation` is outstanding.
    Pending { confirmed: bool, predicted: bool, generation: Generation },
}

/// Handed back by [`ToggleReconciler::begin_toggle`]; the caller must pass
/// `generation` back to `resolve` when the request settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleTicket {
    pub generation: Generation,
    pub predicted: bool,
}

/// What a settled response did to the displayed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The latest request succeeded. `overridden` is set when the service
    /// disagreed with the prediction and its value replaced it.
    Confirmed { completed: bool, overridden: bool },
    /// The latest request failed; the display went back to the confirmed value.
    Reverted { completed: bool, error: MutationError },
    /// The response belongs to a superseded request and was discarded.
    Stale,
}

impl Resolution {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}

#[derive(Debug, Clone)]
pub struct ToggleReconciler {
    state: ToggleState,
    last_issued: Generation,
}

impl ToggleReconciler {
    pub fn new(confirmed: bool) -> Self {
        Self { state: ToggleState::Idle { confirmed }, last_issued: 0 }
    }

    pub fn state(&self) -> ToggleState {
        self.state
    }

    /// Value shown to the user right now.
    pub fn displayed(&self) -> bool {
        match self.state {
            ToggleState::Idle { confirmed } => confirmed,
            ToggleState::Pending { predicted, .. } => predicted,
        }
    }

    /// Last value acknowledged by the mutation service.
    pub fn confirmed(&self) -> bool {
        match self.state {
            ToggleState::Idle { confirmed } | ToggleState::Pending { confirmed, .. } => confirmed,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, ToggleState::Pending { .. })
    }

    /// Generation currently allowed to settle, if any.
    pub fn in_flight(&self) -> Option<Generation> {
        match self.state {
            ToggleState::Idle { .. } => None,
            ToggleState::Pending { generation, .. } => Some(generation),
        }
    }

    /// Flip the displayed value and issue a new generation.
    ///
    /// A toggle while already pending supersedes the earlier request; its
    /// response will be reported as [`Resolution::Stale`].
    pub fn begin_toggle(&mut self) -> ToggleTicket {
        self.last_issued += 1;
        let generation = self.last_issued;
        let predicted = !self.displayed();
        self.state = ToggleState::Pending { confirmed: self.confirmed(), predicted, generation };
        ToggleTicket { generation, predicted }
    }

    /// Settle the request tagged `generation`.
    ///
    /// On success the service's value wins even when it disagrees with the
    /// prediction. On failure the display reverts to the confirmed value
    /// held before the request was made. Nothing is retried.
    pub fn resolve(
        &mut self,
        generation: Generation,
        outcome: Result<bool, MutationError>,
    ) -> Resolution {
        let ToggleState::Pending { confirmed, predicted, generation: current } = self.state else {
            return Resolution::Stale;
        };
        if generation != current {
            return Resolution::Stale;
        }

        match outcome {
            Ok(authoritative) => {
                self.state = ToggleState::Idle { confirmed: authoritative };
                Resolution::Confirmed { completed: authoritative, overridden: authoritative != predicted }
            }
            Err(error) => {
                self.state = ToggleState::Idle { confirmed };
                Resolution::Reverted { completed: confirmed, error }
            }
        }
    }

    /// Accept a value pushed by the service outside any request/response.
    ///
    /// The pushed value is canonical: it becomes the confirmed value, any
    /// prediction is dropped, and the in-flight generation (if any) turns
    /// stale. Returns true when the displayed value changed.
    pub fn apply_authoritative(&mut self, completed: bool) -> bool {
        let before = self.displayed();
        self.state = ToggleState::Idle { confirmed: completed };
        before != completed
    }
}
