//! Ticket lifecycle: derived priority and the status state machine.

mod priority;
mod transitions;

pub use priority::{calculate_priority, Level};
pub use transitions::{
    available_transitions, calculate_available_transitions, is_privileged, validate_transition,
    AvailableTransitions, TicketStatus,
};
