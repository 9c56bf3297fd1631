//! Onboarding checklist — templates, per-user state, the status builder and
//! step reconciliation.
//!
//! A user's status message is the welcome template addressed to them,
//! overlaid with the last message the bot sent them. Tracked events run that
//! message through the [`Reconciler`], which checks each step's completion
//! flag in the store, records the step the event completes, and sends (or
//! edits) the message.

pub mod builder;
pub mod model;
pub mod reconciler;
pub mod service;
pub mod state;
pub mod templates;

pub use builder::build_status;
pub use model::{OnboardingMessage, Step};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use service::{CommandKind, OnboardingService, SATELLITE_COMMAND};
pub use state::{MessageCache, UserLocks};
pub use templates::Templates;
