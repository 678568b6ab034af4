// src/dag/mod.rs

//! Dependency gating.
//!
//! Every task has zero or one predecessor. A queued task may run once its
//! predecessor completed; nothing else is tracked.
//!
//! - [`eligibility`] holds the pure per-task rule.
//! - [`scheduler`] applies it to every queued task on each tick.
//! - [`scheduler_step`] defines what one tick found.

pub mod eligibility;
pub mod scheduler;
pub mod scheduler_step;

pub use eligibility::{Eligibility, eligibility};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
