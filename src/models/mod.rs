//! Domain models for the therapy tracking server.
//!
//! # Core Concepts
//!
//! - [`Therapist`]: the authenticated principal. Owns everything else;
//!   every store operation is scoped to one therapist.
//! - [`Patient`]: a person under a therapist's care.
//! - [`ActivityTemplate`]: a reusable activity label a therapist defines
//!   once and reuses across sessions.
//! - [`Session`]: one care encounter for a patient, open until explicitly
//!   closed. At most one open session per (patient, therapist) pair.
//! - [`SessionActivity`]: one recorded application of a template within a
//!   session, with a positive/negative response and optional notes.

mod activity;
mod patient;
mod session;
mod template;
mod therapist;

pub use activity::*;
pub use patient::*;
pub use session::*;
pub use template::*;
pub use therapist::*;
