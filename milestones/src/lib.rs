//! # Readmodel Milestones
//!
//! Tracks which onboarding milestones an instance has reached.
//!
//! A milestone is reached by the first qualifying event and keeps that date
//! forever. Events written by the platform itself (see [`SystemUsers`]) do
//! not count as a customer creating projects or applications, and clients the
//! platform provisions never satisfy "first authentication on an application".
//!
//! ```text
//! instance.added ─────────▶ InstanceCreated
//! project.added (user) ───▶ ProjectCreated
//! application.added (user) ▶ ApplicationCreated
//! user.token.added ───────▶ AuthenticationSucceededOnInstance
//!        └── user, client not ignored ─▶ AuthenticationSucceededOnApplication
//! instance.removed ───────▶ InstanceDeleted
//! ```

pub mod read_model;
pub mod snapshot;
pub mod system_users;
pub mod tracker;

pub use read_model::{MilestoneEvent, MilestonesReadModel};
pub use readmodel_events::milestone::MilestoneType;
pub use snapshot::{Milestone, MilestoneSnapshot};
pub use system_users::{SYSTEM_SENTINELS, SystemUsers};
pub use tracker::MilestoneTracker;
