//! # Readmodel Quota
//!
//! Decides which usage notifications of a quota are due.
//!
//! Each notification fires at most once per threshold per period. Usage is
//! measured in whole percent of the quota amount and may overshoot 100 %;
//! a repeating notification at 80 % fires at 80, 180, 280, ... and skips
//! thresholds usage jumped over.
//!
//! | percent | repeat | used | due at |
//! |---------|--------|------|--------|
//! | 80      | no     | 90   | 80     |
//! | 80      | yes    | 190  | 180    |
//! | 100     | yes    | 210  | 200    |

pub mod config;
pub mod error;
pub mod notifications;
pub mod read_model;

pub use config::{Notification, Quota};
pub use error::{QuotaConfigError, Result};
pub use notifications::{DueNotification, QuotaNotifications, evaluate};
pub use read_model::{NotificationsReadModel, QuotaEvent};
pub use readmodel_events::quota::QuotaUnit;
