//! Rollout coordination for grid services
//!
//! [`GridServiceDeployer`] places every container of one service, replacing
//! same-named containers in place and pruning earlier revisions once all
//! ordinals run. [`ServiceLocks`] keeps concurrent rollouts of the same
//! service from interleaving.

pub mod image;
pub mod lock;
pub mod rollout;

pub use lock::{ServiceLockGuard, ServiceLocks};
pub use rollout::{DeployOutcome, GridServiceDeployer};
