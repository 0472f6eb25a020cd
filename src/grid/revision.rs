//! Deploy revisions

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token minted once per rollout attempt. Instances whose revision differs
/// from the current one are pruned after a successful rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeployRev(DateTime<Utc>);

impl DeployRev {
    /// Mint a revision strictly after every revision in `existing`.
    pub fn mint<'a, I>(existing: I) -> Self
    where
        I: IntoIterator<Item = &'a DeployRev>,
    {
        let now = Utc::now();
        match existing.into_iter().max() {
            Some(latest) if latest.0 >= now => DeployRev(latest.0 + Duration::nanoseconds(1)),
            _ => DeployRev(now),
        }
    }

    /// Revision at a fixed instant
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        DeployRev(timestamp)
    }

    /// Underlying timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for DeployRev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }
}
