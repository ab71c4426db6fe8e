use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace for content-derived plan identifiers.
const PLAN_NAMESPACE: Uuid = Uuid::from_u128(0x6a1c_9f3e_0b7d_4e2a_9c51_d3f8_27be_04a6);

/// Identifier of a command plan, derived from the plan's program and argv.
///
/// Building the same descriptor twice yields the same id.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(Uuid);

impl PlanId {
    #[must_use]
    pub fn from_content(content: &[u8]) -> Self {
        Self(Uuid::new_v5(&PLAN_NAMESPACE, content))
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Create a new unique batch ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
