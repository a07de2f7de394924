use serde::{Deserialize, Serialize};

use crate::models::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetLevel {
    pub price: f64,
    pub pips: f64,
}

/// A confirmed trade setup. Built once per successful multi-timeframe
/// confirmation, immutable afterwards; the next evaluation supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub stop_pips: f64,
    pub targets: [TargetLevel; 3],
}
