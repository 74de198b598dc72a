//! Occupancy evidence carried by every node.
//!
//! The [`tree`](crate::tree::OcTree) never interprets the evidence itself,
//! it only goes through [`Occupancy`]. [`LogOddsNode`] is the default implementation.

use std::fmt;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// State of a node as seen by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Occupied,
    Free,
    /// Never observed.
    Unknown,
}

/// Which of the two result lists of the split queries a node belongs to.
///
/// See [`get_occupied_split`](crate::tree::OcTree::get_occupied_split).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    /// Evidence saturated, the state is settled.
    Binary,
    /// Evidence still probabilistic.
    Delta,
}

/// Implement to store your own evidence in a [`tree`](crate::tree::OcTree).
///
/// `Default` is the evidence of a node nobody observed yet,
/// `PartialEq` decides whether eight leaf siblings may be pruned into their parent.
pub trait Occupancy: Clone + Default + PartialEq {
    /// Integrate a measurement ending in this cell.
    fn integrate_hit(&mut self);

    /// Integrate a measurement passing through this cell.
    fn integrate_miss(&mut self);

    fn classify(&self) -> Classification;

    fn regime(&self) -> Regime;

    /// Recompute the summary of an inner node from its existing children.
    fn update_from_children<'a, I>(&mut self, children: I)
    where
        I: Iterator<Item = &'a Self>,
        Self: 'a;

    fn integrate(&mut self, occupied: bool) {
        if occupied {
            self.integrate_hit()
        } else {
            self.integrate_miss()
        }
    }

    fn is_occupied(&self) -> bool {
        self.classify() == Classification::Occupied
    }

    fn is_free(&self) -> bool {
        self.classify() == Classification::Free
    }

    fn is_unknown(&self) -> bool {
        self.classify() == Classification::Unknown
    }
}

/// Log-odds of a hit with probability `0.7`.
pub const LOG_ODDS_HIT: f32 = 0.847_298;
/// Log-odds of a miss with probability `0.4`.
pub const LOG_ODDS_MISS: f32 = -0.405_465;
/// Lower clamping bound, probability `≈ 0.1192`.
pub const LOG_ODDS_CLAMP_MIN: f32 = -2.0;
/// Upper clamping bound, probability `≈ 0.971`.
pub const LOG_ODDS_CLAMP_MAX: f32 = 3.5;
/// Occupancy threshold, probability `0.5`.
pub const LOG_ODDS_OCCUPIED: f32 = 0.0;

/// Converts a probability to log-odds.
pub fn logodds(probability: f32) -> f32 {
    (probability / (1.0 - probability)).ln()
}

/// Converts log-odds back to a probability.
pub fn probability(logodds: f32) -> f32 {
    1.0 - 1.0 / (1.0 + logodds.exp())
}

/// Clamped log-odds occupancy estimate.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct LogOddsNode {
    log_odds: f32,
    observed: bool,
}

impl LogOddsNode {
    pub fn from_log_odds(log_odds: f32) -> Self {
        LogOddsNode {
            log_odds: log_odds.clamp(LOG_ODDS_CLAMP_MIN, LOG_ODDS_CLAMP_MAX),
            observed: true,
        }
    }

    pub fn log_odds(&self) -> f32 {
        self.log_odds
    }

    pub fn occupancy(&self) -> f32 {
        probability(self.log_odds)
    }

    pub fn is_observed(&self) -> bool {
        self.observed
    }

    fn add_log_odds(&mut self, delta: f32) {
        self.log_odds = (self.log_odds + delta).clamp(LOG_ODDS_CLAMP_MIN, LOG_ODDS_CLAMP_MAX);
        self.observed = true;
    }
}

impl Occupancy for LogOddsNode {
    fn integrate_hit(&mut self) {
        self.add_log_odds(LOG_ODDS_HIT);
    }

    fn integrate_miss(&mut self) {
        self.add_log_odds(LOG_ODDS_MISS);
    }

    fn classify(&self) -> Classification {
        if !self.observed {
            Classification::Unknown
        } else if self.log_odds > LOG_ODDS_OCCUPIED {
            Classification::Occupied
        } else {
            Classification::Free
        }
    }

    fn regime(&self) -> Regime {
        if self.log_odds <= LOG_ODDS_CLAMP_MIN || self.log_odds >= LOG_ODDS_CLAMP_MAX {
            Regime::Binary
        } else {
            Regime::Delta
        }
    }

    /// Maximum of the observed children.
    fn update_from_children<'a, I>(&mut self, children: I)
    where
        I: Iterator<Item = &'a Self>,
        Self: 'a,
    {
        let max = children
            .filter(|child| child.observed)
            .map(|child| child.log_odds)
            .reduce(f32::max);

        *self = match max {
            Some(log_odds) => LogOddsNode {
                log_odds,
                observed: true,
            },
            None => LogOddsNode::default(),
        };
    }
}

impl fmt::Display for LogOddsNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.observed {
            write!(f, "LogOdds({:.3})", self.log_odds)
        } else {
            write!(f, "Unknown")
        }
    }
}
