//! Category rotation for schedule building
//!
//! This module implements the cyclic category rotation that ensures:
//! - Every configured category gets its turn, in the configured order
//! - The position only moves after a slot was actually filled for it
//! - Categories with temporarily empty inventory are retried, not skipped

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{SchedulerError, SchedulerResult};
use crate::models::{Asset, ContentType, DurationCategory};

// ============================================================================
// Rotation Category
// ============================================================================

/// A token in the rotation order
///
/// General tokens match assets by duration category; content-specific tokens
/// match by content type and fall back to a general parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationCategory {
    /// Station IDs (< 16s)
    Id,
    /// Spots (< 2 min)
    Spots,
    /// Short-form programming (< 20 min)
    ShortForm,
    /// Long-form programming
    LongForm,
    /// News packages
    Pkg,
    /// Public service announcements
    Psa,
    /// Promos
    Promo,
    /// Meeting coverage
    Mtg,
}

impl RotationCategory {
    /// Get all categories
    pub fn all() -> Vec<Self> {
        vec![
            Self::Id,
            Self::Spots,
            Self::ShortForm,
            Self::LongForm,
            Self::Pkg,
            Self::Psa,
            Self::Promo,
            Self::Mtg,
        ]
    }

    /// Get configuration token
    pub fn id(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Spots => "spots",
            Self::ShortForm => "short_form",
            Self::LongForm => "long_form",
            Self::Pkg => "pkg",
            Self::Psa => "psa",
            Self::Promo => "promo",
            Self::Mtg => "mtg",
        }
    }

    /// Parse from a configuration token
    pub fn from_id(id: &str) -> SchedulerResult<Self> {
        match id.trim().to_lowercase().as_str() {
            "id" | "ids" => Ok(Self::Id),
            "spots" | "spot" => Ok(Self::Spots),
            "short_form" | "short-form" | "shortform" => Ok(Self::ShortForm),
            "long_form" | "long-form" | "longform" => Ok(Self::LongForm),
            "pkg" | "package" => Ok(Self::Pkg),
            "psa" => Ok(Self::Psa),
            "promo" => Ok(Self::Promo),
            "mtg" | "meeting" => Ok(Self::Mtg),
            _ => Err(SchedulerError::invalid_category(id)),
        }
    }

    /// General category to retry when this one has no usable candidate
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Pkg => Some(Self::ShortForm),
            Self::Psa | Self::Promo => Some(Self::Spots),
            Self::Mtg => Some(Self::LongForm),
            Self::Id | Self::Spots | Self::ShortForm | Self::LongForm => None,
        }
    }

    /// Duration category for general tokens
    pub fn duration_category(&self) -> Option<DurationCategory> {
        match self {
            Self::Id => Some(DurationCategory::Id),
            Self::Spots => Some(DurationCategory::Spots),
            Self::ShortForm => Some(DurationCategory::ShortForm),
            Self::LongForm => Some(DurationCategory::LongForm),
            _ => None,
        }
    }

    /// Content type for content-specific tokens
    pub fn content_type(&self) -> Option<ContentType> {
        match self {
            Self::Pkg => Some(ContentType::Package),
            Self::Psa => Some(ContentType::Psa),
            Self::Promo => Some(ContentType::Promo),
            Self::Mtg => Some(ContentType::Meeting),
            _ => None,
        }
    }

    /// Check whether an asset belongs to this category
    pub fn matches(&self, asset: &Asset) -> bool {
        match (self.duration_category(), self.content_type()) {
            (Some(duration), _) => asset.duration_category() == duration,
            (None, Some(content_type)) => asset.content_type == content_type,
            (None, None) => false,
        }
    }
}

impl fmt::Display for RotationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for RotationCategory {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s)
    }
}

// ============================================================================
// Rotation State
// ============================================================================

/// Position in the rotation order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    /// Current index into the order (before wrapping)
    pub index: usize,

    /// Total advances over the lifetime of this state; never decreases
    pub advanced: u64,
}

// ============================================================================
// Rotation State Machine
// ============================================================================

/// Tracks where a schedule-building run is in the category cycle
///
/// `peek` is pure and must be called before every placement attempt;
/// `advance` is only called once a slot was filled for the peeked category.
/// The order is passed in at call time so a configuration reload takes effect
/// on the next peek.
#[derive(Debug, Clone, Default)]
pub struct RotationStateMachine {
    state: RotationState,
}

impl RotationStateMachine {
    /// Create a state machine at index 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a previously saved state
    pub fn from_state(state: RotationState) -> Self {
        Self { state }
    }

    /// Category the next placement should fill
    pub fn peek(&self, order: &[RotationCategory]) -> SchedulerResult<RotationCategory> {
        if order.is_empty() {
            return Err(SchedulerError::EmptyRotation);
        }
        Ok(order[self.state.index % order.len()])
    }

    /// Move to the next category after a successful placement
    pub fn advance(&mut self, order: &[RotationCategory]) {
        let len = order.len().max(1);
        self.state.index = (self.state.index % len + 1) % len;
        self.state.advanced += 1;
    }

    /// Return to the start of the order for a new run
    pub fn reset(&mut self) {
        self.state.index = 0;
    }

    /// Current position
    pub fn position(&self) -> RotationState {
        self.state
    }

    /// Format the order with the current position marked
    pub fn format_position(&self, order: &[RotationCategory]) -> String {
        if order.is_empty() {
            return String::from("(empty rotation)");
        }
        let current = self.state.index % order.len();
        order
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == current {
                    format!("[{c}]")
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Vec<RotationCategory> {
        use RotationCategory::*;
        vec![Id, Spots, Pkg, ShortForm, Pkg, LongForm]
    }

    #[test]
    fn test_category_from_id() {
        assert_eq!(RotationCategory::from_id("pkg").unwrap(), RotationCategory::Pkg);
        assert_eq!(
            RotationCategory::from_id("Short-Form").unwrap(),
            RotationCategory::ShortForm
        );
        assert!(RotationCategory::from_id("weather").is_err());
    }

    #[test]
    fn test_category_parent() {
        assert_eq!(RotationCategory::Pkg.parent(), Some(RotationCategory::ShortForm));
        assert_eq!(RotationCategory::Psa.parent(), Some(RotationCategory::Spots));
        assert_eq!(RotationCategory::Mtg.parent(), Some(RotationCategory::LongForm));
        assert_eq!(RotationCategory::LongForm.parent(), None);
    }

    #[test]
    fn test_category_matches() {
        let pkg = Asset::new("a", ContentType::Package, 240);
        assert!(RotationCategory::Pkg.matches(&pkg));
        assert!(RotationCategory::ShortForm.matches(&pkg));
        assert!(!RotationCategory::LongForm.matches(&pkg));
        assert!(!RotationCategory::Psa.matches(&pkg));
    }

    #[test]
    fn test_peek_is_pure() {
        let machine = RotationStateMachine::new();
        let order = order();
        assert_eq!(machine.peek(&order).unwrap(), RotationCategory::Id);
        assert_eq!(machine.peek(&order).unwrap(), RotationCategory::Id);
        assert_eq!(machine.position().advanced, 0);
    }

    #[test]
    fn test_advance_wraps() {
        let mut machine = RotationStateMachine::new();
        let order = order();

        let visited: Vec<_> = (0..7)
            .map(|_| {
                let c = machine.peek(&order).unwrap();
                machine.advance(&order);
                c
            })
            .collect();

        assert_eq!(&visited[..6], order.as_slice());
        assert_eq!(visited[6], RotationCategory::Id);
        assert_eq!(machine.position().advanced, 7);
    }

    #[test]
    fn test_reset_keeps_marker() {
        let mut machine = RotationStateMachine::new();
        let order = order();
        machine.advance(&order);
        machine.advance(&order);
        machine.reset();

        assert_eq!(machine.peek(&order).unwrap(), RotationCategory::Id);
        assert_eq!(machine.position().advanced, 2);
    }

    #[test]
    fn test_shrunken_order_wraps() {
        let mut machine = RotationStateMachine::new();
        let long = order();
        for _ in 0..5 {
            machine.advance(&long);
        }
        let short = vec![RotationCategory::Spots, RotationCategory::ShortForm];
        assert_eq!(machine.peek(&short).unwrap(), RotationCategory::ShortForm);
    }

    #[test]
    fn test_empty_order() {
        let machine = RotationStateMachine::new();
        assert!(matches!(machine.peek(&[]), Err(SchedulerError::EmptyRotation)));
    }

    #[test]
    fn test_format_position() {
        let mut machine = RotationStateMachine::new();
        let order = order();
        machine.advance(&order);
        let formatted = machine.format_position(&order);
        assert!(formatted.starts_with("id → [spots]"));
    }
}
