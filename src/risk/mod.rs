//! Risk Scorer - Frame-level risk from detections
//!
//! ## Responsibilities
//! - Map one frame's detections to a numeric score and a discrete level
//! - Decide which frames warrant an alert broadcast
//!
//! Deterministic and order-independent over the detection list. The
//! breakpoints (30/60) are relied on by downstream alert consumers and
//! must not move.

use crate::models::Detection;
use serde::{Deserialize, Serialize};

/// Score added when any label contains "fire"
const FIRE_WEIGHT: u32 = 40;
/// Score added when any label contains "smoke"
const SMOKE_WEIGHT: u32 = 20;
/// Score added per "NO-*" PPE violation label
const VIOLATION_WEIGHT: u32 = 10;

/// Discrete severity derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Normal,
    Warning,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= 60 {
            RiskLevel::Critical
        } else if score >= 30 {
            RiskLevel::High
        } else if score > 0 {
            RiskLevel::Warning
        } else {
            RiskLevel::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Normal => "Normal",
            RiskLevel::Warning => "Warning",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived per-frame risk value; recomputed every frame, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
}

impl RiskAssessment {
    /// Alert broadcasts are emitted for High and Critical frames only
    pub fn is_alert(&self) -> bool {
        matches!(self.level, RiskLevel::High | RiskLevel::Critical)
    }
}

/// Score one frame's detections.
///
/// +40 if any label contains "fire", +20 if any contains "smoke",
/// +10 per label starting with "no-" (uncapped). Case-insensitive.
pub fn assess(detections: &[Detection]) -> RiskAssessment {
    let mut score = 0u32;

    let lowered: Vec<String> = detections
        .iter()
        .map(|d| d.label.to_ascii_lowercase())
        .collect();

    if lowered.iter().any(|l| l.contains("fire")) {
        score += FIRE_WEIGHT;
    }
    if lowered.iter().any(|l| l.contains("smoke")) {
        score += SMOKE_WEIGHT;
    }
    score += VIOLATION_WEIGHT * lowered.iter().filter(|l| l.starts_with("no-")).count() as u32;

    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, conf: f32) -> Detection {
        Detection::new(label, conf, [0.0, 0.0, 10.0, 10.0])
    }

    #[test]
    fn empty_detections_are_normal() {
        let r = assess(&[]);
        assert_eq!(r.score, 0);
        assert_eq!(r.level, RiskLevel::Normal);
        assert!(!r.is_alert());
    }

    #[test]
    fn single_fire_is_high() {
        let r = assess(&[det("fire", 0.9)]);
        assert_eq!(r.score, 40);
        assert_eq!(r.level, RiskLevel::High);
        assert!(r.is_alert());
    }

    #[test]
    fn two_ppe_violations_are_warning() {
        let r = assess(&[det("NO-helmet", 0.5), det("NO-vest", 0.6)]);
        assert_eq!(r.score, 20);
        assert_eq!(r.level, RiskLevel::Warning);
        assert!(!r.is_alert());
    }

    #[test]
    fn fire_and_smoke_are_critical() {
        let r = assess(&[det("fire", 0.8), det("smoke", 0.7)]);
        assert_eq!(r.score, 60);
        assert_eq!(r.level, RiskLevel::Critical);
    }

    #[test]
    fn fire_weight_counts_once() {
        let one = assess(&[det("fire", 0.9)]);
        let three = assess(&[det("fire", 0.9), det("Fire", 0.8), det("FIRE", 0.7)]);
        assert_eq!(one.score, three.score);
    }

    #[test]
    fn violation_weight_is_uncapped() {
        let dets: Vec<Detection> = (0..7).map(|i| det("NO-helmet", 0.3 + i as f32 * 0.05)).collect();
        let r = assess(&dets);
        assert_eq!(r.score, 70);
        assert_eq!(r.level, RiskLevel::Critical);
    }

    #[test]
    fn score_is_permutation_invariant() {
        let mut dets = vec![
            det("fire", 0.9),
            det("smoke", 0.6),
            det("NO-helmet", 0.5),
            det("Hardhat", 0.8),
        ];
        let forward = assess(&dets);
        dets.reverse();
        let backward = assess(&dets);
        assert_eq!(forward, backward);
    }

    #[test]
    fn levels_follow_breakpoints() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Normal);
        assert_eq!(RiskLevel::from_score(10), RiskLevel::Warning);
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Warning);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(59), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(200), RiskLevel::Critical);
    }

    #[test]
    fn case_insensitive_matching() {
        let r = assess(&[det("Fire-extinguisher", 0.9)]);
        assert_eq!(r.score, 40);
        let r = assess(&[det("no-Mask", 0.4)]);
        assert_eq!(r.score, 10);
    }

    #[test]
    fn level_serializes_as_plain_string() {
        let r = assess(&[det("fire", 0.9)]);
        let v = serde_json::to_value(r).unwrap();
        assert_eq!(v["level"], "High");
        assert_eq!(v["score"], 40);
    }
}
