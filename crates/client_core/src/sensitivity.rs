//! The `eps` slider: a bounded, stepped value with a human label.

use std::fmt;

/// Slider positions are stored as twentieths so every step is exact
/// (0.10 = 2/20, 0.40 = 8/20).
const STEPS_PER_UNIT: f64 = 20.0;
const MIN_STEP: u8 = 2;
const MAX_STEP: u8 = 8;
const DEFAULT_STEP: u8 = 5;

pub const MIN_EPS: f64 = MIN_STEP as f64 / STEPS_PER_UNIT;
pub const MAX_EPS: f64 = MAX_STEP as f64 / STEPS_PER_UNIT;
pub const EPS_STEP: f64 = 1.0 / STEPS_PER_UNIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitivityLabel {
    VeryStrict,
    Strict,
    Balanced,
    Loose,
    VeryLoose,
}

impl SensitivityLabel {
    /// Thresholds are inclusive upper bounds: <=0.15, <=0.20, <=0.25, <=0.30.
    pub fn for_eps(eps: f64) -> Self {
        if eps <= 0.15 {
            SensitivityLabel::VeryStrict
        } else if eps <= 0.20 {
            SensitivityLabel::Strict
        } else if eps <= 0.25 {
            SensitivityLabel::Balanced
        } else if eps <= 0.30 {
            SensitivityLabel::Loose
        } else {
            SensitivityLabel::VeryLoose
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensitivityLabel::VeryStrict => "Very Strict",
            SensitivityLabel::Strict => "Strict",
            SensitivityLabel::Balanced => "Balanced",
            SensitivityLabel::Loose => "Loose",
            SensitivityLabel::VeryLoose => "Very Loose",
        }
    }
}

impl fmt::Display for SensitivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitivityLevel {
    step: u8,
}

impl SensitivityLevel {
    /// Clamps into [0.10, 0.40] and snaps to the nearest 0.05 step.
    pub fn new(eps: f64) -> Self {
        if !eps.is_finite() {
            return Self::default();
        }
        let step = (eps * STEPS_PER_UNIT)
            .round()
            .clamp(f64::from(MIN_STEP), f64::from(MAX_STEP)) as u8;
        Self { step }
    }

    pub fn eps(self) -> f64 {
        f64::from(self.step) / STEPS_PER_UNIT
    }

    pub fn label(self) -> SensitivityLabel {
        SensitivityLabel::for_eps(self.eps())
    }
}

impl Default for SensitivityLevel {
    fn default() -> Self {
        Self { step: DEFAULT_STEP }
    }
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.eps())
    }
}
