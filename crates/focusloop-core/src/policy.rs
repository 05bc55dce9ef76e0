//! Adaptive session durations.
//!
//! Maps a base duration and the user's current signals (energy, mood) to a
//! clamped duration plus a short explanation suitable for display.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodState {
    Motivated,
    #[default]
    Neutral,
    Struggling,
    Hyperfocus,
}

impl std::str::FromStr for MoodState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "motivated" => Ok(MoodState::Motivated),
            "neutral" => Ok(MoodState::Neutral),
            "struggling" => Ok(MoodState::Struggling),
            "hyperfocus" => Ok(MoodState::Hyperfocus),
            other => Err(format!("unknown mood: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationMode {
    #[default]
    EnergyBased,
    MoodBased,
    /// Placeholder for a focus-quality signal; currently follows energy.
    FocusBased,
}

impl std::str::FromStr for AdaptationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "energy_based" | "energy" => Ok(AdaptationMode::EnergyBased),
            "mood_based" | "mood" => Ok(AdaptationMode::MoodBased),
            "focus_based" | "focus" => Ok(AdaptationMode::FocusBased),
            other => Err(format!("unknown adaptation mode: {other}")),
        }
    }
}

/// The user-state inputs to adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSignals {
    /// 1 (drained) ..= 5 (energized).
    pub energy_level: u8,
    pub mood: MoodState,
}

impl Default for UserSignals {
    fn default() -> Self {
        Self {
            energy_level: 3,
            mood: MoodState::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptedDuration {
    pub duration_secs: u64,
    pub reason: String,
}

fn energy_multiplier(energy_level: u8) -> (f64, &'static str) {
    match energy_level {
        1 | 2 => (0.6, "Low energy"),
        3 => (1.0, "Steady energy"),
        4 | 5 => (1.4, "High energy"),
        _ => (1.0, "Unknown energy level"),
    }
}

fn mood_multiplier(mood: MoodState) -> (f64, &'static str) {
    match mood {
        MoodState::Struggling => (0.5, "Struggling"),
        MoodState::Hyperfocus => (1.8, "Hyperfocus"),
        MoodState::Motivated => (1.2, "Motivated"),
        MoodState::Neutral => (1.0, "Neutral mood"),
    }
}

/// Adapt `base_secs` to the user's state and clamp to `[min_secs, max_secs]`.
///
/// Never fails: unknown signals use a multiplier of 1 and inverted bounds are
/// swapped.
pub fn adapt(
    base_secs: u64,
    signals: UserSignals,
    mode: AdaptationMode,
    min_secs: u64,
    max_secs: u64,
) -> AdaptedDuration {
    let (multiplier, cause) = match mode {
        AdaptationMode::EnergyBased | AdaptationMode::FocusBased => {
            energy_multiplier(signals.energy_level)
        }
        AdaptationMode::MoodBased => mood_multiplier(signals.mood),
    };

    let (lo, hi) = if min_secs <= max_secs {
        (min_secs, max_secs)
    } else {
        (max_secs, min_secs)
    };

    let scaled = (base_secs as f64 * multiplier).round().max(0.0) as u64;
    let clamped = scaled.clamp(lo, hi);

    let mut reason = if multiplier == 1.0 {
        format!("{cause}: keeping {}", fmt_minutes(scaled))
    } else if multiplier < 1.0 {
        format!("{cause}: shortened to {} (x{multiplier})", fmt_minutes(scaled))
    } else {
        format!("{cause}: extended to {} (x{multiplier})", fmt_minutes(scaled))
    };
    if clamped != scaled {
        let bound = if clamped == lo { "minimum" } else { "maximum" };
        reason.push_str(&format!(", clamped to {bound} of {}", fmt_minutes(clamped)));
    }

    AdaptedDuration {
        duration_secs: clamped,
        reason,
    }
}

fn fmt_minutes(secs: u64) -> String {
    if secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else {
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}
