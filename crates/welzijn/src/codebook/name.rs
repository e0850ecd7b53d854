//! The `W{wave}_{Name}{item}` variable naming convention.

use once_cell::sync::Lazy;
use regex::Regex;

static WAVE_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^W(\d+)_(.+?)(\d+)?$").expect("valid wave variable pattern"));

/// A variable name split into wave, stem and optional item index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableName {
    pub wave: u32,
    /// Digits in the wave number as written, so `W01_X` prints back as `W01_X`.
    wave_width: usize,
    /// Everything after the `W{wave}_` prefix, verbatim.
    pub concept: String,
    pub stem: String,
    pub item: Option<u32>,
}

impl VariableName {
    /// Parse a raw column name. Returns `None` for names outside the convention
    /// (e.g. `Nummer`, `W1`).
    pub fn parse(name: &str) -> Option<Self> {
        let caps = WAVE_VARIABLE.captures(name)?;
        let digits = caps.get(1)?.as_str();
        let wave = digits.parse().ok()?;
        let stem = caps.get(2)?.as_str();
        let concept = name[caps.get(2)?.start()..].to_string();
        let (stem, item) = match caps.get(3).map(|d| d.as_str().parse::<u32>()) {
            Some(Ok(item)) => (stem.to_string(), Some(item)),
            // Too many digits for an item index; keep them in the stem.
            Some(Err(_)) => (concept.clone(), None),
            None => (stem.to_string(), None),
        };
        Some(Self {
            wave,
            wave_width: digits.len(),
            concept,
            stem,
            item,
        })
    }

    /// The name without its wave prefix, e.g. `Corstress3` for `W2_Corstress3`.
    pub fn concept(&self) -> &str {
        &self.concept
    }
}

impl std::fmt::Display for VariableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "W{:0width$}_{}", self.wave, self.concept(), width = self.wave_width)
    }
}
