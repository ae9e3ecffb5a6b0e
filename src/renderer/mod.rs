// Result Renderer - one simulation result into summary text, diagram, overlay and replay

pub mod animation;
pub mod canvas;
pub mod diagram;
pub mod overlay;
pub mod summary;

use serde::{Deserialize, Serialize};

/// Shown wherever a value is missing or not finite
pub const UNKNOWN: &str = "—";

pub const CRATER_COLOR: &str = "#d9534f";
pub const NEUTRAL_COLOR: &str = "#9ca3af";
pub const SHOCKWAVE_COLOR: &str = "#60a5fa";
pub const TEXT_COLOR: &str = "#e5e7eb";

/// Overpressure thresholds reported by the simulation, smallest radius first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Overpressure {
    Psi10,
    Psi5,
    Psi3,
    Psi1,
}

impl Overpressure {
    pub const ALL: [Overpressure; 4] = [
        Overpressure::Psi10,
        Overpressure::Psi5,
        Overpressure::Psi3,
        Overpressure::Psi1,
    ];

    pub fn psi(&self) -> u8 {
        match self {
            Overpressure::Psi10 => 10,
            Overpressure::Psi5 => 5,
            Overpressure::Psi3 => 3,
            Overpressure::Psi1 => 1,
        }
    }

    /// Key used in `rings_m`
    pub fn key(&self) -> &'static str {
        match self {
            Overpressure::Psi10 => "10psi",
            Overpressure::Psi5 => "5psi",
            Overpressure::Psi3 => "3psi",
            Overpressure::Psi1 => "1psi",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Overpressure::Psi10 => "10 psi",
            Overpressure::Psi5 => "5 psi",
            Overpressure::Psi3 => "3 psi",
            Overpressure::Psi1 => "1 psi",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Overpressure::Psi10 => "#f0ad4e",
            Overpressure::Psi5 => "#f7e463",
            Overpressure::Psi3 => "#5bc0de",
            Overpressure::Psi1 => "#5cb85c",
        }
    }

    pub fn from_psi(psi: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| (level.psi() as f64 - psi).abs() < 1e-9)
    }

    /// Accepts `10`, `"10"`, `"10psi"` and `"10 psi"`
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim().to_ascii_lowercase();
        let number = trimmed.trim_end_matches("psi").trim();
        number.parse::<f64>().ok().and_then(Self::from_psi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overpressure_parsing() {
        assert_eq!(Overpressure::parse("10psi"), Some(Overpressure::Psi10));
        assert_eq!(Overpressure::parse(" 5 PSI"), Some(Overpressure::Psi5));
        assert_eq!(Overpressure::parse("3"), Some(Overpressure::Psi3));
        assert_eq!(Overpressure::from_psi(1.0), Some(Overpressure::Psi1));
        assert_eq!(Overpressure::parse("7psi"), None);
        assert_eq!(Overpressure::parse("ring"), None);
    }
}
