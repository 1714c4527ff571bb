//! Component masses and the grid parameterizations that map onto them.

use serde::{Deserialize, Serialize};

/// A pair of component masses in solar masses.
///
/// `m1` is the primary. Every constructor in this crate keeps `m2 <= m1`
/// except `MassPair::new`, which stores what it is given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassPair {
    pub m1: f64,
    pub m2: f64,
}

impl MassPair {
    /// Create a pair as given, without reordering.
    pub fn new(m1: f64, m2: f64) -> Self {
        Self { m1, m2 }
    }

    /// Create a pair with the heavier mass first.
    pub fn ordered(a: f64, b: f64) -> Self {
        if a < b {
            Self { m1: b, m2: a }
        } else {
            Self { m1: a, m2: b }
        }
    }

    /// Total mass `m1 + m2`.
    pub fn total_mass(&self) -> f64 {
        self.m1 + self.m2
    }

    /// Mass ratio `m2 / m1`.
    pub fn ratio(&self) -> f64 {
        self.m2 / self.m1
    }

    /// Chirp mass `(m1 m2)^(3/5) / (m1 + m2)^(1/5)`.
    pub fn chirp_mass(&self) -> f64 {
        (self.m1 * self.m2).powf(0.6) / self.total_mass().powf(0.2)
    }

    /// Symmetric mass ratio `m1 m2 / M^2`.
    pub fn symmetric_ratio(&self) -> f64 {
        let total = self.total_mass();
        self.m1 * self.m2 / (total * total)
    }

    /// Both masses finite and strictly positive.
    pub fn is_physical(&self) -> bool {
        self.m1.is_finite() && self.m2.is_finite() && self.m1 > 0.0 && self.m2 > 0.0
    }
}

impl std::fmt::Display for MassPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.m1, self.m2)
    }
}

/// How the two rows of a parameter grid are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameterization {
    /// Rows are `m1` and `m2` directly.
    #[default]
    Individual,
    /// Rows are total mass `M` and mass ratio `r`.
    TotalRatio,
    /// Rows are chirp mass `Mc` and mass ratio `r`.
    ChirpRatio,
}

impl Parameterization {
    /// Tag used in generated template names.
    pub fn tag(&self) -> &'static str {
        match self {
            Parameterization::Individual => "mm",
            Parameterization::TotalRatio => "MR",
            Parameterization::ChirpRatio => "McR",
        }
    }

    /// Map one grid column onto component masses.
    ///
    /// Ratios above one are inverted first, so the returned pair always
    /// satisfies `m2 / m1 <= 1`.
    pub fn to_masses(&self, p1: f64, p2: f64) -> MassPair {
        match self {
            Parameterization::Individual => MassPair::ordered(p1, p2),
            Parameterization::TotalRatio => {
                let r = normalize_ratio(p2);
                let m1 = p1 / (r + 1.0);
                MassPair::new(m1, r * m1)
            }
            Parameterization::ChirpRatio => {
                let r = normalize_ratio(p2);
                let m2 = p1 * (r.powi(3) + r.powi(2)).powf(0.2);
                MassPair::new(m2 / r, m2)
            }
        }
    }

    /// Name fragment for one grid column, built from the raw parameters.
    ///
    /// Masses are rounded to integers; ratios are written as a zero-padded
    /// four digit value in thousandths. Halves round to even.
    pub fn name_part(&self, p1: f64, p2: f64) -> String {
        let first = p1.round_ties_even() as i64;
        match self {
            Parameterization::Individual => {
                format!("{}-{}", first, p2.round_ties_even() as i64)
            }
            _ => format!("{}-{:04}", first, (1000.0 * p2).round_ties_even() as i64),
        }
    }
}

impl std::fmt::Display for Parameterization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parameterization::Individual => write!(f, "individual"),
            Parameterization::TotalRatio => write!(f, "total_ratio"),
            Parameterization::ChirpRatio => write!(f, "chirp_ratio"),
        }
    }
}

fn normalize_ratio(r: f64) -> f64 {
    if r > 1.0 {
        1.0 / r
    } else {
        r
    }
}
