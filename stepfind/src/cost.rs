use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::find::Location;

/// A cost between two locations, used both for the step (G) and the heuristic (H) cost
pub type CostFn = Box<dyn Fn(Location, Location) -> f32>;

// differences are taken in i64, any two i32 coordinates fit
fn deltas(a: Location, b: Location) -> (i64, i64) {
    (
        (a.x as i64 - b.x as i64).abs(),
        (a.y as i64 - b.y as i64).abs(),
    )
}

pub fn manhattan(a: Location, b: Location) -> f32 {
    let (dx, dy) = deltas(a, b);
    (dx + dy) as f32
}

pub fn euclidean(a: Location, b: Location) -> f32 {
    let (dx, dy) = deltas(a, b);
    (dx as f64).hypot(dy as f64) as f32
}

pub fn chebyshev(a: Location, b: Location) -> f32 {
    let (dx, dy) = deltas(a, b);
    dx.max(dy) as f32
}

/// Named cost functions, so that configuration files can pick them
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Manhattan,
    Euclidean,
    Chebyshev,
}

impl Metric {
    pub fn cost(&self, a: Location, b: Location) -> f32 {
        match self {
            Metric::Manhattan => manhattan(a, b),
            Metric::Euclidean => euclidean(a, b),
            Metric::Chebyshev => chebyshev(a, b),
        }
    }

    pub fn as_fn(self) -> fn(Location, Location) -> f32 {
        match self {
            Metric::Manhattan => manhattan,
            Metric::Euclidean => euclidean,
            Metric::Chebyshev => chebyshev,
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Metric::Manhattan => "manhattan",
                Metric::Euclidean => "euclidean",
                Metric::Chebyshev => "chebyshev",
            }
        )
    }
}

impl FromStr for Metric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manhattan" => Ok(Metric::Manhattan),
            "euclidean" => Ok(Metric::Euclidean),
            "chebyshev" => Ok(Metric::Chebyshev),
            _ => Err(anyhow::anyhow!("Invalid metric: {}", s)),
        }
    }
}
