use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stepfind::{load_map, GridMap, Location, Metric};

/// Flip the walkability of a cell once the given tick is reached
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Toggle {
    pub tick: usize,
    pub location: Location,
}

/// Everything needed to run a simulation, read from a json file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old files
pub struct Scenario {
    /// Text rows of the map, used when `map_path` is not set
    pub map: Vec<String>,
    pub map_path: Option<PathBuf>,
    pub start: Location,
    /// Requested one after another, each once the agent is idle again
    pub destinations: Vec<Location>,
    pub toggles: Vec<Toggle>,
    pub g_cost: Metric,
    pub h_cost: Metric,
    /// Cells per second
    pub speed: f32,
    /// Seconds per tick
    pub dt: f32,
    pub max_ticks: usize,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            map: [
                "..........",
                ".####.....",
                "....#.###.",
                "....#...#.",
                "..###.#.#.",
                "......#.#.",
                ".######.#.",
                "........#.",
                ".########.",
                "..........",
            ]
            .iter()
            .map(|row| row.to_string())
            .collect(),
            map_path: None,
            start: Location::new(0, 0),
            destinations: vec![Location::new(7, 5), Location::new(9, 9), Location::new(0, 0)],
            toggles: vec![Toggle {
                tick: 120,
                location: Location::new(9, 4),
            }],
            g_cost: Metric::Euclidean,
            h_cost: Metric::Manhattan,
            speed: 4.0,
            dt: 1.0 / 60.0,
            max_ticks: 10_000,
        }
    }
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read scenario {}", path.display()))?;
        let scenario = serde_json::from_str(&text)
            .with_context(|| format!("invalid scenario {}", path.display()))?;
        Ok(scenario)
    }

    pub fn build_map(&self) -> Result<GridMap, anyhow::Error> {
        match &self.map_path {
            Some(path) => load_map(path),
            None => self.map.join("\n").parse(),
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_default_map_is_valid() {
        let scenario = Scenario::default();
        let map = scenario.build_map().unwrap();
        assert_eq!(map.columns, 10);
        assert_eq!(map.rows, 10);
        assert!(map.is_walkable(scenario.start));
        for destination in &scenario.destinations {
            assert!(map.is_walkable(*destination));
        }
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "map": ["...", "..."],
                "destinations": [{"x": 2, "y": 1}],
                "h_cost": "chebyshev"
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.destinations, vec![Location::new(2, 1)]);
        assert_eq!(scenario.h_cost, Metric::Chebyshev);
        assert_eq!(scenario.g_cost, Metric::Euclidean);
        assert_eq!(scenario.max_ticks, Scenario::default().max_ticks);
        assert_eq!(scenario.build_map().unwrap().columns, 3);
    }

    #[test]
    fn test_load_errors() {
        assert!(Scenario::load("does/not/exist.json").is_err());
        assert!(serde_json::from_str::<Scenario>(r#"{"g_cost": "taxicab"}"#).is_err());
    }
}
