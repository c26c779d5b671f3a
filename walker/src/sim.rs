use std::{collections::VecDeque, fmt::Display};

use log::{debug, info, warn};
use stepfind::{GridMap, Location, Status};

use crate::{npc::Npc, scenario::Scenario};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Report {
    pub ticks: usize,
    pub reached: Vec<Location>,
    pub unreachable: Vec<Location>,
    pub position: (f32, f32),
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ticks: {}", self.ticks)?;
        for location in &self.reached {
            writeln!(f, "reached {}", location)?;
        }
        for location in &self.unreachable {
            writeln!(f, "unreachable {}", location)?;
        }
        write!(f, "final position: ({:.2}, {:.2})", self.position.0, self.position.1)
    }
}

/// Drives one agent over a map, one tick at a time
pub struct Simulation {
    map: GridMap,
    npc: Npc,
    pending: VecDeque<Location>,
    toggles: Vec<(usize, Location)>,
    dt: f32,
    max_ticks: usize,
    tick: usize,
    report: Report,
}

impl Simulation {
    pub fn new(scenario: Scenario) -> Result<Self, anyhow::Error> {
        let map = scenario.build_map()?;
        if !map.is_valid(scenario.start) {
            return Err(anyhow::anyhow!(
                "start {} is outside of the map",
                scenario.start
            ));
        }
        if let Some(destination) = scenario.destinations.iter().find(|d| !map.is_valid(**d)) {
            return Err(anyhow::anyhow!(
                "destination {} is outside of the map",
                destination
            ));
        }
        if !(scenario.speed > 0.0 && scenario.dt > 0.0) {
            return Err(anyhow::anyhow!(
                "speed ({}) and dt ({}) must be positive",
                scenario.speed,
                scenario.dt
            ));
        }

        let npc = Npc::new(
            scenario.start,
            scenario.speed,
            scenario.g_cost,
            scenario.h_cost,
        );

        Ok(Self {
            map,
            npc,
            pending: scenario.destinations.into_iter().collect(),
            toggles: scenario
                .toggles
                .into_iter()
                .map(|t| (t.tick, t.location))
                .collect(),
            dt: scenario.dt,
            max_ticks: scenario.max_ticks,
            tick: 0,
            report: Report::default(),
        })
    }

    /// Nothing left to do: all destinations were requested and the agent is idle
    pub fn is_done(&self) -> bool {
        self.pending.is_empty() && self.npc.is_idle()
    }

    pub fn tick(&mut self) {
        // map edits happen between search steps and are seen by the next one
        for (_, location) in self.toggles.iter().filter(|(tick, _)| *tick == self.tick) {
            if let Some(walkable) = self.map.toggle_walkable(*location) {
                info!(
                    "tick {}: {} is now {}",
                    self.tick,
                    location,
                    if walkable { "walkable" } else { "blocked" }
                );
            }
        }

        if self.npc.is_idle() {
            if let Some(destination) = self.pending.pop_front() {
                if !self.npc.set_destination(destination) {
                    self.report.unreachable.push(destination);
                }
            }
        }

        match self.npc.tick(&self.map, self.dt) {
            Some(Status::Success) => {
                if let Some(goal) = self.npc.pathfinder().destination() {
                    self.report.reached.push(goal);
                }
            }
            Some(Status::Failure) => {
                if let Some(goal) = self.npc.pathfinder().destination() {
                    self.report.unreachable.push(goal);
                }
            }
            _ => {}
        }

        self.tick += 1;
    }

    pub fn run(&mut self) -> Report {
        while !self.is_done() {
            if self.tick >= self.max_ticks {
                warn!("stopping after {} ticks", self.tick);
                break;
            }
            self.tick();
        }
        debug!("simulation ended after {} ticks", self.tick);

        self.report.ticks = self.tick;
        self.report.position = self.npc.position();
        self.report.clone()
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn npc(&self) -> &Npc {
        &self.npc
    }
}
