use std::collections::VecDeque;

use log::{debug, info, warn};
use stepfind::{Location, MapTrait, Metric, PathFinder, PathResult, Status};

/// An agent that walks to requested destinations. Searching is spread over ticks, one path
/// finder step per tick, and the found path is followed at a constant speed.
#[derive(Debug)]
pub struct Npc {
    position: (f32, f32),
    speed: f32,
    waypoints: VecDeque<Location>,
    pathfinder: PathFinder<Location>,
    start: Location,
    destination: Option<Location>,
}

impl Npc {
    pub fn new(start: Location, speed: f32, g_cost: Metric, h_cost: Metric) -> Self {
        Self {
            position: (start.x as f32, start.y as f32),
            speed,
            waypoints: VecDeque::new(),
            pathfinder: PathFinder::with_costs(g_cost.as_fn(), h_cost.as_fn()),
            start,
            destination: None,
        }
    }

    /// Request a path to `destination`, starting from where the last successful path ended.
    /// Rejected while a previous search is still running.
    pub fn set_destination(&mut self, destination: Location) -> bool {
        if self.pathfinder.status() == Status::Running {
            warn!("path finder is running, ignoring destination {}", destination);
            return false;
        }

        self.waypoints.clear();

        if let Err(e) = self.pathfinder.try_initialize(self.start, destination) {
            warn!("could not search for {}: {}", destination, e);
            return false;
        }
        debug!("searching path from {} to {}", self.start, destination);
        self.destination = Some(destination);
        true
    }

    /// Advance by one tick of `dt` seconds. Returns the outcome of the search if it finished
    /// during this tick.
    pub fn tick<M: MapTrait<Reference = Location>>(
        &mut self,
        map: &M,
        dt: f32,
    ) -> Option<Status> {
        let finished = self.search_step(map);
        self.advance(dt);
        finished
    }

    fn search_step<M: MapTrait<Reference = Location>>(&mut self, map: &M) -> Option<Status> {
        if self.pathfinder.status() != Status::Running {
            return None;
        }

        match self.pathfinder.step(map) {
            Status::Success => {
                if let Some(result) = PathResult::from_finder(&self.pathfinder) {
                    info!(
                        "path to {} found: {} waypoints, cost {}",
                        result.goal,
                        result.path.len(),
                        result.total_cost
                    );
                    self.waypoints.extend(result.path);
                    self.start = result.goal;
                }
                Some(Status::Success)
            }
            Status::Failure => {
                warn!(
                    "failed to find path to destination {}",
                    self.destination.unwrap_or(self.start)
                );
                Some(Status::Failure)
            }
            _ => None,
        }
    }

    fn advance(&mut self, dt: f32) {
        let mut budget = (self.speed * dt).max(0.0);
        while let Some(target) = self.waypoints.front().copied() {
            let (tx, ty) = (target.x as f32, target.y as f32);
            let (dx, dy) = (tx - self.position.0, ty - self.position.1);
            let distance = (dx * dx + dy * dy).sqrt();

            if distance <= budget {
                self.position = (tx, ty);
                budget -= distance;
                self.waypoints.pop_front();
            } else {
                let t = budget / distance;
                self.position = (self.position.0 + dx * t, self.position.1 + dy * t);
                break;
            }
        }
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    pub fn waypoints(&self) -> &VecDeque<Location> {
        &self.waypoints
    }

    /// No search running and nothing left to walk
    pub fn is_idle(&self) -> bool {
        self.pathfinder.status() != Status::Running && self.waypoints.is_empty()
    }

    pub fn start(&self) -> Location {
        self.start
    }

    pub fn pathfinder(&self) -> &PathFinder<Location> {
        &self.pathfinder
    }
}
