use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    str::FromStr,
};

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::cost::CostFn;

/// A 2D integer coordinate. Two map nodes are the same node when their locations are equal.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl FromStr for Location {
    type Err = anyhow::Error;

    /// Parses `x,y` (surrounding parentheses and whitespace are ignored)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let (x, y) = trimmed
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("Invalid location: {}", s))?;
        Ok(Location {
            x: x.trim().parse()?,
            y: y.trim().parse()?,
        })
    }
}

/// Anything the path finder can search over. Must be copy and not a reference (hence 'static),
/// identity is decided by [`Locatable::location`] alone.
pub trait Locatable: Copy + 'static {
    fn location(&self) -> Location;
}

impl Locatable for Location {
    fn location(&self) -> Location {
        *self
    }
}

pub trait MapTrait {
    /// The type that can be used to reference nodes in the map
    type Reference: Locatable;

    /// Return an iterator over the currently traversable neighbors of the provided node.
    /// Called again on every expansion, nothing is cached by the path finder.
    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference>;
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    NotInitialized,
    Running,
    Success,
    Failure,
}

impl Status {
    pub fn is_done(&self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Status::NotInitialized => "not initialized",
                Status::Running => "running",
                Status::Success => "success",
                Status::Failure => "failure",
            }
        )
    }
}

/// Reasons for [`PathFinder::try_initialize`] to refuse a new search
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InitError {
    MissingGCost,
    MissingHCost,
    Busy,
}

impl Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::MissingGCost => write!(f, "no step (G) cost function set"),
            InitError::MissingHCost => write!(f, "no heuristic (H) cost function set"),
            InitError::Busy => write!(f, "a search is already running"),
        }
    }
}

impl std::error::Error for InitError {}

/// Stable handle of a [`SearchNode`] inside the path finder arena
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum List {
    Open,
    Closed,
}

/// One node of the search tree that is built while searching.
#[derive(Clone, Debug)]
pub struct SearchNode<R> {
    location: R,
    g: f32,
    h: f32,
    f: f32,
    parent: Option<NodeId>,
    list: List,
}

impl<R: Locatable> SearchNode<R> {
    fn new(location: R, parent: Option<NodeId>, g: f32, h: f32) -> Self {
        let mut node = Self {
            location,
            g,
            h,
            f: 0.0,
            parent,
            list: List::Open,
        };
        node.set_g(g);
        node
    }

    fn set_g(&mut self, g: f32) {
        self.g = g;
        self.f = self.g + self.h;
    }

    pub fn location(&self) -> R {
        self.location
    }

    /// Accumulated cost from the start along the best known path
    pub fn g(&self) -> f32 {
        self.g
    }

    /// Heuristic estimate to the destination, fixed when the node is created
    pub fn h(&self) -> f32 {
        self.h
    }

    pub fn f(&self) -> f32 {
        self.f
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Incremental A* search. Each call to [`PathFinder::step`] expands a single node so that the
/// caller decides how much work happens per tick.
pub struct PathFinder<R: Locatable> {
    g_cost: Option<CostFn>,
    h_cost: Option<CostFn>,
    start: Option<R>,
    destination: Option<R>,
    status: Status,
    nodes: Vec<SearchNode<R>>,
    index: HashMap<Location, NodeId>,
    open: Vec<NodeId>,
    closed: Vec<NodeId>,
    current: Option<NodeId>,
}

impl<R: Locatable> Default for PathFinder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Locatable + Debug> Debug for PathFinder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathFinder")
            .field("g_cost", &self.g_cost.is_some())
            .field("h_cost", &self.h_cost.is_some())
            .field("start", &self.start)
            .field("destination", &self.destination)
            .field("status", &self.status)
            .field("open", &self.open.len())
            .field("closed", &self.closed.len())
            .field("current", &self.current)
            .finish()
    }
}

impl<R: Locatable> PathFinder<R> {
    pub fn new() -> Self {
        Self {
            g_cost: None,
            h_cost: None,
            start: None,
            destination: None,
            status: Status::NotInitialized,
            nodes: Vec::new(),
            index: HashMap::new(),
            open: Vec::new(),
            closed: Vec::new(),
            current: None,
        }
    }

    pub fn with_costs(
        g_cost: impl Fn(Location, Location) -> f32 + 'static,
        h_cost: impl Fn(Location, Location) -> f32 + 'static,
    ) -> Self {
        let mut finder = Self::new();
        finder.set_g_cost(g_cost);
        finder.set_h_cost(h_cost);
        finder
    }

    /// Set the cost of moving between two adjacent locations
    pub fn set_g_cost(&mut self, g_cost: impl Fn(Location, Location) -> f32 + 'static) {
        self.g_cost = Some(Box::new(g_cost));
    }

    /// Set the estimate of the remaining cost from a location to the destination
    pub fn set_h_cost(&mut self, h_cost: impl Fn(Location, Location) -> f32 + 'static) {
        self.h_cost = Some(Box::new(h_cost));
    }

    /// Start a new search. Returns `false` if a cost function is missing or a search is still
    /// running, in which case nothing changes.
    pub fn initialize(&mut self, start: R, destination: R) -> bool {
        match self.try_initialize(start, destination) {
            Ok(()) => true,
            Err(e) => {
                debug!("initialize rejected: {}", e);
                false
            }
        }
    }

    pub fn try_initialize(&mut self, start: R, destination: R) -> Result<(), InitError> {
        let h_cost = match (&self.g_cost, &self.h_cost) {
            (None, _) => return Err(InitError::MissingGCost),
            (_, None) => return Err(InitError::MissingHCost),
            (Some(_), Some(h_cost)) => h_cost,
        };
        if self.status == Status::Running {
            return Err(InitError::Busy);
        }

        let h = h_cost(start.location(), destination.location());

        self.reset();
        self.start = Some(start);
        self.destination = Some(destination);

        let root = self.push_node(SearchNode::new(start, None, 0.0, h));
        self.open.push(root);
        self.current = Some(root);
        self.status = Status::Running;

        debug!(
            "initialized search from {} to {}",
            start.location(),
            destination.location()
        );
        Ok(())
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.open.clear();
        self.closed.clear();
        self.current = None;
        self.start = None;
        self.destination = None;
        self.status = Status::NotInitialized;
    }

    fn push_node(&mut self, node: SearchNode<R>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.index.insert(node.location.location(), id);
        self.nodes.push(node);
        id
    }

    /// Position in the open list of the node with the smallest F, the first one wins on ties
    fn least_cost_open(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, id) in self.open.iter().enumerate() {
            let f = self.nodes[id.0].f;
            match best {
                Some((_, least)) if least <= f => {}
                _ => best = Some((i, f)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Expand one node. Does nothing unless the status is [`Status::Running`].
    pub fn step<M: MapTrait<Reference = R>>(&mut self, map: &M) -> Status {
        if self.status != Status::Running {
            return self.status;
        }
        let (Some(current), Some(destination), Some(g_cost), Some(h_cost)) = (
            self.current,
            self.destination,
            self.g_cost.as_ref(),
            self.h_cost.as_ref(),
        ) else {
            return self.status;
        };

        // the previously expanded node is done
        let node = &mut self.nodes[current.0];
        if node.list != List::Closed {
            node.list = List::Closed;
            self.closed.push(current);
        }

        let Some(best) = self.least_cost_open() else {
            info!(
                "no path to {} after closing {} nodes",
                destination.location(),
                self.closed.len()
            );
            self.status = Status::Failure;
            return self.status;
        };
        let id = self.open.remove(best);
        self.current = Some(id);

        let reference = self.nodes[id.0].location;
        let from = reference.location();
        let goal = destination.location();
        if from == goal {
            info!(
                "found {} with cost {} after closing {} nodes",
                goal,
                self.nodes[id.0].g,
                self.closed.len()
            );
            self.status = Status::Success;
            return self.status;
        }

        trace!("expanding {} (f = {})", from, self.nodes[id.0].f);
        let current_g = self.nodes[id.0].g;
        for neighbor in map.neighbors_of(reference) {
            let to = neighbor.location();
            match self.index.get(&to).copied() {
                Some(existing) if existing == id || self.nodes[existing.0].list == List::Closed => {}
                Some(existing) => {
                    let g = current_g + g_cost(from, to);
                    let node = &mut self.nodes[existing.0];
                    if g < node.g {
                        trace!("cheaper path to {}: {} -> {}", to, node.g, g);
                        node.parent = Some(id);
                        node.set_g(g);
                    }
                }
                None => {
                    let g = current_g + g_cost(from, to);
                    let h = h_cost(to, goal);
                    let new_id = NodeId(self.nodes.len());
                    self.nodes.push(SearchNode::new(neighbor, Some(id), g, h));
                    self.index.insert(to, new_id);
                    self.open.push(new_id);
                }
            }
        }

        self.status = Status::Running;
        self.status
    }

    /// Keep stepping until the search leaves [`Status::Running`]
    pub fn finish<M: MapTrait<Reference = R>>(&mut self, map: &M) -> Status {
        loop {
            match self.step(map) {
                Status::Running => {}
                s => return s,
            }
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn start(&self) -> Option<R> {
        self.start
    }

    pub fn destination(&self) -> Option<R> {
        self.destination
    }

    /// The node selected by the last step, or the root right after initialization
    pub fn current_node(&self) -> Option<&SearchNode<R>> {
        self.current.map(|id| &self.nodes[id.0])
    }

    pub fn current_id(&self) -> Option<NodeId> {
        self.current
    }

    pub fn node(&self, id: NodeId) -> Option<&SearchNode<R>> {
        self.nodes.get(id.0)
    }

    /// The node discovered for the given location, if any
    pub fn node_at(&self, location: Location) -> Option<&SearchNode<R>> {
        self.index.get(&location).map(|id| &self.nodes[id.0])
    }

    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    pub fn closed_len(&self) -> usize {
        self.closed.len()
    }

    /// Open nodes in insertion order
    pub fn open_nodes(&self) -> impl Iterator<Item = &SearchNode<R>> {
        self.open.iter().map(|id| &self.nodes[id.0])
    }

    pub fn closed_nodes(&self) -> impl Iterator<Item = &SearchNode<R>> {
        self.closed.iter().map(|id| &self.nodes[id.0])
    }

    /// Walk the parent chain from the current node back to the root
    pub fn backtrack(&self) -> Backtrack<'_, R> {
        Backtrack {
            finder: self,
            next: self.current,
        }
    }
}

pub struct Backtrack<'a, R: Locatable> {
    finder: &'a PathFinder<R>,
    next: Option<NodeId>,
}

impl<'a, R: Locatable> Iterator for Backtrack<'a, R> {
    type Item = &'a SearchNode<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.finder.nodes[self.next?.0];
        self.next = node.parent;
        Some(node)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct PathResult<R> {
    pub path: Vec<R>,
    pub start: R,
    pub goal: R,
    pub total_cost: f32,
}

impl<R: Locatable> PathResult<R> {
    /// Reconstruct the path of a successful search, ordered from start to goal
    pub fn from_finder(finder: &PathFinder<R>) -> Option<Self> {
        if finder.status() != Status::Success {
            return None;
        }
        let total_cost = finder.current_node()?.g();
        let mut path: Vec<R> = finder.backtrack().map(|n| n.location()).collect();
        path.reverse();

        Some(PathResult {
            path,
            start: finder.start()?,
            goal: finder.destination()?,
            total_cost,
        })
    }

    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.path.iter().map(|r| r.location())
    }
}
