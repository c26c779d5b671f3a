pub mod cost;
pub mod find;
pub mod grid;
pub mod util;

pub use cost::{chebyshev, euclidean, manhattan, CostFn, Metric};
pub use find::{
    InitError, Locatable, Location, MapTrait, NodeId, PathFinder, PathResult, SearchNode, Status,
};
pub use grid::{Cell, GridMap};
pub use util::{load_map, parse_img};
