use crate::find::{Location, MapTrait};
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Walkable,
    Blocked,
}

impl Cell {
    pub fn is_walkable(&self) -> bool {
        *self == Cell::Walkable
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Cell::Walkable => ".",
                Cell::Blocked => "#",
            }
        )
    }
}

/// A MapTrait implementation that uses a rectangular grid of cells, indexed as `cells[y][x]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGridMap")]
pub struct GridMap {
    pub columns: usize,
    pub rows: usize,
    pub cells: Vec<Vec<Cell>>,
}

/// Serialized form of a [`GridMap`], checked for a consistent shape before use
#[derive(Deserialize)]
struct RawGridMap {
    columns: usize,
    rows: usize,
    cells: Vec<Vec<Cell>>,
}

impl TryFrom<RawGridMap> for GridMap {
    type Error = anyhow::Error;

    fn try_from(raw: RawGridMap) -> Result<Self, Self::Error> {
        if raw.cells.len() != raw.rows {
            return Err(anyhow::anyhow!(
                "Map has {} rows, expected {}",
                raw.cells.len(),
                raw.rows
            ));
        }
        check_row_lengths(&raw.cells, raw.columns)?;

        Ok(GridMap {
            columns: raw.columns,
            rows: raw.rows,
            cells: raw.cells,
        })
    }
}

fn check_row_lengths(cells: &[Vec<Cell>], columns: usize) -> Result<(), anyhow::Error> {
    if let Some(y) = cells.iter().position(|row| row.len() != columns) {
        return Err(anyhow::anyhow!(
            "Row {} has {} cells, expected {}",
            y,
            cells[y].len(),
            columns
        ));
    }
    Ok(())
}

impl GridMap {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cells: vec![vec![Cell::Walkable; columns]; rows],
        }
    }

    pub fn is_valid(&self, location: Location) -> bool {
        location.x >= 0
            && location.y >= 0
            && (location.x as usize) < self.columns
            && (location.y as usize) < self.rows
    }

    pub fn cell(&self, location: Location) -> Option<Cell> {
        if !self.is_valid(location) {
            return None;
        }
        self.cells
            .get(location.y as usize)?
            .get(location.x as usize)
            .copied()
    }

    /// Out of range locations are never walkable
    pub fn is_walkable(&self, location: Location) -> bool {
        self.cell(location).is_some_and(|c| c.is_walkable())
    }

    /// Returns false if the location is outside of the map
    pub fn set_walkable(&mut self, location: Location, walkable: bool) -> bool {
        if !self.is_valid(location) {
            return false;
        }
        let Some(cell) = self
            .cells
            .get_mut(location.y as usize)
            .and_then(|row| row.get_mut(location.x as usize))
        else {
            return false;
        };
        *cell = if walkable {
            Cell::Walkable
        } else {
            Cell::Blocked
        };
        true
    }

    /// Flip the walkability of a cell, returning the new state
    pub fn toggle_walkable(&mut self, location: Location) -> Option<bool> {
        let walkable = !self.cell(location)?.is_walkable();
        self.set_walkable(location, walkable);
        Some(walkable)
    }

    /// Scales the map by the given factor, i.e. to make it twice as large, pass 2.
    /// Interpolates the cells by repeating the existing cells in the new grid.
    pub fn scale_up(&mut self, factor: usize) {
        let mut new_cells = vec![vec![Cell::default(); self.columns * factor]; self.rows * factor];

        for row in 0..self.rows {
            for col in 0..self.columns {
                for r in 0..factor {
                    for c in 0..factor {
                        new_cells[row * factor + r][col * factor + c] = self.cells[row][col];
                    }
                }
            }
        }

        self.rows *= factor;
        self.columns *= factor;
        self.cells = new_cells;
    }
}

impl Display for GridMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            for cell in row {
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl FromStr for GridMap {
    type Err = anyhow::Error;

    /// One line per row, `#` for blocked and `.` for walkable cells
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cells = Vec::new();
        for (y, line) in s.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
            let row = line
                .chars()
                .enumerate()
                .map(|(x, c)| match c {
                    '.' => Ok(Cell::Walkable),
                    '#' => Ok(Cell::Blocked),
                    _ => Err(anyhow::anyhow!("Invalid cell '{}' at ({}, {})", c, x, y)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            cells.push(row);
        }

        let columns = cells.first().map(Vec::len).unwrap_or(0);
        if columns == 0 {
            return Err(anyhow::anyhow!("Empty map"));
        }
        check_row_lengths(&cells, columns)?;

        Ok(GridMap {
            rows: cells.len(),
            columns,
            cells,
        })
    }
}

impl MapTrait for GridMap {
    type Reference = Location;

    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference> {
        // up, right, down, left
        let points = [
            node.y.checked_add(1).map(|y| Location::new(node.x, y)),
            node.x.checked_add(1).map(|x| Location::new(x, node.y)),
            node.y.checked_sub(1).map(|y| Location::new(node.x, y)),
            node.x.checked_sub(1).map(|x| Location::new(x, node.y)),
        ];

        // filter to only keep walkable cells
        points
            .into_iter()
            .flatten()
            .filter(|p| self.is_walkable(*p))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::cost::{euclidean, manhattan, Metric};
    use std::collections::{HashMap, VecDeque};
    use crate::find::{PathFinder, PathResult, Status};

    fn create_basic_map() -> GridMap {
        "#######
         #.###.#
         #.###.#
         #.#...#
         #.#.###
         #......
         #######"
            .parse()
            .unwrap()
    }

    fn find(
        map: &GridMap,
        start: Location,
        goal: Location,
    ) -> (Status, Option<PathResult<Location>>) {
        let mut finder = PathFinder::with_costs(manhattan, manhattan);
        assert!(finder.initialize(start, goal));
        let status = finder.finish(map);
        (status, PathResult::from_finder(&finder))
    }

    #[test]
    fn test_parse_and_display() {
        let map = create_basic_map();
        assert_eq!(map.columns, 7);
        assert_eq!(map.rows, 7);
        assert!(map.is_walkable(Location::new(1, 1)));
        assert!(!map.is_walkable(Location::new(2, 1)));
        assert!(map.is_walkable(Location::new(6, 5)));

        let text = map.to_string();
        assert_eq!(text.lines().next(), Some("#######"));
        assert_eq!(text.parse::<GridMap>().unwrap(), map);
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<GridMap>().is_err());
        assert!("..\n.".parse::<GridMap>().is_err());
        assert!("..\n.x".parse::<GridMap>().is_err());
    }

    #[test]
    fn test_neighbors_order_and_filter() {
        let map = GridMap::new(3, 3);
        let center: Vec<_> = map.neighbors_of(Location::new(1, 1)).collect();
        assert_eq!(
            center,
            vec![
                Location::new(1, 2),
                Location::new(2, 1),
                Location::new(1, 0),
                Location::new(0, 1)
            ]
        );

        let corner: Vec<_> = map.neighbors_of(Location::new(0, 0)).collect();
        assert_eq!(corner, vec![Location::new(0, 1), Location::new(1, 0)]);

        let mut map = map;
        map.set_walkable(Location::new(1, 2), false);
        let center: Vec<_> = map.neighbors_of(Location::new(1, 1)).collect();
        assert_eq!(center.len(), 3);
        assert!(!center.contains(&Location::new(1, 2)));
    }

    #[test]
    fn test_toggle_walkable() {
        let mut map = GridMap::new(2, 2);
        let p = Location::new(1, 0);
        assert_eq!(map.toggle_walkable(p), Some(false));
        assert!(!map.is_walkable(p));
        assert_eq!(map.toggle_walkable(p), Some(true));
        assert!(map.is_walkable(p));
        assert_eq!(map.toggle_walkable(Location::new(2, 0)), None);
        assert!(!map.set_walkable(Location::new(-1, 0), true));
    }

    #[test]
    fn test_basic_route() {
        let map = create_basic_map();
        let (status, result) = find(&map, Location::new(1, 1), Location::new(5, 1));

        assert_eq!(status, Status::Success);
        let result = result.unwrap();
        assert_eq!(result.total_cost, 12.0);
        assert_eq!(result.path.len(), 13);
        assert_eq!(result.path.first(), Some(&Location::new(1, 1)));
        assert_eq!(result.path.last(), Some(&Location::new(5, 1)));
        assert!(result.path.iter().all(|p| map.is_walkable(*p)));
    }

    #[test]
    fn test_basic_no_route() {
        let map = create_basic_map();
        let (status, result) = find(&map, Location::new(1, 1), Location::new(5, 0));

        // no route to target
        assert_eq!(status, Status::Failure);
        assert!(result.is_none());
    }

    #[test]
    fn test_basic_shortcut() {
        let mut map = create_basic_map();
        // open a shortcut through the wall
        map.set_walkable(Location::new(2, 3), true);

        let (status, result) = find(&map, Location::new(1, 1), Location::new(5, 1));
        assert_eq!(status, Status::Success);
        assert_eq!(result.unwrap().total_cost, 8.0);
    }

    #[test]
    fn test_map_changes_between_steps() {
        // the search reads walkability live, so a wall placed mid-search is respected
        let mut map = GridMap::new(5, 1);
        let mut finder = PathFinder::with_costs(euclidean, manhattan);
        finder.initialize(Location::new(0, 0), Location::new(4, 0));

        assert_eq!(finder.step(&map), Status::Running);
        map.set_walkable(Location::new(2, 0), false);
        assert_eq!(finder.finish(&map), Status::Failure);

        map.set_walkable(Location::new(2, 0), true);
        finder.initialize(Location::new(0, 0), Location::new(4, 0));
        assert_eq!(finder.finish(&map), Status::Success);
    }

    /// Grid with roughly a third of the cells blocked, from a fixed seed
    fn create_random_map(columns: usize, rows: usize, seed: u64) -> GridMap {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut map = GridMap::new(columns, rows);
        for y in 0..rows {
            for x in 0..columns {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                if state % 3 == 0 {
                    map.set_walkable(Location::new(x as i32, y as i32), false);
                }
            }
        }
        map
    }

    /// Breadth first distance over the same neighbours, every move costs 1
    fn shortest_distance(map: &GridMap, start: Location, goal: Location) -> Option<usize> {
        let mut distance = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            let d = distance[&node];
            if node == goal {
                return Some(d);
            }
            for next in map.neighbors_of(node) {
                if !distance.contains_key(&next) {
                    distance.insert(next, d + 1);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    #[test]
    fn test_matches_breadth_first_distance() {
        let start = Location::new(0, 0);
        let goal = Location::new(8, 6);
        let mut reachable = 0;

        for seed in 1..=40 {
            let mut map = create_random_map(9, 7, seed);
            map.set_walkable(start, true);
            map.set_walkable(goal, true);
            let expected = shortest_distance(&map, start, goal);

            for h_cost in [Metric::Manhattan, Metric::Chebyshev].map(Metric::as_fn) {
                let mut finder = PathFinder::with_costs(euclidean, h_cost);
                finder.initialize(start, goal);
                let status = finder.finish(&map);

                match expected {
                    Some(d) => {
                        assert_eq!(status, Status::Success, "seed {}", seed);
                        let result = PathResult::from_finder(&finder).unwrap();
                        assert_eq!(result.total_cost, d as f32, "seed {}", seed);
                        assert_eq!(result.path.len(), d + 1);
                        assert!(result
                            .path
                            .windows(2)
                            .all(|w| manhattan(w[0], w[1]) == 1.0 && map.is_walkable(w[1])));
                    }
                    None => assert_eq!(status, Status::Failure, "seed {}", seed),
                }
            }
            reachable += expected.is_some() as usize;
        }

        // both outcomes are covered
        assert!(reachable > 0);
        assert!(reachable < 40);
    }

    #[test]
    fn test_scale_up() {
        let mut map = GridMap::new(2, 1);
        map.set_walkable(Location::new(1, 0), false);
        map.scale_up(2);
        assert_eq!(map.to_string(), "..##\n..##\n");
    }

    #[test]
    fn test_serde() {
        let map = create_basic_map();
        let json = serde_json::to_string(&map).unwrap();
        let back: GridMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_serde_rejects_inconsistent_shape() {
        assert!(serde_json::from_str::<GridMap>(r#"{"columns":3,"rows":3,"cells":[]}"#).is_err());
        assert!(serde_json::from_str::<GridMap>(
            r#"{"columns":2,"rows":1,"cells":[["Walkable"]]}"#
        )
        .is_err());

        let empty: GridMap =
            serde_json::from_str(r#"{"columns":0,"rows":0,"cells":[]}"#).unwrap();
        assert!(!empty.is_walkable(Location::new(0, 0)));
    }

    #[test]
    fn test_mismatched_fields_do_not_panic() {
        // public fields can still be edited out of shape
        let mut map = GridMap::new(3, 3);
        map.cells.truncate(1);
        assert!(map.is_walkable(Location::new(1, 0)));
        assert!(!map.is_walkable(Location::new(1, 1)));
        assert_eq!(map.cell(Location::new(1, 1)), None);
        assert!(!map.set_walkable(Location::new(1, 1), false));
        assert_eq!(map.toggle_walkable(Location::new(2, 2)), None);
    }

    #[test]
    fn test_neighbors_at_coordinate_limits() {
        let map = GridMap::new(3, 3);
        for node in [
            Location::new(i32::MAX, 0),
            Location::new(0, i32::MAX),
            Location::new(i32::MIN, i32::MIN),
        ] {
            assert_eq!(map.neighbors_of(node).count(), 0);
        }

        let mut finder = PathFinder::with_costs(euclidean, manhattan);
        finder.initialize(Location::new(i32::MAX, 0), Location::new(1, 1));
        assert_eq!(finder.finish(&map), Status::Failure);
        assert_eq!(finder.closed_len(), 1);
    }
}
