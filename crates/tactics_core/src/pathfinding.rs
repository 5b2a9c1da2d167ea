//! Grid-based pathfinding using the A* algorithm, plus bounded range queries.
//!
//! All costs are integers and all heuristic estimates use fixed-point math,
//! so results are identical across platforms.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::coord::Coord;
use crate::math::{fixed_sqrt, Fixed};

/// Diagonal step cost multiplier in percent when heavy diagonals are enabled.
const HEAVY_DIAGONAL_PERCENT: u64 = 241;

/// Cardinal offsets in expansion order.
const CARDINAL_OFFSETS: [Coord; 4] = [
    Coord::new(0, -1),
    Coord::new(1, 0),
    Coord::new(0, 1),
    Coord::new(-1, 0),
];

/// Diagonal offsets, expanded after the cardinal ones.
const DIAGONAL_OFFSETS: [Coord; 4] = [
    Coord::new(1, -1),
    Coord::new(1, 1),
    Coord::new(-1, 1),
    Coord::new(-1, -1),
];

/// Errors reported by path queries.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathError {
    /// The open set emptied, the goal is impassable, or the search was cancelled.
    #[error("No path found")]
    NotFound,
    /// More nodes were closed than the configured cap allows.
    #[error("Search limit of {limit} closed nodes exceeded")]
    SearchLimitExceeded {
        /// The configured cap.
        limit: u32,
    },
    /// A query endpoint lies outside the grid.
    #[error("Coordinate {0} is outside the grid")]
    OutOfBounds(Coord),
}

/// Which neighbours a step may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementModel {
    /// Up, down, left, right.
    #[default]
    FourWay,
    /// Cardinal plus diagonal steps.
    EightWay,
}

/// Distance estimate used to guide the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Heuristic {
    /// `dx + dy`. Admissible for four-way movement.
    #[default]
    Manhattan,
    /// `max(dx, dy)`. Admissible for eight-way movement with plain diagonals.
    MaxDxDy,
    /// Octile distance: straight steps plus diagonal steps at diagonal cost.
    DiagonalShortcut,
    /// Straight-line distance.
    Euclidean,
    /// Squared straight-line distance. Fast but not admissible.
    EuclideanSquared,
}

/// Tunables for [`Pathfinder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Neighbour model.
    pub movement: MovementModel,
    /// Charge diagonal steps at 2.41x the tile weight (truncated).
    pub heavy_diagonals: bool,
    /// Distance estimate.
    pub heuristic: Heuristic,
    /// Multiplier applied to the heuristic estimate.
    pub heuristic_weight: u32,
    /// Bias ties toward the straight line from start to goal.
    pub tie_breaker: bool,
    /// Charge a penalty when a step changes axis.
    pub punish_direction_change: bool,
    /// Penalty charged per axis change.
    pub direction_change_penalty: u32,
    /// Maximum number of closed nodes before the search gives up.
    pub search_limit: u32,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            movement: MovementModel::FourWay,
            heavy_diagonals: false,
            heuristic: Heuristic::Manhattan,
            heuristic_weight: 1,
            tie_breaker: false,
            punish_direction_change: false,
            direction_change_penalty: 20,
            search_limit: 2000,
        }
    }
}

/// Per-tile movement weights as seen by the pathfinder. Zero is impassable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostGrid {
    width: u32,
    height: u32,
    /// Weights stored in row-major order.
    weights: Vec<u32>,
}

impl CostGrid {
    /// Build a cost grid from row-major weights.
    ///
    /// # Panics
    ///
    /// Panics if `weights` does not hold exactly `width * height` entries.
    #[must_use]
    pub fn from_raw(width: u32, height: u32, weights: Vec<u32>) -> Self {
        assert_eq!(
            weights.len(),
            (width as usize) * (height as usize),
            "cost grid size mismatch"
        );
        Self {
            width,
            height,
            weights,
        }
    }

    /// Cost grid with the same weight everywhere.
    #[must_use]
    pub fn uniform(width: u32, height: u32, weight: u32) -> Self {
        Self::from_raw(width, height, vec![weight; (width as usize) * (height as usize)])
    }

    /// Grid width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check if a coordinate is within bounds.
    #[must_use]
    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    #[inline]
    fn index(&self, coord: Coord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| (coord.y as usize) * (self.width as usize) + (coord.x as usize))
    }

    /// Weight of a tile. Returns `None` if out of bounds.
    #[must_use]
    pub fn weight(&self, coord: Coord) -> Option<u32> {
        self.index(coord).map(|i| self.weights[i])
    }

    /// Overwrite a tile's weight. Returns `false` if out of bounds.
    pub fn set_weight(&mut self, coord: Coord, weight: u32) -> bool {
        match self.index(coord) {
            Some(i) => {
                self.weights[i] = weight;
                true
            }
            None => false,
        }
    }
}

/// A found path, start and goal included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    /// Tiles from start to goal.
    pub tiles: Vec<Coord>,
    /// Movement cost of every step taken, as charged by range queries.
    pub cost: u32,
}

impl Path {
    /// Number of steps taken.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.tiles.len().saturating_sub(1)
    }

    /// Final tile.
    #[must_use]
    pub fn goal(&self) -> Option<Coord> {
        self.tiles.last().copied()
    }
}

/// Minimum movement cost from an origin to every tile, bounded by a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostMatrix {
    width: u32,
    height: u32,
    origin: Coord,
    costs: Vec<u32>,
}

impl CostMatrix {
    /// Marker for tiles outside the requested range.
    pub const UNREACHABLE: u32 = u32::MAX;

    /// Tile the costs are measured from.
    #[must_use]
    pub const fn origin(&self) -> Coord {
        self.origin
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        (coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height)
            .then(|| (coord.y as usize) * (self.width as usize) + (coord.x as usize))
    }

    /// Raw cost of a tile, [`Self::UNREACHABLE`] included. `None` if out of bounds.
    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<u32> {
        self.index(coord).map(|i| self.costs[i])
    }

    /// Whether the tile can be reached within range.
    #[must_use]
    pub fn is_reachable(&self, coord: Coord) -> bool {
        self.get(coord).is_some_and(|cost| cost != Self::UNREACHABLE)
    }

    /// Every reachable tile with its cost, in row-major order.
    pub fn reachable(&self) -> impl Iterator<Item = (Coord, u32)> + '_ {
        let width = self.width as usize;
        self.costs
            .iter()
            .enumerate()
            .filter(|(_, &cost)| cost != Self::UNREACHABLE)
            .map(move |(i, &cost)| (Coord::new((i % width) as i32, (i / width) as i32), cost))
    }
}

/// Cooperative cancellation flag for long searches.
///
/// Clones share the same flag. The search polls it once per expansion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

/// Axis of a single step, used for the direction-change penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
    Diagonal,
}

impl Axis {
    const fn of(step: Coord) -> Self {
        match (step.x, step.y) {
            (_, 0) => Self::Horizontal,
            (0, _) => Self::Vertical,
            _ => Self::Diagonal,
        }
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AStarNode {
    coord: Coord,
    /// f = g + h
    f_score: Fixed,
    g_score: u32,
    parent: Option<Coord>,
    axis: Option<Axis>,
    /// Insertion counter. Equal f-scores expand in insertion order.
    sequence: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so compare reversed for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy)]
struct ClosedNode {
    g_score: u32,
    parent: Option<Coord>,
}

/// Path and range queries over one [`CostGrid`] snapshot.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    costs: CostGrid,
    config: PathfinderConfig,
}

impl Pathfinder {
    /// Create a pathfinder over a cost snapshot.
    #[must_use]
    pub const fn new(costs: CostGrid, config: PathfinderConfig) -> Self {
        Self { costs, config }
    }

    /// The cost snapshot being searched.
    #[must_use]
    pub const fn costs(&self) -> &CostGrid {
        &self.costs
    }

    /// Find the cheapest path from `start` to `goal`.
    ///
    /// # Errors
    ///
    /// - [`PathError::OutOfBounds`] if either endpoint is outside the grid.
    /// - [`PathError::NotFound`] if the goal is impassable or unreachable.
    /// - [`PathError::SearchLimitExceeded`] if the search closes more nodes
    ///   than the configured limit.
    pub fn find_path(&self, start: Coord, goal: Coord) -> Result<Path, PathError> {
        self.find_path_cancellable(start, goal, &CancelToken::new())
    }

    /// Like [`Self::find_path`], aborting with [`PathError::NotFound`] once
    /// `cancel` is set.
    ///
    /// # Errors
    ///
    /// See [`Self::find_path`].
    pub fn find_path_cancellable(
        &self,
        start: Coord,
        goal: Coord,
        cancel: &CancelToken,
    ) -> Result<Path, PathError> {
        if !self.costs.in_bounds(start) {
            return Err(PathError::OutOfBounds(start));
        }
        let goal_weight = self.costs.weight(goal).ok_or(PathError::OutOfBounds(goal))?;

        if start == goal {
            return Ok(Path {
                tiles: vec![start],
                cost: 0,
            });
        }
        if goal_weight == 0 {
            debug!(%start, %goal, "goal tile is impassable");
            return Err(PathError::NotFound);
        }

        let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
        let mut open_best: HashMap<Coord, u32> = HashMap::new();
        let mut closed: HashMap<Coord, ClosedNode> = HashMap::new();
        let mut sequence = 0u64;

        open_best.insert(start, 0);
        open_set.push(AStarNode {
            coord: start,
            f_score: self.estimate(start, start, goal),
            g_score: 0,
            parent: None,
            axis: None,
            sequence,
        });

        while let Some(current) = open_set.pop() {
            if cancel.is_cancelled() {
                debug!(%start, %goal, "path search cancelled");
                return Err(PathError::NotFound);
            }

            // Skip stale heap entries
            if closed
                .get(&current.coord)
                .is_some_and(|c| c.g_score <= current.g_score)
            {
                continue;
            }
            closed.insert(
                current.coord,
                ClosedNode {
                    g_score: current.g_score,
                    parent: current.parent,
                },
            );

            if current.coord == goal {
                let tiles = reconstruct_path(&closed, goal);
                let cost = self.path_cost(&tiles);
                debug!(%start, %goal, cost, closed = closed.len(), "path found");
                return Ok(Path { tiles, cost });
            }

            if closed.len() > self.config.search_limit as usize {
                debug!(%start, %goal, limit = self.config.search_limit, "search limit exceeded");
                return Err(PathError::SearchLimitExceeded {
                    limit: self.config.search_limit,
                });
            }

            trace!(coord = %current.coord, g = current.g_score, f = %current.f_score, "expand");

            for &offset in self.offsets() {
                let neighbor = current.coord + offset;
                let Some(weight) = self.costs.weight(neighbor) else {
                    continue;
                };

                let step_cost = self.step_cost(weight, offset);
                // Zero-delta transitions are never free moves
                if step_cost == 0 {
                    continue;
                }

                let axis = Axis::of(offset);
                let mut g_score = current.g_score.saturating_add(step_cost);
                if self.config.punish_direction_change && current.axis.is_some_and(|a| a != axis) {
                    g_score = g_score.saturating_add(self.config.direction_change_penalty);
                }

                if open_best.get(&neighbor).is_some_and(|&g| g <= g_score) {
                    continue;
                }
                if closed.get(&neighbor).is_some_and(|c| c.g_score <= g_score) {
                    continue;
                }

                open_best.insert(neighbor, g_score);
                sequence += 1;
                open_set.push(AStarNode {
                    coord: neighbor,
                    f_score: Fixed::saturating_from_num(g_score)
                        .saturating_add(self.estimate(neighbor, start, goal)),
                    g_score,
                    parent: Some(current.coord),
                    axis: Some(axis),
                    sequence,
                });
            }
        }

        debug!(%start, %goal, closed = closed.len(), "open set exhausted");
        Err(PathError::NotFound)
    }

    /// Minimum movement cost from `origin` to every tile within `max_range`.
    ///
    /// The origin costs zero. Impassable tiles and tiles beyond range are
    /// [`CostMatrix::UNREACHABLE`].
    ///
    /// # Errors
    ///
    /// Returns [`PathError::OutOfBounds`] if the origin is outside the grid.
    pub fn range_costs(&self, origin: Coord, max_range: u32) -> Result<CostMatrix, PathError> {
        if !self.costs.in_bounds(origin) {
            return Err(PathError::OutOfBounds(origin));
        }

        let mut matrix = CostMatrix {
            width: self.costs.width,
            height: self.costs.height,
            origin,
            costs: vec![CostMatrix::UNREACHABLE; self.costs.weights.len()],
        };
        let origin_index = self.costs.index(origin).ok_or(PathError::OutOfBounds(origin))?;
        matrix.costs[origin_index] = 0;

        let mut queue = VecDeque::from([origin]);
        while let Some(current) = queue.pop_front() {
            let Some(current_cost) = matrix.get(current) else {
                continue;
            };

            for &offset in self.offsets() {
                let neighbor = current + offset;
                let Some(index) = self.costs.index(neighbor) else {
                    continue;
                };
                let weight = self.costs.weights[index];
                let step_cost = if weight == 0 {
                    CostMatrix::UNREACHABLE
                } else {
                    self.step_cost(weight, offset)
                };

                let cost = current_cost.saturating_add(step_cost);
                if cost < matrix.costs[index] && cost <= max_range && cost > 0 {
                    matrix.costs[index] = cost;
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(matrix)
    }

    /// Movement cost of walking `path`, start tile excluded.
    ///
    /// Each step costs the entered tile's weight, scaled for heavy
    /// diagonals, so a path and [`Self::range_costs`] always agree. The
    /// direction-change penalty is not a movement cost.
    #[must_use]
    pub fn path_cost(&self, path: &[Coord]) -> u32 {
        path.windows(2)
            .filter_map(|step| {
                let weight = self.costs.weight(step[1])?;
                Some(self.step_cost(weight, step[1] - step[0]))
            })
            .fold(0u32, u32::saturating_add)
    }

    fn offsets(&self) -> &'static [Coord] {
        static EIGHT_WAY: [Coord; 8] = [
            CARDINAL_OFFSETS[0],
            CARDINAL_OFFSETS[1],
            CARDINAL_OFFSETS[2],
            CARDINAL_OFFSETS[3],
            DIAGONAL_OFFSETS[0],
            DIAGONAL_OFFSETS[1],
            DIAGONAL_OFFSETS[2],
            DIAGONAL_OFFSETS[3],
        ];
        match self.config.movement {
            MovementModel::FourWay => &CARDINAL_OFFSETS,
            MovementModel::EightWay => &EIGHT_WAY,
        }
    }

    /// Cost of stepping onto a tile of `weight` via `offset`.
    fn step_cost(&self, weight: u32, offset: Coord) -> u32 {
        if self.config.heavy_diagonals && offset.x != 0 && offset.y != 0 {
            let heavy = u64::from(weight) * HEAVY_DIAGONAL_PERCENT / 100;
            u32::try_from(heavy).unwrap_or(u32::MAX)
        } else {
            weight
        }
    }

    /// Heuristic estimate from `coord` to `goal`, weighted and tie-broken.
    fn estimate(&self, coord: Coord, start: Coord, goal: Coord) -> Fixed {
        let dx = i64::from(coord.x.abs_diff(goal.x));
        let dy = i64::from(coord.y.abs_diff(goal.y));
        let weight = Fixed::saturating_from_num(self.config.heuristic_weight);

        let raw = match self.config.heuristic {
            Heuristic::Manhattan => Fixed::from_num(dx + dy),
            Heuristic::MaxDxDy => Fixed::from_num(dx.max(dy)),
            Heuristic::DiagonalShortcut => {
                let diagonal = dx.min(dy);
                let straight = dx.max(dy) - diagonal;
                let diagonal_cost = i64::from(self.step_cost(1, Coord::new(1, 1)));
                Fixed::from_num(straight + diagonal * diagonal_cost)
            }
            Heuristic::Euclidean => fixed_sqrt(Fixed::from_num(dx * dx + dy * dy)),
            Heuristic::EuclideanSquared => Fixed::from_num(dx * dx + dy * dy),
        };
        let mut h = raw.saturating_mul(weight);

        if self.config.tie_breaker {
            let current = coord - goal;
            let initial = start - goal;
            let cross = (i64::from(current.x) * i64::from(initial.y)
                - i64::from(initial.x) * i64::from(current.y))
            .abs();
            h = h.saturating_add(Fixed::from_num(cross) / Fixed::from_num(1000));
        }

        h
    }
}

/// Walk parent links backward from the goal and return start -> goal.
fn reconstruct_path(closed: &HashMap<Coord, ClosedNode>, goal: Coord) -> Vec<Coord> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(parent) = closed.get(&current).and_then(|node| node.parent) {
        path.push(parent);
        current = parent;
    }

    path.reverse();
    path
}
