use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use bracket_geometry::prelude::Point;
use bracket_pathfinding::prelude::{Algorithm2D, BaseMap, DistanceAlg};
use smallvec::SmallVec;

use super::{CARDINALS, TileGrid};

/// The grid as seen by a single path query: floor cells minus `blocked`,
/// except that the goal is always enterable so an attacker can path onto the
/// tile it means to strike.
struct PathGrid<'a> {
    grid: &'a TileGrid,
    blocked: &'a HashSet<Point>,
    goal: Point,
}

impl<'a> PathGrid<'a> {
    fn enterable(&self, point: Point) -> bool {
        self.grid.is_floor(point) && (point == self.goal || !self.blocked.contains(&point))
    }
}

impl<'a> BaseMap for PathGrid<'a> {
    fn is_opaque(&self, idx: usize) -> bool {
        self.grid.is_wall(self.index_to_point2d(idx))
    }

    fn get_available_exits(&self, idx: usize) -> SmallVec<[(usize, f32); 10]> {
        let mut exits = SmallVec::new();
        let point = self.index_to_point2d(idx);
        for dir in CARDINALS {
            let dest = Point::new(point.x + dir.x, point.y + dir.y);
            if self.in_bounds(dest) && self.enterable(dest) {
                exits.push((self.point2d_to_index(dest), 1.0));
            }
        }
        exits
    }

    fn get_pathing_distance(&self, idx1: usize, idx2: usize) -> f32 {
        let p1 = self.index_to_point2d(idx1);
        let p2 = self.index_to_point2d(idx2);
        DistanceAlg::Manhattan.distance2d(p1, p2)
    }
}

impl<'a> Algorithm2D for PathGrid<'a> {
    fn dimensions(&self) -> Point {
        Point::new(self.grid.width, self.grid.height)
    }

    fn in_bounds(&self, point: Point) -> bool {
        self.grid.in_bounds(point)
    }
}

/// Ordered by estimated total cost, then by push order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    f: u32,
    seq: u64,
    g: u32,
    idx: usize,
}

/// Shortest 4-directional path from `start` to `goal`, excluding `start` and
/// including `goal`. Empty when `start == goal` or the goal is unreachable.
pub fn path(grid: &TileGrid, start: Point, goal: Point, blocked: &HashSet<Point>) -> Vec<Point> {
    if start == goal || !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return Vec::new();
    }

    let map = PathGrid {
        grid,
        blocked,
        goal,
    };
    let start_idx = map.point2d_to_index(start);
    let goal_idx = map.point2d_to_index(goal);
    let heuristic = |idx: usize| map.get_pathing_distance(idx, goal_idx) as u32;

    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<usize, u32> = HashMap::new();
    let mut came_from: HashMap<usize, usize> = HashMap::new();
    let mut seq = 0u64;

    g_score.insert(start_idx, 0);
    open.push(Reverse(OpenNode {
        f: heuristic(start_idx),
        seq,
        g: 0,
        idx: start_idx,
    }));

    while let Some(Reverse(node)) = open.pop() {
        if node.idx == goal_idx {
            return reconstruct(&map, &came_from, start_idx, goal_idx);
        }
        if g_score.get(&node.idx).is_some_and(|best| node.g > *best) {
            continue;
        }
        for (next, cost) in map.get_available_exits(node.idx) {
            let tentative = node.g + cost as u32;
            if g_score.get(&next).is_none_or(|best| tentative < *best) {
                g_score.insert(next, tentative);
                came_from.insert(next, node.idx);
                seq += 1;
                open.push(Reverse(OpenNode {
                    f: tentative + heuristic(next),
                    seq,
                    g: tentative,
                    idx: next,
                }));
            }
        }
    }

    Vec::new()
}

fn reconstruct(
    map: &PathGrid<'_>,
    came_from: &HashMap<usize, usize>,
    start_idx: usize,
    goal_idx: usize,
) -> Vec<Point> {
    let mut steps = Vec::new();
    let mut current = goal_idx;
    while current != start_idx {
        steps.push(map.index_to_point2d(current));
        match came_from.get(&current) {
            Some(previous) => current = *previous,
            None => return Vec::new(),
        }
    }
    steps.reverse();
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_start_and_goal_is_empty() {
        let grid = TileGrid::open(5, 5);
        assert!(path(&grid, Point::new(2, 2), Point::new(2, 2), &HashSet::new()).is_empty());
    }

    #[test]
    fn path_excludes_start_and_ends_on_goal() {
        let grid = TileGrid::open(6, 3);
        let steps = path(&grid, Point::new(0, 1), Point::new(4, 1), &HashSet::new());
        assert_eq!(steps.len(), 4);
        assert_eq!(steps.last(), Some(&Point::new(4, 1)));
        assert!(!steps.contains(&Point::new(0, 1)));
    }

    #[test]
    fn routes_around_walls() {
        let grid = TileGrid::from_rows(&[".....", ".###.", "....."]);
        let steps = path(&grid, Point::new(0, 1), Point::new(4, 1), &HashSet::new());
        assert_eq!(steps.len(), 6);
        assert!(steps.iter().all(|p| grid.is_floor(*p)));
    }

    #[test]
    fn blocked_tiles_are_avoided_but_goal_is_not() {
        let grid = TileGrid::from_rows(&["....."]);
        let blocked: HashSet<Point> = [Point::new(2, 0)].into_iter().collect();
        assert!(path(&grid, Point::new(0, 0), Point::new(4, 0), &blocked).is_empty());

        let goal_blocked: HashSet<Point> = [Point::new(4, 0)].into_iter().collect();
        let steps = path(&grid, Point::new(0, 0), Point::new(4, 0), &goal_blocked);
        assert_eq!(steps.last(), Some(&Point::new(4, 0)));
    }

    #[test]
    fn unreachable_goal_is_empty() {
        let grid = TileGrid::from_rows(&["..#.."]);
        assert!(path(&grid, Point::new(0, 0), Point::new(4, 0), &HashSet::new()).is_empty());
    }

    #[test]
    fn identical_queries_give_identical_paths() {
        let grid = TileGrid::open(12, 12);
        let a = path(&grid, Point::new(1, 1), Point::new(9, 7), &HashSet::new());
        let b = path(&grid, Point::new(1, 1), Point::new(9, 7), &HashSet::new());
        assert_eq!(a, b);
    }
}
