//! Per-turn visibility: one Bresenham ray from the observer to every cell of
//! the radius disc. Rays are traced independently, so the result is not
//! symmetric (a cell can be seen from `a` while `a` is not seen from it).

use std::collections::HashSet;
use std::iter;

use bracket_geometry::prelude::{Bresenham, Point};

use super::TileGrid;

pub fn visible(grid: &TileGrid, origin: Point, radius: i32) -> HashSet<Point> {
    let mut seen = HashSet::new();
    if !grid.in_bounds(origin) {
        return seen;
    }
    let radius = radius.max(0);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let target = Point::new(origin.x + dx, origin.y + dy);
            if !grid.in_bounds(target) {
                continue;
            }
            trace_ray(grid, origin, target, &mut seen);
        }
    }
    seen
}

fn trace_ray(grid: &TileGrid, origin: Point, target: Point, seen: &mut HashSet<Point>) {
    for point in Bresenham::new(origin, target).chain(iter::once(target)) {
        if !grid.in_bounds(point) {
            break;
        }
        seen.insert(point);
        // The blocking wall itself stays visible.
        if grid.is_wall(point) {
            break;
        }
    }
}
