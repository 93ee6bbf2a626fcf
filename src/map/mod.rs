pub mod fov;
pub mod pathfinding;

use std::collections::HashSet;

use bracket_geometry::prelude::{Point, Rect};
use bracket_random::prelude::RandomNumberGenerator;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAP_WIDTH: i32 = 80;
pub const DEFAULT_MAP_HEIGHT: i32 = 40;

/// Room padding used when rejecting overlapping candidates.
pub const ROOM_PADDING: i32 = 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum TileKind {
    #[default]
    Wall,
    Floor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub width: i32,
    pub height: i32,
    tiles: Vec<TileKind>,
}

impl TileGrid {
    pub fn filled(width: i32, height: i32) -> Self {
        let size = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            tiles: vec![TileKind::Wall; size],
        }
    }

    /// An all-floor grid, mostly useful for scenario setups.
    pub fn open(width: i32, height: i32) -> Self {
        let mut grid = Self::filled(width, height);
        grid.tiles.iter_mut().for_each(|tile| *tile = TileKind::Floor);
        grid
    }

    /// Builds a grid from rows of `#` (wall) and anything else (floor).
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as i32;
        let width = rows.iter().map(|row| row.len()).max().unwrap_or(0) as i32;
        let mut grid = Self::filled(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch != '#' {
                    grid.set(Point::new(x as i32, y as i32), TileKind::Floor);
                }
            }
        }
        grid
    }

    fn idx(&self, point: Point) -> Option<usize> {
        if self.in_bounds(point) {
            Some((point.y * self.width + point.x) as usize)
        } else {
            None
        }
    }

    pub fn in_bounds(&self, point: Point) -> bool {
        point.x >= 0 && point.x < self.width && point.y >= 0 && point.y < self.height
    }

    /// Out-of-bounds cells read as walls.
    pub fn kind(&self, point: Point) -> TileKind {
        self.idx(point)
            .map(|idx| self.tiles[idx])
            .unwrap_or(TileKind::Wall)
    }

    pub fn is_floor(&self, point: Point) -> bool {
        self.kind(point) == TileKind::Floor
    }

    pub fn is_wall(&self, point: Point) -> bool {
        self.kind(point) == TileKind::Wall
    }

    pub fn set(&mut self, point: Point, kind: TileKind) {
        if let Some(idx) = self.idx(point) {
            self.tiles[idx] = kind;
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2, self.height / 2)
    }

    /// Floor cells in row-major order.
    pub fn floor_points(&self) -> Vec<Point> {
        let mut points = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let point = Point::new(x, y);
                if self.is_floor(point) {
                    points.push(point);
                }
            }
        }
        points
    }

    pub fn floor_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|tile| **tile == TileKind::Floor)
            .count()
    }

    fn carve_horizontal(&mut self, x1: i32, x2: i32, y: i32) {
        for x in x1.min(x2)..=x1.max(x2) {
            self.set(Point::new(x, y), TileKind::Floor);
        }
    }

    fn carve_vertical(&mut self, y1: i32, y2: i32, x: i32) {
        for y in y1.min(y2)..=y1.max(y2) {
            self.set(Point::new(x, y), TileKind::Floor);
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Room {
    pub rect: Rect,
}

impl Room {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            rect: Rect::with_size(x, y, width, height),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.rect.x1 + self.rect.x2) / 2,
            (self.rect.y1 + self.rect.y2) / 2,
        )
    }

    pub fn intersects(&self, other: &Room, pad: i32) -> bool {
        self.rect.x1 - pad < other.rect.x2
            && self.rect.x2 + pad > other.rect.x1
            && self.rect.y1 - pad < other.rect.y2
            && self.rect.y2 + pad > other.rect.y1
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.rect.x1
            && point.x < self.rect.x2
            && point.y >= self.rect.y1
            && point.y < self.rect.y2
    }

    /// Interior cells; `x2`/`y2` are exclusive.
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::new();
        for y in self.rect.y1..self.rect.y2 {
            for x in self.rect.x1..self.rect.x2 {
                points.push(Point::new(x, y));
            }
        }
        points
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenParams {
    pub max_rooms: usize,
    pub min_room_w: i32,
    pub max_room_w: i32,
    pub min_room_h: i32,
    pub max_room_h: i32,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            max_rooms: 30,
            min_room_w: 5,
            max_room_w: 12,
            min_room_h: 4,
            max_room_h: 9,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Layout {
    pub grid: TileGrid,
    /// Acceptance order: `rooms[0]` is the start room, the last room holds the
    /// down stairs or the boss.
    pub rooms: Vec<Room>,
}

impl Layout {
    pub fn start(&self) -> Point {
        self.rooms
            .first()
            .map(|room| room.center())
            .unwrap_or_else(|| self.grid.center())
    }
}

pub fn generate(
    width: i32,
    height: i32,
    params: &GenParams,
    rng: &mut RandomNumberGenerator,
) -> Layout {
    let mut grid = TileGrid::filled(width, height);
    let mut rooms: Vec<Room> = Vec::new();

    for _ in 0..params.max_rooms {
        let room_w = rng.range(params.min_room_w, params.max_room_w + 1);
        let room_h = rng.range(params.min_room_h, params.max_room_h + 1);
        let x_max = width - room_w - 1;
        let y_max = height - room_h - 1;
        if x_max < 1 || y_max < 1 {
            continue;
        }
        let candidate = Room::new(rng.range(1, x_max + 1), rng.range(1, y_max + 1), room_w, room_h);

        if rooms
            .iter()
            .any(|room| candidate.intersects(room, ROOM_PADDING))
        {
            continue;
        }

        for point in candidate.points() {
            grid.set(point, TileKind::Floor);
        }

        if let Some(previous) = rooms.last() {
            let new_center = candidate.center();
            let prev_center = previous.center();
            if rng.range(0, 2) == 0 {
                grid.carve_horizontal(new_center.x, prev_center.x, new_center.y);
                grid.carve_vertical(new_center.y, prev_center.y, prev_center.x);
            } else {
                grid.carve_vertical(new_center.y, prev_center.y, new_center.x);
                grid.carve_horizontal(new_center.x, prev_center.x, prev_center.y);
            }
        }

        rooms.push(candidate);
    }

    log::debug!(
        "generated {}x{} layout: {} rooms accepted of {} attempts, {} floor tiles",
        width,
        height,
        rooms.len(),
        params.max_rooms,
        grid.floor_count()
    );

    Layout { grid, rooms }
}

/// Uniform sample without replacement over floor tiles not in `exclude`.
/// Asking for more tiles than exist returns every candidate.
pub fn sample_floor_points(
    grid: &TileGrid,
    count: usize,
    exclude: &HashSet<Point>,
    rng: &mut RandomNumberGenerator,
) -> Vec<Point> {
    let mut candidates: Vec<Point> = grid
        .floor_points()
        .into_iter()
        .filter(|point| !exclude.contains(point))
        .collect();
    sample_points(&mut candidates, count, rng)
}

pub fn sample_points(
    candidates: &mut Vec<Point>,
    count: usize,
    rng: &mut RandomNumberGenerator,
) -> Vec<Point> {
    let take = count.min(candidates.len());
    let mut chosen = Vec::with_capacity(take);
    for _ in 0..take {
        let idx = rng.range(0, candidates.len() as i32) as usize;
        chosen.push(candidates.swap_remove(idx));
    }
    chosen
}

pub fn manhattan(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

pub const CARDINALS: [Point; 4] = [
    Point { x: 0, y: -1 },
    Point { x: 0, y: 1 },
    Point { x: -1, y: 0 },
    Point { x: 1, y: 0 },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooms_never_overlap_with_padding() {
        let mut rng = RandomNumberGenerator::seeded(7);
        let layout = generate(80, 40, &GenParams::default(), &mut rng);
        assert!(!layout.rooms.is_empty());
        for (i, a) in layout.rooms.iter().enumerate() {
            for b in layout.rooms.iter().skip(i + 1) {
                assert!(!a.intersects(b, ROOM_PADDING), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn rooms_are_carved_inside_the_border() {
        let mut rng = RandomNumberGenerator::seeded(99);
        let layout = generate(80, 40, &GenParams::default(), &mut rng);
        for room in &layout.rooms {
            for point in room.points() {
                assert!(layout.grid.is_floor(point));
            }
        }
        for x in 0..80 {
            assert!(layout.grid.is_wall(Point::new(x, 0)));
            assert!(layout.grid.is_wall(Point::new(x, 39)));
        }
    }

    #[test]
    fn zero_rooms_leaves_a_solid_map() {
        let mut rng = RandomNumberGenerator::seeded(1);
        let params = GenParams {
            max_rooms: 0,
            ..GenParams::default()
        };
        let layout = generate(80, 40, &params, &mut rng);
        assert!(layout.rooms.is_empty());
        assert_eq!(layout.grid.floor_count(), 0);
        assert_eq!(layout.start(), Point::new(40, 20));
    }

    #[test]
    fn oversized_rooms_are_skipped_not_panicking() {
        let mut rng = RandomNumberGenerator::seeded(3);
        let params = GenParams {
            max_rooms: 5,
            min_room_w: 20,
            max_room_w: 30,
            min_room_h: 20,
            max_room_h: 30,
        };
        let layout = generate(10, 10, &params, &mut rng);
        assert!(layout.rooms.is_empty());
    }

    #[test]
    fn sampling_clamps_to_available_tiles() {
        let mut rng = RandomNumberGenerator::seeded(5);
        let grid = TileGrid::from_rows(&["#####", "#...#", "#####"]);
        let exclude: HashSet<Point> = [Point::new(1, 1)].into_iter().collect();
        let picked = sample_floor_points(&grid, 10, &exclude, &mut rng);
        assert_eq!(picked.len(), 2);
        assert!(!picked.contains(&Point::new(1, 1)));
    }

    #[test]
    fn padding_rejects_touching_rooms() {
        let a = Room::new(1, 1, 4, 4);
        let b = Room::new(5, 1, 4, 4);
        assert!(!a.intersects(&b, 0));
        assert!(a.intersects(&b, 1));
    }
}
