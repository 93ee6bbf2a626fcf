use bracket_geometry::prelude::Point;
use erebus::map::fov::visible;
use erebus::map::{TileGrid, TileKind};
use proptest::prelude::*;

const W: i32 = 24;
const H: i32 = 16;

fn grid_with_walls(walls: &[(i32, i32)]) -> TileGrid {
    let mut grid = TileGrid::open(W, H);
    for (x, y) in walls {
        grid.set(Point::new(*x, *y), TileKind::Wall);
    }
    grid
}

proptest! {
    #[test]
    fn larger_radius_never_sees_less(
        walls in prop::collection::vec((0..W, 0..H), 0..80),
        ox in 0..W,
        oy in 0..H,
        radius in 0..10i32,
    ) {
        let grid = grid_with_walls(&walls);
        let origin = Point::new(ox, oy);
        let near = visible(&grid, origin, radius);
        let far = visible(&grid, origin, radius + 1);
        prop_assert!(near.is_subset(&far));
    }

    #[test]
    fn everything_seen_lies_inside_the_disc(
        walls in prop::collection::vec((0..W, 0..H), 0..80),
        ox in 0..W,
        oy in 0..H,
        radius in 0..10i32,
    ) {
        let grid = grid_with_walls(&walls);
        let origin = Point::new(ox, oy);
        let seen = visible(&grid, origin, radius);
        prop_assert!(seen.contains(&origin));
        for point in &seen {
            let (dx, dy) = (point.x - ox, point.y - oy);
            prop_assert!(dx * dx + dy * dy <= radius * radius);
            prop_assert!(grid.in_bounds(*point));
        }
    }
}

#[test]
fn open_room_is_fully_visible_within_radius() {
    let grid = TileGrid::open(W, H);
    let origin = Point::new(10, 8);
    let seen = visible(&grid, origin, 5);
    for y in 0..H {
        for x in 0..W {
            let (dx, dy) = (x - origin.x, y - origin.y);
            let inside = dx * dx + dy * dy <= 25;
            assert_eq!(seen.contains(&Point::new(x, y)), inside, "{x},{y}");
        }
    }
}

#[test]
fn walls_block_but_stay_visible() {
    let grid = TileGrid::from_rows(&["....#....."]);
    let seen = visible(&grid, Point::new(0, 0), 8);
    assert!(seen.contains(&Point::new(3, 0)));
    assert!(seen.contains(&Point::new(4, 0)));
    assert!(!seen.contains(&Point::new(5, 0)));
    assert!(!seen.contains(&Point::new(8, 0)));
}

#[test]
fn pillar_casts_a_shadow() {
    let grid = TileGrid::from_rows(&[
        "..........",
        "..........",
        "..#.......",
        "..........",
        "..........",
    ]);
    let seen = visible(&grid, Point::new(0, 2), 9);
    assert!(seen.contains(&Point::new(2, 2)));
    assert!(!seen.contains(&Point::new(3, 2)));
    assert!(!seen.contains(&Point::new(7, 2)));
    assert!(seen.contains(&Point::new(2, 0)));
}

/// Rays are traced from each observer independently, so sight is not
/// mutual. From (2,1) the ray to (0,0) passes (1,1); from (0,0) every ray
/// toward (2,1) passes the wall at (1,0).
#[test]
fn sight_is_not_symmetric() {
    let grid = TileGrid::from_rows(&[".#..", "....", "...."]);
    let a = Point::new(0, 0);
    let b = Point::new(2, 1);
    assert!(visible(&grid, b, 5).contains(&a));
    assert!(!visible(&grid, a, 5).contains(&b));
}
