use std::collections::BTreeMap;

use bracket_random::prelude::RandomNumberGenerator;

use crate::data::{Content, Theme, ThemeStyle};
use crate::entity::Player;
use crate::floor::{Floor, FloorPlan, make_floor};

/// A multi-floor location. Floors are generated on first visit and kept, so
/// anything done to a floor survives leaving and coming back.
#[derive(Clone, Debug)]
pub struct Site {
    pub name: String,
    pub glyph: char,
    pub description: String,
    pub depth: u32,
    pub fuel_cost: i32,
    pub density: f64,
    pub style: ThemeStyle,
    /// The final floor holds the boss.
    pub hosts_boss: bool,
    /// Deep floors erode the player's mind.
    pub signal_corruption: bool,
    pub cleared: bool,
    floors: BTreeMap<u32, Floor>,
}

impl Site {
    pub fn new(name: &str, glyph: char, description: &str, depth: u32, fuel_cost: i32) -> Self {
        Self {
            name: name.to_string(),
            glyph,
            description: description.to_string(),
            depth: depth.max(1),
            fuel_cost,
            density: 1.0,
            style: ThemeStyle::Station,
            hosts_boss: false,
            signal_corruption: false,
            cleared: false,
            floors: BTreeMap::new(),
        }
    }

    pub fn theme(&self, content: &Content, floor: u32) -> Theme {
        self.style.resolve(content, floor)
    }

    pub fn plan(&self, content: &Content, floor: u32, width: i32, height: i32) -> FloorPlan {
        let is_final = floor >= self.depth;
        FloorPlan {
            number: floor,
            theme: self.theme(content, floor),
            density: self.density,
            is_final,
            place_boss: is_final && self.hosts_boss,
            width,
            height,
        }
    }

    pub fn is_generated(&self, floor: u32) -> bool {
        self.floors.contains_key(&floor)
    }

    /// Moves a floor out of the cache for active play; hand it back with
    /// [`Site::store_floor`].
    pub fn take_floor(
        &mut self,
        floor: u32,
        content: &Content,
        size: (i32, i32),
        rng: &mut RandomNumberGenerator,
    ) -> Floor {
        match self.floors.remove(&floor) {
            Some(cached) => cached,
            None => self.generate_floor(floor, content, size, rng),
        }
    }

    pub fn store_floor(&mut self, floor: Floor) {
        self.floors.insert(floor.number, floor);
    }

    fn generate_floor(
        &self,
        floor: u32,
        content: &Content,
        size: (i32, i32),
        rng: &mut RandomNumberGenerator,
    ) -> Floor {
        log::info!("{}: generating floor {}", self.name, floor);
        make_floor(&self.plan(content, floor, size.0, size.1), content, rng)
    }

    pub fn travel_cost(&self, player: &Player) -> i32 {
        (self.fuel_cost - player.fuel_discount()).max(0)
    }
}

pub fn builtin_sites() -> Vec<Site> {
    vec![
        Site {
            hosts_boss: true,
            signal_corruption: true,
            ..Site::new(
                "Erebus Station",
                'E',
                "ISC research station. Origin of the signal.",
                10,
                0,
            )
        },
        Site {
            density: 0.0,
            style: ThemeStyle::Frontier,
            ..Site::new("Frontier Town", 'T', "Rough settlement. Supplies available.", 1, 1)
        },
        Site {
            density: 1.4,
            style: ThemeStyle::Calyx,
            ..Site::new(
                "Wreck: ISC Calyx",
                'W',
                "Drifting hulk. Security drones still active.",
                4,
                2,
            )
        },
        Site {
            style: ThemeStyle::Colony,
            ..Site::new("Colony Ruin KE-7", 'C', "Abandoned colony. Something moved in.", 6, 2)
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::player::Skill;

    #[test]
    fn only_the_station_hosts_the_boss() {
        let sites = builtin_sites();
        assert_eq!(sites.iter().filter(|site| site.hosts_boss).count(), 1);
        let content = Content::builtin();
        let plan = sites[0].plan(&content, 10, 80, 40);
        assert!(plan.is_final && plan.place_boss);
        assert!(!sites[0].plan(&content, 9, 80, 40).is_final);
    }

    #[test]
    fn floors_are_generated_once() {
        let content = Content::builtin();
        let mut site = builtin_sites().remove(0);
        let mut rng = RandomNumberGenerator::seeded(12);
        let first = site.take_floor(1, &content, (80, 40), &mut rng);
        let grid = first.grid.clone();
        site.store_floor(first);
        assert!(site.is_generated(1));
        let again = site.take_floor(1, &content, (80, 40), &mut rng);
        assert_eq!(again.grid, grid);
    }

    #[test]
    fn take_and_store_round_trip_keeps_changes() {
        let content = Content::builtin();
        let mut site = builtin_sites().remove(2);
        let mut rng = RandomNumberGenerator::seeded(5);
        let mut floor = site.take_floor(2, &content, (80, 40), &mut rng);
        assert!(!site.is_generated(2));
        floor.enemies.clear();
        site.store_floor(floor);
        let floor = site.take_floor(2, &content, (80, 40), &mut rng);
        assert!(floor.enemies.is_empty());
        assert_eq!(floor.theme.name, "Crew Deck");
    }

    #[test]
    fn pilots_fly_cheaper() {
        let site = builtin_sites().remove(2);
        let mut player = Player::default();
        assert_eq!(site.travel_cost(&player), 2);
        player.skills.set(Skill::Pilot, 4);
        assert_eq!(site.travel_cost(&player), 0);
    }
}
