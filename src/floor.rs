use std::collections::HashSet;

use bracket_geometry::prelude::Point;
use bracket_random::prelude::RandomNumberGenerator;
use indexmap::IndexMap;

use crate::data::items::{Item, StockEntry};
use crate::data::monsters::{BOSS_XP_REWARD, EnemyTemplate};
use crate::data::{Content, Theme, ambient_terminal, pick_weighted, shuffle};
use crate::effects::ActiveEffects;
use crate::effects::hazards::{Hazard, TRAP_WEIGHTS};
use crate::entity::{Enemy, Player, Terminal};
use crate::map::{Room, TileGrid, generate, sample_floor_points, sample_points};

pub const ITEMS_PER_FLOOR: usize = 6;
pub const TERMINALS_PER_FLOOR: usize = 2;
pub const MAX_SPECIAL_ROOMS: usize = 2;
pub const SHOP_STOCK_SIZE: usize = 7;
pub const VAULT_COST: i32 = 50;

/// Stat multiplier for enemies spawned on `floor`: +20% per floor below the
/// first.
pub fn floor_scale(floor: u32) -> f64 {
    1.0 + floor.saturating_sub(1) as f64 * 0.2
}

pub fn scaled(base: i32, scale: f64) -> i32 {
    (base as f64 * scale).round() as i32
}

pub fn spawn_enemy(template: &EnemyTemplate, floor: u32) -> Enemy {
    let scale = floor_scale(floor);
    let hp = scaled(template.hp, scale).max(1);
    Enemy {
        name: template.name.clone(),
        glyph: template.glyph,
        hp,
        max_hp: hp,
        attack: scaled(template.attack, scale).max(1),
        defense: scaled(template.defense, scale),
        xp_reward: scaled(template.xp, scale),
        behavior: template.behavior,
        cooldown: 0,
        boss: false,
        effects: ActiveEffects::default(),
    }
}

pub fn spawn_boss(template: &EnemyTemplate, floor: u32) -> Enemy {
    Enemy {
        xp_reward: BOSS_XP_REWARD,
        boss: true,
        ..spawn_enemy(template, floor)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpecialKind {
    Shop,
    Armory,
    Medbay,
    TerminalHub,
    Vault,
}

impl SpecialKind {
    pub const ALL: [SpecialKind; 5] = [
        SpecialKind::Shop,
        SpecialKind::Armory,
        SpecialKind::Medbay,
        SpecialKind::TerminalHub,
        SpecialKind::Vault,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialKind::Shop => "shop",
            SpecialKind::Armory => "armory",
            SpecialKind::Medbay => "medbay",
            SpecialKind::TerminalHub => "terminal hub",
            SpecialKind::Vault => "vault",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpecialRoom {
    pub kind: SpecialKind,
    /// Row-major.
    pub tiles: Vec<Point>,
    pub triggered: bool,
    pub stock: Vec<StockEntry>,
}

impl SpecialRoom {
    pub fn contains(&self, point: Point) -> bool {
        self.tiles.contains(&point)
    }
}

/// Everything a floor needs to know about its place in the site.
#[derive(Clone, Debug, PartialEq)]
pub struct FloorPlan {
    pub number: u32,
    pub theme: Theme,
    pub density: f64,
    pub is_final: bool,
    pub place_boss: bool,
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Debug)]
pub struct Floor {
    pub number: u32,
    pub theme: Theme,
    pub grid: TileGrid,
    pub rooms: Vec<Room>,
    pub start: Point,
    pub stair_up: Point,
    pub stair_down: Option<Point>,
    pub items: IndexMap<Point, Item>,
    pub enemies: IndexMap<Point, Enemy>,
    pub terminals: IndexMap<Point, Terminal>,
    pub hazards: IndexMap<Point, Hazard>,
    pub special_rooms: Vec<SpecialRoom>,
    pub explored: HashSet<Point>,
}

impl Floor {
    pub fn special_room_at(&self, point: Point) -> Option<usize> {
        self.special_rooms.iter().position(|room| room.contains(point))
    }

    pub fn has_boss(&self) -> bool {
        self.enemies.values().any(|enemy| enemy.boss)
    }

    fn free_room_tiles(&self, room: usize, except: Point) -> Vec<Point> {
        self.special_rooms[room]
            .tiles
            .iter()
            .copied()
            .filter(|tile| {
                *tile != except
                    && !self.items.contains_key(tile)
                    && !self.enemies.contains_key(tile)
                    && !self.terminals.contains_key(tile)
            })
            .collect()
    }

    /// Fires the one-time effect of the special room containing `pos`, if it
    /// has not gone off yet.
    pub fn enter_special_room(
        &mut self,
        pos: Point,
        player: &mut Player,
        content: &Content,
        rng: &mut RandomNumberGenerator,
    ) -> Vec<String> {
        let mut messages = Vec::new();
        let Some(idx) = self.special_room_at(pos) else {
            return messages;
        };
        if self.special_rooms[idx].triggered {
            return messages;
        }
        self.special_rooms[idx].triggered = true;
        let mut free = self.free_room_tiles(idx, pos);

        match self.special_rooms[idx].kind {
            SpecialKind::Shop => messages.push("SUPPLY DEPOT: [T] to trade.".to_string()),
            SpecialKind::Armory => {
                let gear: Vec<&Item> = content
                    .items
                    .iter()
                    .filter(|item| !item.is_consumable())
                    .collect();
                self.stock_tiles(&mut free, 3, &gear, rng);
                messages.push("ARMORY: equipment available.".to_string());
            }
            SpecialKind::Medbay => {
                player.hp = player.max_hp;
                let heals: Vec<&Item> = content
                    .items
                    .iter()
                    .filter(|item| item.is_consumable())
                    .collect();
                self.stock_tiles(&mut free, 2, &heals, rng);
                messages.push("MED BAY: HP restored. Supplies found.".to_string());
            }
            SpecialKind::TerminalHub => {
                let spots = sample_points(&mut free, 3, rng);
                for (i, spot) in spots.into_iter().enumerate() {
                    let terminal = if i == 0 && !content.lore.is_empty() {
                        content.lore[rng.range(0, content.lore.len() as i32) as usize].to_terminal()
                    } else {
                        ambient_terminal(self.number, rng)
                    };
                    self.terminals.insert(spot, terminal);
                }
                messages.push("TERMINAL HUB: data nodes online.".to_string());
            }
            SpecialKind::Vault => {
                if player.credits >= VAULT_COST {
                    player.credits -= VAULT_COST;
                    let rare: Vec<&Item> =
                        content.items.iter().filter(|item| item.is_rare()).collect();
                    self.stock_tiles(&mut free, 4, &rare, rng);
                    messages.push(format!("VAULT OPENED (-{VAULT_COST} cr). Rare gear inside."));
                } else {
                    self.special_rooms[idx].triggered = false;
                    messages.push(format!("Vault locked: {VAULT_COST} cr required."));
                }
            }
        }
        log::debug!(
            "floor {}: {} room triggered",
            self.number,
            self.special_rooms[idx].kind.as_str()
        );
        messages
    }

    fn stock_tiles(
        &mut self,
        free: &mut Vec<Point>,
        count: usize,
        pool: &[&Item],
        rng: &mut RandomNumberGenerator,
    ) {
        if pool.is_empty() {
            return;
        }
        for spot in sample_points(free, count, rng) {
            let item = pool[rng.range(0, pool.len() as i32) as usize].clone();
            self.items.insert(spot, item);
        }
    }
}

fn hazard_count(floor: u32, rng: &mut RandomNumberGenerator) -> usize {
    match floor {
        0..=2 => 0,
        3..=5 => rng.range(0, 3) as usize,
        _ => rng.range(1, 4) as usize,
    }
}

pub fn make_floor(plan: &FloorPlan, content: &Content, rng: &mut RandomNumberGenerator) -> Floor {
    let layout = generate(plan.width, plan.height, &plan.theme.layout, rng);
    let start = layout.start();
    let stair_up = start;
    let stair_down = if plan.is_final {
        None
    } else {
        Some(layout.rooms.last().map(|room| room.center()).unwrap_or(start))
    };

    let mut exclude: HashSet<Point> = HashSet::new();
    exclude.insert(start);
    exclude.extend(stair_down);

    let mut enemies = IndexMap::new();
    let enemy_count = ((3 + 2 * plan.number) as f64 * plan.density) as usize;
    if enemy_count > 0 {
        for pos in sample_floor_points(&layout.grid, enemy_count, &exclude, rng) {
            let Some(pick) = pick_weighted(&plan.theme.weights, rng) else {
                continue;
            };
            if let Some(template) = content.enemies.get(pick) {
                enemies.insert(pos, spawn_enemy(template, plan.number));
            }
        }
    }

    if plan.place_boss {
        if let Some(room) = layout.rooms.last() {
            let boss_pos = room.center();
            enemies.insert(boss_pos, spawn_boss(&content.boss, plan.number));
            exclude.insert(boss_pos);
            log::info!("boss placed on floor {} at {},{}", plan.number, boss_pos.x, boss_pos.y);
        }
    }

    let mut taken = exclude.clone();
    taken.extend(enemies.keys().copied());

    let mut items = IndexMap::new();
    if !content.items.is_empty() {
        for pos in sample_floor_points(&layout.grid, ITEMS_PER_FLOOR, &taken, rng) {
            let item = content.items[rng.range(0, content.items.len() as i32) as usize].clone();
            items.insert(pos, item);
        }
    }
    taken.extend(items.keys().copied());

    let mut terminals = IndexMap::new();
    for (i, pos) in sample_floor_points(&layout.grid, TERMINALS_PER_FLOOR, &taken, rng)
        .into_iter()
        .enumerate()
    {
        let terminal = if i % 2 == 0 && !content.lore.is_empty() {
            content.lore[rng.range(0, content.lore.len() as i32) as usize].to_terminal()
        } else {
            ambient_terminal(plan.number, rng)
        };
        terminals.insert(pos, terminal);
    }

    let special_rooms = place_special_rooms(&layout.grid, &layout.rooms, plan, content, rng);
    let safe: HashSet<Point> = special_rooms
        .iter()
        .flat_map(|room| room.tiles.iter().copied())
        .collect();
    enemies.retain(|pos, _| !safe.contains(pos));
    items.retain(|pos, _| !safe.contains(pos));
    terminals.retain(|pos, _| !safe.contains(pos));

    let mut hazard_exclude = exclude;
    hazard_exclude.extend(enemies.keys().copied());
    hazard_exclude.extend(items.keys().copied());
    hazard_exclude.extend(safe.iter().copied());
    let mut hazards = IndexMap::new();
    let count = hazard_count(plan.number, rng);
    let weights: Vec<u32> = TRAP_WEIGHTS.iter().map(|(_, weight)| *weight).collect();
    for pos in sample_floor_points(&layout.grid, count, &hazard_exclude, rng) {
        if let Some(pick) = pick_weighted(&weights, rng) {
            hazards.insert(pos, Hazard::trap(TRAP_WEIGHTS[pick].0));
        }
    }

    log::debug!(
        "floor {} ({}): {} rooms, {} enemies, {} items, {} terminals, {} hazards, {} special rooms",
        plan.number,
        plan.theme.name,
        layout.rooms.len(),
        enemies.len(),
        items.len(),
        terminals.len(),
        hazards.len(),
        special_rooms.len()
    );

    Floor {
        number: plan.number,
        theme: plan.theme.clone(),
        grid: layout.grid,
        rooms: layout.rooms,
        start,
        stair_up,
        stair_down,
        items,
        enemies,
        terminals,
        hazards,
        special_rooms,
        explored: HashSet::new(),
    }
}

fn place_special_rooms(
    grid: &TileGrid,
    rooms: &[Room],
    plan: &FloorPlan,
    content: &Content,
    rng: &mut RandomNumberGenerator,
) -> Vec<SpecialRoom> {
    if plan.is_final || rooms.len() < 3 {
        return Vec::new();
    }
    let interior = &rooms[1..rooms.len() - 1];
    let mut order: Vec<usize> = (0..interior.len()).collect();
    shuffle(&mut order, rng);
    order.truncate(MAX_SPECIAL_ROOMS);

    let mut pool: Vec<SpecialKind> = SpecialKind::ALL
        .into_iter()
        .filter(|kind| plan.number > 3 || *kind != SpecialKind::Vault)
        .collect();
    shuffle(&mut pool, rng);

    order
        .into_iter()
        .enumerate()
        .map(|(i, room_idx)| {
            let kind = pool[i % pool.len()];
            let tiles: Vec<Point> = interior[room_idx]
                .points()
                .into_iter()
                .filter(|point| grid.is_floor(*point))
                .collect();
            let stock = if kind == SpecialKind::Shop {
                let mut entries = content.shop_stock.clone();
                shuffle(&mut entries, rng);
                entries.truncate(SHOP_STOCK_SIZE);
                entries
            } else {
                Vec::new()
            };
            SpecialRoom {
                kind,
                tiles,
                triggered: false,
                stock,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::monsters::{boss_template, builtin_enemies};

    fn plan(number: u32, content: &Content) -> FloorPlan {
        FloorPlan {
            number,
            theme: content.theme_for(number).clone(),
            density: 1.0,
            is_final: false,
            place_boss: false,
            width: 80,
            height: 40,
        }
    }

    #[test]
    fn drone_scales_with_depth() {
        let drone = spawn_enemy(&builtin_enemies()[0], 3);
        assert_eq!(drone.hp, 11);
        assert_eq!(drone.max_hp, 11);
        assert_eq!(drone.attack, 4);
        assert_eq!(drone.defense, 0);
    }

    #[test]
    fn first_floor_is_unscaled() {
        let brute = spawn_enemy(&builtin_enemies()[5], 1);
        assert_eq!((brute.hp, brute.attack, brute.defense, brute.xp_reward), (35, 10, 3, 60));
    }

    #[test]
    fn tiny_templates_keep_one_hp_and_attack() {
        let template = EnemyTemplate::new("Mote", 'm', 0, 0, 0, 0, Default::default());
        let mote = spawn_enemy(&template, 5);
        assert_eq!(mote.hp, 1);
        assert_eq!(mote.attack, 1);
    }

    #[test]
    fn boss_keeps_fixed_xp() {
        let boss = spawn_boss(&boss_template(), 10);
        assert!(boss.boss);
        assert_eq!(boss.xp_reward, BOSS_XP_REWARD);
        assert_eq!(boss.hp, scaled(100, floor_scale(10)));
    }

    #[test]
    fn population_avoids_stairs_and_special_rooms() {
        let content = Content::builtin();
        for seed in 0..20 {
            let mut rng = RandomNumberGenerator::seeded(seed);
            let floor = make_floor(&plan(5, &content), &content, &mut rng);
            let stairs = [Some(floor.start), floor.stair_down];
            for pos in floor.enemies.keys().chain(floor.items.keys()) {
                assert!(!stairs.contains(&Some(*pos)));
                assert!(floor.special_room_at(*pos).is_none());
                assert!(floor.grid.is_floor(*pos));
            }
            for pos in floor.hazards.keys() {
                assert!(!floor.enemies.contains_key(pos));
                assert!(!floor.items.contains_key(pos));
            }
            assert!(floor.special_rooms.len() <= MAX_SPECIAL_ROOMS);
        }
    }

    #[test]
    fn shallow_floors_have_no_hazards_or_vaults() {
        let content = Content::builtin();
        for seed in 0..20 {
            let mut rng = RandomNumberGenerator::seeded(seed);
            let floor = make_floor(&plan(2, &content), &content, &mut rng);
            assert!(floor.hazards.is_empty());
            assert!(floor.special_rooms.iter().all(|room| room.kind != SpecialKind::Vault));
        }
    }

    #[test]
    fn final_boss_floor_has_boss_and_no_stairs_down() {
        let content = Content::builtin();
        let mut rng = RandomNumberGenerator::seeded(42);
        let mut boss_plan = plan(10, &content);
        boss_plan.is_final = true;
        boss_plan.place_boss = true;
        let floor = make_floor(&boss_plan, &content, &mut rng);
        assert!(floor.stair_down.is_none());
        assert!(floor.special_rooms.is_empty());
        let last = floor.rooms.last().unwrap().center();
        assert!(floor.enemies[&last].boss);
    }

    #[test]
    fn zero_density_spawns_nobody() {
        let content = Content::builtin();
        let mut rng = RandomNumberGenerator::seeded(3);
        let mut empty = plan(1, &content);
        empty.density = 0.0;
        assert!(make_floor(&empty, &content, &mut rng).enemies.is_empty());
    }

    #[test]
    fn locked_vault_stays_armed() {
        let content = Content::builtin();
        let mut rng = RandomNumberGenerator::seeded(4);
        let mut floor = make_floor(&plan(1, &content), &content, &mut rng);
        let tiles: Vec<Point> = floor.rooms[1].points();
        floor.special_rooms = vec![SpecialRoom {
            kind: SpecialKind::Vault,
            tiles: tiles.clone(),
            triggered: false,
            stock: Vec::new(),
        }];
        let mut player = Player::default();
        let messages = floor.enter_special_room(tiles[0], &mut player, &content, &mut rng);
        assert!(messages[0].contains("locked"));
        assert!(!floor.special_rooms[0].triggered);

        player.credits = 60;
        let before = floor.items.len();
        floor.enter_special_room(tiles[0], &mut player, &content, &mut rng);
        assert!(floor.special_rooms[0].triggered);
        assert_eq!(player.credits, 10);
        assert!(floor.items.len() > before);
    }
}
