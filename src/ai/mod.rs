use std::collections::HashSet;

use bracket_geometry::prelude::Point;
use bracket_random::prelude::RandomNumberGenerator;
use indexmap::IndexMap;

use crate::data::monsters::{Behavior, on_hit};
use crate::data::shuffle;
use crate::effects::hazards::{Hazard, trigger_player_mine};
use crate::effects::{Effect, apply, tick};
use crate::entity::{Combatant, Enemy, Player, dodges, hit_damage};
use crate::map::pathfinding::path;
use crate::map::{CARDINALS, TileGrid, manhattan};

/// What every enemy gets to know about the world this turn.
pub struct TurnContext<'a> {
    pub grid: &'a TileGrid,
    pub player_pos: Point,
    /// The player's field of view. An enemy "sees" the player exactly when it
    /// stands inside this set.
    pub visible: &'a HashSet<Point>,
    /// The player stands in smoke; everyone wanders.
    pub player_hidden: bool,
}

struct Turn<'a> {
    grid: &'a TileGrid,
    player_pos: Point,
    visible: &'a HashSet<Point>,
    occupied: HashSet<Point>,
    messages: Vec<String>,
}

impl<'a> Turn<'a> {
    fn sees_player(&self, pos: Point) -> bool {
        self.visible.contains(&pos)
    }

    fn open(&self, point: Point) -> bool {
        self.grid.is_floor(point) && !self.occupied.contains(&point) && point != self.player_pos
    }

    fn relocate(&mut self, from: Point, to: Point) {
        self.occupied.remove(&from);
        self.occupied.insert(to);
    }

    fn random_walk(&mut self, pos: Point, rng: &mut RandomNumberGenerator) -> Point {
        let mut dirs = CARDINALS;
        shuffle(&mut dirs[..], rng);
        for dir in dirs {
            let next = pos + dir;
            if self.open(next) {
                self.relocate(pos, next);
                return next;
            }
        }
        pos
    }

    /// One A* step toward the player. Stepping onto the player is an attack
    /// and leaves the enemy where it stands.
    fn advance(
        &mut self,
        enemy: &Enemy,
        pos: Point,
        player: &mut Player,
        rng: &mut RandomNumberGenerator,
    ) -> (Point, bool) {
        let route = path(self.grid, pos, self.player_pos, &self.occupied);
        let Some(step) = route.first().copied() else {
            return (pos, false);
        };
        if step == self.player_pos {
            self.melee(enemy, pos, player, rng);
            return (pos, true);
        }
        if self.occupied.contains(&step) {
            return (pos, false);
        }
        self.relocate(pos, step);
        (step, false)
    }

    fn melee(
        &mut self,
        enemy: &Enemy,
        pos: Point,
        player: &mut Player,
        rng: &mut RandomNumberGenerator,
    ) {
        if manhattan(pos, self.player_pos) != 1 {
            return;
        }
        self.strike(enemy, player, rng, "attacks", "hits");
    }

    fn strike(
        &mut self,
        enemy: &Enemy,
        player: &mut Player,
        rng: &mut RandomNumberGenerator,
        miss_verb: &str,
        hit_verb: &str,
    ) {
        if dodges(player, rng) {
            self.messages
                .push(format!("{} {miss_verb} you, you dodge!", enemy.name));
            return;
        }
        let damage = hit_damage(enemy.attack, player.defense());
        player.take_damage(damage);
        self.messages
            .push(format!("{} {hit_verb} you for {damage}!", enemy.name));
        if let Some(hit) = on_hit(&enemy.name) {
            if rng.roll_dice(1, 100) <= hit.chance {
                apply(player, hit.effect, hit.turns);
                self.messages.push(format!(
                    "{}'s attack inflicts {}!",
                    enemy.name,
                    hit.effect.as_str()
                ));
            }
        }
    }

    /// Backs away to the adjacent tile farthest from the player, if any is
    /// farther than where the enemy stands.
    fn retreat(&mut self, pos: Point) -> Point {
        let mut best = pos;
        let mut best_dist = manhattan(pos, self.player_pos);
        for dir in CARDINALS {
            let candidate = pos + dir;
            if !self.open(candidate) {
                continue;
            }
            let dist = manhattan(candidate, self.player_pos);
            if dist > best_dist {
                best = candidate;
                best_dist = dist;
            }
        }
        if best != pos {
            self.relocate(pos, best);
        }
        best
    }

    fn act(
        &mut self,
        enemy: &mut Enemy,
        pos: Point,
        player: &mut Player,
        rng: &mut RandomNumberGenerator,
    ) -> Point {
        match enemy.behavior {
            Behavior::Ranged => {
                if !self.sees_player(pos) {
                    return self.random_walk(pos, rng);
                }
                if manhattan(pos, self.player_pos) <= 2 {
                    self.retreat(pos)
                } else {
                    self.strike(enemy, player, rng, "fires at", "fires at");
                    pos
                }
            }
            Behavior::Fast => {
                let mut current = pos;
                for _ in 0..2 {
                    if !self.sees_player(current) {
                        if current == pos {
                            current = self.random_walk(current, rng);
                        }
                        break;
                    }
                    let (next, attacked) = self.advance(enemy, current, player, rng);
                    current = next;
                    if attacked {
                        break;
                    }
                }
                current
            }
            Behavior::Brute => {
                if !self.sees_player(pos) {
                    return self.random_walk(pos, rng);
                }
                if enemy.cooldown > 0 {
                    enemy.cooldown -= 1;
                    return pos;
                }
                enemy.cooldown = 1;
                self.advance(enemy, pos, player, rng).0
            }
            Behavior::Melee | Behavior::Exploder => {
                if self.sees_player(pos) {
                    self.advance(enemy, pos, player, rng).0
                } else {
                    self.random_walk(pos, rng)
                }
            }
        }
    }

    fn destroyed(&mut self, enemy: &Enemy, at: Point, player: &mut Player) {
        self.occupied.remove(&at);
        player.enemies_killed += 1;
        self.messages.push(format!("{} is destroyed.", enemy.name));
        if let Some(splash) = enemy.death_blast(at, self.player_pos) {
            player.take_damage(splash);
            self.messages.push(format!(
                "{} detonates, caught in blast! -{splash} HP!",
                enemy.name
            ));
        } else if enemy.behavior == Behavior::Exploder {
            self.messages.push(format!("{} detonates!", enemy.name));
        }
        if enemy.boss {
            log::info!("{} destroyed at {},{}", enemy.name, at.x, at.y);
        }
    }
}

/// Runs one turn for every enemy in map order. Enemies that die are removed;
/// enemies that move are re-keyed at the end of the map, those that stay keep
/// their place.
pub fn resolve_enemy_turn(
    enemies: &mut IndexMap<Point, Enemy>,
    hazards: &mut IndexMap<Point, Hazard>,
    ctx: &TurnContext<'_>,
    player: &mut Player,
    rng: &mut RandomNumberGenerator,
) -> Vec<String> {
    let order: Vec<Point> = enemies.keys().copied().collect();
    let mut turn = Turn {
        grid: ctx.grid,
        player_pos: ctx.player_pos,
        visible: ctx.visible,
        occupied: order.iter().copied().collect(),
        messages: Vec::new(),
    };
    let intimidation = player.intimidation();

    for start in order {
        let Some((index, _, mut enemy)) = enemies.shift_remove_full(&start) else {
            continue;
        };

        if intimidation > 0 && turn.sees_player(start) && rng.roll_dice(1, 100) <= intimidation {
            log::trace!("{} at {},{} hesitates", enemy.name, start.x, start.y);
            enemies.shift_insert(index, start, enemy);
            continue;
        }

        if !enemy.effects.is_empty() {
            let ticked = tick(&mut enemy);
            turn.messages.extend(ticked);
            if enemy.is_dead() {
                turn.destroyed(&enemy, start, player);
                continue;
            }
            if enemy.effects.contains(Effect::Stun) {
                enemies.shift_insert(index, start, enemy);
                continue;
            }
        }

        let end = if ctx.player_hidden {
            turn.random_walk(start, rng)
        } else {
            turn.act(&mut enemy, start, player, rng)
        };
        log::trace!(
            "{} {:?}: {},{} -> {},{}",
            enemy.name,
            enemy.behavior,
            start.x,
            start.y,
            end.x,
            end.y
        );

        if let Some(message) = trigger_player_mine(hazards, end, &mut enemy) {
            turn.messages.push(message);
            if enemy.is_dead() {
                turn.destroyed(&enemy, end, player);
                continue;
            }
        }

        if end == start {
            enemies.shift_insert(index, start, enemy);
        } else {
            enemies.insert(end, enemy);
        }
    }

    turn.messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::monsters::builtin_enemies;
    use crate::floor::spawn_enemy;
    use crate::map::fov::visible;

    fn enemy(idx: usize) -> Enemy {
        spawn_enemy(&builtin_enemies()[idx], 1)
    }

    fn run(
        grid: &TileGrid,
        enemies: &mut IndexMap<Point, Enemy>,
        player_pos: Point,
        player: &mut Player,
        seed: u64,
    ) -> Vec<String> {
        let seen = visible(grid, player_pos, 8);
        let ctx = TurnContext {
            grid,
            player_pos,
            visible: &seen,
            player_hidden: false,
        };
        let mut hazards = IndexMap::new();
        let mut rng = RandomNumberGenerator::seeded(seed);
        resolve_enemy_turn(enemies, &mut hazards, &ctx, player, &mut rng)
    }

    #[test]
    fn melee_enemy_closes_in() {
        let grid = TileGrid::open(10, 3);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(6, 1), enemy(0));
        let mut player = Player::default();
        run(&grid, &mut enemies, Point::new(1, 1), &mut player, 1);
        assert!(enemies.contains_key(&Point::new(5, 1)));
    }

    #[test]
    fn adjacent_melee_enemy_attacks_in_place() {
        let grid = TileGrid::open(10, 3);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(2, 1), enemy(0));
        let mut player = Player::default();
        let messages = run(&grid, &mut enemies, Point::new(1, 1), &mut player, 1);
        assert!(enemies.contains_key(&Point::new(2, 1)));
        assert_eq!(player.hp, player.max_hp - 3);
        assert_eq!(messages, vec!["Drone hits you for 3!".to_string()]);
    }

    #[test]
    fn queued_enemies_never_share_a_tile() {
        let grid = TileGrid::from_rows(&["#######", "#.....#", "#######"]);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(3, 1), enemy(0));
        enemies.insert(Point::new(4, 1), enemy(0));
        enemies.insert(Point::new(5, 1), enemy(0));
        let mut player = Player::default();
        run(&grid, &mut enemies, Point::new(1, 1), &mut player, 2);
        assert_eq!(enemies.len(), 3);
        assert!(enemies.contains_key(&Point::new(2, 1)));
        assert!(!enemies.contains_key(&Point::new(1, 1)));
    }

    #[test]
    fn gunner_fires_from_range_and_retreats_up_close() {
        let grid = TileGrid::open(12, 1);
        let mut player = Player::default();
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(6, 0), enemy(3));
        let messages = run(&grid, &mut enemies, Point::new(1, 0), &mut player, 3);
        assert_eq!(messages[0], "Gunner fires at you for 6!");
        assert!(enemies.contains_key(&Point::new(6, 0)));

        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(3, 0), enemy(3));
        let mut player = Player::default();
        run(&grid, &mut enemies, Point::new(1, 0), &mut player, 3);
        assert!(enemies.contains_key(&Point::new(4, 0)));
        assert_eq!(player.hp, player.max_hp);
    }

    #[test]
    fn lurker_moves_twice() {
        let grid = TileGrid::open(12, 3);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(8, 1), enemy(4));
        let mut player = Player::default();
        run(&grid, &mut enemies, Point::new(1, 1), &mut player, 4);
        assert!(enemies.contains_key(&Point::new(6, 1)));
    }

    #[test]
    fn lurker_stops_once_it_loses_sight() {
        let grid = TileGrid::open(12, 3);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(8, 1), enemy(4));
        let mut player = Player::default();
        let seen: HashSet<Point> = [Point::new(8, 1)].into_iter().collect();
        let ctx = TurnContext {
            grid: &grid,
            player_pos: Point::new(1, 1),
            visible: &seen,
            player_hidden: false,
        };
        let mut hazards = IndexMap::new();
        let mut rng = RandomNumberGenerator::seeded(4);
        resolve_enemy_turn(&mut enemies, &mut hazards, &ctx, &mut player, &mut rng);
        assert!(enemies.contains_key(&Point::new(7, 1)));
        assert_eq!(enemies.len(), 1);
    }

    #[test]
    fn intimidated_enemy_loses_its_turn() {
        let grid = TileGrid::open(10, 3);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(2, 1), enemy(0));
        let mut player = Player::default();
        player.stats.presence = 40;
        assert!(player.intimidation() >= 100);
        for seed in 0..20 {
            let messages = run(&grid, &mut enemies, Point::new(1, 1), &mut player, seed);
            assert!(messages.is_empty());
        }
        assert_eq!(player.hp, player.max_hp);
        assert!(enemies.contains_key(&Point::new(2, 1)));
    }

    #[test]
    fn brute_acts_every_other_turn() {
        let grid = TileGrid::open(12, 3);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(8, 1), enemy(5));
        let mut player = Player::default();
        run(&grid, &mut enemies, Point::new(1, 1), &mut player, 5);
        assert!(enemies.contains_key(&Point::new(7, 1)));
        run(&grid, &mut enemies, Point::new(1, 1), &mut player, 6);
        assert!(enemies.contains_key(&Point::new(7, 1)));
        run(&grid, &mut enemies, Point::new(1, 1), &mut player, 7);
        assert!(enemies.contains_key(&Point::new(6, 1)));
    }

    #[test]
    fn stunned_enemy_stays_put() {
        let grid = TileGrid::open(10, 3);
        let mut stunned = enemy(0);
        apply(&mut stunned, Effect::Stun, 2);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(2, 1), stunned);
        let mut player = Player::default();
        run(&grid, &mut enemies, Point::new(1, 1), &mut player, 8);
        assert_eq!(player.hp, player.max_hp);
        assert!(enemies.contains_key(&Point::new(2, 1)));
    }

    #[test]
    fn poison_kill_removes_and_counts() {
        let grid = TileGrid::open(10, 3);
        let mut weak = enemy(0);
        weak.hp = 1;
        apply(&mut weak, Effect::Poison, 3);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(5, 1), weak);
        let mut player = Player::default();
        run(&grid, &mut enemies, Point::new(1, 1), &mut player, 9);
        assert!(enemies.is_empty());
        assert_eq!(player.enemies_killed, 1);
    }

    #[test]
    fn burning_exploder_catches_adjacent_player() {
        let grid = TileGrid::open(10, 3);
        let mut bomb = enemy(6);
        bomb.hp = 1;
        apply(&mut bomb, Effect::Burn, 2);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(2, 1), bomb);
        let mut player = Player::default();
        run(&grid, &mut enemies, Point::new(1, 1), &mut player, 10);
        assert!(enemies.is_empty());
        assert_eq!(player.hp, player.max_hp - 2);
    }

    #[test]
    fn enemy_walking_onto_player_mine_takes_the_blast() {
        let grid = TileGrid::open(10, 3);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(5, 1), enemy(5));
        let mut hazards = IndexMap::new();
        hazards.insert(Point::new(4, 1), Hazard::player_mine());
        let mut player = Player::default();
        let seen = visible(&grid, Point::new(1, 1), 8);
        let ctx = TurnContext {
            grid: &grid,
            player_pos: Point::new(1, 1),
            visible: &seen,
            player_hidden: false,
        };
        let mut rng = RandomNumberGenerator::seeded(11);
        resolve_enemy_turn(&mut enemies, &mut hazards, &ctx, &mut player, &mut rng);
        assert!(hazards.is_empty());
        assert_eq!(enemies[&Point::new(4, 1)].hp, 35 - 12);
    }

    #[test]
    fn unseen_enemies_wander_without_attacking() {
        let grid = TileGrid::open(10, 10);
        let mut enemies = IndexMap::new();
        enemies.insert(Point::new(5, 5), enemy(0));
        let mut player = Player::default();
        let seen = HashSet::new();
        let ctx = TurnContext {
            grid: &grid,
            player_pos: Point::new(5, 6),
            visible: &seen,
            player_hidden: false,
        };
        let mut hazards = IndexMap::new();
        let mut rng = RandomNumberGenerator::seeded(12);
        resolve_enemy_turn(&mut enemies, &mut hazards, &ctx, &mut player, &mut rng);
        assert_eq!(player.hp, player.max_hp);
        let (pos, _) = enemies.first().unwrap();
        assert_eq!(manhattan(*pos, Point::new(5, 5)), 1);
        assert_ne!(*pos, Point::new(5, 6));
    }
}
