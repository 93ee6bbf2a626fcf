use std::collections::{HashMap, HashSet};
use std::iter;
use std::mem;

use bracket_geometry::prelude::{Bresenham, Point};
use bracket_random::prelude::RandomNumberGenerator;

use crate::ai::{TurnContext, resolve_enemy_turn};
use crate::config::EngineConfig;
use crate::data::items::{ItemEffect, ToolEffect};
use crate::data::monsters::is_electronic;
use crate::data::{Content, Theme};
use crate::effects::hazards::{Hazard, trigger_on_entry};
use crate::effects::{Effect, apply, tick};
use crate::entity::player::Skill;
use crate::entity::{Combatant, Enemy, Player, dodges, hit_damage};
use crate::floor::{Floor, SpecialKind};
use crate::map::fov::visible;
use crate::map::{TileGrid, manhattan};
use crate::site::Site;

pub const CORRUPTION_MAX: i32 = 100;
pub const CORRUPTION_RESET: i32 = 40;
pub const CORRUPTION_FLOOR: u32 = 7;
pub const TERMINAL_SUPPRESSION: i32 = 30;
pub const DISARM_SKILL: u32 = 2;
pub const REMOTE_HACK_SKILL: u32 = 5;
pub const JAMMER_STUN_TURNS: u32 = 2;
pub const REPAIR_DRONE_TURNS: u32 = 3;

const WHISPERS: [&str; 5] = [
    "// signal echo: residual carrier wave",
    "// subcarrier noise: ERR_7F, source unresolved",
    "// HADES-7: passive resonance ping",
    "// neural feedback trace: nominal",
    "// thought-pattern intercept: fragmentary",
];
const INTERFERENCE: [&str; 5] = [
    "// WARNING: cognitive buffer approaching capacity",
    "// HADES-7: your location has been logged",
    "// signal strength: NOMINAL -> CRITICAL",
    "// ERROR: memory partition overlap, sector 7",
    "// EREBUS LOG: do not let it read your intentions",
];
const CASCADE: [&str; 6] = [
    "// ALERT: resonance threshold exceeded",
    "// HADES-7: merge sequence initialising",
    "// [CONTENT REDACTED BY SIGNAL]",
    "// APPROACH VECTOR CONFIRMED",
    "// YOUR MIND IS AN OPEN TRANSMISSION",
    "// EVACUATION IS NO LONGER POSSIBLE",
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    West,
    East,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Direction {
    pub fn delta(&self) -> Point {
        match self {
            Direction::North => Point::new(0, -1),
            Direction::South => Point::new(0, 1),
            Direction::West => Point::new(-1, 0),
            Direction::East => Point::new(1, 0),
            Direction::NorthWest => Point::new(-1, -1),
            Direction::NorthEast => Point::new(1, -1),
            Direction::SouthWest => Point::new(-1, 1),
            Direction::SouthEast => Point::new(1, 1),
        }
    }

    pub fn is_cardinal(&self) -> bool {
        matches!(
            self,
            Direction::North | Direction::South | Direction::West | Direction::East
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Fire(Point),
    UseItem(usize),
    ActivateTool(Option<Direction>),
    Disarm,
    AccessTerminal,
    Buy(usize),
    Wait,
    Descend,
    Ascend,
    LeaveSite,
    Restart,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    Dead,
    Escaped,
    Restarted,
}

/// How a single step of player movement resolved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Step {
    Blocked,
    Attacked,
    Moved,
    Stairs,
    BossSlain,
}

pub struct Engine {
    config: EngineConfig,
    content: Content,
    rng: RandomNumberGenerator,
    site: Site,
    floor: Floor,
    player: Player,
    player_pos: Point,
    visible: HashSet<Point>,
    smoke: HashMap<Point, u32>,
    corruption: i32,
    /// A stimmed move happened; the enemy turn waits for the bonus step.
    stim_pending: bool,
    outcome: Option<RunOutcome>,
    messages: Vec<String>,
}

impl Engine {
    pub fn new(config: EngineConfig, content: Content, mut site: Site, mut player: Player) -> Self {
        let mut rng = RandomNumberGenerator::seeded(config.seed);
        let floor = site.take_floor(1, &content, config.map_size(), &mut rng);
        player.max_inventory = config.max_inventory;
        player.max_floor_reached = player.max_floor_reached.max(1);
        let player_pos = floor.start;
        log::info!("run started at {} (seed {})", site.name, config.seed);
        let mut engine = Self {
            config,
            content,
            rng,
            site,
            floor,
            player,
            player_pos,
            visible: HashSet::new(),
            smoke: HashMap::new(),
            corruption: 0,
            stim_pending: false,
            outcome: None,
            messages: Vec::new(),
        };
        engine.recharge_grapple();
        engine.refresh_view();
        engine
    }

    pub fn grid(&self) -> &TileGrid {
        &self.floor.grid
    }

    pub fn floor(&self) -> &Floor {
        &self.floor
    }

    pub fn floor_number(&self) -> u32 {
        self.floor.number
    }

    pub fn theme(&self) -> &Theme {
        &self.floor.theme
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn player_pos(&self) -> Point {
        self.player_pos
    }

    pub fn visible(&self) -> &HashSet<Point> {
        &self.visible
    }

    pub fn explored(&self) -> &HashSet<Point> {
        &self.floor.explored
    }

    pub fn smoke(&self) -> &HashMap<Point, u32> {
        &self.smoke
    }

    pub fn corruption(&self) -> i32 {
        self.corruption
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    /// Messages produced by the last resolved command.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drops the player onto an open floor tile. Meant for scenario setup.
    pub fn place_player(&mut self, pos: Point) -> bool {
        if !self.floor.grid.is_floor(pos) || self.floor.enemies.contains_key(&pos) {
            return false;
        }
        self.player_pos = pos;
        self.refresh_view();
        true
    }

    /// Direct access to the active floor, for scenario setup.
    pub fn floor_mut(&mut self) -> &mut Floor {
        &mut self.floor
    }

    pub fn execute(&mut self, command: Command) -> Vec<String> {
        match command {
            Command::Move(dir) => self.move_player(dir),
            Command::Fire(target) => self.fire_at(target),
            Command::UseItem(index) => self.use_item(index),
            Command::ActivateTool(dir) => self.activate_tool(dir),
            Command::Disarm => self.disarm_nearby_hazard(),
            Command::AccessTerminal => self.access_terminal(),
            Command::Buy(index) => self.buy(index),
            Command::Wait => self.wait(),
            Command::Descend => self.descend(),
            Command::Ascend => self.ascend(),
            Command::LeaveSite => self.leave_site(),
            Command::Restart => self.restart(),
        }
    }

    /// Runs `body` as one command: no-op once the run is over, and the death
    /// check afterwards.
    fn command(&mut self, body: impl FnOnce(&mut Self, &mut Vec<String>)) -> Vec<String> {
        let mut messages = Vec::new();
        if self.outcome.is_some() {
            return messages;
        }
        body(self, &mut messages);
        if self.player.hp <= 0 && self.outcome.is_none() {
            self.player.hp = 0;
            self.outcome = Some(RunOutcome::Dead);
            messages.push("You have died.".to_string());
            log::info!(
                "player died on floor {} of {} after {} kills",
                self.floor.number,
                self.site.name,
                self.player.enemies_killed
            );
        }
        self.messages = messages.clone();
        messages
    }

    fn stunned(&self) -> bool {
        self.player.effects.contains(Effect::Stun)
    }

    fn refresh_view(&mut self) {
        let radius = self.player.fov_radius(self.config.base_fov_radius);
        self.visible = visible(&self.floor.grid, self.player_pos, radius);
        self.floor.explored.extend(self.visible.iter().copied());
    }

    fn tick_player(&mut self, messages: &mut Vec<String>) {
        messages.extend(tick(&mut self.player));
    }

    /// Enemy turn, smoke decay and a fresh field of view.
    fn end_turn(&mut self, messages: &mut Vec<String>) {
        if self.outcome.is_some() {
            return;
        }
        let had_boss = self.floor.has_boss();
        let floor = &mut self.floor;
        let ctx = TurnContext {
            grid: &floor.grid,
            player_pos: self.player_pos,
            visible: &self.visible,
            player_hidden: self.smoke.contains_key(&self.player_pos),
        };
        messages.extend(resolve_enemy_turn(
            &mut floor.enemies,
            &mut floor.hazards,
            &ctx,
            &mut self.player,
            &mut self.rng,
        ));
        if had_boss && !self.floor.has_boss() {
            self.boss_defeated(messages);
        }
        self.smoke.retain(|_, turns| {
            *turns = turns.saturating_sub(1);
            *turns > 0
        });
        self.refresh_view();
    }

    fn stunned_turn(&mut self, messages: &mut Vec<String>, what: &str) {
        messages.push(format!("You are stunned and cannot {what}!"));
        self.tick_player(messages);
        self.end_turn(messages);
    }

    /// Resolves an enemy turn still owed from a stimmed move.
    fn settle(&mut self, messages: &mut Vec<String>) {
        if mem::take(&mut self.stim_pending) {
            self.end_turn(messages);
        }
    }

    fn boss_defeated(&mut self, messages: &mut Vec<String>) {
        self.site.cleared = true;
        self.outcome = Some(RunOutcome::Escaped);
        messages.push("The signal falls silent. Erebus is quiet at last.".to_string());
        log::info!("{} cleared on floor {}", self.site.name, self.floor.number);
    }

    fn award_kill(&mut self, enemy: &Enemy, at: Point, messages: &mut Vec<String>) -> Step {
        self.player.enemies_killed += 1;
        let levels = self.player.gain_xp(enemy.xp_reward);
        let credits = enemy.credit_drop();
        self.player.credits += credits;
        messages.push(format!(
            "{} destroyed! +{} XP +{credits} cr",
            enemy.name, enemy.xp_reward
        ));
        if let Some(splash) = enemy.death_blast(at, self.player_pos) {
            self.player.take_damage(splash);
            messages.push(format!("{} detonates, caught in blast! -{splash} HP!", enemy.name));
        }
        if levels > 0 {
            messages.push(format!("Level up! You are now level {}.", self.player.level));
        }
        if enemy.boss {
            self.boss_defeated(messages);
            return Step::BossSlain;
        }
        Step::Attacked
    }

    fn melee(&mut self, target: Point, messages: &mut Vec<String>) -> Step {
        let attack = self.player.attack();
        let Some(enemy) = self.floor.enemies.get_mut(&target) else {
            return Step::Blocked;
        };
        let damage = hit_damage(attack, enemy.defense);
        enemy.take_damage(damage);
        let name = enemy.name.clone();
        let counter = enemy.attack;
        if enemy.is_dead() {
            messages.push(format!("You hit {name} for {damage}."));
            return match self.floor.enemies.shift_remove(&target) {
                Some(dead) => self.award_kill(&dead, target, messages),
                None => Step::Attacked,
            };
        }
        if dodges(&self.player, &mut self.rng) {
            messages.push(format!("You hit {name} for {damage}. {name} strikes back, you dodge!"));
        } else {
            let returned = hit_damage(counter, self.player.defense());
            self.player.take_damage(returned);
            messages.push(format!("You hit {name} for {damage}. {name} hits back for {returned}."));
        }
        Step::Attacked
    }

    /// One step of movement, including everything entering a tile sets off.
    fn step(&mut self, dir: Direction, messages: &mut Vec<String>) -> Step {
        let target = self.player_pos + dir.delta();
        if self.floor.enemies.contains_key(&target) {
            return self.melee(target, messages);
        }
        if !self.floor.grid.is_floor(target) {
            return Step::Blocked;
        }
        self.player_pos = target;

        messages.extend(trigger_on_entry(
            &mut self.floor.hazards,
            target,
            &mut self.player,
            self.floor.number,
            &mut self.rng,
        ));

        if self.player.gain_xp(1) > 0 {
            messages.push(format!("Level up! You are now level {}.", self.player.level));
        }

        if let Some(item) = self.floor.items.shift_remove(&target) {
            let name = item.name.clone();
            match self.player.pickup(item) {
                Ok(()) => {
                    self.player.items_found += 1;
                    messages.push(format!("Picked up {name}."));
                }
                Err(item) => {
                    self.floor.items.insert(target, item);
                    messages.push("Inventory full.".to_string());
                }
            }
        }

        if let Some(terminal) = self.floor.terminals.get(&target) {
            if terminal.read {
                messages.push(format!("[offline] {}", terminal.title));
            } else {
                messages.push(format!("Terminal: {} (access to read)", terminal.title));
            }
        }

        messages.extend(self.floor.enter_special_room(
            target,
            &mut self.player,
            &self.content,
            &mut self.rng,
        ));

        if self.floor.stair_down == Some(target) {
            self.change_floor(self.floor.number + 1, messages);
            return Step::Stairs;
        }
        if target == self.floor.stair_up && self.floor.number > 1 {
            self.change_floor(self.floor.number - 1, messages);
            return Step::Stairs;
        }
        Step::Moved
    }

    fn change_floor(&mut self, number: u32, messages: &mut Vec<String>) {
        let descending = number > self.floor.number;
        let next = self
            .site
            .take_floor(number, &self.content, self.config.map_size(), &mut self.rng);
        let previous = mem::replace(&mut self.floor, next);
        self.site.store_floor(previous);

        self.player_pos = if descending {
            self.floor.start
        } else {
            self.floor.stair_down.unwrap_or(self.floor.start)
        };
        self.smoke.clear();
        self.stim_pending = false;
        self.recharge_grapple();
        self.player.max_floor_reached = self.player.max_floor_reached.max(number);
        self.refresh_view();

        if descending {
            messages.push(format!("You descend to floor {number}."));
            if let Some(arrival) = &self.floor.theme.arrival {
                messages.push(arrival.clone());
            }
        } else {
            messages.push(format!("You ascend to floor {number}."));
        }
        log::info!("{}: now on floor {number} ({})", self.site.name, self.floor.theme.name);
    }

    fn recharge_grapple(&mut self) {
        let tool = self.player.equipment.tool.as_mut();
        if let Some(tool) = tool.and_then(|item| item.tool.as_mut()) {
            if tool.effect == ToolEffect::Grapple {
                tool.charges = tool.max_charges;
            }
        }
    }

    fn corruption_active(&self) -> bool {
        self.config.corruption_enabled
            && self.site.signal_corruption
            && self.floor.number >= CORRUPTION_FLOOR
    }

    fn roll_percent(&mut self, chance: i32) -> bool {
        self.rng.roll_dice(1, 100) <= chance
    }

    fn pick_line(&mut self, lines: &[&str]) -> String {
        lines[self.rng.range(0, lines.len() as i32) as usize].to_string()
    }

    fn advance_corruption(&mut self, messages: &mut Vec<String>) {
        if !self.corruption_active() {
            return;
        }
        let mind_shield = ((self.player.stats.mind - 5) / 2).max(0);
        let hack_shield = self.player.skills.level(Skill::Hacking) as i32 / 3;
        let rate = (3 - mind_shield - hack_shield).max(1);
        self.corruption = (self.corruption + rate).min(CORRUPTION_MAX);

        if self.corruption >= 75 {
            if self.roll_percent(60) {
                let line = self.pick_line(&CASCADE);
                messages.push(line);
            }
            if self.roll_percent(22) {
                let effect = if self.rng.range(0, 2) == 0 {
                    Effect::Burn
                } else {
                    Effect::Stun
                };
                apply(&mut self.player, effect, 1);
                messages.push(format!(
                    "// RESONANCE: cognitive disruption, {} 1t!",
                    effect.as_str()
                ));
            }
        } else if self.corruption >= 50 {
            if self.roll_percent(40) {
                let line = self.pick_line(&INTERFERENCE);
                messages.push(line);
            }
            if self.roll_percent(12) {
                apply(&mut self.player, Effect::Burn, 1);
                messages.push("// SIGNAL SURGE: synaptic burn, 1t!".to_string());
            }
        } else if self.corruption >= 25 && self.roll_percent(25) {
            let line = self.pick_line(&WHISPERS);
            messages.push(line);
        }

        if self.corruption >= CORRUPTION_MAX {
            self.corruption = CORRUPTION_RESET;
            apply(&mut self.player, Effect::Stun, 1);
            messages.push("// Neural buffer purged. Consciousness reasserting...".to_string());
            log::debug!("corruption cascade on floor {}", self.floor.number);
        }
    }

    pub fn move_player(&mut self, dir: Direction) -> Vec<String> {
        self.command(|engine, messages| {
            if mem::take(&mut engine.stim_pending) {
                if engine.stunned() {
                    messages.push("You are stunned and cannot act!".to_string());
                } else {
                    let step = engine.step(dir, messages);
                    if matches!(step, Step::Stairs | Step::BossSlain) {
                        return;
                    }
                }
                engine.end_turn(messages);
                return;
            }
            if engine.stunned() {
                engine.stunned_turn(messages, "act");
                return;
            }
            engine.tick_player(messages);
            let step = engine.step(dir, messages);
            if step == Step::BossSlain {
                return;
            }
            engine.advance_corruption(messages);
            if step == Step::Stairs {
                return;
            }
            // The deferred enemy turn still sees the view from before this step.
            if engine.player.effects.contains(Effect::Stim) && engine.player.hp > 0 {
                engine.stim_pending = true;
                return;
            }
            engine.end_turn(messages);
        })
    }

    pub fn fire_at(&mut self, target: Point) -> Vec<String> {
        self.command(|engine, messages| {
            engine.settle(messages);
            if engine.outcome.is_some() {
                return;
            }
            if engine.stunned() {
                engine.stunned_turn(messages, "fire");
                return;
            }
            if !engine.player.has_ranged_weapon() {
                messages.push("No ranged weapon equipped.".to_string());
                return;
            }
            if !engine.visible.contains(&target) {
                messages.push("You cannot see that target.".to_string());
                return;
            }
            engine.tick_player(messages);

            let origin = engine.player_pos;
            let hit = Bresenham::new(origin, target)
                .chain(iter::once(target))
                .filter(|point| *point != origin)
                .take_while(|point| engine.floor.grid.is_floor(*point))
                .find(|point| engine.floor.enemies.contains_key(point));

            let Some(hit) = hit else {
                messages.push("The shot goes wide.".to_string());
                engine.end_turn(messages);
                return;
            };
            let attack = engine.player.ranged_attack();
            let Some(enemy) = engine.floor.enemies.get_mut(&hit) else {
                return;
            };
            let damage = hit_damage(attack, enemy.defense);
            enemy.take_damage(damage);
            messages.push(format!("You shoot {} for {damage}.", enemy.name));
            if enemy.is_dead() {
                if let Some(dead) = engine.floor.enemies.shift_remove(&hit) {
                    if engine.award_kill(&dead, hit, messages) == Step::BossSlain {
                        return;
                    }
                }
            }
            engine.end_turn(messages);
        })
    }

    /// Consumables are used up; anything else is equipped. Takes no turn.
    pub fn use_item(&mut self, index: usize) -> Vec<String> {
        self.command(|engine, messages| {
            engine.settle(messages);
            if engine.outcome.is_some() {
                return;
            }
            let Some(item) = engine.player.inventory.get(index) else {
                messages.push("No item in that slot.".to_string());
                return;
            };
            let Some(effect) = item.use_effect.filter(|_| item.is_consumable()) else {
                if let Some(name) = engine.player.equip(index) {
                    messages.push(format!("Equipped {name}."));
                } else {
                    messages.push("Nothing happens.".to_string());
                }
                return;
            };
            let name = item.name.clone();
            if engine.apply_consumable(&name, effect, messages) {
                engine.player.inventory.remove(index);
            }
        })
    }

    /// Returns false when the item was not used up.
    fn apply_consumable(
        &mut self,
        name: &str,
        effect: ItemEffect,
        messages: &mut Vec<String>,
    ) -> bool {
        let pos = self.player_pos;
        match effect {
            ItemEffect::Heal { amount } => {
                let bonus = 2 * self.player.skills.level(Skill::Medicine) as i32;
                let restored = self.player.heal(amount + bonus);
                messages.push(format!("Used {name}: +{restored} HP."));
            }
            ItemEffect::Fuel { amount } => {
                self.player.fuel += amount;
                messages.push(format!("Used {name}: +{amount} fuel."));
            }
            ItemEffect::Antidote => {
                if self.player.effects.is_empty() {
                    messages.push(format!("Used {name}: no effects to clear."));
                } else {
                    self.player.effects.clear();
                    messages.push(format!("Used {name}: all effects cleared."));
                }
            }
            ItemEffect::Inflict { effect, turns } => {
                messages.push(format!("Threw {name}."));
                let target = self
                    .floor
                    .enemies
                    .keys()
                    .copied()
                    .enumerate()
                    .filter(|(_, at)| self.visible.contains(at))
                    .min_by_key(|(order, at)| (manhattan(*at, pos), *order))
                    .map(|(_, at)| at);
                match target.and_then(|at| self.floor.enemies.get_mut(&at)) {
                    Some(enemy) => {
                        apply(enemy, effect, turns);
                        messages.push(format!("{} is hit: {}!", enemy.name, effect.as_str()));
                    }
                    None => messages.push("No visible target.".to_string()),
                }
            }
            ItemEffect::HazardScan => {
                for hazard in self.floor.hazards.values_mut() {
                    hazard.revealed = true;
                }
                match self.floor.hazards.len() {
                    0 => messages.push(format!("Used {name}: no hazards here.")),
                    n => messages.push(format!("Used {name}: {n} hazard(s) marked.")),
                }
            }
            ItemEffect::Emp { turns } => {
                let count = self.stun_electronics(turns);
                messages.push(format!("{name}: {count} unit(s) disabled."));
            }
            ItemEffect::FloorScan => {
                let tiles = self.floor.grid.floor_points();
                self.floor.explored.extend(tiles);
                messages.push(format!("{name} activated: full floor mapped."));
            }
            ItemEffect::Smoke { radius, turns } => {
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        let tile = Point::new(pos.x + dx, pos.y + dy);
                        if dx * dx + dy * dy <= radius * radius && self.floor.grid.in_bounds(tile) {
                            self.smoke.insert(tile, turns);
                        }
                    }
                }
                messages.push("Smoke grenade deployed.".to_string());
            }
            ItemEffect::Stim { turns } => {
                apply(&mut self.player, Effect::Stim, turns);
                messages.push(format!("{name} injected: speed doubled for {turns} turns!"));
            }
            ItemEffect::ProximityMine => {
                if self.floor.hazards.contains_key(&pos) {
                    messages.push("Something is already rigged here.".to_string());
                    return false;
                }
                self.floor.hazards.insert(pos, Hazard::player_mine());
                messages.push("Proximity mine placed.".to_string());
            }
        }
        true
    }

    fn stun_electronics(&mut self, turns: u32) -> usize {
        let mut count = 0;
        for (at, enemy) in self.floor.enemies.iter_mut() {
            if self.visible.contains(at) && is_electronic(&enemy.name) {
                apply(enemy, Effect::Stun, turns);
                count += 1;
            }
        }
        count
    }

    /// First trap on the player's tile or a cardinal neighbour.
    fn adjacent_trap(&self) -> Option<Point> {
        let pos = self.player_pos;
        [
            Point::new(0, 0),
            Point::new(0, -1),
            Point::new(0, 1),
            Point::new(-1, 0),
            Point::new(1, 0),
        ]
        .into_iter()
        .map(|delta| pos + delta)
        .find(|at| self.floor.hazards.get(at).is_some_and(|hazard| !hazard.placed_by_player))
    }

    pub fn activate_tool(&mut self, dir: Option<Direction>) -> Vec<String> {
        self.command(|engine, messages| {
            engine.settle(messages);
            if engine.outcome.is_some() {
                return;
            }
            let Some(item) = engine.player.equipment.tool.as_ref() else {
                messages.push("No tool equipped.".to_string());
                return;
            };
            let Some(tool) = item.tool else {
                messages.push(format!("{} does nothing.", item.name));
                return;
            };
            let name = item.name.clone();
            if engine.stunned() {
                engine.stunned_turn(messages, "act");
                return;
            }
            if let Some((skill, level)) = tool.requires {
                if engine.player.skills.level(skill) < level {
                    messages.push(format!("Requires {} {level}.", skill.as_str()));
                    return;
                }
            }
            if tool.charges == 0 {
                messages.push(format!("{name} is out of charges."));
                return;
            }

            let used = match tool.effect {
                ToolEffect::Bypass => match engine.adjacent_trap() {
                    Some(at) => {
                        if let Some(hazard) = engine.floor.hazards.shift_remove(&at) {
                            messages.push(format!(
                                "{name}: {} trap disarmed safely.",
                                hazard.kind.as_str()
                            ));
                        }
                        true
                    }
                    None => {
                        messages.push(format!("{name}: no trap in range."));
                        false
                    }
                },
                ToolEffect::Jammer => {
                    let count = engine.stun_electronics(JAMMER_STUN_TURNS);
                    messages.push(format!("{name}: {count} unit(s) disabled."));
                    true
                }
                ToolEffect::Grapple => engine.grapple(&name, dir, messages),
                ToolEffect::RepairDrone => {
                    apply(&mut engine.player, Effect::Repair, REPAIR_DRONE_TURNS);
                    messages.push(format!(
                        "{name} deployed, restoring HP over {REPAIR_DRONE_TURNS} turns."
                    ));
                    true
                }
            };
            if !used {
                return;
            }
            let tool = engine.player.equipment.tool.as_mut();
            if let Some(tool) = tool.and_then(|item| item.tool.as_mut()) {
                tool.charges = tool.charges.saturating_sub(1);
            }
            engine.tick_player(messages);
            engine.end_turn(messages);
        })
    }

    fn grapple(&mut self, name: &str, dir: Option<Direction>, messages: &mut Vec<String>) -> bool {
        let Some(dir) = dir.filter(Direction::is_cardinal) else {
            messages.push(format!("{name} needs a straight direction."));
            return false;
        };
        let delta = dir.delta();
        let wall = self.player_pos + delta;
        let landing = wall + delta;
        let grid = &self.floor.grid;
        if grid.in_bounds(wall)
            && grid.is_wall(wall)
            && grid.is_floor(landing)
            && !self.floor.enemies.contains_key(&landing)
        {
            self.player_pos = landing;
            messages.push(format!("{name}: vaulted over wall!"));
            true
        } else {
            messages.push("Can't grapple that way.".to_string());
            false
        }
    }

    pub fn disarm_nearby_hazard(&mut self) -> Vec<String> {
        self.command(|engine, messages| {
            engine.settle(messages);
            if engine.outcome.is_some() {
                return;
            }
            if engine.stunned() {
                engine.stunned_turn(messages, "act");
                return;
            }
            if engine.player.skills.level(Skill::Engineering) < DISARM_SKILL {
                messages.push(format!("Engineering {DISARM_SKILL}+ required to disarm traps."));
                return;
            }
            let Some(at) = engine.adjacent_trap() else {
                messages.push("No visible trap nearby to disarm.".to_string());
                return;
            };
            if let Some(hazard) = engine.floor.hazards.shift_remove(&at) {
                messages.push(format!("Engineering: {} trap disarmed.", hazard.kind.as_str()));
            }
            engine.tick_player(messages);
            engine.end_turn(messages);
        })
    }

    /// Reads the terminal underfoot, or with enough hacking the first unread
    /// terminal anywhere on the floor.
    pub fn access_terminal(&mut self) -> Vec<String> {
        self.command(|engine, messages| {
            engine.settle(messages);
            if engine.outcome.is_some() {
                return;
            }
            if engine.stunned() {
                engine.stunned_turn(messages, "act");
                return;
            }
            let pos = engine.player_pos;
            let at = if engine.floor.terminals.contains_key(&pos) {
                pos
            } else if engine.player.skills.level(Skill::Hacking) >= REMOTE_HACK_SKILL {
                match engine
                    .floor
                    .terminals
                    .iter()
                    .find(|(_, terminal)| !terminal.read)
                    .map(|(at, _)| *at)
                {
                    Some(at) => at,
                    None => {
                        messages.push("No unread terminals on this floor.".to_string());
                        return;
                    }
                }
            } else {
                messages.push("No terminal in range.".to_string());
                return;
            };

            let Some(terminal) = engine.floor.terminals.get_mut(&at) else {
                return;
            };
            if terminal.read {
                messages.push(format!("[offline] {}", terminal.title));
                return;
            }
            terminal.read = true;
            messages.push(format!(">> {}", terminal.title));
            messages.extend(terminal.lines.iter().filter(|line| !line.is_empty()).cloned());

            engine.tick_player(messages);
            engine.end_turn(messages);
            if engine.corruption_active() && engine.corruption > 0 {
                let reduction = engine.corruption.min(TERMINAL_SUPPRESSION);
                engine.corruption -= reduction;
                messages.push(format!("// Terminal handshake: signal suppressed -{reduction}%"));
            }
        })
    }

    /// Buys from the supply depot the player stands in. Takes no turn.
    pub fn buy(&mut self, stock_index: usize) -> Vec<String> {
        self.command(|engine, messages| {
            engine.settle(messages);
            if engine.outcome.is_some() {
                return;
            }
            let shop = engine
                .floor
                .special_room_at(engine.player_pos)
                .filter(|idx| engine.floor.special_rooms[*idx].kind == SpecialKind::Shop);
            let Some(shop) = shop else {
                messages.push("No shop here.".to_string());
                return;
            };
            let Some(entry) = engine.floor.special_rooms[shop].stock.get(stock_index) else {
                messages.push("Nothing on that shelf.".to_string());
                return;
            };
            let price = engine.price_of(entry.price);
            if engine.player.credits < price {
                messages.push(format!("Not enough credits ({price} cr)."));
                return;
            }
            if engine.player.inventory_full() {
                messages.push("Inventory full.".to_string());
                return;
            }
            let entry = engine.floor.special_rooms[shop].stock.remove(stock_index);
            engine.player.credits -= price;
            messages.push(format!("Bought {} for {price} cr.", entry.item.name));
            // Capacity was checked above.
            let _ = engine.player.pickup(entry.item);
        })
    }

    pub fn price_of(&self, base: i32) -> i32 {
        (base as f64 * self.player.price_factor()) as i32
    }

    pub fn wait(&mut self) -> Vec<String> {
        self.command(|engine, messages| {
            engine.settle(messages);
            if engine.outcome.is_some() {
                return;
            }
            if engine.stunned() {
                engine.stunned_turn(messages, "act");
                return;
            }
            engine.tick_player(messages);
            engine.end_turn(messages);
        })
    }

    /// Takes the down stairs the player is standing on.
    pub fn descend(&mut self) -> Vec<String> {
        self.command(|engine, messages| {
            engine.settle(messages);
            if engine.outcome.is_some() {
                return;
            }
            match engine.floor.stair_down {
                Some(stairs) if stairs == engine.player_pos => {
                    engine.change_floor(engine.floor.number + 1, messages)
                }
                Some(_) => messages.push("You are not on the stairs down.".to_string()),
                None => messages.push("There is no way down from here.".to_string()),
            }
        })
    }

    /// Takes the up stairs the player is standing on.
    pub fn ascend(&mut self) -> Vec<String> {
        self.command(|engine, messages| {
            engine.settle(messages);
            if engine.outcome.is_some() {
                return;
            }
            if engine.floor.number <= 1 {
                messages.push("This is the top floor. Leave the site instead.".to_string());
            } else if engine.player_pos != engine.floor.stair_up {
                messages.push("You are not on the stairs up.".to_string());
            } else {
                engine.change_floor(engine.floor.number - 1, messages);
            }
        })
    }

    pub fn leave_site(&mut self) -> Vec<String> {
        self.command(|engine, messages| {
            engine.settle(messages);
            if engine.outcome.is_some() {
                return;
            }
            if engine.floor.number != 1 {
                messages.push("Return to floor 1 to leave the site.".to_string());
                return;
            }
            engine.outcome = Some(RunOutcome::Escaped);
            messages.push(format!("You leave {}.", engine.site.name));
            log::info!("left {} with {} credits", engine.site.name, engine.player.credits);
        })
    }

    pub fn restart(&mut self) -> Vec<String> {
        self.command(|engine, messages| {
            engine.outcome = Some(RunOutcome::Restarted);
            messages.push("Run abandoned.".to_string());
        })
    }
}
