use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Combatant;
use crate::data::items::{Item, Slot};
use crate::effects::ActiveEffects;

pub const XP_PER_LEVEL: i32 = 100;
pub const DEFAULT_MAX_INVENTORY: usize = 12;
pub const STAT_BASE: i32 = 5;
pub const SKILL_POINTS_PER_LEVEL: u32 = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub body: i32,
    pub reflex: i32,
    pub mind: i32,
    pub tech: i32,
    pub presence: i32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            body: STAT_BASE,
            reflex: STAT_BASE,
            mind: STAT_BASE,
            tech: STAT_BASE,
            presence: STAT_BASE,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Melee,
    Firearms,
    Tactics,
    Engineering,
    Hacking,
    Electronics,
    Pilot,
    Cartography,
    Survival,
    Intimidation,
    Barter,
    Medicine,
}

impl Skill {
    pub fn as_str(&self) -> &'static str {
        match self {
            Skill::Melee => "Melee",
            Skill::Firearms => "Firearms",
            Skill::Tactics => "Tactics",
            Skill::Engineering => "Engineering",
            Skill::Hacking => "Hacking",
            Skill::Electronics => "Electronics",
            Skill::Pilot => "Pilot",
            Skill::Cartography => "Cartography",
            Skill::Survival => "Survival",
            Skill::Intimidation => "Intimidation",
            Skill::Barter => "Barter",
            Skill::Medicine => "Medicine",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skills(HashMap<Skill, u32>);

impl Skills {
    pub fn level(&self, skill: Skill) -> u32 {
        self.0.get(&skill).copied().unwrap_or(0)
    }

    pub fn set(&mut self, skill: Skill, level: u32) {
        self.0.insert(skill, level);
    }
}

/// One item per named slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Equipment {
    pub weapon: Option<Item>,
    pub armor: Option<Item>,
    pub helmet: Option<Item>,
    pub gloves: Option<Item>,
    pub boots: Option<Item>,
    pub tool: Option<Item>,
}

impl Equipment {
    pub fn slot(&self, slot: Slot) -> Option<&Item> {
        match slot {
            Slot::Weapon => self.weapon.as_ref(),
            Slot::Armor => self.armor.as_ref(),
            Slot::Helmet => self.helmet.as_ref(),
            Slot::Gloves => self.gloves.as_ref(),
            Slot::Boots => self.boots.as_ref(),
            Slot::Tool => self.tool.as_ref(),
            Slot::Use => None,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> Option<&mut Option<Item>> {
        match slot {
            Slot::Weapon => Some(&mut self.weapon),
            Slot::Armor => Some(&mut self.armor),
            Slot::Helmet => Some(&mut self.helmet),
            Slot::Gloves => Some(&mut self.gloves),
            Slot::Boots => Some(&mut self.boots),
            Slot::Tool => Some(&mut self.tool),
            Slot::Use => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        [
            &self.weapon,
            &self.armor,
            &self.helmet,
            &self.gloves,
            &self.boots,
            &self.tool,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub name: String,
    pub stats: Stats,
    pub skills: Skills,
    pub hp: i32,
    pub max_hp: i32,
    pub level: i32,
    pub xp: i32,
    pub skill_points: u32,
    pub credits: i32,
    pub fuel: i32,
    pub inventory: Vec<Item>,
    pub max_inventory: usize,
    pub equipment: Equipment,
    pub effects: ActiveEffects,
    pub enemies_killed: u32,
    pub items_found: u32,
    pub max_floor_reached: u32,
}

impl Default for Player {
    fn default() -> Self {
        Self::new("Unknown", Stats::default(), Skills::default())
    }
}

impl Player {
    pub fn new(name: impl Into<String>, stats: Stats, skills: Skills) -> Self {
        let max_hp = 20 + stats.body * 2;
        Self {
            name: name.into(),
            stats,
            skills,
            hp: max_hp,
            max_hp,
            level: 1,
            xp: 0,
            skill_points: 0,
            credits: 0,
            fuel: 3,
            inventory: Vec::new(),
            max_inventory: DEFAULT_MAX_INVENTORY,
            equipment: Equipment::default(),
            effects: ActiveEffects::default(),
            enemies_killed: 0,
            items_found: 0,
            max_floor_reached: 0,
        }
    }

    fn skill(&self, skill: Skill) -> i32 {
        self.skills.level(skill) as i32
    }

    pub fn melee_attack(&self) -> i32 {
        let gear: i32 = self.equipment.iter().map(|item| item.attack).sum();
        1 + ((self.stats.body - 5) / 2).max(0) + gear + self.skill(Skill::Melee)
    }

    pub fn armor(&self) -> i32 {
        self.equipment.iter().map(|item| item.defense).sum()
    }

    pub fn ranged_attack(&self) -> i32 {
        self.melee_attack() + ((self.stats.tech - 5) / 2).max(0) + self.skill(Skill::Firearms)
    }

    pub fn dodge(&self) -> i32 {
        ((self.stats.reflex - 5) * 4).max(0) + self.skill(Skill::Tactics) * 2
    }

    pub fn xp_multiplier(&self) -> f64 {
        1.0 + ((self.stats.mind - 5) as f64 * 0.05).max(0.0)
    }

    pub fn fov_radius(&self, base: i32) -> i32 {
        base + ((self.stats.mind - 5) / 3).max(0) + self.skill(Skill::Cartography) / 2
    }

    pub fn fuel_discount(&self) -> i32 {
        self.skill(Skill::Pilot) / 2
    }

    /// Percent chance that a visible enemy hesitates and loses its turn.
    pub fn intimidation(&self) -> i32 {
        ((self.stats.presence - 5) * 3 + self.skill(Skill::Intimidation) * 3).max(0)
    }

    /// Shop price multiplier from presence and barter, never below 40%.
    pub fn price_factor(&self) -> f64 {
        (1.0 - (self.stats.presence - 5) as f64 * 0.05 - self.skill(Skill::Barter) as f64 * 0.05)
            .max(0.4)
    }

    pub fn has_ranged_weapon(&self) -> bool {
        self.equipment.weapon.as_ref().is_some_and(|item| item.ranged)
    }

    pub fn xp_next(&self) -> i32 {
        XP_PER_LEVEL * self.level
    }

    /// Adds XP (scaled by mind) and returns how many levels were gained.
    pub fn gain_xp(&mut self, amount: i32) -> u32 {
        self.xp += (amount as f64 * self.xp_multiplier()) as i32;
        let mut gained = 0;
        while self.xp >= self.xp_next() {
            self.xp -= self.xp_next();
            self.level += 1;
            gained += 1;
        }
        self.skill_points += gained * SKILL_POINTS_PER_LEVEL;
        gained
    }

    pub fn inventory_full(&self) -> bool {
        self.inventory.len() >= self.max_inventory
    }

    /// Hands the item back when the pack is full.
    pub fn pickup(&mut self, item: Item) -> Result<(), Item> {
        if self.inventory_full() {
            return Err(item);
        }
        self.inventory.push(item);
        Ok(())
    }

    /// Moves inventory item `index` into its slot; whatever was there goes
    /// back into the pack. Returns the equipped item's name.
    pub fn equip(&mut self, index: usize) -> Option<String> {
        if index >= self.inventory.len() {
            return None;
        }
        let slot = self.inventory[index].slot;
        if slot == Slot::Use {
            return None;
        }
        let item = self.inventory.remove(index);
        let name = item.name.clone();
        if let Some(place) = self.equipment.slot_mut(slot) {
            if let Some(old) = place.replace(item) {
                self.inventory.push(old);
            }
        }
        Some(name)
    }
}

impl Combatant for Player {
    fn label(&self) -> &str {
        "You"
    }

    fn hp(&self) -> i32 {
        self.hp
    }

    fn max_hp(&self) -> i32 {
        self.max_hp
    }

    fn set_hp(&mut self, hp: i32) {
        self.hp = hp;
    }

    fn attack(&self) -> i32 {
        self.melee_attack()
    }

    fn defense(&self) -> i32 {
        self.armor()
    }

    fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    fn effects_mut(&mut self) -> &mut ActiveEffects {
        &mut self.effects
    }

    fn dodge_chance(&self) -> i32 {
        self.dodge()
    }

    fn effect_reduction(&self) -> u32 {
        self.skills.level(Skill::Survival)
    }

    fn is_player(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::items::builtin_items;

    fn item(name: &str) -> Item {
        builtin_items()
            .into_iter()
            .find(|item| item.name == name)
            .unwrap()
    }

    #[test]
    fn baseline_numbers() {
        let player = Player::default();
        assert_eq!(player.max_hp, 30);
        assert_eq!(player.melee_attack(), 1);
        assert_eq!(player.armor(), 0);
        assert_eq!(player.dodge(), 0);
        assert_eq!(player.fov_radius(8), 8);
        assert_eq!(player.intimidation(), 0);
    }

    #[test]
    fn stats_and_skills_feed_derived_numbers() {
        let mut stats = Stats::default();
        stats.body = 9;
        stats.reflex = 8;
        stats.mind = 11;
        stats.tech = 9;
        stats.presence = 7;
        let mut skills = Skills::default();
        skills.set(Skill::Melee, 2);
        skills.set(Skill::Tactics, 1);
        skills.set(Skill::Firearms, 1);
        skills.set(Skill::Cartography, 3);
        skills.set(Skill::Intimidation, 1);
        let player = Player::new("Vega", stats, skills);
        assert_eq!(player.max_hp, 38);
        assert_eq!(player.melee_attack(), 1 + 2 + 2);
        assert_eq!(player.ranged_attack(), 5 + 2 + 1);
        assert_eq!(player.dodge(), 12 + 2);
        assert_eq!(player.fov_radius(8), 8 + 2 + 1);
        assert_eq!(player.intimidation(), 6 + 3);
    }

    #[test]
    fn equipping_swaps_the_old_item_back() {
        let mut player = Player::default();
        player.pickup(item("Vibro-Knife")).unwrap();
        player.pickup(item("Pulse Pistol")).unwrap();
        assert_eq!(player.equip(0).as_deref(), Some("Vibro-Knife"));
        assert_eq!(player.melee_attack(), 2);
        assert_eq!(player.equip(0).as_deref(), Some("Pulse Pistol"));
        assert!(player.has_ranged_weapon());
        assert_eq!(player.inventory.len(), 1);
        assert_eq!(player.inventory[0].name, "Vibro-Knife");
    }

    #[test]
    fn pickup_refuses_when_full() {
        let mut player = Player::default();
        player.max_inventory = 1;
        player.pickup(item("Medkit")).unwrap();
        assert!(player.pickup(item("Medkit")).is_err());
    }

    #[test]
    fn xp_rolls_over_into_levels() {
        let mut player = Player::default();
        assert_eq!(player.gain_xp(250), 1);
        assert_eq!(player.level, 2);
        assert_eq!(player.xp, 150);
        assert_eq!(player.gain_xp(50), 1);
        assert_eq!(player.level, 3);
        assert_eq!(player.xp, 0);
        assert_eq!(player.skill_points, 4);
    }
}
