pub mod player;

use bracket_geometry::prelude::Point;
use bracket_random::prelude::RandomNumberGenerator;

use crate::data::monsters::Behavior;
use crate::effects::ActiveEffects;
use crate::map::manhattan;

pub use player::Player;

/// Anything that can be hurt, healed and afflicted.
pub trait Combatant {
    fn label(&self) -> &str;
    fn hp(&self) -> i32;
    fn max_hp(&self) -> i32;
    fn set_hp(&mut self, hp: i32);
    fn attack(&self) -> i32;
    fn defense(&self) -> i32;
    fn effects(&self) -> &ActiveEffects;
    fn effects_mut(&mut self) -> &mut ActiveEffects;

    /// Percent chance to avoid an incoming attack or trap.
    fn dodge_chance(&self) -> i32 {
        0
    }

    /// Turns shaved off every effect applied to this combatant.
    fn effect_reduction(&self) -> u32 {
        0
    }

    fn is_player(&self) -> bool {
        false
    }

    fn verb<'a>(&self, second_person: &'a str, third_person: &'a str) -> &'a str {
        if self.is_player() {
            second_person
        } else {
            third_person
        }
    }

    fn is_dead(&self) -> bool {
        self.hp() <= 0
    }

    /// HP never drops below zero.
    fn take_damage(&mut self, amount: i32) {
        let hp = (self.hp() - amount.max(0)).max(0);
        self.set_hp(hp);
    }

    /// Returns the HP actually restored.
    fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp();
        let hp = (before + amount.max(0)).min(self.max_hp());
        self.set_hp(hp);
        hp - before
    }
}

/// Melee and ranged hits always land for at least one point.
pub fn hit_damage(attack: i32, defense: i32) -> i32 {
    (attack - defense).max(1)
}

pub fn dodges<C: Combatant + ?Sized>(defender: &C, rng: &mut RandomNumberGenerator) -> bool {
    let chance = defender.dodge_chance().clamp(0, 100);
    chance > 0 && rng.roll_dice(1, 100) <= chance
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    pub name: String,
    pub glyph: char,
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub xp_reward: i32,
    pub behavior: Behavior,
    /// Turns a brute still has to wait before acting again.
    pub cooldown: u8,
    pub boss: bool,
    pub effects: ActiveEffects,
}

impl Enemy {
    /// Splash damage an exploder deals when it dies at `at`, if the player is
    /// close enough to be caught.
    pub fn death_blast(&self, at: Point, player_pos: Point) -> Option<i32> {
        if self.behavior != Behavior::Exploder || manhattan(at, player_pos) > 1 {
            return None;
        }
        Some((self.attack / 2).max(1))
    }

    pub fn credit_drop(&self) -> i32 {
        (self.xp_reward / 2).max(1)
    }
}

impl Combatant for Enemy {
    fn label(&self) -> &str {
        &self.name
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
        self.attack
    }

    fn defense(&self) -> i32 {
        self.defense
    }

    fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    fn effects_mut(&mut self) -> &mut ActiveEffects {
        &mut self.effects
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Terminal {
    pub title: String,
    pub lines: Vec<String>,
    pub read: bool,
}

impl Terminal {
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
            read: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::monsters::builtin_enemies;
    use crate::floor::spawn_enemy;

    #[test]
    fn damage_never_drops_below_one() {
        assert_eq!(hit_damage(2, 5), 1);
        assert_eq!(hit_damage(7, 2), 5);
    }

    #[test]
    fn hp_is_clamped_at_zero() {
        let mut enemy = spawn_enemy(&builtin_enemies()[0], 1);
        enemy.take_damage(100);
        assert_eq!(enemy.hp, 0);
        assert!(enemy.is_dead());
    }

    #[test]
    fn exploder_blast_reaches_only_adjacent_tiles() {
        let exploder = spawn_enemy(&builtin_enemies()[6], 1);
        let at = Point::new(5, 5);
        assert_eq!(exploder.death_blast(at, Point::new(5, 6)), Some(2));
        assert_eq!(exploder.death_blast(at, Point::new(6, 6)), None);

        let drone = spawn_enemy(&builtin_enemies()[0], 1);
        assert_eq!(drone.death_blast(at, Point::new(5, 6)), None);
    }

    #[test]
    fn enemies_never_dodge() {
        let enemy = spawn_enemy(&builtin_enemies()[0], 1);
        let mut rng = RandomNumberGenerator::seeded(11);
        assert!((0..200).all(|_| !dodges(&enemy, &mut rng)));
    }
}
