use serde::{Deserialize, Serialize};

use crate::effects::Effect;

pub const BOSS_XP_REWARD: i32 = 500;

/// Per-turn movement and attack policy of an enemy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    #[default]
    Melee,
    Ranged,
    Fast,
    Brute,
    Exploder,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub name: String,
    pub glyph: char,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub xp: i32,
    #[serde(default)]
    pub behavior: Behavior,
}

impl EnemyTemplate {
    pub fn new(
        name: &str,
        glyph: char,
        hp: i32,
        attack: i32,
        defense: i32,
        xp: i32,
        behavior: Behavior,
    ) -> Self {
        Self {
            name: name.to_string(),
            glyph,
            hp,
            attack,
            defense,
            xp,
            behavior,
        }
    }
}

/// Theme weight tables index into this list, so its order is part of the
/// content format.
pub fn builtin_enemies() -> Vec<EnemyTemplate> {
    vec![
        EnemyTemplate::new("Drone", 'd', 8, 3, 0, 10, Behavior::Melee),
        EnemyTemplate::new("Sentry", 'S', 15, 5, 2, 25, Behavior::Melee),
        EnemyTemplate::new("Stalker", 'X', 22, 7, 1, 40, Behavior::Melee),
        EnemyTemplate::new("Gunner", 'G', 12, 6, 0, 30, Behavior::Ranged),
        EnemyTemplate::new("Lurker", 'L', 14, 5, 0, 35, Behavior::Fast),
        EnemyTemplate::new("Brute", 'B', 35, 10, 3, 60, Behavior::Brute),
        EnemyTemplate::new("Exploder", 'E', 10, 4, 0, 20, Behavior::Exploder),
    ]
}

pub fn boss_template() -> EnemyTemplate {
    EnemyTemplate::new("HADES-7 Remnant", 'H', 100, 12, 3, BOSS_XP_REWARD, Behavior::Melee)
}

/// Status effect an enemy's successful hit may carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OnHit {
    pub effect: Effect,
    pub turns: u32,
    /// Percent.
    pub chance: i32,
}

pub fn on_hit(name: &str) -> Option<OnHit> {
    let (effect, turns, chance) = match name {
        "Stalker" => (Effect::Poison, 4, 20),
        "Gunner" => (Effect::Burn, 3, 25),
        "Sentry" => (Effect::Stun, 1, 15),
        "Brute" => (Effect::Stun, 1, 25),
        _ => return None,
    };
    Some(OnHit {
        effect,
        turns,
        chance,
    })
}

/// Units a jammer or EMP pulse can knock offline.
pub fn is_electronic(name: &str) -> bool {
    matches!(name, "Drone" | "Sentry")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_hit_is_keyed_by_name_not_behavior() {
        assert_eq!(on_hit("Stalker").map(|hit| hit.effect), Some(Effect::Poison));
        assert!(on_hit("Lurker").is_none());
        assert!(on_hit("Drone").is_none());
    }

    #[test]
    fn behavior_parses_lowercase() {
        let parsed: Behavior = serde_json::from_str("\"exploder\"").unwrap();
        assert_eq!(parsed, Behavior::Exploder);
    }
}
