pub mod hazards;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::Combatant;

/// HP restored per turn by an active repair drone.
pub const REPAIR_PER_TURN: i32 = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Poison,
    Burn,
    Stun,
    Repair,
    Stim,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Poison => "poison",
            Effect::Burn => "burn",
            Effect::Stun => "stun",
            Effect::Repair => "repair",
            Effect::Stim => "stim",
        }
    }

    pub fn damage_per_turn(&self) -> Option<i32> {
        match self {
            Effect::Poison => Some(2),
            Effect::Burn => Some(3),
            _ => None,
        }
    }
}

/// Remaining turns per effect, in application order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveEffects {
    remaining: IndexMap<Effect, u32>,
}

impl ActiveEffects {
    pub fn remaining(&self, effect: Effect) -> u32 {
        self.remaining.get(&effect).copied().unwrap_or(0)
    }

    pub fn contains(&self, effect: Effect) -> bool {
        self.remaining.contains_key(&effect)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn clear(&mut self) {
        self.remaining.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Effect, u32)> + '_ {
        self.remaining.iter().map(|(effect, turns)| (*effect, *turns))
    }

    fn refresh(&mut self, effect: Effect, turns: u32) {
        let entry = self.remaining.entry(effect).or_insert(0);
        *entry = (*entry).max(turns);
    }
}

/// Refreshes `effect` to the longer of its current and new duration. A
/// combatant with an effect-reduction trait stores `turns - reduction`, never
/// less than one.
pub fn apply<C: Combatant + ?Sized>(entity: &mut C, effect: Effect, turns: u32) {
    let reduction = entity.effect_reduction();
    let turns = if reduction > 0 {
        turns.saturating_sub(reduction).max(1)
    } else {
        turns
    };
    if turns == 0 {
        return;
    }
    entity.effects_mut().refresh(effect, turns);
}

/// Advances every active effect by one turn and reports what happened.
pub fn tick<C: Combatant + ?Sized>(entity: &mut C) -> Vec<String> {
    let mut messages = Vec::new();
    let mut expired = Vec::new();
    let active: Vec<(Effect, u32)> = entity.effects().iter().collect();

    for (effect, turns) in active {
        if let Some(damage) = effect.damage_per_turn() {
            entity.take_damage(damage);
            messages.push(format!(
                "{} {} {damage} {} damage!",
                entity.label(),
                entity.verb("take", "takes"),
                effect.as_str()
            ));
        } else if effect == Effect::Repair && entity.hp() < entity.max_hp() {
            let healed = entity.heal(REPAIR_PER_TURN);
            messages.push(format!("Repair drone: +{healed} HP."));
        }

        let left = turns.saturating_sub(1);
        if left == 0 {
            expired.push(effect);
        } else if let Some(slot) = entity.effects_mut().remaining.get_mut(&effect) {
            *slot = left;
        }
    }

    for effect in expired {
        entity.effects_mut().remaining.shift_remove(&effect);
        match effect {
            Effect::Stim => {
                apply(entity, Effect::Stun, 1);
                messages.push(format!("{}: stimpack crash, stunned!", entity.label()));
            }
            Effect::Repair => {}
            _ => messages.push(format!(
                "{} {} no longer affected by {}.",
                entity.label(),
                entity.verb("are", "is"),
                effect.as_str()
            )),
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::player::{Player, Skill};
    use crate::floor::spawn_enemy;
    use crate::data::monsters::builtin_enemies;

    fn drone() -> crate::entity::Enemy {
        spawn_enemy(&builtin_enemies()[0], 1)
    }

    #[test]
    fn reapplying_refreshes_to_the_longer_duration() {
        let mut enemy = drone();
        apply(&mut enemy, Effect::Poison, 3);
        apply(&mut enemy, Effect::Poison, 2);
        assert_eq!(enemy.effects.remaining(Effect::Poison), 3);
        apply(&mut enemy, Effect::Poison, 5);
        assert_eq!(enemy.effects.remaining(Effect::Poison), 5);
    }

    #[test]
    fn survival_shortens_but_never_below_one_turn() {
        let mut player = Player::default();
        player.skills.set(Skill::Survival, 2);
        apply(&mut player, Effect::Burn, 3);
        assert_eq!(player.effects.remaining(Effect::Burn), 1);
        apply(&mut player, Effect::Stun, 1);
        assert_eq!(player.effects.remaining(Effect::Stun), 1);
    }

    #[test]
    fn poison_deals_damage_and_expires() {
        let mut player = Player::default();
        let start = player.hp;
        apply(&mut player, Effect::Poison, 2);
        let first = tick(&mut player);
        assert_eq!(player.hp, start - 2);
        assert_eq!(first.len(), 1);
        let second = tick(&mut player);
        assert_eq!(player.hp, start - 4);
        assert!(!player.effects.contains(Effect::Poison));
        assert!(second.iter().any(|m| m.contains("no longer affected by poison")));
    }

    #[test]
    fn stim_crashes_into_stun() {
        let mut player = Player::default();
        apply(&mut player, Effect::Stim, 1);
        let messages = tick(&mut player);
        assert!(!player.effects.contains(Effect::Stim));
        assert_eq!(player.effects.remaining(Effect::Stun), 1);
        assert!(messages.iter().any(|m| m.contains("crash")));
    }

    #[test]
    fn repair_heals_up_to_max_and_expires_silently() {
        let mut player = Player::default();
        player.hp = player.max_hp - 3;
        apply(&mut player, Effect::Repair, 1);
        let messages = tick(&mut player);
        assert_eq!(player.hp, player.max_hp);
        assert_eq!(messages, vec!["Repair drone: +3 HP.".to_string()]);
        assert!(player.effects.is_empty());
    }

    #[test]
    fn enemy_burn_uses_its_name() {
        let mut enemy = drone();
        apply(&mut enemy, Effect::Burn, 1);
        let messages = tick(&mut enemy);
        assert_eq!(messages[0], "Drone takes 3 burn damage!");
        assert_eq!(messages[1], "Drone is no longer affected by burn.");
    }
}
