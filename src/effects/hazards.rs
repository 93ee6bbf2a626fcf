use bracket_geometry::prelude::Point;
use bracket_random::prelude::RandomNumberGenerator;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Effect, apply};
use crate::entity::{Combatant, Enemy, dodges};

/// Damage dealt to an enemy that ends its move on a player-placed mine.
pub const PLAYER_MINE_DAMAGE: i32 = 12;

/// Relative weights for mine / acid / electric when scattering traps.
pub const TRAP_WEIGHTS: [(HazardKind, u32); 3] = [
    (HazardKind::Mine, 40),
    (HazardKind::Acid, 30),
    (HazardKind::Electric, 30),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    Mine,
    Acid,
    Electric,
    ProximityMine,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TrapSpec {
    pub effect: Effect,
    pub effect_turns: u32,
    pub damage: i32,
    pub triggers: u32,
}

impl HazardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardKind::Mine => "mine",
            HazardKind::Acid => "acid",
            HazardKind::Electric => "electric",
            HazardKind::ProximityMine => "proximity mine",
        }
    }

    /// Entry behaviour for map traps. Player-placed mines have none: they only
    /// go off under enemies.
    pub fn trap_spec(&self) -> Option<TrapSpec> {
        match self {
            HazardKind::Mine => Some(TrapSpec {
                effect: Effect::Burn,
                effect_turns: 3,
                damage: 8,
                triggers: 1,
            }),
            HazardKind::Acid => Some(TrapSpec {
                effect: Effect::Burn,
                effect_turns: 3,
                damage: 0,
                triggers: 5,
            }),
            HazardKind::Electric => Some(TrapSpec {
                effect: Effect::Stun,
                effect_turns: 2,
                damage: 0,
                triggers: 4,
            }),
            HazardKind::ProximityMine => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hazard {
    pub kind: HazardKind,
    pub triggers_left: u32,
    pub revealed: bool,
    pub placed_by_player: bool,
}

impl Hazard {
    pub fn trap(kind: HazardKind) -> Self {
        Self {
            kind,
            triggers_left: kind.trap_spec().map_or(1, |spec| spec.triggers),
            revealed: false,
            placed_by_player: false,
        }
    }

    pub fn player_mine() -> Self {
        Self {
            kind: HazardKind::ProximityMine,
            triggers_left: 1,
            revealed: true,
            placed_by_player: true,
        }
    }
}

fn consume_charge(hazards: &mut IndexMap<Point, Hazard>, pos: Point) {
    let spent = match hazards.get_mut(&pos) {
        Some(hazard) => {
            hazard.triggers_left = hazard.triggers_left.saturating_sub(1);
            hazard.triggers_left == 0
        }
        None => false,
    };
    if spent {
        hazards.shift_remove(&pos);
    }
}

/// Springs the trap at `pos` on an entity that just stepped onto it. A
/// successful dodge leaves the trap armed. Direct damage scales with depth.
pub fn trigger_on_entry<C: Combatant + ?Sized>(
    hazards: &mut IndexMap<Point, Hazard>,
    pos: Point,
    entity: &mut C,
    floor_number: u32,
    rng: &mut RandomNumberGenerator,
) -> Vec<String> {
    let mut messages = Vec::new();
    let Some(hazard) = hazards.get(&pos) else {
        return messages;
    };
    if hazard.placed_by_player {
        return messages;
    }
    let Some(spec) = hazard.kind.trap_spec() else {
        return messages;
    };
    let name = hazard.kind.as_str();

    if dodges(entity, rng) {
        messages.push(format!("{}: sensed danger and sidestepped the {name}!", entity.label()));
        return messages;
    }

    if spec.damage > 0 {
        let damage = spec.damage + floor_number as i32;
        entity.take_damage(damage);
        messages.push(format!("{} detonates! -{damage} HP!", capitalize(name)));
    }
    apply(entity, spec.effect, spec.effect_turns);
    messages.push(format!(
        "{}: {} {}t!",
        capitalize(name),
        spec.effect.as_str(),
        spec.effect_turns
    ));
    consume_charge(hazards, pos);
    log::debug!("{name} at {},{} triggered", pos.x, pos.y);
    messages
}

/// Detonates a player-placed mine under `enemy`, if there is one.
pub fn trigger_player_mine(
    hazards: &mut IndexMap<Point, Hazard>,
    pos: Point,
    enemy: &mut Enemy,
) -> Option<String> {
    if !hazards.get(&pos).is_some_and(|hazard| hazard.placed_by_player) {
        return None;
    }
    enemy.take_damage(PLAYER_MINE_DAMAGE);
    consume_charge(hazards, pos);
    Some(format!(
        "BOOM! Mine hits {} for {PLAYER_MINE_DAMAGE}!",
        enemy.name
    ))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
