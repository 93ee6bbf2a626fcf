use serde::{Deserialize, Serialize};

use crate::effects::Effect;
use crate::entity::player::Skill;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Weapon,
    Armor,
    Helmet,
    Gloves,
    Boots,
    Tool,
    /// Consumed on use, never equipped.
    Use,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemEffect {
    Heal { amount: i32 },
    Fuel { amount: i32 },
    Antidote,
    /// Thrown at the nearest visible enemy.
    Inflict { effect: Effect, turns: u32 },
    /// Reveals every hazard on the floor.
    HazardScan,
    /// Stuns visible electronic units.
    Emp { turns: u32 },
    /// Marks every floor tile as explored.
    FloorScan,
    Smoke { radius: i32, turns: u32 },
    Stim { turns: u32 },
    ProximityMine,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolEffect {
    Bypass,
    Jammer,
    Grapple,
    RepairDrone,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub effect: ToolEffect,
    pub charges: u32,
    pub max_charges: u32,
    #[serde(default)]
    pub requires: Option<(Skill, u32)>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub slot: Slot,
    #[serde(default)]
    pub attack: i32,
    #[serde(default)]
    pub defense: i32,
    #[serde(default)]
    pub ranged: bool,
    #[serde(default)]
    pub use_effect: Option<ItemEffect>,
    #[serde(default)]
    pub tool: Option<Tool>,
}

impl Item {
    fn base(name: &str, slot: Slot) -> Self {
        Self {
            name: name.to_string(),
            slot,
            attack: 0,
            defense: 0,
            ranged: false,
            use_effect: None,
            tool: None,
        }
    }

    pub fn weapon(name: &str, attack: i32, ranged: bool) -> Self {
        Self {
            attack,
            ranged,
            ..Self::base(name, Slot::Weapon)
        }
    }

    pub fn gear(name: &str, slot: Slot, attack: i32, defense: i32) -> Self {
        Self {
            attack,
            defense,
            ..Self::base(name, slot)
        }
    }

    pub fn consumable(name: &str, effect: ItemEffect) -> Self {
        Self {
            use_effect: Some(effect),
            ..Self::base(name, Slot::Use)
        }
    }

    pub fn tool(
        name: &str,
        effect: ToolEffect,
        charges: u32,
        requires: Option<(Skill, u32)>,
    ) -> Self {
        Self {
            tool: Some(Tool {
                effect,
                charges,
                max_charges: charges,
                requires,
            }),
            ..Self::base(name, Slot::Tool)
        }
    }

    pub fn is_consumable(&self) -> bool {
        self.slot == Slot::Use
    }

    /// Counts as rare vault loot.
    pub fn is_rare(&self) -> bool {
        self.attack >= 3 || self.defense >= 3
    }

    /// Short stat line for inventory panels.
    pub fn summary(&self) -> String {
        if let Some(tool) = &self.tool {
            return match tool.requires {
                Some((skill, level)) => format!(
                    "[{}/{}] [{} {level}]",
                    tool.charges,
                    tool.max_charges,
                    skill.as_str()
                ),
                None => format!("[{}/{}]", tool.charges, tool.max_charges),
            };
        }
        if let Some(effect) = &self.use_effect {
            return match effect {
                ItemEffect::Heal { amount } => format!("Heals {amount} HP"),
                ItemEffect::Fuel { amount } => format!("+{amount} Fuel"),
                ItemEffect::Antidote => "Clears effects".to_string(),
                ItemEffect::Inflict { effect, .. } => format!("Apply: {}", effect.as_str()),
                ItemEffect::HazardScan => "Detects all traps".to_string(),
                ItemEffect::Emp { .. } => "Disables drones".to_string(),
                ItemEffect::FloorScan => "Maps the floor".to_string(),
                ItemEffect::Smoke { .. } => "Hides you".to_string(),
                ItemEffect::Stim { .. } => "Double move".to_string(),
                ItemEffect::ProximityMine => "Place a mine".to_string(),
            };
        }
        let mut parts = Vec::new();
        if self.attack != 0 {
            parts.push(format!("+{} ATK", self.attack));
        }
        if self.defense != 0 {
            parts.push(format!("+{} DEF", self.defense));
        }
        if self.ranged {
            parts.push("[ranged]".to_string());
        }
        parts.join("  ")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub item: Item,
    pub price: i32,
}

/// Items that can turn up on the floor.
pub fn builtin_items() -> Vec<Item> {
    vec![
        Item::weapon("Vibro-Knife", 1, false),
        Item::weapon("Pulse Pistol", 3, true),
        Item::weapon("Arc Rifle", 5, true),
        Item::gear("Ballistic Weave", Slot::Armor, 0, 1),
        Item::gear("Combat Exosuit", Slot::Armor, 0, 3),
        Item::gear("Aegis Plate", Slot::Armor, 0, 5),
        Item::gear("Padded Cap", Slot::Helmet, 0, 1),
        Item::gear("Tactical Helmet", Slot::Helmet, 0, 2),
        Item::gear("Recon Visor", Slot::Helmet, 0, 3),
        Item::gear("Grip Gloves", Slot::Gloves, 1, 0),
        Item::gear("Shock Gauntlets", Slot::Gloves, 2, 0),
        Item::gear("Servo Fists", Slot::Gloves, 3, 0),
        Item::gear("Mag Boots", Slot::Boots, 0, 1),
        Item::gear("Reinforced Boots", Slot::Boots, 0, 2),
        Item::gear("Kinetic Treads", Slot::Boots, 0, 3),
        Item::consumable("Med-Patch", ItemEffect::Heal { amount: 10 }),
        Item::consumable("Medkit", ItemEffect::Heal { amount: 25 }),
        Item::consumable("Nano-Inject", ItemEffect::Heal { amount: 15 }),
        Item::consumable("Nano-Antidote", ItemEffect::Antidote),
        Item::consumable(
            "Toxin Grenade",
            ItemEffect::Inflict {
                effect: Effect::Poison,
                turns: 4,
            },
        ),
        Item::consumable(
            "Incendiary Grenade",
            ItemEffect::Inflict {
                effect: Effect::Burn,
                turns: 3,
            },
        ),
        Item::consumable(
            "Stun Charge",
            ItemEffect::Inflict {
                effect: Effect::Stun,
                turns: 1,
            },
        ),
        Item::consumable("EMP Charge", ItemEffect::Emp { turns: 2 }),
        Item::consumable("Smoke Grenade", ItemEffect::Smoke { radius: 3, turns: 3 }),
        Item::consumable("Stimpack", ItemEffect::Stim { turns: 5 }),
        Item::consumable("Proximity Mine", ItemEffect::ProximityMine),
        Item::consumable("Hazard Scanner", ItemEffect::HazardScan),
        Item::consumable("Scanner Chip", ItemEffect::FloorScan),
        Item::consumable("Fuel Cell", ItemEffect::Fuel { amount: 1 }),
        Item::tool("Bypass Kit", ToolEffect::Bypass, 3, Some((Skill::Engineering, 1))),
        Item::tool("Signal Jammer", ToolEffect::Jammer, 2, Some((Skill::Electronics, 1))),
        Item::tool("Grapple Line", ToolEffect::Grapple, 1, None),
        Item::tool("Repair Drone", ToolEffect::RepairDrone, 2, None),
    ]
}

/// Everything a supply depot can carry, at base price.
pub fn builtin_shop_stock() -> Vec<StockEntry> {
    let prices = [
        ("Vibro-Knife", 15),
        ("Pulse Pistol", 35),
        ("Arc Rifle", 55),
        ("Ballistic Weave", 20),
        ("Combat Exosuit", 45),
        ("Aegis Plate", 80),
        ("Tactical Helmet", 25),
        ("Shock Gauntlets", 25),
        ("Reinforced Boots", 25),
        ("Med-Patch", 10),
        ("Medkit", 25),
        ("Nano-Inject", 18),
        ("Nano-Antidote", 15),
        ("Toxin Grenade", 20),
        ("EMP Charge", 25),
        ("Smoke Grenade", 15),
        ("Stimpack", 20),
        ("Proximity Mine", 25),
        ("Fuel Cell", 30),
        ("Bypass Kit", 40),
        ("Signal Jammer", 45),
        ("Grapple Line", 35),
        ("Repair Drone", 50),
    ];
    let items = builtin_items();
    prices
        .iter()
        .filter_map(|(name, price)| {
            items
                .iter()
                .find(|item| item.name == *name)
                .map(|item| StockEntry {
                    item: item.clone(),
                    price: *price,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stock_entry_resolves() {
        assert_eq!(builtin_shop_stock().len(), 23);
    }

    #[test]
    fn tools_start_fully_charged() {
        for item in builtin_items() {
            if let Some(tool) = item.tool {
                assert_eq!(tool.charges, tool.max_charges, "{}", item.name);
                assert_eq!(item.slot, Slot::Tool);
            }
        }
    }

    #[test]
    fn summaries_describe_the_item() {
        let items = builtin_items();
        let find = |name: &str| items.iter().find(|item| item.name == name).unwrap();
        assert_eq!(find("Arc Rifle").summary(), "+5 ATK  [ranged]");
        assert_eq!(find("Medkit").summary(), "Heals 25 HP");
        assert_eq!(find("Bypass Kit").summary(), "[3/3] [Engineering 1]");
    }

    #[test]
    fn item_effects_round_trip_through_json() {
        let json = r#"{"name":"Flare","slot":"use","use_effect":{"kind":"smoke","radius":2,"turns":1}}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.use_effect, Some(ItemEffect::Smoke { radius: 2, turns: 1 }));
        assert!(item.is_consumable());
    }
}
