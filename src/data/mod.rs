pub mod items;
pub mod monsters;

use bracket_random::prelude::RandomNumberGenerator;
use serde::{Deserialize, Serialize};

use crate::entity::Terminal;
use crate::error::{EngineError, Result};
use crate::map::GenParams;
use items::{Item, StockEntry, builtin_items, builtin_shop_stock};
use monsters::{EnemyTemplate, boss_template, builtin_enemies};

/// Named parameter bundle applied to a floor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default)]
    pub arrival: Option<String>,
    /// One weight per enemy template, in template order.
    pub weights: Vec<u32>,
    pub layout: GenParams,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThemeBand {
    pub first: u32,
    pub last: u32,
    pub theme: Theme,
}

/// How a site maps its floor numbers onto the shared theme bands.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeStyle {
    #[default]
    Station,
    Frontier,
    Calyx,
    Colony,
}

const CALYX_FLOORS: [&str; 4] = ["Cargo Hold", "Crew Deck", "Bridge", "Reactor"];
const COLONY_FLOORS: [&str; 6] = ["Surface", "Sub-Level 1", "Sub-Level 2", "Bunker", "Lab", "Core"];

impl ThemeStyle {
    pub fn resolve(&self, content: &Content, floor: u32) -> Theme {
        let floor = floor.max(1);
        let (source, name) = match self {
            ThemeStyle::Station => return content.theme_for(floor).clone(),
            ThemeStyle::Frontier => (1, "Frontier Town"),
            ThemeStyle::Calyx => (
                floor.min(3),
                CALYX_FLOORS[(floor as usize - 1).min(CALYX_FLOORS.len() - 1)],
            ),
            ThemeStyle::Colony => (
                (floor + 1).min(9),
                COLONY_FLOORS[(floor as usize - 1).min(COLONY_FLOORS.len() - 1)],
            ),
        };
        Theme {
            name: name.to_string(),
            ..content.theme_for(source).clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoreEntry {
    pub title: String,
    pub lines: Vec<String>,
}

impl LoreEntry {
    fn new(title: &str, lines: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            lines: lines.iter().map(|line| line.to_string()).collect(),
        }
    }

    pub fn to_terminal(&self) -> Terminal {
        Terminal::new(self.title.clone(), self.lines.clone())
    }
}

/// Every table the engine draws from. Any field missing from a JSON document
/// keeps its built-in value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    pub enemies: Vec<EnemyTemplate>,
    pub boss: EnemyTemplate,
    pub items: Vec<Item>,
    pub shop_stock: Vec<StockEntry>,
    pub lore: Vec<LoreEntry>,
    pub themes: Vec<ThemeBand>,
}

impl Default for Content {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Content {
    pub fn builtin() -> Self {
        Self {
            enemies: builtin_enemies(),
            boss: boss_template(),
            items: builtin_items(),
            shop_stock: builtin_shop_stock(),
            lore: builtin_lore(),
            themes: builtin_themes(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let content: Content = serde_json::from_str(json)?;
        content.validate()?;
        Ok(content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.enemies.is_empty() {
            return Err(EngineError::Invalid("no enemy templates".into()));
        }
        if self.themes.is_empty() {
            return Err(EngineError::Invalid("no themes".into()));
        }
        for band in &self.themes {
            let theme = &band.theme;
            if band.first > band.last {
                return Err(EngineError::Invalid(format!(
                    "theme {} covers floors {}..{}",
                    theme.name, band.first, band.last
                )));
            }
            if theme.weights.len() != self.enemies.len() {
                return Err(EngineError::Invalid(format!(
                    "theme {} has {} weights for {} enemy templates",
                    theme.name,
                    theme.weights.len(),
                    self.enemies.len()
                )));
            }
            let params = &theme.layout;
            if params.min_room_w < 1
                || params.min_room_h < 1
                || params.min_room_w > params.max_room_w
                || params.min_room_h > params.max_room_h
            {
                return Err(EngineError::Invalid(format!(
                    "theme {} has inverted room size ranges",
                    theme.name
                )));
            }
        }
        Ok(())
    }

    /// The band holding `floor`, or the deepest band past the end.
    pub fn theme_for(&self, floor: u32) -> &Theme {
        self.themes
            .iter()
            .find(|band| band.first <= floor && floor <= band.last)
            .or_else(|| self.themes.last())
            .map(|band| &band.theme)
            .unwrap_or(&FALLBACK_THEME)
    }
}

static FALLBACK_THEME: Theme = Theme {
    name: String::new(),
    arrival: None,
    weights: Vec::new(),
    layout: GenParams {
        max_rooms: 30,
        min_room_w: 5,
        max_room_w: 12,
        min_room_h: 4,
        max_room_h: 9,
    },
};

fn band(
    first: u32,
    last: u32,
    name: &str,
    arrival: Option<&str>,
    weights: [u32; 7],
    size: (usize, i32, i32, i32, i32),
) -> ThemeBand {
    ThemeBand {
        first,
        last,
        theme: Theme {
            name: name.to_string(),
            arrival: arrival.map(str::to_string),
            weights: weights.to_vec(),
            layout: GenParams {
                max_rooms: size.0,
                min_room_w: size.1,
                max_room_w: size.2,
                min_room_h: size.3,
                max_room_h: size.4,
            },
        },
    }
}

pub fn builtin_themes() -> Vec<ThemeBand> {
    vec![
        band(1, 3, "Operations Deck", None, [5, 3, 1, 2, 1, 0, 2], (30, 5, 12, 4, 9)),
        band(
            4,
            6,
            "Research Wing",
            Some("Emergency lighting only. The station is badly damaged."),
            [2, 5, 2, 3, 2, 1, 2],
            (25, 4, 10, 3, 8),
        ),
        band(
            7,
            9,
            "Sublevel Core",
            Some("The signal is overwhelming. Something is very wrong here."),
            [1, 2, 5, 2, 3, 2, 1],
            (20, 3, 9, 3, 7),
        ),
        band(
            10,
            10,
            "Signal Source",
            Some("You feel it in your bones. You have arrived."),
            [0, 1, 4, 1, 3, 3, 1],
            (15, 6, 14, 5, 11),
        ),
    ]
}

pub fn builtin_lore() -> Vec<LoreEntry> {
    vec![
        LoreEntry::new(
            "Station Directive 7",
            &[
                "All personnel are to remain on assigned decks.",
                "Signal research is restricted to Sublevel clearance.",
                "Report unexplained audio to Security immediately.",
            ],
        ),
        LoreEntry::new(
            "Personal Log: Dr. Ames",
            &[
                "The carrier wave repeats every 41 seconds.",
                "It changes when we listen. I am sure of it now.",
            ],
        ),
        LoreEntry::new(
            "Security Bulletin",
            &[
                "Drone patrol routes have been altered without authorisation.",
                "Do not approach units showing red status lights.",
            ],
        ),
        LoreEntry::new(
            "HADES-7 Containment Notice",
            &[
                "Containment integrity: 34%.",
                "The core intelligence is no longer responding to shutdown codes.",
                "Evacuate the lower decks.",
            ],
        ),
    ]
}

const CREW: [&str; 8] = [
    "Okafor", "Lindqvist", "Reyes", "Tanaka", "Marsh", "Volkova", "Achebe", "Cole",
];
const LOCATIONS: [&str; 6] = [
    "Hydroponics",
    "Reactor Access",
    "Cargo Bay 3",
    "Comms Array",
    "Med Deck",
    "Lab C",
];
const AMBIENT_LINES: [[&str; 3]; 3] = [
    [
        "Routine sweep of {loc} complete. Nothing to report.",
        "Filed a maintenance request for {loc}. Still waiting.",
        "Crew morale is fine. Coffee supply is not.",
    ],
    [
        "Lost contact with the {loc} team two shifts ago.",
        "Something is interfering with the intercom near {loc}.",
        "Sealed {loc}. Nobody asked why. Nobody wanted to know.",
    ],
    [
        "I can hear it through the walls of {loc}.",
        "The signal knows my name. It used it in {loc}.",
        "If you are reading this, do not go below {loc}.",
    ],
];

/// A procedurally filled crew log; later floors read darker.
pub fn ambient_terminal(floor: u32, rng: &mut RandomNumberGenerator) -> Terminal {
    let tier = match floor {
        0..=3 => 0,
        4..=6 => 1,
        _ => 2,
    };
    let day = 40 + tier as i32 * 20 + rng.range(0, 20);
    let name = CREW[rng.range(0, CREW.len() as i32) as usize];
    let loc = LOCATIONS[rng.range(0, LOCATIONS.len() as i32) as usize];
    let pool = &AMBIENT_LINES[tier];
    let line = pool[rng.range(0, pool.len() as i32) as usize].replace("{loc}", loc);
    Terminal::new(
        format!("Crew Log: {name}, Day {day}"),
        vec![line, String::new(), format!("-- {name}")],
    )
}

/// Index chosen in proportion to `weights`; `None` when every weight is zero.
pub fn pick_weighted(weights: &[u32], rng: &mut RandomNumberGenerator) -> Option<usize> {
    let total: u32 = weights.iter().sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.range(0, total as i32) as u32;
    for (idx, weight) in weights.iter().enumerate() {
        if roll < *weight {
            return Some(idx);
        }
        roll -= weight;
    }
    None
}

pub fn shuffle<T>(items: &mut [T], rng: &mut RandomNumberGenerator) {
    for i in (1..items.len()).rev() {
        let j = rng.range(0, i as i32 + 1) as usize;
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_content_is_valid() {
        Content::builtin().validate().unwrap();
    }

    #[test]
    fn floors_past_the_last_band_use_the_deepest_theme() {
        let content = Content::builtin();
        assert_eq!(content.theme_for(2).name, "Operations Deck");
        assert_eq!(content.theme_for(10).name, "Signal Source");
        assert_eq!(content.theme_for(14).name, "Signal Source");
    }

    #[test]
    fn site_styles_rename_floors() {
        let content = Content::builtin();
        let calyx = ThemeStyle::Calyx.resolve(&content, 4);
        assert_eq!(calyx.name, "Reactor");
        assert_eq!(calyx.weights, content.theme_for(3).weights);
        let colony = ThemeStyle::Colony.resolve(&content, 3);
        assert_eq!(colony.name, "Sub-Level 2");
        assert_eq!(colony.layout, content.theme_for(4).layout);
        assert_eq!(ThemeStyle::Frontier.resolve(&content, 1).name, "Frontier Town");
    }

    #[test]
    fn mismatched_weights_are_rejected() {
        let json = r#"{"themes":[{"first":1,"last":10,"theme":{"name":"Bare","weights":[1],
            "layout":{"max_rooms":5,"min_room_w":3,"max_room_w":4,"min_room_h":3,"max_room_h":4}}}]}"#;
        assert!(matches!(Content::from_json_str(json), Err(EngineError::Invalid(_))));
    }

    #[test]
    fn partial_json_keeps_builtin_tables() {
        let content = Content::from_json_str(r#"{"lore":[]}"#).unwrap();
        assert!(content.lore.is_empty());
        assert_eq!(content.enemies.len(), 7);
    }

    #[test]
    fn zero_weights_never_pick() {
        let mut rng = RandomNumberGenerator::seeded(8);
        assert_eq!(pick_weighted(&[0, 0], &mut rng), None);
        for _ in 0..100 {
            assert_eq!(pick_weighted(&[0, 3, 0], &mut rng), Some(1));
        }
    }

    #[test]
    fn shuffle_keeps_every_element() {
        let mut rng = RandomNumberGenerator::seeded(9);
        let mut values: Vec<u32> = (0..10).collect();
        shuffle(&mut values, &mut rng);
        values.sort();
        assert_eq!(values, (0..10).collect::<Vec<_>>());
    }
}
