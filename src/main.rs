mod render;

use std::env;

use bracket_geometry::prelude::Point;
use bracket_terminal::prelude::*;
use erebus::data::Content;
use erebus::entity::Player;
use erebus::map::manhattan;
use erebus::scripted_input::ScriptedInput;
use erebus::site::builtin_sites;
use erebus::{Command, Direction, Engine, EngineConfig, RunOutcome};
use render::{HUD_ROWS, Hud, draw_log, draw_map};

const SCREEN_WIDTH: i32 = 82;
const SCREEN_HEIGHT: i32 = 55;
const MAP_ORIGIN_X: i32 = 1;
const LOG_RESERVED_ROWS: i32 = 8;

/// What the next key press means.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Waiting for a direction (or Enter) to aim the equipped tool.
    Tool,
    /// Waiting for a shelf number.
    Buy,
}

struct ErebusState {
    config: EngineConfig,
    engine: Engine,
    hud: Hud,
    mode: Mode,
    message_log: Vec<String>,
    site: usize,
    runs: u64,
}

/// Flies a fresh player to built-in site `index`, paying the fuel up front.
fn new_engine(config: &EngineConfig, index: usize) -> Engine {
    let mut sites = builtin_sites();
    let site = sites.swap_remove(index.min(sites.len() - 1));
    let mut player = Player::default();
    player.fuel -= site.travel_cost(&player);
    Engine::new(config.clone(), Content::builtin(), site, player)
}

impl ErebusState {
    fn new(config: EngineConfig, site: usize) -> Self {
        let engine = new_engine(&config, site);
        let arrival = format!("Signal acquired. {}, floor 1.", engine.site().name);
        let mut state = Self {
            config,
            engine,
            hud: Hud,
            mode: Mode::Normal,
            message_log: Vec::new(),
            site,
            runs: 0,
        };
        state.push_log_entry(arrival);
        state
    }

    fn push_log_entry<S: Into<String>>(&mut self, entry: S) {
        self.message_log.insert(0, entry.into());
        self.message_log.truncate(self.config.log_capacity.max(1));
    }

    fn run(&mut self, command: Command) {
        for message in self.engine.execute(command) {
            self.push_log_entry(message);
        }
        if let Some(outcome) = self.engine.outcome() {
            let line = match outcome {
                RunOutcome::Dead => "Run over. [Enter] to try again.",
                RunOutcome::Escaped => "You made it out. [Enter] for a new run.",
                RunOutcome::Restarted => "Run abandoned. [Enter] for a new run.",
            };
            self.push_log_entry(line);
        }
    }

    fn new_run(&mut self) {
        self.runs += 1;
        self.config.seed = self.config.seed.wrapping_add(1);
        self.engine = new_engine(&self.config, self.site);
        self.mode = Mode::Normal;
        self.message_log.clear();
        self.push_log_entry(format!("Run {} begins (seed {}).", self.runs + 1, self.config.seed));
    }

    fn nearest_visible_enemy(&self) -> Option<Point> {
        let pos = self.engine.player_pos();
        self.engine
            .floor()
            .enemies
            .keys()
            .copied()
            .filter(|at| self.engine.visible().contains(at))
            .min_by_key(|at| manhattan(*at, pos))
    }

    fn handle_input(&mut self, ctx: &mut BTerm) {
        let Some(key) = ctx.key else {
            return;
        };
        if self.engine.outcome().is_some() {
            if key == VirtualKeyCode::Return {
                self.new_run();
            }
            return;
        }

        match self.mode {
            Mode::Tool => {
                self.mode = Mode::Normal;
                match key {
                    VirtualKeyCode::Return | VirtualKeyCode::X => {
                        self.run(Command::ActivateTool(None))
                    }
                    _ => {
                        if let Some(dir) = direction_for(key) {
                            self.run(Command::ActivateTool(Some(dir)));
                        }
                    }
                }
                return;
            }
            Mode::Buy => {
                self.mode = Mode::Normal;
                if let Some(slot) = digit_for(key) {
                    self.run(Command::Buy(slot));
                }
                return;
            }
            Mode::Normal => {}
        }

        if let Some(dir) = direction_for(key) {
            self.run(Command::Move(dir));
            return;
        }
        if let Some(slot) = digit_for(key) {
            self.run(Command::UseItem(slot));
            return;
        }
        match key {
            VirtualKeyCode::Period | VirtualKeyCode::Space => self.run(Command::Wait),
            VirtualKeyCode::PageDown => self.run(Command::Descend),
            VirtualKeyCode::PageUp => self.run(Command::Ascend),
            VirtualKeyCode::F => match self.nearest_visible_enemy() {
                Some(target) => self.run(Command::Fire(target)),
                None => self.push_log_entry("No target in sight."),
            },
            VirtualKeyCode::X => {
                self.mode = Mode::Tool;
                self.push_log_entry("Tool: pick a direction, or [Enter].");
            }
            VirtualKeyCode::T => {
                self.mode = Mode::Buy;
                self.push_log_entry("Trade: pick a shelf [0-9].");
            }
            VirtualKeyCode::R => self.run(Command::Disarm),
            VirtualKeyCode::H => self.run(Command::AccessTerminal),
            VirtualKeyCode::L => self.run(Command::LeaveSite),
            VirtualKeyCode::Escape => self.run(Command::Restart),
            _ => {}
        }
    }

    fn draw_shop(&self, ctx: &mut BTerm, y: i32) {
        let floor = self.engine.floor();
        let Some(room) = floor.special_room_at(self.engine.player_pos()) else {
            return;
        };
        let room = &floor.special_rooms[room];
        for (idx, entry) in room.stock.iter().take(10).enumerate() {
            let price = self.engine.price_of(entry.price);
            ctx.print_color(
                MAP_ORIGIN_X + 1,
                y + idx as i32,
                RGB::named(GOLD),
                RGB::named(BLACK),
                format!("[{idx}] {} {}  {price} cr", entry.item.name, entry.item.summary()),
            );
        }
    }

    fn draw_scene(&self, ctx: &mut BTerm) {
        self.hud.draw(ctx, &self.engine);
        draw_map(
            ctx,
            &self.engine,
            Point::new(MAP_ORIGIN_X, HUD_ROWS),
            LOG_RESERVED_ROWS,
        );
        if self.mode == Mode::Buy {
            self.draw_shop(ctx, HUD_ROWS + 1);
        }
        draw_log(ctx, &self.message_log, SCREEN_HEIGHT - LOG_RESERVED_ROWS + 1);
    }
}

impl GameState for ErebusState {
    fn tick(&mut self, ctx: &mut BTerm) {
        self.handle_input(ctx);
        ctx.cls();
        self.draw_scene(ctx);
    }
}

fn direction_for(key: VirtualKeyCode) -> Option<Direction> {
    let dir = match key {
        VirtualKeyCode::Up | VirtualKeyCode::W | VirtualKeyCode::K => Direction::North,
        VirtualKeyCode::Down | VirtualKeyCode::S | VirtualKeyCode::J => Direction::South,
        VirtualKeyCode::Left | VirtualKeyCode::A => Direction::West,
        VirtualKeyCode::Right | VirtualKeyCode::D => Direction::East,
        VirtualKeyCode::Q | VirtualKeyCode::Y => Direction::NorthWest,
        VirtualKeyCode::E | VirtualKeyCode::U => Direction::NorthEast,
        VirtualKeyCode::Z | VirtualKeyCode::B => Direction::SouthWest,
        VirtualKeyCode::C | VirtualKeyCode::N => Direction::SouthEast,
        _ => return None,
    };
    Some(dir)
}

fn digit_for(key: VirtualKeyCode) -> Option<usize> {
    let digit = match key {
        VirtualKeyCode::Key0 => 0,
        VirtualKeyCode::Key1 => 1,
        VirtualKeyCode::Key2 => 2,
        VirtualKeyCode::Key3 => 3,
        VirtualKeyCode::Key4 => 4,
        VirtualKeyCode::Key5 => 5,
        VirtualKeyCode::Key6 => 6,
        VirtualKeyCode::Key7 => 7,
        VirtualKeyCode::Key8 => 8,
        VirtualKeyCode::Key9 => 9,
        _ => return None,
    };
    Some(digit)
}

/// Replays a command script without opening a terminal and prints the log.
fn run_headless(config: &EngineConfig, site: usize, script: &str) -> BError {
    let mut input = ScriptedInput::from_file(script)?;
    let mut engine = new_engine(config, site);
    for line in input.replay(&mut engine) {
        println!("{line}");
    }
    let player = engine.player();
    println!(
        "-- floor {} · HP {}/{} · kills {} · outcome {:?}",
        engine.floor_number(),
        player.hp,
        player.max_hp,
        player.enemies_killed,
        engine.outcome()
    );
    Ok(())
}

fn main() -> BError {
    let mut config = EngineConfig::default();
    let mut script = None;
    let mut site = 0;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(path) = args.next() {
                    config = EngineConfig::from_path(path)?;
                }
            }
            "--seed" => {
                if let Some(seed) = args.next().and_then(|s| s.parse().ok()) {
                    config.seed = seed;
                }
            }
            "--site" => {
                if let Some(index) = args.next().and_then(|s| s.parse().ok()) {
                    site = index;
                }
            }
            "--script" => script = args.next(),
            other => eprintln!("ignoring unknown argument {other}"),
        }
    }

    if let Some(script) = script {
        return run_headless(&config, site, &script);
    }

    let context = BTermBuilder::simple(SCREEN_WIDTH, SCREEN_HEIGHT)?
        .with_title("Erebus")
        .build()?;
    main_loop(context, ErebusState::new(config, site))
}
