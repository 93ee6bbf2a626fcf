use bracket_geometry::prelude::Point;
use bracket_terminal::prelude::*;

use erebus::Engine;
use erebus::effects::hazards::HazardKind;
use erebus::floor::SpecialKind;
use erebus::map::TileKind;

pub const HUD_ROWS: i32 = 6;

/// Status box across the top of the screen.
pub struct Hud;

impl Hud {
    pub fn draw(&self, ctx: &mut BTerm, engine: &Engine) {
        let (width, _) = ctx.get_char_size();
        ctx.draw_box(0, 0, width as i32 - 1, HUD_ROWS - 1, RGB::named(GRAY), RGB::named(BLACK));

        let site = engine.site();
        ctx.print_color(
            2,
            1,
            RGB::named(WHITE),
            RGB::named(BLACK),
            format!("{} · Floor {} · {}", site.name, engine.floor_number(), engine.theme().name),
        );

        let player = engine.player();
        let ratio = player.hp as f32 / player.max_hp.max(1) as f32;
        let hp_color = if ratio <= 0.3 {
            RGB::named(ORANGE)
        } else if ratio <= 0.6 {
            RGB::from_u8(255, 120, 120)
        } else {
            RGB::named(LIGHT_GREEN)
        };
        ctx.print_color(
            2,
            2,
            hp_color,
            RGB::named(BLACK),
            format!("HP {}/{}", player.hp, player.max_hp),
        );
        ctx.print_color(
            16,
            2,
            RGB::named(LIGHT_BLUE),
            RGB::named(BLACK),
            format!(
                "LV {}  XP {}/{}  CR {}  FUEL {}",
                player.level,
                player.xp,
                player.xp_next(),
                player.credits,
                player.fuel
            ),
        );

        let effects: Vec<String> = player
            .effects
            .iter()
            .map(|(effect, turns)| format!("{}({turns})", effect.as_str()))
            .collect();
        if !effects.is_empty() {
            ctx.print_color(2, 3, RGB::named(YELLOW), RGB::named(BLACK), effects.join(" "));
        }
        if engine.corruption() > 0 {
            ctx.print_color(
                2,
                4,
                RGB::named(MAGENTA),
                RGB::named(BLACK),
                format!("SIGNAL {}%", engine.corruption()),
            );
        }
        self.draw_quickbar(ctx, engine, 16, 4);
    }

    fn draw_quickbar(&self, ctx: &mut BTerm, engine: &Engine, x: i32, y: i32) {
        let mut x = x;
        for (idx, item) in engine.player().inventory.iter().take(5).enumerate() {
            let label = format!("[{idx}] {}", item.name);
            ctx.print_color(x, y, RGB::named(CYAN), RGB::named(BLACK), &label);
            x += label.len() as i32 + 2;
        }
    }
}

pub fn draw_log(ctx: &mut BTerm, log: &[String], start_y: i32) {
    let (width, _) = ctx.get_char_size();
    let shown = log.len().min(5);
    let top = (start_y - 1).max(0);
    ctx.draw_box(
        0,
        top,
        width as i32 - 1,
        shown as i32 + 2,
        RGB::named(DARK_GRAY),
        RGB::named(BLACK),
    );
    ctx.print_color(2, top + 1, RGB::named(WHITE), RGB::named(BLACK), "Comms");
    for (row, entry) in log.iter().take(shown).enumerate() {
        ctx.print(2, top + 2 + row as i32, entry);
    }
}

fn tile_glyph(kind: TileKind) -> (FontCharType, RGB) {
    match kind {
        TileKind::Wall => (to_cp437('#'), RGB::named(SLATE_GRAY)),
        TileKind::Floor => (to_cp437('.'), RGB::named(DIM_GRAY)),
    }
}

fn special_color(kind: SpecialKind) -> RGB {
    match kind {
        SpecialKind::Shop => RGB::named(GOLD),
        SpecialKind::Armory => RGB::named(STEEL_BLUE),
        SpecialKind::Medbay => RGB::named(PALE_GREEN),
        SpecialKind::TerminalHub => RGB::named(TEAL),
        SpecialKind::Vault => RGB::named(PURPLE),
    }
}

/// Draws remembered and visible terrain, then whatever stands on visible
/// tiles.
pub fn draw_map(ctx: &mut BTerm, engine: &Engine, origin: Point, reserved_rows: i32) {
    let (screen_w, screen_h) = ctx.get_char_size();
    let max_draw_y = screen_h as i32 - reserved_rows;
    let max_draw_x = screen_w as i32 - 1;
    let grid = engine.grid();
    let floor = engine.floor();
    let visible = engine.visible();
    let explored = engine.explored();

    let on_screen = |point: Point| {
        let screen = Point::new(origin.x + point.x, origin.y + point.y);
        (screen.x < max_draw_x && screen.y < max_draw_y).then_some(screen)
    };

    for y in 0..grid.height {
        for x in 0..grid.width {
            let point = Point::new(x, y);
            let Some(screen) = on_screen(point) else {
                continue;
            };
            let (glyph, mut fg) = tile_glyph(grid.kind(point));
            if let Some(room) = floor.special_room_at(point) {
                fg = special_color(floor.special_rooms[room].kind);
            }
            if visible.contains(&point) {
                let bg = if engine.smoke().contains_key(&point) {
                    RGB::named(DARKSLATEGRAY)
                } else {
                    RGB::named(BLACK)
                };
                ctx.set(screen.x, screen.y, fg, bg, glyph);
            } else if explored.contains(&point) {
                ctx.set(screen.x, screen.y, RGB::named(DARK_GRAY), RGB::named(BLACK), glyph);
            }
        }
    }

    let mut put = |point: Point, ch: char, fg: RGB| {
        if visible.contains(&point) {
            if let Some(screen) = on_screen(point) {
                ctx.set(screen.x, screen.y, fg, RGB::named(BLACK), to_cp437(ch));
            }
        }
    };

    put(floor.stair_up, '<', RGB::named(WHITE));
    if let Some(down) = floor.stair_down {
        put(down, '>', RGB::named(WHITE));
    }
    for (point, terminal) in &floor.terminals {
        let fg = if terminal.read { GRAY } else { LIGHT_CYAN };
        put(*point, '&', RGB::named(fg));
    }
    for (point, hazard) in &floor.hazards {
        if hazard.revealed {
            let fg = match hazard.kind {
                HazardKind::Mine | HazardKind::ProximityMine => RED,
                HazardKind::Acid => LIME_GREEN,
                HazardKind::Electric => YELLOW,
            };
            put(*point, '^', RGB::named(fg));
        }
    }
    for point in floor.items.keys() {
        put(*point, '!', RGB::named(GOLD));
    }
    for (point, enemy) in &floor.enemies {
        let fg = if enemy.boss { MAGENTA } else { ORANGE_RED };
        put(*point, enemy.glyph, RGB::named(fg));
    }
    put(engine.player_pos(), '@', RGB::named(YELLOW));
}
