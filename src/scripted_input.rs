use std::fs;
use std::path::Path;

use crate::engine::{Command, Direction, Engine};
use crate::error::{EngineError, Result};

/// A list of commands read from a plain-text script, one character per
/// command. `#` starts a comment that runs to the end of the line.
pub struct ScriptedInput {
    commands: Vec<Command>,
    cursor: usize,
}

impl ScriptedInput {
    pub fn parse(text: &str) -> Self {
        let mut commands = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default();
            let mut chars = line.chars().peekable();
            while let Some(c) = chars.next() {
                if c.is_whitespace() {
                    continue;
                }
                if c == 'u' || c == 'U' {
                    match chars.peek().and_then(|next| next.to_digit(10)) {
                        Some(slot) => {
                            chars.next();
                            commands.push(Command::UseItem(slot as usize));
                        }
                        None => log::warn!("script line {}: 'u' without a slot digit", line_no + 1),
                    }
                    continue;
                }
                match char_to_command(c) {
                    Some(command) => commands.push(command),
                    None => log::warn!("script line {}: unknown key {c:?}", line_no + 1),
                }
            }
        }

        Self {
            commands,
            cursor: 0,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn next_command(&mut self) -> Option<Command> {
        let command = self.commands.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(command)
    }

    /// Feeds the rest of the script to `engine`, stopping early once the run
    /// ends. Returns every message produced along the way.
    pub fn replay(&mut self, engine: &mut Engine) -> Vec<String> {
        let mut log = Vec::new();
        while engine.outcome().is_none() {
            let Some(command) = self.next_command() else {
                break;
            };
            log.extend(engine.execute(command));
        }
        log
    }
}

fn char_to_command(c: char) -> Option<Command> {
    let command = match c.to_ascii_lowercase() {
        'w' => Command::Move(Direction::North),
        's' => Command::Move(Direction::South),
        'a' => Command::Move(Direction::West),
        'd' => Command::Move(Direction::East),
        'q' => Command::Move(Direction::NorthWest),
        'e' => Command::Move(Direction::NorthEast),
        'z' => Command::Move(Direction::SouthWest),
        'c' => Command::Move(Direction::SouthEast),
        '.' => Command::Wait,
        '>' => Command::Descend,
        '<' => Command::Ascend,
        'x' => Command::ActivateTool(None),
        'r' => Command::Disarm,
        'h' => Command::AccessTerminal,
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_moves_and_actions() {
        let script = ScriptedInput::parse("wasd .\n> < x r h");
        assert_eq!(
            script.commands(),
            &[
                Command::Move(Direction::North),
                Command::Move(Direction::West),
                Command::Move(Direction::South),
                Command::Move(Direction::East),
                Command::Wait,
                Command::Descend,
                Command::Ascend,
                Command::ActivateTool(None),
                Command::Disarm,
                Command::AccessTerminal,
            ]
        );
    }

    #[test]
    fn diagonals_and_item_slots() {
        let script = ScriptedInput::parse("qezc u3 U0");
        assert_eq!(
            script.commands(),
            &[
                Command::Move(Direction::NorthWest),
                Command::Move(Direction::NorthEast),
                Command::Move(Direction::SouthWest),
                Command::Move(Direction::SouthEast),
                Command::UseItem(3),
                Command::UseItem(0),
            ]
        );
    }

    #[test]
    fn comments_and_unknown_keys_are_skipped() {
        let script = ScriptedInput::parse("# warm up\nw ? u # trailing d\n\nd");
        assert_eq!(
            script.commands(),
            &[Command::Move(Direction::North), Command::Move(Direction::East)]
        );
    }

    #[test]
    fn next_command_walks_the_script_once() {
        let mut script = ScriptedInput::parse("w.");
        assert_eq!(script.next_command(), Some(Command::Move(Direction::North)));
        assert_eq!(script.next_command(), Some(Command::Wait));
        assert_eq!(script.next_command(), None);
    }

    #[test]
    fn missing_script_is_an_io_error() {
        assert!(matches!(
            ScriptedInput::from_file("/no/such/script.txt"),
            Err(EngineError::Io { .. })
        ));
    }
}
