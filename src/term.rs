use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::cursor;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

/// The keys the interactive screens care about, already normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Esc,
    Backspace,
    Digit(u8),
    Char(char),
    CtrlC,
    Other,
}

/// Raw-mode plus alternate-screen session. Dropping the guard restores the
/// terminal, so an early return or error cannot leave the shell unusable.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)
            .context("failed to enter the alternate screen")?;
        Ok(Self { active: true })
    }

    pub fn leave(mut self) -> Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        execute!(io::stdout(), cursor::Show, LeaveAlternateScreen)
            .context("failed to leave the alternate screen")?;
        terminal::disable_raw_mode().context("failed to disable raw mode")?;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Wait up to `timeout` for a key press. Doubles as the preview loop's
/// inter-tick sleep. Non-key events (resize, release) count as "no key".
pub fn poll_key(timeout: Duration) -> Result<Option<Key>> {
    if event::poll(timeout).context("failed to poll terminal events")? {
        if let Event::Key(key) = event::read().context("failed to read terminal event")? {
            if key.kind == KeyEventKind::Press {
                return Ok(Some(map_key(key)));
            }
        }
    }
    Ok(None)
}

pub fn wait_key() -> Result<Key> {
    loop {
        if let Some(key) = poll_key(Duration::from_millis(250))? {
            return Ok(key);
        }
    }
}

/// Clear the alternate screen and draw `text` from the top-left. Raw mode
/// does not translate `\n`, so lines are positioned explicitly.
pub fn draw_screen(text: &str) -> Result<()> {
    let mut out = io::stdout();
    queue!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))
        .context("failed to clear the screen")?;
    for line in text.split('\n') {
        queue!(out, Print(line), cursor::MoveToNextLine(1))?;
    }
    out.flush().context("failed to flush the terminal")?;
    Ok(())
}

fn map_key(key: KeyEvent) -> Key {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Key::CtrlC;
    }
    match key.code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Char(c) if c.is_ascii_digit() => Key::Digit(c as u8 - b'0'),
        KeyCode::Char(c) => Key::Char(c),
        _ => Key::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::{map_key, Key};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn keys_normalize_to_the_menu_vocabulary() {
        assert_eq!(map_key(KeyEvent::from(KeyCode::Char('3'))), Key::Digit(3));
        assert_eq!(map_key(KeyEvent::from(KeyCode::Char('Q'))), Key::Char('Q'));
        assert_eq!(map_key(KeyEvent::from(KeyCode::Enter)), Key::Enter);
        assert_eq!(map_key(KeyEvent::from(KeyCode::Esc)), Key::Esc);
        assert_eq!(map_key(KeyEvent::from(KeyCode::Backspace)), Key::Backspace);
        assert_eq!(map_key(KeyEvent::from(KeyCode::Home)), Key::Other);
    }

    #[test]
    fn ctrl_c_is_distinguished_from_plain_c() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_c), Key::CtrlC);
        assert_eq!(map_key(KeyEvent::from(KeyCode::Char('c'))), Key::Char('c'));
    }
}
