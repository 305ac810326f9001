//! Key chords: the typed form of the key codes sent by the phone keyboard.
//!
//! The phone sends keys as short strings.  Three shapes are accepted:
//!
//! | Code        | Meaning                                   |
//! |-------------|-------------------------------------------|
//! | `"a"`, `"!"`| a single printable character              |
//! | `"enter"`   | a named key (see [`NamedKey`])            |
//! | `"ctrl+c"`  | modifiers joined to a final key with `+`  |
//!
//! Names are case-insensitive.  A lone modifier (`"shift"`) is a valid chord
//! and presses just that modifier.  The plus key itself is written `"+"` or,
//! inside a chord, `"ctrl++"`.
//!
//! # Why parse at the edge? (for beginners)
//!
//! Parsing the string into a [`KeyChord`] as soon as the request arrives means
//! an unknown key name is rejected with a `400` immediately, and the injector
//! only ever receives keys it can actually press.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a key code string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("empty key code")]
    Empty,
    #[error("unknown key name: {0}")]
    UnknownKey(String),
    #[error("modifier {0} appears twice")]
    DuplicateModifier(Modifier),
}

/// A modifier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Meta,
}

impl Modifier {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "ctrl" | "control" => Some(Modifier::Ctrl),
            "shift" => Some(Modifier::Shift),
            "alt" | "option" => Some(Modifier::Alt),
            "meta" | "cmd" | "super" | "win" => Some(Modifier::Meta),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Modifier::Ctrl => "ctrl",
            Modifier::Shift => "shift",
            Modifier::Alt => "alt",
            Modifier::Meta => "meta",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Non-character keys available on the phone keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedKey {
    Enter,
    Backspace,
    Space,
    Tab,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl NamedKey {
    /// Every named key, in keyboard order.
    pub const ALL: [NamedKey; 26] = [
        NamedKey::Enter,
        NamedKey::Backspace,
        NamedKey::Space,
        NamedKey::Tab,
        NamedKey::Escape,
        NamedKey::Up,
        NamedKey::Down,
        NamedKey::Left,
        NamedKey::Right,
        NamedKey::Home,
        NamedKey::End,
        NamedKey::PageUp,
        NamedKey::PageDown,
        NamedKey::Delete,
        NamedKey::F1,
        NamedKey::F2,
        NamedKey::F3,
        NamedKey::F4,
        NamedKey::F5,
        NamedKey::F6,
        NamedKey::F7,
        NamedKey::F8,
        NamedKey::F9,
        NamedKey::F10,
        NamedKey::F11,
        NamedKey::F12,
    ];

    /// Canonical lowercase name, as accepted by the parser.
    pub fn name(self) -> &'static str {
        match self {
            NamedKey::Enter => "enter",
            NamedKey::Backspace => "backspace",
            NamedKey::Space => "space",
            NamedKey::Tab => "tab",
            NamedKey::Escape => "escape",
            NamedKey::Up => "up",
            NamedKey::Down => "down",
            NamedKey::Left => "left",
            NamedKey::Right => "right",
            NamedKey::Home => "home",
            NamedKey::End => "end",
            NamedKey::PageUp => "page_up",
            NamedKey::PageDown => "page_down",
            NamedKey::Delete => "delete",
            NamedKey::F1 => "f1",
            NamedKey::F2 => "f2",
            NamedKey::F3 => "f3",
            NamedKey::F4 => "f4",
            NamedKey::F5 => "f5",
            NamedKey::F6 => "f6",
            NamedKey::F7 => "f7",
            NamedKey::F8 => "f8",
            NamedKey::F9 => "f9",
            NamedKey::F10 => "f10",
            NamedKey::F11 => "f11",
            NamedKey::F12 => "f12",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        // Aliases the browser keyboard and users commonly send.
        let canonical = match name {
            "return" => "enter",
            "esc" => "escape",
            "del" => "delete",
            "pageup" | "pgup" => "page_up",
            "pagedown" | "pgdn" => "page_down",
            "arrowup" => "up",
            "arrowdown" => "down",
            "arrowleft" => "left",
            "arrowright" => "right",
            other => other,
        };
        Self::ALL.into_iter().find(|k| k.name() == canonical)
    }
}

/// The key at the end of a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Named(NamedKey),
    /// A single printable character, case preserved.
    Char(char),
    /// A modifier pressed on its own.
    Modifier(Modifier),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Named(k) => f.write_str(k.name()),
            Key::Char(c) => write!(f, "{c}"),
            Key::Modifier(m) => f.write_str(m.name()),
        }
    }
}

/// Zero or more modifiers held while one key is pressed and released.
///
/// Modifiers are stored sorted and de-duplicated, so `"shift+ctrl+t"` and
/// `"ctrl+shift+t"` produce equal chords.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    modifiers: Vec<Modifier>,
    key: Key,
}

impl KeyChord {
    /// A chord with no modifiers.
    pub fn plain(key: Key) -> Self {
        Self {
            modifiers: Vec::new(),
            key,
        }
    }

    /// A chord with the given modifiers (sorted, duplicates removed).
    pub fn with_modifiers(mut modifiers: Vec<Modifier>, key: Key) -> Self {
        modifiers.sort_unstable();
        modifiers.dedup();
        Self { modifiers, key }
    }

    /// The chord that types one character (`' '` maps to the space key).
    pub fn from_char(c: char) -> Self {
        match c {
            ' ' => Self::plain(Key::Named(NamedKey::Space)),
            '\n' => Self::plain(Key::Named(NamedKey::Enter)),
            '\t' => Self::plain(Key::Named(NamedKey::Tab)),
            other => Self::plain(Key::Char(other)),
        }
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn key(&self) -> Key {
        self.key
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{m}+")?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for KeyChord {
    type Err = KeyParseError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        if code.is_empty() {
            return Err(KeyParseError::Empty);
        }
        // A single character is always a literal key, including "+".
        let mut chars = code.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Self::from_char(c));
        }

        // "ctrl++" → modifiers "ctrl", key "+".
        let (head, last) = match code.strip_suffix("++") {
            Some(head) => (head, "+"),
            None => match code.rsplit_once('+') {
                Some((head, last)) => (head, last),
                None => ("", code),
            },
        };

        let mut modifiers = Vec::new();
        for part in head.split('+').filter(|p| !p.is_empty()) {
            let lower = part.trim().to_ascii_lowercase();
            let modifier =
                Modifier::from_name(&lower).ok_or_else(|| KeyParseError::UnknownKey(part.to_string()))?;
            if modifiers.contains(&modifier) {
                return Err(KeyParseError::DuplicateModifier(modifier));
            }
            modifiers.push(modifier);
        }

        let key = parse_key(last.trim())?;
        Ok(Self::with_modifiers(modifiers, key))
    }
}

fn parse_key(token: &str) -> Result<Key, KeyParseError> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Err(KeyParseError::Empty),
        // Lowercase so "ctrl+C" and "ctrl+c" are the same shortcut.
        (Some(c), None) => Ok(Key::Char(c.to_ascii_lowercase())),
        _ => {
            let lower = token.to_ascii_lowercase();
            if let Some(named) = NamedKey::from_name(&lower) {
                Ok(Key::Named(named))
            } else if let Some(modifier) = Modifier::from_name(&lower) {
                Ok(Key::Modifier(modifier))
            } else {
                Err(KeyParseError::UnknownKey(token.to_string()))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
