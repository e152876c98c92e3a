//! Special-key tokenizer for `$` lines.
//!
//! Text inside `<...>` on a typing line names a key (`<ret>`, `<F5>`) or a
//! modifier combination (`<C-c>`, `<A-ret>`, `<C-A-x>`). This module maps
//! those specs to the byte sequences an xterm-compatible terminal sends.

/// A key that can be written by name inside `<...>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedKey {
    /// Accepted spellings; the first is canonical.
    pub names: &'static [&'static str],
    /// Sequence sent to the terminal.
    pub sequence: &'static str,
}

impl NamedKey {
    /// Canonical spelling.
    pub fn name(&self) -> &'static str {
        self.names[0]
    }
}

/// All named keys, in display order.
pub const NAMED_KEYS: &[NamedKey] = &[
    NamedKey { names: &["esc"], sequence: "\x1b" },
    NamedKey { names: &["space"], sequence: " " },
    NamedKey { names: &["ret", "return", "enter"], sequence: "\r" },
    NamedKey { names: &["tab"], sequence: "\t" },
    NamedKey { names: &["backspace", "bs"], sequence: "\x7f" },
    NamedKey { names: &["F1"], sequence: "\x1bOP" },
    NamedKey { names: &["F2"], sequence: "\x1bOQ" },
    NamedKey { names: &["F3"], sequence: "\x1bOR" },
    NamedKey { names: &["F4"], sequence: "\x1bOS" },
    NamedKey { names: &["F5"], sequence: "\x1b[15~" },
    NamedKey { names: &["F6"], sequence: "\x1b[17~" },
    NamedKey { names: &["F7"], sequence: "\x1b[18~" },
    NamedKey { names: &["F8"], sequence: "\x1b[19~" },
    NamedKey { names: &["F9"], sequence: "\x1b[20~" },
    NamedKey { names: &["F10"], sequence: "\x1b[21~" },
    NamedKey { names: &["F11"], sequence: "\x1b[23~" },
    NamedKey { names: &["F12"], sequence: "\x1b[24~" },
    NamedKey { names: &["up"], sequence: "\x1b[A" },
    NamedKey { names: &["down"], sequence: "\x1b[B" },
    NamedKey { names: &["right"], sequence: "\x1b[C" },
    NamedKey { names: &["left"], sequence: "\x1b[D" },
    NamedKey { names: &["home"], sequence: "\x1b[H" },
    NamedKey { names: &["end"], sequence: "\x1b[F" },
    NamedKey { names: &["pageup", "pgup"], sequence: "\x1b[5~" },
    NamedKey { names: &["pagedown", "pgdn"], sequence: "\x1b[6~" },
    NamedKey { names: &["insert", "ins"], sequence: "\x1b[2~" },
    NamedKey { names: &["delete", "del"], sequence: "\x1b[3~" },
];

/// Modifier spellings accepted in combos, as `(modifier, spellings)`.
pub const MODIFIERS: &[(&str, &[&str])] = &[
    ("Ctrl", &["C", "c", "Ctrl", "ctrl"]),
    ("Alt", &["A", "a", "Alt", "alt", "M", "m", "Meta", "meta"]),
    ("Shift", &["S", "s", "Shift", "shift"]),
];

const ESC: &str = "\x1b";

/// Look up a named key's sequence in the built-in table.
pub fn lookup(name: &str) -> Option<&'static str> {
    lookup_in(NAMED_KEYS, name)
}

/// Look up a named key's sequence in `keys`.
pub fn lookup_in(keys: &'static [NamedKey], name: &str) -> Option<&'static str> {
    keys.iter()
        .find(|key| key.names.contains(&name))
        .map(|key| key.sequence)
}

/// Resolve the contents of a `<...>` token against the built-in table.
///
/// Returns `None` when the token names no known key or combination; callers
/// type such tokens literally.
pub fn resolve(token: &str) -> Option<String> {
    resolve_in(NAMED_KEYS, token)
}

/// Resolve the contents of a `<...>` token against `keys`.
pub fn resolve_in(keys: &'static [NamedKey], token: &str) -> Option<String> {
    if let Some(sequence) = lookup_in(keys, token) {
        return Some(sequence.to_string());
    }
    if token.contains('-') {
        return resolve_combo(keys, token);
    }
    None
}

#[derive(Debug, Default, Clone, Copy)]
struct Modifiers {
    ctrl: bool,
    alt: bool,
    shift: bool,
}

impl Modifiers {
    fn parse<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut modifiers = Self::default();
        for part in parts {
            let modifier = MODIFIERS
                .iter()
                .find(|(_, spellings)| spellings.contains(&part))
                .map(|(name, _)| *name);
            match modifier {
                Some("Ctrl") => modifiers.ctrl = true,
                Some("Alt") => modifiers.alt = true,
                Some("Shift") => modifiers.shift = true,
                // Unknown modifiers are ignored.
                _ => {}
            }
        }
        modifiers
    }
}

/// The key a combo applies its modifiers to.
#[derive(Debug, Clone, Copy)]
enum BaseKey<'a> {
    Char(char),
    Named { name: &'a str, sequence: &'static str },
}

impl BaseKey<'_> {
    fn sequence(&self) -> String {
        match self {
            Self::Char(ch) => ch.to_string(),
            Self::Named { sequence, .. } => (*sequence).to_string(),
        }
    }
}

fn resolve_combo(keys: &'static [NamedKey], token: &str) -> Option<String> {
    let (modifiers, key) = token.rsplit_once('-')?;
    let modifiers = Modifiers::parse(modifiers.split('-'));

    let base = if let Some(sequence) = lookup_in(keys, key) {
        BaseKey::Named { name: key, sequence }
    } else {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => BaseKey::Char(ch),
            _ => return None,
        }
    };

    match (modifiers.ctrl, modifiers.alt, modifiers.shift) {
        (true, false, shift) => match base {
            BaseKey::Char(ch) if shift => ctrl_letter(ch),
            BaseKey::Char(ch) => ctrl_char(ch),
            BaseKey::Named { name: "space", .. } if !shift => Some("\x00".to_string()),
            BaseKey::Named { .. } => None,
        },
        (false, true, shift) => match base {
            BaseKey::Char(ch) if shift => Some(format!("{ESC}{}", ch.to_uppercase())),
            _ => Some(format!("{ESC}{}", base.sequence())),
        },
        (false, false, true) => match base {
            BaseKey::Char(ch) => Some(ch.to_uppercase().to_string()),
            BaseKey::Named { .. } => None,
        },
        (true, true, _) => match base {
            BaseKey::Char(ch) => ctrl_letter(ch).map(|code| format!("{ESC}{code}")),
            BaseKey::Named { sequence, .. } => Some(format!("{ESC}{sequence}")),
        },
        (false, false, false) => None,
    }
}

/// Ctrl applied to a letter: ASCII 1-26, case-insensitive.
fn ctrl_letter(ch: char) -> Option<String> {
    let lower = ch.to_ascii_lowercase();
    if lower.is_ascii_lowercase() {
        let code = (lower as u8) - b'a' + 1;
        Some(char::from(code).to_string())
    } else {
        None
    }
}

/// Ctrl applied to any single character with a conventional control code.
fn ctrl_char(ch: char) -> Option<String> {
    match ch {
        ' ' => Some("\x00".to_string()),
        '[' => Some(ESC.to_string()),
        ']' => Some("\x1d".to_string()),
        '\\' => Some("\x1c".to_string()),
        _ => ctrl_letter(ch),
    }
}
