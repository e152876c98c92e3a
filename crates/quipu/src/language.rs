//! The quipu language handle.
//!
//! A [`Language`] bundles everything the parser needs to read a script: the
//! directive table for `@` lines and the named-key table for `<...>` tokens
//! on `$` lines. Handles are static; obtain the built-in one with
//! [`language()`] and assign it to a [`ScriptParser`](crate::parser::ScriptParser).
//!
//! # Example
//!
//! ```
//! use quipu::language::language;
//! use quipu::parser::ScriptParser;
//!
//! let mut parser = ScriptParser::new();
//! parser.set_language(language()).expect("quipu grammar should load");
//! let script = parser.parse("$ echo hello<ret>").unwrap();
//! assert_eq!(script.commands.len(), 1);
//! ```

use crate::keys::{self, NAMED_KEYS, NamedKey};
use serde::Serialize;

/// Version of the grammar this crate defines.
pub const LANGUAGE_VERSION: u32 = 1;

/// Oldest grammar version the parser still reads.
pub const MIN_COMPATIBLE_LANGUAGE_VERSION: u32 = 1;

/// Name of the built-in language.
pub const LANGUAGE_NAME: &str = "quipu";

/// Directives understood on `@` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    /// `@ speed:<seconds>`
    Speed,
    /// `@ jitter:<fraction>`
    Jitter,
    /// `@ wait:<seconds>`
    Wait,
    /// `@ shell:<path>`
    Shell,
    /// `@ size:<cols>:<rows>`
    Size,
}

/// Shape of a directive's argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    /// Non-negative seconds as a decimal number.
    Seconds,
    /// A decimal number between 0.0 and 1.0.
    Fraction,
    /// The rest of the line.
    Text,
    /// Two positive integers separated by `:`.
    Size,
}

impl ArgumentKind {
    /// Placeholder used in help output.
    pub fn syntax(self) -> &'static str {
        match self {
            Self::Seconds => "<seconds>",
            Self::Fraction => "<0.0-1.0>",
            Self::Text => "<text>",
            Self::Size => "<cols>:<rows>",
        }
    }
}

/// One entry in a language's directive table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirectiveSpec {
    /// Keyword written before the `:`.
    pub name: &'static str,
    /// Which command the directive produces.
    pub directive: Directive,
    /// Argument shape.
    pub argument: ArgumentKind,
    /// One-line description.
    pub summary: &'static str,
}

/// Directive table of the built-in language.
pub const DIRECTIVES: &[DirectiveSpec] = &[
    DirectiveSpec {
        name: "speed",
        directive: Directive::Speed,
        argument: ArgumentKind::Seconds,
        summary: "Base time between keystrokes",
    },
    DirectiveSpec {
        name: "jitter",
        directive: Directive::Jitter,
        argument: ArgumentKind::Fraction,
        summary: "Random variation as a fraction of speed",
    },
    DirectiveSpec {
        name: "wait",
        directive: Directive::Wait,
        argument: ArgumentKind::Seconds,
        summary: "Pause before the next command",
    },
    DirectiveSpec {
        name: "shell",
        directive: Directive::Shell,
        argument: ArgumentKind::Text,
        summary: "Shell to spawn (before the first '$' line)",
    },
    DirectiveSpec {
        name: "size",
        directive: Directive::Size,
        argument: ArgumentKind::Size,
        summary: "Terminal size (before the first '$' line)",
    },
];

/// A loadable grammar for quipu scripts.
#[derive(Debug, PartialEq, Eq)]
pub struct Language {
    name: &'static str,
    version: u32,
    directives: &'static [DirectiveSpec],
    keys: &'static [NamedKey],
}

static QUIPU: Language = Language::new(LANGUAGE_NAME, LANGUAGE_VERSION, DIRECTIVES, NAMED_KEYS);

/// Load the built-in quipu language.
pub fn language() -> &'static Language {
    &QUIPU
}

impl Language {
    /// Build a language handle from its parts.
    pub const fn new(
        name: &'static str,
        version: u32,
        directives: &'static [DirectiveSpec],
        keys: &'static [NamedKey],
    ) -> Self {
        Self {
            name,
            version,
            directives,
            keys,
        }
    }

    /// Language name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Grammar version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Directive table.
    pub fn directives(&self) -> &'static [DirectiveSpec] {
        self.directives
    }

    /// Named-key table.
    pub fn keys(&self) -> &'static [NamedKey] {
        self.keys
    }

    /// Look up a directive by keyword.
    pub fn directive(&self, name: &str) -> Option<&'static DirectiveSpec> {
        self.directives.iter().find(|spec| spec.name == name)
    }

    /// Look up a named key's sequence.
    pub fn key(&self, name: &str) -> Option<&'static str> {
        keys::lookup_in(self.keys, name)
    }

    /// Whether this parser can read the handle.
    pub fn is_compatible(&self) -> bool {
        (MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_loads() {
        let lang = language();
        assert_eq!(lang.name(), "quipu");
        assert_eq!(lang.version(), LANGUAGE_VERSION);
        assert!(lang.is_compatible());
    }

    #[test]
    fn test_language_is_a_singleton() {
        assert!(std::ptr::eq(language(), language()));
    }

    #[test]
    fn test_directive_lookup() {
        let lang = language();
        assert_eq!(lang.directive("wait").map(|d| d.directive), Some(Directive::Wait));
        assert_eq!(lang.directive("size").map(|d| d.argument), Some(ArgumentKind::Size));
        assert!(lang.directive("sleep").is_none());
    }

    #[test]
    fn test_key_lookup_matches_keys_module() {
        let lang = language();
        for key in lang.keys() {
            for name in key.names {
                assert_eq!(lang.key(name), crate::keys::lookup(name));
            }
        }
    }

    #[test]
    fn test_version_outside_range_is_incompatible() {
        static FUTURE: Language = Language::new("quipu", LANGUAGE_VERSION + 1, DIRECTIVES, NAMED_KEYS);
        static ANCIENT: Language = Language::new("quipu", 0, DIRECTIVES, NAMED_KEYS);
        assert!(!FUTURE.is_compatible());
        assert!(!ANCIENT.is_compatible());
    }
}
