//! Script parser for quipu files.
//!
//! Scripts are line oriented:
//! - `@ name:value` directives (speed, jitter, wait, shell, size)
//! - `#` comments
//! - `$` typing lines, with `<key>` tokens for special keys
//!
//! Line shapes are recognised with nom; directive names and key names are
//! resolved through the [`Language`] assigned to the [`ScriptParser`].

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_until,
    character::complete::{alpha1, char, space0, u16 as parse_u16},
    combinator::{map, rest, value},
    number::complete::double,
    sequence::delimited,
};
use std::time::Duration;

use crate::domain::{Command, Script};
use crate::error::{Error, LanguageError, Result};
use crate::keys;
use crate::language::{
    self, Directive, LANGUAGE_VERSION, Language, MIN_COMPATIBLE_LANGUAGE_VERSION,
};

/// The recognised shape of a single trimmed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Directive { name: &'a str, argument: &'a str },
    Comment,
    Type(&'a str),
}

fn directive_line(input: &str) -> IResult<&str, Line<'_>> {
    let (input, _) = char('@')(input)?;
    let (input, _) = space0(input)?;
    let (input, name) = alpha1(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = space0(input)?;
    let (input, argument) = rest(input)?;
    Ok((input, Line::Directive { name, argument }))
}

fn comment_line(input: &str) -> IResult<&str, Line<'_>> {
    value(Line::Comment, (char('#'), rest)).parse(input)
}

fn type_line(input: &str) -> IResult<&str, Line<'_>> {
    let (input, _) = char('$')(input)?;
    let (input, _) = space0(input)?;
    map(rest, Line::Type).parse(input)
}

fn line(input: &str) -> IResult<&str, Line<'_>> {
    alt((directive_line, comment_line, type_line)).parse(input)
}

fn special_key(input: &str) -> IResult<&str, &str> {
    delimited(char('<'), take_until(">"), char('>')).parse(input)
}

fn size_argument(input: &str) -> IResult<&str, (u16, u16)> {
    let (input, cols) = parse_u16(input)?;
    let (input, _) = char(':')(input)?;
    let (input, rows) = parse_u16(input)?;
    Ok((input, (cols, rows)))
}

/// Expand `<key>` tokens and `\<` / `\>` escapes in typed text.
///
/// Unknown keys and unterminated `<` are kept literally.
pub fn expand_keys(language: &Language, text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut remaining = text;

    while let Some(ch) = remaining.chars().next() {
        if remaining.starts_with("\\<") || remaining.starts_with("\\>") {
            result.push_str(&remaining[1..2]);
            remaining = &remaining[2..];
        } else if ch == '<' {
            match special_key(remaining) {
                Ok((rest, token)) => {
                    match keys::resolve_in(language.keys(), token) {
                        Some(sequence) => result.push_str(&sequence),
                        None => {
                            result.push('<');
                            result.push_str(token);
                            result.push('>');
                        }
                    }
                    remaining = rest;
                }
                Err(_) => {
                    result.push('<');
                    remaining = &remaining[1..];
                }
            }
        } else {
            result.push(ch);
            remaining = &remaining[ch.len_utf8()..];
        }
    }

    result
}

/// Parses quipu scripts once a language has been assigned.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptParser {
    language: Option<&'static Language>,
}

impl ScriptParser {
    /// Create a parser with no language assigned.
    pub fn new() -> Self {
        Self { language: None }
    }

    /// Assign the language used to resolve directives and keys.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError::IncompatibleVersion`] if the handle's grammar
    /// version is outside the range this parser reads.
    pub fn set_language(
        &mut self,
        language: &'static Language,
    ) -> std::result::Result<(), LanguageError> {
        if !language.is_compatible() {
            return Err(LanguageError::IncompatibleVersion {
                name: language.name(),
                version: language.version(),
                min_supported: MIN_COMPATIBLE_LANGUAGE_VERSION,
                max_supported: LANGUAGE_VERSION,
            });
        }
        tracing::debug!(
            language = language.name(),
            version = language.version(),
            "Language loaded"
        );
        self.language = Some(language);
        Ok(())
    }

    /// The assigned language, if any.
    pub fn language(&self) -> Option<&'static Language> {
        self.language
    }

    /// Parse a whole script.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError::NoLanguage`] if no language is assigned, or
    /// [`Error::Parse`] for the first line that cannot be read.
    pub fn parse(&self, input: &str) -> Result<Script> {
        let language = self.language.ok_or(LanguageError::NoLanguage)?;
        let mut commands = Vec::new();

        for (index, raw) in input.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            let line_no = index + 1;
            let parse_error = |message: String| Error::Parse {
                line: line_no,
                message,
            };

            let parsed = match line(trimmed) {
                Ok((_, parsed)) => parsed,
                Err(_) if trimmed.starts_with('@') => {
                    return Err(parse_error(format!(
                        "Malformed directive '{trimmed}', expected '@ name:value'"
                    )));
                }
                Err(_) => {
                    return Err(parse_error(format!(
                        "Unrecognised line '{trimmed}', expected '@', '#' or '$'"
                    )));
                }
            };

            match parsed {
                Line::Comment => {}
                Line::Type(text) => commands.push(Command::Type(expand_keys(language, text))),
                Line::Directive { name, argument } => {
                    let command = parse_directive(language, name, argument).map_err(parse_error)?;
                    commands.push(command);
                }
            }
        }

        tracing::debug!(commands = commands.len(), "Parsed script");
        Ok(Script { commands })
    }
}

fn parse_directive(
    language: &Language,
    name: &str,
    argument: &str,
) -> std::result::Result<Command, String> {
    let spec = language
        .directive(name)
        .ok_or_else(|| format!("Unknown directive '{name}'"))?;

    match spec.directive {
        Directive::Speed => {
            let speed = parse_number(name, argument)?;
            if speed < 0.0 {
                return Err(format!("'{name}' must not be negative, got {speed}"));
            }
            Ok(Command::SetSpeed(speed))
        }
        Directive::Jitter => {
            let jitter = parse_number(name, argument)?;
            if !(0.0..=1.0).contains(&jitter) {
                return Err(format!("'{name}' must be between 0.0 and 1.0, got {jitter}"));
            }
            Ok(Command::SetJitter(jitter))
        }
        Directive::Wait => {
            let seconds = parse_number(name, argument)?;
            if seconds < 0.0 {
                return Err(format!("'{name}' must not be negative, got {seconds}"));
            }
            let duration = Duration::try_from_secs_f64(seconds)
                .map_err(|_| format!("'{name}' is out of range, got {seconds}"))?;
            Ok(Command::Wait(duration))
        }
        Directive::Shell => {
            let shell = argument.trim();
            if shell.is_empty() {
                return Err(format!("'{name}' requires a shell path"));
            }
            Ok(Command::SetShell(shell.to_string()))
        }
        Directive::Size => {
            let (remaining, (cols, rows)) = size_argument(argument)
                .map_err(|_| format!("'{name}' expects <cols>:<rows>, got '{argument}'"))?;
            ensure_consumed(remaining)?;
            if cols == 0 || rows == 0 {
                return Err(format!("'{name}' dimensions must be greater than zero"));
            }
            Ok(Command::SetSize(cols, rows))
        }
    }
}

fn parse_number(name: &str, argument: &str) -> std::result::Result<f64, String> {
    let (remaining, number) = double::<_, nom::error::Error<&str>>(argument)
        .map_err(|_| format!("'{name}' expects a number, got '{argument}'"))?;
    ensure_consumed(remaining)?;
    if !number.is_finite() {
        return Err(format!("'{name}' expects a finite number, got '{argument}'"));
    }
    Ok(number)
}

fn ensure_consumed(remaining: &str) -> std::result::Result<(), String> {
    if remaining.trim().is_empty() {
        Ok(())
    } else {
        Err(format!("Unexpected text after command: '{remaining}'"))
    }
}

/// Parse a script with the built-in quipu language.
///
/// # Errors
///
/// Returns [`Error::Parse`] for the first line that cannot be read.
pub fn parse_script(input: &str) -> Result<Script> {
    let mut parser = ScriptParser::new();
    parser.set_language(language::language())?;
    parser.parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn single(input: &str) -> Command {
        let script = parse_script(input).unwrap();
        assert_eq!(script.commands.len(), 1, "expected one command from {input:?}");
        script.commands.into_iter().next().unwrap()
    }

    #[rstest]
    #[case("@ speed:0.2", Command::SetSpeed(0.2))]
    #[case("@speed:0.2", Command::SetSpeed(0.2))]
    #[case("@ speed: 0.2", Command::SetSpeed(0.2))]
    #[case("@ jitter:0.02", Command::SetJitter(0.02))]
    #[case("@ wait:2.0", Command::Wait(Duration::from_secs_f64(2.0)))]
    #[case("@ wait:1", Command::Wait(Duration::from_secs(1)))]
    #[case("@ shell:/bin/zsh", Command::SetShell("/bin/zsh".to_string()))]
    #[case("@ shell: /usr/bin/env fish ", Command::SetShell("/usr/bin/env fish".to_string()))]
    #[case("@ size:120:40", Command::SetSize(120, 40))]
    fn test_parse_directives(#[case] input: &str, #[case] expected: Command) {
        assert_eq!(single(input), expected);
    }

    #[test]
    fn test_parse_type() {
        assert_eq!(single("$ echo hello"), Command::Type("echo hello".to_string()));
    }

    #[test]
    fn test_parse_type_drops_leading_whitespace() {
        assert_eq!(single("$    ls -la"), Command::Type("ls -la".to_string()));
    }

    #[test]
    fn test_parse_type_empty() {
        assert_eq!(single("$"), Command::Type(String::new()));
    }

    #[rstest]
    #[case("$ echo hello<ret>", "echo hello\r")]
    #[case("$ <C-c>", "\x03")]
    #[case(r"$ \<not a key\>", "<not a key>")]
    #[case("$ <A-ret>", "\x1b\r")]
    #[case("$ <A-space>", "\x1b ")]
    #[case("$ <C-space>", "\x00")]
    #[case("$ <up><up><ret>", "\x1b[A\x1b[A\r")]
    #[case("$ a <b", "a <b")]
    #[case("$ <nope> x", "<nope> x")]
    #[case("$ <>", "<>")]
    #[case("$ héllo<tab>", "héllo\t")]
    #[case(r"$ C:\path", r"C:\path")]
    fn test_parse_type_special_keys(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(single(input), Command::Type(expected.to_string()));
    }

    #[test]
    fn test_parse_script() {
        let input = r#"@ speed:0.2
@ jitter:0.02
# This is a comment
$ echo hello
@ wait:1.0
$ ls -la
"#;
        let script = parse_script(input).unwrap();
        assert_eq!(script.commands.len(), 5);
        assert_eq!(script.commands[0], Command::SetSpeed(0.2));
        assert_eq!(script.commands[4], Command::Type("ls -la".to_string()));
    }

    #[test]
    fn test_blank_lines_and_indentation_ignored() {
        let script = parse_script("\n   \n\t# note\n   $ ls\n\n").unwrap();
        assert_eq!(script.commands, vec![Command::Type("ls".to_string())]);
    }

    #[rstest]
    #[case("@ speed:0.2 fast", 1, "Unexpected text after command")]
    #[case("@ sleep:1", 1, "Unknown directive 'sleep'")]
    #[case("@ speed:fast", 1, "expects a number")]
    #[case("@ speed:-1", 1, "must not be negative")]
    #[case("@ wait:-0.5", 1, "must not be negative")]
    #[case("@ jitter:1.5", 1, "between 0.0 and 1.0")]
    #[case("@ wait:inf", 1, "'wait' expects a")]
    #[case("$ ok\n@ wait:1e30", 2, "'wait' is out of range")]
    #[case("@ shell:", 1, "requires a shell path")]
    #[case("@ size:80", 1, "expects <cols>:<rows>")]
    #[case("@ size:0:24", 1, "greater than zero")]
    #[case("@ size:80:24:1", 1, "Unexpected text after command")]
    #[case("@ speed 0.2", 1, "Malformed directive")]
    #[case("echo hello", 1, "Unrecognised line")]
    #[case("# ok\n\n$ ls\nls", 4, "Unrecognised line")]
    fn test_parse_errors(#[case] input: &str, #[case] line: usize, #[case] fragment: &str) {
        match parse_script(input) {
            Err(Error::Parse { line: got, message }) => {
                assert_eq!(got, line, "wrong line for {input:?}: {message}");
                assert!(message.contains(fragment), "{message:?} should contain {fragment:?}");
            }
            other => panic!("expected parse error for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_parser_without_language_fails() {
        let parser = ScriptParser::new();
        let err = parser.parse("$ ls").unwrap_err();
        assert!(matches!(err, Error::Language(LanguageError::NoLanguage)));
    }

    #[test]
    fn test_set_language_accepts_builtin() {
        let mut parser = ScriptParser::new();
        assert!(parser.set_language(language::language()).is_ok());
        assert!(parser.language().is_some());
    }

    #[test]
    fn test_set_language_rejects_incompatible_version() {
        static BROKEN: Language = Language::new(
            "quipu",
            LANGUAGE_VERSION + 7,
            language::DIRECTIVES,
            keys::NAMED_KEYS,
        );

        let mut parser = ScriptParser::new();
        let err = parser.set_language(&BROKEN).unwrap_err();
        assert!(matches!(err, LanguageError::IncompatibleVersion { version, .. } if version == LANGUAGE_VERSION + 7));
        assert!(parser.language().is_none());
    }

    #[test]
    fn test_language_without_keys_types_tokens_literally() {
        static BARE: Language = Language::new("bare", LANGUAGE_VERSION, language::DIRECTIVES, &[]);

        let mut parser = ScriptParser::new();
        parser.set_language(&BARE).unwrap();
        let script = parser.parse("$ ls<ret>").unwrap();
        assert_eq!(script.commands, vec![Command::Type("ls<ret>".to_string())]);
    }

    #[test]
    fn test_language_without_directives_rejects_them() {
        static TYPING_ONLY: Language = Language::new("typing", LANGUAGE_VERSION, &[], keys::NAMED_KEYS);

        let mut parser = ScriptParser::new();
        parser.set_language(&TYPING_ONLY).unwrap();
        let err = parser.parse("@ speed:0.1").unwrap_err().to_string();
        assert!(err.contains("Unknown directive 'speed'"));
    }
}
