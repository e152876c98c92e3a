//! Library-level tests: parse real scripts and play them into in-memory
//! sinks.

use proptest::prelude::*;
use quipu::domain::{Command, PlaybackConfig};
use quipu::language::language;
use quipu::parser::{ScriptParser, parse_script};
use quipu::playback::{PlaybackEngine, keystrokes};
use rstest::rstest;
use std::time::Duration;

const VIM_DEMO: &str = "\
# Open a file, edit it, save and quit.
@ shell:/bin/bash
@ size:120:40
@ speed:0.08
@ jitter:0.3

$ vim notes.txt<ret>
@ wait:1.5
$ ihello \\<world\\><esc>
$ <C-s>:wq<ret>
";

#[test]
fn test_parse_full_script() {
    let script = parse_script(VIM_DEMO).unwrap();
    script.validate().unwrap();

    let session = script.session();
    assert_eq!(session.shell.as_deref(), Some("/bin/bash"));
    assert_eq!(session.size, Some((120, 40)));

    assert_eq!(
        &script.commands[4..],
        &[
            Command::Type("vim notes.txt\r".to_string()),
            Command::Wait(Duration::from_millis(1500)),
            Command::Type("ihello <world>\x1b".to_string()),
            Command::Type("\x13:wq\r".to_string()),
        ]
    );
}

#[test]
fn test_explicit_parser_matches_convenience_function() {
    let mut parser = ScriptParser::new();
    parser.set_language(language()).unwrap();

    assert_eq!(parser.parse(VIM_DEMO).unwrap(), parse_script(VIM_DEMO).unwrap());
}

#[tokio::test]
async fn test_play_full_script_into_memory() {
    let script = parse_script(VIM_DEMO).unwrap();
    let mut engine = PlaybackEngine::new(Vec::new()).without_delays();

    let summary = engine.execute(&script).await.unwrap();
    assert_eq!(summary.commands, script.commands.len());
    assert!(!summary.stopped);

    // Directives change the live config as they are reached.
    assert_eq!(
        *engine.config(),
        PlaybackConfig {
            speed: 0.08,
            jitter: 0.3
        }
    );

    let sent = engine.into_sink();
    assert_eq!(sent.len(), summary.keystrokes);
    assert_eq!(sent.concat(), "vim notes.txt\rihello <world>\x1b\x13:wq\r");
    assert!(sent.contains(&"\x1b".to_string()));
}

#[rstest]
#[case("$ <up><up><ret>", &["\x1b[A", "\x1b[A", "\r"])]
#[case("$ <A-x><C-A-del>", &["\x1bx", "\x1b\x1b[3~"])]
#[case("$ <F1>q", &["\x1bOP", "q"])]
fn test_escape_sequences_stay_whole(#[case] line: &str, #[case] expected: &[&str]) {
    let script = parse_script(line).unwrap();
    let Command::Type(text) = &script.commands[0] else {
        panic!("expected a Type command");
    };
    assert_eq!(keystrokes(text), expected);
}

#[tokio::test(start_paused = true)]
async fn test_waits_use_tokio_time() {
    let script = parse_script("@ speed:0\n@ wait:2\n$ a\n@ wait:0.25\n").unwrap();
    let mut engine = PlaybackEngine::new(Vec::new());

    let start = tokio::time::Instant::now();
    engine.execute(&script).await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(2250));
}

#[rstest]
#[case("hello.quipu")]
#[case("editor.quipu")]
fn test_demo_scripts_are_valid(#[case] name: &str) {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name);
    let source = std::fs::read_to_string(&path).unwrap();

    let script = parse_script(&source).unwrap();
    script.validate().unwrap();
    assert!(script.type_count() > 0);
}

proptest! {
    /// Literal text without brackets, escapes or control characters is typed
    /// back exactly, one keystroke per character.
    #[test]
    fn prop_literal_text_survives_parse_and_playback(
        text in "[a-zA-Z0-9 !\"#$%&'()*+,./:;=?@_`{|}~^-]{0,40}"
    ) {
        let trimmed = text.trim();
        let script = parse_script(&format!("$ {text}")).unwrap();

        prop_assert_eq!(&script.commands, &vec![Command::Type(trimmed.to_string())]);

        let units = keystrokes(trimmed);
        prop_assert_eq!(units.len(), trimmed.chars().count());
        prop_assert_eq!(units.concat(), trimmed);
    }
}
