// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The ZapScript mini language (§4.5). A token's `text` is first checked
//! against the scheme guard: `run:`/`launch:` prefixes and anything else
//! that isn't a recognized command name are a launch directive, used
//! as-is (possibly after stripping a `systems/` shorthand). Only text that
//! actually leads with a known command name (`delay`, `execute`, ...) is
//! parsed as one or more `||`-chained commands.

/// One parsed ZapScript command: the command name is the text up to the
/// first run of whitespace, everything after it (trimmed) is the argument
/// string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: String,
}

/// What a bare launch directive resolves to: a system id (the `systems/`
/// shorthand) delegated to `Platform::launch_system`, or a file path/URL
/// delegated to `Platform::launch_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    System(String),
    Path(String),
}

/// Either a sequence of explicit commands, or a single launch directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    Commands(Vec<Command>),
    Direct(Directive),
}

const COMMAND_SEPARATOR: &str = "||";
const RUN_SCHEME: &str = "run:";
const LAUNCH_SCHEME: &str = "launch:";
const SYSTEM_PREFIX: &str = "systems/";

/// Command names §4.5 recognizes and dispatches itself; text leading with
/// anything else is a launch directive, not a command.
const KNOWN_COMMANDS: &[&str] = &[
    "delay",
    "execute",
    "launch.system",
    "launch.file",
    "input.keyboard",
    "input.key",
    "input.gamepad",
];

fn directive_from(text: &str) -> Directive {
    match text.strip_prefix(SYSTEM_PREFIX) {
        Some(id) => Directive::System(id.to_string()),
        None => Directive::Path(text.to_string()),
    }
}

pub fn parse(text: &str) -> Script {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix(RUN_SCHEME) {
        return Script::Direct(directive_from(rest.trim()));
    }
    if let Some(rest) = text.strip_prefix(LAUNCH_SCHEME) {
        return Script::Direct(directive_from(rest.trim()));
    }

    let first_word = text.split_whitespace().next().unwrap_or("");
    if !KNOWN_COMMANDS.contains(&first_word) {
        return Script::Direct(directive_from(text));
    }

    let commands = text
        .split(COMMAND_SEPARATOR)
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (name, args) = match part.split_once(char::is_whitespace) {
                Some((n, a)) => (n.to_string(), a.trim_start().to_string()),
                None => (part.to_string(), String::new()),
            };
            Some(Command { name, args })
        })
        .collect();

    Script::Commands(commands)
}

/// Error returned by [`tokenize_execute_args`] when the argument string has
/// an odd number of `"` characters — there is no way to tell where such a
/// quote was meant to close, so this is rejected rather than guessed at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unmatched quote in execute arguments: {0:?}")]
pub struct UnmatchedQuote(pub String);

/// Splits `execute`'s argument string into shell-style words. A `"` toggles
/// "inside quotes" and is kept in the output token (it is not stripped);
/// while quoted, spaces no longer split words.
pub fn tokenize_execute_args(args: &str) -> Result<Vec<String>, UnmatchedQuote> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in args.chars() {
        if c == '"' {
            quoted = !quoted;
            current.push(c);
        } else if !quoted && c == ' ' {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if quoted {
        return Err(UnmatchedQuote(args.to_string()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_is_a_direct_launch() {
        assert_eq!(
            parse("/media/games/mario.nes"),
            Script::Direct(Directive::Path("/media/games/mario.nes".to_string()))
        );
    }

    #[test]
    fn systems_shorthand_is_a_direct_system_launch() {
        assert_eq!(parse("systems/SNES"), Script::Direct(Directive::System("SNES".to_string())));
    }

    #[test]
    fn run_scheme_strips_prefix_and_resolves_directive() {
        assert_eq!(
            parse("run:/media/games/mario.nes"),
            Script::Direct(Directive::Path("/media/games/mario.nes".to_string()))
        );
        assert_eq!(parse("launch:systems/SNES"), Script::Direct(Directive::System("SNES".to_string())));
    }

    #[test]
    fn single_command_parses_name_and_args() {
        let Script::Commands(cmds) = parse("launch.system snes") else {
            panic!("expected Commands");
        };
        assert_eq!(
            cmds,
            vec![Command {
                name: "launch.system".to_string(),
                args: "snes".to_string(),
            }]
        );
    }

    #[test]
    fn delay_command_is_recognized_by_leading_word() {
        let Script::Commands(cmds) = parse("delay 8000") else {
            panic!("expected Commands");
        };
        assert_eq!(
            cmds,
            vec![Command {
                name: "delay".to_string(),
                args: "8000".to_string(),
            }]
        );
    }

    #[test]
    fn execute_command_keeps_full_cmdline_as_args() {
        let Script::Commands(cmds) = parse("execute rm -rf /") else {
            panic!("expected Commands");
        };
        assert_eq!(
            cmds,
            vec![Command {
                name: "execute".to_string(),
                args: "rm -rf /".to_string(),
            }]
        );
    }

    #[test]
    fn chained_commands_split_on_double_pipe() {
        let Script::Commands(cmds) = parse("delay 500||launch.system snes") else {
            panic!("expected Commands");
        };
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].name, "delay");
        assert_eq!(cmds[1].args, "snes");
    }

    #[test]
    fn command_with_no_args_has_empty_args() {
        let Script::Commands(cmds) = parse("input.keyboard") else {
            panic!("expected Commands");
        };
        assert_eq!(cmds[0].args, "");
    }

    #[test]
    fn execute_tokenizer_splits_on_unquoted_spaces() {
        let tokens = tokenize_execute_args("echo hello world").expect("tokenize");
        assert_eq!(tokens, vec!["echo", "hello", "world"]);
    }

    #[test]
    fn execute_tokenizer_treats_quoted_run_as_one_field() {
        let tokens = tokenize_execute_args(r#"echo "hello world""#).expect("tokenize");
        assert_eq!(tokens, vec!["echo", "\"hello world\""]);
    }

    #[test]
    fn execute_tokenizer_rejects_unmatched_quote() {
        let err = tokenize_execute_args(r#"echo "hello"#).unwrap_err();
        assert_eq!(err, UnmatchedQuote(r#"echo "hello"#.to_string()));
    }
}
