//! REPL command parsing

use duet_core::Persona;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the active persona
    Say(String),
    /// `/m`, same as the Ctrl+M shortcut
    Toggle,
    /// `/miku`, `/eva`
    Switch(Persona),
    /// `/stop`
    Stop,
    /// `/voice <utterance>`
    Voice(String),
    /// `/tts`
    ToggleSpeech,
    /// `/replay <n>`
    Replay(usize),
    /// `/history`
    History,
    /// `/clear` for the active persona, `/clear all` for both
    Clear { all: bool },
    /// `/help`
    Help,
    /// `/quit`, `/exit`
    Quit,
    /// Nothing to do
    Empty,
    /// Unrecognised or malformed command
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  <text>             send a message to the active persona
  /m                 toggle persona (Ctrl+M)
  /miku, /eva        switch persona
  /stop              stop speaking
  /voice <words>     speak <words> into the microphone
  /tts               toggle speech output
  /replay <n>        speak message <n> of the history again
  /history           show the active conversation
  /clear [all]       clear history for the active persona, or both
  /quit              exit";

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "m" => Command::Toggle,
        "miku" => Command::Switch(Persona::Miku),
        "eva" => Command::Switch(Persona::Eva),
        "stop" => Command::Stop,
        "voice" if !arg.is_empty() => Command::Voice(arg.to_string()),
        "voice" => Command::Invalid("usage: /voice <words>".to_string()),
        "tts" => Command::ToggleSpeech,
        "replay" => match arg.parse() {
            Ok(index) => Command::Replay(index),
            Err(_) => Command::Invalid("usage: /replay <n>".to_string()),
        },
        "history" => Command::History,
        "clear" => Command::Clear { all: arg.eq_ignore_ascii_case("all") },
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Invalid(format!("unknown command /{}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(parse("  hello there "), Command::Say("hello there".to_string()));
        assert_eq!(parse("   "), Command::Empty);
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse("/m"), Command::Toggle);
        assert_eq!(parse("/EVA"), Command::Switch(Persona::Eva));
        assert_eq!(parse("/replay 3"), Command::Replay(3));
        assert_eq!(parse("/clear"), Command::Clear { all: false });
        assert_eq!(parse("/clear all"), Command::Clear { all: true });
        assert_eq!(
            parse("/voice switch to miku"),
            Command::Voice("switch to miku".to_string())
        );
    }

    #[test]
    fn test_malformed_commands() {
        assert!(matches!(parse("/replay x"), Command::Invalid(_)));
        assert!(matches!(parse("/voice"), Command::Invalid(_)));
        assert!(matches!(parse("/dance"), Command::Invalid(_)));
    }
}
