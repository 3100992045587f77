//! Line command parsing for the `meadow` binary.
//!
//! One command per line, whitespace separated:
//!
//! ```text
//! buy_feed <amount>
//! sell <item> <quantity>
//! breed <first> <second>
//! buy_animal <type> <name...>
//! feed
//! state
//! refresh
//! reconnect
//! dismiss
//! help
//! quit
//! ```
//!
//! `buy_animal` takes the rest of the line as the name, so names may contain
//! spaces. `breed` names are single tokens.

use crate::event::ClientEvent;

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Purchase feed.
    BuyFeed {
        /// Units of feed.
        amount: u32,
    },
    /// Sell a held resource.
    Sell {
        /// Resource key.
        item: String,
        /// Units to sell.
        quantity: u32,
    },
    /// Breed two animals.
    Breed {
        /// First parent.
        first: String,
        /// Second parent.
        second: String,
    },
    /// Purchase an animal.
    BuyAnimal {
        /// Species tag.
        kind: String,
        /// Name, possibly with spaces.
        name: String,
    },
    /// Feed every animal.
    Feed,
    /// Print the current snapshot.
    State,
    /// Ask the authority for a fresh snapshot.
    Refresh,
    /// Force a reconnect.
    Reconnect,
    /// Clear the displayed error.
    Dismiss,
    /// Print usage.
    Help,
    /// Exit.
    Quit,
    /// Unrecognized command word.
    Unknown {
        /// The offending input.
        input: String,
    },
    /// Known command with bad arguments.
    InvalidArgs {
        /// Command word.
        command: &'static str,
        /// What is wrong.
        error: String,
    },
}

impl Command {
    /// Client event for commands that go through the client. `None` for
    /// commands handled by the binary itself.
    pub fn into_event(self) -> Option<ClientEvent> {
        match self {
            Self::BuyFeed { amount } => Some(ClientEvent::BuyFeed { amount }),
            Self::Sell { item, quantity } => Some(ClientEvent::Sell { item, quantity }),
            Self::Breed { first, second } => Some(ClientEvent::Breed { first, second }),
            Self::BuyAnimal { kind, name } => Some(ClientEvent::BuyAnimal { kind, name }),
            Self::Feed => Some(ClientEvent::FeedAnimals),
            Self::Refresh => Some(ClientEvent::RefreshState),
            Self::Reconnect => Some(ClientEvent::Reconnect),
            Self::Dismiss => Some(ClientEvent::DismissError),
            Self::State
            | Self::Help
            | Self::Quit
            | Self::Unknown { .. }
            | Self::InvalidArgs { .. } => None,
        }
    }
}

/// Usage text.
pub const HELP: &str = "\
commands:
  buy_feed <amount>          buy 1-100 units of feed
  sell <item> <quantity>     sell eggs, milk or slop
  breed <first> <second>     breed two animals of the same type
  buy_animal <type> <name>   buy a chicken or a cow
  feed                       feed every animal
  state                      print the farm
  refresh                    ask the server for the latest farm
  reconnect                  reconnect now
  dismiss                    clear the last error
  quit                       exit";

/// Parse one input line.
pub fn parse(input: &str) -> Command {
    let input = input.trim();
    let (word, rest) = match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    match word {
        "buy_feed" => match args.as_slice() {
            [amount] => match parse_number("buy_feed", "amount", amount) {
                Ok(amount) => Command::BuyFeed { amount },
                Err(cmd) => cmd,
            },
            _ => usage("buy_feed", "<amount>"),
        },
        "sell" => match args.as_slice() {
            [item, quantity] => match parse_number("sell", "quantity", quantity) {
                Ok(quantity) => Command::Sell { item: (*item).to_string(), quantity },
                Err(cmd) => cmd,
            },
            _ => usage("sell", "<item> <quantity>"),
        },
        "breed" => match args.as_slice() {
            [first, second] => {
                Command::Breed { first: (*first).to_string(), second: (*second).to_string() }
            },
            _ => usage("breed", "<first> <second>"),
        },
        "buy_animal" => match rest.split_once(char::is_whitespace) {
            Some((kind, name)) if !name.trim().is_empty() => {
                Command::BuyAnimal { kind: kind.to_string(), name: name.trim().to_string() }
            },
            _ => usage("buy_animal", "<type> <name>"),
        },
        "feed" => no_args("feed", &args, Command::Feed),
        "state" => no_args("state", &args, Command::State),
        "refresh" => no_args("refresh", &args, Command::Refresh),
        "reconnect" => no_args("reconnect", &args, Command::Reconnect),
        "dismiss" => no_args("dismiss", &args, Command::Dismiss),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown { input: input.to_string() },
    }
}

fn parse_number(command: &'static str, argument: &str, value: &str) -> Result<u32, Command> {
    value.parse().map_err(|_| Command::InvalidArgs {
        command,
        error: format!("{argument} must be a whole number, got `{value}`"),
    })
}

fn usage(command: &'static str, args: &str) -> Command {
    Command::InvalidArgs { command, error: format!("usage: {command} {args}") }
}

fn no_args(command: &'static str, args: &[&str], parsed: Command) -> Command {
    if args.is_empty() {
        parsed
    } else {
        Command::InvalidArgs { command, error: "takes no arguments".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(parse("buy_feed 10"), Command::BuyFeed { amount: 10 });
        assert_eq!(parse("  sell eggs 5 "), Command::Sell { item: "eggs".into(), quantity: 5 });
        assert_eq!(parse("breed Clucky Henny"), Command::Breed {
            first: "Clucky".into(),
            second: "Henny".into()
        });
        assert_eq!(parse("buy_animal cow Daisy May"), Command::BuyAnimal {
            kind: "cow".into(),
            name: "Daisy May".into()
        });
    }

    #[test]
    fn parses_bare_commands() {
        assert_eq!(parse("feed"), Command::Feed);
        assert_eq!(parse("state"), Command::State);
        assert_eq!(parse("refresh"), Command::Refresh);
        assert_eq!(parse("reconnect"), Command::Reconnect);
        assert_eq!(parse("dismiss"), Command::Dismiss);
        assert_eq!(parse("?"), Command::Help);
        assert_eq!(parse("exit"), Command::Quit);
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert_eq!(parse("buy_feed ten"), Command::InvalidArgs {
            command: "buy_feed",
            error: "amount must be a whole number, got `ten`".into()
        });
        assert_eq!(parse("buy_feed -1"), Command::InvalidArgs {
            command: "buy_feed",
            error: "amount must be a whole number, got `-1`".into()
        });
        assert!(matches!(parse("sell eggs"), Command::InvalidArgs { command: "sell", .. }));
        assert!(matches!(parse("breed Clucky"), Command::InvalidArgs { command: "breed", .. }));
        assert!(matches!(
            parse("buy_animal cow"),
            Command::InvalidArgs { command: "buy_animal", .. }
        ));
        assert!(matches!(parse("feed now"), Command::InvalidArgs { command: "feed", .. }));
    }

    #[test]
    fn unknown_command_keeps_input() {
        assert_eq!(parse("milk Bessie"), Command::Unknown { input: "milk Bessie".into() });
    }

    #[test]
    fn local_commands_have_no_event() {
        assert_eq!(parse("feed").into_event(), Some(ClientEvent::FeedAnimals));
        assert_eq!(parse("state").into_event(), None);
        assert_eq!(parse("refresh").into_event(), Some(ClientEvent::RefreshState));
        assert_eq!(parse("quit").into_event(), None);
    }
}
