//! Command parsing for the terminal client.
//!
//! Each console command stands in for one control of the map page: the add
//! form, the location dropdown with its "Show Distances" button, a click on a
//! marker, and a manual reload.

use anyhow::{anyhow, Context, Result};

use crate::location::{LocationId, NewLocation};

pub const HELP_LINES: &[&str] = &[
    "Commands (case-insensitive):",
    "  ADD <name> <lat> <lng>  (alias: a)  -- register a location",
    "  LIST                    (alias: l)  -- show the location dropdown",
    "  SELECT <id>             (alias: s)  -- show distances from a location",
    "  CLICK <id>              (alias: c)  -- click a location's marker",
    "  RELOAD                  (alias: r)  -- reload locations from the registry",
    "  HELP                    (alias: h)  -- show this message",
    "  EXIT                    (alias: e)  -- leave",
];

#[derive(Debug, PartialEq)]
pub enum ConsoleCommand {
    Add(NewLocation),
    List,
    /// `None` when no location was chosen.
    Select(Option<String>),
    Click(LocationId),
    Reload,
    Help,
    Exit,
}

impl ConsoleCommand {
    /// Parses one line of user input.
    ///
    /// `ADD` takes the last two words as latitude and longitude, so names may
    /// contain spaces. Range checks are left to the registry.
    pub fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return Err(anyhow!("empty command"));
        };

        let cmd = first.to_uppercase();
        let normalized_cmd = match cmd.as_str() {
            "A" => "ADD",
            "L" => "LIST",
            "S" => "SELECT",
            "C" => "CLICK",
            "R" => "RELOAD",
            "H" => "HELP",
            "E" | "Q" | "QUIT" => "EXIT",
            other => other,
        };

        match (normalized_cmd, parts.len()) {
            ("LIST", 1) => Ok(ConsoleCommand::List),
            ("RELOAD", 1) => Ok(ConsoleCommand::Reload),
            ("HELP", 1) => Ok(ConsoleCommand::Help),
            ("EXIT", 1) => Ok(ConsoleCommand::Exit),
            ("SELECT", 1) => Ok(ConsoleCommand::Select(None)),
            ("SELECT", 2) => Ok(ConsoleCommand::Select(Some(parts[1].to_string()))),
            ("CLICK", 2) => {
                let id = parts[1]
                    .parse()
                    .with_context(|| format!("invalid location id '{}'", parts[1]))?;
                Ok(ConsoleCommand::Click(id))
            }
            ("ADD", n) if n >= 4 => {
                let lat = parse_degrees(parts[n - 2], "latitude")?;
                let lng = parse_degrees(parts[n - 1], "longitude")?;
                let name = parts[1..n - 2].join(" ");
                Ok(ConsoleCommand::Add(NewLocation::new(name, lat, lng)))
            }
            ("ADD", _) => Err(anyhow!("ADD requires a name, a latitude and a longitude")),
            ("SELECT", _) => Err(anyhow!("SELECT takes at most one location id")),
            ("CLICK", _) => Err(anyhow!("CLICK requires exactly one location id")),
            _ => Err(anyhow!(
                "invalid command. Try: ADD/a, LIST/l, SELECT/s, CLICK/c, RELOAD/r, HELP/h, EXIT/e"
            )),
        }
    }
}

fn parse_degrees(word: &str, what: &str) -> Result<f64> {
    word.parse()
        .with_context(|| format!("{what} must be a number, got '{word}'"))
}
