//! Interactive diagnostic console
//!
//! Line-oriented commands over the registry: dump votes, cast votes by name,
//! and drive the force override. User input never panics the node; unknown
//! names come back as errors.

use crate::error::NodeError;
use std::str::FromStr;
use std::sync::Arc;
use vote_core::{Diagnostics, Priority, Registry, Vote};

pub const HELP: &str = "\
Commands:
  list                                - List votes and their effective values
  dump [vote]                         - Show voter state (all votes if omitted)
  set <vote> <voter> on <value>       - Cast a vote
  set <vote> <voter> off              - Withdraw a vote
  prio <vote> <voter> <priority>      - Change a voter's priority
  force <vote> on <value> | off       - Engage/release the override
  refresh <vote>                      - Re-deliver the effective value
  result <vote>                       - Show the effective value
  destroy <vote>                      - Remove a vote
  help                                - Show this help
  quit                                - Exit";

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Dump(Option<String>),
    Set {
        vote: String,
        voter: String,
        value: Option<i64>,
    },
    Prio {
        vote: String,
        voter: String,
        priority: Priority,
    },
    Force {
        vote: String,
        value: Option<i64>,
    },
    Refresh(String),
    Result(String),
    Destroy(String),
    Help,
    Quit,
}

fn number<T: FromStr>(s: &str) -> Result<T, NodeError> {
    s.parse().map_err(|_| NodeError::InvalidNumber(s.to_string()))
}

/// Parse `on <value>` / `off`
fn switch(parts: &[&str], usage: &'static str) -> Result<Option<i64>, NodeError> {
    match parts {
        ["on", value] => Ok(Some(number(value)?)),
        ["off"] => Ok(None),
        _ => Err(NodeError::Usage(usage)),
    }
}

impl FromStr for Command {
    type Err = NodeError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = parts.split_first() else {
            return Err(NodeError::Usage("help"));
        };

        match (cmd, args) {
            ("list", []) => Ok(Command::List),
            ("dump", []) => Ok(Command::Dump(None)),
            ("dump", [vote]) => Ok(Command::Dump(Some(vote.to_string()))),
            ("set", [vote, voter, rest @ ..]) => Ok(Command::Set {
                vote: vote.to_string(),
                voter: voter.to_string(),
                value: switch(rest, "set <vote> <voter> on <value> | off")?,
            }),
            ("prio", [vote, voter, priority]) => Ok(Command::Prio {
                vote: vote.to_string(),
                voter: voter.to_string(),
                priority: number(priority)?,
            }),
            ("force", [vote, rest @ ..]) => Ok(Command::Force {
                vote: vote.to_string(),
                value: switch(rest, "force <vote> on <value> | off")?,
            }),
            ("refresh", [vote]) => Ok(Command::Refresh(vote.to_string())),
            ("result", [vote]) => Ok(Command::Result(vote.to_string())),
            ("destroy", [vote]) => Ok(Command::Destroy(vote.to_string())),
            ("help", _) => Ok(Command::Help),
            ("quit" | "exit", _) => Ok(Command::Quit),
            ("list" | "dump" | "set" | "prio" | "force" | "refresh" | "result" | "destroy", _) => {
                Err(NodeError::Usage("see 'help'"))
            }
            _ => Err(NodeError::UnknownCommand(cmd.to_string())),
        }
    }
}

/// Executes console commands against a registry
pub struct Console {
    registry: Registry<i64>,
    json: bool,
}

impl Console {
    pub fn new(registry: Registry<i64>, json: bool) -> Self {
        Self { registry, json }
    }

    /// Run one command, returning the text to print
    pub fn execute(&self, command: Command) -> Result<String, NodeError> {
        match command {
            Command::List => {
                let lines: Vec<String> = self
                    .registry
                    .snapshots()
                    .iter()
                    .map(|s| match &s.result {
                        Some(v) => format!("{:<16} {:<12} {}", s.name, s.policy, v),
                        None => format!("{:<16} {:<12} -", s.name, s.policy),
                    })
                    .collect();
                Ok(if lines.is_empty() {
                    "(no votes)".to_string()
                } else {
                    lines.join("\n")
                })
            }

            Command::Dump(name) => {
                let snapshots = match name {
                    Some(name) => vec![self.vote(&name)?.dump()],
                    None => self.registry.snapshots(),
                };
                if self.json {
                    Ok(serde_json::to_string_pretty(&snapshots)?)
                } else {
                    Ok(snapshots
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<String>()
                        .trim_end()
                        .to_string())
                }
            }

            Command::Set { vote, voter, value } => {
                let vote = self.vote(&vote)?;
                let index = vote.require_voter(&voter)?;
                match value {
                    Some(value) => vote.set(index, true, value)?,
                    None => {
                        let (_, current) = vote.get_voter(index);
                        vote.set(index, false, current)?
                    }
                }
                self.effective(&vote)
            }

            Command::Prio {
                vote,
                voter,
                priority,
            } => {
                let vote = self.vote(&vote)?;
                let index = vote.require_voter(&voter)?;
                vote.set_priority(index, priority)?;
                self.effective(&vote)
            }

            Command::Force { vote, value } => {
                let vote = self.vote(&vote)?;
                vote.write_forced(value);
                self.effective(&vote)
            }

            Command::Refresh(vote) => {
                let vote = self.vote(&vote)?;
                vote.refresh()?;
                self.effective(&vote)
            }

            Command::Result(vote) => {
                let vote = self.vote(&vote)?;
                self.effective(&vote)
            }

            Command::Destroy(vote) => {
                let vote = self.vote(&vote)?;
                vote.destroy();
                Ok(format!("{} destroyed", vote.name()))
            }

            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
        }
    }

    fn vote(&self, name: &str) -> Result<Arc<Vote<i64>>, NodeError> {
        self.registry
            .find(name)
            .ok_or_else(|| NodeError::UnknownVote(name.to_string()))
    }

    fn effective(&self, vote: &Vote<i64>) -> Result<String, NodeError> {
        let value = vote.get_result()?;
        let winner = vote.winner_name().unwrap_or_default();
        Ok(format!("{} = {} ({})", vote.name(), value, winner))
    }
}
