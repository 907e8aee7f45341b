//! Command-line parsing.

use upline_ledger::{Money, ParticipantId};

/// A parsed `upline-admin` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        id: ParticipantId,
        name: String,
        parent: Option<ParticipantId>,
    },
    Activate { id: ParticipantId },
    Invest { id: ParticipantId, amount: Money },
    Show { id: ParticipantId },
    Progress { volume: Money },
    Reconcile,
    Audit,
    Ledger { id: ParticipantId },
    Help,
}

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "upline_admin=info,upline_engine=info,upline_ledger=info";

pub fn usage() -> String {
    let lines = [
        "upline-admin - Operate the upline hierarchy store",
        "",
        "Usage:",
        "  upline-admin add <id> <name> [parent]   Register a participant",
        "  upline-admin activate <id>              Mark a participant active",
        "  upline-admin invest <id> <minor-units>  Post an investment (paise/cents)",
        "  upline-admin show <id>                  Participant, level rows, rank progress",
        "  upline-admin progress <volume>          Rank progress for a team volume (major units)",
        "  upline-admin reconcile                  Rebuild all roll-ups and report drift",
        "  upline-admin audit                      Check aggregates against the ledger",
        "  upline-admin ledger <id>                List commissions paid to a participant",
        "",
        "Environment:",
        "  UPLINE_DATA_DIR  Store directory (default: ./upline-data)",
    ];
    let mut out = lines.join("\n");
    out.push_str(&format!(
        "\n  RUST_LOG         Log filter (default: {})\n",
        DEFAULT_LOG_FILTER
    ));
    out
}

pub fn print_usage() {
    eprint!("{}", usage());
}

fn id_arg(args: &[String], index: usize, cmd: &str) -> Result<ParticipantId, String> {
    let raw = args
        .get(index)
        .ok_or_else(|| format!("{} requires a participant id", cmd))?;
    ParticipantId::parse(raw).map_err(|e| e.to_string())
}

fn number_arg(args: &[String], index: usize, cmd: &str, what: &str) -> Result<u64, String> {
    let raw = args
        .get(index)
        .ok_or_else(|| format!("{} requires {}", cmd, what))?;
    raw.replace('_', "")
        .parse()
        .map_err(|_| format!("{:?} is not a whole number", raw))
}

/// Parse arguments after the program name.
pub fn parse(args: &[String]) -> Result<Command, String> {
    let Some(cmd) = args.first() else {
        return Err("missing command".into());
    };

    match cmd.as_str() {
        "add" => {
            let id = id_arg(args, 1, "add")?;
            let name = args
                .get(2)
                .cloned()
                .ok_or_else(|| "add requires a name".to_string())?;
            let parent = match args.get(3) {
                Some(raw) => Some(ParticipantId::parse(raw).map_err(|e| e.to_string())?),
                None => None,
            };
            Ok(Command::Add { id, name, parent })
        }
        "activate" => Ok(Command::Activate {
            id: id_arg(args, 1, "activate")?,
        }),
        "invest" => {
            let id = id_arg(args, 1, "invest")?;
            let minor = number_arg(args, 2, "invest", "an amount in minor units")?;
            let amount = Money::from_minor(minor).ok_or_else(|| "amount too large".to_string())?;
            Ok(Command::Invest { id, amount })
        }
        "show" => Ok(Command::Show {
            id: id_arg(args, 1, "show")?,
        }),
        "progress" => {
            let units = number_arg(args, 1, "progress", "a team volume")?;
            let volume = Money::from_units(units).ok_or_else(|| "volume too large".to_string())?;
            Ok(Command::Progress { volume })
        }
        "reconcile" => Ok(Command::Reconcile),
        "audit" => Ok(Command::Audit),
        "ledger" => Ok(Command::Ledger {
            id: id_arg(args, 1, "ledger")?,
        }),
        "-h" | "--help" | "help" => Ok(Command::Help),
        other => Err(format!("Unknown command: {}", other)),
    }
}

impl Command {
    /// Whether the command needs the store opened.
    pub fn needs_store(&self) -> bool {
        !matches!(self, Command::Progress { .. } | Command::Help)
    }
}
