//! Command execution against an engine.

use std::io::Write;

use upline_engine::{Engine, PropagationReport};
use upline_ledger::{HierarchyStore, Participant};
use upline_rank::RankProgress;

use crate::command::Command;

pub type OpResult = Result<(), Box<dyn std::error::Error>>;

fn write_report(out: &mut impl Write, report: &PropagationReport) -> std::io::Result<()> {
    writeln!(
        out,
        "propagated to {} ancestor(s), {} commission(s), stop: {:?}",
        report.levels_reached(),
        report.commissions,
        report.stop
    )?;
    if let Some(failure) = &report.failure {
        writeln!(
            out,
            "warning: stopped at {} ({}): {}; run `upline-admin reconcile` to repair",
            failure.level,
            failure
                .ancestor
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "parent lookup".into()),
            failure.error
        )?;
    }
    Ok(())
}

fn write_progress(out: &mut impl Write, progress: &RankProgress<'_>) -> std::io::Result<()> {
    match progress.next {
        Some(next) => writeln!(
            out,
            "rank: {} ({:.2}% toward {} at {})",
            progress.current.name, progress.percent, next.name, next.min_volume
        ),
        None => writeln!(out, "rank: {} (max rank)", progress.current.name),
    }
}

/// Run a command that needs no store.
pub fn run_pure(cmd: &Command, out: &mut impl Write) -> OpResult {
    if let Command::Progress { volume } = cmd {
        writeln!(out, "team volume: {}", volume)?;
        write_progress(out, &upline_rank::progress(*volume))?;
    }
    Ok(())
}

/// Run a store-backed command.
pub fn run<S: HierarchyStore>(cmd: Command, engine: &Engine<S>, out: &mut impl Write) -> OpResult {
    match cmd {
        Command::Add { id, name, parent } => {
            let report = engine.register(Participant::new(id.clone(), name, parent))?;
            writeln!(out, "registered {}", id)?;
            write_report(out, &report)?;
        }
        Command::Activate { id } => match engine.activate(&id)? {
            Some(report) => {
                writeln!(out, "activated {}", id)?;
                write_report(out, &report)?;
            }
            None => writeln!(out, "{} is already active", id)?,
        },
        Command::Invest { id, amount } => {
            let report = engine.post_investment(&id, amount)?;
            writeln!(out, "posted {} for {}", amount, id)?;
            write_report(out, &report)?;
        }
        Command::Show { id } => {
            let store = engine.store();
            let Some(p) = store.get_participant(&id)? else {
                return Err(format!("participant {} not found", id).into());
            };
            writeln!(out, "{} ({})", p.name, p.id)?;
            writeln!(
                out,
                "  parent: {}",
                p.parent_id.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".into())
            )?;
            writeln!(out, "  status: {}", p.status)?;
            writeln!(out, "  invested: {}", p.total_invested)?;
            writeln!(out, "  wallet: {}", p.wallet_balance)?;
            writeln!(
                out,
                "  team: {} members, {} active, volume {}, commission {}",
                p.total_team_members,
                p.total_active_team_members,
                p.team_volume,
                p.total_team_commission
            )?;
            write!(out, "  ")?;
            write_progress(out, &engine.rank_progress(p.team_volume))?;
            for row in store.list_aggregate_rows(&id)? {
                writeln!(
                    out,
                    "  {}: count {}, active {}, volume {}, commission {}",
                    row.level, row.count, row.active, row.volume, row.commission
                )?;
            }
        }
        Command::Reconcile => {
            let report = engine.reconcile_all()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        Command::Audit => {
            let audit = engine.audit_ledger()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&audit)?)?;
        }
        Command::Ledger { id } => {
            let entries: Vec<_> = engine
                .store()
                .list_commission_transactions()?
                .into_iter()
                .filter(|tx| tx.beneficiary == id)
                .collect();
            if entries.is_empty() {
                writeln!(out, "(none)")?;
            }
            for tx in entries {
                writeln!(out, "#{} {} {} {}", tx.seq, tx.level, tx.amount, tx.description)?;
            }
        }
        Command::Progress { .. } | Command::Help => run_pure(&cmd, out)?,
    }
    Ok(())
}
