use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use checkin_chain::{CommitmentBuilder, KeypairSigner, LedgerClient, RpcLedgerClient};
use checkin_config::Settings;
use checkin_core::{FileKeyValueStore, Journey, JourneyStore};
use checkin_engine::{Orchestrator, OrchestratorOptions, PendingCheckIn, RecoveryOutcome};
use checkin_types::{DayNumber, FeeSchedule, HabitCategory, JourneyState};
use chrono::{NaiveDate, Utc};

fn open_journey(settings: &Settings) -> Result<Journey> {
    let kv = FileKeyValueStore::open(&settings.data_dir).with_context(|| {
        format!(
            "Failed to open data directory {}",
            settings.data_dir.display()
        )
    })?;
    Ok(Journey::open(JourneyStore::new(Arc::new(kv)))?)
}

fn open_orchestrator(settings: &Settings) -> Result<Orchestrator> {
    let journey = open_journey(settings)?;
    let ledger: Arc<dyn LedgerClient> = Arc::new(RpcLedgerClient::new(
        settings.ledger.rpc_url.clone(),
        settings.ledger.commitment,
        settings.ledger.poll_interval,
    )?);
    let signer = KeypairSigner::from_file(&settings.keypair_path, Arc::clone(&ledger))?;
    let builder = CommitmentBuilder::new(
        Arc::clone(&ledger),
        settings.fees,
        settings.treasury,
        settings.badge.clone(),
    );
    Ok(Orchestrator::new(
        journey,
        builder,
        Arc::new(signer),
        ledger,
        OrchestratorOptions {
            confirm_timeout: settings.ledger.confirm_timeout,
            check_balance: settings.check_balance,
        },
    ))
}

pub fn status(settings: &Settings) -> Result<()> {
    let journey = open_journey(settings)?;
    let pending = PendingCheckIn::load(journey.store().backing().as_ref())?;
    let today = Utc::now().date_naive();
    print!(
        "{}",
        render_status(&journey, today, &settings.fees, pending.as_ref())
    );
    Ok(())
}

pub fn start(settings: &Settings, name: &str, category: HabitCategory) -> Result<()> {
    let mut journey = open_journey(settings)?;
    let now = Utc::now();
    let habit = journey.create(name, category, now.date_naive(), now)?;
    println!(
        "Started \"{}\" ({}). Day 1 is due today; check in for {}.",
        habit.name(),
        habit.category(),
        settings.fees.fee(DayNumber::FIRST)
    );
    Ok(())
}

pub async fn check_in(settings: &Settings) -> Result<()> {
    let orchestrator = open_orchestrator(settings)?;
    let now = Utc::now();
    let receipt = orchestrator.check_in(now.date_naive(), now).await?;
    println!(
        "Checked in day {} for {}.\n  badge:       {}\n  mint:        {}\n  transaction: {}\n  progress:    {}/{} ({}%)",
        receipt.day,
        receipt.fee,
        receipt.badge.metadata.name,
        receipt.badge.mint_address,
        receipt.signature,
        receipt.progress.completed,
        receipt.progress.total,
        receipt.progress.percentage
    );
    Ok(())
}

pub fn advance(settings: &Settings) -> Result<()> {
    let mut journey = open_journey(settings)?;
    let today = Utc::now().date_naive();
    if journey.advance_to(today)? {
        println!("Remaining days re-dated; the next one is due {today}.");
    } else {
        println!("Nothing to advance.");
    }
    Ok(())
}

pub fn reset(settings: &Settings, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to delete the journey without --yes");
    }
    let mut journey = open_journey(settings)?;
    delete_journey(&mut journey)?;
    println!("Journey deleted.");
    Ok(())
}

/// The pending record goes only once the journey is gone.
fn delete_journey(journey: &mut Journey) -> Result<()> {
    journey.delete()?;
    PendingCheckIn::clear(journey.store().backing().as_ref())?;
    Ok(())
}

pub async fn recover(settings: &Settings) -> Result<()> {
    let orchestrator = open_orchestrator(settings)?;
    match orchestrator.recover().await? {
        RecoveryOutcome::NothingPending => println!("No interrupted check-in."),
        RecoveryOutcome::Committed { day, signature } => {
            println!("Recorded day {day} ({signature}).");
        }
        RecoveryOutcome::Discarded { day, mint, reason } => {
            println!("Dropped day {day} (badge {mint}): {reason}.");
        }
        RecoveryOutcome::StillPending { day, mint } => {
            println!("Day {day} (badge {mint}) is not settled yet; try again shortly.");
        }
    }
    Ok(())
}

pub fn render_fees(fees: &FeeSchedule) -> String {
    let mut out = String::new();
    for day in DayNumber::all() {
        let _ = writeln!(out, "Day {day:>2}  {}", fees.fee(day));
    }
    let _ = writeln!(out, "Total   {}", fees.total());
    out
}

pub fn render_status(
    journey: &Journey,
    today: NaiveDate,
    fees: &FeeSchedule,
    pending: Option<&PendingCheckIn>,
) -> String {
    let mut out = String::new();
    let Some(habit) = journey.habit() else {
        out.push_str("No journey. Start one with `checkin start <name>`.\n");
        return out;
    };

    let progress = habit.progress();
    let _ = writeln!(out, "{} ({})", habit.name(), habit.category());
    let _ = writeln!(
        out,
        "Progress: {}/{} ({}%)",
        progress.completed, progress.total, progress.percentage
    );
    let line = match journey.state(today) {
        JourneyState::NoHabit => String::new(),
        JourneyState::ActiveUncompletedToday(day) => {
            format!("Today: day {day} is open ({})", fees.fee(day))
        }
        JourneyState::ActiveCompletedToday(day) => format!("Today: day {day} is done"),
        JourneyState::ActiveDisabled => "Today: no day is due".to_string(),
        JourneyState::Complete => "Journey complete".to_string(),
    };
    let _ = writeln!(out, "{line}");
    if let Some(pending) = pending {
        let _ = writeln!(
            out,
            "Interrupted check-in for day {} (badge {}); run `checkin recover`",
            pending.day, pending.mint
        );
    }

    out.push('\n');
    for slot in habit.check_ins() {
        let mark = if slot.is_completed() { "x" } else { " " };
        let _ = write!(out, "[{mark}] Day {:>2}  {}", slot.day(), slot.date());
        if let Some(proof) = slot.proof() {
            let _ = write!(out, "  {}", proof.fee_paid);
        }
        out.push('\n');
    }
    out
}
