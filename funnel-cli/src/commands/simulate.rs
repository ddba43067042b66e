use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use funnel_core::tracking::EventData;
use funnel_core::{
    Actor, EventKind, EventSink, FileEventStore, FunnelConfig, FunnelStep, LocalIdentity,
    ManualClock, NavigationGuard, NavigationRequest, PaywallVariant, SessionTracker,
    TrackingContext, VariantSelector,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::variant::SignalArgs;
use crate::config::ConfigLoader;

#[derive(Args)]
pub struct SimulateArgs {
    /// Id of the simulated signed-in user
    #[arg(long, default_value = "demo-user")]
    pub user: String,

    #[command(flatten)]
    pub signals: SignalArgs,

    /// Simulated time spent on each step, in milliseconds
    #[arg(long, default_value_t = 1500)]
    pub dwell_ms: i64,

    /// Session store file (defaults to the funnel data directory)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// What one simulated walk produced
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationReport {
    user_id: String,
    session_id: Option<String>,
    reached: FunnelStep,
    variant: Option<PaywallVariant>,
    visits: Vec<VisitLine>,
    events_tracked: usize,
    failed_flushes: usize,
    store: PathBuf,
}

#[derive(Debug, Serialize)]
struct VisitLine {
    page: String,
    duration: Option<String>,
}

pub async fn run(args: SimulateArgs) -> Result<()> {
    if args.dwell_ms < 0 {
        bail!("--dwell-ms must not be negative");
    }

    let config = ConfigLoader::load()?;
    let store_path = args
        .store
        .clone()
        .unwrap_or_else(funnel_paths::session_store_path);
    let report = simulate(&args, &config, store_path).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

async fn simulate(
    args: &SimulateArgs,
    config: &FunnelConfig,
    store_path: PathBuf,
) -> Result<SimulationReport> {
    let signals = args.signals.to_signals()?;
    let guard = NavigationGuard::from_config(&config.navigation)?;
    let selector = VariantSelector::new(config.variant.clone());

    let identity = Arc::new(LocalIdentity::signed_in(Actor::new(&args.user)));
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = Arc::new(FileEventStore::load(&store_path).await?);
    let sink = Arc::new(EventSink::with_capacity(
        store,
        clock.clone(),
        config.tracking.flush_mode,
        config.tracking.outcome_capacity,
    ));
    let tracker = SessionTracker::new(identity.clone(), sink.clone(), clock.clone());
    let mut ctx = TrackingContext::with_prefix(&config.tracking.session_prefix);
    let mut outcomes = sink.subscribe();

    let mut current = FunnelStep::Entry;
    let mut variant = None;
    tracker.track_page_visit(&mut ctx, current.page_name(), None);

    for next in FunnelStep::ALL.into_iter().skip(1) {
        clock.advance_millis(args.dwell_ms);

        let request = NavigationRequest::new(current.path(), next.path());
        let decision = guard.check(&request, identity.as_ref());
        if !decision.is_allowed() {
            warn!(from = %current, to = %next, ?decision, "simulated navigation refused");
            break;
        }

        tracker.track_page_visit(&mut ctx, next.page_name(), None);
        current = next;

        match next {
            FunnelStep::Quiz => {
                let answers = args.signals.quiz_answers()?;
                for (index, (question, answer)) in answers.into_iter().enumerate() {
                    let index = u32::try_from(index)?;
                    let spent = u64::try_from(args.dwell_ms)?;
                    tracker.track_quiz_answer(&mut ctx, question, index, answer, spent, false);
                }
            }
            FunnelStep::Summary => {
                let chosen = selector.select(&signals);
                let mut data = EventData::new();
                data.insert("variant".to_string(), json!(chosen.as_str()));
                tracker.track_event(
                    &mut ctx,
                    EventKind::Custom("paywall_view".to_string()),
                    Some(next.page_name()),
                    Some(data),
                );
                variant = Some(chosen);
            }
            _ => {}
        }
    }

    clock.advance_millis(args.dwell_ms);
    tracker.teardown(&mut ctx);
    sink.wait_idle().await;

    let mut failed_flushes = 0;
    while let Ok(outcome) = outcomes.try_recv() {
        if !outcome.result.is_success() {
            failed_flushes += 1;
        }
    }

    info!(
        user = %args.user,
        events = ctx.events().len(),
        failed_flushes,
        store = %store_path.display(),
        "simulation finished"
    );

    Ok(SimulationReport {
        user_id: args.user.clone(),
        session_id: ctx.session_id().map(str::to_string),
        reached: current,
        variant,
        visits: ctx
            .ledger()
            .visits()
            .iter()
            .map(|v| VisitLine {
                page: v.page.clone(),
                duration: v.duration_formatted.clone(),
            })
            .collect(),
        events_tracked: ctx.events().len(),
        failed_flushes,
        store: store_path,
    })
}

fn print_report(report: &SimulationReport) {
    println!("User:     {}", report.user_id);
    println!(
        "Session:  {}",
        report.session_id.as_deref().unwrap_or("(none)")
    );
    println!("Reached:  {}", report.reached);
    if let Some(variant) = report.variant {
        println!("Variant:  {} ({})", variant, variant.content().headline);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Page").fg(Color::Cyan),
        Cell::new("Time on page").fg(Color::Cyan),
    ]);
    for visit in &report.visits {
        table.add_row(vec![
            Cell::new(&visit.page),
            Cell::new(visit.duration.as_deref().unwrap_or("open")),
        ]);
    }
    println!("{table}");
    println!(
        "Events:   {} tracked, {} failed to persist",
        report.events_tracked, report.failed_flushes
    );
    println!("Store:    {}", report.store.display());
}
