//! desk-runner: headless runner for the LedgerDesk back office.
//!
//! Usage:
//!   desk-runner --db ledger.db --date 2024-03-01 --days 30
//!   desk-runner --seed 7 --demo-clients 25 --days 7
//!   desk-runner --ipc-mode

use anyhow::{Context, Result};
use chrono::NaiveDate;
use ledgerdesk_core::{
    analytics::DashboardStats,
    client::ClientUpdate,
    config::LedgerConfig,
    demo::DemoSeeder,
    engine::LedgerDesk,
    event::LedgerEvent,
    instrument::{ChequeStatus, ChequeStatusUpdate, NewCheque},
    notify::{LogNotifier, MemoryNotifier, Notice, Notifier},
    reconciliation::ReconciliationReport,
    store::LedgerStore,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

const WEBHOOK_SECRET_VAR: &str = "LEDGER_WEBHOOK_SECRET";

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetDashboard,
    RunDays {
        count: u32,
    },
    Reconcile,
    RecordCheque(NewCheque),
    SetChequeStatus {
        cheque_id: String,
        status: ChequeStatus,
        #[serde(default)]
        bounce_reason: Option<String>,
        #[serde(default)]
        clearance_date: Option<NaiveDate>,
    },
    CheckoutCompleted {
        payload: String,
        signature: String,
    },
    RefundOnline {
        online_id: String,
    },
    UpdateClient {
        client_id: String,
        update: ClientUpdate,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct DayReport {
    today: NaiveDate,
    events: Vec<LedgerEvent>,
    notices: Vec<Notice>,
    dashboard: DashboardStats,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let days = parse_arg(&args, "--days", 1u32);
    let demo_clients = parse_arg(&args, "--demo-clients", 0usize);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let start = match flag_value(&args, "--date") {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("--date expects YYYY-MM-DD, got '{raw}'"))?,
        None => chrono::Local::now().date_naive(),
    };

    if !ipc_mode {
        println!("LedgerDesk desk-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  date:      {start}");
        println!("  days:      {days}");
        if demo_clients > 0 {
            println!("  demo:      {demo_clients} clients, seed {seed}");
        }
        println!();
    }

    // For :memory: use a shared-memory URI so every connection in this
    // process sees the same database.
    let db_effective = if db == ":memory:" {
        format!(
            "file:ledger_{}?mode=memory&cache=shared",
            chrono::Utc::now().timestamp()
        )
    } else {
        db.to_string()
    };
    let store = LedgerStore::open(&db_effective)?;
    store.migrate()?;

    let config = load_config(data_dir)?;

    if ipc_mode {
        let notices = Arc::new(MemoryNotifier::new());
        let mut desk = LedgerDesk::build(store, config, Box::new(Arc::clone(&notices)), start);
        seed_demo(&desk, seed, demo_clients, start)?;
        run_ipc_loop(&mut desk, &notices)?;
    } else {
        let notifier: Box<dyn Notifier> =
            Box::new(LogNotifier::new(config.notifications.sender.clone()));
        let mut desk = LedgerDesk::build(store, config, notifier, start);
        seed_demo(&desk, seed, demo_clients, start)?;
        run_batch(&mut desk, days)?;
    }

    Ok(())
}

fn load_config(data_dir: &str) -> Result<LedgerConfig> {
    if Path::new(data_dir).join("ledger.json").exists() {
        LedgerConfig::load(data_dir)
    } else {
        log::warn!("no ledger.json in {data_dir}, using defaults");
        Ok(LedgerConfig::default())
    }
}

fn seed_demo(desk: &LedgerDesk, seed: u64, clients: usize, start: NaiveDate) -> Result<()> {
    if clients > 0 {
        DemoSeeder::new(seed).seed(desk, clients, start)?;
    }
    Ok(())
}

fn run_batch(desk: &mut LedgerDesk, days: u32) -> Result<()> {
    let mut events = 0usize;
    if days > 0 {
        events += desk.run_day(desk.today())?.len();
        for _ in 1..days {
            events += desk.run_next_day()?.len();
        }
    }

    let today = desk.today();
    desk.refresh_invoice_statuses(today)?;
    let report = desk.reconcile(today)?;
    let dashboard = desk.dashboard()?;
    print_summary(desk, &dashboard, &report, days, events)
}

fn run_ipc_loop(desk: &mut LedgerDesk, notices: &MemoryNotifier) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let response = match handle_command(desk, notices, cmd) {
            Ok(value) => value,
            Err(e) => serde_json::json!({ "error": format!("{e:#}") }),
        };
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    desk: &mut LedgerDesk,
    notices: &MemoryNotifier,
    cmd: IpcCommand,
) -> Result<serde_json::Value> {
    let value = match cmd {
        IpcCommand::GetDashboard => serde_json::to_value(desk.dashboard()?)?,
        IpcCommand::RunDays { count } => {
            let mut events = Vec::new();
            for _ in 0..count {
                events.extend(desk.run_next_day()?);
            }
            serde_json::to_value(DayReport {
                today: desk.today(),
                events,
                notices: notices.drain(),
                dashboard: desk.dashboard()?,
            })?
        }
        IpcCommand::Reconcile => {
            let today = desk.today();
            desk.refresh_invoice_statuses(today)?;
            serde_json::to_value(desk.reconcile(today)?)?
        }
        IpcCommand::RecordCheque(input) => serde_json::to_value(desk.record_cheque(input)?)?,
        IpcCommand::SetChequeStatus {
            cheque_id,
            status,
            bounce_reason,
            clearance_date,
        } => {
            let update = ChequeStatusUpdate {
                status,
                bounce_reason,
                clearance_date,
            };
            let cheque = desk.set_cheque_status(&cheque_id, update, desk.today())?;
            serde_json::json!({ "cheque": cheque, "notices": notices.drain() })
        }
        IpcCommand::CheckoutCompleted { payload, signature } => {
            let secret = env::var(WEBHOOK_SECRET_VAR)
                .with_context(|| format!("{WEBHOOK_SECRET_VAR} is not set"))?;
            let online = desk.ingest_webhook(
                &payload,
                &signature,
                &secret,
                chrono::Utc::now().timestamp(),
                desk.today(),
            )?;
            serde_json::json!({ "recorded": online.is_some(), "online": online })
        }
        IpcCommand::RefundOnline { online_id } => {
            serde_json::to_value(desk.refund_online(&online_id)?)?
        }
        IpcCommand::UpdateClient { client_id, update } => {
            serde_json::to_value(desk.update_client(&client_id, update)?)?
        }
        IpcCommand::Quit => serde_json::Value::Null,
    };
    Ok(value)
}

fn print_summary(
    desk: &LedgerDesk,
    dashboard: &DashboardStats,
    report: &ReconciliationReport,
    days: u32,
    events: usize,
) -> Result<()> {
    let store = desk.store();
    println!("=== RUN SUMMARY ===");
    println!("  business date:   {}", desk.today());
    println!("  days run:        {days}");
    println!("  job events:      {events}");
    println!("  clients:         {}", store.client_count()?);
    println!("  reminders sent:  {}", store.event_count("reminder_sent")?);

    println!();
    println!("=== DASHBOARD ===");
    println!("  outstanding:     {:.2}", dashboard.total_outstanding);
    println!("  pending cheques: {}", dashboard.pending_cheques);
    println!("  cleared total:   {:.2}", dashboard.cleared_total);
    println!("  bounce rate:     {:.2}%", dashboard.bounce_rate);

    println!();
    println!("=== RECONCILIATION ===");
    println!(
        "  matched:         {} ({:.2})",
        report.matched_count(),
        report.matched_amount()
    );
    println!("  unmatched:       {}", report.unmatched_count());
    for m in &report.matches {
        println!(
            "    {} <- {} {} {:.2} (score {})",
            m.invoice_number,
            m.payment_kind.as_str(),
            m.payment_reference,
            m.amount,
            m.score
        );
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
