use std::time::Duration;

use athlete_timer_core::{
    find_template, ApiClient, Config, Database, Event, NotificationCenter, SessionDriver,
    SessionKind, SessionResult, SessionRunner, SessionSink, SessionStatus, TimerError,
};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::terminal::TerminalBackend;

#[derive(Args)]
pub struct RunArgs {
    /// Template id (see `templates`)
    pub template: String,
    /// Override the per-set duration in seconds
    #[arg(long)]
    pub duration: Option<u32>,
    /// Override the number of sets
    #[arg(long)]
    pub sets: Option<u32>,
    /// Keep the result local; don't submit to the API
    #[arg(long)]
    pub offline: bool,
}

const HELP: &str = "controls: <enter> pause/resume, n next set, 1-9 preset, s status, q end session";

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut template =
        find_template(&args.template).ok_or_else(|| format!("unknown template: {}", args.template))?;
    if template.kind == SessionKind::Rest {
        template.set_duration_secs = config.timer.default_rest_secs;
        template.presets = config.timer.rest_presets.clone();
    }
    if let Some(duration) = args.duration {
        template.set_duration_secs = duration;
    }
    if let Some(sets) = args.sets {
        template.total_sets = sets;
    }
    let runner = SessionRunner::from_template(&template)?;

    eprintln!("{} ({} x {}s)", template.label, template.total_sets, template.set_duration_secs);
    eprintln!("{HELP}");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(drive(runner, config.timer.tick_interval()))?;
    // Stdin reads may still be parked on a blocking thread; don't wait for them.
    // Blocking HTTP below must not run inside the runtime anyway.
    runtime.shutdown_background();

    match result {
        Some(result) => {
            println!("{}", serde_json::to_string(&Event::SessionFinished { result: result.clone() })?);
            persist(&config, &result, args.offline)
        }
        None => Ok(()),
    }
}

async fn drive(
    runner: SessionRunner,
    tick_interval: Duration,
) -> Result<Option<SessionResult>, Box<dyn std::error::Error>> {
    let (mut driver, mut events) = SessionDriver::new(runner, tick_interval);
    let mut center = NotificationCenter::new(TerminalBackend);
    center.init(Vec::new())?;

    print_event(&driver.snapshot())?;
    driver.resume()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let result = loop {
        tokio::select! {
            Some(event) = events.recv() => {
                if let Event::SessionFinished { result } = event {
                    break Some(result);
                }
                print_event(&event)?;
                if let Err(e) = center.notify_event(&event) {
                    tracing::warn!(error = %e, "notification failed");
                }
                if matches!(event, Event::SessionCompleted { .. }) {
                    break driver.complete_session(false);
                }
                if !stdin_open && matches!(event, Event::SetCompleted { .. }) {
                    next_set_unattended(&mut driver)?;
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(input) => {
                        if let Err(e) = handle_input(&mut driver, input.trim()) {
                            tracing::warn!(error = %e, "ignored control");
                            eprintln!("{e}");
                        }
                    }
                    None => {
                        stdin_open = false;
                        next_set_unattended(&mut driver)?;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break driver.complete_session(true);
            }
        }
    };

    driver.teardown();
    center.teardown()?;
    Ok(result)
}

fn handle_input(driver: &mut SessionDriver, input: &str) -> Result<(), TimerError> {
    match input {
        "" | "p" | "pause" | "r" | "resume" => driver.toggle(),
        "n" | "next" => {
            driver.advance_set()?;
            driver.resume()
        }
        "s" | "status" => {
            if let Ok(line) = serde_json::to_string(&driver.snapshot()) {
                println!("{line}");
            }
            Ok(())
        }
        "q" | "quit" | "end" => {
            driver.complete_session(true);
            Ok(())
        }
        other => {
            let preset = other
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| driver.with_runner(|r| r.presets().get(i).copied()));
            match preset {
                Some(secs) => driver.select_preset(secs),
                None => {
                    eprintln!("{HELP}");
                    Ok(())
                }
            }
        }
    }
}

/// Nobody can press `n` once stdin is closed, so sets chain on their own.
/// Does nothing unless the session is waiting between sets.
fn next_set_unattended(driver: &mut SessionDriver) -> Result<(), TimerError> {
    if driver.with_runner(|r| r.status()) != SessionStatus::SetComplete {
        return Ok(());
    }
    tracing::info!("stdin closed; starting next set");
    driver.advance_set()?;
    driver.resume()
}

fn print_event(event: &Event) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

/// Always log locally; then try the API unless offline or unconfigured.
fn persist(
    config: &Config,
    result: &SessionResult,
    offline: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let id = db.record_result(result)?;

    if offline || config.api.base_url.is_none() {
        tracing::info!(id, "session result kept locally");
        return Ok(());
    }

    let client = ApiClient::new(&config.api, db.auth_token()?)?;
    match client.submit_session_result(result.kind, result) {
        Ok(()) => db.mark_synced(id)?,
        Err(e) => {
            tracing::warn!(error = %e, id, "submit failed; result kept locally");
            eprintln!("could not reach the API ({e}); run `athlete-timer sync` later");
        }
    }
    Ok(())
}
