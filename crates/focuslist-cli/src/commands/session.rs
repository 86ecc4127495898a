//! Interactive interval session.
//!
//! Runs the ticker in the background and reads one command per line from
//! stdin. Events are printed to stdout as JSON lines.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use focuslist_core::{
    run_ticker, Collaborators, CompanionOpener, Config, EngineHandle, Event, FocusTask,
    LogNotifier, MemoryTaskStore, NoopNotifier, NoopOpener, Notifier, TaskId, UrlOpener,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;

#[derive(Args)]
pub struct SessionArgs {
    /// Task to make available, as `<id>=<minutes>[:title]` (repeatable)
    #[arg(long = "task", value_name = "SPEC")]
    tasks: Vec<String>,
}

#[derive(Debug, PartialEq)]
enum SessionCommand {
    Focus(TaskId),
    Break(TaskId),
    Next(TaskId),
    Stop(TaskId),
    Resume(TaskId),
    Reset(TaskId),
    Restart(TaskId),
    Status,
    Quit,
}

impl SessionCommand {
    fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| "empty command".to_string())?;
        let mut id = || {
            words
                .next()
                .map(TaskId::from)
                .ok_or_else(|| format!("'{verb}' needs a task id"))
        };
        let cmd = match verb {
            "focus" => SessionCommand::Focus(id()?),
            "break" => SessionCommand::Break(id()?),
            "next" => SessionCommand::Next(id()?),
            "stop" => SessionCommand::Stop(id()?),
            "resume" => SessionCommand::Resume(id()?),
            "reset" => SessionCommand::Reset(id()?),
            "restart" => SessionCommand::Restart(id()?),
            "status" => SessionCommand::Status,
            "quit" | "exit" => SessionCommand::Quit,
            other => return Err(format!("unknown command: {other}")),
        };
        Ok(cmd)
    }
}

/// Parse `<id>=<minutes>[:title]`. Unparseable minutes count as missing.
fn parse_task_spec(spec: &str) -> Result<FocusTask, String> {
    let (id, rest) = spec
        .split_once('=')
        .ok_or_else(|| format!("expected <id>=<minutes>[:title], got '{spec}'"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("task id is empty in '{spec}'"));
    }
    let (minutes, title) = rest.split_once(':').unwrap_or((rest, ""));
    Ok(FocusTask::new(id, FocusTask::parse_duration(minutes)).with_title(title.trim()))
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!("could not serialize output: {e}"),
    }
}

pub fn run(args: SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let tasks = args
        .tasks
        .iter()
        .map(|spec| parse_task_spec(spec).map(|t| (t.id.clone(), t)))
        .collect::<Result<HashMap<_, _>, _>>()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(session(Config::load_or_default(), tasks))
}

async fn session(
    config: Config,
    tasks: HashMap<TaskId, FocusTask>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryTaskStore::new());
    let notifier: Arc<dyn Notifier> = if config.notifications.enabled {
        Arc::new(LogNotifier)
    } else {
        Arc::new(NoopNotifier)
    };
    let opener: Arc<dyn CompanionOpener> = match config.companion_url() {
        Some(url) => Arc::new(UrlOpener::new(url)),
        None => Arc::new(NoopOpener),
    };
    let collaborators = Collaborators::new(notifier, store.clone(), opener);
    let handle = EngineHandle::new(config.cycle_config(), collaborators);

    let (stop_tx, stop_rx) = watch::channel(false);
    let period = Duration::from_millis(config.timer.tick_interval_ms);
    let ticker = tokio::spawn(run_ticker(handle.clone(), period, stop_rx));

    let mut events = handle.subscribe_events();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    print_json(&event);
                    if matches!(event, Event::EngineShutdown { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let cmd = match SessionCommand::parse(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        let applied = match &cmd {
            SessionCommand::Focus(id) => {
                let task = tasks
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| FocusTask::new(id.clone(), None));
                handle.start_focus(&task).await
            }
            SessionCommand::Break(id) => handle.start_break(id).await,
            SessionCommand::Next(id) => handle.start_next_cycle(id).await,
            SessionCommand::Stop(id) => handle.stop(id).await,
            SessionCommand::Resume(id) => handle.resume(id).await,
            SessionCommand::Reset(id) => handle.reset(id).await,
            SessionCommand::Restart(id) => handle.force_restart(id).await,
            SessionCommand::Status => {
                print_json(&handle.snapshots().await);
                continue;
            }
            SessionCommand::Quit => break,
        };
        if applied.is_none() {
            eprintln!("ignored: {}", line.trim());
        }
    }

    stop_tx.send(true)?;
    ticker.await?;
    printer.await?;
    print_json(&serde_json::json!({ "completed": store.completed() }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            SessionCommand::parse("focus a"),
            Ok(SessionCommand::Focus(TaskId::new("a")))
        );
        assert_eq!(
            SessionCommand::parse("  restart  b "),
            Ok(SessionCommand::Restart(TaskId::new("b")))
        );
        assert_eq!(SessionCommand::parse("status"), Ok(SessionCommand::Status));
        assert_eq!(SessionCommand::parse("exit"), Ok(SessionCommand::Quit));
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(SessionCommand::parse("").is_err());
        assert!(SessionCommand::parse("break").is_err());
        assert!(SessionCommand::parse("dance a").is_err());
    }

    #[test]
    fn parses_task_specs() {
        let task = parse_task_spec("report=45:Write report").unwrap();
        assert_eq!(task.id, TaskId::new("report"));
        assert_eq!(task.duration_minutes, Some(45.0));
        assert_eq!(task.title, "Write report");

        let task = parse_task_spec("x=soon").unwrap();
        assert_eq!(task.duration_minutes, None);

        assert!(parse_task_spec("no-equals").is_err());
        assert!(parse_task_spec("=30").is_err());
    }
}
