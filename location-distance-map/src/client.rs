use anyhow::Result;
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    select,
};
use tracing::{debug, warn};

use crate::{
    api::HttpRegistryClient,
    cli::ClientArgs,
    highlight::TokioScheduler,
    map::ConsoleMap,
    notify::{ConsoleNotifier, Stream},
    protocol::{ConsoleCommand, HELP_LINES},
    sync::SyncController,
};

type ConsoleController =
    SyncController<HttpRegistryClient, ConsoleMap, ConsoleNotifier, TokioScheduler>;

pub async fn run(args: ClientArgs) -> Result<()> {
    let (map, mut clicks) = ConsoleMap::new();
    let (scheduler, mut expired) = TokioScheduler::new();
    let mut controller = SyncController::new(
        HttpRegistryClient::new(&args.server),
        map,
        ConsoleNotifier::default(),
        scheduler,
    );

    // A failed first load has already been reported; the user can RELOAD.
    let _ = controller.load_snapshot().await;
    flush_notices(&mut controller).await?;
    write_stdout(&format!(
        "*** connected to {} ({} locations)",
        args.server,
        controller.mirror().len()
    ))
    .await?;

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut input = String::new();

    loop {
        select! {
            bytes_read = stdin.read_line(&mut input) => {
                let keep_going = handle_stdin_input(bytes_read, &input, &mut controller).await?;
                flush_notices(&mut controller).await?;
                // Cleared only after a full line so a line split by another branch is kept.
                input.clear();
                if !keep_going {
                    break;
                }
            }
            Some(click) = clicks.recv() => {
                if let Err(error) = controller.handle_marker_click(click) {
                    debug!(%error, "marker click failed");
                }
                flush_notices(&mut controller).await?;
            }
            Some(ticket) = expired.recv() => {
                controller.handle_highlight_expired(ticket);
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                handle_ctrl_c(ctrl_c);
                break;
            }
        }
    }

    Ok(())
}

async fn handle_stdin_input(
    bytes_read: io::Result<usize>,
    input: &str,
    controller: &mut ConsoleController,
) -> Result<bool> {
    let bytes_read = bytes_read?;
    if bytes_read == 0 {
        return Ok(false);
    }

    let text = input.trim();
    if text.is_empty() {
        return Ok(true);
    }

    let command = match ConsoleCommand::parse(text) {
        Ok(command) => command,
        Err(error) => {
            write_stderr(&format!("!!! {error:#}")).await?;
            return Ok(true);
        }
    };

    // Controller failures are queued on its notifier and flushed by the caller.
    match command {
        ConsoleCommand::Add(location) => {
            if let Err(error) = controller.add_location(location).await {
                debug!(%error, "add failed");
            }
        }
        ConsoleCommand::List => render_selector(controller).await?,
        ConsoleCommand::Select(selection) => {
            if let Err(error) = controller.select_and_show(selection.as_deref().unwrap_or("")) {
                debug!(%error, "select failed");
            }
        }
        ConsoleCommand::Click(id) => {
            if !controller.map().click(id) {
                write_stderr(&format!("!!! no marker for location {id}")).await?;
            }
        }
        ConsoleCommand::Reload => {
            if controller.load_snapshot().await.is_ok() {
                write_stdout(&format!(
                    "*** {} locations loaded",
                    controller.mirror().len()
                ))
                .await?;
            }
        }
        ConsoleCommand::Help => {
            for line in HELP_LINES {
                write_stdout(line).await?;
            }
        }
        ConsoleCommand::Exit => {
            write_stdout("*** bye").await?;
            return Ok(false);
        }
    }

    Ok(true)
}

async fn render_selector(controller: &ConsoleController) -> io::Result<()> {
    let options = controller.selector_options();
    if options.is_empty() {
        return write_stdout("*** no locations yet").await;
    }
    write_stdout("-- Select Location --").await?;
    for option in options {
        let location = controller.mirror().get(option.id);
        let coords = location
            .map(|loc| format!(" ({}, {})", loc.lat, loc.lng))
            .unwrap_or_default();
        write_stdout(&format!("  [{}] {}{coords}", option.id, option.label)).await?;
    }
    Ok(())
}

async fn flush_notices(controller: &mut ConsoleController) -> io::Result<()> {
    for line in controller.notifier_mut().drain() {
        match line.stream {
            Stream::Stdout => write_stdout(&line.text).await?,
            Stream::Stderr => write_stderr(&line.text).await?,
        }
    }
    Ok(())
}

fn handle_ctrl_c(result: io::Result<()>) {
    if let Err(error) = result {
        warn!(?error, "ctrl-c handler failed");
    }
}

async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

async fn write_stderr(line: &str) -> io::Result<()> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(line.as_bytes()).await?;
    stderr.write_all(b"\n").await?;
    stderr.flush().await
}
