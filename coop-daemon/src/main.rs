//! coop-light - coordinator for cooperative slider controllers
//!
//! Reads controller frames from a radio module on a serial port, arbitrates
//! channel ownership, answers with the coordinator's outbound position and
//! drives the fixture chain.

mod bulb_driver;
mod history_store;
mod radio_link;
mod settings;

use anyhow::Context;
use coop_mux::{run_coordinator, CoordinatorHandle, EventSink, History};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bulb_driver::LoggingDriver;
use crate::radio_link::RadioLink;
use crate::settings::Settings;

/// Commands queued for the coordinator actor
const COMMAND_QUEUE: usize = 256;

/// Outbound payloads queued for the radio link
const RADIO_QUEUE: usize = 32;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "coop_light=info,coop_protocol=info,coop_render=info,coop_mux=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting coop-light coordinator");

    let settings = Settings::load();
    settings
        .coordinator
        .validate()
        .context("invalid coordinator configuration")?;

    let history_path = settings.history_path();
    let history = history_path
        .as_deref()
        .map(history_store::load)
        .unwrap_or_else(History::new);
    let sink = EventSink::with_history(history, settings.event_capacity);

    let writer = history_path
        .map(|path| tokio::spawn(history_store::run_writer(sink.subscribe(), path)));

    let link = match RadioLink::open(&settings.serial_port, settings.baud_rate) {
        Ok(link) => link,
        Err(e) => {
            radio_link::log_available_ports();
            return Err(e).context("radio module unavailable");
        }
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
    let (radio_tx, radio_rx) = mpsc::channel(RADIO_QUEUE);
    let handle = CoordinatorHandle::new(cmd_tx);

    let fixtures = settings.coordinator.render.fixture_order.clone();
    let coordinator = tokio::spawn(run_coordinator(
        settings.coordinator,
        cmd_rx,
        radio_tx,
        Box::new(LoggingDriver::new()),
        sink,
    ));

    for id in fixtures {
        handle.fixture_discovered(id).await?;
    }

    let mut link_task = tokio::spawn(link.run(handle.clone(), radio_rx));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            info!("Interrupted, shutting down");
        }
        result = &mut link_task => match result {
            Ok(Ok(())) => info!("Radio link ended, shutting down"),
            Ok(Err(e)) => error!("Radio link failed: {}", e),
            Err(e) => error!("Radio link task failed: {}", e),
        },
    }

    // Already stopped if the link failed because the coordinator went away
    let _ = handle.shutdown().await;
    coordinator.await.context("coordinator task failed")??;
    link_task.abort();

    if let Some(writer) = writer {
        let _ = writer.await;
    }

    info!("Stopped");
    Ok(())
}
