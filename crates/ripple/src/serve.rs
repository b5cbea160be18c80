// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ripple serve` command implementation.
//!
//! Opens the loggers, builds the enabled protocol adapters, registers the
//! commands, and runs the bus until a shutdown signal arrives. Shutdown runs
//! in order: adapters stop polling, the external helper is terminated, the
//! bus drains its pool, and finally the loggers commit and close.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ripple_bus::bus::DEFAULT_CAPACITY;
use ripple_bus::{Bus, Collaborators, DispatchSettings, Dispatcher, ForwardSwitches, Registry, TaskPool};
use ripple_commands::{
    BuiltinOptions, ExternalHelper, pastebin_from_config, register_builtins, register_external,
};
use ripple_config::RippleConfig;
use ripple_core::{BusHandle, ProtocolAdapter, RippleError};
use ripple_irc::IrcAdapter;
use ripple_socket::SocketAdapter;
use ripple_storage::{SqliteStore, TextLogger};

use crate::shutdown;

/// Time each shutdown step may take before it is abandoned.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Runs the `ripple serve` command.
pub async fn run_serve(config: RippleConfig) -> Result<(), RippleError> {
    init_tracing(&config.bot.log_level);
    info!("starting ripple serve");
    let cancel = shutdown::install_signal_handler();

    let (bus_handle, bus_rx) = BusHandle::channel(DEFAULT_CAPACITY);
    let collaborators = Arc::new(build_collaborators(&config, &bus_handle).await?);

    let mut registry = Registry::new();
    register_builtins(&mut registry, &BuiltinOptions::from_config(&config));
    let helper = if config.external.enabled {
        let helper = Arc::new(ExternalHelper::new(config.external.command.clone()));
        helper.start().await?;
        register_external(&mut registry, &helper, &config.external.commands);
        Some(helper)
    } else {
        None
    };
    info!(commands = registry.commands().count(), "commands registered");

    let forwarding = Arc::new(ForwardSwitches::new());
    if let Some(store) = collaborators.store() {
        forwarding.restore(store, &config.dispatch.forward).await;
    }

    let pool = Arc::new(TaskPool::new(config.dispatch.pool_size));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(registry),
        Arc::clone(&collaborators),
        Arc::clone(&pool),
        forwarding,
        DispatchSettings::from_config(&config.dispatch),
    ));
    let bus = Bus::with_receiver(dispatcher, pool, bus_rx);
    let bus_cancel = CancellationToken::new();
    let bus_task = tokio::spawn(bus.run(bus_cancel.clone()));

    let polling = start_adapters(&collaborators);
    info!(adapters = polling.len(), "ripple is running");

    cancel.cancelled().await;
    info!("shutting down");

    collaborators.close_protocols().await;
    for handle in polling {
        shutdown::bounded("adapter polling", SHUTDOWN_GRACE, handle).await;
    }

    if let Some(helper) = helper {
        helper.close().await;
    }

    drop(bus_handle);
    bus_cancel.cancel();
    shutdown::bounded("bus drain", SHUTDOWN_GRACE, bus_task).await;

    collaborators.close_loggers().await;
    info!("ripple stopped");
    Ok(())
}

async fn build_collaborators(
    config: &RippleConfig,
    bus: &BusHandle,
) -> Result<Collaborators, RippleError> {
    let mut collaborators = Collaborators::new();

    if config.loggers.sqlite {
        let store = SqliteStore::open(&config.storage, config.dispatch.message_cache_size).await?;
        collaborators.add_logger(Arc::new(store))?;
    }
    if let Some(path) = &config.loggers.text {
        collaborators.add_logger(Arc::new(TextLogger::new(path, config.bot.timezone_offset_hours)))?;
    }

    let pastebin = pastebin_from_config(&config.pastebin);
    if config.irc.enabled {
        let irc = IrcAdapter::new(config.irc.clone(), &config.bot, bus.clone(), Arc::clone(&pastebin))?;
        collaborators.add_protocol(Arc::new(irc))?;
    }
    if config.socket.enabled {
        let socket = SocketAdapter::new(&config.socket, &config.bot, bus.clone())?;
        collaborators.add_protocol(Arc::new(socket))?;
    }
    if collaborators.protocols().next().is_none() {
        warn!("no protocol adapters enabled; only logging and offline commands are available");
    }
    Ok(collaborators)
}

fn start_adapters(collaborators: &Collaborators) -> Vec<JoinHandle<()>> {
    collaborators
        .protocols()
        .map(|(name, adapter)| {
            let name = name.to_string();
            let adapter: Arc<dyn ProtocolAdapter> = Arc::clone(adapter);
            tokio::spawn(async move {
                info!(protocol = %name, "adapter polling");
                if let Err(e) = adapter.start_polling().await {
                    error!(protocol = %name, error = %e, "adapter stopped with an error");
                }
            })
        })
        .collect()
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ripple={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
