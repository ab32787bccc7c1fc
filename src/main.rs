use anyhow::Context;
use clap::Parser;

use serv::cli::Cli;
use serv::server::{self, AccessLogOptions, ServeOptions};
use serv::{logger, Config, StaticHandler};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load_from(&cli.config).context("failed to load configuration")?;
    cli.apply(&mut cfg);

    logger::init(&cfg.logging)?;

    // Build the Tokio runtime, sizing the worker pool from configuration
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder
        .build()
        .context("failed to build the Tokio runtime")?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> anyhow::Result<()> {
    let addr = cfg.get_socket_addr()?;
    let server_config = cfg.server_config()?;

    let tls = if cfg.tls.secure {
        Some(server::tls::build_acceptor(&cfg.tls)?)
    } else {
        None
    };

    let listener =
        server::create_listener(addr).with_context(|| format!("failed to bind {addr}"))?;
    let local_addr = listener.local_addr()?;

    logger::log_server_start(&local_addr, &cfg, &server_config.root);

    let options = ServeOptions {
        http2: cfg.tls.http2,
        tls,
        access_log: AccessLogOptions {
            enabled: cfg.logging.access_log,
            format: cfg.logging.access_log_format.clone(),
        },
    };

    let shutdown = async {
        let signal = server::shutdown_signal().await;
        logger::log_shutdown_requested(signal);
    };

    server::run(listener, StaticHandler::new(server_config), options, shutdown).await?;
    Ok(())
}
