mod cli;
mod executor;

use std::{
    fs,
    io::{self, Read},
    path::Path,
    process::ExitCode,
    time::Duration,
};

use clap::Parser;
use env_logger::Builder;
use log::{error, info, trace, warn};
use serde_json::json;
use tokio::{sync::watch, task};

use designate_acme_solver::{
    challenge::{ChallengeAction, ChallengeRequest},
    provider::DesignateFactory,
    solver::{DesignateSolver, Solver, StopSignal},
};

use cli::{ChallengeArgs, Cli, Command};
use executor::Executor;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    Builder::new().filter_level(cli.loglevel.into()).init();

    if cli.group_name.trim().is_empty() {
        error!("GROUP_NAME must be specified");
        return ExitCode::FAILURE;
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, stopping");
            let _ = stop_tx.send(true);
        }
    });

    trace!("Starting worker thread");
    // The blocking HTTP client must not be created or dropped on the async runtime
    let r = task::spawn_blocking(move || run_job(cli, stop_rx)).await;
    match r {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(())) => {
            error!("Challenge completed with errors");
            ExitCode::FAILURE
        }
        Err(_) => {
            error!("Task panicked, aborting...");
            ExitCode::FAILURE
        }
    }
}

fn run_job(cli: Cli, stop: StopSignal) -> Result<(), ()> {
    let request = match read_request(&cli.command) {
        Ok(r) => r,
        Err(e) => {
            error!("Unable to read challenge request: {}", e);
            return Err(());
        }
    };
    let client_config = match cli
        .openstack
        .client_config(Duration::from_secs(cli.timeout))
    {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid OpenStack configuration: {}", e);
            return Err(());
        }
    };

    let solver = DesignateSolver::new(Box::new(DesignateFactory));
    if let Err(e) = solver.initialize(&client_config, stop) {
        error!("Unable to initialize solver: {}", e);
        return Err(());
    }
    info!(
        "Solver {} ready for group {}",
        solver.name(),
        cli.group_name
    );

    let executor = Executor::new(&solver);
    let result = match &cli.command {
        Command::Present(_) => executor.run(ChallengeAction::Present, &request),
        Command::CleanUp(_) => executor.run(ChallengeAction::CleanUp, &request),
        Command::Handle { .. } => executor.handle(&request).map(|_| ()),
    };

    match result {
        Ok(_) => Ok(()),
        Err(executor::ExecutorError::Solver(e)) => {
            error!(
                "{} (retryable: {})",
                e,
                if e.is_retryable() { "yes" } else { "no" }
            );
            Err(())
        }
        Err(e) => {
            error!("{}", e);
            Err(())
        }
    }
}

fn read_request(command: &Command) -> Result<ChallengeRequest, String> {
    match command {
        Command::Present(args) => Ok(request_from_args(args, ChallengeAction::Present)),
        Command::CleanUp(args) => Ok(request_from_args(args, ChallengeAction::CleanUp)),
        Command::Handle { request } => {
            let raw = if request == Path::new("-") {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(|e| e.to_string())?;
                buf
            } else {
                fs::read_to_string(request)
                    .map_err(|e| format!("{}: {}", request.display(), e))?
            };
            serde_json::from_str(&raw).map_err(|e| e.to_string())
        }
    }
}

fn request_from_args(args: &ChallengeArgs, action: ChallengeAction) -> ChallengeRequest {
    ChallengeRequest {
        action: Some(action),
        dns_name: args.dns_name.to_owned(),
        resolved_fqdn: args.resolved_fqdn.to_owned(),
        key: args.key.to_owned(),
        config: Some(json!({ "zone_id": args.zone_id })),
        ..Default::default()
    }
}
