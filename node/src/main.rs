// Copyright(C) Facebook, Inc. and its affiliates.
use anyhow::{anyhow, Context, Result};
use clap::{crate_name, crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use config::{Committee, Parameters};
use env_logger::Env;
use futures::future::join_all;
use log::{error, info};
use model::file_io::{Export, Import};
use model::types_and_const::{PeerId, ROOT};
use transpose::{local_mesh, Communicator, Report, TransposeError};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = App::new(crate_name!())
        .version(crate_version!())
        .about("A distributed matrix transpose benchmark.")
        .args_from_usage("-v... 'Sets the level of verbosity'")
        .subcommand(
            SubCommand::with_name("generate_committee")
                .about("Print a committee of local peers to file")
                .args_from_usage("--peers=<INT> 'The number of peers'")
                .args_from_usage("--base-port=<PORT> 'The port of peer 0; the others follow'")
                .args_from_usage("--filename=<FILE> 'The file where to print the committee'"),
        )
        .subcommand(
            benchmark_args(
                SubCommand::with_name("run")
                    .about("Run a single peer")
                    .args_from_usage("--peer=<INT> 'The id of this peer in the committee'")
                    .args_from_usage(
                        "--committee=<FILE> 'The file containing committee information'",
                    ),
            ),
        )
        .subcommand(benchmark_args(
            SubCommand::with_name("local")
                .about("Run all peers in this process")
                .args_from_usage("--peers=<INT> 'The number of peers'"),
        ))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .get_matches();

    let log_level = match matches.occurrences_of("v") {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or(log_level));
    logger.format_timestamp_millis();
    logger.init();

    match matches.subcommand() {
        ("generate_committee", Some(sub_matches)) => {
            let peers = parse_arg::<usize>(sub_matches, "peers")?;
            let base_port = parse_arg::<u16>(sub_matches, "base-port")?;
            let filename = sub_matches
                .value_of("filename")
                .context("Missing committee file")?;
            Committee::local(peers, base_port)?
                .export(filename)
                .context("Failed to generate the committee")?
        }
        ("run", Some(sub_matches)) => run(sub_matches).await?,
        ("local", Some(sub_matches)) => local(sub_matches).await?,
        _ => unreachable!(),
    }
    Ok(())
}

/// Arguments shared by the subcommands running the benchmark.
fn benchmark_args<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.args_from_usage("--parameters=[FILE] 'The file containing the run parameters'")
        .arg(Arg::from_usage("<threads> 'The number of threads per peer'"))
        .arg(Arg::from_usage("<iterations> 'The number of timed iterations'"))
        .arg(Arg::from_usage("<order> 'The order of the matrix'"))
        .arg(Arg::from_usage("[tile] 'The tile size (0 disables tiling)'"))
}

fn parse_arg<T>(matches: &ArgMatches<'_>, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .value_of(name)
        .with_context(|| format!("Missing argument <{}>", name))?
        .parse::<T>()
        .with_context(|| format!("Argument <{}> must be a non-negative integer", name))
}

/// Reads the parameters file, if any, and applies the positional arguments on top of it.
fn load_parameters(matches: &ArgMatches<'_>) -> Result<Parameters> {
    let mut parameters = match matches.value_of("parameters") {
        Some(filename) => {
            Parameters::import(filename).context("Failed to load the run parameters")?
        }
        None => Parameters::default(),
    };
    parameters.threads = parse_arg(matches, "threads")?;
    parameters.iterations = parse_arg(matches, "iterations")?;
    parameters.order = parse_arg(matches, "order")?;
    if matches.is_present("tile") {
        parameters.tile_order = parse_arg(matches, "tile")?;
    }
    Ok(parameters)
}

/// Prints the report of the root, including the one of a run that did not validate.
fn conclude(me: PeerId, result: Result<Option<Report>, TransposeError>) -> Result<()> {
    match result {
        Ok(Some(report)) => {
            println!("{}", report);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(TransposeError::Validation {
            report: Some(report),
        }) => {
            println!("{}", report);
            Err(anyhow!("Solution does not validate"))
        }
        Err(e) => Err(e).with_context(|| format!("Peer {} failed", me)),
    }
}

// Runs a single peer of a committee over TCP.
async fn run(matches: &ArgMatches<'_>) -> Result<()> {
    let me = parse_arg::<PeerId>(matches, "peer")?;
    let committee_file = matches
        .value_of("committee")
        .context("Missing committee file")?;
    let committee =
        Committee::import(committee_file).context("Failed to load the committee information")?;
    let parameters = load_parameters(matches)?;

    let mut address = committee.address(me)?;
    address.set_ip("0.0.0.0".parse()?);
    let mut comm = Communicator::connect(me, &committee, address)
        .await
        .context("Failed to start the peer")?;
    info!("Peer {} successfully booted", me);

    let result = transpose::run(&mut comm, parameters).await;
    conclude(me, result)
}

// Runs every peer as a task of this process.
async fn local(matches: &ArgMatches<'_>) -> Result<()> {
    let peers = parse_arg::<usize>(matches, "peers")?;
    if peers == 0 {
        return Err(anyhow!("At least one peer is required"));
    }
    let parameters = load_parameters(matches)?;

    let handles = local_mesh(peers).into_iter().map(|mut comm| {
        let parameters = parameters.clone();
        tokio::spawn(async move { transpose::run(&mut comm, parameters).await })
    });

    let mut outcome = Ok(());
    for (me, result) in join_all(handles).await.into_iter().enumerate() {
        let result = result.context("Peer task panicked")?;
        if me == ROOT {
            outcome = conclude(me, result);
        } else if let Err(e) = result {
            error!("Peer {} failed: {}", me, e);
        }
    }
    outcome
}
