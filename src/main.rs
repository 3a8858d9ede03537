use std::{
    env,
    net::{SocketAddr, TcpListener},
    num::NonZeroUsize,
    path::PathBuf,
    process::{Child, Command},
};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use log::{debug, info};
use parmorph::{
    MorphConfig, TcpCommunicator, codec,
    morph::{self, DEFAULT_ALPHA},
    morph_distributed, morph_sequential,
};

const ENV_RANK: &str = "PARMORPH_RANK";
const ENV_WORLD_SIZE: &str = "PARMORPH_WORLD_SIZE";
const ENV_ADDR: &str = "PARMORPH_ADDR";

const DEFAULT_OUTPUT_PATH: &str = "./morphed.png";

#[derive(Parser)]
#[command(name = "parmorph")]
#[command(version, about = "Blend two images with a weighted per-pixel average, \
                            computed across cooperating worker processes")]
struct Cli {
    /// First source image
    image1: PathBuf,

    /// Second source image
    image2: PathBuf,

    /// Output path; format follows the extension
    #[arg(default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Weight of the first image, in [0.0, 1.0]
    #[arg(short, long, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,

    /// Number of worker processes to blend across
    #[arg(short, long, default_value = "1")]
    workers: NonZeroUsize,
}

fn main() {
    // Keep the handle alive for the lifetime of the process.
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")
        .and_then(flexi_logger::Logger::start)
        .ok();

    let result = match worker_identity() {
        Some(identity) => run_as_worker(identity),
        None => run_as_coordinator(&Cli::parse()),
    };

    if let Err(e) = result {
        // Diagnostic goes to standard output, then a non-zero exit.
        println!("Error: {e:#}");
        std::process::exit(1);
    }
}

struct WorkerIdentity {
    rank: usize,
    world_size: NonZeroUsize,
    addr: SocketAddr,
}

/// A process launched with the three PARMORPH_* variables set is a worker;
/// everything else is the coordinator and owns the CLI surface.
fn worker_identity() -> Option<WorkerIdentity> {
    let rank = env::var(ENV_RANK).ok()?;
    let world_size = env::var(ENV_WORLD_SIZE).ok()?;
    let addr = env::var(ENV_ADDR).ok()?;
    Some(WorkerIdentity {
        rank: rank.parse().ok()?,
        world_size: world_size.parse().ok()?,
        addr: addr.parse().ok()?,
    })
}

fn run_as_worker(identity: WorkerIdentity) -> Result<()> {
    debug!(
        "worker rank {} of {} starting",
        identity.rank, identity.world_size
    );
    let mut comm = TcpCommunicator::worker(identity.addr, identity.rank, identity.world_size)
        .context("joining the worker group")?;
    morph::run_worker(&mut comm, &MorphConfig::default()).context("morphing images")?;
    Ok(())
}

fn run_as_coordinator(cli: &Cli) -> Result<()> {
    let config = MorphConfig::new(cli.alpha).context("morphing images")?;

    let (img1, img2) =
        codec::load_resized(&cli.image1, &cli.image2).context("loading/resizing images")?;
    info!(
        "blending {} and {} at alpha {} across {} worker(s)",
        cli.image1.display(),
        cli.image2.display(),
        cli.alpha,
        cli.workers
    );

    let result = if cli.workers.get() == 1 {
        morph_sequential(&img1, &img2, cli.alpha).context("morphing images")?
    } else {
        // The communicator is acquired once here and passed down; workers
        // are reaped after the result is gathered.
        let listener = TcpListener::bind("127.0.0.1:0").context("binding worker listener")?;
        let addr = listener.local_addr().context("binding worker listener")?;
        let children = spawn_workers(cli.workers, addr).context("launching workers")?;

        let mut comm = TcpCommunicator::coordinator(&listener, cli.workers)
            .context("forming the worker group")?;
        let result = morph_distributed(&mut comm, &config, Some(&img1), Some(&img2))
            .context("morphing images")?;
        drop(comm);
        reap_workers(children)?;

        result.context("coordinator finished without a result image")?
    };

    codec::save_image(&result, &cli.output).context("saving morphed image")?;
    Ok(())
}

fn spawn_workers(world_size: NonZeroUsize, addr: SocketAddr) -> Result<Vec<Child>> {
    let exe = env::current_exe().context("locating own executable")?;
    (1..world_size.get())
        .map(|rank| {
            Command::new(&exe)
                .env(ENV_RANK, rank.to_string())
                .env(ENV_WORLD_SIZE, world_size.to_string())
                .env(ENV_ADDR, addr.to_string())
                .spawn()
                .with_context(|| format!("spawning worker rank {rank}"))
        })
        .collect()
}

fn reap_workers(children: Vec<Child>) -> Result<()> {
    for (rank, mut child) in (1..).zip(children) {
        let status = child
            .wait()
            .with_context(|| format!("waiting for worker rank {rank}"))?;
        ensure!(status.success(), "worker rank {rank} exited with {status}");
    }
    Ok(())
}
