use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fray_core::{Input, PeerId};
use fray_netplay::{
    LoopbackHub, LoopbackTransport, NetcodeConfig, NetcodeMode, NetcodeSession,
};

/// Netcode convergence simulator
#[derive(Parser, Debug)]
#[command(name = "fray-sim")]
#[command(
    about = "Runs N peers in-process over a loopback hub and checks they converge",
    long_about = None
)]
struct Args {
    /// Number of peers
    #[arg(short, long, default_value = "3")]
    peers: usize,

    /// Synchronization mode
    #[arg(short, long, value_enum, default_value_t = NetcodeMode::Rollback)]
    mode: NetcodeMode,

    /// Frames of scripted random input
    #[arg(short, long, default_value = "600")]
    frames: u64,

    /// Input-free frames afterwards, so late traffic settles
    #[arg(long, default_value = "120")]
    settle: u64,

    /// Seed for the scripted inputs
    #[arg(short, long, default_value = "7")]
    seed: u64,

    /// Spawn a projectile every this many frames per peer (0 disables
    /// firing and enables the strict whole-world comparison)
    #[arg(long, default_value = "0")]
    fire_every: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

/// Wall-clock milliseconds per simulated frame.
const FRAME_MS: u64 = 16;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    anyhow::ensure!(args.peers >= 2, "need at least two peers");

    let hub = LoopbackHub::new();
    let colors = [
        "#e74c3c", "#3498db", "#2ecc71", "#f1c40f", "#9b59b6", "#e67e22",
    ];
    let mut sessions: Vec<NetcodeSession<LoopbackTransport>> = (0..args.peers)
        .map(|i| {
            let id = PeerId::from(format!("peer-{i:02}"));
            let transport = hub.join(id.clone());
            NetcodeSession::new(
                id,
                colors[i % colors.len()],
                args.mode,
                NetcodeConfig {
                    roster_poll_frames: 0,
                    ..NetcodeConfig::default()
                },
                transport,
            )
        })
        .collect();
    let mut rngs: Vec<StdRng> = (0..args.peers)
        .map(|i| StdRng::seed_from_u64(args.seed.wrapping_add(i as u64)))
        .collect();

    info!(
        peers = args.peers,
        mode = %args.mode,
        frames = args.frames,
        settle = args.settle,
        "simulation started"
    );

    // Nonzero base clock so the first full-state push is adoptable.
    let mut now_ms: u64 = 1_000;
    for frame in 0..args.frames {
        for (i, session) in sessions.iter_mut().enumerate() {
            let input = random_input(&mut rngs[i]);
            session.tick(input, now_ms)?;
            if args.fire_every > 0 && frame % args.fire_every == 0 {
                let angle = rngs[i].random_range(0.0..std::f64::consts::TAU);
                session.spawn_projectile(angle, now_ms)?;
            }
        }
        reap_defeated(&hub, &sessions);
        now_ms += FRAME_MS;
    }
    for _ in 0..args.settle {
        for session in sessions.iter_mut() {
            session.tick(Input::NONE, now_ms)?;
        }
        reap_defeated(&hub, &sessions);
        now_ms += FRAME_MS;
    }

    for session in &sessions {
        let stats = session.stats();
        info!(
            peer = %session.local(),
            frame = session.current_frame(),
            players = session.world().players.len(),
            projectiles = session.world().projectiles.len(),
            rollbacks = stats.rollbacks,
            resimulated = stats.frames_resimulated,
            stale = stats.stale_inputs,
            deferred = stats.deferred_packets,
            stopped = session.is_stopped(),
            "peer summary"
        );
    }

    let strict = args.fire_every == 0 && args.mode == NetcodeMode::Rollback;
    check_convergence(&sessions, strict)?;
    info!("all peers converged");
    Ok(())
}

fn random_input(rng: &mut StdRng) -> Input {
    Input::new(
        rng.random_bool(0.3),
        rng.random_bool(0.3),
        rng.random_bool(0.3),
        rng.random_bool(0.3),
    )
}

/// Unregisters defeated peers from the hub, as an embedder would close a
/// dead connection. Left registered, the survivors' roster polls would
/// re-admit the dead id as a fresh joiner.
fn reap_defeated(hub: &LoopbackHub, sessions: &[NetcodeSession<LoopbackTransport>]) {
    for session in sessions {
        if session.is_stopped() && hub.contains(session.local()) {
            info!(peer = %session.local(), "dropping defeated peer from the mesh");
            hub.drop_peer(session.local());
        }
    }
}

/// Compares the worlds of every still-running session against the first
/// one. Strict mode requires bit-identical worlds; otherwise the players
/// present on both sides must agree on position and radius.
fn check_convergence(
    sessions: &[NetcodeSession<LoopbackTransport>],
    strict: bool,
) -> anyhow::Result<()> {
    let running: Vec<&NetcodeSession<LoopbackTransport>> =
        sessions.iter().filter(|s| !s.is_stopped()).collect();
    let Some((reference, rest)) = running.split_first() else {
        info!("every peer was defeated; nothing to compare");
        return Ok(());
    };
    if rest.is_empty() {
        info!(peer = %reference.local(), "only one peer still standing");
        return Ok(());
    }

    for session in rest {
        if strict {
            anyhow::ensure!(
                session.world().digest() == reference.world().digest(),
                "world of {} diverged from {}",
                session.local(),
                reference.local()
            );
            continue;
        }
        for (id, player) in &reference.world().players {
            let Some(other) = session.world().players.get(id) else {
                continue;
            };
            anyhow::ensure!(
                player.x == other.x && player.y == other.y && player.radius == other.radius,
                "{} sees {} at ({}, {}) r{}, {} sees ({}, {}) r{}",
                reference.local(),
                id,
                player.x,
                player.y,
                player.radius,
                session.local(),
                other.x,
                other.y,
                other.radius
            );
        }
    }
    Ok(())
}
