use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use intersection_sim::control::SimulationHandle;
use intersection_sim::simulation::{
    FollowingMode, Intersection, RedCountdown, SignalColor, SimConfig, DEFAULT_SPEED_MULTIPLIER,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RedCountdownArg {
    /// Red starts at 12s and holds at zero
    Fixed,
    /// Red counts down to the approach's next green
    Scheduled,
}

impl From<RedCountdownArg> for RedCountdown {
    fn from(arg: RedCountdownArg) -> Self {
        match arg {
            RedCountdownArg::Fixed => RedCountdown::Fixed,
            RedCountdownArg::Scheduled => RedCountdown::Scheduled,
        }
    }
}

#[derive(Parser)]
#[command(name = "intersection_sim")]
#[command(about = "Four-way signalized intersection simulation")]
struct Cli {
    /// Number of simulation ticks to run in headless mode
    #[arg(long, default_value = "1200")]
    ticks: u64,

    /// Logical time per tick in milliseconds
    #[arg(long, default_value = "50")]
    delta_ms: u64,

    /// Vehicle speed multiplier, 0.5 to 5.0 in steps of 0.5
    #[arg(long, default_value_t = DEFAULT_SPEED_MULTIPLIER)]
    speed: f32,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Night mode (cosmetic)
    #[arg(long)]
    night: bool,

    /// How red countdowns are displayed
    #[arg(long, value_enum, default_value = "scheduled")]
    red_countdown: RedCountdownArg,

    /// Compare following distance by approach only, ignoring lanes
    #[arg(long)]
    lane_blind: bool,

    /// Disable automatic vehicle spawning
    #[arg(long)]
    no_spawn: bool,

    /// Run on the background loop in real time for this many seconds
    #[arg(long)]
    realtime: Option<u64>,

    /// Print the summary and map every N ticks (default: once per simulated second)
    #[arg(long)]
    report_every: Option<u64>,
}

impl Cli {
    fn config(&self) -> SimConfig {
        SimConfig {
            speed_multiplier: self.speed,
            night_mode: self.night,
            tick_interval: Duration::from_millis(self.delta_ms),
            red_countdown: self.red_countdown.into(),
            following_mode: if self.lane_blind {
                FollowingMode::ApproachWide
            } else {
                FollowingMode::LaneAware
            },
            auto_spawn: !self.no_spawn,
            ..SimConfig::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,intersection_sim=info"),
    )
    .init();

    let cli = Cli::parse();
    let config = cli.config();

    let intersection = match cli.seed {
        Some(seed) => Intersection::with_seed(config, seed),
        None => Intersection::new(config),
    }
    .context("invalid simulation configuration")?;

    let intersection = match cli.realtime {
        Some(seconds) => run_realtime(intersection, seconds)?,
        None => {
            let report_every = cli
                .report_every
                .unwrap_or_else(|| u64::from(intersection.config().ticks_per_second()));
            run_headless(intersection, cli.ticks, report_every)
        }
    };

    log_final_stats(&intersection);
    Ok(())
}

/// Run the simulation in headless mode (no pacing, no threads)
fn run_headless(mut intersection: Intersection, ticks: u64, report_every: u64) -> Intersection {
    println!("Running intersection simulation in headless mode...");
    println!(
        "Ticks: {}, Delta: {}ms",
        ticks,
        intersection.config().tick_interval.as_millis()
    );
    println!();

    println!("Initial state:");
    intersection.print_summary();
    intersection.draw_map();
    println!();

    let report_every = report_every.max(1);
    let mut tick = 0;
    while tick < ticks {
        let ticks_to_run = report_every.min(ticks - tick);
        intersection.run(ticks_to_run);
        tick += ticks_to_run;

        println!(
            "--- After tick {} ({:.1}s simulated time) ---",
            tick,
            intersection.now().as_secs_f32()
        );
        intersection.print_summary();
        intersection.draw_map();
        println!();
    }

    println!("=== Final State ===");
    intersection.print_summary();
    intersection.draw_map();
    intersection
}

/// Drive the background loop at wall-clock pace
fn run_realtime(intersection: Intersection, seconds: u64) -> Result<Intersection> {
    info!("Running intersection simulation in real time for {}s", seconds);

    let mut handle = SimulationHandle::new(intersection);
    handle.start().context("failed to start simulation loop")?;

    for _ in 0..seconds {
        std::thread::sleep(Duration::from_secs(1));
        let snapshot = handle.snapshot();
        let green = snapshot
            .signals
            .iter()
            .find(|s| s.color != SignalColor::Red)
            .map(|s| format!("{} {} {}s", s.approach, s.color, s.remaining_seconds))
            .unwrap_or_else(|| "none".to_string());
        info!(
            "t={:.1}s vehicles={} active signal: {}",
            snapshot.time.as_secs_f32(),
            snapshot.vehicles.len(),
            green
        );
    }

    handle.stop();
    handle
        .into_intersection()
        .context("simulation loop did not stop cleanly")
}

fn log_final_stats(intersection: &Intersection) {
    let stats = intersection.stats();
    info!("Simulated time: {:.1}s", intersection.now().as_secs_f32());
    info!("Total vehicles spawned: {}", stats.spawned);
    info!("Total vehicles exited: {}", stats.exited);
    info!("Active vehicles: {}", intersection.agents().len());
    info!("Turns completed: {}", stats.turns_completed);
    info!("Peak population: {}", stats.peak_population);
    info!("Signal hand-offs: {}", stats.signal_hand_offs);
    info!("SIMULATION COMPLETE");
}
