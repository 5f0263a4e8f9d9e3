#[macro_use]
extern crate log;

use drone_flight::copter::{AbortSignal, Copter};
use drone_flight::hal::TimedTransport;
use drone_flight::sim::{SimConfig, SimVehicle};
use drone_flight::{FlightConfig, FlightError};
use env_logger::Env;
use std::time::Duration;
use tokio::runtime::Handle;

fn load_config(matches: &clap::ArgMatches) -> Result<(FlightConfig, SimConfig), String> {
    let config = match matches.value_of("config") {
        Some(path) => FlightConfig::load(path).map_err(|e| format!("{}: {}", path, e))?,
        None => FlightConfig::default(),
    };

    let mut sim = SimConfig {
        accel_scale: config.sensor_scale.accel,
        flow_scale: config.sensor_scale.flow,
        realtime: true,
        ..Default::default()
    };
    if let Some(every) = matches.value_of("height-dropout") {
        let every = every.parse::<u32>().map_err(|_| "Height dropout not a number".to_owned())?;
        sim.height_dropout = Some(every);
    }
    Ok((config, sim))
}

fn fly(config: FlightConfig, sim: SimConfig, abort: AbortSignal) -> Result<(), FlightError> {
    let vehicle = SimVehicle::new(sim);
    let timeout = Duration::from_millis(config.timing.transport_timeout_ms.into());
    let transport = TimedTransport::new(vehicle.clone(), timeout, Handle::current());

    let mut copter = Copter::builder(vehicle.clone(), transport)
        .config(config)
        .abort(abort)
        .open()?;
    copter.initialize();
    let report = copter.fly_configured_plan();
    copter.close();

    let report = report?;
    for stage in &report.stages {
        info!("{}", stage);
    }
    let snapshot = vehicle.snapshot();
    info!(
        "finished at x {:.1}cm y {:.1}cm after {} takeoff(s), {} landing command(s)",
        snapshot.position.x, snapshot.position.y, snapshot.takeoffs, snapshot.landings
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let matches = clap::App::new("flight-sim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fly a stage plan against the simulated vehicle")
        .arg(clap::Arg::with_name("config").long("config").help("Config file").takes_value(true))
        .arg(
            clap::Arg::with_name("height-dropout")
                .long("height-dropout")
                .help("Fail every n-th height reading")
                .takes_value(true),
        )
        .get_matches();

    let (config, sim) = match load_config(&matches) {
        Ok(loaded) => loaded,
        Err(error) => {
            error!("{}", error);
            std::process::exit(2);
        }
    };

    let abort = AbortSignal::new();
    let interrupt = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, landing");
            interrupt.raise();
        }
    });

    match tokio::task::spawn_blocking(move || fly(config, sim, abort)).await {
        Ok(Ok(())) => info!("flight complete"),
        Ok(Err(error)) => {
            error!("flight failed: {}", error);
            std::process::exit(1);
        }
        Err(error) => {
            error!("flight task failed: {}", error);
            std::process::exit(1);
        }
    }
}
