mod cli;
mod progress;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Cli::parse();
    match args.command {
        Command::Sim { config, out, persist, parallel, threads } => simulate(config, &out, persist, parallel, threads),
        Command::Rec { config, input, out, threads }             => reconstruct(config, &input, &out, threads),
        Command::Ana { config, input, reco, out }                => analyse(config, &input, &reco, out),
    }
}

fn simulate(config: Option<PathBuf>, out: &Path, persist: bool, parallel: bool, threads: usize) -> Result<(), Box<dyn Error>> {
    let config = load_config(config)?;
    let mut settings = RunSettings::from(&config.run);
    settings.persist  |= persist;
    settings.parallel |= parallel;
    let simulator = Simulator::from_config(&config)?;

    // Fail before the potentially long simulation if the output can't be written
    ensure_parent_exists(out)?;
    let mut sink = HitWriter::create(out)?;
    info!("Writing hits to {}", out.display());

    let progress = Progress::new(settings.events);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let events = pool.install(|| simulator.run(&settings, &mut sink, |event| progress.event_done(event)))?;
    sink.finish()?;
    progress.final_report();

    if settings.persist {
        let tracks = events.iter().flat_map(|e| &e.tracks);
        let escaped = tracks.clone().filter(|t| t.no_stop).count();
        let passive = events.iter().flat_map(|e| &e.hits).filter(|h| !h.sensitive).count();
        info!("Kept {} events: {} track segments ({} escaped), {} passive interactions",
              group_digits(events.len()), group_digits(tracks.count()), group_digits(escaped), group_digits(passive));
    }
    Ok(())
}

fn reconstruct(config: Option<PathBuf>, input: &Path, out: &Path, threads: usize) -> Result<(), Box<dyn Error>> {
    let config = load_config(config)?;
    ensure_parent_exists(out)?;
    let mut timer = Timer::new();

    timer.start(format!("Reading hits from {}", input.display()));
    let events = hits_by_event(&read_records(input)?);
    timer.done();

    let calibration = Calibrator::from_config(&config.reconstruction).calibrate(&events);
    let reconstructor = Reconstructor {
        window: RunningWindow::from_config(&config.reconstruction),
        tolerance: calibration.tolerance,
    };

    timer.start(format!("Reconstructing {} events", group_digits(events.len())));
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let vertices = pool.install(|| reconstructor.reconstruct(&events, threads > 1));
    timer.done();

    let records = vertices.into_iter().map(Record::from).collect_vec();
    write_records(out, &records)?;
    info!("Wrote {} vertices to {}", group_digits(records.len()), out.display());
    Ok(())
}

fn analyse(config: Option<PathBuf>, input: &Path, reco: &Path, out: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let config = load_config(config)?;
    let primaries = primary_vertices(&read_records(input)?);
    let vertices = reconstructed_vertices(&read_records(reco)?);
    let report = analysis::analyse(&primaries, &vertices, &config.analysis);
    println!("{report}");
    if let Some(out) = out {
        ensure_parent_exists(&out)?;
        std::fs::write(&out, report.to_string())?;
        info!("Report written to {}", out.display());
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> zvertex::Result<Config> {
    match path {
        Some(path) => read_config_file(&path),
        None => {
            info!("No configuration file given: using defaults");
            Ok(Config::default())
        }
    }
}

fn ensure_parent_exists(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::error::Error;
use std::path::{Path, PathBuf};
use clap::Parser;
use env_logger::Env;
use itertools::Itertools;
use log::info;
use zvertex::{
    analysis,
    calibration::Calibrator,
    config::{read_config_file, Config},
    reconstruction::{Reconstructor, RunningWindow},
    simulation::{RunSettings, Simulator},
    store::{hits_by_event, primary_vertices, read_records, reconstructed_vertices, write_records, HitWriter, Record},
    utils::{group_digits, timing::Progress as Timer},
};
use cli::{Cli, Command};
use progress::Progress;
