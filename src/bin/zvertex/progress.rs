/// Progress bar and statistics for the `sim` subcommand
pub (super) struct Progress(Mutex<Inner>);

struct Inner {
    n_events: u64,
    n_primaries: u64,
    n_interactions: u64,
    bar: ProgressBar,
}

impl Progress {

    pub (super) fn new(n_events: u64) -> Self {
        let bar = ProgressBar::new(n_events);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("Simulating events\n[{elapsed_precise}] {wide_bar} {pos}/{len} ({eta_precise})")
        {
            bar.set_style(style);
        }
        bar.tick();
        Self(Mutex::new(Inner { n_events: 0, n_primaries: 0, n_interactions: 0, bar }))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub (super) fn event_done(&self, event: &Event) {
        let mut data = self.lock();
        data.n_events += 1;
        data.n_primaries += event.multiplicity() as u64;
        data.n_interactions += event.hits.len() as u64;
        data.bar.inc(1);
    }

    pub (super) fn final_report(&self) {
        let data = self.lock();
        data.bar.finish_and_clear();
        info!("Simulated {} events with {} primaries and {} interactions",
              group_digits(data.n_events), group_digits(data.n_primaries), group_digits(data.n_interactions));
    }
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::sync::{Mutex, MutexGuard, PoisonError};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use zvertex::{track::Event, utils::group_digits};
