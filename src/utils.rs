/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}


pub mod timing {

    use super::group_digits;
    use log::info;
    use std::time::{Duration, Instant};

    /// Logs how long each phase of a run takes
    pub struct Progress {
        phase: String,
        previous: Instant,
    }

    impl Progress {

        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self { phase: String::new(), previous: Instant::now() } }

        /// Announce `phase` and start its timer
        pub fn start(&mut self, phase: impl Into<String>) {
            self.phase = phase.into();
            info!("{} ...", self.phase);
            self.previous = Instant::now();
        }

        /// Report the time elapsed since the current phase started
        pub fn done(&mut self) -> Duration {
            let elapsed = self.previous.elapsed();
            info!("{}: done in {} ms", self.phase, group_digits(elapsed.as_millis()));
            self.previous = Instant::now();
            elapsed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(        7_u64, "7"        )]
    #[case(     1234_u64, "1,234"    )]
    #[case(  1000000_u64, "1,000,000")]
    fn digits_are_grouped(#[case] n: u64, #[case] expected: &str) {
        assert_eq!(group_digits(n), expected);
    }
}
