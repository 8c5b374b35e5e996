use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

mod classifier;
mod crop;
mod error;
mod model;
mod registry;

pub use classifier::{softmax, top_class, Classifier, Prediction};
pub use crop::Crop;
pub use error::{Error, Result};
pub use model::{Model, SavedModel};
pub use registry::Registry;

/// Measures one stage of request handling and logs how long it took.
pub struct Timer {
    name: String,
    tstamp: Option<DateTime<Utc>>,
    duration: Option<Duration>,
}

impl Timer {
    /// Create a new timer
    pub fn new(name: &str) -> Self {
        Timer {
            name: name.to_owned(),
            tstamp: None,
            duration: None,
        }
    }

    pub fn new_start(name: &str) -> Self {
        let mut t = Timer::new(name);
        t.start();
        t
    }

    /// Start the timer
    pub fn start(&mut self) {
        info!("{}: starting", self.name);

        self.tstamp = Some(Utc::now());
        self.duration = None;
    }

    /// Stop the timer and return the elapsed milliseconds
    pub fn stop(&mut self) -> i64 {
        match self.tstamp.take() {
            None => debug!("{}: not running!", self.name),
            Some(tstamp) => {
                let d = Utc::now() - tstamp;

                self.duration = Some(d);
                info!("{} took {} msec", self.name, d.num_milliseconds());
            }
        }

        self.duration()
    }

    /// Get duration in milliseconds
    pub fn duration(&self) -> i64 {
        self.duration.map_or(0, |d| d.num_milliseconds())
    }
}
