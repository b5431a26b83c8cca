pub mod clock;
pub mod config;
pub mod elapsed;
pub mod error;
pub mod logging;
pub mod poller;
pub mod source;
pub mod status;
pub mod store;
pub mod tracker;
pub mod views;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, load_config_from_str, TrackerConfig};
pub use elapsed::{ElapsedLabel, ElapsedTimeTracker, JobKey};
pub use error::{ConfigError, Result, TrackerError};
pub use poller::{PollSession, PollTarget, Poller};
pub use source::{
    ActionOutcome, ActionParams, Collection, HttpStatusSource, RawStatus, StatusSource,
};
pub use status::{normalize, Job, JobKind, JobStatus, ReadinessTier};
pub use store::{Action, Entity, EntityKind, SharedStore, StoreChange, StoreEvent};
pub use tracker::JobTracker;
pub use views::Stats;
