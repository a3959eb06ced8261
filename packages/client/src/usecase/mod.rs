pub mod controller;
pub mod log_feed;
pub mod recorder;
pub mod settings;
pub mod synchronizer;

pub use controller::{CompletionPolicy, Phase, SessionController, SessionSnapshot};
pub use log_feed::LogFeed;
pub use recorder::{RecordOutcome, Recorder, SkipReason};
pub use settings::SettingsPropagator;
pub use synchronizer::{DocumentFeed, SyncContext, SyncEvent, SyncOutcome, Synchronizer};
