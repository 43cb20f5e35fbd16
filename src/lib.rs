pub mod app;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod stages;
pub mod status;
pub mod tags;

pub use app::run;
