//! Client for the iTunes Connect web API: app analytics, reviews and beta testers.

pub mod analytics;
pub mod cli;
pub mod client;
pub mod error;
pub mod tester;
pub mod util;

pub use analytics::AnalyticsClient;
pub use client::{Config, HttpTunesClient, TunesClient};
pub use error::{RemoteError, TunesError};
pub use tester::{Tester, TesterKind, TesterRegistry};
