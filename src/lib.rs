//! mf-notify: reminds packagers about MonkeyFarm builds that have stayed in
//! the testing tag longer than a given number of days.
//!
//! The run is one linear pass: resolve the connection profile, authenticate
//! against the hub, filter tagged builds by age, group them by packager and
//! send each packager a single summary email.

pub mod cli;
pub mod contract;
pub mod error;
pub mod filter;
pub mod grouping;
pub mod hub;
pub mod load_config;
pub mod mailer;
pub mod notify;
pub mod pipeline;

pub use cli::{run, Cli};
pub use error::NotifyError;
