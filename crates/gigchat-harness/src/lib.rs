//! Deterministic simulation harness for gigchat testing.
//!
//! In-process implementations of the Environment, Driver, and Connector
//! traits. Combined with paused tokio time, the production
//! [`gigchat_app::Runtime`] and [`gigchat_app::ConnectionManager`] run
//! unmodified against a simulated broker.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_broker;
pub mod sim_driver;
pub mod sim_env;

pub use sim_broker::SimBroker;
pub use sim_driver::{SimConnector, SimDriver, SimDriverError};
pub use sim_env::SimEnv;
