//! tidbctl controller library
//!
//! Member health probing and PD client resolution for TiDB clusters, for use
//! by reconcilers and the `tidbctl` binary.

pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod pd;
pub mod shutdown;

pub use config::ControllerConfig;
pub use error::{ControlError, ControlResult};
pub use health::{DefaultTidbControl, FakeTidbControl, TidbControl};
pub use pd::{get_pd_client, DefaultPdControl, FakePdControl, PdControl};
pub use shutdown::{Shutdown, ShutdownSignal};
