mod commands;
mod deploy;
mod execute;
mod identity;
mod utils;

pub use commands::{Cli, Commands};
pub use deploy::handle_deploy;
pub use execute::{handle_demo, handle_execute};
pub use identity::handle_identity;
pub use utils::init_logging;
