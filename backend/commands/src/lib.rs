pub mod detection;
pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod types;

pub use detection::detect_command;
pub use dispatch::{CommandContext, CommandDispatcher, CommandHandler, CommandResponse};
pub use handlers::{StatusHandler, ToggleHandler};
pub use registry::{builtin_commands, CommandRegistry};
pub use types::{CommandDef, CommandInvocation};

use std::sync::Arc;

use chanlogs_core::ToggleStore;

/// Build a dispatcher pre-wired with all built-in handlers.
pub fn build_default_dispatcher(
    toggles: Arc<dyn ToggleStore>,
    prefix: impl Into<String>,
    allow_toggle: bool,
) -> CommandDispatcher {
    let mut dispatcher = CommandDispatcher::new(prefix, allow_toggle);
    let toggle = |enable| Arc::new(ToggleHandler { toggles: toggles.clone(), enable });
    dispatcher.register("start", toggle(true));
    dispatcher.register("stop", toggle(false));
    dispatcher.register("status", Arc::new(StatusHandler { toggles }));
    dispatcher
}
