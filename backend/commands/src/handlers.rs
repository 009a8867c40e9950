/// Built-in command handlers: start, stop and status for the invoking channel.
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chanlogs_core::ToggleStore;
use tracing::info;

use crate::dispatch::{CommandContext, CommandHandler, CommandResponse};
use crate::types::CommandInvocation;

// ---------------------------------------------------------------------------
// start / stop
// ---------------------------------------------------------------------------

pub struct ToggleHandler {
    pub toggles: Arc<dyn ToggleStore>,
    pub enable: bool,
}

#[async_trait]
impl CommandHandler for ToggleHandler {
    async fn handle(
        &self,
        ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse> {
        self.toggles.set_logging_enabled(&ctx.channel, self.enable)?;
        info!(
            channel = %ctx.channel,
            by = %ctx.sender,
            enabled = self.enable,
            "[Commands] Logging toggled"
        );
        let verb = if self.enable { "started" } else { "stopped" };
        Ok(CommandResponse::ok(format!("Logging {verb} for {}.", ctx.channel)))
    }
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

pub struct StatusHandler {
    pub toggles: Arc<dyn ToggleStore>,
}

#[async_trait]
impl CommandHandler for StatusHandler {
    async fn handle(
        &self,
        ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse> {
        let enabled = self.toggles.is_logging_enabled(&ctx.channel);
        let state = if enabled { "enabled" } else { "disabled" };
        Ok(CommandResponse::ok(format!("Logging is {state} for {}.", ctx.channel)))
    }
}
