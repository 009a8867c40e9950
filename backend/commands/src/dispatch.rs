/// Command dispatch: policy checks, then route to the handler.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chanlogs_channels::Privilege;
use chanlogs_core::is_channel;
use tracing::{debug, info};

use crate::detection::detect_command;
use crate::registry::CommandRegistry;
use crate::types::CommandInvocation;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Context passed to every command handler.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Where the command was said: a channel, or the invoker's nick in a PM.
    pub channel: String,
    pub sender: String,
    /// The invoker's privilege in `channel`.
    pub privilege: Privilege,
}

impl CommandContext {
    pub fn in_channel(&self) -> bool {
        is_channel(&self.channel)
    }
}

/// Text reply to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub text: String,
    /// Send to the invoker only (NOTICE) rather than the channel.
    pub private: bool,
}

impl CommandResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into(), private: false }
    }

    pub fn private(text: impl Into<String>) -> Self {
        Self { text: text.into(), private: true }
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse>;
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct CommandDispatcher {
    registry: CommandRegistry,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
    prefix: String,
    enabled: bool,
}

impl CommandDispatcher {
    /// `enabled` mirrors `allow_toggle`: when false every command is refused.
    pub fn new(prefix: impl Into<String>, enabled: bool) -> Self {
        Self {
            registry: CommandRegistry::new(),
            handlers: HashMap::new(),
            prefix: prefix.into(),
            enabled,
        }
    }

    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    /// Detect and run a command in `text`. `Ok(None)` for ordinary messages.
    pub async fn handle_text(
        &self,
        ctx: &CommandContext,
        text: &str,
    ) -> Result<Option<CommandResponse>> {
        match detect_command(text, &self.prefix, &self.registry) {
            Some(inv) => self.dispatch(ctx, &inv).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn dispatch(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse> {
        if let Some(refusal) = self.refusal(ctx, inv) {
            debug!(
                "[Commands] Refused {} from {} in {}: {}",
                inv.key, ctx.sender, ctx.channel, refusal
            );
            return Ok(CommandResponse::private(refusal));
        }
        if let Some(handler) = self.handlers.get(&inv.key) {
            info!("[Commands] Dispatching {} from {} in {}", inv.key, ctx.sender, ctx.channel);
            handler.handle(ctx, inv).await
        } else {
            Ok(CommandResponse::private(format!("No handler registered for command {}", inv.key)))
        }
    }

    fn refusal(&self, ctx: &CommandContext, inv: &CommandInvocation) -> Option<String> {
        if !self.enabled {
            return Some("Logging toggles are disabled on this bot.".into());
        }
        let def = self.registry.find_by_key(&inv.key)?;
        if !ctx.in_channel() {
            return Some(format!("{}{} only works in a channel.", self.prefix, def.primary_alias()));
        }
        if ctx.privilege < def.min_privilege {
            return Some(format!(
                "You need channel operator status to use {}{}.",
                self.prefix,
                def.primary_alias()
            ));
        }
        None
    }
}
