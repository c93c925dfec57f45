use std::sync::Arc;

use resploot_channels::ChannelResetter;
use resploot_scheduler::ResetService;

/// Shared state handed to the event handler and slash commands.
pub struct BotContext {
    pub service: Arc<ResetService>,
    /// Direct access for `/resploot-clear`, which resets the invoking channel
    /// without touching the schedule ledger.
    pub resetter: Arc<ChannelResetter>,
}
