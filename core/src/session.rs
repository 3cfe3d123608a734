use crate::client::ChatBackend;
use crate::config::CurioConfig;
use crate::conversation::ConversationStore;
use crate::turn::{TurnOrchestrator, TurnOutcome};

/// Everything one chat session owns: its history and its (mutable) configuration.
///
/// Sessions share nothing; run one per user.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub history: ConversationStore,
    pub config: CurioConfig,
}

impl Session {
    pub fn new(config: CurioConfig) -> Self {
        Self {
            history: ConversationStore::new(),
            config,
        }
    }

    /// Back to the single greeting; configuration is kept
    pub fn reset(&mut self) {
        self.history.reset();
    }

    /// Runs one turn against this session's history and configuration
    pub async fn submit<B: ChatBackend>(
        &mut self,
        orchestrator: &TurnOrchestrator<B>,
        user_text: &str,
        observer: Option<&mut dyn FnMut(&str)>,
    ) -> TurnOutcome {
        orchestrator
            .handle_turn(&mut self.history, user_text, &self.config, observer)
            .await
    }
}
