use anyhow::Result;
use flashcards::{
    agent::Agent,
    prompt_template::PromptSet,
    providers::{base::Provider, factory},
    quiz::QuizService,
    store::{
        FileMemoryStore, InMemoryKnowledgeCheckStore, InMemoryNoteStore, InMemoryQuizStore,
        NoteTopicIndex,
    },
    systems::{ClockSystem, KnowledgeCheckSystem, MemorySystem, NotesSystem, ToolRegistry},
};
use std::sync::Arc;
use tracing::info;

use crate::configuration::{ProviderSettings, Settings};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub quiz: Arc<QuizService>,
}

fn provider(settings: &ProviderSettings) -> Result<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider + Send + Sync> =
        Arc::from(factory::get_provider(settings.clone().into_config())?);
    Ok(provider)
}

impl AppState {
    pub fn new(agent: Agent, quiz: QuizService) -> Self {
        Self {
            agent: Arc::new(agent),
            quiz: Arc::new(quiz),
        }
    }

    /// Wire stores, providers and tools from the settings
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let notes = Arc::new(InMemoryNoteStore::new());
        if let Some(dir) = &settings.notes.dir {
            notes.load_dir(dir).await?;
        }
        let quizzes = Arc::new(InMemoryQuizStore::new());
        let topics = Arc::new(NoteTopicIndex::new(notes.clone()));
        let checks = Arc::new(InMemoryKnowledgeCheckStore::new());
        let memory = Arc::new(FileMemoryStore::new(settings.memory.path()));
        info!(path = %memory.path().display(), "using memory file");

        let prompts = Arc::new(PromptSet::embedded()?);
        let agent_provider = provider(&settings.provider)?;
        let quiz_provider = match &settings.quiz_provider {
            Some(quiz_settings) => provider(quiz_settings)?,
            None => agent_provider.clone(),
        };

        let registry = ToolRegistry::new(vec![
            Box::new(NotesSystem::new(notes.clone())),
            Box::new(MemorySystem::new(memory)),
            Box::new(ClockSystem::new()),
            Box::new(KnowledgeCheckSystem::new(checks)),
        ])?;
        info!(tools = registry.list_specs().len(), "registered agent tools");

        let agent = Agent::new(agent_provider, registry, prompts.clone())
            .with_max_rounds(settings.agent.max_rounds);
        let quiz = QuizService::new(quiz_provider, notes, quizzes, topics, prompts);
        Ok(Self::new(agent, quiz))
    }
}
