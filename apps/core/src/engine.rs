use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use crate::auxiliary::{context_menu_entries, ContextMenuEntry, HistoryEntry, HistoryLog};
use crate::config::Config;
use crate::dispatcher::{DispatchEvent, Dispatcher, ResultBatch};
use crate::logging;
use crate::matcher::SearchPrecision;
use crate::merger::ResultMerger;
use crate::model::ActionError;
use crate::plugin::ProviderRegistry;
use crate::progress::ProgressState;
use crate::query::Query;
use crate::record_store::{RecordLookup, RecordStore, StoreError};

#[derive(Debug)]
pub enum EngineError {
    InvalidSelection(usize),
    Action(ActionError),
    Store(StoreError),
    /// The engine task has shut down and can no longer answer.
    Closed,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSelection(index) => write!(f, "no result at index {index}"),
            Self::Action(error) => write!(f, "action failed: {error}"),
            Self::Store(error) => write!(f, "record store error: {error}"),
            Self::Closed => write!(f, "engine is shut down"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ActionError> for EngineError {
    fn from(value: ActionError) -> Self {
        Self::Action(value)
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Display projection of one ranked entry. Identity and score only; the
/// action stays inside the engine and is triggered through `invoke`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayResult {
    pub title: String,
    pub subtitle: String,
    pub icon_path: String,
    pub provider_id: String,
    pub effective_score: i64,
}

/// The observable ordered view. Replaced wholesale on every mutation so
/// observers never see a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultsSnapshot {
    pub visible: bool,
    pub results: Vec<DisplayResult>,
}

enum EngineCommand {
    QueryChanged(String),
    Invoke {
        index: usize,
        reply: oneshot::Sender<Result<bool, EngineError>>,
    },
    SetPinned {
        index: usize,
        pinned: bool,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    History {
        filter: String,
        reply: oneshot::Sender<Vec<HistoryEntry>>,
    },
    ContextMenu {
        index: usize,
        reply: oneshot::Sender<Result<Vec<ContextMenuEntry>, EngineError>>,
    },
}

/// Handle the presentation layer talks to. Cloneable; dropping every handle
/// shuts the engine down and cancels in-flight work.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    results: watch::Receiver<ResultsSnapshot>,
    busy: watch::Receiver<bool>,
}

impl EngineHandle {
    /// Feed the current content of the query box. Every call supersedes the
    /// previous query; empty input clears and hides the list.
    pub fn set_query_text(&self, text: &str) {
        let _ = self
            .commands
            .send(EngineCommand::QueryChanged(text.to_string()));
    }

    pub fn results(&self) -> watch::Receiver<ResultsSnapshot> {
        self.results.clone()
    }

    pub fn busy(&self) -> watch::Receiver<bool> {
        self.busy.clone()
    }

    /// Runs the action of the result at `index` in the current view. On
    /// success the selection is recorded for future boosting and the raw
    /// query joins the history; the returned bool is the action's request to
    /// close the launcher window. Action faults leave the window open.
    pub async fn invoke(&self, index: usize) -> Result<bool, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(EngineCommand::Invoke { index, reply })
            .map_err(|_| EngineError::Closed)?;
        response.await.map_err(|_| EngineError::Closed)?
    }

    pub async fn set_pinned(&self, index: usize, pinned: bool) -> Result<(), EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(EngineCommand::SetPinned {
                index,
                pinned,
                reply,
            })
            .map_err(|_| EngineError::Closed)?;
        response.await.map_err(|_| EngineError::Closed)?
    }

    pub async fn history(&self, filter: &str) -> Result<Vec<HistoryEntry>, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(EngineCommand::History {
                filter: filter.to_string(),
                reply,
            })
            .map_err(|_| EngineError::Closed)?;
        response.await.map_err(|_| EngineError::Closed)
    }

    pub async fn context_menu(&self, index: usize) -> Result<Vec<ContextMenuEntry>, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(EngineCommand::ContextMenu { index, reply })
            .map_err(|_| EngineError::Closed)?;
        response.await.map_err(|_| EngineError::Closed)?
    }
}

/// The orchestration control loop. Owns the merger, the progress state and
/// the dispatcher; it is the only task that mutates the visible list, so
/// concurrent provider batches can never interleave.
pub struct Engine {
    registry: Arc<ProviderRegistry>,
    records: Arc<RecordStore>,
    dispatcher: Dispatcher,
    merger: ResultMerger,
    progress: ProgressState,
    history: HistoryLog,
    precision: SearchPrecision,
    last_query: Option<Query>,
    snapshot_tx: watch::Sender<ResultsSnapshot>,
    busy_tx: watch::Sender<bool>,
}

impl Engine {
    /// Wires the engine together and spawns its control loop. Registry and
    /// record store are injected; the engine holds only shared references.
    pub fn spawn(
        registry: Arc<ProviderRegistry>,
        records: Arc<RecordStore>,
        config: &Config,
    ) -> EngineHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ResultsSnapshot::default());
        let (busy_tx, busy_rx) = watch::channel(false);

        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            events_tx,
            Duration::from_millis(config.progress_delay_ms),
        );

        let engine = Self {
            registry,
            records,
            dispatcher,
            merger: ResultMerger::new(config.selection_boost),
            progress: ProgressState::default(),
            history: HistoryLog::new(config.history_capacity),
            precision: config.search_precision.as_precision(),
            last_query: None,
            snapshot_tx,
            busy_tx,
        };

        tokio::spawn(engine.run(commands_rx, events_rx));

        EngineHandle {
            commands: commands_tx,
            results: snapshot_rx,
            busy: busy_rx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<EngineCommand>,
        mut events: mpsc::UnboundedReceiver<DispatchEvent>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        self.dispatcher.cancel_current();
                        return;
                    }
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
        }
    }

    fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::QueryChanged(text) => self.on_query_changed(&text),
            EngineCommand::Invoke { index, reply } => {
                let _ = reply.send(self.invoke_index(index));
            }
            EngineCommand::SetPinned {
                index,
                pinned,
                reply,
            } => {
                let _ = reply.send(self.pin_index(index, pinned));
            }
            EngineCommand::History { filter, reply } => {
                let _ = reply.send(self.history.filtered(&filter, self.precision));
            }
            EngineCommand::ContextMenu { index, reply } => {
                let _ = reply.send(self.context_menu_for(index));
            }
        }
    }

    fn handle_event(&mut self, event: DispatchEvent) {
        match event {
            DispatchEvent::Batch(batch) => self.on_batch(batch),
            DispatchEvent::Drained { generation } => {
                if self.progress.drained(generation) {
                    self.publish_busy();
                }
            }
            DispatchEvent::ProgressDue { generation } => {
                if self.progress.delay_elapsed(generation) {
                    self.publish_busy();
                }
            }
        }
    }

    fn on_query_changed(&mut self, text: &str) {
        match Query::parse(text, &self.registry.keywords()) {
            None => {
                self.dispatcher.cancel_current();
                self.progress.idle();
                self.merger.clear();
                self.last_query = None;
                self.publish_snapshot();
                self.publish_busy();
            }
            Some(query) => {
                // Evict rows from providers that are no longer eligible
                // before anything new arrives, so a keyword switch never
                // shows mixed results even momentarily.
                self.evict_for_keyword_switch(&query);
                let generation = self.dispatcher.submit(&query);
                self.progress.generation_started(generation);
                self.last_query = Some(query);
                self.publish_snapshot();
                self.publish_busy();
            }
        }
    }

    fn evict_for_keyword_switch(&mut self, next: &Query) {
        let last_keyword = self
            .last_query
            .as_ref()
            .map(|query| query.keyword.clone())
            .unwrap_or_default();

        if last_keyword.is_empty() {
            if next.has_keyword() {
                if let Some(provider) = self.registry.by_keyword(&next.keyword) {
                    self.merger.remove_except(&provider.metadata().id);
                }
            }
        } else if !next.has_keyword() {
            if let Some(provider) = self.registry.by_keyword(&last_keyword) {
                self.merger.remove_for(&provider.metadata().id);
            }
        } else if last_keyword != next.keyword {
            if let Some(provider) = self.registry.by_keyword(&next.keyword) {
                self.merger.remove_except(&provider.metadata().id);
            }
        }
    }

    fn on_batch(&mut self, batch: ResultBatch) {
        // Stale-result guard: the one check a misbehaving provider cannot
        // bypass.
        if batch.generation != self.dispatcher.current_generation() {
            return;
        }

        self.merger
            .merge_batch(&batch.provider_id, batch.results, self.records.as_ref());
        self.publish_snapshot();
    }

    fn invoke_index(&mut self, index: usize) -> Result<bool, EngineError> {
        let entry = self
            .merger
            .get(index)
            .ok_or(EngineError::InvalidSelection(index))?;
        let result = entry.result.clone();

        let close_window = (result.action)()?;

        if let Err(error) = self.records.record_selection(&result) {
            logging::warn(&format!(
                "selection record failed for '{}': {error}",
                result.title
            ));
        }
        self.history.push(&result.origin_raw_query);

        Ok(close_window)
    }

    fn pin_index(&mut self, index: usize, pinned: bool) -> Result<(), EngineError> {
        let entry = self
            .merger
            .get(index)
            .ok_or(EngineError::InvalidSelection(index))?;
        let result = entry.result.clone();

        self.records.set_pinned(&result, pinned)?;
        self.merger.rescore(index, self.records.as_ref());
        self.publish_snapshot();
        Ok(())
    }

    fn context_menu_for(&self, index: usize) -> Result<Vec<ContextMenuEntry>, EngineError> {
        let entry = self
            .merger
            .get(index)
            .ok_or(EngineError::InvalidSelection(index))?;

        let provider_name = self
            .registry
            .by_id(&entry.result.provider_id)
            .map(|provider| provider.metadata().name.clone())
            .unwrap_or_else(|| entry.result.provider_id.clone());

        Ok(context_menu_entries(
            &entry.result.title,
            &provider_name,
            self.records.is_pinned(&entry.result),
        ))
    }

    fn publish_snapshot(&self) {
        let results = self
            .merger
            .entries()
            .iter()
            .map(|entry| DisplayResult {
                title: entry.result.title.clone(),
                subtitle: entry.result.subtitle.clone(),
                icon_path: entry.result.icon_path.clone(),
                provider_id: entry.result.provider_id.clone(),
                effective_score: entry.effective_score,
            })
            .collect();

        let _ = self.snapshot_tx.send(ResultsSnapshot {
            visible: self.merger.visible(),
            results,
        });
    }

    fn publish_busy(&self) {
        let _ = self.busy_tx.send(self.progress.is_busy());
    }
}
