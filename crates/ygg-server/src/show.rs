use std::sync::Arc;
use std::sync::RwLock;

use tokio::sync::mpsc::unbounded_channel;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use ygg_assignment::AdjacencyGraph;
use ygg_conductor::projection::Projection;
use ygg_conductor::tally::RandomTieBreaker;
use ygg_conductor::BroadcastScope;
use ygg_conductor::Command;
use ygg_conductor::Conductor;
use ygg_conductor::ConductorError;
use ygg_conductor::Effect;
use ygg_conductor::Mode;
use ygg_core::ShowPhase;
use ygg_core::ShowState;
use ygg_gateway::timing;
use ygg_gateway::wire::ServerMessage;
use ygg_gateway::wire::View;
use ygg_persistence::Store;

use crate::registry::ConnectionId;
use crate::registry::Registry;

/// What to append to the analysis-only log once a command is accepted
/// (spec.md §4.5: "`saveUser`, `saveVote`, `saveFigTreeResponse` ... used
/// for post-hoc analysis; not read by the Conductor at runtime").
///
/// Captured from the inbound `Command` before it is consumed by
/// [`Conductor::reduce`], then resolved against the post-reduction state so
/// the record reflects what was actually accepted.
enum AppendRecord {
    None,
    User(ygg_core::UserId),
    Vote { row_index: ygg_core::RowIndex, user_id: ygg_core::UserId },
    FigTree(ygg_core::UserId),
}

impl AppendRecord {
    fn for_command(command: &Command) -> Self {
        match command {
            Command::Join { user_id, .. } => Self::User(*user_id),
            Command::CastVote { user_id, row_index, .. } => {
                Self::Vote { row_index: *row_index, user_id: *user_id }
            }
            Command::SubmitFigTree { user_id, .. } => Self::FigTree(*user_id),
            _ => Self::None,
        }
    }
}

/// One inbound item for the Show actor's single-writer command queue
/// (spec.md §5: "All commands ... are serialized into one queue").
enum Inbound {
    Command {
        command: Command,
        origin: Option<ConnectionId>,
        mode: Mode,
    },
    Register {
        id: ConnectionId,
        mode: Mode,
        tx: UnboundedSender<String>,
    },
    BindUser {
        id: ConnectionId,
        user_id: ygg_core::UserId,
    },
    Unregister {
        id: ConnectionId,
    },
}

/// Handle for submitting work to a running [`ShowActor`]. Cheap to clone —
/// every connection gets its own.
#[derive(Clone)]
pub struct ShowHandle {
    inbound: UnboundedSender<Inbound>,
}

impl ShowHandle {
    pub fn submit(&self, command: Command, origin: Option<ConnectionId>, mode: Mode) {
        let _ = self.inbound.send(Inbound::Command { command, origin, mode });
    }
    pub fn register(&self, id: ConnectionId, mode: Mode, tx: UnboundedSender<String>) {
        let _ = self.inbound.send(Inbound::Register { id, mode, tx });
    }
    pub fn bind_user(&self, id: ConnectionId, user_id: ygg_core::UserId) {
        let _ = self.inbound.send(Inbound::BindUser { id, user_id });
    }
    pub fn unregister(&self, id: ConnectionId) {
        let _ = self.inbound.send(Inbound::Unregister { id });
    }
}

/// The single-threaded cooperative actor that owns the authoritative
/// `ShowState` (spec.md §5). Everything else in this crate only ever holds
/// read-only projections of what it publishes.
pub struct ShowActor {
    state: ShowState,
    graph: Box<dyn AdjacencyGraph + Send + Sync>,
    tie_breaker: RandomTieBreaker,
    store: Arc<dyn Store>,
    registry: Registry,
    shared_state: Arc<RwLock<ShowState>>,
    inbound: UnboundedReceiver<Inbound>,
    timer_tx: UnboundedSender<Command>,
    timer_rx: UnboundedReceiver<Command>,
    current_timer: Option<tokio::task::JoinHandle<()>>,
}

impl ShowActor {
    /// Spawns the actor on the current Tokio runtime and returns a handle to
    /// it plus a read-only snapshot cell the HTTP layer can poll for health
    /// checks without round-tripping through the command queue.
    pub fn spawn(
        initial_state: ShowState,
        store: Arc<dyn Store>,
        graph: Box<dyn AdjacencyGraph + Send + Sync>,
    ) -> (ShowHandle, Arc<RwLock<ShowState>>) {
        let (inbound_tx, inbound_rx) = unbounded_channel();
        let (timer_tx, timer_rx) = unbounded_channel();
        let shared_state = Arc::new(RwLock::new(initial_state.clone()));
        let actor = Self {
            state: initial_state,
            graph,
            tie_breaker: RandomTieBreaker,
            store,
            registry: Registry::default(),
            shared_state: shared_state.clone(),
            inbound: inbound_rx,
            timer_tx,
            timer_rx,
            current_timer: None,
        };
        tokio::spawn(actor.run());
        (ShowHandle { inbound: inbound_tx }, shared_state)
    }

    async fn run(mut self) {
        loop {
            let inbound = tokio::select! {
                biased;
                command = self.timer_rx.recv() => match command {
                    Some(command) => Inbound::Command { command, origin: None, mode: Mode::Controller },
                    None => continue,
                },
                inbound = self.inbound.recv() => match inbound {
                    Some(inbound) => inbound,
                    None => break,
                },
            };
            match inbound {
                Inbound::Register { id, mode, tx } => {
                    self.registry.register(id, None, mode, tx);
                    self.send_full_snapshot(id);
                }
                Inbound::BindUser { id, user_id } => {
                    self.registry.bind_user(id, user_id);
                }
                Inbound::Unregister { id } => {
                    self.registry.remove(id);
                }
                Inbound::Command { command, origin, mode } => {
                    self.handle_command(command, origin, mode).await;
                }
            }
        }
    }

    async fn handle_command(&mut self, command: Command, origin: Option<ConnectionId>, mode: Mode) {
        if command.requires_controller() && mode != Mode::Controller {
            if let Some(origin) = origin {
                self.send_error(origin, &ConductorError::NotAuthorized);
            }
            return;
        }

        let append = AppendRecord::for_command(&command);
        let conductor = Conductor::new(self.graph.as_ref(), &self.tie_breaker);
        let outcome = conductor.reduce(&self.state, command);
        let Some(error) = outcome.error.as_ref() else {
            self.apply(outcome.state, &outcome.effects, origin, append).await;
            return;
        };
        if let Some(origin) = origin {
            self.send_error(origin, error);
        }
    }

    /// Runs a command's effects in order and commits the new state only if
    /// persistence succeeds (spec.md §7: `PersistenceFailed` rolls the
    /// mutation back and leaves `version` unadvanced).
    async fn apply(
        &mut self,
        next: ShowState,
        effects: &[Effect],
        origin: Option<ConnectionId>,
        append: AppendRecord,
    ) {
        let previous = self.state.clone();
        let mut broadcasts = Vec::new();
        let mut tiebreaker_rows = Vec::new();
        let mut reconnect_reason = None;

        for effect in effects {
            match effect {
                Effect::Persist(state) => {
                    if let Err(error) = self.store.save_state(state).await {
                        log::error!("persist failed for show {}: {error}", state.id);
                        let failure = ConductorError::PersistenceFailed(error.to_string());
                        if let Some(origin) = origin {
                            self.send_error(origin, &failure);
                        }
                        self.notify_controllers(&failure);
                        return;
                    }
                }
                Effect::Broadcast(scope) => broadcasts.push(*scope),
                Effect::TriggerTiebreakerAnimation { row } => tiebreaker_rows.push(*row),
                Effect::ForceReconnectAll { reason } => reconnect_reason = Some(reason.clone()),
            }
        }
        self.append_record(&next, append).await;

        self.state = next;
        *self.shared_state.write().expect("shared state lock poisoned") = self.state.clone();

        for row in tiebreaker_rows {
            self.broadcast_raw(ServerMessage::tiebreaker_animation(row).to_json());
        }
        if let Some(reason) = reconnect_reason {
            self.broadcast_raw(ServerMessage::force_reconnect(reason).to_json());
        }
        for scope in broadcasts {
            self.dispatch(scope, &previous);
        }
        self.reschedule_timer();
    }

    /// Sends each targeted connection a delta (projector/controller, when
    /// eligible) or a full view — audience connections always get a fresh
    /// view since their personal fields (vote, coup meter) aren't carried
    /// by the generic [`ygg_conductor::projection::Delta`] (SPEC_FULL.md §4.4).
    fn dispatch(&mut self, scope: BroadcastScope, previous: &ShowState) {
        for id in self.registry.targets(scope, &self.state) {
            let Some(mode) = self.registry.mode_of(id) else { continue };
            if mode == Mode::Audience {
                self.send_full_snapshot(id);
                continue;
            }
            let last_sent = self.registry.last_sent_version(id);
            let delta_eligible = last_sent == previous.version && self.state.version == previous.version + 1;
            if delta_eligible {
                if let Some(delta) = Projection::delta(previous, &self.state, last_sent) {
                    let message = ServerMessage::delta_sync(delta).to_json();
                    self.registry.send(id, &message);
                    self.registry.mark_sent(id, self.state.version);
                    continue;
                }
            }
            self.send_full_snapshot(id);
        }
    }

    fn send_full_snapshot(&mut self, id: ConnectionId) {
        let Some(mode) = self.registry.mode_of(id) else { return };
        let view = match mode {
            Mode::Audience => {
                let Some(user_id) = self.registry.user_of(id) else { return };
                match Projection::audience_view(&self.state, user_id) {
                    Some(view) => View::Audience(view),
                    None => return,
                }
            }
            Mode::Projector => View::Projector(Projection::projector_view(&self.state)),
            Mode::Controller => View::Controller(Projection::controller_view(&self.state)),
        };
        let message = ServerMessage::full_snapshot(view, self.state.version).to_json();
        self.registry.send(id, &message);
        self.registry.mark_sent(id, self.state.version);
    }

    /// Writes the analysis-only append log entry for an accepted command,
    /// if any (spec.md §4.5). Failures here are logged but never rejected
    /// back to the client or rolled back — only the `Persist` snapshot is
    /// load-bearing for the Conductor's own invariants.
    async fn append_record(&self, state: &ShowState, append: AppendRecord) {
        match append {
            AppendRecord::None => {}
            AppendRecord::User(user_id) => {
                if let Some(user) = state.users.get(&user_id) {
                    if let Err(error) = self.store.save_user(state.id, user).await {
                        log::warn!("failed to append user record for {user_id}: {error}");
                    }
                }
            }
            AppendRecord::Vote { row_index, user_id } => {
                if let Some(vote) = state.rows.get(row_index).and_then(|r| r.votes.get(&user_id)) {
                    if let Err(error) = self.store.save_vote(state.id, vote).await {
                        log::warn!("failed to append vote record for {user_id}: {error}");
                    }
                }
            }
            AppendRecord::FigTree(user_id) => {
                if let Some(text) = state.fig_tree_responses.get(&user_id) {
                    if let Err(error) = self.store.save_fig_tree_response(state.id, user_id, text).await {
                        log::warn!("failed to append fig-tree response for {user_id}: {error}");
                    }
                }
            }
        }
    }

    fn send_error(&self, id: ConnectionId, error: &ConductorError) {
        self.registry.send(id, &ServerMessage::error(error).to_json());
    }

    fn notify_controllers(&self, error: &ConductorError) {
        for id in self.registry.targets(BroadcastScope::All, &self.state) {
            if self.registry.mode_of(id) == Some(Mode::Controller) {
                self.send_error(id, error);
            }
        }
    }

    fn broadcast_raw(&self, message: String) {
        for id in self.registry.all_ids() {
            self.registry.send(id, &message);
        }
    }

    /// Cancels any pending `ADVANCE_PHASE` timer and schedules the next one
    /// for the new state (spec.md §4.7: "Pause/resume cancels pending timers
    /// and reschedules from scratch on resume").
    fn reschedule_timer(&mut self) {
        if let Some(handle) = self.current_timer.take() {
            handle.abort();
        }
        if self.state.phase != ShowPhase::Running {
            return;
        }
        self.current_timer = timing::schedule(&self.state, self.timer_tx.clone(), {
            let shared = self.shared_state.clone();
            move || shared.read().expect("shared state lock poisoned").clone()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use ygg_assignment::NullGraph;
    use ygg_core::ShowConfig;
    use ygg_core::UserId;
    use ygg_core::ID;
    use ygg_persistence::InMemoryStore;

    async fn wait_for_version(shared: &Arc<RwLock<ShowState>>, version: u64) {
        for _ in 0..200 {
            if shared.read().expect("shared state lock poisoned").version >= version {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("state never reached version {version}");
    }

    #[tokio::test]
    async fn join_and_fig_tree_commands_append_to_the_analysis_log() {
        let store = Arc::new(InMemoryStore::new());
        let initial_state = ShowState::create_initial(ShowConfig::default(), ID::default());
        let (handle, shared) = ShowActor::spawn(
            initial_state,
            store.clone() as Arc<dyn Store>,
            Box::new(NullGraph),
        );

        let user_id = UserId::default();
        handle.submit(
            Command::Join { user_id, seat_id: None, mode: Mode::Audience, timestamp: 0 },
            None,
            Mode::Audience,
        );
        wait_for_version(&shared, 1).await;

        handle.submit(
            Command::SubmitFigTree { user_id, text: "a rolling stone".to_string(), timestamp: 0 },
            None,
            Mode::Audience,
        );
        wait_for_version(&shared, 2).await;

        let users = store.recorded_users().await;
        assert!(users.iter().any(|u| u.id == user_id));
        let fig_trees = store.recorded_fig_tree_responses().await;
        assert!(fig_trees
            .iter()
            .any(|(id, text)| *id == user_id && text == "a rolling stone"));
    }

    #[tokio::test]
    async fn cast_vote_appends_to_the_analysis_log() {
        let store = Arc::new(InMemoryStore::new());
        let initial_state = ShowState::create_initial(ShowConfig::default(), ID::default());
        let (handle, shared) = ShowActor::spawn(
            initial_state,
            store.clone() as Arc<dyn Store>,
            Box::new(NullGraph),
        );

        let mut version = 0;
        let mut user_ids = Vec::new();
        for _ in 0..4 {
            let user_id = UserId::default();
            user_ids.push(user_id);
            handle.submit(
                Command::Join { user_id, seat_id: None, mode: Mode::Audience, timestamp: 0 },
                None,
                Mode::Audience,
            );
            version += 1;
            wait_for_version(&shared, version).await;
        }

        handle.submit(Command::AssignFactions { timestamp: 0 }, None, Mode::Controller);
        version += 1;
        wait_for_version(&shared, version).await;
        handle.submit(Command::StartShow { timestamp: 0 }, None, Mode::Controller);
        version += 1;
        wait_for_version(&shared, version).await;
        for _ in 0..4 {
            handle.submit(Command::AdvancePhase { timestamp: 0 }, None, Mode::Controller);
            version += 1;
            wait_for_version(&shared, version).await;
        }

        let voter = user_ids[0];
        handle.submit(
            Command::CastVote { user_id: voter, row_index: 0, faction_vote: 0, personal_vote: 0, timestamp: 0 },
            None,
            Mode::Audience,
        );
        version += 1;
        wait_for_version(&shared, version).await;

        let votes = store.recorded_votes().await;
        assert!(votes.iter().any(|v| v.user_id == voter && v.row_index == 0));
    }
}
