use anyhow::{anyhow, Result};
use sentinel_core::app::{Command, DetailView, Notification, ReadProjection, SortKey};
use sentinel_core::domain::{ChannelId, Event, Outcome, RepoId};
use sentinel_core::navigator::{ListingRequest, Navigator};
use sentinel_core::ports::{Clock, ProgressEndpoint, ProgressTransport, RepositoryServer};
use sentinel_core::tracker::{Effect, LogEntry, OperationPhase, PullTracker, PullTrigger, ScanPhase, ScanTracker};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::channel::{ChannelSlot, ProgressChannel};

/// The main application service that coordinates all operations.
///
/// Owns every tracker, the navigator and the repository collection. All
/// state changes happen on its event loop; requests and channels run as
/// tasks that report back over the internal event bus.
pub struct AppService {
    // Ports (dependency injection)
    server: Arc<dyn RepositoryServer>,
    transport: Arc<dyn ProgressTransport>,
    clock: Arc<dyn Clock>,

    // Event bus
    event_tx: mpsc::UnboundedSender<Event>,
    event_rx: mpsc::UnboundedReceiver<Event>,

    // Notifications for the front end
    notify_tx: mpsc::UnboundedSender<Notification>,

    // Command receiver
    command_rx: mpsc::UnboundedReceiver<Command>,

    // Read projection for queries
    projection: ReadProjection,

    pulls: PullTracker,
    scan: ScanTracker,
    navigator: Navigator,

    // One live channel per concern
    pull_channel: ChannelSlot,
    scan_channel: ChannelSlot,
    next_channel: u64,

    // In-flight requests
    tasks: JoinSet<Result<()>>,

    quit: bool,
}

impl AppService {
    pub fn new(
        server: Arc<dyn RepositoryServer>,
        transport: Arc<dyn ProgressTransport>,
        clock: Arc<dyn Clock>,
        sort: SortKey,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>, mpsc::UnboundedSender<Command>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let service = Self {
            server,
            transport,
            pulls: PullTracker::new(clock.clone()),
            clock,
            event_tx,
            event_rx,
            notify_tx,
            command_rx,
            projection: ReadProjection::new(sort),
            scan: ScanTracker::new(),
            navigator: Navigator::new(),
            pull_channel: ChannelSlot::default(),
            scan_channel: ChannelSlot::default(),
            next_channel: 0,
            tasks: JoinSet::new(),
            quit: false,
        };

        (service, notify_rx, command_tx)
    }

    /// Get the current read projection (for UI queries)
    pub fn projection(&self) -> &ReadProjection {
        &self.projection
    }

    pub fn pulls(&self) -> &PullTracker {
        &self.pulls
    }

    pub fn scan(&self) -> &ScanTracker {
        &self.scan
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Identity of the open pull channel, if any
    pub fn pull_channel_id(&self) -> Option<ChannelId> {
        self.pull_channel.id()
    }

    /// Run the event loop until `Quit` or until every command sender is gone
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting AppService");
        self.run_event_loop().await
    }

    /// Handle a command (CQRS Command side)
    pub fn handle_command(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::LoadRepositories => self.load_repositories(),
            Command::SetFilter { query, sort } => {
                debug!("Filter set to {:?}, sort {}", query, sort);
                self.projection.query = query;
                self.projection.sort = sort;
                self.notify_collection();
            }
            Command::OpenDetails { id } => self.open_details(id),
            Command::CloseDetails => self.close_details(),
            Command::Pull { id, trigger } => self.start_pull(id, trigger),
            Command::FetchStatus { id } => self.fetch_status(id),
            Command::RequestDiscard { id } => self.request_discard(id),
            Command::ConfirmDiscard => self.confirm_discard(),
            Command::CancelDiscard => {
                if let Some(detail) = self.projection.detail.as_mut() {
                    detail.discard.pending_confirmation = false;
                    let id = detail.repo_id.clone();
                    info!("Discard for {} cancelled", id);
                    self.notify(Notification::DiscardCancelled { id });
                }
            }
            Command::StartScan { path, depth } => self.start_scan(path, depth),
            Command::OpenBrowser => {
                let request = self.navigator.open();
                self.fetch_listing(request);
            }
            Command::Descend { entry } => self.navigate(|nav| nav.descend(&entry)),
            Command::Ascend => self.navigate(Navigator::ascend),
            Command::RetryListing => self.navigate(Navigator::retry),
            Command::SelectDirectory => match self.navigator.select_current() {
                Ok(path) => {
                    info!("Scan path selected: {}", path);
                    self.projection.scan_path = Some(path.clone());
                    self.notify(Notification::PathSelected(path));
                }
                Err(e) => self.notify(Notification::BrowserError(e.to_string())),
            },
            Command::CloseBrowser => self.navigator.close(),
            Command::Quit => {
                info!("Quit command received");
                self.event_tx
                    .send(Event::QuitRequested)
                    .map_err(|_| anyhow!("Event bus closed"))?;
            }
        }
        Ok(())
    }

    fn load_repositories(&mut self) {
        info!("Loading repositories");
        let generation = self.projection.begin_fetch();
        self.spawn_request(
            "list repositories",
            |server| async move { server.list_repositories().await },
            move |result| Event::RepositoriesLoaded { generation, result },
        );
    }

    fn open_details(&mut self, id: RepoId) {
        if self.projection.selected().is_some_and(|open| open != &id) {
            self.close_details();
        }
        info!("Opening details for {}", id);
        self.projection.detail = Some(DetailView::new(id.clone()));
        self.notify_collection();

        let target = id.clone();
        self.spawn_request(
            "repository details",
            move |server| async move { server.repository_details(&target).await },
            move |result| Event::DetailsLoaded { id, result },
        );
    }

    /// Closing the detail view cancels its pull tracking outright
    fn close_details(&mut self) {
        let Some(detail) = self.projection.detail.take() else {
            return;
        };
        let id = detail.repo_id;
        info!("Closing details for {}", id);

        let tracked = self.pulls.state(&id).is_some();
        let effects = self.pulls.close(&id);
        self.apply_pull_effects(&id, effects);
        if tracked {
            self.notify(Notification::PullFinished {
                id,
                phase: OperationPhase::Idle,
            });
        }
        self.notify_collection();
    }

    fn start_pull(&mut self, id: RepoId, trigger: PullTrigger) {
        if self.pulls.is_busy(&id) {
            warn!("Pull for {} already in progress", id);
            self.notify(Notification::Error(format!("A pull is already running for {}", id)));
            return;
        }

        // The pull channel serves one repository at a time
        if let Some(ProgressEndpoint::Pull(previous)) = self.pull_channel.endpoint().cloned() {
            if previous != id {
                info!("Pull channel moves from {} to {}", previous, id);
                self.pulls.close(&previous);
                self.pull_channel.close();
                self.notify(Notification::PullFinished {
                    id: previous,
                    phase: OperationPhase::Idle,
                });
            }
        }

        info!("Starting pull for {} ({:?})", id, trigger);
        self.pulls.start(&id, trigger);
        let channel = self.open_pull_channel(id.clone());
        self.notify_collection();

        let target = id.clone();
        self.spawn_request(
            "pull",
            move |server| async move { server.start_pull(&target).await },
            move |result| Event::PullAcknowledged { id, channel, result },
        );
    }

    fn fetch_status(&mut self, id: RepoId) {
        if let Some(detail) = self.projection.detail_for(&id) {
            detail.status.loading = true;
            detail.status.output = None;
            detail.status.error = None;
        }

        let target = id.clone();
        self.spawn_request(
            "status",
            move |server| async move { server.repository_status(&target).await },
            move |result| Event::StatusLoaded { id, result },
        );
    }

    fn request_discard(&mut self, id: RepoId) {
        if self.projection.selected() != Some(&id) {
            self.open_details(id.clone());
        }
        if let Some(detail) = self.projection.detail_for(&id) {
            detail.discard.pending_confirmation = true;
            detail.discard.error = None;
        }
        self.notify(Notification::DiscardConfirmationRequired { id });
    }

    fn confirm_discard(&mut self) {
        let pending = self
            .projection
            .detail
            .as_ref()
            .is_some_and(|d| d.discard.pending_confirmation);
        if !pending {
            warn!("Discard confirmed with nothing pending");
            self.notify(Notification::Error("No discard is awaiting confirmation".to_string()));
            return;
        }
        let Some(detail) = self.projection.detail.as_mut() else {
            return;
        };

        detail.discard.pending_confirmation = false;
        detail.discard.loading = true;
        let id = detail.repo_id.clone();
        warn!("Discarding local changes of {}", id);

        let target = id.clone();
        self.spawn_request(
            "discard",
            move |server| async move { server.discard_changes(&target).await },
            move |result| Event::DiscardFinished { id, result },
        );
    }

    fn start_scan(&mut self, path: String, depth: u32) {
        let effects = match self.scan.start(&path) {
            Ok(effects) => effects,
            Err(e) => {
                warn!("Scan rejected: {}", e);
                self.report_scan(0, ScanPhase::Idle);
                return;
            }
        };

        info!("Starting scan of {} (depth {})", path, depth);
        self.apply_scan_effects(effects);
        self.open_scan_channel();

        self.spawn_request(
            "scan",
            move |server| async move { server.start_scan(&path, depth).await },
            |result| Event::ScanAcknowledged { result },
        );
    }

    fn navigate<F>(&mut self, step: F)
    where
        F: FnOnce(&mut Navigator) -> sentinel_core::Result<ListingRequest>,
    {
        match step(&mut self.navigator) {
            Ok(request) => self.fetch_listing(request),
            Err(e) => self.notify(Notification::BrowserError(e.to_string())),
        }
    }

    fn fetch_listing(&mut self, request: ListingRequest) {
        let ListingRequest { ticket, path } = request;
        debug!("Fetching listing {} for {:?}", ticket, path);
        self.spawn_request(
            "browse",
            move |server| async move { server.browse(path.as_deref()).await },
            move |result| Event::ListingLoaded { ticket, result },
        );
    }

    /// Run one server call as a task and post its outcome on the event bus
    fn spawn_request<T, C, Fut, W>(&mut self, label: &'static str, call: C, wrap: W)
    where
        T: Send + 'static,
        C: FnOnce(Arc<dyn RepositoryServer>) -> Fut,
        Fut: Future<Output = sentinel_core::Result<T>> + Send + 'static,
        W: FnOnce(Outcome<T>) -> Event + Send + 'static,
    {
        let request = call(self.server.clone());
        let event_tx = self.event_tx.clone();

        self.tasks.spawn(async move {
            let result = request.await.map_err(|e| {
                error!("Request '{}' failed: {}", label, e);
                e.to_string()
            });
            event_tx
                .send(wrap(result))
                .map_err(|_| anyhow!("Event receiver dropped during '{}'", label))
        });
    }

    fn next_channel_id(&mut self) -> ChannelId {
        self.next_channel += 1;
        ChannelId(self.next_channel)
    }

    fn open_pull_channel(&mut self, id: RepoId) -> ChannelId {
        let channel = self.next_channel_id();
        let event_tx = self.event_tx.clone();
        let endpoint = ProgressEndpoint::Pull(id.clone());

        self.pull_channel.replace(ProgressChannel::open(
            self.transport.clone(),
            endpoint,
            channel,
            move |event| {
                let _ = event_tx.send(Event::PullProgress {
                    id: id.clone(),
                    channel,
                    event,
                });
            },
        ));
        channel
    }

    fn open_scan_channel(&mut self) {
        let channel = self.next_channel_id();
        let event_tx = self.event_tx.clone();

        self.scan_channel.replace(ProgressChannel::open(
            self.transport.clone(),
            ProgressEndpoint::Scan,
            channel,
            move |event| {
                let _ = event_tx.send(Event::ScanProgress { channel, event });
            },
        ));
    }

    fn apply_pull_effects(&mut self, id: &RepoId, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CloseChannel => self.pull_channel.close_if(&ProgressEndpoint::Pull(id.clone())),
                Effect::RefreshRepositories => self.load_repositories(),
                Effect::ClearRepositories => {
                    self.projection.clear_repositories();
                    self.notify_collection();
                }
            }
        }
    }

    fn apply_scan_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CloseChannel => self.scan_channel.close(),
                Effect::RefreshRepositories => self.load_repositories(),
                Effect::ClearRepositories => {
                    self.projection.clear_repositories();
                    self.notify_collection();
                }
            }
        }
    }

    /// Run a pull transition and report what it changed
    fn advance_pull<F>(&mut self, id: &RepoId, transition: F)
    where
        F: FnOnce(&mut PullTracker) -> Vec<Effect>,
    {
        let before: Vec<LogEntry> = self.pulls.logs(id).to_vec();
        let was_busy = self.pulls.is_busy(id) || self.pulls.is_quick_busy(id);

        let effects = transition(&mut self.pulls);

        let after = self.pulls.logs(id);
        let fresh = if after.starts_with(&before) {
            &after[before.len()..]
        } else {
            after
        };
        let entries: Vec<LogEntry> = fresh.to_vec();
        for entry in entries {
            self.notify(Notification::PullLog { id: id.clone(), entry });
        }

        let phase = self.pulls.phase(id);
        if was_busy && matches!(phase, OperationPhase::Completed | OperationPhase::Error) {
            info!("Pull for {} finished: {:?}", id, phase);
            self.notify(Notification::PullFinished { id: id.clone(), phase });
            self.notify_collection();
        }

        self.apply_pull_effects(id, effects);
    }

    /// Report scan messages past `seen` and a phase change away from `before`
    fn report_scan(&mut self, seen: usize, before: ScanPhase) {
        let state = self.scan.state().clone();
        for message in state.messages.iter().skip(seen) {
            self.notify(Notification::ScanMessage(message.clone()));
        }
        if state.phase != before && matches!(state.phase, ScanPhase::Completed | ScanPhase::Error) {
            info!("Scan finished: {:?}", state.phase);
            self.notify(Notification::ScanFinished {
                phase: state.phase,
                error: state.error,
            });
        }
    }

    fn advance_scan<F>(&mut self, transition: F)
    where
        F: FnOnce(&mut ScanTracker) -> Vec<Effect>,
    {
        let seen = self.scan.state().messages.len();
        let before = self.scan.state().phase;
        let effects = transition(&mut self.scan);
        self.report_scan(seen, before);
        self.apply_scan_effects(effects);
    }

    fn notify(&self, notification: Notification) {
        if self.notify_tx.send(notification).is_err() {
            debug!("Notification receiver dropped");
        }
    }

    fn notify_collection(&self) {
        let view = self.projection.project(&self.pulls, self.clock.now());
        self.notify(Notification::RepositoriesChanged(view));
    }

    /// Main event processing loop
    async fn run_event_loop(&mut self) -> Result<()> {
        info!("Starting event loop");

        while !self.quit {
            tokio::select! {
                // Handle commands from the front end
                command = self.command_rx.recv() => {
                    match command {
                        Some(cmd) => {
                            if let Err(e) = self.handle_command(cmd) {
                                error!("Error handling command: {}", e);
                            }
                        }
                        None => {
                            info!("Command channel closed, stopping event loop");
                            break;
                        }
                    }
                }

                // Handle events from the event bus
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("Event channel closed, stopping event loop");
                            break;
                        }
                    }
                }

                // Handle completed background tasks
                task_result = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Some(result) = task_result {
                        match result {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => error!("Background task failed: {}", e),
                            Err(e) => error!("Background task panicked: {}", e),
                        }
                    }
                }
            }
        }

        info!("Shutting down background tasks");
        self.pull_channel.close();
        self.scan_channel.close();
        self.tasks.abort_all();

        Ok(())
    }

    /// Handle a single event and update the trackers and projection
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::RepositoriesLoaded { generation, result } => match result {
                Ok(repositories) => {
                    let count = repositories.len();
                    if !self.projection.apply_fetch(generation, repositories) {
                        debug!("Dropping stale repository listing (fetch {})", generation);
                        return;
                    }
                    info!("Loaded {} repositories", count);
                    self.notify_collection();
                }
                Err(message) => {
                    if !self.projection.fetch_failed(generation) {
                        debug!("Dropping stale repository failure (fetch {}): {}", generation, message);
                        return;
                    }
                    self.notify(Notification::RepositoriesFailed { message });
                }
            },

            Event::DetailsLoaded { id, result } => {
                if self.projection.selected() != Some(&id) {
                    debug!("Dropping details for {}, detail view moved on", id);
                    return;
                }
                match result {
                    Ok(repository) => self.notify(Notification::Details(repository)),
                    Err(message) => self.notify(Notification::Error(message)),
                }
            }

            Event::PullAcknowledged { id, channel, .. } if !self.pull_channel.is_current(channel) => {
                debug!("Dropping pull acknowledgment for {} from superseded attempt {}", id, channel);
            }

            Event::PullAcknowledged { id, result, .. } => match result {
                Ok(ack) => {
                    debug!("Pull acknowledgment for {}: {:?}", id, ack.status);
                    self.advance_pull(&id, |pulls| pulls.acknowledge(&id, &ack));
                }
                Err(message) => self.advance_pull(&id, |pulls| pulls.request_failed(&id, &message)),
            },

            Event::PullProgress { id, channel, event } => {
                if !self.pull_channel.is_current(channel) {
                    debug!("Dropping {} from stale pull channel {}", event.status(), channel);
                    return;
                }
                debug!("Pull {} event: {}", id, event.status());
                self.advance_pull(&id, |pulls| pulls.advance(&id, &event));
            }

            Event::ScanAcknowledged { result } => match result {
                Ok(ack) => self.advance_scan(|scan| scan.acknowledge(&ack)),
                Err(message) => self.advance_scan(|scan| scan.request_failed(&message)),
            },

            Event::ScanProgress { channel, event } => {
                if !self.scan_channel.is_current(channel) {
                    debug!("Dropping {} from stale scan channel {}", event.status(), channel);
                    return;
                }
                debug!("Scan event: {}", event.status());
                self.advance_scan(|scan| scan.advance(&event));
            }

            Event::StatusLoaded { id, result } => {
                if let Some(detail) = self.projection.detail_for(&id) {
                    detail.status.loading = false;
                    match &result {
                        Ok(output) => detail.status.output = Some(output.clone()),
                        Err(message) => detail.status.error = Some(message.clone()),
                    }
                }
                match result {
                    Ok(output) => self.notify(Notification::StatusOutput { id, output }),
                    Err(message) => self.notify(Notification::StatusFailed { id, message }),
                }
            }

            Event::DiscardFinished { id, result } => {
                if let Some(detail) = self.projection.detail_for(&id) {
                    detail.discard.loading = false;
                    if let Err(message) = &result {
                        detail.discard.error = Some(message.clone());
                    }
                }
                match result {
                    Ok(message) => {
                        info!("Discarded local changes of {}", id);
                        self.projection.record_discard(&id, &message);
                        self.notify(Notification::Discarded { id, message });
                    }
                    Err(message) => self.notify(Notification::DiscardFailed { id, message }),
                }
            }

            Event::ListingLoaded { ticket, result } => {
                let applied = match result {
                    Ok(listing) => self.navigator.apply_listing(ticket, listing),
                    Err(message) => {
                        warn!("Listing {} failed: {}", ticket, message);
                        self.navigator.apply_failure(ticket, message)
                    }
                };
                if !applied {
                    debug!("Dropping stale listing {}", ticket);
                    return;
                }
                if let Some(cursor) = self.navigator.cursor() {
                    self.notify(Notification::Listing {
                        cursor: cursor.clone(),
                        error: self.navigator.error().map(str::to_string),
                    });
                }
            }

            Event::QuitRequested => {
                info!("Quit requested via event");
                self.quit = true;
            }
        }
    }
}

impl Drop for AppService {
    fn drop(&mut self) {
        // Abort all background tasks when the service is dropped
        self.tasks.abort_all();
    }
}
