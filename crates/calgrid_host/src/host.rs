use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use anyhow::{Context, Result};
use calgrid_core::availability::ImagePaths;
use calgrid_core::decode::{FsImageSource, ImageSource};
use calgrid_core::navigation::{self, Direction, NavigationState};
use calgrid_core::{Clock, GridDescriptor, GridRenderer, RenderConfig, StateStore, SystemClock};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::launcher::{AppLauncher, DaySelection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostCommand {
    /// Re-render a single instance with the persisted state.
    Render(InstanceId),
    Navigate(Direction),
    /// `month` is zero-based.
    SelectDay { day: u32, month: u32, year: i32 },
    /// Re-render every instance, e.g. after activity images changed.
    Refresh,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderFrame {
    pub instance: InstanceId,
    pub grid: GridDescriptor,
}

/// Result of performing one command: the state it left behind and the
/// frames the caller must hand to the render surface.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub command: HostCommand,
    pub state: NavigationState,
    pub frames: Vec<RenderFrame>,
}

type Queue = Arc<Mutex<VecDeque<HostCommand>>>;

#[derive(Clone, Default)]
pub struct CommandSender {
    queue: Queue,
}

impl CommandSender {
    pub fn send(&self, command: HostCommand) {
        self.queue.lock().push_back(command);
    }

    /// Enqueues a refresh unless one is already waiting at the back of the queue.
    pub fn request_refresh(&self) {
        let mut queue = self.queue.lock();
        if queue.back() != Some(&HostCommand::Refresh) {
            queue.push_back(HostCommand::Refresh);
        }
    }
}

/// Event surface for the month widget.
///
/// Events from the host are queued and performed one at a time by whoever
/// holds `&mut WidgetHost`, which makes that holder the only writer of the
/// navigation state. Navigation and selection re-render every live instance;
/// each instance render gets its own budget.
pub struct WidgetHost {
    config: RenderConfig,
    paths: ImagePaths,
    store: Arc<dyn StateStore>,
    source: Arc<dyn ImageSource>,
    clock: Arc<dyn Clock>,
    launcher: Option<Box<dyn AppLauncher>>,
    instances: BTreeSet<InstanceId>,
    sender: CommandSender,
    watcher: Option<RecommendedWatcher>,
}

pub struct WidgetHostBuilder {
    config: RenderConfig,
    paths: ImagePaths,
    store: Arc<dyn StateStore>,
    source: Option<Arc<dyn ImageSource>>,
    clock: Arc<dyn Clock>,
    launcher: Option<Box<dyn AppLauncher>>,
    instances: BTreeSet<InstanceId>,
}

impl WidgetHostBuilder {
    pub fn new(store: Arc<dyn StateStore>, paths: ImagePaths) -> Self {
        Self {
            config: RenderConfig::default(),
            paths,
            store,
            source: None,
            clock: Arc::new(SystemClock),
            launcher: None,
            instances: BTreeSet::new(),
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_image_source(mut self, source: Arc<dyn ImageSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_launcher(mut self, launcher: Box<dyn AppLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn add_instance(mut self, instance: InstanceId) -> Self {
        self.instances.insert(instance);
        self
    }

    pub fn build(self) -> Result<WidgetHost> {
        self.config
            .validate()
            .context("invalid render configuration")?;
        let source = self.source.unwrap_or_else(|| {
            Arc::new(FsImageSource::new().with_max_decode_bytes(self.config.max_decode_bytes))
        });
        Ok(WidgetHost {
            config: self.config,
            paths: self.paths,
            store: self.store,
            source,
            clock: self.clock,
            launcher: self.launcher,
            instances: self.instances,
            sender: CommandSender::default(),
            watcher: None,
        })
    }
}

impl WidgetHost {
    pub fn builder(store: Arc<dyn StateStore>, paths: ImagePaths) -> WidgetHostBuilder {
        WidgetHostBuilder::new(store, paths)
    }

    pub fn instances(&self) -> Vec<InstanceId> {
        self.instances.iter().copied().collect()
    }

    pub fn add_instance(&mut self, instance: InstanceId) {
        if self.instances.insert(instance) {
            tracing::info!(instance = instance.0, "widget instance added");
        }
    }

    pub fn remove_instance(&mut self, instance: InstanceId) {
        if self.instances.remove(&instance) {
            tracing::info!(instance = instance.0, "widget instance removed");
        }
    }

    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    pub fn on_render_requested(&self, instance: InstanceId) {
        self.sender.send(HostCommand::Render(instance));
    }

    pub fn on_navigate(&self, direction: Direction) {
        self.sender.send(HostCommand::Navigate(direction));
    }

    pub fn on_day_selected(&self, day: u32, month: u32, year: i32) {
        self.sender.send(HostCommand::SelectDay { day, month, year });
    }

    pub fn pending(&self) -> usize {
        self.sender.queue.lock().len()
    }

    pub fn dequeue(&self) -> Option<HostCommand> {
        self.sender.queue.lock().pop_front()
    }

    pub fn state(&self) -> NavigationState {
        NavigationState::load(self.store.as_ref(), self.clock.today())
    }

    /// Performs queued commands in order until the queue is empty.
    pub fn drain(&mut self) -> Vec<CommandOutcome> {
        let mut outcomes = Vec::new();
        while let Some(command) = self.dequeue() {
            outcomes.push(self.perform(command));
        }
        outcomes
    }

    /// Store write failures are logged by the navigation layer; the moved
    /// state is still rendered on every targeted instance.
    #[instrument(skip(self))]
    pub fn perform(&mut self, command: HostCommand) -> CommandOutcome {
        let today = self.clock.today();
        let store = self.store.as_ref();
        let (state, targets) = match &command {
            HostCommand::Render(instance) => {
                let state = NavigationState::load(store, today);
                let targets = if self.instances.contains(instance) {
                    vec![*instance]
                } else {
                    tracing::warn!(instance = instance.0, "render requested for unknown instance");
                    Vec::new()
                };
                (state, targets)
            }
            HostCommand::Navigate(direction) => {
                (navigation::navigate(store, today, *direction), self.instances())
            }
            HostCommand::SelectDay { day, month, year } => {
                (self.select(*day, *month, *year), self.instances())
            }
            HostCommand::Refresh => (NavigationState::load(store, today), self.instances()),
        };

        let frames = targets
            .into_iter()
            .map(|instance| self.render_instance(instance, &state, today))
            .collect();
        CommandOutcome {
            command,
            state,
            frames,
        }
    }

    fn select(&self, day: u32, month: u32, year: i32) -> NavigationState {
        let today = self.clock.today();
        let store = self.store.as_ref();
        let valid = month <= 11 && chrono::NaiveDate::from_ymd_opt(year, month + 1, day).is_some();
        if !valid {
            tracing::warn!(day, month, year, "ignoring selection of a nonexistent date");
            return NavigationState::load(store, today);
        }

        let state = navigation::select_day(store, today, day);
        if let Some(launcher) = &self.launcher {
            let selection = DaySelection { day, month, year };
            if let Err(err) = launcher.launch(&selection) {
                tracing::warn!(?selection, "unable to open application: {err:#}");
            }
        }
        state
    }

    pub fn render_instance(
        &self,
        instance: InstanceId,
        state: &NavigationState,
        today: chrono::NaiveDate,
    ) -> RenderFrame {
        let renderer = GridRenderer::new(&self.config, &self.paths, self.source.as_ref());
        let grid = renderer.render(state, today);
        tracing::debug!(instance = instance.0, title = %grid.title, "instance rendered");
        RenderFrame { instance, grid }
    }

    /// Watches the image directories and queues a refresh whenever they change.
    pub fn watch(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let sender = self.sender.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if !event.kind.is_access() => {
                    tracing::debug!(?event, "activity images changed");
                    sender.request_refresh();
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "image watcher error"),
            }
        })?;
        for dir in self.paths.dirs() {
            if dir.is_dir() {
                watcher.watch(dir, RecursiveMode::NonRecursive)?;
            } else {
                tracing::debug!(path = %dir.display(), "image directory missing, not watched");
            }
        }
        self.watcher = Some(watcher);
        Ok(())
    }
}
