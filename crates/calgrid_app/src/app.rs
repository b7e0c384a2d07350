use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use calgrid_core::availability::ImagePaths;
use calgrid_core::config::validate_title_format;
use calgrid_core::{Direction, JsonFileStore, RenderConfig, ThumbnailMode};
use calgrid_host::{CommandLauncher, CommandOutcome, HostCommand, InstanceId, WidgetHost};
use tracing::{info, warn};

use crate::text::render_text;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) image_root: PathBuf,
    pub(crate) state_file: PathBuf,
    pub(crate) render: RenderConfig,
    pub(crate) output: OutputFormat,
    pub(crate) launch_command: Option<PathBuf>,
    pub(crate) instances: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            image_root: PathBuf::from("activity"),
            state_file: PathBuf::from(".calgrid").join("state.json"),
            render: RenderConfig::default(),
            output: OutputFormat::Text,
            launch_command: None,
            instances: 1,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok());
        config.render.validate().context("invalid render settings")?;
        Ok(config)
    }

    /// Builds a config from `lookup`, keeping defaults for unset or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(root) = lookup("CALGRID_IMAGE_ROOT") {
            config.image_root = PathBuf::from(root);
        }
        if let Some(file) = lookup("CALGRID_STATE_FILE") {
            config.state_file = PathBuf::from(file);
        }
        if let Some(value) = parse_var::<usize>(&lookup, "CALGRID_MAX_ITEMS") {
            config.render.max_items = value;
        }
        if let Some(value) = parse_var::<u64>(&lookup, "CALGRID_MAX_BYTES") {
            let candidate = RenderConfig {
                max_total_bytes: value,
                ..config.render.clone()
            };
            match candidate.validate() {
                Ok(()) => config.render = candidate,
                Err(err) => warn!(%err, "ignoring CALGRID_MAX_BYTES"),
            }
        }
        if let Some(value) = parse_var::<u32>(&lookup, "CALGRID_TARGET_SIZE") {
            if value > 0 {
                config.render.target_size = value;
            }
        }
        if let Some(value) = parse_var::<u64>(&lookup, "CALGRID_MAX_DECODE_BYTES") {
            if value > 0 {
                config.render.max_decode_bytes = value;
            }
        }
        if let Some(mode) = lookup("CALGRID_THUMBNAILS") {
            match mode.trim().to_ascii_lowercase().as_str() {
                "attach" => config.render.thumbnails = ThumbnailMode::Attach,
                "marker" => config.render.thumbnails = ThumbnailMode::MarkerOnly,
                other => warn!(value = other, "unknown CALGRID_THUMBNAILS mode"),
            }
        }
        if let Some(format) = lookup("CALGRID_TITLE_FORMAT") {
            match validate_title_format(&format) {
                Ok(()) => config.render.title_format = format,
                Err(err) => warn!(%err, "ignoring CALGRID_TITLE_FORMAT"),
            }
        }
        if let Some(output) = lookup("CALGRID_OUTPUT") {
            match output.trim().to_ascii_lowercase().as_str() {
                "text" => config.output = OutputFormat::Text,
                "json" => config.output = OutputFormat::Json,
                other => warn!(value = other, "unknown CALGRID_OUTPUT format"),
            }
        }
        if let Some(command) = lookup("CALGRID_LAUNCH_CMD") {
            if !command.trim().is_empty() {
                config.launch_command = Some(PathBuf::from(command.trim()));
            }
        }
        if let Some(value) = parse_var::<u32>(&lookup, "CALGRID_INSTANCES") {
            config.instances = value.max(1);
        }
        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

/// One step requested on the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CliCommand {
    Render(Option<u32>),
    Navigate(Direction),
    /// Selects a day of the displayed month.
    Select(u32),
    Watch,
}

pub fn parse_commands(args: &[String]) -> Result<Vec<CliCommand>> {
    let mut commands = Vec::new();
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        let command = match arg.as_str() {
            "render" => {
                let instance = match iter.peek().map(|next| next.parse::<u32>()) {
                    Some(Ok(id)) => {
                        iter.next();
                        Some(id)
                    }
                    _ => None,
                };
                CliCommand::Render(instance)
            }
            "next" => CliCommand::Navigate(Direction::Next),
            "prev" => CliCommand::Navigate(Direction::Prev),
            "select" => {
                let Some(day) = iter.next() else {
                    bail!("`select` needs a day number");
                };
                let day = day
                    .parse::<u32>()
                    .with_context(|| format!("invalid day `{day}`"))?;
                CliCommand::Select(day)
            }
            "watch" => CliCommand::Watch,
            other => bail!("unknown command `{other}`; expected render, next, prev, select or watch"),
        };
        commands.push(command);
    }
    if commands.is_empty() {
        commands.push(CliCommand::Render(None));
    }
    Ok(commands)
}

fn build_host(config: &AppConfig) -> Result<WidgetHost> {
    info!(
        images = %config.image_root.display(),
        state = %config.state_file.display(),
        "starting calendar widget host"
    );
    let store = Arc::new(JsonFileStore::open(&config.state_file));
    let mut builder = WidgetHost::builder(store, ImagePaths::under(&config.image_root))
        .with_config(config.render.clone());
    if let Some(program) = &config.launch_command {
        builder = builder.with_launcher(Box::new(CommandLauncher::new(program)));
    }
    for id in 1..=config.instances {
        builder = builder.add_instance(InstanceId(id));
    }
    builder.build().context("failed to initialize widget host")
}

pub fn run(config: AppConfig, args: Vec<String>) -> Result<()> {
    let commands = parse_commands(&args)?;
    let mut host = build_host(&config)?;
    let stdout = std::io::stdout();

    for command in commands {
        match command {
            CliCommand::Render(Some(id)) => host.on_render_requested(InstanceId(id)),
            CliCommand::Render(None) => host.sender().send(HostCommand::Refresh),
            CliCommand::Navigate(direction) => host.on_navigate(direction),
            CliCommand::Select(day) => {
                let displayed = host.state().displayed;
                host.on_day_selected(day, displayed.month0(), displayed.year());
            }
            CliCommand::Watch => {
                emit(&mut stdout.lock(), config.output, &host.drain())?;
                host.watch().context("failed to watch image directories")?;
                host.sender().send(HostCommand::Refresh);
                loop {
                    let outcomes = host.drain();
                    if !outcomes.is_empty() {
                        emit(&mut stdout.lock(), config.output, &outcomes)?;
                    }
                    std::thread::sleep(Duration::from_millis(250));
                }
            }
        }
        // Each command is performed before the next one reads the displayed month.
        let outcomes = host.drain();
        emit(&mut stdout.lock(), config.output, &outcomes)?;
    }
    Ok(())
}

fn emit(out: &mut impl Write, format: OutputFormat, outcomes: &[CommandOutcome]) -> Result<()> {
    for outcome in outcomes {
        match format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, outcome)?;
                writeln!(out)?;
            }
            OutputFormat::Text => {
                for frame in &outcome.frames {
                    writeln!(out, "# instance {}", frame.instance.0)?;
                    write!(out, "{}", render_text(&frame.grid))?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}
