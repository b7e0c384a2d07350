pub mod host;
pub mod launcher;

pub use crate::host::{
    CommandOutcome, CommandSender, HostCommand, InstanceId, RenderFrame, WidgetHost,
    WidgetHostBuilder,
};
pub use crate::launcher::{AppLauncher, CommandLauncher, DaySelection};
