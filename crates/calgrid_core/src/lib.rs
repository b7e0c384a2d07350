pub mod availability;
pub mod calendar;
pub mod config;
pub mod decode;
pub mod error;
pub mod grid;
pub mod navigation;
pub mod selector;
pub mod store;
pub mod style;
pub mod thumbnail;

pub use crate::calendar::{CalendarMonth, Clock, FixedClock, SystemClock};
pub use crate::config::{RenderConfig, ThumbnailMode};
pub use crate::grid::{GridDescriptor, GridRenderer};
pub use crate::navigation::{Direction, NavigationState};
pub use crate::store::{JsonFileStore, MemoryStore, StateKey, StateStore};
