use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarMonth;
use crate::error::StoreError;
use crate::store::{StateKey, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Prev,
    Next,
}

/// Displayed month and selected day shared by every widget instance.
///
/// A `selected_day` of zero means nothing is selected. The selection is a bare
/// day number and follows the user across months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub displayed: CalendarMonth,
    pub selected_day: u32,
    pub initialized: bool,
}

impl NavigationState {
    pub fn new(displayed: CalendarMonth, selected_day: u32) -> Self {
        Self {
            displayed,
            selected_day,
            initialized: true,
        }
    }

    /// Reads the persisted state. The first call without a persisted record
    /// writes `today` as both the displayed month and the selected day; later
    /// calls substitute `today` only for individual fields that are missing.
    pub fn load(store: &dyn StateStore, today: NaiveDate) -> Self {
        let current = CalendarMonth::of(today);
        if !store.contains(StateKey::DisplayedMonth) {
            let state = Self::new(current, today.day());
            let initialized = match state.persist(store) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(%err, "unable to persist initial navigation state");
                    false
                }
            };
            tracing::info!(
                year = current.year(),
                month = current.number(),
                "initialized navigation state"
            );
            return Self {
                initialized,
                ..state
            };
        }

        let month = store.get_int(StateKey::DisplayedMonth, current.month0() as i32);
        let year = store.get_int(StateKey::DisplayedYear, current.year());
        let selected = store.get_int(StateKey::SelectedDay, today.day() as i32);
        let selected_day = match u32::try_from(selected) {
            Ok(day) if day <= 31 => day,
            _ => {
                tracing::warn!(selected, "ignoring out-of-range persisted selection");
                today.day()
            }
        };

        let mut displayed = CalendarMonth::normalized(year, i64::from(month));
        if !displayed.is_representable() {
            tracing::warn!(year, month, "ignoring out-of-range persisted month");
            displayed = current;
        }

        Self {
            displayed,
            selected_day,
            initialized: true,
        }
    }

    pub fn navigate(self, direction: Direction) -> Self {
        let displayed = match direction {
            Direction::Prev => self.displayed.retreat(),
            Direction::Next => self.displayed.advance(),
        };
        Self { displayed, ..self }
    }

    pub fn select(self, day: u32) -> Self {
        Self {
            selected_day: day,
            ..self
        }
    }

    pub fn is_selected(&self, day: u32) -> bool {
        self.selected_day > 0 && day == self.selected_day
    }

    fn persist(&self, store: &dyn StateStore) -> Result<(), StoreError> {
        store.set_many(&[
            (StateKey::DisplayedMonth, self.displayed.month0() as i32),
            (StateKey::DisplayedYear, self.displayed.year()),
            (StateKey::SelectedDay, self.selected_day as i32),
        ])
    }
}

pub fn set_displayed_month(store: &dyn StateStore, month: CalendarMonth) -> Result<(), StoreError> {
    store.set_many(&[
        (StateKey::DisplayedMonth, month.month0() as i32),
        (StateKey::DisplayedYear, month.year()),
    ])
}

pub fn set_selected_day(store: &dyn StateStore, day: u32) -> Result<(), StoreError> {
    store.set(StateKey::SelectedDay, day as i32)
}

/// Loads, moves one month in `direction`, persists and returns the new state.
///
/// A failed write is logged and the moved state is still returned, so the
/// caller can render it. The read-modify-write is not atomic against other
/// writers of the same store; callers serialize commands through a single writer.
pub fn navigate(store: &dyn StateStore, today: NaiveDate, direction: Direction) -> NavigationState {
    let next = NavigationState::load(store, today).navigate(direction);
    if let Err(err) = set_displayed_month(store, next.displayed) {
        tracing::warn!(%err, "unable to persist displayed month");
    }
    tracing::info!(
        ?direction,
        year = next.displayed.year(),
        month = next.displayed.number(),
        "navigated"
    );
    next
}

pub fn select_day(store: &dyn StateStore, today: NaiveDate, day: u32) -> NavigationState {
    let next = NavigationState::load(store, today).select(day);
    if let Err(err) = set_selected_day(store, day) {
        tracing::warn!(%err, day, "unable to persist selected day");
    }
    tracing::info!(day, "selected day");
    next
}
