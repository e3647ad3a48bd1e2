use crate::Summary;
use std::fmt;
use std::str::FromStr;

/// Outcome of matching a held selection against a fresh snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionUpdate {
    NoSelection,
    /// The snapshot holds a deep-equal copy; nothing to redraw.
    Unchanged,
    Refreshed(Summary),
    /// No record with the selected key is left in the snapshot.
    Vanished,
}

/// What happens to a selection whose record left the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VanishedPolicy {
    /// Keep showing the last known version, flagged as stale.
    #[default]
    Retain,
    Clear,
}

impl VanishedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VanishedPolicy::Retain => "retain",
            VanishedPolicy::Clear => "clear",
        }
    }
}

impl fmt::Display for VanishedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VanishedPolicy {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "retain" | "keep" => Ok(VanishedPolicy::Retain),
            "clear" | "drop" => Ok(VanishedPolicy::Clear),
            other => Err(format!("Unknown vanished-selection policy: {other}")),
        }
    }
}

pub fn reconcile(snapshot: &[Summary], previous: Option<&Summary>) -> SelectionUpdate {
    let Some(previous) = previous else {
        return SelectionUpdate::NoSelection;
    };

    match snapshot.iter().find(|summary| summary.key == previous.key) {
        Some(current) if current == previous => SelectionUpdate::Unchanged,
        Some(current) => SelectionUpdate::Refreshed(current.clone()),
        None => SelectionUpdate::Vanished,
    }
}

impl SelectionUpdate {
    pub fn is_change(&self) -> bool {
        matches!(self, SelectionUpdate::Refreshed(_) | SelectionUpdate::Vanished)
    }

    pub fn apply(self, previous: Option<Summary>, policy: VanishedPolicy) -> Option<Summary> {
        match self {
            SelectionUpdate::NoSelection | SelectionUpdate::Unchanged => previous,
            SelectionUpdate::Refreshed(current) => Some(current),
            SelectionUpdate::Vanished => match policy {
                VanishedPolicy::Retain => previous,
                VanishedPolicy::Clear => None,
            },
        }
    }
}
