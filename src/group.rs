//! Logical backlight groups and their state machine
//!
//! Each group fronts one virtual LED and owns the modules behind it. Three
//! triggers feed the same transition logic: UI events from the virtual
//! LED, the periodic master poll, and hotplug membership changes. All
//! three converge on `last_level`, the most recently *applied* level, and
//! every path is a no-op when the computed level already equals it, so no
//! interleaving produces redundant hardware writes.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use qmk_via::{Channel, Target};

use crate::devices::{category_of, Category};
use crate::level::Level;

/// Members a group will track at most.
pub const MAX_GROUP_MEMBERS: usize = 16;

/// How discovered modules are partitioned into virtual LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    /// One LED driving every module.
    Unified,
    /// One LED per module category.
    Separate,
}

/// Which members receive a hardware write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Everyone. Used when the change came from the UI layer, which is
    /// not a member.
    Broadcast,
    /// Skip the master; it already holds the true value.
    ExcludeMaster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Uninitialized,
    Active,
    Closed,
}

/// One logical backlight: a virtual LED name plus the modules behind it.
#[derive(Debug)]
pub struct Group {
    name: String,
    /// None in unified mode: the group takes every category.
    category: Option<Category>,
    members: Vec<Target>,
    /// Polling reference for hardware-side changes.
    master: Target,
    last_level: Level,
    pending: Option<(Level, Instant)>,
    debounce: Duration,
    max_brightness: u32,
    state: GroupState,
}

/// Virtual LED name for a group. UPower only adopts LEDs whose name
/// contains "kbd_backlight", so every variant keeps that suffix.
fn led_name(category: Option<Category>) -> String {
    match category {
        None | Some(Category::Keyboard) => "framework::kbd_backlight".to_string(),
        Some(other) => format!("framework_{}::kbd_backlight", other.as_str()),
    }
}

/// Master election: prefer a keyboard-category member, else the first in
/// scan order.
fn elect_master(members: &[Target]) -> Target {
    members
        .iter()
        .find(|t| category_of(t.pid) == Category::Keyboard)
        .unwrap_or(&members[0])
        .clone()
}

/// Partition discovered targets into groups. Only non-empty groups are
/// created: one in unified mode, up to four (one per category) in
/// separate mode.
pub fn group_targets(
    targets: &[Target],
    mode: GroupMode,
    debounce: Duration,
    max_brightness: u32,
) -> Vec<Group> {
    let mut groups = Vec::new();

    let mut push = |category: Option<Category>, mut members: Vec<Target>| {
        if members.is_empty() {
            return;
        }
        if members.len() > MAX_GROUP_MEMBERS {
            warn!(
                "{}: capping members at {MAX_GROUP_MEMBERS} (found {})",
                led_name(category),
                members.len()
            );
            members.truncate(MAX_GROUP_MEMBERS);
        }
        let master = elect_master(&members);
        groups.push(Group {
            name: led_name(category),
            category,
            members,
            master,
            last_level: Level::OFF,
            pending: None,
            debounce,
            max_brightness,
            state: GroupState::Uninitialized,
        });
    };

    match mode {
        GroupMode::Unified => push(None, targets.to_vec()),
        GroupMode::Separate => {
            for category in Category::ALL {
                let members: Vec<Target> = targets
                    .iter()
                    .filter(|t| category_of(t.pid) == category)
                    .cloned()
                    .collect();
                push(Some(category), members);
            }
        }
    }

    groups
}

impl Group {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Target] {
        &self.members
    }

    pub fn master(&self) -> &Target {
        &self.master
    }

    pub fn last_level(&self) -> Level {
        self.last_level
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    pub fn activate(&mut self) {
        self.state = GroupState::Active;
    }

    pub fn close(&mut self) {
        self.state = GroupState::Closed;
    }

    /// Does a module of this category belong to this group?
    pub fn routes(&self, category: Category) -> bool {
        self.category.map_or(true, |c| c == category)
    }

    /// Write a level to the members selected by `policy` and record it as
    /// applied. Per-member failures are transient: logged, skipped, and
    /// healed by the next trigger. Callers gate on level inequality; this
    /// method itself always writes.
    pub fn apply(&mut self, level: Level, policy: Propagation, chan: &dyn Channel) {
        let pct = level.hardware_percent();
        debug!(
            "{}: apply level {level} ({pct}%) {policy:?} to {} member(s)",
            self.name,
            self.members.len()
        );
        for member in &self.members {
            if policy == Propagation::ExcludeMaster && *member == self.master {
                continue;
            }
            if let Err(e) = chan.set_percent(member, pct) {
                debug!("{}: set {member} failed: {e}", self.name);
            }
        }
        self.last_level = level;
    }

    /// A raw value read from the virtual LED. Without debouncing, returns
    /// the level to broadcast now (None when unchanged). With debouncing,
    /// arms/refreshes the pending level and returns None; the coalesced
    /// value comes out of [`take_expired_pending`](Self::take_expired_pending).
    pub fn handle_ui_event(&mut self, raw: u32, now: Instant) -> Option<Level> {
        if self.state != GroupState::Active {
            return None;
        }
        let level = Level::from_ui(raw, self.max_brightness);
        if self.debounce.is_zero() {
            return (level != self.last_level).then_some(level);
        }
        self.pending = Some((level, now + self.debounce));
        None
    }

    /// The debounced level, once its window lapsed with no further
    /// events. Equal levels are swallowed here, so a burst that ends
    /// where it started writes nothing.
    pub fn take_expired_pending(&mut self, now: Instant) -> Option<Level> {
        match self.pending {
            Some((level, deadline)) if deadline <= now => {
                self.pending = None;
                (level != self.last_level).then_some(level)
            }
            _ => None,
        }
    }

    /// Deadline of the armed debounce window, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, deadline)| deadline)
    }

    /// A percent read off the master. Some(level) means hardware-side
    /// drift (e.g. the brightness hotkey) that the rest of the group and
    /// the virtual LED must follow.
    pub fn handle_poll(&self, pct: u8) -> Option<Level> {
        if self.state != GroupState::Active {
            return None;
        }
        let level = Level::from_percent(pct);
        (level != self.last_level).then_some(level)
    }

    /// Replace membership. `last_level` is untouched: new members get
    /// synchronized to it by the reconciler, never the other way round.
    /// The master is re-elected because targets are ephemeral: even a
    /// surviving vid:pid may sit behind a new device node after a
    /// reconnect.
    pub fn set_members(&mut self, members: Vec<Target>) {
        if !members.is_empty() {
            self.master = elect_master(&members);
        }
        self.members = members;
    }
}
