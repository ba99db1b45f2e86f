//! Id-keyed catalog of stats, groups and threads.
//!
//! Lookups of unknown ids answer with a default descriptor instead of
//! failing, so stale ids held by a viewer never crash it.

use super::snapshot::MetadataSnapshot;
use crate::store::SampleKind;
use crate::utils::config::{
    FRAME_TIME_STAT_ID, GAME_THREAD_PATTERN, GROUP_NAME_PREFIX, MAX_SECONDS_PER_CYCLE, NO_GROUP_ID,
    NO_GROUP_NAME, OBJECTS_GROUP_NAME, RENDER_THREAD_PATTERNS, SELF_STAT_ID, SELF_STAT_NAME,
    STAT_NAME_PREFIX, THREADS_GROUP_NAME, THREAD_ROOT_STAT_ID, THREAD_ROOT_STAT_NAME,
};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;

const UNKNOWN_THREAD: &str = "Unknown";

/// One stat's metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatDescriptor {
    pub id: u32,
    pub name: String,
    pub group_id: u32,
    pub kind: SampleKind,
    /// Short (code) name, when it differs from the display name
    pub alias: Option<String>,
}

/// One group's metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDescriptor {
    pub id: u32,
    pub name: String,
    /// Member stat ids in registration order
    pub stats: Vec<u32>,
}

/// Catalog of stats, groups and threads for one capture generation
#[derive(Debug, Clone)]
pub struct StatMetadataRegistry {
    stats: HashMap<u32, StatDescriptor>,
    groups: HashMap<u32, GroupDescriptor>,
    threads: HashMap<u32, String>,
    thread_stats: HashMap<u32, u32>,
    names: HashMap<String, u32>,
    game_thread_id: Option<u32>,
    render_thread_ids: Vec<u32>,
    seconds_per_cycle: f64,
    snapshot_size: usize,
    default_stat: StatDescriptor,
    default_group: GroupDescriptor,
}

impl Default for StatMetadataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StatMetadataRegistry {
    /// Create a registry holding only the reserved group and stats
    pub fn new() -> Self {
        let mut registry = Self {
            stats: HashMap::new(),
            groups: HashMap::new(),
            threads: HashMap::new(),
            thread_stats: HashMap::new(),
            names: HashMap::new(),
            game_thread_id: None,
            render_thread_ids: Vec::new(),
            seconds_per_cycle: 0.0,
            snapshot_size: 0,
            default_stat: StatDescriptor {
                id: u32::MAX,
                name: "(Stat-Default)".to_string(),
                group_id: NO_GROUP_ID,
                kind: SampleKind::Invalid,
                alias: None,
            },
            default_group: GroupDescriptor {
                id: u32::MAX,
                name: "(Group-Default)".to_string(),
                stats: Vec::new(),
            },
        };

        registry.register_group(NO_GROUP_ID, NO_GROUP_NAME);
        registry.register_stat(SELF_STAT_ID, NO_GROUP_ID, SELF_STAT_NAME, SampleKind::HierarchicalTime, None);
        registry.register_stat(
            THREAD_ROOT_STAT_ID,
            NO_GROUP_ID,
            THREAD_ROOT_STAT_NAME,
            SampleKind::HierarchicalTime,
            None,
        );
        registry
    }

    /// Build a registry from a metadata snapshot
    ///
    /// **Public** - main entry point for metadata ingestion
    pub fn from_snapshot(snapshot: &MetadataSnapshot) -> Self {
        let mut registry = Self::new();
        registry.apply_snapshot(snapshot);
        registry
    }

    /// Replace this registry wholesale when the snapshot is larger
    ///
    /// # Returns
    /// true if the registry was replaced
    pub fn replace_if_larger(&mut self, snapshot: &MetadataSnapshot) -> bool {
        if snapshot.size() <= self.snapshot_size {
            return false;
        }
        debug!(
            "Replacing metadata ({} -> {} descriptors)",
            self.snapshot_size,
            snapshot.size()
        );
        let seconds_per_cycle = self.seconds_per_cycle;
        *self = Self::from_snapshot(snapshot);
        if !is_valid_seconds_per_cycle(self.seconds_per_cycle) {
            self.seconds_per_cycle = seconds_per_cycle;
        }
        true
    }

    /// Register every descriptor of a snapshot, then classify threads
    pub fn apply_snapshot(&mut self, snapshot: &MetadataSnapshot) {
        if is_valid_seconds_per_cycle(snapshot.seconds_per_cycle) {
            self.seconds_per_cycle = snapshot.seconds_per_cycle;
        }

        for group in &snapshot.groups {
            let name = strip_prefix(&group.name, GROUP_NAME_PREFIX);
            self.register_group(group.id, name);
        }

        for stat in &snapshot.stats {
            let short_name = strip_prefix(&stat.name, STAT_NAME_PREFIX);
            let display = match stat.description.as_deref() {
                Some(description) if !description.is_empty() => strip_prefix(description, STAT_NAME_PREFIX),
                _ => short_name,
            };
            let group_id = match stat.group_id {
                Some(group_id) => group_id,
                None => self.group_for_ungrouped(display),
            };
            let alias = (stat.name != display).then_some(stat.name.as_str());
            self.register_stat(stat.id, group_id, display, stat.kind, alias);
        }

        for thread in &snapshot.threads {
            let stat_id = thread.stat_id.or_else(|| self.stat_by_name(&thread.name));
            self.register_thread(thread.thread_id, &thread.name, stat_id);
        }

        self.snapshot_size = self.snapshot_size.max(snapshot.size());
        self.classify_threads();
    }

    /// Register or rename a group
    pub fn register_group(&mut self, id: u32, name: &str) {
        self.groups
            .entry(id)
            .and_modify(|group| group.name = name.to_string())
            .or_insert_with(|| GroupDescriptor {
                id,
                name: name.to_string(),
                stats: Vec::new(),
            });
    }

    /// Register a stat
    ///
    /// Idempotent: re-registering an id only updates its display name and group.
    pub fn register_stat(
        &mut self,
        id: u32,
        group_id: u32,
        name: &str,
        kind: SampleKind,
        alias: Option<&str>,
    ) {
        let previous_group = self.stats.get(&id).map(|stat| stat.group_id);
        match self.stats.get_mut(&id) {
            Some(stat) => {
                stat.name = name.to_string();
                stat.group_id = group_id;
                if alias.is_some() {
                    stat.alias = alias.map(str::to_string);
                }
            }
            None => {
                self.stats.insert(
                    id,
                    StatDescriptor {
                        id,
                        name: name.to_string(),
                        group_id,
                        kind,
                        alias: alias.map(str::to_string),
                    },
                );
            }
        }

        if previous_group != Some(group_id) {
            if let Some(old) = previous_group.and_then(|g| self.groups.get_mut(&g)) {
                old.stats.retain(|member| *member != id);
            }
            if let Some(group) = self.groups.get_mut(&group_id) {
                group.stats.push(id);
            }
        }

        self.names.insert(name.to_string(), id);
        if let Some(alias) = alias {
            self.names.insert(alias.to_string(), id);
            self.names.insert(strip_prefix(alias, STAT_NAME_PREFIX).to_string(), id);
        }
    }

    /// Id of the stat called `name`, registering a new ungrouped stat when unknown
    ///
    /// Raw streams may reference stats by name before any metadata names them.
    pub fn intern_stat(&mut self, name: &str, kind: SampleKind) -> u32 {
        if let Some(id) = self.stat_by_name(name) {
            return id;
        }
        let display = strip_prefix(name, STAT_NAME_PREFIX);
        let id = self.next_stat_id();
        let group_id = self.group_for_ungrouped(display);
        let alias = (name != display).then_some(name);
        self.register_stat(id, group_id, display, kind, alias);
        id
    }

    /// Register a thread's description and, optionally, the stat representing it
    pub fn register_thread(&mut self, thread_id: u32, name: &str, stat_id: Option<u32>) {
        self.threads.insert(thread_id, name.to_string());
        if let Some(stat_id) = stat_id {
            self.thread_stats.insert(thread_id, stat_id);
        }
    }

    /// Derive game and render thread ids from the "Threads" group
    ///
    /// Heuristic: display names are matched against literal substrings, so
    /// custom thread names can be misclassified.
    pub fn classify_threads(&mut self) {
        self.game_thread_id = None;
        self.render_thread_ids.clear();

        let Some(threads_group) = self.group_by_name(THREADS_GROUP_NAME) else {
            return;
        };
        let mut members = threads_group.stats.clone();
        members.sort_unstable();

        for stat_id in members {
            let name = self.stat(stat_id).name.clone();
            let thread_id = self.thread_for_stat(stat_id);

            if name.contains(GAME_THREAD_PATTERN) {
                if self.game_thread_id.is_none() {
                    self.game_thread_id = Some(thread_id);
                }
            } else if RENDER_THREAD_PATTERNS.iter().any(|p| name.contains(p))
                && !self.render_thread_ids.contains(&thread_id)
            {
                self.render_thread_ids.push(thread_id);
            }
        }

        debug!(
            "Classified threads: game={:?}, render={:?}",
            self.game_thread_id, self.render_thread_ids
        );
    }

    /// `cycles * secondsPerCycle * 1000`
    pub fn convert_cycles_to_ms(&self, cycles: f64) -> f64 {
        cycles * self.seconds_per_cycle * 1000.0
    }

    pub fn seconds_per_cycle(&self) -> f64 {
        self.seconds_per_cycle
    }

    /// Update the cycle-to-seconds factor
    ///
    /// Only finite values in `(0, MAX_SECONDS_PER_CYCLE]` are accepted; anything
    /// else is logged and ignored.
    ///
    /// # Returns
    /// true if the factor was updated
    pub fn set_seconds_per_cycle(&mut self, seconds_per_cycle: f64) -> bool {
        if !is_valid_seconds_per_cycle(seconds_per_cycle) {
            warn!(
                "Ignoring invalid seconds per cycle {} (keeping {})",
                seconds_per_cycle, self.seconds_per_cycle
            );
            return false;
        }
        self.seconds_per_cycle = seconds_per_cycle;
        true
    }

    /// Stat descriptor, or the default descriptor for unknown ids
    pub fn stat(&self, id: u32) -> &StatDescriptor {
        self.stats.get(&id).unwrap_or(&self.default_stat)
    }

    /// Group descriptor, or the default descriptor for unknown ids
    pub fn group(&self, id: u32) -> &GroupDescriptor {
        self.groups.get(&id).unwrap_or(&self.default_group)
    }

    /// Owning group of a stat
    pub fn group_of_stat(&self, stat_id: u32) -> &GroupDescriptor {
        self.group(self.stat(stat_id).group_id)
    }

    pub fn contains_stat(&self, id: u32) -> bool {
        self.stats.contains_key(&id)
    }

    /// Stat id by display, short or alias name
    pub fn stat_by_name(&self, name: &str) -> Option<u32> {
        self.names
            .get(name)
            .or_else(|| self.names.get(strip_prefix(name, STAT_NAME_PREFIX)))
            .copied()
    }

    pub fn group_by_name(&self, name: &str) -> Option<&GroupDescriptor> {
        self.groups.values().find(|group| group.name == name)
    }

    /// Thread description, or "Unknown"
    pub fn thread_description(&self, thread_id: u32) -> &str {
        self.threads
            .get(&thread_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_THREAD)
    }

    pub fn contains_thread(&self, thread_id: u32) -> bool {
        self.threads.contains_key(&thread_id)
    }

    /// Stat representing a thread, if one is mapped
    pub fn thread_stat_id(&self, thread_id: u32) -> Option<u32> {
        self.thread_stats.get(&thread_id).copied()
    }

    /// Stat for a thread-root sample, mapping unmapped threads on first use
    ///
    /// Thread ids and stat ids are separate namespaces, so an unmapped thread
    /// gets a "Threads" stat named after its description: an existing one of
    /// that name, or a newly allocated id.
    pub fn thread_root_stat(&mut self, thread_id: u32) -> u32 {
        if let Some(stat_id) = self.thread_stat_id(thread_id) {
            return stat_id;
        }

        let name = match self.threads.get(&thread_id) {
            Some(description) => description.clone(),
            None => format!("Thread {}", thread_id),
        };
        let group_id = self.group_id_for(THREADS_GROUP_NAME);
        let existing = self
            .group(group_id)
            .stats
            .iter()
            .copied()
            .find(|stat_id| self.stat(*stat_id).name == name);

        let stat_id = match existing {
            Some(stat_id) => stat_id,
            None => {
                let stat_id = self.next_stat_id();
                let shadowed = self.names.get(&name).copied();
                self.register_stat(stat_id, group_id, &name, SampleKind::HierarchicalTime, None);
                if let Some(previous) = shadowed {
                    self.names.insert(name.clone(), previous);
                }
                stat_id
            }
        };

        debug!("Mapped thread {} ({}) to stat {}", thread_id, name, stat_id);
        self.thread_stats.insert(thread_id, stat_id);
        self.classify_threads();
        stat_id
    }

    pub fn game_thread_id(&self) -> Option<u32> {
        self.game_thread_id
    }

    pub fn render_thread_ids(&self) -> &[u32] {
        &self.render_thread_ids
    }

    /// True for the classified game thread, or a thread described as one
    pub fn is_game_thread(&self, thread_id: u32) -> bool {
        self.game_thread_id == Some(thread_id)
            || self.thread_description(thread_id).contains(GAME_THREAD_PATTERN)
    }

    pub fn num_stats(&self) -> usize {
        self.stats.len()
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn stats(&self) -> impl Iterator<Item = &StatDescriptor> {
        self.stats.values()
    }

    fn thread_for_stat(&self, stat_id: u32) -> u32 {
        self.thread_stats
            .iter()
            .find(|(_, stat)| **stat == stat_id)
            .map(|(thread, _)| *thread)
            .unwrap_or(stat_id)
    }

    /// First unused stat id above the reserved ones
    fn next_stat_id(&self) -> u32 {
        self.stats
            .keys()
            .max()
            .map_or(0, |max| max + 1)
            .max(FRAME_TIME_STAT_ID + 1)
    }

    /// "Threads" for names shaped like `..Thread_.._0..`, "Objects" otherwise
    fn group_for_ungrouped(&mut self, name: &str) -> u32 {
        let is_thread = name
            .find("Thread_")
            .is_some_and(|pos| name[pos + "Thread_".len()..].contains("_0"));
        let group_name = if is_thread { THREADS_GROUP_NAME } else { OBJECTS_GROUP_NAME };
        self.group_id_for(group_name)
    }

    /// Id of the group called `group_name`, created on demand
    fn group_id_for(&mut self, group_name: &str) -> u32 {
        if let Some(group) = self.group_by_name(group_name) {
            return group.id;
        }
        let id = self.groups.keys().max().map_or(NO_GROUP_ID + 1, |max| max + 1);
        self.register_group(id, group_name);
        id
    }
}

fn is_valid_seconds_per_cycle(seconds_per_cycle: f64) -> bool {
    seconds_per_cycle.is_finite() && seconds_per_cycle > 0.0 && seconds_per_cycle <= MAX_SECONDS_PER_CYCLE
}

fn strip_prefix<'a>(name: &'a str, prefix: &str) -> &'a str {
    name.strip_prefix(prefix).unwrap_or(name)
}
