//! Instrument names available to generated code.
//!
//! The editor's sound map is keyed by name; only synths and drum-machine sample
//! banks are worth telling the model about.

use crate::lenient;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

const DRUM_MACHINE_TAG: &str = "drum-machines";

/// Synth and drum-machine names offered to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoundContext {
    #[serde(deserialize_with = "lenient::string_list")]
    pub synths: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub drum_machines: Vec<String>,
}

fn locale_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn clean_list<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = values
        .into_iter()
        .map(|value| value.as_ref().trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    let mut list: Vec<String> = unique.into_iter().collect();
    list.sort_by(|a, b| locale_order(a, b));
    list
}

impl SoundContext {
    pub fn new<I, S>(synths: I, drum_machines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            synths: clean_list(synths),
            drum_machines: clean_list(drum_machines),
        }
    }

    /// Trimmed, deduplicated and sorted copy.
    pub fn normalized(&self) -> Self {
        Self {
            synths: clean_list(&self.synths),
            drum_machines: clean_list(&self.drum_machines),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.synths.iter().all(|name| name.trim().is_empty())
            && self.drum_machines.iter().all(|name| name.trim().is_empty())
    }
}

/// `Synths: a, b` and `Drum machines: x` lines; `""` when both lists are empty.
pub fn format_sound_context(context: Option<&SoundContext>) -> String {
    let Some(context) = context else {
        return String::new();
    };
    let normalized = context.normalized();
    let mut lines = Vec::new();
    if !normalized.synths.is_empty() {
        lines.push(format!("Synths: {}", normalized.synths.join(", ")));
    }
    if !normalized.drum_machines.is_empty() {
        lines.push(format!("Drum machines: {}", normalized.drum_machines.join(", ")));
    }
    lines.join("\n")
}

/// Metadata the editor attaches to a registered sound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundData {
    #[serde(rename = "type", deserialize_with = "lenient::opt_string")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundEntry {
    #[serde(deserialize_with = "lenient::opt_object")]
    pub data: Option<SoundData>,
}

impl SoundEntry {
    pub fn new(kind: &str, tag: Option<&str>) -> Self {
        Self {
            data: Some(SoundData {
                kind: Some(kind.to_string()),
                tag: tag.map(str::to_string),
            }),
        }
    }
}

/// Classify a sound map into synths and drum machines. Names starting with `_`
/// are internal and skipped.
pub fn build_sound_context_from_map(sounds: &BTreeMap<String, SoundEntry>) -> SoundContext {
    let mut synths = Vec::new();
    let mut drum_machines = Vec::new();

    for (name, entry) in sounds {
        if name.is_empty() || name.starts_with('_') {
            continue;
        }
        let Some(data) = &entry.data else {
            continue;
        };
        match (data.kind.as_deref(), data.tag.as_deref()) {
            (Some("synth" | "soundfont"), _) => synths.push(name.as_str()),
            (Some("sample"), Some(DRUM_MACHINE_TAG)) => drum_machines.push(name.as_str()),
            _ => {}
        }
    }

    SoundContext {
        synths: clean_list(synths),
        drum_machines: clean_list(drum_machines),
    }
}

/// Exact case-insensitive match for `hint`, else the first name ending in `_hint`.
pub fn pick_sound_match<'a, S: AsRef<str>>(names: &'a [S], hint: &str) -> Option<&'a str> {
    let hint = hint.to_lowercase();
    let suffix = format!("_{hint}");
    let as_strs = || names.iter().map(|name| AsRef::<str>::as_ref(name));
    as_strs()
        .find(|name| name.to_lowercase() == hint)
        .or_else(|| as_strs().find(|name| name.to_lowercase().ends_with(&suffix)))
}

/// Handle returned by [`SoundRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&SoundContext) + Send>;

/// Owner of the live sound map.
///
/// Every mutation rebuilds the [`SoundContext`] snapshot; subscribers are
/// called only when the snapshot actually changes.
#[derive(Default)]
pub struct SoundRegistry {
    sounds: BTreeMap<String, SoundEntry>,
    snapshot: SoundContext,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl SoundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn context(&self) -> &SoundContext {
        &self.snapshot
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&SoundContext) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn register(&mut self, name: impl Into<String>, entry: SoundEntry) {
        self.sounds.insert(name.into(), entry);
        self.refresh();
    }

    pub fn remove(&mut self, name: &str) -> Option<SoundEntry> {
        let removed = self.sounds.remove(name);
        if removed.is_some() {
            self.refresh();
        }
        removed
    }

    pub fn replace_all(&mut self, sounds: BTreeMap<String, SoundEntry>) {
        self.sounds = sounds;
        self.refresh();
    }

    fn refresh(&mut self) {
        let next = build_sound_context_from_map(&self.sounds);
        if next == self.snapshot {
            return;
        }
        self.snapshot = next;
        for (_, listener) in &mut self.listeners {
            listener(&self.snapshot);
        }
    }
}

impl std::fmt::Debug for SoundRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundRegistry")
            .field("sounds", &self.sounds.len())
            .field("snapshot", &self.snapshot)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
