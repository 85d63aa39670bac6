//! Prompt text sent to the model for edit, suggestion and compose requests.
//!
//! Builders only concatenate fixed instructions with whatever context the
//! editor supplied. Missing context drops its block; nothing here fails.

use crate::lenient;
use crate::sound::{format_sound_context, SoundContext};
use crate::tempo::{cps_to_cpm, format_tempo_value};
use serde::{Deserialize, Serialize};

/// System prompt for inline edits.
pub const EDIT_SYSTEM_PROMPT: &str = "You are a precise code editor for Strudel.";
/// System prompt for suggestion lists.
pub const SUGGESTIONS_SYSTEM_PROMPT: &str = "You return JSON only.";
/// System prompt for full compositions.
pub const COMPOSE_SYSTEM_PROMPT: &str = "You generate complete Strudel compositions.";

const UNTITLED: &str = "untitled";
const SOUND_HEADING: &str = "Available instruments (use exact names in s(...)):";

const HYDRA_CONTEXT: [&str; 3] = [
    "Hydra visuals: call `await initHydra()` at the top to enable.",
    "Hydra chains must end with `.out()` to render; they can live alongside Strudel patterns.",
    "Use `H(pattern)` to feed a Strudel pattern into Hydra; optional `initHydra({detectAudio:true})` or `{feedStrudel:1}`.",
];

const STRUCTURE_PREFERENCE: [&str; 4] = [
    "Preferred structure for full compositions:",
    "- name parts, then `let fullStack = stack(...)`",
    "- run `$: fullStack`",
    "- for visuals, you can reuse `fullStack.gain(0)` when needed",
];

/// A saved composition offered to the model as inspiration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextFile {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub content: String,
}

impl ContextFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Blank names become `untitled`; files with blank content are dropped.
pub fn normalize_context_files<I>(files: I) -> Vec<ContextFile>
where
    I: IntoIterator<Item = ContextFile>,
{
    files
        .into_iter()
        .filter(|file| !file.content.trim().is_empty())
        .map(|file| {
            let name = file.name.trim();
            let name = if name.is_empty() { UNTITLED } else { name };
            ContextFile::new(name, file.content)
        })
        .collect()
}

/// Generation toggles for compose requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposeOptions {
    #[serde(deserialize_with = "lenient::flag")]
    pub start_gains_at_zero: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub use_gain_sliders: bool,
}

pub fn hydra_context_block() -> String {
    HYDRA_CONTEXT.join("\n")
}

pub fn structure_preference_block() -> String {
    STRUCTURE_PREFERENCE.join("\n")
}

/// `Tempo: N cpm (M cps)` plus a `setcpm`/`setcps` hint; `""` without a finite tempo.
pub fn tempo_context_block(tempo_cps: Option<f64>) -> String {
    let Some(cps) = tempo_cps else {
        return String::new();
    };
    let (Some(cps_label), Some(cpm_label)) = (
        format_tempo_value(cps),
        cps_to_cpm(cps).and_then(format_tempo_value),
    ) else {
        return String::new();
    };
    format!(
        "Tempo: {cpm_label} cpm ({cps_label} cps)\nInclude setcpm({cpm_label}) or setcps({cps_label}) near the top."
    )
}

pub fn gain_guidance_block(options: ComposeOptions) -> String {
    let mut lines = Vec::new();
    if options.start_gains_at_zero {
        lines.push("Start all gain values at 0 so parts fade in safely.");
    }
    if options.use_gain_sliders {
        lines.push("When calling gain(...), wrap numeric values in slider(value, min, max, step).");
    }
    if lines.is_empty() {
        return String::new();
    }
    std::iter::once("Gain guidance:")
        .chain(lines)
        .collect::<Vec<_>>()
        .join("\n")
}

fn selection_block(selection: Option<&str>) -> String {
    match selection.filter(|selection| !selection.trim().is_empty()) {
        Some(selection) => format!("\n\nSelected section (if relevant):\n{selection}\n"),
        None => "\n\nSelected section: (none)\n".to_string(),
    }
}

/// Line accumulator with optional headed sections.
#[derive(Default)]
struct PromptLines(Vec<String>);

impl PromptLines {
    fn lines<'a>(mut self, lines: impl IntoIterator<Item = &'a str>) -> Self {
        self.0.extend(lines.into_iter().map(str::to_string));
        self
    }

    /// Blank line, optional heading, then `block`; skipped when `block` is empty.
    fn section(mut self, heading: Option<&str>, block: &str) -> Self {
        if block.is_empty() {
            return self;
        }
        self.0.push(String::new());
        if let Some(heading) = heading {
            self.0.push(heading.to_string());
        }
        self.0.push(block.to_string());
        self
    }

    fn finish(self) -> String {
        self.0.join("\n")
    }
}

/// User prompt for an inline edit of `code`.
pub fn build_edit_prompt(
    code: &str,
    prompt: &str,
    selection: Option<&str>,
    sound_context: Option<&SoundContext>,
) -> String {
    PromptLines::default()
        .lines([
            "You are editing a Strudel live-coding composition.",
            "Apply the user request by changing only the relevant part of the code.",
            "Keep everything else identical, including formatting and comments.",
            "Return ONLY the full updated code, without markdown or commentary.",
        ])
        .section(Some(SOUND_HEADING), &format_sound_context(sound_context))
        .section(Some("Hydra usage (brief):"), &hydra_context_block())
        .lines(["", "Full composition:", code, "", "User request:", prompt])
        .lines([selection_block(selection).as_str()])
        .finish()
}

/// User prompt asking for a JSON list of edit suggestions for `code`.
pub fn build_inline_suggestions_prompt(
    code: &str,
    selection: Option<&str>,
    sound_context: Option<&SoundContext>,
) -> String {
    PromptLines::default()
        .lines([
            "You suggest concise edit prompts for a Strudel live-coding composition.",
            "Return JSON only in the following shape:",
            r#"{"suggestions":[{"title":"...","prompt":"...","why":"..."}]}"#,
            "Provide 3-5 suggestions that are safe, musical, and easy to apply.",
            r#"Each "prompt" must be a direct edit instruction that can be applied as-is."#,
            r#"Each "why" should be a short reason for the tweak (one sentence)."#,
            "Do not mention AI or the model.",
        ])
        .section(Some(SOUND_HEADING), &format_sound_context(sound_context))
        .section(Some("Composition structure:"), &structure_preference_block())
        .section(Some("Hydra usage (brief):"), &hydra_context_block())
        .lines(["", "Current composition:", code, ""])
        .lines([selection_block(selection).as_str()])
        .finish()
}

/// `[1] name` headed file bodies, or `(none)`.
fn context_files_block(files: &[ContextFile]) -> String {
    if files.is_empty() {
        return "(none)".to_string();
    }
    files
        .iter()
        .enumerate()
        .map(|(index, file)| format!("[{}] {}\n{}", index + 1, file.name, file.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// User prompt for a new composition.
pub fn build_compose_prompt(
    prompt: &str,
    context_files: &[ContextFile],
    sound_context: Option<&SoundContext>,
    tempo_cps: Option<f64>,
    options: ComposeOptions,
) -> String {
    let files = normalize_context_files(context_files.iter().cloned());

    PromptLines::default()
        .lines([
            "You are generating a full Strudel live-coding composition.",
            "Return only the complete composition code, without markdown or commentary.",
            "Use the user request, and optionally draw inspiration from context compositions.",
        ])
        .section(Some(SOUND_HEADING), &format_sound_context(sound_context))
        .section(Some("Tempo:"), &tempo_context_block(tempo_cps))
        .section(None, &gain_guidance_block(options))
        .section(Some("Composition structure:"), &structure_preference_block())
        .section(Some("Hydra usage (brief):"), &hydra_context_block())
        .lines(["", "User request:", prompt.trim(), "", "Context compositions:"])
        .lines([context_files_block(&files).as_str()])
        .finish()
}
