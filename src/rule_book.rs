//! Pure classification of block/child names into merge strategies.
//!
//! Every function here is a total, side-effect-free query over the constant
//! sets below. None of it touches the parse tree or does any I/O; that
//! separation is what lets the merger stay a thin state machine over these
//! decisions.

use std::sync::OnceLock;

use regex::Regex;

/// How a top-level block in a file should be treated when the same name
/// appears in both base and a mod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevelStrategy {
    /// Unique names accumulate; same-named blocks are replaced wholesale,
    /// highest-priority mod wins.
    AtomicAccumulate,
    /// The block's children are merged per [`child_strategy`].
    MergeableContainer,
}

/// How a named child of a mergeable container should be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStrategy {
    /// Union the list items, preserving base order then first-seen mod order.
    AccumulateList,
    /// Last mod that changed it wins; never field-by-field blended.
    ReplaceWhole,
    /// Recurse into the child applying these same rules.
    Recursive,
}

fn event_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_]+\.\d+$").unwrap())
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap())
}

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").unwrap())
}

/// `every_*`, `random_*`, `ordered_*`, `any_*`.
fn iterator_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"^every_[a-z_]+$",
            r"^random_[a-z_]+$",
            r"^ordered_[a-z_]+$",
            r"^any_[a-z_]+$",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn is_iterator_name(name: &str) -> bool {
    iterator_res().iter().any(|re| re.is_match(name))
}

pub fn is_event_name(name: &str) -> bool {
    event_re().is_match(name)
}

pub fn is_date_name(name: &str) -> bool {
    date_re().is_match(name)
}

pub fn is_bare_integer_name(name: &str) -> bool {
    integer_re().is_match(name)
}

/// Children that may accumulate as bags of identifiers: calls to other
/// on_actions, events to fire, random pools, first-valid lists.
pub const SAFE_LIST_BLOCKS: &[&str] = &[
    "on_actions",
    "events",
    "random_events",
    "random_on_actions",
    "first_valid",
];

/// Logical/atomic children that must never be field-by-field mixed across
/// mods: trigger/effect contexts, weights, event interior blocks, decision
/// and interaction hooks, scheme/activity hooks, GUI widgets, and entity
/// definitions.
pub const NO_MERGE_BLOCKS: &[&str] = &[
    // logical blocks
    "trigger",
    "limit",
    "effect",
    "immediate",
    "after",
    "on_trigger_fail",
    // weights and modifiers
    "modifier",
    "ai_will_do",
    "ai_check_interval",
    "ai_chance",
    "weight",
    "weight_multiplier",
    "compare_modifier",
    "opinion_modifier",
    "mult",
    "add",
    "factor",
    // event interior blocks
    "option",
    "desc",
    "title",
    "theme",
    "override_background",
    "left_portrait",
    "right_portrait",
    "lower_left_portrait",
    "lower_center_portrait",
    "lower_right_portrait",
    "artifact",
    "override_icon",
    "cooldown",
    // decisions
    "is_shown",
    "is_valid",
    "is_valid_showing_failures_only",
    "cost",
    "minimum_cost",
    "confirm_text",
    "selection_tooltip",
    // interactions
    "can_send",
    "can_be_picked",
    "is_highlighted",
    "on_accept",
    "on_decline",
    "on_send",
    "on_auto_accept",
    "reply_item",
    "send_option",
    "greeting",
    "notification_text",
    // schemes
    "on_ready",
    "on_monthly",
    "on_invalidated",
    // activities
    "on_start",
    "on_complete",
    "on_enter_location",
    "on_leave_location",
    "phases",
    // GUI
    "window",
    "widget",
    "container",
    "vbox",
    "hbox",
    "button",
    "text",
    "icon",
    "portrait",
    "scrollarea",
    "flowcontainer",
    // scripts
    "scripted_trigger",
    "scripted_effect",
    // entity definitions
    "trait",
    "culture",
    "culture_group",
    "heritage",
    "tradition",
    "religion",
    "faith",
    "doctrine",
    "dynasty",
    "house",
    "character",
    "province",
    "holding",
    "building",
    "men_at_arms",
    "innovation",
    "law",
    "lifestyle",
    "perk",
    "focus",
];

/// Known on-action hook names the game engine fires. Extended at runtime by
/// the `on_*`/`_pulse` pattern in [`is_on_action_container_name`], since new
/// hooks appear with every game patch and can't all be enumerated here.
pub const CONTAINER_BLOCKS: &[&str] = &[
    "on_game_start",
    "on_game_start_after_lobby",
    "on_birth",
    "on_birth_child",
    "on_birth_mother",
    "on_birth_father",
    "on_birth_real_father",
    "on_death",
    "on_natural_death_second_chance",
    "on_join_court",
    "on_leave_court",
    "on_imprison",
    "on_release_from_prison",
    "on_marriage",
    "on_divorce",
    "on_concubinage",
    "on_character_faith_change",
    "on_faith_created",
    "on_faith_conversion",
    "on_character_culture_change",
    "on_war_started",
    "on_war_ended",
    "on_war_won",
    "on_war_lost",
    "on_war_white_peace",
    "on_title_gain",
    "on_title_lost",
    "on_title_destroyed",
    "on_realm_capital_change",
    "on_county_faith_change",
    "on_county_culture_change",
    "on_yearly_pulse",
    "on_monthly_pulse",
    "on_weekly_pulse",
    "on_quarterly_pulse",
    "five_year_playable_pulse",
    "three_year_playable_pulse",
    "yearly_playable_pulse",
    "random_yearly_playable_pulse",
    "random_yearly_everyone_pulse",
    "on_prestige_gained",
    "on_piety_gained",
    "on_gold_gained",
    "on_army_enter_province",
    "on_siege_completion",
    "on_siege_great_success",
    "on_siege_looting",
    "on_artifact_created",
    "on_artifact_destroyed",
    "on_artifact_changed_owner",
    "on_holy_order_founded",
    "on_holy_order_destroyed",
    "on_dynasty_created",
    "on_house_created",
];

/// Exact-match GUI background container names not caught by the suffix
/// patterns in [`is_gui_container_name`].
const GUI_CONTAINER_EXACT: &[&str] = &["character_view_bg", "portrait_backdrop"];

const GUI_CONTAINER_SUFFIXES: &[&str] =
    &["_bg", "_illustration", "_interior", "_exterior", "_pattern"];

fn is_on_action_container_name(name: &str) -> bool {
    if CONTAINER_BLOCKS.contains(&name) {
        return true;
    }
    (name.starts_with("on_") && name != "on_actions") || name.contains("_pulse")
}

fn is_scripted_effect_container_name(name: &str) -> bool {
    name.ends_with("_effect")
        || name.ends_with("_effects")
        || name.starts_with("fire_")
        || name.starts_with("setup_")
        || name.starts_with("initialize_")
        || name.starts_with("init_")
        || name.contains("_intro_")
        || name.contains("_gamestart_")
        || name.contains("_setup_")
        || name.contains("_spawn_")
}

/// Exposed for the merger's GUI-container special case (content-based
/// child matching instead of positional matching).
pub fn is_gui_container_name(name: &str) -> bool {
    GUI_CONTAINER_EXACT.contains(&name) || GUI_CONTAINER_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Coarse classification of a file path, used as a tie-breaker by
/// [`top_level_strategy`] before any name-based rule is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileContext {
    Atomic,
    Recursive,
    Unknown,
}

const ATOMIC_PATH_SEGMENTS: &[&str] =
    &["decisions", "events", "character_interactions", "schemes", "activities"];
const RECURSIVE_PATH_SEGMENTS: &[&str] = &["on_action", "scripted_effects"];

fn file_context(file_path: &str) -> FileContext {
    let segments: Vec<&str> = file_path.split(['/', '\\']).collect();
    if segments.iter().any(|s| ATOMIC_PATH_SEGMENTS.contains(s)) {
        return FileContext::Atomic;
    }
    if segments.iter().any(|s| RECURSIVE_PATH_SEGMENTS.contains(s)) {
        return FileContext::Recursive;
    }
    FileContext::Unknown
}

/// §4.3a: classify a top-level block. `file_path` is the mod-relative path
/// of the file the block was found in.
pub fn top_level_strategy(block_name: &str, file_path: &str) -> TopLevelStrategy {
    if is_event_name(block_name) {
        return TopLevelStrategy::AtomicAccumulate;
    }
    if is_date_name(block_name) {
        return TopLevelStrategy::AtomicAccumulate;
    }
    match file_context(file_path) {
        FileContext::Atomic => return TopLevelStrategy::AtomicAccumulate,
        FileContext::Recursive => return TopLevelStrategy::MergeableContainer,
        FileContext::Unknown => {}
    }
    if is_on_action_container_name(block_name) {
        return TopLevelStrategy::MergeableContainer;
    }
    if is_scripted_effect_container_name(block_name) {
        return TopLevelStrategy::MergeableContainer;
    }
    if is_gui_container_name(block_name) {
        return TopLevelStrategy::MergeableContainer;
    }
    TopLevelStrategy::AtomicAccumulate
}

/// §4.3b: classify a named child of a mergeable container block.
pub fn child_strategy(child_name: &str, _parent_name: &str) -> ChildStrategy {
    if is_event_name(child_name) || is_date_name(child_name) || is_bare_integer_name(child_name) {
        return ChildStrategy::ReplaceWhole;
    }
    if is_iterator_name(child_name) && !SAFE_LIST_BLOCKS.contains(&child_name) {
        return ChildStrategy::ReplaceWhole;
    }
    if SAFE_LIST_BLOCKS.contains(&child_name) {
        return ChildStrategy::AccumulateList;
    }
    if NO_MERGE_BLOCKS.contains(&child_name) {
        return ChildStrategy::ReplaceWhole;
    }
    if is_on_action_container_name(child_name)
        || is_scripted_effect_container_name(child_name)
        || is_gui_container_name(child_name)
    {
        return ChildStrategy::Recursive;
    }
    ChildStrategy::ReplaceWhole
}

/// §4.3c: guards against inserting a never-merged child type under a
/// parent the rule book doesn't recognize as a mergeable container.
pub fn is_safe_to_add_child(child_name: &str, parent_name: &str) -> bool {
    if matches!(
        top_level_strategy(parent_name, ""),
        TopLevelStrategy::MergeableContainer
    ) {
        return true;
    }
    matches!(
        child_strategy(child_name, parent_name),
        ChildStrategy::AccumulateList | ChildStrategy::Recursive
    )
}
