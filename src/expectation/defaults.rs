use crate::expectation::{ExpectationConfig, Section};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Per-tool default expectations, built once and never mutated
static TOOL_DEFAULTS: LazyLock<HashMap<&'static str, ExpectationConfig>> = LazyLock::new(|| {
    use Section::*;

    let navigation = ExpectationConfig::sections(&[Snapshot, Console, Code]);
    let interaction = ExpectationConfig::sections(&[Snapshot, Code]);

    HashMap::from([
        ("navigate", navigation.clone()),
        ("navigate_back", navigation.clone()),
        ("navigate_forward", navigation),
        ("click", interaction.clone()),
        ("hover", interaction.clone()),
        ("type", interaction.clone()),
        ("select_option", interaction.clone()),
        ("press_key", interaction),
        ("snapshot", ExpectationConfig::sections(&[Snapshot])),
        ("take_screenshot", ExpectationConfig::sections(&[Code])),
        ("evaluate", ExpectationConfig::sections(&[Console, Code])),
        ("wait_for", ExpectationConfig::sections(&[Snapshot])),
        ("tab_list", ExpectationConfig::sections(&[Tabs])),
        ("console_messages", ExpectationConfig::sections(&[Console])),
        ("batch_execute", ExpectationConfig::sections(&[Snapshot])),
        ("diagnose", ExpectationConfig::sections(&[])),
    ])
});

/// Default expectation declared for `tool`, if it declares one
pub fn tool_default(tool: &str) -> Option<&'static ExpectationConfig> {
    TOOL_DEFAULTS.get(tool)
}
