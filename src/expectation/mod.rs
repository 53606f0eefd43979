//! Response expectations
//!
//! An [`ExpectationConfig`] is a partial set of options describing what a
//! tool response should carry. Up to three of them (per call, batch global,
//! tool default) are layered over the library default by [`resolve`], field
//! by field, into a [`ResolvedExpectation`] with every option concrete.

pub mod defaults;

pub use defaults::tool_default;

use crate::dom::SnapshotFormat;
use crate::engine::ConsoleLevel;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Payload sections a response may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Snapshot,
    Console,
    Downloads,
    Tabs,
    Code,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Snapshot,
        Section::Console,
        Section::Downloads,
        Section::Tabs,
        Section::Code,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

/// Partial expectation; `None` falls through to the next layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpectationConfig {
    /// Attach an accessibility snapshot of the page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_snapshot: Option<bool>,

    /// Attach console messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_console: Option<bool>,

    /// Attach the download list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_downloads: Option<bool>,

    /// Attach the open tab list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_tabs: Option<bool>,

    /// Attach equivalent automation code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_code: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_options: Option<SnapshotOptions>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_options: Option<ConsoleOptions>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_options: Option<ImageOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotOptions {
    /// `outline` (default) or `json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<SnapshotFormat>,

    /// Truncate the rendered snapshot to this many characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleOptions {
    /// Levels to keep (default: all)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<ConsoleLevel>>,

    /// Keep at most this many of the newest messages (default: 10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<usize>,

    /// Drop repeated messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_duplicates: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageOptions {
    /// `png` (default) or `jpeg`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,

    /// JPEG quality, 1-100 (default: 85)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
}

impl ExpectationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config that sets every include flag: listed sections on, the rest off
    pub fn sections(included: &[Section]) -> Self {
        let mut config = Self::default();
        for section in Section::ALL {
            config.set_include(section, included.contains(&section));
        }
        config
    }

    pub fn with_include(mut self, section: Section, include: bool) -> Self {
        self.set_include(section, include);
        self
    }

    pub fn with_snapshot_options(mut self, options: SnapshotOptions) -> Self {
        self.snapshot_options = Some(options);
        self
    }

    pub fn with_console_options(mut self, options: ConsoleOptions) -> Self {
        self.console_options = Some(options);
        self
    }

    pub fn with_image_options(mut self, options: ImageOptions) -> Self {
        self.image_options = Some(options);
        self
    }

    pub fn include(&self, section: Section) -> Option<bool> {
        match section {
            Section::Snapshot => self.include_snapshot,
            Section::Console => self.include_console,
            Section::Downloads => self.include_downloads,
            Section::Tabs => self.include_tabs,
            Section::Code => self.include_code,
        }
    }

    fn set_include(&mut self, section: Section, include: bool) {
        let slot = match section {
            Section::Snapshot => &mut self.include_snapshot,
            Section::Console => &mut self.include_console,
            Section::Downloads => &mut self.include_downloads,
            Section::Tabs => &mut self.include_tabs,
            Section::Code => &mut self.include_code,
        };
        *slot = Some(include);
    }
}

/// Expectation with every option decided
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedExpectation {
    pub include_snapshot: bool,
    pub include_console: bool,
    pub include_downloads: bool,
    pub include_tabs: bool,
    pub include_code: bool,
    pub snapshot: ResolvedSnapshotOptions,
    pub console: ResolvedConsoleOptions,
    pub image: ResolvedImageOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSnapshotOptions {
    pub format: SnapshotFormat,
    /// `None` means no limit
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConsoleOptions {
    pub levels: Vec<ConsoleLevel>,
    pub max_messages: usize,
    pub remove_duplicates: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedImageOptions {
    pub format: ImageFormat,
    pub quality: u8,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

pub const DEFAULT_MAX_CONSOLE_MESSAGES: usize = 10;
pub const DEFAULT_IMAGE_QUALITY: u8 = 85;

impl Default for ResolvedExpectation {
    /// The library-wide default: every section included
    fn default() -> Self {
        Self {
            include_snapshot: true,
            include_console: true,
            include_downloads: true,
            include_tabs: true,
            include_code: true,
            snapshot: ResolvedSnapshotOptions {
                format: SnapshotFormat::Outline,
                max_length: None,
            },
            console: ResolvedConsoleOptions {
                levels: ConsoleLevel::ALL.to_vec(),
                max_messages: DEFAULT_MAX_CONSOLE_MESSAGES,
                remove_duplicates: false,
            },
            image: ResolvedImageOptions {
                format: ImageFormat::Png,
                quality: DEFAULT_IMAGE_QUALITY,
                max_width: None,
                max_height: None,
            },
        }
    }
}

impl ResolvedExpectation {
    pub fn includes(&self, section: Section) -> bool {
        match section {
            Section::Snapshot => self.include_snapshot,
            Section::Console => self.include_console,
            Section::Downloads => self.include_downloads,
            Section::Tabs => self.include_tabs,
            Section::Code => self.include_code,
        }
    }
}

/// Whether a response built under `expectation` carries `section`
pub fn should_include(expectation: &ResolvedExpectation, section: Section) -> bool {
    expectation.includes(section)
}

/// Resolve the effective expectation for one call of `tool`
///
/// Precedence, per field: `per_call`, then `batch_global`, then the tool's
/// default, then the library default.
pub fn resolve(
    tool: &str,
    per_call: Option<&ExpectationConfig>,
    batch_global: Option<&ExpectationConfig>,
) -> ResolvedExpectation {
    let layers: Vec<&ExpectationConfig> = [per_call, batch_global, tool_default(tool)]
        .into_iter()
        .flatten()
        .collect();
    let base = ResolvedExpectation::default();

    let pick = |section: Section| {
        layers
            .iter()
            .find_map(|layer| layer.include(section))
            .unwrap_or_else(|| base.includes(section))
    };

    ResolvedExpectation {
        include_snapshot: pick(Section::Snapshot),
        include_console: pick(Section::Console),
        include_downloads: pick(Section::Downloads),
        include_tabs: pick(Section::Tabs),
        include_code: pick(Section::Code),
        snapshot: ResolvedSnapshotOptions {
            format: layers
                .iter()
                .find_map(|l| l.snapshot_options.as_ref()?.format)
                .unwrap_or(base.snapshot.format),
            max_length: layers.iter().find_map(|l| l.snapshot_options.as_ref()?.max_length),
        },
        console: ResolvedConsoleOptions {
            levels: layers
                .iter()
                .find_map(|l| l.console_options.as_ref()?.levels.clone())
                .unwrap_or(base.console.levels),
            max_messages: layers
                .iter()
                .find_map(|l| l.console_options.as_ref()?.max_messages)
                .unwrap_or(base.console.max_messages),
            remove_duplicates: layers
                .iter()
                .find_map(|l| l.console_options.as_ref()?.remove_duplicates)
                .unwrap_or(base.console.remove_duplicates),
        },
        image: ResolvedImageOptions {
            format: layers.iter().find_map(|l| l.image_options.as_ref()?.format).unwrap_or(base.image.format),
            quality: layers
                .iter()
                .find_map(|l| l.image_options.as_ref()?.quality)
                .unwrap_or(base.image.quality)
                .clamp(1, 100),
            max_width: layers.iter().find_map(|l| l.image_options.as_ref()?.max_width),
            max_height: layers.iter().find_map(|l| l.image_options.as_ref()?.max_height),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool_uses_library_default() {
        let resolved = resolve("no_such_tool", None, None);
        assert_eq!(resolved, ResolvedExpectation::default());
    }

    #[test]
    fn test_tool_default_applies_to_every_field() {
        let resolved = resolve("click", None, None);
        assert!(resolved.include_snapshot);
        assert!(resolved.include_code);
        assert!(!resolved.include_console);
        assert!(!resolved.include_tabs);
        assert!(!resolved.include_downloads);
        assert_eq!(resolved.console.max_messages, 10);

        // resolving again gives the same answer
        assert_eq!(resolve("click", None, None), resolved);
    }

    #[test]
    fn test_precedence_per_field() {
        let global = ExpectationConfig::new()
            .with_include(Section::Console, true)
            .with_include(Section::Snapshot, false);
        let per_call = ExpectationConfig::new().with_include(Section::Snapshot, true);

        let resolved = resolve("click", Some(&per_call), Some(&global));
        assert!(resolved.include_snapshot); // per call
        assert!(resolved.include_console); // batch global
        assert!(resolved.include_code); // tool default
        assert!(!resolved.include_tabs); // tool default
    }

    #[test]
    fn test_sub_options_fall_through() {
        let global = ExpectationConfig::new().with_console_options(ConsoleOptions {
            levels: Some(vec![ConsoleLevel::Error]),
            max_messages: Some(3),
            ..Default::default()
        });
        let per_call = ExpectationConfig::new().with_console_options(ConsoleOptions {
            max_messages: Some(5),
            ..Default::default()
        });

        let resolved = resolve("evaluate", Some(&per_call), Some(&global));
        assert_eq!(resolved.console.max_messages, 5);
        assert_eq!(resolved.console.levels, vec![ConsoleLevel::Error]);
        assert!(!resolved.console.remove_duplicates);
    }

    #[test]
    fn test_image_quality_is_clamped() {
        let per_call = ExpectationConfig::new().with_image_options(ImageOptions {
            quality: Some(0),
            ..Default::default()
        });
        assert_eq!(resolve("take_screenshot", Some(&per_call), None).image.quality, 1);
    }

    #[test]
    fn test_sections_constructor() {
        let config = ExpectationConfig::sections(&[Section::Tabs]);
        assert_eq!(config.include_tabs, Some(true));
        assert_eq!(config.include_snapshot, Some(false));
        assert!(config.snapshot_options.is_none());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: ExpectationConfig = serde_json::from_value(serde_json::json!({
            "includeSnapshot": false,
            "snapshotOptions": { "format": "json", "maxLength": 200 },
            "consoleOptions": { "levels": ["error", "warning"], "removeDuplicates": true }
        }))
        .unwrap();

        assert_eq!(config.include_snapshot, Some(false));
        assert_eq!(config.include_code, None);
        let snapshot = config.snapshot_options.unwrap();
        assert_eq!(snapshot.format, Some(SnapshotFormat::Json));
        assert_eq!(snapshot.max_length, Some(200));
        let console = config.console_options.unwrap();
        assert_eq!(console.levels, Some(vec![ConsoleLevel::Error, ConsoleLevel::Warning]));
        assert_eq!(console.remove_duplicates, Some(true));
    }

    #[test]
    fn test_should_include() {
        let resolved = resolve("tab_list", None, None);
        assert!(should_include(&resolved, Section::Tabs));
        assert!(!should_include(&resolved, Section::Snapshot));
    }
}
