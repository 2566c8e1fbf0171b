// Collaborator contracts the workflow driver depends on.
//
// The host platform owns settings storage, capability checks, usage counters
// and the full shortcode engine; this crate only defines the seams plus
// lightweight built-in implementations.

pub mod capabilities;
pub mod settings;
pub mod shortcodes;

pub use capabilities::{CapabilityService, FixedUsage, StaticCapabilities, UsageService};
pub use settings::{MemorySettings, SettingsStore};
pub use shortcodes::{ShortcodeService, TemplateService};
