// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for import, export and live shortcuts

/// How text-format tags are matched.
///
/// Both backends accept and reject exactly the same inputs. The embedding
/// host picks one once; nothing is sensed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatcherBackend {
    /// Patterns compiled with the `regex` crate (no look-around)
    #[default]
    Regex,
    /// Direct character scanning
    Scanner,
}

/// Configuration for batch import
#[derive(Debug, Clone, Default)]
pub struct ImportConfig {
    pub matcher: MatcherBackend,
}

/// Configuration for batch export
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Text placed between top-level blocks (default: a blank line)
    pub block_separator: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            block_separator: "\n\n".to_string(),
        }
    }
}

/// Configuration for the live shortcut listener
#[derive(Debug, Clone, Default)]
pub struct ShortcutConfig {
    pub matcher: MatcherBackend,
}
