//! Registry of tools with keyword/category scoring.
//!
//! Tools are registered once at startup and read concurrently afterwards
//! (the catalog is shared behind an `Arc` and is never mutated once shared).
//! Registration order is recorded explicitly and is the tiebreak for
//! [`ToolCatalog::select_for_query`].

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::core::{Tool, ToolCategory, ToolDescriptor};

/// Maximum number of tools returned by [`ToolCatalog::select_for_query`].
pub const MAX_SELECTED: usize = 3;

const KEYWORD_WEIGHT: i32 = 10;
const CATEGORY_CUE_BONUS: i32 = 15;

struct CatalogEntry {
    descriptor: ToolDescriptor,
    tool: Box<dyn Tool>,
}

/// The set of registered tools.
#[derive(Default)]
pub struct ToolCatalog {
    /// Entries in registration order.
    entries: Vec<CatalogEntry>,
    /// Name -> index into `entries`.
    index: HashMap<String, usize>,
}

impl fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolCatalog")
            .field(
                "tools",
                &self.entries.iter().map(|e| &e.descriptor.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name is replaced, keeping the
    /// original registration position.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let descriptor = tool.descriptor();
        let entry = CatalogEntry {
            descriptor,
            tool: Box::new(tool),
        };
        let name = entry.descriptor.name.clone();
        match self.index.get(&name) {
            Some(&i) => {
                debug!("Replacing registered tool '{name}'");
                self.entries[i] = entry;
            }
            None => {
                self.index.insert(name, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Register a tool (builder pattern).
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// Register the four default tools (web search, encyclopedia, calculator,
    /// statistics). Web search fails at invocation time without an API key.
    pub fn with_default_tools(self, brave_api_key: Option<String>) -> Self {
        use super::builtin::{Calculator, Encyclopedia, Statistics, WebSearch};

        self.with(WebSearch::new(brave_api_key))
            .with(Encyclopedia::new())
            .with(Calculator)
            .with(Statistics)
    }

    /// Descriptor of one tool.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.entries[i].descriptor)
    }

    /// The callable registered under `name`.
    pub fn tool(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.entries[i].tool.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Every descriptor, in registration order.
    pub fn all(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn by_category(&self, category: ToolCategory) -> Vec<ToolDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| e.descriptor.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Relevance score of one tool for `query`.
    ///
    /// 10 per keyword found in the query, 15 when the query carries a cue
    /// for the tool's own category, plus the tool's static priority.
    pub fn score(descriptor: &ToolDescriptor, query: &str) -> i32 {
        let query = query.to_lowercase();
        let keyword_hits = descriptor
            .keywords
            .iter()
            .filter(|k| query.contains(k.as_str()))
            .count() as i32;
        let cue = if has_category_cue(descriptor.category, &query) {
            CATEGORY_CUE_BONUS
        } else {
            0
        };
        keyword_hits * KEYWORD_WEIGHT + cue + descriptor.priority
    }

    /// Up to three tool names ranked for `query`.
    ///
    /// Tools scoring zero or less are dropped. Ties keep registration order.
    pub fn select_for_query(&self, query: &str) -> Vec<String> {
        let mut scored: Vec<(i32, usize, &str)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(order, e)| (Self::score(&e.descriptor, query), order, e.descriptor.name.as_str()))
            .filter(|(score, _, _)| *score > 0)
            .collect();
        scored.sort_by_key(|&(score, order, _)| (Reverse(score), order));
        scored
            .into_iter()
            .take(MAX_SELECTED)
            .map(|(_, _, name)| name.to_string())
            .collect()
    }
}

/// Whether a lowercased query contains a cue for `category`.
fn has_category_cue(category: ToolCategory, query: &str) -> bool {
    match category {
        ToolCategory::Search => ["search", "find", "look up"].iter().any(|c| query.contains(c)),
        ToolCategory::Computation => {
            ["calculate", "compute"].iter().any(|c| query.contains(c))
                || query.chars().any(|c| c.is_ascii_digit())
        }
        ToolCategory::Knowledge => ["wikipedia", "definition", "explain"]
            .iter()
            .any(|c| query.contains(c)),
        ToolCategory::Analysis => false,
    }
}
