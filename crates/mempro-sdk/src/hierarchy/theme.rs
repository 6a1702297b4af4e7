//! Theme resolution by entity-name containment.
//!
//! For each entity on a Semantic, in order, the known Themes are scanned in
//! order and the first Theme whose name contains the entity (ignoring case)
//! wins. Selection is first-match, not best-match, so a fixed entity list and
//! a fixed Theme order always land on the same Theme. With no match, a new
//! Theme is named after the first non-blank entity.
//!
//! Entities are compared verbatim: case is folded but whitespace is kept,
//! so a Theme found here is also found by a Theme-level `search(entity)`.
//! Blank entities are skipped.

use mempro_core::{Result, SemanticMemory, ThemeMemory};

/// Outcome of resolving a Semantic against the known Themes
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTheme {
    pub theme: ThemeMemory,
    /// True when no existing Theme matched
    pub created: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeResolver;

impl ThemeResolver {
    /// Pick or create the Theme for `semantic`.
    ///
    /// A matched Theme already has the Semantic's id appended and its
    /// `updated_at` advanced. A new Theme has no members; the caller appends
    /// the Semantic and persists it. Returns `None` when the Semantic has no
    /// usable entity.
    pub fn resolve(
        &self,
        semantic: &SemanticMemory,
        themes: impl IntoIterator<Item = ThemeMemory>,
    ) -> Result<Option<ResolvedTheme>> {
        let entities: Vec<&str> = semantic
            .entity_refs
            .iter()
            .map(String::as_str)
            .filter(|e| !e.trim().is_empty())
            .collect();
        let Some(first_entity) = entities.first() else {
            return Ok(None);
        };

        let themes: Vec<ThemeMemory> = themes.into_iter().collect();
        for entity in &entities {
            if let Some(found) = themes.iter().find(|t| t.name_matches(entity)) {
                let mut theme = found.clone();
                theme.add_semantic(&semantic.base.id);
                return Ok(Some(ResolvedTheme {
                    theme,
                    created: false,
                }));
            }
        }

        let theme = ThemeMemory::new(*first_entity, format!("Theme for {first_entity}"))?;
        Ok(Some(ResolvedTheme {
            theme,
            created: true,
        }))
    }
}
