//! Memory Record Model
//!
//! Defines the four record kinds of the memory hierarchy and the envelope
//! the storage port persists them through:
//!
//! - **Original**: one raw utterance (leaf)
//! - **Episode**: a coherent span of utterances, referencing Originals
//! - **Semantic**: one reusable fact, referencing the Episodes it came from
//! - **Theme**: a named cluster of Semantics
//!
//! Records are immutable apart from their backward-reference lists, which
//! are append-only, and the `updated_at` timestamp.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Open string-keyed metadata bag carried by every record
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Coherence assigned to a freshly created Theme
pub const DEFAULT_THEME_COHERENCE: f64 = 0.5;

/// Hierarchy level (original, episode, semantic, theme)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLevel {
    Original,
    Episode,
    Semantic,
    Theme,
}

impl MemoryLevel {
    /// All levels, leaves first
    pub const ALL: [MemoryLevel; 4] = [
        MemoryLevel::Original,
        MemoryLevel::Episode,
        MemoryLevel::Semantic,
        MemoryLevel::Theme,
    ];

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Episode => "episode",
            Self::Semantic => "semantic",
            Self::Theme => "theme",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Original => 0,
            Self::Episode => 1,
            Self::Semantic => 2,
            Self::Theme => 3,
        }
    }
}

impl fmt::Display for MemoryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MemoryLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "original" => Ok(Self::Original),
            "episode" => Ok(Self::Episode),
            "semantic" => Ok(Self::Semantic),
            "theme" => Ok(Self::Theme),
            other => Err(Error::validation(format!("invalid memory level: {other}"))),
        }
    }
}

/// Kind of knowledge a Semantic record holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    #[default]
    Fact,
    Preference,
    Goal,
    Constraint,
    Event,
}

impl MemoryType {
    pub const ALL: [MemoryType; 5] = [
        MemoryType::Fact,
        MemoryType::Preference,
        MemoryType::Goal,
        MemoryType::Constraint,
        MemoryType::Event,
    ];

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Preference => "preference",
            Self::Goal => "goal",
            Self::Constraint => "constraint",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fact" => Ok(Self::Fact),
            "preference" => Ok(Self::Preference),
            "goal" => Ok(Self::Goal),
            "constraint" => Ok(Self::Constraint),
            "event" => Ok(Self::Event),
            other => Err(Error::validation(format!("invalid memory type: {other}"))),
        }
    }
}

/// Reject scores outside [0, 1] (NaN included).
pub fn check_unit_score(field: &str, value: f64) -> Result<f64> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(Error::validation(format!(
            "{field} must be within [0, 1], got {value}"
        )));
    }
    Ok(value)
}

/// Clamp an estimated score into [0, 1]; NaN maps to 0.
pub fn clamp_unit_score(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn push_unique(list: &mut Vec<String>, id: &str) -> bool {
    if list.iter().any(|existing| existing == id) {
        return false;
    }
    list.push(id.to_string());
    true
}

/// Identity fields shared by every record kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseMemory {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl BaseMemory {
    /// Fresh identity with a random id and both timestamps set to now
    pub fn new(metadata: Metadata) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            metadata,
        }
    }

    /// Advance `updated_at`; it never moves backwards or stays put.
    pub fn touch(&mut self) {
        let floor = self.updated_at + Duration::nanoseconds(1);
        self.updated_at = Utc::now().max(floor);
    }
}

/// One raw utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalMemory {
    #[serde(flatten)]
    pub base: BaseMemory,
    pub content: String,
    pub speaker: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl OriginalMemory {
    pub fn new(
        content: impl Into<String>,
        speaker: impl Into<String>,
        session_id: impl Into<String>,
        metadata: Metadata,
    ) -> Result<Self> {
        let content = content.into();
        require_text("content", &content)?;

        let base = BaseMemory::new(metadata);
        let timestamp = base.created_at;
        Ok(Self {
            base,
            content,
            speaker: speaker.into(),
            session_id: session_id.into(),
            timestamp,
        })
    }
}

/// A coherent span of utterances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMemory {
    #[serde(flatten)]
    pub base: BaseMemory,
    pub summary: String,
    pub original_ids: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub coherence_score: f64,
    pub boundary_type: String,
}

impl EpisodeMemory {
    pub fn new(
        summary: impl Into<String>,
        original_ids: Vec<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        coherence_score: f64,
        boundary_type: impl Into<String>,
    ) -> Result<Self> {
        if original_ids.is_empty() {
            return Err(Error::validation("episode must reference at least one original"));
        }
        if start_time > end_time {
            return Err(Error::validation("episode start_time is after end_time"));
        }
        let coherence_score = check_unit_score("coherence_score", coherence_score)?;

        Ok(Self {
            base: BaseMemory::new(Metadata::new()),
            summary: summary.into(),
            original_ids,
            start_time,
            end_time,
            coherence_score,
            boundary_type: boundary_type.into(),
        })
    }

    /// Append a provenance link; returns false if it was already present.
    pub fn add_original(&mut self, original_id: &str) -> bool {
        let added = push_unique(&mut self.original_ids, original_id);
        if added {
            self.base.touch();
        }
        added
    }
}

/// One reusable fact, preference, goal, constraint or event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMemory {
    #[serde(flatten)]
    pub base: BaseMemory,
    pub content: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub confidence: f64,
    pub source_episodes: Vec<String>,
    #[serde(default)]
    pub entity_refs: Vec<String>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

impl SemanticMemory {
    pub fn new(
        content: impl Into<String>,
        memory_type: MemoryType,
        confidence: f64,
        source_episodes: Vec<String>,
        entity_refs: Vec<String>,
    ) -> Result<Self> {
        let content = content.into();
        require_text("content", &content)?;
        if source_episodes.is_empty() {
            return Err(Error::validation("semantic must reference at least one episode"));
        }
        let confidence = check_unit_score("confidence", confidence)?;

        Ok(Self {
            base: BaseMemory::new(Metadata::new()),
            content,
            memory_type,
            confidence,
            source_episodes,
            entity_refs,
            valid_from: None,
            valid_until: None,
        })
    }

    /// Attach a validity window. Either bound may be open.
    pub fn with_validity(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if let (Some(from), Some(until)) = (valid_from, valid_until) {
            if from > until {
                return Err(Error::validation("valid_from is after valid_until"));
            }
        }
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        Ok(self)
    }

    /// Whether the fact holds at `at` according to its validity window
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from.is_none_or(|from| from <= at)
            && self.valid_until.is_none_or(|until| at <= until)
    }

    /// Append a provenance link; returns false if it was already present.
    pub fn add_source_episode(&mut self, episode_id: &str) -> bool {
        let added = push_unique(&mut self.source_episodes, episode_id);
        if added {
            self.base.touch();
        }
        added
    }
}

/// A named cluster of related Semantics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeMemory {
    #[serde(flatten)]
    pub base: BaseMemory,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub semantic_ids: Vec<String>,
    #[serde(default)]
    pub parent_theme_id: Option<String>,
    #[serde(default)]
    pub child_theme_ids: Vec<String>,
    pub coherence_score: f64,
}

impl ThemeMemory {
    /// New theme with no members yet
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Result<Self> {
        let name = name.into();
        require_text("name", &name)?;

        Ok(Self {
            base: BaseMemory::new(Metadata::new()),
            name,
            description: description.into(),
            semantic_ids: Vec::new(),
            parent_theme_id: None,
            child_theme_ids: Vec::new(),
            coherence_score: DEFAULT_THEME_COHERENCE,
        })
    }

    pub fn with_parent(mut self, parent_theme_id: impl Into<String>) -> Self {
        self.parent_theme_id = Some(parent_theme_id.into());
        self
    }

    pub fn with_coherence(mut self, coherence_score: f64) -> Result<Self> {
        self.coherence_score = check_unit_score("coherence_score", coherence_score)?;
        Ok(self)
    }

    /// Case-insensitive containment of `entity` in the theme name.
    ///
    /// The entity is used verbatim, surrounding whitespace included, the
    /// same way a Theme-level `search(entity)` matches. Blank entities never
    /// match.
    pub fn name_matches(&self, entity: &str) -> bool {
        !entity.trim().is_empty() && self.name.to_lowercase().contains(&entity.to_lowercase())
    }

    /// Add a member Semantic; returns false if it was already a member.
    pub fn add_semantic(&mut self, semantic_id: &str) -> bool {
        let added = push_unique(&mut self.semantic_ids, semantic_id);
        if added {
            self.base.touch();
        }
        added
    }

    /// Link a child theme; returns false if it was already linked.
    pub fn add_child(&mut self, child_theme_id: &str) -> bool {
        let added = push_unique(&mut self.child_theme_ids, child_theme_id);
        if added {
            self.base.touch();
        }
        added
    }
}

/// Union type for all memory records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum MemoryRecord {
    Original(OriginalMemory),
    Episode(EpisodeMemory),
    Semantic(SemanticMemory),
    Theme(ThemeMemory),
}

impl MemoryRecord {
    /// Get the base identity
    pub fn base(&self) -> &BaseMemory {
        match self {
            Self::Original(r) => &r.base,
            Self::Episode(r) => &r.base,
            Self::Semantic(r) => &r.base,
            Self::Theme(r) => &r.base,
        }
    }

    /// Get the record ID
    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// Get the level
    pub fn level(&self) -> MemoryLevel {
        match self {
            Self::Original(_) => MemoryLevel::Original,
            Self::Episode(_) => MemoryLevel::Episode,
            Self::Semantic(_) => MemoryLevel::Semantic,
            Self::Theme(_) => MemoryLevel::Theme,
        }
    }

    /// The text searches match against: content, summary or name.
    pub fn primary_text(&self) -> &str {
        match self {
            Self::Original(r) => &r.content,
            Self::Episode(r) => &r.summary,
            Self::Semantic(r) => &r.content,
            Self::Theme(r) => &r.name,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.base().created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.base().updated_at
    }

    /// Case-insensitive substring match on the primary text.
    ///
    /// `query_lower` must already be lowercased.
    pub fn matches(&self, query_lower: &str) -> bool {
        query_lower.is_empty() || self.primary_text().to_lowercase().contains(query_lower)
    }

    pub fn into_original(self) -> Option<OriginalMemory> {
        match self {
            Self::Original(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_episode(self) -> Option<EpisodeMemory> {
        match self {
            Self::Episode(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_semantic(self) -> Option<SemanticMemory> {
        match self {
            Self::Semantic(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_theme(self) -> Option<ThemeMemory> {
        match self {
            Self::Theme(r) => Some(r),
            _ => None,
        }
    }
}

impl From<OriginalMemory> for MemoryRecord {
    fn from(record: OriginalMemory) -> Self {
        Self::Original(record)
    }
}

impl From<EpisodeMemory> for MemoryRecord {
    fn from(record: EpisodeMemory) -> Self {
        Self::Episode(record)
    }
}

impl From<SemanticMemory> for MemoryRecord {
    fn from(record: SemanticMemory) -> Self {
        Self::Semantic(record)
    }
}

impl From<ThemeMemory> for MemoryRecord {
    fn from(record: ThemeMemory) -> Self {
        Self::Theme(record)
    }
}

/// Memory statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total: usize,
    pub by_level: BTreeMap<MemoryLevel, usize>,
    pub by_type: BTreeMap<MemoryType, usize>,
    pub avg_confidence: f64,
}

impl Default for MemoryStats {
    fn default() -> Self {
        Self {
            total: 0,
            by_level: MemoryLevel::ALL.iter().map(|level| (*level, 0)).collect(),
            by_type: BTreeMap::new(),
            avg_confidence: 0.0,
        }
    }
}

impl MemoryStats {
    /// Tally stats over a set of records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a MemoryRecord>) -> Self {
        let mut stats = Self::default();
        let mut confidence_sum = 0.0;
        let mut semantic_count = 0usize;

        for record in records {
            stats.total += 1;
            *stats.by_level.entry(record.level()).or_insert(0) += 1;
            if let MemoryRecord::Semantic(semantic) = record {
                *stats.by_type.entry(semantic.memory_type).or_insert(0) += 1;
                confidence_sum += semantic.confidence;
                semantic_count += 1;
            }
        }

        if semantic_count > 0 {
            stats.avg_confidence = confidence_sum / semantic_count as f64;
        }
        stats
    }

    /// Count at one level
    pub fn count(&self, level: MemoryLevel) -> usize {
        self.by_level.get(&level).copied().unwrap_or(0)
    }
}
