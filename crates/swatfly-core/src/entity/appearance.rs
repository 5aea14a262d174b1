//! Display attributes of an entity.
//!
//! Every field of [`Appearance`] is optional: events may arrive before a
//! player's customisation does, and drawing must still succeed. Accessors
//! such as [`Appearance::glyph_or_default`] resolve a missing field to its
//! documented default at the point of use.

use serde::{Deserialize, Serialize};

use super::{ControlMode, EntityId};

/// Glyph drawn when an entity has none.
pub const DEFAULT_GLYPH: &str = "🪰";

/// Death phrase used when an entity has none.
pub const DEFAULT_DEATH_PHRASE: &str = "SPLAT!";

/// Number of identity characters used in a default name.
pub const DEFAULT_NAME_ID_CHARS: usize = 6;

/// Two-stop colour gradient used to fill an avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPair {
    /// Outer (dominant) colour. Also used to tint death particles.
    pub primary: String,
    /// Inner highlight colour.
    pub secondary: String,
}

impl ColorPair {
    /// Creates a colour pair from two CSS colour strings.
    #[must_use]
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Purple pair used for the local entity.
    #[must_use]
    pub fn local() -> Self {
        Self::new("#4834d4", "#686de0")
    }

    /// Red pair used for everyone else.
    #[must_use]
    pub fn remote() -> Self {
        Self::new("#eb4d4b", "#ff7979")
    }

    /// Default pair for the given control mode.
    #[must_use]
    pub fn default_for(mode: ControlMode) -> Self {
        match mode {
            ControlMode::Local => Self::local(),
            ControlMode::Remote | ControlMode::Autonomous => Self::remote(),
        }
    }
}

/// Customisable look of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
    /// Glyph drawn on the avatar (usually an insect emoji).
    pub glyph: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Fill colours.
    pub colors: Option<ColorPair>,
    /// Phrase shown when the entity is swatted.
    pub death_phrase: Option<String>,
}

impl Appearance {
    /// Creates an appearance with a name and glyph set.
    #[must_use]
    pub fn named(name: impl Into<String>, glyph: impl Into<String>) -> Self {
        Self {
            glyph: Some(glyph.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the death phrase.
    #[must_use]
    pub fn with_death_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.death_phrase = Some(phrase.into());
        self
    }

    /// Glyph, or [`DEFAULT_GLYPH`].
    #[must_use]
    pub fn glyph_or_default(&self) -> &str {
        self.glyph.as_deref().unwrap_or(DEFAULT_GLYPH)
    }

    /// Name, or `Player_` followed by the first characters of `id`.
    #[must_use]
    pub fn name_or_default(&self, id: &EntityId) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Player_{}", id.short(DEFAULT_NAME_ID_CHARS)))
    }

    /// Colours, or the default pair for `mode`.
    #[must_use]
    pub fn colors_or_default(&self, mode: ControlMode) -> ColorPair {
        self.colors
            .clone()
            .unwrap_or_else(|| ColorPair::default_for(mode))
    }

    /// Death phrase, or [`DEFAULT_DEATH_PHRASE`].
    #[must_use]
    pub fn death_phrase_or_default(&self) -> &str {
        self.death_phrase.as_deref().unwrap_or(DEFAULT_DEATH_PHRASE)
    }

    /// Merges every provided field of `patch` into this appearance.
    ///
    /// Empty strings count as "not provided". Returns `true` if anything
    /// changed.
    pub fn merge(&mut self, patch: &AppearancePatch) -> bool {
        fn merge_text(slot: &mut Option<String>, value: Option<&String>) -> bool {
            match value {
                Some(v) if !v.is_empty() && slot.as_ref() != Some(v) => {
                    *slot = Some(v.clone());
                    true
                }
                _ => false,
            }
        }

        let mut changed = merge_text(&mut self.glyph, patch.glyph.as_ref());
        changed |= merge_text(&mut self.name, patch.name.as_ref());
        changed |= merge_text(&mut self.death_phrase, patch.death_phrase.as_ref());
        if let Some(colors) = &patch.colors {
            if self.colors.as_ref() != Some(colors) {
                self.colors = Some(colors.clone());
                changed = true;
            }
        }
        changed
    }
}

/// A partial appearance update. `None` fields leave the target untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearancePatch {
    /// New glyph.
    pub glyph: Option<String>,
    /// New display name.
    pub name: Option<String>,
    /// New colours.
    pub colors: Option<ColorPair>,
    /// New death phrase.
    pub death_phrase: Option<String>,
}

impl AppearancePatch {
    /// Returns `true` if the patch carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyph.is_none()
            && self.name.is_none()
            && self.colors.is_none()
            && self.death_phrase.is_none()
    }

    /// Sets the glyph.
    #[must_use]
    pub fn glyph(mut self, glyph: impl Into<String>) -> Self {
        self.glyph = Some(glyph.into());
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the death phrase.
    #[must_use]
    pub fn death_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.death_phrase = Some(phrase.into());
        self
    }

    /// Sets the colours.
    #[must_use]
    pub fn colors(mut self, colors: ColorPair) -> Self {
        self.colors = Some(colors);
        self
    }
}

impl From<Appearance> for AppearancePatch {
    fn from(appearance: Appearance) -> Self {
        Self {
            glyph: appearance.glyph,
            name: appearance.name,
            colors: appearance.colors,
            death_phrase: appearance.death_phrase,
        }
    }
}
