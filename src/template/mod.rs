//! Reference patterns searched for in every frame.

use crate::capture::Region;
use crate::image::{ChannelMode, ImageView, OwnedImage};
use crate::util::{GrabError, GrabResult};

mod plan;

pub use plan::SqdiffPlan;

/// Semantic role of a pattern.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatternRole {
    Bonus,
    City,
}

impl PatternRole {
    /// Upper-case label used in action reports.
    pub fn label(self) -> &'static str {
        match self {
            PatternRole::Bonus => "BONUS",
            PatternRole::City => "CITY",
        }
    }

    /// Lower-case name used for file names and JSON keys.
    pub fn name(self) -> &'static str {
        match self {
            PatternRole::Bonus => "bonus",
            PatternRole::City => "city",
        }
    }
}

/// What to do with the pointer once a pattern is found.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActionPolicy {
    /// Hover at a random point inside the match window.
    HoverJitter,
    /// Move to the center of the match window and click.
    ClickCenter,
}

/// Immutable template image tagged with its role and action policy.
#[derive(Clone, Debug)]
pub struct TemplatePattern {
    role: PatternRole,
    policy: ActionPolicy,
    image: OwnedImage,
    plan: SqdiffPlan,
}

impl TemplatePattern {
    pub fn new(role: PatternRole, policy: ActionPolicy, image: OwnedImage) -> GrabResult<Self> {
        let plan = SqdiffPlan::from_view(image.view())?;
        Ok(Self {
            role,
            policy,
            image,
            plan,
        })
    }

    /// Bonus pattern with the hover policy.
    pub fn bonus(image: OwnedImage) -> GrabResult<Self> {
        Self::new(PatternRole::Bonus, ActionPolicy::HoverJitter, image)
    }

    /// City pattern with the click policy.
    pub fn city(image: OwnedImage) -> GrabResult<Self> {
        Self::new(PatternRole::City, ActionPolicy::ClickCenter, image)
    }

    pub fn role(&self) -> PatternRole {
        self.role
    }

    pub fn policy(&self) -> ActionPolicy {
        self.policy
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }

    pub fn mode(&self) -> ChannelMode {
        self.image.mode()
    }

    pub fn view(&self) -> ImageView<'_, u8> {
        self.image.view()
    }

    pub(crate) fn plan(&self) -> &SqdiffPlan {
        &self.plan
    }
}

/// The fixed pattern set, in priority order.
#[derive(Clone, Debug)]
pub struct PatternSet {
    bonus: TemplatePattern,
    city: TemplatePattern,
}

impl PatternSet {
    /// Checks both patterns against the capture region and channel mode.
    pub fn new(
        bonus: TemplatePattern,
        city: TemplatePattern,
        region: Region,
        mode: ChannelMode,
    ) -> GrabResult<Self> {
        for pattern in [&bonus, &city] {
            if pattern.width() > region.width || pattern.height() > region.height {
                return Err(GrabError::TemplateTooLarge {
                    templ_width: pattern.width(),
                    templ_height: pattern.height(),
                    frame_width: region.width,
                    frame_height: region.height,
                });
            }
            if pattern.mode() != mode {
                return Err(GrabError::ChannelMismatch {
                    frame: mode.channels(),
                    templ: pattern.mode().channels(),
                });
            }
        }
        Ok(Self { bonus, city })
    }

    pub fn bonus(&self) -> &TemplatePattern {
        &self.bonus
    }

    pub fn city(&self) -> &TemplatePattern {
        &self.city
    }

    /// Patterns in evaluation order: bonus first.
    pub fn ordered(&self) -> [&TemplatePattern; 2] {
        [&self.bonus, &self.city]
    }
}
