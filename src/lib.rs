//! Bubblegrab watches a game window and reacts to what appears in it.
//!
//! Every cycle the crate captures the window through a `FrameSource`,
//! converts the packed pixels into a canonical `OwnedImage`, scores two
//! fixed templates with normalized squared difference and turns the best
//! match into a sigma confidence. A confident bonus hit moves the pointer
//! over it; otherwise a confident city hit is clicked. The X11 backends live
//! behind the `x11` feature and template decoding behind `image-io`.

pub mod capture;
pub mod config;
pub mod convert;
pub mod decision;
pub mod image;
pub mod kernel;
pub mod pointer;
pub mod search;
pub mod template;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use crate::image::io;

pub use capture::{FrameSource, FrameView, MemoryFrameSource, PackedFrame, Point, Region};
pub use config::{PacingConfig, RunConfig, DEFAULT_THRESHOLD};
pub use convert::FrameConverter;
pub use decision::{
    ActionReport, Clock, CycleOutcome, DebugSink, DecisionLoop, LoopState, RunSummary,
    StopToken, SystemClock,
};
pub use crate::image::{ChannelMode, ImageView, OwnedImage};
pub use pointer::{Button, Pointer};
pub use search::{sigma_confidence, ErrorSurface, MatchResult, Matcher};
pub use template::{ActionPolicy, PatternRole, PatternSet, TemplatePattern};
pub use util::{GrabError, GrabResult};
