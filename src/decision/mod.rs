//! The perception-and-reaction loop.
//!
//! Every cycle runs `refresh → convert → match bonus → [match city] →
//! act or idle → pace`, strictly in that order on the calling thread. A bonus
//! hit hovers the pointer and starts the next cycle at once; a city hit
//! clicks and then cools down while the UI redraws; a miss sleeps briefly.
//! The only state carried across cycles is the random generator.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::capture::{FrameSource, Point};
use crate::config::RunConfig;
use crate::convert::FrameConverter;
use crate::image::{ImageView, OwnedImage};
use crate::pointer::{Button, Pointer};
use crate::search::{MatchResult, Matcher};
use crate::template::{ActionPolicy, PatternRole, PatternSet, TemplatePattern};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{GrabError, GrabResult};

pub mod pacing;
pub mod report;

pub use pacing::{center_point, jitter_point, pick_delay, Clock, SystemClock};
pub use report::ActionReport;

/// Loop state; `Cooling` only lasts for the post-click sleep.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopState {
    Scanning,
    Cooling,
}

/// Cooperative stop flag checked at the top of every cycle.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives every scored pattern in debug visualization mode.
pub trait DebugSink {
    fn observe(
        &mut self,
        frame: ImageView<'_, u8>,
        pattern: &TemplatePattern,
        result: &MatchResult,
    ) -> GrabResult<()>;
}

/// What a single cycle did.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// Pointer moved to a jittered point inside the match; no sleep.
    Hovered {
        role: PatternRole,
        result: MatchResult,
        location: Point,
        target: Point,
    },
    /// Pointer moved to the match center and clicked, then cooled down.
    Clicked {
        role: PatternRole,
        result: MatchResult,
        location: Point,
        target: Point,
        cooldown: Duration,
    },
    /// No pattern passed the threshold.
    Idle { pause: Duration },
    /// Debug visualization: both patterns scored, no action taken.
    Observed {
        bonus: MatchResult,
        city: MatchResult,
        pause: Duration,
    },
}

/// Counters accumulated by `DecisionLoop::run`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub hovers: u64,
    pub clicks: u64,
    pub idles: u64,
}

/// Single-threaded decision loop over a frame source and a pointer.
pub struct DecisionLoop<S, P, C, W> {
    source: S,
    pointer: P,
    clock: C,
    report: W,
    patterns: PatternSet,
    config: RunConfig,
    converter: FrameConverter,
    matcher: Matcher,
    canvas: OwnedImage,
    rng: StdRng,
    state: LoopState,
    debug: Option<Box<dyn DebugSink>>,
}

impl<S, P, C, W> DecisionLoop<S, P, C, W>
where
    S: FrameSource,
    P: Pointer,
    C: Clock,
    W: Write,
{
    /// Builds a loop with a generator seeded from the clock.
    pub fn new(
        source: S,
        pointer: P,
        clock: C,
        patterns: PatternSet,
        config: RunConfig,
        report: W,
    ) -> GrabResult<Self> {
        config.validate()?;
        let region = source.region();
        for pattern in patterns.ordered() {
            if pattern.width() > region.width || pattern.height() > region.height {
                return Err(GrabError::TemplateTooLarge {
                    templ_width: pattern.width(),
                    templ_height: pattern.height(),
                    frame_width: region.width,
                    frame_height: region.height,
                });
            }
            if pattern.mode() != config.channel_mode {
                return Err(GrabError::ChannelMismatch {
                    frame: config.channel_mode.channels(),
                    templ: pattern.mode().channels(),
                });
            }
        }

        let canvas = OwnedImage::zeros(region.width, region.height, config.channel_mode)?;
        let rng = StdRng::seed_from_u64(clock.now_unix());
        Ok(Self {
            source,
            pointer,
            clock,
            report,
            patterns,
            converter: FrameConverter::new(config.channel_mode),
            matcher: Matcher::new(),
            config,
            canvas,
            rng,
            state: LoopState::Scanning,
            debug: None,
        })
    }

    /// Replaces the generator, e.g. with a fixed seed.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Installs the sink fed in debug visualization mode.
    pub fn with_debug_sink(mut self, sink: Box<dyn DebugSink>) -> Self {
        self.debug = Some(sink);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Hands back the collaborators, e.g. to tear down the capture.
    pub fn into_parts(self) -> (S, P, C, W) {
        (self.source, self.pointer, self.clock, self.report)
    }

    /// Runs cycles until `stop` is tripped.
    pub fn run(&mut self, stop: &StopToken) -> GrabResult<RunSummary> {
        let mut summary = RunSummary::default();
        while !stop.is_stopped() {
            match self.cycle()? {
                CycleOutcome::Hovered { .. } => summary.hovers += 1,
                CycleOutcome::Clicked { .. } => summary.clicks += 1,
                CycleOutcome::Idle { .. } | CycleOutcome::Observed { .. } => summary.idles += 1,
            }
            summary.cycles += 1;
        }
        Ok(summary)
    }

    /// Runs exactly one cycle.
    pub fn cycle(&mut self) -> GrabResult<CycleOutcome> {
        let _span = trace_span!("cycle").entered();

        self.source.refresh()?;
        self.converter
            .convert_into(self.source.frame(), &mut self.canvas)?;

        if self.config.debug_visualization {
            return self.observe();
        }

        let threshold = self.config.threshold;
        let bonus = self
            .matcher
            .match_pattern(self.canvas.view(), self.patterns.bonus())?;
        if bonus.is_hit(threshold) {
            return self.act(PatternRole::Bonus, bonus);
        }

        let city = self
            .matcher
            .match_pattern(self.canvas.view(), self.patterns.city())?;
        if city.is_hit(threshold) {
            return self.act(PatternRole::City, city);
        }

        let pause = self.pace_idle();
        trace_debug!(
            "cycle_idle",
            bonus_confidence = bonus.confidence,
            city_confidence = city.confidence,
            pause_ms = pause.as_millis() as u64
        );
        Ok(CycleOutcome::Idle { pause })
    }

    fn pattern(&self, role: PatternRole) -> &TemplatePattern {
        match role {
            PatternRole::Bonus => self.patterns.bonus(),
            PatternRole::City => self.patterns.city(),
        }
    }

    fn act(&mut self, role: PatternRole, result: MatchResult) -> GrabResult<CycleOutcome> {
        let location = self.source.translate_local(result.location);
        let pattern = self.pattern(role);
        let (width, height, policy) = (pattern.width(), pattern.height(), pattern.policy());

        let outcome = match policy {
            ActionPolicy::HoverJitter => {
                let target = jitter_point(location, width, height, &mut self.rng);
                self.pointer.move_to(target)?;
                self.write_report(role, location, result.confidence)?;
                CycleOutcome::Hovered {
                    role,
                    result,
                    location,
                    target,
                }
            }
            ActionPolicy::ClickCenter => {
                let target = center_point(location, width, height);
                self.pointer.move_to(target)?;
                self.pointer.click(Button::Left)?;
                self.write_report(role, location, result.confidence)?;

                self.state = LoopState::Cooling;
                let cooldown = pick_delay(self.config.pacing.cooldown_range(), &mut self.rng);
                trace_event!("cooling", cooldown_ms = cooldown.as_millis() as u64);
                self.clock.sleep(cooldown);
                self.state = LoopState::Scanning;
                CycleOutcome::Clicked {
                    role,
                    result,
                    location,
                    target,
                    cooldown,
                }
            }
        };
        Ok(outcome)
    }

    fn observe(&mut self) -> GrabResult<CycleOutcome> {
        let frame = self.canvas.view();
        let bonus = self.matcher.match_pattern(frame, self.patterns.bonus())?;
        let city = self.matcher.match_pattern(frame, self.patterns.city())?;
        if let Some(sink) = self.debug.as_mut() {
            sink.observe(frame, self.patterns.bonus(), &bonus)?;
            sink.observe(frame, self.patterns.city(), &city)?;
        }
        let pause = self.pace_idle();
        Ok(CycleOutcome::Observed { bonus, city, pause })
    }

    fn pace_idle(&mut self) -> Duration {
        let pause = pick_delay(self.config.pacing.idle_range(), &mut self.rng);
        self.clock.sleep(pause);
        pause
    }

    fn write_report(&mut self, role: PatternRole, location: Point, confidence: f64) -> GrabResult<()> {
        let line = ActionReport {
            timestamp: self.clock.now_unix(),
            role,
            location,
            confidence,
        };
        trace_event!(
            "pattern_hit",
            role = role.name(),
            x = location.x,
            y = location.y,
            confidence = confidence
        );
        writeln!(self.report, "{line}")
            .and_then(|_| self.report.flush())
            .map_err(|e| GrabError::Output {
                reason: e.to_string(),
            })
    }
}
