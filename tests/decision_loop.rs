use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bubblegrab::{
    Button, ChannelMode, Clock, CycleOutcome, DebugSink, DecisionLoop, GrabError, GrabResult,
    ImageView, LoopState, MatchResult, MemoryFrameSource, OwnedImage, PackedFrame, PatternRole,
    PatternSet, Point, Pointer, RunConfig, StopToken, TemplatePattern,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

const WIDTH: usize = 80;
const HEIGHT: usize = 60;
const ORIGIN: Point = Point::new(100, 200);
const NOW: u64 = 1_310_000_000;
const BONUS_AT: (usize, usize) = (10, 12);
const CITY_AT: (usize, usize) = (50, 30);

fn lcg_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = (state * 1_103_515_245 + 12_345) % (1 << 31);
            ((state >> 16) & 0xff) as u8
        })
        .collect()
}

fn bonus_pixels() -> Vec<u8> {
    lcg_bytes(3, 8 * 8)
}

fn city_pixels() -> Vec<u8> {
    lcg_bytes(5, 10 * 6)
}

fn scene(bonus: bool, city: bool) -> PackedFrame {
    let mut gray = vec![128u8; WIDTH * HEIGHT];
    let mut paste = |tpl: &[u8], tpl_width: usize, (x, y): (usize, usize)| {
        for (ty, row) in tpl.chunks_exact(tpl_width).enumerate() {
            let start = (y + ty) * WIDTH + x;
            gray[start..start + tpl_width].copy_from_slice(row);
        }
    };
    if bonus {
        paste(&bonus_pixels(), 8, BONUS_AT);
    }
    if city {
        paste(&city_pixels(), 10, CITY_AT);
    }
    PackedFrame::from_gray(&gray, WIDTH, HEIGHT).unwrap()
}

fn source(frames: Vec<PackedFrame>) -> MemoryFrameSource {
    MemoryFrameSource::new(frames, ORIGIN).unwrap()
}

fn patterns(source: &MemoryFrameSource) -> PatternSet {
    use bubblegrab::FrameSource;
    let bonus = OwnedImage::new(bonus_pixels(), 8, 8, ChannelMode::Grayscale).unwrap();
    let city = OwnedImage::new(city_pixels(), 10, 6, ChannelMode::Grayscale).unwrap();
    PatternSet::new(
        TemplatePattern::bonus(bonus).unwrap(),
        TemplatePattern::city(city).unwrap(),
        source.region(),
        ChannelMode::Grayscale,
    )
    .unwrap()
}

#[derive(Default)]
struct FakePointer {
    position: Point,
    moves: Vec<Point>,
    clicks: Vec<(Point, Button)>,
}

impl Pointer for FakePointer {
    fn position(&mut self) -> GrabResult<Point> {
        Ok(self.position)
    }

    fn warp_by(&mut self, dx: i32, dy: i32) -> GrabResult<()> {
        self.position = self.position.offset(dx, dy);
        self.moves.push(self.position);
        Ok(())
    }

    fn click(&mut self, button: Button) -> GrabResult<()> {
        self.clicks.push((self.position, button));
        Ok(())
    }
}

#[derive(Default)]
struct FakeClock {
    sleeps: Vec<Duration>,
    stop_after: Option<(usize, StopToken)>,
}

impl Clock for FakeClock {
    fn now_unix(&self) -> u64 {
        NOW
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
        if let Some((limit, token)) = &self.stop_after {
            if self.sleeps.len() >= *limit {
                token.stop();
            }
        }
    }
}

type TestLoop<'a> = DecisionLoop<MemoryFrameSource, &'a mut FakePointer, &'a mut FakeClock, Vec<u8>>;

fn build<'a>(
    frames: Vec<PackedFrame>,
    config: RunConfig,
    pointer: &'a mut FakePointer,
    clock: &'a mut FakeClock,
) -> TestLoop<'a> {
    let source = source(frames);
    let patterns = patterns(&source);
    DecisionLoop::new(source, pointer, clock, patterns, config, Vec::new())
        .unwrap()
        .with_rng(StdRng::seed_from_u64(42))
}

fn bonus_screen_origin() -> Point {
    ORIGIN.offset(BONUS_AT.0 as i32, BONUS_AT.1 as i32)
}

fn city_screen_origin() -> Point {
    ORIGIN.offset(CITY_AT.0 as i32, CITY_AT.1 as i32)
}

#[test]
fn bonus_takes_priority_over_city() {
    let mut pointer = FakePointer::default();
    let mut clock = FakeClock::default();
    let mut decision = build(vec![scene(true, true)], RunConfig::default(), &mut pointer, &mut clock);

    let outcome = decision.cycle().unwrap();
    let CycleOutcome::Hovered {
        role,
        location,
        target,
        result,
    } = outcome
    else {
        panic!("expected a hover, got {outcome:?}");
    };
    assert_eq!(role, PatternRole::Bonus);
    assert_eq!(location, bonus_screen_origin());
    assert!((location.x..location.x + 8).contains(&target.x));
    assert!((location.y..location.y + 8).contains(&target.y));

    let (_, _, _, report) = decision.into_parts();
    let line = String::from_utf8(report).unwrap();
    assert_eq!(
        line,
        format!("{NOW}\tBONUS: at 110x212 (score: {:.3})\n", result.confidence)
    );

    assert!(clock.sleeps.is_empty());
    assert!(pointer.clicks.is_empty());
    assert_eq!(pointer.moves, vec![target]);
}

#[test]
fn city_hit_clicks_center_then_cools_down() {
    let mut pointer = FakePointer::default();
    let mut clock = FakeClock::default();
    let mut decision = build(vec![scene(false, true)], RunConfig::default(), &mut pointer, &mut clock);

    let outcome = decision.cycle().unwrap();
    let CycleOutcome::Clicked {
        role,
        location,
        target,
        cooldown,
        ..
    } = outcome
    else {
        panic!("expected a click, got {outcome:?}");
    };
    assert_eq!(role, PatternRole::City);
    assert_eq!(location, city_screen_origin());
    assert_eq!(target, Point::new(155, 233));
    assert!(cooldown >= Duration::from_millis(2000) && cooldown <= Duration::from_millis(4000));
    assert_eq!(decision.state(), LoopState::Scanning);

    let (_, _, _, report) = decision.into_parts();
    assert!(String::from_utf8(report)
        .unwrap()
        .starts_with(&format!("{NOW}\tCITY: at 150x230 (score: ")));

    assert_eq!(pointer.clicks, vec![(Point::new(155, 233), Button::Left)]);
    assert_eq!(clock.sleeps, vec![cooldown]);
}

#[test]
fn misses_pace_with_idle_delay() {
    let mut pointer = FakePointer::default();
    let mut clock = FakeClock::default();
    let mut decision = build(vec![scene(false, false)], RunConfig::default(), &mut pointer, &mut clock);

    for _ in 0..50 {
        let outcome = decision.cycle().unwrap();
        assert!(
            matches!(outcome, CycleOutcome::Idle { .. }),
            "expected idle, got {outcome:?}"
        );
    }
    drop(decision);

    assert_eq!(clock.sleeps.len(), 50);
    assert!(clock
        .sleeps
        .iter()
        .all(|d| *d >= Duration::from_millis(40) && *d <= Duration::from_millis(60)));
    assert!(pointer.moves.is_empty() && pointer.clicks.is_empty());
}

#[test]
fn jittered_targets_stay_inside_bonus_window() {
    let mut pointer = FakePointer::default();
    let mut clock = FakeClock::default();
    let mut decision = build(vec![scene(true, false)], RunConfig::default(), &mut pointer, &mut clock);

    for _ in 0..200 {
        decision.cycle().unwrap();
    }
    drop(decision);

    let origin = bonus_screen_origin();
    assert_eq!(pointer.moves.len(), 200);
    for target in &pointer.moves {
        assert!((origin.x..origin.x + 8).contains(&target.x), "x {}", target.x);
        assert!((origin.y..origin.y + 8).contains(&target.y), "y {}", target.y);
    }
    assert!(clock.sleeps.is_empty());
}

#[test]
fn frames_are_processed_in_order() {
    let mut pointer = FakePointer::default();
    let mut clock = FakeClock::default();
    let frames = vec![scene(true, true), scene(false, true), scene(false, false)];
    let mut decision = build(frames, RunConfig::default(), &mut pointer, &mut clock);

    let roles: Vec<&str> = (0..4)
        .map(|_| match decision.cycle().unwrap() {
            CycleOutcome::Hovered { .. } => "hover",
            CycleOutcome::Clicked { .. } => "click",
            CycleOutcome::Idle { .. } => "idle",
            CycleOutcome::Observed { .. } => "observe",
        })
        .collect();
    assert_eq!(roles, vec!["hover", "click", "idle", "hover"]);

    let (_, _, _, report) = decision.into_parts();
    let text = String::from_utf8(report).unwrap();
    let labels: Vec<&str> = text
        .lines()
        .map(|l| l.split('\t').nth(1).unwrap().split(':').next().unwrap())
        .collect();
    assert_eq!(labels, vec!["BONUS", "CITY", "BONUS"]);
}

#[test]
fn run_checks_stop_token_before_each_cycle() {
    let mut pointer = FakePointer::default();
    let mut clock = FakeClock::default();
    let token = StopToken::new();
    token.stop();
    let mut decision = build(vec![scene(true, true)], RunConfig::default(), &mut pointer, &mut clock);

    let summary = decision.run(&token).unwrap();
    assert_eq!(summary.cycles, 0);
    let (source, _, _, _) = decision.into_parts();
    assert_eq!(source.refreshes(), 0);
}

#[test]
fn run_stops_after_external_signal() {
    let token = StopToken::new();
    let mut pointer = FakePointer::default();
    let mut clock = FakeClock {
        stop_after: Some((3, token.clone())),
        ..FakeClock::default()
    };
    let frames = vec![scene(false, false), scene(false, true)];
    let mut decision = build(frames, RunConfig::default(), &mut pointer, &mut clock);

    let summary = decision.run(&token).unwrap();
    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.idles, 2);
    assert_eq!(summary.clicks, 1);
    assert_eq!(summary.hovers, 0);
}

#[derive(Default)]
struct RecordingSink {
    seen: Rc<RefCell<Vec<(PatternRole, Point)>>>,
}

impl DebugSink for RecordingSink {
    fn observe(
        &mut self,
        frame: ImageView<'_, u8>,
        pattern: &TemplatePattern,
        result: &MatchResult,
    ) -> GrabResult<()> {
        assert_eq!((frame.width(), frame.height()), (WIDTH, HEIGHT));
        self.seen.borrow_mut().push((pattern.role(), result.location));
        Ok(())
    }
}

#[test]
fn debug_mode_observes_without_acting() {
    let mut pointer = FakePointer::default();
    let mut clock = FakeClock::default();
    let sink = RecordingSink::default();
    let seen = Rc::clone(&sink.seen);
    let config = RunConfig {
        debug_visualization: true,
        ..RunConfig::default()
    };
    let mut decision =
        build(vec![scene(true, true)], config, &mut pointer, &mut clock).with_debug_sink(Box::new(sink));

    let outcome = decision.cycle().unwrap();
    let CycleOutcome::Observed { bonus, city, pause } = outcome else {
        panic!("expected an observation, got {outcome:?}");
    };
    assert_eq!(bonus.location, Point::new(10, 12));
    assert_eq!(city.location, Point::new(50, 30));
    assert!(pause >= Duration::from_millis(40) && pause <= Duration::from_millis(60));

    let (_, _, _, report) = decision.into_parts();
    assert!(report.is_empty());
    assert!(pointer.moves.is_empty() && pointer.clicks.is_empty());
    assert_eq!(
        *seen.borrow(),
        vec![
            (PatternRole::Bonus, Point::new(10, 12)),
            (PatternRole::City, Point::new(50, 30)),
        ]
    );
}

#[test]
fn new_rejects_templates_larger_than_region() {
    let big_source = source(vec![scene(false, false)]);
    let set = patterns(&big_source);
    let small = MemoryFrameSource::new(
        vec![PackedFrame::from_gray(&[0u8; 9 * 9], 9, 9).unwrap()],
        ORIGIN,
    )
    .unwrap();

    let err = DecisionLoop::new(
        small,
        FakePointer::default(),
        FakeClock::default(),
        set,
        RunConfig::default(),
        Vec::new(),
    )
    .err()
    .unwrap();
    assert_eq!(
        err,
        GrabError::TemplateTooLarge {
            templ_width: 10,
            templ_height: 6,
            frame_width: 9,
            frame_height: 9,
        }
    );
}

struct BrokenPipe;

impl std::io::Write for BrokenPipe {
    fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn report_write_failure_is_an_output_error() {
    let source = source(vec![scene(true, false)]);
    let set = patterns(&source);
    let mut decision = DecisionLoop::new(
        source,
        FakePointer::default(),
        FakeClock::default(),
        set,
        RunConfig::default(),
        BrokenPipe,
    )
    .unwrap();

    assert!(matches!(decision.cycle(), Err(GrabError::Output { .. })));
}
