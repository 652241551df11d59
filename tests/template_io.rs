#![cfg(feature = "image-io")]

use std::path::PathBuf;

use bubblegrab::io::{load_template, owned_from_rgb_image, render_match, PngDebugSink};
use bubblegrab::{
    ChannelMode, DebugSink, GrabError, MatchResult, Matcher, OwnedImage, PackedFrame, Point,
    TemplatePattern,
};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("bubblegrab-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn grayscale_template_round_trips_through_png() {
    let dir = scratch_dir("gray");
    let path = dir.join("glyph.png");
    let img = image::GrayImage::from_fn(5, 3, |x, y| image::Luma([(x * 40 + y) as u8]));
    img.save(&path).unwrap();

    let owned = load_template(&path, ChannelMode::Grayscale).unwrap();
    assert_eq!((owned.width(), owned.height()), (5, 3));
    assert_eq!(owned.mode(), ChannelMode::Grayscale);
    assert_eq!(owned.data(), img.as_raw().as_slice());
}

#[test]
fn color_template_uses_capture_component_order() {
    let dir = scratch_dir("color");
    let path = dir.join("glyph.png");
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]));
    img.save(&path).unwrap();

    let owned = load_template(&path, ChannelMode::Color).unwrap();
    assert_eq!(owned.mode(), ChannelMode::Color);
    assert_eq!(&owned.data()[..3], &[30, 20, 10]);
}

#[test]
fn color_template_matches_screenshot_frame() {
    let mut shot = image::RgbImage::from_pixel(40, 30, image::Rgb([20, 20, 20]));
    for y in 8..12 {
        for x in 15..21 {
            shot.put_pixel(x, y, image::Rgb([250, 40, 5]));
        }
    }
    let frame = bubblegrab::FrameConverter::new(ChannelMode::Color)
        .convert(PackedFrame::from_rgb_image(&shot).unwrap().view())
        .unwrap();
    let tpl = image::RgbImage::from_pixel(6, 4, image::Rgb([250, 40, 5]));
    let pattern = TemplatePattern::bonus(owned_from_rgb_image(&tpl).unwrap()).unwrap();

    let result = Matcher::new().match_pattern(frame.view(), &pattern).unwrap();
    assert_eq!(result.location, Point::new(15, 8));
    assert_eq!(result.raw_error, 0.0);
}

#[test]
fn missing_template_is_a_load_error() {
    let path = scratch_dir("missing").join("absent.png");
    let err = load_template(&path, ChannelMode::Grayscale).err().unwrap();
    match err {
        GrabError::TemplateLoad { path: reported, .. } => {
            assert_eq!(reported, path.display().to_string())
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn rendered_match_outlines_window() {
    let frame = OwnedImage::new(vec![50u8; 8 * 6], 8, 6, ChannelMode::Grayscale).unwrap();
    let out = render_match(frame.view(), Point::new(2, 1), 3, 3).unwrap();

    let red = image::Rgb([255u8, 0, 0]);
    assert_eq!(*out.get_pixel(2, 1), red);
    assert_eq!(*out.get_pixel(4, 3), red);
    assert_eq!(*out.get_pixel(3, 2), image::Rgb([50, 50, 50]));
    assert_eq!(*out.get_pixel(0, 0), image::Rgb([50, 50, 50]));
}

#[test]
fn png_sink_writes_one_file_per_role() {
    let dir = scratch_dir("sink");
    let frame = OwnedImage::zeros(12, 10, ChannelMode::Grayscale).unwrap();
    let bonus = TemplatePattern::bonus(OwnedImage::zeros(4, 4, ChannelMode::Grayscale).unwrap())
        .unwrap();
    let city =
        TemplatePattern::city(OwnedImage::zeros(5, 2, ChannelMode::Grayscale).unwrap()).unwrap();
    let result = MatchResult {
        location: Point::new(1, 1),
        confidence: 3.0,
        raw_error: 0.1,
    };

    let mut sink = PngDebugSink::new(&dir);
    sink.observe(frame.view(), &bonus, &result).unwrap();
    sink.observe(frame.view(), &city, &result).unwrap();

    let written = image::open(dir.join("bonus.png")).unwrap().to_rgb8();
    assert_eq!(written.dimensions(), (12, 10));
    assert_eq!(*written.get_pixel(1, 1), image::Rgb([255, 0, 0]));
    assert_eq!(sink.path_for(&city), dir.join("city.png"));
    assert!(dir.join("city.png").exists());
}
