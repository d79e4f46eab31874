//! Overlay drawing onto frames.
//!
//! Draws skeleton links and keypoints for every detected person, a marker at
//! each scored center, a line between every violating pair, and a status
//! banner. Drawing goes through `embedded-graphics` onto the frame's RGB buffer.

use anyhow::{anyhow, Result};
use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use image::RgbImage;
use std::convert::Infallible;

use crate::keypoint::{Person, SKELETON_LINKS};
use crate::proximity::{Point as Center, ProximityReport};

const LINK_COLOR: Rgb888 = Rgb888::new(255, 255, 0);
const KEYPOINT_COLOR: Rgb888 = Rgb888::new(0, 255, 0);
const CENTER_COLOR: Rgb888 = Rgb888::new(0, 200, 255);
const VIOLATION_COLOR: Rgb888 = Rgb888::new(255, 0, 0);
const SAFE_COLOR: Rgb888 = Rgb888::new(0, 160, 0);
const BANNER_HEIGHT: u32 = 28;

/// Which overlay layers to draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overlay {
    pub links: bool,
    pub keypoints: bool,
    pub centers: bool,
    pub pairs: bool,
    pub status: bool,
}

impl Overlay {
    pub const NONE: Overlay = Overlay {
        links: false,
        keypoints: false,
        centers: false,
        pairs: false,
        status: false,
    };

    /// Parse a comma-separated layer list such as `links,keypoints`.
    /// `none` disables every layer.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut overlay = Overlay::NONE;
        for flag in spec.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match flag.to_ascii_lowercase().as_str() {
                "links" => overlay.links = true,
                "keypoints" => overlay.keypoints = true,
                "centers" => overlay.centers = true,
                "pairs" => overlay.pairs = true,
                "status" => overlay.status = true,
                "none" => return Ok(Overlay::NONE),
                other => return Err(anyhow!("unknown overlay layer '{}'", other)),
            }
        }
        Ok(overlay)
    }

    pub fn is_empty(&self) -> bool {
        *self == Overlay::NONE
    }
}

impl Default for Overlay {
    fn default() -> Self {
        Self {
            links: true,
            keypoints: true,
            centers: true,
            pairs: true,
            status: true,
        }
    }
}

/// Draw the selected overlay layers onto `image`.
pub fn draw_overlay(
    image: &mut RgbImage,
    persons: &[Person],
    report: &ProximityReport,
    status: &str,
    overlay: Overlay,
) {
    let mut target = Target(image);

    for person in persons {
        if overlay.links {
            for (from, to) in SKELETON_LINKS {
                if let (Some(a), Some(b)) = (person.find(from), person.find(to)) {
                    draw(
                        &mut target,
                        Line::new(to_point(a.x, a.y), to_point(b.x, b.y))
                            .into_styled(PrimitiveStyle::with_stroke(LINK_COLOR, 2)),
                    );
                }
            }
        }
        if overlay.keypoints {
            for kp in &person.keypoints {
                draw(
                    &mut target,
                    Circle::with_center(to_point(kp.x, kp.y), 7)
                        .into_styled(PrimitiveStyle::with_fill(KEYPOINT_COLOR)),
                );
            }
        }
    }

    if overlay.centers {
        for metrics in &report.people {
            let c = metrics.center.point();
            draw(
                &mut target,
                Circle::with_center(center_point(c), 11)
                    .into_styled(PrimitiveStyle::with_stroke(CENTER_COLOR, 2)),
            );
        }
    }

    if overlay.pairs {
        for pair in report.violating_pairs() {
            let find = |index: usize| {
                report
                    .people
                    .iter()
                    .find(|m| m.index == index)
                    .map(|m| m.center.point())
            };
            if let (Some(a), Some(b)) = (find(pair.first), find(pair.second)) {
                draw(
                    &mut target,
                    Line::new(center_point(a), center_point(b))
                        .into_styled(PrimitiveStyle::with_stroke(VIOLATION_COLOR, 3)),
                );
            }
        }
    }

    if overlay.status {
        let background = if report.verdict.is_violation() {
            VIOLATION_COLOR
        } else {
            SAFE_COLOR
        };
        let width = target.size().width;
        draw(
            &mut target,
            Rectangle::new(Point::zero(), Size::new(width, BANNER_HEIGHT))
                .into_styled(PrimitiveStyle::with_fill(background)),
        );
        draw(
            &mut target,
            Text::with_baseline(
                status,
                Point::new(6, 4),
                MonoTextStyle::new(&FONT_10X20, Rgb888::WHITE),
                Baseline::Top,
            ),
        );
    }
}

fn draw<D: Drawable<Color = Rgb888>>(target: &mut Target<'_>, drawable: D) {
    match drawable.draw(target) {
        Ok(_) => {}
        Err(infallible) => match infallible {},
    }
}

fn to_point(x: f32, y: f32) -> Point {
    Point::new(x.round() as i32, y.round() as i32)
}

fn center_point(c: Center) -> Point {
    to_point(c.x, c.y)
}

struct Target<'a>(&'a mut RgbImage);

impl OriginDimensions for Target<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Target<'_> {
    type Color = Rgb888;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = (self.0.width(), self.0.height());
        for Pixel(point, color) in pixels {
            if point.x >= 0 && (point.x as u32) < width && point.y >= 0 && (point.y as u32) < height
            {
                self.0.put_pixel(
                    point.x as u32,
                    point.y as u32,
                    image::Rgb([color.r(), color.g(), color.b()]),
                );
            }
        }
        Ok(())
    }
}
