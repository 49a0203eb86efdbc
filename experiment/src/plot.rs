//! Result charts: distance histogram (close vs far pairs) and detection rate
//! vs Hamming distance, side by side in one PNG.
//!
//! Rendering needs the `plot` feature. Without it `render` writes nothing and
//! returns `Ok(false)`.

use std::path::Path;

use elsh_fmap::Evaluation;

#[cfg(feature = "plot")]
pub fn render(eval: &Evaluation, d: usize, path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    canvas::draw(eval, d).save(path)?;
    Ok(true)
}

#[cfg(not(feature = "plot"))]
pub fn render(_eval: &Evaluation, _d: usize, _path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    Ok(false)
}

#[cfg_attr(not(feature = "plot"), allow(dead_code))]
/// Bin counts of `distances` over `[0, d]` split into `bins` equal-width bins.
pub fn histogram(distances: &[usize], d: usize, bins: usize) -> Vec<usize> {
    let bins = bins.max(1);
    let mut counts = vec![0; bins];
    for &dist in distances {
        let b = (dist * bins / (d + 1)).min(bins - 1);
        counts[b] += 1;
    }
    counts
}

#[cfg(feature = "plot")]
mod canvas {
    use image::{Rgb, RgbImage};

    use super::histogram;
    use elsh_fmap::Evaluation;

    const WIDTH: u32 = 1400;
    const HEIGHT: u32 = 500;
    const MARGIN: u32 = 50;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const BLUE: Rgb<u8> = Rgb([40, 90, 200]);
    const RED: Rgb<u8> = Rgb([210, 60, 50]);
    const GREEN: Rgb<u8> = Rgb([30, 160, 60]);
    const GRAY: Rgb<u8> = Rgb([160, 160, 160]);

    /// Plot area inside one half of the canvas, y grows downwards.
    struct Panel {
        x0: i64,
        y0: i64,
        w: i64,
        h: i64,
    }

    impl Panel {
        fn new(index: u32) -> Self {
            let half = WIDTH / 2;
            Self {
                x0: (index * half + MARGIN) as i64,
                y0: MARGIN as i64,
                w: (half - 2 * MARGIN) as i64,
                h: (HEIGHT - 2 * MARGIN) as i64,
            }
        }

        /// Map fractions in [0, 1] to pixels.
        fn px(&self, fx: f64) -> i64 {
            self.x0 + (fx.clamp(0.0, 1.0) * self.w as f64).round() as i64
        }

        fn py(&self, fy: f64) -> i64 {
            self.y0 + self.h - (fy.clamp(0.0, 1.0) * self.h as f64).round() as i64
        }

        fn axes(&self, img: &mut RgbImage) {
            line(img, (self.x0, self.y0 + self.h), (self.x0 + self.w, self.y0 + self.h), BLACK);
            line(img, (self.x0, self.y0), (self.x0, self.y0 + self.h), BLACK);
        }
    }

    pub(super) fn draw(eval: &Evaluation, d: usize) -> RgbImage {
        let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, WHITE);
        let threshold = eval.delta as f64 / d as f64;

        // Histogram of close vs far distances
        let left = Panel::new(0);
        let bins = (d / 2).clamp(1, 50);
        let close = histogram(&eval.distances(true), d, bins);
        let far = histogram(&eval.distances(false), d, bins);
        let peak = close.iter().chain(far.iter()).copied().max().unwrap_or(0).max(1);
        for (series, color) in [(&far, RED), (&close, BLUE)] {
            for (b, &count) in series.iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let x_lo = left.px(b as f64 / bins as f64);
                let x_hi = left.px((b + 1) as f64 / bins as f64) - 1;
                let y_top = left.py(count as f64 / peak as f64);
                fill_rect(&mut img, x_lo, y_top, x_hi, left.y0 + left.h, color);
            }
        }
        dashed_vline(&mut img, left.px(threshold), left.y0, left.y0 + left.h, GREEN);
        left.axes(&mut img);

        // Detection rate vs distance
        let right = Panel::new(1);
        dotted_hline(&mut img, right.x0, right.x0 + right.w, right.py(0.5), GRAY);
        dashed_vline(&mut img, right.px(threshold), right.y0, right.y0 + right.h, GREEN);
        let points: Vec<(i64, i64)> = eval
            .detection_curve()
            .iter()
            .map(|p| (right.px(p.distance as f64 / d as f64), right.py(p.rate())))
            .collect();
        for pair in points.windows(2) {
            line(&mut img, pair[0], pair[1], BLUE);
        }
        for &(x, y) in &points {
            fill_rect(&mut img, x - 2, y - 2, x + 2, y + 2, BLUE);
        }
        right.axes(&mut img);

        img
    }

    fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
    }

    fn fill_rect(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                put(img, x, y, color);
            }
        }
    }

    /// Bresenham.
    fn line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            put(img, x, y, color);
            if x == to.0 && y == to.1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn dashed_vline(img: &mut RgbImage, x: i64, y0: i64, y1: i64, color: Rgb<u8>) {
        for y in y0..=y1 {
            if (y - y0) % 12 < 8 {
                put(img, x, y, color);
                put(img, x + 1, y, color);
            }
        }
    }

    fn dotted_hline(img: &mut RgbImage, x0: i64, x1: i64, y: i64, color: Rgb<u8>) {
        for x in (x0..=x1).step_by(4) {
            put(img, x, y, color);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use elsh_fmap::{ConfusionCounters, PairRecord, TheoreticalPrediction};

        #[test]
        fn test_draw_marks_threshold_and_bars() {
            let records = (0..20)
                .map(|j| PairRecord {
                    sender_idx: 0,
                    receiver_idx: j,
                    hamming_distance: j * 3,
                    has_intersection: j % 2 == 0,
                    intersection_size: usize::from(j % 2 == 0),
                })
                .collect();
            let eval = Evaluation {
                delta: 10,
                counters: ConfusionCounters::default(),
                theory: TheoreticalPrediction::compute(64, 10, 8).unwrap(),
                records,
            };
            let img = draw(&eval, 64);
            assert_eq!(img.dimensions(), (WIDTH, HEIGHT));

            let left = Panel::new(0);
            let x = left.px(10.0 / 64.0);
            assert_eq!(*img.get_pixel(x as u32, (left.y0 + 1) as u32), GREEN);
            // the first histogram bin holds close pairs
            let bar_x = left.px(0.5 / 32.0);
            assert_eq!(*img.get_pixel(bar_x as u32, (left.y0 + left.h - 2) as u32), BLUE);
        }
    }
}
