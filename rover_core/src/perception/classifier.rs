// rover_core/src/perception/classifier.rs

use image::{Luma, Rgb};

use crate::config::PerceptionConfig;
use crate::perception::roi::RoiPolygon;
use crate::perception::ClassifiedMasks;
use crate::types::{Frame, Mask};

/// Splits a camera frame into terrain, obstacle and sample masks using fixed
/// color rules.
///
/// The region-of-interest masks depend only on the frame size, so they are
/// rasterized once at construction.
#[derive(Debug, Clone)]
pub struct ImageClassifier {
    terrain_threshold: [u8; 3],
    sample_band: ([u8; 3], [u8; 3]),
    sky_band: ([u8; 3], [u8; 3]),
    terrain_roi: Mask,
    sky_roi: Mask,
}

impl ImageClassifier {
    pub fn new(config: &PerceptionConfig) -> Self {
        let (w, h) = (config.frame_width, config.frame_height);
        Self {
            terrain_threshold: config.terrain_threshold,
            sample_band: (config.sample_low, config.sample_high),
            sky_band: (config.sky_low, config.sky_high),
            terrain_roi: RoiPolygon::from_fractions(&config.terrain_roi, w, h).rasterize(w, h),
            sky_roi: RoiPolygon::from_fractions(&config.sky_roi, w, h).rasterize(w, h),
        }
    }

    /// Produces the three camera-perspective masks for `frame`.
    ///
    /// The frame must have the size the classifier was built for; the
    /// pipeline checks this before calling.
    pub fn classify(&self, frame: &Frame) -> ClassifiedMasks {
        let terrain = self.terrain(frame);
        let sample = self.sample(frame);
        let obstacle = self.obstacle(frame, &terrain);
        ClassifiedMasks {
            terrain,
            obstacle,
            sample,
        }
    }

    /// Pixels inside the terrain ROI whose every channel exceeds the threshold.
    pub fn terrain(&self, frame: &Frame) -> Mask {
        let t = self.terrain_threshold;
        masked_select(frame, Some(&self.terrain_roi), |px| {
            px[0] > t[0] && px[1] > t[1] && px[2] > t[2]
        })
    }

    /// Pixels whose channels all fall inside the sample color band.
    pub fn sample(&self, frame: &Frame) -> Mask {
        let (low, high) = self.sample_band;
        masked_select(frame, None, |px| in_band(px, low, high))
    }

    /// Everything that is neither sky (inside the sky ROI) nor terrain.
    pub fn obstacle(&self, frame: &Frame, terrain: &Mask) -> Mask {
        let (low, high) = self.sky_band;
        let sky = masked_select(frame, Some(&self.sky_roi), |px| in_band(px, low, high));
        Mask::from_fn(frame.width(), frame.height(), |x, y| {
            let is_sky = sky.get_pixel(x, y)[0] != 0;
            let is_terrain = terrain.get_pixel(x, y)[0] != 0;
            Luma([u8::from(!is_sky && !is_terrain)])
        })
    }
}

fn in_band(px: &Rgb<u8>, low: [u8; 3], high: [u8; 3]) -> bool {
    (0..3).all(|c| px[c] >= low[c] && px[c] <= high[c])
}

/// Applies `predicate` to every pixel, treating pixels outside `roi` as black.
fn masked_select<F>(frame: &Frame, roi: Option<&Mask>, predicate: F) -> Mask
where
    F: Fn(&Rgb<u8>) -> bool,
{
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    Mask::from_fn(frame.width(), frame.height(), |x, y| {
        let inside = roi.map_or(true, |m| m.get_pixel(x, y)[0] != 0);
        let px = if inside { frame.get_pixel(x, y) } else { &BLACK };
        Luma([u8::from(predicate(px))])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKY: Rgb<u8> = Rgb([120, 120, 130]);
    const GROUND: Rgb<u8> = Rgb([200, 180, 160]);
    const ROCK: Rgb<u8> = Rgb([160, 140, 20]);
    const WALL: Rgb<u8> = Rgb([40, 30, 20]);

    fn classifier() -> ImageClassifier {
        ImageClassifier::new(&PerceptionConfig::default())
    }

    #[test]
    fn ground_below_roi_is_terrain_and_above_is_not() {
        let frame = Frame::from_pixel(320, 160, GROUND);
        let masks = classifier().classify(&frame);
        assert_eq!(masks.terrain.get_pixel(100, 150)[0], 1);
        assert_eq!(masks.terrain.get_pixel(100, 10)[0], 0);
        // Ground above the terrain ROI is neither sky nor terrain.
        assert_eq!(masks.obstacle.get_pixel(100, 10)[0], 1);
        assert_eq!(masks.obstacle.get_pixel(100, 150)[0], 0);
    }

    #[test]
    fn sky_in_upper_band_is_not_obstacle() {
        let frame = Frame::from_fn(320, 160, |_, y| if y < 100 { SKY } else { WALL });
        let masks = classifier().classify(&frame);
        assert_eq!(masks.obstacle.get_pixel(5, 5)[0], 0);
        assert_eq!(masks.obstacle.get_pixel(5, 64)[0], 0);
        // Sky-colored pixels below the sky ROI are obstacles.
        assert_eq!(masks.obstacle.get_pixel(5, 80)[0], 1);
        assert_eq!(masks.obstacle.get_pixel(5, 120)[0], 1);
        assert_eq!(masks.terrain.get_pixel(5, 120)[0], 0);
    }

    #[test]
    fn rock_is_detected_anywhere() {
        let mut frame = Frame::from_pixel(320, 160, WALL);
        frame.put_pixel(3, 2, ROCK);
        frame.put_pixel(300, 150, ROCK);
        let masks = classifier().classify(&frame);
        assert_eq!(masks.sample.get_pixel(3, 2)[0], 1);
        assert_eq!(masks.sample.get_pixel(300, 150)[0], 1);
        assert_eq!(masks.sample.pixels().filter(|p| p[0] == 1).count(), 2);
    }
}
