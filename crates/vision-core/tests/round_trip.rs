//! Round-trip properties of the NES coordinate mapping and template
//! matcher, fuzzed with `proptest` the way `nesium-support`'s resampler
//! equivalence suites are.

use proptest::prelude::*;
use vision_core::frame::NesFrame;
use vision_core::image_buf::{Bgr, BgrImage};
use vision_core::template::{match_template_max, max_channel_gray};

proptest! {
    /// At scale 1.0 (native resolution equals NES resolution),
    /// `NesFrame::extract` of a single pixel returns that exact pixel —
    /// no resampling occurs.
    #[test]
    fn extract_identity_at_scale_one(
        x in 0i64..256,
        y in 0i64..240,
        r in any::<u8>(), g in any::<u8>(), b in any::<u8>(),
    ) {
        let mut img = BgrImage::new(256, 240);
        img.set(x as u32, y as u32, Bgr { b, g, r });
        let nf = NesFrame::new(img.clone(), 0, 0);
        let tile = nf.extract(x, y, 1, 1);
        prop_assert_eq!(tile.get(0, 0), img.get(x as u32, y as u32));
    }

    /// At scale 1.0, `scale_coord_x`/`scale_coord_y` degrade to plain
    /// rounding — the identity calibration case of the NES-to-native pixel
    /// mapping.
    #[test]
    fn scale_coord_identity_at_scale_one(v in 0.0f64..256.0) {
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        prop_assert_eq!(nf.scale_coord_x(v), v.round() as i64);
        prop_assert_eq!(nf.scale_coord_y(v), v.round() as i64);
    }

    /// A non-uniform template matched against an identical region always
    /// scores at (or within float tolerance of) the correlation maximum.
    #[test]
    fn template_matches_itself_at_max_score(
        pixels in prop::collection::vec(any::<u8>(), 16),
    ) {
        prop_assume!(pixels.iter().any(|&p| p != pixels[0]));

        let mut img = BgrImage::new(4, 4);
        for (i, &v) in pixels.iter().enumerate() {
            img.set((i % 4) as u32, (i / 4) as u32, Bgr { b: v, g: v, r: v });
        }
        let gray = max_channel_gray(&img);
        let score = match_template_max(&gray, &gray);
        prop_assert!((score - 1.0).abs() < 1e-4, "score was {score}");
    }
}
