//! Bounded-size transform planning.
//!
//! A [`TransformPlan`] captures everything the executor needs to know before
//! touching pixels: the aspect-preserving scaled size that fits the bounding
//! box, and the output canvas size after the orientation correction (width
//! and height trade places for the 90° rotation family, codes 5-8).

use crate::orientation::Orientation;
use crate::Dimensions;

/// Scaled and oriented output geometry for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformPlan {
    /// Width after bounding-box scaling, before any dimension swap.
    pub scaled_width: u32,
    /// Height after bounding-box scaling, before any dimension swap.
    pub scaled_height: u32,
    /// Output canvas width (swapped relative to scaled for codes 5-8).
    pub canvas_width: u32,
    /// Output canvas height (swapped relative to scaled for codes 5-8).
    pub canvas_height: u32,
    /// The orientation correction the executor must apply.
    pub orientation: Orientation,
}

impl TransformPlan {
    /// Plan the transform for an image of `width` x `height` pixels.
    ///
    /// Scaling happens only when at least one dimension exceeds its bound;
    /// images already within bounds pass through at their original size.
    pub fn new(
        width: u32,
        height: u32,
        orientation: Orientation,
        max_width: u32,
        max_height: u32,
    ) -> Self {
        let (scaled_width, scaled_height) = fit_within(width, height, max_width, max_height);
        let scaled = Dimensions::new(scaled_width, scaled_height);
        let canvas = if orientation.swaps_dimensions() {
            scaled.swapped()
        } else {
            scaled
        };
        Self {
            scaled_width,
            scaled_height,
            canvas_width: canvas.width,
            canvas_height: canvas.height,
            orientation,
        }
    }

    /// Output canvas size as a [`Dimensions`] pair.
    pub fn canvas(&self) -> Dimensions {
        Dimensions::new(self.canvas_width, self.canvas_height)
    }

    /// True when no resize is needed (original already within bounds).
    pub fn is_passthrough_scale(&self, width: u32, height: u32) -> bool {
        self.scaled_width == width && self.scaled_height == height
    }
}

/// Uniformly scale `width` x `height` so neither dimension exceeds its bound,
/// preserving aspect ratio. Dimensions already within bounds pass through.
fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let ratio = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height));
    let scaled_width = (f64::from(width) * ratio).round() as u32;
    let scaled_height = (f64::from(height) * ratio).round() as u32;

    // Rounding may collapse a very thin image to zero; keep at least 1px.
    (scaled_width.max(1), scaled_height.max(1))
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: scaled dimensions never exceed the bounding box.
        #[test]
        fn prop_scaled_within_bounds(
            width in 1u32..=10_000,
            height in 1u32..=10_000,
            max_width in 1u32..=4_000,
            max_height in 1u32..=4_000,
        ) {
            let plan = TransformPlan::new(width, height, Orientation::Normal, max_width, max_height);
            // Pass-through only happens when already within bounds
            if width > max_width || height > max_height {
                prop_assert!(plan.scaled_width <= max_width);
                prop_assert!(plan.scaled_height <= max_height);
            } else {
                prop_assert_eq!(plan.scaled_width, width);
                prop_assert_eq!(plan.scaled_height, height);
            }
        }

        /// Property: scaling preserves aspect ratio within rounding error.
        #[test]
        fn prop_aspect_ratio_preserved(
            width in 100u32..=10_000,
            height in 100u32..=10_000,
        ) {
            let plan = TransformPlan::new(width, height, Orientation::Normal, 1920, 1080);
            let original = f64::from(width) / f64::from(height);
            let scaled = f64::from(plan.scaled_width) / f64::from(plan.scaled_height);
            // One pixel of rounding slack on either dimension
            let tolerance = 1.0 / f64::from(plan.scaled_height.min(plan.scaled_width));
            prop_assert!((original - scaled).abs() / original <= tolerance + 0.02);
        }

        /// Property: canvas dimensions are the scaled pair, swapped exactly
        /// for the four rotating orientation codes.
        #[test]
        fn prop_canvas_swap_matches_orientation(
            width in 1u32..=5_000,
            height in 1u32..=5_000,
            code in 1u16..=8,
        ) {
            let orientation = Orientation::from(code);
            let plan = TransformPlan::new(width, height, orientation, 1920, 1080);
            if orientation.swaps_dimensions() {
                prop_assert_eq!(plan.canvas_width, plan.scaled_height);
                prop_assert_eq!(plan.canvas_height, plan.scaled_width);
            } else {
                prop_assert_eq!(plan.canvas_width, plan.scaled_width);
                prop_assert_eq!(plan.canvas_height, plan.scaled_height);
            }
        }
    }
}
