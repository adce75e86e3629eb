//! Highlight sets, annotation overlay geometry, and the view transform.
//!
//! Pure step/pitch computation depends only on the score; everything in
//! this module is presentation-side and depends on the current layout.
//! Geometry is therefore recomputed lazily and invalidated explicitly on
//! resize, never implicitly.

use lectern_types::{step_at, ElementId, Point, Rect, Size, Step};

use crate::score::RenderedScore;

/// Zoom mode for the rendered image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zoom {
    /// Scale the page to the viewport width (the default).
    Fit,
    /// Fixed manual scale factor (> 0).
    Scale(f64),
}

/// Mapping from toolkit units to screen pixels: a uniform scale plus the
/// screen position of the rendered image. The toolkit's own units are never
/// used for positioning directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub image_origin: Point,
}

impl ViewTransform {
    /// Transform for the configured zoom mode. `Fit` scales the page to
    /// the viewport width minus the configured margin.
    pub fn for_zoom(zoom: Zoom, page: Size, viewport_width: f64, fit_margin: f64) -> Self {
        let scale = match zoom {
            Zoom::Scale(s) => s,
            Zoom::Fit => {
                let usable = (viewport_width - 2.0 * fit_margin).max(1.0);
                if page.width > 0.0 {
                    usable / page.width
                } else {
                    1.0
                }
            }
        };
        Self {
            scale,
            image_origin: Point::new(fit_margin, 0.0),
        }
    }

    /// Height of the rendered image in pixels.
    pub fn content_height(&self, page: Size) -> f64 {
        page.height * self.scale
    }
}

/// Presentation-side geometry queries. Separated behind a trait so the
/// overlay layout can be exercised against fakes and so screen geometry
/// stays out of the pure step computation.
pub trait LayoutProbe {
    /// Screen bounding box of an element, if it is currently laid out.
    fn element_screen_rect(&self, id: &ElementId) -> Option<Rect>;
    /// Screen origin of the viewer container. All overlay positioning is
    /// relative to this.
    fn container_origin(&self) -> Point;
}

/// Concrete layout probe over a rendered score and its view transform.
pub struct ScoreLayout<'a> {
    score: &'a RenderedScore,
    transform: ViewTransform,
    container_origin: Point,
}

impl<'a> ScoreLayout<'a> {
    pub fn new(score: &'a RenderedScore, transform: ViewTransform, container_origin: Point) -> Self {
        Self {
            score,
            transform,
            container_origin,
        }
    }
}

impl LayoutProbe for ScoreLayout<'_> {
    fn element_screen_rect(&self, id: &ElementId) -> Option<Rect> {
        let rect = self.score.element_bounds(id)?;
        Some(rect.scaled(self.transform.scale).translated(
            self.container_origin.x + self.transform.image_origin.x,
            self.container_origin.y + self.transform.image_origin.y,
        ))
    }

    fn container_origin(&self) -> Point {
        self.container_origin
    }
}

/// Elements to mark for a 1-based step index. Index 0 yields the empty
/// set — the valid "cleared" state.
pub fn highlight_for(steps: &[Step], index: usize) -> &[ElementId] {
    step_at(steps, index)
        .map(|s| s.elements.as_slice())
        .unwrap_or(&[])
}

/// Position for one overlay label, in viewer-local pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPos {
    /// Horizontal center under the step's extent; moves between steps.
    pub center_x: f64,
    /// Shared vertical baseline; identical for every step of a layout.
    pub baseline_y: f64,
}

/// Annotation overlay layout with a cached baseline.
///
/// The baseline is computed once per score/layout — the lowest extent
/// across all partitioned elements, plus a padding constant — and reused
/// for every step so labels never jump vertically as harmony changes. It
/// is invalidated on resize or refit and lazily recomputed at the next
/// overlay display.
pub struct OverlayLayout {
    baseline_y: Option<f64>,
    baseline_pad: f64,
}

impl OverlayLayout {
    pub fn new(baseline_pad: f64) -> Self {
        Self {
            baseline_y: None,
            baseline_pad,
        }
    }

    /// Forget the cached baseline. Call on every viewport resize/refit.
    pub fn invalidate(&mut self) {
        self.baseline_y = None;
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline_y
    }

    /// Overlay position for a 1-based step index, or `None` when the index
    /// is 0 or nothing of the step is laid out.
    pub fn position_for(
        &mut self,
        steps: &[Step],
        index: usize,
        probe: &impl LayoutProbe,
    ) -> Option<OverlayPos> {
        let step = step_at(steps, index)?;

        let origin = probe.container_origin();
        let extent = step
            .elements
            .iter()
            .filter_map(|id| probe.element_screen_rect(id))
            .map(|r| r.translated(-origin.x, -origin.y))
            .reduce(|a, b| a.union(&b))?;

        let baseline_y = match self.baseline_y {
            Some(y) => y,
            None => {
                let y = self.compute_baseline(steps, probe)?;
                self.baseline_y = Some(y);
                y
            }
        };

        Some(OverlayPos {
            center_x: extent.center_x(),
            baseline_y,
        })
    }

    fn compute_baseline(&self, steps: &[Step], probe: &impl LayoutProbe) -> Option<f64> {
        let origin = probe.container_origin();
        steps
            .iter()
            .flat_map(|s| s.elements.iter())
            .filter_map(|id| probe.element_screen_rect(id))
            .map(|r| r.bottom() - origin.y)
            .fold(None, |acc: Option<f64>, b| {
                Some(acc.map_or(b, |a| a.max(b)))
            })
            .map(|lowest| lowest + self.baseline_pad)
    }
}

/// Applied by the display layer: visual emphasis marks and the overlay
/// label. Lectern computes what to show; drawing is out of scope.
pub trait HighlightSink {
    fn clear_marks(&mut self);
    fn mark(&mut self, elements: &[ElementId]);
    fn show_overlay(&mut self, pos: OverlayPos, primary: &str, secondary: &str);
    fn hide_overlay(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeProbe {
        rects: HashMap<ElementId, Rect>,
        origin: Point,
    }

    impl FakeProbe {
        fn new(origin: Point, rects: &[(&str, Rect)]) -> Self {
            Self {
                rects: rects
                    .iter()
                    .map(|(id, r)| (ElementId::new(*id), *r))
                    .collect(),
                origin,
            }
        }
    }

    impl LayoutProbe for FakeProbe {
        fn element_screen_rect(&self, id: &ElementId) -> Option<Rect> {
            self.rects.get(id).copied()
        }

        fn container_origin(&self) -> Point {
            self.origin
        }
    }

    fn two_steps() -> Vec<Step> {
        vec![
            Step::new(vec!["n1".into()]),
            Step::new(vec!["n2".into(), "n3".into()]),
        ]
    }

    #[test]
    fn test_baseline_identical_across_steps() {
        let steps = two_steps();
        let probe = FakeProbe::new(
            Point::new(100.0, 50.0),
            &[
                ("n1", Rect::new(110.0, 60.0, 10.0, 10.0)),
                ("n2", Rect::new(140.0, 80.0, 10.0, 30.0)),
                ("n3", Rect::new(150.0, 60.0, 10.0, 10.0)),
            ],
        );
        let mut layout = OverlayLayout::new(18.0);

        let first = layout.position_for(&steps, 1, &probe).unwrap();
        let second = layout.position_for(&steps, 2, &probe).unwrap();

        // Lowest local bottom is n2: 80 + 30 - 50 = 60, plus padding.
        assert_eq!(first.baseline_y, 78.0);
        assert_eq!(second.baseline_y, 78.0);
        assert_ne!(first.center_x, second.center_x);
        // Horizontal center is local: n1 at (110 - 100) + 5.
        assert_eq!(first.center_x, 15.0);
        assert_eq!(second.center_x, 50.0);
    }

    #[test]
    fn test_invalidate_recomputes_baseline() {
        let steps = vec![Step::new(vec!["n1".into()])];
        let mut layout = OverlayLayout::new(10.0);

        let before = FakeProbe::new(Point::default(), &[("n1", Rect::new(0.0, 0.0, 10.0, 10.0))]);
        assert_eq!(
            layout.position_for(&steps, 1, &before).unwrap().baseline_y,
            20.0
        );

        // Without invalidation the cached value is reused even if layout
        // changed underneath.
        let after = FakeProbe::new(Point::default(), &[("n1", Rect::new(0.0, 0.0, 10.0, 40.0))]);
        assert_eq!(
            layout.position_for(&steps, 1, &after).unwrap().baseline_y,
            20.0
        );

        layout.invalidate();
        assert_eq!(
            layout.position_for(&steps, 1, &after).unwrap().baseline_y,
            50.0
        );
    }

    #[test]
    fn test_step_zero_has_no_overlay() {
        let steps = two_steps();
        let probe = FakeProbe::new(Point::default(), &[]);
        let mut layout = OverlayLayout::new(0.0);
        assert!(layout.position_for(&steps, 0, &probe).is_none());
    }

    #[test]
    fn test_unlaid_out_step_yields_none() {
        let steps = two_steps();
        let probe = FakeProbe::new(Point::default(), &[]);
        let mut layout = OverlayLayout::new(0.0);
        assert!(layout.position_for(&steps, 1, &probe).is_none());
    }

    #[test]
    fn test_highlight_sets() {
        let steps = two_steps();
        assert!(highlight_for(&steps, 0).is_empty());
        assert_eq!(highlight_for(&steps, 2).len(), 2);
        assert!(highlight_for(&steps, 9).is_empty());
    }

    #[test]
    fn test_fit_transform() {
        let page = Size::new(400.0, 200.0);
        let t = ViewTransform::for_zoom(Zoom::Fit, page, 832.0, 16.0);
        assert_eq!(t.scale, 2.0);
        assert_eq!(t.content_height(page), 400.0);

        let m = ViewTransform::for_zoom(Zoom::Scale(1.5), page, 832.0, 16.0);
        assert_eq!(m.scale, 1.5);
    }
}
