// Comparative diagram - crater and overpressure rings on one shared scale

use super::canvas::Canvas2d;
use super::summary::{format_energy_mt, format_km};
use super::{Overpressure, CRATER_COLOR, TEXT_COLOR};
use crate::simulation_client::SimulationResult;

/// Margin around the rings, in CSS pixels
pub const PADDING_CSS_PX: f64 = 36.0;
const FONT_CSS_PX: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagramRing {
    pub label: &'static str,
    pub color: &'static str,
    pub line_width: f64,
    /// Physical radius; unknown reads as 0
    pub radius_m: f64,
}

impl DiagramRing {
    fn overpressure(level: Overpressure, radius_m: f64) -> Self {
        Self {
            label: level.label(),
            color: level.color(),
            line_width: if level == Overpressure::Psi10 { 3.0 } else { 2.0 },
            radius_m,
        }
    }

    fn crater(radius_m: f64) -> Self {
        Self {
            label: "Crater",
            color: CRATER_COLOR,
            line_width: 3.0,
            radius_m,
        }
    }
}

/// Rings in drawing order: overpressure from 10 psi outward, crater on top
pub fn diagram_rings(result: &SimulationResult) -> Vec<DiagramRing> {
    let mut rings: Vec<DiagramRing> = Overpressure::ALL
        .into_iter()
        .map(|level| DiagramRing::overpressure(level, result.ring_m(level).unwrap_or(0.0)))
        .collect();
    rings.push(DiagramRing::crater(result.crater_radius_m().unwrap_or(0.0)));
    rings
}

/// Pixels per metre so the largest ring fills the usable square.
/// Falls back to 1 when there is nothing to scale or no room to draw.
pub fn diagram_scale(max_radius_m: f64, usable_px: f64) -> f64 {
    if usable_px > 0.0 && max_radius_m > 0.0 {
        usable_px / (2.0 * max_radius_m)
    } else {
        1.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramLayout {
    pub center: (f64, f64),
    pub padding: f64,
    pub scale: f64,
    pub rings: Vec<DiagramRing>,
}

impl DiagramLayout {
    pub fn compute(result: &SimulationResult, width: f64, height: f64, pixel_ratio: f64) -> Self {
        let rings = diagram_rings(result);
        let max_r = rings.iter().map(|r| r.radius_m).fold(0.0, f64::max);
        let padding = PADDING_CSS_PX * pixel_ratio;
        let usable = width.min(height) - 2.0 * padding;

        Self {
            center: (width / 2.0, height / 2.0),
            padding,
            scale: diagram_scale(max_r, usable),
            rings,
        }
    }

    /// Radius in pixels, or `None` when the ring has nothing to draw
    pub fn drawn_radius(&self, ring: &DiagramRing) -> Option<f64> {
        let r = ring.radius_m * self.scale;
        (r.is_finite() && r > 0.0).then_some(r)
    }
}

/// Clear the canvas and draw the full diagram for one result
pub fn draw_diagram(canvas: &mut dyn Canvas2d, result: &SimulationResult) -> DiagramLayout {
    canvas.clear();
    let dpr = canvas.pixel_ratio();
    let layout = DiagramLayout::compute(result, canvas.width(), canvas.height(), dpr);
    let (cx, cy) = layout.center;

    for ring in &layout.rings {
        if let Some(r) = layout.drawn_radius(ring) {
            canvas.stroke_circle(cx, cy, r, ring.line_width, ring.color);
        }
    }

    draw_legend(canvas, layout.padding, layout.padding, dpr);
    draw_footer(canvas, result, dpr);
    layout
}

fn draw_legend(canvas: &mut dyn Canvas2d, x: f64, y: f64, s: f64) {
    let entries = std::iter::once(("Crater", CRATER_COLOR))
        .chain(Overpressure::ALL.into_iter().map(|l| (l.label(), l.color())));

    let mut yy = y + 4.0 * s;
    for (label, color) in entries {
        canvas.fill_rect(x, yy - 10.0 * s, 12.0 * s, 12.0 * s, color);
        canvas.fill_text(label, x + 18.0 * s, yy, FONT_CSS_PX * s, TEXT_COLOR);
        yy += 18.0 * s;
    }
}

fn draw_footer(canvas: &mut dyn Canvas2d, result: &SimulationResult, s: f64) {
    let h = canvas.height();
    let energy = format!("Energy: {} Mt TNT", format_energy_mt(result.energy_mt()));
    let crater = format!("Crater radius: {} km", format_km(result.crater_radius_m()));
    canvas.fill_text(&energy, 12.0 * s, h - 28.0 * s, FONT_CSS_PX * s, TEXT_COLOR);
    canvas.fill_text(&crater, 12.0 * s, h - 12.0 * s, FONT_CSS_PX * s, TEXT_COLOR);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::canvas::{CanvasSize, RecordingCanvas};
    use crate::simulation_client::{Kpis, RingRadii};
    use rand::Rng;

    fn result(crater: Option<f64>, rings: [Option<f64>; 4]) -> SimulationResult {
        SimulationResult {
            kpis: Some(Kpis {
                energy_mt: Some(3.2),
                crater_radius_m: crater,
            }),
            rings_m: Some(RingRadii {
                psi1: rings[0],
                psi3: rings[1],
                psi5: rings[2],
                psi10: rings[3],
            }),
            ..Default::default()
        }
    }

    fn radius_of(canvas: &RecordingCanvas, color: &str) -> f64 {
        canvas
            .circles()
            .into_iter()
            .find(|(_, c)| *c == color)
            .map(|(r, _)| r)
            .unwrap()
    }

    #[test]
    fn test_crater_nests_between_3psi_and_5psi() {
        let r = result(Some(250.0), [Some(100.0), Some(200.0), Some(300.0), Some(400.0)]);
        let mut canvas = RecordingCanvas::new(CanvasSize::new(640.0, 420.0, 1.0));
        draw_diagram(&mut canvas, &r);

        let crater = radius_of(&canvas, CRATER_COLOR);
        let psi3 = radius_of(&canvas, Overpressure::Psi3.color());
        let psi5 = radius_of(&canvas, Overpressure::Psi5.color());
        assert!(psi3 < crater && crater < psi5);
    }

    #[test]
    fn test_largest_ring_fills_usable_square() {
        let r = result(Some(250.0), [Some(100.0), Some(200.0), Some(300.0), Some(400.0)]);
        let mut canvas = RecordingCanvas::new(CanvasSize::new(640.0, 420.0, 2.0));
        let layout = draw_diagram(&mut canvas, &r);

        // 840 px tall backing, 72 px padding each side
        let usable = 840.0 - 2.0 * 72.0;
        assert!((layout.scale - usable / 800.0).abs() < 1e-12);
        // the fixture's largest radius is the 10 psi ring
        let outer = radius_of(&canvas, Overpressure::Psi10.color());
        assert!((outer - usable / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_unknown_radii_draw_no_circles() {
        let r = result(None, [None, Some(0.0), Some(f64::NAN), None]);
        let mut canvas = RecordingCanvas::new(CanvasSize::default());
        let layout = draw_diagram(&mut canvas, &r);

        assert!((layout.scale - 1.0).abs() < 1e-12);
        assert!(canvas.circles().is_empty());
        // legend and footer are still drawn
        assert_eq!(canvas.texts().len(), 7);
    }

    #[test]
    fn test_scale_falls_back_without_room() {
        assert!((diagram_scale(500.0, -10.0) - 1.0).abs() < 1e-12);
        assert!((diagram_scale(0.0, 300.0) - 1.0).abs() < 1e-12);
        assert!((diagram_scale(150.0, 300.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_redraw_does_not_accumulate() {
        let r = result(Some(10.0), [Some(40.0), Some(30.0), Some(20.0), Some(15.0)]);
        let mut canvas = RecordingCanvas::new(CanvasSize::default());
        draw_diagram(&mut canvas, &r);
        let first = canvas.ops().len();
        draw_diagram(&mut canvas, &r);
        assert_eq!(canvas.ops().len(), first);
        assert_eq!(canvas.circles().len(), 5);
    }

    #[test]
    fn test_footer_reports_energy_and_crater_km() {
        let r = result(Some(1500.0), [None; 4]);
        let mut canvas = RecordingCanvas::new(CanvasSize::default());
        draw_diagram(&mut canvas, &r);
        let texts = canvas.texts();
        assert!(texts.contains(&"Energy: 3.20 Mt TNT"));
        assert!(texts.contains(&"Crater radius: 1.50 km"));
    }

    #[test]
    fn test_random_radii_keep_physical_order() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let radii: Vec<f64> = (0..5).map(|_| rng.gen_range(1.0..50_000.0)).collect();
            let r = result(
                Some(radii[4]),
                [Some(radii[0]), Some(radii[1]), Some(radii[2]), Some(radii[3])],
            );
            let mut canvas = RecordingCanvas::new(CanvasSize::new(400.0, 300.0, 1.5));
            let layout = draw_diagram(&mut canvas, &r);

            let usable = canvas.width().min(canvas.height()) - 2.0 * layout.padding;
            for ring in &layout.rings {
                let drawn = layout.drawn_radius(ring).unwrap();
                assert!(drawn <= usable / 2.0 + 1e-9);
                for other in &layout.rings {
                    let other_drawn = layout.drawn_radius(other).unwrap();
                    if ring.radius_m < other.radius_m {
                        assert!(drawn < other_drawn);
                    }
                }
            }
        }
    }
}
