use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a crosshair
pub fn draw_marker(canvas: &mut BrailleCanvas, x: i32, y: i32, size: i32) {
    for i in -size..=size {
        canvas.set_pixel_signed(x + i, y);
        canvas.set_pixel_signed(x, y + i);
    }
}

/// Draw a filled circle
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Draw a circle outline by angular sampling. `dash` > 0 leaves gaps:
/// dots are drawn in runs of `dash` samples, then `dash` are skipped.
pub fn draw_ring(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: f64, dash: usize) {
    if radius < 0.5 {
        canvas.set_pixel_signed(cx, cy);
        return;
    }
    // Roughly one sample per pixel of circumference
    let samples = ((std::f64::consts::TAU * radius).ceil() as usize).max(8);
    for i in 0..samples {
        if dash > 0 && (i / dash) % 2 == 1 {
            continue;
        }
        let angle = i as f64 / samples as f64 * std::f64::consts::TAU;
        let x = cx as f64 + radius * angle.cos();
        let y = cy as f64 + radius * angle.sin();
        canvas.set_pixel_signed(x.round() as i32, y.round() as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        // Top dot row of every cell
        assert_eq!(canvas.to_string(), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert_eq!(canvas.to_string(), "⡇\n⡇");
    }

    #[test]
    fn test_marker_is_a_cross() {
        let mut canvas = BrailleCanvas::new(4, 2);
        draw_marker(&mut canvas, 3, 3, 2);
        assert!(canvas.glyph(0, 0).is_some()); // (1,3)
        assert!(canvas.glyph(1, 1).is_some()); // (3,5)
    }

    #[test]
    fn test_ring_leaves_center_empty() {
        let mut canvas = BrailleCanvas::new(10, 5);
        draw_ring(&mut canvas, 10, 10, 8.0, 0);
        assert_eq!(canvas.glyph(5, 2), None);
        assert!(!canvas.is_empty());
    }

    #[test]
    fn test_dashed_ring_draws_fewer_dots() {
        let mut solid = BrailleCanvas::new(20, 10);
        let mut dashed = BrailleCanvas::new(20, 10);
        draw_ring(&mut solid, 20, 20, 12.0, 0);
        draw_ring(&mut dashed, 20, 20, 12.0, 3);
        let count = |c: &BrailleCanvas| {
            (0..c.height())
                .flat_map(|y| (0..c.width()).map(move |x| (x, y)))
                .filter_map(|(x, y)| c.glyph(x, y))
                .map(|g| (g as u32 - 0x2800).count_ones())
                .sum::<u32>()
        };
        assert!(count(&dashed) < count(&solid));
    }
}
