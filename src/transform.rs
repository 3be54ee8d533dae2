use crate::types::{NormalizedRect, PageGeometry, PageRect};

/// Maps a top-left-origin normalized rect into bottom-left-origin page units.
/// Out-of-range inputs pass straight through; nothing is clamped or rounded.
pub fn to_page_rect(rect: &NormalizedRect, page: &PageGeometry) -> PageRect {
    PageRect {
        x: rect.x_norm * page.width,
        y: (1.0 - rect.y_norm - rect.h_norm) * page.height,
        width: rect.w_norm * page.width,
        height: rect.h_norm * page.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn letter_page_transform_matches_reference_values() {
        let rect = NormalizedRect::new(0.1, 0.1, 0.25, 0.06);
        let out = to_page_rect(&rect, &PageGeometry::new(612.0, 792.0));
        assert_close(out.x, 61.2);
        assert_close(out.y, 665.28);
        assert_close(out.width, 153.0);
        assert_close(out.height, 47.52);
    }

    #[test]
    fn top_left_corner_maps_to_page_top() {
        let rect = NormalizedRect::new(0.0, 0.0, 0.5, 0.25);
        let out = to_page_rect(&rect, &PageGeometry::new(200.0, 400.0));
        assert_close(out.x, 0.0);
        assert_close(out.y + out.height, 400.0);
    }

    #[test]
    fn full_page_rect_covers_the_page() {
        let rect = NormalizedRect::new(0.0, 0.0, 1.0, 1.0);
        let out = to_page_rect(&rect, &PageGeometry::a4());
        assert_close(out.x, 0.0);
        assert_close(out.y, 0.0);
        assert_close(out.width, 595.28);
        assert_close(out.height, 841.89);
    }

    #[test]
    fn off_page_rects_are_not_clamped() {
        let rect = NormalizedRect::new(0.9, 0.95, 0.5, 0.2);
        let out = to_page_rect(&rect, &PageGeometry::new(100.0, 100.0));
        assert_close(out.x, 90.0);
        assert_close(out.y, -15.0);
        assert_close(out.width, 50.0);
        assert!(out.x + out.width > 100.0);
    }
}
