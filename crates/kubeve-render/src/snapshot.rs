//! Text assertions over rendered frames.

use crate::render::RenderFrame;

/// Asserts that some row of the frame contains `needle`, printing the whole
/// frame on failure.
pub fn assert_frame_contains(label: &str, frame: &RenderFrame, needle: &str) {
    let got = frame.snapshot();
    assert!(
        got.contains(needle),
        "render frame missing {needle:?} ({label})\n--- got\n{got}",
    );
}

/// Asserts the exact text of row `y`, ignoring trailing blanks.
pub fn assert_frame_row(label: &str, frame: &RenderFrame, y: usize, expected: &str) {
    let row = frame.row_text(y);
    let got = row.trim_end();
    assert_eq!(got, expected, "render frame row {y} mismatch ({label})");
}
