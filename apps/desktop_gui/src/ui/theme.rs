//! Colours and glyphs for groups and coherence markers.

use eframe::egui::Color32;
use shared::domain::Coherence;

pub const GROUP_PALETTE: [Color32; 8] = [
    Color32::from_rgb(88, 101, 242),
    Color32::from_rgb(59, 165, 93),
    Color32::from_rgb(250, 166, 26),
    Color32::from_rgb(237, 66, 69),
    Color32::from_rgb(155, 89, 182),
    Color32::from_rgb(26, 188, 156),
    Color32::from_rgb(233, 30, 99),
    Color32::from_rgb(52, 152, 219),
];

pub const SUCCESS_FILL: Color32 = Color32::from_rgb(46, 125, 50);
pub const ERROR_FILL: Color32 = Color32::from_rgb(111, 53, 53);
pub const OVERLAY_FILL: Color32 = Color32::from_black_alpha(160);

/// Accent for the group at `index` in display order.
pub fn group_accent(index: usize) -> Color32 {
    GROUP_PALETTE[index % GROUP_PALETTE.len()]
}

pub fn coherence_color(coherence: &Coherence) -> Color32 {
    match coherence {
        Coherence::Excellent => Color32::from_rgb(67, 181, 129),
        Coherence::Good => Color32::from_rgb(250, 197, 28),
        Coherence::Moderate => Color32::from_rgb(240, 132, 50),
        Coherence::Other(_) => Color32::GRAY,
    }
}

pub fn coherence_stars(coherence: &Coherence) -> String {
    match coherence.rating() {
        0 => "·".to_string(),
        n => "★".repeat(usize::from(n)),
    }
}
