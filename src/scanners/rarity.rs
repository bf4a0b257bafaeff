//! Echo rarity from the card's accent color.

use image::RgbaImage;

/// Per-channel tolerance when matching a palette color.
pub const COLOR_TOLERANCE: u8 = 10;

/// Accent colors (RGB), highest rarity first. Checked in this order.
pub const RARITY_PALETTE: [(u8, [u8; 3]); 5] = [
    (5, [255, 230, 90]),
    (4, [202, 109, 255]),
    (3, [89, 180, 211]),
    (2, [92, 195, 94]),
    (1, [239, 236, 225]),
];

/// Rarity assigned when no palette color is present.
pub const LOWEST_RARITY: u8 = 1;

fn within(channel: u8, target: u8) -> bool {
    channel.abs_diff(target) <= COLOR_TOLERANCE
}

fn contains_color(image: &RgbaImage, color: [u8; 3]) -> bool {
    image.pixels().any(|p| {
        within(p[0], color[0]) && within(p[1], color[1]) && within(p[2], color[2])
    })
}

/// Returns the rarity of the first palette color found anywhere in `card`.
pub fn classify_rarity(card: &RgbaImage) -> u8 {
    RARITY_PALETTE
        .iter()
        .find(|(_, color)| contains_color(card, *color))
        .map(|(rarity, _)| *rarity)
        .unwrap_or(LOWEST_RARITY)
}
