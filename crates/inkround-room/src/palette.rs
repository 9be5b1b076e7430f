//! Player display colors.

use rand::seq::IndexedRandom;

/// Dark-mode friendly palette, one color per player while it lasts.
pub const COLORS: [&str; 20] = [
    "#EF4444", "#3B82F6", "#10B981", "#F59E0B", "#8B5CF6", "#EC4899", "#06B6D4", "#84CC16",
    "#F97316", "#14B8A6", "#6366F1", "#D946EF", "#F43F5E", "#0EA5E9", "#22C55E", "#EAB308",
    "#A855F7", "#64748B", "#A1A1AA", "#FB7185",
];

/// Color of system chat lines.
pub const SYSTEM_COLOR: &str = "#10B981";

/// Fallback for a sender with no recorded color.
pub const DEFAULT_COLOR: &str = "#FFFFFF";

/// Picks a random palette color not in `used`; any palette color once
/// all are taken.
pub fn pick_color<'a>(used: impl IntoIterator<Item = &'a str>) -> &'static str {
    let used: Vec<&str> = used.into_iter().collect();
    let free: Vec<&'static str> = COLORS.iter().copied().filter(|c| !used.contains(c)).collect();
    let mut rng = rand::rng();
    free.choose(&mut rng)
        .or_else(|| COLORS.choose(&mut rng))
        .copied()
        .unwrap_or(DEFAULT_COLOR)
}
