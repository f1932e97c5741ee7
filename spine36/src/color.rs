//! Packed color words as stored in `.skel` files.

/// Unpacks `0xRRGGBBAA` into normalized `[r, g, b, a]`.
pub fn rgba8888_to_color(value: i32) -> [f32; 4] {
    let v = value as u32;
    [
        ((v >> 24) & 0xFF) as f32 / 255.0,
        ((v >> 16) & 0xFF) as f32 / 255.0,
        ((v >> 8) & 0xFF) as f32 / 255.0,
        (v & 0xFF) as f32 / 255.0,
    ]
}

/// Unpacks `0x??RRGGBB` into normalized `[r, g, b]`; the top byte is ignored.
pub fn rgb888_to_color(value: i32) -> [f32; 3] {
    let v = value as u32;
    [
        ((v >> 16) & 0xFF) as f32 / 255.0,
        ((v >> 8) & 0xFF) as f32 / 255.0,
        (v & 0xFF) as f32 / 255.0,
    ]
}

fn channel(c: f32) -> u32 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u32
}

pub fn color_to_rgba8888(color: [f32; 4]) -> i32 {
    (channel(color[0]) << 24 | channel(color[1]) << 16 | channel(color[2]) << 8 | channel(color[3]))
        as i32
}

pub fn color_to_rgb888(color: [f32; 3]) -> i32 {
    (channel(color[0]) << 16 | channel(color[1]) << 8 | channel(color[2])) as i32
}
