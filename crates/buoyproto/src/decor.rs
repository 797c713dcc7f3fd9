//! Display decorations: a fixed pool of glyphs used in profiles and chat.

/// The full pool. Picks only ever come from the first [`PICK_WINDOW`]
/// entries; the tail exists so the pool can grow without shifting what
/// existing actors look like.
pub const POOL: &[&str] = &[
    "🀄", "🃏", "🌀", "🌁", "🌂", "🌃", "🌄", "🌅", "🌆", "🌇", "🌈", "🌉",
    "🌊", "🌋", "🌌", "🌍", "🌎", "🌏", "🌐", "🌑", "🌒", "🌓", "🌔", "🌕",
];

pub const PICK_WINDOW: usize = 20;

/// Uniform pick from the first [`PICK_WINDOW`] entries of the pool.
pub fn random_decoration() -> &'static str {
    let window = POOL.len().min(PICK_WINDOW);
    POOL[rand_index(window)]
}

/// Uniform f64 in `[0, 1)`, for chat message payloads.
pub fn random_unit() -> f64 {
    let mut b = [0u8; 8];
    getrandom::getrandom(&mut b).expect("getrandom");
    // 53 random mantissa bits.
    (u64::from_be_bytes(b) >> 11) as f64 / (1u64 << 53) as f64
}

fn rand_index(n: usize) -> usize {
    let mut b = [0u8; 4];
    getrandom::getrandom(&mut b).expect("getrandom");
    u32::from_be_bytes(b) as usize % n
}
