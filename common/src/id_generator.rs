use crate::games::SessionRng;

const PREFIXES: &[&str] = &[
    "Pixel", "Neon", "Retro", "Byte", "Grid", "Arcade", "Night", "Cyber",
    "Turbo", "Glitch", "Laser", "Chrome", "Vector", "Sonic", "Hyper", "Mega",
];

const SUFFIXES: &[&str] = &[
    "Viper", "Slither", "Crawler", "Ghost", "Racer", "Dragon", "Serpent", "Cobra",
    "Python", "Mamba", "Adder", "Boa", "Fang", "Coil", "Scale", "Hiss",
];

/// Arcade-style handle for a spectated bot, e.g. `NeonMamba42`.
pub fn generate_bot_name(rng: &mut SessionRng) -> String {
    let prefix = rng.choose(PREFIXES).copied().unwrap_or("Snake");
    let suffix = rng.choose(SUFFIXES).copied().unwrap_or("Bot");
    let number: u32 = rng.random_range(1..100);
    format!("{prefix}{suffix}{number}")
}
