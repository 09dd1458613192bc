//! Locally generated API keys.
//!
//! Without a LiteLLM proxy, keys take the form `<bird>-<NNNN>`.

use rand::Rng;
use rand::seq::IndexedRandom;

pub const BIRD_NAMES: [&str; 30] = [
    "sparrow",
    "eagle",
    "owl",
    "parrot",
    "falcon",
    "heron",
    "crane",
    "duck",
    "swan",
    "magpie",
    "woodpecker",
    "kingfisher",
    "pigeon",
    "dove",
    "wren",
    "robin",
    "finch",
    "tit",
    "jay",
    "lark",
    "hawk",
    "vulture",
    "pelican",
    "seagull",
    "penguin",
    "ostrich",
    "emu",
    "kiwi",
    "albatross",
    "hummingbird",
];

#[must_use]
pub fn generate_bird_key() -> String {
    generate_bird_key_with(&mut rand::rng())
}

pub fn generate_bird_key_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let bird = BIRD_NAMES.choose(rng).copied().unwrap_or("sparrow");
    let number: u16 = rng.random_range(1000..=9999);
    format!("{bird}-{number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bird_key_shape() {
        for _ in 0..200 {
            let key = generate_bird_key();
            let (bird, number) = key.rsplit_once('-').unwrap();
            assert!(BIRD_NAMES.contains(&bird), "unexpected bird in {key}");
            assert_eq!(number.len(), 4);
            let n: u16 = number.parse().unwrap();
            assert!((1000..=9999).contains(&n));
        }
    }
}
