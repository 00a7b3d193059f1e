//! Friendly-name suggestions for newly connected devices.

use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "Smart",
    "Living",
    "Family",
    "Media",
    "Home",
    "Cozy",
    "Digital",
    "Main",
    "Entertainment",
    "Crystal",
    "Ultra",
    "Premium",
    "Modern",
];

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const CODE_LEN: usize = 6;
const MIN_DIGITS: usize = 2;

/// Generate a suggested display name, e.g. `Living#A7K20Q`: an adjective
/// plus a short code carrying at least two digits so names stay
/// distinguishable.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();

    let mut code: Vec<u8> = (0..CODE_LEN)
        .map(|_| {
            let index = rng.gen_range(0..LETTERS.len() + DIGITS.len());
            if index < LETTERS.len() {
                LETTERS[index]
            } else {
                DIGITS[index - LETTERS.len()]
            }
        })
        .collect();

    // Top up digits by replacing random letter positions
    let mut digit_count = code.iter().filter(|c| c.is_ascii_digit()).count();
    while digit_count < MIN_DIGITS {
        let letter_positions: Vec<usize> = code
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_ascii_digit())
            .map(|(index, _)| index)
            .collect();
        let position = letter_positions[rng.gen_range(0..letter_positions.len())];
        code[position] = DIGITS[rng.gen_range(0..DIGITS.len())];
        digit_count += 1;
    }

    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    format!("{adjective}#{}", String::from_utf8_lossy(&code))
}
