//! Random identifiers for rows and display suffixes for placeholder titles.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of conversation and message ids.
pub const ID_LENGTH: usize = 12;

/// Random alphanumeric string of `len` characters.
pub fn generate_random_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Random number rendered with exactly `digits` digits (no leading zero).
pub fn generate_id_number(digits: u32) -> String {
    let digits = digits.clamp(1, 18);
    let low = 10u64.pow(digits - 1);
    let high = 10u64.pow(digits);
    rand::thread_rng().gen_range(low..high).to_string()
}
