//! Input checks applied before any wallet or network call.

const ADDRESS_PREFIXES: [&str; 2] = ["addr1", "tnight1"];
const MIN_ADDRESS_LEN: usize = 21;

/// Accept mainnet (`addr1`) and Midnight testnet (`tnight1`) addresses longer than 20 chars
/// whose data part is lowercase bech32 (ASCII lowercase letters and digits).
pub fn is_valid_address(address: &str) -> bool {
    address.len() >= MIN_ADDRESS_LEN
        && ADDRESS_PREFIXES.iter().any(|p| {
            address.strip_prefix(p).is_some_and(|data| {
                data.bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
            })
        })
}

pub fn is_valid_password(password: &str) -> bool {
    !password.trim().is_empty()
}
