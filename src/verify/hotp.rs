use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 4226 HOTP value of `key` at `counter`, reduced to `digits` decimal digits.
///
/// `None` when `digits` is too large for a 32-bit result.
pub fn hotp(key: &[u8], counter: u64, digits: u32) -> Option<u32> {
    let modulus = 10u32.checked_pow(digits)?;
    let mut mac = <HmacSha1 as Mac>::new_from_slice(key).ok()?;
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    let offset = usize::from(hash[hash.len() - 1] & 0x0F);
    let code = u32::from_be_bytes([
        hash[offset],
        hash[offset + 1],
        hash[offset + 2],
        hash[offset + 3],
    ]) & 0x7FFF_FFFF;
    Some(code % modulus)
}

/// Searches `[counter, counter + tolerance)` for the counter that produces `otp`.
pub fn find_counter(key: &[u8], counter: u64, tolerance: u8, digits: u32, otp: u64) -> Option<u64> {
    let end = counter.saturating_add(u64::from(tolerance));
    (counter..end).find(|&c| hotp(key, c, digits).is_some_and(|v| u64::from(v) == otp))
}

/// Reads the decimal number at the start of typed input, after leading whitespace.
///
/// `None` when there is no digit or the value overflows.
pub fn parse_otp(input: &[u8]) -> Option<u64> {
    let start = input.iter().position(|b| !b.is_ascii_whitespace())?;
    let digits = input[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    input[start..start + digits].iter().try_fold(0u64, |acc, &b| {
        acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
    })
}
