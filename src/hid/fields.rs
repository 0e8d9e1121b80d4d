use super::HidError;

fn low_bits(count: u32) -> u32 {
    (1u32 << count) - 1
}

/// Extracts `count` fields of `size` bits each, starting `bit_offset` bits into `report`.
///
/// Within a byte, bits are consumed from the least significant end. A field spanning
/// several bytes is assembled most significant chunk first: every chunk shifts the
/// accumulator left before being OR-ed in. Fields wider than 32 bits keep only their
/// last 32 assembled bits.
pub fn extract_fields(
    report: &[u8],
    bit_offset: u32,
    size: u32,
    count: u32,
) -> Result<Vec<u32>, HidError> {
    // Zero-width fields carry no data whatever their count.
    if size == 0 {
        return Ok(Vec::new());
    }
    let needed_bits = u64::from(bit_offset) + u64::from(size) * u64::from(count);
    let available_bits = report.len() as u64 * 8;
    if needed_bits > available_bits {
        return Err(HidError::ReportTooShort {
            needed_bits,
            available_bits,
        });
    }

    let mut byte = (bit_offset >> 3) as usize;
    let mut consumed = bit_offset & 7;
    let mut values = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let mut value: u32 = 0;
        let mut left = size;
        while left > 0 {
            let take = left.min(8 - consumed);
            let chunk = (u32::from(report[byte]) >> consumed) & low_bits(take);
            value = value.checked_shl(take).unwrap_or(0) | chunk;
            consumed += take;
            left -= take;
            if consumed == 8 {
                consumed = 0;
                byte += 1;
            }
        }
        values.push(value);
    }
    Ok(values)
}

/// Byte at `bit_offset` with the bits already consumed in that byte shifted out.
pub fn byte_at(report: &[u8], bit_offset: u32) -> Option<u8> {
    report
        .get((bit_offset >> 3) as usize)
        .map(|byte| byte >> (bit_offset & 7))
}
