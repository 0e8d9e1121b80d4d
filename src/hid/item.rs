use super::HidError;

pub const LONG_ITEM_PREFIX: u8 = 0xFE;

const SIZE_MASK: u8 = 0x03;
const TYPE_TAG_MASK: u8 = 0xFC;

// Item keys: prefix with the size bits masked off (type | tag).
pub const MAIN_INPUT: u8 = 0x80;
pub const MAIN_OUTPUT: u8 = 0x90;
pub const MAIN_COLLECTION: u8 = 0xA0;
pub const MAIN_FEATURE: u8 = 0xB0;
pub const MAIN_END_COLLECTION: u8 = 0xC0;
pub const GLOBAL_USAGE_PAGE: u8 = 0x04;
pub const GLOBAL_REPORT_SIZE: u8 = 0x74;
pub const GLOBAL_REPORT_ID: u8 = 0x84;
pub const GLOBAL_REPORT_COUNT: u8 = 0x94;
pub const LOCAL_USAGE: u8 = 0x08;
pub const LOCAL_USAGE_MIN: u8 = 0x18;
pub const LOCAL_USAGE_MAX: u8 = 0x28;

/// One report-descriptor item.
///
/// Short items carry their payload as an unsigned little-endian value. Long items are
/// skipped by length; for them `size` is the body length and `data` the long-item tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub prefix: u8,
    pub size: u8,
    pub data: u32,
}

impl Item {
    pub fn is_long(&self) -> bool {
        self.prefix == LONG_ITEM_PREFIX
    }

    /// Type and tag bits, comparable against the `MAIN_*`/`GLOBAL_*`/`LOCAL_*` keys.
    pub fn key(&self) -> u8 {
        self.prefix & TYPE_TAG_MASK
    }
}

fn short_data_size(prefix: u8) -> u8 {
    match prefix & SIZE_MASK {
        3 => 4,
        size => size,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ItemState {
    #[default]
    Prefix,
    SizeKnown {
        prefix: u8,
        size: u8,
    },
    Value {
        prefix: u8,
        size: u8,
        read: u8,
        data: u32,
    },
    Dispatch(Item),
    LongHeader {
        read: u8,
        size: u8,
    },
    LongBody {
        tag: u8,
        size: u8,
        remaining: u8,
    },
}

/// Resumable item decoder.
///
/// Bytes are pulled from a caller-owned cursor; when the cursor runs dry in the middle of
/// an item, [`HidError::Incomplete`] is returned and the partial item is kept until the
/// next call supplies more bytes.
#[derive(Debug, Default)]
pub struct ItemParser {
    state: ItemState,
}

fn next_byte(buf: &mut &[u8]) -> Result<u8, HidError> {
    let (&byte, rest) = buf.split_first().ok_or(HidError::Incomplete)?;
    *buf = rest;
    Ok(byte)
}

impl ItemParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no item is partially parsed.
    pub fn is_idle(&self) -> bool {
        self.state == ItemState::Prefix
    }

    pub fn parse_item(&mut self, buf: &mut &[u8]) -> Result<Item, HidError> {
        loop {
            self.state = match self.state {
                ItemState::Prefix => {
                    let prefix = next_byte(buf)?;
                    if prefix == LONG_ITEM_PREFIX {
                        ItemState::LongHeader { read: 0, size: 0 }
                    } else {
                        ItemState::SizeKnown {
                            prefix,
                            size: short_data_size(prefix),
                        }
                    }
                }
                ItemState::SizeKnown { prefix, size } => ItemState::Value {
                    prefix,
                    size,
                    read: 0,
                    data: 0,
                },
                ItemState::Value {
                    prefix,
                    size,
                    read,
                    data,
                } => {
                    if read == size {
                        ItemState::Dispatch(Item { prefix, size, data })
                    } else {
                        let byte = next_byte(buf)?;
                        ItemState::Value {
                            prefix,
                            size,
                            read: read + 1,
                            data: data | u32::from(byte) << (8 * u32::from(read)),
                        }
                    }
                }
                ItemState::Dispatch(item) => {
                    self.state = ItemState::Prefix;
                    return Ok(item);
                }
                ItemState::LongHeader { read: 0, .. } => ItemState::LongHeader {
                    read: 1,
                    size: next_byte(buf)?,
                },
                ItemState::LongHeader { size, .. } => ItemState::LongBody {
                    tag: next_byte(buf)?,
                    size,
                    remaining: size,
                },
                ItemState::LongBody {
                    tag,
                    size,
                    remaining: 0,
                } => ItemState::Dispatch(Item {
                    prefix: LONG_ITEM_PREFIX,
                    size,
                    data: u32::from(tag),
                }),
                ItemState::LongBody {
                    tag,
                    size,
                    remaining,
                } => {
                    let skip = usize::from(remaining).min(buf.len());
                    if skip == 0 {
                        return Err(HidError::Incomplete);
                    }
                    *buf = &buf[skip..];
                    ItemState::LongBody {
                        tag,
                        size,
                        remaining: remaining - skip as u8,
                    }
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(mut bytes: &[u8]) -> Vec<Item> {
        let mut parser = ItemParser::new();
        let mut items = Vec::new();
        while !bytes.is_empty() {
            items.push(parser.parse_item(&mut bytes).unwrap());
        }
        assert!(parser.is_idle());
        items
    }

    #[test]
    fn test_short_items_decode_little_endian_payloads() {
        let items = parse_all(&[0x75, 0x08, 0x26, 0xFF, 0x00, 0x27, 0x78, 0x56, 0x34, 0x12, 0xC0]);
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], Item { prefix: 0x75, size: 1, data: 8 });
        assert_eq!(items[0].key(), GLOBAL_REPORT_SIZE);
        assert_eq!(items[1].data, 0x00FF);
        assert_eq!(items[2].size, 4);
        assert_eq!(items[2].data, 0x1234_5678);
        assert_eq!(items[3].key(), MAIN_END_COLLECTION);
        assert_eq!(items[3].size, 0);
    }

    #[test]
    fn test_item_resumes_across_calls() {
        let mut parser = ItemParser::new();
        let mut first: &[u8] = &[0x26, 0x34];
        assert!(matches!(parser.parse_item(&mut first), Err(HidError::Incomplete)));
        assert!(first.is_empty());
        assert!(!parser.is_idle());

        let mut second: &[u8] = &[0x12, 0x95, 0x06];
        let item = parser.parse_item(&mut second).unwrap();
        assert_eq!(item.data, 0x1234);
        let item = parser.parse_item(&mut second).unwrap();
        assert_eq!(item.key(), GLOBAL_REPORT_COUNT);
        assert_eq!(item.data, 6);
        assert!(parser.is_idle());
    }

    #[test]
    fn test_long_item_body_is_skipped() {
        let items = parse_all(&[LONG_ITEM_PREFIX, 0x03, 0xF1, 0xAA, 0xBB, 0xCC, 0x75, 0x01]);
        assert_eq!(items.len(), 2);
        assert!(items[0].is_long());
        assert_eq!(items[0].size, 3);
        assert_eq!(items[0].data, 0xF1);
        assert_eq!(items[1].key(), GLOBAL_REPORT_SIZE);
        assert_eq!(items[1].data, 1);
    }

    #[test]
    fn test_long_item_split_mid_body() {
        let mut parser = ItemParser::new();
        let mut first: &[u8] = &[LONG_ITEM_PREFIX, 0x04, 0x10, 0x01];
        assert!(matches!(parser.parse_item(&mut first), Err(HidError::Incomplete)));
        let mut second: &[u8] = &[0x02, 0x03, 0x04];
        let item = parser.parse_item(&mut second).unwrap();
        assert!(item.is_long());
        assert!(second.is_empty());
    }
}
