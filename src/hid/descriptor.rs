use super::{
    HidError,
    fields::{byte_at, extract_fields},
    item::*,
    report::DESCRIPTOR_CHUNK,
};

// Input main-item payloads identifying the two captured slots.
const INPUT_ARRAY: u32 = 0x00;
const INPUT_VARIABLE: u32 = 0x02;

const USAGE_KEYBOARD: u32 = 0x06;

/// A key press decoded from one input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub modifier: u8,
    pub scan_code: u8,
}

/// Walks a report descriptor and interprets one input report against it.
///
/// The descriptor may be supplied in arbitrary chunks through [`parse`](Self::parse);
/// field state and the running bit offset survive between calls.
pub struct ReportDescParser<'r> {
    items: ItemParser,
    report: &'r [u8],
    report_size: u32,
    report_count: u32,
    report_id: u8,
    usage_min: u32,
    usage_max: u32,
    total_bits: u32,
    report_offsets: Vec<(u8, u32)>,
    capturing: bool,
    modifier: u8,
    scan_code: u8,
    strokes: Vec<KeyStroke>,
}

impl<'r> ReportDescParser<'r> {
    pub fn new(report: &'r [u8]) -> Self {
        Self {
            items: ItemParser::new(),
            report,
            report_size: 0,
            report_count: 0,
            report_id: 0,
            usage_min: 0,
            usage_max: 0,
            total_bits: 0,
            report_offsets: Vec::new(),
            capturing: true,
            modifier: 0,
            scan_code: 0,
            strokes: Vec::new(),
        }
    }

    /// Consumes `chunk`. Returns [`HidError::Incomplete`] when it ends inside an item.
    pub fn parse(&mut self, mut chunk: &[u8]) -> Result<(), HidError> {
        while !chunk.is_empty() {
            let item = self.items.parse_item(&mut chunk)?;
            self.dispatch(item);
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<KeyStroke>, HidError> {
        if !self.items.is_idle() {
            return Err(HidError::Incomplete);
        }
        Ok(self.strokes)
    }

    fn dispatch(&mut self, item: Item) {
        if item.is_long() {
            tracing::trace!(tag = item.data, size = item.size, "skipping long item");
            return;
        }
        let data = item.data;
        match item.key() {
            LOCAL_USAGE => {
                if data == USAGE_KEYBOARD {
                    self.modifier = 0;
                    self.scan_code = 0;
                }
            }
            GLOBAL_REPORT_SIZE => self.report_size = data,
            GLOBAL_REPORT_COUNT => self.report_count = data,
            GLOBAL_REPORT_ID => self.select_report(data as u8),
            LOCAL_USAGE_MIN => self.usage_min = data,
            LOCAL_USAGE_MAX => self.usage_max = data,
            MAIN_OUTPUT | MAIN_FEATURE => self.reset_fields(),
            MAIN_INPUT => {
                self.on_input_item(data);
                self.total_bits = self
                    .total_bits
                    .saturating_add(self.report_size.saturating_mul(self.report_count));
                self.reset_fields();
            }
            _ => {}
        }
    }

    fn reset_fields(&mut self) {
        self.report_size = 0;
        self.report_count = 0;
        self.usage_min = 0;
        self.usage_max = 0;
    }

    // Fields of a numbered report follow its ID byte; each ID keeps its own bit offset.
    fn select_report(&mut self, id: u8) {
        match self.report_offsets.iter_mut().find(|(rid, _)| *rid == self.report_id) {
            Some(entry) => entry.1 = self.total_bits,
            None => self.report_offsets.push((self.report_id, self.total_bits)),
        }
        self.report_id = id;
        self.total_bits = self
            .report_offsets
            .iter()
            .find(|(rid, _)| *rid == id)
            .map_or(8, |(_, bits)| *bits);
        self.capturing = self.report.first() == Some(&id);
    }

    fn on_input_item(&mut self, flags: u32) {
        if !self.capturing {
            return;
        }
        let values = match extract_fields(
            self.report,
            self.total_bits,
            self.report_size,
            self.report_count,
        ) {
            Ok(values) => values,
            Err(e) => {
                tracing::debug!(offset = self.total_bits, "input item not decoded: {e}");
                return;
            }
        };
        for (i, value) in values.iter().enumerate() {
            let usage = self.usage_min.saturating_add(i as u32);
            if usage > self.usage_max && self.usage_max != 0 {
                break;
            }
            tracing::trace!(usage, value, "input field");
        }

        let captured = byte_at(self.report, self.total_bits).unwrap_or(0);
        match flags {
            INPUT_VARIABLE => self.modifier = captured,
            INPUT_ARRAY => self.scan_code = captured,
            _ => {}
        }

        if flags == INPUT_ARRAY && self.scan_code != 0 {
            self.strokes.push(KeyStroke {
                modifier: self.modifier,
                scan_code: self.scan_code,
            });
        }
    }
}

/// Decodes the key presses in `report` using `descriptor`, feeding the descriptor in
/// control-transfer sized chunks.
pub fn decode_report(descriptor: &[u8], report: &[u8]) -> Result<Vec<KeyStroke>, HidError> {
    let mut parser = ReportDescParser::new(report);
    for chunk in descriptor.chunks(DESCRIPTOR_CHUNK) {
        match parser.parse(chunk) {
            Ok(()) | Err(HidError::Incomplete) => {}
            Err(e) => return Err(e),
        }
    }
    parser.finish()
}
