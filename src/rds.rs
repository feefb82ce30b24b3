//! RDS decoder
//!
//! Reassembles the most commonly transmitted RDS fields from 4-word
//! groups. Fragments of a multi-part field (station name, decoder
//! identification, radio text) repeat in a fixed cycle with no
//! out-of-band framing, so each such field accumulates in a hidden
//! scratch buffer and is copied to its public buffer only when the
//! protocol's last-fragment condition is seen. Readers therefore never
//! observe a field mixing two in-progress transmissions, at the cost of
//! stale data until the next full cycle lands.
//!
//! The decoder is a pure state machine over groups; it does no I/O and
//! never error-corrects. Out-of-range or duplicate alternative
//! frequencies are dropped silently — graceful degradation, not
//! validation reporting.

use core::fmt::Write as _;
use core::str;

use heapless::String;
#[cfg(feature = "rds-alternative-frequencies")]
use heapless::Vec;

#[cfg(feature = "rds-alternative-frequencies")]
use crate::config::ALT_FREQ_CAPACITY;
use crate::config::PS_NAME_LEN;
#[cfg(feature = "rds-radio-text")]
use crate::config::RADIO_TEXT_LEN;

const GROUP_TYPE_BASIC: u16 = 0x0;
#[cfg(feature = "rds-radio-text")]
const GROUP_TYPE_RADIO_TEXT: u16 = 0x2;

/// One RDS group: the four data words read from the chip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RdsGroup {
    /// Block A — program identification.
    pub a: u16,
    /// Block B — group type, version and flags.
    pub b: u16,
    /// Block C (or C').
    pub c: u16,
    /// Block D.
    pub d: u16,
}

impl RdsGroup {
    const fn group_type(self) -> u16 {
        self.b >> 12
    }

    /// Version flag: false = A, true = B.
    const fn version_b(self) -> bool {
        (self.b >> 11) & 0x1 != 0
    }

    const fn traffic_program(self) -> bool {
        (self.b >> 10) & 0x1 != 0
    }

    const fn program_type(self) -> u8 {
        ((self.b >> 5) & 0x1F) as u8
    }
}

/// Incremental RDS decoder.
///
/// Feed groups from [`crate::Rda5807::read_rds_group`] into
/// [`RdsParser::update`], and call [`RdsParser::reset`] whenever the
/// tuner changes frequency — buffered fragments from the old station
/// are meaningless once retuned.
#[derive(Clone, Debug)]
pub struct RdsParser {
    pi: u16,
    pty: u8,
    tp: bool,
    ta: bool,
    ms: bool,
    di: u8,
    di_scratch: u8,
    ps: [u8; PS_NAME_LEN],
    ps_scratch: [u8; PS_NAME_LEN],
    #[cfg(feature = "rds-radio-text")]
    rt: [u8; RADIO_TEXT_LEN],
    #[cfg(feature = "rds-radio-text")]
    rt_scratch: [u8; RADIO_TEXT_LEN],
    #[cfg(feature = "rds-radio-text")]
    rt_ab: bool,
    #[cfg(feature = "rds-radio-text")]
    rt_scratch_ab: bool,
    #[cfg(feature = "rds-alternative-frequencies")]
    alt_freq: Vec<u8, ALT_FREQ_CAPACITY>,
}

impl Default for RdsParser {
    fn default() -> Self {
        Self {
            pi: 0,
            pty: 0,
            tp: false,
            ta: false,
            ms: false,
            di: 0,
            di_scratch: 0,
            ps: [0; PS_NAME_LEN],
            ps_scratch: [0; PS_NAME_LEN],
            #[cfg(feature = "rds-radio-text")]
            rt: [0; RADIO_TEXT_LEN],
            #[cfg(feature = "rds-radio-text")]
            rt_scratch: [0; RADIO_TEXT_LEN],
            #[cfg(feature = "rds-radio-text")]
            rt_ab: false,
            #[cfg(feature = "rds-radio-text")]
            rt_scratch_ab: false,
            #[cfg(feature = "rds-alternative-frequencies")]
            alt_freq: Vec::new(),
        }
    }
}

impl RdsParser {
    /// An empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all buffered data.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Process one RDS group.
    ///
    /// PI, PTY and TP ride on every group and are latched
    /// unconditionally; the rest of the decode depends on the group
    /// type. Unknown group types are ignored.
    pub fn update(&mut self, group: &RdsGroup) {
        self.pi = group.a;
        self.pty = group.program_type();
        self.tp = group.traffic_program();

        match group.group_type() {
            GROUP_TYPE_BASIC => self.update_basic(group),
            #[cfg(feature = "rds-radio-text")]
            GROUP_TYPE_RADIO_TEXT => self.update_radio_text(group),
            _ => {}
        }
    }

    /// Group 0A / 0B: program service name, decoder identification,
    /// TA/MS flags, and (0A only) alternative frequencies.
    fn update_basic(&mut self, group: &RdsGroup) {
        self.ta = (group.b >> 4) & 0x1 != 0;
        self.ms = (group.b >> 3) & 0x1 != 0;

        // Segment address 0..=3 selects one character pair; address 3
        // is the last fragment and commits the name.
        let address = usize::from(group.b & 0x3);
        let index = 2 * address;
        self.ps_scratch[index] = (group.d >> 8) as u8;
        self.ps_scratch[index + 1] = (group.d & 0xFF) as u8;
        if address == 3 {
            self.ps = self.ps_scratch;
        }

        // One DI bit per group, indexed by the complement of the
        // segment address; index 0 carries the last bit and commits.
        let di_index = !group.b & 0x3;
        let di_bit = ((group.b >> 2) & 0x1) as u8;
        self.di_scratch &= !(1 << di_index);
        self.di_scratch |= di_bit << di_index;
        if di_index == 0 {
            self.di = self.di_scratch;
        }

        #[cfg(feature = "rds-alternative-frequencies")]
        if !group.version_b() {
            self.add_alternative_frequency((group.c >> 8) as u8);
            self.add_alternative_frequency((group.c & 0xFF) as u8);
        }
    }

    #[cfg(feature = "rds-alternative-frequencies")]
    fn add_alternative_frequency(&mut self, raw: u8) {
        if raw == 0 || raw >= 205 {
            return; // out of range, ignored
        }
        if self.alt_freq.is_full() || self.alt_freq.contains(&raw) {
            return; // full or duplicate, ignored
        }
        let _ = self.alt_freq.push(raw);
    }

    /// Group 2A / 2B: radio text. A carriage return terminates the
    /// text early; either the terminator or the 64th character commits.
    #[cfg(feature = "rds-radio-text")]
    fn update_radio_text(&mut self, group: &RdsGroup) {
        let address = usize::from(group.b & 0xF);
        self.rt_scratch_ab = (group.b >> 4) & 0x1 != 0;

        let chars: [u8; 4];
        let count;
        let mut index;
        if group.version_b() {
            chars = [(group.d >> 8) as u8, (group.d & 0xFF) as u8, 0, 0];
            count = 2;
            index = address * 2;
        } else {
            chars = [
                (group.c >> 8) as u8,
                (group.c & 0xFF) as u8,
                (group.d >> 8) as u8,
                (group.d & 0xFF) as u8,
            ];
            count = 4;
            index = address * 4;
        }

        let mut finished = false;
        for &ch in &chars[..count] {
            if ch == b'\r' {
                self.rt_scratch[index] = 0;
                finished = true;
                break;
            }
            self.rt_scratch[index] = ch;
            index += 1;
            if index == RADIO_TEXT_LEN {
                finished = true;
                break;
            }
        }
        if finished {
            self.rt = self.rt_scratch;
            self.rt_ab = self.rt_scratch_ab;
        }
    }

    /// The program identification code.
    #[must_use]
    pub const fn program_id(&self) -> u16 {
        self.pi
    }

    /// The program identification code as four upper-case hex digits.
    #[must_use]
    pub fn program_id_str(&self) -> String<4> {
        let mut s = String::new();
        let _ = write!(s, "{:04X}", self.pi);
        s
    }

    /// The program type code (0–31).
    #[must_use]
    pub const fn program_type(&self) -> u8 {
        self.pty
    }

    /// The traffic program flag.
    #[must_use]
    pub const fn traffic_program(&self) -> bool {
        self.tp
    }

    /// The traffic announcement flag.
    #[must_use]
    pub const fn traffic_announcement(&self) -> bool {
        self.ta
    }

    /// The music/speech flag: true for music.
    #[must_use]
    pub const fn music(&self) -> bool {
        self.ms
    }

    /// The decoder identification bits.
    #[must_use]
    pub const fn decoder_id(&self) -> u8 {
        self.di
    }

    /// Stereo content flag from the decoder identification.
    #[must_use]
    pub const fn has_stereo(&self) -> bool {
        self.di & 0x01 != 0
    }

    /// Dynamic PTY flag from the decoder identification.
    #[must_use]
    pub const fn has_dynamic_program_type(&self) -> bool {
        self.di & 0x08 != 0
    }

    /// The committed program service name.
    ///
    /// Empty until a full fragment cycle has been observed. See RDS
    /// code table G0 for characters outside the ASCII range; non-UTF-8
    /// content renders as an empty string.
    #[must_use]
    pub fn program_service_name(&self) -> &str {
        str_until_nul(&self.ps)
    }

    /// The committed radio text, up to 64 characters.
    #[must_use]
    #[cfg(feature = "rds-radio-text")]
    pub fn radio_text(&self) -> &str {
        str_until_nul(&self.rt)
    }

    /// The committed radio text A/B flag; a flip tells the listener the
    /// text changed.
    #[must_use]
    #[cfg(feature = "rds-radio-text")]
    pub const fn radio_text_ab(&self) -> bool {
        self.rt_ab
    }

    /// The collected alternative frequencies, as raw byte values in
    /// insertion order. Decode with [`decode_alternative_frequency`].
    #[must_use]
    #[cfg(feature = "rds-alternative-frequencies")]
    pub fn alternative_frequencies(&self) -> &[u8] {
        &self.alt_freq
    }
}

/// Decode a raw alternative-frequency byte into MHz.
///
/// Only meaningful for raw values in the open interval (0, 205); the
/// parser never stores anything else.
#[must_use]
#[cfg(feature = "rds-alternative-frequencies")]
pub fn decode_alternative_frequency(raw: u8) -> f32 {
    debug_assert!(0 < raw && raw < 205);

    87.5 + f32::from(raw) * 0.1
}

fn str_until_nul(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    str::from_utf8(&bytes[..end]).unwrap_or("")
}
