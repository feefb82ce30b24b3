//! RDA5807 register model
//!
//! One typed struct per hardware register, with named accessors for the
//! bit flags and fields the driver uses. Bit positions and reset values
//! follow the datasheet (Rev 1.8). Pure bit arithmetic, no I/O: the bus
//! layer moves raw words, the tuner mutates typed views.

/// Number of 16-bit registers in the chip's address space.
pub const NUM_REGISTERS: usize = 16;

/// First register of the sequential write window (0x2..=0x8).
pub const CONTROL_BASE: u8 = 0x2;

/// Last register of the sequential write window.
pub const CONTROL_LAST: u8 = 0x8;

/// First register of the sequential read window (0xA..=0xF).
pub const STATUS_BASE: u8 = 0xA;

/// Last register of the sequential read window.
pub const STATUS_LAST: u8 = 0xF;

const fn bit(word: u16, n: u8) -> bool {
    word & (1 << n) != 0
}

const fn with_bit(word: u16, n: u8, value: bool) -> u16 {
    if value {
        word | (1 << n)
    } else {
        word & !(1 << n)
    }
}

const fn field(word: u16, lsb: u8, mask: u16) -> u16 {
    (word >> lsb) & mask
}

const fn with_field(word: u16, lsb: u8, mask: u16, value: u16) -> u16 {
    (word & !(mask << lsb)) | ((value & mask) << lsb)
}

/// A typed view of one 16-bit register.
pub trait Register: Copy {
    /// Index of the register in the chip's address space.
    const INDEX: u8;

    /// Wrap a raw register word.
    fn from_raw(raw: u16) -> Self;

    /// Unwrap into the raw register word.
    fn raw(self) -> u16;
}

macro_rules! register {
    ($(#[$doc:meta])* $name:ident, $index:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub struct $name(u16);

        impl Register for $name {
            const INDEX: u8 = $index;

            fn from_raw(raw: u16) -> Self {
                Self(raw)
            }

            fn raw(self) -> u16 {
                self.0
            }
        }
    };
}

register!(
    /// Register 0x0 — chip identification.
    ChipId,
    0x0
);

impl ChipId {
    /// Identity word an RDA5807 reads back.
    pub const EXPECTED: u16 = 0x5804;

    /// The identity word.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

register!(
    /// Register 0x2 — power configuration. Default 0x0000.
    PowerCfg,
    0x2
);

impl PowerCfg {
    /// DHIZ, bit 15: audio output high-Z disable (1 = normal operation).
    #[must_use]
    pub const fn dhiz(self) -> bool {
        bit(self.0, 15)
    }

    /// Set DHIZ (bit 15).
    pub fn set_dhiz(&mut self, value: bool) {
        self.0 = with_bit(self.0, 15, value);
    }

    /// DMUTE, bit 14: mute disable (1 = audio unmuted).
    #[must_use]
    pub const fn dmute(self) -> bool {
        bit(self.0, 14)
    }

    /// Set DMUTE (bit 14).
    pub fn set_dmute(&mut self, value: bool) {
        self.0 = with_bit(self.0, 14, value);
    }

    /// MONO, bit 13: force mono output.
    #[must_use]
    pub const fn mono(self) -> bool {
        bit(self.0, 13)
    }

    /// Set MONO (bit 13).
    pub fn set_mono(&mut self, value: bool) {
        self.0 = with_bit(self.0, 13, value);
    }

    /// BASS, bit 12: bass boost.
    #[must_use]
    pub const fn bass(self) -> bool {
        bit(self.0, 12)
    }

    /// Set BASS (bit 12).
    pub fn set_bass(&mut self, value: bool) {
        self.0 = with_bit(self.0, 12, value);
    }

    /// SEEKUP, bit 9: seek direction (1 = up).
    #[must_use]
    pub const fn seek_up(self) -> bool {
        bit(self.0, 9)
    }

    /// Set SEEKUP (bit 9).
    pub fn set_seek_up(&mut self, value: bool) {
        self.0 = with_bit(self.0, 9, value);
    }

    /// SEEK, bit 8: seek in progress; set to start, cleared to stop.
    #[must_use]
    pub const fn seek(self) -> bool {
        bit(self.0, 8)
    }

    /// Set SEEK (bit 8).
    pub fn set_seek(&mut self, value: bool) {
        self.0 = with_bit(self.0, 8, value);
    }

    /// SKMODE, bit 7: 1 = stop at band limit instead of wrapping.
    #[must_use]
    pub const fn seek_stop_at_limit(self) -> bool {
        bit(self.0, 7)
    }

    /// Set SKMODE (bit 7).
    pub fn set_seek_stop_at_limit(&mut self, value: bool) {
        self.0 = with_bit(self.0, 7, value);
    }

    /// `RDS_EN`, bit 3: RDS/RBDS decoder enable.
    #[must_use]
    pub const fn rds_enable(self) -> bool {
        bit(self.0, 3)
    }

    /// Set `RDS_EN` (bit 3).
    pub fn set_rds_enable(&mut self, value: bool) {
        self.0 = with_bit(self.0, 3, value);
    }

    /// `NEW_METHOD`, bit 2: improved demodulation method.
    #[must_use]
    pub const fn new_method(self) -> bool {
        bit(self.0, 2)
    }

    /// Set `NEW_METHOD` (bit 2).
    pub fn set_new_method(&mut self, value: bool) {
        self.0 = with_bit(self.0, 2, value);
    }

    /// `SOFT_RESET`, bit 1.
    #[must_use]
    pub const fn soft_reset(self) -> bool {
        bit(self.0, 1)
    }

    /// Set `SOFT_RESET` (bit 1).
    pub fn set_soft_reset(&mut self, value: bool) {
        self.0 = with_bit(self.0, 1, value);
    }

    /// ENABLE, bit 0: power-up enable.
    #[must_use]
    pub const fn enable(self) -> bool {
        bit(self.0, 0)
    }

    /// Set ENABLE (bit 0).
    pub fn set_enable(&mut self, value: bool) {
        self.0 = with_bit(self.0, 0, value);
    }
}

register!(
    /// Register 0x3 — channel selection and tune control. Default 0x4FC0.
    Channel,
    0x3
);

impl Channel {
    /// CHAN, bits 15:6: channel number. Default 0x13F.
    #[must_use]
    pub const fn channel(self) -> u16 {
        field(self.0, 6, 0x3FF)
    }

    /// Set CHAN (bits 15:6).
    pub fn set_channel(&mut self, channel: u16) {
        self.0 = with_field(self.0, 6, 0x3FF, channel);
    }

    /// TUNE, bit 4: set to start tuning, cleared when done.
    #[must_use]
    pub const fn tune(self) -> bool {
        bit(self.0, 4)
    }

    /// Set TUNE (bit 4).
    pub fn set_tune(&mut self, value: bool) {
        self.0 = with_bit(self.0, 4, value);
    }

    /// BAND, bits 3:2.
    #[must_use]
    pub const fn band(self) -> u16 {
        field(self.0, 2, 0x3)
    }

    /// Set BAND (bits 3:2).
    pub fn set_band(&mut self, bits: u16) {
        self.0 = with_field(self.0, 2, 0x3, bits);
    }

    /// SPACE, bits 1:0.
    #[must_use]
    pub const fn spacing(self) -> u16 {
        field(self.0, 0, 0x3)
    }

    /// Set SPACE (bits 1:0).
    pub fn set_spacing(&mut self, bits: u16) {
        self.0 = with_field(self.0, 0, 0x3, bits);
    }
}

register!(
    /// Register 0x4 — system configuration 1. Default 0x0400.
    SysCfg1,
    0x4
);

impl SysCfg1 {
    /// DE, bit 11: de-emphasis (1 = 50 µs, 0 = 75 µs).
    #[must_use]
    pub const fn deemphasis_50us(self) -> bool {
        bit(self.0, 11)
    }

    /// Set DE (bit 11).
    pub fn set_deemphasis_50us(&mut self, value: bool) {
        self.0 = with_bit(self.0, 11, value);
    }

    /// `SOFTMUTE_EN`, bit 9.
    #[must_use]
    pub const fn softmute(self) -> bool {
        bit(self.0, 9)
    }

    /// Set `SOFTMUTE_EN` (bit 9).
    pub fn set_softmute(&mut self, value: bool) {
        self.0 = with_bit(self.0, 9, value);
    }
}

register!(
    /// Register 0x5 — system configuration 2. Default 0x888B.
    SysCfg2,
    0x5
);

impl SysCfg2 {
    /// SEEKTH, bits 11:8: seek SNR threshold. Default 0b1000.
    #[must_use]
    pub const fn seek_threshold(self) -> u8 {
        field(self.0, 8, 0xF) as u8
    }

    /// Set SEEKTH (bits 11:8).
    pub fn set_seek_threshold(&mut self, threshold: u8) {
        self.0 = with_field(self.0, 8, 0xF, threshold as u16);
    }

    /// VOLUME, bits 3:0. Default 0b1011.
    #[must_use]
    pub const fn volume(self) -> u8 {
        field(self.0, 0, 0xF) as u8
    }

    /// Set VOLUME (bits 3:0).
    pub fn set_volume(&mut self, volume: u8) {
        self.0 = with_field(self.0, 0, 0xF, volume as u16);
    }
}

register!(
    /// Register 0x7 — system configuration 3. Default 0x42C6.
    SysCfg3,
    0x7
);

impl SysCfg3 {
    /// `BAND_65M_50M_MODE`, bit 9: with BAND = 0b11, selects the
    /// 65–76 MHz range (1) over 50–76 MHz (0). Default 1.
    #[must_use]
    pub const fn band_65m_50m_mode(self) -> bool {
        bit(self.0, 9)
    }

    /// Set `BAND_65M_50M_MODE` (bit 9).
    pub fn set_band_65m_50m_mode(&mut self, value: bool) {
        self.0 = with_bit(self.0, 9, value);
    }
}

register!(
    /// Register 0xA — tuner status. Default 0x013F.
    StatusA,
    0xA
);

impl StatusA {
    /// RDSR, bit 15: a new RDS group is ready.
    #[must_use]
    pub const fn rds_ready(self) -> bool {
        bit(self.0, 15)
    }

    /// Set RDSR (bit 15).
    pub fn set_rds_ready(&mut self, value: bool) {
        self.0 = with_bit(self.0, 15, value);
    }

    /// STC, bit 14: seek/tune complete.
    #[must_use]
    pub const fn seek_tune_complete(self) -> bool {
        bit(self.0, 14)
    }

    /// Set STC (bit 14).
    pub fn set_seek_tune_complete(&mut self, value: bool) {
        self.0 = with_bit(self.0, 14, value);
    }

    /// SF, bit 13: seek failed (band wrapped without finding a station).
    #[must_use]
    pub const fn seek_failed(self) -> bool {
        bit(self.0, 13)
    }

    /// Set SF (bit 13).
    pub fn set_seek_failed(&mut self, value: bool) {
        self.0 = with_bit(self.0, 13, value);
    }

    /// ST, bit 10: stereo signal detected.
    #[must_use]
    pub const fn stereo(self) -> bool {
        bit(self.0, 10)
    }

    /// Set ST (bit 10).
    pub fn set_stereo(&mut self, value: bool) {
        self.0 = with_bit(self.0, 10, value);
    }

    /// READCHAN, bits 9:0: the channel the tuner currently sits on.
    #[must_use]
    pub const fn read_channel(self) -> u16 {
        field(self.0, 0, 0x3FF)
    }

    /// Set READCHAN (bits 9:0).
    pub fn set_read_channel(&mut self, channel: u16) {
        self.0 = with_field(self.0, 0, 0x3FF, channel);
    }
}

register!(
    /// Register 0xB — signal status. Default 0x0000.
    StatusB,
    0xB
);

impl StatusB {
    /// RSSI, bits 15:9, up to 75 dBµV.
    #[must_use]
    pub const fn rssi(self) -> u8 {
        field(self.0, 9, 0x7F) as u8
    }

    /// Set RSSI (bits 15:9).
    pub fn set_rssi(&mut self, rssi: u8) {
        self.0 = with_field(self.0, 9, 0x7F, rssi as u16);
    }
}

/// Shadow copy of the chip's register file.
///
/// The tuner keeps this in sync with the hardware: control words are
/// updated after a confirmed write, status words after each read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegisterBank {
    words: [u16; NUM_REGISTERS],
}

impl RegisterBank {
    /// A zeroed register bank.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            words: [0; NUM_REGISTERS],
        }
    }

    /// Typed view of one register.
    #[must_use]
    pub fn get<R: Register>(&self) -> R {
        R::from_raw(self.words[usize::from(R::INDEX)])
    }

    /// Store a typed register back into the bank.
    pub fn set<R: Register>(&mut self, reg: R) {
        self.words[usize::from(R::INDEX)] = reg.raw();
    }

    /// Raw word at a register index.
    #[must_use]
    pub fn word(&self, index: u8) -> u16 {
        self.words[usize::from(index)]
    }

    /// Store a raw word at a register index.
    pub fn set_word(&mut self, index: u8, value: u16) {
        self.words[usize::from(index)] = value;
    }

    /// The control window 0x2..=`last` for a sequential write.
    #[must_use]
    pub fn control_words(&self, last: u8) -> &[u16] {
        &self.words[usize::from(CONTROL_BASE)..=usize::from(last)]
    }
}
