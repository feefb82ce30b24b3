//! Tests for the tuner control engine, run against a scripted fake chip.

use embedded_hal::delay::DelayNs;
use rda5807_fm::bus::TunerBus;
use rda5807_fm::{
    Error, Rda5807, RdsGroup, SeekDirection, TaskProgress, TaskResult, TunerConfig,
};

// ============================================================================
// Fake chip
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BusFault;

#[derive(Debug, Clone, PartialEq, Eq)]
enum BusWrite {
    Single(u8, u16),
    Sequential(Vec<u16>),
}

#[derive(Debug, Clone, Copy)]
enum ChipOp {
    None,
    Tune { remaining: u32, target: u16 },
    Seek { remaining: u32 },
}

/// In-memory register file that mimics the chip's seek/tune behavior:
/// STC raises after a configurable number of status reads, READCHAN
/// follows the programmed channel (tune) or the landing channel (seek),
/// and the channel creeps upward while a seek is sweeping.
struct FakeChip {
    regs: [u16; 16],
    writes: Vec<BusWrite>,
    reads: usize,
    op: ChipOp,
    tune_latency: u32,
    seek_latency: u32,
    seek_landing: u16,
    seek_fails: bool,
    fail_writes: bool,
    fail_reads: bool,
}

impl FakeChip {
    fn new() -> Self {
        let mut regs = [0u16; 16];
        // Datasheet reset values.
        regs[0x0] = 0x5804;
        regs[0x3] = 0x4FC0;
        regs[0x4] = 0x0400;
        regs[0x5] = 0x888B;
        regs[0x7] = 0x42C6;
        regs[0xA] = 0x013F;
        Self {
            regs,
            writes: Vec::new(),
            reads: 0,
            op: ChipOp::None,
            tune_latency: 1,
            seek_latency: 2,
            seek_landing: 0,
            seek_fails: false,
            fail_writes: false,
            fail_reads: false,
        }
    }

    fn write_count(&self) -> usize {
        self.writes.len()
    }

    fn set_read_channel(&mut self, channel: u16) {
        self.regs[0xA] = (self.regs[0xA] & !0x3FF) | (channel & 0x3FF);
    }

    fn apply_control(&mut self, index: u8, word: u16) {
        self.regs[usize::from(index)] = word;
        match index {
            0x2 => {
                if word & (1 << 8) != 0 {
                    self.op = ChipOp::Seek {
                        remaining: self.seek_latency,
                    };
                } else if matches!(self.op, ChipOp::Seek { .. }) {
                    self.op = ChipOp::None;
                    self.regs[0xA] &= !(1 << 14);
                }
            }
            0x3 => {
                if word & (1 << 4) != 0 {
                    self.op = ChipOp::Tune {
                        remaining: self.tune_latency,
                        target: (word >> 6) & 0x3FF,
                    };
                } else if matches!(self.op, ChipOp::Tune { .. }) {
                    self.op = ChipOp::None;
                    self.regs[0xA] &= !(1 << 14);
                }
            }
            _ => {}
        }
    }

    fn advance_status(&mut self) {
        match self.op {
            ChipOp::None => {}
            ChipOp::Tune { remaining, target } => {
                if remaining == 0 {
                    self.regs[0xA] |= 1 << 14;
                    self.set_read_channel(target);
                } else {
                    self.op = ChipOp::Tune {
                        remaining: remaining - 1,
                        target,
                    };
                }
            }
            ChipOp::Seek { remaining } => {
                if remaining == 0 {
                    self.regs[0xA] |= 1 << 14;
                    if self.seek_fails {
                        self.regs[0xA] |= 1 << 13;
                    } else {
                        self.regs[0xA] &= !(1 << 13);
                    }
                    let landing = self.seek_landing;
                    self.set_read_channel(landing);
                } else {
                    self.op = ChipOp::Seek {
                        remaining: remaining - 1,
                    };
                    let next = (self.regs[0xA] & 0x3FF) + 1;
                    self.set_read_channel(next);
                }
            }
        }
    }
}

impl TunerBus for FakeChip {
    type Error = BusFault;

    fn write_registers(&mut self, words: &[u16]) -> Result<(), BusFault> {
        if self.fail_writes {
            return Err(BusFault);
        }
        self.writes.push(BusWrite::Sequential(words.to_vec()));
        for (i, &word) in words.iter().enumerate() {
            self.apply_control(0x2 + u8::try_from(i).unwrap(), word);
        }
        Ok(())
    }

    fn read_registers(&mut self, words: &mut [u16]) -> Result<(), BusFault> {
        if self.fail_reads {
            return Err(BusFault);
        }
        self.reads += 1;
        self.advance_status();
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.regs[0xA + i];
        }
        Ok(())
    }

    fn write_register(&mut self, index: u8, word: u16) -> Result<(), BusFault> {
        if self.fail_writes {
            return Err(BusFault);
        }
        self.writes.push(BusWrite::Single(index, word));
        if (0x2..=0x8).contains(&index) {
            self.apply_control(index, word);
        } else {
            self.regs[usize::from(index)] = word;
        }
        Ok(())
    }

    fn read_register(&mut self, index: u8) -> Result<u16, BusFault> {
        if self.fail_reads {
            return Err(BusFault);
        }
        self.reads += 1;
        if index == 0xA {
            self.advance_status();
        }
        Ok(self.regs[usize::from(index)])
    }
}

struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

fn powered_radio() -> Rda5807<FakeChip> {
    let mut radio = Rda5807::new(FakeChip::new());
    radio
        .power_up(TunerConfig::europe(), &mut NoopDelay)
        .unwrap();
    radio
}

// ============================================================================
// Power Sequencing
// ============================================================================

#[test]
fn power_up_writes_documented_sequence() {
    let mut radio = Rda5807::new(FakeChip::new());
    radio
        .power_up(TunerConfig::europe(), &mut NoopDelay)
        .unwrap();
    assert!(radio.is_powered_up());

    let writes = radio.bus_mut().writes.clone();
    assert_eq!(writes.len(), 3, "no writes beyond the documented sequence");

    // Reset pulse: enable + soft reset, then enable alone.
    assert_eq!(writes[0], BusWrite::Single(0x2, 0x0003));
    assert_eq!(writes[1], BusWrite::Single(0x2, 0x0001));

    // One batched configuration write covering 0x2..=0x8.
    let BusWrite::Sequential(cfg) = &writes[2] else {
        panic!("expected a sequential configuration write");
    };
    assert_eq!(cfg.len(), 7);
    // DHIZ + RDS + new demodulation method + enable, audio still muted.
    assert_eq!(cfg[0], 0x800D);
    // Channel cleared; Europe band and spacing both encode to zero.
    assert_eq!(cfg[1], 0x0000);
    // 50 µs de-emphasis and softmute on top of the read-back default.
    assert_eq!(cfg[2], 0x0400 | (1 << 11) | (1 << 9));
    // Volume 0 on top of the read-back default.
    assert_eq!(cfg[3], 0x8880);
    // Untouched registers are written back as read.
    assert_eq!(cfg[4], 0x0000);
    assert_eq!(cfg[5], 0x42C6);
    assert_eq!(cfg[6], 0x0000);
}

#[test]
fn power_up_rejects_wrong_chip_id() {
    let mut chip = FakeChip::new();
    chip.regs[0x0] = 0x1234;
    let mut radio = Rda5807::new(chip);
    assert_eq!(
        radio.power_up(TunerConfig::europe(), &mut NoopDelay),
        Err(Error::BadChipId(0x1234))
    );
    assert!(!radio.is_powered_up());
}

#[test]
fn power_up_bus_failure_is_fatal() {
    let mut chip = FakeChip::new();
    chip.fail_reads = true;
    let mut radio = Rda5807::new(chip);
    assert_eq!(
        radio.power_up(TunerConfig::europe(), &mut NoopDelay),
        Err(Error::Bus(BusFault))
    );
    assert!(!radio.is_powered_up());
}

#[test]
#[should_panic(expected = "already powered up")]
fn double_power_up_panics() {
    let mut radio = powered_radio();
    let _ = radio.power_up(TunerConfig::europe(), &mut NoopDelay);
}

#[test]
fn power_down_keeps_state_and_wake_restores_frequency() {
    let mut radio = powered_radio();
    radio
        .set_frequency_blocking(101.0, &mut NoopDelay)
        .unwrap();
    radio.set_volume(5).unwrap();

    radio.power_down().unwrap();
    assert!(!radio.is_powered_up());
    assert_eq!(radio.volume(), 5);

    radio
        .power_up(TunerConfig::europe(), &mut NoopDelay)
        .unwrap();
    assert!(radio.is_powered_up());
    let frequency = radio.frequency().unwrap();
    assert!((frequency - 101.0).abs() < 0.05);
}

#[test]
fn power_down_cancels_active_task() {
    let mut radio = powered_radio();
    radio.set_frequency_async(98.0, 0).unwrap();
    assert!(radio.task_active());
    radio.power_down().unwrap();
    assert!(!radio.task_active());
    assert!(!radio.is_powered_up());
}

#[test]
#[should_panic(expected = "powered down")]
fn setter_requires_power() {
    let mut radio = Rda5807::new(FakeChip::new());
    let _ = radio.set_volume(3);
}

// ============================================================================
// Tuning
// ============================================================================

#[test]
fn blocking_tune_reaches_target() {
    let mut radio = powered_radio();
    let before = radio.bus_mut().write_count();
    radio
        .set_frequency_blocking(101.0, &mut NoopDelay)
        .unwrap();

    let frequency = radio.frequency().unwrap();
    assert!((frequency - 101.0).abs() < 0.05);
    // Exactly two writes: channel + tune start, tune clear.
    assert_eq!(radio.bus_mut().write_count() - before, 2);
    assert!(!radio.task_active());
}

#[test]
fn blocking_tune_to_current_frequency_is_noop() {
    let mut radio = powered_radio();
    radio
        .set_frequency_blocking(101.0, &mut NoopDelay)
        .unwrap();
    let frequency = radio.frequency().unwrap();

    let before = radio.bus_mut().write_count();
    radio
        .set_frequency_blocking(frequency, &mut NoopDelay)
        .unwrap();
    assert_eq!(radio.bus_mut().write_count(), before);
}

#[test]
fn blocking_tune_clamps_out_of_range_target() {
    let mut radio = powered_radio();
    radio
        .set_frequency_blocking(150.0, &mut NoopDelay)
        .unwrap();
    let frequency = radio.frequency().unwrap();
    assert!((frequency - 108.0).abs() < 0.05);
}

#[test]
fn async_tune_lifecycle() {
    let mut radio = powered_radio();
    radio.set_frequency_async(98.0, 0).unwrap();
    assert!(radio.task_active());

    // Before the scheduled resume time the tick is a guaranteed no-op:
    // not even a status read goes out.
    let reads_before = radio.bus_mut().reads;
    assert_eq!(radio.tick(1_000).unwrap(), TaskProgress::Pending);
    assert_eq!(radio.bus_mut().reads, reads_before);

    // First real poll: not settled yet.
    assert_eq!(radio.tick(5_000).unwrap(), TaskProgress::Pending);
    // Second poll: settled.
    assert_eq!(
        radio.tick(10_000).unwrap(),
        TaskProgress::Done(TaskResult::Success)
    );
    assert!(!radio.task_active());

    let frequency = radio.frequency().unwrap();
    assert!((frequency - 98.0).abs() < 0.05);
}

#[test]
#[should_panic(expected = "async task is active")]
fn second_start_while_task_active_panics() {
    let mut radio = powered_radio();
    radio.set_frequency_async(98.0, 0).unwrap();
    let _ = radio.set_frequency_async(99.0, 0);
}

#[test]
#[should_panic(expected = "async task is active")]
fn setter_while_task_active_panics() {
    let mut radio = powered_radio();
    radio.set_frequency_async(98.0, 0).unwrap();
    let _ = radio.set_volume(3);
}

#[test]
fn cancelled_tune_keeps_mid_operation_frequency() {
    let mut radio = powered_radio();
    radio.set_frequency_blocking(90.0, &mut NoopDelay).unwrap();

    radio.bus_mut().tune_latency = 100;
    radio.set_frequency_async(104.0, 0).unwrap();
    // The hardware is somewhere along the way when the cancel arrives.
    radio.bus_mut().set_read_channel(100); // 97.0 MHz

    radio.cancel().unwrap();
    assert!(!radio.task_active());

    // Stopping mid-operation deliberately does not restore the previous
    // frequency: the tuner stays wherever it got to.
    let frequency = radio.frequency().unwrap();
    assert!((frequency - 97.0).abs() < 1e-3);
}

#[test]
#[should_panic(expected = "tick without an active async task")]
fn tick_without_task_panics() {
    let mut radio = powered_radio();
    let _ = radio.tick(0);
}

// ============================================================================
// Seeking
// ============================================================================

#[test]
fn seek_finds_station() {
    let mut radio = powered_radio();
    radio.bus_mut().seek_landing = 95; // 96.5 MHz
    let found = radio.seek_blocking(SeekDirection::Up, &mut NoopDelay).unwrap();
    assert!(found);
    let frequency = radio.frequency().unwrap();
    assert!((frequency - 96.5).abs() < 1e-3);
}

#[test]
fn seek_reports_failure_after_wrapping() {
    let mut radio = powered_radio();
    radio.bus_mut().seek_fails = true;
    radio.bus_mut().seek_landing = 30; // back where it started
    let found = radio.seek_blocking(SeekDirection::Down, &mut NoopDelay).unwrap();
    assert!(!found);
    // The frequency still lands wherever the hardware stopped.
    let frequency = radio.frequency().unwrap();
    assert!((frequency - 90.0).abs() < 1e-3);
}

#[test]
fn seek_progress_is_observable_while_pending() {
    let mut radio = powered_radio();
    radio.set_frequency_blocking(90.0, &mut NoopDelay).unwrap();

    radio.bus_mut().seek_latency = 3;
    radio.bus_mut().seek_landing = 120;
    radio.seek_async(SeekDirection::Up, 0).unwrap();

    assert_eq!(radio.tick(200_000).unwrap(), TaskProgress::Pending);
    let first = radio.frequency().unwrap();
    assert_eq!(radio.tick(400_000).unwrap(), TaskProgress::Pending);
    let second = radio.frequency().unwrap();
    assert!(second > first, "sweep should be visible through frequency()");

    assert_eq!(radio.tick(600_000).unwrap(), TaskProgress::Pending);
    assert_eq!(
        radio.tick(800_000).unwrap(),
        TaskProgress::Done(TaskResult::Success)
    );
    let landed = radio.frequency().unwrap();
    assert!((landed - 99.0).abs() < 1e-3);
}

#[test]
fn seek_start_programs_direction_and_wrap() {
    let mut radio = powered_radio();
    radio.seek_async(SeekDirection::Up, 0).unwrap();
    let power = radio.bus_mut().regs[0x2];
    assert!(power & (1 << 8) != 0, "SEEK set");
    assert!(power & (1 << 9) != 0, "SEEKUP set");
    assert!(power & (1 << 7) == 0, "wrap mode, not stop-at-limit");
    radio.cancel().unwrap();
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn volume_is_clamped_and_idempotent() {
    let mut radio = powered_radio();
    let base = radio.bus_mut().write_count();

    radio.set_volume(7).unwrap();
    assert_eq!(radio.volume(), 7);
    assert_eq!(radio.bus_mut().write_count() - base, 1);

    // Same value again: zero register writes.
    radio.set_volume(7).unwrap();
    assert_eq!(radio.bus_mut().write_count() - base, 1);

    // Above the maximum: clamps to exactly 15.
    radio.set_volume(99).unwrap();
    assert_eq!(radio.volume(), 15);
    assert_eq!(radio.bus_mut().write_count() - base, 2);
    assert_eq!(radio.bus_mut().regs[0x5] & 0xF, 15);

    radio.set_volume(15).unwrap();
    assert_eq!(radio.bus_mut().write_count() - base, 2);
}

#[test]
fn seek_threshold_is_clamped_and_idempotent() {
    let mut radio = powered_radio();
    assert_eq!(radio.seek_threshold(), 8);

    let base = radio.bus_mut().write_count();
    // Default value: no write.
    radio.set_seek_threshold(8).unwrap();
    assert_eq!(radio.bus_mut().write_count(), base);

    radio.set_seek_threshold(20).unwrap();
    assert_eq!(radio.seek_threshold(), 15);
    assert_eq!(radio.bus_mut().write_count() - base, 1);
    assert_eq!((radio.bus_mut().regs[0x5] >> 8) & 0xF, 15);
}

#[test]
fn audio_toggles_write_once_per_change() {
    let mut radio = powered_radio();
    let base = radio.bus_mut().write_count();

    radio.set_mute(false).unwrap();
    assert!(!radio.mute());
    assert!(radio.bus_mut().regs[0x2] & (1 << 14) != 0, "DMUTE set");

    radio.set_mute(false).unwrap(); // no change
    assert_eq!(radio.bus_mut().write_count() - base, 1);

    radio.set_mono(true).unwrap();
    assert!(radio.bus_mut().regs[0x2] & (1 << 13) != 0);

    radio.set_bass_boost(true).unwrap();
    assert!(radio.bus_mut().regs[0x2] & (1 << 12) != 0);

    radio.set_softmute(false).unwrap();
    assert!(radio.bus_mut().regs[0x4] & (1 << 9) == 0);

    assert_eq!(radio.bus_mut().write_count() - base, 4);
}

#[test]
fn failed_write_leaves_mirrored_state_unchanged() {
    let mut radio = powered_radio();

    radio.bus_mut().fail_writes = true;
    assert_eq!(radio.set_volume(9), Err(Error::Bus(BusFault)));
    assert_eq!(radio.volume(), 0, "mirror must not run ahead of hardware");

    radio.bus_mut().fail_writes = false;
    radio.set_volume(9).unwrap();
    assert_eq!(radio.volume(), 9);
    assert_eq!(radio.bus_mut().regs[0x5] & 0xF, 9);
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn rssi_reads_fresh_every_call() {
    let mut radio = powered_radio();
    radio.bus_mut().regs[0xB] = 40 << 9;
    assert_eq!(radio.rssi().unwrap(), 40);
    radio.bus_mut().regs[0xB] = 60 << 9;
    assert_eq!(radio.rssi().unwrap(), 60);
}

#[test]
fn stereo_indicator_reads_fresh_every_call() {
    let mut radio = powered_radio();
    assert!(!radio.stereo_indicator().unwrap());
    radio.bus_mut().regs[0xA] |= 1 << 10;
    assert!(radio.stereo_indicator().unwrap());
}

#[test]
fn rds_group_not_ready_returns_none() {
    let mut radio = powered_radio();
    assert_eq!(radio.read_rds_group().unwrap(), None);
}

#[test]
fn rds_group_ready_returns_blocks() {
    let mut radio = powered_radio();
    {
        let chip = radio.bus_mut();
        chip.regs[0xA] |= 1 << 15; // RDSR
        chip.regs[0xC] = 0x1234;
        chip.regs[0xD] = 0x2000;
        chip.regs[0xE] = 0xABCD;
        chip.regs[0xF] = 0x4142;
    }
    let group = radio.read_rds_group().unwrap().unwrap();
    assert_eq!(
        group,
        RdsGroup {
            a: 0x1234,
            b: 0x2000,
            c: 0xABCD,
            d: 0x4142,
        }
    );
}
