//! Tuner control engine
//!
//! [`Rda5807`] owns the bus, a shadow copy of the register file, and the
//! mirrored device settings. Long-running hardware operations (tune,
//! seek) run as resumable tasks: a start call programs the chip and
//! records when the next poll is due, and the owner then calls
//! [`Rda5807::tick`] until the task reports done. The blocking variants
//! wrap exactly that loop around an injected delay.
//!
//! Preconditions (powered up, no task in flight) are programming errors
//! and assert; everything the hardware can legitimately refuse comes
//! back as a `Result`.

use embedded_hal::delay::DelayNs;

use crate::bus::TunerBus;
use crate::config::{
    DEFAULT_SEEK_THRESHOLD, MAX_SEEK_THRESHOLD, MAX_VOLUME, RESET_HOLD_MS, SEEK_POLL_INTERVAL_MS,
    TUNE_POLL_INTERVAL_MS,
};
use crate::rds::RdsGroup;
use crate::regs::{
    Channel, ChipId, PowerCfg, Register, RegisterBank, StatusA, StatusB, SysCfg1, SysCfg2, SysCfg3,
    CONTROL_LAST, STATUS_BASE,
};
use crate::types::{
    Band, Deemphasis, FrequencyRange, SeekDirection, TaskProgress, TaskResult, TunerConfig,
};
use crate::Error;

const TUNE_POLL_US: u64 = TUNE_POLL_INTERVAL_MS as u64 * 1_000;
const SEEK_POLL_US: u64 = SEEK_POLL_INTERVAL_MS as u64 * 1_000;

/// The at-most-one resumable operation owned by the tuner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TunerTask {
    Idle,
    Tuning { resume_at: u64 },
    Seeking { resume_at: u64 },
}

/// RDA5807 tuner driver.
///
/// Generic over the [`TunerBus`] transport. All timing is injected: the
/// async operations take the current monotonic time in microseconds,
/// the blocking wrappers and power-up take a [`DelayNs`] implementation.
pub struct Rda5807<B: TunerBus> {
    bus: B,
    regs: RegisterBank,
    config: TunerConfig,
    range: FrequencyRange,
    frequency: Option<f32>,
    volume: u8,
    mute: bool,
    softmute: bool,
    bass_boost: bool,
    mono: bool,
    seek_threshold: u8,
    task: TunerTask,
}

impl<B: TunerBus> Rda5807<B> {
    /// Create a driver over a bus transport.
    ///
    /// The chip is untouched until [`Rda5807::power_up`]. Initial
    /// settings: muted, softmute on, volume 0, seek threshold 8.
    pub fn new(bus: B) -> Self {
        let config = TunerConfig::europe();
        Self {
            bus,
            regs: RegisterBank::new(),
            config,
            range: config.frequency_range(),
            frequency: None,
            volume: 0,
            mute: true,
            softmute: true,
            bass_boost: false,
            mono: false,
            seek_threshold: DEFAULT_SEEK_THRESHOLD,
            task: TunerTask::Idle,
        }
    }

    /// Release the bus transport.
    pub fn release(self) -> B {
        self.bus
    }

    /// Direct access to the bus transport.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Power up the chip.
    ///
    /// Configures the bus lines, verifies the chip identity (fatal on
    /// mismatch, see [`Error::BadChipId`]), pulses the soft reset, and
    /// writes the full initial configuration in one sequential transfer.
    /// When waking after [`Rda5807::power_down`], the previous frequency
    /// is restored with a blocking tune.
    ///
    /// # Panics
    ///
    /// If already powered up.
    pub fn power_up<D: DelayNs>(
        &mut self,
        config: TunerConfig,
        delay: &mut D,
    ) -> Result<(), Error<B::Error>> {
        assert!(!self.is_powered_up(), "already powered up");

        self.config = config;
        self.range = config.frequency_range();

        self.bus.configure()?;
        self.regs = RegisterBank::new();

        let id = self.bus.read_register(ChipId::INDEX)?;
        if id != ChipId::EXPECTED {
            return Err(Error::BadChipId(id));
        }
        self.regs.set_word(ChipId::INDEX, id);

        // Reset pulse: assert soft reset, hold, release, hold.
        let mut power = PowerCfg::default();
        power.set_enable(true);
        power.set_soft_reset(true);
        self.bus.write_register(PowerCfg::INDEX, power.raw())?;
        delay.delay_ms(RESET_HOLD_MS);
        power.set_soft_reset(false);
        self.bus.write_register(PowerCfg::INDEX, power.raw())?;
        delay.delay_ms(RESET_HOLD_MS);
        self.regs.set(power);

        // Capture the post-reset defaults of the control registers so
        // the batched write below only changes what we mean to change.
        for index in Channel::INDEX..=CONTROL_LAST {
            let word = self.bus.read_register(index)?;
            self.regs.set_word(index, word);
        }

        let mut power = self.regs.get::<PowerCfg>();
        power.set_new_method(true);
        power.set_rds_enable(true);
        power.set_bass(self.bass_boost);
        power.set_mono(self.mono);
        power.set_dmute(!self.mute);
        power.set_dhiz(true);
        self.regs.set(power);

        let mut channel = self.regs.get::<Channel>();
        channel.set_channel(0);
        channel.set_band(config.band.field_bits());
        channel.set_spacing(config.channel_spacing.field_bits());
        self.regs.set(channel);

        let mut sys1 = self.regs.get::<SysCfg1>();
        sys1.set_softmute(self.softmute);
        sys1.set_deemphasis_50us(config.deemphasis == Deemphasis::Eu50);
        self.regs.set(sys1);

        let mut sys2 = self.regs.get::<SysCfg2>();
        sys2.set_volume(self.volume);
        self.regs.set(sys2);

        // The two East Europe bands share a BAND encoding and are told
        // apart by the 65M/50M mode bit.
        if matches!(config.band, Band::EastEurope | Band::EastEuropeUpper) {
            let mut sys3 = self.regs.get::<SysCfg3>();
            sys3.set_band_65m_50m_mode(config.band == Band::EastEuropeUpper);
            self.regs.set(sys3);
        }

        self.bus
            .write_registers(self.regs.control_words(CONTROL_LAST))?;

        #[cfg(feature = "defmt")]
        defmt::debug!("powered up, band {}", config.band);

        if let Some(frequency) = self.frequency.take() {
            self.set_frequency_blocking(frequency, delay)?;
        }
        Ok(())
    }

    /// Power down the chip, keeping register and mirrored state so a
    /// later power-up restores behavior. Cancels an active async task.
    ///
    /// # Panics
    ///
    /// If powered down.
    pub fn power_down(&mut self) -> Result<(), Error<B::Error>> {
        assert!(self.is_powered_up(), "tuner is powered down");

        if self.task_active() {
            self.cancel()?;
        }

        let mut power = self.regs.get::<PowerCfg>();
        power.set_enable(false);
        self.bus.write_register(PowerCfg::INDEX, power.raw())?;
        self.regs.set(power);

        #[cfg(feature = "defmt")]
        defmt::debug!("powered down");
        Ok(())
    }

    /// Whether the chip is powered up.
    #[must_use]
    pub fn is_powered_up(&self) -> bool {
        self.regs.get::<PowerCfg>().enable()
    }

    /// The regional settings from the most recent power-up.
    #[must_use]
    pub const fn config(&self) -> TunerConfig {
        self.config
    }

    /// The frequency range for the configured band and spacing.
    #[must_use]
    pub const fn frequency_range(&self) -> FrequencyRange {
        self.range
    }

    /// The current frequency in MHz, or `None` before the first tune.
    ///
    /// Updated while a seek sweeps the band, so it can be polled to
    /// monitor progress.
    #[must_use]
    pub const fn frequency(&self) -> Option<f32> {
        self.frequency
    }

    /// Whether an async task is in flight.
    #[must_use]
    pub const fn task_active(&self) -> bool {
        !matches!(self.task, TunerTask::Idle)
    }

    /// Tune to a frequency in MHz, sleeping until the tuner settles.
    ///
    /// Does nothing when the target equals the current frequency.
    ///
    /// # Panics
    ///
    /// If powered down or an async task is active.
    #[allow(clippy::float_cmp)] // mirrored frequencies are step-quantized
    pub fn set_frequency_blocking<D: DelayNs>(
        &mut self,
        mhz: f32,
        delay: &mut D,
    ) -> Result<(), Error<B::Error>> {
        self.assert_idle();

        if self.frequency == Some(mhz) {
            return Ok(());
        }
        self.set_frequency_async(mhz, 0)?;
        let mut now_us = 0u64;
        loop {
            delay.delay_ms(TUNE_POLL_INTERVAL_MS);
            now_us += TUNE_POLL_US;
            if self.tick(now_us)?.is_done() {
                return Ok(());
            }
        }
    }

    /// Start tuning to a frequency in MHz without blocking.
    ///
    /// The target is clamped into the band's range. Call
    /// [`Rda5807::tick`] until the task reports done. If cancelled
    /// before completion, the tuner is stopped without restoring the
    /// original frequency.
    ///
    /// # Panics
    ///
    /// If powered down or an async task is active.
    pub fn set_frequency_async(&mut self, mhz: f32, now_us: u64) -> Result<(), Error<B::Error>> {
        self.assert_idle();

        let mhz = self.range.clamp(mhz);
        let mut channel = self.regs.get::<Channel>();
        channel.set_channel(self.range.frequency_to_channel(mhz));
        channel.set_tune(true);
        self.bus.write_register(Channel::INDEX, channel.raw())?;
        self.regs.set(channel);

        self.task = TunerTask::Tuning {
            resume_at: now_us + TUNE_POLL_US,
        };
        Ok(())
    }

    /// Seek the next station, sleeping until the sweep ends.
    ///
    /// Returns whether a strong enough station was found.
    ///
    /// # Panics
    ///
    /// If powered down or an async task is active.
    pub fn seek_blocking<D: DelayNs>(
        &mut self,
        direction: SeekDirection,
        delay: &mut D,
    ) -> Result<bool, Error<B::Error>> {
        self.seek_async(direction, 0)?;
        let mut now_us = 0u64;
        loop {
            delay.delay_ms(SEEK_POLL_INTERVAL_MS);
            now_us += SEEK_POLL_US;
            if let TaskProgress::Done(result) = self.tick(now_us)? {
                return Ok(result.is_success());
            }
        }
    }

    /// Start seeking the next station without blocking.
    ///
    /// Seeks in the given direction, wrapping at the band edges.
    /// [`Rda5807::frequency`] tracks the sweep while the task runs.
    /// Polling is far coarser than for tuning: seek takes up to seconds
    /// and bus traffic injects interference into the front end. If
    /// cancelled before completion, the tuner is stopped without
    /// restoring the original frequency.
    ///
    /// # Panics
    ///
    /// If powered down or an async task is active.
    pub fn seek_async(
        &mut self,
        direction: SeekDirection,
        now_us: u64,
    ) -> Result<(), Error<B::Error>> {
        self.assert_idle();

        let mut power = self.regs.get::<PowerCfg>();
        power.set_seek_stop_at_limit(false);
        power.set_seek_up(direction == SeekDirection::Up);
        power.set_seek(true);
        self.bus.write_register(PowerCfg::INDEX, power.raw())?;
        self.regs.set(power);

        self.task = TunerTask::Seeking {
            resume_at: now_us + SEEK_POLL_US,
        };

        #[cfg(feature = "defmt")]
        defmt::debug!("seek started, direction {}", direction);
        Ok(())
    }

    /// Advance the active async task.
    ///
    /// Must be called repeatedly after starting an async operation; a
    /// call before the task's scheduled resume time is a no-op. When the
    /// tick reports [`TaskProgress::Done`], the task has been cleared.
    ///
    /// A bus error leaves the task active; the owner may retry the tick
    /// or cancel.
    ///
    /// # Panics
    ///
    /// If no async task is active.
    pub fn tick(&mut self, now_us: u64) -> Result<TaskProgress, Error<B::Error>> {
        let progress = match self.task {
            TunerTask::Idle => panic!("tick without an active async task"),
            TunerTask::Tuning { resume_at } => {
                if now_us < resume_at {
                    return Ok(TaskProgress::Pending);
                }
                self.tune_step(false, now_us)?
            }
            TunerTask::Seeking { resume_at } => {
                if now_us < resume_at {
                    return Ok(TaskProgress::Pending);
                }
                self.seek_step(false, now_us)?
            }
        };
        if progress.is_done() {
            self.task = TunerTask::Idle;
        }
        Ok(progress)
    }

    /// Abort the active async task.
    ///
    /// Stops the tuner immediately instead of waiting for hardware
    /// completion; the task is cleared even if the stop write fails.
    ///
    /// # Panics
    ///
    /// If no async task is active.
    pub fn cancel(&mut self) -> Result<(), Error<B::Error>> {
        let result = match self.task {
            TunerTask::Idle => panic!("cancel without an active async task"),
            TunerTask::Tuning { .. } => self.tune_step(true, 0),
            TunerTask::Seeking { .. } => self.seek_step(true, 0),
        };
        self.task = TunerTask::Idle;

        #[cfg(feature = "defmt")]
        defmt::debug!("async task cancelled");
        result.map(|_| ())
    }

    fn tune_step(&mut self, cancel: bool, now_us: u64) -> Result<TaskProgress, Error<B::Error>> {
        let mut result = TaskResult::Success;
        if cancel {
            result = TaskResult::Failed;
        } else {
            let status = self.read_status_a()?;
            if !status.seek_tune_complete() {
                self.task = TunerTask::Tuning {
                    resume_at: now_us + TUNE_POLL_US,
                };
                return Ok(TaskProgress::Pending);
            }
        }

        // Stop tuning. On cancel this leaves the tuner wherever it got
        // to; the previous frequency is not restored.
        let mut channel = self.regs.get::<Channel>();
        channel.set_tune(false);
        self.bus.write_register(Channel::INDEX, channel.raw())?;
        self.regs.set(channel);

        let status = self.read_status_a()?;
        self.frequency = Some(self.range.channel_to_frequency(status.read_channel()));
        Ok(TaskProgress::Done(result))
    }

    fn seek_step(&mut self, cancel: bool, now_us: u64) -> Result<TaskProgress, Error<B::Error>> {
        let mut result = TaskResult::Success;
        if cancel {
            result = TaskResult::Failed;
        } else {
            let status = self.read_status_a()?;
            if !status.seek_tune_complete() {
                // Track the sweep so frequency() shows progress.
                self.frequency = Some(self.range.channel_to_frequency(status.read_channel()));
                self.task = TunerTask::Seeking {
                    resume_at: now_us + SEEK_POLL_US,
                };
                return Ok(TaskProgress::Pending);
            }
            if status.seek_failed() {
                result = TaskResult::Failed;
            }
        }

        let mut power = self.regs.get::<PowerCfg>();
        power.set_seek(false);
        self.bus.write_register(PowerCfg::INDEX, power.raw())?;
        self.regs.set(power);

        let status = self.read_status_a()?;
        self.frequency = Some(self.range.channel_to_frequency(status.read_channel()));
        Ok(TaskProgress::Done(result))
    }

    /// The seek threshold. Defaults to 8.
    #[must_use]
    pub const fn seek_threshold(&self) -> u8 {
        self.seek_threshold
    }

    /// Set the seek threshold, clamped to 0–15.
    ///
    /// Raise it to skip weak stations during seek.
    ///
    /// # Panics
    ///
    /// If powered down or an async task is active.
    pub fn set_seek_threshold(&mut self, threshold: u8) -> Result<(), Error<B::Error>> {
        self.assert_idle();

        let threshold = threshold.min(MAX_SEEK_THRESHOLD);
        if threshold == self.seek_threshold {
            return Ok(());
        }
        let mut cfg = self.regs.get::<SysCfg2>();
        cfg.set_seek_threshold(threshold);
        self.bus.write_register(SysCfg2::INDEX, cfg.raw())?;
        self.regs.set(cfg);
        self.seek_threshold = threshold;
        Ok(())
    }

    /// Whether audio is muted. Muted by default.
    #[must_use]
    pub const fn mute(&self) -> bool {
        self.mute
    }

    /// Mute or unmute the audio output.
    ///
    /// # Panics
    ///
    /// If powered down or an async task is active.
    pub fn set_mute(&mut self, mute: bool) -> Result<(), Error<B::Error>> {
        self.assert_idle();

        if mute == self.mute {
            return Ok(());
        }
        let mut power = self.regs.get::<PowerCfg>();
        power.set_dmute(!mute);
        self.bus.write_register(PowerCfg::INDEX, power.raw())?;
        self.regs.set(power);
        self.mute = mute;
        Ok(())
    }

    /// Whether softmute is enabled. Enabled by default.
    #[must_use]
    pub const fn softmute(&self) -> bool {
        self.softmute
    }

    /// Enable or disable softmute (noise reduction on weak signals).
    ///
    /// # Panics
    ///
    /// If powered down or an async task is active.
    pub fn set_softmute(&mut self, softmute: bool) -> Result<(), Error<B::Error>> {
        self.assert_idle();

        if softmute == self.softmute {
            return Ok(());
        }
        let mut cfg = self.regs.get::<SysCfg1>();
        cfg.set_softmute(softmute);
        self.bus.write_register(SysCfg1::INDEX, cfg.raw())?;
        self.regs.set(cfg);
        self.softmute = softmute;
        Ok(())
    }

    /// Whether bass boost is enabled.
    #[must_use]
    pub const fn bass_boost(&self) -> bool {
        self.bass_boost
    }

    /// Enable or disable bass boost.
    ///
    /// # Panics
    ///
    /// If powered down or an async task is active.
    pub fn set_bass_boost(&mut self, bass_boost: bool) -> Result<(), Error<B::Error>> {
        self.assert_idle();

        if bass_boost == self.bass_boost {
            return Ok(());
        }
        let mut power = self.regs.get::<PowerCfg>();
        power.set_bass(bass_boost);
        self.bus.write_register(PowerCfg::INDEX, power.raw())?;
        self.regs.set(power);
        self.bass_boost = bass_boost;
        Ok(())
    }

    /// Whether mono output is forced. Defaults to stereo.
    #[must_use]
    pub const fn mono(&self) -> bool {
        self.mono
    }

    /// Force or release mono output.
    ///
    /// Forcing mono may improve reception of weak stations.
    ///
    /// # Panics
    ///
    /// If powered down or an async task is active.
    pub fn set_mono(&mut self, mono: bool) -> Result<(), Error<B::Error>> {
        self.assert_idle();

        if mono == self.mono {
            return Ok(());
        }
        let mut power = self.regs.get::<PowerCfg>();
        power.set_mono(mono);
        self.bus.write_register(PowerCfg::INDEX, power.raw())?;
        self.regs.set(power);
        self.mono = mono;
        Ok(())
    }

    /// The audio volume. Defaults to 0 (still audible; use
    /// [`Rda5807::set_mute`] to silence).
    #[must_use]
    pub const fn volume(&self) -> u8 {
        self.volume
    }

    /// Set the audio volume, clamped to 0–15.
    ///
    /// # Panics
    ///
    /// If powered down or an async task is active.
    pub fn set_volume(&mut self, volume: u8) -> Result<(), Error<B::Error>> {
        self.assert_idle();

        let volume = volume.min(MAX_VOLUME);
        if volume == self.volume {
            return Ok(());
        }
        let mut cfg = self.regs.get::<SysCfg2>();
        cfg.set_volume(volume);
        self.bus.write_register(SysCfg2::INDEX, cfg.raw())?;
        self.regs.set(cfg);
        self.volume = volume;
        Ok(())
    }

    /// Read the current signal strength, up to 75 dBµV.
    ///
    /// Always a fresh register read; the value drifts continuously.
    /// Allow ~500 ms after a frequency change for it to settle.
    ///
    /// # Panics
    ///
    /// If powered down.
    pub fn rssi(&mut self) -> Result<u8, Error<B::Error>> {
        assert!(self.is_powered_up(), "tuner is powered down");

        let word = self.bus.read_register(StatusB::INDEX)?;
        self.regs.set_word(StatusB::INDEX, word);
        Ok(StatusB::from_raw(word).rssi())
    }

    /// Whether the tuned station transmits a stereo signal (regardless
    /// of the mono setting). Always a fresh register read.
    ///
    /// # Panics
    ///
    /// If powered down.
    pub fn stereo_indicator(&mut self) -> Result<bool, Error<B::Error>> {
        assert!(self.is_powered_up(), "tuner is powered down");

        Ok(self.read_status_a()?.stereo())
    }

    /// Read one RDS group if the chip has one ready.
    ///
    /// Non-blocking; call roughly every 40 ms. Returns `None` while no
    /// new group is available.
    ///
    /// # Panics
    ///
    /// If powered down.
    pub fn read_rds_group(&mut self) -> Result<Option<RdsGroup>, Error<B::Error>> {
        assert!(self.is_powered_up(), "tuner is powered down");

        let mut words = [0u16; 6];
        self.bus.read_registers(&mut words)?;
        for (i, &word) in words.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            self.regs.set_word(STATUS_BASE + i as u8, word);
        }
        if !self.regs.get::<StatusA>().rds_ready() {
            return Ok(None);
        }
        Ok(Some(RdsGroup {
            a: words[2],
            b: words[3],
            c: words[4],
            d: words[5],
        }))
    }

    fn read_status_a(&mut self) -> Result<StatusA, Error<B::Error>> {
        let word = self.bus.read_register(StatusA::INDEX)?;
        self.regs.set_word(StatusA::INDEX, word);
        Ok(StatusA::from_raw(word))
    }

    fn assert_idle(&self) {
        assert!(self.is_powered_up(), "tuner is powered down");
        assert!(
            !self.task_active(),
            "operation not allowed while an async task is active"
        );
    }
}
