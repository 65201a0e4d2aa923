//! # Main loop
//! The cooperative loop that ties clock, alarms, menu and environment together.
//!
//! One cycle: open the menu if cancel was pressed, update the clock, sample
//! the environment, draw the home screen, then ring if an alarm is due. Every
//! blocking wait polls the cancel flag and the buttons once per
//! [`POLL_INTERVAL_MS`] and keeps the clock running while it waits.

use core::fmt::{self, Write};

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use heapless::String;

use crate::alarm::{AlarmEvent, UserAlarm};
use crate::clock::ClockState;
use crate::environment::{EnvironmentStatus, assess};
use crate::menu::{AlarmTimeEditor, MENU_OPTIONS, MenuCursor, MenuOption, OffsetEditor};
use crate::session::{AlarmSession, SessionSignal, SessionState};
use crate::signal::CancelFlag;
use crate::state::SystemState;
use crate::traits::{
    AlertOutput, Board, Button, Devices, Display, EnvironmentSensor, InputSource, Monotonic,
    TextLine, TimeAuthority,
};

/// Period of every polling loop
pub const POLL_INTERVAL_MS: u32 = 50;

/// Period of one siren step while ringing
pub const ALERT_STEP_MS: u32 = 50;

/// Minimum time between two sensor reads
pub const ENVIRONMENT_INTERVAL_MS: u64 = 2_000;

/// How long confirmation messages stay up
pub const CONFIRMATION_HOLD_MS: u32 = 1_000;

/// How long the snooze message stays up
pub const SNOOZE_MESSAGE_HOLD_MS: u32 = 2_000;

/// Vertical spacing of menu entries
const MENU_ROW_HEIGHT: u8 = 12;

/// Outcome of one ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RingReport {
    /// The alarm that rang
    pub event: AlarmEvent,
    /// How the ring ended
    pub outcome: SessionState,
}

/// Which part of a two-part value an editor is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditStep {
    /// Hours
    Hours,
    /// Minutes
    Minutes,
}

/// Format into a fixed-capacity string; output is cut short if it does not fit
fn format<const N: usize>(args: fmt::Arguments<'_>) -> String<N> {
    let mut text = String::new();
    let _ = text.write_fmt(args);
    text
}

/// The appliance
pub struct Medibox<'a, B: Board> {
    /// Hardware collaborators
    devices: Devices<B>,
    /// Clock, offset and alarms
    state: SystemState,
    /// Pending cancel press
    cancel: &'a CancelFlag,
    /// Last environment assessment
    environment: EnvironmentStatus,
    /// Monotonic time of the last sensor read
    last_sample_ms: Option<u64>,
}

impl<'a, B: Board> Medibox<'a, B> {
    /// Wire up the appliance; the clock starts free-running at midnight
    pub fn new(devices: Devices<B>, cancel: &'a CancelFlag) -> Self {
        let now_ms = devices.clock.now_ms();
        Self {
            devices,
            state: SystemState::new(now_ms),
            cancel,
            environment: EnvironmentStatus::default(),
            last_sample_ms: None,
        }
    }

    /// Application state
    pub const fn state(&self) -> &SystemState {
        &self.state
    }

    /// Application state, mutable
    pub const fn state_mut(&mut self) -> &mut SystemState {
        &mut self.state
    }

    /// Hardware collaborators
    pub const fn devices(&self) -> &Devices<B> {
        &self.devices
    }

    /// Hardware collaborators, mutable
    pub const fn devices_mut(&mut self) -> &mut Devices<B> {
        &mut self.devices
    }

    /// Last environment assessment
    pub const fn environment(&self) -> EnvironmentStatus {
        self.environment
    }

    /// Run forever
    pub async fn run(&mut self) -> ! {
        info!("medibox main loop started");
        loop {
            self.run_once().await;
        }
    }

    /// One pass of the main loop. Returns how the ring ended if an alarm rang.
    pub async fn run_once(&mut self) -> Option<RingReport> {
        if self.cancel.take() {
            self.menu().await;
        }
        // presses on the home screen mean nothing
        self.drain_input();

        let now = self.update_clock().await;
        self.update_environment().await;
        self.render_home(&now).await;

        let report = match self.state.alarms.evaluate(&now) {
            Some(event) => Some(self.ring(event, now).await),
            None => None,
        };

        self.devices.delay.delay_ms(POLL_INTERVAL_MS).await;
        report
    }

    /// Sync from the authority, or free-run when it is unavailable
    async fn update_clock(&mut self) -> ClockState {
        let now_ms = self.devices.clock.now_ms();
        let tick = match self.devices.authority.fetch(self.state.offset.seconds()).await {
            Ok(fetched) => self.state.clock.synchronize(fetched, now_ms),
            Err(_) => {
                self.state.clock.lose_sync();
                self.state.clock.tick(now_ms)
            }
        };
        self.state.apply(tick)
    }

    /// Read the sensor when the last read is old enough and switch the warning lamp
    async fn update_environment(&mut self) {
        let now_ms = self.devices.clock.now_ms();
        let due = self
            .last_sample_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= ENVIRONMENT_INTERVAL_MS);
        if !due {
            return;
        }
        self.last_sample_ms = Some(now_ms);

        self.environment = match self.devices.sensor.read().await {
            Ok(reading) => {
                debug!(
                    "environment: {} x0.1 C, {} x0.1 %RH",
                    reading.temperature_tenths, reading.humidity_tenths
                );
                assess(&reading)
            }
            Err(e) => {
                warn!("environment sensor read failed: {}", e);
                EnvironmentStatus::default()
            }
        };

        let switched = if self.environment.needs_warning() {
            self.devices.lamp.set_high()
        } else {
            self.devices.lamp.set_low()
        };
        if switched.is_err() {
            warn!("failed to switch the warning lamp");
        }
    }

    /// Clear, draw `lines` and flush. A failed flush is logged and otherwise ignored.
    async fn show(&mut self, lines: &[TextLine<'_>]) {
        let display = &mut self.devices.display;
        display.clear();
        display.render_lines(lines);
        if let Err(e) = display.flush().await {
            warn!("display flush failed: {}", e);
        }
    }

    /// Show a one-line message and hold it
    async fn show_message(&mut self, message: &str, hold_ms: u32) {
        self.show(&[TextLine::new(message, 20, 2)]).await;
        self.devices.delay.delay_ms(hold_ms).await;
    }

    /// Home screen: day, time, climate warnings and alarm status
    async fn render_home(&mut self, now: &ClockState) {
        let day: String<10> = format(format_args!("{}", now.day));
        let time: String<8> = format(format_args!(
            "{:02}:{:02}:{:02}",
            now.hour, now.minute, now.second
        ));
        let first = self.alarm_status(UserAlarm::First);
        let second = self.alarm_status(UserAlarm::Second);

        let display = &mut self.devices.display;
        display.clear();
        display.render_lines(&[
            TextLine::new("Day : ", 0, 0),
            TextLine::new(&day, 0, 40),
            TextLine::new(&time, 15, 15).with_size(2),
            TextLine::new(first, 40, 80),
            TextLine::new(second, 50, 80),
        ]);
        if let Some(label) = self.environment.temperature_label() {
            display.render_line(&TextLine::new(label, 40, 0));
        }
        if let Some(label) = self.environment.humidity_label() {
            display.render_line(&TextLine::new(label, 50, 0));
        }
        if let Err(e) = display.flush().await {
            warn!("display flush failed: {}", e);
        }
    }

    /// "A_1:ON" style status text for a user alarm
    fn alarm_status(&self, alarm: UserAlarm) -> &'static str {
        let enabled = self.state.alarms.user_slot(alarm).enabled;
        match (alarm, enabled) {
            (UserAlarm::First, true) => "A_1:ON",
            (UserAlarm::First, false) => "A_1:OFF",
            (UserAlarm::Second, true) => "A_2:ON",
            (UserAlarm::Second, false) => "A_2:OFF",
        }
    }

    /// Drop every queued press
    fn drain_input(&mut self) {
        while self.devices.input.poll().is_some() {}
    }

    /// Ring until the user dismisses (cancel) or snoozes (ok). There is no timeout.
    ///
    /// `now` is the tick the alarm fired on; the snooze counts from it.
    async fn ring(&mut self, event: AlarmEvent, now: ClockState) -> RingReport {
        // presses from before the ring, cancel included, resolve nothing
        self.drain_input();
        self.cancel.clear();
        self.show(&[TextLine::new("MEDICINE TIME!", 20, 10)]).await;
        let mut session = AlarmSession::begin(event, &mut self.devices.alert);

        loop {
            let signal = if self.cancel.take() {
                Some(SessionSignal::Cancel)
            } else {
                match self.devices.input.poll() {
                    Some(Button::Cancel) => Some(SessionSignal::Cancel),
                    Some(Button::Ok) => Some(SessionSignal::Confirm),
                    _ => None,
                }
            };

            if let Some(signal) = signal {
                let outcome = session.handle(
                    signal,
                    &now,
                    &mut self.state.alarms,
                    &mut self.devices.alert,
                );
                if matches!(outcome, SessionState::Snoozed { .. }) {
                    self.show_message("Snoozed for 5 minutes", SNOOZE_MESSAGE_HOLD_MS)
                        .await;
                }
                return RingReport { event, outcome };
            }

            self.devices.alert.step();
            self.devices.delay.delay_ms(ALERT_STEP_MS).await;
        }
    }

    /// Block until a button is pressed, keeping the clock running. A pending
    /// cancel request counts as a Cancel press.
    async fn wait_for_button(&mut self) -> Button {
        loop {
            if self.cancel.take() {
                return Button::Cancel;
            }
            if let Some(button) = self.devices.input.poll() {
                return button;
            }
            self.state.advance(self.devices.clock.now_ms());
            self.devices.delay.delay_ms(POLL_INTERVAL_MS).await;
        }
    }

    /// The menu list, until Cancel
    async fn menu(&mut self) {
        info!("menu opened");
        let mut cursor = MenuCursor::new();
        loop {
            self.render_menu(&cursor).await;
            match self.wait_for_button().await {
                Button::Down => cursor.next(),
                Button::Up => cursor.previous(),
                Button::Ok => self.run_option(cursor.selected()).await,
                Button::Cancel => break,
            }
        }
        info!("menu closed");
    }

    /// Draw the menu list with the cursor entry highlighted
    #[allow(clippy::cast_possible_truncation)]
    async fn render_menu(&mut self, cursor: &MenuCursor) {
        let display = &mut self.devices.display;
        display.clear();
        for (index, option) in MENU_OPTIONS.iter().enumerate() {
            let line = TextLine::new(option.label(), index as u8 * MENU_ROW_HEIGHT, 0);
            if index == cursor.index() {
                display.render_line(&line.inverted());
            } else {
                display.render_line(&line);
            }
        }
        if let Err(e) = display.flush().await {
            warn!("display flush failed: {}", e);
        }
    }

    /// Execute one menu entry
    async fn run_option(&mut self, option: MenuOption) {
        debug!("menu option {}", option);
        match option {
            MenuOption::SetTimeZone => self.edit_offset().await,
            MenuOption::SetAlarm(alarm) => self.edit_alarm(alarm).await,
            MenuOption::RemoveAlarm(alarm) => {
                self.state.disarm_alarm(alarm);
                let message: String<20> =
                    format(format_args!("Alarm {} disabled", alarm.number()));
                self.show_message(&message, CONFIRMATION_HOLD_MS).await;
            }
        }
    }

    /// Draw an editor screen: prompt plus a large `hours : minutes`
    async fn render_editor(&mut self, step: EditStep, hours: &str, minutes: &str, column: u8) {
        let prompt = match step {
            EditStep::Hours => "Enter hour: ",
            EditStep::Minutes => "Enter minute: ",
        };
        self.show(&[
            TextLine::new(prompt, 0, 2),
            TextLine::new(hours, 20, column).with_size(2),
            TextLine::new(":", 20, 60).with_size(2),
            TextLine::new(minutes, 20, 75).with_size(2),
        ])
        .await;
    }

    /// Two-step UTC offset editor; applied only on the final Ok
    async fn edit_offset(&mut self) {
        let mut editor = OffsetEditor::new(self.state.offset);
        let mut step = EditStep::Hours;
        loop {
            let hours: String<4> = format(format_args!("{}", editor.hours()));
            let minutes: String<4> = format(format_args!("{:02}", editor.minutes()));
            self.render_editor(step, &hours, &minutes, 20).await;

            match (step, self.wait_for_button().await) {
                (_, Button::Cancel) => return,
                (EditStep::Hours, Button::Up) => editor.hours_up(),
                (EditStep::Hours, Button::Down) => editor.hours_down(),
                (EditStep::Hours, Button::Ok) => step = EditStep::Minutes,
                (EditStep::Minutes, Button::Up) => editor.minutes_up(),
                (EditStep::Minutes, Button::Down) => editor.minutes_down(),
                (EditStep::Minutes, Button::Ok) => {
                    self.state.set_offset(editor.offset());
                    self.show_message("Time Zone is set", CONFIRMATION_HOLD_MS).await;
                    return;
                }
            }
        }
    }

    /// Two-step alarm time editor; applied only on the final Ok
    async fn edit_alarm(&mut self, alarm: UserAlarm) {
        let mut editor = AlarmTimeEditor::new(self.state.alarms.user_slot(alarm));
        let mut step = EditStep::Hours;
        loop {
            let hours: String<4> = format(format_args!("{:02}", editor.hour));
            let minutes: String<4> = format(format_args!("{:02}", editor.minute));
            self.render_editor(step, &hours, &minutes, 35).await;

            match (step, self.wait_for_button().await) {
                (_, Button::Cancel) => return,
                (EditStep::Hours, Button::Up) => editor.hour_up(),
                (EditStep::Hours, Button::Down) => editor.hour_down(),
                (EditStep::Hours, Button::Ok) => step = EditStep::Minutes,
                (EditStep::Minutes, Button::Up) => editor.minute_up(),
                (EditStep::Minutes, Button::Down) => editor.minute_down(),
                (EditStep::Minutes, Button::Ok) => {
                    self.state.arm_alarm(alarm, editor.hour, editor.minute);
                    self.show_message("Alarm is set", CONFIRMATION_HOLD_MS).await;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::SNOOZE_SLOT;
    use crate::clock::{ClockMode, MS_PER_MINUTE, UtcOffset};
    use crate::environment::EnvironmentReading;
    use crate::mock::{MockBoard, MockInput, SimTime, mock_devices};
    use crate::traits::SensorError;
    use embassy_futures::block_on;

    fn medibox() -> (Medibox<'static, MockBoard>, SimTime) {
        let (devices, time, cancel) = mock_devices();
        (Medibox::new(devices, cancel), time)
    }

    fn press(medibox: &mut Medibox<'static, MockBoard>, at_ms: u64, button: Button) {
        medibox.devices_mut().input.press(at_ms, button);
    }

    /// Run cycles until simulated time reaches `until_ms`, collecting ring reports
    fn run_until(medibox: &mut Medibox<'static, MockBoard>, time: &SimTime, until_ms: u64) -> Vec<RingReport> {
        let mut reports = Vec::new();
        while time.now() < until_ms {
            if let Some(report) = block_on(medibox.run_once()) {
                reports.push(report);
            }
        }
        reports
    }

    #[test]
    fn test_home_screen() {
        let (mut medibox, _time) = medibox();
        medibox.state_mut().arm_alarm(UserAlarm::Second, 8, 0);
        block_on(medibox.run_once());

        let display = &medibox.devices().display;
        assert!(display.last_frame_has("Day : "));
        assert!(display.last_frame_has("00:00:00"));
        assert!(display.last_frame_has("A_1:OFF"));
        assert!(display.last_frame_has("A_2:ON"));
        assert!(!display.last_frame_has("Temp:HIGH"));
    }

    #[test]
    fn test_free_runs_without_authority() {
        let (mut medibox, time) = medibox();
        run_until(&mut medibox, &time, MS_PER_MINUTE + 100);

        let now = medibox.state().now();
        assert_eq!((now.hour, now.minute), (0, 1));
        assert_eq!(medibox.state().clock.mode(), ClockMode::FreeRunning);
        assert!(medibox.devices().display.last_frame_has("00:01:00"));
    }

    #[test]
    fn test_synchronizes_with_offset() {
        let (mut medibox, _time) = medibox();
        // 2024-02-29 13:45:30 UTC
        medibox.devices_mut().authority.base_unix = Some(1_709_214_330);
        block_on(medibox.run_once());

        assert_eq!(medibox.devices().authority.offsets, [19_800]);
        assert_eq!(medibox.state().now(), ClockState::new(29, 19, 15, 30));
        assert_eq!(medibox.state().clock.mode(), ClockMode::Synchronized);
    }

    #[test]
    fn test_authority_loss_keeps_time() {
        let (mut medibox, time) = medibox();
        medibox.devices_mut().authority.base_unix = Some(1_709_214_330);
        block_on(medibox.run_once());
        medibox.devices_mut().authority.base_unix = None;

        run_until(&mut medibox, &time, 30_100);
        let now = medibox.state().now();
        assert_eq!((now.hour, now.minute, now.second), (19, 16, 0));
        assert_eq!(medibox.state().clock.mode(), ClockMode::FreeRunning);
    }

    #[test]
    fn test_ring_and_dismiss() {
        let (mut medibox, time) = medibox();
        medibox.state_mut().arm_alarm(UserAlarm::First, 0, 1);
        press(&mut medibox, MS_PER_MINUTE + 1_000, Button::Cancel);

        let reports = run_until(&mut medibox, &time, MS_PER_MINUTE + 2_000);
        assert_eq!(
            reports,
            [RingReport {
                event: AlarmEvent { slot: 0 },
                outcome: SessionState::Dismissed,
            }]
        );

        let alert = &medibox.devices().alert;
        assert_eq!((alert.activations, alert.deactivations), (1, 1));
        assert!(alert.steps >= 19);
        assert!(medibox.devices().display.shown("MEDICINE TIME!"));
        assert!(!medibox.state().alarms.slots()[SNOOZE_SLOT].enabled);
    }

    #[test]
    fn test_cancel_button_without_flag_dismisses() {
        let (mut devices, time, cancel) = mock_devices();
        devices.input = MockInput::new(time.clone(), None);
        let mut medibox = Medibox::new(devices, cancel);
        medibox.state_mut().arm_alarm(UserAlarm::Second, 0, 1);
        press(&mut medibox, MS_PER_MINUTE + 500, Button::Cancel);

        let reports = run_until(&mut medibox, &time, MS_PER_MINUTE + 1_000);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, SessionState::Dismissed);
    }

    #[test]
    fn test_snooze_rings_again_from_snooze_slot() {
        let (mut medibox, time) = medibox();
        medibox.state_mut().arm_alarm(UserAlarm::First, 0, 1);
        press(&mut medibox, MS_PER_MINUTE + 500, Button::Ok);
        press(&mut medibox, 6 * MS_PER_MINUTE + 500, Button::Cancel);

        let reports = run_until(&mut medibox, &time, 7 * MS_PER_MINUTE);
        assert_eq!(
            reports,
            [
                RingReport {
                    event: AlarmEvent { slot: 0 },
                    outcome: SessionState::Snoozed { hour: 0, minute: 6 },
                },
                RingReport {
                    event: AlarmEvent { slot: SNOOZE_SLOT },
                    outcome: SessionState::Dismissed,
                },
            ]
        );
        assert!(medibox.devices().display.shown("Snoozed for 5 minutes"));

        let slots = medibox.state().alarms.slots();
        assert!(slots[0].enabled && slots[0].fired_today);
        assert!(!slots[SNOOZE_SLOT].enabled);
    }

    #[test]
    fn test_snooze_counts_from_ring_start() {
        let (mut medibox, time) = medibox();
        medibox.state_mut().arm_alarm(UserAlarm::First, 0, 1);
        press(&mut medibox, 2 * MS_PER_MINUTE + 30_000, Button::Ok);

        let reports = run_until(&mut medibox, &time, 3 * MS_PER_MINUTE);
        assert_eq!(
            reports,
            [RingReport {
                event: AlarmEvent { slot: 0 },
                outcome: SessionState::Snoozed { hour: 0, minute: 6 },
            }]
        );
        let snooze = medibox.state().alarms.slots()[SNOOZE_SLOT];
        assert!(snooze.enabled);
        assert_eq!((snooze.hour, snooze.minute), (0, 6));
    }

    #[test]
    fn test_cancel_before_ring_does_not_dismiss() {
        let (mut medibox, time) = medibox();
        medibox.state_mut().arm_alarm(UserAlarm::First, 0, 1);
        // reaches the flag after the menu check of the cycle the alarm fires in
        press(&mut medibox, MS_PER_MINUTE, Button::Cancel);
        press(&mut medibox, MS_PER_MINUTE + 1_000, Button::Cancel);

        let reports = run_until(&mut medibox, &time, MS_PER_MINUTE + 2_000);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, SessionState::Dismissed);
        assert!(medibox.devices().alert.steps >= 19);
        assert!(!medibox.devices().display.shown(" 1 : Set Time Zone"));
    }

    #[test]
    fn test_backward_correction_does_not_ring_twice() {
        let (mut medibox, time) = medibox();
        medibox.state_mut().set_offset(UtcOffset::new(0, 0));
        medibox.state_mut().arm_alarm(UserAlarm::First, 0, 0);
        // 2024-02-29 23:59:58 UTC
        medibox.devices_mut().authority.base_unix = Some(1_709_251_198);
        press(&mut medibox, 2_200, Button::Cancel);

        let reports = run_until(&mut medibox, &time, 2_500);
        assert_eq!(reports.len(), 1);
        assert_eq!(medibox.state().now().day, 1);

        // the next sample steps the clock back across midnight
        medibox.devices_mut().authority.base_unix = Some(1_709_251_196);
        let reports = run_until(&mut medibox, &time, 6_000);
        assert!(reports.is_empty());
        assert_eq!(medibox.state().now(), ClockState::new(1, 0, 0, 1));
        assert!(medibox.state().alarms.user_slot(UserAlarm::First).fired_today);
    }

    #[test]
    fn test_stale_press_does_not_snooze() {
        let (mut medibox, time) = medibox();
        medibox.state_mut().arm_alarm(UserAlarm::First, 0, 1);
        press(&mut medibox, 30_000, Button::Ok);
        press(&mut medibox, MS_PER_MINUTE + 1_000, Button::Cancel);

        let reports = run_until(&mut medibox, &time, MS_PER_MINUTE + 2_000);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, SessionState::Dismissed);
    }

    #[test]
    fn test_coincident_alarms_ring_one_after_another() {
        let (mut medibox, time) = medibox();
        medibox.state_mut().arm_alarm(UserAlarm::First, 0, 1);
        medibox.state_mut().arm_alarm(UserAlarm::Second, 0, 1);
        press(&mut medibox, MS_PER_MINUTE + 200, Button::Cancel);
        press(&mut medibox, MS_PER_MINUTE + 600, Button::Cancel);

        let reports = run_until(&mut medibox, &time, MS_PER_MINUTE + 1_000);
        let slots: Vec<usize> = reports.iter().map(|r| r.event.slot).collect();
        assert_eq!(slots, [0, 1]);
    }

    #[test]
    fn test_menu_sets_alarm() {
        let (mut medibox, time) = medibox();
        for (at, button) in [
            (100, Button::Cancel),
            (200, Button::Down),
            (300, Button::Ok),
            (400, Button::Up),
            (500, Button::Up),
            (600, Button::Ok),
            (700, Button::Down),
            (800, Button::Ok),
            (2_000, Button::Cancel),
        ] {
            press(&mut medibox, at, button);
        }

        run_until(&mut medibox, &time, 2_500);
        assert_eq!(medibox.devices().input.pending(), 0);

        let slot = medibox.state().alarms.user_slot(UserAlarm::First);
        assert!(slot.enabled && !slot.fired_today);
        assert_eq!((slot.hour, slot.minute), (2, 59));
        assert!(medibox.devices().display.shown("Alarm is set"));
        assert!(medibox.devices().display.last_frame_has("A_1:ON"));
    }

    #[test]
    fn test_menu_highlights_cursor() {
        let (mut medibox, time) = medibox();
        press(&mut medibox, 100, Button::Cancel);
        press(&mut medibox, 200, Button::Up);
        press(&mut medibox, 1_000, Button::Cancel);

        run_until(&mut medibox, &time, 1_200);
        let frames = &medibox.devices().display.frames;
        let menu = frames
            .iter()
            .rev()
            .find(|frame| frame.iter().any(|line| line.inverted))
            .unwrap();
        let highlighted: Vec<&str> = menu
            .iter()
            .filter(|line| line.inverted)
            .map(|line| line.text.as_str())
            .collect();
        assert_eq!(highlighted, [" 5 : Remove Alarm 2"]);
    }

    #[test]
    fn test_menu_removes_alarm() {
        let (mut medibox, time) = medibox();
        medibox.state_mut().arm_alarm(UserAlarm::Second, 7, 15);
        for (at, button) in [
            (100, Button::Cancel),
            (200, Button::Up),
            (300, Button::Ok),
            (2_000, Button::Cancel),
        ] {
            press(&mut medibox, at, button);
        }

        run_until(&mut medibox, &time, 2_500);
        let slot = medibox.state().alarms.user_slot(UserAlarm::Second);
        assert!(!slot.enabled && slot.fired_today);
        assert_eq!((slot.hour, slot.minute), (0, 0));
        assert!(medibox.devices().display.shown("Alarm 2 disabled"));
    }

    #[test]
    fn test_menu_sets_time_zone() {
        let (mut medibox, time) = medibox();
        medibox.devices_mut().authority.base_unix = Some(0);
        for (at, button) in [
            (100, Button::Cancel),
            (200, Button::Ok),
            (300, Button::Down),
            (400, Button::Ok),
            (500, Button::Up),
            (600, Button::Ok),
            (2_000, Button::Cancel),
        ] {
            press(&mut medibox, at, button);
        }

        run_until(&mut medibox, &time, 2_500);
        assert_eq!(medibox.state().offset, UtcOffset::new(4, 2));
        assert!(medibox.devices().display.shown("Time Zone is set"));
        assert_eq!(
            medibox.devices().authority.offsets.last(),
            Some(&(4 * 3600 + 45 * 60))
        );
    }

    #[test]
    fn test_cancelled_edit_changes_nothing() {
        let (mut medibox, time) = medibox();
        for (at, button) in [
            (100, Button::Cancel),
            (200, Button::Ok),
            (300, Button::Up),
            (400, Button::Ok),
            (500, Button::Up),
            (600, Button::Cancel),
            (800, Button::Cancel),
        ] {
            press(&mut medibox, at, button);
        }

        run_until(&mut medibox, &time, 1_000);
        assert_eq!(medibox.state().offset, UtcOffset::default());
        assert!(!medibox.devices().display.shown("Time Zone is set"));
    }

    #[test]
    fn test_clock_runs_while_in_menu() {
        let (mut medibox, time) = medibox();
        press(&mut medibox, 100, Button::Cancel);
        press(&mut medibox, 2 * MS_PER_MINUTE, Button::Cancel);

        // a single cycle spends two minutes in the menu
        while time.now() < 2 * MS_PER_MINUTE {
            block_on(medibox.run_once());
        }
        assert_eq!(medibox.state().now().minute, 2);
    }

    #[test]
    fn test_environment_warning() {
        let (mut medibox, _time) = medibox();
        medibox.devices_mut().sensor.reading = Ok(EnvironmentReading {
            temperature_tenths: 335,
            humidity_tenths: 600,
        });
        block_on(medibox.run_once());

        assert!(medibox.devices().lamp.lit);
        assert!(medibox.devices().display.last_frame_has("Temp:HIGH"));
        assert!(medibox.devices().display.last_frame_has("Hum :LOW"));
    }

    #[test]
    fn test_sensor_failure_clears_warning() {
        let (mut medibox, time) = medibox();
        medibox.devices_mut().sensor.reading = Ok(EnvironmentReading {
            temperature_tenths: 200,
            humidity_tenths: 700,
        });
        block_on(medibox.run_once());
        assert!(medibox.devices().lamp.lit);

        medibox.devices_mut().sensor.reading = Err(SensorError::Timeout);
        run_until(&mut medibox, &time, 2_100);
        assert!(!medibox.devices().lamp.lit);
        assert!(!medibox.devices().display.last_frame_has("Temp:LOW"));
    }

    #[test]
    fn test_sensor_sampling_interval() {
        let (mut medibox, time) = medibox();
        run_until(&mut medibox, &time, 1_900);
        assert_eq!(medibox.devices().sensor.reads, 1);
        run_until(&mut medibox, &time, 4_100);
        assert_eq!(medibox.devices().sensor.reads, 3);
    }

    #[test]
    fn test_display_failure_is_not_fatal() {
        let (mut medibox, time) = medibox();
        medibox.devices_mut().display.fail_flush = true;
        medibox.state_mut().arm_alarm(UserAlarm::First, 0, 1);
        press(&mut medibox, MS_PER_MINUTE + 300, Button::Cancel);

        let reports = run_until(&mut medibox, &time, MS_PER_MINUTE + 1_000);
        assert_eq!(reports.len(), 1);
        assert!(medibox.devices().display.frames.is_empty());
    }
}
