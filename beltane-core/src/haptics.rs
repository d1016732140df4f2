//! Vibration timeline interpretation.
//!
//! Each active timeline is an explicit resumable record: current segment
//! index plus accumulated elapsed time, advanced by `tick(elapsed)`. Waits
//! suspend between ticks by accumulation; one large delta may cross several
//! segment boundaries and emits each device transition in order.
//!
//! Cancellation is cooperative: `Deactivate` only clears the active flag,
//! and the next tick observes it, issues the pulse-OFF cleanup if the
//! device is mid-pulse, and destroys the execution. The OFF on every path
//! out of a pulse is what keeps the device from being left vibrating.

use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::time::Duration;

use beltane_types::{BusEvent, CueBank, Feedback, SegmentKind, TimelineId, VibrationTimeline};

use crate::backend::HapticDevice;

/// Runtime record of one in-flight timeline interpretation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineExecution {
    pub timeline: TimelineId,
    pub segment: usize,
    pub elapsed: f32,
    pub active: bool,
    pub pulsing: bool,
}

/// Owns the map of active timeline executions.
#[derive(Debug, Default)]
pub struct TimelineRunner {
    executions: Vec<TimelineExecution>,
}

impl TimelineRunner {
    pub fn new() -> Self {
        Self {
            executions: Vec::new(),
        }
    }

    pub fn is_running(&self, id: TimelineId) -> bool {
        self.executions.iter().any(|e| e.timeline == id)
    }

    pub fn execution(&self, id: TimelineId) -> Option<&TimelineExecution> {
        self.executions.iter().find(|e| e.timeline == id)
    }

    pub fn execution_count(&self) -> usize {
        self.executions.len()
    }

    /// Route one bus event to the matching transition.
    pub fn handle(
        &mut self,
        ev: &BusEvent,
        bank: &CueBank,
        device: &mut dyn HapticDevice,
        out: &mut VecDeque<BusEvent>,
        feedback: &Sender<Feedback>,
    ) {
        match ev {
            BusEvent::StartTimeline { timeline } => {
                self.activate(*timeline, bank, device, out, feedback)
            }
            BusEvent::StopTimeline { timeline } => self.deactivate(*timeline),
            _ => {}
        }
    }

    /// Begin interpreting a timeline from its first segment. The capability
    /// query happens here, once per activation. If the first segment is a
    /// pulse, the device turns on immediately.
    fn activate(
        &mut self,
        id: TimelineId,
        bank: &CueBank,
        device: &mut dyn HapticDevice,
        out: &mut VecDeque<BusEvent>,
        feedback: &Sender<Feedback>,
    ) {
        if !device.is_capable() {
            log::debug!(target: "haptics", "activate: device not capable, ignoring timeline {}", id);
            return;
        }
        let Some(timeline) = bank.timeline(id) else {
            log::warn!(target: "haptics", "activate: unknown timeline {}", id);
            return;
        };
        if self.is_running(id) {
            log::debug!(target: "haptics", "activate: timeline {} already running", id);
            return;
        }
        if timeline.segments.is_empty() {
            log::warn!(target: "haptics", "activate: timeline {} has no segments", id);
            out.push_back(BusEvent::TimelineFinished { timeline: id });
            let _ = feedback.send(Feedback::TimelineFinished {
                timeline: id,
                cancelled: false,
            });
            return;
        }
        let pulsing = timeline.segments[0].kind == SegmentKind::Pulse;
        if pulsing {
            device.set_pulse(true);
        }
        self.executions.push(TimelineExecution {
            timeline: id,
            segment: 0,
            elapsed: 0.0,
            active: true,
            pulsing,
        });
    }

    /// Mark an execution for cooperative exit. The in-progress wait is not
    /// preempted; the next tick observes the flag.
    fn deactivate(&mut self, id: TimelineId) {
        match self.executions.iter_mut().find(|e| e.timeline == id) {
            Some(exec) => exec.active = false,
            None => {
                log::debug!(target: "haptics", "deactivate: timeline {} not running", id)
            }
        }
    }

    /// Advance every execution by the elapsed wall time.
    pub fn tick(
        &mut self,
        elapsed: Duration,
        bank: &CueBank,
        device: &mut dyn HapticDevice,
        out: &mut VecDeque<BusEvent>,
        feedback: &Sender<Feedback>,
    ) {
        let dt = elapsed.as_secs_f32();
        let mut i = 0;
        while i < self.executions.len() {
            let exec = &mut self.executions[i];
            if !exec.active {
                if exec.pulsing {
                    device.set_pulse(false);
                }
                let id = exec.timeline;
                self.executions.remove(i);
                let _ = feedback.send(Feedback::TimelineFinished {
                    timeline: id,
                    cancelled: true,
                });
                continue;
            }
            let Some(timeline) = bank.timeline(exec.timeline) else {
                log::warn!(target: "haptics", "tick: timeline {} missing from bank", exec.timeline);
                if exec.pulsing {
                    device.set_pulse(false);
                }
                self.executions.remove(i);
                continue;
            };
            if step_execution(exec, timeline, dt, device) {
                let id = exec.timeline;
                self.executions.remove(i);
                out.push_back(BusEvent::TimelineFinished { timeline: id });
                let _ = feedback.send(Feedback::TimelineFinished {
                    timeline: id,
                    cancelled: false,
                });
                continue;
            }
            i += 1;
        }
    }

    /// Immediate teardown of every execution, turning the device off where
    /// mid-pulse. For shutdown, where no further tick will run.
    pub fn cancel_all(&mut self, device: &mut dyn HapticDevice, feedback: &Sender<Feedback>) {
        for exec in self.executions.drain(..) {
            if exec.pulsing {
                device.set_pulse(false);
            }
            let _ = feedback.send(Feedback::TimelineFinished {
                timeline: exec.timeline,
                cancelled: true,
            });
        }
    }
}

/// Accumulate elapsed time into the current segment and cross as many
/// boundaries as the delta covers, carrying the remainder. Returns true when
/// the execution ran past its last segment.
fn step_execution(
    exec: &mut TimelineExecution,
    timeline: &VibrationTimeline,
    dt: f32,
    device: &mut dyn HapticDevice,
) -> bool {
    exec.elapsed += dt;
    loop {
        let Some(seg) = timeline.segments.get(exec.segment) else {
            return true;
        };
        if exec.elapsed < seg.secs {
            return false;
        }
        exec.elapsed -= seg.secs;
        if seg.kind == SegmentKind::Pulse {
            device.set_pulse(false);
            exec.pulsing = false;
        }
        exec.segment += 1;
        match timeline.segments.get(exec.segment) {
            Some(next) => {
                if next.kind == SegmentKind::Pulse {
                    device.set_pulse(true);
                    exec.pulsing = true;
                }
            }
            None => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beltane_types::Segment;
    use std::sync::mpsc::{channel, Receiver};

    struct RecDevice {
        capable: bool,
        calls: Vec<bool>,
    }

    impl RecDevice {
        fn new(capable: bool) -> Self {
            Self {
                capable,
                calls: Vec::new(),
            }
        }
    }

    impl HapticDevice for RecDevice {
        fn is_capable(&self) -> bool {
            self.capable
        }
        fn set_pulse(&mut self, on: bool) {
            self.calls.push(on);
        }
    }

    fn seg(kind: SegmentKind, secs: f32) -> Segment {
        Segment { kind, secs }
    }

    fn make_bank() -> CueBank {
        CueBank {
            channels: vec![],
            clusters: vec![],
            timelines: vec![
                VibrationTimeline {
                    id: TimelineId::new(1),
                    name: "heartbeat".into(),
                    segments: vec![seg(SegmentKind::Delay, 1.0), seg(SegmentKind::Pulse, 0.5)],
                },
                VibrationTimeline {
                    id: TimelineId::new(2),
                    name: "buzz".into(),
                    segments: vec![seg(SegmentKind::Pulse, 0.5)],
                },
                VibrationTimeline {
                    id: TimelineId::new(3),
                    name: "empty".into(),
                    segments: vec![],
                },
                VibrationTimeline {
                    id: TimelineId::new(4),
                    name: "triple".into(),
                    segments: vec![
                        seg(SegmentKind::Pulse, 0.1),
                        seg(SegmentKind::Delay, 0.2),
                        seg(SegmentKind::Pulse, 0.1),
                    ],
                },
            ],
        }
    }

    fn make_fixtures() -> (
        TimelineRunner,
        CueBank,
        VecDeque<BusEvent>,
        Sender<Feedback>,
        Receiver<Feedback>,
    ) {
        let (tx, rx) = channel();
        (TimelineRunner::new(), make_bank(), VecDeque::new(), tx, rx)
    }

    fn start(
        runner: &mut TimelineRunner,
        id: u32,
        bank: &CueBank,
        dev: &mut RecDevice,
        out: &mut VecDeque<BusEvent>,
        tx: &Sender<Feedback>,
    ) {
        runner.handle(
            &BusEvent::StartTimeline {
                timeline: TimelineId::new(id),
            },
            bank,
            dev,
            out,
            tx,
        );
    }

    #[test]
    fn delay_then_pulse_runs_to_completion() {
        let (mut runner, bank, mut out, tx, rx) = make_fixtures();
        let mut dev = RecDevice::new(true);
        start(&mut runner, 1, &bank, &mut dev, &mut out, &tx);
        assert!(runner.is_running(TimelineId::new(1)));
        // No device action while the 1.0s delay accumulates
        for _ in 0..3 {
            runner.tick(Duration::from_millis(250), &bank, &mut dev, &mut out, &tx);
        }
        assert!(dev.calls.is_empty());
        // Fourth tick crosses the delay boundary: pulse turns on at t=1.0
        runner.tick(Duration::from_millis(250), &bank, &mut dev, &mut out, &tx);
        assert_eq!(dev.calls, vec![true]);
        // Two more ticks cover the 0.5s pulse: off at t=1.5, execution gone
        runner.tick(Duration::from_millis(250), &bank, &mut dev, &mut out, &tx);
        runner.tick(Duration::from_millis(250), &bank, &mut dev, &mut out, &tx);
        assert_eq!(dev.calls, vec![true, false]);
        assert!(!runner.is_running(TimelineId::new(1)));
        assert_eq!(
            out.pop_back(),
            Some(BusEvent::TimelineFinished {
                timeline: TimelineId::new(1)
            })
        );
        assert_eq!(
            rx.try_recv(),
            Ok(Feedback::TimelineFinished {
                timeline: TimelineId::new(1),
                cancelled: false
            })
        );
    }

    #[test]
    fn pulse_first_timeline_turns_on_at_activation() {
        let (mut runner, bank, mut out, tx, _rx) = make_fixtures();
        let mut dev = RecDevice::new(true);
        start(&mut runner, 2, &bank, &mut dev, &mut out, &tx);
        assert_eq!(dev.calls, vec![true]);
        assert!(runner.execution(TimelineId::new(2)).unwrap().pulsing);
    }

    #[test]
    fn cancel_mid_pulse_still_turns_off() {
        let (mut runner, bank, mut out, tx, rx) = make_fixtures();
        let mut dev = RecDevice::new(true);
        start(&mut runner, 2, &bank, &mut dev, &mut out, &tx);
        runner.tick(Duration::from_millis(200), &bank, &mut dev, &mut out, &tx);
        assert_eq!(dev.calls, vec![true]);
        runner.handle(
            &BusEvent::StopTimeline {
                timeline: TimelineId::new(2),
            },
            &bank,
            &mut dev,
            &mut out,
            &tx,
        );
        // Deactivation does not preempt: nothing happens until the next tick
        assert_eq!(dev.calls, vec![true]);
        assert!(runner.is_running(TimelineId::new(2)));
        runner.tick(Duration::from_millis(100), &bank, &mut dev, &mut out, &tx);
        assert_eq!(dev.calls, vec![true, false]);
        assert!(!runner.is_running(TimelineId::new(2)));
        assert_eq!(
            rx.try_recv(),
            Ok(Feedback::TimelineFinished {
                timeline: TimelineId::new(2),
                cancelled: true
            })
        );
        // Cancellation is not a natural finish: no bus event
        assert!(out.is_empty());
    }

    #[test]
    fn incapable_device_means_no_execution() {
        let (mut runner, bank, mut out, tx, _rx) = make_fixtures();
        let mut dev = RecDevice::new(false);
        start(&mut runner, 1, &bank, &mut dev, &mut out, &tx);
        assert!(!runner.is_running(TimelineId::new(1)));
        assert!(dev.calls.is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn duplicate_activate_is_ignored() {
        let (mut runner, bank, mut out, tx, _rx) = make_fixtures();
        let mut dev = RecDevice::new(true);
        start(&mut runner, 2, &bank, &mut dev, &mut out, &tx);
        start(&mut runner, 2, &bank, &mut dev, &mut out, &tx);
        assert_eq!(runner.execution_count(), 1);
        // Only the first activation touched the device
        assert_eq!(dev.calls, vec![true]);
    }

    #[test]
    fn deactivate_unknown_timeline_is_silent() {
        let (mut runner, bank, mut out, tx, _rx) = make_fixtures();
        let mut dev = RecDevice::new(true);
        runner.handle(
            &BusEvent::StopTimeline {
                timeline: TimelineId::new(42),
            },
            &bank,
            &mut dev,
            &mut out,
            &tx,
        );
        assert!(out.is_empty());
        assert!(dev.calls.is_empty());
    }

    #[test]
    fn reactivation_after_completion_allowed() {
        let (mut runner, bank, mut out, tx, _rx) = make_fixtures();
        let mut dev = RecDevice::new(true);
        start(&mut runner, 2, &bank, &mut dev, &mut out, &tx);
        runner.tick(Duration::from_millis(600), &bank, &mut dev, &mut out, &tx);
        assert!(!runner.is_running(TimelineId::new(2)));
        start(&mut runner, 2, &bank, &mut dev, &mut out, &tx);
        assert!(runner.is_running(TimelineId::new(2)));
        assert_eq!(dev.calls, vec![true, false, true]);
    }

    #[test]
    fn large_delta_crosses_segments_in_order() {
        let (mut runner, bank, mut out, tx, _rx) = make_fixtures();
        let mut dev = RecDevice::new(true);
        start(&mut runner, 4, &bank, &mut dev, &mut out, &tx);
        runner.tick(Duration::from_secs(10), &bank, &mut dev, &mut out, &tx);
        // One on/off pair per pulse segment, in declared order
        assert_eq!(dev.calls, vec![true, false, true, false]);
        assert!(!runner.is_running(TimelineId::new(4)));
    }

    #[test]
    fn empty_timeline_finishes_immediately() {
        let (mut runner, bank, mut out, tx, rx) = make_fixtures();
        let mut dev = RecDevice::new(true);
        start(&mut runner, 3, &bank, &mut dev, &mut out, &tx);
        assert!(!runner.is_running(TimelineId::new(3)));
        assert_eq!(
            out.pop_back(),
            Some(BusEvent::TimelineFinished {
                timeline: TimelineId::new(3)
            })
        );
        assert!(matches!(
            rx.try_recv(),
            Ok(Feedback::TimelineFinished {
                cancelled: false,
                ..
            })
        ));
        assert!(dev.calls.is_empty());
    }

    #[test]
    fn completion_lands_within_tick_granularity() {
        let (mut runner, bank, mut out, tx, _rx) = make_fixtures();
        let mut dev = RecDevice::new(true);
        start(&mut runner, 1, &bank, &mut dev, &mut out, &tx);
        // 0.4s ticks over a 1.5s timeline: done on the fourth tick (1.6s)
        let mut ticks = 0;
        while runner.is_running(TimelineId::new(1)) {
            runner.tick(Duration::from_millis(400), &bank, &mut dev, &mut out, &tx);
            ticks += 1;
            assert!(ticks < 100, "runner failed to terminate");
        }
        let total = ticks as f32 * 0.4;
        assert!(total >= 1.5 && total < 1.5 + 0.4);
        assert_eq!(dev.calls, vec![true, false]);
    }

    #[test]
    fn cancel_all_turns_off_and_clears() {
        let (mut runner, bank, mut out, tx, rx) = make_fixtures();
        let mut dev = RecDevice::new(true);
        start(&mut runner, 1, &bank, &mut dev, &mut out, &tx);
        start(&mut runner, 2, &bank, &mut dev, &mut out, &tx);
        assert_eq!(runner.execution_count(), 2);
        runner.cancel_all(&mut dev, &tx);
        assert_eq!(runner.execution_count(), 0);
        // Only the mid-pulse execution needed an off
        assert_eq!(dev.calls, vec![true, false]);
        let mut cancelled = 0;
        while let Ok(fb) = rx.try_recv() {
            if matches!(fb, Feedback::TimelineFinished { cancelled: true, .. }) {
                cancelled += 1;
            }
        }
        assert_eq!(cancelled, 2);
    }
}
