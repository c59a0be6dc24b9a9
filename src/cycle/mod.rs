//! Cycle Detector - start → ignition → rundown state machine
//!
//! Scans a run once and emits one [`CycleResult`] per completed cycle.
//!
//! ## States
//!
//! ```text
//! IDLE ──startup──▶ RAMPING_UP ──rundown T1──▶ RAMPING_DOWN ──all T2──▶ EMIT ──▶ IDLE
//! ```
//!
//! - `IDLE`: waits for the startup condition to turn true (false on the
//!   previous tick, true now) and records `T_Start`
//! - `RAMPING_UP`: records `T_Baseline` / `T_Ignition` the first time each is
//!   met; the first rundown T1 (Ng or Np) switches to `RAMPING_DOWN`
//! - `RAMPING_DOWN`: keeps filling missing events, records T2 per channel
//! - `EMIT`: derives the timing metrics, resets, and re-evaluates the same
//!   tick against the startup edge
//!
//! Every probe window is updated before any state logic runs. Named events
//! are write-once within a cycle. The startup aggregate is only read once its
//! window is covered, so a cycle never opens on a partially filled window.
//!
//! A rundown T1 is a downward crossing of `threshold_high`: the statistic has
//! to be at or above it at some tick of the current cycle first. T2 is the
//! first `RAMPING_DOWN` tick where the statistic is below `threshold_low`,
//! whether or not that channel produced a T1; without T1 its rundown metric is
//! simply absent.

use crate::condition::{
    ConditionProbe, DifferenceCondition, DualThresholdCondition, StatisticCondition,
};
use crate::types::{CycleResult, Sample};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Validated cycle detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Baseline event (`T_Baseline`)
    pub time_base: StatisticCondition,
    /// Cycle opening condition (`T_Start`)
    pub startup: StatisticCondition,
    /// Ignition event (`T_Ignition`), a difference check
    pub ignition: DifferenceCondition,
    pub rundown_ng: Option<DualThresholdCondition>,
    pub rundown_np: Option<DualThresholdCondition>,
}

// ============================================================================
// Cycle Record
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    RampingUp,
    RampingDown,
    Emit,
}

impl std::fmt::Display for DetectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorState::Idle => write!(f, "IDLE"),
            DetectorState::RampingUp => write!(f, "RAMPING_UP"),
            DetectorState::RampingDown => write!(f, "RAMPING_DOWN"),
            DetectorState::Emit => write!(f, "EMIT"),
        }
    }
}

/// Named event timestamps of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleEvent {
    Start,
    Baseline,
    Ignition,
    NgT1,
    NgT2,
    NpT1,
    NpT2,
}

impl CycleEvent {
    pub fn label(&self) -> &'static str {
        match self {
            CycleEvent::Start => "T_Start",
            CycleEvent::Baseline => "T_Baseline",
            CycleEvent::Ignition => "T_Ignition",
            CycleEvent::NgT1 => "T_Ng_T1",
            CycleEvent::NgT2 => "T_Ng_T2",
            CycleEvent::NpT1 => "T_Np_T1",
            CycleEvent::NpT2 => "T_Np_T2",
        }
    }
}

/// In-flight cycle. Each field is set at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cycle {
    start: Option<f64>,
    baseline: Option<f64>,
    ignition: Option<f64>,
    ng_t1: Option<f64>,
    ng_t2: Option<f64>,
    np_t1: Option<f64>,
    np_t2: Option<f64>,
}

impl Cycle {
    fn slot(&mut self, event: CycleEvent) -> &mut Option<f64> {
        match event {
            CycleEvent::Start => &mut self.start,
            CycleEvent::Baseline => &mut self.baseline,
            CycleEvent::Ignition => &mut self.ignition,
            CycleEvent::NgT1 => &mut self.ng_t1,
            CycleEvent::NgT2 => &mut self.ng_t2,
            CycleEvent::NpT1 => &mut self.np_t1,
            CycleEvent::NpT2 => &mut self.np_t2,
        }
    }

    pub fn get(&self, event: CycleEvent) -> Option<f64> {
        match event {
            CycleEvent::Start => self.start,
            CycleEvent::Baseline => self.baseline,
            CycleEvent::Ignition => self.ignition,
            CycleEvent::NgT1 => self.ng_t1,
            CycleEvent::NgT2 => self.ng_t2,
            CycleEvent::NpT1 => self.np_t1,
            CycleEvent::NpT2 => self.np_t2,
        }
    }

    pub fn has(&self, event: CycleEvent) -> bool {
        self.get(event).is_some()
    }

    /// First write wins. Returns `true` if the event was newly recorded.
    pub fn record(&mut self, event: CycleEvent, timestamp: f64) -> bool {
        let slot = self.slot(event);
        if slot.is_some() {
            return false;
        }
        *slot = Some(timestamp);
        true
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn to_result(&self, sequence_number: u32) -> CycleResult {
        let span = |from: Option<f64>, to: Option<f64>| Some(to? - from?);
        CycleResult {
            sequence_number,
            time_base: self.baseline,
            startup_time: span(self.start, self.baseline),
            ignition_time: span(self.baseline, self.ignition),
            ng_rundown: span(self.ng_t1, self.ng_t2),
            np_rundown: span(self.np_t1, self.np_t2),
        }
    }
}

// ============================================================================
// Rundown Tracking
// ============================================================================

/// One rundown channel: arms on `>= high`, T1 on the next `< high`, T2 on `< low`.
#[derive(Debug, Clone)]
struct RundownTracker {
    condition: DualThresholdCondition,
    probe: ConditionProbe,
    armed: bool,
    t1: CycleEvent,
    t2: CycleEvent,
}

impl RundownTracker {
    fn new(condition: DualThresholdCondition, t1: CycleEvent, t2: CycleEvent) -> Self {
        Self {
            probe: ConditionProbe::new(condition.clone()),
            condition,
            armed: false,
            t1,
            t2,
        }
    }

    fn update(&mut self, sample: &Sample) {
        self.probe.update(sample);
    }

    fn reset(&mut self) {
        self.armed = false;
    }

    /// Record T1 on a downward crossing. Returns `true` if T1 was recorded now.
    fn observe_t1(&mut self, sample: &Sample, cycle: &mut Cycle) -> bool {
        if cycle.has(self.t1) {
            return false;
        }
        let Some(value) = self.probe.value(sample) else {
            return false;
        };
        if !self.armed {
            if !self.condition.is_below_high(value) {
                self.armed = true;
                debug!(channel = %self.condition.channel, value, "Rundown armed");
            }
            return false;
        }
        if self.condition.is_below_high(value) && cycle.record(self.t1, sample.timestamp) {
            info!(event = self.t1.label(), t = sample.timestamp, value, "Rundown T1");
            return true;
        }
        false
    }

    /// Record T2 the first time the statistic is below `threshold_low`.
    fn observe_t2(&mut self, sample: &Sample, cycle: &mut Cycle) {
        if cycle.has(self.t2) {
            return;
        }
        if let Some(value) = self.probe.value(sample) {
            if self.condition.is_below_low(value) && cycle.record(self.t2, sample.timestamp) {
                info!(event = self.t2.label(), t = sample.timestamp, value, "Rundown T2");
            }
        }
    }

    fn t2_recorded(&self, cycle: &Cycle) -> bool {
        cycle.has(self.t2)
    }
}

// ============================================================================
// Cycle Detector
// ============================================================================

/// Single-pass cycle detector. One instance per run.
#[derive(Debug, Clone)]
pub struct CycleDetector {
    state: DetectorState,
    startup: ConditionProbe,
    startup_was_met: bool,
    time_base: ConditionProbe,
    ignition: ConditionProbe,
    rundown_ng: Option<RundownTracker>,
    rundown_np: Option<RundownTracker>,
    cycle: Cycle,
    sequence: u32,
    results: Vec<CycleResult>,
}

impl CycleDetector {
    pub fn new(config: &CycleConfig) -> Self {
        info!(
            startup_channel = %config.startup.channel,
            ng_rundown = config.rundown_ng.is_some(),
            np_rundown = config.rundown_np.is_some(),
            "Cycle detector initialised"
        );
        Self {
            state: DetectorState::Idle,
            startup: ConditionProbe::covered(config.startup.clone()),
            startup_was_met: false,
            time_base: ConditionProbe::new(config.time_base.clone()),
            ignition: ConditionProbe::new(config.ignition.clone()),
            rundown_ng: config
                .rundown_ng
                .clone()
                .map(|c| RundownTracker::new(c, CycleEvent::NgT1, CycleEvent::NgT2)),
            rundown_np: config
                .rundown_np
                .clone()
                .map(|c| RundownTracker::new(c, CycleEvent::NpT1, CycleEvent::NpT2)),
            cycle: Cycle::default(),
            sequence: 0,
            results: Vec::new(),
        }
    }

    /// Fresh detector, full pass, end-of-stream policy applied.
    pub fn run(config: &CycleConfig, samples: &[Sample]) -> Vec<CycleResult> {
        let mut detector = Self::new(config);
        info!(samples = samples.len(), "Cycle detection started");
        for sample in samples {
            detector.process(sample);
        }
        detector.finish()
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn current_cycle(&self) -> &Cycle {
        &self.cycle
    }

    pub fn results(&self) -> &[CycleResult] {
        &self.results
    }

    /// Advance the state machine by one tick.
    pub fn process(&mut self, sample: &Sample) {
        self.update_probes(sample);
        let startup_met = self.startup.is_met(sample);
        let startup_rose = startup_met && !self.startup_was_met;
        self.startup_was_met = startup_met;

        match self.state {
            DetectorState::Idle => self.try_open(sample, startup_rose),
            DetectorState::RampingUp => {
                self.record_ramp_events(sample);
                if self.observe_t1(sample) {
                    info!(t = sample.timestamp, "RAMPING_UP -> RAMPING_DOWN");
                    self.state = DetectorState::RampingDown;
                    self.ramp_down(sample);
                }
            }
            DetectorState::RampingDown => {
                self.record_ramp_events(sample);
                self.ramp_down(sample);
            }
            DetectorState::Emit => {}
        }

        if self.state == DetectorState::Emit {
            self.emit();
            self.try_open(sample, startup_rose);
        }
    }

    /// End-of-stream policy: emit a partial cycle only if every configured
    /// T2 event was recorded, otherwise drop it.
    pub fn finish(mut self) -> Vec<CycleResult> {
        let mid_cycle = matches!(
            self.state,
            DetectorState::RampingUp | DetectorState::RampingDown
        );
        if mid_cycle && !self.cycle.is_empty() {
            if self.all_t2_recorded() {
                warn!(state = %self.state, "Stream ended mid-cycle, emitting final cycle");
                self.emit();
            } else {
                warn!(state = %self.state, "Stream ended before rundown completed, cycle dropped");
            }
        }
        info!(cycles = self.results.len(), "Cycle detection complete");
        self.results
    }

    fn update_probes(&mut self, sample: &Sample) {
        self.startup.update(sample);
        self.time_base.update(sample);
        self.ignition.update(sample);
        if let Some(tracker) = self.rundown_ng.as_mut() {
            tracker.update(sample);
        }
        if let Some(tracker) = self.rundown_np.as_mut() {
            tracker.update(sample);
        }
    }

    fn try_open(&mut self, sample: &Sample, startup_rose: bool) {
        if !startup_rose {
            return;
        }
        self.cycle.record(CycleEvent::Start, sample.timestamp);
        self.state = DetectorState::RampingUp;
        info!(t = sample.timestamp, cycle = self.sequence + 1, "IDLE -> RAMPING_UP");
    }

    /// Baseline and ignition, valid in both ramp states.
    fn record_ramp_events(&mut self, sample: &Sample) {
        if !self.cycle.has(CycleEvent::Baseline)
            && self.time_base.is_met(sample)
            && self.cycle.record(CycleEvent::Baseline, sample.timestamp)
        {
            info!(t = sample.timestamp, state = %self.state, "T_Baseline");
        }
        if !self.cycle.has(CycleEvent::Ignition)
            && self.ignition.is_met(sample)
            && self.cycle.record(CycleEvent::Ignition, sample.timestamp)
        {
            info!(t = sample.timestamp, state = %self.state, "T_Ignition");
        }
    }

    fn observe_t1(&mut self, sample: &Sample) -> bool {
        let ng = self
            .rundown_ng
            .as_mut()
            .is_some_and(|r| r.observe_t1(sample, &mut self.cycle));
        let np = self
            .rundown_np
            .as_mut()
            .is_some_and(|r| r.observe_t1(sample, &mut self.cycle));
        ng || np
    }

    fn ramp_down(&mut self, sample: &Sample) {
        self.observe_t1(sample);
        if let Some(tracker) = self.rundown_ng.as_mut() {
            tracker.observe_t2(sample, &mut self.cycle);
        }
        if let Some(tracker) = self.rundown_np.as_mut() {
            tracker.observe_t2(sample, &mut self.cycle);
        }
        if self.all_t2_recorded() {
            debug!(t = sample.timestamp, "RAMPING_DOWN -> EMIT");
            self.state = DetectorState::Emit;
        }
    }

    fn all_t2_recorded(&self) -> bool {
        let ng = self
            .rundown_ng
            .as_ref()
            .map_or(true, |r| r.t2_recorded(&self.cycle));
        let np = self
            .rundown_np
            .as_ref()
            .map_or(true, |r| r.t2_recorded(&self.cycle));
        ng && np
    }

    fn emit(&mut self) {
        self.sequence += 1;
        let row = self.cycle.to_result(self.sequence);
        info!(
            cycle = row.sequence_number,
            time_base = ?row.time_base,
            startup_time = ?row.startup_time,
            ignition_time = ?row.ignition_time,
            ng_rundown = ?row.ng_rundown,
            np_rundown = ?row.np_rundown,
            "Cycle completed"
        );
        self.results.push(row);
        self.cycle = Cycle::default();
        if let Some(tracker) = self.rundown_ng.as_mut() {
            tracker.reset();
        }
        if let Some(tracker) = self.rundown_np.as_mut() {
            tracker.reset();
        }
        self.state = DetectorState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Comparison;
    use crate::window::Statistic;

    fn instant(channel: &str, comparison: Comparison, threshold: f64) -> StatisticCondition {
        StatisticCondition {
            channel: channel.to_string(),
            statistic: Statistic::Instant,
            duration: 1.0,
            comparison,
            threshold,
        }
    }

    fn rundown(channel: &str, high: f64, low: f64) -> DualThresholdCondition {
        DualThresholdCondition {
            channel: channel.to_string(),
            statistic: Statistic::Instant,
            duration: 1.0,
            threshold_high: high,
            threshold_low: low,
        }
    }

    /// Startup at Ng > 500, baseline at Ng > 7000, ignition on a 50-degree
    /// T45 jump within 2 s, Ng rundown 8000 / 2000.
    fn config() -> CycleConfig {
        CycleConfig {
            time_base: instant("Ng", Comparison::Greater, 7000.0),
            startup: instant("Ng", Comparison::Greater, 500.0),
            ignition: DifferenceCondition {
                channel: "T45".to_string(),
                duration: 2.0,
                comparison: Comparison::Greater,
                threshold: 50.0,
            },
            rundown_ng: Some(rundown("Ng", 8000.0, 2000.0)),
            rundown_np: None,
        }
    }

    fn tick(t: f64, ng: f64, t45: f64) -> Sample {
        Sample::new(t).with("Ng", ng).with("T45", t45)
    }

    fn tick_np(t: f64, ng: f64, np: f64) -> Sample {
        tick(t, ng, 300.0).with("Np", np)
    }

    #[test]
    fn test_cycle_record_is_write_once() {
        let mut cycle = Cycle::default();
        assert!(cycle.is_empty());
        assert!(cycle.record(CycleEvent::Baseline, 3.0));
        assert!(!cycle.record(CycleEvent::Baseline, 4.0));
        assert_eq!(cycle.get(CycleEvent::Baseline), Some(3.0));
        assert!(!cycle.is_empty());
    }

    #[test]
    fn test_to_result_leaves_missing_pairs_absent() {
        let mut cycle = Cycle::default();
        cycle.record(CycleEvent::Start, 1.0);
        cycle.record(CycleEvent::Baseline, 6.0);
        cycle.record(CycleEvent::NgT1, 20.0);
        let row = cycle.to_result(1);
        assert_eq!(row.time_base, Some(6.0));
        assert_eq!(row.startup_time, Some(5.0));
        assert_eq!(row.ignition_time, None);
        assert_eq!(row.ng_rundown, None);
    }

    #[test]
    fn test_full_cycle_state_walk() {
        let mut detector = CycleDetector::new(&config());
        assert_eq!(detector.state(), DetectorState::Idle);

        detector.process(&tick(0.0, 0.0, 300.0));
        assert_eq!(detector.state(), DetectorState::Idle);

        detector.process(&tick(1.0, 600.0, 300.0));
        assert_eq!(detector.state(), DetectorState::RampingUp);
        assert_eq!(detector.current_cycle().get(CycleEvent::Start), Some(1.0));

        detector.process(&tick(2.0, 3000.0, 300.0));
        detector.process(&tick(4.0, 7500.0, 300.0)); // baseline
        detector.process(&tick(5.0, 8500.0, 300.0)); // arms rundown
        detector.process(&tick(6.0, 9000.0, 400.0)); // T45 +100 over (4,6]
        assert_eq!(detector.state(), DetectorState::RampingUp);
        assert_eq!(detector.current_cycle().get(CycleEvent::Ignition), Some(6.0));

        detector.process(&tick(10.0, 7900.0, 400.0)); // T1
        assert_eq!(detector.state(), DetectorState::RampingDown);

        detector.process(&tick(30.0, 1500.0, 400.0)); // T2, emit
        assert_eq!(detector.state(), DetectorState::Idle);

        // startup still held on the tail: no new cycle until it rises again
        detector.process(&tick(31.0, 1000.0, 400.0));
        assert_eq!(detector.state(), DetectorState::Idle);
        detector.process(&tick(32.0, 0.0, 300.0));
        detector.process(&tick(33.0, 600.0, 300.0));
        assert_eq!(detector.state(), DetectorState::RampingUp);
        assert_eq!(detector.current_cycle().get(CycleEvent::Start), Some(33.0));

        // the reopened cycle never finishes its rundown and is dropped
        let results = detector.finish();
        assert_eq!(results.len(), 1);
        let row = &results[0];
        assert_eq!(row.sequence_number, 1);
        assert_eq!(row.time_base, Some(4.0));
        assert_eq!(row.startup_time, Some(3.0));
        assert_eq!(row.ignition_time, Some(2.0));
        assert_eq!(row.ng_rundown, Some(20.0));
    }

    #[test]
    fn test_ramp_up_below_high_does_not_trigger_t1() {
        let mut detector = CycleDetector::new(&config());
        for (t, ng) in [(0.0, 600.0), (1.0, 1000.0), (2.0, 4000.0), (3.0, 7000.0)] {
            detector.process(&tick(t, ng, 300.0));
        }
        // Ng never reached 8000, so no rundown has started
        assert_eq!(detector.state(), DetectorState::RampingUp);
        assert_eq!(detector.current_cycle().get(CycleEvent::NgT1), None);
    }

    #[test]
    fn test_incomplete_cycle_is_dropped() {
        let samples = vec![
            tick(0.0, 600.0, 300.0),
            tick(1.0, 9000.0, 300.0),
            tick(2.0, 7000.0, 300.0), // T1 only
        ];
        assert!(CycleDetector::run(&config(), &samples).is_empty());
    }

    #[test]
    fn test_no_rundown_configured_emits_at_stream_end() {
        let mut cfg = config();
        cfg.rundown_ng = None;
        let samples = vec![
            tick(0.0, 600.0, 300.0),
            tick(1.0, 7500.0, 300.0),
            tick(2.0, 8000.0, 300.0),
        ];
        let results = CycleDetector::run(&cfg, &samples);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].startup_time, Some(1.0));
        assert_eq!(results[0].ng_rundown, None);
    }

    #[test]
    fn test_sudden_drop_records_t1_and_t2_together() {
        let samples = vec![
            tick(0.0, 600.0, 300.0),
            tick(1.0, 9000.0, 300.0),
            tick(2.0, 100.0, 300.0),
        ];
        let results = CycleDetector::run(&config(), &samples);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ng_rundown, Some(0.0));
    }

    #[test]
    fn test_startup_held_after_rundown_does_not_reopen() {
        // startup (> 500) stays true through the 1500 tail after the first rundown
        let ngs = [
            0.0, 600.0, 7500.0, 9000.0, 1500.0, 1500.0, 1500.0,
            0.0, 600.0, 7500.0, 9000.0, 1500.0,
        ];
        let samples: Vec<Sample> = ngs
            .iter()
            .zip(0..)
            .map(|(&ng, i)| tick(f64::from(i), ng, 300.0))
            .collect();
        let results = CycleDetector::run(&config(), &samples);

        let rows: Vec<_> = results
            .iter()
            .map(|r| (r.sequence_number, r.time_base, r.startup_time, r.ng_rundown))
            .collect();
        assert_eq!(
            rows,
            vec![
                (1, Some(2.0), Some(1.0), Some(0.0)),
                (2, Some(9.0), Some(1.0), Some(0.0)),
            ]
        );
    }

    #[test]
    fn test_emit_tick_opens_next_cycle_on_startup_edge() {
        let mut cfg = config();
        cfg.startup = instant("Cmd", Comparison::Greater, 0.5);
        let mut detector = CycleDetector::new(&cfg);
        for (t, ng, cmd) in [
            (0.0, 600.0, 1.0),
            (1.0, 9000.0, 1.0),
            (2.0, 5000.0, 0.0), // T1
            (3.0, 1000.0, 1.0), // T2 and a fresh startup edge
        ] {
            detector.process(&tick(t, ng, 300.0).with("Cmd", cmd));
        }
        assert_eq!(detector.results().len(), 1);
        assert_eq!(detector.results()[0].ng_rundown, Some(1.0));
        assert_eq!(detector.state(), DetectorState::RampingUp);
        assert_eq!(detector.current_cycle().get(CycleEvent::Start), Some(3.0));
    }

    #[test]
    fn test_unarmed_rundown_channel_still_closes_cycle() {
        let mut cfg = config();
        cfg.rundown_np = Some(rundown("Np", 8000.0, 2000.0));
        let samples = vec![
            tick_np(0.0, 0.0, 0.0),
            tick_np(1.0, 1000.0, 500.0), // start
            tick_np(2.0, 7500.0, 3000.0), // baseline
            tick_np(3.0, 9000.0, 7000.0), // Ng armed, Np peaks below high
            tick_np(4.0, 7000.0, 6000.0), // Ng T1
            tick_np(5.0, 1000.0, 100.0),  // Ng T2, Np T2 without T1
            tick_np(6.0, 0.0, 0.0),
            tick_np(7.0, 1000.0, 500.0),
            tick_np(8.0, 7500.0, 3000.0),
            tick_np(9.0, 9000.0, 9000.0),
            tick_np(10.0, 7000.0, 7000.0),
            tick_np(11.0, 1000.0, 1000.0),
        ];
        let results = CycleDetector::run(&cfg, &samples);
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.sequence_number, 1);
        assert_eq!(first.time_base, Some(2.0));
        assert_eq!(first.startup_time, Some(1.0));
        assert_eq!(first.ignition_time, None);
        assert_eq!(first.ng_rundown, Some(1.0));
        assert_eq!(first.np_rundown, None);

        let second = &results[1];
        assert_eq!(second.sequence_number, 2);
        assert_eq!(second.time_base, Some(8.0));
        assert_eq!(second.startup_time, Some(1.0));
        assert_eq!(second.ng_rundown, Some(1.0));
        assert_eq!(second.np_rundown, Some(1.0));
    }
}
