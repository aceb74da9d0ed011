//! Digital twin of the battery production line.
//!
//! A `DigitalTwin` is plain data: the run/pause flag, daily counters and
//! one `ProcessStage` per line stage. `step` advances it by one tick using
//! an injected `Rng`, so the model is deterministic under a seeded
//! generator. `spawn_twin` drives a shared twin on a fixed period.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Default twin tick period.
pub const TWIN_PERIOD: Duration = Duration::from_secs(2);

/// Efficiency restored by `reset`.
pub const BASELINE_EFFICIENCY: f64 = 88.5;

/// Line efficiency never leaves this band.
pub const EFFICIENCY_RANGE: RangeInclusive<f64> = 80.0..=95.0;

pub const MAX_PROGRESS: f64 = 100.0;

pub type SharedTwin = Arc<RwLock<DigitalTwin>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Active,
    Idle,
    Maintenance,
    Error,
}

impl ProcessStatus {
    /// Stages under maintenance or in error do not move.
    pub fn is_frozen(&self) -> bool {
        matches!(self, ProcessStatus::Maintenance | ProcessStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStage {
    pub id: String,
    pub name: String,
    pub status: ProcessStatus,
    /// Percent complete, capped at 100.
    pub progress: f64,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Kilowatts.
    pub power_consumption: f64,
    /// Units per hour, never negative.
    pub throughput: f64,
    pub material_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub is_running: bool,
    pub speed: f64,
    pub total_materials: u32,
    pub processed_today: u32,
    pub efficiency: f64,
    /// Ticks applied since start; paused ticks are not counted.
    pub ticks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalTwin {
    pub simulation: SimulationState,
    pub stages: Vec<ProcessStage>,
}

impl Default for DigitalTwin {
    fn default() -> Self {
        let stage = |id: &str,
                     name: &str,
                     status: ProcessStatus,
                     progress: f64,
                     temperature: f64,
                     power_consumption: f64,
                     throughput: f64,
                     material_count: u32| ProcessStage {
            id: id.to_string(),
            name: name.to_string(),
            status,
            progress,
            temperature,
            power_consumption,
            throughput,
            material_count,
        };

        Self {
            simulation: SimulationState {
                is_running: true,
                speed: 1.0,
                total_materials: 1247,
                processed_today: 856,
                efficiency: BASELINE_EFFICIENCY,
                ticks: 0,
            },
            stages: vec![
                stage("raw-intake", "Raw Material Intake", ProcessStatus::Active, 75.0, 22.0, 45.0, 120.0, 542),
                stage("processing", "Material Processing", ProcessStatus::Active, 92.0, 85.0, 180.0, 95.0, 318),
                stage("quality-check", "Quality Verification", ProcessStatus::Maintenance, 45.0, 25.0, 30.0, 0.0, 89),
                stage("assembly", "Battery Assembly", ProcessStatus::Active, 88.0, 32.0, 220.0, 85.0, 156),
                stage("packaging", "Final Packaging", ProcessStatus::Active, 95.0, 24.0, 65.0, 110.0, 73),
            ],
        }
    }
}

impl DigitalTwin {
    /// Advance one tick. A paused twin is left untouched; returns whether
    /// the tick was applied.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if !self.simulation.is_running {
            return false;
        }

        for stage in self.stages.iter_mut().filter(|s| !s.status.is_frozen()) {
            stage.progress = (stage.progress + rng.gen_range(0.0..2.0)).min(MAX_PROGRESS);
            stage.temperature += jitter(rng, 2.0);
            stage.power_consumption = (stage.power_consumption + jitter(rng, 10.0)).max(0.0);
            stage.throughput = (stage.throughput + jitter(rng, 5.0)).max(0.0);
        }

        let sim = &mut self.simulation;
        sim.processed_today = sim.processed_today.saturating_add(rng.gen_range(0..3));
        sim.efficiency = (sim.efficiency + jitter(rng, 1.0))
            .clamp(*EFFICIENCY_RANGE.start(), *EFFICIENCY_RANGE.end());
        sim.ticks += 1;
        true
    }

    /// Flip between running and paused; returns the new running state.
    pub fn toggle(&mut self) -> bool {
        self.simulation.is_running = !self.simulation.is_running;
        self.simulation.is_running
    }

    /// Zero the daily counter and restore baseline efficiency. Stages and
    /// the run flag are kept.
    pub fn reset(&mut self) {
        self.simulation.processed_today = 0;
        self.simulation.efficiency = BASELINE_EFFICIENCY;
    }

    pub fn stage(&self, id: &str) -> Option<&ProcessStage> {
        self.stages.iter().find(|s| s.id == id)
    }
}

/// Uniform draw in `[-width / 2, width / 2)`.
fn jitter<R: Rng + ?Sized>(rng: &mut R, width: f64) -> f64 {
    (rng.gen::<f64>() - 0.5) * width
}

/// Step `twin` every `period`, first tick one period from now. Abort the
/// returned handle to stop.
pub fn spawn_twin(twin: SharedTwin, period: Duration, mut rng: StdRng) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let mut state = twin.write().await;
            if state.step(&mut rng) {
                tracing::debug!(
                    "Twin tick {}: efficiency {:.1}%, processed today {}",
                    state.simulation.ticks,
                    state.simulation.efficiency,
                    state.simulation.processed_today
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[test]
    fn default_line_matches_initial_plant_state() {
        let twin = DigitalTwin::default();
        assert!(twin.simulation.is_running);
        assert_eq!(twin.stages.len(), 5);
        assert_eq!(twin.stage("quality-check").unwrap().status, ProcessStatus::Maintenance);
    }

    #[test]
    fn paused_twin_does_not_move() {
        let mut twin = DigitalTwin::default();
        assert!(!twin.toggle());
        let before = twin.clone();

        let mut rng = StdRng::seed_from_u64(1);
        assert!(!twin.step(&mut rng));
        assert_eq!(twin, before);

        assert!(twin.toggle());
        assert!(twin.step(&mut rng));
        assert_eq!(twin.simulation.ticks, 1);
    }

    #[test]
    fn reset_restores_counters_only() {
        let mut twin = DigitalTwin::default();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..10 {
            twin.step(&mut rng);
        }
        twin.toggle();
        let stages = twin.stages.clone();

        twin.reset();

        assert_eq!(twin.simulation.processed_today, 0);
        assert_eq!(twin.simulation.efficiency, BASELINE_EFFICIENCY);
        assert!(!twin.simulation.is_running);
        assert_eq!(twin.stages, stages);
    }

    #[test]
    fn same_seed_gives_same_trajectory() {
        let run = |seed| {
            let mut twin = DigitalTwin::default();
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..20 {
                twin.step(&mut rng);
            }
            twin
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(DigitalTwin::default()).unwrap();
        assert_eq!(json["simulation"]["isRunning"], true);
        assert_eq!(json["stages"][0]["powerConsumption"], 45.0);
        assert_eq!(json["stages"][2]["status"], "maintenance");
    }

    #[tokio::test(start_paused = true)]
    async fn driver_steps_once_per_period_until_aborted() {
        let twin: SharedTwin = Arc::new(RwLock::new(DigitalTwin::default()));
        let handle = spawn_twin(twin.clone(), TWIN_PERIOD, StdRng::seed_from_u64(5));

        time::sleep(Duration::from_secs(7)).await;
        assert_eq!(twin.read().await.simulation.ticks, 3);

        twin.write().await.toggle();
        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(twin.read().await.simulation.ticks, 3);

        twin.write().await.toggle();
        handle.abort();
        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(twin.read().await.simulation.ticks, 3);
    }

    proptest! {
        #[test]
        fn clamps_hold_over_any_run(seed in any::<u64>(), steps in 1usize..200) {
            let mut twin = DigitalTwin::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let frozen = twin.stage("quality-check").unwrap().clone();

            for _ in 0..steps {
                let before = twin.clone();
                prop_assert!(twin.step(&mut rng));

                let gained = twin.simulation.processed_today - before.simulation.processed_today;
                prop_assert!(gained <= 2);
                prop_assert!(EFFICIENCY_RANGE.contains(&twin.simulation.efficiency));

                for (old, new) in before.stages.iter().zip(&twin.stages) {
                    prop_assert!(new.progress <= MAX_PROGRESS);
                    prop_assert!(new.progress >= old.progress);
                    prop_assert!(new.throughput >= 0.0);
                    prop_assert!(new.power_consumption >= 0.0);
                }
            }

            prop_assert_eq!(twin.stage("quality-check").unwrap(), &frozen);
            prop_assert_eq!(twin.simulation.ticks, steps as u64);
        }

        #[test]
        fn error_stages_stay_frozen(seed in any::<u64>()) {
            let mut twin = DigitalTwin::default();
            twin.stages[0].status = ProcessStatus::Error;
            let frozen = twin.stages[0].clone();
            let mut rng = StdRng::seed_from_u64(seed);

            for _ in 0..50 {
                twin.step(&mut rng);
            }
            prop_assert_eq!(&twin.stages[0], &frozen);
        }
    }
}
