use std::collections::BTreeMap;

use log::info;

use crate::error::SimulationError;
use crate::forwarding::{self, Delivery, Message};
use crate::network::{ChangeEvent, ChangeSchedule, Topology};
use crate::protocol::{RoutingEngine, RoutingTable};
use crate::report::{RunReport, TableSnapshot};
use crate::NodeId;

pub const DEFAULT_MAX_ROUNDS: u32 = 1_000;

/// Owns the simulation clock and wires the pieces together: scheduled
/// changes mutate the topology only at round boundaries, the engine steps
/// once per round against an immutable topology view, and messages are
/// routed against whatever tables the engine holds at their round.
pub struct Simulation<E: RoutingEngine> {
    topology: Topology,
    schedule: ChangeSchedule,
    engine: E,
    round: u32,
    max_rounds: u32,
}

impl<E: RoutingEngine> Simulation<E> {
    pub fn new(topology: Topology, engine: E) -> Self {
        Self::with_schedule(topology, ChangeSchedule::empty(), engine)
    }

    pub fn with_schedule(topology: Topology, schedule: ChangeSchedule, engine: E) -> Self {
        Self {
            topology,
            schedule,
            engine,
            round: 0,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn set_max_rounds(&mut self, max_rounds: u32) {
        self.max_rounds = max_rounds;
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn tables(&self) -> &BTreeMap<NodeId, RoutingTable> {
        self.engine.tables()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            round: self.round,
            tables: self.engine.tables().clone(),
        }
    }

    /// One full round: due changes, then the engine's compute/publish step.
    fn step_round(&mut self) -> Result<bool, SimulationError> {
        if self.schedule.apply_due(self.round, &mut self.topology)? > 0 {
            self.engine.topology_changed(&self.topology);
        }
        let changed = self.engine.step(&self.topology);
        self.round += 1;
        Ok(changed)
    }

    /// Steps until a round leaves every node unchanged. Returns the number
    /// of rounds taken; exceeding the bound is a fatal `NonConvergence`.
    pub fn converge(&mut self) -> Result<u32, SimulationError> {
        let mut elapsed = 0;
        loop {
            let changed = self.step_round()?;
            elapsed += 1;
            if !changed {
                info!(
                    "{} stable at round {} after {elapsed} rounds",
                    self.engine.name(),
                    self.round
                );
                return Ok(elapsed);
            }
            if elapsed >= self.max_rounds {
                return Err(SimulationError::NonConvergence { rounds: elapsed });
            }
        }
    }

    /// Applies one unscheduled change immediately, between rounds.
    pub fn apply_change(&mut self, event: &ChangeEvent) -> Result<(), SimulationError> {
        event.apply(&mut self.topology)?;
        self.engine.topology_changed(&self.topology);
        Ok(())
    }

    /// Routes a message against the tables currently held by the engine.
    pub fn route(&self, message: &Message) -> Delivery {
        forwarding::route(message, self.engine.tables(), self.topology.node_count())
    }

    /// Drives a fully scripted scenario: every scheduled change is applied
    /// at its round, every message is routed at its round, and the run ends
    /// once the schedule is drained, all messages are routed, and the engine
    /// is stable. Tables are snapshotted at each convergence point.
    pub fn run(&mut self, messages: &[Message]) -> Result<RunReport, SimulationError> {
        let last_message_round = messages.iter().map(|m| m.round).max();
        let mut deliveries = Vec::new();
        let mut snapshots = Vec::new();
        let mut was_changed = true;
        let mut unstable_streak = 0u32;

        loop {
            let current = self.round;
            let changed = self.step_round()?;

            for message in messages.iter().filter(|m| m.round == current) {
                deliveries.push(self.route(message));
            }

            if changed {
                unstable_streak += 1;
                if unstable_streak >= self.max_rounds {
                    return Err(SimulationError::NonConvergence {
                        rounds: unstable_streak,
                    });
                }
            } else {
                if was_changed {
                    snapshots.push(TableSnapshot {
                        round: current,
                        tables: self.engine.tables().clone(),
                    });
                }
                unstable_streak = 0;
            }
            was_changed = changed;

            let work_left = changed
                || !self.schedule.is_drained()
                || last_message_round.is_some_and(|r| r >= self.round);
            if !work_left {
                break;
            }
        }

        Ok(RunReport {
            rounds: self.round,
            snapshots,
            deliveries,
        })
    }
}
