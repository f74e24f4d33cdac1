use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::Deserialize;

use super::{KernelState, Mode, Pid, ProcessState};
use crate::error::{KernelError, Result};

pub const DEFAULT_QUANTUM: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SchedulingAlgorithm {
    #[serde(rename = "rr", alias = "round_robin")]
    RoundRobin,
    #[serde(rename = "fcfs")]
    FirstComeFirstServed,
}

impl FromStr for SchedulingAlgorithm {
    type Err = KernelError;

    fn from_str(name: &str) -> Result<SchedulingAlgorithm> {
        match name.to_lowercase().as_str() {
            "rr" | "round_robin" => Ok(SchedulingAlgorithm::RoundRobin),
            "fcfs" => Ok(SchedulingAlgorithm::FirstComeFirstServed),
            _ => Err(KernelError::InvalidPolicy(name.to_string())),
        }
    }
}

impl fmt::Display for SchedulingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingAlgorithm::RoundRobin => f.write_str("rr"),
            SchedulingAlgorithm::FirstComeFirstServed => f.write_str("fcfs"),
        }
    }
}

/// Picks the process that owns the CPU. Both algorithms share one switch
/// path; first-come-first-served is round robin with an unbounded quantum.
pub(crate) struct ShortTermScheduler {
    scheduling_alg: SchedulingAlgorithm,
    quantum: u32,
    cycle_counter: u32,
}

impl ShortTermScheduler {
    pub fn new(scheduling_alg: SchedulingAlgorithm, quantum: u32) -> Result<ShortTermScheduler> {
        let mut sts = ShortTermScheduler {
            scheduling_alg,
            quantum: DEFAULT_QUANTUM,
            cycle_counter: 0,
        };
        sts.set_quantum(quantum)?;

        Ok(sts)
    }

    pub fn get_scheduling_alg(&self) -> SchedulingAlgorithm {
        self.scheduling_alg
    }

    pub fn set_scheduling_alg(&mut self, scheduling_alg: SchedulingAlgorithm) {
        self.scheduling_alg = scheduling_alg;
    }

    pub fn get_quantum(&self) -> u32 {
        self.quantum
    }

    pub fn set_quantum(&mut self, quantum: u32) -> Result<()> {
        if quantum == 0 {
            return Err(KernelError::InvalidQuantum);
        }

        self.quantum = quantum;
        Ok(())
    }

    pub fn get_cycle_counter(&self) -> u32 {
        self.cycle_counter
    }

    pub fn record_cycle(&mut self) {
        self.cycle_counter = self.cycle_counter.saturating_add(1);
    }

    fn effective_quantum(&self) -> Option<u32> {
        match self.scheduling_alg {
            SchedulingAlgorithm::RoundRobin => Some(self.quantum),
            SchedulingAlgorithm::FirstComeFirstServed => None,
        }
    }

    pub fn start(&mut self, state: &mut KernelState) {
        if let Some(pcb) = state.ready_queue.dequeue() {
            debug!("starting pid {}", pcb.get_id());
            state.dispatch(pcb);
            self.cycle_counter = 0;
        }
    }

    /// Like `start`, but dispatches `pid` ahead of the queue head.
    pub fn start_with(&mut self, state: &mut KernelState, pid: Pid) -> Result<()> {
        let pcb = state.ready_queue.remove(pid).ok_or(KernelError::NoSuchProcess(pid))?;

        debug!("starting pid {}", pid);
        state.dispatch(pcb);
        self.cycle_counter = 0;

        Ok(())
    }

    pub fn needs_context_switch(&self, state: &KernelState) -> bool {
        match self.effective_quantum() {
            Some(quantum) => self.cycle_counter >= quantum,
            None => state.current_is_terminated(),
        }
    }

    pub fn context_switch(&mut self, state: &mut KernelState) {
        match state.ready_queue.dequeue() {
            Some(next) => {
                state.snapshot_current();

                if let Some(mut current) = state.current.take() {
                    debug!(
                        "switching pid {} -> pid {} after {} cycles ({})",
                        current.get_id(),
                        next.get_id(),
                        self.cycle_counter,
                        self.scheduling_alg
                    );

                    if current.is_terminated() {
                        state.retire(current);
                    } else {
                        current.state = ProcessState::Waiting;
                        state.ready_queue.enqueue(current);
                    }
                }

                state.dispatch(next);
            }
            None if state.current_is_terminated() => self.stop(state),
            None => {}
        }

        self.cycle_counter = 0;
    }

    /// Returns the CPU to the kernel once nothing is left to run.
    pub fn stop(&mut self, state: &mut KernelState) {
        debug!("no runnable processes, stopping the cpu");
        state.cpu.is_executing = false;
        state.mode = Mode::Kernel;

        if let Some(current) = state.current.take() {
            state.retire(current);
        }

        self.cycle_counter = 0;
    }
}
