//! Host and process statistics gathered with `sysinfo`.

use super::collector::RuntimeSource;
use crate::domain::Metric;
use rand::Rng;
use sysinfo::{Pid, Process, ProcessesToUpdate, System};

type HostReading = fn(&System) -> f64;
type ProcessReading = fn(&Process) -> f64;

/// Host-wide gauges, in report order.
const HOST_GAUGES: &[(&str, HostReading)] = &[
    ("TotalMemory", |s: &System| s.total_memory() as f64),
    ("FreeMemory", |s: &System| s.free_memory() as f64),
    ("UsedMemory", |s: &System| s.used_memory() as f64),
    ("TotalSwap", |s: &System| s.total_swap() as f64),
    ("UsedSwap", |s: &System| s.used_swap() as f64),
    ("CPUutilization", |s: &System| f64::from(s.global_cpu_usage())),
];

/// Gauges about the agent process itself.
const PROCESS_GAUGES: &[(&str, ProcessReading)] = &[
    ("ProcessResidentMemory", |p: &Process| p.memory() as f64),
    ("ProcessVirtualMemory", |p: &Process| p.virtual_memory() as f64),
    ("ProcessCPUUsage", |p: &Process| f64::from(p.cpu_usage())),
];

/// Runtime source backed by the local host.
///
/// Emits every entry of the static gauge tables, one `CPUutilization{N}`
/// gauge per core (1-based), and a `RandomValue` gauge.
pub struct SystemSource {
    // ---
    system: System,
    pid: Option<Pid>,
}

impl SystemSource {
    // ---
    pub fn new() -> Self {
        // ---
        let pid = sysinfo::get_current_pid()
            .map_err(|err| tracing::warn!("Process statistics unavailable: {err}"))
            .ok();

        Self {
            system: System::new(),
            pid,
        }
    }

    fn refresh(&mut self) {
        // ---
        self.system.refresh_memory();
        self.system.refresh_cpu_usage();
        if let Some(pid) = self.pid {
            self.system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        }
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeSource for SystemSource {
    fn collect(&mut self) -> Vec<Metric> {
        // ---
        self.refresh();

        let mut metrics: Vec<Metric> = HOST_GAUGES
            .iter()
            .map(|(name, read)| Metric::gauge(*name, read(&self.system)))
            .collect();

        metrics.extend(
            self.system
                .cpus()
                .iter()
                .enumerate()
                .map(|(i, cpu)| Metric::gauge(format!("CPUutilization{}", i + 1), f64::from(cpu.cpu_usage()))),
        );

        if let Some(process) = self.pid.and_then(|pid| self.system.process(pid)) {
            metrics.extend(
                PROCESS_GAUGES
                    .iter()
                    .map(|(name, read)| Metric::gauge(*name, read(process))),
            );
        }

        metrics.push(Metric::gauge("RandomValue", rand::thread_rng().gen::<f64>()));
        metrics
    }
}
