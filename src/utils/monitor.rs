use std::sync::Mutex;
use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub phase: String,
    pub phase_elapsed: Duration,
    pub total_elapsed: Duration,
    pub memory_usage_mb: Option<u64>,
    pub peak_memory_mb: Option<u64>,
}

/// 記錄每個階段 (scrape / clean) 的耗時與記憶體
pub struct RunMonitor {
    enabled: bool,
    started: Instant,
    phase_started: Mutex<Instant>,
    #[cfg(feature = "cli")]
    process: Option<(Mutex<System>, Pid)>,
    peak_memory: Mutex<u64>,
}

impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        #[cfg(feature = "cli")]
        let process = if enabled {
            sysinfo::get_current_pid().ok().map(|pid| {
                let mut system = System::new_with_specifics(RefreshKind::everything());
                system.refresh_all();
                (Mutex::new(system), pid)
            })
        } else {
            None
        };

        Self {
            enabled,
            started: Instant::now(),
            phase_started: Mutex::new(Instant::now()),
            #[cfg(feature = "cli")]
            process,
            peak_memory: Mutex::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start_phase(&self, phase: &str) {
        if let Ok(mut started) = self.phase_started.lock() {
            *started = Instant::now();
        }
        if self.enabled {
            tracing::debug!("⏱️ Phase '{}' started", phase);
        }
    }

    #[cfg(feature = "cli")]
    fn memory_mb(&self) -> Option<u64> {
        let (system, pid) = self.process.as_ref()?;
        let mut system = system.lock().ok()?;
        system.refresh_all();
        let process = system.process(*pid)?;
        Some(process.memory() / 1024 / 1024)
    }

    #[cfg(not(feature = "cli"))]
    fn memory_mb(&self) -> Option<u64> {
        None
    }

    pub fn finish_phase(&self, phase: &str) -> Option<PhaseStats> {
        if !self.enabled {
            return None;
        }

        let phase_elapsed = self
            .phase_started
            .lock()
            .map(|started| started.elapsed())
            .unwrap_or_default();

        let memory_usage_mb = self.memory_mb();
        let peak_memory_mb = match (memory_usage_mb, self.peak_memory.lock()) {
            (Some(current), Ok(mut peak)) => {
                if current > *peak {
                    *peak = current;
                }
                Some(*peak)
            }
            _ => None,
        };

        let stats = PhaseStats {
            phase: phase.to_string(),
            phase_elapsed,
            total_elapsed: self.started.elapsed(),
            memory_usage_mb,
            peak_memory_mb,
        };

        match (stats.memory_usage_mb, stats.peak_memory_mb) {
            (Some(memory), Some(peak)) => tracing::info!(
                "📊 {} - Time: {:?}, Memory: {}MB, Peak: {}MB",
                stats.phase,
                stats.phase_elapsed,
                memory,
                peak
            ),
            _ => tracing::info!("📊 {} - Time: {:?}", stats.phase, stats.phase_elapsed),
        }

        Some(stats)
    }

    pub fn log_final_stats(&self) {
        if self.enabled {
            tracing::info!("📊 Final Stats - Total Time: {:?}", self.started.elapsed());
        }
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
