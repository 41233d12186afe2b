//! Process self-metrics for the admin stats endpoint, read from /proc.
//!
//! Best-effort: a field that cannot be read reports zero rather than
//! failing the endpoint.

/// Kernel USER_HZ — fixed at 100 on every supported target.
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

#[derive(Debug, Default)]
pub struct ProcStats {
    pub rss_kb: u64,
    pub vsize_kb: u64,
    pub threads: u64,
    pub cpu_seconds: f64,
}

pub fn read_self_stats() -> ProcStats {
    let mut stats = ProcStats::default();

    if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                stats.rss_kb = parse_kb(rest);
            } else if let Some(rest) = line.strip_prefix("VmSize:") {
                stats.vsize_kb = parse_kb(rest);
            } else if let Some(rest) = line.strip_prefix("Threads:") {
                stats.threads = rest.trim().parse().unwrap_or(0);
            }
        }
    }

    if let Ok(stat) = std::fs::read_to_string("/proc/self/stat") {
        stats.cpu_seconds = parse_cpu_seconds(&stat);
    }

    stats
}

fn parse_kb(rest: &str) -> u64 {
    rest.trim()
        .trim_end_matches(" kB")
        .trim()
        .parse()
        .unwrap_or(0)
}

/// Fields 14 (utime) and 15 (stime) of /proc/self/stat, counted after the
/// parenthesised comm field, which may itself contain spaces.
fn parse_cpu_seconds(stat: &str) -> f64 {
    let Some(after_comm) = stat.rsplit_once(')').map(|(_, rest)| rest) else {
        return 0.0;
    };
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // after_comm starts at field 3 (state), so utime/stime are at 11/12.
    let utime: f64 = fields.get(11).and_then(|v| v.parse().ok()).unwrap_or(0.0);
    let stime: f64 = fields.get(12).and_then(|v| v.parse().ok()).unwrap_or(0.0);
    (utime + stime) / CLOCK_TICKS_PER_SEC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_own_process() {
        let stats = read_self_stats();
        // The test binary certainly maps some memory and has a thread.
        assert!(stats.rss_kb > 0);
        assert!(stats.threads > 0);
    }

    #[test]
    fn cpu_parse_handles_spaced_comm() {
        let line = "1234 (weird name) S 1 1234 1234 0 -1 4194560 100 0 0 0 250 50 0 0 20 0 4 0 100";
        let secs = parse_cpu_seconds(line);
        assert!((secs - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn kb_parse() {
        assert_eq!(parse_kb("   123456 kB"), 123456);
        assert_eq!(parse_kb("garbage"), 0);
    }
}
