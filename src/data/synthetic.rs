//! Synthetic flow generation.
//!
//! Produces plausible flow records, with the same shape as live data, for
//! when the telemetry endpoints are unavailable. Content is random; shape
//! (counts, spacing, ranges, ordering) is fixed per pipeline.

use std::ops::RangeInclusive;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;

use super::model::{
    sort_recent_first, Flow, FlowPayload, FlowStatus, Insights, Pipeline, TokenUsage, ToolAction,
    ToolCall,
};

/// Model reported on synthetic flows.
const MODEL: &str = "us.anthropic.claude-3-5-haiku-20241022-v1:0";

const AGENT_REQUESTS: &[&str] = &[
    "Why are pods in the payments namespace restarting?",
    "Summarize cluster health",
    "Check node resource pressure",
    "Find failing deployments",
    "Investigate high latency on the ingress controller",
    "List pods stuck in Pending",
];

const SCOPES: &[(&str, Option<&str>)] = &[
    ("cluster", None),
    ("namespace", Some("default")),
    ("namespace", Some("kube-system")),
    ("namespace", Some("payments")),
    ("pod", Some("default")),
];

const COMMANDS: &[&str] = &[
    "kubectl get pods -A",
    "kubectl get events --sort-by=.lastTimestamp",
    "kubectl top nodes",
    "kubectl describe deployment api",
    "kubectl logs deploy/api --tail=100",
];

const FILES: &[&str] = &["/tmp/cluster-report.md", "/tmp/analysis/pods.json"];

/// Generation parameters for one pipeline.
#[derive(Debug, Clone)]
struct Profile {
    count: usize,
    step: Duration,
    max_jitter: Duration,
    duration: RangeInclusive<Duration>,
    failure_probability: f64,
    failure: FlowStatus,
}

fn profile(pipeline: Pipeline) -> Profile {
    match pipeline {
        Pipeline::Agent => Profile {
            count: 5,
            step: Duration::from_secs(60),
            max_jitter: Duration::from_secs(30),
            duration: Duration::from_secs(15)..=Duration::from_secs(60),
            failure_probability: 0.10,
            failure: FlowStatus::Error,
        },
        Pipeline::Monitor => Profile {
            count: 8,
            step: Duration::from_secs(180),
            max_jitter: Duration::from_secs(60),
            duration: Duration::from_secs(45)..=Duration::from_secs(120),
            failure_probability: 0.05,
            failure: FlowStatus::Timeout,
        },
    }
}

/// Number of flows generated for a pipeline.
pub fn flow_count(pipeline: Pipeline) -> usize {
    profile(pipeline).count
}

/// Range synthetic durations are drawn from.
pub fn duration_range(pipeline: Pipeline) -> RangeInclusive<Duration> {
    profile(pipeline).duration
}

/// Generate flows for a pipeline using the thread-local RNG.
pub fn generate_flows(pipeline: Pipeline, now: DateTime<Utc>) -> Vec<Flow> {
    generate_flows_with(pipeline, now, &mut rand::rng())
}

/// Generate flows for a pipeline with the given RNG.
///
/// The result is sorted most recent first, like live data.
pub fn generate_flows_with<R: Rng + ?Sized>(
    pipeline: Pipeline,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<Flow> {
    let profile = profile(pipeline);
    let first_cycle: u64 = rng.random_range(100..500);

    let mut flows: Vec<Flow> = (0..profile.count)
        .map(|i| {
            let duration = random_duration(rng, &profile.duration);
            let jitter = random_duration(rng, &(Duration::ZERO..=profile.max_jitter));
            let back = profile.step * i as u32 + jitter + duration;
            let start_time = now - to_chrono(back);
            let end_time = start_time + to_chrono(duration);

            let failed = rng.random_bool(profile.failure_probability);
            let status = if failed {
                profile.failure.clone()
            } else {
                FlowStatus::Completed
            };

            let (payload, tools, id) = match pipeline {
                Pipeline::Agent => (
                    agent_payload(rng),
                    agent_tools(rng),
                    format!("synthetic-agent-{}-{}", now.timestamp(), i),
                ),
                Pipeline::Monitor => {
                    // Newest flow carries the highest cycle number
                    let cycle = first_cycle + (profile.count - 1 - i) as u64;
                    (
                        monitor_payload(rng, cycle),
                        monitor_tools(rng),
                        format!("synthetic-monitor-cycle-{}", cycle),
                    )
                }
            };

            let error = match status {
                FlowStatus::Error => Some("Agent execution failed".to_string()),
                FlowStatus::Timeout => Some("Monitor cycle timeout".to_string()),
                _ => None,
            };

            Flow {
                id,
                status,
                start_time,
                end_time: Some(end_time),
                duration,
                trace_id: None,
                model: MODEL.to_string(),
                tokens: TokenUsage {
                    input: rng.random_range(800..4_000),
                    output: rng.random_range(200..1_500),
                },
                tools,
                error,
                payload,
            }
        })
        .collect();

    sort_recent_first(&mut flows);
    flows
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::zero())
}

fn random_duration<R: Rng + ?Sized>(rng: &mut R, range: &RangeInclusive<Duration>) -> Duration {
    let lo = range.start().as_millis() as u64;
    let hi = range.end().as_millis() as u64;
    Duration::from_millis(rng.random_range(lo..=hi))
}

fn agent_payload<R: Rng + ?Sized>(rng: &mut R) -> FlowPayload {
    let request = AGENT_REQUESTS.choose(rng).copied().unwrap_or_default();
    let (scope, namespace) = SCOPES.choose(rng).copied().unwrap_or(("cluster", None));
    FlowPayload::Agent {
        request: request.to_string(),
        scope: scope.to_string(),
        namespace: namespace.map(str::to_string),
    }
}

fn monitor_payload<R: Rng + ?Sized>(rng: &mut R, cycle: u64) -> FlowPayload {
    FlowPayload::Monitor {
        cycle,
        insights: Insights {
            anomalies: rng.random_range(0..=5),
            warnings: rng.random_range(0..=10),
            recommendations: rng.random_range(0..=8),
        },
    }
}

fn agent_tools<R: Rng + ?Sized>(rng: &mut R) -> Vec<ToolCall> {
    let count = rng.random_range(1..=3);
    (0..count)
        .map(|_| {
            let action = match rng.random_range(0..3) {
                0 => {
                    let cmd = COMMANDS.choose(rng).copied().unwrap_or_default();
                    ToolAction::Command(cmd.to_string())
                }
                1 => ToolAction::Batch(rng.random_range(2..=8)),
                _ => {
                    let path = FILES.choose(rng).copied().unwrap_or_default();
                    ToolAction::File(path.to_string())
                }
            };
            let name = match action {
                ToolAction::Command(_) => "execute_bash",
                ToolAction::Batch(_) => "execute_bash_batch",
                _ => "fs_read",
            };
            ToolCall {
                name: name.to_string(),
                action,
                duration: Duration::from_millis(rng.random_range(500..5_000)),
            }
        })
        .collect()
}

fn monitor_tools<R: Rng + ?Sized>(rng: &mut R) -> Vec<ToolCall> {
    vec![
        ToolCall {
            name: "execute_bash_batch".to_string(),
            action: ToolAction::Batch(rng.random_range(5..=9)),
            duration: Duration::from_millis(rng.random_range(6_000..11_000)),
        },
        ToolCall {
            name: "execute_bash".to_string(),
            action: ToolAction::Command("kubectl get events".to_string()),
            duration: Duration::from_millis(rng.random_range(2_000..4_500)),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_counts_per_pipeline() {
        assert_eq!(generate_flows(Pipeline::Agent, now()).len(), 5);
        assert_eq!(generate_flows(Pipeline::Monitor, now()).len(), 8);
    }

    #[test]
    fn test_sorted_recent_first_and_within_range() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            for pipeline in Pipeline::ALL {
                let flows = generate_flows_with(pipeline, now(), &mut rng);
                assert_eq!(flows.len(), flow_count(pipeline));
                assert!(flows.windows(2).all(|w| w[0].start_time >= w[1].start_time));

                let range = duration_range(pipeline);
                for flow in &flows {
                    assert!(range.contains(&flow.duration), "{:?}", flow.duration);
                    assert_eq!(flow.pipeline(), pipeline);
                    assert!(flow.end_time.unwrap() <= now());
                }
            }
        }
    }

    #[test]
    fn test_status_subsets() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            for flow in generate_flows_with(Pipeline::Agent, now(), &mut rng) {
                assert!(matches!(flow.status, FlowStatus::Completed | FlowStatus::Error));
            }
            for flow in generate_flows_with(Pipeline::Monitor, now(), &mut rng) {
                assert!(matches!(flow.status, FlowStatus::Completed | FlowStatus::Timeout));
            }
        }
    }

    #[test]
    fn test_monitor_cycles_increase_toward_present() {
        let mut rng = StdRng::seed_from_u64(3);
        let flows = generate_flows_with(Pipeline::Monitor, now(), &mut rng);
        let cycles: Vec<u64> = flows
            .iter()
            .map(|f| match f.payload {
                FlowPayload::Monitor { cycle, .. } => cycle,
                _ => panic!("agent payload in monitor list"),
            })
            .collect();
        assert!(cycles.windows(2).all(|w| w[0] == w[1] + 1));
    }

    #[test]
    fn test_payload_fields_populated() {
        let mut rng = StdRng::seed_from_u64(11);
        for flow in generate_flows_with(Pipeline::Agent, now(), &mut rng) {
            assert!(!flow.tools.is_empty());
            assert!(flow.tokens.input > 0 && flow.tokens.output > 0);
            match flow.payload {
                FlowPayload::Agent { request, scope, .. } => {
                    assert!(!request.is_empty());
                    assert!(!scope.is_empty());
                }
                _ => panic!("monitor payload in agent list"),
            }
        }
    }
}
