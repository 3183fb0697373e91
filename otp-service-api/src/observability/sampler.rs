//! Route-based trace sampling.
//!
//! Each span name is reduced to an HTTP route and looked up in a fixed
//! precedence table: drop, then always, then per-route ratio, then the
//! default policy. Ratio routes defer to the SDK's trace-id ratio sampler,
//! so every span of one trace lands on the same side of the threshold.

use std::collections::{HashMap, HashSet};

use opentelemetry::{
    trace::{Link, SamplingDecision, SamplingResult, SpanKind, TraceContextExt, TraceId, TraceState},
    Context, KeyValue,
};
use opentelemetry_sdk::trace::{Sampler, ShouldSample};
use otp_service_core::{DefaultPolicy, RoutePolicyConfig};

/// Where the route table sends a span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteDecision {
    Sample,
    Drop,
    /// Sample this fraction of traces, keyed on the trace id.
    Ratio(f64),
}

/// Immutable route classification built once from configuration.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    always: HashSet<String>,
    drop: HashSet<String>,
    ratios: HashMap<String, f64>,
    default_policy: DefaultPolicy,
    default_ratio: f64,
}

impl RoutePolicy {
    pub fn from_config(config: &RoutePolicyConfig) -> Self {
        Self {
            always: config.always.clone(),
            drop: config.drop.clone(),
            ratios: config.ratios.clone(),
            default_policy: config.default_policy,
            default_ratio: config.default_ratio,
        }
    }

    pub fn classify(&self, span_name: &str) -> RouteDecision {
        let route = extract_route(span_name);

        if self.drop.contains(&route) {
            return RouteDecision::Drop;
        }
        if self.always.contains(&route) {
            return RouteDecision::Sample;
        }
        if let Some(ratio) = self.ratios.get(&route) {
            return RouteDecision::Ratio(*ratio);
        }

        match self.default_policy {
            DefaultPolicy::Drop => RouteDecision::Drop,
            DefaultPolicy::Ratio => RouteDecision::Ratio(self.default_ratio),
            DefaultPolicy::Always => RouteDecision::Sample,
        }
    }
}

/// Reduces a span name to the route it describes.
///
/// Accepts `"GET /path"`, `"service: GET /path?query"` and bare paths.
/// Anything else comes back unchanged.
pub fn extract_route(name: &str) -> String {
    // A colon before any slash ends a "service:" prefix.
    let name = match name.split_once(':') {
        Some((prefix, rest)) if !prefix.contains('/') => rest.trim(),
        _ => name.trim(),
    };

    let tokens: Vec<&str> = name.split_whitespace().collect();
    if tokens.len() < 2 {
        if name.starts_with('/') {
            return strip_query(name).to_string();
        }
        return name.to_string();
    }

    let path = strip_query(tokens[1]);
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn strip_query(path: &str) -> &str {
    match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    }
}

/// OpenTelemetry sampler driven by a [`RoutePolicy`].
///
/// A valid, sampled parent span forces sampling so traces stay complete.
/// Root spans and spans under an unsampled parent go through the route table.
#[derive(Debug, Clone)]
pub struct RouteSampler {
    policy: RoutePolicy,
}

impl RouteSampler {
    pub fn new(policy: RoutePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }
}

impl ShouldSample for RouteSampler {
    fn should_sample(
        &self,
        parent_context: Option<&Context>,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult {
        let parent = parent_context
            .filter(|cx| cx.has_active_span())
            .map(|cx| cx.span().span_context().clone());

        if let Some(parent) = parent.as_ref() {
            if parent.is_valid() && parent.is_sampled() {
                return SamplingResult {
                    decision: SamplingDecision::RecordAndSample,
                    attributes: Vec::new(),
                    trace_state: parent.trace_state().clone(),
                };
            }
        }

        let decision = match self.policy.classify(name) {
            RouteDecision::Sample => SamplingDecision::RecordAndSample,
            RouteDecision::Drop => SamplingDecision::Drop,
            RouteDecision::Ratio(ratio) => {
                Sampler::TraceIdRatioBased(ratio)
                    .should_sample(parent_context, trace_id, name, span_kind, attributes, links)
                    .decision
            }
        };

        SamplingResult {
            decision,
            attributes: Vec::new(),
            trace_state: parent
                .map(|p| p.trace_state().clone())
                .unwrap_or_else(TraceState::default),
        }
    }
}

/// Sampler installed on the tracer provider.
#[derive(Debug, Clone)]
pub enum ServiceSampler {
    AlwaysOn,
    Routes(RouteSampler),
}

impl ServiceSampler {
    pub fn from_config(config: &RoutePolicyConfig) -> Self {
        if config.enabled {
            ServiceSampler::Routes(RouteSampler::new(RoutePolicy::from_config(config)))
        } else {
            ServiceSampler::AlwaysOn
        }
    }
}

impl ShouldSample for ServiceSampler {
    fn should_sample(
        &self,
        parent_context: Option<&Context>,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult {
        match self {
            ServiceSampler::AlwaysOn => Sampler::AlwaysOn.should_sample(
                parent_context,
                trace_id,
                name,
                span_kind,
                attributes,
                links,
            ),
            ServiceSampler::Routes(sampler) => sampler.should_sample(
                parent_context,
                trace_id,
                name,
                span_kind,
                attributes,
                links,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanContext, SpanId, TraceFlags};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn policy(config: RoutePolicyConfig) -> RoutePolicy {
        RoutePolicy::from_config(&config)
    }

    fn routes(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn trace_id(n: u128) -> TraceId {
        TraceId::from_bytes(n.to_be_bytes())
    }

    // ===== Route extraction =====

    #[rstest]
    #[case("GET /health", "/health")]
    #[case("svc: GET /metrics?x=1", "/metrics")]
    #[case("otp-service: POST /v1/otp/code", "/v1/otp/code")]
    #[case("GET health", "/health")]
    #[case("GET /v1/redis/get?key=a", "/v1/redis/get")]
    #[case("GET /v1/otp/tenant-settings/:id", "/v1/otp/tenant-settings/:id")]
    #[case("/ready?verbose=1", "/ready")]
    #[case("/live", "/live")]
    #[case("child_operation", "child_operation")]
    #[case("", "")]
    #[case("svc:", "")]
    fn extracts_route(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(extract_route(name), expected);
    }

    // ===== Precedence =====

    #[test]
    fn drop_beats_always_and_ratio() {
        let p = policy(RoutePolicyConfig {
            enabled: true,
            always: routes(&["/health"]),
            drop: routes(&["/health"]),
            ratios: [("/health".to_string(), 1.0)].into_iter().collect(),
            ..RoutePolicyConfig::default()
        });

        assert_eq!(p.classify("GET /health"), RouteDecision::Drop);
    }

    #[test]
    fn always_beats_ratio_and_default_drop() {
        let p = policy(RoutePolicyConfig {
            enabled: true,
            always: routes(&["/v1/otp/code"]),
            ratios: [("/v1/otp/code".to_string(), 0.0001)].into_iter().collect(),
            default_policy: DefaultPolicy::Drop,
            ..RoutePolicyConfig::default()
        });

        assert_eq!(p.classify("POST /v1/otp/code"), RouteDecision::Sample);
        assert_eq!(p.classify("GET /hello"), RouteDecision::Drop);
    }

    #[test]
    fn ratio_route_beats_default() {
        let p = policy(RoutePolicyConfig {
            enabled: true,
            ratios: [("/hello".to_string(), 0.25)].into_iter().collect(),
            default_policy: DefaultPolicy::Drop,
            ..RoutePolicyConfig::default()
        });

        assert_eq!(p.classify("GET /hello"), RouteDecision::Ratio(0.25));
    }

    #[test]
    fn default_ratio_applies_to_unknown_routes() {
        let p = policy(RoutePolicyConfig {
            enabled: true,
            default_policy: DefaultPolicy::Ratio,
            default_ratio: 0.5,
            ..RoutePolicyConfig::default()
        });

        assert_eq!(p.classify("GET /anything"), RouteDecision::Ratio(0.5));
    }

    #[test]
    fn default_always_samples_unknown_routes() {
        let p = policy(RoutePolicyConfig {
            enabled: true,
            ..RoutePolicyConfig::default()
        });
        assert_eq!(p.classify("GET /anything"), RouteDecision::Sample);
    }

    // ===== Ratio sampling =====

    fn ratio_sampled(raw: u128, ratio: f64) -> bool {
        let sampler = RouteSampler::new(policy(RoutePolicyConfig {
            enabled: true,
            ratios: [("/r".to_string(), ratio)].into_iter().collect(),
            ..RoutePolicyConfig::default()
        }));
        let result = sampler.should_sample(None, trace_id(raw), "GET /r", &SpanKind::Server, &[], &[]);
        result.decision == SamplingDecision::RecordAndSample
    }

    #[test]
    fn ratio_uses_low_trace_id_bits() {
        // Low word of zero always falls below any positive ratio.
        assert!(ratio_sampled(0, 0.01));
        // All ones sits just under 1.0.
        assert!(!ratio_sampled(u64::MAX as u128, 0.99));
        // High bits are ignored.
        assert!(ratio_sampled(u128::MAX << 64, 0.01));
    }

    #[test]
    fn ratio_bounds() {
        assert!(ratio_sampled(u128::MAX, 1.0));
        assert!(!ratio_sampled(0, 0.0));
    }

    proptest! {
        #[test]
        fn ratio_decision_is_deterministic(raw in any::<u128>(), ratio in 0.0001f64..=1.0) {
            let first = ratio_sampled(raw, ratio);
            for _ in 0..4 {
                prop_assert_eq!(ratio_sampled(raw, ratio), first);
            }
        }

        #[test]
        fn sampled_set_grows_with_ratio(raw in any::<u128>(), a in 0.0001f64..=1.0, b in 0.0001f64..=1.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            if ratio_sampled(raw, low) {
                prop_assert!(ratio_sampled(raw, high));
            }
        }
    }

    // ===== ShouldSample =====

    fn sample(sampler: &impl ShouldSample, parent: Option<&Context>, name: &str) -> SamplingDecision {
        sampler
            .should_sample(parent, trace_id(99), name, &SpanKind::Server, &[], &[])
            .decision
    }

    fn parent_context(flags: TraceFlags) -> Context {
        let span_context = SpanContext::new(
            trace_id(0xabcdef),
            SpanId::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]),
            flags,
            true,
            TraceState::default(),
        );
        Context::new().with_remote_span_context(span_context)
    }

    fn drop_health() -> RouteSampler {
        RouteSampler::new(policy(RoutePolicyConfig {
            enabled: true,
            drop: routes(&["/health"]),
            ..RoutePolicyConfig::default()
        }))
    }

    #[test]
    fn sampled_parent_is_inherited() {
        let parent = parent_context(TraceFlags::SAMPLED);
        assert_eq!(
            sample(&drop_health(), Some(&parent), "GET /health"),
            SamplingDecision::RecordAndSample
        );
    }

    #[test]
    fn unsampled_parent_falls_through_to_policy() {
        let parent = parent_context(TraceFlags::default());
        assert_eq!(
            sample(&drop_health(), Some(&parent), "GET /health"),
            SamplingDecision::Drop
        );
        assert_eq!(
            sample(&drop_health(), Some(&parent), "GET /hello"),
            SamplingDecision::RecordAndSample
        );
    }

    #[test]
    fn root_span_uses_policy() {
        assert_eq!(sample(&drop_health(), None, "GET /health"), SamplingDecision::Drop);
        assert_eq!(
            sample(&drop_health(), Some(&Context::new()), "GET /health"),
            SamplingDecision::Drop
        );
    }

    #[test]
    fn disabled_policy_samples_everything() {
        let sampler = ServiceSampler::from_config(&RoutePolicyConfig {
            enabled: false,
            drop: routes(&["/health"]),
            ..RoutePolicyConfig::default()
        });
        assert!(matches!(sampler, ServiceSampler::AlwaysOn));
        assert_eq!(
            sample(&sampler, None, "GET /health"),
            SamplingDecision::RecordAndSample
        );
    }

    #[test]
    fn enabled_policy_routes_through_table() {
        let sampler = ServiceSampler::from_config(&RoutePolicyConfig {
            enabled: true,
            drop: routes(&["/metrics"]),
            ..RoutePolicyConfig::default()
        });
        assert_eq!(sample(&sampler, None, "GET /metrics"), SamplingDecision::Drop);
    }
}
