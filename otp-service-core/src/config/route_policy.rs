use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use super::{ConfigError, EnvVars};

/// Fallback applied to routes that none of the route lists mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultPolicy {
    #[default]
    Always,
    Ratio,
    Drop,
}

impl DefaultPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultPolicy::Always => "always",
            DefaultPolicy::Ratio => "ratio",
            DefaultPolicy::Drop => "drop",
        }
    }
}

impl FromStr for DefaultPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "always" => Ok(DefaultPolicy::Always),
            "ratio" => Ok(DefaultPolicy::Ratio),
            "drop" => Ok(DefaultPolicy::Drop),
            _ => Err("must be 'always', 'ratio', or 'drop'".to_string()),
        }
    }
}

/// Per-route sampling lists, validated at load time and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePolicyConfig {
    pub enabled: bool,
    pub always: HashSet<String>,
    pub drop: HashSet<String>,
    pub ratios: HashMap<String, f64>,
    pub default_policy: DefaultPolicy,
    pub default_ratio: f64,
}

impl Default for RoutePolicyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            always: HashSet::new(),
            drop: HashSet::new(),
            ratios: HashMap::new(),
            default_policy: DefaultPolicy::Always,
            default_ratio: 1.0,
        }
    }
}

impl RoutePolicyConfig {
    pub(super) fn from_vars(vars: &EnvVars) -> Result<Self, ConfigError> {
        let ratios = match vars.get("OTEL_ROUTE_RATIO") {
            Some(raw) => {
                parse_ratio_routes(raw).map_err(|e| ConfigError::invalid("OTEL_ROUTE_RATIO", e))?
            }
            None => HashMap::new(),
        };

        let default_ratio = match vars.get("OTEL_ROUTE_DEFAULT_RATIO") {
            Some(raw) => {
                let ratio = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| ConfigError::invalid("OTEL_ROUTE_DEFAULT_RATIO", e))?;
                if !is_valid_ratio(ratio) {
                    return Err(ConfigError::invalid(
                        "OTEL_ROUTE_DEFAULT_RATIO",
                        "must be between 0.0 and 1.0",
                    ));
                }
                ratio
            }
            None => 1.0,
        };

        Ok(Self {
            enabled: vars.flag("OTEL_ROUTE_POLICY_ENABLED", false),
            always: parse_route_list(vars.get("OTEL_ROUTE_ALWAYS").unwrap_or_default()),
            drop: parse_route_list(vars.get("OTEL_ROUTE_DROP").unwrap_or_default()),
            ratios,
            default_policy: vars.parse_or("OTEL_ROUTE_DEFAULT", DefaultPolicy::Always)?,
            default_ratio,
        })
    }
}

/// Valid ratios lie in `(0, 1]`.
pub fn is_valid_ratio(ratio: f64) -> bool {
    ratio > 0.0 && ratio <= 1.0
}

/// Splits a comma list, trimming items and dropping empty ones.
pub fn parse_route_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `path=ratio` pairs such as `/health=0.01,/live=0.5`.
pub fn parse_ratio_routes(raw: &str) -> Result<HashMap<String, f64>, String> {
    let mut routes = HashMap::new();

    for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let (path, ratio) = item
            .split_once('=')
            .ok_or_else(|| format!("invalid ratio format: {} (expected path=ratio)", item))?;
        let path = path.trim();
        if path.is_empty() {
            return Err(format!("invalid ratio format: {} (empty path)", item));
        }

        let ratio = ratio
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid ratio value for {}: {}", path, e))?;
        if !is_valid_ratio(ratio) {
            return Err(format!(
                "ratio for {} must be between 0.0 and 1.0, got {}",
                path, ratio
            ));
        }

        routes.insert(path.to_string(), ratio);
    }

    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn route_list_trims_and_skips_blanks() {
        let routes = parse_route_list(" /health, ,/live ,");
        assert_eq!(routes.len(), 2);
        assert!(routes.contains("/health"));
        assert!(routes.contains("/live"));
    }

    #[test]
    fn ratio_routes_parse() {
        let routes = parse_ratio_routes("/health=0.01, /v1/otp/code = 0.5").unwrap();
        assert_eq!(routes.get("/health"), Some(&0.01));
        assert_eq!(routes.get("/v1/otp/code"), Some(&0.5));
    }

    #[rstest]
    #[case("/health")]
    #[case("/health=abc")]
    #[case("/health=0")]
    #[case("/health=1.5")]
    #[case("/health=-0.2")]
    #[case("=0.5")]
    fn invalid_ratio_routes_are_rejected(#[case] raw: &str) {
        assert!(parse_ratio_routes(raw).is_err(), "{} should be rejected", raw);
    }

    #[test]
    fn ratio_of_one_is_accepted() {
        assert_eq!(parse_ratio_routes("/x=1").unwrap().get("/x"), Some(&1.0));
    }

    #[test]
    fn default_policy_parses_known_tags_only() {
        assert_eq!("ratio".parse::<DefaultPolicy>().unwrap(), DefaultPolicy::Ratio);
        assert_eq!("drop".parse::<DefaultPolicy>().unwrap(), DefaultPolicy::Drop);
        assert!("sometimes".parse::<DefaultPolicy>().is_err());
    }
}
