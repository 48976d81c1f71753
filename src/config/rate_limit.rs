use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

/// Two route groups: the login endpoint and everything behind authentication.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub login: RateLimitRule,
    pub api: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            login: RateLimitRule::new(2, 5),
            api: RateLimitRule::new(20, 40),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = super::parse_bool_env("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            match parse_overrides(&raw) {
                Ok((login, api)) => {
                    cfg.login = login.unwrap_or(cfg.login);
                    cfg.api = api.unwrap_or(cfg.api);
                }
                Err(err) => {
                    tracing::warn!("Invalid RATE_LIMIT_CONFIG '{}': {}", raw, err);
                }
            }
        }

        cfg
    }
}

type Overrides = (Option<RateLimitRule>, Option<RateLimitRule>);

/// Accepts either a single `per:burst` applied to both groups, or
/// `login=per:burst,api=per:burst` with either part optional.
fn parse_overrides(raw: &str) -> Result<Overrides, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty value".to_string());
    }

    if !trimmed.contains('=') {
        let rule = parse_rule(trimmed)?;
        return Ok((Some(rule), Some(rule)));
    }

    let mut login = None;
    let mut api = None;
    for item in trimmed.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, raw_rule) = item
            .split_once('=')
            .ok_or_else(|| format!("invalid item '{}', expected name=per:burst", item))?;
        let rule = parse_rule(raw_rule.trim())?;
        match name.trim().to_ascii_lowercase().as_str() {
            "login" | "auth" => login = Some(rule),
            "api" | "protected" => api = Some(rule),
            other => {
                return Err(format!("unknown group '{}', expected login/api", other));
            }
        }
    }

    Ok((login, api))
}

fn parse_rule(raw: &str) -> Result<RateLimitRule, String> {
    let (per_second_raw, burst_raw) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw))?;

    let per_second: u64 = per_second_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid per_second '{}'", per_second_raw.trim()))?;
    let burst_size: u32 = burst_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst_size '{}'", burst_raw.trim()))?;

    if per_second == 0 || burst_size == 0 {
        return Err("per_second and burst_size must be > 0".to_string());
    }

    Ok(RateLimitRule::new(per_second, burst_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_rule_applies_to_both_groups() {
        let (login, api) = parse_overrides("12:24").unwrap();
        assert_eq!(login, Some(RateLimitRule::new(12, 24)));
        assert_eq!(api, Some(RateLimitRule::new(12, 24)));
    }

    #[test]
    fn grouped_rules_are_independent() {
        let (login, api) = parse_overrides("login=1:2").unwrap();
        assert_eq!(login, Some(RateLimitRule::new(1, 2)));
        assert_eq!(api, None);

        let (_, api) = parse_overrides("auth=1:2, api=5:6").unwrap();
        assert_eq!(api, Some(RateLimitRule::new(5, 6)));
    }

    #[test]
    fn zero_and_garbage_rules_are_rejected() {
        assert!(parse_overrides("0:5").is_err());
        assert!(parse_overrides("api=abc").unwrap_err().contains("invalid rule"));
        assert!(parse_overrides("uploads=1:1").unwrap_err().contains("unknown group"));
    }
}
