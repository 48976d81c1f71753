use std::{env, sync::OnceLock};

const DEFAULT_DEPARTMENTS: &[&str] = &[
    "EME (P)",
    "MME (P)",
    "C&I (P)",
    "Civil (P)",
    "Chemical (P)",
    "Operation (P)",
];

/// Departments a report can be referred to and a department account can
/// belong to. Configured with `DEPARTMENTS` as a comma-separated list.
#[derive(Debug, Clone)]
pub struct DepartmentDirectory {
    names: Vec<String>,
}

impl DepartmentDirectory {
    pub fn from_env() -> Self {
        match env::var("DEPARTMENTS") {
            Ok(raw) => {
                let parsed = Self::parse(&raw);
                if parsed.names.is_empty() {
                    tracing::warn!("DEPARTMENTS is empty, using the built-in list");
                    Self::default()
                } else {
                    parsed
                }
            }
            Err(_) => Self::default(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        let mut names: Vec<String> = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.to_string());
            }
        }
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Canonical spelling of `raw`, matched case-insensitively.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        let raw = raw.trim();
        self.names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(raw))
            .map(String::as_str)
    }
}

impl Default for DepartmentDirectory {
    fn default() -> Self {
        Self {
            names: DEFAULT_DEPARTMENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub fn departments() -> &'static DepartmentDirectory {
    static DIRECTORY: OnceLock<DepartmentDirectory> = OnceLock::new();
    DIRECTORY.get_or_init(DepartmentDirectory::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_dedupes() {
        let dir = DepartmentDirectory::parse(" EME (P), MME (P),,eme (p) ");
        assert_eq!(dir.names(), &["EME (P)".to_string(), "MME (P)".to_string()]);
    }

    #[test]
    fn resolve_returns_canonical_spelling() {
        let dir = DepartmentDirectory::default();
        assert_eq!(dir.resolve("mme (p)"), Some("MME (P)"));
        assert_eq!(dir.resolve("  EME (P) "), Some("EME (P)"));
        assert_eq!(dir.resolve("Accounts"), None);
    }
}
