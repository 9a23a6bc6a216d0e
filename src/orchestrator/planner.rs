use log::{debug, error};
use serde::Serialize;

use crate::units::UnitDescriptor;

/// Token that selects the whole catalog
pub const ALL_TOKEN: &str = "all";

/// Token that expands to every live-only unit
pub const LIVE_TOKEN: &str = "live";

/// Ordered list of units to execute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunPlan {
    /// Unit names in execution order, without duplicates
    pub units: Vec<String>,
    /// Tokens that matched no unit
    pub invalid: Vec<String>,
}

impl RunPlan {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }
}

/// Turn include tokens into an execution plan.
///
/// `all` anywhere selects the full catalog. `live` is replaced, at the front,
/// by every live-only unit. Any other token selects the first unit in
/// catalog order whose identity contains it.
pub fn plan<S: AsRef<str>>(selected: &[S], available: &[&UnitDescriptor]) -> RunPlan {
    let mut tokens = dedup_tokens(selected);

    if tokens.iter().any(|t| t == ALL_TOKEN) {
        return RunPlan {
            units: available.iter().map(|d| d.name.to_string()).collect(),
            invalid: Vec::new(),
        };
    }

    if let Some(pos) = tokens.iter().position(|t| t == LIVE_TOKEN) {
        tokens.remove(pos);
        tokens = available
            .iter()
            .filter(|d| d.live_only)
            .map(|d| d.identity())
            .chain(tokens)
            .collect();
    }

    let identities: Vec<String> = available.iter().map(|d| d.identity()).collect();
    let mut result = RunPlan::default();

    for token in tokens {
        let matches: Vec<usize> = identities
            .iter()
            .enumerate()
            .filter(|(_, identity)| identity.contains(token.as_str()))
            .map(|(i, _)| i)
            .collect();

        match matches.first() {
            Some(&index) => {
                if matches.len() > 1 {
                    debug!("'{}' matches {} units, using {}", token, matches.len(), identities[index]);
                }
                let name = available[index].name.to_string();
                if !result.units.contains(&name) {
                    result.units.push(name);
                }
            }
            None => {
                error!("'{}' was not identified as a valid, available module to run!", token);
                result.invalid.push(token);
            }
        }
    }

    result
}

/// Every unit in catalog order except those the exclude tokens select
pub fn plan_excluding<S: AsRef<str>>(excluded: &[S], available: &[&UnitDescriptor]) -> RunPlan {
    let skipped = plan(excluded, available);
    RunPlan {
        units: available
            .iter()
            .map(|d| d.name.to_string())
            .filter(|name| !skipped.units.contains(name))
            .collect(),
        invalid: skipped.invalid,
    }
}

fn dedup_tokens<S: AsRef<str>>(selected: &[S]) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in selected {
        let token = token.as_ref().trim();
        if !token.is_empty() && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_catalog;

    #[test]
    fn test_all_wins() {
        let catalog = sample_catalog();
        let refs: Vec<&UnitDescriptor> = catalog.iter().collect();

        let plan = plan(&["bash", "all"], &refs);
        assert_eq!(plan.units, vec!["ps", "netstat", "chrome", "bash"]);
        assert!(plan.invalid.is_empty());
    }

    #[test]
    fn test_live_goes_first() {
        let catalog = sample_catalog();
        let refs: Vec<&UnitDescriptor> = catalog.iter().collect();

        let plan = plan(&["bash", "live"], &refs);
        assert_eq!(plan.units, vec!["ps", "netstat", "bash"]);
    }

    #[test]
    fn test_invalid_tokens_are_isolated() {
        let catalog = sample_catalog();
        let refs: Vec<&UnitDescriptor> = catalog.iter().collect();

        let plan = plan(&["nonexistent", "bash", "zzz"], &refs);
        assert_eq!(plan.units, vec!["bash"]);
        assert_eq!(plan.invalid, vec!["nonexistent", "zzz"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let catalog = sample_catalog();
        let refs: Vec<&UnitDescriptor> = catalog.iter().collect();

        let plan = plan(&["bash", "bash", "mod_bash", "chrome"], &refs);
        assert_eq!(plan.units, vec!["bash", "chrome"]);
    }

    #[test]
    fn test_ambiguous_token_takes_first_match() {
        let catalog = sample_catalog();
        let refs: Vec<&UnitDescriptor> = catalog.iter().collect();

        // Every identity contains "mod_"; the first in catalog order wins
        let plan = plan(&["mod_"], &refs);
        assert_eq!(plan.units, vec!["ps"]);
    }

    #[test]
    fn test_exclude_mode() {
        let catalog = sample_catalog();
        let refs: Vec<&UnitDescriptor> = catalog.iter().collect();

        let plan = plan_excluding(&["chrome", "bogus"], &refs);
        assert_eq!(plan.units, vec!["ps", "netstat", "bash"]);
        assert_eq!(plan.invalid, vec!["bogus"]);
    }

    #[test]
    fn test_empty_selection() {
        let catalog = sample_catalog();
        let refs: Vec<&UnitDescriptor> = catalog.iter().collect();
        let empty: [&str; 0] = [];
        assert!(plan(&empty, &refs).is_empty());
    }
}
