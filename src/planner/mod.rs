//! Execution planning
//!
//! Turns the suite registry into a linear execution order and, for parallel
//! runs, a list of dependency-respecting batches.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::error::ConfigurationError;
use crate::models::SuiteSpec;

/// Output of planning for one run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub order: Vec<String>,
    pub batches: Vec<Vec<String>>,
    pub warnings: Vec<String>,
}

impl ExecutionPlan {
    pub fn suite_count(&self) -> usize {
        self.order.len()
    }
}

/// Result of batch construction
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batches {
    pub batches: Vec<Vec<String>>,
    /// Suites forced together because their dependencies never resolved
    pub unresolved: Vec<String>,
}

/// Validated, read-only view over the suite registry
#[derive(Clone, Debug)]
pub struct ExecutionPlanner {
    /// Declaration order
    suites: Vec<SuiteSpec>,
    index: BTreeMap<String, usize>,
}

impl ExecutionPlanner {
    /// Validate the registry and build a planner
    ///
    /// Fails on duplicate names, invalid configurations, and enabled suites
    /// depending on unknown or disabled suites.
    pub fn new(suites: Vec<SuiteSpec>) -> Result<Self, ConfigurationError> {
        let mut index = BTreeMap::new();
        for (i, suite) in suites.iter().enumerate() {
            if index.insert(suite.name.clone(), i).is_some() {
                return Err(ConfigurationError::DuplicateSuite(suite.name.clone()));
            }
        }

        for suite in suites.iter().filter(|s| s.enabled) {
            suite.validate()?;
            for dependency in &suite.dependencies {
                match index.get(dependency).map(|&i| &suites[i]) {
                    None => {
                        return Err(ConfigurationError::UnknownDependency {
                            suite: suite.name.clone(),
                            dependency: dependency.clone(),
                        })
                    }
                    Some(dep) if !dep.enabled => {
                        return Err(ConfigurationError::DisabledDependency {
                            suite: suite.name.clone(),
                            dependency: dependency.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(Self { suites, index })
    }

    pub fn suite(&self, name: &str) -> Option<&SuiteSpec> {
        self.index.get(name).map(|&i| &self.suites[i])
    }

    pub fn suites(&self) -> &[SuiteSpec] {
        &self.suites
    }

    pub fn enabled_suites(&self) -> impl Iterator<Item = &SuiteSpec> {
        self.suites.iter().filter(|s| s.enabled)
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.suite(name).is_some_and(|s| s.enabled)
    }

    fn depends_on(&self, suite: &str, dependency: &str) -> bool {
        self.suite(suite)
            .is_some_and(|s| s.dependencies.contains(dependency))
    }

    /// Names in an explicit order that will be ignored
    pub fn ignored_names(&self, explicit_order: &[String]) -> Vec<String> {
        explicit_order
            .iter()
            .filter(|name| !self.is_enabled(name))
            .cloned()
            .collect()
    }

    /// Compute the linear execution order of enabled suites
    ///
    /// A non-empty explicit order wins: its enabled names are kept in the given
    /// order and everything else is dropped. Otherwise suites are sorted by
    /// descending priority, declaration order breaking ties, and one pass
    /// swaps equal-priority neighbours where the first depends on the second.
    pub fn determine_execution_order(&self, explicit_order: &[String]) -> Vec<String> {
        if !explicit_order.is_empty() {
            let mut seen = HashSet::new();
            let mut order = Vec::new();
            for name in explicit_order {
                if !self.is_enabled(name) {
                    warn!("Ignoring '{}' in execution order: not an enabled suite", name);
                    continue;
                }
                if seen.insert(name.as_str()) {
                    order.push(name.clone());
                }
            }
            return order;
        }

        let mut enabled: Vec<&SuiteSpec> = self.enabled_suites().collect();
        enabled.sort_by(|a, b| b.priority.cmp(&a.priority));

        for i in 0..enabled.len().saturating_sub(1) {
            let (first, second) = (enabled[i], enabled[i + 1]);
            if first.priority == second.priority
                && first.dependencies.contains(&second.name)
                && !second.dependencies.contains(&first.name)
            {
                enabled.swap(i, i + 1);
            }
        }

        enabled.into_iter().map(|s| s.name.clone()).collect()
    }

    /// Group an execution order into dependency-respecting batches
    ///
    /// Each pass scans the remaining names from last to first and takes every
    /// name whose dependencies were placed in earlier batches. A pass that
    /// places nothing forces all remaining names into one final batch.
    pub fn create_execution_batches(&self, order: &[String]) -> Batches {
        let in_order: HashSet<&str> = order.iter().map(String::as_str).collect();
        let mut remaining: Vec<String> = order.to_vec();
        let mut processed: HashSet<String> = HashSet::new();
        let mut result = Batches::default();

        while !remaining.is_empty() {
            let mut placed = Vec::new();

            for i in (0..remaining.len()).rev() {
                let ready = self.suite(&remaining[i]).map_or(true, |suite| {
                    suite
                        .dependencies
                        .iter()
                        .all(|dep| processed.contains(dep) || !in_order.contains(dep.as_str()))
                });
                if ready {
                    placed.push(remaining.remove(i));
                }
            }

            if placed.is_empty() {
                warn!(
                    "Unresolvable dependencies among {:?}; running them as one batch",
                    remaining
                );
                result.unresolved = remaining.clone();
                result.batches.push(std::mem::take(&mut remaining));
                break;
            }

            // The scan runs backwards; restore execution order within the batch
            placed.reverse();
            debug!("Batch {}: {:?}", result.batches.len() + 1, placed);
            processed.extend(placed.iter().cloned());
            result.batches.push(placed);
        }

        result
    }

    /// Build the full plan for a run
    pub fn plan(&self, explicit_order: &[String], parallel: bool) -> ExecutionPlan {
        let mut warnings: Vec<String> = self
            .ignored_names(explicit_order)
            .into_iter()
            .map(|name| format!("Execution order names '{name}', which is not an enabled suite"))
            .collect();

        let order = self.determine_execution_order(explicit_order);

        for name in &order {
            for dep in self.suite(name).map(|s| &s.dependencies).into_iter().flatten() {
                if !order.contains(dep) {
                    warnings.push(format!(
                        "Suite '{name}' depends on '{dep}', which is not in the execution order"
                    ));
                }
            }
        }

        let batches = if parallel {
            let batched = self.create_execution_batches(&order);
            if !batched.unresolved.is_empty() {
                warnings.push(format!(
                    "Dependency cycle or unresolved dependencies among [{}]; forced into one batch",
                    batched.unresolved.join(", ")
                ));
            }
            batched.batches
        } else {
            if explicit_order.is_empty() {
                warnings.extend(self.sequential_order_violations(&order));
            }
            order.iter().map(|name| vec![name.clone()]).collect()
        };

        ExecutionPlan {
            order,
            batches,
            warnings,
        }
    }

    /// Dependencies that a priority-only order runs after their dependents
    fn sequential_order_violations(&self, order: &[String]) -> Vec<String> {
        let mut violations = Vec::new();
        for (i, name) in order.iter().enumerate() {
            for later in &order[i + 1..] {
                if self.depends_on(name, later) {
                    violations.push(format!(
                        "Suite '{name}' runs before its dependency '{later}' in sequential order"
                    ));
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FunctionalConfig, PerformanceConfig, SecurityConfig, SuiteConfig};

    fn functional(name: &str) -> SuiteSpec {
        SuiteSpec::new(name, SuiteConfig::Functional(FunctionalConfig::default()))
    }

    fn reference_suites() -> Vec<SuiteSpec> {
        vec![
            SuiteSpec::new("security", SuiteConfig::Security(SecurityConfig::default()))
                .with_priority(100)
                .critical(),
            functional("functional").with_priority(90).critical(),
            SuiteSpec::new(
                "performance",
                SuiteConfig::Performance(PerformanceConfig::default()),
            )
            .with_priority(80)
            .depends_on("functional"),
        ]
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn batch_index(batches: &[Vec<String>], name: &str) -> usize {
        batches
            .iter()
            .position(|b| b.iter().any(|n| n == name))
            .unwrap()
    }

    #[test]
    fn test_reference_order_and_batches() {
        let planner = ExecutionPlanner::new(reference_suites()).unwrap();
        let order = planner.determine_execution_order(&[]);
        assert_eq!(order, names(&["security", "functional", "performance"]));

        let batches = planner.create_execution_batches(&order);
        assert_eq!(
            batches.batches,
            vec![names(&["security", "functional"]), names(&["performance"])]
        );
        assert!(batches.unresolved.is_empty());
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let suites = vec![functional("a").depends_on("ghost")];
        let err = ExecutionPlanner::new(suites).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownDependency {
                suite: "a".to_string(),
                dependency: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_disabled_dependency_rejected() {
        let suites = vec![functional("a").depends_on("b"), functional("b").disabled()];
        let err = ExecutionPlanner::new(suites).unwrap_err();
        assert!(matches!(err, ConfigurationError::DisabledDependency { .. }));
    }

    #[test]
    fn test_disabled_suite_may_reference_anything() {
        let suites = vec![functional("a"), functional("b").disabled().depends_on("ghost")];
        let planner = ExecutionPlanner::new(suites).unwrap();
        assert_eq!(planner.determine_execution_order(&[]), names(&["a"]));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let suites = vec![functional("a"), functional("a")];
        assert_eq!(
            ExecutionPlanner::new(suites).unwrap_err(),
            ConfigurationError::DuplicateSuite("a".to_string())
        );
    }

    #[test]
    fn test_explicit_order_filters_and_preserves() {
        let mut suites = reference_suites();
        suites.push(functional("smoke").disabled());
        let planner = ExecutionPlanner::new(suites).unwrap();

        let explicit = names(&["performance", "ghost", "smoke", "security", "performance"]);
        let order = planner.determine_execution_order(&explicit);
        assert_eq!(order, names(&["performance", "security"]));
        assert_eq!(planner.ignored_names(&explicit), names(&["ghost", "smoke"]));
    }

    #[test]
    fn test_equal_priority_dependency_hint() {
        let suites = vec![
            functional("api").with_priority(50).depends_on("db"),
            functional("db").with_priority(50),
        ];
        let planner = ExecutionPlanner::new(suites).unwrap();
        assert_eq!(planner.determine_execution_order(&[]), names(&["db", "api"]));
    }

    #[test]
    fn test_order_is_deterministic() {
        let suites = vec![
            functional("c").with_priority(1),
            functional("a").with_priority(1),
            functional("b").with_priority(1).depends_on("a"),
            functional("d").with_priority(7),
        ];
        let planner = ExecutionPlanner::new(suites).unwrap();
        let first = planner.determine_execution_order(&[]);
        for _ in 0..10 {
            assert_eq!(planner.determine_execution_order(&[]), first);
        }
        assert_eq!(first, names(&["d", "c", "a", "b"]));
    }

    #[test]
    fn test_mutual_dependency_single_batch() {
        let suites = vec![functional("A").depends_on("B"), functional("B").depends_on("A")];
        let planner = ExecutionPlanner::new(suites).unwrap();
        let order = planner.determine_execution_order(&[]);
        let batches = planner.create_execution_batches(&order);

        assert_eq!(batches.batches.len(), 1);
        let mut only = batches.batches[0].clone();
        only.sort();
        assert_eq!(only, names(&["A", "B"]));
        assert_eq!(batches.unresolved.len(), 2);

        let plan = planner.plan(&[], true);
        assert!(plan.warnings.iter().any(|w| w.contains("cycle")));
    }

    #[test]
    fn test_cycle_with_independent_suites() {
        let suites = vec![
            functional("root"),
            functional("x").depends_on("y"),
            functional("y").depends_on("x"),
            functional("leaf").depends_on("root"),
        ];
        let planner = ExecutionPlanner::new(suites.clone()).unwrap();
        let order = planner.determine_execution_order(&[]);
        let batches = planner.create_execution_batches(&order);

        assert!(batches.batches.len() <= suites.len());
        assert_eq!(batch_index(&batches.batches, "x"), batch_index(&batches.batches, "y"));
        assert!(batch_index(&batches.batches, "root") < batch_index(&batches.batches, "leaf"));
    }

    #[test]
    fn test_dependency_never_shares_batch_with_dependent() {
        // Priority puts the dependent first, so a mid-scan commit would co-batch them
        let suites = vec![
            functional("report").with_priority(100).depends_on("build"),
            functional("build").with_priority(10),
        ];
        let planner = ExecutionPlanner::new(suites).unwrap();
        let order = planner.determine_execution_order(&[]);
        let batches = planner.create_execution_batches(&order);
        assert_eq!(batches.batches, vec![names(&["build"]), names(&["report"])]);
    }

    #[test]
    fn test_acyclic_graph_batches_respect_dependencies() {
        let suites = vec![
            functional("a").with_priority(5),
            functional("b").with_priority(9).depends_on("a"),
            functional("c").with_priority(1).depends_on("a"),
            functional("d").with_priority(3).depends_on("b").depends_on("c"),
            functional("e").with_priority(7),
            functional("f").with_priority(8).depends_on("e").depends_on("d"),
        ];
        let planner = ExecutionPlanner::new(suites.clone()).unwrap();
        let order = planner.determine_execution_order(&[]);
        let batches = planner.create_execution_batches(&order);

        for suite in &suites {
            let idx = batch_index(&batches.batches, &suite.name);
            for dep in &suite.dependencies {
                assert!(batch_index(&batches.batches, dep) < idx, "{dep} before {}", suite.name);
            }
        }

        let mut flattened: Vec<String> = batches.batches.concat();
        assert_eq!(flattened.len(), suites.len());
        flattened.sort();
        flattened.dedup();
        assert_eq!(flattened.len(), suites.len());
    }

    #[test]
    fn test_dependency_outside_explicit_order_is_satisfied() {
        let planner = ExecutionPlanner::new(reference_suites()).unwrap();
        let batches = planner.create_execution_batches(&names(&["performance"]));
        assert_eq!(batches.batches, vec![names(&["performance"])]);

        let plan = planner.plan(&names(&["performance"]), true);
        assert!(plan.warnings.iter().any(|w| w.contains("not in the execution order")));
    }

    #[test]
    fn test_sequential_plan_is_one_suite_per_batch() {
        let planner = ExecutionPlanner::new(reference_suites()).unwrap();
        let plan = planner.plan(&[], false);
        assert_eq!(plan.batches.len(), 3);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_sequential_plan_flags_priority_inversion() {
        let suites = vec![
            functional("report").with_priority(100).depends_on("build"),
            functional("build").with_priority(10),
        ];
        let planner = ExecutionPlanner::new(suites).unwrap();
        let plan = planner.plan(&[], false);
        assert_eq!(plan.warnings.len(), 1);
    }
}
