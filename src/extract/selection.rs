//! Sheet selection policy

use crate::error::{SheetError, SheetResult};
use regex::Regex;

/// Appended to the template sheet's name in extracted records.
pub const TEMPLATE_TAG: &str = " (TEMPLATE)";

/// Template / explicit list / fallback pattern.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    pub template: Option<String>,
    pub explicit: Vec<String>,
    pub pattern: Option<Regex>,
}

impl SelectionPolicy {
    pub fn new(
        template: Option<String>,
        explicit: Vec<String>,
        pattern: Option<&str>,
    ) -> SheetResult<Self> {
        let pattern = pattern
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    SheetError::Validation(format!("invalid sheet name pattern '{}': {}", p, e))
                })
            })
            .transpose()?;
        Ok(Self {
            template: template.filter(|t| !t.is_empty()),
            explicit,
            pattern,
        })
    }

    /// Pattern match anchored at the start of the name.
    fn pattern_matches(&self, name: &str) -> bool {
        self.pattern
            .as_ref()
            .and_then(|re| re.find(name))
            .is_some_and(|m| m.start() == 0)
    }

    fn is_template(&self, name: &str) -> bool {
        self.template.as_deref() == Some(name)
    }
}

/// One sheet the extraction run will read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetVisit {
    pub name: String,
    pub is_template: bool,
}

impl SheetVisit {
    /// Sheet name as it appears in extracted records.
    pub fn label(&self) -> String {
        if self.is_template {
            format!("{}{}", self.name, TEMPLATE_TAG)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPlan {
    pub visits: Vec<SheetVisit>,
    /// Explicitly requested sheets that do not exist.
    pub missing: Vec<String>,
}

/// Decide which of `available` sheets to visit, in visit order.
///
/// 1. The template, if set and present; this marks the template as handled.
/// 2. Every explicit sheet that exists, except the template.
/// 3. Only when the template was not handled: every other sheet matching the
///    pattern, in `available` order.
///
/// Steps 1 and 3 never both contribute.
pub fn plan_selection(policy: &SelectionPolicy, available: &[String]) -> SelectionPlan {
    let exists = |name: &str| available.iter().any(|a| a == name);
    let mut plan = SelectionPlan::default();
    let mut template_handled = false;

    if let Some(template) = policy.template.as_deref() {
        if exists(template) {
            plan.visits.push(SheetVisit {
                name: template.to_string(),
                is_template: true,
            });
            template_handled = true;
        }
    }

    for name in &policy.explicit {
        if policy.is_template(name) {
            continue;
        }
        if exists(name) {
            plan.visits.push(SheetVisit {
                name: name.clone(),
                is_template: false,
            });
        } else {
            plan.missing.push(name.clone());
        }
    }

    if !template_handled && policy.pattern.is_some() {
        for name in available {
            if policy.pattern_matches(name)
                && !policy.is_template(name)
                && !policy.explicit.contains(name)
            {
                plan.visits.push(SheetVisit {
                    name: name.clone(),
                    is_template: false,
                });
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn visited(plan: &SelectionPlan) -> Vec<String> {
        plan.visits.iter().map(SheetVisit::label).collect()
    }

    #[test]
    fn test_template_gates_off_pattern() {
        let policy =
            SelectionPolicy::new(Some("T".into()), names(&["X"]), Some("^H.*")).unwrap();
        let plan = plan_selection(&policy, &names(&["T", "X", "H1", "H2", "Other"]));
        assert_eq!(visited(&plan), vec!["T (TEMPLATE)", "X"]);
        assert!(plan.missing.is_empty());
    }

    #[test]
    fn test_pattern_fallback_without_template() {
        let policy = SelectionPolicy::new(None, vec![], Some("^H.*")).unwrap();
        let plan = plan_selection(&policy, &names(&["H1", "H2", "Other"]));
        assert_eq!(visited(&plan), vec!["H1", "H2"]);
    }

    #[test]
    fn test_missing_template_falls_back_to_pattern() {
        let policy =
            SelectionPolicy::new(Some("T".into()), names(&["Summary"]), Some(r"^\d+")).unwrap();
        let plan = plan_selection(&policy, &names(&["Summary", "101 Main", "Other", "202 Oak"]));
        assert_eq!(visited(&plan), vec!["Summary", "101 Main", "202 Oak"]);
    }

    #[test]
    fn test_explicit_template_is_not_extracted_twice() {
        let policy = SelectionPolicy::new(Some("T".into()), names(&["T", "X"]), None).unwrap();
        let plan = plan_selection(&policy, &names(&["T", "X"]));
        assert_eq!(visited(&plan), vec!["T (TEMPLATE)", "X"]);
    }

    #[test]
    fn test_explicit_sheets_not_repeated_by_pattern() {
        let policy = SelectionPolicy::new(None, names(&["H2"]), Some("^H")).unwrap();
        let plan = plan_selection(&policy, &names(&["H1", "H2"]));
        assert_eq!(visited(&plan), vec!["H2", "H1"]);
    }

    #[test]
    fn test_missing_explicit_recorded() {
        let policy = SelectionPolicy::new(None, names(&["Gone", "X"]), None).unwrap();
        let plan = plan_selection(&policy, &names(&["X"]));
        assert_eq!(visited(&plan), vec!["X"]);
        assert_eq!(plan.missing, vec!["Gone"]);
    }

    #[test]
    fn test_pattern_is_anchored_at_start() {
        let policy = SelectionPolicy::new(None, vec![], Some("House")).unwrap();
        let plan = plan_selection(&policy, &names(&["House 1", "Old House"]));
        assert_eq!(visited(&plan), vec!["House 1"]);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(matches!(
            SelectionPolicy::new(None, vec![], Some("(")),
            Err(SheetError::Validation(_))
        ));
    }
}
