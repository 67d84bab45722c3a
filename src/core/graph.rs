//! # Dependency Graph
//!
//! Cross-references the flat option list so that a change of a parent option
//! can recompute the valid items of its dependents in O(items of the child).
//!
//! The filter pool used to recompute a dependent option is that option's own
//! item list, keyed by the dependent's name. It is registered for every option
//! with `dependsOn`, whatever its type tag.
use crate::models::{OptionDef, OptionItem, Selection};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("Option '{name}' is defined more than once.")]
    DuplicateOption { name: String },
    #[error("Option '{option}' depends on '{parent}', which is not defined.")]
    UnknownParent { option: String, parent: String },
    #[error("Option '{option}' has default '{default}', which is not one of its items.")]
    UnknownDefault { option: String, default: String },
    #[error("Circular dependency detected: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
}

type GraphResult<T> = Result<T, GraphError>;

/// The options of a schema plus the live, dependency-filtered view of their items.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    options: Vec<OptionDef>,
    /// Option name -> position in `options`.
    index: HashMap<String, usize>,
    /// Parent name -> dependents, in schema order.
    dependents: HashMap<String, Vec<String>>,
    /// Option name -> indices into its `items` that are currently valid choices.
    valid: HashMap<String, Vec<usize>>,
    /// Parents before children.
    order: Vec<String>,
}

impl DependencyGraph {
    /// Builds the graph and cross-checks the schema.
    ///
    /// Every option starts with its full item list as valid set; the selection
    /// store narrows dependent options once a starting selection is known.
    pub fn build(options: Vec<OptionDef>) -> GraphResult<Self> {
        let mut index = HashMap::new();
        for (pos, opt) in options.iter().enumerate() {
            if index.insert(opt.name.clone(), pos).is_some() {
                return Err(GraphError::DuplicateOption {
                    name: opt.name.clone(),
                });
            }
        }

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for opt in &options {
            if opt.item(&opt.default).is_none() {
                return Err(GraphError::UnknownDefault {
                    option: opt.name.clone(),
                    default: opt.default.clone(),
                });
            }
            if let Some(parent) = &opt.depends_on {
                if !index.contains_key(parent) {
                    return Err(GraphError::UnknownParent {
                        option: opt.name.clone(),
                        parent: parent.clone(),
                    });
                }
                dependents
                    .entry(parent.clone())
                    .or_default()
                    .push(opt.name.clone());
            }
        }

        let order = topological_order(&options, &index)?;
        let valid = options
            .iter()
            .map(|opt| (opt.name.clone(), (0..opt.items.len()).collect()))
            .collect();

        log::debug!(
            "Dependency graph built: {} options, {} parents",
            options.len(),
            dependents.len()
        );

        Ok(Self {
            options,
            index,
            dependents,
            valid,
            order,
        })
    }

    pub fn options(&self) -> &[OptionDef] {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&OptionDef> {
        self.index.get(name).and_then(|&pos| self.options.get(pos))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Options whose `dependsOn` names `parent`, in schema order.
    pub fn dependents_of(&self, parent: &str) -> &[String] {
        self.dependents.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Option names ordered so that every parent precedes its dependents.
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Scans the pool registered under `child` and keeps the items whose
    /// `dependsArray` contains `parent_label`, preserving schema order.
    pub fn filter_items(&self, child: &str, parent_label: &str) -> Vec<usize> {
        self.option(child)
            .map(|opt| {
                opt.items
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| item.accepts(parent_label))
                    .map(|(pos, _)| pos)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The currently valid items of an option. Empty for unknown names.
    pub fn valid_items(&self, name: &str) -> Vec<&OptionItem> {
        let (Some(opt), Some(valid)) = (self.option(name), self.valid.get(name)) else {
            return Vec::new();
        };
        valid.iter().filter_map(|&pos| opt.items.get(pos)).collect()
    }

    pub fn is_valid_choice(&self, name: &str, label: &str) -> bool {
        self.valid_items(name).iter().any(|item| item.label == label)
    }

    /// Finds a label among the currently valid items of an option.
    pub fn valid_item(&self, name: &str, label: &str) -> Option<&OptionItem> {
        self.valid_items(name).into_iter().find(|item| item.label == label)
    }

    pub(crate) fn set_valid(&mut self, name: &str, positions: Vec<usize>) {
        self.valid.insert(name.to_string(), positions);
    }

    /// The default label of every option.
    pub fn defaults(&self) -> Selection {
        self.options
            .iter()
            .map(|opt| (opt.name.clone(), opt.default.clone()))
            .collect()
    }
}

/// Orders option names parents-first, failing on any dependency cycle.
fn topological_order(
    options: &[OptionDef],
    index: &HashMap<String, usize>,
) -> GraphResult<Vec<String>> {
    let mut order = Vec::with_capacity(options.len());
    let mut placed: HashSet<&str> = HashSet::new();

    for opt in options {
        // Walk up the ancestor chain, then place it from the top down.
        let mut chain: Vec<&str> = Vec::new();
        let mut current = Some(opt.name.as_str());
        while let Some(name) = current {
            if placed.contains(name) {
                break;
            }
            if chain.contains(&name) {
                let mut path: Vec<String> = chain.iter().map(|s| s.to_string()).collect();
                path.push(name.to_string());
                return Err(GraphError::Cycle { path });
            }
            chain.push(name);
            current = index
                .get(name)
                .and_then(|&pos| options.get(pos))
                .and_then(|o| o.depends_on.as_deref());
        }
        for name in chain.into_iter().rev() {
            placed.insert(name);
            order.push(name.to_string());
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OptionKind;

    fn item(label: &str, depends: &[&str]) -> OptionItem {
        OptionItem {
            label: label.to_string(),
            value: label.to_uppercase(),
            depends_array: if depends.is_empty() {
                None
            } else {
                Some(depends.iter().map(|s| s.to_string()).collect())
            },
        }
    }

    fn option(name: &str, default: &str, depends_on: Option<&str>, items: Vec<OptionItem>) -> OptionDef {
        OptionDef {
            name: name.to_string(),
            default: default.to_string(),
            kind: OptionKind::Nested,
            depends_on: depends_on.map(str::to_string),
            items,
            pre_hook: None,
            post_hook: None,
        }
    }

    fn arch_mode() -> Vec<OptionDef> {
        vec![
            option("arch", "x86", None, vec![item("x86", &[]), item("arm", &[])]),
            option(
                "mode",
                "fast",
                Some("arch"),
                vec![item("fast", &["x86"]), item("safe", &["arm", "x86"]), item("loose", &[])],
            ),
        ]
    }

    #[test]
    fn test_build_and_narrow() {
        let mut graph = DependencyGraph::build(arch_mode()).unwrap();
        assert_eq!(graph.dependents_of("arch"), &["mode".to_string()]);
        assert!(graph.dependents_of("mode").is_empty());

        // Before population every item is listed.
        assert_eq!(graph.valid_items("mode").len(), 3);

        let narrowed = graph.filter_items("mode", "x86");
        graph.set_valid("mode", narrowed);
        let labels: Vec<_> = graph.valid_items("mode").iter().map(|i| i.label.clone()).collect();
        // Items without a dependsArray are never valid for a dependent option.
        assert_eq!(labels, vec!["fast", "safe"]);
        assert!(graph.is_valid_choice("arch", "arm"));
        assert!(!graph.is_valid_choice("mode", "loose"));
    }

    #[test]
    fn test_filter_items_keeps_schema_order() {
        let graph = DependencyGraph::build(arch_mode()).unwrap();
        assert_eq!(graph.filter_items("mode", "arm"), vec![1]);
        assert_eq!(graph.filter_items("mode", "x86"), vec![0, 1]);
        assert!(graph.filter_items("mode", "mips").is_empty());
        assert!(graph.filter_items("missing", "x86").is_empty());
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let options = vec![option("mode", "a", Some("arch"), vec![item("a", &["x"])])];
        assert_eq!(
            DependencyGraph::build(options).unwrap_err(),
            GraphError::UnknownParent {
                option: "mode".to_string(),
                parent: "arch".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_default_is_rejected() {
        let options = vec![option("arch", "sparc", None, vec![item("x86", &[])])];
        assert!(matches!(
            DependencyGraph::build(options),
            Err(GraphError::UnknownDefault { .. })
        ));
    }

    #[test]
    fn test_duplicate_option_is_rejected() {
        let options = vec![
            option("arch", "x86", None, vec![item("x86", &[])]),
            option("arch", "x86", None, vec![item("x86", &[])]),
        ];
        assert!(matches!(
            DependencyGraph::build(options),
            Err(GraphError::DuplicateOption { .. })
        ));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let options = vec![
            option("a", "1", Some("c"), vec![item("1", &["1"])]),
            option("b", "1", Some("a"), vec![item("1", &["1"])]),
            option("c", "1", Some("b"), vec![item("1", &["1"])]),
        ];
        let err = DependencyGraph::build(options).unwrap_err();
        assert!(matches!(
            &err,
            GraphError::Cycle { path } if path.len() == 4 && path.first() == path.last()
        ));
    }

    #[test]
    fn test_topological_order_puts_parents_first() {
        let options = vec![
            option("leaf", "1", Some("mid"), vec![item("1", &["1"])]),
            option("mid", "1", Some("top"), vec![item("1", &["1"])]),
            option("top", "1", None, vec![item("1", &[])]),
        ];
        let graph = DependencyGraph::build(options).unwrap();
        assert_eq!(graph.topological_order(), &["top", "mid", "leaf"]);
    }
}
