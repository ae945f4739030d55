//! Foreign key dependency ordering for bulk generation
//!
//! Tables are ordered so that every referenced table is created before the tables referencing
//! it. Self-references and references to tables outside the set are ignored.

use log::warn;
use std::collections::{BTreeMap, BTreeSet};

/// A table and the tables its foreign keys reference
#[derive(Debug, Clone)]
pub struct TableDependencies {
    pub name: String,
    pub references: Vec<String>,
}

/// Sort tables dependencies-first; ties break alphabetically
///
/// Tables caught in a reference cycle cannot be ordered; they are appended alphabetically after
/// everything else and reported with a warning.
pub fn dependency_order(tables: &[TableDependencies]) -> Vec<String> {
    let names: BTreeSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();

    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for table in tables {
        let deps: BTreeSet<&str> = table
            .references
            .iter()
            .map(String::as_str)
            .filter(|dep| *dep != table.name && names.contains(dep))
            .collect();
        in_degree.insert(table.name.as_str(), deps.len());
        for dep in deps {
            dependents.entry(dep).or_default().push(table.name.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut ordered = Vec::with_capacity(tables.len());

    while let Some(current) = ready.pop_first() {
        ordered.push(current.to_string());
        for dependent in dependents.get(current).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if ordered.len() != in_degree.len() {
        let cyclic: Vec<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(name, _)| *name)
            .collect();
        warn!(
            "circular foreign key references between {}; generating them alphabetically",
            cyclic.join(", ")
        );
        ordered.extend(cyclic.into_iter().map(str::to_string));
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, references: &[&str]) -> TableDependencies {
        TableDependencies {
            name: name.to_string(),
            references: references.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_dependencies_first() {
        let tables = vec![
            table("order_items", &["orders", "products"]),
            table("orders", &["users"]),
            table("users", &[]),
            table("products", &[]),
        ];
        assert_eq!(
            dependency_order(&tables),
            vec!["products", "users", "orders", "order_items"]
        );
    }

    #[test]
    fn test_self_and_external_references_are_ignored() {
        let tables = vec![
            table("categories", &["categories"]),
            table("posts", &["categories", "users"]),
        ];
        assert_eq!(dependency_order(&tables), vec!["categories", "posts"]);
    }

    #[test]
    fn test_cycles_fall_back_to_alphabetical() {
        let tables = vec![
            table("b", &["a"]),
            table("a", &["b"]),
            table("c", &[]),
        ];
        assert_eq!(dependency_order(&tables), vec!["c", "a", "b"]);
    }
}
