//! Advanced filters
//!
//! A filter is a tree: groups combine their children with AND or OR, leaves
//! compare one field of an item against a value. The editor addresses nodes
//! by path, the child indices walked from the root group.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

mod library;

pub use library::{FilterLibrary, SavedFilter};

/// Anything the filter tree can be evaluated against
pub trait Filterable {
    /// Value of a named field, if the item has it
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;
}

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("no filter node at path {0:?}")]
    InvalidPath(Vec<usize>),

    #[error("node at path {0:?} is not a group")]
    NotAGroup(Vec<usize>),

    #[error("node at path {0:?} is not a condition")]
    NotACondition(Vec<usize>),

    #[error("the root group cannot be removed")]
    RootRemoval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    GreaterThan,
    LessThan,
    Exists,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 7] = [
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::Contains,
        FilterOperator::StartsWith,
        FilterOperator::GreaterThan,
        FilterOperator::LessThan,
        FilterOperator::Exists,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not equals",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "starts with",
            FilterOperator::GreaterThan => ">",
            FilterOperator::LessThan => "<",
            FilterOperator::Exists => "exists",
        }
    }

    /// Whether the operator ignores the comparison value
    pub fn is_unary(self) -> bool {
        matches!(self, FilterOperator::Exists)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn matches(&self, item: &impl Filterable) -> bool {
        let Some(actual) = item.field(&self.field) else {
            // Missing fields only satisfy a negative comparison
            return self.operator == FilterOperator::NotEquals;
        };

        let actual = actual.trim().to_lowercase();
        let expected = self.value.trim().to_lowercase();

        match self.operator {
            FilterOperator::Equals => actual == expected,
            FilterOperator::NotEquals => actual != expected,
            FilterOperator::Contains => actual.contains(&expected),
            FilterOperator::StartsWith => actual.starts_with(&expected),
            FilterOperator::GreaterThan => compare(&actual, &expected) == Ordering::Greater,
            FilterOperator::LessThan => compare(&actual, &expected) == Ordering::Less,
            FilterOperator::Exists => !actual.is_empty(),
        }
    }
}

/// Numeric when both sides parse as numbers, lexical otherwise
fn compare(actual: &str, expected: &str) -> Ordering {
    match (actual.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => actual.cmp(expected),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub negated: bool,
    #[serde(default)]
    pub children: Vec<FilterNode>,
}

impl FilterGroup {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            id: Uuid::new_v4(),
            combinator,
            negated: false,
            children: Vec::new(),
        }
    }

    /// An empty group matches everything
    pub fn matches(&self, item: &impl Filterable) -> bool {
        let result = if self.children.is_empty() {
            true
        } else {
            match self.combinator {
                Combinator::And => self.children.iter().all(|child| child.matches(item)),
                Combinator::Or => self.children.iter().any(|child| child.matches(item)),
            }
        };
        result != self.negated
    }

    /// Number of conditions anywhere below this group
    pub fn condition_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                FilterNode::Condition(_) => 1,
                FilterNode::Group(group) => group.condition_count(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.condition_count() == 0
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&FilterNode> {
        let (first, rest) = path.split_first()?;
        let child = self.children.get(*first)?;
        if rest.is_empty() {
            Some(child)
        } else {
            match child {
                FilterNode::Group(group) => group.node_at(rest),
                FilterNode::Condition(_) => None,
            }
        }
    }

    fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut FilterNode> {
        let (first, rest) = path.split_first()?;
        let child = self.children.get_mut(*first)?;
        if rest.is_empty() {
            Some(child)
        } else {
            match child {
                FilterNode::Group(group) => group.node_at_mut(rest),
                FilterNode::Condition(_) => None,
            }
        }
    }

    /// The group at `path`; the empty path is this group
    pub fn group_at_mut(&mut self, path: &[usize]) -> Result<&mut FilterGroup, FilterError> {
        if path.is_empty() {
            return Ok(self);
        }
        match self.node_at_mut(path) {
            Some(FilterNode::Group(group)) => Ok(group),
            Some(FilterNode::Condition(_)) => Err(FilterError::NotAGroup(path.to_vec())),
            None => Err(FilterError::InvalidPath(path.to_vec())),
        }
    }

    /// Append a condition to the group at `group_path`. Returns the new node's path.
    pub fn add_condition(
        &mut self,
        group_path: &[usize],
        condition: FilterCondition,
    ) -> Result<Vec<usize>, FilterError> {
        self.push_child(group_path, FilterNode::Condition(condition))
    }

    /// Append an empty subgroup to the group at `group_path`. Returns its path.
    pub fn add_group(
        &mut self,
        group_path: &[usize],
        combinator: Combinator,
    ) -> Result<Vec<usize>, FilterError> {
        self.push_child(group_path, FilterNode::Group(FilterGroup::new(combinator)))
    }

    fn push_child(&mut self, group_path: &[usize], node: FilterNode) -> Result<Vec<usize>, FilterError> {
        let group = self.group_at_mut(group_path)?;
        group.children.push(node);
        let mut path = group_path.to_vec();
        path.push(group.children.len() - 1);
        Ok(path)
    }

    /// Remove the node at `path` and return it
    pub fn remove(&mut self, path: &[usize]) -> Result<FilterNode, FilterError> {
        let Some((last, parent_path)) = path.split_last() else {
            return Err(FilterError::RootRemoval);
        };
        let parent = self
            .group_at_mut(parent_path)
            .map_err(|_| FilterError::InvalidPath(path.to_vec()))?;
        if *last >= parent.children.len() {
            return Err(FilterError::InvalidPath(path.to_vec()));
        }
        Ok(parent.children.remove(*last))
    }

    /// Replace the condition at `path`
    pub fn update_condition(
        &mut self,
        path: &[usize],
        condition: FilterCondition,
    ) -> Result<(), FilterError> {
        match self.node_at_mut(path) {
            Some(FilterNode::Condition(existing)) => {
                *existing = condition;
                Ok(())
            }
            Some(FilterNode::Group(_)) => Err(FilterError::NotACondition(path.to_vec())),
            None => Err(FilterError::InvalidPath(path.to_vec())),
        }
    }

    pub fn set_combinator(&mut self, group_path: &[usize], combinator: Combinator) -> Result<(), FilterError> {
        self.group_at_mut(group_path)?.combinator = combinator;
        Ok(())
    }

    pub fn set_negated(&mut self, group_path: &[usize], negated: bool) -> Result<(), FilterError> {
        self.group_at_mut(group_path)?.negated = negated;
        Ok(())
    }
}

impl Default for FilterGroup {
    fn default() -> Self {
        Self::new(Combinator::And)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterNode {
    Condition(FilterCondition),
    Group(FilterGroup),
}

impl FilterNode {
    pub fn matches(&self, item: &impl Filterable) -> bool {
        match self {
            FilterNode::Condition(condition) => condition.matches(item),
            FilterNode::Group(group) => group.matches(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Item(HashMap<&'static str, &'static str>);

    impl Filterable for Item {
        fn field(&self, name: &str) -> Option<Cow<'_, str>> {
            self.0.get(name).map(|v| Cow::Borrowed(*v))
        }
    }

    fn item(fields: &[(&'static str, &'static str)]) -> Item {
        Item(fields.iter().copied().collect())
    }

    #[test]
    fn test_condition_operators() {
        let person = item(&[("name", "Ada Lovelace"), ("age", "36"), ("kind", "person")]);

        assert!(FilterCondition::new("kind", FilterOperator::Equals, "PERSON").matches(&person));
        assert!(FilterCondition::new("name", FilterOperator::Contains, "love").matches(&person));
        assert!(FilterCondition::new("name", FilterOperator::StartsWith, "ada").matches(&person));
        assert!(FilterCondition::new("age", FilterOperator::GreaterThan, "9").matches(&person));
        assert!(FilterCondition::new("age", FilterOperator::LessThan, "100").matches(&person));
        assert!(FilterCondition::new("age", FilterOperator::Exists, "").matches(&person));
        assert!(!FilterCondition::new("email", FilterOperator::Exists, "").matches(&person));
        assert!(FilterCondition::new("email", FilterOperator::NotEquals, "x").matches(&person));
    }

    #[test]
    fn test_empty_group_matches_everything() {
        let root = FilterGroup::default();
        assert!(root.matches(&item(&[])));
        assert!(root.is_empty());
    }

    #[test]
    fn test_nested_groups() {
        // kind = person AND (name contains "ada" OR name contains "grace")
        let mut root = FilterGroup::new(Combinator::And);
        root.add_condition(&[], FilterCondition::new("kind", FilterOperator::Equals, "person"))
            .unwrap();
        let sub = root.add_group(&[], Combinator::Or).unwrap();
        assert_eq!(sub, vec![1]);
        root.add_condition(&sub, FilterCondition::new("name", FilterOperator::Contains, "ada"))
            .unwrap();
        root.add_condition(&sub, FilterCondition::new("name", FilterOperator::Contains, "grace"))
            .unwrap();

        assert_eq!(root.condition_count(), 3);
        assert!(root.matches(&item(&[("kind", "person"), ("name", "Grace Hopper")])));
        assert!(!root.matches(&item(&[("kind", "person"), ("name", "Alan Turing")])));
        assert!(!root.matches(&item(&[("kind", "org"), ("name", "Ada Corp")])));

        root.set_negated(&sub, true).unwrap();
        assert!(root.matches(&item(&[("kind", "person"), ("name", "Alan Turing")])));
    }

    #[test]
    fn test_path_editing() {
        let mut root = FilterGroup::default();
        let cond = root
            .add_condition(&[], FilterCondition::new("a", FilterOperator::Equals, "1"))
            .unwrap();

        assert_eq!(
            root.add_condition(&cond, FilterCondition::new("b", FilterOperator::Equals, "2")),
            Err(FilterError::NotAGroup(vec![0]))
        );
        assert_eq!(
            root.update_condition(&[3], FilterCondition::new("b", FilterOperator::Equals, "2")),
            Err(FilterError::InvalidPath(vec![3]))
        );

        root.update_condition(&cond, FilterCondition::new("a", FilterOperator::Equals, "2"))
            .unwrap();
        match root.node_at(&cond) {
            Some(FilterNode::Condition(c)) => assert_eq!(c.value, "2"),
            other => panic!("unexpected node {:?}", other),
        }

        assert_eq!(root.remove(&[]), Err(FilterError::RootRemoval));
        assert_eq!(root.remove(&[5]), Err(FilterError::InvalidPath(vec![5])));
        assert!(root.remove(&cond).is_ok());
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_tree_serializes_with_type_tags() {
        let mut root = FilterGroup::new(Combinator::Or);
        root.add_condition(&[], FilterCondition::new("kind", FilterOperator::StartsWith, "p"))
            .unwrap();
        let json = serde_json::to_value(FilterNode::Group(root.clone())).unwrap();
        assert_eq!(json["type"], "group");
        assert_eq!(json["combinator"], "or");
        assert_eq!(json["children"][0]["type"], "condition");
        assert_eq!(json["children"][0]["operator"], "startsWith");

        let back: FilterNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, FilterNode::Group(root));
    }
}
