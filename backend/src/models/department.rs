use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DepartmentId;
use crate::paging::{any_field_contains, Pageable, SortValue, EMPTY_GROUP_KEY};

crate::define_code_enum!(
    /// Level in the Category → Specialty → Subspecialty hierarchy.
    DepartmentKind {
        Category => "category",
        Specialty => "specialty",
        Subspecialty => "subspecialty",
    }
);

impl DepartmentKind {
    /// Kind the parent must have; `None` means the department is a root.
    pub fn expected_parent(&self) -> Option<DepartmentKind> {
        match self {
            DepartmentKind::Category => None,
            DepartmentKind::Specialty => Some(DepartmentKind::Category),
            DepartmentKind::Subspecialty => Some(DepartmentKind::Specialty),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub kind: DepartmentKind,
    pub parent_id: Option<DepartmentId>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInput {
    pub name: String,
    pub kind: DepartmentKind,
    #[serde(default)]
    pub parent_id: Option<DepartmentId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl DepartmentInput {
    pub fn cleaned(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            kind: self.kind,
            parent_id: self.parent_id,
            description: super::clean_opt(&self.description),
            is_active: self.is_active,
        }
    }
}

/// Department with its active descendants, for tree views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentNode {
    #[serde(flatten)]
    pub department: Department,
    pub children: Vec<DepartmentNode>,
}

/// Build the forest of active departments, roots and children ordered by name.
pub fn build_department_tree(departments: &[Department]) -> Vec<DepartmentNode> {
    fn children_of(parent: Option<DepartmentId>, all: &[Department]) -> Vec<DepartmentNode> {
        let mut nodes: Vec<DepartmentNode> = all
            .iter()
            .filter(|d| d.is_active && d.parent_id == parent)
            .map(|d| DepartmentNode {
                department: d.clone(),
                children: children_of(Some(d.id), all),
            })
            .collect();
        nodes.sort_by(|a, b| {
            a.department
                .name
                .to_lowercase()
                .cmp(&b.department.name.to_lowercase())
        });
        nodes
    }

    children_of(None, departments)
}

impl Pageable for Department {
    const SORT_COLUMNS: &'static [&'static str] = &["id", "name", "kind", "parentId"];
    const GROUP_COLUMNS: &'static [&'static str] = &["kind", "parentId"];

    fn record_id(&self) -> i64 {
        self.id.value()
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn matches_search(&self, needle: &str) -> bool {
        any_field_contains(&[Some(self.name.as_str()), self.description.as_deref()], needle)
    }

    fn sort_value(&self, column: &str) -> Option<SortValue> {
        Some(match column {
            "id" => SortValue::Int(self.id.value()),
            "name" => SortValue::text(&self.name),
            "kind" => SortValue::text(self.kind.as_str()),
            "parentId" => self
                .parent_id
                .map(|p| SortValue::Int(p.value()))
                .unwrap_or(SortValue::Missing),
            _ => return None,
        })
    }

    fn group_key(&self, column: &str) -> Option<String> {
        match column {
            "kind" => Some(self.kind.as_str().to_string()),
            "parentId" => Some(
                self.parent_id
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| EMPTY_GROUP_KEY.to_string()),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept(id: i64, name: &str, kind: DepartmentKind, parent: Option<i64>) -> Department {
        Department {
            id: DepartmentId(id),
            name: name.to_string(),
            kind,
            parent_id: parent.map(DepartmentId),
            description: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_expected_parent() {
        assert_eq!(DepartmentKind::Category.expected_parent(), None);
        assert_eq!(
            DepartmentKind::Subspecialty.expected_parent(),
            Some(DepartmentKind::Specialty)
        );
    }

    #[test]
    fn test_build_tree() {
        let mut inactive = dept(5, "Old", DepartmentKind::Specialty, Some(1));
        inactive.is_active = false;
        let all = vec![
            dept(1, "Medical", DepartmentKind::Category, None),
            dept(2, "Surgical", DepartmentKind::Category, None),
            dept(3, "Cardiology", DepartmentKind::Specialty, Some(1)),
            dept(4, "Interventional", DepartmentKind::Subspecialty, Some(3)),
            inactive,
        ];

        let tree = build_department_tree(&all);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].department.name, "Medical");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children[0].department.id, DepartmentId(4));
    }

    #[test]
    fn test_node_serializes_flat() {
        let node = DepartmentNode {
            department: dept(1, "Medical", DepartmentKind::Category, None),
            children: vec![],
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["name"], "Medical");
        assert_eq!(json["kind"], "category");
        assert!(json["children"].as_array().unwrap().is_empty());
    }
}
