//! Core types for the repository node model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Node kind as reported by the directory service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    Field,
    Element,
    Template,
    Instance,
}

impl NodeKind {
    /// Every kind the exporter recognizes, in listing-request order.
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Folder,
        NodeKind::Field,
        NodeKind::Element,
        NodeKind::Template,
        NodeKind::Instance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::Field => "field",
            NodeKind::Element => "element",
            NodeKind::Template => "template",
            NodeKind::Instance => "instance",
        }
    }

    /// Resource kind for leaf kinds, `None` for folders.
    pub fn resource_kind(self) -> Option<ResourceKind> {
        match self {
            NodeKind::Folder => None,
            NodeKind::Field => Some(ResourceKind::Field),
            NodeKind::Element => Some(ResourceKind::Element),
            NodeKind::Template => Some(ResourceKind::Template),
            NodeKind::Instance => Some(ResourceKind::Instance),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf resource kinds. Each has content served by the content service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Field,
    Element,
    Template,
    Instance,
}

impl ResourceKind {
    pub fn node_kind(self) -> NodeKind {
        match self {
            ResourceKind::Field => NodeKind::Field,
            ResourceKind::Element => NodeKind::Element,
            ResourceKind::Template => NodeKind::Template,
            ResourceKind::Instance => NodeKind::Instance,
        }
    }

    /// Path prefix under the content service base URL.
    pub fn content_prefix(self) -> &'static str {
        match self {
            ResourceKind::Field => "template-fields",
            ResourceKind::Element => "template-elements",
            ResourceKind::Template => "templates",
            ResourceKind::Instance => "template-instances",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node_kind().as_str())
    }
}

/// Wire and descriptor form of a node.
///
/// Attributes the exporter does not interpret are kept in a sorted map so the
/// pretty-printed descriptor is byte-stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    pub node_type: NodeKind,
    pub name: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub kind: ResourceKind,
    pub attributes: BTreeMap<String, Value>,
}

/// A node observed in one listing call.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Folder(Folder),
    Resource(Resource),
}

impl Folder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.id.clone(),
            node_type: NodeKind::Folder,
            name: self.name.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            attributes: BTreeMap::new(),
        }
    }

    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.id.clone(),
            node_type: self.kind.node_kind(),
            name: self.name.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Folder(folder) => &folder.id,
            Node::Resource(resource) => &resource.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Folder(folder) => &folder.name,
            Node::Resource(resource) => &resource.name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Folder(_) => NodeKind::Folder,
            Node::Resource(resource) => resource.kind.node_kind(),
        }
    }

    pub fn to_record(&self) -> NodeRecord {
        match self {
            Node::Folder(folder) => folder.to_record(),
            Node::Resource(resource) => resource.to_record(),
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        let NodeRecord {
            id,
            node_type,
            name,
            attributes,
        } = record;
        match node_type.resource_kind() {
            None => Node::Folder(Folder {
                id,
                name,
                attributes,
            }),
            Some(kind) => Node::Resource(Resource {
                id,
                name,
                kind,
                attributes,
            }),
        }
    }
}
