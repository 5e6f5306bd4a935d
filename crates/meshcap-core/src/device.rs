//! Per-device fact snapshot.
//!
//! A [`DeviceSnapshot`] captures everything the enumeration flow has learned
//! about one device at one point in time: which endpoints exist, which
//! clusters each endpoint implements, and any product identity read from the
//! Basic cluster. The rule engine treats a snapshot as read-only input; a
//! fresh snapshot is built for every evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Node-level facts shared by all endpoints of a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFacts {
    /// Manufacturer code from the node descriptor.
    #[serde(default)]
    pub manufacturer_code: u16,
    /// Active endpoint ids reported by the device.
    #[serde(default)]
    pub endpoints: Vec<u8>,
}

/// Facts about a single endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointFacts {
    /// Application profile id.
    #[serde(default)]
    pub profile: u16,
    /// Device type within the profile.
    #[serde(default)]
    pub device_type: u16,
    /// Server (input) clusters implemented by the endpoint.
    #[serde(default)]
    pub in_clusters: Vec<u16>,
    /// Client (output) clusters implemented by the endpoint.
    #[serde(default)]
    pub out_clusters: Vec<u16>,
}

/// Product identity read from an endpoint's Basic cluster.
///
/// Not every device exposes this; rules guard product comparisons with the
/// `has_product` context field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFacts {
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Read-only fact snapshot for one device evaluation.
///
/// `self_endpoint` is the endpoint the evaluation is scoped to; expressions
/// that reference `endpoint.*` or `product.*` resolve against it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Endpoint under evaluation.
    pub self_endpoint: u8,
    /// Node-level facts.
    #[serde(default)]
    pub node: NodeFacts,
    /// Per-endpoint facts, keyed by endpoint id.
    #[serde(default)]
    pub endpoints: BTreeMap<u8, EndpointFacts>,
    /// Per-endpoint product identity, keyed by endpoint id.
    #[serde(default)]
    pub products: BTreeMap<u8, ProductFacts>,
}

impl DeviceSnapshot {
    /// Create a snapshot scoped to the given endpoint.
    pub fn new(self_endpoint: u8) -> Self {
        Self {
            self_endpoint,
            ..Default::default()
        }
    }

    /// Attach node-level facts.
    pub fn with_node(mut self, node: NodeFacts) -> Self {
        self.node = node;
        self
    }

    /// Attach facts for an endpoint.
    pub fn with_endpoint(mut self, id: u8, facts: EndpointFacts) -> Self {
        if !self.node.endpoints.contains(&id) {
            self.node.endpoints.push(id);
        }
        self.endpoints.insert(id, facts);
        self
    }

    /// Attach product identity for an endpoint.
    pub fn with_product(mut self, id: u8, product: ProductFacts) -> Self {
        self.products.insert(id, product);
        self
    }

    /// Facts for the endpoint under evaluation, if known.
    pub fn self_facts(&self) -> Option<&EndpointFacts> {
        self.endpoints.get(&self.self_endpoint)
    }

    /// Product identity for the endpoint under evaluation, if known.
    pub fn self_product(&self) -> Option<&ProductFacts> {
        self.products.get(&self.self_endpoint)
    }

    /// Whether any endpoint implements the given server cluster.
    pub fn has_in_cluster(&self, cluster: u16) -> bool {
        self.endpoints
            .values()
            .any(|ep| ep.in_clusters.contains(&cluster))
    }

    /// Whether any endpoint implements the given client cluster.
    pub fn has_out_cluster(&self, cluster: u16) -> bool {
        self.endpoints
            .values()
            .any(|ep| ep.out_clusters.contains(&cluster))
    }
}
