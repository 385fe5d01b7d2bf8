//! Catalog data shapes: source bindings, ownership, node lifecycle.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use waypost_core::canonical_json;

/// Hex characters kept from the binding digest.
const FINGERPRINT_LEN: usize = 16;

/// Supported data source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Snowflake warehouse.
    Snowflake,
    /// Oracle database.
    Oracle,
    /// REST endpoint.
    Rest,
    /// Static files served from a base path.
    Static,
    /// Excel workbooks.
    Excel,
    /// OpenSearch cluster.
    Opensearch,
    /// Bloomberg terminal/API.
    Bloomberg,
    /// Refinitiv (Eikon/RDP).
    Refinitiv,
    /// Plain files.
    File,
}

impl SourceType {
    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Snowflake => "snowflake",
            Self::Oracle => "oracle",
            Self::Rest => "rest",
            Self::Static => "static",
            Self::Excel => "excel",
            Self::Opensearch => "opensearch",
            Self::Bloomberg => "bloomberg",
            Self::Refinitiv => "refinitiv",
            Self::File => "file",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Binding to an actual data source: where and how clients fetch.
///
/// `config` is an opaque mapping of connection attributes plus a `query`
/// template; unknown keys are preserved so newer catalog files keep
/// loading on older services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBinding {
    /// The kind of source this binding points at.
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Connection attributes and query template.
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    /// Operation tags permitted against this source (e.g. `READ`).
    /// Empty means unrestricted.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub allowed_operations: BTreeSet<String>,
    /// Optional column descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
    /// Whether the source is read-only. Exposed to clients, not enforced
    /// at resolve time.
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

const fn default_read_only() -> bool {
    true
}

/// Serialization view hashed into the fingerprint. Field order is
/// irrelevant: canonical JSON sorts keys.
#[derive(Serialize)]
struct FingerprintView<'a> {
    source_type: &'a SourceType,
    config: &'a serde_json::Map<String, serde_json::Value>,
    allowed_operations: &'a BTreeSet<String>,
    schema: &'a Option<serde_json::Value>,
    read_only: bool,
}

impl SourceBinding {
    /// Creates a binding with the given type and config.
    #[must_use]
    pub fn new(source_type: SourceType, config: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            source_type,
            config,
            allowed_operations: BTreeSet::new(),
            schema: None,
            read_only: true,
        }
    }

    /// Returns the `query` template from the config, when present.
    #[must_use]
    pub fn query_template(&self) -> Option<&str> {
        self.config.get("query").and_then(serde_json::Value::as_str)
    }

    /// Stable 16-hex-char contract fingerprint.
    ///
    /// Computed as a SHA-256 prefix over the canonical JSON of
    /// `source_type`, `config`, `allowed_operations`, `schema` and
    /// `read_only`. Two bindings with equal fingerprints are
    /// contract-equivalent; any field change flips it.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let view = FingerprintView {
            source_type: &self.source_type,
            config: &self.config,
            allowed_operations: &self.allowed_operations,
            schema: &self.schema,
            read_only: self.read_only,
        };
        // Plain data serialization; the fallback is unreachable in practice.
        let canonical = canonical_json::to_canonical_string(&view)
            .unwrap_or_else(|_| format!("{}:{:?}", self.source_type, self.config));
        let digest = Sha256::digest(canonical.as_bytes());
        hex::encode(digest)[..FINGERPRINT_LEN].to_string()
    }
}

/// Per-node governance roles. Any field may be absent and is then
/// inherited from the nearest ancestor that sets it, field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    /// Executive accountable for the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accountable_owner: Option<String>,
    /// Technical SME for the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_specialist: Option<String>,
    /// Channel to ask for help.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_channel: Option<String>,
    /// Accountable data owner/principal (formal governance role).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adop: Option<String>,
    /// Accountable data steward (formal governance role).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ads: Option<String>,
}

impl Ownership {
    /// Returns true when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accountable_owner.is_none()
            && self.data_specialist.is_none()
            && self.support_channel.is_none()
            && self.adop.is_none()
            && self.ads.is_none()
    }
}

/// Ownership resolved through the hierarchy, with per-field provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOwnership {
    /// Effective accountable owner.
    pub accountable_owner: Option<String>,
    /// Path where the accountable owner was defined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accountable_owner_defined_at: Option<String>,
    /// Effective data specialist.
    pub data_specialist: Option<String>,
    /// Path where the data specialist was defined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_specialist_defined_at: Option<String>,
    /// Effective support channel.
    pub support_channel: Option<String>,
    /// Path where the support channel was defined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_channel_defined_at: Option<String>,
    /// Effective ADOP role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adop: Option<String>,
    /// Path where the ADOP role was defined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adop_defined_at: Option<String>,
    /// Effective ADS role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ads: Option<String>,
    /// Path where the ADS role was defined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ads_defined_at: Option<String>,
}

impl ResolvedOwnership {
    /// Overlays `ownership` defined at `path`, keeping the deepest
    /// definition for each field. Call in root-to-leaf order.
    pub(crate) fn apply(&mut self, path: &str, ownership: &Ownership) {
        if let Some(v) = &ownership.accountable_owner {
            self.accountable_owner = Some(v.clone());
            self.accountable_owner_defined_at = Some(path.to_string());
        }
        if let Some(v) = &ownership.data_specialist {
            self.data_specialist = Some(v.clone());
            self.data_specialist_defined_at = Some(path.to_string());
        }
        if let Some(v) = &ownership.support_channel {
            self.support_channel = Some(v.clone());
            self.support_channel_defined_at = Some(path.to_string());
        }
        if let Some(v) = &ownership.adop {
            self.adop = Some(v.clone());
            self.adop_defined_at = Some(path.to_string());
        }
        if let Some(v) = &ownership.ads {
            self.ads = Some(v.clone());
            self.ads_defined_at = Some(path.to_string());
        }
    }
}

/// Lifecycle status of a catalog node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    /// Proposed, not yet resolvable.
    #[serde(alias = "draft")]
    Draft,
    /// Live and resolvable.
    #[serde(alias = "active")]
    Active,
    /// Still resolvable, flagged for migration.
    #[serde(alias = "deprecated")]
    Deprecated,
    /// Retired; no longer donates bindings.
    #[serde(alias = "archived")]
    Archived,
}

impl NodeStatus {
    /// Returns true when the lifecycle state machine permits moving to
    /// `next`.
    ///
    /// Allowed: DRAFT→ACTIVE, ACTIVE→DEPRECATED, DEPRECATED→ARCHIVED,
    /// and ACTIVE→ARCHIVED for emergency retirement.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Active)
                | (Self::Active, Self::Deprecated)
                | (Self::Deprecated, Self::Archived)
                | (Self::Active, Self::Archived)
        )
    }

    /// Returns true when the node may donate its binding to lookups.
    /// DRAFT and ARCHIVED nodes are skipped during the upward walk.
    #[must_use]
    pub const fn donates_binding(self) -> bool {
        matches!(self, Self::Active | Self::Deprecated)
    }

    /// Returns the uppercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Deprecated => "DEPRECATED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "DEPRECATED" => Ok(Self::Deprecated),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(format!("unknown node status '{other}'")),
        }
    }
}

/// Documentation links attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Documentation {
    /// Business glossary entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary_url: Option<String>,
    /// Operational runbook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_url: Option<String>,
}

/// A node in the catalog hierarchy.
///
/// Nodes carry identity, lifecycle, ownership and (optionally) a source
/// binding. Branch nodes without a binding inherit one from the nearest
/// ancestor at resolve time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogNode {
    /// Unique key: dot-and-slash path mirroring the moniker grammar
    /// (e.g. `prices.equity/AAPL`).
    pub path: String,
    /// Human-readable name; defaults to the final path segment.
    #[serde(default)]
    pub display_name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Searchable tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Machine-oriented semantic tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub semantic_tags: Vec<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: NodeStatus,
    /// Message shown to callers of a deprecated node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
    /// Replacement path for deprecated nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successor: Option<String>,
    /// Date after which a deprecated node is expected to be archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset_deadline: Option<NaiveDate>,
    /// Migration instructions for callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_guide_url: Option<String>,
    /// Governance roles; may be partial, inherited field by field.
    #[serde(default, skip_serializing_if = "Ownership::is_empty")]
    pub ownership: Ownership,
    /// How to fetch the data, when this node defines it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_binding: Option<SourceBinding>,
    /// Documentation links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<Documentation>,
}

impl CatalogNode {
    /// Creates an ACTIVE node at `path` with defaults everywhere else.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let display_name = path
            .rsplit(['/', '.'])
            .next()
            .unwrap_or(path.as_str())
            .to_string();
        Self {
            path,
            display_name,
            description: String::new(),
            tags: Vec::new(),
            semantic_tags: Vec::new(),
            status: NodeStatus::Active,
            deprecation_message: None,
            successor: None,
            sunset_deadline: None,
            migration_guide_url: None,
            ownership: Ownership::default(),
            source_binding: None,
            documentation: None,
        }
    }

    /// Sets the lifecycle status.
    #[must_use]
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the source binding.
    #[must_use]
    pub fn with_binding(mut self, binding: SourceBinding) -> Self {
        self.source_binding = Some(binding);
        self
    }

    /// Sets the ownership roles.
    #[must_use]
    pub fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    /// Sets the successor path.
    #[must_use]
    pub fn with_successor(mut self, successor: impl Into<String>) -> Self {
        self.successor = Some(successor.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding() -> SourceBinding {
        let config = json!({
            "account": "acme.eu-west-1",
            "database": "MARKET",
            "query": "SELECT * FROM prices WHERE {filter[0]:symbol}",
        });
        let serde_json::Value::Object(config) = config else {
            unreachable!()
        };
        SourceBinding::new(SourceType::Snowflake, config)
    }

    #[test]
    fn fingerprint_is_16_hex_chars() {
        let fp = binding().fingerprint();
        assert_eq!(fp.len(), 16);
        assert!(fp.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_ignores_key_order() {
        let mut reordered = serde_json::Map::new();
        reordered.insert("query".into(), json!("SELECT * FROM prices WHERE {filter[0]:symbol}"));
        reordered.insert("database".into(), json!("MARKET"));
        reordered.insert("account".into(), json!("acme.eu-west-1"));
        let other = SourceBinding::new(SourceType::Snowflake, reordered);
        assert_eq!(binding().fingerprint(), other.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_every_contract_field() {
        let base = binding();
        let base_fp = base.fingerprint();

        let mut changed = base.clone();
        changed.source_type = SourceType::Oracle;
        assert_ne!(changed.fingerprint(), base_fp);

        let mut changed = base.clone();
        changed.config.insert("role".into(), json!("READER"));
        assert_ne!(changed.fingerprint(), base_fp);

        let mut changed = base.clone();
        changed.allowed_operations.insert("READ".into());
        assert_ne!(changed.fingerprint(), base_fp);

        let mut changed = base.clone();
        changed.schema = Some(json!([{"name": "symbol", "type": "string"}]));
        assert_ne!(changed.fingerprint(), base_fp);

        let mut changed = base.clone();
        changed.read_only = false;
        assert_ne!(changed.fingerprint(), base_fp);
    }

    #[test]
    fn status_state_machine() {
        use NodeStatus::{Active, Archived, Deprecated, Draft};
        assert!(Draft.can_transition_to(Active));
        assert!(Active.can_transition_to(Deprecated));
        assert!(Deprecated.can_transition_to(Archived));
        assert!(Active.can_transition_to(Archived));

        assert!(!Active.can_transition_to(Draft));
        assert!(!Archived.can_transition_to(Active));
        assert!(!Deprecated.can_transition_to(Active));
        assert!(!Draft.can_transition_to(Deprecated));
        assert!(!Draft.can_transition_to(Draft));
    }

    #[test]
    fn status_accepts_lowercase_aliases() {
        let status: NodeStatus = serde_json::from_str("\"deprecated\"").unwrap();
        assert_eq!(status, NodeStatus::Deprecated);
        let status: NodeStatus = serde_json::from_str("\"DEPRECATED\"").unwrap();
        assert_eq!(status, NodeStatus::Deprecated);
    }

    #[test]
    fn node_display_name_defaults_to_leaf() {
        assert_eq!(CatalogNode::new("prices.equity/AAPL").display_name, "AAPL");
        assert_eq!(CatalogNode::new("prices.equity").display_name, "equity");
        assert_eq!(CatalogNode::new("prices").display_name, "prices");
    }
}
