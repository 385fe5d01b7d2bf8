//! Catalog definition file loader.
//!
//! The catalog is defined in a YAML mapping from path to node
//! attributes:
//!
//! ```yaml
//! prices:
//!   ownership:
//!     accountable_owner: prices-governance@firm.com
//! prices.equity:
//!   display_name: Equity prices
//!   source_binding:
//!     type: snowflake
//!     config:
//!       account: acme.eu-west-1
//!       query: "SELECT * FROM prices WHERE {filter[0]:symbol}"
//! rates.libor/usd:
//!   status: deprecated
//!   successor: rates.sofr/usd
//! ```
//!
//! Unknown keys inside `source_binding.config` are preserved verbatim so
//! newer catalog files keep loading on older services.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CatalogError, Result};
use crate::types::{CatalogNode, Documentation, NodeStatus, Ownership, SourceBinding};

/// One node's attributes as they appear in the definition file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDef {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    ownership: Option<Ownership>,
    /// Formal governance roles may also sit at the top level of a node.
    #[serde(default)]
    adop: Option<String>,
    #[serde(default)]
    ads: Option<String>,
    #[serde(default)]
    status: Option<NodeStatus>,
    #[serde(default)]
    deprecation_message: Option<String>,
    #[serde(default)]
    successor: Option<String>,
    #[serde(default)]
    sunset_deadline: Option<chrono::NaiveDate>,
    #[serde(default)]
    migration_guide_url: Option<String>,
    #[serde(default)]
    source_binding: Option<SourceBinding>,
    #[serde(default)]
    documentation: Option<Documentation>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    semantic_tags: Vec<String>,
}

/// Parses a catalog definition from YAML text.
///
/// # Errors
///
/// Returns [`CatalogError::Definition`] when the YAML is malformed or a
/// node entry cannot be interpreted.
pub fn parse_catalog_yaml(text: &str) -> Result<Vec<CatalogNode>> {
    let defs: BTreeMap<String, NodeDef> = serde_yaml::from_str(text)
        .map_err(|e| CatalogError::definition(e.to_string()))?;

    let mut nodes = Vec::with_capacity(defs.len());
    for (path, def) in defs {
        if path.trim().is_empty() {
            return Err(CatalogError::definition("empty node path"));
        }
        nodes.push(node_from_def(path, def));
    }
    Ok(nodes)
}

/// Loads a catalog definition file.
///
/// # Errors
///
/// Returns [`CatalogError::Definition`] when the file cannot be read or
/// parsed.
pub fn load_catalog_file(path: &Path) -> Result<Vec<CatalogNode>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CatalogError::definition(format!("cannot read {}: {e}", path.display()))
    })?;
    let nodes = parse_catalog_yaml(&text)?;
    tracing::info!(
        file = %path.display(),
        nodes = nodes.len(),
        "catalog definition loaded"
    );
    Ok(nodes)
}

fn node_from_def(path: String, def: NodeDef) -> CatalogNode {
    let mut node = CatalogNode::new(path);
    if let Some(display_name) = def.display_name {
        node.display_name = display_name;
    }
    if let Some(description) = def.description {
        node.description = description;
    }
    if let Some(ownership) = def.ownership {
        node.ownership = ownership;
    }
    // Top-level role keys override the ownership block.
    if def.adop.is_some() {
        node.ownership.adop = def.adop;
    }
    if def.ads.is_some() {
        node.ownership.ads = def.ads;
    }
    if let Some(status) = def.status {
        node.status = status;
    }
    node.deprecation_message = def.deprecation_message;
    node.successor = def.successor;
    node.sunset_deadline = def.sunset_deadline;
    node.migration_guide_url = def.migration_guide_url;
    node.source_binding = def.source_binding;
    node.documentation = def.documentation;
    node.tags = def.tags;
    node.semantic_tags = def.semantic_tags;
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceType;
    use std::io::Write;

    const SAMPLE: &str = r#"
prices:
  ownership:
    accountable_owner: prices-governance@firm.com
prices.equity:
  display_name: Equity prices
  description: End-of-day equity prices
  tags: [prices, equity]
  adop: cdo@firm.com
  source_binding:
    type: snowflake
    config:
      account: acme.eu-west-1
      database: MARKET
      query: "SELECT s,p FROM E WHERE {filter[0]:symbol} AND trade_date = {version_date}"
      custom_future_knob: 42
    read_only: true
rates.libor/usd:
  status: deprecated
  deprecation_message: LIBOR has ceased
  successor: rates.sofr/usd
  sunset_deadline: 2026-06-30
  source_binding:
    type: snowflake
    config:
      query: "SELECT * FROM libor"
rates.sofr/usd:
  source_binding:
    type: snowflake
    config:
      query: "SELECT * FROM sofr"
  documentation:
    glossary_url: https://wiki/glossary/sofr
    runbook_url: https://wiki/runbooks/sofr
"#;

    #[test]
    fn parses_nodes_with_bindings_and_status() {
        let nodes = parse_catalog_yaml(SAMPLE).unwrap();
        assert_eq!(nodes.len(), 4);

        let equity = nodes.iter().find(|n| n.path == "prices.equity").unwrap();
        assert_eq!(equity.display_name, "Equity prices");
        assert_eq!(equity.status, NodeStatus::Active);
        assert_eq!(equity.ownership.adop.as_deref(), Some("cdo@firm.com"));
        let binding = equity.source_binding.as_ref().unwrap();
        assert_eq!(binding.source_type, SourceType::Snowflake);
        assert!(binding.query_template().unwrap().contains("{version_date}"));
        // Unknown config keys survive the round trip.
        assert_eq!(
            binding.config.get("custom_future_knob"),
            Some(&serde_json::json!(42))
        );

        let libor = nodes.iter().find(|n| n.path == "rates.libor/usd").unwrap();
        assert_eq!(libor.status, NodeStatus::Deprecated);
        assert_eq!(libor.successor.as_deref(), Some("rates.sofr/usd"));
        assert_eq!(
            libor.sunset_deadline,
            chrono::NaiveDate::from_ymd_opt(2026, 6, 30)
        );
    }

    #[test]
    fn default_display_name_is_leaf_segment() {
        let nodes = parse_catalog_yaml("prices.equity:\n  description: x\n").unwrap();
        assert_eq!(nodes[0].display_name, "equity");
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(matches!(
            parse_catalog_yaml("prices: [not-a-mapping"),
            Err(CatalogError::Definition { .. })
        ));
    }

    #[test]
    fn rejects_unknown_node_keys() {
        let err = parse_catalog_yaml("prices:\n  not_a_field: 1\n").unwrap_err();
        assert!(matches!(err, CatalogError::Definition { .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let nodes = load_catalog_file(file.path()).unwrap();
        assert_eq!(nodes.len(), 4);
    }

    #[test]
    fn missing_file_is_a_definition_error() {
        let err = load_catalog_file(Path::new("/no/such/catalog.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::Definition { .. }));
    }
}
