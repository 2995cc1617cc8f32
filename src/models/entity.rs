//! Entity types exposed by the Alasco API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of entity types fetched into tables.
///
/// Variants are declared in fetch order; `Ord` follows that order so
/// collections keyed by `EntityType` iterate parents before children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Properties,
    Projects,
    /// Cost types, called contract units by the API.
    ContractUnits,
    Contracts,
    Contractors,
    /// Legal entities that place contracts; not part of the property chain.
    ContractingEntities,
    Invoices,
    ChangeOrders,
    Documents,
}

impl EntityType {
    /// All entity types in fetch order.
    pub const ALL: [EntityType; 8] = [
        EntityType::Properties,
        EntityType::Projects,
        EntityType::ContractUnits,
        EntityType::Contracts,
        EntityType::Contractors,
        EntityType::Invoices,
        EntityType::ChangeOrders,
        EntityType::Documents,
    ];

    /// Entity types with a list endpoint that are not linked to a property,
    /// and so not fetched by `get_all_df`.
    pub const STANDALONE: [EntityType; 1] = [EntityType::ContractingEntities];

    /// Every entity type, fetched by `get_all_df` or not.
    pub fn all() -> impl Iterator<Item = EntityType> {
        Self::ALL.into_iter().chain(Self::STANDALONE)
    }

    /// Table name, also the path segment of the list endpoint.
    pub fn name(self) -> &'static str {
        match self {
            Self::Properties => "properties",
            Self::Projects => "projects",
            Self::ContractUnits => "contract_units",
            Self::Contracts => "contracts",
            Self::Contractors => "contractors",
            Self::ContractingEntities => "contracting_entities",
            Self::Invoices => "invoices",
            Self::ChangeOrders => "change_orders",
            Self::Documents => "documents",
        }
    }

    /// List endpoint, relative to the API base URL.
    ///
    /// Documents have no global listing; they hang off their parents
    /// (see [`DocumentParent::documents_endpoint`](crate::DocumentParent::documents_endpoint)).
    pub fn endpoint(self) -> Option<String> {
        match self {
            Self::Documents => None,
            other => Some(format!("{}/", other.name())),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::all()
            .find(|e| e.name() == normalized)
            .ok_or_else(|| format!("unknown entity type '{s}'"))
    }
}
