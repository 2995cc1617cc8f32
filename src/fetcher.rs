//! Fetching entity tables.
//!
//! [`DataFetcher`] runs the paginator and the flattener over the fixed set
//! of entity types. Everything is sequential: one entity type at a time,
//! one page at a time.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};

use crate::client::AlascoClient;
use crate::error::{AlascoError, Result};
use crate::models::{
    DocumentParent, EntityType, PARENT_ID_COLUMN, PARENT_TYPE_COLUMN, PROPERTY_ID_COLUMN,
};
use crate::pagination::{fetch_all, fetch_all_chunked, Filter, FilterOp, DEFAULT_CHUNK_SIZE};
use crate::table::{flatten, Table, Tables};

/// Reporting endpoint for contract units.
const REPORTING_ENDPOINT: &str = "reporting/contract_units";

/// The reporting endpoint accepts fewer ids per request.
const REPORTING_CHUNK_SIZE: usize = 10;

/// Fetches Alasco entities as tables.
///
/// # Example
///
/// ```no_run
/// use alasco::{AlascoClient, DataFetcher, EntityType};
///
/// # async fn example() -> alasco::Result<()> {
/// let fetcher = DataFetcher::new(AlascoClient::from_env()?);
/// let tables = fetcher.get_all_df(Some("Tower A")).await?;
/// if let Some(invoices) = tables.get(EntityType::Invoices) {
///     println!("{} invoices", invoices.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DataFetcher {
    client: AlascoClient,
}

impl DataFetcher {
    pub fn new(client: AlascoClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AlascoClient {
        &self.client
    }

    /// Fetch one entity type, optionally filtered.
    ///
    /// `in` filters with many values are split into several requests. An
    /// `in` filter without values matches nothing and sends no request.
    #[tracing::instrument(skip(self, filter))]
    pub async fn get_table(&self, entity: EntityType, filter: Option<&Filter>) -> Result<Table> {
        let Some(endpoint) = entity.endpoint() else {
            return Err(AlascoError::InvalidFilter(format!(
                "{entity} have no list endpoint, use get_documents"
            )));
        };

        let records = match filter {
            Some(f) if f.operation == FilterOp::In && f.values.is_empty() => {
                tracing::debug!("empty {} filter, skipping request", f.key());
                Ok(Vec::new())
            }
            Some(f) => fetch_all_chunked(&self.client, &endpoint, f, DEFAULT_CHUNK_SIZE).await,
            None => fetch_all(&self.client, &endpoint, None).await,
        }
        .map_err(|e| e.for_entity(entity))?;

        tracing::info!(records = records.len(), "fetched {entity}");
        Ok(flatten(&records))
    }

    /// Fetch properties whose name contains `name`, or all properties.
    pub async fn get_properties(&self, name: Option<&str>) -> Result<Table> {
        let filter = name.map(|n| Filter::contains("name", n));
        self.get_table(EntityType::Properties, filter.as_ref()).await
    }

    /// Look up the single property named exactly `name`.
    ///
    /// Returns a properties table containing just that property.
    ///
    /// # Errors
    ///
    /// Returns [`AlascoError::NotFound`] when no property or more than one
    /// property carries that name.
    pub async fn resolve_property(&self, name: &str) -> Result<Table> {
        let candidates = self.get_properties(Some(name)).await?;
        let matches: Vec<usize> = (0..candidates.len())
            .filter(|&row| candidates.first_value(row, &["name"]).as_deref() == Some(name))
            .collect();

        if matches.len() != 1 {
            return Err(AlascoError::NotFound {
                entity_type: "property",
                name: name.to_string(),
                matches: matches.len(),
            });
        }

        Ok(candidates.filter_rows(|row| row == matches[0]))
    }

    /// Fetch contracting entities whose name contains `name`, or all of them.
    pub async fn get_contracting_entities(&self, name: Option<&str>) -> Result<Table> {
        let filter = name.map(|n| Filter::contains("name", n));
        self.get_table(EntityType::ContractingEntities, filter.as_ref())
            .await
    }

    /// Fetch the documents of the given parents.
    ///
    /// Rows carry `parent_type` and `parent_id` columns.
    pub async fn get_documents(&self, parent: DocumentParent, parent_ids: &[String]) -> Result<Table> {
        let records = self.fetch_documents(parent, parent_ids, None).await?;
        Ok(flatten(&records))
    }

    /// Fetch reporting rows for the given projects.
    pub async fn get_reporting(&self, project_ids: &[String]) -> Result<Table> {
        if project_ids.is_empty() {
            return Ok(Table::new());
        }
        let filter = Filter::is_in("project", project_ids.iter().cloned());
        let records =
            fetch_all_chunked(&self.client, REPORTING_ENDPOINT, &filter, REPORTING_CHUNK_SIZE)
                .await?;
        Ok(flatten(&records))
    }

    /// Fetch every entity type into one table each.
    ///
    /// With a property name, the property is resolved first (exactly one
    /// match required) and every following fetch is narrowed to it:
    /// projects of the property, contract units of those projects, and so
    /// on down to the documents.
    ///
    /// The first failing entity type aborts the call; no partial result is
    /// returned.
    pub async fn get_all_df(&self, property_name: Option<&str>) -> Result<Tables> {
        self.get_all_df_with_project(property_name, None).await
    }

    /// Like [`get_all_df`](Self::get_all_df), additionally narrowing the
    /// projects to those whose name contains `project_name`.
    ///
    /// Everything below the projects follows the narrowed set. The
    /// properties table is not narrowed by the project name.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_df_with_project(
        &self,
        property_name: Option<&str>,
        project_name: Option<&str>,
    ) -> Result<Tables> {
        let mut tables = Tables::new();

        let properties = match property_name {
            Some(name) => self.resolve_property(name).await?,
            None => self.get_table(EntityType::Properties, None).await?,
        };
        let scoped = property_name.is_some() || project_name.is_some();

        let projects = match project_name {
            Some(name) => {
                let filter = Filter::contains("name", name);
                let projects = self.get_table(EntityType::Projects, Some(&filter)).await?;
                if property_name.is_some() {
                    let property_ids: HashSet<String> = properties.ids().into_iter().collect();
                    projects.filter_rows(|row| {
                        projects
                            .related_id(row, "property")
                            .is_some_and(|id| property_ids.contains(&id))
                    })
                } else {
                    projects
                }
            }
            None => {
                self.get_scoped(EntityType::Projects, "property", scoped, properties.ids())
                    .await?
            }
        };
        let contract_units = self
            .get_scoped(EntityType::ContractUnits, "project", scoped, projects.ids())
            .await?;
        let contracts = self
            .get_scoped(EntityType::Contracts, "contract_unit", scoped, contract_units.ids())
            .await?;

        let contractor_ids = unique(
            (0..contracts.len()).filter_map(|row| contracts.related_id(row, "contractor")),
        );
        let contractors = self
            .get_scoped(EntityType::Contractors, "id", scoped, contractor_ids)
            .await?;
        let invoices = self
            .get_scoped(EntityType::Invoices, "contract", scoped, contracts.ids())
            .await?;
        let change_orders = self
            .get_scoped(EntityType::ChangeOrders, "contract", scoped, contracts.ids())
            .await?;

        let lineage = Lineage::new(&projects, &contract_units, &contracts, &invoices, &change_orders);
        let mut document_records = Vec::new();
        for (parent, table) in [
            (DocumentParent::Contract, &contracts),
            (DocumentParent::Invoice, &invoices),
            (DocumentParent::ChangeOrder, &change_orders),
        ] {
            document_records.extend(
                self.fetch_documents(parent, &table.ids(), Some(&lineage))
                    .await?,
            );
        }
        tracing::info!(records = document_records.len(), "fetched documents");

        tables.insert(EntityType::Properties, properties);
        tables.insert(EntityType::Projects, projects);
        tables.insert(EntityType::ContractUnits, contract_units);
        tables.insert(EntityType::Contracts, contracts);
        tables.insert(EntityType::Contractors, contractors);
        tables.insert(EntityType::Invoices, invoices);
        tables.insert(EntityType::ChangeOrders, change_orders);
        tables.insert(EntityType::Documents, flatten(&document_records));

        Ok(tables)
    }

    /// Fetch `entity` narrowed to `relation in ids` when scoped, or all of it.
    async fn get_scoped(
        &self,
        entity: EntityType,
        relation: &str,
        scoped: bool,
        ids: Vec<String>,
    ) -> Result<Table> {
        if scoped {
            let filter = Filter::is_in(relation, ids);
            self.get_table(entity, Some(&filter)).await
        } else {
            self.get_table(entity, None).await
        }
    }

    async fn fetch_documents(
        &self,
        parent: DocumentParent,
        parent_ids: &[String],
        lineage: Option<&Lineage>,
    ) -> Result<Vec<Value>> {
        tracing::debug!(
            "Getting {} documents for {} {}s",
            parent,
            parent_ids.len(),
            parent
        );

        let mut records = Vec::new();
        for parent_id in parent_ids {
            let endpoint = parent.documents_endpoint(parent_id);
            let docs = fetch_all(&self.client, &endpoint, None)
                .await
                .map_err(|e| e.for_entity(EntityType::Documents))?;

            let property_id = lineage.and_then(|l| l.property_of(parent, parent_id));
            records.extend(docs.into_iter().map(|mut doc| {
                if let Value::Object(map) = &mut doc {
                    map.insert(PARENT_TYPE_COLUMN.to_string(), json!(parent.name()));
                    map.insert(PARENT_ID_COLUMN.to_string(), json!(parent_id));
                    if let Some(property_id) = &property_id {
                        map.insert(PROPERTY_ID_COLUMN.to_string(), json!(property_id));
                    }
                }
                doc
            }));
        }
        Ok(records)
    }
}

/// Parent links from each entity up to its property.
#[derive(Debug, Default)]
struct Lineage {
    project_property: HashMap<String, String>,
    unit_project: HashMap<String, String>,
    contract_unit: HashMap<String, String>,
    invoice_contract: HashMap<String, String>,
    change_order_contract: HashMap<String, String>,
}

impl Lineage {
    fn new(
        projects: &Table,
        contract_units: &Table,
        contracts: &Table,
        invoices: &Table,
        change_orders: &Table,
    ) -> Self {
        Self {
            project_property: links(projects, "property"),
            unit_project: links(contract_units, "project"),
            contract_unit: links(contracts, "contract_unit"),
            invoice_contract: links(invoices, "contract"),
            change_order_contract: links(change_orders, "contract"),
        }
    }

    fn property_of(&self, parent: DocumentParent, parent_id: &str) -> Option<String> {
        let contract_id = match parent {
            DocumentParent::Contract => Some(parent_id),
            DocumentParent::Invoice => self.invoice_contract.get(parent_id).map(String::as_str),
            DocumentParent::ChangeOrder => {
                self.change_order_contract.get(parent_id).map(String::as_str)
            }
        }?;
        let unit = self.contract_unit.get(contract_id)?;
        let project = self.unit_project.get(unit)?;
        self.project_property.get(project).cloned()
    }
}

/// Map each row id to the id of its `relation`.
fn links(table: &Table, relation: &str) -> HashMap<String, String> {
    (0..table.len())
        .filter_map(|row| {
            let id = table.first_value(row, &["id"])?;
            let related = table.related_id(row, relation)?;
            Some((id, related))
        })
        .collect()
}

/// Deduplicate while keeping first-seen order.
fn unique(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
