//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic JSON:API records.

use serde_json::{json, Map, Value};

use super::state::MockState;
use crate::models::{DocumentParent, EntityType};

/// Collection of fixture factories for test data.
pub struct Fixtures;

impl Fixtures {
    /// A JSON:API resource with attributes and to-one relationships.
    pub fn record(
        resource_type: &str,
        id: &str,
        attributes: Value,
        relationships: &[(&str, &str)],
    ) -> Value {
        let relationships: Map<String, Value> = relationships
            .iter()
            .map(|(name, related_id)| {
                (
                    (*name).to_string(),
                    json!({"data": {"id": related_id, "type": name.to_uppercase()}}),
                )
            })
            .collect();

        json!({
            "id": id,
            "type": resource_type,
            "attributes": attributes,
            "relationships": relationships,
        })
    }

    // =========================================================================
    // Entity Fixtures
    // =========================================================================

    pub fn property(id: &str, name: &str) -> Value {
        Self::record("PROPERTY", id, json!({"name": name}), &[])
    }

    pub fn project(id: &str, name: &str, property_id: &str) -> Value {
        Self::record(
            "PROJECT",
            id,
            json!({"name": name}),
            &[("property", property_id)],
        )
    }

    pub fn contract_unit(id: &str, name: &str, project_id: &str) -> Value {
        Self::record(
            "CONTRACT_UNIT",
            id,
            json!({"name": name}),
            &[("project", project_id)],
        )
    }

    pub fn contractor(id: &str, name: &str) -> Value {
        Self::record("CONTRACTOR", id, json!({"name": name}), &[])
    }

    pub fn contracting_entity(id: &str, name: &str) -> Value {
        Self::record("CONTRACTING_ENTITY", id, json!({"name": name}), &[])
    }

    pub fn contract(id: &str, name: &str, contract_unit_id: &str, contractor_id: &str) -> Value {
        Self::record(
            "CONTRACT",
            id,
            json!({"name": name, "contract_number": format!("V-{id}")}),
            &[
                ("contract_unit", contract_unit_id),
                ("contractor", contractor_id),
            ],
        )
    }

    pub fn invoice(id: &str, invoice_number: &str, contract_id: &str) -> Value {
        Self::record(
            "INVOICE",
            id,
            json!({"invoice_number": invoice_number, "gross_amount": 1190.0}),
            &[("contract", contract_id)],
        )
    }

    pub fn change_order(id: &str, name: &str, contract_id: &str) -> Value {
        Self::record(
            "CHANGE_ORDER",
            id,
            json!({"name": name}),
            &[("contract", contract_id)],
        )
    }

    /// A document whose download link points at the mock file route.
    pub fn document(id: &str, name: &str, document_type: &str) -> Value {
        json!({
            "id": id,
            "type": "DOCUMENT",
            "attributes": {"name": name, "document_type": document_type},
            "links": {"download": format!("files/{id}")},
        })
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// Two properties with overlapping names, a third unrelated one, and a
    /// full contract chain below the first.
    ///
    /// Scoped to "Tower A" the chain holds contracts c-1 and c-2, invoices
    /// inv-1 and inv-2, change order co-1 and four documents.
    pub fn default_scenario() -> MockState {
        let state = MockState::new()
            .with_record(EntityType::Properties, Self::property("prop-1", "Tower A"))
            .with_record(EntityType::Properties, Self::property("prop-2", "Tower AB"))
            .with_record(EntityType::Properties, Self::property("prop-3", "Harbour Lofts"))
            .with_record(EntityType::Projects, Self::project("proj-1", "Shell", "prop-1"))
            .with_record(EntityType::Projects, Self::project("proj-2", "Fit-out", "prop-2"))
            .with_record(EntityType::Projects, Self::project("proj-3", "Lofts", "prop-3"))
            .with_record(EntityType::ContractUnits, Self::contract_unit("cu-1", "Structure", "proj-1"))
            .with_record(EntityType::ContractUnits, Self::contract_unit("cu-2", "Interior", "proj-2"))
            .with_record(EntityType::Contractors, Self::contractor("k-1", "Bau GmbH"))
            .with_record(EntityType::Contractors, Self::contractor("k-2", "Elektro AG"))
            .with_record(EntityType::Contractors, Self::contractor("k-3", "Maler KG"))
            .with_record(
                EntityType::ContractingEntities,
                Self::contracting_entity("ce-1", "Tower Holding GmbH"),
            )
            .with_record(
                EntityType::ContractingEntities,
                Self::contracting_entity("ce-2", "Harbour Lofts KG"),
            )
            .with_record(EntityType::Contracts, Self::contract("c-1", "Rohbau", "cu-1", "k-1"))
            .with_record(EntityType::Contracts, Self::contract("c-2", "Elektro", "cu-1", "k-2"))
            .with_record(EntityType::Contracts, Self::contract("c-3", "Maler", "cu-2", "k-3"))
            .with_record(EntityType::Invoices, Self::invoice("inv-1", "RE-001", "c-1"))
            .with_record(EntityType::Invoices, Self::invoice("inv-2", "RE-002", "c-2"))
            .with_record(EntityType::Invoices, Self::invoice("inv-3", "RE-003", "c-3"))
            .with_record(EntityType::ChangeOrders, Self::change_order("co-1", "Extra floor", "c-1"));

        state
            .with_document(
                DocumentParent::Contract,
                "c-1",
                Self::document("doc-c1", "Vertrag.pdf", "CONTRACT"),
                Some(b"contract c-1".to_vec()),
            )
            .with_document(
                DocumentParent::Invoice,
                "inv-1",
                Self::document("doc-i1", "Rechnung.pdf", "INVOICE"),
                Some(b"invoice inv-1".to_vec()),
            )
            .with_document(
                DocumentParent::Invoice,
                "inv-2",
                Self::document("doc-i2", "Rechnung.pdf", "INVOICE"),
                Some(b"invoice inv-2".to_vec()),
            )
            .with_document(
                DocumentParent::ChangeOrder,
                "co-1",
                Self::document("doc-co1", "Nachtrag.pdf", "CHANGE_ORDER"),
                Some(b"change order co-1".to_vec()),
            )
            .with_document(
                DocumentParent::Invoice,
                "inv-3",
                Self::document("doc-i3", "Rechnung.pdf", "INVOICE"),
                Some(b"invoice inv-3".to_vec()),
            )
    }
}
