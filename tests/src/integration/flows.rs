//! # Store / Effects Flows
//!
//! Every test runs a real `EntityStore`, an `EntityEffects` loop on the
//! store's bus and a `MemoryTransport`.
//!
//! ## Flows Tested:
//!
//! 1. **Request → transport → success**: loads, paging, saves and deletes
//! 2. **Conditional loads**: suppressed while fresh, escalated when stale
//! 3. **Transport failures**: become `*Failure` events and clear the flags
//! 4. **Namespaced composite keys**: records land under their namespace

#[cfg(test)]
mod tests {
    use super::super::harness::{customer, order_line, FlowHarness};
    use entity_state::{EntityActions, EntitySelectors, EntityStateApi, TrackedTime};
    use serde_json::json;
    use shared_bus::EventFilter;
    use shared_types::{EntityKey, EventKind, EventPayload, Page};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    fn customers() -> EntityActions {
        EntityActions::new("Customer")
    }

    fn selectors(harness: &FlowHarness) -> EntitySelectors {
        let metadata = harness
            .store
            .registry()
            .get(&"Customer".into())
            .unwrap()
            .clone();
        EntitySelectors::new(metadata)
    }

    fn seed_customers(harness: &FlowHarness) {
        harness.transport.seed(
            "Customer",
            vec![
                customer(1, "Hopper"),
                customer(2, "Lovelace"),
                customer(3, "Babbage"),
                customer(4, "Turing"),
                customer(5, "Knuth"),
            ],
        );
    }

    // =========================================================================
    // LOADS
    // =========================================================================

    #[tokio::test]
    async fn test_load_all_round_trip() {
        let harness = FlowHarness::start().await;
        seed_customers(&harness);

        let success = harness.request(customers().load_all()).await.unwrap();
        assert_eq!(success.kind, EventKind::LoadAllSuccess);

        let selectors = selectors(&harness);
        let slice = selectors.slice(&harness.store.state()).unwrap();
        assert_eq!(selectors.total(&slice), 5);
        assert!(!selectors.is_loading(&slice));
        assert!(selectors.date(&slice, TrackedTime::Loaded).is_some());

        let names: Vec<_> = selectors
            .sorted(&slice)
            .iter()
            .map(|e| e.get("name").cloned().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                json!("Babbage"),
                json!("Hopper"),
                json!("Knuth"),
                json!("Lovelace"),
                json!("Turing")
            ]
        );
    }

    #[tokio::test]
    async fn test_load_page_tracks_page_and_total() {
        let harness = FlowHarness::start().await;
        seed_customers(&harness);

        harness
            .request(customers().load_page(Page::new(2, 2)))
            .await
            .unwrap();

        let selectors = selectors(&harness);
        let slice = selectors.slice(&harness.store.state()).unwrap();
        assert_eq!(
            selectors.ids(&slice).iter().cloned().collect::<Vec<_>>(),
            vec![EntityKey::Number(3), EntityKey::Number(4)]
        );
        assert_eq!(selectors.current_page(&slice), Some(Page::new(2, 2)));
        assert_eq!(selectors.total_pageable_count(&slice), Some(5));
    }

    #[tokio::test]
    async fn test_load_many_matching_criteria() {
        let harness = FlowHarness::start().await;
        seed_customers(&harness);

        let success = harness
            .request(customers().load_many_matching(json!({ "name": "Knuth" })))
            .await
            .unwrap();

        assert_eq!(success.criteria, Some(json!({ "name": "Knuth" })));
        assert_eq!(
            success.payload,
            EventPayload::Entities(vec![customer(5, "Knuth")])
        );
    }

    // =========================================================================
    // CONDITIONAL LOADS
    // =========================================================================

    #[tokio::test]
    async fn test_conditional_load_uses_type_max_age() {
        let harness = FlowHarness::start().await;
        seed_customers(&harness);

        let first = harness
            .request(customers().load_all_if_necessary(None))
            .await
            .unwrap();
        assert_eq!(first.kind, EventKind::LoadAllSuccess);
        assert_eq!(harness.transport.calls(), 1);

        // Fresh for 60s (type default): nothing answers.
        harness.clock.advance(30_000);
        assert!(harness
            .request(customers().load_all_if_necessary(None))
            .await
            .is_none());
        assert_eq!(harness.transport.calls(), 1);

        harness.clock.advance(31_000);
        let reloaded = harness
            .request(customers().load_all_if_necessary(None))
            .await
            .unwrap();
        assert_eq!(reloaded.kind, EventKind::LoadAllSuccess);
        assert_eq!(harness.transport.calls(), 2);

        let snapshot = harness.metrics.snapshot();
        assert_eq!(snapshot.reloads_escalated, 2);
        assert_eq!(snapshot.reloads_suppressed, 1);
    }

    #[tokio::test]
    async fn test_conditional_load_of_one_key() {
        let harness = FlowHarness::start().await;
        seed_customers(&harness);
        harness.request(customers().load(EntityKey::Number(2))).await.unwrap();

        assert!(harness
            .request(customers().load_if_necessary(EntityKey::Number(2), None))
            .await
            .is_none());

        let missing = harness
            .request(customers().load_if_necessary(EntityKey::Number(4), None))
            .await
            .unwrap();
        assert_eq!(missing.kind, EventKind::LoadSuccess);
        assert_eq!(missing.payload, EventPayload::Entity(customer(4, "Turing")));
    }

    // =========================================================================
    // SAVES, DELETES, FAILURES
    // =========================================================================

    #[tokio::test]
    async fn test_create_update_delete_cycle() {
        let harness = FlowHarness::start().await;
        let actions = customers();

        let created = harness.request(actions.create(customer(9, "Hamming"))).await.unwrap();
        assert_eq!(created.kind, EventKind::CreateSuccess);

        let duplicate = harness.request(actions.create(customer(9, "Hamming"))).await.unwrap();
        assert_eq!(duplicate.kind, EventKind::CreateFailure);

        harness
            .request(actions.update(customer(9, "R. Hamming")))
            .await
            .unwrap();
        let slice = harness.store.slice(&"Customer".into()).unwrap();
        assert_eq!(
            slice.collection.get(&EntityKey::Number(9)),
            Some(&customer(9, "R. Hamming"))
        );
        assert!(slice.tracking.updated_at.is_some());
        assert!(!slice.tracking.is_saving);

        let deleted = harness
            .request(actions.delete_by_key(EntityKey::Number(9)))
            .await
            .unwrap();
        assert_eq!(deleted.kind, EventKind::DeleteByKeySuccess);

        let slice = harness.store.slice(&"Customer".into()).unwrap();
        assert!(slice.collection.is_empty());
        assert!(slice.tracking.deleted_at.is_some());
    }

    #[tokio::test]
    async fn test_transport_failure_clears_flag() {
        let harness = FlowHarness::start().await;
        seed_customers(&harness);
        harness.request(customers().load_all()).await.unwrap();
        harness.transport.set_offline(true);

        let failure = harness.request(customers().load_all()).await.unwrap();
        assert_eq!(failure.kind, EventKind::LoadAllFailure);
        assert!(matches!(failure.payload, EventPayload::Error(_)));

        let slice = harness.store.slice(&"Customer".into()).unwrap();
        assert!(!slice.tracking.is_loading);
        assert_eq!(slice.collection.len(), 5);
    }

    #[tokio::test]
    async fn test_unsupported_operation_fails_not_implemented() {
        let harness = FlowHarness::start().await;

        let failure = harness
            .request(customers().replace(customer(1, "Hopper")))
            .await
            .unwrap();

        assert_eq!(failure.kind, EventKind::ReplaceFailure);
        let EventPayload::Error(err) = failure.payload else {
            panic!("expected an error payload");
        };
        assert!(err.is_not_implemented());
    }

    #[tokio::test]
    async fn test_concurrent_requests_keep_their_correlation() {
        let harness = FlowHarness::start().await;
        seed_customers(&harness);
        let actions = customers();

        let requests: Vec<_> = (1..=5).map(|id| actions.load(EntityKey::Number(id))).collect();
        let expected: Vec<_> = requests.iter().map(|r| r.correlation_id).collect();

        let responses =
            futures::future::join_all(requests.into_iter().map(|r| harness.request(r))).await;

        for (response, correlation_id) in responses.into_iter().zip(expected) {
            let response = response.unwrap();
            assert_eq!(response.kind, EventKind::LoadSuccess);
            assert_eq!(response.correlation_id, correlation_id);
        }
        assert_eq!(harness.store.slice(&"Customer".into()).unwrap().collection.len(), 5);
    }

    // =========================================================================
    // NAMESPACES AND OBSERVERS
    // =========================================================================

    #[tokio::test]
    async fn test_namespaced_composite_keys() {
        let harness = FlowHarness::start().await;
        harness.transport.seed(
            "OrderLine",
            vec![order_line(7, 1, "A-100"), order_line(7, 2, "B-200")],
        );

        harness
            .request(EntityActions::new("OrderLine").load_all())
            .await
            .unwrap();

        let slice = harness.store.slice(&"OrderLine".into()).unwrap();
        assert_eq!(
            slice.collection.ids().iter().cloned().collect::<Vec<_>>(),
            vec![EntityKey::Text("7_1".into()), EntityKey::Text("7_2".into())]
        );

        let json = harness.store.state().to_json().unwrap();
        assert_eq!(json["sales"]["orderLine"]["ids"], json!(["7_1", "7_2"]));
        assert_eq!(json["customer"]["ids"], json!([]));
    }

    #[tokio::test]
    async fn test_observers_see_request_then_response() {
        let harness = FlowHarness::start().await;
        seed_customers(&harness);
        let mut stream = harness
            .store
            .event_stream(EventFilter::entity_types(vec!["Customer".into()]));

        let request = customers().load_all();
        let correlation_id = request.correlation_id;
        harness.request(request).await.unwrap();

        let first = timeout(Duration::from_secs(1), stream.next()).await.unwrap().unwrap();
        let second = timeout(Duration::from_secs(1), stream.next()).await.unwrap().unwrap();
        assert_eq!(
            (first.kind, second.kind),
            (EventKind::LoadAll, EventKind::LoadAllSuccess)
        );
        assert_eq!(second.correlation_id, correlation_id);
    }
}
