#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use crate::factory::{
        exhausted, fast_config, page, InterruptingProvider, MultiCollectionProvider,
    };
    use holdersync::{
        sync_holders, Collection, CollectionId, Config, ConfigError, HoldersyncError,
    };

    fn three_collection_provider() -> MultiCollectionProvider {
        MultiCollectionProvider::new(vec![
            ("c1", vec![page(&[("t1", "a"), ("t2", "a")]), exhausted()]),
            ("c2", vec![page(&[("t1", "b")]), exhausted()]),
            ("c3", vec![page(&[("t1", "a"), ("t2", "c")]), exhausted()]),
        ])
    }

    fn three_collections(order: &[&str]) -> Config {
        order.iter().fold(fast_config(), |config, id| {
            config.add_collection(Collection::new(id, 100))
        })
    }

    #[tokio::test]
    async fn merges_collections_into_one_table() {
        let provider = three_collection_provider();
        let config = three_collections(&["c1", "c2", "c3"]);

        let (table, report) = sync_holders(&config, &provider, &CancellationToken::new())
            .await
            .unwrap();

        // Token ids are only unique within a collection; "t1" appearing in
        // all three must not collide.
        assert_eq!(table["a"][&CollectionId::new("c1")], 2);
        assert_eq!(table["a"][&CollectionId::new("c3")], 1);
        assert_eq!(table["b"][&CollectionId::new("c2")], 1);
        assert_eq!(table["c"][&CollectionId::new("c3")], 1);
        assert!(!table["b"].contains_key(&CollectionId::new("c1")));

        assert_eq!(report.total_owners, 3);
        assert_eq!(report.total_records, 5);
        assert_eq!(report.collections["c1"].holders, 1);
        assert_eq!(report.collections["c3"].holders, 2);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn merge_order_does_not_matter() {
        let (table_forward, _) = sync_holders(
            &three_collections(&["c1", "c2", "c3"]),
            &three_collection_provider(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        let (table_reversed, _) = sync_holders(
            &three_collections(&["c3", "c2", "c1"]),
            &three_collection_provider(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(table_forward, table_reversed);
    }

    #[tokio::test]
    async fn one_broken_collection_does_not_block_the_others() {
        use holdersync::ProviderError;

        let provider = MultiCollectionProvider::new(vec![
            ("c1", vec![page(&[("t1", "a"), ("t2", "a")]), exhausted()]),
            ("c2", vec![Err(ProviderError::Auth("bad key".into()))]),
            ("c3", vec![page(&[("t1", "c")]), exhausted()]),
        ]);
        let config = three_collections(&["c1", "c2", "c3"]);

        let (table, report) = sync_holders(&config, &provider, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(table["a"][&CollectionId::new("c1")], 2);
        assert_eq!(table["c"][&CollectionId::new("c3")], 1);
        assert!(table.values().all(|per_collection| {
            !per_collection.contains_key(&CollectionId::new("c2"))
        }));

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].collection_id, "c2");
        assert!(report.collections.contains_key("c1"));
        assert!(report.collections.contains_key("c3"));
        assert!(report.has_failures());
        assert!(!report.all_failed());
    }

    #[tokio::test]
    async fn interrupt_marks_every_unscanned_collection_as_failed() {
        let cancel = CancellationToken::new();
        let provider = InterruptingProvider::new(
            MultiCollectionProvider::new(vec![(
                "c1",
                vec![page(&[("t1", "a"), ("t2", "a")]), exhausted()],
            )]),
            "c2",
            cancel.clone(),
        );
        let config = three_collections(&["c1", "c2", "c3"]);

        let (table, report) = sync_holders(&config, &provider, &cancel).await.unwrap();

        // c1 finished before the interrupt and keeps its counts.
        assert_eq!(table["a"][&CollectionId::new("c1")], 2);
        assert_eq!(report.collections.len(), 1);
        assert!(report.collections.contains_key("c1"));

        // c2 was cut off mid-scan; c3 was never attempted. Both must show
        // up as failed so the run cannot pass for a complete one.
        let failed: Vec<&str> = report
            .failed
            .iter()
            .map(|failure| failure.collection_id.as_str())
            .collect();
        assert_eq!(failed, vec!["c2", "c3"]);
        assert!(report.has_failures());
        assert!(!report.all_failed());
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn rejects_configs_without_collections() {
        let provider = three_collection_provider();

        let result = sync_holders(&fast_config(), &provider, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(HoldersyncError::Config(ConfigError::NoCollections))
        ));
    }

    #[tokio::test]
    async fn rejects_zero_collection_bounds() {
        let provider = three_collection_provider();
        let config = fast_config().add_collection(Collection::new("c1", 0));

        let result = sync_holders(&config, &provider, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(HoldersyncError::Config(ConfigError::ZeroMaxIndex(_)))
        ));
    }
}
