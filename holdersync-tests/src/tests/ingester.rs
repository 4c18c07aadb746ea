#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use crate::factory::{
        empty_page, exhausted, fast_config, page, EmptyPagesProvider, EndlessProvider,
        FailingProvider, ScriptedProvider, StallingProvider,
    };
    use holdersync::{ingester, Collection, IngesterError, ProviderError, ScanCursor};

    #[tokio::test]
    async fn folds_pages_into_ownership_counts() {
        let collection = Collection::new("c1", 100);
        let provider = ScriptedProvider::new(vec![
            page(&[("t1", "a"), ("t2", "a")]),
            page(&[("t3", "b")]),
            exhausted(),
        ]);

        let counts = ingester::ingest(
            &collection,
            &provider,
            &fast_config(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(counts.len(), 2);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn never_double_counts_duplicate_token_ids() {
        let collection = Collection::new("c1", 100);
        let provider = ScriptedProvider::new(vec![
            page(&[("t1", "a"), ("t2", "a")]),
            page(&[("t2", "a"), ("t3", "b")]),
            page(&[("t1", "a")]),
            exhausted(),
        ]);

        let counts = ingester::ingest(
            &collection,
            &provider,
            &fast_config(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
    }

    #[test]
    fn folding_duplicates_matches_folding_the_deduplicated_sequence() {
        let with_duplicates = crate::factory::token_records(&[
            ("t1", "a"),
            ("t2", "a"),
            ("t2", "a"),
            ("t3", "b"),
            ("t1", "a"),
        ]);
        let deduplicated =
            crate::factory::token_records(&[("t1", "a"), ("t2", "a"), ("t3", "b")]);

        let mut cursor = ScanCursor::new(0);
        cursor.fold(&with_duplicates);
        let mut dedup_cursor = ScanCursor::new(0);
        dedup_cursor.fold(&deduplicated);

        assert_eq!(cursor.into_counts(), dedup_cursor.into_counts());
    }

    #[tokio::test]
    async fn terminates_after_exactly_threshold_empty_batches() {
        let collection = Collection::new("c1", 1_000_000);
        let provider = EmptyPagesProvider::new();
        let config = fast_config().with_empty_batch_threshold(3);

        let counts =
            ingester::ingest(&collection, &provider, &config, &CancellationToken::new())
                .await
                .unwrap();

        assert!(counts.is_empty());
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn a_new_token_resets_the_empty_batch_counter() {
        let collection = Collection::new("c1", 1_000_000);
        // Two empty batches short of the threshold, then a fresh token,
        // then three more empties. Without the reset the scan would stop
        // one call after the fresh token.
        let provider = ScriptedProvider::new(vec![
            empty_page(),
            empty_page(),
            page(&[("t1", "a")]),
            empty_page(),
            empty_page(),
            empty_page(),
        ]);
        let config = fast_config().with_empty_batch_threshold(3);

        let counts =
            ingester::ingest(&collection, &provider, &config, &CancellationToken::new())
                .await
                .unwrap();

        assert_eq!(counts.get("a"), Some(&1));
        assert_eq!(provider.call_count(), 6);
    }

    #[tokio::test]
    async fn stops_at_the_configured_upper_bound() {
        let collection = Collection::new("c1", 5);
        let provider = EndlessProvider::new();

        let counts = ingester::ingest(
            &collection,
            &provider,
            &fast_config(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        // Ranges [0,2), [2,4), [4,6); index 6 passes the bound.
        assert_eq!(provider.call_count(), 3);
        assert_eq!(counts.len(), 3);
    }

    #[tokio::test]
    async fn retries_the_same_range_after_a_rate_limit() {
        let collection = Collection::new("c1", 100);
        let provider = ScriptedProvider::new(vec![
            page(&[("t1", "a"), ("t2", "a")]),
            Err(ProviderError::RateLimited),
            page(&[("t3", "b")]),
            exhausted(),
        ]);

        let counts = ingester::ingest(
            &collection,
            &provider,
            &fast_config(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        // Same result as the no-error run; the rate-limited call cost one
        // extra attempt and no data.
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn aborts_on_terminal_error_without_partial_counts() {
        let collection = Collection::new("c1", 100);
        let provider = ScriptedProvider::new(vec![
            page(&[("t1", "a"), ("t2", "a")]),
            Err(ProviderError::Auth("bad key".to_string())),
        ]);

        let result = ingester::ingest(
            &collection,
            &provider,
            &fast_config(),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            result,
            Err(IngesterError::Source(ProviderError::Auth(_)))
        ));
    }

    #[tokio::test]
    async fn surfaces_retry_exhaustion_as_terminal() {
        let collection = Collection::new("c1", 100);
        let provider = FailingProvider::new(ProviderError::Network("connection reset".into()));
        let config = fast_config().with_max_retries(2);

        let result =
            ingester::ingest(&collection, &provider, &config, &CancellationToken::new()).await;

        match result {
            Err(IngesterError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected retries exhausted, got {other:?}"),
        }
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn treats_call_timeout_as_transient() {
        let collection = Collection::new("c1", 100);
        let config = fast_config().with_request_timeout_ms(10).with_max_retries(1);

        let result = ingester::ingest(
            &collection,
            &StallingProvider,
            &config,
            &CancellationToken::new(),
        )
        .await;

        match result {
            Err(IngesterError::RetriesExhausted { last_error, .. }) => {
                assert_eq!(last_error, ProviderError::Timeout)
            }
            other => panic!("expected timeout exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_scan_aborts_cleanly() {
        let collection = Collection::new("c1", 100);
        let provider = EndlessProvider::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = ingester::ingest(&collection, &provider, &fast_config(), &cancel).await;

        assert!(matches!(result, Err(IngesterError::Cancelled)));
        assert_eq!(provider.call_count(), 0);
    }
}
