//! End-to-end tests of the in-memory ledger under concurrent writers.
//!
//! Verifies:
//! - Balances and snapshot chains stay exact under contention
//! - Streams are locked independently and lock waits are bounded
//! - Reversals, transfers and the negative-stock policy commit all or nothing

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use stockledger_core::{MovementId, ProductId, UserId, WarehouseId};
    use stockledger_inventory::{
        DocumentRef, MovementFilter, MovementType, NegativeStockPolicy, NewMovementRequest,
        Pagination, QuantityInput, ReversalRequest, SortOrder, StreamKey, TransferRequest,
    };

    use crate::config::{BalanceStrategy, LedgerConfig};
    use crate::error::LedgerError;
    use crate::stock_ledger::{InMemoryStockLedger, StockLedger};

    fn key() -> StreamKey {
        StreamKey::new(ProductId::new(), WarehouseId::new())
    }

    fn movement(key: StreamKey, movement_type: MovementType, quantity: QuantityInput) -> NewMovementRequest {
        NewMovementRequest {
            product_id: key.product_id,
            warehouse_id: key.warehouse_id,
            movement_type,
            quantity,
            reference: None,
            unit_cost: None,
            notes: None,
            created_by: UserId::new(),
        }
    }

    fn adjust(key: StreamKey, quantity: Decimal) -> NewMovementRequest {
        movement(key, MovementType::Adjustment, QuantityInput::Signed(quantity))
    }

    fn shared(config: LedgerConfig) -> Arc<InMemoryStockLedger> {
        Arc::new(InMemoryStockLedger::with_config(config))
    }

    async fn history_len(ledger: &InMemoryStockLedger, key: StreamKey) -> u64 {
        ledger
            .history(key.product_id, key.warehouse_id, &MovementFilter::default(), Pagination::default())
            .await
            .unwrap()
            .total
    }

    #[tokio::test]
    async fn receipt_then_sale_snapshots_and_summary() {
        let ledger = InMemoryStockLedger::new();
        let k = key();

        let mut receipt = movement(k, MovementType::PurchaseReceipt, QuantityInput::inbound(dec!(10)));
        receipt.reference = Some(DocumentRef::new("purchase_order", "PO-1"));
        receipt.unit_cost = Some(dec!(4));
        let first = ledger.append(receipt).await.unwrap();
        assert_eq!((first.stock_before, first.stock_after), (dec!(0), dec!(10)));
        assert_eq!(first.quantity, dec!(10));

        let second = ledger
            .append(movement(k, MovementType::Sale, QuantityInput::outbound(dec!(3))))
            .await
            .unwrap();
        assert_eq!(second.quantity, dec!(-3));
        assert_eq!((second.stock_before, second.stock_after), (dec!(10), dec!(7)));
        assert!(second.id > first.id);

        assert_eq!(ledger.current_stock(k.product_id, k.warehouse_id).await.unwrap(), dec!(7));

        let summary = ledger
            .summary(k.product_id, Some(k.warehouse_id), &MovementFilter::default())
            .await
            .unwrap();
        assert_eq!(summary.inbound, dec!(10));
        assert_eq!(summary.outbound, dec!(3));
        assert_eq!(summary.net, dec!(7));
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.valuation, dec!(40));

        let latest = ledger.latest_movement(k.product_id, k.warehouse_id).await.unwrap();
        assert_eq!(latest, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_appends_on_one_stream_keep_an_exact_chain() {
        for strategy in [BalanceStrategy::LatestSnapshot, BalanceStrategy::Resum] {
            let ledger = shared(LedgerConfig {
                balance_strategy: strategy,
                ..LedgerConfig::default()
            });
            let k = key();

            let tasks: Vec<_> = (0..100)
                .map(|_| {
                    let ledger = ledger.clone();
                    tokio::spawn(async move { ledger.append(adjust(k, dec!(1))).await })
                })
                .collect();
            for task in tasks {
                task.await.unwrap().unwrap();
            }

            assert_eq!(ledger.current_stock(k.product_id, k.warehouse_id).await.unwrap(), dec!(100));

            let audit = ledger.audit_stream(k.product_id, k.warehouse_id).await.unwrap();
            assert!(audit.is_consistent(), "breaks: {:?}", audit.breaks);
            assert_eq!(audit.entries, 100);
            assert_eq!(audit.snapshot_balance, Some(dec!(100)));

            let page = ledger
                .history(
                    k.product_id,
                    k.warehouse_id,
                    &MovementFilter { order: SortOrder::OldestFirst, ..MovementFilter::default() },
                    Pagination { limit: 100, offset: 0 },
                )
                .await
                .unwrap();
            for (i, m) in page.movements.iter().enumerate() {
                assert_eq!(m.stock_before, Decimal::from(i));
                assert_eq!(m.stock_after, Decimal::from(i + 1));
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn mixed_concurrent_writes_balance_to_their_sum() {
        let ledger = shared(LedgerConfig::default());
        let k = key();
        let quantities: Vec<Decimal> = (0..60)
            .map(|i| if i % 3 == 0 { dec!(-2.5) } else { dec!(4) })
            .collect();
        let expected: Decimal = quantities.iter().copied().sum();

        let tasks: Vec<_> = quantities
            .into_iter()
            .map(|q| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.append(adjust(k, q)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let audit = ledger.audit_stream(k.product_id, k.warehouse_id).await.unwrap();
        assert!(audit.is_consistent());
        assert_eq!(audit.balance, expected);
        assert_eq!(audit.snapshot_balance, Some(expected));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn held_stream_times_out_while_other_streams_proceed() {
        let ledger = shared(LedgerConfig {
            lock_timeout: Duration::from_millis(100),
            ..LedgerConfig::default()
        });
        let (busy, free) = (key(), key());
        ledger.append(adjust(busy, dec!(5))).await.unwrap();

        let guard = ledger.locks().acquire(busy, Duration::from_secs(1)).await.unwrap();

        let other = tokio::time::timeout(Duration::from_secs(1), ledger.append(adjust(free, dec!(1))))
            .await
            .expect("append on an unlocked stream must not wait")
            .unwrap();
        assert_eq!(other.stock_after, dec!(1));

        let err = ledger.append(adjust(busy, dec!(1))).await.unwrap_err();
        assert!(matches!(err, LedgerError::LockTimeout { key, .. } if key == busy));
        assert!(err.is_retryable());
        assert_eq!(history_len(&ledger, busy).await, 1);

        // Reads do not take stream locks.
        assert_eq!(ledger.current_stock(busy.product_id, busy.warehouse_id).await.unwrap(), dec!(5));

        drop(guard);
        let after = ledger.append(adjust(busy, dec!(1))).await.unwrap();
        assert_eq!((after.stock_before, after.stock_after), (dec!(5), dec!(6)));
    }

    #[tokio::test]
    async fn zero_and_malformed_requests_are_rejected_without_writes() {
        let ledger = InMemoryStockLedger::new();
        let k = key();
        ledger.append(adjust(k, dec!(2))).await.unwrap();

        let zero = ledger.append(adjust(k, dec!(0))).await.unwrap_err();
        assert!(matches!(zero, LedgerError::Validation(_)));

        let zero_directed = ledger
            .append(movement(k, MovementType::Sale, QuantityInput::outbound(dec!(0))))
            .await
            .unwrap_err();
        assert!(matches!(zero_directed, LedgerError::Validation(_)));

        let mut negative_cost = adjust(k, dec!(1));
        negative_cost.unit_cost = Some(dec!(-1));
        assert!(matches!(ledger.append(negative_cost).await, Err(LedgerError::Validation(_))));

        assert_eq!(history_len(&ledger, k).await, 1);
    }

    #[tokio::test]
    async fn direction_is_applied_to_the_magnitude() {
        let ledger = InMemoryStockLedger::new();
        let k = key();

        let out = ledger
            .append(movement(k, MovementType::Sale, QuantityInput::outbound(dec!(5))))
            .await
            .unwrap();
        assert_eq!(out.quantity, dec!(-5));

        let back = ledger
            .append(movement(k, MovementType::SaleReturn, QuantityInput::inbound(dec!(5))))
            .await
            .unwrap();
        assert_eq!(back.quantity, dec!(5));

        // Sign of a directed magnitude is ignored.
        let odd = ledger
            .append(movement(k, MovementType::Sale, QuantityInput::outbound(dec!(-2))))
            .await
            .unwrap();
        assert_eq!(odd.quantity, dec!(-2));
        assert_eq!(odd.stock_after, dec!(-2));
    }

    #[tokio::test]
    async fn summary_decomposes_and_honours_filters() {
        let ledger = InMemoryStockLedger::new();
        let k = key();
        for (t, q) in [
            (MovementType::OpeningBalance, dec!(20)),
            (MovementType::Sale, dec!(-4)),
            (MovementType::Sale, dec!(-6)),
            (MovementType::PurchaseReceipt, dec!(15)),
            (MovementType::Adjustment, dec!(-1.5)),
        ] {
            ledger.append(movement(k, t, QuantityInput::Signed(q))).await.unwrap();
        }

        let all = ledger
            .summary(k.product_id, Some(k.warehouse_id), &MovementFilter::default())
            .await
            .unwrap();
        assert_eq!(all.inbound, dec!(35));
        assert_eq!(all.outbound, dec!(11.5));
        assert_eq!(all.net, all.inbound - all.outbound);
        assert_eq!(all.net, ledger.current_stock(k.product_id, k.warehouse_id).await.unwrap());

        let sales = ledger
            .summary(k.product_id, Some(k.warehouse_id), &MovementFilter::by_type(MovementType::Sale))
            .await
            .unwrap();
        assert_eq!((sales.inbound, sales.outbound, sales.entries), (dec!(0), dec!(10), 2));

        let empty = ledger
            .summary(ProductId::new(), None, &MovementFilter::default())
            .await
            .unwrap();
        assert_eq!((empty.net, empty.entries), (dec!(0), 0));
    }

    #[tokio::test]
    async fn stock_is_reported_per_warehouse() {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new();
        let (w1, w2) = (WarehouseId::new(), WarehouseId::new());

        ledger.append(adjust(StreamKey::new(product, w1), dec!(8))).await.unwrap();
        ledger.append(adjust(StreamKey::new(product, w2), dec!(3))).await.unwrap();
        ledger.append(adjust(StreamKey::new(product, w2), dec!(-1))).await.unwrap();
        ledger.append(adjust(key(), dec!(100))).await.unwrap();

        let totals = ledger.stock_across_warehouses(product).await.unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&w1], dec!(8));
        assert_eq!(totals[&w2], dec!(2));

        let across = ledger.summary(product, None, &MovementFilter::default()).await.unwrap();
        assert_eq!(across.net, dec!(10));
        assert_eq!(
            ledger.current_stock(product, WarehouseId::new()).await.unwrap(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn reversal_restores_balance_once() {
        let ledger = InMemoryStockLedger::new();
        let k = key();
        ledger.append(adjust(k, dec!(10))).await.unwrap();
        let mistake = ledger
            .append(movement(k, MovementType::Sale, QuantityInput::outbound(dec!(4))))
            .await
            .unwrap();

        let request = ReversalRequest {
            movement_id: mistake.id,
            created_by: UserId::new(),
            notes: None,
        };
        let reversal = ledger.reverse(request.clone()).await.unwrap();
        assert_eq!(reversal.movement_type, MovementType::Reversal);
        assert_eq!(reversal.quantity, dec!(4));
        assert_eq!(reversal.reference, Some(DocumentRef::movement(mistake.id)));
        assert_eq!((reversal.stock_before, reversal.stock_after), (dec!(6), dec!(10)));

        assert!(matches!(ledger.reverse(request).await, Err(LedgerError::Conflict(_))));

        let of_reversal = ReversalRequest {
            movement_id: reversal.id,
            created_by: UserId::new(),
            notes: None,
        };
        assert!(matches!(ledger.reverse(of_reversal).await, Err(LedgerError::Validation(_))));

        let missing = ReversalRequest {
            movement_id: MovementId::new(9_999),
            created_by: UserId::new(),
            notes: None,
        };
        assert!(matches!(ledger.reverse(missing).await, Err(LedgerError::NotFound(_))));

        assert_eq!(history_len(&ledger, k).await, 3);
        assert_eq!(ledger.current_stock(k.product_id, k.warehouse_id).await.unwrap(), dec!(10));
    }

    fn transfer(product: ProductId, from: WarehouseId, to: WarehouseId, quantity: Decimal) -> TransferRequest {
        TransferRequest {
            product_id: product,
            from_warehouse: from,
            to_warehouse: to,
            quantity,
            reference: Some(DocumentRef::new("transfer_order", "TO-7")),
            unit_cost: None,
            notes: None,
            created_by: UserId::new(),
        }
    }

    #[tokio::test]
    async fn transfer_posts_both_legs() {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new();
        let (a, b) = (WarehouseId::new(), WarehouseId::new());
        ledger.append(adjust(StreamKey::new(product, a), dec!(12))).await.unwrap();

        let receipt = ledger.transfer(transfer(product, a, b, dec!(5))).await.unwrap();
        assert_eq!(receipt.outbound.movement_type, MovementType::TransferOut);
        assert_eq!(receipt.outbound.quantity, dec!(-5));
        assert_eq!(receipt.outbound.stock_after, dec!(7));
        assert_eq!(receipt.inbound.movement_type, MovementType::TransferIn);
        assert_eq!(receipt.inbound.quantity, dec!(5));
        assert_eq!(receipt.inbound.stock_after, dec!(5));
        assert_eq!(receipt.outbound.reference, receipt.inbound.reference);

        let same = ledger.transfer(transfer(product, a, a, dec!(1))).await;
        assert!(matches!(same, Err(LedgerError::Validation(_))));
        let backwards = ledger.transfer(transfer(product, a, b, dec!(-1))).await;
        assert!(matches!(backwards, Err(LedgerError::Validation(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn opposite_concurrent_transfers_complete_and_conserve_stock() {
        let ledger = shared(LedgerConfig {
            lock_timeout: Duration::from_secs(2),
            ..LedgerConfig::default()
        });
        let product = ProductId::new();
        let (a, b) = (WarehouseId::new(), WarehouseId::new());
        ledger.append(adjust(StreamKey::new(product, a), dec!(100))).await.unwrap();
        ledger.append(adjust(StreamKey::new(product, b), dec!(100))).await.unwrap();

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let ledger = ledger.clone();
                let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
                tokio::spawn(async move { ledger.transfer(transfer(product, from, to, dec!(1))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let totals = ledger.stock_across_warehouses(product).await.unwrap();
        assert_eq!(totals[&a], dec!(100));
        assert_eq!(totals[&b], dec!(100));
        for w in [a, b] {
            let audit = ledger.audit_stream(product, w).await.unwrap();
            assert!(audit.is_consistent());
            assert_eq!(audit.entries, 41);
        }
    }

    #[tokio::test]
    async fn reject_policy_blocks_overdraw_and_keeps_transfers_atomic() {
        let ledger = InMemoryStockLedger::with_config(LedgerConfig {
            negative_stock: NegativeStockPolicy::Reject,
            ..LedgerConfig::default()
        });
        let product = ProductId::new();
        let (a, b) = (WarehouseId::new(), WarehouseId::new());
        ledger.append(adjust(StreamKey::new(product, a), dec!(3))).await.unwrap();

        let err = ledger.transfer(transfer(product, a, b, dec!(4))).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { available, .. } if available == dec!(3)));
        assert_eq!(history_len(&ledger, StreamKey::new(product, b)).await, 0);

        ledger.transfer(transfer(product, a, b, dec!(3))).await.unwrap();
        assert_eq!(ledger.current_stock(product, a).await.unwrap(), dec!(0));
        assert_eq!(ledger.current_stock(product, b).await.unwrap(), dec!(3));
    }

    #[tokio::test]
    async fn history_pages_newest_first_by_default() {
        let ledger = InMemoryStockLedger::with_config(LedgerConfig {
            max_page_size: 3,
            ..LedgerConfig::default()
        });
        let k = key();
        let mut ids = Vec::new();
        for q in 1..=5 {
            ids.push(ledger.append(adjust(k, Decimal::from(q))).await.unwrap().id);
        }

        let first = ledger
            .history(k.product_id, k.warehouse_id, &MovementFilter::default(), Pagination { limit: 2, offset: 0 })
            .await
            .unwrap();
        assert_eq!(first.total, 5);
        assert!(first.has_more);
        let got: Vec<_> = first.movements.iter().map(|m| m.id).collect();
        assert_eq!(got, vec![ids[4], ids[3]]);

        let last = ledger
            .history(k.product_id, k.warehouse_id, &MovementFilter::default(), Pagination { limit: 2, offset: 4 })
            .await
            .unwrap();
        assert_eq!(last.movements.len(), 1);
        assert!(!last.has_more);

        let oldest = ledger
            .history(
                k.product_id,
                k.warehouse_id,
                &MovementFilter { order: SortOrder::OldestFirst, ..MovementFilter::default() },
                Pagination { limit: 50, offset: 0 },
            )
            .await
            .unwrap();
        assert_eq!(oldest.pagination.limit, 3);
        assert_eq!(oldest.movements.first().map(|m| m.id), Some(ids[0]));
    }

    #[tokio::test]
    async fn history_without_limit_uses_configured_page_size() {
        let ledger = InMemoryStockLedger::with_config(LedgerConfig::from_lookup(|name| {
            (name == LedgerConfig::PAGE_SIZE).then(|| "2".to_string())
        }));
        let k = key();
        for q in 1..=5 {
            ledger.append(adjust(k, Decimal::from(q))).await.unwrap();
        }

        let page = ledger
            .history(k.product_id, k.warehouse_id, &MovementFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.pagination, Pagination { limit: 2, offset: 0 });
        assert_eq!(page.movements.len(), 2);
        assert!(page.has_more);

        let explicit = ledger
            .history(k.product_id, k.warehouse_id, &MovementFilter::default(), Pagination { limit: 4, offset: 0 })
            .await
            .unwrap();
        assert_eq!(explicit.movements.len(), 4);
    }

    async fn filtered_ids(ledger: &InMemoryStockLedger, key: StreamKey, filter: MovementFilter) -> Vec<MovementId> {
        ledger
            .history(key.product_id, key.warehouse_id, &filter, Pagination::default())
            .await
            .unwrap()
            .movements
            .iter()
            .map(|m| m.id)
            .collect()
    }

    #[tokio::test]
    async fn history_and_summary_honor_date_type_and_reference_filters() {
        let ledger = InMemoryStockLedger::new();
        let k = key();

        let mut receipt = movement(k, MovementType::PurchaseReceipt, QuantityInput::inbound(dec!(10)));
        receipt.reference = Some(DocumentRef::new("purchase_order", "PO-1"));
        receipt.unit_cost = Some(dec!(2));
        let first = ledger.append(receipt).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let mut sale = movement(k, MovementType::Sale, QuantityInput::outbound(dec!(3)));
        sale.reference = Some(DocumentRef::new("sales_order", "SO-1"));
        let second = ledger.append(sale).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let third = ledger.append(adjust(k, dec!(1))).await.unwrap();

        let window = MovementFilter::between(second.created_at, second.created_at);
        assert_eq!(filtered_ids(&ledger, k, window).await, vec![second.id]);
        assert_eq!(
            filtered_ids(&ledger, k, MovementFilter { created_from: Some(second.created_at), ..MovementFilter::default() }).await,
            vec![third.id, second.id]
        );
        assert_eq!(
            filtered_ids(&ledger, k, MovementFilter { created_to: Some(first.created_at), ..MovementFilter::default() }).await,
            vec![first.id]
        );
        assert_eq!(filtered_ids(&ledger, k, MovementFilter::by_type(MovementType::Sale)).await, vec![second.id]);
        assert_eq!(
            filtered_ids(&ledger, k, MovementFilter {
                reference_type: Some("purchase_order".into()),
                reference_id: Some("PO-1".into()),
                ..MovementFilter::default()
            })
            .await,
            vec![first.id]
        );
        assert!(filtered_ids(&ledger, k, MovementFilter {
            reference_id: Some("PO-2".into()),
            ..MovementFilter::default()
        })
        .await
        .is_empty());

        let window = ledger
            .summary(
                k.product_id,
                Some(k.warehouse_id),
                &MovementFilter::between(first.created_at, second.created_at),
            )
            .await
            .unwrap();
        assert_eq!((window.inbound, window.outbound, window.net), (dec!(10), dec!(3), dec!(7)));
        assert_eq!((window.entries, window.valuation), (2, dec!(20)));

        let receipts = ledger
            .summary(k.product_id, Some(k.warehouse_id), &MovementFilter::by_type(MovementType::PurchaseReceipt))
            .await
            .unwrap();
        assert_eq!((receipts.inbound, receipts.outbound, receipts.entries), (dec!(10), dec!(0), 1));

        let by_ref = ledger
            .summary(
                k.product_id,
                Some(k.warehouse_id),
                &MovementFilter { reference_type: Some("sales_order".into()), ..MovementFilter::default() },
            )
            .await
            .unwrap();
        assert_eq!((by_ref.outbound, by_ref.net, by_ref.entries), (dec!(3), dec!(-3), 1));
    }

    #[tokio::test]
    async fn summary_without_warehouse_spans_every_stream_of_the_product() {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new();
        let (a, b) = (WarehouseId::new(), WarehouseId::new());
        ledger.append(adjust(StreamKey::new(product, a), dec!(10))).await.unwrap();
        ledger.append(adjust(StreamKey::new(product, b), dec!(5))).await.unwrap();
        ledger
            .append(movement(StreamKey::new(product, b), MovementType::Sale, QuantityInput::outbound(dec!(2))))
            .await
            .unwrap();
        ledger.append(adjust(key(), dec!(100))).await.unwrap();

        let all = ledger.summary(product, None, &MovementFilter::default()).await.unwrap();
        assert_eq!((all.inbound, all.outbound, all.net, all.entries), (dec!(15), dec!(2), dec!(13), 3));

        let sales = ledger
            .summary(product, None, &MovementFilter::by_type(MovementType::Sale))
            .await
            .unwrap();
        assert_eq!((sales.outbound, sales.entries), (dec!(2), 1));

        let only_a = ledger.summary(product, Some(a), &MovementFilter::default()).await.unwrap();
        assert_eq!((only_a.net, only_a.entries), (dec!(10), 1));
    }

    #[tokio::test]
    async fn amounts_beyond_stored_precision_are_rejected() {
        let ledger = InMemoryStockLedger::new();
        let k = key();

        let err = ledger.append(adjust(k, dec!(0.123456785))).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let mut costed = adjust(k, dec!(1));
        costed.unit_cost = Some(dec!(1.000000001));
        assert!(matches!(ledger.append(costed).await, Err(LedgerError::Validation(_))));

        let product = k.product_id;
        let err = ledger
            .transfer(transfer(product, k.warehouse_id, WarehouseId::new(), dec!(0.000000001)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        assert!(matches!(ledger.append(adjust(k, Decimal::MAX)).await, Err(LedgerError::Validation(_))));
        assert_eq!(ledger.append(adjust(k, Decimal::ONE)).await.unwrap().stock_after, dec!(1));
        assert_eq!(history_len(&ledger, k).await, 1);
    }

    #[tokio::test]
    async fn empty_stream_reads() {
        let ledger = InMemoryStockLedger::new();
        let k = key();

        assert_eq!(ledger.current_stock(k.product_id, k.warehouse_id).await.unwrap(), dec!(0));
        assert!(matches!(
            ledger.latest_movement(k.product_id, k.warehouse_id).await,
            Err(LedgerError::NotFound(_))
        ));
        let audit = ledger.audit_stream(k.product_id, k.warehouse_id).await.unwrap();
        assert_eq!((audit.entries, audit.snapshot_balance), (0, None));
        assert!(ledger.stock_across_warehouses(k.product_id).await.unwrap().is_empty());
    }
}
