//! PostgreSQL document store tests.
//!
//! Need a reachable database via `DATABASE_URL`; run with
//! `cargo test -p pantry-db -- --ignored`.

use std::sync::Arc;

use assert_matches::assert_matches;
use pantry_core::records::{
    BuyListItemPatch, FridgeItemPatch, NewBuyListItem, NewFridgeItem, StorageLocation,
};
use pantry_db::{BuyListRepo, FridgeRepo, PgDocumentStore, StoreError};
use sqlx::PgPool;

fn fridge(pool: PgPool) -> FridgeRepo {
    FridgeRepo::new(Arc::new(PgDocumentStore::new(pool)))
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_add_update_list_delete(pool: PgPool) {
    pantry_db::health_check(&pool).await.unwrap();
    let repo = fridge(pool);

    let draft = NewFridgeItem {
        amount: Some("1".into()),
        unit: Some("kg".into()),
        ..NewFridgeItem::new("carrot", "vegetable", StorageLocation::Refrigerated)
    };
    let created = repo.add_item(&draft).await.unwrap();

    let patch = FridgeItemPatch {
        amount: Some("2".into()),
        ..Default::default()
    };
    let ts = repo.update_item(&created.id, &patch).await.unwrap();
    assert!(ts > created.record.updated_at);

    let all = repo.get_all_items(None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].amount.as_deref(), Some("2"));
    assert_eq!(all[0].unit.as_deref(), Some("kg"));
    assert_eq!(all[0].updated_at, ts);

    repo.delete_item(&created.id).await.unwrap();
    assert!(repo.get_all_items(None).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_ordering_and_category_filter(pool: PgPool) {
    let repo = fridge(pool);
    for (name, category) in [("a", "x"), ("b", "y"), ("c", "x")] {
        repo.add_item(&NewFridgeItem::new(name, category, StorageLocation::Other))
            .await
            .unwrap();
    }

    let names: Vec<_> = repo
        .get_all_items(None)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, ["c", "b", "a"]);

    let xs = repo.get_items_by_category("x", None).await.unwrap();
    assert_eq!(xs.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_conflict_and_missing(pool: PgPool) {
    let repo = fridge(pool);
    let created = repo
        .add_item(&NewFridgeItem::new("egg", "dairy", StorageLocation::Refrigerated))
        .await
        .unwrap();
    let patch = FridgeItemPatch {
        count: Some("6".into()),
        ..Default::default()
    };

    repo.update_item(&created.id, &patch).await.unwrap();
    let stale = repo
        .update_item_if_unchanged(&created.id, &patch, created.record.updated_at)
        .await;
    assert_matches!(stale, Err(StoreError::Conflict { .. }));

    let missing = repo.update_item("nope", &patch).await;
    assert_matches!(missing, Err(StoreError::NotFound { .. }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_checked_and_clear_memos(pool: PgPool) {
    let repo = BuyListRepo::new(Arc::new(PgDocumentStore::new(pool)));
    let first = repo
        .add_item(&NewBuyListItem::new("bread").with_memo("rye"))
        .await
        .unwrap();
    repo.add_item(&NewBuyListItem::new("milk").with_memo("oat"))
        .await
        .unwrap();

    repo.update_item(&first.id, &BuyListItemPatch::checked(true))
        .await
        .unwrap();
    let checked = repo.get_checked_items(None).await.unwrap();
    assert_eq!(checked.len(), 1);
    assert_eq!(checked[0].id, first.id);

    repo.clear_all_memos(None).await.unwrap();
    let items = repo.get_all_items(None).await.unwrap();
    assert!(items.iter().all(|i| i.memo.as_deref() == Some("")));
}
