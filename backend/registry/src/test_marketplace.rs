use crate::accounts::{self, RegisterUser};
use crate::errors::RegistryError;
use crate::marketplace::{self, ListingInput, OrderInput, SellerInput};
use crate::models::OrderStatus;
use crate::path::{Collection, DocPath};
use crate::test_utils::memory_store;

fn seller(price: f64, min_qty: u32, max_qty: u32) -> SellerInput {
    SellerInput {
        email: "seller@mail.com".into(),
        full_name: Some("Meera".into()),
        price,
        min_qty,
        max_qty,
    }
}

fn order(qty: u32) -> OrderInput {
    OrderInput {
        buyer_id: "buyer-1".into(),
        buyer_email: Some("buyer@mail.com".into()),
        qty,
    }
}

fn user(wallet: &str) -> RegisterUser {
    RegisterUser {
        wallet_address: wallet.into(),
        name: Some("Kiran".into()),
        phone: None,
        role: Some("ngo".into()),
        age: Some(31),
        land_proof: None,
    }
}

#[tokio::test]
async fn test_seller_validation() {
    let store = memory_store().await;
    for bad in [seller(0.0, 1, 10), seller(-2.0, 1, 10), seller(5.0, 0, 10), seller(5.0, 11, 10)] {
        let err = marketplace::publish_seller(&store, "u1", bad)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }
    assert!(marketplace::active_sellers(&store).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_republishing_overwrites_listing() {
    let store = memory_store().await;
    marketplace::publish_seller(&store, "u1", seller(5.0, 1, 10))
        .await
        .unwrap();
    marketplace::publish_seller(&store, "u1", seller(7.5, 2, 20))
        .await
        .unwrap();

    let sellers = marketplace::active_sellers(&store).await.unwrap();
    assert_eq!(sellers.len(), 1);
    assert_eq!(sellers[0].price, 7.5);
    assert_eq!(sellers[0].max_qty, 20);
}

#[tokio::test]
async fn test_order_within_bounds() {
    let store = memory_store().await;
    marketplace::publish_seller(&store, "u1", seller(12.5, 2, 10))
        .await
        .unwrap();

    let placed = marketplace::place_order(&store, "u1", order(4)).await.unwrap();
    assert_eq!(placed.path.collection, Collection::Orders);
    assert_eq!(placed.path.owner, "u1");
    assert_eq!(placed.value.order_id, placed.path.id);
    assert_eq!(placed.value.total_amount, 50.0);
    assert_eq!(placed.value.price_per_credit, 12.5);
    assert_eq!(placed.value.status, OrderStatus::Initiated);

    for qty in [1, 11] {
        let err = marketplace::place_order(&store, "u1", order(qty))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    let orders = marketplace::orders_for(&store, "u1").await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].value.qty, 4);
}

#[tokio::test]
async fn test_order_against_unknown_seller() {
    let store = memory_store().await;
    let err = marketplace::place_order(&store, "ghost", order(1))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
}

#[tokio::test]
async fn test_contributor_listing_keyed_by_owner() {
    let store = memory_store().await;
    let listing = marketplace::publish_listing(
        &store,
        "ravi.k@mail.com",
        ListingInput {
            price: 9.0,
            wallet_address: Some("  ".into()),
        },
    )
    .await
    .unwrap();
    assert_eq!(
        listing.path,
        DocPath::flat(Collection::Marketplace, "ravi,k@mail,com")
    );
    assert_eq!(listing.value.wallet_address, None);

    let err = marketplace::publish_listing(
        &store,
        "ravi.k@mail.com",
        ListingInput {
            price: 0.0,
            wallet_address: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));

    let updated = marketplace::publish_listing(
        &store,
        "ravi.k@mail.com",
        ListingInput {
            price: 11.0,
            wallet_address: Some("0x9f2b".into()),
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.version, 2);

    let all = marketplace::listings(&store).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].path, listing.path);
    assert_eq!(all[0].value.price, 11.0);
    assert_eq!(all[0].value.wallet_address.as_deref(), Some("0x9f2b"));
}

#[tokio::test]
async fn test_register_then_login() {
    let store = memory_store().await;
    let profile = accounts::register_user(&store, user("0xabc")).await.unwrap();
    assert_eq!(profile.wallet_address, "0xabc");
    assert!(profile.projects.is_empty());

    let err = accounts::register_user(&store, user("0xabc")).await.unwrap_err();
    assert!(matches!(err, RegistryError::Conflict(_)));

    let logged_in = accounts::login_user(&store, " 0xabc ").await.unwrap();
    assert_eq!(logged_in, profile);

    let err = accounts::login_user(&store, "0xdef").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
    let err = accounts::login_user(&store, "").await.unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));
}
