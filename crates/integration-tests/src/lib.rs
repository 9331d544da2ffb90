//! Integration test support for Stockbridge.
//!
//! Provides in-process HTTP stubs that mimic just enough of the two
//! upstream services for the engine clients to run against real sockets:
//!
//! - [`spawn_warehouse_stub`] - the Sellmate-style paginated stock listing
//! - [`spawn_shopify_stub`] - the Shopify GraphQL endpoint, serving a
//!   variant feed and recording mutations for assertions
//!
//! Plus JSON fixture builders for both wire formats. Everything binds an
//! ephemeral localhost port, so tests run in parallel without port
//! clashes and without touching the network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stockbridge-integration-tests
//! ```

// serde_json's Index is total; indexing a Value never panics.
#![allow(clippy::indexing_slicing)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use secrecy::SecretString;
use serde_json::{Value, json};
use stockbridge_engine::shopify::ShopifyClient;
use stockbridge_engine::warehouse::{WarehouseClient, WarehouseCredentials};

/// GraphQL path both the stub and the clients under test agree on.
pub const STUB_API_PATH: &str = "/admin/api/2025-10/graphql.json";

/// Serve a router on an ephemeral localhost port and return its address.
///
/// # Panics
///
/// Panics if the listener cannot bind, which means the test environment
/// is broken.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve stub");
    });
    addr
}

// =============================================================================
// Warehouse stub
// =============================================================================

/// A running warehouse stock listing stub.
pub struct WarehouseStub {
    /// Stock listing URL to point [`WarehouseCredentials`] at.
    pub url: String,
    /// Bearer token the stub accepts.
    pub token: String,
    /// Number of listing requests served, auth failures included.
    pub requests: Arc<AtomicUsize>,
}

impl WarehouseStub {
    /// A client authenticated against this stub.
    #[must_use]
    pub fn client(&self) -> WarehouseClient {
        WarehouseClient::new(self.credentials())
    }

    /// Credentials pointing at this stub.
    #[must_use]
    pub fn credentials(&self) -> WarehouseCredentials {
        WarehouseCredentials {
            api_url: self.url.clone(),
            api_token: SecretString::from(self.token.clone()),
        }
    }
}

struct WarehouseStubState {
    token: String,
    pages: Vec<Value>,
    requests: Arc<AtomicUsize>,
}

/// Spawn a warehouse stub serving `pages` keyed by the `page` query
/// parameter (1-based). A page value may be an `{"errors": [...]}`
/// envelope to exercise the error path.
pub async fn spawn_warehouse_stub(token: &str, pages: Vec<Value>) -> WarehouseStub {
    let requests = Arc::new(AtomicUsize::new(0));
    let state = Arc::new(WarehouseStubState {
        token: token.to_string(),
        pages,
        requests: requests.clone(),
    });

    let router = Router::new()
        .route("/stocks", get(stock_listing))
        .with_state(state);
    let addr = spawn_server(router).await;

    WarehouseStub {
        url: format!("http://{addr}/stocks"),
        token: token.to_string(),
        requests,
    }
}

async fn stock_listing(
    State(state): State<Arc<WarehouseStubState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let expected = format!("Bearer {}", state.token);
    if headers.get("Authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "unauthenticated"})),
        );
    }

    let page: usize = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or_default();
    page.checked_sub(1).and_then(|i| state.pages.get(i)).map_or(
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "page out of range"})),
        ),
        |body| (StatusCode::OK, Json(body.clone())),
    )
}

/// Stock listing page envelope in the shape the warehouse serves.
#[must_use]
pub fn stock_page(rows: &[Value], current_page: u32, last_page: u32, total: i64) -> Value {
    json!({
        "data": rows,
        "meta": {"current_page": current_page, "last_page": last_page, "total": total}
    })
}

/// One stock row with its `(shopId, optionCode)` entries.
#[must_use]
pub fn stock_row(id: i64, name: &str, stock: i64, codes: &[(i64, &str)]) -> Value {
    let shop_codes: Vec<Value> = codes
        .iter()
        .map(|(shop_id, code)| json!({"shopId": shop_id, "optionCode": code}))
        .collect();
    json!({
        "id": id,
        "optionName": name,
        "stock": stock,
        "sku": null,
        "costPrice": null,
        "sellingPrice": null,
        "optionHasCodeByShop": shop_codes
    })
}

// =============================================================================
// Shopify stub
// =============================================================================

/// A running Shopify GraphQL stub.
pub struct ShopifyStub {
    /// Full GraphQL endpoint URL.
    pub endpoint: String,
    /// Shared state, kept for post-run assertions.
    pub state: Arc<ShopifyStubState>,
}

impl ShopifyStub {
    /// A client authenticated against this stub.
    #[must_use]
    pub fn client(&self) -> ShopifyClient {
        ShopifyClient::new(
            self.endpoint.clone(),
            SecretString::from(self.state.token.clone()),
        )
    }

    /// Variables of every `productVariants` query received, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the recording mutex is poisoned.
    #[must_use]
    pub fn variant_queries(&self) -> Vec<Value> {
        self.state.variant_queries.lock().expect("lock").clone()
    }

    /// Recorded `inventorySetQuantities` inputs, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the recording mutex is poisoned.
    #[must_use]
    pub fn inventory_calls(&self) -> Vec<Value> {
        self.state.inventory_calls.lock().expect("lock").clone()
    }

    /// Recorded `metafieldsSet` metafield arrays, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the recording mutex is poisoned.
    #[must_use]
    pub fn metafield_calls(&self) -> Vec<Value> {
        self.state.metafield_calls.lock().expect("lock").clone()
    }
}

/// Behavior and recordings of the Shopify stub.
pub struct ShopifyStubState {
    /// Access token the stub accepts.
    pub token: String,
    /// Variant feed pages. Page 0 is served for a null `after` cursor;
    /// an `after` of `"cursor-N"` serves page N.
    pub variant_pages: Vec<Value>,
    /// Owner GIDs whose `metafieldsSet` calls answer with a user error.
    pub failing_owners: Vec<String>,
    /// Inventory item GIDs whose `inventorySetQuantities` calls answer
    /// with a user error.
    pub failing_inventory_items: Vec<String>,
    /// Variables of every `productVariants` query received.
    pub variant_queries: Mutex<Vec<Value>>,
    /// `input` of every `inventorySetQuantities` mutation received.
    pub inventory_calls: Mutex<Vec<Value>>,
    /// `metafields` of every `metafieldsSet` mutation received.
    pub metafield_calls: Mutex<Vec<Value>>,
}

impl ShopifyStubState {
    /// State serving the given variant feed pages.
    #[must_use]
    pub fn new(token: &str, variant_pages: Vec<Value>) -> Self {
        Self {
            token: token.to_string(),
            variant_pages,
            failing_owners: Vec::new(),
            failing_inventory_items: Vec::new(),
            variant_queries: Mutex::new(Vec::new()),
            inventory_calls: Mutex::new(Vec::new()),
            metafield_calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `metafieldsSet` fail with a user error for this owner.
    #[must_use]
    pub fn with_failing_owner(mut self, owner_gid: &str) -> Self {
        self.failing_owners.push(owner_gid.to_string());
        self
    }

    /// Make `inventorySetQuantities` fail with a user error for this
    /// inventory item.
    #[must_use]
    pub fn with_failing_inventory_item(mut self, item_gid: &str) -> Self {
        self.failing_inventory_items.push(item_gid.to_string());
        self
    }
}

/// Spawn a Shopify GraphQL stub with the given behavior.
pub async fn spawn_shopify_stub(state: ShopifyStubState) -> ShopifyStub {
    let state = Arc::new(state);
    let router = Router::new()
        .route(STUB_API_PATH, post(graphql))
        .with_state(state.clone());
    let addr = spawn_server(router).await;

    ShopifyStub {
        endpoint: format!("http://{addr}{STUB_API_PATH}"),
        state,
    }
}

async fn graphql(
    State(state): State<Arc<ShopifyStubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let token_ok = headers
        .get("X-Shopify-Access-Token")
        .and_then(|v| v.to_str().ok())
        == Some(state.token.as_str());
    if !token_ok {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"errors": "Invalid API key or access token"})),
        );
    }

    let query = body["query"].as_str().unwrap_or_default();
    let variables = body["variables"].clone();

    if query.contains("productVariants") {
        state
            .variant_queries
            .lock()
            .expect("lock")
            .push(variables.clone());

        let index = match variables["after"].as_str() {
            None => 0,
            Some(cursor) => cursor
                .strip_prefix("cursor-")
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(usize::MAX),
        };
        return state.variant_pages.get(index).map_or_else(
            || {
                (
                    StatusCode::OK,
                    Json(json!({
                        "errors": [{"message": format!("no stub page for cursor index {index}")}]
                    })),
                )
            },
            |page| (StatusCode::OK, Json(page.clone())),
        );
    }

    if query.contains("inventorySetQuantities") {
        let input = variables["input"].clone();
        state.inventory_calls.lock().expect("lock").push(input.clone());

        let item = input["quantities"][0]["inventoryItemId"]
            .as_str()
            .unwrap_or_default();
        if state.failing_inventory_items.iter().any(|gid| gid == item) {
            return (
                StatusCode::OK,
                Json(json!({
                    "data": {
                        "inventorySetQuantities": {
                            "inventoryAdjustmentGroup": null,
                            "userErrors": [
                                {"field": ["input"], "message": "inventory item is not stocked at the location"}
                            ]
                        }
                    }
                })),
            );
        }
        return (
            StatusCode::OK,
            Json(json!({
                "data": {
                    "inventorySetQuantities": {
                        "inventoryAdjustmentGroup": {"createdAt": "2026-08-25T00:00:00Z"},
                        "userErrors": []
                    }
                }
            })),
        );
    }

    if query.contains("metafieldsSet") {
        let metafields = variables["metafields"].clone();
        state
            .metafield_calls
            .lock()
            .expect("lock")
            .push(metafields.clone());

        let owner = metafields[0]["ownerId"].as_str().unwrap_or_default();
        if state.failing_owners.iter().any(|gid| gid == owner) {
            return (
                StatusCode::OK,
                Json(json!({
                    "data": {
                        "metafieldsSet": {
                            "userErrors": [
                                {"field": ["ownerId"], "message": "owner cannot be written"}
                            ]
                        }
                    }
                })),
            );
        }
        return (
            StatusCode::OK,
            Json(json!({"data": {"metafieldsSet": {"userErrors": []}}})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({"errors": [{"message": "unrecognized query"}]})),
    )
}

/// Variant feed page in the shape the GraphQL API serves.
#[must_use]
pub fn variant_feed_page(nodes: &[Value], has_next: bool, end_cursor: Option<&str>) -> Value {
    json!({
        "data": {
            "productVariants": {
                "pageInfo": {"hasNextPage": has_next, "endCursor": end_cursor},
                "nodes": nodes
            }
        }
    })
}

/// One variant node with a single inventory level at location 100.
///
/// The inventory item ID is derived as `variant_id + 500_000` so tests
/// can predict the GIDs mutations should carry.
#[must_use]
pub fn variant_node(
    variant_id: i64,
    sku: &str,
    tags: &[&str],
    available: i64,
    sync_flag: Option<&str>,
) -> Value {
    json!({
        "id": format!("gid://shopify/ProductVariant/{variant_id}"),
        "title": "Default",
        "sku": sku,
        "barcode": null,
        "inventoryQuantity": available,
        "product": {
            "id": format!("gid://shopify/Product/{}", variant_id + 100_000),
            "title": format!("Product {variant_id}"),
            "tags": tags
        },
        "inventoryItem": {
            "id": format!("gid://shopify/InventoryItem/{}", inventory_item_id(variant_id)),
            "inventoryLevels": {
                "nodes": [{
                    "location": {"id": "gid://shopify/Location/100", "name": "Main"},
                    "quantities": [{"name": "available", "quantity": available}]
                }]
            }
        },
        "pimSync": sync_flag.map(|v| json!({"value": v})),
        "pimSyncTimestamp": null
    })
}

/// The inventory item ID [`variant_node`] gives a variant.
#[must_use]
pub const fn inventory_item_id(variant_id: i64) -> i64 {
    variant_id + 500_000
}

/// Location ID every [`variant_node`] is stocked at.
pub const STUB_LOCATION_ID: i64 = 100;
