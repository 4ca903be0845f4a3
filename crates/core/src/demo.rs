//! Fixed demo records.
//!
//! Shown when the backend is unreachable and demo fallback is enabled, and
//! used by `gainsy seed` to populate a fresh account. IDs come from
//! [`fixed_uuid`] and timestamps are relative to [`reference_time`], so the
//! data is identical on every call.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::entities::{Product, Store, SystemAlert, Template};
use crate::types::{
    AlertId, AlertSeverity, CurrencyCode, ProductId, ProductStatus, StoreId, StoreStatus,
    TemplateCategory, TemplateId, UserId, fixed_uuid,
};

/// 2024-06-01T00:00:00Z.
const REFERENCE_SECS: i64 = 1_717_200_000;

/// Point in time the demo timestamps are anchored to.
#[must_use]
pub fn reference_time() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(REFERENCE_SECS)
}

fn days_ago(days: i64) -> DateTime<Utc> {
    reference_time() - TimeDelta::days(days)
}

/// Owner of every demo record.
#[must_use]
pub const fn user_id() -> UserId {
    UserId::new(fixed_uuid(0x1))
}

const fn store_id(n: u128) -> StoreId {
    StoreId::new(fixed_uuid(0x100 + n))
}

/// Demo stores.
#[must_use]
pub fn stores() -> Vec<Store> {
    let store = |n: u128, name: &str, shop: &str, status: StoreStatus, age: i64| Store {
        id: store_id(n),
        user_id: user_id(),
        name: name.to_string(),
        etsy_shop_name: shop.to_string(),
        shop_url: None,
        currency: CurrencyCode::Usd,
        status,
        created_at: days_ago(age),
        updated_at: days_ago(age / 4),
    };

    vec![
        store(1, "Moss & Fern Pottery", "MossAndFernPottery", StoreStatus::Active, 240),
        store(2, "Northwind Prints", "NorthwindPrints", StoreStatus::Active, 120),
        store(3, "Little Loom Studio", "LittleLoomStudio", StoreStatus::Paused, 45),
    ]
}

struct Row {
    store: u128,
    title: &'static str,
    price: Decimal,
    quantity: i32,
    sku: &'static str,
    tags: &'static [&'static str],
    status: ProductStatus,
    views: i64,
    favorites: i64,
    sales: i64,
    age: i64,
}

const ROWS: &[Row] = &[
    Row {
        store: 1,
        title: "Speckled Ceramic Mug, 12oz",
        price: Decimal::from_parts(3250, 0, 0, false, 2),
        quantity: 24,
        sku: "MFP-MUG-12",
        tags: &["ceramic mug", "handmade", "coffee", "gift for her"],
        status: ProductStatus::Active,
        views: 4_820,
        favorites: 611,
        sales: 143,
        age: 200,
    },
    Row {
        store: 1,
        title: "Stoneware Serving Bowl",
        price: Decimal::from_parts(6800, 0, 0, false, 2),
        quantity: 3,
        sku: "MFP-BOWL-L",
        tags: &["stoneware", "ceramic", "kitchen"],
        status: ProductStatus::Active,
        views: 2_105,
        favorites: 288,
        sales: 37,
        age: 150,
    },
    Row {
        store: 1,
        title: "Ceramic Bud Vase Set of 3",
        price: Decimal::from_parts(4500, 0, 0, false, 2),
        quantity: 0,
        sku: "MFP-VASE-3",
        tags: &["bud vase", "ceramic", "home decor"],
        status: ProductStatus::SoldOut,
        views: 3_390,
        favorites: 502,
        sales: 88,
        age: 95,
    },
    Row {
        store: 1,
        title: "Glazed Ring Dish",
        price: Decimal::from_parts(1800, 0, 0, false, 2),
        quantity: 40,
        sku: "MFP-DISH-R",
        tags: &["ring dish", "jewelry storage"],
        status: ProductStatus::Draft,
        views: 0,
        favorites: 0,
        sales: 0,
        age: 4,
    },
    Row {
        store: 2,
        title: "Botanical Art Print, A4",
        price: Decimal::from_parts(2400, 0, 0, false, 2),
        quantity: 120,
        sku: "NWP-BOT-A4",
        tags: &["art print", "botanical", "wall art"],
        status: ProductStatus::Active,
        views: 6_012,
        favorites: 734,
        sales: 201,
        age: 110,
    },
    Row {
        store: 2,
        title: "Mountain Landscape Poster",
        price: Decimal::from_parts(3600, 0, 0, false, 2),
        quantity: 5,
        sku: "NWP-MTN-50",
        tags: &["poster", "landscape", "wall art"],
        status: ProductStatus::Active,
        views: 1_540,
        favorites: 190,
        sales: 29,
        age: 60,
    },
    Row {
        store: 2,
        title: "Custom Pet Portrait Print",
        price: Decimal::from_parts(5500, 0, 0, false, 2),
        quantity: 999,
        sku: "NWP-PET-C",
        tags: &["pet portrait", "custom", "dog lover"],
        status: ProductStatus::Active,
        views: 980,
        favorites: 150,
        sales: 12,
        age: 6,
    },
    Row {
        store: 3,
        title: "Chunky Knit Throw Blanket",
        price: Decimal::from_parts(12900, 0, 0, false, 2),
        quantity: 2,
        sku: "LLS-THROW",
        tags: &["knit blanket", "chunky knit", "cozy"],
        status: ProductStatus::Inactive,
        views: 870,
        favorites: 215,
        sales: 9,
        age: 40,
    },
    Row {
        store: 3,
        title: "Macrame Plant Hanger",
        price: Decimal::from_parts(2200, 0, 0, false, 2),
        quantity: 15,
        sku: "LLS-MAC-PH",
        tags: &["macrame", "plant hanger", "boho"],
        status: ProductStatus::Draft,
        views: 0,
        favorites: 0,
        sales: 0,
        age: 2,
    },
];

/// Demo products, newest last.
#[must_use]
pub fn products() -> Vec<Product> {
    ROWS.iter()
        .zip(1_u128..)
        .map(|(row, n)| Product {
            id: ProductId::new(fixed_uuid(0x200 + n)),
            user_id: user_id(),
            store_id: store_id(row.store),
            title: row.title.to_string(),
            description: format!("{}. Made by hand in small batches.", row.title),
            price: row.price,
            currency: CurrencyCode::Usd,
            quantity: row.quantity,
            sku: Some(row.sku.to_string()),
            tags: row.tags.iter().map(ToString::to_string).collect(),
            status: row.status,
            views: row.views,
            favorites: row.favorites,
            sales: row.sales,
            revenue: row.price * Decimal::from(row.sales),
            image_url: None,
            created_at: days_ago(row.age),
            updated_at: days_ago(row.age / 2),
        })
        .collect()
}

/// Demo listing templates.
#[must_use]
pub fn templates() -> Vec<Template> {
    let template = |n: u128, name: &str, category, content: &str, is_default, age| Template {
        id: TemplateId::new(fixed_uuid(0x300 + n)),
        user_id: user_id(),
        name: name.to_string(),
        category,
        content: content.to_string(),
        is_default,
        created_at: days_ago(age),
        updated_at: days_ago(age / 3),
    };

    vec![
        template(
            1,
            "Handmade description",
            TemplateCategory::Description,
            "{title} from {store}.\n\nEvery piece is made by hand, so small variations are part of its charm.\n\nTags: {tags}",
            true,
            180,
        ),
        template(
            2,
            "SEO title",
            TemplateCategory::Title,
            "{title} | Handmade Gift | {store}",
            false,
            90,
        ),
        template(
            3,
            "Standard shipping",
            TemplateCategory::Shipping,
            "Ships within 3-5 business days. Only {quantity} left in stock!",
            true,
            150,
        ),
        template(
            4,
            "Returns policy",
            TemplateCategory::Policy,
            "Returns accepted within 30 days of delivery. Buyers pay return shipping.",
            false,
            30,
        ),
    ]
}

/// Demo alerts: one global, one per-user, one already resolved.
#[must_use]
pub fn alerts() -> Vec<SystemAlert> {
    vec![
        SystemAlert {
            id: AlertId::new(fixed_uuid(0x401)),
            user_id: None,
            severity: AlertSeverity::Info,
            title: "Scheduled maintenance".to_string(),
            message: "Store sync will pause briefly on Sunday at 02:00 UTC.".to_string(),
            is_resolved: false,
            created_at: days_ago(1),
        },
        SystemAlert {
            id: AlertId::new(fixed_uuid(0x402)),
            user_id: Some(user_id()),
            severity: AlertSeverity::Warning,
            title: "Low stock".to_string(),
            message: "Stoneware Serving Bowl has only 3 left.".to_string(),
            is_resolved: false,
            created_at: days_ago(2),
        },
        SystemAlert {
            id: AlertId::new(fixed_uuid(0x403)),
            user_id: Some(user_id()),
            severity: AlertSeverity::Critical,
            title: "Store disconnected".to_string(),
            message: "Little Loom Studio lost its Etsy connection.".to_string(),
            is_resolved: true,
            created_at: days_ago(20),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_products_are_valid_drafts() {
        for product in products() {
            let draft = crate::ProductDraft::from(&product);
            assert_eq!(draft.validate(), Ok(()), "{}", product.title);
        }
    }

    #[test]
    fn test_demo_stores_are_valid_drafts() {
        for store in stores() {
            assert_eq!(crate::StoreDraft::from(&store).validate(), Ok(()));
        }
    }

    #[test]
    fn test_every_product_belongs_to_a_demo_store() {
        let ids: Vec<StoreId> = stores().iter().map(|s| s.id).collect();
        assert!(products().iter().all(|p| ids.contains(&p.store_id)));
    }

    #[test]
    fn test_demo_data_is_stable() {
        assert_eq!(products(), products());
        assert_eq!(user_id().to_string(), "6a1e5000-0000-4000-8000-000000000001");
    }
}
