use std::sync::Arc;

use crate::catalog::Catalog;

pub(crate) const CATALOG_FIXTURE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/catalog.json"
));

pub(crate) fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_json_str(CATALOG_FIXTURE).expect("fixture catalog should parse"))
}
