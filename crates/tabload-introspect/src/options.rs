/// Options that control which namespace the catalog reads.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub schema: String,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
        }
    }
}
