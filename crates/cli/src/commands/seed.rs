//! Seed the catalog from a YAML file.
//!
//! Products are upserted by slug, so the same file can be loaded repeatedly.
//! Every product is validated before the database is touched.
//!
//! ```yaml
//! products:
//!   - name: Merino Wool Socks
//!     brand: Trailhead
//!     category: apparel
//!     price: "18.00"
//!     stock: 40
//!     tags: [wool, socks]
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use shopfront_api::db::ProductRepository;
use shopfront_api::models::ProductInput;

use super::connect;

/// Top-level layout of a catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<ProductInput>,
}

/// Counts reported after seeding.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub updated: usize,
}

/// Parse and validate a catalog file's contents.
///
/// Returns the validated products, or one message per invalid entry.
fn parse_catalog(content: &str) -> Result<Vec<ProductInput>, Vec<String>> {
    let file: CatalogFile = serde_yaml::from_str(content).map_err(|e| vec![e.to_string()])?;

    let mut products = Vec::with_capacity(file.products.len());
    let mut errors = Vec::new();
    for (index, product) in file.products.into_iter().enumerate() {
        let label = format!("#{} ({})", index + 1, product.name.trim());
        match product.validated() {
            Ok(product) => products.push(product),
            Err(msg) => errors.push(format!("{label}: {msg}")),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// How [`catalog`] treats the existing data.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedOptions {
    /// Delete every product before loading.
    pub clear_existing: bool,
    /// Stop after validation.
    pub dry_run: bool,
}

/// Upsert products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or if a database
/// operation fails.
pub async fn catalog(
    path: &Path,
    options: SeedOptions,
) -> Result<SeedResult, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }

    info!(path = %path.display(), "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;

    let products = match parse_catalog(&content) {
        Ok(products) => products,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!(products = products.len(), "Catalog validated");

    if options.dry_run {
        info!("Dry run, database not touched");
        return Ok(SeedResult::default());
    }

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    if options.clear_existing {
        let removed = repo.delete_all().await?;
        info!(removed, "Cleared existing catalog");
    }

    let mut result = SeedResult::default();
    for product in &products {
        let (_, inserted) = repo.upsert_by_slug(product).await?;
        if inserted {
            result.inserted += 1;
        } else {
            result.updated += 1;
        }
    }

    info!(
        inserted = result.inserted,
        updated = result.updated,
        "Seeding complete"
    );
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog_fills_slugs() {
        let yaml = r#"
products:
  - name: Merino Wool Socks
    price: "18.00"
    stock: 40
  - name: Camp Mug
    slug: enamel-mug
    price: "12.5"
"#;
        let products = parse_catalog(yaml).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products.first().unwrap().slug(), "merino-wool-socks");
        assert_eq!(products.last().unwrap().slug(), "enamel-mug");
        assert!(products.last().unwrap().is_active);
    }

    #[test]
    fn test_parse_catalog_reports_every_invalid_entry() {
        let yaml = r#"
products:
  - name: ""
    price: "1.00"
  - name: Tent
    price: "-5"
  - name: Lantern
    price: "20"
    stock: -1
"#;
        let errors = parse_catalog(yaml).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("Tent")));
    }

    #[test]
    fn test_parse_catalog_rejects_malformed_yaml() {
        assert!(parse_catalog("products: [").is_err());
    }

    #[tokio::test]
    async fn test_dry_run_validates_without_database() {
        let path = std::env::temp_dir().join(format!("shop-seed-{}.yaml", std::process::id()));
        tokio::fs::write(&path, "products:\n  - name: Camp Mug\n    price: \"12.50\"\n")
            .await
            .unwrap();

        let options = SeedOptions {
            dry_run: true,
            ..SeedOptions::default()
        };
        let result = catalog(&path, options).await;
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(result.unwrap(), SeedResult::default());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let path = Path::new("/definitely/not/here/catalog.yaml");
        let err = catalog(path, SeedOptions::default()).await.unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
