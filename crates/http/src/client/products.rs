//! Product API client methods

use super::{CatalogClient, ClientError, Method};
use crate::types::{MessageResponse, Product, ProductInput, ProductList};

const PRODUCTS_PATH: &str = "/api/products";

fn product_path(id: &str) -> String {
    format!("{PRODUCTS_PATH}/{id}")
}

impl CatalogClient {
    /// List all products
    pub async fn list_products(&self) -> Result<Vec<Product>, ClientError> {
        let list: ProductList = self
            .execute::<_, ()>(Method::Get, PRODUCTS_PATH, None)
            .await?;
        Ok(list.into_products())
    }

    /// Create a product
    pub async fn create_product(&self, input: &ProductInput) -> Result<(), ClientError> {
        self.request(
            Method::Post,
            PRODUCTS_PATH,
            Some(&serde_json::to_value(input)?),
            None,
        )
        .await?;
        Ok(())
    }

    /// Replace the fields of product `id`
    pub async fn update_product(&self, id: &str, input: &ProductInput) -> Result<(), ClientError> {
        self.request(
            Method::Put,
            &product_path(id),
            Some(&serde_json::to_value(input)?),
            None,
        )
        .await?;
        Ok(())
    }

    /// Delete product `id`, returning the server's message if it sent one
    pub async fn delete_product(&self, id: &str) -> Result<Option<String>, ClientError> {
        let response = self
            .request(Method::Delete, &product_path(id), None, None)
            .await?;
        let message = response
            .json::<MessageResponse>()
            .ok()
            .and_then(|m| m.message);
        Ok(message)
    }
}
