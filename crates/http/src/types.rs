//! Request and response bodies of the catalog API

use serde::{Deserialize, Serialize};

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        rename = "accessToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<String>,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Generic `{ "message": ... }` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    /// Image host id; empty for images given by URL only
    #[serde(default)]
    pub public_id: String,
}

/// A product as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

/// Fields sent when creating or updating a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub title: String,
    pub price: f64,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

impl ProductInput {
    /// Build the image list from a comma-separated list of URLs
    pub fn with_image_urls(mut self, urls: &str) -> Self {
        self.images = urls
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| ProductImage {
                url: url.to_string(),
                public_id: String::new(),
            })
            .collect();
        self
    }
}

impl From<Product> for ProductInput {
    fn from(product: Product) -> Self {
        Self {
            title: product.title,
            price: product.price,
            description: product.description,
            category: product.category,
            images: product.images,
        }
    }
}

/// Product listing; the API answers with either an envelope or a bare array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProductList {
    Envelope { products: Vec<Product> },
    Bare(Vec<Product>),
}

impl ProductList {
    pub fn into_products(self) -> Vec<Product> {
        match self {
            Self::Envelope { products } | Self::Bare(products) => products,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lamp() -> serde_json::Value {
        json!({
            "_id": "p1",
            "title": "Lamp",
            "price": 19.5,
            "description": "Desk lamp",
            "category": "home",
            "images": [{ "url": "https://img.example.com/lamp.png" }]
        })
    }

    #[test]
    fn test_product_list_shapes() {
        let envelope: ProductList =
            serde_json::from_value(json!({ "products": [lamp()], "total": 1 })).unwrap();
        let bare: ProductList = serde_json::from_value(json!([lamp()])).unwrap();

        let a = envelope.into_products();
        let b = bare.into_products();
        assert_eq!(a, b);
        assert_eq!(a[0].id, "p1");
        assert_eq!(a[0].images[0].url, "https://img.example.com/lamp.png");
    }

    #[test]
    fn test_product_optional_fields() {
        let product: Product =
            serde_json::from_value(json!({ "_id": "p2", "title": "Mug", "price": 4 })).unwrap();
        assert!(product.description.is_empty());
        assert!(product.images.is_empty());
    }

    #[test]
    fn test_image_urls() {
        let input = ProductInput {
            title: "Lamp".into(),
            price: 10.0,
            description: String::new(),
            category: String::new(),
            images: vec![],
        }
        .with_image_urls("https://a/1.png, ,https://a/2.png");

        assert_eq!(input.images.len(), 2);
        assert_eq!(input.images[1].url, "https://a/2.png");
    }

    #[test]
    fn test_login_response_field_names() {
        let response: LoginResponse =
            serde_json::from_value(json!({ "message": "Login Successful", "accessToken": "T1" }))
                .unwrap();
        assert_eq!(response.access_token.as_deref(), Some("T1"));
    }

    #[test]
    fn test_image_public_id_round_trips() {
        let product: Product = serde_json::from_value(json!({
            "_id": "p2",
            "title": "Chair",
            "price": 40,
            "images": [
                { "url": "https://img.example.com/chair.png", "public_id": "catalog/chair" },
                { "url": "https://img.example.com/legacy.png" }
            ]
        }))
        .unwrap();
        assert_eq!(product.images[0].public_id, "catalog/chair");
        assert_eq!(product.images[1].public_id, "");

        let input = ProductInput::from(product);
        let sent = serde_json::to_value(&input).unwrap();
        assert_eq!(sent["images"][0]["public_id"], "catalog/chair");
        assert_eq!(sent["images"][1]["public_id"], "");
    }
}
