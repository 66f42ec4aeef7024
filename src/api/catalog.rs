//! Demo Catalog
//!
//! A small in-memory dish catalog and user directory that the cached routes
//! serve. It stands in for the restaurant backend's real persistence.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::handlers::AppState;
use crate::cache::Resource;
use crate::error::{CacheError, Result};
use crate::models::{Dish, DishFilter, NewDish, User};

// == Catalog ==
/// Dishes and users held in memory.
#[derive(Debug)]
pub struct Catalog {
    dishes: RwLock<Vec<Dish>>,
    users: Vec<User>,
    next_id: AtomicU64,
}

impl Catalog {
    /// Creates a catalog with a few sample dishes and users.
    pub fn seeded() -> Self {
        let dishes = vec![
            dish(1, "Paneer Tikka", "starter", 850),
            dish(2, "Masala Dosa", "main", 1100),
            dish(3, "Chicken Biryani", "main", 1450),
            dish(4, "Gulab Jamun", "dessert", 500),
        ];
        let users = vec![
            user(123, "Asha", "+15550000123"),
            user(456, "Ravi", "+15550000456"),
        ];

        Self {
            next_id: AtomicU64::new(dishes.len() as u64 + 1),
            dishes: RwLock::new(dishes),
            users,
        }
    }

    pub async fn dishes(&self, category: Option<&str>) -> Vec<Dish> {
        self.dishes
            .read()
            .await
            .iter()
            .filter(|d| category.map_or(true, |c| d.category.eq_ignore_ascii_case(c)))
            .cloned()
            .collect()
    }

    pub async fn dish(&self, id: u64) -> Option<Dish> {
        self.dishes.read().await.iter().find(|d| d.id == id).cloned()
    }

    pub async fn add_dish(&self, new: NewDish) -> Dish {
        let created = Dish {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name: new.name.trim().to_string(),
            category: new.category.trim().to_ascii_lowercase(),
            price: new.price,
        };
        self.dishes.write().await.push(created.clone());
        created
    }

    pub fn user(&self, id: u64) -> Option<User> {
        self.users.iter().find(|u| u.id == id).cloned()
    }
}

fn dish(id: u64, name: &str, category: &str, price: u32) -> Dish {
    Dish {
        id,
        name: name.to_string(),
        category: category.to_string(),
        price,
    }
}

fn user(id: u64, name: &str, phone: &str) -> User {
    User {
        id,
        name: name.to_string(),
        phone: phone.to_string(),
    }
}

// == Handlers ==

/// Handler for GET /api/dishes
pub async fn list_dishes(
    State(state): State<AppState>,
    Query(filter): Query<DishFilter>,
) -> Json<Vec<Dish>> {
    Json(state.catalog.dishes(filter.category.as_deref()).await)
}

/// Handler for GET /api/dishes/:id
pub async fn get_dish(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Dish>> {
    state
        .catalog
        .dish(id)
        .await
        .map(Json)
        .ok_or_else(|| CacheError::NotFound(format!("dish {id}")))
}

/// Handler for POST /api/dishes
///
/// Drops every cached dish response so the new dish shows up immediately.
pub async fn create_dish(
    State(state): State<AppState>,
    Json(req): Json<NewDish>,
) -> Result<(StatusCode, Json<Dish>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let created = state.catalog.add_dish(req).await;
    info!(id = created.id, "Dish created");

    if let Err(err) = state.cache.invalidate_resource(&Resource::Dishes).await {
        warn!(error = %err, "Could not invalidate cached dishes");
    }

    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for GET /api/user/:id
pub async fn get_user(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<User>> {
    state
        .catalog
        .user(id)
        .map(Json)
        .ok_or_else(|| CacheError::NotFound(format!("user {id}")))
}
