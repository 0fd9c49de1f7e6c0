use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::OrderStatus,
    response::PageRequest,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.per_page.unwrap_or(20))
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DishSortBy {
    CreatedAt,
    Price,
    Name,
}

// Paging fields are inlined: query strings cannot feed numbers through
// `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DishQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub cooker_id: Option<Uuid>,
    pub max_price: Option<i64>,
    pub sort_by: Option<DishSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl DishQuery {
    pub fn page(&self) -> PageRequest {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
        .normalize()
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
}

impl OrderListQuery {
    pub fn page(&self) -> PageRequest {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
        .normalize()
    }

    /// Empty status strings are treated as "no filter".
    pub fn status(&self) -> AppResult<Option<OrderStatus>> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<OrderStatus>())
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let page = Pagination {
            page: Some(0),
            per_page: Some(1000),
        }
        .normalize();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 100);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn dish_query_defaults_to_first_page() {
        let page = DishQuery::default().page();
        assert_eq!(page, PageRequest::new(1, 20));
    }

    #[test]
    fn order_query_parses_status_filter() {
        let query = OrderListQuery {
            status: Some("ready".into()),
            ..Default::default()
        };
        assert_eq!(query.status().unwrap(), Some(OrderStatus::Ready));

        let empty = OrderListQuery {
            status: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(empty.status().unwrap(), None);

        let bad = OrderListQuery {
            status: Some("shipped".into()),
            ..Default::default()
        };
        assert!(bad.status().is_err());
    }
}
