use uuid::Uuid;

use crate::{
    dto::orders::{
        CartLine, CheckoutRequest, CheckoutResponse, OrderList, OrderView, QuoteRequest,
        ReasonBody,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::{Order, OrderDish, OrderStatus, OrderSummary},
    repository::OrderFilter,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{
        dish_service::load_dishes,
        pricing::{Quote, compute_quote, price_cart},
        state_machine::{NewOrder, TransitionRequest},
    },
    state::AppState,
};

/// Resolves cart lines against the catalogue, keeping the cart's order.
/// Prices are always taken from the catalogue, never from the client.
async fn resolve_cart(state: &AppState, items: &[CartLine]) -> AppResult<Vec<(Uuid, OrderDish)>> {
    if let Some(bad) = items.iter().find(|item| item.quantity <= 0) {
        return Err(AppError::Validation(format!(
            "quantity for dish {} must be at least 1, got {}",
            bad.dish_id, bad.quantity
        )));
    }

    let ids: Vec<Uuid> = items.iter().map(|item| item.dish_id).collect();
    let dishes = load_dishes(&state.orm, &ids).await?;

    items
        .iter()
        .map(|item| {
            let dish = dishes.get(&item.dish_id).ok_or(AppError::NotFound)?;
            if !dish.is_available {
                return Err(AppError::Validation(format!(
                    "dish '{}' is not available",
                    dish.name
                )));
            }
            Ok((
                dish.cooker_id,
                OrderDish {
                    dish_id: dish.id,
                    dish_name: dish.name.clone(),
                    quantity: item.quantity,
                    unit_price: dish.price,
                },
            ))
        })
        .collect()
}

pub async fn quote(state: &AppState, payload: QuoteRequest) -> AppResult<ApiResponse<Quote>> {
    let lines = resolve_cart(state, &payload.items).await?;
    let dishes: Vec<OrderDish> = lines.into_iter().map(|(_, dish)| dish).collect();
    let quote = compute_quote(&dishes, &state.pricing)?;
    Ok(ApiResponse::success("Quote", quote, None))
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    ensure_customer(user)?;
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let lines = resolve_cart(state, &payload.items).await?;
    let pricing = price_cart(&lines, &state.pricing)?;

    let drafts = pricing
        .orders
        .into_iter()
        .map(|slice| {
            NewOrder::from_pricing(
                user.user_id,
                slice,
                payload.payment_method,
                payload.delivery_address.clone(),
            )
        })
        .collect();
    let orders = state.orders.create_orders(drafts).await?;

    tracing::info!(
        customer_id = %user.user_id,
        orders = orders.len(),
        total = pricing.quote.total,
        "checkout completed"
    );

    Ok(ApiResponse::success(
        "Orders placed",
        CheckoutResponse {
            quote: pricing.quote,
            orders,
        },
        None,
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_customer(user)?;
    let page = query.page();
    let filter = OrderFilter {
        customer_id: Some(user.user_id),
        status: query.status()?,
        ..Default::default()
    };
    let result = state.orders.repository().list(&filter, page).await?;
    Ok(ApiResponse::paged(
        "Ok",
        OrderList {
            items: result.items,
        },
        &page,
        result.total,
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    let order = state.orders.get(order_id).await?;
    let view = view_for(user, order)?;
    Ok(ApiResponse::success("Ok", view, None))
}

fn view_for(user: &AuthUser, order: Order) -> AppResult<OrderView> {
    if order.customer_id == user.user_id {
        return Ok(OrderView::Full(order));
    }
    let involved = order.cooker_id == user.user_id || order.driver_id == Some(user.user_id);
    if involved || user.is_admin() {
        Ok(OrderView::Summary(OrderSummary::from(order)))
    } else {
        Err(AppError::NotFound)
    }
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: ReasonBody,
) -> AppResult<ApiResponse<Order>> {
    ensure_customer(user)?;
    let mut request = TransitionRequest::new(OrderStatus::Cancelled, user.actor()?);
    if let Some(reason) = payload.reason.filter(|r| !r.trim().is_empty()) {
        request = request.with_reason(reason);
    }
    let order = state.orders.request_transition(order_id, request).await?;
    Ok(ApiResponse::success("Order cancelled", order, None))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{PaymentMethod, PaymentStatus};

    fn order(customer_id: Uuid, cooker_id: Uuid) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            status: OrderStatus::Ready,
            customer_id,
            cooker_id,
            driver_id: None,
            dishes: Vec::new(),
            subtotal: 0,
            delivery_fee: 2_500,
            service_fee: 0,
            total: 2_500,
            payment_method: PaymentMethod::Card,
            payment_status: PaymentStatus::Pending,
            delivery_code: "4821".into(),
            is_delivered: false,
            cooker_approval: None,
            delivery_address: None,
            available_for_pickup: true,
            ready_time: Some(now),
            pickup_time: None,
            actual_delivery_time: None,
            cancelled_by: None,
            cancellation_reason: None,
            failed_code_attempts: 0,
            code_locked_until: None,
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(user_id: Uuid, role: &str) -> AuthUser {
        AuthUser {
            user_id,
            role: role.into(),
        }
    }

    #[test]
    fn only_the_customer_sees_the_delivery_code() {
        let (customer, cook) = (Uuid::new_v4(), Uuid::new_v4());

        let view = view_for(&user(customer, "customer"), order(customer, cook)).unwrap();
        assert!(matches!(view, OrderView::Full(ref o) if o.delivery_code == "4821"));

        let view = view_for(&user(cook, "cooker"), order(customer, cook)).unwrap();
        assert!(matches!(view, OrderView::Summary(_)));
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("delivery_code").is_none());
    }

    #[test]
    fn strangers_cannot_see_orders() {
        let result = view_for(
            &user(Uuid::new_v4(), "customer"),
            order(Uuid::new_v4(), Uuid::new_v4()),
        );
        assert!(matches!(result, Err(AppError::NotFound)));

        let admin = view_for(
            &user(Uuid::new_v4(), "admin"),
            order(Uuid::new_v4(), Uuid::new_v4()),
        );
        assert!(matches!(admin, Ok(OrderView::Summary(_))));
    }
}
