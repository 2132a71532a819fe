//! Quotes and their conversion into sales.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::sales::{company_tax_rate, ensure_customer, record_sale};
use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        profiles::CurrentUser,
        quotes::{ConvertQuoteRequest, ListQuotesQuery, QuoteCreate, QuoteDetail, QuoteItemResponse, QuoteResponse, QuoteStatusRequest},
        sales::{SaleCreate, SaleDetail, SaleItemCreate, SaleItemResponse, SaleResponse},
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{Products, Quotes, Repository, quotes::QuoteFilter},
        models::quotes::{QuoteCreateDBRequest, QuoteDBResponse, QuoteItemCreateDBRequest, QuoteItemDBResponse},
    },
    errors::{Error, Result},
    sequences::{DocumentKind, SequenceSettings, insert_numbered},
    totals::{DocumentTotals, LineInput, line_total, round_money},
    types::{Operation, QuoteId, Resource},
};

fn detail(quote: QuoteDBResponse, items: Vec<QuoteItemDBResponse>) -> QuoteDetail {
    QuoteDetail {
        quote: QuoteResponse::from(quote),
        items: items.into_iter().map(QuoteItemResponse::from).collect(),
    }
}

/// Every line of a quote must name a product before it can become a sale.
fn sale_items(items: &[QuoteItemDBResponse]) -> Result<Vec<SaleItemCreate>> {
    items
        .iter()
        .map(|item| match item.product_id {
            Some(product_id) => Ok(SaleItemCreate {
                product_id,
                quantity: item.quantity,
                unit_price: Some(item.unit_price),
            }),
            None => Err(Error::bad_request(format!(
                "Line '{}' has no product and cannot be sold; edit the quote or record the sale manually",
                item.description
            ))),
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/quotes",
    tag = "quotes",
    summary = "List quotes",
    params(ListQuotesQuery),
    responses((status = 200, description = "Quotes, newest first", body = PaginatedResponse<QuoteResponse>)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_quotes(
    State(state): State<AppState>,
    Query(query): Query<ListQuotesQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<QuoteResponse>>> {
    permissions::require(&user, Resource::Quotes, Operation::Read)?;
    let (skip, limit) = query.pagination.params();
    let filter = QuoteFilter {
        status: query.status,
        ..QuoteFilter::new(skip, limit).with_search(query.search)
    };

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Quotes::new(&mut tx, user.company_id);
    let quotes = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = quotes.into_iter().map(QuoteResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/quotes",
    tag = "quotes",
    summary = "Create a quote",
    request_body = QuoteCreate,
    responses(
        (status = 201, description = "Quote created as draft", body = QuoteDetail),
        (status = 400, description = "Invalid items or discount"),
        (status = 404, description = "Customer or product not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_quote(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<QuoteCreate>,
) -> Result<(StatusCode, Json<QuoteDetail>)> {
    permissions::require(&user, Resource::Quotes, Operation::Create)?;
    create.validate()?;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    ensure_customer(&mut tx, company_id, create.customer_id).await?;

    let ids: Vec<_> = create.items.iter().filter_map(|item| item.product_id).collect();
    let products = Products::new(&mut tx, company_id).get_bulk(ids).await?;

    let mut items = Vec::with_capacity(create.items.len());
    for item in &create.items {
        let product = match item.product_id {
            Some(id) => Some(
                products
                    .get(&id)
                    .filter(|p| p.deleted_at.is_none())
                    .ok_or_else(|| Error::not_found("Product", id))?,
            ),
            None => None,
        };
        let description = item
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .or_else(|| product.map(|p| p.name.clone()))
            .unwrap_or_default();
        let unit_price = round_money(item.unit_price.or(product.map(|p| p.sale_price)).unwrap_or_default());
        items.push(QuoteItemCreateDBRequest {
            product_id: item.product_id,
            description,
            quantity: item.quantity,
            unit_price,
            line_total: line_total(item.quantity, unit_price)?,
        });
    }

    let tax_rate = match create.tax_rate {
        Some(rate) => rate,
        None => company_tax_rate(&mut tx, company_id).await?,
    };
    let lines: Vec<LineInput> = items
        .iter()
        .map(|item| LineInput {
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();
    let totals = DocumentTotals::compute(&lines, create.discount.unwrap_or_default(), tax_rate)?;

    let request = QuoteCreateDBRequest {
        customer_id: create.customer_id,
        valid_until: create.valid_until,
        totals,
        tax_rate,
        notes: create.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        created_by: Some(user.id),
    };
    let settings = SequenceSettings::from(&state.config.sequences);
    let quote = insert_numbered(&mut tx, DocumentKind::Quote, company_id, &settings, |conn, number| {
        let request = request.clone();
        Box::pin(async move { Quotes::new(conn, company_id).create(&request, &number).await })
    })
    .await?;
    let items = Quotes::new(&mut tx, company_id).add_items(quote.id, &items).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(detail(quote, items))))
}

#[utoipa::path(
    get,
    path = "/quotes/{id}",
    tag = "quotes",
    summary = "Get quote",
    params(("id" = uuid::Uuid, Path, description = "Quote ID")),
    responses(
        (status = 200, description = "Quote with its lines", body = QuoteDetail),
        (status = 404, description = "Quote not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_quote(State(state): State<AppState>, Path(id): Path<QuoteId>, user: CurrentUser) -> Result<Json<QuoteDetail>> {
    permissions::require(&user, Resource::Quotes, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Quotes::new(&mut tx, user.company_id);
    let quote = repo.get(id).await?.ok_or_else(|| Error::not_found("Quote", id))?;
    let items = repo.list_items(id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(detail(quote, items)))
}

#[utoipa::path(
    post,
    path = "/quotes/{id}/status",
    tag = "quotes",
    summary = "Change quote status",
    request_body = QuoteStatusRequest,
    params(("id" = uuid::Uuid, Path, description = "Quote ID")),
    responses(
        (status = 200, description = "Status changed", body = QuoteResponse),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Quote not found"),
        (status = 409, description = "Status changed concurrently"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(quote_id = %id, to = %request.status))]
pub async fn change_quote_status(
    State(state): State<AppState>,
    Path(id): Path<QuoteId>,
    user: CurrentUser,
    Json(request): Json<QuoteStatusRequest>,
) -> Result<Json<QuoteResponse>> {
    permissions::require(&user, Resource::Quotes, Operation::Update)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Quotes::new(&mut tx, user.company_id);
    let current = repo.get(id).await?.ok_or_else(|| Error::not_found("Quote", id))?;
    current.status.check_transition(request.status)?;
    let quote = repo
        .set_status(id, current.status, request.status)
        .await?
        .ok_or_else(|| Error::Conflict {
            message: format!("Quote {} changed status concurrently, please reload", current.quote_number),
        })?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(QuoteResponse::from(quote)))
}

/// Turn the quote into a sale at the quoted prices, discount and tax rate. Stock is deducted as
/// for any other sale.
#[utoipa::path(
    post,
    path = "/quotes/{id}/convert",
    tag = "quotes",
    summary = "Convert quote to sale",
    request_body = ConvertQuoteRequest,
    params(("id" = uuid::Uuid, Path, description = "Quote ID")),
    responses(
        (status = 201, description = "Sale recorded; quote marked converted", body = SaleDetail),
        (status = 400, description = "Quote not convertible, has lines without products, or stock is insufficient"),
        (status = 404, description = "Quote not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(quote_id = %id))]
pub async fn convert_quote(
    State(state): State<AppState>,
    Path(id): Path<QuoteId>,
    user: CurrentUser,
    Json(request): Json<ConvertQuoteRequest>,
) -> Result<(StatusCode, Json<SaleDetail>)> {
    permissions::require(&user, Resource::Quotes, Operation::Update)?;
    permissions::require(&user, Resource::Sales, Operation::Create)?;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    let mut repo = Quotes::new(&mut tx, company_id);
    let quote = repo.get_for_update(id).await?.ok_or_else(|| Error::not_found("Quote", id))?;
    quote.status.can_convert()?;
    let items = sale_items(&repo.list_items(id).await?)?;

    let create = SaleCreate {
        customer_id: quote.customer_id,
        payment_method: request.payment_method,
        items,
        discount: Some(quote.discount),
        tax_rate: Some(quote.tax_rate),
        notes: Some(format!("From quote {}", quote.quote_number)),
    };
    let (sale, sale_items) = record_sale(&mut tx, &state, &user, create).await?;

    Quotes::new(&mut tx, company_id)
        .mark_converted(id, sale.id)
        .await?
        .ok_or_else(|| Error::Conflict {
            message: format!("Quote {} changed status concurrently, please reload", quote.quote_number),
        })?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    tracing::info!(quote_number = %quote.quote_number, sale_number = %sale.sale_number, "Converted quote");
    Ok((
        StatusCode::CREATED,
        Json(SaleDetail {
            sale: SaleResponse::from(sale),
            items: sale_items.into_iter().map(SaleItemResponse::from).collect(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(product_id: Option<Uuid>, description: &str) -> QuoteItemDBResponse {
        QuoteItemDBResponse {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            quote_id: Uuid::new_v4(),
            product_id,
            description: description.to_string(),
            quantity: 2,
            unit_price: "12.50".parse().unwrap(),
            line_total: "25.00".parse().unwrap(),
        }
    }

    #[test]
    fn sale_items_keep_quoted_prices() {
        let product = Uuid::new_v4();
        let items = sale_items(&[item(Some(product), "Screen")]).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, product);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].unit_price, Some("12.50".parse().unwrap()));
    }

    #[test]
    fn service_lines_block_conversion() {
        let err = sale_items(&[item(Some(Uuid::new_v4()), "Screen"), item(None, "Labor")]).unwrap_err();
        assert!(err.user_message().contains("'Labor'"));
    }

    #[tokio::test]
    async fn technicians_cannot_convert_quotes() {
        use crate::api::models::profiles::Role;
        use crate::test_utils::{bearer, create_test_config, create_test_server};

        let config = create_test_config();
        let auth = bearer(&config, Role::Technician);
        let server = create_test_server(config);

        let response = server
            .post(&format!("/api/v1/quotes/{}/convert", Uuid::new_v4()))
            .add_header("authorization", auth)
            .json(&serde_json::json!({ "payment_method": "card" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }
}
